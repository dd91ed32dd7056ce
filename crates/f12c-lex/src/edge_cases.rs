//! Edge case tests for f12c-lex.
//!
//! Most of these port the original token-stream battery for the tricky
//! multi-character sigils: `-` vs `--` vs `-->`, `<` vs `<=` vs `<--`,
//! `>` vs `>=` vs `>include`, and comment termination.

#[cfg(test)]
mod tests {
    use crate::token::TokenKind::{self, *};
    use crate::{lex, Token};
    use f12c_util::FileId;

    fn kinds(source: &str) -> Vec<TokenKind> {
        lex(source, FileId::DUMMY)
            .expect("expected source to lex")
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    fn tokens(source: &str) -> Vec<Token> {
        lex(source, FileId::DUMMY).expect("expected source to lex")
    }

    #[test]
    fn test_minus() {
        assert_eq!(kinds("-"), vec![OpMinus, Eof]);
    }

    #[test]
    fn test_minus_run() {
        assert_eq!(kinds("---"), vec![OpMinus, OpMinus, OpMinus, Eof]);
    }

    #[test]
    fn test_minus_spaced() {
        assert_eq!(kinds("- - -"), vec![OpMinus, OpMinus, OpMinus, Eof]);
    }

    #[test]
    fn test_minus_before_operand() {
        assert_eq!(kinds("-5"), vec![OpMinus, LitInt, Eof]);
        assert_eq!(kinds("--x"), vec![OpMinus, OpMinus, Identifier, Eof]);
    }

    #[test]
    fn test_to_stdout() {
        assert_eq!(kinds("-->"), vec![KwToStdout, Eof]);
    }

    #[test]
    fn test_to_stdout_chains() {
        // Longest-match behaviour over a pathological run of minuses.
        assert_eq!(
            kinds("--->---->-->-"),
            vec![
                OpMinus, KwToStdout, OpMinus, OpMinus, KwToStdout, KwToStdout, OpMinus, Eof,
            ]
        );
    }

    #[test]
    fn test_div_vs_comments() {
        assert_eq!(kinds("/ /"), vec![OpDiv, OpDiv, Eof]);
        assert_eq!(kinds("1 / 2"), vec![LitInt, OpDiv, LitInt, Eof]);
    }

    #[test]
    fn test_single_line_comment_runs_to_newline() {
        assert_eq!(kinds("// all of this + is skipped\n*"), vec![OpMul, Eof]);
        // A comment ending at EOF is fine.
        assert_eq!(kinds("+ // trailing"), vec![OpPlus, Eof]);
    }

    #[test]
    fn test_multiline_comment() {
        assert_eq!(kinds("/* one */ +"), vec![OpPlus, Eof]);
        assert_eq!(kinds("/* line \n line */ +"), vec![OpPlus, Eof]);
        assert_eq!(kinds("/* * ** */ +"), vec![OpPlus, Eof]);
        assert_eq!(kinds("/***/ +"), vec![OpPlus, Eof]);
    }

    #[test]
    fn test_unterminated_multiline_comment_reports_start() {
        let err = lex(" \n /* never closed", FileId::DUMMY).unwrap_err();
        assert_eq!(err.message, "Unterminated multiline comment");
        assert_eq!(err.span.line, 2);
        assert_eq!(err.span.column, 2);
    }

    #[test]
    fn test_not_and_ne() {
        assert_eq!(kinds("!"), vec![OpNot, Eof]);
        assert_eq!(kinds("!="), vec![OpNe, Eof]);
        assert_eq!(kinds("!!="), vec![OpNot, OpNe, Eof]);
    }

    #[test]
    fn test_assign_eq_fat_arrow() {
        assert_eq!(kinds("="), vec![OpAssign, Eof]);
        assert_eq!(kinds("=="), vec![OpEq, Eof]);
        assert_eq!(kinds("=>"), vec![KwFatArrow, Eof]);
        assert_eq!(kinds("= = >"), vec![OpAssign, OpAssign, OpGt, Eof]);
        assert_eq!(kinds("==="), vec![OpEq, OpAssign, Eof]);
    }

    #[test]
    fn test_and_or_pipe() {
        assert_eq!(kinds("&&"), vec![OpAnd, Eof]);
        assert_eq!(kinds("||"), vec![OpOr, Eof]);
        assert_eq!(kinds("|"), vec![Pipe, Eof]);
        assert_eq!(
            kinds("p|x: 1|"),
            vec![Identifier, Pipe, Identifier, Colon, LitInt, Pipe, Eof]
        );
    }

    #[test]
    fn test_lt_le_from_stdin() {
        assert_eq!(kinds("<"), vec![OpLt, Eof]);
        assert_eq!(kinds("<="), vec![OpLe, Eof]);
        assert_eq!(kinds("<--"), vec![KwFromStdin, Eof]);
        // `<-` that never completes the sigil falls apart into two tokens.
        assert_eq!(kinds("<-"), vec![OpLt, OpMinus, Eof]);
        assert_eq!(kinds("<-5"), vec![OpLt, OpMinus, LitInt, Eof]);
    }

    #[test]
    fn test_gt_ge() {
        assert_eq!(kinds(">"), vec![OpGt, Eof]);
        assert_eq!(kinds(">="), vec![OpGe, Eof]);
        assert_eq!(kinds("a > b"), vec![Identifier, OpGt, Identifier, Eof]);
    }

    #[test]
    fn test_helper_include() {
        assert_eq!(
            kinds(">include \"std.f12\";"),
            vec![HelperInclude, LitStr, Semi, Eof]
        );
    }

    #[test]
    fn test_gt_followed_by_non_helper_word() {
        // `>inc` is not a helper name: it is `>` then the identifier `inc`.
        assert_eq!(kinds(">inc"), vec![OpGt, Identifier, Eof]);
        let toks = tokens(">inc");
        assert_eq!(toks[1].lexeme, "inc");

        // Keywords still win after the split.
        assert_eq!(kinds(">if"), vec![OpGt, KwIf, Eof]);
    }

    #[test]
    fn test_underscore_identifiers() {
        let toks = tokens("_x x_ _ x_1");
        assert_eq!(
            toks.iter().map(|t| t.kind).collect::<Vec<_>>(),
            vec![Identifier, Identifier, Identifier, Identifier, Eof]
        );
        assert_eq!(toks[0].lexeme, "_x");
        assert_eq!(toks[2].lexeme, "_");
    }

    #[test]
    fn test_float_dot_leading() {
        assert_eq!(kinds(".5 + .25"), vec![LitFloat, OpPlus, LitFloat, Eof]);
    }

    #[test]
    fn test_zero_forms() {
        assert_eq!(kinds("0"), vec![LitInt, Eof]);
        assert_eq!(kinds("0.5"), vec![LitFloat, Eof]);
        assert_eq!(kinds("0 1"), vec![LitInt, LitInt, Eof]);
    }

    #[test]
    fn test_whole_declaration() {
        assert_eq!(
            kinds("fun fib(int n) => int { ret fib(n - 1) + fib(n - 2); }"),
            vec![
                KwFun, Identifier, RoundL, PrimitiveInt, Identifier, RoundR, KwFatArrow,
                PrimitiveInt, CurlyL, KwRet, Identifier, RoundL, Identifier, OpMinus, LitInt,
                RoundR, OpPlus, Identifier, RoundL, Identifier, OpMinus, LitInt, RoundR, Semi,
                CurlyR, Eof,
            ]
        );
    }

    #[test]
    fn test_array_declaration_tokens() {
        assert_eq!(
            kinds("char[] p = new char[3];"),
            vec![
                PrimitiveChar, SquareL, SquareR, Identifier, OpAssign, KwNew, PrimitiveChar,
                SquareL, LitInt, SquareR, Semi, Eof,
            ]
        );
    }

    #[test]
    fn test_stdout_statement_tokens() {
        assert_eq!(
            kinds("--> \"hello\", x;"),
            vec![KwToStdout, LitStr, Comma, Identifier, Semi, Eof]
        );
    }

    #[test]
    fn test_stdin_expression_tokens() {
        assert_eq!(
            kinds("char c = <--;"),
            vec![PrimitiveChar, Identifier, OpAssign, KwFromStdin, Semi, Eof]
        );
    }
}
