//! The lexer state machine.

use f12c_util::{FatalError, FatalResult, FileId, Phase, Span};

use crate::state::LexState;
use crate::token::{constant_kind, helper_kind, keyword_kind, primitive_kind, Token, TokenKind};

/// Lex a whole source text into a token stream ending with `Eof`.
pub fn lex(source: &str, file: FileId) -> FatalResult<Vec<Token>> {
    Lexer::new(source, file).lex_all()
}

/// Character-driven DFA lexer.
///
/// The machine consumes one character per step. A step may instead ask for
/// the current character to be *reprocessed* (the original's "rollback"):
/// the state has changed, and the same character is fed again before the
/// position advances. A virtual trailing space after the last character
/// forces every terminal state to flush its pending token.
pub struct Lexer {
    chars: Vec<char>,
    file: FileId,

    state: LexState,
    buffer: String,
    line: u32,
    column: u32,
    offset: usize,
    current: char,
    reprocess: bool,

    /// Position of the first character of the token being built.
    token_start: Span,
    tokens: Vec<Token>,
}

impl Lexer {
    pub fn new(source: &str, file: FileId) -> Self {
        Self {
            chars: source.chars().collect(),
            file,
            state: LexState::Start,
            buffer: String::new(),
            line: 1,
            column: 1,
            offset: 0,
            current: '\0',
            reprocess: false,
            token_start: Span::with_file(1, 1, file),
            tokens: Vec::new(),
        }
    }

    /// Run the machine over the whole input.
    pub fn lex_all(mut self) -> FatalResult<Vec<Token>> {
        while self.offset < self.chars.len() {
            self.current = self.chars[self.offset];
            self.reprocess = false;
            self.step()?;
            if !self.reprocess {
                self.advance();
            }
        }

        // Virtual trailing whitespace flushes terminal states.
        self.current = ' ';
        self.reprocess = false;
        self.step()?;

        match self.state {
            LexState::Start | LexState::SlComment => {
                let span = self.pos();
                self.tokens.push(Token::bare(TokenKind::Eof, span));
            }
            LexState::MlComment | LexState::MlCommentEnd => {
                return Err(self.error_at("Unterminated multiline comment", self.token_start));
            }
            LexState::LitStr | LexState::LitStrEscape => {
                return Err(self.error("Unterminated string"));
            }
            LexState::LitChar | LexState::LitCharEscape | LexState::LitCharEnd => {
                return Err(self.error("Unterminated char literal"));
            }
            state => unreachable!("lexer flushed into non-terminal state {:?}", state),
        }

        Ok(self.tokens)
    }

    fn step(&mut self) -> FatalResult<()> {
        match self.state {
            LexState::Start => self.lex_start(),
            LexState::OpMinus => self.lex_op_minus(),
            LexState::OpMinus2 => self.lex_op_minus_2(),
            LexState::OpDiv => self.lex_op_div(),
            LexState::SlComment => self.lex_sl_comment(),
            LexState::MlComment => self.lex_ml_comment(),
            LexState::MlCommentEnd => self.lex_ml_comment_end(),
            LexState::OpNot => self.lex_op_not(),
            LexState::OpAssign => self.lex_op_assign(),
            LexState::OpAnd => self.lex_op_and(),
            LexState::OpOr => self.lex_op_or(),
            LexState::OpLt => self.lex_op_lt(),
            LexState::KwFromStdin => self.lex_kw_from_stdin(),
            LexState::OpAccess => self.lex_op_access(),
            LexState::LitIntFirstZero => self.lex_lit_int_first_zero(),
            LexState::LitInt => self.lex_lit_int(),
            LexState::LitFloatStart => self.lex_lit_float_start(),
            LexState::LitFloat => self.lex_lit_float(),
            LexState::LitFloatExp => self.lex_lit_float_exp(),
            LexState::LitFloatPreEnd => self.lex_lit_float_pre_end(),
            LexState::LitFloatEnd => self.lex_lit_float_end(),
            LexState::OpGt => self.lex_op_gt(),
            LexState::AfterGt => self.lex_after_gt(),
            LexState::LitStr => self.lex_lit_str(),
            LexState::LitStrEscape => self.lex_lit_str_escape(),
            LexState::LitChar => self.lex_lit_char(),
            LexState::LitCharEscape => self.lex_lit_char_escape(),
            LexState::LitCharEnd => self.lex_lit_char_end(),
            LexState::Identifier => self.lex_identifier(),
        }
    }

    fn lex_start(&mut self) -> FatalResult<()> {
        self.token_start = self.pos();
        match self.current {
            '+' => self.add_token(TokenKind::OpPlus),
            '*' => self.add_token(TokenKind::OpMul),
            '^' => self.add_token(TokenKind::OpPow),
            '%' => self.add_token(TokenKind::OpMod),
            ';' => self.add_token(TokenKind::Semi),
            ':' => self.add_token(TokenKind::Colon),
            ',' => self.add_token(TokenKind::Comma),
            '(' => self.add_token(TokenKind::RoundL),
            ')' => self.add_token(TokenKind::RoundR),
            '{' => self.add_token(TokenKind::CurlyL),
            '}' => self.add_token(TokenKind::CurlyR),
            '[' => self.add_token(TokenKind::SquareL),
            ']' => self.add_token(TokenKind::SquareR),
            '-' => self.begin(LexState::OpMinus),
            '/' => self.begin(LexState::OpDiv),
            '!' => self.begin(LexState::OpNot),
            '=' => self.begin(LexState::OpAssign),
            '&' => self.begin(LexState::OpAnd),
            '|' => self.begin(LexState::OpOr),
            '<' => self.begin(LexState::OpLt),
            '.' => self.begin(LexState::OpAccess),
            '>' => self.begin(LexState::OpGt),
            '"' => self.begin(LexState::LitStr),
            '\'' => self.begin(LexState::LitChar),
            '0' => self.begin_buffered(LexState::LitIntFirstZero),
            '1'..='9' => self.begin_buffered(LexState::LitInt),
            '_' => self.begin_buffered(LexState::Identifier),
            c if c.is_ascii_alphabetic() => self.begin_buffered(LexState::Identifier),
            ' ' | '\t' | '\r' | '\n' => {}
            _ => return Err(self.error("Unrecognised token")),
        }
        Ok(())
    }

    fn lex_op_minus(&mut self) -> FatalResult<()> {
        match self.current {
            '-' => self.to_state(LexState::OpMinus2),
            _ => self.add_token_rollback(TokenKind::OpMinus),
        }
        Ok(())
    }

    fn lex_op_minus_2(&mut self) -> FatalResult<()> {
        match self.current {
            '>' => self.add_token(TokenKind::KwToStdout),
            '-' => self.add_token_keep_state(TokenKind::OpMinus),
            _ => {
                self.add_token(TokenKind::OpMinus);
                self.add_token_rollback(TokenKind::OpMinus);
            }
        }
        Ok(())
    }

    fn lex_op_div(&mut self) -> FatalResult<()> {
        match self.current {
            '/' => self.to_state(LexState::SlComment),
            '*' => self.to_state(LexState::MlComment),
            _ => self.add_token_rollback(TokenKind::OpDiv),
        }
        Ok(())
    }

    fn lex_sl_comment(&mut self) -> FatalResult<()> {
        if self.current == '\n' {
            self.to_state(LexState::Start);
        }
        Ok(())
    }

    fn lex_ml_comment(&mut self) -> FatalResult<()> {
        if self.current == '*' {
            self.to_state(LexState::MlCommentEnd);
        }
        Ok(())
    }

    fn lex_ml_comment_end(&mut self) -> FatalResult<()> {
        match self.current {
            '/' => self.to_state(LexState::Start),
            '*' => {}
            _ => self.to_state(LexState::MlComment),
        }
        Ok(())
    }

    fn lex_op_not(&mut self) -> FatalResult<()> {
        match self.current {
            '=' => self.add_token(TokenKind::OpNe),
            _ => self.add_token_rollback(TokenKind::OpNot),
        }
        Ok(())
    }

    fn lex_op_assign(&mut self) -> FatalResult<()> {
        match self.current {
            '=' => self.add_token(TokenKind::OpEq),
            '>' => self.add_token(TokenKind::KwFatArrow),
            _ => self.add_token_rollback(TokenKind::OpAssign),
        }
        Ok(())
    }

    fn lex_op_and(&mut self) -> FatalResult<()> {
        match self.current {
            '&' => {
                self.add_token(TokenKind::OpAnd);
                Ok(())
            }
            _ => Err(self.error("Missing &")),
        }
    }

    fn lex_op_or(&mut self) -> FatalResult<()> {
        match self.current {
            '|' => self.add_token(TokenKind::OpOr),
            // a lone pipe is the unit-literal delimiter
            _ => self.add_token_rollback(TokenKind::Pipe),
        }
        Ok(())
    }

    fn lex_op_lt(&mut self) -> FatalResult<()> {
        match self.current {
            '=' => self.add_token(TokenKind::OpLe),
            '-' => self.to_state(LexState::KwFromStdin),
            _ => self.add_token_rollback(TokenKind::OpLt),
        }
        Ok(())
    }

    fn lex_kw_from_stdin(&mut self) -> FatalResult<()> {
        match self.current {
            '-' => self.add_token(TokenKind::KwFromStdin),
            _ => {
                self.add_token(TokenKind::OpLt);
                self.add_token_rollback(TokenKind::OpMinus);
            }
        }
        Ok(())
    }

    fn lex_op_access(&mut self) -> FatalResult<()> {
        match self.current {
            c if c.is_ascii_digit() => {
                self.buffer.push('.');
                self.buffer.push(c);
                self.to_state(LexState::LitFloat);
            }
            _ => self.add_token_rollback(TokenKind::OpAccess),
        }
        Ok(())
    }

    fn lex_lit_int_first_zero(&mut self) -> FatalResult<()> {
        match self.current {
            '.' => {
                self.buffer.push('.');
                self.to_state(LexState::LitFloatStart);
            }
            'e' | 'E' => {
                self.buffer.push(self.current);
                self.to_state(LexState::LitFloatExp);
            }
            c if c.is_ascii_digit() => {
                return Err(
                    self.error_at("Multi digit integer cannot start with 0", self.token_start)
                );
            }
            _ => self.add_token_rollback(TokenKind::LitInt),
        }
        Ok(())
    }

    fn lex_lit_int(&mut self) -> FatalResult<()> {
        match self.current {
            c if c.is_ascii_digit() => self.buffer.push(c),
            '.' => {
                self.buffer.push('.');
                self.to_state(LexState::LitFloatStart);
            }
            'e' | 'E' => {
                self.buffer.push(self.current);
                self.to_state(LexState::LitFloatExp);
            }
            c if c == '_' || c.is_ascii_alphabetic() => {
                return Err(self.error("Integer with invalid prefix"));
            }
            _ => self.add_token_rollback(TokenKind::LitInt),
        }
        Ok(())
    }

    fn lex_lit_float_start(&mut self) -> FatalResult<()> {
        match self.current {
            c if c.is_ascii_digit() => {
                self.buffer.push(c);
                self.to_state(LexState::LitFloat);
            }
            _ => self.add_token_rollback(TokenKind::LitFloat),
        }
        Ok(())
    }

    fn lex_lit_float(&mut self) -> FatalResult<()> {
        match self.current {
            c if c.is_ascii_digit() => self.buffer.push(c),
            'e' | 'E' => {
                self.buffer.push(self.current);
                self.to_state(LexState::LitFloatExp);
            }
            _ => self.add_token_rollback(TokenKind::LitFloat),
        }
        Ok(())
    }

    fn lex_lit_float_exp(&mut self) -> FatalResult<()> {
        match self.current {
            '+' | '-' => {
                self.buffer.push(self.current);
                self.to_state(LexState::LitFloatPreEnd);
            }
            c if c.is_ascii_digit() => {
                self.buffer.push(c);
                self.to_state(LexState::LitFloatEnd);
            }
            _ => return Err(self.error("After exponent has to follow number or sign")),
        }
        Ok(())
    }

    fn lex_lit_float_pre_end(&mut self) -> FatalResult<()> {
        match self.current {
            c if c.is_ascii_digit() => {
                self.buffer.push(c);
                self.to_state(LexState::LitFloatEnd);
            }
            _ => return Err(self.error("Exponent power is missing")),
        }
        Ok(())
    }

    fn lex_lit_float_end(&mut self) -> FatalResult<()> {
        match self.current {
            c if c.is_ascii_digit() => self.buffer.push(c),
            _ => self.add_token_rollback(TokenKind::LitFloat),
        }
        Ok(())
    }

    fn lex_op_gt(&mut self) -> FatalResult<()> {
        match self.current {
            '=' => self.add_token(TokenKind::OpGe),
            c if c.is_ascii_alphabetic() => {
                self.buffer.push(c);
                self.to_state(LexState::AfterGt);
            }
            _ => self.add_token_rollback(TokenKind::OpGt),
        }
        Ok(())
    }

    fn lex_after_gt(&mut self) -> FatalResult<()> {
        match self.current {
            c if c.is_ascii_alphabetic() => self.buffer.push(c),
            _ => self.complete_helper(),
        }
        Ok(())
    }

    fn lex_lit_str(&mut self) -> FatalResult<()> {
        match self.current {
            '"' => self.add_token(TokenKind::LitStr),
            '\\' => self.to_state(LexState::LitStrEscape),
            c => self.buffer.push(c),
        }
        Ok(())
    }

    fn lex_lit_str_escape(&mut self) -> FatalResult<()> {
        match self.current {
            '"' => self.buffer.push('"'),
            't' => self.buffer.push('\t'),
            'n' => self.buffer.push('\n'),
            _ => return Err(self.error("Unrecognized escaped character")),
        }
        self.to_state(LexState::LitStr);
        Ok(())
    }

    fn lex_lit_char(&mut self) -> FatalResult<()> {
        match self.current {
            '\\' => self.to_state(LexState::LitCharEscape),
            '\'' => return Err(self.error("Empty char literal")),
            '\n' => return Err(self.error("Unterminated char literal")),
            c => {
                self.buffer.push(c);
                self.to_state(LexState::LitCharEnd);
            }
        }
        Ok(())
    }

    fn lex_lit_char_escape(&mut self) -> FatalResult<()> {
        match self.current {
            '\'' => self.buffer.push('\''),
            'n' => self.buffer.push('\n'),
            't' => self.buffer.push('\t'),
            '\\' => self.buffer.push('\\'),
            _ => return Err(self.error("Unrecognized escaped character")),
        }
        self.to_state(LexState::LitCharEnd);
        Ok(())
    }

    fn lex_lit_char_end(&mut self) -> FatalResult<()> {
        match self.current {
            '\'' => {
                self.add_token(TokenKind::LitChar);
                Ok(())
            }
            _ => Err(self.error("Char literal must contain a single character")),
        }
    }

    fn lex_identifier(&mut self) -> FatalResult<()> {
        match self.current {
            c if c.is_ascii_alphanumeric() || c == '_' => self.buffer.push(c),
            _ => self.complete_identifier(),
        }
        Ok(())
    }

    /// Finish an identifier buffer: keyword, primitive type, constant, or a
    /// plain identifier. The current character is reprocessed.
    fn complete_identifier(&mut self) {
        let word = self.buffer.as_str();
        if let Some(kind) = keyword_kind(word)
            .or_else(|| primitive_kind(word))
            .or_else(|| constant_kind(word))
        {
            self.add_bare_rollback(kind);
        } else {
            self.add_token_rollback(TokenKind::Identifier);
        }
    }

    /// Finish a `>name` buffer: longest-match against the helper names,
    /// otherwise a `>` followed by whatever the buffer spells.
    fn complete_helper(&mut self) {
        if let Some(kind) = helper_kind(self.buffer.as_str()) {
            self.add_bare_rollback(kind);
        } else {
            // The `>` itself, then the buffered word one column later.
            self.tokens
                .push(Token::bare(TokenKind::OpGt, self.token_start));
            self.token_start = Span::with_file(
                self.token_start.line,
                self.token_start.column + 1,
                self.file,
            );
            self.complete_identifier();
        }
    }

    fn push_token(&mut self, kind: TokenKind, with_value: bool, keep_state: bool, rollback: bool) {
        let lexeme = std::mem::take(&mut self.buffer);
        let lexeme = if with_value { lexeme } else { String::new() };
        self.tokens.push(Token::new(kind, self.token_start, lexeme));
        if !keep_state {
            self.state = LexState::Start;
        }
        if rollback {
            self.reprocess = true;
        }
    }

    fn add_token(&mut self, kind: TokenKind) {
        self.push_token(kind, true, false, false);
    }

    fn add_token_rollback(&mut self, kind: TokenKind) {
        self.push_token(kind, true, false, true);
    }

    fn add_token_keep_state(&mut self, kind: TokenKind) {
        self.push_token(kind, true, true, false);
    }

    fn add_bare_rollback(&mut self, kind: TokenKind) {
        self.push_token(kind, false, false, true);
    }

    fn begin(&mut self, state: LexState) {
        self.token_start = self.pos();
        self.to_state(state);
    }

    fn begin_buffered(&mut self, state: LexState) {
        self.begin(state);
        self.buffer.push(self.current);
    }

    fn to_state(&mut self, state: LexState) {
        self.state = state;
    }

    fn advance(&mut self) {
        if self.current == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        self.offset += 1;
    }

    fn pos(&self) -> Span {
        Span::with_file(self.line, self.column, self.file)
    }

    fn error(&self, message: &str) -> FatalError {
        self.error_at(message, self.pos())
    }

    fn error_at(&self, message: &str, span: Span) -> FatalError {
        FatalError::new(Phase::Lexing, message, span)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        lex(source, FileId::DUMMY)
            .expect("expected source to lex")
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    fn lex_err(source: &str) -> FatalError {
        lex(source, FileId::DUMMY).expect_err("expected a lexing error")
    }

    #[test]
    fn test_empty_input_is_just_eof() {
        assert_eq!(kinds(""), vec![TokenKind::Eof]);
        assert_eq!(kinds("   \n\t  "), vec![TokenKind::Eof]);
    }

    #[test]
    fn test_single_char_operators() {
        assert_eq!(
            kinds("+ * ^ % ; : , ( ) { } [ ]"),
            vec![
                TokenKind::OpPlus,
                TokenKind::OpMul,
                TokenKind::OpPow,
                TokenKind::OpMod,
                TokenKind::Semi,
                TokenKind::Colon,
                TokenKind::Comma,
                TokenKind::RoundL,
                TokenKind::RoundR,
                TokenKind::CurlyL,
                TokenKind::CurlyR,
                TokenKind::SquareL,
                TokenKind::SquareR,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_identifier_keyword_discrimination() {
        assert_eq!(
            kinds("fun funny int intx true truex"),
            vec![
                TokenKind::KwFun,
                TokenKind::Identifier,
                TokenKind::PrimitiveInt,
                TokenKind::Identifier,
                TokenKind::ConstantTrue,
                TokenKind::Identifier,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_identifier_lexeme_and_span() {
        let tokens = lex("  abc", FileId::DUMMY).unwrap();
        assert_eq!(tokens[0].kind, TokenKind::Identifier);
        assert_eq!(tokens[0].lexeme, "abc");
        assert_eq!(tokens[0].span.line, 1);
        assert_eq!(tokens[0].span.column, 3);
    }

    #[test]
    fn test_keywords_have_no_lexeme() {
        let tokens = lex("while", FileId::DUMMY).unwrap();
        assert_eq!(tokens[0].kind, TokenKind::KwWhile);
        assert_eq!(tokens[0].lexeme, "");
    }

    #[test]
    fn test_integer_literals() {
        let tokens = lex("0 7 123", FileId::DUMMY).unwrap();
        assert_eq!(tokens[0].lexeme, "0");
        assert_eq!(tokens[1].lexeme, "7");
        assert_eq!(tokens[2].lexeme, "123");
        assert!(tokens[..3].iter().all(|t| t.kind == TokenKind::LitInt));
    }

    #[test]
    fn test_leading_zero_is_an_error_at_the_zero() {
        let err = lex_err("0123");
        assert_eq!(err.message, "Multi digit integer cannot start with 0");
        assert_eq!(err.span.line, 1);
        assert_eq!(err.span.column, 1);
    }

    #[test]
    fn test_integer_with_invalid_prefix() {
        assert_eq!(lex_err("123abc").message, "Integer with invalid prefix");
        assert_eq!(lex_err("1_000").message, "Integer with invalid prefix");
    }

    #[test]
    fn test_float_forms() {
        for (source, lexeme) in [
            ("1.5", "1.5"),
            (".5", ".5"),
            ("2.", "2."),
            ("0.25", "0.25"),
            ("1e5", "1e5"),
            ("1E5", "1E5"),
            ("1.5e-3", "1.5e-3"),
            ("2e+10", "2e+10"),
        ] {
            let tokens = lex(source, FileId::DUMMY).unwrap();
            assert_eq!(tokens[0].kind, TokenKind::LitFloat, "source: {}", source);
            assert_eq!(tokens[0].lexeme, lexeme, "source: {}", source);
        }
    }

    #[test]
    fn test_float_exponent_errors() {
        assert_eq!(
            lex_err("1e").message,
            "After exponent has to follow number or sign"
        );
        assert_eq!(lex_err("1e+").message, "Exponent power is missing");
        assert_eq!(lex_err("1e+x").message, "Exponent power is missing");
    }

    #[test]
    fn test_dot_alone_is_access() {
        assert_eq!(
            kinds("a.b"),
            vec![
                TokenKind::Identifier,
                TokenKind::OpAccess,
                TokenKind::Identifier,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_string_literal_with_escapes() {
        let tokens = lex(r#""hi\n\t\" there""#, FileId::DUMMY).unwrap();
        assert_eq!(tokens[0].kind, TokenKind::LitStr);
        assert_eq!(tokens[0].lexeme, "hi\n\t\" there");
    }

    #[test]
    fn test_string_may_span_lines() {
        let tokens = lex("\"a\nb\"", FileId::DUMMY).unwrap();
        assert_eq!(tokens[0].lexeme, "a\nb");
    }

    #[test]
    fn test_unterminated_string() {
        assert_eq!(lex_err("\"abc").message, "Unterminated string");
    }

    #[test]
    fn test_bad_string_escape() {
        assert_eq!(
            lex_err(r#""a\q""#).message,
            "Unrecognized escaped character"
        );
    }

    #[test]
    fn test_char_literals() {
        let tokens = lex(r"'a' '\n' '\t' '\\' '\''", FileId::DUMMY).unwrap();
        let lexemes: Vec<&str> = tokens[..5].iter().map(|t| t.lexeme.as_str()).collect();
        assert_eq!(lexemes, vec!["a", "\n", "\t", "\\", "'"]);
        assert!(tokens[..5].iter().all(|t| t.kind == TokenKind::LitChar));
    }

    #[test]
    fn test_char_literal_errors() {
        assert_eq!(lex_err("''").message, "Empty char literal");
        assert_eq!(
            lex_err("'ab'").message,
            "Char literal must contain a single character"
        );
        assert_eq!(lex_err("'a").message, "Unterminated char literal");
    }

    #[test]
    fn test_unrecognised_token() {
        assert_eq!(lex_err("#").message, "Unrecognised token");
        assert_eq!(lex_err("fun @").message, "Unrecognised token");
    }

    #[test]
    fn test_missing_ampersand() {
        assert_eq!(lex_err("a & b").message, "Missing &");
    }

    #[test]
    fn test_line_and_column_tracking() {
        let tokens = lex("fun\n  main", FileId::DUMMY).unwrap();
        assert_eq!((tokens[0].span.line, tokens[0].span.column), (1, 1));
        assert_eq!((tokens[1].span.line, tokens[1].span.column), (2, 3));
    }

    #[test]
    fn test_eof_token_is_last() {
        let tokens = lex("1 + 2", FileId::DUMMY).unwrap();
        assert_eq!(tokens.last().unwrap().kind, TokenKind::Eof);
    }
}
