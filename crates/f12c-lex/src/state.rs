//! Lexer state machine states.

/// The states of the lexing DFA.
///
/// `Start` is both the initial state and the state every completed token
/// returns to. The remaining states identify a partially recognised token;
/// the token buffer holds the characters accumulated so far.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LexState {
    Start,

    /// Inside a `"..."` literal.
    LitStr,
    /// Right after a `\` inside a string literal.
    LitStrEscape,

    /// Inside a `'.'` literal, before its character.
    LitChar,
    /// Right after a `\` inside a char literal.
    LitCharEscape,
    /// After the char literal's character, expecting the closing quote.
    LitCharEnd,

    /// Seen `-`; may become `--`, `-->` or a lone minus.
    OpMinus,
    /// Seen `--`; may become `-->` or two minuses.
    OpMinus2,

    /// Seen `/`; may start a comment or be a division.
    OpDiv,
    /// Seen `!`.
    OpNot,
    /// Seen `=`.
    OpAssign,
    /// Seen `&`.
    OpAnd,
    /// Seen `|`.
    OpOr,
    /// Seen `<`; may become `<=`, `<--` or a lone less-than.
    OpLt,

    /// Inside a `//` comment.
    SlComment,
    /// Inside a `/* ... */` comment.
    MlComment,
    /// Seen `*` inside a multiline comment.
    MlCommentEnd,

    /// Seen `<-`; one more `-` completes the from-stdin sigil.
    KwFromStdin,

    /// Seen `.`; may start a `.5`-style float or be a field access.
    OpAccess,

    /// Seen a leading `0`.
    LitIntFirstZero,
    /// Inside an integer literal.
    LitInt,
    /// Seen the `.` of a float, no fractional digits yet.
    LitFloatStart,
    /// Inside the fractional digits of a float.
    LitFloat,
    /// Seen the `e`/`E` of a float exponent.
    LitFloatExp,
    /// Seen the exponent sign, no exponent digits yet.
    LitFloatPreEnd,
    /// Inside the exponent digits.
    LitFloatEnd,

    /// Seen `>`; may become `>=`, a helper name, or a lone greater-than.
    OpGt,
    /// Accumulating letters after `>` for helper-name matching.
    AfterGt,

    /// Inside an identifier, keyword, type name or constant.
    Identifier,
}
