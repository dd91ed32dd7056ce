//! Token model: kinds, the token itself, and the keyword / primitive-type /
//! constant / helper lookup tables.

use std::fmt;

use f12c_util::Span;

/// Every token shape the lexer can emit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TokenKind {
    Eof,

    // Literals. The token's lexeme holds the raw text (escapes already
    // decoded for strings and chars).
    LitStr,
    LitFloat,
    LitInt,
    LitChar,

    // Operators
    OpPlus,
    OpMinus,
    OpDiv,
    OpMul,
    OpPow,
    OpMod,
    OpNe,
    OpNot,
    OpEq,
    OpAssign,
    OpAnd,
    OpOr,
    OpLt,
    OpLe,
    OpGt,
    OpGe,
    OpAccess,

    // Delimiters
    Semi,
    Colon,
    Comma,
    RoundL,
    RoundR,
    CurlyL,
    CurlyR,
    SquareL,
    SquareR,
    Pipe,

    // Keywords and keyword-like sigils
    KwFatArrow,
    KwToStdout,
    KwFromStdin,
    KwFun,
    KwIf,
    KwRet,
    KwUnit,
    KwElse,
    KwWhile,
    KwConst,
    KwContinue,
    KwBreak,
    KwIn,
    KwNew,
    KwFree,

    // Primitive type names
    PrimitiveInt,
    PrimitiveFloat,
    PrimitiveString,
    PrimitiveBool,
    PrimitiveChar,
    PrimitiveVoid,

    // Built-in constants
    ConstantTrue,
    ConstantFalse,

    // Helpers (directives introduced with `>`)
    HelperInclude,

    Identifier,
}

impl TokenKind {
    /// True for tokens that can begin a type expression.
    pub fn is_type_start(self) -> bool {
        self.is_primitive_type() || self == TokenKind::Identifier
    }

    /// True for the primitive type name tokens.
    pub fn is_primitive_type(self) -> bool {
        matches!(
            self,
            TokenKind::PrimitiveInt
                | TokenKind::PrimitiveFloat
                | TokenKind::PrimitiveString
                | TokenKind::PrimitiveBool
                | TokenKind::PrimitiveChar
                | TokenKind::PrimitiveVoid
        )
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// A single lexed token.
///
/// The lexeme is meaningful only for identifiers and literals; for every
/// other kind it is empty.
#[derive(Clone, Debug, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
    pub lexeme: String,
}

impl Token {
    pub fn new(kind: TokenKind, span: Span, lexeme: impl Into<String>) -> Self {
        Self {
            kind,
            span,
            lexeme: lexeme.into(),
        }
    }

    /// A token with no lexeme.
    pub fn bare(kind: TokenKind, span: Span) -> Self {
        Self::new(kind, span, "")
    }
}

/// Keyword table: reserved word → token kind.
pub fn keyword_kind(word: &str) -> Option<TokenKind> {
    Some(match word {
        "fun" => TokenKind::KwFun,
        "if" => TokenKind::KwIf,
        "ret" => TokenKind::KwRet,
        "unit" => TokenKind::KwUnit,
        "else" => TokenKind::KwElse,
        "while" => TokenKind::KwWhile,
        "const" => TokenKind::KwConst,
        "continue" => TokenKind::KwContinue,
        "break" => TokenKind::KwBreak,
        "in" => TokenKind::KwIn,
        "new" => TokenKind::KwNew,
        "free" => TokenKind::KwFree,
        _ => return None,
    })
}

/// Primitive-type table: type name → token kind.
pub fn primitive_kind(word: &str) -> Option<TokenKind> {
    Some(match word {
        "int" => TokenKind::PrimitiveInt,
        "float" => TokenKind::PrimitiveFloat,
        "string" => TokenKind::PrimitiveString,
        "bool" => TokenKind::PrimitiveBool,
        "char" => TokenKind::PrimitiveChar,
        "void" => TokenKind::PrimitiveVoid,
        _ => return None,
    })
}

/// Constant table: literal word → token kind.
pub fn constant_kind(word: &str) -> Option<TokenKind> {
    Some(match word {
        "true" => TokenKind::ConstantTrue,
        "false" => TokenKind::ConstantFalse,
        _ => return None,
    })
}

/// Helper table: the names recognised after a `>` sigil.
pub fn helper_kind(word: &str) -> Option<TokenKind> {
    match word {
        "include" => Some(TokenKind::HelperInclude),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyword_table() {
        assert_eq!(keyword_kind("fun"), Some(TokenKind::KwFun));
        assert_eq!(keyword_kind("ret"), Some(TokenKind::KwRet));
        assert_eq!(keyword_kind("return"), None);
        assert_eq!(keyword_kind("main"), None);
    }

    #[test]
    fn test_primitive_table() {
        assert_eq!(primitive_kind("int"), Some(TokenKind::PrimitiveInt));
        assert_eq!(primitive_kind("void"), Some(TokenKind::PrimitiveVoid));
        assert_eq!(primitive_kind("str"), None);
    }

    #[test]
    fn test_constant_table() {
        assert_eq!(constant_kind("true"), Some(TokenKind::ConstantTrue));
        assert_eq!(constant_kind("false"), Some(TokenKind::ConstantFalse));
        assert_eq!(constant_kind("null"), None);
    }

    #[test]
    fn test_helper_table() {
        assert_eq!(helper_kind("include"), Some(TokenKind::HelperInclude));
        assert_eq!(helper_kind("import"), None);
    }

    #[test]
    fn test_type_start() {
        assert!(TokenKind::PrimitiveInt.is_type_start());
        assert!(TokenKind::Identifier.is_type_start());
        assert!(!TokenKind::KwFun.is_type_start());
    }
}
