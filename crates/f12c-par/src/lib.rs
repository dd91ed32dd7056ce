//! f12c-par - Parser (Syntactic Analyzer)
//!
//! A recursive-descent parser over the token stream. One function per
//! grammar rule; expressions use a ten-level precedence ladder:
//!
//! ```text
//! 10  assignment              right-assoc, LHS must be assignable
//!  9  ||
//!  8  &&
//!  7  == !=
//!  6  < <= > >=               non-associative (single comparison)
//!  5  + -
//!  4  * / %
//!  3  unary + - !
//!  2  ^                       right-assoc
//!  1  postfix [index] .field  only after assignable expressions
//!  0  primary
//! ```
//!
//! The parser allocates nodes into a caller-supplied [`Ast`] arena so that
//! included files (parsed later, by the include resolver) share the same
//! arena as the including program. Lookahead is a single token, except for
//! the `type[][] name` local-declaration check which scans ahead over `[]`
//! pairs.
//!
//! Parse errors are fatal: the first one aborts with a [`FatalError`]
//! carrying the offending token's position.

pub mod ast;
mod edge_cases;
mod expr;
mod items;
mod stmt;
pub mod types;

pub use ast::{
    Ast, BinOp, Block, Builtin, Decl, DeclId, ElseClause, Expr, ExprId, FunDecl, FunParam,
    Program, RootElem, Stmt, StmtId, UnOp, UnitArg, UnitDecl, UnitField, VarDecl,
};
pub use types::{types_match, Prim, Ty};

use f12c_lex::{Token, TokenKind};
use f12c_util::{FatalError, FatalResult, Phase, Span};

/// Parse a full token stream into a fresh program.
pub fn parse(tokens: Vec<Token>) -> FatalResult<Program> {
    let mut ast = Ast::new();
    let elements = parse_into(tokens, &mut ast)?;
    Ok(Program { ast, elements })
}

/// Parse a token stream into an existing arena, returning the top-level
/// elements. Used by the include resolver to splice files together.
pub fn parse_into(tokens: Vec<Token>, ast: &mut Ast) -> FatalResult<Vec<RootElem>> {
    Parser::new(tokens, ast).parse()
}

/// Recursive-descent parser state: the token stream and a cursor into it.
pub struct Parser<'a> {
    tokens: Vec<Token>,
    offset: usize,
    pub(crate) ast: &'a mut Ast,
}

impl<'a> Parser<'a> {
    /// Create a parser over a token stream ending in `Eof`.
    pub fn new(tokens: Vec<Token>, ast: &'a mut Ast) -> Self {
        debug_assert!(matches!(
            tokens.last().map(|t| t.kind),
            Some(TokenKind::Eof)
        ));
        Self {
            tokens,
            offset: 0,
            ast,
        }
    }

    /// Parse the whole stream into top-level elements.
    pub fn parse(mut self) -> FatalResult<Vec<RootElem>> {
        let mut elements = Vec::new();
        while self.accept(TokenKind::Eof).is_none() {
            elements.push(self.parse_root_elem()?);
        }
        Ok(elements)
    }

    // ---- token stream helpers ----

    /// The token `lookahead` positions ahead (0 = current). Clamps to the
    /// trailing `Eof`.
    pub(crate) fn peek(&self, lookahead: usize) -> &Token {
        self.tokens
            .get(self.offset + lookahead)
            .unwrap_or_else(|| self.tokens.last().expect("token stream ends with Eof"))
    }

    pub(crate) fn next_kind(&self) -> TokenKind {
        self.peek(0).kind
    }

    pub(crate) fn next_kind_at(&self, lookahead: usize) -> TokenKind {
        self.peek(lookahead).kind
    }

    /// Consume and return the current token if it has the given kind.
    pub(crate) fn accept(&mut self, kind: TokenKind) -> Option<Token> {
        if self.peek(0).kind == kind {
            Some(self.bump())
        } else {
            None
        }
    }

    /// Consume the current token, failing with `<what> expected` if it does
    /// not have the given kind.
    pub(crate) fn expect(&mut self, kind: TokenKind, what: &str) -> FatalResult<Token> {
        match self.accept(kind) {
            Some(token) => Ok(token),
            None => {
                let token = self.peek(0).clone();
                Err(self.error(format!("{} expected", what), token.span))
            }
        }
    }

    /// Consume and return the current token unconditionally.
    pub(crate) fn bump(&mut self) -> Token {
        let token = self.peek(0).clone();
        if self.offset < self.tokens.len() {
            self.offset += 1;
        }
        token
    }

    pub(crate) fn error(&self, message: impl Into<String>, span: Span) -> FatalError {
        FatalError::new(Phase::Parsing, message, span)
    }
}
