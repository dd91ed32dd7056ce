//! f12c-lex - Lexical Analyzer
//!
//! The lexer is a deterministic finite state machine driven one input
//! character at a time. Each state inspects the current character (or its
//! class: digit, letter, whitespace, a specific punctuation mark) and either
//! appends to the token buffer, transitions state, emits one or more tokens,
//! or fails with a lexing error. A virtual trailing space is fed after the
//! last real character so that terminal states flush their pending token.
//!
//! Tokenization is total: every accepted program produces a token stream
//! ending in [`TokenKind::Eof`]; every rejected program produces exactly one
//! fatal error. The error carries the source position and is rendered by the
//! driver with a three-line context window.
//!
//! ```
//! use f12c_lex::{lex, TokenKind};
//! use f12c_util::FileId;
//!
//! let tokens = lex("fun main { }", FileId::DUMMY).unwrap();
//! let kinds: Vec<_> = tokens.iter().map(|t| t.kind).collect();
//! assert_eq!(
//!     kinds,
//!     vec![
//!         TokenKind::KwFun,
//!         TokenKind::Identifier,
//!         TokenKind::CurlyL,
//!         TokenKind::CurlyR,
//!         TokenKind::Eof,
//!     ]
//! );
//! ```

mod edge_cases;
mod lexer;
mod state;
pub mod token;

pub use lexer::{lex, Lexer};
pub use state::LexState;
pub use token::{Token, TokenKind};
