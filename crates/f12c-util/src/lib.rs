//! f12c-util - Core Utilities and Foundation Types
//!
//! This crate provides the foundation types shared by every phase of the
//! f12c compiler:
//!
//! - [`Span`] / [`FileId`] / [`SourceMap`] - source location tracking
//! - [`Diagnostic`] / [`Handler`] - error collection and rendering
//! - [`Idx`] / [`IndexVec`] - typed index vectors for arena-style storage
//! - [`FatalError`] - the single-error result carried out of the lexer and
//!   parser entry points
//!
//! Later phases (semantic analysis) accumulate any number of diagnostics in
//! a [`Handler`]; the lexer and parser stop at the first error and return it
//! as a [`FatalError`] instead.

pub mod diagnostic;
pub mod error;
pub mod index_vec;
pub mod sizes;
pub mod span;

pub use diagnostic::{Diagnostic, Handler, Level, Phase};
pub use error::{FatalError, FatalResult};
pub use index_vec::{Idx, IndexVec};
pub use span::{FileId, SourceMap, Span};
