//! f12c-gen - Bytecode Emitter
//!
//! Lowers an analyzed AST to the flat bytecode buffer the VM executes.
//! The [`CodeWriter`] owns the buffer, the label table, the loop stack for
//! `break`/`continue` targets and the string literal pool;
//! [`emit_program`] walks the AST in program-layout order and drives it.
//!
//! Control-flow lowering:
//!
//! ```text
//! if cond { A } else { B }      while cond { body }
//! ---------------------         -------------------
//!     <cond>                    start:
//!     JZ else                       <cond>
//!     <A>                           JZ end
//!     JMP end                       <body>
//! else:                             JMP start
//!     <B>                       end:
//! end:
//! ```
//!
//! Calls emit `FN_CALL_BEGIN` (three saved-register slots), the arguments
//! left to right, then `FN_CALL target args_bytes`. Assignments duplicate
//! the stored value with `POP_PUSH_N size 2` so the assignment expression
//! leaves its value behind.

mod emit;
pub mod writer;

pub use emit::emit_program;
pub use writer::{CodeWriter, LabelId, Operand};
