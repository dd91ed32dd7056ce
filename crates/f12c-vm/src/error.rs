//! Runtime errors.
//!
//! Any of these stops the machine: the run loop surfaces the error and
//! leaves the VM in its final state for inspection.

use f12c_ops::DecodeError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum VmError {
    #[error("OP code does not exist: 0x{code:x} at offset {offset}")]
    UnknownOpCode { code: u16, offset: usize },

    #[error("Division by zero")]
    DivisionByZero,

    #[error("Negative exponent in integer power")]
    NegativeExponent,

    #[error("Out of heap memory")]
    OutOfMemory,

    #[error("Stack overflow")]
    StackOverflow,

    #[error("Stack underflow")]
    StackUnderflow,

    #[error("Invalid memory address {address}")]
    InvalidAddress { address: i64 },

    #[error("Invalid free of address {address}")]
    InvalidFree { address: i64 },

    #[error("The program does not fit into VM memory")]
    ProgramTooLarge,

    #[error("Execution reached the static data marker at offset {offset}")]
    EnteredStaticData { offset: usize },

    #[error("Malformed instruction: {0}")]
    Decode(#[from] DecodeError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
