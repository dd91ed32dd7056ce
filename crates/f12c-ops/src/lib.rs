//! f12c-ops - Instruction Set, Byte Codec and Disassembler
//!
//! The bytecode format, shared by the emitter ([`f12c-gen`]) and the
//! virtual machine ([`f12c-vm`]):
//!
//! - an instruction is a 2-byte big-endian opcode followed by its operands;
//! - every opcode has a fixed operand schema ([`Op::operands`]), consulted
//!   by the emitter when writing and by the disassembler and VM when
//!   reading;
//! - `int` operands are 4-byte signed big-endian, `float` operands 8-byte
//!   IEEE-754 little-endian, `char` and `bool` one byte;
//! - after the [`Op::MarkerStaticStart`] sentinel the buffer holds the
//!   string pool: length-prefixed UTF-8 strings at label-addressed offsets.

pub mod codec;
pub mod disasm;
mod op;

pub use disasm::{disassemble, reassemble, Disassembly, Instr, Operand};
pub use op::{Op, OperandKind};

use thiserror::Error;

/// Errors produced while decoding a bytecode buffer.
#[derive(Debug, Error, PartialEq)]
pub enum DecodeError {
    /// The buffer ended in the middle of an instruction or value.
    #[error("Unexpected end of code at offset {offset}")]
    UnexpectedEnd { offset: usize },

    /// The two bytes at `offset` are not a known opcode.
    #[error("OP code does not exist: 0x{code:x} at offset {offset}")]
    UnknownOpCode { code: u16, offset: usize },

    /// A length-prefixed string had a negative length or invalid UTF-8.
    #[error("Malformed string at offset {offset}")]
    MalformedString { offset: usize },
}
