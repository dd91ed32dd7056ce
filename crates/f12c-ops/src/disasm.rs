//! Disassembler.
//!
//! Walks a bytecode buffer into instruction rows using the same operand
//! schemas the emitter wrote with. At the `MARKER_STATIC_START` sentinel
//! the remainder of the buffer is the string pool and is decoded as
//! length-prefixed strings. Re-encoding a disassembly yields the original
//! buffer byte for byte.

use std::fmt;

use crate::codec;
use crate::{DecodeError, Op, OperandKind};

/// A decoded operand value.
#[derive(Clone, Debug, PartialEq)]
pub enum Operand {
    Int(i32),
    Float(f64),
    Char(char),
    Bool(bool),
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Int(value) => write!(f, "{}", value),
            Operand::Float(value) => write!(f, "{}", value),
            Operand::Char('\n') => write!(f, "\\n"),
            Operand::Char(value) => write!(f, "{}", value),
            Operand::Bool(value) => write!(f, "{}", value),
        }
    }
}

/// One decoded instruction.
#[derive(Clone, Debug, PartialEq)]
pub struct Instr {
    pub offset: usize,
    pub op: Op,
    pub operands: Vec<Operand>,
}

/// A fully decoded buffer: executable instructions plus the string pool.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Disassembly {
    pub instrs: Vec<Instr>,
    /// `(offset, text)` rows of the static string pool.
    pub strings: Vec<(usize, String)>,
}

/// Decode a whole bytecode buffer.
pub fn disassemble(code: &[u8]) -> Result<Disassembly, DecodeError> {
    let mut result = Disassembly::default();
    let mut offset = 0;

    while offset < code.len() {
        let start = offset;
        let (raw, next) = codec::op_code_from_bytes(code, offset)?;
        offset = next;

        let op = Op::from_code(raw).ok_or(DecodeError::UnknownOpCode {
            code: raw,
            offset: start,
        })?;

        if op == Op::MarkerStaticStart {
            result.instrs.push(Instr {
                offset: start,
                op,
                operands: Vec::new(),
            });
            offset = read_string_pool(code, offset, &mut result)?;
            break;
        }

        let mut operands = Vec::with_capacity(op.operands().len());
        for kind in op.operands() {
            let operand = match kind {
                OperandKind::Int => {
                    let (value, next) = codec::int_from_bytes(code, offset)?;
                    offset = next;
                    Operand::Int(value)
                }
                OperandKind::Float => {
                    let (value, next) = codec::float_from_bytes(code, offset)?;
                    offset = next;
                    Operand::Float(value)
                }
                OperandKind::Char => {
                    let (value, next) = codec::char_from_bytes(code, offset)?;
                    offset = next;
                    Operand::Char(value)
                }
                OperandKind::Bool => {
                    let (value, next) = codec::bool_from_bytes(code, offset)?;
                    offset = next;
                    Operand::Bool(value)
                }
            };
            operands.push(operand);
        }

        result.instrs.push(Instr {
            offset: start,
            op,
            operands,
        });
    }

    Ok(result)
}

fn read_string_pool(
    code: &[u8],
    mut offset: usize,
    result: &mut Disassembly,
) -> Result<usize, DecodeError> {
    while offset < code.len() {
        let start = offset;
        let (text, next) = codec::string_from_bytes(code, offset)?;
        result.strings.push((start, text));
        offset = next;
    }
    Ok(offset)
}

/// Re-encode a disassembly into bytes. For any buffer produced by the
/// emitter, `reassemble(&disassemble(code)?) == code`.
pub fn reassemble(disassembly: &Disassembly) -> Vec<u8> {
    let mut code = Vec::new();

    for instr in &disassembly.instrs {
        code.extend_from_slice(&codec::op_code_to_bytes(instr.op.code()));
        for operand in &instr.operands {
            match operand {
                Operand::Int(value) => code.extend_from_slice(&codec::int_to_bytes(*value)),
                Operand::Float(value) => code.extend_from_slice(&codec::float_to_bytes(*value)),
                Operand::Char(value) => code.push(codec::char_to_byte(*value)),
                Operand::Bool(value) => code.push(codec::bool_to_byte(*value)),
            }
        }
    }

    for (_, text) in &disassembly.strings {
        code.extend_from_slice(&codec::string_to_bytes(text));
    }

    code
}

impl fmt::Display for Disassembly {
    /// The listing format: a fixed-width table of instructions, then the
    /// static strings section.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Offset | Op code | {:>25} |  Operands", "Instruction")?;
        for instr in &self.instrs {
            let operands = instr
                .operands
                .iter()
                .map(|op| op.to_string())
                .collect::<Vec<_>>()
                .join(", ");
            writeln!(
                f,
                "{:6}      0x{:x} {:>27}    {}",
                instr.offset,
                instr.op.code(),
                instr.op.name(),
                operands
            )?;
        }

        if !self.strings.is_empty() {
            writeln!(f, "\n{} STATIC STRINGS {}", "*".repeat(20), "*".repeat(20))?;
            for (offset, text) in &self.strings {
                writeln!(f, "{:6}      {}", offset, text.escape_default())?;
            }
        }

        Ok(())
    }
}


#[cfg(test)]
mod property_tests {
    use super::*;
    use crate::op::ALL_OPS;
    use proptest::prelude::*;

    fn instr_strategy() -> impl Strategy<Value = (usize, Vec<Operand>)> {
        // Pick an op (by index) that is not the static marker, then build
        // operands matching its schema.
        (0..ALL_OPS.len()).prop_flat_map(|index| {
            let op = ALL_OPS[index];
            let operand_strategies: Vec<BoxedStrategy<Operand>> = op
                .operands()
                .iter()
                .map(|kind| match kind {
                    OperandKind::Int => any::<i32>().prop_map(Operand::Int).boxed(),
                    OperandKind::Float => {
                        prop_oneof![Just(0.0f64), Just(1.5), Just(-2.25), Just(1e10)]
                            .prop_map(Operand::Float)
                            .boxed()
                    }
                    OperandKind::Char => {
                        (0u8..128).prop_map(|b| Operand::Char(b as char)).boxed()
                    }
                    OperandKind::Bool => any::<bool>().prop_map(Operand::Bool).boxed(),
                })
                .collect();
            (Just(index), operand_strategies)
        })
    }

    proptest! {
        /// Any instruction sequence (followed by an optional string pool)
        /// survives a disassemble/reassemble round trip byte for byte.
        #[test]
        fn round_trip(
            instrs in prop::collection::vec(instr_strategy(), 0..12),
            strings in prop::collection::vec("[a-z]{0,8}", 0..3),
        ) {
            let mut code = Vec::new();
            for (index, operands) in &instrs {
                let op = ALL_OPS[*index];
                if op == Op::MarkerStaticStart {
                    continue;
                }
                code.extend_from_slice(&crate::codec::op_code_to_bytes(op.code()));
                for operand in operands {
                    match operand {
                        Operand::Int(v) => {
                            code.extend_from_slice(&crate::codec::int_to_bytes(*v))
                        }
                        Operand::Float(v) => {
                            code.extend_from_slice(&crate::codec::float_to_bytes(*v))
                        }
                        Operand::Char(v) => code.push(crate::codec::char_to_byte(*v)),
                        Operand::Bool(v) => code.push(crate::codec::bool_to_byte(*v)),
                    }
                }
            }
            if !strings.is_empty() {
                code.extend_from_slice(&crate::codec::op_code_to_bytes(
                    Op::MarkerStaticStart.code(),
                ));
                for text in &strings {
                    code.extend_from_slice(&crate::codec::string_to_bytes(text));
                }
            }

            let disassembly = disassemble(&code).unwrap();
            prop_assert_eq!(reassemble(&disassembly), code);
        }
    }
}
