//! The bytecode writer: a growable byte buffer with forward-label
//! patching, a loop stack for `break`/`continue` targets, and the string
//! literal pool.

use f12c_ops::{codec, Op, OperandKind};
use f12c_util::{newtype_index, IndexVec};

newtype_index!(LabelId);

/// A label is either unresolved, remembering every 4-byte placeholder slot
/// written so far, or resolved to an absolute buffer offset.
#[derive(Debug)]
enum LabelState {
    Unresolved { pending: Vec<usize> },
    Resolved { offset: usize },
}

/// An operand passed to [`CodeWriter::write`]. Labels stand in for int
/// operands; unresolved ones leave a placeholder that `place_label`
/// patches later.
#[derive(Clone, Copy, Debug)]
pub enum Operand {
    Int(i32),
    Float(f64),
    Char(char),
    Bool(bool),
    Label(LabelId),
}

/// Owns the byte buffer being emitted into.
#[derive(Debug, Default)]
pub struct CodeWriter {
    code: Vec<u8>,
    labels: IndexVec<LabelId, LabelState>,
    loops: Vec<(LabelId, LabelId)>,
    strings: Vec<(LabelId, String)>,
}

impl CodeWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current buffer length, i.e. the offset the next write lands at.
    pub fn len(&self) -> usize {
        self.code.len()
    }

    pub fn is_empty(&self) -> bool {
        self.code.is_empty()
    }

    /// Allocate a fresh, unresolved label.
    pub fn new_label(&mut self) -> LabelId {
        self.labels.push(LabelState::Unresolved {
            pending: Vec::new(),
        })
    }

    /// Resolve a label to the current buffer offset and patch every
    /// placeholder written for it so far.
    ///
    /// # Panics
    ///
    /// Panics if the label was already placed; placing a label twice is an
    /// emitter bug.
    pub fn place_label(&mut self, label: LabelId) {
        let offset = self.code.len();
        let state = std::mem::replace(&mut self.labels[label], LabelState::Resolved { offset });
        match state {
            LabelState::Unresolved { pending } => {
                let bytes = codec::int_to_bytes(offset as i32);
                for position in pending {
                    self.code[position..position + bytes.len()].copy_from_slice(&bytes);
                }
            }
            LabelState::Resolved { .. } => panic!("label {:?} placed twice", label),
        }
    }

    /// The resolved offset of a label, if it has been placed.
    pub fn label_offset(&self, label: LabelId) -> Option<usize> {
        match self.labels[label] {
            LabelState::Resolved { offset } => Some(offset),
            LabelState::Unresolved { .. } => None,
        }
    }

    /// Enter a loop: `break` jumps to `end`, `continue` jumps to `start`.
    pub fn start_loop(&mut self, start: LabelId, end: LabelId) {
        self.loops.push((start, end));
    }

    pub fn end_loop(&mut self) {
        self.loops.pop();
    }

    /// The innermost active loop's `(start, end)` labels.
    ///
    /// # Panics
    ///
    /// Panics outside any loop; the analyzer rejects stray
    /// `break`/`continue` before emission.
    pub fn current_loop(&self) -> (LabelId, LabelId) {
        *self.loops.last().expect("break/continue outside a loop")
    }

    /// Intern a string literal into the pool, returning the label that
    /// will address it once the pool is placed.
    pub fn add_string(&mut self, text: impl Into<String>) -> LabelId {
        let label = self.new_label();
        self.strings.push((label, text.into()));
        label
    }

    /// Write one instruction with its operands.
    ///
    /// # Panics
    ///
    /// Panics when the operand count or kinds do not match the opcode's
    /// schema; that is an emitter bug, not an input error.
    pub fn write(&mut self, op: Op, operands: &[Operand]) {
        let schema = op.operands();
        if schema.len() != operands.len() {
            panic!(
                "invalid instruction {} operand count. Expected: {}, got: {}",
                op.name(),
                schema.len(),
                operands.len()
            );
        }

        self.code.extend_from_slice(&codec::op_code_to_bytes(op.code()));

        for (kind, operand) in schema.iter().zip(operands) {
            match (kind, operand) {
                (OperandKind::Int, Operand::Int(value)) => {
                    self.code.extend_from_slice(&codec::int_to_bytes(*value));
                }
                (OperandKind::Int, Operand::Label(label)) => self.write_label_slot(*label),
                (OperandKind::Float, Operand::Float(value)) => {
                    self.code.extend_from_slice(&codec::float_to_bytes(*value));
                }
                (OperandKind::Char, Operand::Char(value)) => {
                    self.code.push(codec::char_to_byte(*value));
                }
                (OperandKind::Bool, Operand::Bool(value)) => {
                    self.code.push(codec::bool_to_byte(*value));
                }
                (kind, operand) => panic!(
                    "invalid operand {:?} for {} (expected {:?})",
                    operand,
                    op.name(),
                    kind
                ),
            }
        }
    }

    fn write_label_slot(&mut self, label: LabelId) {
        match &mut self.labels[label] {
            LabelState::Resolved { offset } => {
                let bytes = codec::int_to_bytes(*offset as i32);
                self.code.extend_from_slice(&bytes);
            }
            LabelState::Unresolved { pending } => {
                pending.push(self.code.len());
                self.code.extend_from_slice(&codec::int_to_bytes(0));
            }
        }
    }

    /// Append the string pool: the static marker, then every interned
    /// string as a length-prefixed byte sequence, placing each string's
    /// label at its start. A program without string literals gets no
    /// marker.
    pub fn place_string_pool(&mut self) {
        if self.strings.is_empty() {
            return;
        }

        self.write(Op::MarkerStaticStart, &[]);
        let strings = std::mem::take(&mut self.strings);
        for (label, text) in strings {
            self.place_label(label);
            self.code.extend_from_slice(&codec::string_to_bytes(&text));
        }
    }

    /// Finish emission and hand over the buffer.
    ///
    /// # Panics
    ///
    /// Panics if any label with pending placeholders was never placed.
    pub fn finish(self) -> Vec<u8> {
        for (id, label) in self.labels.iter_enumerated() {
            if let LabelState::Unresolved { pending } = label {
                if !pending.is_empty() {
                    panic!("label {:?} has unpatched placeholders", id);
                }
            }
        }
        self.code
    }

    /// The buffer emitted so far.
    pub fn code(&self) -> &[u8] {
        &self.code
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use f12c_ops::codec::int_from_bytes;

    #[test]
    fn test_write_simple_instruction() {
        let mut writer = CodeWriter::new();
        writer.write(Op::PushInt, &[Operand::Int(42)]);

        let code = writer.finish();
        assert_eq!(code.len(), 6);
        assert_eq!(&code[..2], &codec::op_code_to_bytes(Op::PushInt.code()));
        assert_eq!(int_from_bytes(&code, 2), Ok((42, 6)));
    }

    #[test]
    fn test_forward_label_is_patched() {
        let mut writer = CodeWriter::new();
        let target = writer.new_label();

        writer.write(Op::Jmp, &[Operand::Label(target)]);
        writer.write(Op::PushInt, &[Operand::Int(1)]);
        writer.place_label(target);
        writer.write(Op::Exit, &[]);

        let code = writer.finish();
        // The jump slot holds the offset where the label was placed.
        let (slot, _) = int_from_bytes(&code, 2).unwrap();
        assert_eq!(slot as usize, 12);
    }

    #[test]
    fn test_backward_label_is_inlined() {
        let mut writer = CodeWriter::new();
        let target = writer.new_label();

        writer.place_label(target);
        writer.write(Op::PushInt, &[Operand::Int(1)]);
        writer.write(Op::Jmp, &[Operand::Label(target)]);

        let code = writer.finish();
        let (slot, _) = int_from_bytes(&code, 8).unwrap();
        assert_eq!(slot, 0);
    }

    #[test]
    fn test_label_patches_every_pending_site() {
        let mut writer = CodeWriter::new();
        let target = writer.new_label();

        writer.write(Op::Jz, &[Operand::Label(target)]);
        writer.write(Op::Jmp, &[Operand::Label(target)]);
        writer.place_label(target);

        let code = writer.finish();
        let (first, _) = int_from_bytes(&code, 2).unwrap();
        let (second, _) = int_from_bytes(&code, 8).unwrap();
        assert_eq!(first, 12);
        assert_eq!(second, 12);
    }

    #[test]
    #[should_panic(expected = "operand count")]
    fn test_operand_arity_mismatch_panics() {
        let mut writer = CodeWriter::new();
        writer.write(Op::PushInt, &[]);
    }

    #[test]
    #[should_panic(expected = "invalid operand")]
    fn test_operand_kind_mismatch_panics() {
        let mut writer = CodeWriter::new();
        writer.write(Op::PushInt, &[Operand::Float(1.0)]);
    }

    #[test]
    #[should_panic(expected = "unpatched placeholders")]
    fn test_unplaced_label_panics_at_finish() {
        let mut writer = CodeWriter::new();
        let label = writer.new_label();
        writer.write(Op::Jmp, &[Operand::Label(label)]);
        writer.finish();
    }

    #[test]
    fn test_loop_stack() {
        let mut writer = CodeWriter::new();
        let (outer_start, outer_end) = (writer.new_label(), writer.new_label());
        let (inner_start, inner_end) = (writer.new_label(), writer.new_label());

        writer.start_loop(outer_start, outer_end);
        writer.start_loop(inner_start, inner_end);
        assert_eq!(writer.current_loop(), (inner_start, inner_end));
        writer.end_loop();
        assert_eq!(writer.current_loop(), (outer_start, outer_end));
        writer.end_loop();
    }

    #[test]
    fn test_string_pool_layout() {
        let mut writer = CodeWriter::new();
        let label = writer.add_string("hey");
        writer.write(Op::PushInt, &[Operand::Label(label)]);
        writer.write(Op::Exit, &[]);
        writer.place_string_pool();

        let code = writer.finish();
        // PUSH_INT slot + EXIT, then the marker, then the string.
        let marker_at = 6 + 2;
        let (raw_op, _) = codec::op_code_from_bytes(&code, marker_at).unwrap();
        assert_eq!(raw_op, Op::MarkerStaticStart.code());

        let string_at = marker_at + 2;
        let (slot, _) = int_from_bytes(&code, 2).unwrap();
        assert_eq!(slot as usize, string_at);
        assert_eq!(
            codec::string_from_bytes(&code, string_at),
            Ok(("hey".to_string(), string_at + 4 + 3))
        );
    }

    #[test]
    fn test_no_marker_without_strings() {
        let mut writer = CodeWriter::new();
        writer.write(Op::Exit, &[]);
        writer.place_string_pool();
        assert_eq!(writer.finish().len(), 2);
    }
}
