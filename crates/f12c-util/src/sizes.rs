//! Byte sizes of the language's value representations.
//!
//! These are shared by the type layer (slot assignment), the byte codec,
//! the emitter and the VM. Changing one of them changes the bytecode
//! format.

/// `int` operands and values: 4 bytes, signed, big-endian.
pub const INT: usize = 4;
/// `float` values: 8 bytes, IEEE-754 double, little-endian.
pub const FLOAT: usize = 8;
/// `char` values: 1 byte.
pub const CHAR: usize = 1;
/// `bool` values: 1 byte, 0 or 1.
pub const BOOL: usize = 1;
/// Addresses (string values, arrays, units, heap pointers): int-sized.
pub const ADDRESS: usize = INT;
/// Opcodes: 2 bytes, big-endian.
pub const OP_CODE: usize = 2;
