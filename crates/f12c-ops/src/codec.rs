//! Byte codec for the primitive value representations.
//!
//! Ints (and everything int-sized: opcodes excepted, addresses, slots,
//! sizes, jump targets) are big-endian; floats are little-endian IEEE-754
//! doubles; chars and bools are single bytes; strings are an int length
//! prefix followed by raw UTF-8 bytes.

use crate::DecodeError;
use f12c_util::sizes;

/// Encode an opcode.
pub fn op_code_to_bytes(code: u16) -> [u8; sizes::OP_CODE] {
    code.to_be_bytes()
}

/// Decode an opcode, returning it and the offset just past it.
pub fn op_code_from_bytes(code: &[u8], offset: usize) -> Result<(u16, usize), DecodeError> {
    let bytes = slice(code, offset, sizes::OP_CODE)?;
    Ok((
        u16::from_be_bytes([bytes[0], bytes[1]]),
        offset + sizes::OP_CODE,
    ))
}

/// Encode an `int`.
pub fn int_to_bytes(value: i32) -> [u8; sizes::INT] {
    value.to_be_bytes()
}

/// Decode an `int`, returning it and the offset just past it.
pub fn int_from_bytes(code: &[u8], offset: usize) -> Result<(i32, usize), DecodeError> {
    let bytes = slice(code, offset, sizes::INT)?;
    Ok((
        i32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]),
        offset + sizes::INT,
    ))
}

/// Encode a `float`.
pub fn float_to_bytes(value: f64) -> [u8; sizes::FLOAT] {
    value.to_le_bytes()
}

/// Decode a `float`, returning it and the offset just past it.
pub fn float_from_bytes(code: &[u8], offset: usize) -> Result<(f64, usize), DecodeError> {
    let bytes = slice(code, offset, sizes::FLOAT)?;
    let mut raw = [0u8; sizes::FLOAT];
    raw.copy_from_slice(bytes);
    Ok((f64::from_le_bytes(raw), offset + sizes::FLOAT))
}

/// Encode a `char`. The language's chars are single-byte; anything wider
/// is truncated to its low byte.
pub fn char_to_byte(value: char) -> u8 {
    value as u32 as u8
}

/// Decode a `char`, returning it and the offset just past it.
pub fn char_from_bytes(code: &[u8], offset: usize) -> Result<(char, usize), DecodeError> {
    let bytes = slice(code, offset, sizes::CHAR)?;
    Ok((bytes[0] as char, offset + sizes::CHAR))
}

/// Encode a `bool` as 0 or 1.
pub fn bool_to_byte(value: bool) -> u8 {
    u8::from(value)
}

/// Decode a `bool`, returning it and the offset just past it.
pub fn bool_from_bytes(code: &[u8], offset: usize) -> Result<(bool, usize), DecodeError> {
    let bytes = slice(code, offset, sizes::BOOL)?;
    Ok((bytes[0] != 0, offset + sizes::BOOL))
}

/// Encode a string as an int length prefix plus UTF-8 bytes.
pub fn string_to_bytes(value: &str) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(sizes::INT + value.len());
    bytes.extend_from_slice(&int_to_bytes(value.len() as i32));
    bytes.extend_from_slice(value.as_bytes());
    bytes
}

/// Decode a length-prefixed string, returning it and the offset just past
/// it.
pub fn string_from_bytes(code: &[u8], offset: usize) -> Result<(String, usize), DecodeError> {
    let (length, offset) = int_from_bytes(code, offset)?;
    if length < 0 {
        return Err(DecodeError::MalformedString { offset });
    }
    let bytes = slice(code, offset, length as usize)?;
    let text = std::str::from_utf8(bytes)
        .map_err(|_| DecodeError::MalformedString { offset })?
        .to_string();
    Ok((text, offset + length as usize))
}

fn slice(code: &[u8], offset: usize, len: usize) -> Result<&[u8], DecodeError> {
    code.get(offset..offset + len)
        .ok_or(DecodeError::UnexpectedEnd { offset })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_int_is_big_endian() {
        assert_eq!(int_to_bytes(1), [0, 0, 0, 1]);
        assert_eq!(int_to_bytes(0x0102_0304), [1, 2, 3, 4]);
        assert_eq!(int_to_bytes(-1), [0xFF, 0xFF, 0xFF, 0xFF]);
    }

    #[test]
    fn test_int_round_trip() {
        for value in [0, 1, -1, 42, i32::MAX, i32::MIN] {
            let bytes = int_to_bytes(value);
            assert_eq!(int_from_bytes(&bytes, 0), Ok((value, 4)));
        }
    }

    #[test]
    fn test_float_is_little_endian() {
        let bytes = float_to_bytes(1.0);
        assert_eq!(bytes, 1.0f64.to_le_bytes());
        assert_eq!(float_from_bytes(&bytes, 0), Ok((1.0, 8)));
    }

    #[test]
    fn test_float_round_trip() {
        for value in [0.0, -2.5, 3.141592653589793, 1e300, -1e-300] {
            let bytes = float_to_bytes(value);
            assert_eq!(float_from_bytes(&bytes, 0), Ok((value, 8)));
        }
    }

    #[test]
    fn test_char_and_bool() {
        assert_eq!(char_to_byte('a'), b'a');
        assert_eq!(char_from_bytes(&[b'z'], 0), Ok(('z', 1)));
        assert_eq!(bool_to_byte(true), 1);
        assert_eq!(bool_to_byte(false), 0);
        assert_eq!(bool_from_bytes(&[1], 0), Ok((true, 1)));
        assert_eq!(bool_from_bytes(&[0], 0), Ok((false, 1)));
    }

    #[test]
    fn test_string_round_trip() {
        let bytes = string_to_bytes("hello");
        assert_eq!(&bytes[..4], &[0, 0, 0, 5]);
        assert_eq!(&bytes[4..], b"hello");
        assert_eq!(string_from_bytes(&bytes, 0), Ok(("hello".to_string(), 9)));
    }

    #[test]
    fn test_empty_string() {
        let bytes = string_to_bytes("");
        assert_eq!(string_from_bytes(&bytes, 0), Ok((String::new(), 4)));
    }

    #[test]
    fn test_op_code_round_trip() {
        let bytes = op_code_to_bytes(0x40);
        assert_eq!(bytes, [0, 0x40]);
        assert_eq!(op_code_from_bytes(&bytes, 0), Ok((0x40, 2)));
    }

    #[test]
    fn test_truncated_reads_fail() {
        assert_eq!(
            int_from_bytes(&[0, 0], 0),
            Err(DecodeError::UnexpectedEnd { offset: 0 })
        );
        assert_eq!(
            float_from_bytes(&[0; 4], 0),
            Err(DecodeError::UnexpectedEnd { offset: 0 })
        );
        let mut truncated = string_to_bytes("hello");
        truncated.truncate(6);
        assert!(string_from_bytes(&truncated, 0).is_err());
    }

    #[test]
    fn test_reads_at_offset() {
        let mut buffer = vec![0xAA, 0xBB];
        buffer.extend_from_slice(&int_to_bytes(7));
        assert_eq!(int_from_bytes(&buffer, 2), Ok((7, 6)));
    }
}
