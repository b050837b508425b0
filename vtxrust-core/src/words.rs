//! 32-bit word payload helpers
//!
//! Several replies carry arrays of little-endian `u32`. They are decoded by
//! explicit 4-byte reads, so alignment and host endianness never matter.

use byteorder::{ByteOrder, LittleEndian};

use crate::error::{Error, Result};

/// Decode a byte buffer into little-endian 32-bit words
///
/// # Examples
///
/// ```
/// use vtxrust_core::words;
///
/// let words = words::decode_words(&[1, 0, 0, 0, 0xFF, 0, 0, 0]).unwrap();
/// assert_eq!(words, vec![1, 255]);
/// ```
pub fn decode_words(bytes: &[u8]) -> Result<Vec<u32>> {
    if bytes.len() % 4 != 0 {
        return Err(Error::MisalignedWords { len: bytes.len() });
    }

    let mut words = vec![0u32; bytes.len() / 4];
    LittleEndian::read_u32_into(bytes, &mut words);
    Ok(words)
}

/// Encode words as little-endian bytes
pub fn encode_words(words: &[u32]) -> Vec<u8> {
    let mut bytes = vec![0u8; words.len() * 4];
    LittleEndian::write_u32_into(words, &mut bytes);
    bytes
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_empty() {
        assert!(decode_words(&[]).unwrap().is_empty());
    }

    #[test]
    fn test_decode_little_endian() {
        let words = decode_words(&[0x78, 0x56, 0x34, 0x12, 0x01, 0x00, 0x00, 0x00]).unwrap();
        assert_eq!(words, vec![0x1234_5678, 1]);
    }

    #[test]
    fn test_decode_unaligned_slice() {
        // Start at an odd offset so the slice is not 4-byte aligned in memory
        let buf = [0xAA, 0x02, 0x00, 0x00, 0x00];
        assert_eq!(decode_words(&buf[1..]).unwrap(), vec![2]);
    }

    #[test]
    fn test_decode_misaligned_length() {
        let result = decode_words(&[1, 2, 3]);
        assert!(matches!(result, Err(Error::MisalignedWords { len: 3 })));
    }

    #[test]
    fn test_encode() {
        assert_eq!(encode_words(&[0x0A0B0C0D]), vec![0x0D, 0x0C, 0x0B, 0x0A]);
    }
}
