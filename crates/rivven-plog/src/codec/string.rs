//! Character string decoding
//!
//! Three framings exist on the wire:
//!
//! | Kind | Framing | Charset |
//! |------|---------|---------|
//! | fixed char | whole payload, NUL terminated | single byte |
//! | varchar | 4-byte length prefix | UTF-8 |
//! | national | 4-byte length prefix | UTF-8 or UTF-16BE |
//!
//! The format carries no charset flag for national strings, so the
//! encoding is guessed: a payload that is not valid UTF-8, or that decodes
//! to text with an embedded NUL, is treated as UTF-16BE.

use super::{chunks_to_bytes, length_prefixed};
use crate::common::{PlogError, Result};
use tracing::trace;

/// Decode a fixed-width single-byte string, truncated at the first NUL.
pub fn decode_fixed_string(raw: &[i32]) -> Result<String> {
    let bytes = chunks_to_bytes(raw);
    let end = bytes.iter().position(|b| *b == 0).unwrap_or(bytes.len());
    Ok(bytes[..end].iter().map(|b| *b as char).collect())
}

/// Decode a length-prefixed UTF-8 string.
///
/// An empty chunk sequence or a zero length is SQL NULL. The source
/// stores `''` as NULL, so an empty string never decodes as `Some("")`.
pub fn decode_string(raw: &[i32]) -> Result<Option<String>> {
    if raw.is_empty() {
        return Ok(None);
    }
    let Some(bytes) = length_prefixed(raw)? else {
        return Ok(None);
    };
    String::from_utf8(bytes)
        .map(Some)
        .map_err(|e| PlogError::decode(format!("unsupported encoding: {}", e)))
}

/// Decode a length-prefixed national character string.
pub fn decode_national_string(raw: &[i32]) -> Result<Option<String>> {
    if raw.is_empty() {
        return Ok(None);
    }
    let Some(bytes) = length_prefixed(raw)? else {
        return Ok(None);
    };
    decode_national_bytes(&bytes).map(Some)
}

/// Decode national character bytes using the UTF-8/UTF-16 heuristic.
pub(crate) fn decode_national_bytes(bytes: &[u8]) -> Result<String> {
    match std::str::from_utf8(bytes) {
        Ok(text) if !text.contains('\0') => Ok(text.to_string()),
        _ => {
            trace!("national string classified as UTF-16 ({} bytes)", bytes.len());
            decode_utf16_be(bytes)
        }
    }
}

fn decode_utf16_be(bytes: &[u8]) -> Result<String> {
    if bytes.len() % 2 != 0 {
        return Err(PlogError::decode(format!(
            "unsupported encoding: odd UTF-16 byte length {}",
            bytes.len()
        )));
    }
    let units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
        .collect();
    String::from_utf16(&units)
        .map_err(|e| PlogError::decode(format!("unsupported encoding: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::test_util::framed;

    fn utf16(text: &str) -> Vec<u8> {
        text.encode_utf16().flat_map(|u| u.to_be_bytes()).collect()
    }

    #[test]
    fn test_fixed_string_truncates_at_nul() {
        // "ABC\0" then garbage
        let raw = [0x0043_4241, 0x5A5A_5A5A];
        assert_eq!(decode_fixed_string(&raw).unwrap(), "ABC");
    }

    #[test]
    fn test_fixed_string_single_byte() {
        // 0xE9 is a single-byte e-acute
        let raw = [i32::from_le_bytes([b'c', b'a', b'f', 0xE9])];
        assert_eq!(decode_fixed_string(&raw).unwrap(), "caf\u{e9}");
        assert_eq!(decode_fixed_string(&[]).unwrap(), "");
    }

    #[test]
    fn test_decode_string() {
        let raw = framed("SOE.ORDERS".as_bytes());
        assert_eq!(decode_string(&raw).unwrap().as_deref(), Some("SOE.ORDERS"));
    }

    #[test]
    fn test_decode_string_idempotent() {
        let original = "Zürich – 東京";
        let first = decode_string(&framed(original.as_bytes())).unwrap().unwrap();
        assert_eq!(first, original);
        let second = decode_string(&framed(first.as_bytes())).unwrap().unwrap();
        assert_eq!(second, first);
    }

    #[test]
    fn test_decode_string_null() {
        assert_eq!(decode_string(&[]).unwrap(), None);
        assert_eq!(decode_string(&[0]).unwrap(), None);
    }

    #[test]
    fn test_empty_string_is_null() {
        assert_eq!(framed(b""), vec![0]);
        assert_eq!(decode_string(&framed(b"")).unwrap(), None);
        assert_eq!(decode_national_string(&framed(b"")).unwrap(), None);
    }

    #[test]
    fn test_decode_string_errors() {
        assert!(matches!(
            decode_string(&framed(&[0xFF, 0xFE, 0x41])),
            Err(PlogError::Decode(_))
        ));
        assert!(matches!(decode_string(&[40, 0]), Err(PlogError::Decode(_))));
    }

    #[test]
    fn test_national_string_utf8() {
        let raw = framed("naïve".as_bytes());
        assert_eq!(decode_national_string(&raw).unwrap().as_deref(), Some("naïve"));
    }

    #[test]
    fn test_national_string_utf16_with_nul() {
        // ASCII in UTF-16BE is valid UTF-8 but full of NULs
        let raw = framed(&utf16("HELLO"));
        assert_eq!(decode_national_string(&raw).unwrap().as_deref(), Some("HELLO"));
    }

    #[test]
    fn test_national_string_utf16_invalid_utf8() {
        let raw = framed(&utf16("東京"));
        assert_eq!(decode_national_string(&raw).unwrap().as_deref(), Some("東京"));
    }

    #[test]
    fn test_national_string_odd_utf16() {
        let raw = framed(&[0x00, 0x41, 0x00]);
        assert!(matches!(
            decode_national_string(&raw),
            Err(PlogError::Decode(_))
        ));
    }
}
