//! Binary value codec
//!
//! Stateless decoders that turn the raw chunk payload of a tag record
//! (`&[i32]`) into scalar and complex values, reproducing the source
//! database's internal encodings:
//!
//! - integers, longs and SCNs ([`decode_int`], [`decode_long`], [`decode_scn`])
//! - single-byte, UTF-8 and national strings ([`string`])
//! - packed exact numbers ([`number`])
//! - binary float/double ([`decode_binary_float`], [`decode_binary_double`])
//! - dates, timestamps and timestamps with time zone ([`datetime`])
//! - day-to-second and year-to-month intervals ([`interval`])
//! - RAW, CLOB and BLOB payloads ([`lob`])
//!
//! Every decoder first reassembles the chunks into a little-endian byte
//! buffer. Payloads that carry their own length start with a 4-byte
//! length prefix; the prefix is validated against the bytes actually
//! present and a short buffer is a [`PlogError::Decode`], never a silent
//! truncation.

pub mod datetime;
pub mod interval;
pub mod lob;
pub mod number;
pub mod string;

pub use datetime::*;
pub use interval::*;
pub use lob::*;
pub use number::*;
pub use string::*;

use crate::common::{PlogError, Result};
use bytes::{BufMut, BytesMut};

/// Size of one wire chunk in bytes
pub const CHUNK_SIZE: usize = 4;

/// Size of the length prefix carried by variable-length payloads
pub const LENGTH_PREFIX: usize = 4;

/// Reassemble chunks into their little-endian byte representation.
pub fn chunks_to_bytes(raw: &[i32]) -> BytesMut {
    let mut buf = BytesMut::with_capacity(raw.len() * CHUNK_SIZE);
    for chunk in raw {
        buf.put_i32_le(*chunk);
    }
    buf
}

/// Number of chunks needed to hold `bytes` bytes.
pub fn chunks_for_bytes(bytes: usize) -> usize {
    bytes.div_ceil(CHUNK_SIZE)
}

/// Decode a 32-bit integer from the first chunk.
pub fn decode_int(raw: &[i32]) -> Result<i32> {
    raw.first()
        .copied()
        .ok_or_else(|| PlogError::decode("insufficient chunks for int: need 1, have 0"))
}

/// Decode a 64-bit integer from the first two chunks (low word first).
pub fn decode_long(raw: &[i32]) -> Result<i64> {
    if raw.len() < 2 {
        return Err(PlogError::decode(format!(
            "insufficient chunks for long: need 2, have {}",
            raw.len()
        )));
    }
    let low = raw[0] as u32 as u64;
    let high = raw[1] as u32 as u64;
    Ok(((high << 32) | low) as i64)
}

/// Decode a system change number.
///
/// SCNs travel as longs and are never negative on the source side.
pub fn decode_scn(raw: &[i32]) -> Result<u64> {
    Ok(decode_long(raw)? as u64)
}

/// Decode an order-preserving binary float (length-prefixed, big-endian).
pub fn decode_binary_float(raw: &[i32]) -> Result<Option<f32>> {
    let Some(bytes) = length_prefixed(raw)? else {
        return Ok(None);
    };
    let arr: [u8; 4] = bytes
        .as_slice()
        .try_into()
        .map_err(|_| PlogError::decode(format!("binary float needs 4 bytes, got {}", bytes.len())))?;
    let bits = u32::from_be_bytes(arr);
    let bits = if bits & 0x8000_0000 != 0 {
        bits & 0x7FFF_FFFF
    } else {
        !bits
    };
    Ok(Some(f32::from_bits(bits)))
}

/// Decode an order-preserving binary double (length-prefixed, big-endian).
pub fn decode_binary_double(raw: &[i32]) -> Result<Option<f64>> {
    let Some(bytes) = length_prefixed(raw)? else {
        return Ok(None);
    };
    let arr: [u8; 8] = bytes.as_slice().try_into().map_err(|_| {
        PlogError::decode(format!("binary double needs 8 bytes, got {}", bytes.len()))
    })?;
    let bits = u64::from_be_bytes(arr);
    let bits = if bits & 0x8000_0000_0000_0000 != 0 {
        bits & 0x7FFF_FFFF_FFFF_FFFF
    } else {
        !bits
    };
    Ok(Some(f64::from_bits(bits)))
}

/// Split a length-prefixed payload into its declared bytes.
///
/// Returns `None` for a zero length (SQL NULL for most types).
pub(crate) fn length_prefixed(raw: &[i32]) -> Result<Option<Vec<u8>>> {
    let bytes = chunks_to_bytes(raw);
    let len = declared_length(&bytes)?;
    if len == 0 {
        return Ok(None);
    }
    Ok(Some(bytes[LENGTH_PREFIX..LENGTH_PREFIX + len].to_vec()))
}

/// Read and validate the 4-byte length prefix of a payload buffer.
pub(crate) fn declared_length(bytes: &[u8]) -> Result<usize> {
    if bytes.len() < LENGTH_PREFIX {
        return Err(PlogError::decode(format!(
            "insufficient bytes for length prefix: need {}, have {}",
            LENGTH_PREFIX,
            bytes.len()
        )));
    }
    let declared = i32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
    if declared < 0 {
        return Err(PlogError::decode(format!(
            "invalid length field: {}",
            declared
        )));
    }
    let len = declared as usize;
    let available = bytes.len() - LENGTH_PREFIX;
    if len > available {
        return Err(PlogError::decode(format!(
            "invalid length field: declared {} bytes, only {} available",
            len, available
        )));
    }
    Ok(len)
}

#[cfg(test)]
pub(crate) mod test_util {
    use super::*;

    /// Frame bytes as a length-prefixed chunk payload.
    pub fn framed(bytes: &[u8]) -> Vec<i32> {
        let mut buf = Vec::with_capacity(LENGTH_PREFIX + bytes.len() + CHUNK_SIZE);
        buf.extend_from_slice(&(bytes.len() as i32).to_le_bytes());
        buf.extend_from_slice(bytes);
        while buf.len() % CHUNK_SIZE != 0 {
            buf.push(0);
        }
        buf.chunks(CHUNK_SIZE)
            .map(|c| i32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect()
    }
}
