//! RAW and large object decoding
//!
//! LOB payloads are length-prefixed like every other variable-length
//! value, but the usable length is reconciled against the LOB length the
//! record reports separately (see [`reconcile_lob_length`]).

use super::{chunks_to_bytes, declared_length, length_prefixed, LENGTH_PREFIX};
use super::string::decode_national_bytes;
use crate::common::Result;
use bytes::Bytes;
use tracing::trace;

/// Decode a RAW value into an opaque byte buffer.
pub fn decode_raw(raw: &[i32]) -> Result<Option<Bytes>> {
    if raw.is_empty() {
        return Ok(None);
    }
    Ok(length_prefixed(raw)?.map(Bytes::from))
}

/// Reconcile a decoded LOB byte length with the externally reported one.
///
/// Equal lengths and an even external length whose half equals the raw
/// length (two bytes per character) both keep the raw length. Any other
/// mismatch also keeps the raw length; the payload is never cut down to
/// the external figure.
pub fn reconcile_lob_length(raw_len: usize, external: Option<usize>) -> usize {
    match external {
        Some(ext) if ext == raw_len => raw_len,
        Some(ext) if ext % 2 == 0 && ext / 2 == raw_len => raw_len,
        Some(ext) => {
            trace!("LOB length mismatch: raw={}, external={}", raw_len, ext);
            raw_len
        }
        None => raw_len,
    }
}

fn lob_payload(raw: &[i32], lob_length: Option<usize>) -> Result<Option<Vec<u8>>> {
    if raw.is_empty() {
        return Ok(None);
    }
    let bytes = chunks_to_bytes(raw);
    let len = declared_length(&bytes)?;
    let usable = reconcile_lob_length(len, lob_length);
    Ok(Some(bytes[LENGTH_PREFIX..LENGTH_PREFIX + usable].to_vec()))
}

/// Decode a CLOB. An empty chunk sequence is NULL; a zero length is `""`.
pub fn decode_clob(raw: &[i32], lob_length: Option<usize>) -> Result<Option<String>> {
    match lob_payload(raw, lob_length)? {
        Some(bytes) => decode_national_bytes(&bytes).map(Some),
        None => Ok(None),
    }
}

/// Decode a BLOB. An empty chunk sequence is NULL; a zero length is empty.
pub fn decode_blob(raw: &[i32], lob_length: Option<usize>) -> Result<Option<Bytes>> {
    Ok(lob_payload(raw, lob_length)?.map(Bytes::from))
}
