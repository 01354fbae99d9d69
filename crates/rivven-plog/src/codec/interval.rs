//! Interval decoding
//!
//! Interval fields are big-endian and biased so that the encoded bytes
//! sort in value order: 32-bit counts carry `0x8000_0000`, single-byte
//! hour/minute/second/month fields carry `60`.

use super::length_prefixed;
use crate::common::{PlogError, Result};

const COUNT_BIAS: i64 = 0x8000_0000;
const FIELD_BIAS: i64 = 60;

/// Encoded size of an INTERVAL DAY TO SECOND
pub const INTERVAL_DS_BYTES: usize = 11;
/// Encoded size of an INTERVAL YEAR TO MONTH
pub const INTERVAL_YM_BYTES: usize = 5;

fn be_count(bytes: &[u8]) -> i64 {
    u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as i64 - COUNT_BIAS
}

fn interval_payload(raw: &[i32], expected: usize, kind: &str) -> Result<Option<Vec<u8>>> {
    if raw.is_empty() {
        return Ok(None);
    }
    let Some(bytes) = length_prefixed(raw)? else {
        return Ok(None);
    };
    if bytes.len() != expected {
        return Err(PlogError::decode(format!(
            "{} needs {} bytes, got {}",
            kind,
            expected,
            bytes.len()
        )));
    }
    Ok(Some(bytes))
}

/// Decode an INTERVAL DAY TO SECOND as `±D H:MM:SS.fffffffff`.
pub fn decode_interval_ds(raw: &[i32]) -> Result<Option<String>> {
    let Some(b) = interval_payload(raw, INTERVAL_DS_BYTES, "interval day to second")? else {
        return Ok(None);
    };
    let days = be_count(&b[0..4]);
    let hours = b[4] as i64 - FIELD_BIAS;
    let minutes = b[5] as i64 - FIELD_BIAS;
    let seconds = b[6] as i64 - FIELD_BIAS;
    let nanos = be_count(&b[7..11]);

    let negative = days < 0 || hours < 0 || minutes < 0 || seconds < 0 || nanos < 0;
    Ok(Some(format!(
        "{}{} {}:{:02}:{:02}.{:09}",
        if negative { '-' } else { '+' },
        days.abs(),
        hours.abs(),
        minutes.abs(),
        seconds.abs(),
        nanos.abs()
    )))
}

/// Decode an INTERVAL YEAR TO MONTH as `±Y-M`.
pub fn decode_interval_ym(raw: &[i32]) -> Result<Option<String>> {
    let Some(b) = interval_payload(raw, INTERVAL_YM_BYTES, "interval year to month")? else {
        return Ok(None);
    };
    let years = be_count(&b[0..4]);
    let months = b[4] as i64 - FIELD_BIAS;

    let negative = years < 0 || months < 0;
    Ok(Some(format!(
        "{}{}-{}",
        if negative { '-' } else { '+' },
        years.abs(),
        months.abs()
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::test_util::framed;

    fn ds(days: i64, h: i64, m: i64, s: i64, nanos: i64) -> Vec<i32> {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&((days + COUNT_BIAS) as u32).to_be_bytes());
        bytes.push((h + FIELD_BIAS) as u8);
        bytes.push((m + FIELD_BIAS) as u8);
        bytes.push((s + FIELD_BIAS) as u8);
        bytes.extend_from_slice(&((nanos + COUNT_BIAS) as u32).to_be_bytes());
        framed(&bytes)
    }

    fn ym(years: i64, months: i64) -> Vec<i32> {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&((years + COUNT_BIAS) as u32).to_be_bytes());
        bytes.push((months + FIELD_BIAS) as u8);
        framed(&bytes)
    }

    #[test]
    fn test_interval_ds_positive() {
        let value = decode_interval_ds(&ds(3, 4, 5, 6, 7_000_000)).unwrap();
        assert_eq!(value.as_deref(), Some("+3 4:05:06.007000000"));
    }

    #[test]
    fn test_interval_ds_negative() {
        let value = decode_interval_ds(&ds(-1, -2, -30, 0, -500)).unwrap();
        assert_eq!(value.as_deref(), Some("-1 2:30:00.000000500"));
    }

    #[test]
    fn test_interval_ds_zero() {
        let value = decode_interval_ds(&ds(0, 0, 0, 0, 0)).unwrap();
        assert_eq!(value.as_deref(), Some("+0 0:00:00.000000000"));
    }

    #[test]
    fn test_interval_ym() {
        assert_eq!(decode_interval_ym(&ym(2, 11)).unwrap().as_deref(), Some("+2-11"));
        assert_eq!(decode_interval_ym(&ym(-5, -3)).unwrap().as_deref(), Some("-5-3"));
    }

    #[test]
    fn test_interval_null_and_bad_length() {
        assert_eq!(decode_interval_ds(&[]).unwrap(), None);
        assert_eq!(decode_interval_ym(&[0]).unwrap(), None);
        assert!(matches!(
            decode_interval_ym(&framed(&[1, 2, 3])),
            Err(PlogError::Decode(_))
        ));
    }
}
