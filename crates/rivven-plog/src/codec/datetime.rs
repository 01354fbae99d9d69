//! Date and timestamp decoding
//!
//! Layout after the 4-byte length prefix:
//!
//! ```text
//! [century+100] [year+100] [month] [day] [hour+1] [minute+1] [second+1]
//! [nanos: 4 BE]            (timestamps)
//! [tz hour+20] [tz min+60] (timestamps with time zone)
//! ```
//!
//! Buffers shorter than the seven date bytes decode to `None`.
//! Only UTC time zone bytes are supported. Any other offset is logged and
//! the value is still returned as UTC.

use super::{chunks_to_bytes, declared_length, LENGTH_PREFIX};
use crate::common::{PlogError, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use tracing::warn;

const DATE_BYTES: usize = 7;
const NANOS_BYTES: usize = 4;
const TZ_BYTES: usize = 2;
const MAX_NANOS: i32 = 999_999_999;

/// Time zone byte pair that denotes UTC
pub const UTC_TZ_HOUR: u8 = 20;
pub const UTC_TZ_MINUTE: u8 = 60;

/// Extract the payload of a date-like value, or `None` when it is too short.
fn date_payload(raw: &[i32]) -> Result<Option<Vec<u8>>> {
    let bytes = chunks_to_bytes(raw);
    if bytes.len() < LENGTH_PREFIX + DATE_BYTES {
        return Ok(None);
    }
    let len = declared_length(&bytes)?;
    if len < DATE_BYTES {
        return Ok(None);
    }
    Ok(Some(bytes[LENGTH_PREFIX..LENGTH_PREFIX + len].to_vec()))
}

fn decode_components(payload: &[u8], nanos: u32) -> Result<NaiveDateTime> {
    let century = payload[0] as i32 - 100;
    let year = payload[1] as i32 - 100;
    let month = payload[2] as u32;
    let day = payload[3] as u32;
    let hour = (payload[4] as u32).wrapping_sub(1);
    let minute = (payload[5] as u32).wrapping_sub(1);
    let second = (payload[6] as u32).wrapping_sub(1);

    NaiveDate::from_ymd_opt(century * 100 + year, month, day)
        .and_then(|d| d.and_hms_nano_opt(hour, minute, second, nanos))
        .ok_or_else(|| {
            PlogError::decode(format!(
                "invalid date bytes {:02X?}",
                &payload[..DATE_BYTES]
            ))
        })
}

fn decode_nanos(payload: &[u8]) -> u32 {
    if payload.len() < DATE_BYTES + NANOS_BYTES {
        return 0;
    }
    let field = &payload[DATE_BYTES..DATE_BYTES + NANOS_BYTES];
    let nanos = i32::from_be_bytes([field[0], field[1], field[2], field[3]]);
    nanos.clamp(0, MAX_NANOS) as u32
}

/// Decode a DATE value (second precision).
pub fn decode_date(raw: &[i32]) -> Result<Option<NaiveDateTime>> {
    let Some(payload) = date_payload(raw)? else {
        return Ok(None);
    };
    decode_components(&payload, 0).map(Some)
}

/// Decode a TIMESTAMP value with nanosecond precision.
pub fn decode_timestamp(raw: &[i32]) -> Result<Option<NaiveDateTime>> {
    let Some(payload) = date_payload(raw)? else {
        return Ok(None);
    };
    decode_components(&payload, decode_nanos(&payload)).map(Some)
}

/// Decode a TIMESTAMP WITH TIME ZONE value as a UTC instant.
pub fn decode_timestamp_tz(raw: &[i32]) -> Result<Option<DateTime<Utc>>> {
    let Some(payload) = date_payload(raw)? else {
        return Ok(None);
    };
    let nanos = if payload.len() >= DATE_BYTES + NANOS_BYTES + TZ_BYTES {
        decode_nanos(&payload)
    } else {
        0
    };
    if payload.len() >= DATE_BYTES + TZ_BYTES {
        let tz_hour = payload[payload.len() - 2];
        let tz_minute = payload[payload.len() - 1];
        if tz_hour != UTC_TZ_HOUR || tz_minute != UTC_TZ_MINUTE {
            warn!(
                "Unsupported time zone offset {:+}:{:02}, value interpreted as UTC",
                tz_hour as i32 - UTC_TZ_HOUR as i32,
                (tz_minute as i32 - UTC_TZ_MINUTE as i32).abs()
            );
        }
    }
    let local = decode_components(&payload, nanos)?;
    Ok(Some(local.and_utc()))
}
