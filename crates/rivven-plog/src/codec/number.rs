//! Packed exact numbers
//!
//! The source stores exact numerics as a length-prefixed byte string:
//!
//! ```text
//! [len: 4 LE] [exponent: 1] [digit pair: 1] ... [0x66 terminator, negatives only]
//! ```
//!
//! Each digit byte carries two decimal digits (base 100). Positive values
//! store `pair + 1` and an exponent byte of `0xC1 + shift`; negative values
//! store `101 - pair`, an exponent byte of `0x3E - shift` and usually a
//! trailing `0x66`. The magnitude is `0.<pairs> × 10^(2·shift + 2)`.
//! A lone `0x80` byte is zero.
//!
//! Values are rebuilt as decimal digit strings so no precision is lost
//! regardless of magnitude, then rounded half-down to the caller's scale.

use super::{chunks_to_bytes, declared_length, LENGTH_PREFIX};
use crate::common::{PlogError, Result};
use rust_decimal::Decimal;
use tracing::trace;

const ZERO_BYTE: u8 = 0x80;
const NEGATIVE_TERMINATOR: u8 = 0x66;
const POSITIVE_EXPONENT_BIAS: i32 = 0xC1;
const NEGATIVE_EXPONENT_BIAS: i32 = 0x3E;

/// Sign-magnitude decimal: `±0.d1d2d3… × 10^exponent`.
#[derive(Debug, Clone, PartialEq, Eq)]
struct PackedDecimal {
    negative: bool,
    /// Decimal digits 0..=9, most significant first
    digits: Vec<u8>,
    exponent: i32,
}

impl PackedDecimal {
    fn zero() -> Self {
        Self {
            negative: false,
            digits: Vec::new(),
            exponent: 0,
        }
    }

    fn parse(payload: &[u8]) -> Result<Self> {
        if payload.len() == 1 && payload[0] == ZERO_BYTE {
            return Ok(Self::zero());
        }

        let first = payload[0];
        let negative =
            payload[payload.len() - 1] == NEGATIVE_TERMINATOR || first < ZERO_BYTE;
        let end = if payload[payload.len() - 1] == NEGATIVE_TERMINATOR {
            payload.len() - 1
        } else {
            payload.len()
        };
        if end < 1 {
            return Err(PlogError::decode("packed number has no exponent byte"));
        }

        let shift = if negative {
            NEGATIVE_EXPONENT_BIAS - first as i32
        } else {
            first as i32 - POSITIVE_EXPONENT_BIAS
        };

        let mut digits = Vec::with_capacity((end - 1) * 2);
        for &b in &payload[1..end] {
            let pair = if negative {
                101 - b as i32
            } else {
                b as i32 - 1
            };
            if !(0..=99).contains(&pair) {
                return Err(PlogError::decode(format!(
                    "invalid packed number digit byte 0x{:02X}",
                    b
                )));
            }
            digits.push((pair / 10) as u8);
            digits.push((pair % 10) as u8);
        }

        let mut value = Self {
            negative,
            digits,
            exponent: 2 * shift + 2,
        };
        value.normalize();
        Ok(value)
    }

    /// Strip leading zeros (adjusting the exponent) and trailing zeros.
    fn normalize(&mut self) {
        let leading = self.digits.iter().take_while(|d| **d == 0).count();
        if leading == self.digits.len() {
            *self = Self::zero();
            return;
        }
        self.digits.drain(..leading);
        self.exponent -= leading as i32;
        while self.digits.last() == Some(&0) {
            self.digits.pop();
        }
    }

    /// Smallest scale that represents the value without rounding.
    fn natural_scale(&self) -> i32 {
        (self.digits.len() as i32 - self.exponent).max(0)
    }

    /// Round half-down to `scale` and render in plain notation.
    fn to_plain_string(&self, scale: i32) -> String {
        let unscaled = self.unscaled_digits(scale);
        let is_zero = unscaled.iter().all(|d| *d == 0);

        let mut text: String = unscaled.iter().map(|d| (b'0' + d) as char).collect();
        let trimmed = text.trim_start_matches('0').len();
        text = text.split_off(text.len() - trimmed);

        let mut out = String::with_capacity(text.len() + 3);
        if self.negative && !is_zero {
            out.push('-');
        }
        if scale > 0 {
            let scale = scale as usize;
            if text.len() <= scale {
                text = format!("{}{}", "0".repeat(scale + 1 - text.len()), text);
            }
            let point = text.len() - scale;
            out.push_str(&text[..point]);
            out.push('.');
            out.push_str(&text[point..]);
        } else {
            if text.is_empty() {
                text.push('0');
            } else {
                text.push_str(&"0".repeat((-scale) as usize));
            }
            out.push_str(&text);
        }
        out
    }

    /// Digits of `round_half_down(|value| × 10^scale)`.
    fn unscaled_digits(&self, scale: i32) -> Vec<u8> {
        let len = self.digits.len() as i32;
        let k = self.exponent - len + scale;
        if k >= 0 {
            let mut out = self.digits.clone();
            out.extend(std::iter::repeat(0).take(k as usize));
            return out;
        }

        let keep = len + k;
        if keep < 0 {
            // every digit sits below the first discarded position
            return Vec::new();
        }
        let keep = keep as usize;
        let mut out = self.digits[..keep].to_vec();
        let dropped = &self.digits[keep..];
        let round_up = match dropped.first() {
            Some(d) if *d > 5 => true,
            Some(5) => dropped[1..].iter().any(|d| *d != 0),
            _ => false,
        };
        if round_up {
            increment(&mut out);
        }
        out
    }
}

fn increment(digits: &mut Vec<u8>) {
    for d in digits.iter_mut().rev() {
        if *d == 9 {
            *d = 0;
        } else {
            *d += 1;
            return;
        }
    }
    digits.insert(0, 1);
}

fn parse_packed(raw: &[i32]) -> Result<Option<PackedDecimal>> {
    let bytes = chunks_to_bytes(raw);
    let len = declared_length(&bytes)?;
    if len == 0 {
        return Ok(None);
    }
    let payload = &bytes[LENGTH_PREFIX..LENGTH_PREFIX + len];
    let value = PackedDecimal::parse(payload)?;
    trace!(
        "packed number: {} bytes, exponent={}, digits={}",
        len,
        value.exponent,
        value.digits.len()
    );
    Ok(Some(value))
}

/// Decode a packed number rounded half-down to `scale`.
///
/// Returns the plain decimal text (`9999999.99999`), or `None` for a
/// zero-length payload.
pub fn decode_number(raw: &[i32], scale: i32) -> Result<Option<String>> {
    Ok(parse_packed(raw)?.map(|v| v.to_plain_string(scale)))
}

/// Decode a packed number without rounding, at its natural scale.
pub fn decode_number_exact(raw: &[i32]) -> Result<Option<String>> {
    Ok(parse_packed(raw)?.map(|v| {
        let scale = v.natural_scale();
        v.to_plain_string(scale)
    }))
}

/// Decode a packed number into a 32-bit integer.
///
/// `scale` must be zero or negative; the rounded value must fit in `i32`.
pub fn decode_number_as_int(raw: &[i32], scale: i32) -> Result<Option<i32>> {
    decode_integral(raw, scale, "int")
}

/// Decode a packed number into a 64-bit integer.
///
/// `scale` must be zero or negative; the rounded value must fit in `i64`.
pub fn decode_number_as_long(raw: &[i32], scale: i32) -> Result<Option<i64>> {
    decode_integral(raw, scale, "long")
}

fn decode_integral<T: std::str::FromStr>(
    raw: &[i32],
    scale: i32,
    width: &str,
) -> Result<Option<T>> {
    if scale > 0 {
        return Err(PlogError::precision(format!(
            "cannot decode {} with positive scale {}",
            width, scale
        )));
    }
    let Some(text) = decode_number(raw, scale)? else {
        return Ok(None);
    };
    text.parse::<T>()
        .map(Some)
        .map_err(|_| PlogError::precision(format!("value {} does not fit in {}", text, width)))
}

/// Decode a packed number into a [`Decimal`] rounded half-down to `scale`.
///
/// Fails with a precision error when the value needs more than the 28
/// significant digits a `Decimal` holds.
pub fn decode_number_as_decimal(raw: &[i32], scale: i32) -> Result<Option<Decimal>> {
    let Some(text) = decode_number(raw, scale)? else {
        return Ok(None);
    };
    Decimal::from_str_exact(&text)
        .map(Some)
        .map_err(|e| PlogError::precision(format!("value {} exceeds decimal range: {}", text, e)))
}

#[cfg(test)]
pub(crate) mod test_encoder {
    use crate::codec::test_util::framed;

    /// Encode plain decimal text (`-12.5`) into packed number chunks.
    pub fn encode_number(text: &str) -> Vec<i32> {
        let (negative, body) = match text.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, text),
        };
        let (int_part, frac_part) = body.split_once('.').unwrap_or((body, ""));
        let int_part = int_part.trim_start_matches('0');
        if int_part.is_empty() && frac_part.chars().all(|c| c == '0') {
            return framed(&[0x80]);
        }

        let mut int_digits = int_part.to_string();
        if int_digits.len() % 2 == 1 {
            int_digits.insert(0, '0');
        }
        let mut frac_digits = frac_part.to_string();
        if frac_digits.len() % 2 == 1 {
            frac_digits.push('0');
        }
        let mut exponent = (int_digits.len() / 2) as i32;
        let all = format!("{}{}", int_digits, frac_digits);
        let mut pairs: Vec<u8> = all
            .as_bytes()
            .chunks(2)
            .map(|p| (p[0] - b'0') * 10 + (p[1] - b'0'))
            .collect();
        while pairs.first() == Some(&0) {
            pairs.remove(0);
            exponent -= 1;
        }
        while pairs.last() == Some(&0) {
            pairs.pop();
        }

        let mut bytes = Vec::with_capacity(pairs.len() + 2);
        if negative {
            bytes.push((0x3F - exponent) as u8);
            bytes.extend(pairs.iter().map(|p| 101 - p));
            bytes.push(0x66);
        } else {
            bytes.push((0xC0 + exponent) as u8);
            bytes.extend(pairs.iter().map(|p| p + 1));
        }
        framed(&bytes)
    }
}
