//! # Replicate Offsets
//!
//! A replicate offset pairs the unique id of a PLOG file with a byte
//! offset inside it. It is the resumption checkpoint of the reader and the
//! unit criteria compare watermarks against.
//!
//! Offsets order by file id first, then by byte offset, so a checkpoint
//! taken in a later file of a mining sequence always sorts after any
//! position in an earlier one.
//!
//! ## Format
//!
//! The display form is `file_id:offset`, e.g. `42:8192`, matching the
//! `plog.start.offset` configuration property.

use crate::common::{PlogError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Position in the logical replicated stream.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct ReplicateOffset {
    /// Unique id of the PLOG file
    pub file_id: u64,
    /// Byte offset within the file
    pub offset: u64,
}

impl ReplicateOffset {
    /// Create a new replicate offset.
    pub const fn new(file_id: u64, offset: u64) -> Self {
        Self { file_id, offset }
    }

    /// Return a copy advanced by `bytes` within the same file.
    pub fn advanced(self, bytes: u64) -> Self {
        Self {
            file_id: self.file_id,
            offset: self.offset + bytes,
        }
    }
}

impl fmt::Display for ReplicateOffset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file_id, self.offset)
    }
}

impl FromStr for ReplicateOffset {
    type Err = PlogError;

    fn from_str(s: &str) -> Result<Self> {
        let (file, offset) = s
            .trim()
            .split_once(':')
            .ok_or_else(|| PlogError::config(format!("invalid replicate offset '{}'", s)))?;
        let file_id = file
            .parse()
            .map_err(|_| PlogError::config(format!("invalid file id in offset '{}'", s)))?;
        let offset = offset
            .parse()
            .map_err(|_| PlogError::config(format!("invalid byte offset in '{}'", s)))?;
        Ok(Self { file_id, offset })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ordering_file_first() {
        let a = ReplicateOffset::new(1, 9000);
        let b = ReplicateOffset::new(2, 16);
        let c = ReplicateOffset::new(2, 32);
        assert!(a < b);
        assert!(b < c);
        assert_eq!(c.max(a), c);
    }

    #[test]
    fn test_advanced() {
        let a = ReplicateOffset::new(3, 16).advanced(40);
        assert_eq!(a, ReplicateOffset::new(3, 56));
    }

    #[test]
    fn test_display_parse() {
        let a = ReplicateOffset::new(42, 8192);
        assert_eq!(a.to_string(), "42:8192");
        assert_eq!("42:8192".parse::<ReplicateOffset>().unwrap(), a);
        assert_eq!(" 42:8192 ".parse::<ReplicateOffset>().unwrap(), a);
    }

    #[test]
    fn test_parse_invalid() {
        assert!("42".parse::<ReplicateOffset>().is_err());
        assert!("x:1".parse::<ReplicateOffset>().is_err());
        assert!("1:-5".parse::<ReplicateOffset>().is_err());
    }
}
