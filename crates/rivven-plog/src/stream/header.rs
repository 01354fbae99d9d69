//! PLOG file header
//!
//! ```text
//! [signature: 8 = "PLOGFILE"] [major: u32 LE] [minor: u32 LE]
//! ```

use crate::common::{PlogError, Result};
use std::io::{Read, Write};

pub const PLOG_SIGNATURE: &[u8; 8] = b"PLOGFILE";
pub const SUPPORTED_MAJOR: u32 = 1;
pub const SUPPORTED_MINOR: u32 = 1;

/// Encoded size of the file header in bytes
pub const FILE_HEADER_BYTES: u64 = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileHeader {
    pub major: u32,
    pub minor: u32,
}

impl Default for FileHeader {
    fn default() -> Self {
        Self {
            major: SUPPORTED_MAJOR,
            minor: SUPPORTED_MINOR,
        }
    }
}

impl FileHeader {
    pub fn write_to(&self, mut w: impl Write) -> std::io::Result<()> {
        w.write_all(PLOG_SIGNATURE)?;
        w.write_all(&self.major.to_le_bytes())?;
        w.write_all(&self.minor.to_le_bytes())?;
        Ok(())
    }

    /// Read and validate the header.
    pub fn read_from(mut r: impl Read) -> Result<Self> {
        let mut buf = [0u8; FILE_HEADER_BYTES as usize];
        r.read_exact(&mut buf).map_err(|e| {
            if e.kind() == std::io::ErrorKind::UnexpectedEof {
                PlogError::format("truncated PLOG file header")
            } else {
                e.into()
            }
        })?;
        if &buf[..8] != PLOG_SIGNATURE {
            return Err(PlogError::format(format!(
                "invalid PLOG signature {:?}",
                String::from_utf8_lossy(&buf[..8])
            )));
        }
        let header = Self {
            major: u32::from_le_bytes([buf[8], buf[9], buf[10], buf[11]]),
            minor: u32::from_le_bytes([buf[12], buf[13], buf[14], buf[15]]),
        };
        if header.major != SUPPORTED_MAJOR || header.minor != SUPPORTED_MINOR {
            return Err(PlogError::format(format!(
                "unsupported PLOG version {}.{} (supported {}.{})",
                header.major, header.minor, SUPPORTED_MAJOR, SUPPORTED_MINOR
            )));
        }
        Ok(header)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_roundtrip() {
        let mut buf = Vec::new();
        FileHeader::default().write_to(&mut buf).unwrap();
        assert_eq!(buf.len(), FILE_HEADER_BYTES as usize);
        assert_eq!(&buf[..8], b"PLOGFILE");
        assert_eq!(FileHeader::read_from(&buf[..]).unwrap(), FileHeader::default());
    }

    #[test]
    fn test_bad_signature() {
        let mut buf = b"PLOGFILX".to_vec();
        buf.extend_from_slice(&[1, 0, 0, 0, 1, 0, 0, 0]);
        assert!(matches!(
            FileHeader::read_from(&buf[..]),
            Err(PlogError::Format(_))
        ));
    }

    #[test]
    fn test_unsupported_version() {
        let mut buf = Vec::new();
        FileHeader { major: 1, minor: 2 }.write_to(&mut buf).unwrap();
        let err = FileHeader::read_from(&buf[..]).unwrap_err();
        assert!(err.to_string().contains("1.2"));
    }

    #[test]
    fn test_truncated_header() {
        assert!(matches!(
            FileHeader::read_from(&b"PLOG"[..]),
            Err(PlogError::Format(_))
        ));
    }
}
