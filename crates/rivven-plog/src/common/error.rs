//! Error types for PLOG operations
//!
//! One variant per failure kind of the reader pipeline. Record-level
//! failures raised while dispatching are wrapped in [`PlogError::Record`]
//! with schema, sub-type, SCN and offset context; [`PlogError::StreamClosed`]
//! is never wrapped so callers can detect shutdown by matching on it.

use crate::common::offset::ReplicateOffset;
use crate::common::pattern::PatternError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error categories for metrics and alerting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Bad file header, signature or structure
    Format,
    /// Malformed value payloads
    Decode,
    /// Unknown type or tag identifiers
    Lookup,
    /// Criteria or reader misconfiguration
    Configuration,
    /// Underlying byte source failures
    Io,
    /// Errors raised by domain parsers
    Parser,
    /// Other/unknown errors
    Other,
}

/// PLOG reader errors
#[derive(Error, Debug)]
pub enum PlogError {
    /// Bad file header, signature, version or record framing
    #[error("Format error: {0}")]
    Format(String),

    /// Malformed chunk payload
    #[error("Decode error: {0}")]
    Decode(String),

    /// Numeric value does not fit the requested integral width
    #[error("Precision error: {0}")]
    Precision(String),

    /// Unresolvable entry type, sub-type or tag id
    #[error("Lookup error: {0}")]
    Lookup(String),

    /// Criteria or reader used before it was fully configured
    #[error("Configuration error: {0}")]
    Config(String),

    /// Caller-initiated shutdown
    #[error("Stream closed")]
    StreamClosed,

    /// Operation not valid in the current stream state
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Error raised by a domain parser
    #[error("Parser error: {0}")]
    Parser(String),

    /// Wildcard pattern compilation error
    #[error("Pattern error: {0}")]
    Pattern(#[from] PatternError),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Record-level failure with dispatch context
    #[error("Failed to process {sub_type} record (schema={schema}, scn={scn}, offset={offset}): {source}")]
    Record {
        sub_type: String,
        schema: String,
        scn: u64,
        offset: ReplicateOffset,
        #[source]
        source: Box<PlogError>,
    },
}

impl PlogError {
    /// Create a new format error
    pub fn format(msg: impl Into<String>) -> Self {
        Self::Format(msg.into())
    }

    /// Create a new decode error
    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }

    /// Create a new precision error
    pub fn precision(msg: impl Into<String>) -> Self {
        Self::Precision(msg.into())
    }

    /// Create a new lookup error
    pub fn lookup(msg: impl Into<String>) -> Self {
        Self::Lookup(msg.into())
    }

    /// Create a new config error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an invalid state error
    pub fn invalid_state(msg: impl Into<String>) -> Self {
        Self::InvalidState(msg.into())
    }

    /// Create a domain parser error
    pub fn parser(msg: impl Into<String>) -> Self {
        Self::Parser(msg.into())
    }

    /// Wrap a record-level error with dispatch context.
    ///
    /// `StreamClosed` passes through unchanged, as do errors that already
    /// carry record context.
    pub fn with_record_context(
        self,
        sub_type: impl Into<String>,
        schema: Option<&str>,
        scn: u64,
        offset: ReplicateOffset,
    ) -> Self {
        match self {
            Self::StreamClosed | Self::Record { .. } => self,
            other => Self::Record {
                sub_type: sub_type.into(),
                schema: schema.unwrap_or("N/A").to_string(),
                scn,
                offset,
                source: Box::new(other),
            },
        }
    }

    /// Check if this is the caller-initiated shutdown signal.
    pub fn is_stream_closed(&self) -> bool {
        matches!(self, Self::StreamClosed)
    }

    /// Check if this error is retriable.
    ///
    /// Only interrupted I/O is transient; every decode or format problem
    /// is fatal for the current read.
    pub fn is_retriable(&self) -> bool {
        match self {
            Self::Io(e) => {
                use std::io::ErrorKind;
                matches!(e.kind(), ErrorKind::Interrupted | ErrorKind::WouldBlock)
            }
            Self::Record { source, .. } => source.is_retriable(),
            _ => false,
        }
    }

    /// Get the error category for metrics and alerting.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Format(_) => ErrorCategory::Format,
            Self::Decode(_) => ErrorCategory::Decode,
            Self::Precision(_) => ErrorCategory::Decode,
            Self::Json(_) => ErrorCategory::Decode,
            Self::Lookup(_) => ErrorCategory::Lookup,
            Self::Config(_) => ErrorCategory::Configuration,
            Self::Pattern(_) => ErrorCategory::Configuration,
            Self::Io(_) => ErrorCategory::Io,
            Self::StreamClosed => ErrorCategory::Io,
            Self::Parser(_) => ErrorCategory::Parser,
            Self::InvalidState(_) => ErrorCategory::Other,
            Self::Record { source, .. } => source.category(),
        }
    }

    /// Get a metric-safe error code.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Format(_) => "format_error",
            Self::Decode(_) => "decode_error",
            Self::Precision(_) => "precision_error",
            Self::Lookup(_) => "lookup_error",
            Self::Config(_) => "config_error",
            Self::StreamClosed => "stream_closed",
            Self::InvalidState(_) => "invalid_state",
            Self::Parser(_) => "parser_error",
            Self::Pattern(_) => "pattern_error",
            Self::Json(_) => "json_error",
            Self::Io(_) => "io_error",
            Self::Record { source, .. } => source.error_code(),
        }
    }
}

/// Result type for PLOG operations
pub type Result<T> = std::result::Result<T, PlogError>;
