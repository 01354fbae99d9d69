//! # Common PLOG Types
//!
//! Shared building blocks used by every layer of the reader:
//!
//! - [`PlogError`] - Error type with category and metric codes
//! - [`ReplicateOffset`] - Resumption checkpoint (file id + byte offset)
//! - [`PatternMatcher`] / [`PatternSet`] - Wildcard schema patterns
//! - [`PlogReaderConfig`] / [`CriteriaConfig`] - Reader and filter configuration

mod config;
mod error;
mod offset;
pub mod pattern;

pub use config::*;
pub use error::*;
pub use offset::*;
pub use pattern::{PatternError, PatternMatcher, PatternSet};
