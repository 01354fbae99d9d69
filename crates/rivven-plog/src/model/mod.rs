//! # Entry and Tag Type Model
//!
//! Closed taxonomies of the PLOG format and the structural record shapes:
//!
//! - [`EntryType`] / [`EntrySubType`] - two-level record category with
//!   composite-key lookup and classification predicates
//! - [`EntryTagType`] - semantic tag ids, plus the [`FeatureFlags`],
//!   [`LobPiece`] and [`ColumnSignature`] sub-enumerations
//! - [`EntryRecord`] / [`TagRecord`] - one decoded unit and its payloads
//!
//! The lookup indexes are immutable statics built on first use.

mod entry_type;
mod record;
mod tag_type;

pub use entry_type::*;
pub use record::*;
pub use tag_type::*;
