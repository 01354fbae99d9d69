//! # rivven-plog - PLOG Change Log Reader for Rivven
//!
//! Reads PLOG files, the chunked binary change logs produced by redo-log
//! mining, and turns them into domain records for Rivven CDC pipelines.
//!
//! ## Features
//!
//! - Binary value codec for the source database's internal encodings
//!   (packed numbers, dates, timestamps, intervals, national strings, LOBs)
//! - Closed entry/tag taxonomy with composite-key lookup
//! - Offset-tracking stream reader with mark/rewind for files still being
//!   written and splicing of referenced load files
//! - Composable criteria for schema, type, offset and SCN filtering
//! - Pluggable domain parsers driven by a dispatch loop
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   ┌──────────────┐
//! │ parent PLOG  │   │  load file   │
//! └──────┬───────┘   └──────┬───────┘
//!        │ PlogStream        │ PlogStream (proxy, pinned offset)
//!        ▼                   ▼
//! ┌──────────────────────────────────────┐
//! │        DomainReader (dispatch)       │
//! │  SCN / owner resolution, criteria    │
//! └──────────────────┬───────────────────┘
//!                    ▼
//!        DomainParser per EntryType
//!                    ▼
//! ┌──────────────────────────────────────┐
//! │   PlogReader batch of DomainRecord   │
//! └──────────────────────────────────────┘
//! ```
//!
//! ## Public API Organization
//!
//! ### Tier 1: Core Types (crate root)
//! Reader, records and errors - `PlogReader`, `DomainRecord`, `PlogError`.
//!
//! ### Tier 2: Extension Points (crate root)
//! Traits for hosts - `DomainParser`, `PlogSource`, `TransactionTable`,
//! `Criteria`.
//!
//! ### Tier 3: Format Internals (modules)
//! Codec, taxonomy and stream types via `codec::*`, `model::*`,
//! `stream::*`.

pub mod codec;
pub mod common;
pub mod criteria;
pub mod dispatch;
pub mod model;
pub mod reader;
pub mod source;
pub mod stream;

// =============================================================================
// TIER 1: Core Types
// =============================================================================

pub use common::{
    CriteriaConfig, ErrorCategory, PlogError, PlogReaderConfig, ReplicateOffset, Result,
};
pub use dispatch::{DispatchStats, DomainReader, DomainRecord, DomainRecordType};
pub use reader::{CancelToken, PlogReader, ReadStatus};

// =============================================================================
// TIER 2: Extension Points
// =============================================================================

pub use criteria::{Criteria, Filterable};
pub use dispatch::{DomainParser, PlogContext, TransactionMarker, TransactionTable};
pub use source::{FsPlogSource, LoadFileRef, PlogDescriptor, PlogSource};
