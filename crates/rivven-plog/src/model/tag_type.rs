//! Tag types and tag-level sub-enumerations
//!
//! Tag ids are grouped by range:
//!
//! | Range | Meaning |
//! |-------|---------|
//! | `0x01..` | object identity |
//! | `0x10..` | column metadata |
//! | `0x20..` | column images |
//! | `0x30..` | change and transaction context |
//! | `0x40..` | large objects |
//! | `0x50..` | DDL |
//! | `0x60..` | JSON dictionary |
//! | `0x70..` | file header and load files |

use crate::common::{PlogError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::LazyLock;
use tracing::warn;

macro_rules! entry_tag_types {
    ($($(#[$doc:meta])* $name:ident = $id:expr,)+) => {
        /// Semantic meaning of a tag payload
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
        )]
        #[repr(u32)]
        pub enum EntryTagType {
            $($(#[$doc])* $name = $id,)+
        }

        impl EntryTagType {
            /// All tag types in id order
            pub const ALL: &'static [EntryTagType] = &[$(EntryTagType::$name,)+];
        }
    };
}

entry_tag_types! {
    ObjId = 0x01,
    ObjName = 0x02,
    ObjOwner = 0x03,
    ObjType = 0x04,
    ObjVersion = 0x05,
    BaseObjId = 0x06,
    PartitionId = 0x07,

    ColumnCount = 0x10,
    ColumnId = 0x11,
    ColumnName = 0x12,
    ColumnType = 0x13,
    ColumnLength = 0x14,
    ColumnPrecision = 0x15,
    ColumnScale = 0x16,
    ColumnNullable = 0x17,
    ColumnCharset = 0x18,
    /// Presence marker, see [`ColumnSignature`]
    ColumnSignature = 0x19,
    ColumnDefault = 0x1A,

    /// Column value before the change
    PreImage = 0x20,
    /// Column value after the change
    PostImage = 0x21,
    /// Key column value identifying the row
    KeyImage = 0x22,
    LobImage = 0x23,
    RowId = 0x24,
    SupplementalLog = 0x25,

    Scn = 0x30,
    Xid = 0x31,
    ParentXid = 0x32,
    CommitScn = 0x33,
    Timestamp = 0x34,
    Username = 0x35,
    OsUser = 0x36,
    Machine = 0x37,
    Program = 0x38,
    RedoThread = 0x39,
    Rba = 0x3A,
    Savepoint = 0x3B,
    TxnComplete = 0x3C,

    LobId = 0x40,
    LobData = 0x41,
    LobOffset = 0x42,
    LobLength = 0x43,
    /// Piece marker, see [`LobPiece`]
    LobPiece = 0x44,
    LobColumnId = 0x45,
    LobPageSize = 0x46,
    LobCharset = 0x47,

    DdlSqlText = 0x50,
    DdlOperation = 0x51,
    DdlObjectType = 0x52,
    DdlCurrentSchema = 0x53,
    DdlObjectName = 0x54,

    JsonText = 0x60,
    JsonDictionary = 0x61,
    JsonVersion = 0x62,

    /// File-level [`FeatureFlags`] bitset
    FeatureFlags = 0x70,
    FileId = 0x71,
    Sequence = 0x72,
    DbName = 0x73,
    DbVersion = 0x74,
    Charset = 0x75,
    NationalCharset = 0x76,
    LoadFileId = 0x77,
    LoadFileName = 0x78,
    LoadRecordCount = 0x79,
    CreatedAt = 0x7A,
    HostName = 0x7B,
}

static TAG_INDEX: LazyLock<HashMap<u32, EntryTagType>> =
    LazyLock::new(|| EntryTagType::ALL.iter().map(|t| (t.id(), *t)).collect());

impl EntryTagType {
    pub fn from_id(id: u32) -> Result<Self> {
        TAG_INDEX
            .get(&id)
            .copied()
            .ok_or_else(|| PlogError::lookup(format!("unknown tag type id 0x{:X}", id)))
    }

    #[inline]
    pub fn id(&self) -> u32 {
        *self as u32
    }
}

impl fmt::Display for EntryTagType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// File-level feature bitset from the control header
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FeatureFlags(u32);

impl FeatureFlags {
    /// Dictionary caching / payload compression
    pub const COMPRESSION: u32 = 0x1;
    /// Dictionary records are JSON encoded
    pub const JSON_DICTIONARY: u32 = 0x2;
    /// Only committed changes are written
    pub const COMMITTED_ONLY: u32 = 0x4;
    /// Transactions are written serialized, never interleaved
    pub const SERIALIZED_TRANSACTIONS: u32 = 0x8;

    const KNOWN: u32 = Self::COMPRESSION
        | Self::JSON_DICTIONARY
        | Self::COMMITTED_ONLY
        | Self::SERIALIZED_TRANSACTIONS;

    /// Build from raw bits, warning about bits this reader does not know.
    pub fn from_bits(bits: u32) -> Self {
        if bits & !Self::KNOWN != 0 {
            warn!("Unknown PLOG feature flags: 0x{:X}", bits & !Self::KNOWN);
        }
        Self(bits)
    }

    pub fn bits(&self) -> u32 {
        self.0
    }

    #[inline]
    pub fn contains(&self, flag: u32) -> bool {
        self.0 & flag == flag
    }

    pub fn compression(&self) -> bool {
        self.contains(Self::COMPRESSION)
    }

    pub fn json_dictionary(&self) -> bool {
        self.contains(Self::JSON_DICTIONARY)
    }

    pub fn committed_only(&self) -> bool {
        self.contains(Self::COMMITTED_ONLY)
    }

    pub fn serialized_transactions(&self) -> bool {
        self.contains(Self::SERIALIZED_TRANSACTIONS)
    }
}

/// Position of a LOB write within a multi-piece LOB
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u32)]
pub enum LobPiece {
    OnePiece = 0,
    First = 1,
    Next = 2,
    Last = 3,
}

impl LobPiece {
    pub fn from_id(id: u32) -> Result<Self> {
        match id {
            0 => Ok(LobPiece::OnePiece),
            1 => Ok(LobPiece::First),
            2 => Ok(LobPiece::Next),
            3 => Ok(LobPiece::Last),
            _ => Err(PlogError::lookup(format!("unknown LOB piece marker {}", id))),
        }
    }

    /// Whether this piece completes the LOB
    pub fn is_final(&self) -> bool {
        matches!(self, LobPiece::OnePiece | LobPiece::Last)
    }
}

/// Presence of a column value in a change image
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u32)]
pub enum ColumnSignature {
    Absent = 0,
    Present = 1,
    Null = 2,
    PresentOrNull = 3,
}

impl ColumnSignature {
    pub fn from_id(id: u32) -> Result<Self> {
        match id {
            0 => Ok(ColumnSignature::Absent),
            1 => Ok(ColumnSignature::Present),
            2 => Ok(ColumnSignature::Null),
            3 => Ok(ColumnSignature::PresentOrNull),
            _ => Err(PlogError::lookup(format!("unknown column signature {}", id))),
        }
    }

    /// Whether the image may carry a value payload for the column
    pub fn may_have_value(&self) -> bool {
        matches!(self, ColumnSignature::Present | ColumnSignature::PresentOrNull)
    }
}
