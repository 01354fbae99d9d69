//! Entry categories and sub-categories
//!
//! Every entry record carries a parent type id and a sub type id. The
//! pair resolves to exactly one [`EntrySubType`] through a composite key
//! index (`parent << 32 | sub`) built once on first use.

use crate::common::{PlogError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::LazyLock;

/// Top-level entry category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u32)]
pub enum EntryType {
    Unknown = 0,
    Control = 1,
    Transaction = 2,
    Data = 3,
    LoadFile = 4,
    Metadata = 5,
}

impl EntryType {
    pub fn from_id(id: u32) -> Result<Self> {
        match id {
            0 => Ok(EntryType::Unknown),
            1 => Ok(EntryType::Control),
            2 => Ok(EntryType::Transaction),
            3 => Ok(EntryType::Data),
            4 => Ok(EntryType::LoadFile),
            5 => Ok(EntryType::Metadata),
            _ => Err(PlogError::lookup(format!("unknown entry type id {}", id))),
        }
    }

    #[inline]
    pub fn id(&self) -> u32 {
        *self as u32
    }
}

/// Leaf entry category, owned by exactly one [`EntryType`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntrySubType {
    #[default]
    Unknown,
    // control
    Header,
    Footer,
    Heartbeat,
    Checkpoint,
    // transaction
    Begin,
    Commit,
    Rollback,
    Savepoint,
    RollbackToSavepoint,
    // data
    Insert,
    Update,
    Delete,
    LobWrite,
    LobWritePartial,
    NoOp,
    Ddl,
    DdlCreate,
    DdlAlter,
    DdlDrop,
    DdlTruncate,
    DdlRename,
    DdlGrant,
    LobTrim,
    LobErase,
    ArrayInsert,
    SelectForUpdate,
    // load file
    IncludeFile,
    IncludeFileStats,
    // metadata
    Dictionary,
    JsonDictionary,
    TableMetadata,
    ColumnMetadata,
    PartitionMetadata,
}

/// (sub type, parent, sub id)
const SUB_TYPES: &[(EntrySubType, EntryType, u32)] = &[
    (EntrySubType::Unknown, EntryType::Unknown, 0),
    (EntrySubType::Header, EntryType::Control, 1),
    (EntrySubType::Footer, EntryType::Control, 2),
    (EntrySubType::Heartbeat, EntryType::Control, 3),
    (EntrySubType::Checkpoint, EntryType::Control, 4),
    (EntrySubType::Begin, EntryType::Transaction, 1),
    (EntrySubType::Commit, EntryType::Transaction, 2),
    (EntrySubType::Rollback, EntryType::Transaction, 3),
    (EntrySubType::Savepoint, EntryType::Transaction, 4),
    (EntrySubType::RollbackToSavepoint, EntryType::Transaction, 5),
    (EntrySubType::Insert, EntryType::Data, 1),
    (EntrySubType::Update, EntryType::Data, 2),
    (EntrySubType::Delete, EntryType::Data, 3),
    (EntrySubType::LobWrite, EntryType::Data, 4),
    (EntrySubType::LobWritePartial, EntryType::Data, 5),
    (EntrySubType::NoOp, EntryType::Data, 6),
    (EntrySubType::Ddl, EntryType::Data, 7),
    (EntrySubType::DdlCreate, EntryType::Data, 8),
    (EntrySubType::DdlAlter, EntryType::Data, 9),
    (EntrySubType::DdlDrop, EntryType::Data, 10),
    (EntrySubType::DdlTruncate, EntryType::Data, 11),
    (EntrySubType::DdlRename, EntryType::Data, 12),
    (EntrySubType::DdlGrant, EntryType::Data, 13),
    (EntrySubType::LobTrim, EntryType::Data, 14),
    (EntrySubType::LobErase, EntryType::Data, 15),
    (EntrySubType::ArrayInsert, EntryType::Data, 16),
    (EntrySubType::SelectForUpdate, EntryType::Data, 17),
    (EntrySubType::IncludeFile, EntryType::LoadFile, 1),
    (EntrySubType::IncludeFileStats, EntryType::LoadFile, 2),
    (EntrySubType::Dictionary, EntryType::Metadata, 1),
    (EntrySubType::JsonDictionary, EntryType::Metadata, 2),
    (EntrySubType::TableMetadata, EntryType::Metadata, 3),
    (EntrySubType::ColumnMetadata, EntryType::Metadata, 4),
    (EntrySubType::PartitionMetadata, EntryType::Metadata, 5),
];

static SUB_TYPE_INDEX: LazyLock<HashMap<u64, EntrySubType>> = LazyLock::new(|| {
    SUB_TYPES
        .iter()
        .map(|(sub, parent, id)| (composite_key(parent.id(), *id), *sub))
        .collect()
});

/// Composite lookup key: parent id in the high word, sub id in the low word.
#[inline]
pub fn composite_key(parent_id: u32, sub_id: u32) -> u64 {
    ((parent_id as u64) << 32) | sub_id as u64
}

impl EntrySubType {
    /// All sub types in declaration order.
    pub fn all() -> impl Iterator<Item = EntrySubType> {
        SUB_TYPES.iter().map(|(sub, _, _)| *sub)
    }

    /// Resolve a (parent id, sub id) pair.
    pub fn lookup(parent_id: u32, sub_id: u32) -> Result<Self> {
        SUB_TYPE_INDEX
            .get(&composite_key(parent_id, sub_id))
            .copied()
            .ok_or_else(|| {
                PlogError::lookup(format!(
                    "unknown entry sub type {} for parent type {}",
                    sub_id, parent_id
                ))
            })
    }

    fn entry(&self) -> &'static (EntrySubType, EntryType, u32) {
        // every variant has a row in SUB_TYPES
        SUB_TYPES
            .iter()
            .find(|(sub, _, _)| sub == self)
            .unwrap_or(&SUB_TYPES[0])
    }

    /// Owning category
    pub fn parent(&self) -> EntryType {
        self.entry().1
    }

    /// Id within the owning category
    pub fn sub_id(&self) -> u32 {
        self.entry().2
    }

    pub fn is_header(&self) -> bool {
        *self == EntrySubType::Header
    }

    pub fn is_footer(&self) -> bool {
        *self == EntrySubType::Footer
    }

    pub fn is_ddl(&self) -> bool {
        matches!(
            self,
            EntrySubType::Ddl
                | EntrySubType::DdlCreate
                | EntrySubType::DdlAlter
                | EntrySubType::DdlDrop
                | EntrySubType::DdlTruncate
                | EntrySubType::DdlRename
                | EntrySubType::DdlGrant
        )
    }

    pub fn is_json_metadata(&self) -> bool {
        *self == EntrySubType::JsonDictionary
    }

    pub fn is_lob_partial(&self) -> bool {
        *self == EntrySubType::LobWritePartial
    }

    pub fn is_transaction(&self) -> bool {
        self.parent() == EntryType::Transaction
    }

    /// Row-change data carrying column images (no-op and DDL excluded)
    pub fn has_column_data(&self) -> bool {
        self.parent() == EntryType::Data
            && !self.is_ddl()
            && !matches!(self, EntrySubType::NoOp | EntrySubType::SelectForUpdate)
    }

    /// Records whose owner must be resolved from object metadata
    pub fn uses_column_metadata(&self) -> bool {
        self.is_ddl()
            || matches!(
                self,
                EntrySubType::Insert
                    | EntrySubType::Update
                    | EntrySubType::Delete
                    | EntrySubType::LobWrite
                    | EntrySubType::LobTrim
                    | EntrySubType::LobErase
                    | EntrySubType::ArrayInsert
                    | EntrySubType::NoOp
            )
    }

    pub fn is_include_file_record(&self) -> bool {
        *self == EntrySubType::IncludeFile
    }

    pub fn is_include_file_stats_record(&self) -> bool {
        *self == EntrySubType::IncludeFileStats
    }
}

impl fmt::Display for EntrySubType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}
