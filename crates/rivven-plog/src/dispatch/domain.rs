//! Domain records produced by the dispatch loop
//!
//! A [`DomainRecord`] is what a domain parser emits for one or more entry
//! records: a logical change, a DDL statement, a transaction boundary or a
//! metadata update. Records carry the replicate offset of the entry that
//! completed them so a consumer can checkpoint after persisting.

use crate::common::ReplicateOffset;
use crate::criteria::Filterable;
use serde::{Deserialize, Serialize};

/// Kind of a domain record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DomainRecordType {
    /// Row-level logical change
    Lcr,
    Ddl,
    /// Transaction boundary
    Transaction,
    /// Dictionary or object metadata
    Metadata,
    Control,
    /// Load file bookkeeping
    Load,
}

impl DomainRecordType {
    /// Whether records of this kind carry change data.
    pub fn is_data(&self) -> bool {
        matches!(self, DomainRecordType::Lcr | DomainRecordType::Ddl)
    }
}

/// One logical record emitted by a domain parser
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainRecord {
    pub kind: DomainRecordType,
    /// Replicate offset of the entry that completed this record
    pub offset: ReplicateOffset,
    /// Qualified `owner.object` name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,
    #[serde(default)]
    pub scn: u64,
    /// Safe to persist the offset once this record is stored
    #[serde(default)]
    pub persist: bool,
    /// Record is complete (all parts merged)
    #[serde(default = "default_complete")]
    pub complete: bool,
    /// Parser-specific body
    #[serde(default)]
    pub payload: serde_json::Value,
}

fn default_complete() -> bool {
    true
}

impl DomainRecord {
    pub fn new(kind: DomainRecordType) -> Self {
        Self {
            kind,
            offset: ReplicateOffset::default(),
            schema: None,
            scn: 0,
            persist: false,
            complete: true,
            payload: serde_json::Value::Null,
        }
    }

    /// Row-level change on `schema`.
    pub fn lcr(schema: impl Into<String>, payload: serde_json::Value) -> Self {
        Self {
            schema: Some(schema.into()),
            payload,
            ..Self::new(DomainRecordType::Lcr)
        }
    }

    pub fn ddl(schema: impl Into<String>, statement: impl Into<String>) -> Self {
        Self {
            schema: Some(schema.into()),
            payload: serde_json::Value::String(statement.into()),
            ..Self::new(DomainRecordType::Ddl)
        }
    }

    pub fn with_scn(mut self, scn: u64) -> Self {
        self.scn = scn;
        self
    }

    pub fn with_offset(mut self, offset: ReplicateOffset) -> Self {
        self.offset = offset;
        self
    }

    pub fn with_complete(mut self, complete: bool) -> Self {
        self.complete = complete;
        self
    }
}

impl Filterable for DomainRecord {
    type Kind = DomainRecordType;

    fn record_type(&self) -> DomainRecordType {
        self.kind
    }

    fn record_offset(&self) -> ReplicateOffset {
        self.offset
    }

    fn record_schema(&self) -> Option<&str> {
        self.schema.as_deref()
    }

    fn is_data_record(&self) -> bool {
        self.kind.is_data()
    }

    fn record_scn(&self) -> u64 {
        self.scn
    }
}

/// Open transaction tracked by the PLOG-level transaction table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionMarker {
    /// Transaction id
    pub xid: String,
    /// SCN of the first change
    pub start_scn: u64,
    /// Number of changes seen so far
    #[serde(default)]
    pub change_count: u64,
    /// Commit or rollback was seen
    #[serde(default)]
    pub complete: bool,
}

impl TransactionMarker {
    pub fn new(xid: impl Into<String>, start_scn: u64) -> Self {
        Self {
            xid: xid.into(),
            start_scn,
            change_count: 0,
            complete: false,
        }
    }

    /// Transaction domain record persisting the given offset.
    ///
    /// Used for trailing transactions flushed at the end of a file, which
    /// are emitted as persistable and complete even when still open.
    pub fn into_trailing_record(self, offset: ReplicateOffset) -> DomainRecord {
        DomainRecord {
            kind: DomainRecordType::Transaction,
            offset,
            schema: None,
            scn: self.start_scn,
            persist: true,
            complete: true,
            payload: serde_json::json!({
                "xid": self.xid,
                "change_count": self.change_count,
                "committed": self.complete,
            }),
        }
    }
}

/// Transaction table owned by the PLOG file being read
pub trait TransactionTable: Send {
    /// Remove and return every transaction still tracked.
    fn take_pending_transactions(&mut self) -> Vec<TransactionMarker>;
}

/// Transaction table that tracks nothing
#[derive(Debug, Default, Clone, Copy)]
pub struct NoTransactions;

impl TransactionTable for NoTransactions {
    fn take_pending_transactions(&mut self) -> Vec<TransactionMarker> {
        Vec::new()
    }
}

impl TransactionTable for Vec<TransactionMarker> {
    fn take_pending_transactions(&mut self) -> Vec<TransactionMarker> {
        std::mem::take(self)
    }
}

/// Dispatch loop counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchStats {
    /// Entry records read from the stream
    pub read: u64,
    /// Records whose category has no registered parser
    pub skipped: u64,
    /// Records or emitted results rejected by criteria
    pub filtered: u64,
    /// Domain records added to the output
    pub emitted: u64,
    /// Reads that reported waiting for data
    pub waits: u64,
    /// Load files spliced into the stream
    pub load_files: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_defaults() {
        let record = DomainRecord::lcr("SOE.ORDERS", serde_json::json!({"id": 1})).with_scn(7);
        assert_eq!(record.kind, DomainRecordType::Lcr);
        assert!(record.is_data_record());
        assert_eq!(record.record_schema(), Some("SOE.ORDERS"));
        assert_eq!(record.record_scn(), 7);
        assert!(record.complete);
        assert!(!record.persist);

        let ddl = DomainRecord::ddl("SOE.ORDERS", "ALTER TABLE orders ADD x NUMBER");
        assert!(ddl.is_data_record());
        assert!(!DomainRecord::new(DomainRecordType::Transaction).is_data_record());
    }

    #[test]
    fn test_trailing_transaction_record() {
        let mut marker = TransactionMarker::new("0x0001.002.00000003", 100);
        marker.change_count = 4;
        let record = marker.into_trailing_record(ReplicateOffset::new(1, 640));
        assert_eq!(record.kind, DomainRecordType::Transaction);
        assert!(record.persist);
        assert!(record.complete);
        assert_eq!(record.scn, 100);
        assert_eq!(record.payload["committed"], false);
        assert_eq!(record.offset, ReplicateOffset::new(1, 640));
    }

    #[test]
    fn test_vec_transaction_table_drains() {
        let mut table = vec![TransactionMarker::new("a", 1), TransactionMarker::new("b", 2)];
        assert_eq!(table.take_pending_transactions().len(), 2);
        assert!(table.take_pending_transactions().is_empty());
        assert!(NoTransactions.take_pending_transactions().is_empty());
    }

    #[test]
    fn test_record_serde() {
        let json = r#"{"kind":"ddl","offset":{"file_id":1,"offset":40},"payload":"DROP TABLE t"}"#;
        let record: DomainRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.kind, DomainRecordType::Ddl);
        assert!(record.complete);
        assert_eq!(record.offset, ReplicateOffset::new(1, 40));
        assert_eq!(
            serde_json::to_value(DispatchStats::default()).unwrap()["emitted"],
            0
        );
    }
}
