//! Domain parser contract

use super::domain::DomainRecord;
use crate::common::{ReplicateOffset, Result};
use crate::model::{EntryRecord, FeatureFlags};
use crate::source::PlogDescriptor;

/// File-level context handed to domain parsers with every record
#[derive(Debug, Clone, Copy)]
pub struct PlogContext<'a> {
    pub descriptor: &'a PlogDescriptor,
    /// Feature flags from the control header
    pub features: FeatureFlags,
    /// Replicate offset stamped on the current record
    pub offset: ReplicateOffset,
    /// Record comes from a spliced load file
    pub is_proxy: bool,
}

/// Turns entry records of one category into domain records.
///
/// A parser may need several entry records before it has a result (a
/// transaction spans begin, changes and commit; a LOB arrives in pieces).
/// The dispatch loop calls [`parse`](Self::parse) for every matching
/// record and [`emit`](Self::emit) whenever [`can_emit`](Self::can_emit)
/// reports a result is ready.
pub trait DomainParser: Send {
    fn parse(&mut self, ctx: &PlogContext<'_>, record: &EntryRecord) -> Result<()>;

    fn can_emit(&self) -> bool;

    /// Take the pending result.
    fn emit(&mut self) -> Result<DomainRecord>;

    /// Aggregate parsers see every record of their category; parse
    /// criteria are not applied to them.
    fn is_aggregate(&self) -> bool {
        false
    }

    /// Parser merges multi-part records such as partial LOB writes.
    fn supports_multi_part_merging(&self) -> bool {
        false
    }
}

#[cfg(test)]
pub(crate) mod test_parsers {
    use super::*;
    use crate::dispatch::{DomainRecordType, TransactionMarker};
    use crate::model::EntrySubType;
    use parking_lot::Mutex;
    use std::sync::Arc;

    /// Emits one LCR per parsed record and logs what it saw.
    #[derive(Default)]
    pub struct EchoParser {
        pub(crate) pending: Option<DomainRecord>,
        pub seen: Arc<Mutex<Vec<(EntrySubType, ReplicateOffset)>>>,
        pub aggregate: bool,
        pub merging: bool,
    }

    impl DomainParser for EchoParser {
        fn parse(&mut self, ctx: &PlogContext<'_>, record: &EntryRecord) -> Result<()> {
            self.seen.lock().push((record.sub_type, ctx.offset));
            let kind = if record.sub_type.is_ddl() {
                DomainRecordType::Ddl
            } else {
                DomainRecordType::Lcr
            };
            let mut domain = DomainRecord::new(kind).with_scn(record.scn);
            domain.schema = record.owner.clone();
            domain.payload = serde_json::json!({ "op": record.sub_type.to_string() });
            self.pending = Some(domain);
            Ok(())
        }

        fn can_emit(&self) -> bool {
            self.pending.is_some()
        }

        fn emit(&mut self) -> Result<DomainRecord> {
            self.pending
                .take()
                .ok_or_else(|| crate::common::PlogError::parser("nothing to emit"))
        }

        fn is_aggregate(&self) -> bool {
            self.aggregate
        }

        fn supports_multi_part_merging(&self) -> bool {
            self.merging
        }
    }

    /// Tracks begin/commit pairs and emits a transaction record on commit.
    #[derive(Default)]
    pub struct TxParser {
        open: Option<TransactionMarker>,
        ready: Option<DomainRecord>,
    }

    impl DomainParser for TxParser {
        fn parse(&mut self, _ctx: &PlogContext<'_>, record: &EntryRecord) -> Result<()> {
            match record.sub_type {
                EntrySubType::Begin => {
                    self.open = Some(TransactionMarker::new("tx", record.scn));
                }
                EntrySubType::Commit | EntrySubType::Rollback => {
                    let complete = self.open.take().is_some();
                    self.ready = Some(
                        DomainRecord::new(DomainRecordType::Transaction)
                            .with_scn(record.scn)
                            .with_complete(complete),
                    );
                }
                _ => {}
            }
            Ok(())
        }

        fn can_emit(&self) -> bool {
            self.ready.is_some()
        }

        fn emit(&mut self) -> Result<DomainRecord> {
            self.ready
                .take()
                .ok_or_else(|| crate::common::PlogError::parser("no transaction ready"))
        }
    }

    /// Always fails to parse.
    pub struct FailingParser;

    impl DomainParser for FailingParser {
        fn parse(&mut self, _ctx: &PlogContext<'_>, _record: &EntryRecord) -> Result<()> {
            Err(crate::common::PlogError::decode("corrupt column image"))
        }

        fn can_emit(&self) -> bool {
            false
        }

        fn emit(&mut self) -> Result<DomainRecord> {
            Err(crate::common::PlogError::parser("never emits"))
        }
    }
}
