//! Domain dispatch loop
//!
//! Reads one entry record per call, resolves its SCN and owning object,
//! stamps the replicate offset and routes it to the domain parsers
//! registered for its category.
//!
//! ## Criteria
//!
//! | Stage | Applied to | On reject |
//! |-------|-----------|-----------|
//! | default (internal schemas) | entry record | skipped for all parsers |
//! | parse | entry record, non-aggregate parsers | parser not invoked |
//! | filter | emitted domain record | dropped |
//! | persist | emitted domain record | `persist = false` |
//!
//! Transaction records ignore the persist criteria and persist exactly
//! when they are complete.

use super::domain::{DispatchStats, DomainRecord, DomainRecordType, TransactionTable};
use super::parser::{DomainParser, PlogContext};
use crate::codec::{decode_int, decode_long, decode_scn, decode_string};
use crate::common::{PlogError, Result};
use crate::criteria::{BoxedCriteria, Criteria, InternalDdlFilterCriteria};
use crate::model::{EntryRecord, EntryTagType, EntryType};
use crate::source::LoadFileRef;
use crate::stream::{PlogStream, ReadEntry};
use std::collections::HashMap;
use std::io::{Read, Seek};
use std::time::Duration;
use tracing::{debug, info, trace};

/// Result of one dispatch step
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// A record was consumed; emitted domain records were appended
    Processed { emitted: usize },
    /// The record references a load file to splice in at this position
    IncludeFile(LoadFileRef),
    /// Statistics of a previously included load file
    IncludeFileStats { record_count: u64 },
    /// Not enough data yet
    Waiting { attempts: u32, retry_after: Duration },
    /// The stream is finished
    Done,
}

/// Per-stream dispatch loop
pub struct DomainReader {
    parsers: Vec<(EntryType, Box<dyn DomainParser>)>,
    default_criteria: InternalDdlFilterCriteria,
    parse_criteria: Option<BoxedCriteria<EntryRecord>>,
    filter_criteria: Option<BoxedCriteria<DomainRecord>>,
    persist_criteria: Option<BoxedCriteria<DomainRecord>>,
    flush_trailing: bool,
    /// Object id to qualified `owner.object` name
    object_names: HashMap<i32, String>,
    stats: DispatchStats,
}

impl DomainReader {
    /// Create a dispatch loop; parsers run in the given order.
    pub fn new(parsers: Vec<(EntryType, Box<dyn DomainParser>)>) -> Result<Self> {
        if parsers.is_empty() {
            return Err(PlogError::config(
                "DomainReader requires at least one domain parser",
            ));
        }
        Ok(Self {
            parsers,
            default_criteria: InternalDdlFilterCriteria::new()?,
            parse_criteria: None,
            filter_criteria: None,
            persist_criteria: None,
            flush_trailing: true,
            object_names: HashMap::new(),
            stats: DispatchStats::default(),
        })
    }

    pub fn with_parse_criteria(mut self, criteria: BoxedCriteria<EntryRecord>) -> Self {
        self.parse_criteria = Some(criteria);
        self
    }

    pub fn with_filter_criteria(mut self, criteria: BoxedCriteria<DomainRecord>) -> Self {
        self.filter_criteria = Some(criteria);
        self
    }

    pub fn with_persist_criteria(mut self, criteria: BoxedCriteria<DomainRecord>) -> Self {
        self.persist_criteria = Some(criteria);
        self
    }

    /// Emit transactions still open when the footer is reached.
    pub fn with_flush_trailing(mut self, flush: bool) -> Self {
        self.flush_trailing = flush;
        self
    }

    pub fn stats(&self) -> DispatchStats {
        self.stats
    }

    pub(crate) fn stats_mut(&mut self) -> &mut DispatchStats {
        &mut self.stats
    }

    /// Number of cached object names.
    pub fn cached_objects(&self) -> usize {
        self.object_names.len()
    }

    /// Read and dispatch one entry record, appending results to `out`.
    pub fn read_next<R: Read + Seek>(
        &mut self,
        stream: &mut PlogStream<R>,
        transactions: &mut dyn TransactionTable,
        out: &mut Vec<DomainRecord>,
    ) -> Result<DispatchOutcome> {
        let mut record = match stream.read_entry()? {
            ReadEntry::Record(record) => record,
            ReadEntry::Waiting {
                attempts,
                retry_after,
            } => {
                self.stats.waits += 1;
                return Ok(DispatchOutcome::Waiting {
                    attempts,
                    retry_after,
                });
            }
            ReadEntry::Done => return Ok(DispatchOutcome::Done),
        };
        self.stats.read += 1;

        self.process(stream, transactions, &mut record, out)
            .map_err(|e| {
                e.with_record_context(
                    record.sub_type.to_string(),
                    record.owner.as_deref(),
                    record.scn,
                    record.unique_offset,
                )
            })
    }

    fn process<R: Read + Seek>(
        &mut self,
        stream: &mut PlogStream<R>,
        transactions: &mut dyn TransactionTable,
        record: &mut EntryRecord,
        out: &mut Vec<DomainRecord>,
    ) -> Result<DispatchOutcome> {
        // the record is consumed from here on, even if its tags fail to decode
        stream.advance_offset(record.size_bytes());
        record.unique_offset = stream.replicate_offset();
        if let Some(tag) = record.tag(EntryTagType::Scn) {
            record.scn = decode_scn(&tag.raw_data)?;
        }
        if record.sub_type.uses_column_metadata() {
            record.owner = self.resolve_owner(record)?;
        }

        if record.sub_type.is_footer() {
            if self.flush_trailing && !stream.is_proxy() {
                for marker in transactions.take_pending_transactions() {
                    debug!("Flushing trailing transaction {}", marker.xid);
                    out.push(marker.into_trailing_record(record.unique_offset));
                    self.stats.emitted += 1;
                }
            }
            info!(
                "Reached footer of {} at offset {}",
                stream.descriptor().path.display(),
                record.unique_offset
            );
            stream.finish();
            return Ok(DispatchOutcome::Done);
        }

        let emitted = self.dispatch(stream, record, out)?;

        if record.sub_type.is_include_file_record() {
            return Ok(DispatchOutcome::IncludeFile(load_file_ref(record)?));
        }
        if record.sub_type.is_include_file_stats_record() {
            let record_count = match record.tag(EntryTagType::LoadRecordCount) {
                Some(tag) => decode_long(&tag.raw_data)? as u64,
                None => 0,
            };
            return Ok(DispatchOutcome::IncludeFileStats { record_count });
        }
        Ok(DispatchOutcome::Processed { emitted })
    }

    /// Run the parsers registered for the record's category.
    fn dispatch<R: Read + Seek>(
        &mut self,
        stream: &PlogStream<R>,
        record: &EntryRecord,
        out: &mut Vec<DomainRecord>,
    ) -> Result<usize> {
        let category = record.sub_type.parent();
        if !self.parsers.iter().any(|(c, _)| *c == category) {
            debug!("No parser for {:?}, skipping {}", category, record.sub_type);
            self.stats.skipped += 1;
            return Ok(0);
        }
        if !self.default_criteria.meet(record)? {
            debug!(
                "Skipping {} on internal schema {:?}",
                record.sub_type, record.owner
            );
            self.stats.filtered += 1;
            return Ok(0);
        }

        let ctx = PlogContext {
            descriptor: stream.descriptor(),
            features: stream.features(),
            offset: record.unique_offset,
            is_proxy: stream.is_proxy(),
        };
        let mut emitted = 0;
        for (_, parser) in self.parsers.iter_mut().filter(|(c, _)| *c == category) {
            if record.sub_type.is_lob_partial() && !parser.supports_multi_part_merging() {
                trace!("parser does not merge multi-part records, skipping");
                continue;
            }
            if !parser.is_aggregate() {
                if let Some(criteria) = &self.parse_criteria {
                    if !criteria.meet(record)? {
                        self.stats.filtered += 1;
                        continue;
                    }
                }
            }

            parser.parse(&ctx, record)?;
            if !parser.can_emit() {
                continue;
            }

            let mut domain = parser.emit()?;
            domain.offset = record.unique_offset;
            if let Some(criteria) = &self.filter_criteria {
                if !criteria.meet(&domain)? {
                    debug!("Filtered {:?} record at {}", domain.kind, domain.offset);
                    self.stats.filtered += 1;
                    continue;
                }
            }
            domain.persist = match domain.kind {
                DomainRecordType::Transaction => domain.complete,
                _ => match &self.persist_criteria {
                    Some(criteria) => criteria.meet(&domain)?,
                    None => true,
                },
            };
            out.push(domain);
            emitted += 1;
        }
        self.stats.emitted += emitted as u64;
        Ok(emitted)
    }

    /// Qualified owner of a data record, cached by object id.
    fn resolve_owner(&mut self, record: &EntryRecord) -> Result<Option<String>> {
        let obj_id = match record.tag(EntryTagType::ObjId) {
            Some(tag) => Some(decode_int(&tag.raw_data)?),
            None => None,
        };
        if let Some(name) = obj_id.and_then(|id| self.object_names.get(&id)) {
            return Ok(Some(name.clone()));
        }

        let owner = tag_string(record, EntryTagType::ObjOwner)?;
        let name = tag_string(record, EntryTagType::ObjName)?;
        let qualified = match (owner, name) {
            (Some(owner), Some(name)) => strip_markers(&format!("{}.{}", owner, name)),
            // partial metadata is used for this record only
            (Some(part), None) | (None, Some(part)) => return Ok(Some(strip_markers(&part))),
            (None, None) => return Ok(None),
        };

        if let Some(id) = obj_id {
            debug!("Caching object {} as {}", id, qualified);
            self.object_names.insert(id, qualified.clone());
        }
        Ok(Some(qualified))
    }
}

fn tag_string(record: &EntryRecord, tag: EntryTagType) -> Result<Option<String>> {
    match record.tag(tag) {
        Some(tag) => decode_string(&tag.raw_data),
        None => Ok(None),
    }
}

/// Remove quoting and NUL markers from an object name.
fn strip_markers(name: &str) -> String {
    name.chars().filter(|c| *c != '"' && *c != '\0').collect()
}

fn load_file_ref(record: &EntryRecord) -> Result<LoadFileRef> {
    let file_id = record
        .tag(EntryTagType::LoadFileId)
        .ok_or_else(|| PlogError::decode("include-file record without load file id"))?;
    let name = tag_string(record, EntryTagType::LoadFileName)?
        .ok_or_else(|| PlogError::decode("include-file record without load file name"))?;
    Ok(LoadFileRef {
        file_id: decode_long(&file_id.raw_data)? as u64,
        name,
    })
}
