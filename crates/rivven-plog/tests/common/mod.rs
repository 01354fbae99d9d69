//! Shared helpers for PLOG integration tests
//!
//! - [`PlogFileBuilder`]: writes well-formed PLOG files record by record
//! - [`ChangeParser`]: minimal data parser emitting one LCR per change
//! - [`init_test_logging`]: idempotent tracing setup

#![allow(dead_code)]

use rivven_plog::dispatch::{DomainParser, DomainRecord, DomainRecordType, PlogContext};
use rivven_plog::model::{EntryRecord, EntrySubType, EntryTagType};
use rivven_plog::stream::FileHeader;
use rivven_plog::Result;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;
use std::sync::Once;

static INIT: Once = Once::new();

/// Initialize test logging (idempotent)
pub fn init_test_logging() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::from_default_env()
                    .add_directive("rivven_plog=debug".parse().unwrap()),
            )
            .with_test_writer()
            .try_init()
            .ok();
    });
}

/// Encode chunks as little-endian bytes.
pub fn chunk_bytes(chunks: &[i32]) -> Vec<u8> {
    chunks.iter().flat_map(|c| c.to_le_bytes()).collect()
}

/// Length-prefixed chunk payload for strings.
pub fn framed(bytes: &[u8]) -> Vec<i32> {
    let mut buf = (bytes.len() as i32).to_le_bytes().to_vec();
    buf.extend_from_slice(bytes);
    while buf.len() % 4 != 0 {
        buf.push(0);
    }
    buf.chunks(4)
        .map(|c| i32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect()
}

pub fn scn_tag(scn: u64) -> Vec<i32> {
    vec![scn as u32 as i32, (scn >> 32) as u32 as i32]
}

/// Row change on `obj_id`, carrying owner metadata when given.
pub fn change(
    sub_type: EntrySubType,
    obj_id: i32,
    scn: u64,
    owner: Option<(&str, &str)>,
) -> EntryRecord {
    let mut record = EntryRecord::new(sub_type)
        .with_tag(EntryTagType::ObjId, vec![obj_id])
        .with_tag(EntryTagType::Scn, scn_tag(scn));
    if let Some((owner, name)) = owner {
        record.push_tag(EntryTagType::ObjOwner, framed(owner.as_bytes()));
        record.push_tag(EntryTagType::ObjName, framed(name.as_bytes()));
    }
    record
}

pub fn include_file(file_id: u64, name: &str) -> EntryRecord {
    EntryRecord::new(EntrySubType::IncludeFile)
        .with_tag(EntryTagType::LoadFileId, scn_tag(file_id))
        .with_tag(EntryTagType::LoadFileName, framed(name.as_bytes()))
}

pub fn include_file_stats(records: u64) -> EntryRecord {
    EntryRecord::new(EntrySubType::IncludeFileStats)
        .with_tag(EntryTagType::LoadRecordCount, scn_tag(records))
}

pub fn footer() -> EntryRecord {
    EntryRecord::new(EntrySubType::Footer)
}

/// Builds PLOG file contents.
pub struct PlogFileBuilder {
    bytes: Vec<u8>,
}

impl PlogFileBuilder {
    /// File header plus control header record with the given features.
    pub fn new(features: u32) -> Self {
        let mut bytes = Vec::new();
        FileHeader::default().write_to(&mut bytes).unwrap();
        let control = EntryRecord::new(EntrySubType::Header)
            .with_tag(EntryTagType::FeatureFlags, vec![features as i32]);
        bytes.extend(chunk_bytes(&control.to_chunks()));
        Self { bytes }
    }

    pub fn record(mut self, record: &EntryRecord) -> Self {
        self.bytes.extend(chunk_bytes(&record.to_chunks()));
        self
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn write_to(&self, path: &Path) {
        std::fs::write(path, &self.bytes).unwrap();
    }
}

/// Append raw bytes to a file, as a mining process would.
pub fn append(path: &Path, bytes: &[u8]) {
    let mut file = OpenOptions::new().append(true).open(path).unwrap();
    file.write_all(bytes).unwrap();
    file.flush().unwrap();
}

/// Emits one LCR per insert/update/delete and one DDL per DDL record.
#[derive(Default)]
pub struct ChangeParser {
    pending: Option<DomainRecord>,
}

impl DomainParser for ChangeParser {
    fn parse(&mut self, ctx: &PlogContext<'_>, record: &EntryRecord) -> Result<()> {
        let kind = match record.sub_type {
            EntrySubType::Ddl => DomainRecordType::Ddl,
            EntrySubType::Insert | EntrySubType::Update | EntrySubType::Delete => {
                DomainRecordType::Lcr
            }
            _ => return Ok(()),
        };
        let mut domain = DomainRecord::new(kind).with_scn(record.scn);
        domain.schema = record.owner.clone();
        domain.payload = serde_json::json!({
            "op": record.sub_type.to_string(),
            "proxy": ctx.is_proxy,
            "file": ctx.descriptor.unique_id,
        });
        self.pending = Some(domain);
        Ok(())
    }

    fn can_emit(&self) -> bool {
        self.pending.is_some()
    }

    fn emit(&mut self) -> Result<DomainRecord> {
        self.pending
            .take()
            .ok_or_else(|| rivven_plog::PlogError::parser("no change pending"))
    }
}
