//! Entry and tag records
//!
//! Wire shapes, in chunks:
//!
//! ```text
//! entry: [length] [type id] [sub type id] [tag]...
//! tag:   [length] [tag id]  [payload]...
//! ```
//!
//! Both lengths include their own header chunks.

use super::entry_type::EntrySubType;
use super::tag_type::EntryTagType;
use crate::common::{PlogError, ReplicateOffset, Result};
use crate::codec::CHUNK_SIZE;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use tracing::trace;

/// Header chunks of an entry record (length, type id, sub type id)
pub const ENTRY_HEADER_CHUNKS: usize = 3;

/// Header chunks of a tag record (length, tag id)
pub const TAG_HEADER_CHUNKS: usize = 2;

/// One typed payload nested in an entry record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagRecord {
    /// Length in chunks, header included
    pub length: u32,
    /// Raw tag id
    pub id: u32,
    /// Payload chunks
    pub raw_data: Vec<i32>,
    /// Position among the tags of the parent record
    pub sequence: u32,
}

impl TagRecord {
    pub fn new(id: u32, raw_data: Vec<i32>, sequence: u32) -> Self {
        Self {
            length: (TAG_HEADER_CHUNKS + raw_data.len()) as u32,
            id,
            raw_data,
            sequence,
        }
    }
}

impl PartialOrd for TagRecord {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TagRecord {
    fn cmp(&self, other: &Self) -> Ordering {
        self.sequence
            .cmp(&other.sequence)
            .then_with(|| self.id.cmp(&other.id))
    }
}

/// One decoded unit of a PLOG stream
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntryRecord {
    /// Length in chunks, header included
    pub length: u32,
    /// Raw parent type id
    pub type_id: u32,
    pub sub_type: EntrySubType,
    pub tags: BTreeMap<EntryTagType, Vec<TagRecord>>,
    /// Resumption checkpoint, stamped by the dispatch loop
    pub unique_offset: ReplicateOffset,
    /// Qualified `owner.object` name, when resolved
    pub owner: Option<String>,
    /// Source change number, 0 when not applicable
    pub scn: u64,
}

impl EntryRecord {
    /// Create an empty record of the given sub type.
    pub fn new(sub_type: EntrySubType) -> Self {
        Self {
            length: ENTRY_HEADER_CHUNKS as u32,
            type_id: sub_type.parent().id(),
            sub_type,
            ..Default::default()
        }
    }

    /// Append a tag, keeping `length` in sync.
    pub fn push_tag(&mut self, tag: EntryTagType, raw_data: Vec<i32>) {
        let sequence = self.tag_count() as u32;
        let record = TagRecord::new(tag.id(), raw_data, sequence);
        self.length += record.length;
        self.tags.entry(tag).or_default().push(record);
    }

    /// Builder-style [`push_tag`](Self::push_tag).
    pub fn with_tag(mut self, tag: EntryTagType, raw_data: Vec<i32>) -> Self {
        self.push_tag(tag, raw_data);
        self
    }

    /// Parse an entry record from exactly `length` chunks.
    pub fn parse(chunks: &[i32]) -> Result<Self> {
        if chunks.len() < ENTRY_HEADER_CHUNKS {
            return Err(PlogError::format(format!(
                "entry record needs {} header chunks, got {}",
                ENTRY_HEADER_CHUNKS,
                chunks.len()
            )));
        }
        let length = chunks[0];
        if length < ENTRY_HEADER_CHUNKS as i32 || length as usize != chunks.len() {
            return Err(PlogError::format(format!(
                "invalid entry record length {} ({} chunks available)",
                length,
                chunks.len()
            )));
        }
        let type_id = chunks[1] as u32;
        let sub_type = EntrySubType::lookup(type_id, chunks[2] as u32)?;

        let mut tags: BTreeMap<EntryTagType, Vec<TagRecord>> = BTreeMap::new();
        let mut pos = ENTRY_HEADER_CHUNKS;
        let mut sequence = 0u32;
        while pos < chunks.len() {
            let remaining = chunks.len() - pos;
            if remaining < TAG_HEADER_CHUNKS {
                return Err(PlogError::format(format!(
                    "truncated tag header at chunk {} of {:?} record",
                    pos, sub_type
                )));
            }
            let tag_len = chunks[pos];
            if tag_len < TAG_HEADER_CHUNKS as i32 || tag_len as usize > remaining {
                return Err(PlogError::format(format!(
                    "invalid tag length {} at chunk {} of {:?} record",
                    tag_len, pos, sub_type
                )));
            }
            let tag_len = tag_len as usize;
            let id = chunks[pos + 1] as u32;
            let tag = EntryTagType::from_id(id)?;
            let raw_data = chunks[pos + TAG_HEADER_CHUNKS..pos + tag_len].to_vec();
            tags.entry(tag).or_default().push(TagRecord {
                length: tag_len as u32,
                id,
                raw_data,
                sequence,
            });
            sequence += 1;
            pos += tag_len;
        }

        trace!(
            "parsed {:?} record: {} chunks, {} tags",
            sub_type,
            length,
            sequence
        );

        Ok(Self {
            length: length as u32,
            type_id,
            sub_type,
            tags,
            ..Default::default()
        })
    }

    /// Encode back into wire chunks, tags in sequence order.
    pub fn to_chunks(&self) -> Vec<i32> {
        let mut out = Vec::with_capacity(self.length as usize);
        out.push(self.length as i32);
        out.push(self.type_id as i32);
        out.push(self.sub_type.sub_id() as i32);

        let mut ordered: Vec<&TagRecord> = self.tags.values().flatten().collect();
        ordered.sort();
        for tag in ordered {
            out.push(tag.length as i32);
            out.push(tag.id as i32);
            out.extend_from_slice(&tag.raw_data);
        }
        out
    }

    /// First tag of the given type.
    pub fn tag(&self, tag: EntryTagType) -> Option<&TagRecord> {
        self.tags.get(&tag).and_then(|v| v.first())
    }

    /// All tags of the given type, in record order.
    pub fn tags_of(&self, tag: EntryTagType) -> &[TagRecord] {
        self.tags.get(&tag).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn has_tag(&self, tag: EntryTagType) -> bool {
        self.tags.contains_key(&tag)
    }

    /// Total number of tags.
    pub fn tag_count(&self) -> usize {
        self.tags.values().map(Vec::len).sum()
    }

    /// Encoded size in bytes.
    pub fn size_bytes(&self) -> u64 {
        self.length as u64 * CHUNK_SIZE as u64
    }
}
