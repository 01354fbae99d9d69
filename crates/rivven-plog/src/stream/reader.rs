//! Byte-offset state machine over one physical PLOG file
//!
//! ```text
//! Unopened ──open──► Ready ──read──► Busy ──► Ready
//!                                      │
//!                            end of input mid-record
//!                                      ▼
//!                              Waiting{since, attempts} ──read──► Busy
//!                                      │
//!                   load file / forced restart timeout / finish
//!                                      ▼
//!                                    Done
//! Closed is reachable from every state.
//! ```
//!
//! Every read marks the position first and rewinds to the mark when the
//! input ends inside a record, so a partially written record is never
//! consumed.

use super::header::{FileHeader, FILE_HEADER_BYTES};
use super::wait::{WaitDecision, WaitPolicy};
use crate::codec::{decode_int, CHUNK_SIZE};
use crate::common::{PlogError, ReplicateOffset, Result};
use crate::model::{EntryRecord, EntryTagType, FeatureFlags, ENTRY_HEADER_CHUNKS};
use crate::source::PlogDescriptor;
use std::io::{ErrorKind, Read, Seek, SeekFrom};
use std::time::{Duration, Instant};
use tracing::{debug, info, trace, warn};

/// Upper bound on a single entry record (256 MiB)
pub const MAX_ENTRY_CHUNKS: usize = 1 << 26;

/// Lifecycle state of a [`PlogStream`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    Unopened,
    Ready,
    Busy,
    Waiting { since: Instant, attempts: u32 },
    Done,
    Closed,
}

/// Result of one read attempt
#[derive(Debug)]
pub enum ReadEntry {
    Record(EntryRecord),
    /// Not enough data yet; retry after the suggested interval
    Waiting { attempts: u32, retry_after: Duration },
    Done,
}

#[derive(Debug, Clone, Copy)]
struct Mark {
    position: u64,
    offset: u64,
}

/// Sequential entry reader over one PLOG file
pub struct PlogStream<R> {
    reader: R,
    descriptor: PlogDescriptor,
    state: StreamState,
    offset: u64,
    mark: Option<Mark>,
    /// Offset pinned by the parent stream when reading a load file
    pinned: Option<ReplicateOffset>,
    paused: bool,
    header: Option<FileHeader>,
    features: FeatureFlags,
    wait_policy: WaitPolicy,
    records_read: u64,
}

impl<R: Read + Seek> PlogStream<R> {
    pub fn new(reader: R, descriptor: PlogDescriptor) -> Self {
        Self {
            reader,
            descriptor,
            state: StreamState::Unopened,
            offset: 0,
            mark: None,
            pinned: None,
            paused: false,
            header: None,
            features: FeatureFlags::default(),
            wait_policy: WaitPolicy::default(),
            records_read: 0,
        }
    }

    /// Create a proxy stream whose records all carry `pinned`.
    pub fn proxy(reader: R, descriptor: PlogDescriptor, pinned: ReplicateOffset) -> Self {
        Self {
            pinned: Some(pinned),
            ..Self::new(reader, descriptor)
        }
    }

    pub fn with_wait_policy(mut self, policy: WaitPolicy) -> Self {
        self.wait_policy = policy;
        self
    }

    /// Validate the file header and the control header record.
    pub fn open(&mut self) -> Result<()> {
        match self.state {
            StreamState::Unopened => {}
            StreamState::Closed => return Err(PlogError::StreamClosed),
            state => {
                return Err(PlogError::invalid_state(format!(
                    "stream already opened ({:?})",
                    state
                )))
            }
        }

        self.reader.seek(SeekFrom::Start(0))?;
        let header = FileHeader::read_from(&mut self.reader)?;
        self.offset = FILE_HEADER_BYTES;

        let chunks = self.read_raw_entry().map_err(|e| {
            if is_end_of_input(&e) {
                PlogError::format("truncated control header record")
            } else {
                e
            }
        })?;
        let control = EntryRecord::parse(&chunks)?;
        if !control.sub_type.is_header() {
            return Err(PlogError::format(format!(
                "first record of {} is {:?}, expected a control header",
                self.descriptor.path.display(),
                control.sub_type
            )));
        }
        self.features = match control.tag(EntryTagType::FeatureFlags) {
            Some(tag) => FeatureFlags::from_bits(decode_int(&tag.raw_data)? as u32),
            None => FeatureFlags::default(),
        };
        self.offset += control.size_bytes();
        self.header = Some(header);
        self.state = StreamState::Ready;

        info!(
            "Opened PLOG {} (file {}, v{}.{}, features 0x{:X}{})",
            self.descriptor.path.display(),
            self.descriptor.unique_id,
            header.major,
            header.minor,
            self.features.bits(),
            if self.is_proxy() { ", proxy" } else { "" }
        );
        Ok(())
    }

    /// Read the next entry record.
    pub fn read_entry(&mut self) -> Result<ReadEntry> {
        match self.state {
            StreamState::Unopened => {
                return Err(PlogError::invalid_state("stream is not opened"))
            }
            StreamState::Closed => return Err(PlogError::StreamClosed),
            StreamState::Done => return Ok(ReadEntry::Done),
            _ => {}
        }

        let previous = self.state;
        self.mark()?;
        self.state = StreamState::Busy;

        match self.read_raw_entry().and_then(|chunks| EntryRecord::parse(&chunks)) {
            Ok(record) => {
                self.state = StreamState::Ready;
                self.records_read += 1;
                trace!(
                    "read {:?} ({} bytes) at offset {}",
                    record.sub_type,
                    record.size_bytes(),
                    self.offset
                );
                Ok(ReadEntry::Record(record))
            }
            Err(e) if is_end_of_input(&e) => {
                self.rewind()?;
                Ok(self.on_end_of_input(previous))
            }
            Err(e) => {
                // a malformed record is never partially consumed
                self.rewind()?;
                self.state = StreamState::Ready;
                warn!(
                    "Malformed record in {} at offset {}: {}",
                    self.descriptor.path.display(),
                    self.offset,
                    e
                );
                Err(e)
            }
        }
    }

    fn on_end_of_input(&mut self, previous: StreamState) -> ReadEntry {
        if self.descriptor.is_load_file {
            debug!(
                "Load file {} exhausted after {} records",
                self.descriptor.path.display(),
                self.records_read
            );
            self.state = StreamState::Done;
            return ReadEntry::Done;
        }

        let (since, attempts) = match previous {
            StreamState::Waiting { since, attempts } => (since, attempts + 1),
            _ => (Instant::now(), 1),
        };
        match self
            .wait_policy
            .evaluate(attempts, self.descriptor.forced_restart)
        {
            WaitDecision::Retry {
                attempts,
                retry_after,
            } => {
                trace!(
                    "waiting for data in {} (attempt {})",
                    self.descriptor.path.display(),
                    attempts
                );
                self.state = StreamState::Waiting { since, attempts };
                ReadEntry::Waiting {
                    attempts,
                    retry_after,
                }
            }
            WaitDecision::GiveUp { attempts } => {
                warn!(
                    "No new data in {} after {} waits ({:?}) and mining was restarted; terminating reader",
                    self.descriptor.path.display(),
                    attempts,
                    since.elapsed()
                );
                self.state = StreamState::Done;
                ReadEntry::Done
            }
        }
    }

    /// Read the chunks of one entry record at the current position.
    fn read_raw_entry(&mut self) -> Result<Vec<i32>> {
        let mut len_buf = [0u8; CHUNK_SIZE];
        self.reader.read_exact(&mut len_buf)?;
        let length = i32::from_le_bytes(len_buf);
        if length < ENTRY_HEADER_CHUNKS as i32 || length as usize > MAX_ENTRY_CHUNKS {
            return Err(PlogError::format(format!(
                "invalid entry record length {} in {}",
                length,
                self.descriptor.path.display()
            )));
        }

        let mut body = vec![0u8; (length as usize - 1) * CHUNK_SIZE];
        self.reader.read_exact(&mut body)?;

        let mut chunks = Vec::with_capacity(length as usize);
        chunks.push(length);
        chunks.extend(
            body.chunks_exact(CHUNK_SIZE)
                .map(|c| i32::from_le_bytes([c[0], c[1], c[2], c[3]])),
        );
        Ok(chunks)
    }

    /// Remember the current position and offset.
    pub fn mark(&mut self) -> Result<()> {
        self.mark = Some(Mark {
            position: self.reader.stream_position()?,
            offset: self.offset,
        });
        Ok(())
    }

    /// Return to the last mark.
    pub fn rewind(&mut self) -> Result<()> {
        let mark = self
            .mark
            .ok_or_else(|| PlogError::invalid_state("rewind without mark"))?;
        self.reader.seek(SeekFrom::Start(mark.position))?;
        self.offset = mark.offset;
        Ok(())
    }

    /// Skip forward to a checkpointed byte offset without parsing records.
    pub fn forward(&mut self, target: u64) -> Result<()> {
        if self.is_proxy() {
            return Err(PlogError::invalid_state("cannot forward a proxy stream"));
        }
        if target < self.offset {
            return Err(PlogError::invalid_state(format!(
                "cannot forward backwards from {} to {}",
                self.offset, target
            )));
        }
        let skip = target - self.offset;
        let position = self.reader.stream_position()?;
        let end = self.reader.seek(SeekFrom::End(0))?;
        if end < position + skip {
            self.reader.seek(SeekFrom::Start(position))?;
            return Err(PlogError::format(format!(
                "cannot forward {} to offset {}: only {} bytes available",
                self.descriptor.path.display(),
                target,
                end - self.offset.min(end)
            )));
        }
        self.reader.seek(SeekFrom::Start(position + skip))?;
        self.offset = target;
        debug!(
            "Forwarded {} to offset {}",
            self.descriptor.path.display(),
            target
        );
        Ok(())
    }

    /// Advance the offset by `bytes`; a no-op on proxy streams.
    pub fn advance_offset(&mut self, bytes: u64) {
        if self.is_proxy() {
            return;
        }
        self.offset += bytes;
    }

    /// Replicate offset of the current position.
    pub fn replicate_offset(&self) -> ReplicateOffset {
        match self.pinned {
            Some(pinned) => pinned,
            None => ReplicateOffset::new(self.descriptor.unique_id, self.offset),
        }
    }

    /// Mark the stream as paused while a load file is spliced in.
    pub fn pause(&mut self) {
        self.paused = true;
    }

    pub fn resume(&mut self) {
        self.paused = false;
    }

    /// Mark the stream as finished.
    pub fn finish(&mut self) {
        if self.state != StreamState::Closed {
            self.state = StreamState::Done;
        }
    }

    pub fn close(&mut self) {
        self.state = StreamState::Closed;
    }

    pub fn state(&self) -> StreamState {
        self.state
    }

    pub fn offset(&self) -> u64 {
        self.offset
    }

    pub fn descriptor(&self) -> &PlogDescriptor {
        &self.descriptor
    }

    pub fn header(&self) -> Option<&FileHeader> {
        self.header.as_ref()
    }

    pub fn features(&self) -> FeatureFlags {
        self.features
    }

    pub fn records_read(&self) -> u64 {
        self.records_read
    }

    pub fn is_proxy(&self) -> bool {
        self.pinned.is_some()
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn is_done(&self) -> bool {
        matches!(self.state, StreamState::Done | StreamState::Closed)
    }
}

fn is_end_of_input(err: &PlogError) -> bool {
    matches!(err, PlogError::Io(e) if e.kind() == ErrorKind::UnexpectedEof)
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;
    use crate::model::EntrySubType;
    use std::io::Cursor;

    fn insert(scn: i32) -> EntryRecord {
        EntryRecord::new(EntrySubType::Insert)
            .with_tag(EntryTagType::ObjId, vec![42])
            .with_tag(EntryTagType::Scn, vec![scn, 0])
    }

    fn stream(bytes: Vec<u8>) -> PlogStream<Cursor<Vec<u8>>> {
        PlogStream::new(Cursor::new(bytes), PlogDescriptor::new(9, "9.plog"))
    }

    #[test]
    fn test_open_reads_features() {
        let mut s = stream(plog_preamble(FeatureFlags::JSON_DICTIONARY));
        assert_eq!(s.state(), StreamState::Unopened);
        s.open().unwrap();
        assert_eq!(s.state(), StreamState::Ready);
        assert!(s.features().json_dictionary());
        // header (16) + control record (3 + 2 + 1 chunks)
        assert_eq!(s.offset(), 16 + 24);
        assert_eq!(s.replicate_offset(), ReplicateOffset::new(9, 40));
        assert!(s.open().is_err());
    }

    #[test]
    fn test_open_rejects_non_header_first_record() {
        let mut bytes = Vec::new();
        FileHeader::default().write_to(&mut bytes).unwrap();
        bytes.extend(record_bytes(&insert(1)));
        let mut s = stream(bytes);
        assert!(matches!(s.open(), Err(PlogError::Format(_))));
    }

    #[test]
    fn test_open_truncated_control() {
        let mut bytes = plog_preamble(0);
        bytes.truncate(30);
        assert!(matches!(stream(bytes).open(), Err(PlogError::Format(_))));
    }

    #[test]
    fn test_read_before_open() {
        let mut s = stream(plog_preamble(0));
        assert!(matches!(s.read_entry(), Err(PlogError::InvalidState(_))));
    }

    #[test]
    fn test_read_and_advance() {
        let record = insert(7);
        let mut bytes = plog_preamble(0);
        bytes.extend(record_bytes(&record));
        let mut s = stream(bytes);
        s.open().unwrap();

        let before = s.offset();
        let ReadEntry::Record(read) = s.read_entry().unwrap() else {
            panic!("expected record");
        };
        assert_eq!(read.sub_type, EntrySubType::Insert);
        s.advance_offset(read.size_bytes());
        assert_eq!(s.offset(), before + read.length as u64 * 4);
        assert_eq!(s.records_read(), 1);
    }

    #[test]
    fn test_partial_record_rewinds() {
        let full = record_bytes(&insert(7));
        let mut bytes = plog_preamble(0);
        bytes.extend_from_slice(&full[..full.len() - 3]);
        let mut s = stream(bytes);
        s.open().unwrap();
        let before = s.offset();

        match s.read_entry().unwrap() {
            ReadEntry::Waiting { attempts, .. } => assert_eq!(attempts, 1),
            other => panic!("expected wait, got {:?}", other),
        }
        assert_eq!(s.offset(), before);
        assert!(matches!(
            s.state(),
            StreamState::Waiting { attempts: 1, .. }
        ));

        match s.read_entry().unwrap() {
            ReadEntry::Waiting { attempts, .. } => assert_eq!(attempts, 2),
            other => panic!("expected wait, got {:?}", other),
        }

        // the writer finishes the record
        let position = s.reader.position();
        s.reader.get_mut().extend_from_slice(&full[full.len() - 3..]);
        assert_eq!(s.reader.position(), position);
        assert!(matches!(s.read_entry().unwrap(), ReadEntry::Record(_)));
        assert_eq!(s.state(), StreamState::Ready);
    }

    #[test]
    fn test_forced_restart_gives_up() {
        let descriptor = PlogDescriptor::new(9, "9.plog").with_forced_restart(true);
        let mut s = PlogStream::new(Cursor::new(plog_preamble(0)), descriptor)
            .with_wait_policy(WaitPolicy::new(Duration::ZERO, 2));
        s.open().unwrap();
        assert!(matches!(s.read_entry().unwrap(), ReadEntry::Waiting { .. }));
        assert!(matches!(s.read_entry().unwrap(), ReadEntry::Waiting { .. }));
        assert!(matches!(s.read_entry().unwrap(), ReadEntry::Done));
        assert!(s.is_done());
        assert!(matches!(s.read_entry().unwrap(), ReadEntry::Done));
    }

    #[test]
    fn test_load_file_eof_is_done() {
        let mut s = PlogStream::proxy(
            Cursor::new(plog_preamble(0)),
            PlogDescriptor::load_file(90, "90.plog"),
            ReplicateOffset::new(9, 512),
        );
        s.open().unwrap();
        assert!(matches!(s.read_entry().unwrap(), ReadEntry::Done));
    }

    #[test]
    fn test_proxy_offset_pinned() {
        let pinned = ReplicateOffset::new(9, 512);
        let mut bytes = plog_preamble(0);
        bytes.extend(record_bytes(&insert(1)));
        bytes.extend(record_bytes(&insert(2)));
        let mut s = PlogStream::proxy(
            Cursor::new(bytes),
            PlogDescriptor::load_file(90, "90.plog"),
            pinned,
        );
        s.open().unwrap();
        assert!(s.is_proxy());
        while let ReadEntry::Record(record) = s.read_entry().unwrap() {
            s.advance_offset(record.size_bytes());
            assert_eq!(s.replicate_offset(), pinned);
        }
        assert_eq!(s.records_read(), 2);
        assert!(s.forward(1000).is_err());
    }

    #[test]
    fn test_forward() {
        let first = insert(1);
        let second = insert(2);
        let mut bytes = plog_preamble(0);
        bytes.extend(record_bytes(&first));
        bytes.extend(record_bytes(&second));
        let total = bytes.len() as u64;
        let mut s = stream(bytes);
        s.open().unwrap();

        let target = s.offset() + first.size_bytes();
        s.forward(target).unwrap();
        assert_eq!(s.offset(), target);
        let ReadEntry::Record(read) = s.read_entry().unwrap() else {
            panic!("expected record");
        };
        assert_eq!(read.tag(EntryTagType::Scn).unwrap().raw_data, vec![2, 0]);

        assert!(matches!(s.forward(target), Err(PlogError::InvalidState(_))));
        assert!(matches!(s.forward(total + 8), Err(PlogError::Format(_))));
        assert_eq!(s.offset(), target);
    }

    #[test]
    fn test_mark_rewind() {
        let mut bytes = plog_preamble(0);
        bytes.extend(record_bytes(&insert(1)));
        let mut s = stream(bytes);
        s.open().unwrap();
        s.mark().unwrap();
        let ReadEntry::Record(record) = s.read_entry().unwrap() else {
            panic!("expected record");
        };
        s.advance_offset(record.size_bytes());
        // read_entry re-marks before reading
        s.rewind().unwrap();
        let ReadEntry::Record(again) = s.read_entry().unwrap() else {
            panic!("expected record");
        };
        assert_eq!(again, record);
    }

    #[test]
    fn test_invalid_entry_length() {
        let mut bytes = plog_preamble(0);
        bytes.extend(chunk_bytes(&[1, 3, 1]));
        let mut s = stream(bytes);
        s.open().unwrap();
        let before = s.offset();
        assert!(matches!(s.read_entry(), Err(PlogError::Format(_))));
        // retrying starts from the record boundary again
        assert_eq!(s.offset(), before);
        assert_eq!(s.reader.position(), before);
        assert_eq!(s.state(), StreamState::Ready);
        assert!(matches!(s.read_entry(), Err(PlogError::Format(_))));
    }

    #[test]
    fn test_unknown_ids_rejected_without_consuming() {
        let mut bytes = plog_preamble(0);
        // data record with an unassigned sub type id
        bytes.extend(chunk_bytes(&[3, 3, 99]));
        let mut s = stream(bytes);
        s.open().unwrap();
        let before = s.offset();
        assert!(matches!(s.read_entry(), Err(PlogError::Lookup(_))));
        assert_eq!(s.reader.position(), before);

        let mut bytes = plog_preamble(0);
        // insert carrying an unassigned tag id
        bytes.extend(chunk_bytes(&[6, 3, 1, 3, 0x7FFF, 0]));
        bytes.extend(record_bytes(&insert(1)));
        let mut s = stream(bytes);
        s.open().unwrap();
        let before = s.offset();
        assert!(matches!(s.read_entry(), Err(PlogError::Lookup(_))));
        assert_eq!(s.offset(), before);
        assert_eq!(s.reader.position(), before);
    }

    #[test]
    fn test_close_and_pause() {
        let mut s = stream(plog_preamble(0));
        s.open().unwrap();
        s.pause();
        assert!(s.is_paused());
        s.resume();
        assert!(!s.is_paused());
        s.close();
        assert!(matches!(s.read_entry(), Err(PlogError::StreamClosed)));
        s.finish();
        assert_eq!(s.state(), StreamState::Closed);
    }
}
