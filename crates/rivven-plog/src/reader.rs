//! # PLOG Reader
//!
//! [`PlogReader`] drives one physical PLOG file end to end: it opens the
//! parent stream, resumes at a checkpoint, runs the dispatch loop, splices
//! referenced load files in through proxy streams and collects the emitted
//! domain records into a batch the caller drains with
//! [`flush`](PlogReader::flush).
//!
//! ## Polling
//!
//! [`read`](PlogReader::read) never blocks. When the file is still being
//! written it returns [`ReadStatus::Waiting`] with a suggested retry
//! interval; [`read_blocking`](PlogReader::read_blocking) sleeps that
//! interval on a [`CancelToken`] instead, and cancelling the token ends
//! the reader.
//!
//! ```rust,no_run
//! use rivven_plog::common::PlogReaderConfig;
//! use rivven_plog::dispatch::DomainReader;
//! use rivven_plog::reader::{PlogReader, ReadStatus};
//! use rivven_plog::source::{FsPlogSource, PlogDescriptor};
//!
//! # fn run(domain: DomainReader) -> rivven_plog::common::Result<()> {
//! let descriptor = PlogDescriptor::new(1, "/var/plog/1.plog");
//! let mut reader = PlogReader::open(
//!     FsPlogSource::new(),
//!     descriptor,
//!     domain,
//!     PlogReaderConfig::default(),
//! )?;
//! loop {
//!     let status = reader.read_blocking()?;
//!     for record in reader.flush() {
//!         println!("{:?} at {}", record.kind, record.offset);
//!     }
//!     if status == ReadStatus::Done {
//!         break;
//!     }
//! }
//! # Ok(())
//! # }
//! ```

use crate::common::{PlogError, PlogReaderConfig, ReplicateOffset, Result};
use crate::dispatch::{
    DispatchOutcome, DispatchStats, DomainReader, DomainRecord, NoTransactions, TransactionTable,
};
use crate::source::{LoadFileRef, PlogDescriptor, PlogSource};
use crate::stream::PlogStream;
use parking_lot::{Condvar, Mutex};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Outcome of a read call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadStatus {
    /// A record was processed
    Progress,
    /// The batch reached the flush threshold; call `flush` before reading on
    BatchFull,
    /// No complete record is available yet
    Waiting { attempts: u32, retry_after: Duration },
    /// The file is finished; the batch may still hold records
    Done,
}

/// Cooperative cancellation for blocking reads.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    inner: Arc<(Mutex<bool>, Condvar)>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancel and wake every waiter.
    pub fn cancel(&self) {
        let (lock, cvar) = &*self.inner;
        *lock.lock() = true;
        cvar.notify_all();
    }

    pub fn is_cancelled(&self) -> bool {
        *self.inner.0.lock()
    }

    /// Sleep up to `timeout`; returns true when cancelled.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let (lock, cvar) = &*self.inner;
        let mut cancelled = lock.lock();
        if !*cancelled {
            cvar.wait_for(&mut cancelled, timeout);
        }
        *cancelled
    }
}

struct ActiveProxy<R> {
    stream: PlogStream<R>,
}

/// Reader over one physical PLOG file
pub struct PlogReader<S: PlogSource> {
    source: S,
    config: PlogReaderConfig,
    stream: PlogStream<S::Reader>,
    proxy: Option<ActiveProxy<S::Reader>>,
    /// Records produced by the last completed load file
    last_load_records: Option<u64>,
    domain: DomainReader,
    transactions: Box<dyn TransactionTable>,
    batch: Vec<DomainRecord>,
    cancel: CancelToken,
}

impl<S: PlogSource> PlogReader<S> {
    /// Open the file, validate its header and resume at the configured
    /// start offset when it belongs to this file.
    pub fn open(
        source: S,
        descriptor: PlogDescriptor,
        domain: DomainReader,
        config: PlogReaderConfig,
    ) -> Result<Self> {
        config.validate()?;
        let reader = source.open(&descriptor)?;
        let mut stream = PlogStream::new(reader, descriptor).with_wait_policy(config.wait_policy());
        stream.open()?;

        if let Some(start) = config.start_offset {
            if start.file_id == stream.descriptor().unique_id && start.offset > stream.offset() {
                info!("Resuming {} at {}", stream.descriptor().path.display(), start);
                stream.forward(start.offset)?;
            }
        }

        let domain = domain.with_flush_trailing(config.flush_trailing_transactions);
        Ok(Self {
            source,
            batch: Vec::with_capacity(config.flush_threshold),
            config,
            stream,
            proxy: None,
            last_load_records: None,
            domain,
            transactions: Box::new(NoTransactions),
            cancel: CancelToken::new(),
        })
    }

    /// Use the file's transaction table for trailing-transaction flushes.
    pub fn with_transaction_table(mut self, table: Box<dyn TransactionTable>) -> Self {
        self.transactions = table;
        self
    }

    pub fn with_cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Process at most one entry record.
    pub fn read(&mut self) -> Result<ReadStatus> {
        if self.cancel.is_cancelled() && !self.is_done() {
            self.stop("cancelled");
        }
        if self.batch.len() >= self.config.flush_threshold {
            return Ok(ReadStatus::BatchFull);
        }

        if let Some(proxy) = self.proxy.as_mut() {
            let outcome = self.domain.read_next(
                &mut proxy.stream,
                self.transactions.as_mut(),
                &mut self.batch,
            )?;
            return match outcome {
                DispatchOutcome::IncludeFile(reference) => Err(PlogError::format(format!(
                    "nested load file {} referenced from load file {}",
                    reference.name,
                    proxy.stream.descriptor().path.display()
                ))),
                DispatchOutcome::Waiting {
                    attempts,
                    retry_after,
                } => Ok(ReadStatus::Waiting {
                    attempts,
                    retry_after,
                }),
                DispatchOutcome::Done => {
                    self.end_splice();
                    Ok(self.progress())
                }
                DispatchOutcome::Processed { .. } | DispatchOutcome::IncludeFileStats { .. } => {
                    Ok(self.progress())
                }
            };
        }

        let outcome =
            self.domain
                .read_next(&mut self.stream, self.transactions.as_mut(), &mut self.batch)?;
        match outcome {
            DispatchOutcome::Processed { .. } => {}
            DispatchOutcome::IncludeFile(reference) => self.begin_splice(&reference)?,
            DispatchOutcome::IncludeFileStats { record_count } => {
                self.check_load_stats(record_count)
            }
            DispatchOutcome::Waiting {
                attempts,
                retry_after,
            } => {
                return Ok(ReadStatus::Waiting {
                    attempts,
                    retry_after,
                })
            }
            DispatchOutcome::Done => return Ok(ReadStatus::Done),
        }
        Ok(self.progress())
    }

    /// Read, sleeping on the cancel token while waiting for data.
    pub fn read_blocking(&mut self) -> Result<ReadStatus> {
        loop {
            match self.read()? {
                ReadStatus::Waiting { retry_after, .. } => {
                    if self.cancel.wait_timeout(retry_after) {
                        self.stop("cancelled while waiting for data");
                        return Ok(ReadStatus::Done);
                    }
                }
                status => return Ok(status),
            }
        }
    }

    /// Drain the output batch.
    pub fn flush(&mut self) -> Vec<DomainRecord> {
        let batch = std::mem::replace(
            &mut self.batch,
            Vec::with_capacity(self.config.flush_threshold),
        );
        debug!("Flushing {} domain records", batch.len());
        batch
    }

    /// Close the parent stream and any active load file.
    pub fn close(&mut self) {
        if let Some(mut proxy) = self.proxy.take() {
            proxy.stream.close();
        }
        self.stream.close();
        info!(
            "Closed PLOG reader for {}",
            self.stream.descriptor().path.display()
        );
    }

    pub fn stats(&self) -> DispatchStats {
        self.domain.stats()
    }

    /// Replicate offset of the last consumed record.
    pub fn offset(&self) -> ReplicateOffset {
        match &self.proxy {
            Some(proxy) => proxy.stream.replicate_offset(),
            None => self.stream.replicate_offset(),
        }
    }

    pub fn descriptor(&self) -> &PlogDescriptor {
        self.stream.descriptor()
    }

    pub fn pending(&self) -> usize {
        self.batch.len()
    }

    pub fn is_splicing(&self) -> bool {
        self.proxy.is_some()
    }

    pub fn is_done(&self) -> bool {
        self.proxy.is_none() && self.stream.is_done()
    }

    pub fn config(&self) -> &PlogReaderConfig {
        &self.config
    }

    fn progress(&self) -> ReadStatus {
        if self.batch.len() >= self.config.flush_threshold {
            ReadStatus::BatchFull
        } else {
            ReadStatus::Progress
        }
    }

    fn begin_splice(&mut self, reference: &LoadFileRef) -> Result<()> {
        let descriptor = self
            .source
            .resolve_load_file(self.stream.descriptor(), reference)?;
        let reader = self.source.open(&descriptor)?;
        let pinned = self.stream.replicate_offset();
        let mut stream = PlogStream::proxy(reader, descriptor, pinned)
            .with_wait_policy(self.config.wait_policy());
        stream.open()?;

        info!(
            "Splicing load file {} into {} at {}",
            reference.name,
            self.stream.descriptor().path.display(),
            pinned
        );
        self.stream.pause();
        self.domain.stats_mut().load_files += 1;
        self.proxy = Some(ActiveProxy { stream });
        Ok(())
    }

    fn end_splice(&mut self) {
        if let Some(proxy) = self.proxy.take() {
            let records = proxy.stream.records_read();
            info!(
                "Load file {} finished after {} records",
                proxy.stream.descriptor().path.display(),
                records
            );
            self.last_load_records = Some(records);
        }
        self.stream.resume();
    }

    fn check_load_stats(&mut self, expected: u64) {
        match self.last_load_records.take() {
            Some(actual) if actual != expected => warn!(
                "Load file record count mismatch in {}: expected {}, read {}",
                self.stream.descriptor().path.display(),
                expected,
                actual
            ),
            Some(actual) => debug!("Load file record count verified ({})", actual),
            None => debug!("Load file statistics without a preceding load file"),
        }
    }

    fn stop(&mut self, reason: &str) {
        info!(
            "Stopping PLOG reader for {}: {}",
            self.stream.descriptor().path.display(),
            reason
        );
        if let Some(mut proxy) = self.proxy.take() {
            proxy.stream.finish();
        }
        self.stream.resume();
        self.stream.finish();
    }
}
