//! Append-only log file
//!
//! Handles appending records, syncing, replay and close. All of these go
//! through one exclusive lock.

use std::fs::{File, OpenOptions};
use std::io::{self, ErrorKind, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use bytes::{Buf, BytesMut};
use parking_lot::Mutex;

use crate::config::WalSyncStrategy;
use crate::error::{KvError, Result};
use crate::protocol::{encode_value, Value};
use super::flusher::Flusher;
use super::recovery::{replay_records, ReplayStats};

/// Pending bytes beyond this are written out before a new record is buffered
const WRITE_BUFFER_CAPACITY: usize = 64 * 1024;

/// State behind the log lock
///
/// The log's logical contents are the first `written` bytes of `file`
/// followed by `pending`.
pub(crate) struct LogFile {
    file: File,

    /// Encoded records accepted but not yet handed to the OS
    pending: BytesMut,

    /// Bytes of `file` holding accepted records
    written: u64,

    /// Length to cut `file` back to before anything else is written; set when
    /// removing a failed record could not truncate right away
    rollback_to: Option<u64>,

    /// Last flush/sync failure not yet cleared by a successful retry
    sync_failure: Option<String>,

    /// Records appended since open
    appended: u64,

    closed: bool,
}

impl LogFile {
    fn logical_len(&self) -> u64 {
        self.written + self.pending.len() as u64
    }

    /// Hand every pending byte to the OS, keeping `written` exact even when
    /// a write fails part way
    fn write_pending(&mut self) -> io::Result<()> {
        while !self.pending.is_empty() {
            match self.file.write(&self.pending) {
                Ok(0) => {
                    return Err(io::Error::new(
                        ErrorKind::WriteZero,
                        "log file accepted no bytes",
                    ))
                }
                Ok(n) => {
                    self.pending.advance(n);
                    self.written += n as u64;
                }
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }

    /// Finish cutting off a rolled-back record
    fn restore_tail(&mut self) -> io::Result<()> {
        if let Some(len) = self.rollback_to {
            self.file.set_len(len)?;
            self.written = len;
            self.rollback_to = None;
        }
        Ok(())
    }

    /// Write pending bytes to the OS and fsync
    fn sync(&mut self) -> io::Result<()> {
        self.restore_tail()?;
        self.write_pending()?;
        self.file.sync_data()
    }

    /// Sync and keep `sync_failure` in step with the outcome
    fn sync_tracked(&mut self) -> Result<()> {
        match self.sync() {
            Ok(()) => {
                if let Some(previous) = self.sync_failure.take() {
                    tracing::info!("Log sync recovered after failure: {}", previous);
                }
                Ok(())
            }
            Err(e) => {
                let message = e.to_string();
                self.sync_failure = Some(message.clone());
                Err(KvError::WalSync(message))
            }
        }
    }

    /// Add one encoded record, writing it through under `EveryWrite`
    fn stage(&mut self, record: &[u8], sync_strategy: WalSyncStrategy) -> Result<()> {
        if !self.pending.is_empty() && self.pending.len() + record.len() > WRITE_BUFFER_CAPACITY {
            if let Err(e) = self.write_pending() {
                self.sync_failure = Some(e.to_string());
                return Err(e.into());
            }
        }

        self.pending.extend_from_slice(record);

        if sync_strategy == WalSyncStrategy::EveryWrite {
            self.sync_tracked()?;
        }
        Ok(())
    }

    /// Drop everything from logical offset `start` on
    ///
    /// Used when a record could not be made durable: the caller reports the
    /// append as failed, so no byte of it may survive to be replayed.
    fn roll_back(&mut self, start: u64) {
        if self.written <= start {
            self.pending.truncate((start - self.written) as usize);
            return;
        }

        self.pending.clear();
        self.rollback_to = Some(start);
        if let Err(e) = self.restore_tail() {
            tracing::error!(
                "Failed to cut unacknowledged record off the log at offset {}: {}",
                start,
                e
            );
            self.sync_failure = Some(e.to_string());
        }
    }

    /// One tick of the background flusher
    pub(crate) fn background_sync(&mut self) {
        if self.closed {
            return;
        }
        if let Err(e) = self.sync_tracked() {
            tracing::error!("Background log flush failed (will retry): {}", e);
        }
    }
}

/// The append-only command log
///
/// The file is a plain concatenation of wire-encoded request arrays with no
/// header or extra framing, read back with the same decoder used for network
/// input.
pub struct Wal {
    path: PathBuf,
    sync_strategy: WalSyncStrategy,
    file: Arc<Mutex<LogFile>>,
    flusher: Mutex<Option<Flusher>>,
}

impl Wal {
    /// Open or create the log file
    ///
    /// With [`WalSyncStrategy::Interval`] a background task flushes and
    /// fsyncs on that period until [`Wal::close`].
    pub fn open(path: &Path, sync_strategy: WalSyncStrategy) -> Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(path)?;

        let written = file.metadata()?.len();

        let file = Arc::new(Mutex::new(LogFile {
            file,
            pending: BytesMut::new(),
            written,
            rollback_to: None,
            sync_failure: None,
            appended: 0,
            closed: false,
        }));

        let flusher = match sync_strategy {
            WalSyncStrategy::Interval { period } => {
                Some(Flusher::spawn(Arc::clone(&file), period)?)
            }
            WalSyncStrategy::EveryWrite => None,
        };

        tracing::debug!("Opened log {:?} ({:?})", path, sync_strategy);

        Ok(Self {
            path: path.to_path_buf(),
            sync_strategy,
            file,
            flusher: Mutex::new(flusher),
        })
    }

    /// Append one request record
    ///
    /// If an earlier flush failed, the flush is retried first and the append
    /// is refused while it keeps failing. When an append fails, the record is
    /// removed again, so a mutation reported as failed is never replayed.
    pub fn append(&self, request: &Value) -> Result<()> {
        let mut file = self.file.lock();
        if file.closed {
            return Err(closed_error());
        }

        if let Some(previous) = file.sync_failure.clone() {
            tracing::warn!("Retrying log sync before append (last failure: {})", previous);
            file.sync_tracked()?;
        }

        let start = file.logical_len();
        let record = encode_value(request);
        if let Err(e) = file.stage(&record, self.sync_strategy) {
            file.roll_back(start);
            return Err(e);
        }
        file.appended += 1;
        Ok(())
    }

    /// Force pending records to stable storage
    pub fn sync(&self) -> Result<()> {
        let mut file = self.file.lock();
        if file.closed {
            return Err(closed_error());
        }
        file.sync_tracked()
    }

    /// Read every record from the start of the file, in order
    ///
    /// `apply` is called once per record. A malformed or truncated record
    /// aborts replay with [`KvError::WalCorruption`]; records already applied
    /// stay applied.
    pub fn replay<F>(&self, apply: F) -> Result<ReplayStats>
    where
        F: FnMut(Value),
    {
        self.replay_inner(false, apply)
    }

    /// Like [`Wal::replay`], but a partially written final record is cut off
    /// the file instead of failing
    pub fn replay_repairing<F>(&self, apply: F) -> Result<ReplayStats>
    where
        F: FnMut(Value),
    {
        self.replay_inner(true, apply)
    }

    fn replay_inner<F>(&self, repair_truncated_tail: bool, apply: F) -> Result<ReplayStats>
    where
        F: FnMut(Value),
    {
        let mut file = self.file.lock();
        if file.closed {
            return Err(closed_error());
        }
        file.restore_tail()?;
        file.write_pending()?;

        let mut source = file.file.try_clone()?;
        source.seek(SeekFrom::Start(0))?;

        let stats = replay_records(source.take(file.written), repair_truncated_tail, apply)?;
        if stats.truncated_bytes > 0 {
            tracing::warn!(
                "Cutting {} bytes of partial record off {:?} at offset {}",
                stats.truncated_bytes,
                self.path,
                stats.bytes_replayed
            );
            file.file.set_len(stats.bytes_replayed)?;
            file.file.sync_all()?;
            file.written = stats.bytes_replayed;
        }
        Ok(stats)
    }

    /// Stop the flusher, sync, and refuse further use
    ///
    /// Calling it again is a no-op.
    pub fn close(&self) -> Result<()> {
        if let Some(flusher) = self.flusher.lock().take() {
            flusher.stop();
        }

        let mut file = self.file.lock();
        if file.closed {
            return Ok(());
        }
        file.closed = true;
        file.sync().map_err(|e| KvError::WalSync(e.to_string()))?;
        tracing::debug!("Closed log {:?} after {} appends", self.path, file.appended);
        Ok(())
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn sync_strategy(&self) -> WalSyncStrategy {
        self.sync_strategy
    }

    /// Records appended since open
    pub fn appended(&self) -> u64 {
        self.file.lock().appended
    }

    /// Last flush failure that has not been cleared by a later success
    pub fn pending_sync_failure(&self) -> Option<String> {
        self.file.lock().sync_failure.clone()
    }
}

impl Drop for Wal {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            tracing::warn!("Error closing log {:?}: {}", self.path, e);
        }
    }
}

fn closed_error() -> KvError {
    KvError::Io(io::Error::new(io::ErrorKind::Other, "log is closed"))
}
