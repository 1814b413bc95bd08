//! Incoming transfers
//!
//! Reassembly of one (sender, id) stream. Chunks at the write cursor go
//! straight to the `.part` file; chunks ahead of it wait in `pending` until the
//! gap closes. A sequence counts as observed on arrival, not on write.

use log::{debug, info, warn};
use std::collections::BTreeMap;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use crate::error::TransferError;
use crate::transfer::file_ops::{sanitize_filename, unique_final_path, unique_temp_path};
use crate::transfer::outgoing::PROGRESS_INTERVAL;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkOutcome {
    /// Appended, possibly along with buffered successors
    Written,
    /// Ahead of the cursor, held until the gap closes
    Buffered,
    /// Already seen; ignored
    Duplicate,
}

#[derive(Debug)]
pub struct IncomingTransfer {
    pub sender: String,
    pub id: u32,
    pub filename: String,
    pub declared_size: Option<u64>,
    pub bytes_written: u64,
    download_dir: PathBuf,
    temp_path: Option<PathBuf>,
    announced: bool,
    next_expected: u32,
    pending: BTreeMap<u32, Vec<u8>>,
    observed: u32,
    declared_total: Option<u32>,
    finalization_requested: Option<Instant>,
    last_progress: Option<Instant>,
    last_activity: Instant,
}

impl IncomingTransfer {
    pub fn new(sender: &str, id: u32, download_dir: &Path) -> Self {
        Self {
            sender: sender.to_string(),
            id,
            filename: sanitize_filename("", id),
            declared_size: None,
            bytes_written: 0,
            download_dir: download_dir.to_path_buf(),
            temp_path: None,
            announced: false,
            next_expected: 0,
            pending: BTreeMap::new(),
            observed: 0,
            declared_total: None,
            finalization_requested: None,
            last_progress: None,
            last_activity: Instant::now(),
        }
    }

    /// Record the header's filename and size and create the `.part` file.
    ///
    /// Returns `false` when the transfer was already announced.
    pub fn announce(&mut self, filename: &str, size: Option<u64>) -> Result<bool, TransferError> {
        if self.announced {
            return Ok(false);
        }
        self.announced = true;
        self.filename = sanitize_filename(filename, self.id);
        self.declared_size = size.filter(|size| *size > 0);
        self.ensure_temp_file()?;
        Ok(true)
    }

    pub fn accept_chunk(&mut self, seq: u32, bytes: Vec<u8>) -> Result<ChunkOutcome, TransferError> {
        if seq < self.next_expected || self.pending.contains_key(&seq) {
            debug!(
                "Duplicate chunk {} of {} from {}",
                seq, self.filename, self.sender
            );
            return Ok(ChunkOutcome::Duplicate);
        }

        self.observed = self.observed.saturating_add(1);

        if seq > self.next_expected {
            self.pending.insert(seq, bytes);
            return Ok(ChunkOutcome::Buffered);
        }

        self.append(&bytes)?;
        self.next_expected += 1;
        while let Some(next) = self.pending.remove(&self.next_expected) {
            self.append(&next)?;
            self.next_expected += 1;
        }
        Ok(ChunkOutcome::Written)
    }

    /// Note the declared total; the first request starts the grace clock.
    pub fn request_finalization(&mut self, total_chunks: u32, now: Instant) {
        self.declared_total = Some(total_chunks);
        if self.finalization_requested.is_none() {
            self.finalization_requested = Some(now);
        }
    }

    pub fn finalization_pending(&self) -> bool {
        self.finalization_requested.is_some()
    }

    /// Every declared chunk has been observed
    pub fn is_complete(&self) -> bool {
        self.declared_total == Some(self.observed)
    }

    /// Note that the sender is still talking to us
    pub fn touch(&mut self, now: Instant) {
        self.last_activity = now;
    }

    /// No chunk and no end marker for longer than `limit`
    pub fn idle_expired(&self, now: Instant, limit: Duration) -> bool {
        now.duration_since(self.last_activity) > limit
    }

    pub fn finalization_expired(&self, now: Instant, grace: Duration) -> bool {
        self.finalization_requested
            .is_some_and(|requested| now.duration_since(requested) > grace)
    }

    pub fn observed(&self) -> u32 {
        self.observed
    }

    pub fn pending_chunks(&self) -> usize {
        self.pending.len()
    }

    pub fn temp_path(&self) -> Option<&Path> {
        self.temp_path.as_deref()
    }

    pub fn incomplete_error(&self) -> TransferError {
        TransferError::Incomplete {
            filename: self.filename.clone(),
            received: self.observed,
            total: self.declared_total.unwrap_or(0),
        }
    }

    pub fn stalled_error(&self) -> TransferError {
        TransferError::Stalled {
            filename: self.filename.clone(),
            received: self.observed,
        }
    }

    pub fn progress_due(&mut self, now: Instant) -> bool {
        if self.declared_size.is_none() {
            return false;
        }
        let due = self
            .last_progress
            .is_none_or(|last| now.duration_since(last) >= PROGRESS_INTERVAL);
        if due {
            self.last_progress = Some(now);
        }
        due
    }

    /// Move the `.part` file to a collision-free final name.
    ///
    /// On failure the temporary file is removed.
    pub fn promote(mut self) -> Result<PathBuf, TransferError> {
        if !self.pending.is_empty() {
            warn!(
                "Discarding {} chunks of {} that never became contiguous",
                self.pending.len(),
                self.filename
            );
        }

        let temp_path = self.ensure_temp_file()?;
        let final_path = unique_final_path(&self.download_dir, &self.filename);
        if let Err(e) = fs::rename(&temp_path, &final_path) {
            self.discard();
            return Err(TransferError::Save(final_path, e));
        }

        info!(
            "Received {} from {} ({} bytes) -> {}",
            self.filename,
            self.sender,
            self.bytes_written,
            final_path.display()
        );
        Ok(final_path)
    }

    pub fn discard(&self) {
        if let Some(path) = &self.temp_path {
            if let Err(e) = fs::remove_file(path) {
                warn!("Could not remove {}: {}", path.display(), e);
            }
        }
    }

    fn ensure_temp_file(&mut self) -> Result<PathBuf, TransferError> {
        if let Some(path) = &self.temp_path {
            return Ok(path.clone());
        }

        fs::create_dir_all(&self.download_dir)
            .map_err(|e| TransferError::TempFile(self.download_dir.clone(), e))?;
        let path = unique_temp_path(&self.download_dir, &self.filename);
        File::create(&path).map_err(|e| TransferError::TempFile(path.clone(), e))?;

        debug!("Receiving {} into {}", self.filename, path.display());
        self.temp_path = Some(path.clone());
        Ok(path)
    }

    fn append(&mut self, bytes: &[u8]) -> Result<(), TransferError> {
        let path = self.ensure_temp_file()?;
        let mut file = OpenOptions::new()
            .append(true)
            .open(&path)
            .map_err(|e| TransferError::Write(path.clone(), e))?;
        file.write_all(bytes)
            .map_err(|e| TransferError::Write(path.clone(), e))?;
        self.bytes_written += bytes.len() as u64;
        Ok(())
    }
}
