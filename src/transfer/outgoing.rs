//! Outgoing transfers
//!
//! One file being sent, one chunk per tick. The source is reopened for every
//! chunk so no descriptor stays open between ticks.

use std::fs::{self, File};
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use crate::error::TransferError;
use crate::protocol::Conversation;
use crate::transfer::file_ops::display_name;
use crate::transfer::tags::{CHUNK_SIZE, FileTag, encode_chunk};

pub const PROGRESS_INTERVAL: Duration = Duration::from_secs(2);

/// `ceil(size / CHUNK_SIZE)`, never less than one
pub fn total_chunks_for(size: u64) -> u32 {
    let chunks = size.div_ceil(CHUNK_SIZE as u64).max(1);
    u32::try_from(chunks).unwrap_or(u32::MAX)
}

#[derive(Debug)]
pub struct OutgoingTransfer {
    pub id: u32,
    pub source: PathBuf,
    pub filename: String,
    pub target: Conversation,
    pub size: u64,
    pub total_chunks: u32,
    pub chunks_sent: u32,
    last_progress: Option<Instant>,
}

impl OutgoingTransfer {
    /// Validate the source and size it up. Nothing is read yet.
    pub fn open(id: u32, source: &Path, target: Conversation) -> Result<Self, TransferError> {
        let metadata = fs::metadata(source)
            .map_err(|e| TransferError::SourceUnreadable(source.to_path_buf(), e))?;
        if !metadata.is_file() {
            return Err(TransferError::NotAFile(source.to_path_buf()));
        }
        File::open(source).map_err(|e| TransferError::SourceUnreadable(source.to_path_buf(), e))?;

        let size = metadata.len();
        Ok(Self {
            id,
            source: source.to_path_buf(),
            filename: display_name(source),
            target,
            size,
            total_chunks: total_chunks_for(size),
            chunks_sent: 0,
            last_progress: None,
        })
    }

    pub fn is_finished(&self) -> bool {
        self.chunks_sent >= self.total_chunks
    }

    pub fn bytes_sent(&self) -> u64 {
        (u64::from(self.chunks_sent) * CHUNK_SIZE as u64).min(self.size)
    }

    /// Read the next chunk and wrap it in its tag, advancing the cursor.
    pub fn next_payload(&mut self) -> Result<String, TransferError> {
        let seq = self.chunks_sent;
        let data = encode_chunk(&self.read_chunk(seq)?);

        let tag = if seq == 0 {
            FileTag::Header {
                id: self.id,
                filename: self.filename.clone(),
                size: Some(self.size),
                data,
            }
        } else {
            FileTag::Chunk {
                id: self.id,
                seq,
                data,
            }
        };

        self.chunks_sent += 1;
        Ok(tag.encode())
    }

    pub fn end_payload(&self) -> String {
        FileTag::End {
            id: self.id,
            total_chunks: self.total_chunks,
        }
        .encode()
    }

    /// At most one progress report per interval, plus one on completion.
    pub fn progress_due(&mut self, now: Instant) -> bool {
        let due = self.is_finished()
            || self
                .last_progress
                .is_none_or(|last| now.duration_since(last) >= PROGRESS_INTERVAL);
        if due {
            self.last_progress = Some(now);
        }
        due
    }

    fn read_chunk(&self, seq: u32) -> Result<Vec<u8>, TransferError> {
        let offset = u64::from(seq) * CHUNK_SIZE as u64;
        let len = self.size.saturating_sub(offset).min(CHUNK_SIZE as u64) as usize;

        let unreadable = |e| TransferError::SourceUnreadable(self.source.clone(), e);
        let mut file = File::open(&self.source).map_err(unreadable)?;
        file.seek(SeekFrom::Start(offset)).map_err(unreadable)?;

        let mut buf = vec![0u8; len];
        file.read_exact(&mut buf).map_err(unreadable)?;
        Ok(buf)
    }
}
