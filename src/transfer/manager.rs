//! File transfer engine
//!
//! Owns every outgoing and incoming transfer behind one mutex. Methods collect
//! the messages to send and the events to report while holding the lock and
//! hand them back to the caller, which acts on them after the lock is gone.
//! Chunk appends happen under the lock.

use log::{debug, info, warn};
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::{Duration, Instant};

use crate::error::TransferError;
use crate::protocol::Conversation;
use crate::transfer::incoming::{ChunkOutcome, IncomingTransfer};
use crate::transfer::outgoing::OutgoingTransfer;
use crate::transfer::results::{OutgoingBatch, OutgoingMessage, TransferEvent};
use crate::transfer::tags::{FileTag, decode_chunk};

/// How long a finalization with missing chunks may wait for them
pub const FINALIZATION_GRACE: Duration = Duration::from_secs(5);

/// How long an incoming transfer may go without a chunk or end marker
pub const IDLE_LIMIT: Duration = Duration::from_secs(60);

static NEXT_TRANSFER_ID: AtomicU32 = AtomicU32::new(1);

/// Process-wide, monotonically increasing outgoing transfer id
pub fn next_transfer_id() -> u32 {
    NEXT_TRANSFER_ID.fetch_add(1, Ordering::Relaxed)
}

type IncomingKey = (String, u32);

#[derive(Debug, Default)]
struct TransferState {
    outgoing: BTreeMap<u32, OutgoingTransfer>,
    incoming: HashMap<IncomingKey, IncomingTransfer>,
}

#[derive(Debug)]
pub struct FileTransferEngine {
    state: Mutex<TransferState>,
    download_dir: PathBuf,
    grace: Duration,
    idle_limit: Duration,
}

impl FileTransferEngine {
    pub fn new(download_dir: PathBuf) -> Self {
        Self {
            state: Mutex::new(TransferState::default()),
            download_dir,
            grace: FINALIZATION_GRACE,
            idle_limit: IDLE_LIMIT,
        }
    }

    pub fn download_dir(&self) -> &Path {
        &self.download_dir
    }

    /// (outgoing, incoming) transfers currently tracked
    pub fn active_counts(&self) -> (usize, usize) {
        let state = self.state.lock();
        (state.outgoing.len(), state.incoming.len())
    }

    /// Queue a file for sending. Fails before anything is queued when the
    /// source cannot be read.
    pub fn send_file(&self, path: &Path, target: Conversation) -> Result<TransferEvent, TransferError> {
        let transfer = OutgoingTransfer::open(next_transfer_id(), path, target.clone())?;
        info!(
            "Queued {} ({} bytes, {} chunks) for {} as transfer {}",
            transfer.filename, transfer.size, transfer.total_chunks, target, transfer.id
        );

        let filename = transfer.filename.clone();
        self.state.lock().outgoing.insert(transfer.id, transfer);
        Ok(TransferEvent::SendStarted { target, filename })
    }

    /// Forget an outgoing transfer whose chunks could not be sent.
    pub fn abort_outgoing(&self, id: u32) {
        if let Some(transfer) = self.state.lock().outgoing.remove(&id) {
            warn!(
                "Abandoning {} after {} of {} chunks",
                transfer.filename, transfer.chunks_sent, transfer.total_chunks
            );
        }
    }

    pub fn process_outgoing(&self) -> OutgoingBatch {
        self.process_outgoing_at(Instant::now())
    }

    /// Advance every outgoing transfer by exactly one chunk. The terminal
    /// marker follows the last chunk in the same batch.
    pub fn process_outgoing_at(&self, now: Instant) -> OutgoingBatch {
        let mut batch = OutgoingBatch::default();
        let mut state = self.state.lock();
        let mut finished = Vec::new();

        for (id, transfer) in state.outgoing.iter_mut() {
            let payload = match transfer.next_payload() {
                Ok(payload) => payload,
                Err(error) => {
                    warn!("Outgoing transfer {} failed: {}", id, error);
                    batch.events.push(TransferEvent::SendFailed {
                        target: transfer.target.clone(),
                        error,
                    });
                    finished.push(*id);
                    continue;
                }
            };

            batch.messages.push(OutgoingMessage {
                transfer_id: *id,
                filename: transfer.filename.clone(),
                target: transfer.target.clone(),
                payload,
            });

            if transfer.progress_due(now) {
                batch.events.push(TransferEvent::SendProgress {
                    id: *id,
                    filename: transfer.filename.clone(),
                    sent: transfer.bytes_sent(),
                    total: transfer.size,
                });
            }

            if transfer.is_finished() {
                batch.messages.push(OutgoingMessage {
                    transfer_id: *id,
                    filename: transfer.filename.clone(),
                    target: transfer.target.clone(),
                    payload: transfer.end_payload(),
                });
                batch.events.push(TransferEvent::SendCompleted {
                    id: *id,
                    target: transfer.target.clone(),
                    filename: transfer.filename.clone(),
                });
                info!("Sent all {} chunks of {}", transfer.total_chunks, transfer.filename);
                finished.push(*id);
            }
        }

        for id in finished {
            state.outgoing.remove(&id);
        }
        batch
    }

    pub fn handle_tag(&self, sender: &str, tag: FileTag) -> Vec<TransferEvent> {
        self.handle_tag_at(sender, tag, Instant::now())
    }

    pub fn handle_tag_at(&self, sender: &str, tag: FileTag, now: Instant) -> Vec<TransferEvent> {
        match tag {
            FileTag::Header {
                id,
                filename,
                size,
                data,
            } => self.receive_chunk_at(sender, id, 0, Some((&filename, size)), &data, now),
            FileTag::Chunk { id, seq, data } => {
                self.receive_chunk_at(sender, id, seq, None, &data, now)
            }
            FileTag::End { id, total_chunks } => self.finalize_at(sender, id, total_chunks, now),
        }
    }

    /// Accept one chunk; `header` carries the announced name and size for
    /// the first chunk.
    pub fn receive_chunk_at(
        &self,
        sender: &str,
        id: u32,
        seq: u32,
        header: Option<(&str, Option<u64>)>,
        data: &str,
        now: Instant,
    ) -> Vec<TransferEvent> {
        let Some(bytes) = decode_chunk(data) else {
            warn!("Dropping undecodable chunk {} of transfer {} from {}", seq, id, sender);
            return Vec::new();
        };

        let mut events = Vec::new();
        let mut state = self.state.lock();
        let key = (sender.to_string(), id);

        let transfer = state.incoming.entry(key.clone()).or_insert_with(|| {
            debug!("New incoming transfer {} from {}", id, sender);
            IncomingTransfer::new(sender, id, &self.download_dir)
        });
        transfer.touch(now);

        let announced = match header {
            Some((filename, size)) => transfer.announce(filename, size),
            None => Ok(false),
        };
        let result = match announced {
            Ok(announced) => {
                if announced {
                    info!("Receiving {} from {}", transfer.filename, sender);
                    events.push(TransferEvent::ReceiveStarted {
                        sender: sender.to_string(),
                        filename: transfer.filename.clone(),
                        size: transfer.declared_size,
                    });
                }
                transfer.accept_chunk(seq, bytes)
            }
            Err(error) => Err(error),
        };

        match result {
            Ok(ChunkOutcome::Written) => {
                if transfer.progress_due(now) {
                    events.push(TransferEvent::ReceiveProgress {
                        filename: transfer.filename.clone(),
                        received: transfer.bytes_written,
                        total: transfer.declared_size.unwrap_or_default(),
                    });
                }
            }
            Ok(_) => {}
            Err(error) => {
                warn!("Incoming transfer {} from {} failed: {}", id, sender, error);
                let filename = transfer.filename.clone();
                transfer.discard();
                state.incoming.remove(&key);
                events.push(TransferEvent::ReceiveFailed { filename, error });
                return events;
            }
        }

        let ready = transfer.finalization_pending() && transfer.is_complete();
        if ready {
            if let Some(transfer) = state.incoming.remove(&key) {
                events.push(Self::complete(transfer));
            }
        }
        events
    }

    /// Handle a terminal marker. Completes now when every chunk has been
    /// observed, otherwise starts the grace period.
    pub fn finalize_at(
        &self,
        sender: &str,
        id: u32,
        total_chunks: u32,
        now: Instant,
    ) -> Vec<TransferEvent> {
        let mut state = self.state.lock();
        let key = (sender.to_string(), id);

        let Some(transfer) = state.incoming.get_mut(&key) else {
            debug!("End marker for unknown transfer {} from {}", id, sender);
            return Vec::new();
        };

        transfer.touch(now);
        transfer.request_finalization(total_chunks, now);
        if !transfer.is_complete() {
            info!(
                "Deferring finalization of {} from {}: {} of {} chunks observed",
                transfer.filename,
                sender,
                transfer.observed(),
                total_chunks
            );
            return Vec::new();
        }

        match state.incoming.remove(&key) {
            Some(transfer) => vec![Self::complete(transfer)],
            None => Vec::new(),
        }
    }

    pub fn process_pending_finalizations(&self) -> Vec<TransferEvent> {
        self.process_pending_finalizations_at(Instant::now())
    }

    /// Finish deferred transfers whose chunks have all arrived, fail those
    /// whose grace period has run out and drop streams that went silent
    /// before their end marker.
    pub fn process_pending_finalizations_at(&self, now: Instant) -> Vec<TransferEvent> {
        let mut state = self.state.lock();
        let due: Vec<IncomingKey> = state
            .incoming
            .iter()
            .filter(|(_, transfer)| {
                if transfer.finalization_pending() {
                    transfer.is_complete() || transfer.finalization_expired(now, self.grace)
                } else {
                    transfer.idle_expired(now, self.idle_limit)
                }
            })
            .map(|(key, _)| key.clone())
            .collect();

        let mut events = Vec::new();
        for key in due {
            let Some(transfer) = state.incoming.remove(&key) else {
                continue;
            };

            if transfer.finalization_pending() && transfer.is_complete() {
                events.push(Self::complete(transfer));
            } else {
                let error = if transfer.finalization_pending() {
                    transfer.incomplete_error()
                } else {
                    transfer.stalled_error()
                };
                warn!("{} from {}", error, transfer.sender);
                transfer.discard();
                events.push(TransferEvent::ReceiveFailed {
                    filename: transfer.filename.clone(),
                    error,
                });
            }
        }
        events
    }

    /// Drop everything in flight, removing partial downloads.
    pub fn reset(&self) {
        let mut state = self.state.lock();
        for transfer in state.incoming.values() {
            transfer.discard();
        }
        if !state.outgoing.is_empty() || !state.incoming.is_empty() {
            info!(
                "Abandoning {} outgoing and {} incoming transfers",
                state.outgoing.len(),
                state.incoming.len()
            );
        }
        state.outgoing.clear();
        state.incoming.clear();
    }

    fn complete(transfer: IncomingTransfer) -> TransferEvent {
        let filename = transfer.filename.clone();
        match transfer.promote() {
            Ok(path) => TransferEvent::ReceiveCompleted { filename, path },
            Err(error) => {
                warn!("{}", error);
                TransferEvent::ReceiveFailed { filename, error }
            }
        }
    }
}
