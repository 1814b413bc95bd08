//! Protocol engine
//!
//! Owns the session state, turns records into display events or file-transfer
//! calls, and is the only path onto the wire. Anything reported to the display
//! is collected first and reported after the transfer lock is released.

use log::{debug, info, warn};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::display::{ChatMessage, Display, DisplayEvent, SERVER_CONVERSATION, server_conversation};
use crate::error::{AuthError, TransferError, TransportError};
use crate::protocol::auth::{AuthState, AuthTracker};
use crate::protocol::commands::{Approval, Conversation, RemovalKind, ServerCommand, parse_record};
use crate::protocol::escape::{is_file_payload, unescape_from_wire};
use crate::protocol::motd::MotdBuffer;
use crate::protocol::requests::ClientRequest;
use crate::transfer::{FileTag, FileTransferEngine, TransferEvent};
use crate::transport::{Connection, Endpoint};
use crate::utils::format_file_size;

/// Point-in-time view of the session
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSnapshot {
    pub connected: bool,
    pub secure: bool,
    pub endpoint: Option<Endpoint>,
    pub auth: AuthState,
    pub username: String,
}

pub struct ProtocolEngine {
    connection: Arc<Connection>,
    display: Arc<dyn Display>,
    transfers: FileTransferEngine,
    auth: AuthTracker,
    username: Mutex<String>,
    motd: Mutex<MotdBuffer>,
}

impl ProtocolEngine {
    pub fn new(connection: Arc<Connection>, display: Arc<dyn Display>, download_dir: PathBuf) -> Self {
        Self {
            connection,
            display,
            transfers: FileTransferEngine::new(download_dir),
            auth: AuthTracker::new(),
            username: Mutex::new(String::new()),
            motd: Mutex::new(MotdBuffer::new()),
        }
    }

    pub fn connection(&self) -> &Arc<Connection> {
        &self.connection
    }

    pub fn display(&self) -> &Arc<dyn Display> {
        &self.display
    }

    pub fn transfers(&self) -> &FileTransferEngine {
        &self.transfers
    }

    pub fn auth(&self) -> &AuthTracker {
        &self.auth
    }

    pub fn username(&self) -> String {
        self.username.lock().clone()
    }

    pub fn session(&self) -> SessionSnapshot {
        let endpoint = self.connection.endpoint();
        SessionSnapshot {
            connected: self.connection.is_connected(),
            secure: endpoint.as_ref().is_some_and(|e| e.secure),
            endpoint,
            auth: self.auth.state(),
            username: self.username(),
        }
    }

    /// Forget per-connection state: auth outcome, partial MOTD, transfers.
    pub fn reset_session(&self) {
        self.auth.reset();
        self.motd.lock().reset();
        self.transfers.reset();
    }

    // ═══ OUTBOUND ═══

    pub async fn send_request(&self, request: &ClientRequest) -> Result<(), TransportError> {
        self.connection.send(&request.to_record()).await
    }

    /// Send the authentication request; the outcome arrives asynchronously.
    pub async fn authenticate(&self, username: &str, password: Option<&str>) -> Result<(), TransportError> {
        *self.username.lock() = username.to_string();
        self.auth.begin();
        let request = ClientRequest::Authenticate {
            username: username.to_string(),
            password: password.map(str::to_string),
        };
        self.send_request(&request).await
    }

    pub fn is_auth_approved(&self) -> bool {
        self.auth.is_approved()
    }

    pub fn auth_error(&self) -> Option<String> {
        self.auth.rejection()
    }

    pub fn clear_auth_approved(&self) {
        self.auth.clear_approved();
    }

    pub fn clear_auth_error(&self) {
        self.auth.clear_error();
    }

    pub async fn wait_for_auth(&self, timeout: Duration) -> Result<(), AuthError> {
        self.auth.wait_for_outcome(timeout).await
    }

    pub async fn join_channel(&self, channel: &str, password: Option<&str>) -> Result<(), TransportError> {
        self.send_request(&ClientRequest::Join {
            channel: channel.to_string(),
            password: password.map(str::to_string),
        })
        .await
    }

    pub async fn leave_channel(&self, channel: &str) -> Result<(), TransportError> {
        self.send_request(&ClientRequest::Leave {
            channel: channel.to_string(),
        })
        .await
    }

    pub async fn send_message(&self, target: &Conversation, text: &str) -> Result<(), TransportError> {
        self.send_request(&ClientRequest::Message {
            target: target.wire_target(),
            payload: text.to_string(),
        })
        .await
    }

    pub async fn send_emote(&self, target: &Conversation, text: &str) -> Result<(), TransportError> {
        self.send_request(&ClientRequest::Emote {
            target: target.wire_target(),
            text: text.to_string(),
        })
        .await
    }

    pub async fn request_channel_list(&self) -> Result<(), TransportError> {
        self.send_request(&ClientRequest::ChannelList).await
    }

    pub async fn request_user_list(&self, channel: &str) -> Result<(), TransportError> {
        self.send_request(&ClientRequest::UserList {
            channel: channel.to_string(),
        })
        .await
    }

    pub async fn request_motd(&self) -> Result<(), TransportError> {
        self.send_request(&ClientRequest::Motd).await
    }

    pub async fn request_topic(&self, channel: &str) -> Result<(), TransportError> {
        self.send_request(&ClientRequest::Topic {
            channel: channel.to_string(),
        })
        .await
    }

    pub async fn set_topic(&self, channel: &str, topic: &str) -> Result<(), TransportError> {
        self.send_request(&ClientRequest::SetTopic {
            channel: channel.to_string(),
            topic: topic.to_string(),
        })
        .await
    }

    pub async fn kick_user(&self, channel: &str, user: &str, reason: Option<&str>) -> Result<(), TransportError> {
        self.send_request(&ClientRequest::Kick {
            channel: channel.to_string(),
            user: user.to_string(),
            reason: reason.map(str::to_string),
        })
        .await
    }

    pub async fn ban_user(&self, user: &str, minutes: i64, reason: Option<&str>) -> Result<(), TransportError> {
        self.send_request(&ClientRequest::Ban {
            user: user.to_string(),
            minutes,
            reason: reason.map(str::to_string),
        })
        .await
    }

    pub async fn unban_user(&self, user: &str) -> Result<(), TransportError> {
        self.send_request(&ClientRequest::Unban {
            user: user.to_string(),
        })
        .await
    }

    // ═══ FILE TRANSFER ═══

    /// Queue a file; chunks go out on subsequent ticks.
    pub fn send_file(&self, path: &Path, target: &Conversation) -> Result<(), TransferError> {
        let started = self.transfers.send_file(path, target.clone())?;
        self.report(vec![started]);
        Ok(())
    }

    /// One tick: send one chunk per outgoing transfer, then settle any
    /// deferred finalizations.
    ///
    /// A transfer whose chunk could not be sent is dropped and reported as
    /// failed; its remaining messages in the batch are skipped.
    pub async fn process_file_transfers(&self) {
        let batch = self.transfers.process_outgoing();
        let mut failed: BTreeMap<u32, (Conversation, String, TransportError)> = BTreeMap::new();

        for message in batch.messages {
            if failed.contains_key(&message.transfer_id) {
                continue;
            }
            let request = ClientRequest::Message {
                target: message.target.wire_target(),
                payload: message.payload,
            };
            if let Err(e) = self.send_request(&request).await {
                warn!("File chunk of {} to {} not sent: {}", message.filename, message.target, e);
                failed.insert(message.transfer_id, (message.target, message.filename, e));
            }
        }

        let mut events: Vec<TransferEvent> = batch
            .events
            .into_iter()
            .filter(|event| event.outgoing_id().is_none_or(|id| !failed.contains_key(&id)))
            .collect();
        for (id, (target, filename, source)) in failed {
            self.transfers.abort_outgoing(id);
            events.push(TransferEvent::SendFailed {
                target,
                error: TransferError::NotSent { filename, source },
            });
        }
        self.report(events);

        let settled = self.transfers.process_pending_finalizations();
        self.report(settled);
    }

    // ═══ INBOUND ═══

    /// Dispatch one complete record. Malformed or unknown records are dropped.
    pub async fn process_record(&self, record: &str) {
        let Some(command) = parse_record(record) else {
            debug!("Dropping unparseable record: {}", record);
            return;
        };
        let auth_reply = command.is_auth_response();
        if auth_reply {
            debug!("Authentication reply: {}", record);
        }

        match command {
            ServerCommand::UserMessage {
                conversation,
                sender,
                payload,
            } => self.handle_user_message(conversation, &sender, &payload),
            ServerCommand::UserEmote {
                conversation,
                sender,
                text,
            } => {
                self.open_if_direct(&conversation);
                self.post(ChatMessage::emote(conversation.name(), &sender, &text));
            }
            ServerCommand::ServerMessage { channel, text } => {
                self.post(ChatMessage::system(&channel, "SERVER", &text));
            }
            ServerCommand::Error { regarding, reason } => {
                if auth_reply {
                    self.auth.reject(&reason);
                }
                let text = format!("{}: {}", regarding, reason);
                self.post(ChatMessage::error(&self.active_or_server(), &text));
            }
            ServerCommand::ChannelAdded {
                channel,
                user_count,
                topic,
            } => self.display.notify(DisplayEvent::ChannelListed {
                channel,
                user_count,
                topic,
            }),
            ServerCommand::UserJoined { channel, user } => {
                let text = format!("{} has joined the channel", user);
                self.display.notify(DisplayEvent::UserJoined {
                    channel: channel.clone(),
                    user,
                });
                self.post(ChatMessage::system(&channel, "SYSTEM", &text));
            }
            ServerCommand::UserLeft {
                channel,
                user,
                reason,
            } => {
                let text = match &reason {
                    Some(reason) => format!("{} has left the channel ({})", user, reason),
                    None => format!("{} has left the channel", user),
                };
                self.display.notify(DisplayEvent::UserLeft {
                    channel: channel.clone(),
                    user,
                });
                self.post(ChatMessage::system(&channel, "SYSTEM", &text));
            }
            ServerCommand::Topic { channel, topic } => {
                self.display.notify(DisplayEvent::TopicChanged { channel, topic });
            }
            ServerCommand::Motd { chunk } => self.handle_motd(&chunk),
            ServerCommand::Approved(approval) => self.handle_approval(approval).await,
            ServerCommand::Removed {
                channel,
                kind,
                reason,
            } => {
                let text = match kind {
                    RemovalKind::Kick => format!("You were kicked from #{}: {}", channel, reason),
                    RemovalKind::Ban => format!("You were banned from #{}: {}", channel, reason),
                    RemovalKind::Other(kind) => {
                        format!("You were removed from #{} ({}): {}", channel, kind, reason)
                    }
                };
                info!("{}", text);
                self.display
                    .notify(DisplayEvent::ConversationOpened(server_conversation()));
                self.post(ChatMessage::system(SERVER_CONVERSATION, "SYSTEM", &text));
                self.display.notify(DisplayEvent::ChannelRemoved { channel });
            }
        }
    }

    fn handle_user_message(&self, conversation: Conversation, sender: &str, payload: &str) {
        self.open_if_direct(&conversation);

        if is_file_payload(payload) {
            match FileTag::parse(payload) {
                Some(tag) => {
                    debug!("File tag for transfer {} from {}", tag.id(), sender);
                    let events = self.transfers.handle_tag(sender, tag);
                    self.report(events);
                }
                None => debug!("Dropping malformed file tag from {}", sender),
            }
            return;
        }

        let text = unescape_from_wire(payload);
        self.post(ChatMessage::chat(conversation.name(), sender, &text));
    }

    fn handle_motd(&self, chunk: &str) {
        if self.display.active_conversation().is_none() {
            self.display
                .notify(DisplayEvent::ConversationOpened(server_conversation()));
        }

        let lines = self.motd.lock().push(chunk);
        if lines.is_empty() {
            return;
        }
        let conversation = self.active_or_server();
        for line in lines {
            self.post(ChatMessage::system(&conversation, "MOTD", &line));
        }
    }

    async fn handle_approval(&self, approval: Approval) {
        match approval {
            Approval::Name => self.auth.approve(),
            Approval::Join(channel) => {
                info!("Joined #{}", channel);
                self.display.notify(DisplayEvent::ChannelJoined {
                    channel: channel.clone(),
                });

                let username = self.username();
                if !username.is_empty() {
                    self.display.notify(DisplayEvent::UserJoined {
                        channel: channel.clone(),
                        user: username,
                    });
                }

                if let Err(e) = self.request_user_list(&channel).await {
                    warn!("Could not request users of #{}: {}", channel, e);
                }
                if let Err(e) = self.request_topic(&channel).await {
                    warn!("Could not request topic of #{}: {}", channel, e);
                }
            }
            Approval::Kick => {
                self.post(ChatMessage::system(
                    &self.active_or_server(),
                    "SYSTEM",
                    "Kick command executed successfully",
                ));
            }
            Approval::Other(kind) => debug!("Ignoring approval of {}", kind),
        }
    }

    fn open_if_direct(&self, conversation: &Conversation) {
        if conversation.is_direct() {
            self.display
                .notify(DisplayEvent::ConversationOpened(conversation.clone()));
        }
    }

    fn post(&self, message: ChatMessage) {
        self.display.notify(DisplayEvent::Message(message));
    }

    fn active_or_server(&self) -> String {
        self.display
            .active_conversation()
            .map(|conversation| conversation.name().to_string())
            .unwrap_or_else(|| SERVER_CONVERSATION.to_string())
    }

    /// Translate transfer events for the display. Must not be called with the
    /// transfer lock held.
    fn report(&self, events: Vec<TransferEvent>) {
        if events.is_empty() {
            return;
        }
        let active = self.active_or_server();

        for event in events {
            match event {
                TransferEvent::SendStarted { target, filename } => {
                    let text = format!("Sending File: {}", filename);
                    self.post(ChatMessage::system(target.name(), "SYSTEM", &text));
                }
                TransferEvent::SendProgress {
                    filename,
                    sent,
                    total,
                    ..
                } => self.status(format!(
                    "Sending {}: {} / {}",
                    filename,
                    format_file_size(sent),
                    format_file_size(total)
                )),
                TransferEvent::SendCompleted { target, .. } => {
                    self.post(ChatMessage::system(target.name(), "SYSTEM", "Sending File Completed."));
                    self.status(String::new());
                }
                TransferEvent::SendFailed { target, error } => {
                    self.post(ChatMessage::error(target.name(), &error.to_string()));
                    self.status(String::new());
                }
                TransferEvent::ReceiveStarted {
                    sender,
                    filename,
                    size,
                } => {
                    let text = match size {
                        Some(size) => format!(
                            "Receiving File: {} ({}) from {}",
                            filename,
                            format_file_size(size),
                            sender
                        ),
                        None => format!("Receiving File: {} from {}", filename, sender),
                    };
                    self.post(ChatMessage::system(&active, "SYSTEM", &text));
                }
                TransferEvent::ReceiveProgress {
                    filename,
                    received,
                    total,
                } => self.status(format!(
                    "Receiving {}: {} / {}",
                    filename,
                    format_file_size(received),
                    format_file_size(total)
                )),
                TransferEvent::ReceiveCompleted { filename, path } => {
                    let text = format!("Receive Completed: {} -> {}", filename, path.display());
                    self.post(ChatMessage::system(&active, "SYSTEM", &text).with_open_path(path.clone()));
                    self.display.notify(DisplayEvent::DownloadReady(path));
                    self.status(String::new());
                }
                TransferEvent::ReceiveFailed { filename, error } => {
                    let text = match &error {
                        TransferError::Incomplete { .. } | TransferError::Stalled { .. } => {
                            error.to_string()
                        }
                        _ => format!("Failed to save file: {}", filename),
                    };
                    self.post(ChatMessage::error(&active, &text));
                    self.status(String::new());
                }
            }
        }
    }

    fn status(&self, text: String) {
        self.display.notify(DisplayEvent::Status(text));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::{ChannelDisplay, MessageKind};
    use crate::transfer::tags::encode_chunk;
    use tokio::sync::mpsc::UnboundedReceiver;

    fn engine(download_dir: &Path) -> (ProtocolEngine, UnboundedReceiver<DisplayEvent>) {
        let (display, events) = ChannelDisplay::new();
        let engine = ProtocolEngine::new(
            Arc::new(Connection::new()),
            Arc::new(display),
            download_dir.to_path_buf(),
        );
        (engine, events)
    }

    fn drain(events: &mut UnboundedReceiver<DisplayEvent>) -> Vec<DisplayEvent> {
        let mut out = Vec::new();
        while let Ok(event) = events.try_recv() {
            out.push(event);
        }
        out
    }

    fn messages(events: &[DisplayEvent]) -> Vec<ChatMessage> {
        events
            .iter()
            .filter_map(|event| match event {
                DisplayEvent::Message(message) => Some(message.clone()),
                _ => None,
            })
            .collect()
    }

    #[tokio::test]
    async fn test_name_error_rejects_authentication() {
        let dir = tempfile::tempdir().unwrap();
        let (engine, mut events) = engine(dir.path());
        engine.auth().begin();
        assert_eq!(engine.session().auth, AuthState::Pending);

        engine.process_record("!err:name:bad credentials").await;

        assert_eq!(engine.session().auth, AuthState::Rejected("bad credentials".into()));
        assert_eq!(engine.auth_error().as_deref(), Some("bad credentials"));
        let shown = messages(&drain(&mut events));
        assert_eq!(shown[0].kind, MessageKind::Error);
        assert_eq!(shown[0].text, "name: bad credentials");
    }

    #[tokio::test]
    async fn test_approval_and_unrelated_errors() {
        let dir = tempfile::tempdir().unwrap();
        let (engine, _events) = engine(dir.path());
        engine.auth().begin();

        engine.process_record("!err:jnchn:no such channel").await;
        assert_eq!(engine.session().auth, AuthState::Pending);

        engine.process_record("!apr:name").await;
        assert!(engine.is_auth_approved());
        engine.clear_auth_approved();
        assert_eq!(engine.session().auth, AuthState::Unauthenticated);
    }

    #[tokio::test]
    async fn test_direct_message_opens_conversation_with_sender() {
        let dir = tempfile::tempdir().unwrap();
        let (engine, mut events) = engine(dir.path());

        engine.process_record("!usrmsg:user:bob:meet at 10<colon>30").await;

        let events = drain(&mut events);
        assert_eq!(
            events[0],
            DisplayEvent::ConversationOpened(Conversation::Direct("bob".into()))
        );
        let shown = messages(&events);
        assert_eq!(shown[0].conversation, "bob");
        assert_eq!(shown[0].sender, "bob");
        assert_eq!(shown[0].text, "meet at 10:30");
    }

    #[tokio::test]
    async fn test_file_chunks_are_not_displayed_as_chat() {
        let dir = tempfile::tempdir().unwrap();
        let (engine, mut events) = engine(dir.path());

        let header = format!("!usrmsg:general:alice:<file|3|hi.txt|5>{}", encode_chunk(b"hello"));
        engine.process_record(&header).await;
        engine.process_record("!usrmsg:general:alice:</file|3|1>").await;

        let events = drain(&mut events);
        let shown = messages(&events);
        assert!(shown.iter().all(|m| m.kind == MessageKind::System));
        assert!(shown[0].text.starts_with("Receiving File: hi.txt (5 B) from alice"));
        assert!(shown[1].text.starts_with("Receive Completed: hi.txt -> "));
        assert_eq!(shown[1].open_path, Some(dir.path().join("hi.txt")));
        assert!(events.contains(&DisplayEvent::DownloadReady(dir.path().join("hi.txt"))));
        assert!(events.contains(&DisplayEvent::Status(String::new())));
        assert_eq!(std::fs::read(dir.path().join("hi.txt")).unwrap(), b"hello");
    }

    #[tokio::test]
    async fn test_motd_lines_reach_server_conversation() {
        let dir = tempfile::tempdir().unwrap();
        let (engine, mut events) = engine(dir.path());

        engine.process_record("!motd:Welcome to ra").await;
        engine.process_record("!motd:di8<nl>Rules<colon> be").await;
        engine.process_record("!motd: nice<nl>").await;

        let shown = messages(&drain(&mut events));
        let lines: Vec<&str> = shown.iter().map(|m| m.text.as_str()).collect();
        assert_eq!(lines, vec!["Welcome to radi8", "Rules: be nice"]);
        assert!(shown.iter().all(|m| m.conversation == "server" && m.sender == "MOTD"));
    }

    #[tokio::test]
    async fn test_join_approval_marks_channel_and_self() {
        let dir = tempfile::tempdir().unwrap();
        let (engine, mut events) = engine(dir.path());
        *engine.username.lock() = "me".into();

        engine.process_record("!apr:jnchn:general").await;

        let events = drain(&mut events);
        assert_eq!(
            events,
            vec![
                DisplayEvent::ChannelJoined {
                    channel: "general".into()
                },
                DisplayEvent::UserJoined {
                    channel: "general".into(),
                    user: "me".into()
                },
            ]
        );
        assert_eq!(
            engine.display().active_conversation(),
            Some(Conversation::Channel("general".into()))
        );
    }

    #[tokio::test]
    async fn test_removal_notice_goes_to_server() {
        let dir = tempfile::tempdir().unwrap();
        let (engine, mut events) = engine(dir.path());

        engine.process_record("!die:general:kick:flooding").await;
        engine.process_record("!die:random:mute").await;

        let events = drain(&mut events);
        let shown = messages(&events);
        assert_eq!(shown[0].conversation, "server");
        assert_eq!(shown[0].text, "You were kicked from #general: flooding");
        assert_eq!(shown[1].text, "You were removed from #random (mute): no reason given");
        assert!(events.contains(&DisplayEvent::ChannelRemoved {
            channel: "general".into()
        }));
    }

    #[tokio::test]
    async fn test_user_left_with_reason() {
        let dir = tempfile::tempdir().unwrap();
        let (engine, mut events) = engine(dir.path());

        engine.process_record("!usrleft:general:dave:ping timeout: 120s").await;

        let shown = messages(&drain(&mut events));
        assert_eq!(shown[0].text, "dave has left the channel (ping timeout: 120s)");
    }

    #[tokio::test]
    async fn test_sends_fail_cleanly_when_disconnected() {
        let dir = tempfile::tempdir().unwrap();
        let (engine, _events) = engine(dir.path());
        assert!(matches!(
            engine.request_motd().await,
            Err(TransportError::NotConnected)
        ));
        assert!(!engine.session().connected);
    }

    #[tokio::test]
    async fn test_reset_session_forgets_auth_and_partial_motd() {
        let dir = tempfile::tempdir().unwrap();
        let (engine, mut events) = engine(dir.path());
        engine.auth().approve();
        engine.process_record("!motd:half a li").await;

        engine.reset_session();
        engine.process_record("!motd:fresh<nl>").await;

        assert_eq!(engine.session().auth, AuthState::Unauthenticated);
        let shown = messages(&drain(&mut events));
        assert_eq!(shown.len(), 1);
        assert_eq!(shown[0].text, "fresh");
    }

    #[tokio::test]
    async fn test_unsent_chunk_fails_transfer_instead_of_completing() {
        let dir = tempfile::tempdir().unwrap();
        let (engine, mut events) = engine(dir.path());
        let source = dir.path().join("tiny.txt");
        std::fs::write(&source, b"hi").unwrap();
        let target = Conversation::Channel("general".into());

        engine.send_file(&source, &target).unwrap();
        engine.process_file_transfers().await;

        let shown = messages(&drain(&mut events));
        let texts: Vec<&str> = shown.iter().map(|m| m.text.as_str()).collect();
        assert_eq!(texts[0], "Sending File: tiny.txt");
        assert!(!texts.contains(&"Sending File Completed."));
        let failure = shown.last().unwrap();
        assert_eq!(failure.kind, MessageKind::Error);
        assert_eq!(failure.conversation, "general");
        assert_eq!(failure.text, "Could not send tiny.txt: Not connected");
        assert_eq!(engine.transfers().active_counts(), (0, 0));
    }

    #[tokio::test]
    async fn test_unsent_multi_chunk_transfer_is_dropped() {
        let dir = tempfile::tempdir().unwrap();
        let (engine, mut events) = engine(dir.path());
        let source = dir.path().join("big.bin");
        std::fs::write(&source, vec![7u8; 40000]).unwrap();

        engine
            .send_file(&source, &Conversation::Direct("bob".into()))
            .unwrap();
        engine.process_file_transfers().await;
        engine.process_file_transfers().await;

        assert_eq!(engine.transfers().active_counts(), (0, 0));
        let all = drain(&mut events);
        assert!(!all.iter().any(|e| matches!(e, DisplayEvent::Status(s) if s.starts_with("Sending big.bin"))));
        let errors: Vec<ChatMessage> = messages(&all)
            .into_iter()
            .filter(|m| m.kind == MessageKind::Error)
            .collect();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].conversation, "bob");
    }
}
