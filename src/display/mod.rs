//! Display seam
//!
//! The protocol engine reports everything user-visible through [`Display`].
//! Rendering is someone else's job; [`ChannelDisplay`] simply forwards events
//! over a channel and remembers which conversation is in front.

use chrono::{DateTime, Local};
use log::debug;
use parking_lot::Mutex;
use std::path::PathBuf;
use tokio::sync::mpsc;

use crate::protocol::Conversation;

/// Reserved conversation for server notices and the MOTD
pub const SERVER_CONVERSATION: &str = "server";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    Chat,
    Emote,
    System,
    Error,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChatMessage {
    pub conversation: String,
    pub sender: String,
    pub text: String,
    pub kind: MessageKind,
    pub timestamp: DateTime<Local>,
    /// A completed download the user may want to open
    pub open_path: Option<PathBuf>,
}

impl ChatMessage {
    fn new(conversation: &str, sender: &str, text: &str, kind: MessageKind) -> Self {
        Self {
            conversation: conversation.to_string(),
            sender: sender.to_string(),
            text: text.to_string(),
            kind,
            timestamp: Local::now(),
            open_path: None,
        }
    }

    pub fn chat(conversation: &str, sender: &str, text: &str) -> Self {
        Self::new(conversation, sender, text, MessageKind::Chat)
    }

    pub fn emote(conversation: &str, sender: &str, text: &str) -> Self {
        Self::new(conversation, sender, text, MessageKind::Emote)
    }

    /// `sender` is a label such as `SYSTEM`, `SERVER` or `MOTD`
    pub fn system(conversation: &str, sender: &str, text: &str) -> Self {
        Self::new(conversation, sender, text, MessageKind::System)
    }

    pub fn error(conversation: &str, text: &str) -> Self {
        Self::new(conversation, "ERROR", text, MessageKind::Error)
    }

    pub fn with_open_path(mut self, path: PathBuf) -> Self {
        self.open_path = Some(path);
        self
    }

    /// One-line rendering, e.g. `[14:02] <alice> hi` or `[14:02] * alice waves`
    pub fn render(&self) -> String {
        let time = self.timestamp.format("%H:%M");
        match self.kind {
            MessageKind::Chat => format!("[{}] <{}> {}", time, self.sender, self.text),
            MessageKind::Emote => format!("[{}] * {} {}", time, self.sender, self.text),
            MessageKind::System | MessageKind::Error => {
                format!("[{}] -{}- {}", time, self.sender, self.text)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DisplayEvent {
    Message(ChatMessage),
    /// Status line text; empty clears it
    Status(String),
    ChannelListed {
        channel: String,
        user_count: Option<u32>,
        topic: Option<String>,
    },
    ConversationOpened(Conversation),
    /// Bring a conversation to the front
    ConversationFocused(Conversation),
    ConversationClosed(Conversation),
    ChannelJoined {
        channel: String,
    },
    ChannelRemoved {
        channel: String,
    },
    UserJoined {
        channel: String,
        user: String,
    },
    UserLeft {
        channel: String,
        user: String,
    },
    TopicChanged {
        channel: String,
        topic: String,
    },
    DownloadReady(PathBuf),
}

pub trait Display: Send + Sync {
    fn notify(&self, event: DisplayEvent);

    /// Conversation currently in front, if any
    fn active_conversation(&self) -> Option<Conversation>;
}

pub fn server_conversation() -> Conversation {
    Conversation::Channel(SERVER_CONVERSATION.to_string())
}

/// Forwards events to whoever holds the receiving end
#[derive(Debug)]
pub struct ChannelDisplay {
    events: mpsc::UnboundedSender<DisplayEvent>,
    active: Mutex<Option<Conversation>>,
}

impl ChannelDisplay {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<DisplayEvent>) {
        let (events, receiver) = mpsc::unbounded_channel();
        let display = Self {
            events,
            active: Mutex::new(None),
        };
        (display, receiver)
    }

    pub fn set_active(&self, conversation: Option<Conversation>) {
        *self.active.lock() = conversation;
    }
}

impl Display for ChannelDisplay {
    fn notify(&self, event: DisplayEvent) {
        {
            let mut active = self.active.lock();
            match &event {
                DisplayEvent::ChannelJoined { channel } => {
                    *active = Some(Conversation::Channel(channel.clone()))
                }
                DisplayEvent::ConversationOpened(conversation) if active.is_none() => {
                    *active = Some(conversation.clone())
                }
                DisplayEvent::ConversationFocused(conversation) => {
                    *active = Some(conversation.clone())
                }
                DisplayEvent::ConversationClosed(conversation)
                    if active.as_ref() == Some(conversation) =>
                {
                    *active = Some(server_conversation())
                }
                DisplayEvent::ChannelRemoved { channel }
                    if active.as_ref() == Some(&Conversation::Channel(channel.clone())) =>
                {
                    *active = Some(server_conversation())
                }
                _ => {}
            }
        }

        if self.events.send(event).is_err() {
            debug!("Display receiver dropped; event discarded");
        }
    }

    fn active_conversation(&self) -> Option<Conversation> {
        self.active.lock().clone()
    }
}
