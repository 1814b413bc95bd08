//! Client requests
//!
//! Builders for every record the client sends. Free-form fields are escaped;
//! identifiers (channel and user names) are sent as typed.

use crate::protocol::escape::{escape_for_wire, is_file_payload};

const DEFAULT_BAN_REASON: &str = "no reason";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientRequest {
    Authenticate {
        username: String,
        password: Option<String>,
    },
    Join {
        channel: String,
        password: Option<String>,
    },
    Leave {
        channel: String,
    },
    /// `target` is a channel name or `user:<peer>`
    Message {
        target: String,
        payload: String,
    },
    Emote {
        target: String,
        text: String,
    },
    ChannelList,
    UserList {
        channel: String,
    },
    Motd,
    Topic {
        channel: String,
    },
    SetTopic {
        channel: String,
        topic: String,
    },
    Kick {
        channel: String,
        user: String,
        reason: Option<String>,
    },
    /// `minutes == 0` bans permanently
    Ban {
        user: String,
        minutes: i64,
        reason: Option<String>,
    },
    Unban {
        user: String,
    },
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

impl ClientRequest {
    /// Render the record, without the trailing terminator.
    pub fn to_record(&self) -> String {
        match self {
            ClientRequest::Authenticate { username, password } => match non_empty(password) {
                Some(password) => format!("!name:{}:{}", username, password),
                None => format!("!name:{}", username),
            },
            ClientRequest::Join { channel, password } => match non_empty(password) {
                Some(password) => format!("!jnchn:{}:{}", channel, password),
                None => format!("!jnchn:{}", channel),
            },
            ClientRequest::Leave { channel } => format!("!lvchn:{}", channel),
            ClientRequest::Message { target, payload } => {
                if is_file_payload(payload) {
                    format!("!msg:{}:{}", target, payload)
                } else {
                    format!("!msg:{}:{}", target, escape_for_wire(payload))
                }
            }
            ClientRequest::Emote { target, text } => {
                format!("!emote:{}:{}", target, escape_for_wire(text))
            }
            ClientRequest::ChannelList => "!chanlist".to_string(),
            ClientRequest::UserList { channel } => format!("!userlist:{}", channel),
            ClientRequest::Motd => "!motd".to_string(),
            ClientRequest::Topic { channel } => format!("!topic:{}", channel),
            ClientRequest::SetTopic { channel, topic } => {
                format!("!settopic:{}:{}", channel, escape_for_wire(topic))
            }
            ClientRequest::Kick {
                channel,
                user,
                reason,
            } => match non_empty(reason) {
                Some(reason) => format!("!kick:{}:{}:{}", channel, user, escape_for_wire(reason)),
                None => format!("!kick:{}:{}", channel, user),
            },
            ClientRequest::Ban {
                user,
                minutes,
                reason,
            } => format!(
                "!ban:{}:{}:{}",
                user,
                (*minutes).max(0),
                escape_for_wire(non_empty(reason).unwrap_or(DEFAULT_BAN_REASON))
            ),
            ClientRequest::Unban { user } => format!("!unban:{}", user),
        }
    }
}
