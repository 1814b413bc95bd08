//! Server command parsing
//!
//! Splits a record on `:` and maps the leading field to a typed command.
//! Trailing free-form fields are rejoined with `:` before unescaping so that
//! payloads containing the separator survive intact.

use log::debug;
use std::fmt;

use crate::protocol::escape::unescape_from_wire;

pub const FIELD_SEPARATOR: char = ':';

/// Target field value that marks a direct message
pub const DM_TARGET: &str = "user";

const DEFAULT_REMOVAL_REASON: &str = "no reason given";

/// Where a message belongs on the client side
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Conversation {
    Channel(String),
    Direct(String),
}

impl Conversation {
    pub fn name(&self) -> &str {
        match self {
            Conversation::Channel(name) | Conversation::Direct(name) => name,
        }
    }

    pub fn is_direct(&self) -> bool {
        matches!(self, Conversation::Direct(_))
    }

    /// Target field used when sending into this conversation
    pub fn wire_target(&self) -> String {
        match self {
            Conversation::Channel(name) => name.clone(),
            Conversation::Direct(peer) => format!("{}{}{}", DM_TARGET, FIELD_SEPARATOR, peer),
        }
    }
}

impl fmt::Display for Conversation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Conversation::Channel(name) => write!(f, "#{}", name),
            Conversation::Direct(peer) => write!(f, "@{}", peer),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Approval {
    Name,
    Join(String),
    Kick,
    Other(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemovalKind {
    Kick,
    Ban,
    Other(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerCommand {
    /// `payload` is left escaped: file-transfer tags are inspected raw.
    UserMessage {
        conversation: Conversation,
        sender: String,
        payload: String,
    },
    UserEmote {
        conversation: Conversation,
        sender: String,
        text: String,
    },
    ServerMessage {
        channel: String,
        text: String,
    },
    Error {
        regarding: String,
        reason: String,
    },
    ChannelAdded {
        channel: String,
        user_count: Option<u32>,
        topic: Option<String>,
    },
    UserJoined {
        channel: String,
        user: String,
    },
    UserLeft {
        channel: String,
        user: String,
        reason: Option<String>,
    },
    Topic {
        channel: String,
        topic: String,
    },
    Motd {
        chunk: String,
    },
    Approved(Approval),
    Removed {
        channel: String,
        kind: RemovalKind,
        reason: String,
    },
}

impl ServerCommand {
    /// Whether this command answers the authentication request
    pub fn is_auth_response(&self) -> bool {
        match self {
            ServerCommand::Approved(Approval::Name) => true,
            ServerCommand::Error { regarding, .. } => regarding == "name",
            _ => false,
        }
    }
}

/// Split a record into fields, dropping one empty trailing field.
pub fn split_fields(record: &str) -> Vec<&str> {
    let mut fields: Vec<&str> = record.split(FIELD_SEPARATOR).collect();
    if fields.len() > 1 && fields.last() == Some(&"") {
        fields.pop();
    }
    fields
}

/// Rejoin `fields[from..]` with the separator; `None` when the field is absent.
pub fn rejoin(fields: &[&str], from: usize) -> Option<String> {
    if fields.len() <= from {
        return None;
    }
    Some(fields[from..].join(":"))
}

fn conversation_for(target: &str, sender: &str) -> Conversation {
    if target == DM_TARGET {
        Conversation::Direct(sender.to_string())
    } else {
        Conversation::Channel(target.to_string())
    }
}

/// Parse one record. Unknown commands and records missing required fields
/// yield `None`.
pub fn parse_record(record: &str) -> Option<ServerCommand> {
    let fields = split_fields(record);
    let name = *fields.first()?;

    let command = match name {
        "!usrmsg" => {
            if fields.len() < 4 {
                return None;
            }
            ServerCommand::UserMessage {
                conversation: conversation_for(fields[1], fields[2]),
                sender: fields[2].to_string(),
                payload: rejoin(&fields, 3)?,
            }
        }
        "!usremt" => {
            if fields.len() < 4 {
                return None;
            }
            ServerCommand::UserEmote {
                conversation: conversation_for(fields[1], fields[2]),
                sender: fields[2].to_string(),
                text: unescape_from_wire(&rejoin(&fields, 3)?),
            }
        }
        "!godmsg" => ServerCommand::ServerMessage {
            channel: fields.get(1)?.to_string(),
            text: unescape_from_wire(&rejoin(&fields, 2)?),
        },
        "!err" => ServerCommand::Error {
            regarding: fields.get(1)?.to_string(),
            reason: unescape_from_wire(&rejoin(&fields, 2)?),
        },
        "!chanadd" => ServerCommand::ChannelAdded {
            channel: fields.get(1)?.to_string(),
            user_count: fields.get(2).and_then(|count| count.parse().ok()),
            topic: rejoin(&fields, 3).map(|topic| unescape_from_wire(&topic)),
        },
        "!usrjoind" => ServerCommand::UserJoined {
            channel: fields.get(1)?.to_string(),
            user: fields.get(2)?.to_string(),
        },
        "!usrleft" => ServerCommand::UserLeft {
            channel: fields.get(1)?.to_string(),
            user: fields.get(2)?.to_string(),
            reason: rejoin(&fields, 3)
                .map(|reason| unescape_from_wire(&reason))
                .filter(|reason| !reason.is_empty()),
        },
        "!topic" => ServerCommand::Topic {
            channel: fields.get(1)?.to_string(),
            topic: unescape_from_wire(&rejoin(&fields, 2)?),
        },
        "!motd" => ServerCommand::Motd {
            chunk: unescape_from_wire(&rejoin(&fields, 1)?),
        },
        "!apr" => {
            let approval = match *fields.get(1)? {
                "name" => Approval::Name,
                "jnchn" => Approval::Join(fields.get(2)?.to_string()),
                "kick" => Approval::Kick,
                other => Approval::Other(other.to_string()),
            };
            ServerCommand::Approved(approval)
        }
        "!die" => {
            let kind = match *fields.get(2)? {
                "kick" => RemovalKind::Kick,
                "ban" => RemovalKind::Ban,
                other => RemovalKind::Other(other.to_string()),
            };
            ServerCommand::Removed {
                channel: fields.get(1)?.to_string(),
                kind,
                reason: rejoin(&fields, 3)
                    .map(|reason| unescape_from_wire(&reason))
                    .unwrap_or_else(|| DEFAULT_REMOVAL_REASON.to_string()),
            }
        }
        _ => {
            debug!("Ignoring unknown command {}", name);
            return None;
        }
    };

    Some(command)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_drops_single_trailing_empty_field() {
        assert_eq!(split_fields("!chanlist:"), vec!["!chanlist"]);
        assert_eq!(split_fields("!a:b::"), vec!["!a", "b", ""]);
        assert_eq!(split_fields("!motd"), vec!["!motd"]);
    }

    #[test]
    fn test_channel_message_keeps_colons_in_payload() {
        let cmd = parse_record("!usrmsg:general:alice:see http://x.org:80/ at 12:00").unwrap();
        assert_eq!(
            cmd,
            ServerCommand::UserMessage {
                conversation: Conversation::Channel("general".into()),
                sender: "alice".into(),
                payload: "see http://x.org:80/ at 12:00".into(),
            }
        );
    }

    #[test]
    fn test_direct_message_is_keyed_by_sender() {
        let cmd = parse_record("!usrmsg:user:bob:hey<colon> you").unwrap();
        let ServerCommand::UserMessage {
            conversation,
            payload,
            ..
        } = cmd
        else {
            panic!("expected a user message");
        };
        assert_eq!(conversation, Conversation::Direct("bob".into()));
        assert_eq!(payload, "hey<colon> you");
    }

    #[test]
    fn test_emote_is_unescaped() {
        assert_eq!(
            parse_record("!usremt:general:carol:waves<colon> hi").unwrap(),
            ServerCommand::UserEmote {
                conversation: Conversation::Channel("general".into()),
                sender: "carol".into(),
                text: "waves: hi".into(),
            }
        );
    }

    #[test]
    fn test_auth_rejection() {
        let cmd = parse_record("!err:name:bad credentials").unwrap();
        assert!(cmd.is_auth_response());
        assert_eq!(
            cmd,
            ServerCommand::Error {
                regarding: "name".into(),
                reason: "bad credentials".into(),
            }
        );
        assert!(!parse_record("!err:jnchn:no such channel").unwrap().is_auth_response());
    }

    #[test]
    fn test_channel_add_with_optional_fields() {
        assert_eq!(
            parse_record("!chanadd:rust").unwrap(),
            ServerCommand::ChannelAdded {
                channel: "rust".into(),
                user_count: None,
                topic: None,
            }
        );
        assert_eq!(
            parse_record("!chanadd:rust:12:ownership: explained").unwrap(),
            ServerCommand::ChannelAdded {
                channel: "rust".into(),
                user_count: Some(12),
                topic: Some("ownership: explained".into()),
            }
        );
    }

    #[test]
    fn test_user_left_reason() {
        assert_eq!(
            parse_record("!usrleft:general:dave").unwrap(),
            ServerCommand::UserLeft {
                channel: "general".into(),
                user: "dave".into(),
                reason: None,
            }
        );
        assert_eq!(
            parse_record("!usrleft:general:dave:quit: bye").unwrap(),
            ServerCommand::UserLeft {
                channel: "general".into(),
                user: "dave".into(),
                reason: Some("quit: bye".into()),
            }
        );
    }

    #[test]
    fn test_motd_chunk_keeps_separators() {
        assert_eq!(
            parse_record("!motd:Rules: be nice<nl>Host").unwrap(),
            ServerCommand::Motd {
                chunk: "Rules: be nice\nHost".into(),
            }
        );
    }

    #[test]
    fn test_approvals() {
        assert_eq!(
            parse_record("!apr:name").unwrap(),
            ServerCommand::Approved(Approval::Name)
        );
        assert_eq!(
            parse_record("!apr:jnchn:general").unwrap(),
            ServerCommand::Approved(Approval::Join("general".into()))
        );
        assert_eq!(
            parse_record("!apr:kick").unwrap(),
            ServerCommand::Approved(Approval::Kick)
        );
        assert!(parse_record("!apr:jnchn").is_none());
    }

    #[test]
    fn test_removal_defaults_reason() {
        assert_eq!(
            parse_record("!die:general:ban").unwrap(),
            ServerCommand::Removed {
                channel: "general".into(),
                kind: RemovalKind::Ban,
                reason: "no reason given".into(),
            }
        );
    }

    #[test]
    fn test_malformed_and_unknown_records() {
        assert!(parse_record("!usrmsg:general:alice").is_none());
        assert!(parse_record("!topic").is_none());
        assert!(parse_record("!bogus:1:2").is_none());
    }

    #[test]
    fn test_wire_target() {
        assert_eq!(Conversation::Channel("general".into()).wire_target(), "general");
        assert_eq!(Conversation::Direct("bob".into()).wire_target(), "user:bob");
    }
}
