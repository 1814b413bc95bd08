//! User input parsing
//!
//! Turns a typed line into a [`UserCommand`]. Lines starting with `/` are
//! commands; anything else is chat for the active conversation.

use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserCommand {
    Say(String),
    Join {
        channel: String,
        password: Option<String>,
    },
    /// `None` leaves the active conversation
    Leave {
        channel: Option<String>,
    },
    Emote(String),
    /// Open (and focus) a direct conversation, optionally sending a first line
    OpenDirect {
        user: String,
        message: Option<String>,
    },
    DirectMessage {
        user: String,
        message: String,
    },
    /// `None` asks for the current topic
    Topic(Option<String>),
    ListChannels,
    Refresh,
    Private(String),
    SendFile(PathBuf),
    Kick {
        channel: Option<String>,
        user: String,
        reason: Option<String>,
    },
    Ban {
        user: String,
        minutes: i64,
        reason: Option<String>,
    },
    Unban {
        user: String,
    },
    Help,
    Disconnect,
    Quit,
    Unknown(String),
    Usage(&'static str),
}

pub const HELP_TEXT: &str = "Available: /join <channel> [password], /leave [channel], /me <action>, \
/dm <user> [message], /msg <user> <message>, /pv <message>, /topic [new topic], /send <path>; \
Admin: /kick [#channel] <user> [reason], /ban <user> [minutes] [reason], /unban <user>. \
Also: /help, /list, /refresh, /disconnect, /quit";

/// First whitespace-delimited word and the trimmed remainder
fn split_word(text: &str) -> (&str, &str) {
    let text = text.trim();
    match text.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (text, ""),
    }
}

fn optional(text: &str) -> Option<String> {
    if text.is_empty() {
        None
    } else {
        Some(text.to_string())
    }
}

/// Parse one line of input. Blank lines yield `None`.
pub fn parse_input(line: &str) -> Option<UserCommand> {
    let line = line.trim_end_matches(['\r', '\n']);
    if line.trim().is_empty() {
        return None;
    }

    let Some(command_line) = line.strip_prefix('/') else {
        return Some(UserCommand::Say(line.to_string()));
    };
    let (command, args) = split_word(command_line);

    let parsed = match command {
        "join" | "j" => {
            let (channel, password) = split_word(args);
            let channel = channel.trim_start_matches('#');
            if channel.is_empty() {
                UserCommand::Usage("/join <channel> [password]")
            } else {
                UserCommand::Join {
                    channel: channel.to_string(),
                    password: optional(password),
                }
            }
        }
        "leave" | "part" | "l" => UserCommand::Leave {
            channel: optional(args.trim_start_matches('#')),
        },
        "me" => match optional(args) {
            Some(action) => UserCommand::Emote(action),
            None => UserCommand::Usage("/me <action>"),
        },
        "dm" => {
            let (user, message) = split_word(args);
            let user = user.trim_start_matches('@');
            if user.is_empty() {
                UserCommand::Usage("/dm <user> [message]")
            } else {
                UserCommand::OpenDirect {
                    user: user.to_string(),
                    message: optional(message),
                }
            }
        }
        "msg" => {
            let (user, message) = split_word(args);
            let user = user.trim_start_matches('@');
            if user.is_empty() || message.is_empty() {
                UserCommand::Usage("/msg <user> <message>")
            } else {
                UserCommand::DirectMessage {
                    user: user.to_string(),
                    message: message.to_string(),
                }
            }
        }
        "topic" => UserCommand::Topic(optional(args)),
        "list" => UserCommand::ListChannels,
        "refresh" => UserCommand::Refresh,
        "pv" => match optional(args) {
            Some(text) => UserCommand::Private(text),
            None => UserCommand::Usage("/pv <message>"),
        },
        "send" => match optional(args) {
            Some(path) => UserCommand::SendFile(PathBuf::from(path)),
            None => UserCommand::Usage("/send <path>"),
        },
        "kick" => {
            let (first, rest) = split_word(args);
            let (channel, user, reason) = match first.strip_prefix('#') {
                Some(channel) => {
                    let (user, reason) = split_word(rest);
                    (Some(channel.to_string()), user, reason)
                }
                None => (None, first, rest),
            };
            if user.is_empty() || channel.as_deref() == Some("") {
                UserCommand::Usage("/kick [#channel] <user> [reason]")
            } else {
                UserCommand::Kick {
                    channel,
                    user: user.to_string(),
                    reason: optional(reason),
                }
            }
        }
        "ban" => {
            let (user, rest) = split_word(args);
            if user.is_empty() {
                UserCommand::Usage("/ban <user> [minutes] [reason]")
            } else {
                let (first, after) = split_word(rest);
                let (minutes, reason) = match first.parse::<i64>() {
                    Ok(minutes) => (minutes, after),
                    Err(_) => (0, rest),
                };
                UserCommand::Ban {
                    user: user.to_string(),
                    minutes,
                    reason: optional(reason),
                }
            }
        }
        "unban" => match optional(args) {
            Some(user) => UserCommand::Unban { user },
            None => UserCommand::Usage("/unban <user>"),
        },
        "help" | "h" => UserCommand::Help,
        "disconnect" => UserCommand::Disconnect,
        "quit" | "exit" | "q" => UserCommand::Quit,
        other => UserCommand::Unknown(other.to_string()),
    };

    Some(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_and_plain_lines() {
        assert_eq!(parse_input(""), None);
        assert_eq!(parse_input("   \r\n"), None);
        assert_eq!(
            parse_input("hello: world\n"),
            Some(UserCommand::Say("hello: world".into()))
        );
    }

    #[test]
    fn test_join_strips_hash_and_keeps_password() {
        assert_eq!(
            parse_input("/join #rust"),
            Some(UserCommand::Join {
                channel: "rust".into(),
                password: None,
            })
        );
        assert_eq!(
            parse_input("/j secret  hunter2 "),
            Some(UserCommand::Join {
                channel: "secret".into(),
                password: Some("hunter2".into()),
            })
        );
        assert_eq!(
            parse_input("/join"),
            Some(UserCommand::Usage("/join <channel> [password]"))
        );
    }

    #[test]
    fn test_leave_aliases() {
        for line in ["/leave", "/part", "/l"] {
            assert_eq!(parse_input(line), Some(UserCommand::Leave { channel: None }));
        }
        assert_eq!(
            parse_input("/part #rust"),
            Some(UserCommand::Leave {
                channel: Some("rust".into())
            })
        );
    }

    #[test]
    fn test_direct_messages() {
        assert_eq!(
            parse_input("/dm @bob"),
            Some(UserCommand::OpenDirect {
                user: "bob".into(),
                message: None,
            })
        );
        assert_eq!(
            parse_input("/dm bob are you there?"),
            Some(UserCommand::OpenDirect {
                user: "bob".into(),
                message: Some("are you there?".into()),
            })
        );
        assert_eq!(
            parse_input("/msg bob"),
            Some(UserCommand::Usage("/msg <user> <message>"))
        );
    }

    #[test]
    fn test_kick_with_and_without_channel() {
        assert_eq!(
            parse_input("/kick mallory spamming links"),
            Some(UserCommand::Kick {
                channel: None,
                user: "mallory".into(),
                reason: Some("spamming links".into()),
            })
        );
        assert_eq!(
            parse_input("/kick #general mallory"),
            Some(UserCommand::Kick {
                channel: Some("general".into()),
                user: "mallory".into(),
                reason: None,
            })
        );
        assert_eq!(
            parse_input("/kick #general"),
            Some(UserCommand::Usage("/kick [#channel] <user> [reason]"))
        );
    }

    #[test]
    fn test_ban_minutes_are_optional() {
        assert_eq!(
            parse_input("/ban mallory 30 flooding"),
            Some(UserCommand::Ban {
                user: "mallory".into(),
                minutes: 30,
                reason: Some("flooding".into()),
            })
        );
        assert_eq!(
            parse_input("/ban mallory being rude"),
            Some(UserCommand::Ban {
                user: "mallory".into(),
                minutes: 0,
                reason: Some("being rude".into()),
            })
        );
        assert_eq!(
            parse_input("/ban mallory"),
            Some(UserCommand::Ban {
                user: "mallory".into(),
                minutes: 0,
                reason: None,
            })
        );
    }

    #[test]
    fn test_misc_commands() {
        assert_eq!(parse_input("/topic"), Some(UserCommand::Topic(None)));
        assert_eq!(
            parse_input("/topic Rust 2024: out now"),
            Some(UserCommand::Topic(Some("Rust 2024: out now".into())))
        );
        assert_eq!(
            parse_input("/send /tmp/a b.txt"),
            Some(UserCommand::SendFile(PathBuf::from("/tmp/a b.txt")))
        );
        assert_eq!(parse_input("/pv"), Some(UserCommand::Usage("/pv <message>")));
        assert_eq!(parse_input("/h"), Some(UserCommand::Help));
        assert_eq!(parse_input("/exit"), Some(UserCommand::Quit));
        assert_eq!(parse_input("/disconnect"), Some(UserCommand::Disconnect));
        assert_eq!(parse_input("/dance"), Some(UserCommand::Unknown("dance".into())));
    }
}
