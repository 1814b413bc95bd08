//! Slash command execution
//!
//! Runs a parsed [`UserCommand`] against the protocol engine. Outgoing chat is
//! echoed locally since the server does not send our own messages back.

use log::{debug, info};

use crate::client::input::{HELP_TEXT, UserCommand};
use crate::display::{ChatMessage, DisplayEvent, SERVER_CONVERSATION, server_conversation};
use crate::error::ClientError;
use crate::protocol::{Conversation, ProtocolEngine};

/// What the input loop should do after a command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Disconnect,
    Quit,
}

pub async fn execute(engine: &ProtocolEngine, command: UserCommand) -> Result<Flow, ClientError> {
    let display = engine.display();
    let active = display.active_conversation();

    match command {
        UserCommand::Say(text) => match sendable(active) {
            Some(target) => say(engine, &target, &text).await?,
            None => status(engine, "Join a channel or open a DM first"),
        },
        UserCommand::Join { channel, password } => {
            engine.join_channel(&channel, password.as_deref()).await?;
            status(engine, &format!("Joining #{}...", channel));
        }
        UserCommand::Leave { channel } => {
            let target = match channel {
                Some(channel) => Some(Conversation::Channel(channel)),
                None => active,
            };
            match target {
                Some(target) if !is_server(&target) => {
                    if !target.is_direct() {
                        engine.leave_channel(target.name()).await?;
                    }
                    info!("Closing {}", target);
                    display.notify(DisplayEvent::ConversationClosed(target));
                }
                _ => status(engine, "Nothing to leave"),
            }
        }
        UserCommand::Emote(action) => match sendable(active) {
            Some(target) => {
                engine.send_emote(&target, &action).await?;
                echo(engine, ChatMessage::emote(target.name(), &engine.username(), &action));
            }
            None => status(engine, "Join a channel or open a DM first"),
        },
        UserCommand::OpenDirect { user, message } => {
            let target = Conversation::Direct(user);
            display.notify(DisplayEvent::ConversationOpened(target.clone()));
            display.notify(DisplayEvent::ConversationFocused(target.clone()));
            if let Some(message) = message {
                say(engine, &target, &message).await?;
            }
        }
        UserCommand::DirectMessage { user, message } => {
            let target = Conversation::Direct(user);
            display.notify(DisplayEvent::ConversationOpened(target.clone()));
            say(engine, &target, &message).await?;
        }
        UserCommand::Topic(topic) => match active {
            Some(Conversation::Channel(channel)) if channel != SERVER_CONVERSATION => match topic {
                Some(topic) => engine.set_topic(&channel, &topic).await?,
                None => engine.request_topic(&channel).await?,
            },
            _ => status(engine, "Topics only exist in channels"),
        },
        UserCommand::ListChannels => {
            engine.request_channel_list().await?;
            status(engine, "Requested channel list");
        }
        UserCommand::Refresh => {
            engine.request_channel_list().await?;
            status(engine, "Refreshing channel list...");
        }
        UserCommand::Private(text) => match sendable(active) {
            Some(target) => say(engine, &target, &format!("<private>{}</private>", text)).await?,
            None => status(engine, "Join a channel or open a DM first"),
        },
        UserCommand::SendFile(path) => match sendable(active) {
            Some(target) => {
                if !path.exists() {
                    status(engine, &format!("File not found: {}", path.display()));
                } else {
                    match engine.send_file(&path, &target) {
                        Ok(()) => status(engine, "Initiating file transfer..."),
                        Err(e) => {
                            status(engine, "Failed to start file transfer");
                            return Err(e.into());
                        }
                    }
                }
            }
            None => status(engine, "Join a channel or open a DM first"),
        },
        UserCommand::Kick {
            channel,
            user,
            reason,
        } => {
            let channel = match channel {
                Some(channel) => Some(channel),
                None => match active {
                    Some(Conversation::Channel(channel)) => Some(channel),
                    _ => None,
                },
            };
            match channel {
                Some(channel) if channel != SERVER_CONVERSATION => {
                    engine.kick_user(&channel, &user, reason.as_deref()).await?;
                    status(engine, &format!("Kick requested: #{} -> {}", channel, user));
                }
                _ => status(engine, "Cannot kick from server channel or DM"),
            }
        }
        UserCommand::Ban {
            user,
            minutes,
            reason,
        } => {
            engine.ban_user(&user, minutes, reason.as_deref()).await?;
            status(engine, &format!("Ban requested for {}", user));
        }
        UserCommand::Unban { user } => {
            engine.unban_user(&user).await?;
            status(engine, &format!("Unban requested for {}", user));
        }
        UserCommand::Help => {
            let conversation = active.unwrap_or_else(server_conversation);
            echo(engine, ChatMessage::system(conversation.name(), "HELP", HELP_TEXT));
        }
        UserCommand::Disconnect => return Ok(Flow::Disconnect),
        UserCommand::Quit => return Ok(Flow::Quit),
        UserCommand::Unknown(name) => {
            debug!("Unknown command /{}", name);
            status(engine, &format!("Unknown command: /{} (try /help)", name));
        }
        UserCommand::Usage(usage) => status(engine, &format!("Usage: {}", usage)),
    }

    Ok(Flow::Continue)
}

/// Send chat to `target` and show it locally
async fn say(engine: &ProtocolEngine, target: &Conversation, text: &str) -> Result<(), ClientError> {
    engine.send_message(target, text).await?;
    echo(engine, ChatMessage::chat(target.name(), &engine.username(), text));
    Ok(())
}

fn sendable(active: Option<Conversation>) -> Option<Conversation> {
    active.filter(|conversation| !is_server(conversation))
}

fn is_server(conversation: &Conversation) -> bool {
    *conversation == server_conversation()
}

fn echo(engine: &ProtocolEngine, message: ChatMessage) {
    engine.display().notify(DisplayEvent::Message(message));
}

fn status(engine: &ProtocolEngine, text: &str) {
    engine.display().notify(DisplayEvent::Status(text.to_string()));
}
