//! radi8c - Entry Point
//!
//! Line-oriented terminal front end: reads commands from stdin and prints
//! display events to stdout.

use log::{info, warn};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc::UnboundedReceiver;

use radi8c::client::{Flow, Session, UserCommand, execute, parse_input};
use radi8c::config::ClientConfig;
use radi8c::display::{ChannelDisplay, DisplayEvent};
use radi8c::error::ClientError;
use radi8c::error::handlers::{ends_session, handle_error};
use radi8c::utils::logging::setup_logging;

const LIVENESS_CHECK: Duration = Duration::from_millis(500);

#[tokio::main]
async fn main() -> ExitCode {
    setup_logging();

    let config = match ClientConfig::load() {
        Ok(config) => config,
        Err(e) => {
            handle_error(&ClientError::from(e));
            return ExitCode::FAILURE;
        }
    };

    info!("Launching radi8c as {}...", config.username);

    let (display, events) = ChannelDisplay::new();
    tokio::spawn(print_events(events));

    let mut session = Session::new(config, Arc::new(display));
    if let Err(e) = session.start().await {
        handle_error(&e);
        return ExitCode::FAILURE;
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut liveness = tokio::time::interval(LIVENESS_CHECK);
    let mut online = true;

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let line = match line {
                    Ok(Some(line)) => line,
                    Ok(None) => break,
                    Err(e) => {
                        handle_error(&ClientError::from(e));
                        break;
                    }
                };
                let Some(command) = parse_input(&line) else {
                    if !online {
                        online = reconnect(&mut session).await;
                    }
                    continue;
                };

                if !online {
                    if matches!(command, UserCommand::Quit) {
                        break;
                    }
                    online = reconnect(&mut session).await;
                    continue;
                }

                match execute(session.engine(), command).await {
                    Ok(Flow::Continue) => {}
                    Ok(Flow::Disconnect) => {
                        session.shutdown().await;
                        online = false;
                        println!("Disconnected. Press Enter to reconnect or /quit to exit.");
                    }
                    Ok(Flow::Quit) => break,
                    Err(e) => {
                        handle_error(&e);
                        if ends_session(&e) && !session.is_running() {
                            online = false;
                            println!("Connection lost. Press Enter to reconnect or /quit to exit.");
                        }
                    }
                }
            }
            _ = liveness.tick(), if online => {
                if !session.is_running() {
                    warn!("Server closed the connection");
                    online = false;
                    println!("Connection lost. Press Enter to reconnect or /quit to exit.");
                }
            }
        }
    }

    session.shutdown().await;
    info!("Goodbye");
    ExitCode::SUCCESS
}

async fn reconnect(session: &mut Session) -> bool {
    match session.restart().await {
        Ok(()) => true,
        Err(e) => {
            handle_error(&e);
            println!("Reconnect failed. Press Enter to retry or /quit to exit.");
            false
        }
    }
}

async fn print_events(mut events: UnboundedReceiver<DisplayEvent>) {
    while let Some(event) = events.recv().await {
        if let Some(line) = describe(event) {
            println!("{}", line);
        }
    }
}

fn describe(event: DisplayEvent) -> Option<String> {
    match event {
        DisplayEvent::Message(message) => {
            Some(format!("{} {}", message.conversation, message.render()))
        }
        DisplayEvent::Status(text) if text.is_empty() => None,
        DisplayEvent::Status(text) => Some(format!("** {}", text)),
        DisplayEvent::ChannelListed {
            channel,
            user_count,
            topic,
        } => {
            let users = user_count.map(|n| format!(" ({} users)", n)).unwrap_or_default();
            let topic = topic.map(|t| format!(" - {}", t)).unwrap_or_default();
            Some(format!("channel #{}{}{}", channel, users, topic))
        }
        DisplayEvent::ConversationFocused(conversation) => {
            Some(format!("** Now talking in {}", conversation))
        }
        DisplayEvent::ConversationClosed(conversation) => Some(format!("** Closed {}", conversation)),
        DisplayEvent::ChannelJoined { channel } => Some(format!("** Joined #{}", channel)),
        DisplayEvent::ChannelRemoved { channel } => Some(format!("** Removed from #{}", channel)),
        DisplayEvent::TopicChanged { channel, topic } => {
            Some(format!("** Topic for #{}: {}", channel, topic))
        }
        DisplayEvent::ConversationOpened(_)
        | DisplayEvent::UserJoined { .. }
        | DisplayEvent::UserLeft { .. }
        | DisplayEvent::DownloadReady(_) => None,
    }
}
