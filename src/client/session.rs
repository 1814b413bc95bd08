//! Client session management
//!
//! Handles the connection lifecycle: connect, authenticate, run the receiver
//! and ticker tasks, and tear everything down again.

use log::{debug, info, warn};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::config::ClientConfig;
use crate::display::{Display, DisplayEvent};
use crate::error::{AuthError, ClientError};
use crate::protocol::{FrameDecoder, ProtocolEngine};
use crate::transport::Connection;

/// One logical connection to a server, restartable with the same engine
pub struct Session {
    config: ClientConfig,
    engine: Arc<ProtocolEngine>,
    receiver: Option<JoinHandle<()>>,
    ticker: Option<JoinHandle<()>>,
}

impl Session {
    pub fn new(config: ClientConfig, display: Arc<dyn Display>) -> Self {
        let engine = ProtocolEngine::new(Arc::new(Connection::new()), display, config.download_dir());
        Self {
            config,
            engine: Arc::new(engine),
            receiver: None,
            ticker: None,
        }
    }

    pub fn engine(&self) -> &Arc<ProtocolEngine> {
        &self.engine
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn is_running(&self) -> bool {
        self.engine.connection().is_connected()
    }

    /// Connect, authenticate and start the background tasks.
    ///
    /// The receiver runs before the authentication request goes out so the
    /// reply cannot be missed. On failure everything is torn down again.
    pub async fn start(&mut self) -> Result<(), ClientError> {
        let endpoint = self.config.endpoint();
        self.engine.reset_session();
        self.engine
            .connection()
            .connect(&endpoint, self.config.connect_timeout())
            .await?;

        self.receiver = Some(spawn_receiver(
            Arc::clone(&self.engine),
            self.config.receive_timeout(),
        ));

        let password = self.config.password.as_deref();
        if let Err(e) = self.engine.authenticate(&self.config.username, password).await {
            self.shutdown().await;
            return Err(AuthError::RequestFailed(e).into());
        }

        if let Err(e) = self.engine.wait_for_auth(self.config.auth_timeout()).await {
            warn!("Authentication as {} failed: {}", self.config.username, e);
            self.shutdown().await;
            return Err(e.into());
        }
        info!("Authenticated as {} on {}", self.config.username, endpoint);

        self.ticker = Some(spawn_ticker(
            Arc::clone(&self.engine),
            self.config.tick_interval(),
        ));

        self.engine.request_motd().await?;
        self.engine.request_channel_list().await?;
        Ok(())
    }

    /// Tear down the current connection and start a fresh one
    pub async fn restart(&mut self) -> Result<(), ClientError> {
        self.shutdown().await;
        self.start().await
    }

    /// Disconnect first so blocked tasks wake up, then wait for them.
    pub async fn shutdown(&mut self) {
        self.engine.connection().disconnect().await;

        for handle in [self.receiver.take(), self.ticker.take()].into_iter().flatten() {
            if let Err(e) = handle.await {
                warn!("Session task ended abnormally: {}", e);
            }
        }
        debug!("Session stopped");
    }
}

fn spawn_receiver(engine: Arc<ProtocolEngine>, timeout: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut decoder = FrameDecoder::new();
        let connection = Arc::clone(engine.connection());

        while connection.is_connected() {
            let bytes = connection.receive(timeout).await;
            if bytes.is_empty() {
                continue;
            }
            for record in decoder.feed(&bytes) {
                engine.process_record(&record).await;
            }
        }

        debug!("Receiver stopped");
        engine
            .display()
            .notify(DisplayEvent::Status("Disconnected from server".to_string()));
    })
}

fn spawn_ticker(engine: Arc<ProtocolEngine>, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        while engine.connection().is_connected() {
            interval.tick().await;
            engine.process_file_transfers().await;
        }
        debug!("Ticker stopped");
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::ChannelDisplay;
    use std::io::Write;
    use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
    use tokio::net::TcpListener;

    fn config_for(port: u16, dir: &std::path::Path) -> ClientConfig {
        let path = dir.join("radi8c.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        write!(
            file,
            "host = \"127.0.0.1\"\nport = {}\nusername = \"alice\"\nauth_timeout_secs = 2\ndownload_dir = \"{}\"\n",
            port,
            dir.display()
        )
        .unwrap();
        ClientConfig::load_from(&path).unwrap()
    }

    /// Answers the first record with `reply` and then echoes nothing.
    async fn one_shot_server(reply: &'static str) -> (u16, JoinHandle<Vec<String>>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let handle = tokio::spawn(async move {
            let (socket, _) = listener.accept().await.unwrap();
            let (read_half, mut write_half) = socket.into_split();
            let mut lines = BufReader::new(read_half).lines();
            let mut seen = Vec::new();
            if let Ok(Some(first)) = lines.next_line().await {
                seen.push(first);
                write_half.write_all(reply.as_bytes()).await.unwrap();
            }
            while let Ok(Some(line)) = lines.next_line().await {
                seen.push(line);
            }
            seen
        });
        (port, handle)
    }

    #[tokio::test]
    async fn test_start_authenticates_and_requests_motd_and_channels() {
        let dir = tempfile::tempdir().unwrap();
        let (port, server) = one_shot_server("!apr:name\n").await;
        let (display, _events) = ChannelDisplay::new();
        let mut session = Session::new(config_for(port, dir.path()), Arc::new(display));

        session.start().await.unwrap();
        assert!(session.is_running());
        session.shutdown().await;
        assert!(!session.is_running());

        let seen = server.await.unwrap();
        assert_eq!(seen, vec!["!name:alice", "!motd", "!chanlist"]);
    }

    #[tokio::test]
    async fn test_rejected_start_leaves_session_stopped() {
        let dir = tempfile::tempdir().unwrap();
        let (port, _server) = one_shot_server("!err:name:name taken\n").await;
        let (display, _events) = ChannelDisplay::new();
        let mut session = Session::new(config_for(port, dir.path()), Arc::new(display));

        let err = session.start().await.unwrap_err();
        assert!(matches!(err, ClientError::Auth(AuthError::Rejected(ref r)) if r == "name taken"));
        assert!(!session.is_running());
    }

    #[tokio::test]
    async fn test_unreachable_server_is_a_transport_error() {
        let dir = tempfile::tempdir().unwrap();
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let (display, _events) = ChannelDisplay::new();
        let mut session = Session::new(config_for(port, dir.path()), Arc::new(display));
        let err = session.start().await.unwrap_err();
        assert!(matches!(err, ClientError::Transport(_)));
    }
}
