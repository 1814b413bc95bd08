//! Module `connection`
//!
//! Reliable record send/receive over a plain or TLS-wrapped TCP socket.
//!
//! Reads and writes go through separate locks so the receiver loop can sit in
//! `receive` while chat messages and file chunks are sent concurrently. Every
//! send holds the write lock for the whole record, so records from different
//! producers never interleave on the wire.

use log::{debug, info, trace, warn};
use std::fmt;
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::{Mutex, watch};

use crate::error::TransportError;
use crate::transport::tls;

type BoxedReader = Box<dyn AsyncRead + Send + Unpin>;
type BoxedWriter = Box<dyn AsyncWrite + Send + Unpin>;

/// Largest single read handed to the frame decoder
pub const READ_BUFFER_SIZE: usize = 128 * 1024;
pub const RECORD_TERMINATOR: u8 = b'\n';

const WRITE_RETRY_DELAY: Duration = Duration::from_millis(1);
const SHUTDOWN_GRACE: Duration = Duration::from_millis(500);

/// Remote side of a session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
    pub secure: bool,
}

impl Endpoint {
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let scheme = if self.secure { "tls" } else { "tcp" };
        write!(f, "{}://{}:{}", scheme, self.host, self.port)
    }
}

pub struct Connection {
    reader: Mutex<Option<BoxedReader>>,
    writer: Mutex<Option<BoxedWriter>>,
    connected: AtomicBool,
    endpoint: parking_lot::Mutex<Option<Endpoint>>,
    closing: watch::Sender<bool>,
}

impl Default for Connection {
    fn default() -> Self {
        Self::new()
    }
}

impl Connection {
    pub fn new() -> Self {
        let (closing, _) = watch::channel(false);
        Self {
            reader: Mutex::new(None),
            writer: Mutex::new(None),
            connected: AtomicBool::new(false),
            endpoint: parking_lot::Mutex::new(None),
            closing,
        }
    }

    /// Open a socket to `endpoint`, running the TLS handshake when requested.
    ///
    /// An existing connection is torn down first.
    pub async fn connect(
        &self,
        endpoint: &Endpoint,
        connect_timeout: Duration,
    ) -> Result<(), TransportError> {
        if self.is_connected() {
            self.disconnect().await;
        }

        let address = endpoint.address();
        info!("Connecting to {}", endpoint);

        let tcp = match tokio::time::timeout(connect_timeout, TcpStream::connect(&address)).await {
            Ok(Ok(stream)) => stream,
            Ok(Err(e)) => return Err(TransportError::ConnectFailed(address, e)),
            Err(_) => return Err(TransportError::ConnectTimeout(address)),
        };

        if let Err(e) = tcp.set_nodelay(true) {
            debug!("Could not set TCP_NODELAY on {}: {}", address, e);
        }

        let (reader, writer): (BoxedReader, BoxedWriter) = if endpoint.secure {
            let stream = tls::connect(&endpoint.host, tcp, connect_timeout).await?;
            let (read_half, write_half) = tokio::io::split(stream);
            (Box::new(read_half), Box::new(write_half))
        } else {
            let (read_half, write_half) = tcp.into_split();
            (Box::new(read_half), Box::new(write_half))
        };

        *self.reader.lock().await = Some(reader);
        *self.writer.lock().await = Some(writer);
        *self.endpoint.lock() = Some(endpoint.clone());
        self.closing.send_replace(false);
        self.connected.store(true, Ordering::SeqCst);

        info!("Connected to {}", endpoint);
        Ok(())
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    pub fn endpoint(&self) -> Option<Endpoint> {
        self.endpoint.lock().clone()
    }

    /// Send one record, appending the record terminator.
    ///
    /// Transient "would block" conditions are retried after a short sleep; any
    /// other write error marks the connection closed.
    pub async fn send(&self, record: &str) -> Result<(), TransportError> {
        if !self.is_connected() {
            return Err(TransportError::NotConnected);
        }

        let mut bytes = Vec::with_capacity(record.len() + 1);
        bytes.extend_from_slice(record.as_bytes());
        bytes.push(RECORD_TERMINATOR);

        let mut guard = self.writer.lock().await;
        let writer = guard.as_mut().ok_or(TransportError::NotConnected)?;

        let mut written = 0;
        while written < bytes.len() {
            let result = tokio::select! {
                result = writer.write(&bytes[written..]) => result,
                _ = self.closed_signal() => return Err(TransportError::NotConnected),
            };

            match result {
                Ok(0) => {
                    self.mark_closed("write returned zero bytes");
                    return Err(TransportError::Closed);
                }
                Ok(n) => written += n,
                Err(e) if is_transient(&e) => {
                    trace!("Transient write condition ({}), retrying", e);
                    tokio::time::sleep(WRITE_RETRY_DELAY).await;
                }
                Err(e) => {
                    warn!("Write failed: {}", e);
                    self.mark_closed("write error");
                    return Err(TransportError::Io(e));
                }
            }
        }

        if let Err(e) = writer.flush().await {
            warn!("Flush failed: {}", e);
            self.mark_closed("flush error");
            return Err(TransportError::Io(e));
        }

        Ok(())
    }

    /// Return whatever bytes arrive within `timeout`, up to [`READ_BUFFER_SIZE`].
    ///
    /// An empty result means either "nothing yet" or "closed"; check
    /// [`Connection::is_connected`] to tell them apart.
    pub async fn receive(&self, timeout: Duration) -> Vec<u8> {
        if !self.is_connected() {
            return Vec::new();
        }

        let mut guard = self.reader.lock().await;
        let Some(reader) = guard.as_mut() else {
            return Vec::new();
        };

        let mut buf = Vec::with_capacity(READ_BUFFER_SIZE);
        let outcome = tokio::select! {
            result = tokio::time::timeout(timeout, reader.read_buf(&mut buf)) => Some(result),
            _ = self.closed_signal() => None,
        };

        match outcome {
            None | Some(Err(_)) => Vec::new(),
            Some(Ok(Ok(0))) => {
                self.mark_closed("closed by peer");
                Vec::new()
            }
            Some(Ok(Ok(_))) => buf,
            Some(Ok(Err(e))) if is_transient(&e) => Vec::new(),
            Some(Ok(Err(e))) => {
                warn!("Read failed: {}", e);
                self.mark_closed("read error");
                Vec::new()
            }
        }
    }

    /// Close the connection, waking any task parked in `receive` or `send`
    /// before the socket halves are released.
    pub async fn disconnect(&self) {
        let was_connected = self.connected.swap(false, Ordering::SeqCst);
        self.closing.send_replace(true);

        let writer = self.writer.lock().await.take();
        if let Some(mut writer) = writer {
            let _ = tokio::time::timeout(SHUTDOWN_GRACE, writer.shutdown()).await;
        }
        self.reader.lock().await.take();

        let endpoint = self.endpoint.lock().take();
        if was_connected {
            match endpoint {
                Some(endpoint) => info!("Disconnected from {}", endpoint),
                None => info!("Disconnected"),
            }
        }
    }

    fn mark_closed(&self, reason: &str) {
        if self.connected.swap(false, Ordering::SeqCst) {
            info!("Connection lost: {}", reason);
        }
        self.closing.send_replace(true);
    }

    async fn closed_signal(&self) {
        let mut closing = self.closing.subscribe();
        let _ = closing.wait_for(|closing| *closing).await;
    }
}

fn is_transient(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tokio::io::{AsyncBufReadExt, BufReader};
    use tokio::net::TcpListener;

    async fn local_pair() -> (Arc<Connection>, TcpStream) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let endpoint = Endpoint {
            host: "127.0.0.1".into(),
            port,
            secure: false,
        };

        let conn = Arc::new(Connection::new());
        let (connected, accepted) = tokio::join!(
            conn.connect(&endpoint, Duration::from_secs(2)),
            listener.accept()
        );
        connected.unwrap();
        (conn, accepted.unwrap().0)
    }

    #[tokio::test]
    async fn test_send_appends_terminator() {
        let (conn, server) = local_pair().await;
        conn.send("!msg:general:hello").await.unwrap();

        let mut lines = BufReader::new(server).lines();
        let line = lines.next_line().await.unwrap().unwrap();
        assert_eq!(line, "!msg:general:hello");
    }

    #[tokio::test]
    async fn test_receive_times_out_with_no_data() {
        let (conn, _server) = local_pair().await;
        let bytes = conn.receive(Duration::from_millis(20)).await;
        assert!(bytes.is_empty());
        assert!(conn.is_connected());
    }

    #[tokio::test]
    async fn test_receive_returns_available_bytes() {
        let (conn, mut server) = local_pair().await;
        server.write_all(b"!motd:hi\n!mo").await.unwrap();

        let mut got = Vec::new();
        while got.len() < 12 {
            got.extend(conn.receive(Duration::from_millis(200)).await);
        }
        assert_eq!(got, b"!motd:hi\n!mo");
    }

    #[tokio::test]
    async fn test_peer_close_marks_disconnected() {
        let (conn, server) = local_pair().await;
        drop(server);

        let bytes = conn.receive(Duration::from_secs(2)).await;
        assert!(bytes.is_empty());
        assert!(!conn.is_connected());
        assert!(conn.receive(Duration::from_secs(2)).await.is_empty());
        assert!(matches!(
            conn.send("!motd").await,
            Err(TransportError::NotConnected)
        ));
    }

    #[tokio::test]
    async fn test_disconnect_unblocks_pending_receive() {
        let (conn, _server) = local_pair().await;

        let reader = Arc::clone(&conn);
        let pending =
            tokio::spawn(async move { reader.receive(Duration::from_secs(30)).await });

        tokio::time::sleep(Duration::from_millis(50)).await;
        conn.disconnect().await;

        let bytes = tokio::time::timeout(Duration::from_secs(2), pending)
            .await
            .expect("receive stayed blocked after disconnect")
            .unwrap();
        assert!(bytes.is_empty());
        assert!(!conn.is_connected());
        assert_eq!(conn.endpoint(), None);
    }

    #[tokio::test]
    async fn test_concurrent_senders_never_interleave() {
        let (conn, server) = local_pair().await;

        let mut tasks = Vec::new();
        for marker in ['a', 'b'] {
            let conn = Arc::clone(&conn);
            tasks.push(tokio::spawn(async move {
                let record = marker.to_string().repeat(20_000);
                for _ in 0..20 {
                    conn.send(&record).await.unwrap();
                }
            }));
        }

        let reader = tokio::spawn(async move {
            let mut lines = BufReader::new(server).lines();
            let mut seen = 0;
            while seen < 40 {
                let line = lines.next_line().await.unwrap().unwrap();
                let first = line.chars().next().unwrap();
                assert_eq!(line.len(), 20_000);
                assert!(line.chars().all(|c| c == first));
                seen += 1;
            }
        });

        for task in tasks {
            task.await.unwrap();
        }
        reader.await.unwrap();
    }
}
