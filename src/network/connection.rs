//! Connection handling
//!
//! Manages the stream to the game server, including:
//! - Dialing TCP or Unix sockets with a timeout
//! - Splitting the stream into a read half and a writer task
//! - Fire-and-forget outbound frames through a [`ConnectionHandle`]

use bytes::Bytes;
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::Endpoint;
use crate::engine::FrameSink;

/// Connection errors
#[derive(Error, Debug)]
pub enum ConnectionError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Connection refused by {0}")]
    Refused(String),

    #[error("No socket found at {0}")]
    NotFound(String),

    #[error("Connection timeout")]
    Timeout,

    #[error("Connection closed")]
    Closed,

    #[error("Send channel closed")]
    SendChannelClosed,

    #[error("Invalid address: {0:?}")]
    InvalidAddress(String),

    #[error("Unix domain sockets are not supported on this platform")]
    UnsupportedPlatform,
}

impl ConnectionError {
    /// Errors where the server is simply not there yet and the user may want to retry
    pub fn is_retryable(&self) -> bool {
        matches!(self, ConnectionError::Refused(_) | ConnectionError::NotFound(_))
    }
}

pub type ConnectionResult<T> = Result<T, ConnectionError>;

pub type BoxedReader = Box<dyn AsyncRead + Unpin + Send>;
pub type BoxedWriter = Box<dyn AsyncWrite + Unpin + Send>;

/// An established stream to the server, not yet split
pub struct Connection {
    endpoint: Endpoint,
    reader: BoxedReader,
    writer: BoxedWriter,
}

impl Connection {
    /// Dial the endpoint, giving up after `timeout`
    pub async fn connect(endpoint: &Endpoint, timeout: Duration) -> ConnectionResult<Self> {
        tracing::info!("Connecting to {}", endpoint);

        match tokio::time::timeout(timeout, Self::dial(endpoint)).await {
            Ok(result) => result,
            Err(_) => Err(ConnectionError::Timeout),
        }
    }

    async fn dial(endpoint: &Endpoint) -> ConnectionResult<Self> {
        match endpoint {
            Endpoint::Tcp { host, port } => {
                let stream = TcpStream::connect((host.as_str(), *port))
                    .await
                    .map_err(|e| classify(e, endpoint))?;
                stream.set_nodelay(true)?;
                Ok(Self::from_stream(stream, endpoint.clone()))
            }
            #[cfg(unix)]
            Endpoint::Unix(path) => {
                let stream = tokio::net::UnixStream::connect(path)
                    .await
                    .map_err(|e| classify(e, endpoint))?;
                Ok(Self::from_stream(stream, endpoint.clone()))
            }
            #[cfg(not(unix))]
            Endpoint::Unix(_) => Err(ConnectionError::UnsupportedPlatform),
        }
    }

    /// Wrap any duplex byte stream
    pub fn from_stream<S>(stream: S, endpoint: Endpoint) -> Self
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        let (reader, writer) = tokio::io::split(stream);
        Self {
            endpoint,
            reader: Box::new(reader),
            writer: Box::new(writer),
        }
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// Split into the read half, a handle for sending, and the writer task.
    ///
    /// The writer task ends, shutting the write side down, once every handle is
    /// closed or dropped, or when a write fails.
    pub fn into_parts(self) -> (BoxedReader, ConnectionHandle, JoinHandle<ConnectionStats>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = ConnectionHandle::new(tx);
        let task = tokio::spawn(run_writer(self.writer, rx, handle.clone().without_sender()));
        (self.reader, handle, task)
    }
}

fn classify(error: io::Error, endpoint: &Endpoint) -> ConnectionError {
    match error.kind() {
        io::ErrorKind::ConnectionRefused => ConnectionError::Refused(endpoint.to_string()),
        io::ErrorKind::NotFound => ConnectionError::NotFound(endpoint.to_string()),
        _ => ConnectionError::Io(error),
    }
}

/// Outbound traffic counters
#[derive(Debug, Default, Clone)]
pub struct ConnectionStats {
    /// Frames written
    pub frames_sent: u64,
    /// Bytes written
    pub bytes_sent: u64,
}

async fn run_writer(
    mut writer: BoxedWriter,
    mut rx: mpsc::UnboundedReceiver<Bytes>,
    handle: ConnectionHandle,
) -> ConnectionStats {
    let mut stats = ConnectionStats::default();

    while let Some(frame) = rx.recv().await {
        if let Err(e) = write_frame(&mut writer, &frame).await {
            tracing::warn!("Write to server failed: {}", e);
            break;
        }
        stats.frames_sent += 1;
        stats.bytes_sent += frame.len() as u64;
    }

    handle.mark_disconnected();
    if let Err(e) = writer.shutdown().await {
        tracing::debug!("Shutdown of write side failed: {}", e);
    }
    tracing::debug!(
        frames = stats.frames_sent,
        bytes = stats.bytes_sent,
        "writer finished"
    );
    stats
}

async fn write_frame(writer: &mut BoxedWriter, frame: &[u8]) -> io::Result<()> {
    writer.write_all(frame).await?;
    writer.flush().await
}

/// A handle for queuing frames to the server
#[derive(Clone, Debug)]
pub struct ConnectionHandle {
    sender: Option<mpsc::UnboundedSender<Bytes>>,
    connected: Arc<AtomicBool>,
}

impl ConnectionHandle {
    pub fn new(sender: mpsc::UnboundedSender<Bytes>) -> Self {
        Self {
            sender: Some(sender),
            connected: Arc::new(AtomicBool::new(true)),
        }
    }

    fn without_sender(mut self) -> Self {
        self.sender = None;
        self
    }

    /// Check if frames can still be queued
    pub fn is_connected(&self) -> bool {
        self.sender.is_some() && self.connected.load(Ordering::SeqCst)
    }

    /// Mark the connection as disconnected
    pub fn mark_disconnected(&self) {
        self.connected.store(false, Ordering::SeqCst);
    }
}

impl FrameSink for ConnectionHandle {
    fn send(&mut self, frame: Bytes) -> Result<(), ConnectionError> {
        if !self.connected.load(Ordering::SeqCst) {
            return Err(ConnectionError::Closed);
        }

        match &self.sender {
            Some(sender) => sender
                .send(frame)
                .map_err(|_| ConnectionError::SendChannelClosed),
            None => Err(ConnectionError::Closed),
        }
    }

    fn close(&mut self) {
        self.mark_disconnected();
        self.sender = None;
    }
}
