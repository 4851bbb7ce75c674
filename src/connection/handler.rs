//! Connection Handler Module
//!
//! This module handles individual client connections to rfcd.
//! Each client gets its own handler task that runs in a loop,
//! reading entities and sending responses.
//!
//! ## Connection Lifecycle
//!
//! ```text
//! 1. Client connects (TCP handshake)
//!        │
//!        ▼
//! 2. ConnectionHandler spawned
//!        │
//!        ▼
//! 3. ┌──────────────────────────────┐
//!    │      Main Loop               │
//!    │                              │
//!    │  ┌─────────────────────────┐ │
//!    │  │ Reading: decode entity  │ │
//!    │  └───────────┬─────────────┘ │
//!    │              │               │
//!    │              ▼               │
//!    │  ┌─────────────────────────┐ │
//!    │  │ Dispatching: run cmd    │ │
//!    │  └───────────┬─────────────┘ │
//!    │              │               │
//!    │              ▼               │
//!    │  ┌─────────────────────────┐ │
//!    │  │ Responding: OK / ERR    │ │
//!    │  └───────────┬─────────────┘ │
//!    │              │               │
//!    │              ▼               │
//!    │         [Loop back]          │
//!    └──────────────────────────────┘
//!        │
//!        ▼
//! 4. Client disconnects / transport error
//!        │
//!        ▼
//! 5. Closed: handler task ends
//! ```
//!
//! One request is answered completely before the next one is decoded,
//! even when the client sends several entities in one packet.
//!
//! ## Buffer Management
//!
//! We use a BytesMut buffer to accumulate incoming data. TCP is a stream
//! protocol, so a read may hold half an entity or several of them.

use crate::commands::Registry;
use crate::protocol::{Entity, EntityCodec, FrameError, Response, MAX_ENTITY_SIZE};
use bytes::BytesMut;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufWriter};
use tracing::{debug, info, trace, warn};

/// Initial buffer capacity
const INITIAL_BUFFER_SIZE: usize = 4096;

/// Statistics for connection handling
#[derive(Debug, Default)]
pub struct ConnectionStats {
    /// Total number of connections accepted
    pub connections_accepted: AtomicU64,
    /// Currently active connections
    pub active_connections: AtomicU64,
    /// Total entities answered
    pub commands_processed: AtomicU64,
    /// Entities answered with ERR
    pub commands_failed: AtomicU64,
    /// Total bytes read
    pub bytes_read: AtomicU64,
    /// Total bytes written
    pub bytes_written: AtomicU64,
}

impl ConnectionStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn connection_opened(&self) {
        self.connections_accepted.fetch_add(1, Ordering::Relaxed);
        self.active_connections.fetch_add(1, Ordering::Relaxed);
    }

    pub fn connection_closed(&self) {
        self.active_connections.fetch_sub(1, Ordering::Relaxed);
    }

    pub fn command_processed(&self) {
        self.commands_processed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn command_failed(&self) {
        self.commands_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn bytes_read(&self, count: usize) {
        self.bytes_read.fetch_add(count as u64, Ordering::Relaxed);
    }

    pub fn bytes_written(&self, count: usize) {
        self.bytes_written
            .fetch_add(count as u64, Ordering::Relaxed);
    }
}

/// Handles a single client connection.
///
/// This struct manages the read buffer, decoding, dispatch and response
/// sending for one connected client. It is generic over the stream so
/// anything that reads and writes bytes can be served.
pub struct ConnectionHandler<S> {
    /// The stream for this connection
    stream: BufWriter<S>,

    /// Client's address (for logging)
    addr: SocketAddr,

    /// Buffer for incoming data
    buffer: BytesMut,

    /// Framing bytes of this daemon
    codec: EntityCodec,

    /// The command registry (shared across connections)
    registry: Arc<Registry>,

    /// Connection statistics (shared)
    stats: Arc<ConnectionStats>,
}

impl<S> ConnectionHandler<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Creates a new connection handler.
    ///
    /// # Arguments
    ///
    /// * `stream` - The byte stream for this connection
    /// * `addr` - The client's socket address
    /// * `codec` - The entity codec for the configured framing
    /// * `registry` - The command registry
    /// * `stats` - Shared connection statistics
    pub fn new(
        stream: S,
        addr: SocketAddr,
        codec: EntityCodec,
        registry: Arc<Registry>,
        stats: Arc<ConnectionStats>,
    ) -> Self {
        stats.connection_opened();

        Self {
            stream: BufWriter::new(stream),
            addr,
            buffer: BytesMut::with_capacity(INITIAL_BUFFER_SIZE),
            codec,
            registry,
            stats,
        }
    }

    /// Runs the main connection loop.
    ///
    /// This method reads entities from the client, executes them,
    /// and sends back responses until the client disconnects or an error occurs.
    pub async fn run(mut self) -> Result<(), ConnectionError> {
        info!(client = %self.addr, "Client connected");

        let result = self.main_loop().await;

        match &result {
            Ok(()) => info!(client = %self.addr, "Client disconnected gracefully"),
            Err(e) => match e {
                ConnectionError::ClientDisconnected => {
                    debug!(client = %self.addr, "Client disconnected")
                }
                ConnectionError::IoError(io_err)
                    if io_err.kind() == std::io::ErrorKind::ConnectionReset =>
                {
                    debug!(client = %self.addr, "Connection reset by client")
                }
                _ => warn!(client = %self.addr, error = %e, "Connection error"),
            },
        }

        self.stats.connection_closed();
        result
    }

    /// The read-dispatch-respond loop.
    async fn main_loop(&mut self) -> Result<(), ConnectionError> {
        loop {
            match self.codec.decode(&mut self.buffer) {
                Ok(Some(entity)) => {
                    let response = self.dispatch(entity).await;
                    self.finish_command(&response).await?;
                }
                Err(FrameError::EmptyEntity) => {
                    warn!(client = %self.addr, "Received entity without a command keyword");
                    self.finish_command(&Response::err()).await?;
                }
                // Need more data - read from the stream
                Ok(None) => self.read_more_data().await?,
            }
        }
    }

    /// Counts one answered request and sends its response.
    async fn finish_command(&mut self, response: &Response) -> Result<(), ConnectionError> {
        self.stats.command_processed();
        if response.is_err() {
            self.stats.command_failed();
        }
        self.send_response(response).await
    }

    /// Resolves the keyword and runs the command.
    ///
    /// Every failure in here becomes an ERR response; none of them
    /// ends the connection.
    async fn dispatch(&self, entity: Entity) -> Response {
        let (keyword, args) = entity.into_parts();
        debug!(client = %self.addr, keyword = %keyword, "Received entity");
        trace!(client = %self.addr, args = ?args, "Token list");

        let entry = match self.registry.lookup(&keyword) {
            Some(entry) => entry,
            None => {
                debug!(client = %self.addr, keyword = %keyword, "Unknown command");
                return Response::err();
            }
        };

        debug!(client = %self.addr, command = %entry.name, "Executing");

        match entry.execute(args).await {
            Ok(fields) => Response::ok(fields),
            Err(e) => {
                warn!(
                    client = %self.addr,
                    command = %entry.name,
                    error = %e,
                    "Executing command failed"
                );
                match e.diagnostic() {
                    Some(diagnostic) => Response::err_with(diagnostic),
                    None => Response::err(),
                }
            }
        }
    }

    /// Reads more data from the stream into the buffer.
    async fn read_more_data(&mut self) -> Result<(), ConnectionError> {
        // An entity this large without a delimiter will never complete
        if self.buffer.len() >= MAX_ENTITY_SIZE {
            warn!(
                client = %self.addr,
                size = self.buffer.len(),
                "Entity size limit exceeded"
            );
            return Err(ConnectionError::EntityTooLarge);
        }

        // Ensure we have some capacity
        if self.buffer.capacity() - self.buffer.len() < 1024 {
            self.buffer.reserve(4096);
        }

        let n = self.stream.get_mut().read_buf(&mut self.buffer).await?;

        if n == 0 {
            // Stream closed by client
            if self.buffer.is_empty() {
                return Err(ConnectionError::ClientDisconnected);
            } else {
                // Partial entity in buffer
                return Err(ConnectionError::UnexpectedEof);
            }
        }

        self.stats.bytes_read(n);
        trace!(client = %self.addr, bytes = n, "Read data");

        Ok(())
    }

    /// Sends a response to the client.
    ///
    /// A failed write only ends this connection.
    async fn send_response(&mut self, response: &Response) -> Result<(), ConnectionError> {
        let bytes = response.encode(&self.codec);
        self.stream.write_all(&bytes).await?;
        self.stream.flush().await?;
        self.stats.bytes_written(bytes.len());
        debug!(client = %self.addr, response = %response, "Sent response");
        Ok(())
    }
}

/// Errors that can occur while handling a connection.
#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    /// I/O error (network issue)
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Client disconnected normally
    #[error("Client disconnected")]
    ClientDisconnected,

    /// Unexpected end of stream (partial entity)
    #[error("Unexpected end of stream")]
    UnexpectedEof,

    /// No delimiter within the size limit
    #[error("Entity size limit exceeded")]
    EntityTooLarge,
}

/// Handles a client connection.
///
/// This is a convenience function that creates a ConnectionHandler
/// and runs it to completion.
///
/// # Arguments
///
/// * `stream` - The byte stream for this connection
/// * `addr` - The client's socket address
/// * `codec` - The entity codec for the configured framing
/// * `registry` - The command registry
/// * `stats` - Shared connection statistics
pub async fn handle_connection<S>(
    stream: S,
    addr: SocketAddr,
    codec: EntityCodec,
    registry: Arc<Registry>,
    stats: Arc<ConnectionStats>,
) where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let handler = ConnectionHandler::new(stream, addr, codec, registry, stats);
    if let Err(e) = handler.run().await {
        match e {
            ConnectionError::ClientDisconnected => {}
            ConnectionError::IoError(ref io_err)
                if io_err.kind() == std::io::ErrorKind::ConnectionReset => {}
            _ => {
                debug!(client = %addr, error = %e, "Connection ended with error");
            }
        }
    }
}
