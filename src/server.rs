//! Listener and Acceptor
//!
//! The acceptor runs as its own task and pushes every accepted connection
//! into a small bounded queue. The server loop drains that queue and
//! spawns one handler task per connection.
//!
//! ```text
//! ┌──────────┐  accept()  ┌──────────────────┐  recv()  ┌────────────────┐
//! │ Listener │──────────> │ queue (5 slots)  │───────-> │ spawn handler  │
//! └──────────┘            └──────────────────┘          └────────────────┘
//! ```
//!
//! When the queue is full the acceptor waits for a free slot, and stops
//! calling `accept()` until it gets one. That is the only backpressure
//! there is.

use crate::commands::Registry;
use crate::config::Config;
use crate::connection::{handle_connection, ConnectionStats};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info};

/// Number of accepted connections that may wait for a handler
pub const ACCEPT_QUEUE_CAPACITY: usize = 5;

/// Pause after a failed accept, so a persistent failure such as running
/// out of file descriptors does not spin the acceptor
pub const ACCEPT_ERROR_BACKOFF: Duration = Duration::from_millis(100);

/// A bound, not yet serving, rfcd server.
pub struct Server {
    listener: TcpListener,
    config: Arc<Config>,
    registry: Arc<Registry>,
    stats: Arc<ConnectionStats>,
}

impl Server {
    /// Binds the configured address.
    ///
    /// A bind failure is fatal to the daemon; nothing has been served yet.
    pub async fn bind(config: Arc<Config>, registry: Arc<Registry>) -> std::io::Result<Self> {
        let listener = TcpListener::bind(config.bind_address()).await?;
        info!(
            addr = %listener.local_addr()?,
            commands = ?registry.keywords(),
            "Listening"
        );

        Ok(Self {
            listener,
            config,
            registry,
            stats: Arc::new(ConnectionStats::new()),
        })
    }

    /// The address actually bound, useful when the configured port is 0.
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Connection statistics shared by all handlers of this server.
    pub fn stats(&self) -> Arc<ConnectionStats> {
        Arc::clone(&self.stats)
    }

    /// Serves connections until this future is dropped.
    ///
    /// Dropping it stops the acceptor; connections already being handled
    /// run on until their clients leave.
    pub async fn run(self) {
        let codec = self.config.codec();
        let (conn_tx, mut conn_rx) = mpsc::channel(ACCEPT_QUEUE_CAPACITY);
        let (_shutdown_tx, shutdown_rx) = watch::channel(false);

        tokio::spawn(accept_loop(self.listener, conn_tx, shutdown_rx));

        while let Some((stream, addr)) = conn_rx.recv().await {
            let registry = Arc::clone(&self.registry);
            let stats = Arc::clone(&self.stats);

            // Spawn a task to handle this connection
            tokio::spawn(async move {
                handle_connection(stream, addr, codec, registry, stats).await;
            });
        }

        debug!("Acceptor stopped");
    }
}

/// Accepts connections and queues them for the server loop.
///
/// Accept failures are logged and skipped after a short pause. The loop ends when the server
/// loop goes away, either by dropping the queue or the shutdown sender.
async fn accept_loop(
    listener: TcpListener,
    conn_tx: mpsc::Sender<(TcpStream, SocketAddr)>,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    loop {
        let accepted = tokio::select! {
            accepted = listener.accept() => accepted,
            _ = shutdown_rx.changed() => {
                debug!("Acceptor received shutdown signal");
                return;
            }
        };

        match accepted {
            Ok((stream, addr)) => {
                info!(client = %addr, "Connected");
                // Waits here while the queue is full
                if conn_tx.send((stream, addr)).await.is_err() {
                    return;
                }
            }
            Err(e) => {
                error!("Failed to accept connection: {}", e);
                if !backoff(&mut shutdown_rx).await {
                    return;
                }
            }
        }
    }
}

/// Waits out [`ACCEPT_ERROR_BACKOFF`]. Returns false if shutdown came first.
async fn backoff(shutdown_rx: &mut watch::Receiver<bool>) -> bool {
    tokio::select! {
        _ = tokio::time::sleep(ACCEPT_ERROR_BACKOFF) => true,
        _ = shutdown_rx.changed() => false,
    }
}
