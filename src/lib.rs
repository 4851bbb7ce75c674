//! # rfcd - A Remote Function Call Daemon
//!
//! rfcd accepts TCP connections, reads requests framed in a small delimited
//! text protocol, and runs the builtin command named by each request's
//! first token with the remaining tokens as arguments.
//!
//! ## Features
//!
//! - **Human-Typable Protocol**: Two configurable framing bytes, no escaping
//! - **Restricted Execution**: `exec` only runs paths matching an Allow pattern
//! - **Immutable Registry**: Commands are resolved once at startup and shared lock-free
//! - **Async I/O**: Built on Tokio, one task per connection
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                rfcd                                     │
//! │                                                                         │
//! │  ┌─────────────┐    ┌─────────────┐    ┌─────────────┐                  │
//! │  │ Acceptor    │───>│ Connection  │───>│  Registry   │                  │
//! │  │ (Listener)  │    │  Handler    │    │  (lookup)   │                  │
//! │  └─────────────┘    └──────┬──────┘    └──────┬──────┘                  │
//! │        │                   │                  │                         │
//! │   bounded queue            ▼                  ▼                         │
//! │    (5 slots)        ┌─────────────┐    ┌──────────────────────────────┐ │
//! │                     │ EntityCodec │    │ Builtins                     │ │
//! │                     │ decode /    │    │ ┌──────┐ ┌──────┐ ┌──────┐   │ │
//! │                     │ encode      │    │ │ echo │ │ exec │ │  cp  │   │ │
//! │                     └─────────────┘    │ └──────┘ └──────┘ └──────┘   │ │
//! │                                        └──────────────────────────────┘ │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```ignore
//! use rfcd::{Config, Registry, Server};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Arc::new(Config::load("/etc/rfcd.conf")?);
//!     let registry = Arc::new(Registry::build(&config.command_configs)?);
//!
//!     Server::bind(config, registry).await?.run().await;
//!     Ok(())
//! }
//! ```
//!
//! ## Protocol
//!
//! With separator `|` and delimiter `\n`:
//!
//! ```text
//! > echo|hello|world|
//! < OK|hello|world|
//! > exec|uname|-s|
//! < OK|Linux\n||
//! > frobnicate|
//! < ERR|
//! ```
//!
//! Arguments and results cannot contain either framing byte. With `\n` as
//! the delimiter, the trailing newline of a program's output already ends
//! the response entity for the client.
//!
//! ## Module Overview
//!
//! - [`protocol`]: Entity codec and response types
//! - [`commands`]: Builtins and the command registry
//! - [`connection`]: Client connection management
//! - [`server`]: Listener and acceptor
//! - [`config`]: Configuration loading

pub mod commands;
pub mod config;
pub mod connection;
pub mod protocol;
pub mod server;

// Re-export commonly used types for convenience
pub use commands::{Builtin, CommandError, Registry, RegistryError};
pub use config::{CommandConfig, Config, ConfigError};
pub use connection::{handle_connection, ConnectionStats};
pub use protocol::{EntityCodec, Response};
pub use server::Server;

/// Version of rfcd
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
