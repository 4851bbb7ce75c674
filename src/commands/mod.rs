//! Command Module
//!
//! This module implements the command layer of rfcd: the builtins that
//! do the actual work and the registry that decides which of them a
//! request keyword reaches.
//!
//! ## Architecture
//!
//! ```text
//! Client Request
//!       │
//!       ▼
//! ┌─────────────────┐
//! │  EntityCodec    │  (protocol module)
//! └────────┬────────┘
//!          │ keyword, args
//!          ▼
//! ┌─────────────────┐
//! │    Registry     │  (this module)
//! │                 │
//! │  - Lookup       │
//! │  - Options      │
//! └────────┬────────┘
//!          │
//!          ▼
//! ┌─────────────────┐
//! │    Builtin      │  echo / exec / cp
//! └─────────────────┘
//! ```
//!
//! ## Supported Commands
//!
//! - `echo arg [arg ...]` - Returns the arguments as result fields
//! - `exec program [arg ...]` - Returns `[stdout, stderr]` of an allowed program
//! - `cp source destination` - Copies a file, no result fields

pub mod builtin;
pub mod error;
pub mod exec;
pub mod registry;

use std::collections::HashMap;

/// Per-command options, parsed from the configured `key:value` strings
pub type Options = HashMap<String, String>;

// Re-export the main command types
pub use builtin::Builtin;
pub use error::CommandError;
pub use registry::{parse_options, Registry, RegistryEntry, RegistryError};
