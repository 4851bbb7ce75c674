//! Command Registry
//!
//! The registry maps request keywords to builtins and their parsed options.
//! It is built once from the configuration before the listener starts and
//! is never mutated afterwards, so connection tasks share it behind an
//! `Arc` without any locking.
//!
//! ```text
//!   CommandConfigs                     Registry
//! ┌─────────────────────────┐        ┌──────────────────────────────────┐
//! │ "Exec" ["Allow:^/bin/"] │──────> │ "exec" -> Exec {Allow: "^/bin/"} │
//! │ "echo" []               │──────> │ "echo" -> Echo {}                │
//! └─────────────────────────┘        └──────────────────────────────────┘
//! ```

use crate::commands::{Builtin, CommandError, Options};
use crate::config::CommandConfig;
use std::collections::HashMap;
use thiserror::Error;
use tracing::{debug, trace, warn};

/// Errors that can occur while building the registry.
///
/// Any of these stops the daemon before it serves traffic.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("unknown command \"{0}\"")]
    UnknownCommand(String),

    #[error("malformed option {option:?} for command \"{command}\": expected key:value")]
    MalformedOption { command: String, option: String },
}

/// A keyword bound to a builtin and its options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryEntry {
    /// Command name as written in the configuration
    pub name: String,
    pub command: Builtin,
    pub options: Options,
}

impl RegistryEntry {
    /// Runs the bound builtin with this entry's options.
    pub async fn execute(&self, args: Vec<String>) -> Result<Vec<String>, CommandError> {
        self.command.execute(args, &self.options).await
    }
}

/// Immutable keyword to command mapping.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    /// Keyed by lowercased command name
    entries: HashMap<String, RegistryEntry>,
}

impl Registry {
    /// Builds the registry from the configured commands.
    ///
    /// Fails on the first command that does not name a builtin or that
    /// carries an option without a `:`.
    pub fn build(configs: &[CommandConfig]) -> Result<Self, RegistryError> {
        let mut entries = HashMap::with_capacity(configs.len());

        for config in configs {
            let name = &config.command_name;
            let command = Builtin::from_keyword(name)
                .ok_or_else(|| RegistryError::UnknownCommand(name.clone()))?;
            let options = parse_options(name, &config.command_params)?;

            for (key, value) in &options {
                trace!(command = %name, key = %key, value = %value, "Parsed option");
            }

            let entry = RegistryEntry {
                name: name.clone(),
                command,
                options,
            };

            if entries.insert(name.to_lowercase(), entry).is_some() {
                warn!(command = %name, "Command configured twice, the later entry wins");
            }
            debug!(command = %name, builtin = %command, "Registered command");
        }

        Ok(Self { entries })
    }

    /// Finds the entry for a request keyword, ignoring case.
    pub fn lookup(&self, keyword: &str) -> Option<&RegistryEntry> {
        self.entries.get(&keyword.to_lowercase())
    }

    /// Number of registered commands.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Registered keywords, lowercased and sorted.
    pub fn keywords(&self) -> Vec<&str> {
        let mut keywords: Vec<&str> = self.entries.keys().map(String::as_str).collect();
        keywords.sort_unstable();
        keywords
    }
}

/// Parses raw `key:value` strings into options.
///
/// Only the first `:` splits, so values may contain more colons.
/// A repeated key keeps its last value.
pub fn parse_options(command: &str, raw: &[String]) -> Result<Options, RegistryError> {
    raw.iter()
        .map(|option| {
            option
                .split_once(':')
                .map(|(key, value)| (key.to_string(), value.to_string()))
                .ok_or_else(|| RegistryError::MalformedOption {
                    command: command.to_string(),
                    option: option.clone(),
                })
        })
        .collect()
}
