//! Command Execution Errors

use thiserror::Error;

/// Errors a builtin can fail with while serving one request.
///
/// None of these end the connection. The handler turns each of them
/// into an `ERR` response and keeps reading.
#[derive(Debug, Error)]
pub enum CommandError {
    /// The request carried the wrong number of arguments
    #[error("'{command}' expects {expected} argument(s), got {got}")]
    WrongArity {
        command: &'static str,
        expected: &'static str,
        got: usize,
    },

    /// No executable with this name was found on the search path
    #[error("command not found: {0}")]
    NotFound(String),

    /// The resolved executable does not match the Allow pattern
    #[error("'{path}' is not allowed by pattern '{pattern}'")]
    Forbidden { path: String, pattern: String },

    /// The configured Allow pattern is not a valid regular expression
    #[error("invalid Allow pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    /// A configured option has a value the command cannot use
    #[error("invalid option {key}: {value:?}")]
    InvalidOption { key: &'static str, value: String },

    /// The subprocess could not be started
    #[error("could not execute '{path}': {source}")]
    Spawn {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The subprocess outlived the configured timeout and was killed
    #[error("'{path}' timed out after {seconds}s")]
    Timeout { path: String, seconds: f64 },

    /// A file or pipe operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl CommandError {
    /// Short message sent to the client after `ERR`, if this failure has one.
    pub fn diagnostic(&self) -> Option<&'static str> {
        match self {
            CommandError::NotFound(_) => Some("Command not found"),
            CommandError::Forbidden { .. } => Some("Not allowed"),
            CommandError::Spawn { .. } => Some("Could not execute"),
            CommandError::Timeout { .. } => Some("Timed out"),
            _ => None,
        }
    }
}
