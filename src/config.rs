//! Daemon Configuration
//!
//! The configuration is a JSON document loaded once at startup and never
//! mutated afterwards. It is shared read-only behind an `Arc`.
//!
//! ## Example
//!
//! ```json
//! {
//!     "BindAddr": "127.0.0.1",
//!     "Port": 9000,
//!     "Verbosity": 2,
//!     "Delimiter": "\n",
//!     "Separator": "|",
//!     "CommandConfigs": [
//!         { "CommandName": "echo" },
//!         { "CommandName": "exec", "CommandParams": ["Allow:^/usr/bin/", "Timeout:30"] },
//!         { "CommandName": "cp" }
//!     ]
//! }
//! ```

use crate::protocol::codec::{DEFAULT_DELIMITER, DEFAULT_SEPARATOR};
use crate::protocol::EntityCodec;
use serde::Deserialize;
use std::path::Path;
use thiserror::Error;
use tracing::level_filters::LevelFilter;

/// Path used when no configuration file is given on the command line
pub const DEFAULT_CONFIG_PATH: &str = "/etc/rfcd.conf";

/// Errors that can occur while loading the configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read configuration: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed configuration: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid framing: {0}")]
    InvalidFraming(String),
}

/// One enabled command and its raw `key:value` options.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct CommandConfig {
    pub command_name: String,
    #[serde(default)]
    pub command_params: Vec<String>,
}

impl CommandConfig {
    pub fn new(name: impl Into<String>, params: &[&str]) -> Self {
        Self {
            command_name: name.into(),
            command_params: params.iter().map(|p| p.to_string()).collect(),
        }
    }
}

/// Server configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Config {
    /// Address to bind to
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
    /// Port to listen on
    pub port: u16,
    /// Log verbosity, 0 (warnings only) to 3 (everything)
    #[serde(default)]
    pub verbosity: u8,
    /// Entity terminator, exactly one byte
    pub delimiter: String,
    /// Token terminator, exactly one byte
    pub separator: String,
    /// Enabled commands, in configuration order
    #[serde(default)]
    pub command_configs: Vec<CommandConfig>,
}

fn default_bind_addr() -> String {
    "0.0.0.0".to_string()
}

impl Config {
    /// Reads and validates the configuration file at `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    /// Parses and validates a configuration document.
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let config: Config = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let delimiter = framing_byte("Delimiter", &self.delimiter)?;
        let separator = framing_byte("Separator", &self.separator)?;
        if delimiter == separator {
            return Err(ConfigError::InvalidFraming(format!(
                "Delimiter and Separator must differ (both are {:?})",
                self.delimiter
            )));
        }
        Ok(())
    }

    /// Returns the bind address as a string
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.bind_addr, self.port)
    }

    /// Codec for the configured framing bytes.
    pub fn codec(&self) -> EntityCodec {
        let delimiter = self.delimiter.bytes().next().unwrap_or(DEFAULT_DELIMITER);
        let separator = self.separator.bytes().next().unwrap_or(DEFAULT_SEPARATOR);
        EntityCodec::new(delimiter, separator)
    }

    /// Maps the verbosity to the most detailed level that gets logged.
    pub fn log_level(&self) -> LevelFilter {
        match self.verbosity {
            0 => LevelFilter::WARN,
            1 => LevelFilter::INFO,
            2 => LevelFilter::DEBUG,
            _ => LevelFilter::TRACE,
        }
    }
}

fn framing_byte(name: &str, value: &str) -> Result<u8, ConfigError> {
    match value.as_bytes() {
        [b] => Ok(*b),
        _ => Err(ConfigError::InvalidFraming(format!(
            "{} must be exactly one byte, got {:?}",
            name, value
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SAMPLE: &str = r#"{
        "BindAddr": "127.0.0.1",
        "Port": 9000,
        "Verbosity": 2,
        "Delimiter": ";",
        "Separator": ",",
        "CommandConfigs": [
            { "CommandName": "echo" },
            { "CommandName": "Exec", "CommandParams": ["Allow:^/bin/", "Env:LANG=C"] }
        ]
    }"#;

    #[test]
    fn test_parse_sample() {
        let config = Config::from_json(SAMPLE).unwrap();
        assert_eq!(config.bind_address(), "127.0.0.1:9000");
        assert_eq!(config.log_level(), LevelFilter::DEBUG);
        assert_eq!(config.codec(), EntityCodec::new(b';', b','));
        assert_eq!(
            config.command_configs,
            vec![
                CommandConfig::new("echo", &[]),
                CommandConfig::new("Exec", &["Allow:^/bin/", "Env:LANG=C"]),
            ]
        );
    }

    #[test]
    fn test_defaults() {
        let config =
            Config::from_json(r#"{ "Port": 1, "Delimiter": "\n", "Separator": "|" }"#).unwrap();
        assert_eq!(config.bind_addr, "0.0.0.0");
        assert_eq!(config.verbosity, 0);
        assert_eq!(config.log_level(), LevelFilter::WARN);
        assert!(config.command_configs.is_empty());
    }

    #[test]
    fn test_verbosity_levels() {
        let mut config = Config::from_json(SAMPLE).unwrap();
        config.verbosity = 1;
        assert_eq!(config.log_level(), LevelFilter::INFO);
        config.verbosity = 9;
        assert_eq!(config.log_level(), LevelFilter::TRACE);
    }

    #[test]
    fn test_multi_byte_delimiter_rejected() {
        let result =
            Config::from_json(r#"{ "Port": 1, "Delimiter": "\r\n", "Separator": "|" }"#);
        assert!(matches!(result, Err(ConfigError::InvalidFraming(_))));
    }

    #[test]
    fn test_empty_separator_rejected() {
        let result = Config::from_json(r#"{ "Port": 1, "Delimiter": "\n", "Separator": "" }"#);
        assert!(matches!(result, Err(ConfigError::InvalidFraming(_))));
    }

    #[test]
    fn test_equal_framing_bytes_rejected() {
        let result = Config::from_json(r#"{ "Port": 1, "Delimiter": "|", "Separator": "|" }"#);
        assert!(matches!(result, Err(ConfigError::InvalidFraming(_))));
    }

    #[test]
    fn test_malformed_json() {
        let result = Config::from_json(r#"{ "Port": "#);
        assert!(matches!(result, Err(ConfigError::Parse(_))));

        let result = Config::from_json(r#"{ "Port": 70000, "Delimiter": "\n", "Separator": "|" }"#);
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.port, 9000);
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = Config::load(dir.path().join("missing.conf"));
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }
}
