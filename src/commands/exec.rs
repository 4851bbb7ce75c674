//! Restricted Subprocess Execution
//!
//! `exec` runs an executable found on the daemon's search path, provided
//! the resolved absolute path matches the command's `Allow` pattern.
//!
//! ## Options
//!
//! - `Allow` - Regular expression matched against the resolved path
//!   (defaults to `.+`, which allows everything)
//! - `Env` - A single `NAME=value` pair placed into the child's environment
//! - `Timeout` - Seconds to wait for the child before killing it
//!
//! ## Isolation
//!
//! The child starts in `/` with a cleared environment and stdin bound to
//! the null device. The pattern is matched against the resolved path, not
//! the name the client sent, so a client cannot reach an executable outside
//! the pattern through a search path lookup.

use crate::commands::{CommandError, Options};
use regex::Regex;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, warn};

/// Pattern used when no `Allow` option is configured
pub const ALLOW_ANY: &str = ".+";

/// Runs `args[0]` with the full argument vector and returns
/// `[stdout, stderr]`, whatever the exit status.
pub async fn exec(args: Vec<String>, options: &Options) -> Result<Vec<String>, CommandError> {
    let program = args.first().ok_or(CommandError::WrongArity {
        command: "exec",
        expected: "at least 1",
        got: 0,
    })?;

    let pattern = match options.get("Allow") {
        Some(pattern) => pattern.as_str(),
        None => {
            debug!("\"Allow\" not configured, defaulting to \"{}\"", ALLOW_ANY);
            ALLOW_ANY
        }
    };

    let path =
        resolve_executable(program).ok_or_else(|| CommandError::NotFound(program.clone()))?;
    let path_str = path.to_string_lossy().into_owned();
    debug!(path = %path_str, "Found executable");

    let allow = Regex::new(pattern)?;
    if !allow.is_match(&path_str) {
        warn!(path = %path_str, pattern = %pattern, "Rejected disallowed executable");
        return Err(CommandError::Forbidden {
            path: path_str,
            pattern: pattern.to_string(),
        });
    }

    let timeout = parse_timeout(options)?;

    let mut command = Command::new(&path);
    command
        .arg0(program)
        .args(&args[1..])
        .env_clear()
        .current_dir("/")
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    if let Some(entry) = options.get("Env") {
        let (name, value) = entry
            .split_once('=')
            .filter(|(name, _)| !name.is_empty())
            .ok_or_else(|| CommandError::InvalidOption {
                key: "Env",
                value: entry.clone(),
            })?;
        command.env(name, value);
    }

    let child = command.spawn().map_err(|source| CommandError::Spawn {
        path: path_str.clone(),
        source,
    })?;
    debug!(path = %path_str, pid = child.id(), "Spawned subprocess");

    // Dropping the wait future on timeout drops the child, which kills it.
    let output = match timeout {
        Some(limit) => tokio::time::timeout(limit, child.wait_with_output())
            .await
            .map_err(|_| CommandError::Timeout {
                path: path_str.clone(),
                seconds: limit.as_secs_f64(),
            })??,
        None => child.wait_with_output().await?,
    };

    debug!(path = %path_str, status = %output.status, "Subprocess exited");

    Ok(vec![
        String::from_utf8_lossy(&output.stdout).into_owned(),
        String::from_utf8_lossy(&output.stderr).into_owned(),
    ])
}

fn parse_timeout(options: &Options) -> Result<Option<Duration>, CommandError> {
    let Some(raw) = options.get("Timeout") else {
        return Ok(None);
    };

    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|secs| *secs > 0.0)
        .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
        .map(Some)
        .ok_or_else(|| CommandError::InvalidOption {
            key: "Timeout",
            value: raw.clone(),
        })
}

/// Resolves a program name to an absolute executable path.
///
/// Names containing `/` are taken as paths. Anything else is searched for
/// in each absolute `PATH` entry, first match wins.
pub fn resolve_executable(name: &str) -> Option<PathBuf> {
    if name.is_empty() {
        return None;
    }

    if name.contains('/') {
        let path = Path::new(name);
        let path = if path.is_absolute() {
            path.to_path_buf()
        } else {
            std::env::current_dir().ok()?.join(path)
        };
        return is_executable(&path).then_some(path);
    }

    let search_path = std::env::var_os("PATH")?;
    std::env::split_paths(&search_path)
        .filter(|dir| dir.is_absolute())
        .map(|dir| dir.join(name))
        .find(|candidate| is_executable(candidate))
}

fn is_executable(path: &Path) -> bool {
    std::fs::metadata(path)
        .map(|meta| meta.is_file() && meta.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}
