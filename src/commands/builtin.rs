//! Builtin Commands
//!
//! Every command the daemon can serve is a variant of [`Builtin`]. All of
//! them share one calling convention: the request arguments plus the
//! command's configured options in, result fields or an error out.
//!
//! - `echo` - Returns its arguments unchanged
//! - `exec` - Runs an allowed executable, see [`crate::commands::exec`]
//! - `cp` - Copies a file, keeping the source's permission bits

use crate::commands::{exec, CommandError, Options};
use std::fmt;
use std::os::unix::fs::PermissionsExt;
use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncReadExt, AsyncWriteExt};

/// The fixed set of commands a registry can bind keywords to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Builtin {
    Echo,
    Exec,
    Cp,
}

impl Builtin {
    /// All builtins, in the order they are documented.
    pub const ALL: [Builtin; 3] = [Builtin::Echo, Builtin::Exec, Builtin::Cp];

    /// Finds the builtin for a configured command name, ignoring case.
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|builtin| builtin.name().eq_ignore_ascii_case(keyword))
    }

    /// The canonical lowercase name.
    pub fn name(&self) -> &'static str {
        match self {
            Builtin::Echo => "echo",
            Builtin::Exec => "exec",
            Builtin::Cp => "cp",
        }
    }

    /// Runs the command.
    ///
    /// This may wait on a subprocess or on file I/O. Only the calling
    /// connection's task is suspended while it does.
    pub async fn execute(
        &self,
        args: Vec<String>,
        options: &Options,
    ) -> Result<Vec<String>, CommandError> {
        match self {
            Builtin::Echo => Ok(echo(args)),
            Builtin::Exec => exec::exec(args, options).await,
            Builtin::Cp => cp(args).await,
        }
    }
}

impl fmt::Display for Builtin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// ECHO arg [arg ...]
fn echo(args: Vec<String>) -> Vec<String> {
    args
}

/// CP source destination
///
/// The destination is created or truncated with the source's permission
/// bits. The copy is not atomic: a failure while writing leaves whatever
/// was written so far in place.
async fn cp(args: Vec<String>) -> Result<Vec<String>, CommandError> {
    let [source, destination] = args.as_slice() else {
        return Err(CommandError::WrongArity {
            command: "cp",
            expected: "2",
            got: args.len(),
        });
    };

    let mut src = File::open(source).await?;
    let permissions = src.metadata().await?.permissions();

    // Read everything before the destination is truncated, it may be the source.
    let mut data = Vec::new();
    src.read_to_end(&mut data).await?;
    drop(src);

    let mut dst = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(permissions.mode())
        .open(destination)
        .await?;
    // Creation mode is filtered by the umask and ignored for existing files.
    dst.set_permissions(permissions).await?;

    dst.write_all(&data).await?;
    dst.flush().await?;

    Ok(Vec::new())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::Permissions;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_from_keyword() {
        assert_eq!(Builtin::from_keyword("echo"), Some(Builtin::Echo));
        assert_eq!(Builtin::from_keyword("EXEC"), Some(Builtin::Exec));
        assert_eq!(Builtin::from_keyword("Cp"), Some(Builtin::Cp));
        assert_eq!(Builtin::from_keyword("frobnicate"), None);
        assert_eq!(Builtin::from_keyword(""), None);
    }

    #[tokio::test]
    async fn test_echo() {
        let fields = Builtin::Echo
            .execute(args(&["a", "b"]), &Options::new())
            .await
            .unwrap();
        assert_eq!(fields, args(&["a", "b"]));
    }

    #[tokio::test]
    async fn test_echo_no_arguments() {
        let fields = Builtin::Echo
            .execute(Vec::new(), &Options::new())
            .await
            .unwrap();
        assert!(fields.is_empty());
    }

    #[tokio::test]
    async fn test_echo_ignores_options() {
        let options: Options = [("Allow".to_string(), "^$".to_string())].into();
        let fields = Builtin::Echo
            .execute(args(&["x"]), &options)
            .await
            .unwrap();
        assert_eq!(fields, args(&["x"]));
    }

    #[tokio::test]
    async fn test_cp_copies_content_and_mode() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("source");
        let destination = dir.path().join("destination");

        std::fs::write(&source, b"binary\x00content\n").unwrap();
        std::fs::set_permissions(&source, Permissions::from_mode(0o640)).unwrap();

        let fields = Builtin::Cp
            .execute(
                args(&[source.to_str().unwrap(), destination.to_str().unwrap()]),
                &Options::new(),
            )
            .await
            .unwrap();
        assert!(fields.is_empty());

        assert_eq!(std::fs::read(&destination).unwrap(), b"binary\x00content\n");
        let mode = std::fs::metadata(&destination).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o640);
    }

    #[tokio::test]
    async fn test_cp_truncates_existing_destination() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("source");
        let destination = dir.path().join("destination");

        std::fs::write(&source, b"short").unwrap();
        std::fs::set_permissions(&source, Permissions::from_mode(0o600)).unwrap();
        std::fs::write(&destination, b"a much longer previous content").unwrap();
        std::fs::set_permissions(&destination, Permissions::from_mode(0o644)).unwrap();

        Builtin::Cp
            .execute(
                args(&[source.to_str().unwrap(), destination.to_str().unwrap()]),
                &Options::new(),
            )
            .await
            .unwrap();

        assert_eq!(std::fs::read(&destination).unwrap(), b"short");
        let mode = std::fs::metadata(&destination).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[tokio::test]
    async fn test_cp_onto_itself() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("file");
        let link = dir.path().join("link");
        std::fs::write(&file, b"precious").unwrap();
        std::os::unix::fs::symlink(&file, &link).unwrap();

        for destination in [&file, &link] {
            let fields = Builtin::Cp
                .execute(
                    args(&[file.to_str().unwrap(), destination.to_str().unwrap()]),
                    &Options::new(),
                )
                .await
                .unwrap();
            assert!(fields.is_empty());
            assert_eq!(std::fs::read(&file).unwrap(), b"precious");
        }
    }

    #[tokio::test]
    async fn test_cp_missing_source() {
        let dir = tempfile::tempdir().unwrap();
        let destination = dir.path().join("destination");

        let result = Builtin::Cp
            .execute(
                args(&[
                    dir.path().join("missing").to_str().unwrap(),
                    destination.to_str().unwrap(),
                ]),
                &Options::new(),
            )
            .await;

        assert!(matches!(result, Err(CommandError::Io(_))));
        assert!(!destination.exists());
    }

    #[tokio::test]
    async fn test_cp_unwritable_destination() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("source");
        std::fs::write(&source, b"data").unwrap();

        let result = Builtin::Cp
            .execute(
                args(&[
                    source.to_str().unwrap(),
                    dir.path().join("no/such/dir/file").to_str().unwrap(),
                ]),
                &Options::new(),
            )
            .await;

        assert!(matches!(result, Err(CommandError::Io(_))));
    }

    #[tokio::test]
    async fn test_cp_wrong_arity() {
        let result = Builtin::Cp.execute(args(&["only-one"]), &Options::new()).await;
        assert!(matches!(
            result,
            Err(CommandError::WrongArity { got: 1, .. })
        ));
    }
}
