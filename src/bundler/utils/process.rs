//! External process execution.

use crate::bundler::error::{Error, Result};
use std::{ffi::OsStr, path::Path};
use tokio::process::Command;

/// Renders a program and its arguments for log and error messages.
pub fn display_command<I, S>(program: &Path, args: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let name = program
        .file_name()
        .unwrap_or(program.as_os_str())
        .to_string_lossy()
        .into_owned();
    std::iter::once(name)
        .chain(args.into_iter().map(|a| a.as_ref().to_string_lossy().into_owned()))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Runs `program` with `args` in `cwd`, waits for it and returns its standard output.
///
/// Standard error is captured and attached to the error when the exit status is
/// non-zero. No retries, no timeout.
pub async fn run_captured<I, S>(program: &Path, args: I, cwd: &Path) -> Result<String>
where
    I: IntoIterator<Item = S> + Clone,
    S: AsRef<OsStr>,
{
    let command = display_command(program, args.clone());
    log::debug!("Running `{}` in {}", command, cwd.display());

    let output = Command::new(program)
        .args(args)
        .current_dir(cwd)
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|error| Error::CommandFailed {
            command: command.clone(),
            error,
        })?;

    if !output.status.success() {
        return Err(Error::ExternalTool {
            command,
            code: output.status.code(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        });
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_uses_program_file_name() {
        let rendered = display_command(Path::new("/usr/bin/npm"), ["ls", "--json"]);
        assert_eq!(rendered, "npm ls --json");
    }

    #[tokio::test]
    async fn missing_program_is_command_failed() {
        let dir = tempfile::tempdir().unwrap();
        let err = run_captured(
            Path::new("bootpack-surely-missing-program"),
            ["--version"],
            dir.path(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, Error::CommandFailed { .. }));
        assert_eq!(err.kind(), "ExternalToolError");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn non_zero_exit_carries_stderr() {
        let dir = tempfile::tempdir().unwrap();
        let err = run_captured(
            Path::new("sh"),
            ["-c", "echo broken >&2; exit 3"],
            dir.path(),
        )
        .await
        .unwrap_err();
        match err {
            Error::ExternalTool { code, stderr, .. } => {
                assert_eq!(code, Some(3));
                assert_eq!(stderr.trim(), "broken");
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
