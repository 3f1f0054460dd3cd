//! Runs external command-line tools with a deadline.

use crate::errors::ExtractError;
use std::ffi::OsStr;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::debug;

/// Runs `binary` with `args` and returns its stdout.
///
/// The child is killed if the deadline passes. A non-zero exit status becomes
/// `ExtractError::CommandFailed` carrying the tool's stderr.
pub(crate) async fn run<I, S>(binary: &str, args: I, timeout: Duration) -> Result<Vec<u8>, ExtractError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let mut command = Command::new(binary);
    command
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    debug!(?command, "Running external command");

    let output = tokio::time::timeout(timeout, command.output())
        .await
        .map_err(|_| ExtractError::Timeout(binary.to_string(), timeout))?
        .map_err(|source| ExtractError::Spawn {
            binary: binary.to_string(),
            source,
        })?;

    if !output.status.success() {
        return Err(ExtractError::CommandFailed {
            binary: binary.to_string(),
            status: output.status.to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    Ok(output.stdout)
}
