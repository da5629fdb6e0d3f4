//! Running external programs for the process-backed drivers.

use std::time::Duration;

use tokio::process::Command;

use crate::error::DriverError;

/// Run `command` to completion and return its trimmed standard output.
///
/// The child is killed if `timeout` elapses first. A non-zero exit status
/// is an error carrying the trimmed standard error.
pub(crate) async fn run(
    mut command: Command,
    timeout: Option<Duration>,
) -> Result<String, DriverError> {
    let program = command.as_std().get_program().to_string_lossy().into_owned();
    command.kill_on_drop(true);

    let output = command.output();
    let output = match timeout {
        Some(limit) => tokio::time::timeout(limit, output)
            .await
            .map_err(|_| DriverError::Timeout {
                program: program.clone(),
                timeout: limit,
            })?,
        None => output.await,
    }
    .map_err(|source| DriverError::Spawn {
        program: program.clone(),
        source,
    })?;

    if !output.status.success() {
        return Err(DriverError::Failed {
            program,
            status: output.status,
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }
    tracing::trace!(%program, "command succeeded");
    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}
