//! Driver error types.

use std::path::PathBuf;
use std::process::ExitStatus;
use std::time::Duration;

use turnip_domain::output_state::OutputState;

/// Errors raised by the built-in drivers.
///
/// They reach the core boxed as a `DeviceError`, which wraps them with
/// the name of the sensor or output involved.
#[derive(Debug, thiserror::Error)]
pub enum DriverError {
    /// The `options` table of the entry does not match the driver.
    #[error("invalid driver options")]
    Options(#[from] serde_json::Error),

    /// An option has a value outside of its accepted range.
    #[error("option {option} {reason}")]
    InvalidOption {
        option: &'static str,
        reason: &'static str,
    },

    #[error("sensor path {} must be absolute", .0.display())]
    RelativePath(PathBuf),

    #[error("failed to access {}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A file or a command produced something that is not a number.
    #[error("unexpected value {value:?} from {origin}")]
    Parse { origin: String, value: String },

    #[error("failed to run {program}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} exited with {status}: {stderr}")]
    Failed {
        program: String,
        status: ExitStatus,
        stderr: String,
    },

    #[error("{program} did not finish within {timeout:?}")]
    Timeout { program: String, timeout: Duration },

    #[error("{driver} does not accept state {state}")]
    Unsupported {
        driver: &'static str,
        state: OutputState,
    },

    #[error("no command configured for state {0}")]
    NoCommand(OutputState),

    /// A relative adjustment was requested before any level was known.
    #[error("no current level to adjust")]
    NoLevel,

    #[error("simulated read failure")]
    Simulated,
}

impl DriverError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
