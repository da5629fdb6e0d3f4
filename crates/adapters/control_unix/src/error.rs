//! Control endpoint error types.

use std::path::PathBuf;

/// Errors raised while binding or serving the control socket.
///
/// Every variant is fatal for the daemon: it must not run without its
/// control endpoint, nor next to another live instance.
#[derive(Debug, thiserror::Error)]
pub enum ControlError {
    /// Another live process answers on the socket.
    #[error("another instance is already listening on {}", .0.display())]
    AlreadyRunning(PathBuf),

    #[error("failed to bind control socket {}", .path.display())]
    Bind {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The liveness probe failed for a reason other than a refused connection.
    #[error("failed to probe control socket {}", .path.display())]
    Probe {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to remove stale control socket {}", .path.display())]
    Reclaim {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The path is taken by something that is not a socket; it is left alone.
    #[error("{} exists and is not a socket", .0.display())]
    NotASocket(PathBuf),
}
