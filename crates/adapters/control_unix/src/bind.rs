//! Binding the control socket, reclaiming it from a crashed instance.
//!
//! When the path is already in use, a client connection probes it:
//! - the probe connects: a live instance owns the socket, give up;
//! - the probe is refused: the socket is stale, remove it and bind again.

use std::io::ErrorKind;
use std::os::unix::fs::FileTypeExt;
use std::path::Path;

use tokio::net::{UnixListener, UnixStream};

use crate::error::ControlError;

/// Bind a listener on `path`, reclaiming a stale socket left behind by a
/// previous instance.
///
/// # Errors
///
/// - [`ControlError::AlreadyRunning`] if a live process answers on `path`
/// - [`ControlError::NotASocket`] if `path` is taken by a non-socket file
/// - [`ControlError::Probe`], [`ControlError::Reclaim`] or
///   [`ControlError::Bind`] when the underlying IO fails
pub async fn bind(path: &Path) -> Result<UnixListener, ControlError> {
    match UnixListener::bind(path) {
        Ok(listener) => {
            tracing::info!(path = %path.display(), "control socket bound");
            Ok(listener)
        }
        Err(err) if err.kind() == ErrorKind::AddrInUse => reclaim(path).await,
        Err(source) => Err(ControlError::Bind {
            path: path.to_path_buf(),
            source,
        }),
    }
}

async fn reclaim(path: &Path) -> Result<UnixListener, ControlError> {
    match UnixStream::connect(path).await {
        Ok(_) => Err(ControlError::AlreadyRunning(path.to_path_buf())),
        Err(err) if err.kind() == ErrorKind::ConnectionRefused => {
            let metadata = tokio::fs::symlink_metadata(path)
                .await
                .map_err(|source| ControlError::Reclaim {
                    path: path.to_path_buf(),
                    source,
                })?;
            if !metadata.file_type().is_socket() {
                return Err(ControlError::NotASocket(path.to_path_buf()));
            }

            tracing::warn!(path = %path.display(), "removing stale control socket");
            tokio::fs::remove_file(path)
                .await
                .map_err(|source| ControlError::Reclaim {
                    path: path.to_path_buf(),
                    source,
                })?;

            let listener = UnixListener::bind(path).map_err(|source| ControlError::Bind {
                path: path.to_path_buf(),
                source,
            })?;
            tracing::info!(path = %path.display(), "control socket reclaimed");
            Ok(listener)
        }
        Err(source) => Err(ControlError::Probe {
            path: path.to_path_buf(),
            source,
        }),
    }
}
