//! Accept loop and per-connection line handling.

use std::future::Future;
use std::path::{Path, PathBuf};

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{UnixListener, UnixStream};
use turnip_app::control::Session;
use turnip_app::ports::ControlPort;

use crate::bind::bind;
use crate::error::ControlError;

/// The control endpoint: a bound Unix socket plus the port its sessions
/// drive.
///
/// The socket file is removed when the server is dropped, whether or not
/// it ever served.
pub struct ControlServer<P> {
    listener: UnixListener,
    socket: SocketFile,
    port: P,
}

impl<P> ControlServer<P>
where
    P: ControlPort + Clone + 'static,
{
    /// Bind the control socket at `path` (see [`bind`]).
    ///
    /// # Errors
    ///
    /// Returns the [`ControlError`] of the bind or reclaim attempt.
    pub async fn bind(path: impl Into<PathBuf>, port: P) -> Result<Self, ControlError> {
        let path = path.into();
        let listener = bind(&path).await?;
        Ok(Self {
            listener,
            socket: SocketFile(path),
            port,
        })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.socket.0
    }

    /// Accept connections until `shutdown` completes, then drop the server
    /// and with it the socket file.
    ///
    /// Each connection runs in its own task with its own [`Session`];
    /// lines of one connection are handled one at a time. Connections
    /// still open at shutdown finish their current line and are dropped
    /// with the runtime.
    pub async fn serve(self, shutdown: impl Future<Output = ()> + Send) {
        tokio::pin!(shutdown);
        loop {
            tokio::select! {
                biased;
                () = &mut shutdown => break,
                accepted = self.listener.accept() => match accepted {
                    Ok((stream, _)) => {
                        let port = self.port.clone();
                        tokio::spawn(async move {
                            if let Err(err) = handle_connection(stream, port).await {
                                tracing::debug!(
                                    error = %err,
                                    "control connection ended with error"
                                );
                            }
                        });
                    }
                    Err(err) => tracing::warn!(error = %err, "failed to accept control connection"),
                },
            }
        }
        tracing::info!("control server stopped");
    }
}

/// Removes the socket file on drop.
struct SocketFile(PathBuf);

impl Drop for SocketFile {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.0) {
            Ok(()) => tracing::debug!(path = %self.0.display(), "control socket removed"),
            Err(err) => tracing::warn!(
                path = %self.0.display(),
                error = %err,
                "failed to remove control socket"
            ),
        }
    }
}

async fn handle_connection<P: ControlPort>(stream: UnixStream, port: P) -> std::io::Result<()> {
    tracing::debug!("control connection opened");
    let (reader, mut writer) = stream.into_split();
    let mut lines = BufReader::new(reader).lines();
    let mut session = Session::new();

    while let Some(line) = lines.next_line().await? {
        let Some(reply) = session.handle_line(&line, &port).await else {
            continue;
        };
        writer.write_all(reply.text.as_bytes()).await?;
        if reply.close {
            writer.shutdown().await?;
            break;
        }
    }

    tracing::debug!("control connection closed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use tokio::io::AsyncReadExt;
    use turnip_app::control::PROMPT;
    use turnip_app::ports::{OutputSnapshot, ReportingPort, SensorSnapshot};
    use turnip_domain::error::TurnipError;
    use turnip_domain::output_state::OutputState;

    use super::*;

    #[derive(Default)]
    struct StubPort {
        calls: Mutex<Vec<String>>,
    }

    impl StubPort {
        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl ReportingPort for StubPort {
        fn outputs(&self) -> Vec<OutputSnapshot> {
            vec![
                OutputSnapshot {
                    name: "fan".to_string(),
                    driver: "relay".to_string(),
                    state: Some(OutputState::Off),
                },
                OutputSnapshot {
                    name: "pump".to_string(),
                    driver: "relay".to_string(),
                    state: Some(OutputState::On),
                },
            ]
        }

        fn sensors(&self) -> Vec<SensorSnapshot> {
            Vec::new()
        }
    }

    impl ControlPort for StubPort {
        async fn start(&self) {
            self.calls.lock().unwrap().push("start".to_string());
        }

        async fn pause(&self) {
            self.calls.lock().unwrap().push("pause".to_string());
        }

        async fn stop(&self) -> Result<(), TurnipError> {
            self.calls.lock().unwrap().push("stop".to_string());
            Ok(())
        }

        async fn read_sensor(&self, _name: &str) -> Result<f64, TurnipError> {
            Ok(21.5)
        }

        async fn set_output(
            &self,
            _name: &str,
            state: OutputState,
        ) -> Result<OutputState, TurnipError> {
            Ok(state)
        }
    }

    struct Running {
        _dir: tempfile::TempDir,
        path: PathBuf,
        port: Arc<StubPort>,
        stop: tokio::sync::oneshot::Sender<()>,
        server: tokio::task::JoinHandle<()>,
    }

    async fn start_server() -> Running {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("turnip.sock");
        let port = Arc::new(StubPort::default());
        let server = ControlServer::bind(&path, Arc::clone(&port)).await.unwrap();
        let (stop, stopped) = tokio::sync::oneshot::channel::<()>();
        let server = tokio::spawn(server.serve(async {
            let _ = stopped.await;
        }));
        Running {
            _dir: dir,
            path,
            port,
            stop,
            server,
        }
    }

    /// Read from `stream` until `expected` bytes are available.
    async fn read_exact_text(stream: &mut UnixStream, expected: &str) -> String {
        let mut buffer = vec![0; expected.len()];
        stream.read_exact(&mut buffer).await.unwrap();
        String::from_utf8(buffer).unwrap()
    }

    #[tokio::test]
    async fn should_answer_several_one_shot_commands_on_one_connection() {
        let running = start_server().await;
        let mut client = UnixStream::connect(&running.path).await.unwrap();

        client.write_all(b"outputs\n").await.unwrap();
        assert_eq!(
            read_exact_text(&mut client, "fan: off\npump: on\n").await,
            "fan: off\npump: on\n"
        );

        client.write_all(b"pause\r\n").await.unwrap();
        assert_eq!(read_exact_text(&mut client, "paused\n").await, "paused\n");
        assert_eq!(running.port.calls(), vec!["pause"]);
    }

    #[tokio::test]
    async fn should_close_after_pending_replies_when_client_half_closes() {
        let running = start_server().await;
        let mut client = UnixStream::connect(&running.path).await.unwrap();

        client.write_all(b"start\n\nstop\n").await.unwrap();
        client.shutdown().await.unwrap();
        let mut reply = String::new();
        client.read_to_string(&mut reply).await.unwrap();

        assert_eq!(reply, "started\nstopped\n");
    }

    #[tokio::test]
    async fn should_only_honor_meta_commands_in_console() {
        let running = start_server().await;
        let mut client = UnixStream::connect(&running.path).await.unwrap();

        client.write_all(b"console\n").await.unwrap();
        let mut greeting = String::new();
        while !greeting.ends_with(PROMPT) {
            let mut byte = [0u8; 1];
            client.read_exact(&mut byte).await.unwrap();
            greeting.push(char::from(byte[0]));
        }

        client.write_all(b"stop\n.pause\n.logout\n").await.unwrap();
        let mut rest = String::new();
        client.read_to_string(&mut rest).await.unwrap();

        assert!(rest.contains("console commands start with a dot"));
        assert!(rest.contains("paused\n"));
        assert!(rest.ends_with("bye\n"));
        assert_eq!(running.port.calls(), vec!["pause"]);
    }

    #[tokio::test]
    async fn should_remove_socket_file_on_shutdown() {
        let running = start_server().await;
        assert!(running.path.exists());

        running.stop.send(()).unwrap();
        running.server.await.unwrap();

        assert!(!running.path.exists());
    }

    #[tokio::test]
    async fn should_remove_socket_file_when_dropped_without_serving() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("turnip.sock");
        let server = ControlServer::bind(&path, Arc::new(StubPort::default()))
            .await
            .unwrap();
        assert_eq!(server.path(), path);
        assert!(path.exists());

        drop(server);

        assert!(!path.exists());
    }
}
