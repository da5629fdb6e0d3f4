//! Talking to the control socket.

use std::path::Path;

use anyhow::Context;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::net::UnixStream;

async fn connect(socket: &Path) -> anyhow::Result<UnixStream> {
    UnixStream::connect(socket)
        .await
        .with_context(|| format!("failed to connect to {}, is turnipd running?", socket.display()))
}

/// Send one command line and copy the whole reply into `out`.
///
/// Returns `false` when the daemon answered with an error.
pub async fn one_shot<W>(socket: &Path, line: &str, out: &mut W) -> anyhow::Result<bool>
where
    W: AsyncWrite + Unpin,
{
    let mut stream = connect(socket).await?;
    stream.write_all(format!("{line}\n").as_bytes()).await?;
    stream.shutdown().await?;

    let mut reply = Vec::new();
    tokio::io::copy(&mut stream, &mut reply)
        .await
        .context("failed to read reply")?;
    out.write_all(&reply).await?;
    out.flush().await?;
    Ok(!reply.starts_with(b"error:"))
}

/// Open a console session and bridge it to `input`/`out` until the daemon
/// closes the connection.
///
/// Closing `input` half-closes the connection; pending replies are still
/// copied out.
pub async fn console<R, W>(socket: &Path, mut input: R, out: &mut W) -> anyhow::Result<()>
where
    R: AsyncRead + Unpin + Send + 'static,
    W: AsyncWrite + Unpin,
{
    let stream = connect(socket).await?;
    let (mut reader, mut writer) = stream.into_split();
    writer.write_all(b"console\n").await?;

    let forward = tokio::spawn(async move {
        tokio::io::copy(&mut input, &mut writer).await?;
        writer.shutdown().await
    });

    let copied = tokio::io::copy(&mut reader, out).await;
    forward.abort();
    copied.context("failed to read from console")?;
    out.flush().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use tokio::io::{AsyncBufReadExt, BufReader};
    use tokio::net::UnixListener;

    use super::*;

    /// Answer every line with `reply`, closing on EOF or `.logout`.
    fn serve(listener: UnixListener, reply: &'static str) -> tokio::task::JoinHandle<Vec<String>> {
        tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let (reader, mut writer) = stream.into_split();
            let mut lines = BufReader::new(reader).lines();
            let mut seen = Vec::new();
            while let Some(line) = lines.next_line().await.unwrap() {
                let logout = line == ".logout";
                seen.push(line);
                if logout {
                    writer.write_all(b"bye\n").await.unwrap();
                    break;
                }
                writer.write_all(reply.as_bytes()).await.unwrap();
            }
            seen
        })
    }

    #[tokio::test]
    async fn should_print_reply_of_one_shot_command() {
        let dir = tempfile::tempdir().unwrap();
        let socket = dir.path().join("turnip.sock");
        let server = serve(UnixListener::bind(&socket).unwrap(), "fan: on\n");

        let mut out = Vec::new();
        let ok = one_shot(&socket, "outputs", &mut out).await.unwrap();

        assert!(ok);
        assert_eq!(out, b"fan: on\n");
        assert_eq!(server.await.unwrap(), vec!["outputs"]);
    }

    #[tokio::test]
    async fn should_report_failure_when_daemon_answers_with_error() {
        let dir = tempfile::tempdir().unwrap();
        let socket = dir.path().join("turnip.sock");
        let _server = serve(
            UnixListener::bind(&socket).unwrap(),
            "error: output attic not found\n",
        );

        let mut out = Vec::new();
        let ok = one_shot(&socket, "setOutput attic:on", &mut out)
            .await
            .unwrap();

        assert!(!ok);
    }

    #[tokio::test]
    async fn should_explain_missing_daemon() {
        let dir = tempfile::tempdir().unwrap();
        let socket = dir.path().join("turnip.sock");

        let err = one_shot(&socket, "outputs", &mut Vec::new())
            .await
            .unwrap_err();

        assert!(err.to_string().contains("is turnipd running?"));
    }

    #[tokio::test]
    async fn should_bridge_console_until_logout() {
        let dir = tempfile::tempdir().unwrap();
        let socket = dir.path().join("turnip.sock");
        let server = serve(UnixListener::bind(&socket).unwrap(), "turnip> ");

        let input: &'static [u8] = b".outputs\n.logout\n";
        let mut out = Vec::new();
        console(&socket, input, &mut out).await.unwrap();

        assert_eq!(String::from_utf8(out).unwrap(), "turnip> turnip> bye\n");
        assert_eq!(
            server.await.unwrap(),
            vec!["console", ".outputs", ".logout"]
        );
    }
}
