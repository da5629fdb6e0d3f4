//! # turnipctl
//!
//! Command-line client for a running `turnipd`.
//!
//! ```text
//! turnipctl outputs
//! turnipctl setOutput fan:on
//! turnipctl -s /run/turnip.sock console
//! ```

mod client;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

/// Control a running turnip daemon.
#[derive(Debug, Parser)]
#[command(name = "turnipctl", version)]
struct Args {
    /// Control socket path [default: <tmpdir>/turnip.sock]
    #[arg(short, long, env = "TURNIP_SOCKET")]
    socket: Option<PathBuf>,

    /// Command and its arguments, e.g. `readSensor tank`; `console` opens
    /// an interactive session
    #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
    command: Vec<String>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<ExitCode> {
    let args = Args::parse();
    let socket = args
        .socket
        .unwrap_or_else(|| std::env::temp_dir().join("turnip.sock"));
    let line = args.command.join(" ");
    let mut stdout = tokio::io::stdout();

    if line == "console" {
        client::console(&socket, tokio::io::stdin(), &mut stdout).await?;
        return Ok(ExitCode::SUCCESS);
    }

    if client::one_shot(&socket, &line, &mut stdout).await? {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::FAILURE)
    }
}
