//! # turnipd, the turnip daemon
//!
//! Composition root that wires the drivers, the scheduler and the control
//! endpoint together.
//!
//! ## Responsibilities
//! - Parse configuration (CLI args, env vars, config file)
//! - Initialize logging
//! - Bind the control socket, refusing to run next to a live instance
//! - Build the driver registry and the application, then initialize the
//!   configured devices and start the scheduler in the background while
//!   the control socket is already served
//! - Optionally serve the read-only HTTP endpoint
//! - Handle graceful shutdown (SIGTERM/SIGINT): close the control socket,
//!   pause the scheduler, keep outputs as they are
//!
//! ## Dependency rule
//! This is the **only** crate that depends on all other crates.
//! It is the wiring layer; no domain logic belongs here.

mod config;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tokio::signal::unix::{Signal, SignalKind, signal};
use tokio::sync::broadcast::{self, error::RecvError};
use tracing_subscriber::EnvFilter;

use turnip_adapter_control_unix::ControlServer;
use turnip_adapter_drivers::builtin_drivers;
use turnip_app::App;
use turnip_app::event_bus::InProcessEventBus;
use turnip_app::ports::ControlPort;
use turnip_app::registry::DriverRegistry;
use turnip_domain::event::Event;

use crate::config::{Config, DEFAULT_FILTER};

/// Room for bursts of readings and state changes before slow subscribers
/// start missing events.
const EVENT_CAPACITY: usize = 256;

/// Sensor, output and rule daemon.
#[derive(Debug, Parser)]
#[command(name = "turnipd", version, about)]
struct Args {
    /// Configuration file path
    #[arg(short, long, env = "TURNIP_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    let config = match Config::load(args.config.as_deref()) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("turnipd: {err}");
            return ExitCode::FAILURE;
        }
    };
    init_logging(&config.logging.filter);

    match run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(error = %report(err.as_ref()), "turnipd failed");
            ExitCode::FAILURE
        }
    }
}

fn init_logging(filter: &str) {
    let filter = EnvFilter::try_new(filter).unwrap_or_else(|err| {
        eprintln!("turnipd: invalid log filter {filter:?} ({err}), using {DEFAULT_FILTER}");
        EnvFilter::new(DEFAULT_FILTER)
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    let terminate = signal(SignalKind::terminate())?;
    let web_addr = config.web_addr();
    let Config {
        socket,
        web,
        manifest,
        ..
    } = config;

    // Application
    let registry = DriverRegistry::new(builtin_drivers());
    let app = App::new(manifest, registry, InProcessEventBus::new(EVENT_CAPACITY));

    // Control endpoint, bound before any device is touched
    let server = ControlServer::bind(socket, app.clone()).await?;

    tokio::spawn(log_output_changes(app.subscribe()));
    let startup = tokio::spawn({
        let app = app.clone();
        async move {
            app.initialize().await;
            app.start().await;
        }
    });

    // HTTP
    let web_task = if web.enabled {
        let listener = tokio::net::TcpListener::bind(&web_addr).await?;
        tracing::info!(address = %web_addr, "web endpoint listening");
        let router = turnip_adapter_http_axum::router::build(app.clone());
        Some(tokio::spawn(async move {
            if let Err(err) = axum::serve(listener, router).await {
                tracing::error!(error = %err, "web endpoint failed");
            }
        }))
    } else {
        None
    };

    server.serve(shutdown_signal(terminate)).await;

    if let Some(task) = web_task {
        task.abort();
    }
    startup.abort();
    app.pause().await;
    tracing::info!("turnipd stopped");
    Ok(())
}

/// Resolve on SIGINT or SIGTERM.
async fn shutdown_signal(mut terminate: Signal) {
    let interrupt = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to listen for SIGINT");
            std::future::pending::<()>().await;
        }
    };
    tokio::select! {
        () = interrupt => {}
        _ = terminate.recv() => {}
    }
    tracing::info!("shutdown signal received");
}

async fn log_output_changes(mut events: broadcast::Receiver<Event>) {
    loop {
        match events.recv().await {
            Ok(Event::OutputChanged { output, state, .. }) => {
                tracing::info!(output = %output, state = %state, "output changed");
            }
            Ok(_) => {}
            Err(RecvError::Lagged(missed)) => {
                tracing::warn!(missed, "output change log fell behind");
            }
            Err(RecvError::Closed) => break,
        }
    }
}

/// Render an error with its chain of sources.
fn report(err: &dyn std::error::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}
