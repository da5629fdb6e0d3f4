//! Per-connection state machine of the control channel.

use std::fmt::Write as _;

use crate::ports::ControlPort;

use super::command::{Command, CommandError, ConsoleCommand, Operation};

/// Prompt printed after every console reply.
pub const PROMPT: &str = "turnip> ";

const GREETING: &str = "turnip console, type .help for the list of commands\n";

const HELP: &str = "\
.pause                     clear all timers, keep outputs as they are
.start                     start or restart the scheduler
.stop                      clear all timers and reset every output
.outputs                   list outputs and their state
.sensors                   list sensors and their last reading
.readSensor <name>         read a sensor now
.setOutput <name>:<state>  drive an output now
.help                      show this help
.logout                    close the session
";

/// Which table the next line is dispatched through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    /// One-shot commands; the connection stays open after each reply.
    #[default]
    Command,
    /// Interactive console entered with `console`.
    Console,
}

/// Text to write back to the peer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub text: String,
    /// Close the connection once `text` is written.
    pub close: bool,
}

impl Reply {
    fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            close: false,
        }
    }
}

/// The state of one control connection.
///
/// Lines are handled strictly one at a time. The switch to [`Mode::Console`]
/// is one-way: from then on only dot-prefixed meta-commands are honored.
#[derive(Debug, Default)]
pub struct Session {
    mode: Mode,
}

impl Session {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Handle one input line, returning what to write back.
    ///
    /// Returns `None` for a blank line in command mode.
    pub async fn handle_line<P: ControlPort>(&mut self, line: &str, port: &P) -> Option<Reply> {
        let line = line.trim();
        match self.mode {
            Mode::Command => {
                if line.is_empty() {
                    return None;
                }
                Some(self.handle_command(line, port).await)
            }
            Mode::Console => Some(Self::handle_console(line, port).await),
        }
    }

    async fn handle_command<P: ControlPort>(&mut self, line: &str, port: &P) -> Reply {
        match line.parse::<Command>() {
            Ok(Command::Operation(operation)) => Reply::text(execute(operation, port).await),
            Ok(Command::Console) => {
                tracing::debug!("console session opened");
                self.mode = Mode::Console;
                Reply::text(format!("{GREETING}{PROMPT}"))
            }
            Err(err) => Reply::text(error_line(&err)),
        }
    }

    async fn handle_console<P: ControlPort>(line: &str, port: &P) -> Reply {
        if line.is_empty() {
            return Reply::text(PROMPT);
        }
        let text = match line.parse::<ConsoleCommand>() {
            Ok(ConsoleCommand::Operation(operation)) => execute(operation, port).await,
            Ok(ConsoleCommand::Help) => HELP.to_string(),
            Ok(ConsoleCommand::Logout) => {
                tracing::debug!("console session closed");
                return Reply {
                    text: "bye\n".to_string(),
                    close: true,
                };
            }
            Err(err) => error_line(&err),
        };
        Reply::text(format!("{text}{PROMPT}"))
    }
}

fn error_line(err: &CommandError) -> String {
    format!("error: {err}\n")
}

/// Run `operation` against the port and render its newline-terminated reply.
async fn execute<P: ControlPort>(operation: Operation, port: &P) -> String {
    match operation {
        Operation::Pause => {
            port.pause().await;
            "paused\n".to_string()
        }
        Operation::Start => {
            port.start().await;
            "started\n".to_string()
        }
        Operation::Stop => match port.stop().await {
            Ok(()) => "stopped\n".to_string(),
            Err(err) => format!("error: {}\n", err.describe()),
        },
        Operation::Outputs => port.outputs().iter().fold(String::new(), |mut out, output| {
            let state = output
                .state
                .as_ref()
                .map_or_else(|| "unknown".to_string(), ToString::to_string);
            let _ = writeln!(out, "{}: {state}", output.name);
            out
        }),
        Operation::Sensors => port.sensors().iter().fold(String::new(), |mut out, sensor| {
            let reading = sensor
                .reading
                .map_or_else(|| "-".to_string(), |reading| reading.value.to_string());
            let _ = writeln!(out, "{}: {reading}", sensor.name);
            out
        }),
        Operation::ReadSensor(name) => match port.read_sensor(&name).await {
            Ok(value) => format!("{name}: {value}\n"),
            Err(err) => {
                tracing::warn!(sensor = %name, error = %err.describe(), "manual read failed");
                format!("error: {}\n", err.describe())
            }
        },
        Operation::SetOutput { output, state } => match port.set_output(&output, state).await {
            Ok(reached) => format!("{output}: {reached}\n"),
            Err(err) => {
                tracing::warn!(output = %output, error = %err.describe(), "manual write failed");
                format!("error: {}\n", err.describe())
            }
        },
    }
}
