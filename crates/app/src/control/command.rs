//! Parsing of control-channel input lines.
//!
//! The one-shot table and the console share the same [`Operation`] set;
//! they differ only in how a line is recognized (`readSensor t1` versus
//! `.readSensor t1`) and in their extras (`console` versus `.help` and
//! `.logout`).

use std::str::FromStr;

use turnip_domain::error::ValidationError;
use turnip_domain::output_state::OutputState;

/// An operation on the application, common to both modes.
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    Pause,
    Start,
    Stop,
    Outputs,
    Sensors,
    ReadSensor(String),
    SetOutput { output: String, state: OutputState },
}

/// A line of the one-shot command table.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Operation(Operation),
    /// Switch this connection to the interactive console.
    Console,
}

/// A line typed in the interactive console.
#[derive(Debug, Clone, PartialEq)]
pub enum ConsoleCommand {
    Operation(Operation),
    Help,
    Logout,
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum CommandError {
    #[error("unknown command {0:?}")]
    Unknown(String),

    #[error("unknown console command \".{0}\", try .help")]
    UnknownMeta(String),

    /// Console input must start with a dot.
    #[error("console commands start with a dot, try .help")]
    NotMeta,

    #[error("usage: {0}")]
    Usage(&'static str),

    #[error("expected <output>:<state>, got {0:?}")]
    InvalidPayload(String),

    #[error(transparent)]
    InvalidState(#[from] ValidationError),
}

const READ_SENSOR_USAGE: &str = "readSensor <name>";
const SET_OUTPUT_USAGE: &str = "setOutput <name>:<state>";

impl Operation {
    /// Parse an operation from its name and the remainder of the line.
    /// Returns `Ok(None)` when `name` is not an operation.
    fn parse(name: &str, args: &str) -> Result<Option<Self>, CommandError> {
        let operation = match name {
            "pause" => Self::Pause,
            "start" => Self::Start,
            "stop" => Self::Stop,
            "outputs" => Self::Outputs,
            "sensors" => Self::Sensors,
            "readSensor" => {
                if args.is_empty() {
                    return Err(CommandError::Usage(READ_SENSOR_USAGE));
                }
                Self::ReadSensor(args.to_string())
            }
            "setOutput" => {
                if args.is_empty() {
                    return Err(CommandError::Usage(SET_OUTPUT_USAGE));
                }
                let (output, state) = args
                    .split_once(':')
                    .ok_or_else(|| CommandError::InvalidPayload(args.to_string()))?;
                let output = output.trim();
                if output.is_empty() {
                    return Err(CommandError::InvalidPayload(args.to_string()));
                }
                Self::SetOutput {
                    output: output.to_string(),
                    state: state.parse()?,
                }
            }
            _ => return Ok(None),
        };
        Ok(Some(operation))
    }
}

/// Split a trimmed line into its first word and the trimmed rest.
fn split_line(line: &str) -> (&str, &str) {
    let line = line.trim();
    match line.split_once(char::is_whitespace) {
        Some((name, args)) => (name, args.trim()),
        None => (line, ""),
    }
}

impl FromStr for Command {
    type Err = CommandError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let (name, args) = split_line(line);
        if name == "console" {
            return Ok(Self::Console);
        }
        Operation::parse(name, args)?
            .map(Self::Operation)
            .ok_or_else(|| CommandError::Unknown(name.to_string()))
    }
}

impl FromStr for ConsoleCommand {
    type Err = CommandError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let (name, args) = split_line(line);
        let name = name.strip_prefix('.').ok_or(CommandError::NotMeta)?;
        match name {
            "help" => Ok(Self::Help),
            "logout" => Ok(Self::Logout),
            _ => Operation::parse(name, args)?
                .map(Self::Operation)
                .ok_or_else(|| CommandError::UnknownMeta(name.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_parse_every_one_shot_command() {
        let cases = [
            ("pause", Operation::Pause),
            ("start", Operation::Start),
            ("stop", Operation::Stop),
            ("outputs", Operation::Outputs),
            ("sensors", Operation::Sensors),
            ("readSensor t1", Operation::ReadSensor("t1".to_string())),
            (
                "setOutput fan:on",
                Operation::SetOutput {
                    output: "fan".to_string(),
                    state: OutputState::On,
                },
            ),
        ];
        for (line, expected) in cases {
            assert_eq!(
                line.parse::<Command>().unwrap(),
                Command::Operation(expected),
                "{line}"
            );
        }
        assert_eq!("console".parse::<Command>().unwrap(), Command::Console);
    }

    #[test]
    fn should_trim_carriage_return_and_spaces() {
        assert_eq!(
            "  readSensor   gpu0 \r\n".parse::<Command>().unwrap(),
            Command::Operation(Operation::ReadSensor("gpu0".to_string()))
        );
    }

    #[test]
    fn should_parse_relative_and_level_states_in_set_output() {
        assert_eq!(
            "setOutput gpu:+25".parse::<Command>().unwrap(),
            Command::Operation(Operation::SetOutput {
                output: "gpu".to_string(),
                state: OutputState::Relative(25.0),
            })
        );
        assert_eq!(
            "setOutput gpu : 180".parse::<Command>().unwrap(),
            Command::Operation(Operation::SetOutput {
                output: "gpu".to_string(),
                state: OutputState::Level(180.0),
            })
        );
    }

    #[test]
    fn should_reject_unknown_command() {
        assert_eq!(
            "reboot".parse::<Command>(),
            Err(CommandError::Unknown("reboot".to_string()))
        );
    }

    #[test]
    fn should_reject_console_meta_commands_in_one_shot_table() {
        assert!(matches!(
            ".outputs".parse::<Command>(),
            Err(CommandError::Unknown(_))
        ));
        assert!(matches!("help".parse::<Command>(), Err(CommandError::Unknown(_))));
    }

    #[test]
    fn should_return_usage_when_argument_is_missing() {
        assert_eq!(
            "readSensor".parse::<Command>(),
            Err(CommandError::Usage(READ_SENSOR_USAGE))
        );
        assert_eq!(
            "setOutput".parse::<Command>(),
            Err(CommandError::Usage(SET_OUTPUT_USAGE))
        );
    }

    #[test]
    fn should_reject_set_output_payload_without_separator() {
        assert_eq!(
            "setOutput fan on".parse::<Command>(),
            Err(CommandError::InvalidPayload("fan on".to_string()))
        );
        assert_eq!(
            "setOutput :on".parse::<Command>(),
            Err(CommandError::InvalidPayload(":on".to_string()))
        );
    }

    #[test]
    fn should_reject_set_output_with_empty_state() {
        assert_eq!(
            "setOutput fan:".parse::<Command>(),
            Err(CommandError::InvalidState(ValidationError::EmptyState))
        );
    }

    #[test]
    fn should_parse_console_meta_commands() {
        assert_eq!(".help".parse::<ConsoleCommand>().unwrap(), ConsoleCommand::Help);
        assert_eq!(
            ".logout".parse::<ConsoleCommand>().unwrap(),
            ConsoleCommand::Logout
        );
        assert_eq!(
            ".setOutput pump:off".parse::<ConsoleCommand>().unwrap(),
            ConsoleCommand::Operation(Operation::SetOutput {
                output: "pump".to_string(),
                state: OutputState::Off,
            })
        );
    }

    #[test]
    fn should_reject_console_input_without_dot() {
        assert_eq!(
            "outputs".parse::<ConsoleCommand>(),
            Err(CommandError::NotMeta)
        );
    }

    #[test]
    fn should_reject_unknown_meta_command() {
        assert_eq!(
            ".console".parse::<ConsoleCommand>(),
            Err(CommandError::UnknownMeta("console".to_string()))
        );
    }
}
