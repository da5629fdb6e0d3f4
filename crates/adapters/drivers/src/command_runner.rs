//! Output that runs a command for each state change.
//!
//! `on` and `off` hold the commands for the two switch states. A
//! `Command` state runs its own text. Commands are split on whitespace
//! and executed directly unless `shell` is set, in which case the whole
//! text goes through `sh -c`.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::process::Command;
use turnip_app::ports::Output;
use turnip_domain::driver::DriverConfig;
use turnip_domain::error::DeviceError;
use turnip_domain::output_state::OutputState;

use crate::error::DriverError;
use crate::process::run;

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct Options {
    on: Option<String>,
    off: Option<String>,
    shell: bool,
    /// `0` disables the timeout.
    #[serde(alias = "timeout")]
    timeout_secs: u64,
}

/// Runs configured commands to drive an external process.
#[derive(Debug, Default)]
pub struct CommandRunner {
    on: Option<String>,
    off: Option<String>,
    shell: bool,
    timeout: Option<Duration>,
}

impl CommandRunner {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn on(mut self, command: impl Into<String>) -> Self {
        self.on = Some(command.into());
        self
    }

    #[must_use]
    pub fn off(mut self, command: impl Into<String>) -> Self {
        self.off = Some(command.into());
        self
    }

    #[must_use]
    pub fn shell(mut self, shell: bool) -> Self {
        self.shell = shell;
        self
    }

    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    fn command(&self, text: &str) -> Option<Command> {
        if self.shell {
            let mut command = Command::new("sh");
            command.arg("-c").arg(text);
            return Some(command);
        }
        let mut words = text.split_whitespace();
        let mut command = Command::new(words.next()?);
        command.args(words);
        Some(command)
    }

    async fn execute(&self, text: &str, state: &OutputState) -> Result<(), DriverError> {
        let command = self
            .command(text)
            .ok_or_else(|| DriverError::NoCommand(state.clone()))?;
        let stdout = run(command, self.timeout).await?;
        tracing::debug!(command = text, %stdout, "command ran");
        Ok(())
    }
}

pub(crate) fn build(config: &DriverConfig) -> Result<Box<dyn Output>, DeviceError> {
    let options: Options = config.options().map_err(DriverError::from)?;
    Ok(Box::new(CommandRunner {
        on: options.on,
        off: options.off,
        shell: options.shell,
        timeout: (options.timeout_secs > 0).then(|| Duration::from_secs(options.timeout_secs)),
    }))
}

#[async_trait]
impl Output for CommandRunner {
    async fn set_state(&mut self, state: &OutputState) -> Result<OutputState, DeviceError> {
        let text = match state {
            OutputState::On => self.on.as_deref(),
            OutputState::Off => self.off.as_deref(),
            OutputState::Command(text) => Some(text.as_str()),
            other => {
                return Err(DriverError::Unsupported {
                    driver: "command-runner",
                    state: other.clone(),
                }
                .into());
            }
        };
        let text = text.ok_or_else(|| DriverError::NoCommand(state.clone()))?;
        self.execute(text, state).await?;
        Ok(state.clone())
    }

    async fn reset(&mut self) -> Result<OutputState, DeviceError> {
        if let Some(off) = &self.off {
            self.execute(off, &OutputState::Off).await?;
        }
        Ok(OutputState::Off)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn should_run_on_command_through_shell() {
        let dir = tempfile::tempdir().unwrap();
        let marker = dir.path().join("on");
        let mut runner = CommandRunner::new()
            .on(format!("touch {}", marker.display()))
            .shell(true);

        let state = runner.set_state(&OutputState::On).await.unwrap();

        assert_eq!(state, OutputState::On);
        assert!(marker.exists());
    }

    #[tokio::test]
    async fn should_run_command_state_text_without_shell() {
        let mut runner = CommandRunner::new();

        let state = OutputState::Command("true --ignored".to_string());
        assert_eq!(runner.set_state(&state).await.unwrap(), state);
    }

    #[tokio::test]
    async fn should_fail_when_command_exits_with_error() {
        let mut runner = CommandRunner::new().off("exit 3").shell(true);

        let err = runner.set_state(&OutputState::Off).await.unwrap_err();

        assert!(err.to_string().starts_with("sh exited with"));
    }

    #[tokio::test]
    async fn should_fail_when_no_command_is_configured_for_state() {
        let mut runner = CommandRunner::new();

        let err = runner.set_state(&OutputState::On).await.unwrap_err();

        assert_eq!(err.to_string(), "no command configured for state on");
    }

    #[tokio::test]
    async fn should_refuse_numeric_states() {
        let mut runner = CommandRunner::new().on("true");

        assert!(runner.set_state(&OutputState::Level(1.0)).await.is_err());
    }

    #[tokio::test]
    async fn should_run_off_command_on_reset() {
        let dir = tempfile::tempdir().unwrap();
        let marker = dir.path().join("off");
        let mut runner = CommandRunner::new()
            .off(format!("touch {}", marker.display()))
            .shell(true);

        assert_eq!(runner.reset().await.unwrap(), OutputState::Off);
        assert!(marker.exists());
    }

    #[tokio::test]
    async fn should_reset_without_command_when_off_is_not_configured() {
        let mut runner = CommandRunner::new();
        assert_eq!(runner.reset().await.unwrap(), OutputState::Off);
    }

    #[tokio::test]
    async fn should_kill_command_after_timeout() {
        let config = DriverConfig::new("miner", "command-runner").with_options(serde_json::json!({
            "on": "sleep 5",
            "timeout_secs": 1,
        }));
        let mut runner = build(&config).unwrap();

        let err = runner.set_state(&OutputState::On).await.unwrap_err();

        assert_eq!(err.to_string(), "sleep did not finish within 1s");
    }
}
