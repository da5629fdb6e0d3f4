//! NVIDIA GPU drivers backed by `nvidia-smi`: a core temperature sensor
//! and a power-limit output.

use async_trait::async_trait;
use serde::Deserialize;
use tokio::process::Command;
use turnip_app::ports::{Output, Sensor};
use turnip_domain::driver::DriverConfig;
use turnip_domain::error::DeviceError;
use turnip_domain::output_state::OutputState;

use crate::error::DriverError;
use crate::process::run;
use crate::scale::Scale;

const SMI: &str = "nvidia-smi";

/// Thin wrapper over `nvidia-smi` for one GPU.
#[derive(Debug, Clone, Copy)]
struct Smi {
    gpu: u32,
}

impl Smi {
    fn command(self) -> Command {
        let mut command = Command::new(SMI);
        command.arg("-i").arg(self.gpu.to_string());
        command
    }

    /// Query one numeric field, e.g. `temperature.gpu` or `power.limit`.
    async fn query(self, field: &str) -> Result<f64, DriverError> {
        let mut command = self.command();
        command
            .arg(format!("--query-gpu={field}"))
            .arg("--format=csv,noheader,nounits");
        let stdout = run(command, None).await?;
        parse_query(field, &stdout)
    }

    async fn set_power_limit(self, watts: f64) -> Result<(), DriverError> {
        let mut command = self.command();
        command.arg("-pl").arg(format!("{watts}"));
        run(command, None).await?;
        Ok(())
    }
}

/// Parse the first line of a `--format=csv,noheader` query, tolerating a
/// trailing unit such as `W` or `C`.
fn parse_query(field: &str, stdout: &str) -> Result<f64, DriverError> {
    let line = stdout.lines().next().unwrap_or_default().trim();
    let number = line
        .split_whitespace()
        .next()
        .unwrap_or_default()
        .trim_end_matches(|c: char| c.is_ascii_alphabetic());
    number
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
        .ok_or_else(|| DriverError::Parse {
            origin: format!("{SMI} {field}"),
            value: line.to_string(),
        })
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct TempOptions {
    #[serde(alias = "id")]
    gpu: u32,
    scale: Scale,
}

/// GPU core temperature.
#[derive(Debug)]
pub struct GpuTemp {
    smi: Smi,
    scale: Scale,
}

impl GpuTemp {
    #[must_use]
    pub fn new(gpu: u32, scale: Scale) -> Self {
        Self {
            smi: Smi { gpu },
            scale,
        }
    }
}

pub(crate) fn temp(config: &DriverConfig) -> Result<Box<dyn Sensor>, DeviceError> {
    let options: TempOptions = config.options().map_err(DriverError::from)?;
    Ok(Box::new(GpuTemp::new(options.gpu, options.scale)))
}

#[async_trait]
impl Sensor for GpuTemp {
    async fn read(&mut self) -> Result<f64, DeviceError> {
        let celsius = self.smi.query("temperature.gpu").await?;
        Ok(self.scale.from_celsius(celsius))
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct PowerOptions {
    #[serde(alias = "id")]
    gpu: u32,
}

/// GPU power limit, in watts.
///
/// Initialization captures the current limit as the baseline that
/// [`Output::reset`] restores.
#[derive(Debug)]
pub struct GpuPower {
    smi: Smi,
    baseline: Option<f64>,
    current: Option<f64>,
}

impl GpuPower {
    #[must_use]
    pub fn new(gpu: u32) -> Self {
        Self {
            smi: Smi { gpu },
            baseline: None,
            current: None,
        }
    }

    /// The absolute limit `state` asks for.
    fn target(&self, state: &OutputState) -> Result<f64, DriverError> {
        let target = match state {
            OutputState::Level(watts) => *watts,
            OutputState::Relative(delta) => self.current.ok_or(DriverError::NoLevel)? + delta,
            other => {
                return Err(DriverError::Unsupported {
                    driver: "nvidia-gpu-power",
                    state: other.clone(),
                });
            }
        };
        if target <= 0.0 {
            return Err(DriverError::InvalidOption {
                option: "power limit",
                reason: "must be positive",
            });
        }
        Ok(target)
    }

    async fn apply(&mut self, watts: f64) -> Result<OutputState, DriverError> {
        self.smi.set_power_limit(watts).await?;
        self.current = Some(watts);
        tracing::info!(gpu = self.smi.gpu, watts, "gpu power limit set");
        Ok(OutputState::Level(watts))
    }
}

pub(crate) fn power(config: &DriverConfig) -> Result<Box<dyn Output>, DeviceError> {
    let options: PowerOptions = config.options().map_err(DriverError::from)?;
    Ok(Box::new(GpuPower::new(options.gpu)))
}

#[async_trait]
impl Output for GpuPower {
    async fn initialize(&mut self) -> Result<Option<OutputState>, DeviceError> {
        let limit = self.smi.query("power.limit").await?;
        self.baseline = Some(limit);
        self.current = Some(limit);
        tracing::info!(gpu = self.smi.gpu, watts = limit, "gpu power baseline captured");
        Ok(Some(OutputState::Level(limit)))
    }

    async fn set_state(&mut self, state: &OutputState) -> Result<OutputState, DeviceError> {
        let watts = self.target(state)?;
        Ok(self.apply(watts).await?)
    }

    async fn reset(&mut self) -> Result<OutputState, DeviceError> {
        let baseline = self.baseline.ok_or(DriverError::NoLevel)?;
        Ok(self.apply(baseline).await?)
    }
}
