//! # turnip-adapter-drivers
//!
//! The drivers bundled with turnip, exposed as one [`DriverTable`] the
//! registry consults before any external provider.
//!
//! ## Provided drivers
//!
//! | Kind | Driver | Options |
//! |------|--------|---------|
//! | sensor | `virtual` | `value`, `fail` |
//! | sensor | `ds18b20` | `path`, `base_path`, `scale` |
//! | sensor | `nvidia-gpu-temp` | `gpu`, `scale` |
//! | output | `virtual` | `default` |
//! | output | `relay` | `pin`, `on_value`, `gpio_root` |
//! | output | `nvidia-gpu-power` | `gpu` |
//! | output | `command-runner` | `on`, `off`, `shell`, `timeout_secs` |
//!
//! ## Dependency rule
//!
//! Depends on `turnip-app` (capability ports) and `turnip-domain` only.

mod command_runner;
mod ds18b20;
mod error;
mod nvidia;
mod process;
mod relay;
mod scale;
mod virtual_device;

pub use command_runner::CommandRunner;
pub use ds18b20::Ds18b20;
pub use error::DriverError;
pub use nvidia::{GpuPower, GpuTemp};
pub use relay::Relay;
pub use scale::Scale;
pub use virtual_device::{VirtualOutput, VirtualSensor};

use turnip_app::registry::DriverTable;

/// Every built-in driver, keyed by the name used in `driver = "..."`.
#[must_use]
pub fn builtin_drivers() -> DriverTable {
    DriverTable::new()
        .sensor("virtual", virtual_device::sensor)
        .sensor("ds18b20", ds18b20::build)
        .sensor("nvidia-gpu-temp", nvidia::temp)
        .output("virtual", virtual_device::output)
        .output("relay", relay::build)
        .output("nvidia-gpu-power", nvidia::power)
        .output("command-runner", command_runner::build)
}
