//! Configuration loading: TOML file with environment variable overrides.
//!
//! The file is looked up at `--config` (or `TURNIP_CONFIG`), falling back
//! to `$XDG_CONFIG_HOME/turnip/config.toml`. The default file is optional;
//! an explicitly requested one must exist. Environment variables take
//! precedence over file values.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use turnip_domain::manifest::Manifest;

/// Filter used when neither the environment nor the file sets one.
pub const DEFAULT_FILTER: &str = "turnipd=info,turnip=info";

/// Top-level configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Path of the control socket.
    pub socket: PathBuf,
    /// Read-only HTTP endpoint.
    pub web: WebConfig,
    /// Logging settings.
    pub logging: LoggingConfig,
    /// `[[sensors]]`, `[[outputs]]` and `[[rules]]`.
    #[serde(flatten)]
    pub manifest: Manifest,
}

/// HTTP listener configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct WebConfig {
    pub enabled: bool,
    /// Address to bind to (e.g. `127.0.0.1`).
    pub host: String,
    /// TCP port.
    pub port: u16,
}

/// Logging configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive (`RUST_LOG` syntax).
    pub filter: String,
}

impl Config {
    /// Load the configuration file, apply environment-variable overrides
    /// and validate the result.
    ///
    /// # Errors
    ///
    /// Returns an error if the file is unreadable or malformed, or if the
    /// configuration does not validate.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => match default_path() {
                Some(path) => Self::from_optional_file(&path)?,
                None => Self::default(),
            },
        };
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(ConfigError::Parse)
    }

    fn from_optional_file(path: &Path) -> Result<Self, ConfigError> {
        match Self::from_file(path) {
            Err(ConfigError::Io(err)) if err.kind() == std::io::ErrorKind::NotFound => {
                Ok(Self::default())
            }
            other => other,
        }
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("TURNIP_SOCKET") {
            self.socket = PathBuf::from(val);
        }
        if let Ok(val) = std::env::var("TURNIP_WEB_PORT") {
            if let Ok(port) = val.parse() {
                self.web.port = port;
            }
        }
        if let Ok(val) = std::env::var("TURNIP_LOG") {
            self.logging.filter = val;
        }
        if let Ok(val) = std::env::var("RUST_LOG") {
            self.logging.filter = val;
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.socket.as_os_str().is_empty() {
            return Err(ConfigError::Validation(
                "socket path must not be empty".to_string(),
            ));
        }
        if self.web.enabled && self.web.port == 0 {
            return Err(ConfigError::Validation(
                "web port must be non-zero".to_string(),
            ));
        }
        self.manifest
            .validate()
            .map_err(|err| ConfigError::Validation(err.describe()))
    }

    /// Return the `host:port` address of the HTTP endpoint.
    #[must_use]
    pub fn web_addr(&self) -> String {
        format!("{}:{}", self.web.host, self.web.port)
    }
}

/// `$XDG_CONFIG_HOME/turnip/config.toml`, or `$HOME/.config/...`.
fn default_path() -> Option<PathBuf> {
    let base = std::env::var_os("XDG_CONFIG_HOME")
        .filter(|dir| !dir.is_empty())
        .map(PathBuf::from)
        .or_else(|| std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".config")))?;
    Some(base.join("turnip").join("config.toml"))
}

impl Default for Config {
    fn default() -> Self {
        Self {
            socket: std::env::temp_dir().join("turnip.sock"),
            web: WebConfig::default(),
            logging: LoggingConfig::default(),
            manifest: Manifest::default(),
        }
    }
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            host: "127.0.0.1".to_string(),
            port: 8080,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: DEFAULT_FILTER.to_string(),
        }
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// TOML parse failure.
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
    /// File I/O failure.
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    /// Semantic validation failure.
    #[error("{0}")]
    Validation(String),
}
