//! Driver registry: resolves `(kind, driver name)` to a constructor.
//!
//! Resolution checks the cache first, then the built-in [`DriverTable`],
//! then every registered [`DriverProvider`] in registration order. A
//! successful resolution is cached for the lifetime of the registry, so
//! several configured entries sharing one driver name reuse one resolved
//! constructor while still getting their own instance.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use turnip_domain::driver::{DriverConfig, DriverKind};
use turnip_domain::error::{DeviceError, ResolutionError, TurnipError};

use crate::ports::{Output, Sensor};

/// Builds a sensor instance from its configuration entry.
pub type SensorFactory =
    Arc<dyn Fn(&DriverConfig) -> Result<Box<dyn Sensor>, DeviceError> + Send + Sync>;

/// Builds an output instance from its configuration entry.
pub type OutputFactory =
    Arc<dyn Fn(&DriverConfig) -> Result<Box<dyn Output>, DeviceError> + Send + Sync>;

/// A resolved driver implementation.
#[derive(Clone)]
pub enum DriverConstructor {
    Sensor(SensorFactory),
    Output(OutputFactory),
}

impl DriverConstructor {
    #[must_use]
    pub fn kind(&self) -> DriverKind {
        match self {
            Self::Sensor(_) => DriverKind::Sensor,
            Self::Output(_) => DriverKind::Output,
        }
    }
}

impl std::fmt::Debug for DriverConstructor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("DriverConstructor").field(&self.kind()).finish()
    }
}

/// Source of driver implementations looked up by name.
///
/// This is the extension point for drivers that are not bundled with the
/// daemon: register one with [`DriverRegistry::with_provider`].
pub trait DriverProvider: Send + Sync {
    fn lookup(&self, kind: DriverKind, driver: &str) -> Option<DriverConstructor>;
}

/// A fixed lookup table of named constructors.
#[derive(Clone, Default)]
pub struct DriverTable {
    sensors: HashMap<String, SensorFactory>,
    outputs: HashMap<String, OutputFactory>,
}

impl DriverTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a sensor constructor under `driver`.
    #[must_use]
    pub fn sensor<F>(mut self, driver: impl Into<String>, factory: F) -> Self
    where
        F: Fn(&DriverConfig) -> Result<Box<dyn Sensor>, DeviceError> + Send + Sync + 'static,
    {
        self.sensors.insert(driver.into(), Arc::new(factory));
        self
    }

    /// Register an output constructor under `driver`.
    #[must_use]
    pub fn output<F>(mut self, driver: impl Into<String>, factory: F) -> Self
    where
        F: Fn(&DriverConfig) -> Result<Box<dyn Output>, DeviceError> + Send + Sync + 'static,
    {
        self.outputs.insert(driver.into(), Arc::new(factory));
        self
    }

    /// Names of the registered drivers of `kind`, sorted.
    #[must_use]
    pub fn names(&self, kind: DriverKind) -> Vec<&str> {
        let mut names: Vec<&str> = match kind {
            DriverKind::Sensor => self.sensors.keys().map(String::as_str).collect(),
            DriverKind::Output => self.outputs.keys().map(String::as_str).collect(),
        };
        names.sort_unstable();
        names
    }
}

impl DriverProvider for DriverTable {
    fn lookup(&self, kind: DriverKind, driver: &str) -> Option<DriverConstructor> {
        match kind {
            DriverKind::Sensor => self
                .sensors
                .get(driver)
                .map(|f| DriverConstructor::Sensor(Arc::clone(f))),
            DriverKind::Output => self
                .outputs
                .get(driver)
                .map(|f| DriverConstructor::Output(Arc::clone(f))),
        }
    }
}

/// Caching resolver over built-in and external drivers.
pub struct DriverRegistry {
    builtin: DriverTable,
    providers: Vec<Box<dyn DriverProvider>>,
    cache: Mutex<HashMap<(DriverKind, String), DriverConstructor>>,
}

impl DriverRegistry {
    /// Create a registry over the given built-in drivers.
    #[must_use]
    pub fn new(builtin: DriverTable) -> Self {
        Self {
            builtin,
            providers: Vec::new(),
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Register an external provider, consulted after the built-in table.
    #[must_use]
    pub fn with_provider(mut self, provider: impl DriverProvider + 'static) -> Self {
        self.providers.push(Box::new(provider));
        self
    }

    /// Resolve a driver name to its constructor.
    ///
    /// # Errors
    ///
    /// Returns [`ResolutionError`] when neither the built-in table nor any
    /// provider knows `driver` for `kind`. Failures are not cached.
    pub fn resolve(
        &self,
        kind: DriverKind,
        driver: &str,
    ) -> Result<DriverConstructor, ResolutionError> {
        let key = (kind, driver.to_string());
        if let Some(found) = self.lock_cache().get(&key) {
            return Ok(found.clone());
        }

        let resolved = self
            .builtin
            .lookup(kind, driver)
            .or_else(|| {
                self.providers
                    .iter()
                    .find_map(|provider| provider.lookup(kind, driver))
            })
            .filter(|constructor| constructor.kind() == kind)
            .ok_or_else(|| ResolutionError {
                kind,
                driver: driver.to_string(),
            })?;

        tracing::debug!(%kind, driver, "driver resolved");
        self.lock_cache().insert(key, resolved.clone());
        Ok(resolved)
    }

    /// Resolve and construct a sensor instance for `config`.
    ///
    /// # Errors
    ///
    /// Returns [`TurnipError::Resolution`] for an unknown driver, or
    /// [`TurnipError::Setup`] when the constructor rejects the entry.
    pub fn create_sensor(&self, config: &DriverConfig) -> Result<Box<dyn Sensor>, TurnipError> {
        match self.resolve(DriverKind::Sensor, &config.driver)? {
            DriverConstructor::Sensor(factory) => {
                factory(config).map_err(|source| setup_error(DriverKind::Sensor, config, source))
            }
            DriverConstructor::Output(_) => Err(mismatch(DriverKind::Sensor, config)),
        }
    }

    /// Resolve and construct an output instance for `config`.
    ///
    /// # Errors
    ///
    /// Returns [`TurnipError::Resolution`] for an unknown driver, or
    /// [`TurnipError::Setup`] when the constructor rejects the entry.
    pub fn create_output(&self, config: &DriverConfig) -> Result<Box<dyn Output>, TurnipError> {
        match self.resolve(DriverKind::Output, &config.driver)? {
            DriverConstructor::Output(factory) => {
                factory(config).map_err(|source| setup_error(DriverKind::Output, config, source))
            }
            DriverConstructor::Sensor(_) => Err(mismatch(DriverKind::Output, config)),
        }
    }

    fn lock_cache(
        &self,
    ) -> std::sync::MutexGuard<'_, HashMap<(DriverKind, String), DriverConstructor>> {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn setup_error(kind: DriverKind, config: &DriverConfig, source: DeviceError) -> TurnipError {
    TurnipError::Setup {
        kind,
        name: config.name.clone(),
        source,
    }
}

fn mismatch(kind: DriverKind, config: &DriverConfig) -> TurnipError {
    ResolutionError {
        kind,
        driver: config.driver.clone(),
    }
    .into()
}
