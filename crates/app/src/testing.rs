//! Spy drivers and a small rig shared by the unit tests of this crate.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::Notify;
use turnip_domain::driver::DriverConfig;
use turnip_domain::error::DeviceError;
use turnip_domain::manifest::Manifest;
use turnip_domain::output_state::OutputState;
use turnip_domain::rule::Rule;

use crate::devices::Devices;
use crate::event_bus::InProcessEventBus;
use crate::ports::{Output, Sensor};
use crate::registry::{DriverRegistry, DriverTable};

/// Ordered log of driver calls, e.g. `read t1`, `set fan on`, `reset fan`.
#[derive(Clone, Default)]
pub(crate) struct Journal(Arc<Mutex<Vec<String>>>);

impl Journal {
    fn push(&self, entry: String) {
        self.0.lock().unwrap().push(entry);
    }

    pub(crate) fn entries(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    pub(crate) fn count(&self, entry: &str) -> usize {
        self.0.lock().unwrap().iter().filter(|e| *e == entry).count()
    }

    pub(crate) fn clear(&self) {
        self.0.lock().unwrap().clear();
    }
}

/// Controls what a spy sensor returns, and whether its next read hangs.
#[derive(Clone)]
pub(crate) struct Knob {
    value: Arc<Mutex<Result<f64, String>>>,
    gate: Arc<Mutex<Option<Arc<Notify>>>>,
}

impl Knob {
    fn new(value: f64) -> Self {
        Self {
            value: Arc::new(Mutex::new(Ok(value))),
            gate: Arc::default(),
        }
    }

    pub(crate) fn set(&self, value: f64) {
        *self.value.lock().unwrap() = Ok(value);
    }

    pub(crate) fn fail(&self, message: &str) {
        *self.value.lock().unwrap() = Err(message.to_string());
    }

    /// Make the next read wait until the returned gate is notified.
    pub(crate) fn stall(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.gate.lock().unwrap() = Some(gate.clone());
        gate
    }
}

struct SpySensor {
    name: String,
    knob: Knob,
    journal: Journal,
}

#[async_trait]
impl Sensor for SpySensor {
    async fn read(&mut self) -> Result<f64, DeviceError> {
        self.journal.push(format!("read {}", self.name));
        let gate = self.knob.gate.lock().unwrap().take();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        self.knob.value.lock().unwrap().clone().map_err(Into::into)
    }
}

struct SpyOutput {
    name: String,
    journal: Journal,
    failing: Arc<AtomicBool>,
    level: Option<f64>,
}

#[async_trait]
impl Output for SpyOutput {
    async fn set_state(&mut self, state: &OutputState) -> Result<OutputState, DeviceError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err("write refused".into());
        }
        self.journal.push(format!("set {} {state}", self.name));
        let reached = state
            .resolve(self.level)
            .ok_or("no current level to adjust")?;
        self.level = reached.level();
        Ok(reached)
    }

    async fn reset(&mut self) -> Result<OutputState, DeviceError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err("write refused".into());
        }
        self.journal.push(format!("reset {}", self.name));
        self.level = None;
        Ok(OutputState::Off)
    }
}

/// Builds a manifest and a registry of spy drivers (`driver = "spy"`).
#[derive(Default)]
pub(crate) struct Rig {
    pub(crate) journal: Journal,
    knobs: HashMap<String, Knob>,
    failing: HashMap<String, Arc<AtomicBool>>,
    manifest: Manifest,
}

impl Rig {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn sensor(mut self, name: &str, value: f64) -> Self {
        self.knobs.insert(name.to_string(), Knob::new(value));
        self.manifest.sensors.push(DriverConfig::new(name, "spy"));
        self
    }

    pub(crate) fn output(mut self, name: &str) -> Self {
        self.failing
            .insert(name.to_string(), Arc::new(AtomicBool::new(false)));
        self.manifest.outputs.push(DriverConfig::new(name, "spy"));
        self
    }

    /// Configure an entry whose driver does not exist.
    pub(crate) fn unresolvable_output(mut self, name: &str) -> Self {
        self.manifest
            .outputs
            .push(DriverConfig::new(name, "no-such-driver"));
        self
    }

    pub(crate) fn rule(mut self, rule: Rule) -> Self {
        self.manifest.rules.push(rule);
        self
    }

    pub(crate) fn knob(&self, sensor: &str) -> Knob {
        self.knobs[sensor].clone()
    }

    pub(crate) fn fail_writes(&self, output: &str, failing: bool) {
        self.failing[output].store(failing, Ordering::SeqCst);
    }

    pub(crate) fn manifest(&self) -> Manifest {
        self.manifest.clone()
    }

    pub(crate) fn registry(&self) -> DriverRegistry {
        let knobs = self.knobs.clone();
        let sensor_journal = self.journal.clone();
        let failing = self.failing.clone();
        let output_journal = self.journal.clone();

        let table = DriverTable::new()
            .sensor("spy", move |config| {
                let knob = knobs.get(&config.name).ok_or("unknown spy sensor")?.clone();
                Ok(Box::new(SpySensor {
                    name: config.name.clone(),
                    knob,
                    journal: sensor_journal.clone(),
                }))
            })
            .output("spy", move |config| {
                let failing = failing
                    .get(&config.name)
                    .ok_or("unknown spy output")?
                    .clone();
                Ok(Box::new(SpyOutput {
                    name: config.name.clone(),
                    journal: output_journal.clone(),
                    failing,
                    level: None,
                }))
            });
        DriverRegistry::new(table)
    }

    pub(crate) async fn devices(&self) -> Devices {
        Devices::setup(&self.manifest, &self.registry(), InProcessEventBus::default()).await
    }
}
