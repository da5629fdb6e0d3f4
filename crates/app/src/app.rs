//! The application: devices, timers and the start/pause/stop lifecycle.
//!
//! [`App`] is the single owner of the scheduler. Both the timers and the
//! control channel go through it, so a manual `setOutput` and a scheduled
//! tick use the same device instances.
//!
//! Every distinct rule interval gets one spawned timer task. All timers of
//! one run share a `watch` channel; dropping its sender is the halt signal.
//! A timer only looks at that signal between ticks, so a tick already in
//! flight always runs to completion.
//!
//! The scheduler lock only guards bookkeeping. Driver calls (ticks, resets,
//! device setup) never run while it is held, so a stalled driver stalls its
//! own timer and nothing else.

use std::sync::Arc;

use tokio::sync::{Mutex, MutexGuard, OnceCell, broadcast, watch};
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use turnip_domain::error::TurnipError;
use turnip_domain::event::{Event, Lifecycle};
use turnip_domain::interval::Interval;
use turnip_domain::manifest::Manifest;
use turnip_domain::output_state::OutputState;
use turnip_domain::time::now;

use crate::devices::Devices;
use crate::engine::{RuleEngine, RuleGroup, TickReport, run_tick};
use crate::event_bus::InProcessEventBus;
use crate::ports::{ControlPort, OutputSnapshot, ReportingPort, SensorSnapshot};
use crate::registry::DriverRegistry;

/// Handle to the running application. Cloning is cheap and every clone
/// drives the same scheduler.
#[derive(Clone)]
pub struct App {
    inner: Arc<Inner>,
}

struct Inner {
    manifest: Manifest,
    registry: DriverRegistry,
    engine: RuleEngine,
    bus: InProcessEventBus,
    devices: OnceCell<Arc<Devices>>,
    scheduler: Mutex<Scheduler>,
}

struct Scheduler {
    lifecycle: Lifecycle,
    /// Intervals of the timers spawned by the current run.
    timers: Vec<Interval>,
    halt: Option<watch::Sender<()>>,
}

impl App {
    /// Create an uninitialized application from a validated manifest.
    #[must_use]
    pub fn new(manifest: Manifest, registry: DriverRegistry, bus: InProcessEventBus) -> Self {
        let engine = RuleEngine::new(&manifest.rules);
        Self {
            inner: Arc::new(Inner {
                manifest,
                registry,
                engine,
                bus,
                devices: OnceCell::new(),
                scheduler: Mutex::new(Scheduler {
                    lifecycle: Lifecycle::Uninitialized,
                    timers: Vec::new(),
                    halt: None,
                }),
            }),
        }
    }

    /// Build and initialize every sensor and output.
    ///
    /// Runs the setup only once; calling it again is a no-op.
    pub async fn initialize(&self) {
        drop(self.ready().await);
    }

    /// Current lifecycle state.
    pub async fn lifecycle(&self) -> Lifecycle {
        self.inner.scheduler.lock().await.lifecycle
    }

    /// Intervals that currently own a timer.
    pub async fn timers(&self) -> Vec<Interval> {
        self.inner.scheduler.lock().await.timers.clone()
    }

    /// Subscribe to the events published by the application.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.inner.bus.subscribe()
    }

    async fn devices(&self) -> Arc<Devices> {
        let inner = &self.inner;
        inner
            .devices
            .get_or_init(|| async {
                Arc::new(Devices::setup(&inner.manifest, &inner.registry, inner.bus.clone()).await)
            })
            .await
            .clone()
    }

    /// Set up the devices, then lock the scheduler, leaving
    /// `Uninitialized` behind.
    async fn ready(&self) -> (Arc<Devices>, MutexGuard<'_, Scheduler>) {
        let devices = self.devices().await;
        let mut scheduler = self.inner.scheduler.lock().await;
        if scheduler.lifecycle == Lifecycle::Uninitialized {
            self.transition(&mut scheduler, Lifecycle::Ready);
        }
        (devices, scheduler)
    }

    fn transition(&self, scheduler: &mut Scheduler, state: Lifecycle) {
        if scheduler.lifecycle == state {
            return;
        }
        tracing::info!(from = %scheduler.lifecycle, to = %state, "lifecycle changed");
        scheduler.lifecycle = state;
        self.inner.bus.publish(Event::LifecycleChanged { state, at: now() });
    }
}

impl Scheduler {
    fn clear_timers(&mut self) {
        self.halt = None;
        let cleared = self.timers.len();
        self.timers.clear();
        if cleared > 0 {
            tracing::debug!(timers = cleared, "timers cleared");
        }
    }
}

/// Run the immediate rules of `group` once, unless already halted, then
/// tick every interval until halted.
fn spawn_timer(group: RuleGroup, devices: Arc<Devices>, mut halt: watch::Receiver<()>) {
    tokio::spawn(async move {
        let immediate = group.immediate().filter(|_| halt.has_changed().is_ok());
        if let Some(immediate) = immediate {
            let report = run_tick(&immediate, &devices).await;
            log_tick(&group, &report, "immediate rules evaluated");
        }

        let period = group.interval().as_duration();
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                biased;
                _ = halt.changed() => break,
                _ = ticker.tick() => {
                    let report = run_tick(&group, &devices).await;
                    log_tick(&group, &report, "tick completed");
                }
            }
        }
        tracing::debug!(interval = %group.interval(), "timer halted");
    });
}

fn log_tick(group: &RuleGroup, report: &TickReport, message: &str) {
    tracing::debug!(
        interval = %group.interval(),
        readings = report.readings.len(),
        failed_sensors = report.failed_sensors.len(),
        applied = report.applied,
        resets = report.resets,
        skipped = report.skipped,
        write_failures = report.write_failures,
        "{message}"
    );
}

impl ReportingPort for App {
    fn outputs(&self) -> Vec<OutputSnapshot> {
        self.inner
            .devices
            .get()
            .map(|devices| devices.output_snapshots())
            .unwrap_or_default()
    }

    fn sensors(&self) -> Vec<SensorSnapshot> {
        self.inner
            .devices
            .get()
            .map(|devices| devices.sensor_snapshots())
            .unwrap_or_default()
    }
}

impl ControlPort for App {
    /// Start the scheduler.
    ///
    /// Initializes first when needed. A running scheduler is fully stopped
    /// (timers cleared, outputs reset) before the new timers are created.
    /// Each timer evaluates the immediate rules of its interval as soon as
    /// it is registered; `start` does not wait for them.
    async fn start(&self) {
        let (devices, mut scheduler) = self.ready().await;
        let restart = scheduler.lifecycle == Lifecycle::Running;
        if restart {
            tracing::info!("restarting scheduler");
            scheduler.clear_timers();
        }

        let (halt, watcher) = watch::channel(());
        let groups = self.inner.engine.groups();
        scheduler.timers = groups.iter().map(RuleGroup::interval).collect();
        scheduler.halt = Some(halt);
        tracing::info!(timers = scheduler.timers.len(), "scheduler started");
        self.transition(&mut scheduler, Lifecycle::Running);
        drop(scheduler);

        if restart {
            devices.reset_all().await;
        }
        for group in groups {
            spawn_timer(group.clone(), devices.clone(), watcher.clone());
        }
    }

    async fn pause(&self) {
        let mut scheduler = self.inner.scheduler.lock().await;
        scheduler.clear_timers();
        if scheduler.lifecycle == Lifecycle::Running {
            self.transition(&mut scheduler, Lifecycle::Paused);
        }
    }

    async fn stop(&self) -> Result<(), TurnipError> {
        let (devices, mut scheduler) = self.ready().await;
        scheduler.clear_timers();
        self.transition(&mut scheduler, Lifecycle::Stopped);
        drop(scheduler);

        let failures = devices.reset_all().await;
        failures.into_iter().next().map_or(Ok(()), Err)
    }

    async fn read_sensor(&self, name: &str) -> Result<f64, TurnipError> {
        self.devices().await.read_sensor(name).await
    }

    async fn set_output(&self, name: &str, state: OutputState) -> Result<OutputState, TurnipError> {
        self.devices().await.set_output(name, &state).await
    }
}
