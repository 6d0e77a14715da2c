//! `StepController` — lifecycle, background driver, and the caller API.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TryRecvError};
use parking_lot::Mutex;
use tracing::{debug, error, info, warn};

use tc_analytics::{Metrics, MetricsHistory, TrackingSample, TripAnalytics, VehicleTracking};
use tc_core::{EdgeId, LightId, RouteCatalog, RouteId, VehicleTypeId};
use tc_engine::SimEngine;
use tc_signal::{LightSnapshot, SignalRuleConfig};
use tc_spawn::{LoadConfig, SpawnError, SpawnRequest};
use tc_track::{Published, VehicleSnapshot, VehicleSnapshotEntry};

use crate::tick::TickCore;
use crate::{Command, ControlError, ControlResult, ControllerConfig, TickReport};

/// Length assumed for an edge the engine never reported a length for.
pub const FALLBACK_EDGE_LENGTH_M: f64 = 100.0;

// ── RunState ──────────────────────────────────────────────────────────────────

/// ```text
/// Stopped ──run──▶ Starting ──ok──▶ Paused ◀──pause── Running
///    ▲                 │ err            └────play────▶   │
///    └─────────────────┴──────────── shutdown ◀──────────┘
/// ```
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum RunState {
    /// No engine session.
    Stopped,
    /// The engine is being started.
    Starting,
    /// The driver thread is ticking.
    Running,
    /// Engine started, no driver; ticks only via `step_once`.
    Paused,
}

// ── Shared state ──────────────────────────────────────────────────────────────

/// What the driver thread and the controller share.
pub(crate) struct Shared<E: SimEngine> {
    pub(crate) core:  Mutex<TickCore<E>>,
    /// Mirror of the core's tick counter, readable without the lock.
    pub(crate) ticks: AtomicU64,
}

impl<E: SimEngine> Shared<E> {
    fn tick(&self) -> TickReport {
        let mut core = self.core.lock();
        let report = core.run_tick();
        self.ticks.store(report.tick, Ordering::Release);
        report
    }
}

/// Lifecycle state, guarded separately from the tick lock.  Lock order is
/// always control, then core.
struct Control {
    state:    RunState,
    driver:   Option<Driver>,
    /// Done signal of a driver that was asked to stop but had not exited
    /// within `join_timeout`.
    detached: Option<Receiver<()>>,
}

struct Analytics {
    trips:   TripAnalytics,
    history: MetricsHistory,
}

// ── Driver ────────────────────────────────────────────────────────────────────

/// Handle to the background tick loop.
struct Driver {
    stop:   Sender<()>,
    done:   Receiver<()>,
    handle: JoinHandle<()>,
}

impl Driver {
    fn spawn<E: SimEngine>(shared: Arc<Shared<E>>, interval: Duration) -> ControlResult<Self> {
        let (stop, stop_rx) = crossbeam_channel::bounded(1);
        let (done_tx, done) = crossbeam_channel::bounded(1);
        let handle = thread::Builder::new()
            .name("tc-driver".into())
            .spawn(move || drive(&shared, interval, &stop_rx, &done_tx))?;
        Ok(Self { stop, done, handle })
    }

    /// Ask the loop to stop after its current tick and wait up to `timeout`.
    /// Returns the done signal if the thread was detached still running.
    fn stop(self, timeout: Duration) -> Option<Receiver<()>> {
        // Full only if a stop is already pending.
        let _ = self.stop.try_send(());
        match self.done.recv_timeout(timeout) {
            Err(RecvTimeoutError::Timeout) => {
                warn!(timeout_ms = timeout.as_millis() as u64, "driver did not stop in time; detaching");
                Some(self.done)
            }
            Ok(()) | Err(RecvTimeoutError::Disconnected) => {
                if self.handle.join().is_err() {
                    error!("driver thread panicked");
                }
                None
            }
        }
    }
}

/// The loop itself.  Tick failures are handled inside the tick, so the
/// loop only ends on a stop signal.
fn drive<E: SimEngine>(shared: &Shared<E>, interval: Duration, stop: &Receiver<()>, done: &Sender<()>) {
    debug!(interval_ms = interval.as_millis() as u64, "driver started");
    loop {
        shared.tick();
        match stop.recv_timeout(interval) {
            Err(RecvTimeoutError::Timeout) => {}
            Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
        }
    }
    debug!(ticks = shared.ticks.load(Ordering::Acquire), "driver stopped");
    let _ = done.send(());
}

// ── StepController ────────────────────────────────────────────────────────────

/// Owns one engine session at a time and drives it tick by tick, either
/// from a background driver (`play`) or synchronously (`step_once`).
///
/// Every method takes `&self`; share the controller across threads with an
/// `Arc`.  Mutating calls (spawns, rule and load settings, manual light
/// changes) are queued as commands and applied at the start of the next
/// tick.  Readers get atomically published snapshots and never wait for a
/// running tick.
///
/// Create via [`ControllerBuilder`][crate::ControllerBuilder].
pub struct StepController<E: SimEngine> {
    pub(crate) config:    ControllerConfig,
    pub(crate) catalog:   Arc<RouteCatalog>,
    pub(crate) shared:    Arc<Shared<E>>,
    pub(crate) commands:  Sender<Command>,
    pub(crate) vehicles:  Arc<Published<VehicleSnapshot>>,
    pub(crate) lights:    Arc<Published<Vec<LightSnapshot>>>,
    control:              Mutex<Control>,
    analytics:            Mutex<Analytics>,
}

impl<E: SimEngine> StepController<E> {
    pub(crate) fn assemble(
        config:   ControllerConfig,
        catalog:  Arc<RouteCatalog>,
        core:     TickCore<E>,
        commands: Sender<Command>,
    ) -> Self {
        let vehicles = core.tracker.snapshot_handle();
        let lights = Arc::clone(&core.lights);
        let analytics = Analytics {
            trips:   TripAnalytics::new(config.trip_history_capacity),
            history: MetricsHistory::new(config.metrics_history_capacity),
        };
        Self {
            shared: Arc::new(Shared { core: Mutex::new(core), ticks: AtomicU64::new(0) }),
            control: Mutex::new(Control { state: RunState::Stopped, driver: None, detached: None }),
            analytics: Mutex::new(analytics),
            config,
            catalog,
            commands,
            vehicles,
            lights,
        }
    }

    // ── Lifecycle ─────────────────────────────────────────────────────────

    /// Start the engine.  A no-op once started.  On failure the controller
    /// stays `Stopped` and the call may be retried.
    pub fn run(&self) -> ControlResult<()> {
        let mut control = self.control.lock();
        self.start_locked(&mut control)
    }

    /// Start ticking in the background, starting the engine first if
    /// needed.  Returns the resulting state; already running is a no-op.
    pub fn play(&self) -> ControlResult<RunState> {
        let mut control = self.control.lock();
        if control.state == RunState::Running {
            info!("already running");
            return Ok(RunState::Running);
        }
        self.start_locked(&mut control)?;
        control.driver = Some(Driver::spawn(Arc::clone(&self.shared), self.config.tick_interval)?);
        control.state = RunState::Running;
        info!(interval_ms = self.config.tick_interval.as_millis() as u64, "playing");
        Ok(RunState::Running)
    }

    /// Stop the background driver after its current tick.
    ///
    /// Waits at most `join_timeout`; if the driver has not exited by then
    /// it is detached and will stop on its own.  The state is `Paused`
    /// either way; [`is_driver_detached`](Self::is_driver_detached) tells
    /// the two apart.  A no-op unless running.
    pub fn pause(&self) -> RunState {
        let mut control = self.control.lock();
        if control.state != RunState::Running {
            return control.state;
        }
        let confirmed = self.stop_driver(&mut control);
        control.state = RunState::Paused;
        info!(ticks = self.tick_count(), confirmed, "paused");
        control.state
    }

    /// Run exactly one tick on the calling thread, starting the engine if
    /// needed.  Works whether or not the driver is running.
    pub fn step_once(&self) -> ControlResult<TickReport> {
        let mut control = self.control.lock();
        self.start_locked(&mut control)?;
        Ok(self.shared.tick())
    }

    /// `shutdown` followed by `run`.
    pub fn restart(&self) -> ControlResult<()> {
        self.shutdown()?;
        self.run()
    }

    /// Stop the driver, close the engine, and reset to `Stopped`.
    ///
    /// Safe to call repeatedly.  The controller ends up `Stopped` even if
    /// closing the engine fails; that error is returned.  Vehicle, light,
    /// and trip state is cleared; queued spawns and rule/load settings are
    /// kept for the next session.
    pub fn shutdown(&self) -> ControlResult<()> {
        let mut control = self.control.lock();
        let confirmed = self.stop_driver(&mut control);
        let was = control.state;
        control.state = RunState::Stopped;

        let closed = self.shared.core.lock().close_session();
        self.shared.ticks.store(0, Ordering::Release);
        {
            let mut analytics = self.analytics.lock();
            analytics.trips.reset();
            analytics.history.reset();
        }

        if was != RunState::Stopped {
            info!(from = ?was, confirmed, "stopped");
        }
        closed.map_err(|e| {
            error!(error = %e, "engine failed to close");
            e.into()
        })
    }

    fn start_locked(&self, control: &mut Control) -> ControlResult<()> {
        if control.state != RunState::Stopped {
            return Ok(());
        }
        control.state = RunState::Starting;
        info!(routes = self.catalog.len(), "starting engine");
        match self.shared.core.lock().start_engine() {
            Ok(()) => {
                control.state = RunState::Paused;
                info!("engine started");
                Ok(())
            }
            Err(e) => {
                control.state = RunState::Stopped;
                error!(error = %e, "engine failed to start");
                Err(e.into())
            }
        }
    }

    /// `false` if the driver was detached before it confirmed the stop.
    fn stop_driver(&self, control: &mut Control) -> bool {
        let Some(driver) = control.driver.take() else {
            return true;
        };
        match driver.stop(self.config.join_timeout) {
            None => true,
            Some(done) => {
                debug!("stop requested, not confirmed");
                control.detached = Some(done);
                false
            }
        }
    }

    // ── Spawning ──────────────────────────────────────────────────────────

    /// Queue `count` vehicles of `vehicle_type` on `route`.
    pub fn enqueue_spawn(
        &self,
        route:        impl Into<RouteId>,
        vehicle_type: impl Into<VehicleTypeId>,
        count:        u32,
    ) -> ControlResult<()> {
        let request = SpawnRequest::new(route, vehicle_type, count)?;
        self.send(Command::Spawn(request))
    }

    /// Queue `count` single vehicles, each on a uniformly random route.
    pub fn enqueue_spawn_random(&self, vehicle_type: impl Into<VehicleTypeId>, count: u32) -> ControlResult<()> {
        let vehicle_type = vehicle_type.into();
        if vehicle_type.is_blank() {
            return Err(SpawnError::EmptyVehicleType.into());
        }
        if count == 0 {
            return Err(SpawnError::ZeroCount.into());
        }
        if self.catalog.is_empty() {
            return Err(SpawnError::EmptyCatalog.into());
        }
        self.send(Command::SpawnRandom { vehicle_type, count })
    }

    /// Queue `count` vehicles on the catalog route at `index`.
    pub fn enqueue_spawn_at(
        &self,
        index:        usize,
        vehicle_type: impl Into<VehicleTypeId>,
        count:        u32,
    ) -> ControlResult<()> {
        let route = self
            .catalog
            .get(index)
            .ok_or(SpawnError::RouteIndexOutOfRange { index, len: self.catalog.len() })?;
        self.enqueue_spawn(route.id.clone(), vehicle_type, count)
    }

    /// Vehicles still waiting to be injected.
    pub fn pending_spawns(&self) -> u64 {
        self.with_core(|core| core.queue.pending_units())
    }

    // ── Signal rule ───────────────────────────────────────────────────────

    pub fn configure_rule(&self, light: impl Into<LightId>, edge: impl Into<EdgeId>, threshold: u32) -> ControlResult<()> {
        self.send(Command::ConfigureRule { light: light.into(), edge: edge.into(), threshold })
    }

    pub fn toggle_rule(&self) -> ControlResult<()> {
        self.send(Command::ToggleRule)
    }

    pub fn set_rule_phases(&self, red: usize, green: usize) -> ControlResult<()> {
        self.send(Command::SetRulePhases { red, green })
    }

    pub fn set_rule_interval_ms(&self, ms: u64) -> ControlResult<()> {
        self.send(Command::SetRuleInterval { ms })
    }

    pub fn rule_config(&self) -> SignalRuleConfig {
        self.with_core(|core| core.rule.config().clone())
    }

    // ── Load generator ────────────────────────────────────────────────────

    pub fn configure_load(&self, config: LoadConfig) -> ControlResult<()> {
        self.send(Command::ConfigureLoad(config))
    }

    pub fn toggle_load(&self) -> ControlResult<()> {
        self.send(Command::ToggleLoad)
    }

    pub fn load_config(&self) -> LoadConfig {
        self.with_core(|core| core.load.config().clone())
    }

    pub fn is_load_enabled(&self) -> bool {
        self.with_core(|core| core.load.is_enabled())
    }

    // ── Manual light control ──────────────────────────────────────────────

    pub fn set_phase(&self, light: impl Into<LightId>, phase: usize) -> ControlResult<()> {
        self.send(Command::SetPhase { light: light.into(), phase })
    }

    pub fn set_state(&self, light: impl Into<LightId>, state: impl Into<String>) -> ControlResult<()> {
        self.send(Command::SetState { light: light.into(), state: state.into() })
    }

    pub fn set_program(&self, light: impl Into<LightId>, program: impl Into<String>) -> ControlResult<()> {
        self.send(Command::SetProgram { light: light.into(), program: program.into() })
    }

    // ── Snapshots ─────────────────────────────────────────────────────────

    pub fn latest_vehicle_snapshot(&self) -> Arc<VehicleSnapshot> {
        self.vehicles.load()
    }

    pub fn latest_signal_snapshot(&self) -> Arc<Vec<LightSnapshot>> {
        self.lights.load()
    }

    pub fn vehicle(&self, id: &str) -> Option<VehicleSnapshotEntry> {
        self.vehicles.load().by_id(id).cloned()
    }

    pub fn vehicle_count(&self) -> usize {
        self.vehicles.load().len()
    }

    pub fn vehicles_on_edge(&self, edge: &str) -> usize {
        self.vehicles.load().count_on_edge(edge)
    }

    /// Mean speed (m/s) over the latest snapshot.
    pub fn average_speed(&self) -> f64 {
        self.vehicles.load().average_speed()
    }

    // ── Analytics ─────────────────────────────────────────────────────────

    /// Feed `sample` to the trip analytics and record the result in the
    /// metrics history.
    pub fn compute_metrics(&self, sample: &TrackingSample) -> Metrics {
        let mut analytics = self.analytics.lock();
        let metrics = analytics.trips.compute(sample);
        analytics.history.record(&metrics);
        metrics
    }

    pub fn metrics_history(&self) -> MetricsHistory {
        self.analytics.lock().history.clone()
    }

    /// A tracking sample built from the latest vehicle snapshot.  Edges the
    /// engine never reported a length for get [`FALLBACK_EDGE_LENGTH_M`].
    pub fn tracking_sample(&self) -> TrackingSample {
        let snapshot = self.vehicles.load();
        let mut edge_lengths = (*snapshot.edge_lengths).clone();
        let vehicles = snapshot
            .vehicles
            .iter()
            .map(|v| {
                edge_lengths.entry(v.edge.clone()).or_insert(FALLBACK_EDGE_LENGTH_M);
                VehicleTracking { id: v.id.clone(), edge: v.edge.clone(), speed: v.speed }
            })
            .collect();
        TrackingSample::new(snapshot.sim_time, vehicles, edge_lengths)
    }

    // ── Status ────────────────────────────────────────────────────────────

    pub fn state(&self) -> RunState {
        self.control.lock().state
    }

    pub fn is_backend_started(&self) -> bool {
        self.shared.core.lock().engine.is_connected()
    }

    pub fn is_auto_running(&self) -> bool {
        self.state() == RunState::Running
    }

    /// `true` while a driver detached by `pause` or `shutdown` is still
    /// finishing its last tick.
    pub fn is_driver_detached(&self) -> bool {
        let mut control = self.control.lock();
        let Some(done) = &control.detached else {
            return false;
        };
        if let Err(TryRecvError::Empty) = done.try_recv() {
            return true;
        }
        control.detached = None;
        false
    }

    /// Ticks run in the current engine session.
    pub fn tick_count(&self) -> u64 {
        self.shared.ticks.load(Ordering::Acquire)
    }

    pub fn catalog(&self) -> &Arc<RouteCatalog> {
        &self.catalog
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    /// Run `f` on the engine with the tick lock held, after queued commands
    /// were applied.  For engine queries the controller does not wrap.
    pub fn with_engine<T>(&self, f: impl FnOnce(&mut E) -> T) -> T {
        self.with_core(|core| f(&mut core.engine))
    }

    // ── Internals ─────────────────────────────────────────────────────────

    fn send(&self, command: Command) -> ControlResult<()> {
        debug!(command = command.name(), "command queued");
        self.commands.send(command).map_err(|_| ControlError::DriverGone)
    }

    fn with_core<T>(&self, f: impl FnOnce(&mut TickCore<E>) -> T) -> T {
        let mut core = self.shared.core.lock();
        core.apply_commands();
        f(&mut core)
    }
}

impl<E: SimEngine> Drop for StepController<E> {
    fn drop(&mut self) {
        if let Err(e) = self.shutdown() {
            warn!(error = %e, "shutdown on drop failed");
        }
    }
}
