//! `TickCore` — everything one tick touches, behind one lock.

use std::fmt;
use std::sync::Arc;

use crossbeam_channel::Receiver;
use tracing::{debug, info, trace, warn};

use tc_core::{Clock, LightId, RouteCatalog, SimRng};
use tc_engine::{EngineResult, SimEngine};
use tc_signal::{LightSnapshot, RuleOutcome, SignalRuleEngine, pull_lights};
use tc_spawn::{LoadGenerator, RouteRegistrar, SpawnQueue};
use tc_track::{Published, RefreshReport, VehicleSnapshotTracker};

use crate::throttle::LogThrottle;
use crate::{Command, ControlError, TickObserver};

// ── Reports ───────────────────────────────────────────────────────────────────

/// The stages of one tick, in execution order.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum TickStage {
    /// Route registration ahead of the first drain of a session.
    Routes,
    Spawn,
    Step,
    Refresh,
    Rule,
    Lights,
}

impl TickStage {
    pub fn as_str(self) -> &'static str {
        match self {
            TickStage::Routes => "routes",
            TickStage::Spawn => "spawn",
            TickStage::Step => "step",
            TickStage::Refresh => "refresh",
            TickStage::Rule => "rule",
            TickStage::Lights => "lights",
        }
    }
}

impl fmt::Display for TickStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A stage that failed and was skipped.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TickFailure {
    pub stage:     TickStage,
    pub transient: bool,
    pub message:   String,
}

/// What one tick did.  Produced even when stages failed.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TickReport {
    /// 1-based within the current engine session.
    pub tick:        u64,
    /// Commands applied at the start of the tick.
    pub commands:    usize,
    /// Requests the load generator queued.
    pub load_queued: u32,
    pub spawned:     usize,
    /// `add_vehicle` calls the engine refused.
    pub rejected:    usize,
    pub stepped:     bool,
    /// Engine clock after the step, from the published snapshot.
    pub sim_time:    f64,
    /// Entries in the published vehicle snapshot.
    pub vehicles:    usize,
    pub refresh:     Option<RefreshReport>,
    pub lights:      usize,
    pub rule:        Option<RuleOutcome>,
    pub failures:    Vec<TickFailure>,
}

impl TickReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn failed(&self, stage: TickStage) -> bool {
        self.failures.iter().any(|f| f.stage == stage)
    }
}

// ── TickCore ──────────────────────────────────────────────────────────────────

/// Owned per-controller state.  Only ever touched with the controller's
/// tick lock held, so the engine is never driven from two threads at once.
pub(crate) struct TickCore<E: SimEngine> {
    pub(crate) engine:    E,
    pub(crate) catalog:   Arc<RouteCatalog>,
    pub(crate) queue:     SpawnQueue,
    pub(crate) registrar: RouteRegistrar,
    pub(crate) load:      LoadGenerator,
    pub(crate) tracker:   VehicleSnapshotTracker,
    pub(crate) rule:      SignalRuleEngine,
    pub(crate) lights:    Arc<Published<Vec<LightSnapshot>>>,
    pub(crate) rng:       SimRng,
    pub(crate) clock:     Arc<dyn Clock>,
    pub(crate) throttle:  LogThrottle,
    pub(crate) commands:  Receiver<Command>,
    pub(crate) observer:  Box<dyn TickObserver>,
    pub(crate) max_spawns_per_tick: usize,
    pub(crate) tick:      u64,
}

impl<E: SimEngine> TickCore<E> {
    // ── Tick ──────────────────────────────────────────────────────────────

    /// Run one full tick:
    ///
    /// ```text
    /// commands → load generator → routes + spawn drain → engine step
    ///          → tracker refresh → signal rule → light pull
    /// ```
    ///
    /// A failing stage is logged and recorded; the remaining stages still
    /// run and the next tick starts from the top.
    pub(crate) fn run_tick(&mut self) -> TickReport {
        self.tick += 1;
        let tick = self.tick;
        self.observer.on_tick_start(tick);
        let mut report = TickReport { tick, ..TickReport::default() };

        report.commands = self.apply_commands();

        // ① Load generator
        report.load_queued = self.load.tick(&mut self.queue, &self.catalog, &mut self.rng);

        // ② Spawn drain, after the session's routes exist in the engine
        if !self.queue.is_empty() {
            match self.registrar.ensure(&mut self.engine, &self.catalog) {
                Err(e) => self.fail(&mut report, TickStage::Routes, e.into()),
                Ok(()) => match self.queue.drain(&mut self.engine, self.max_spawns_per_tick) {
                    Ok(drained) => {
                        report.spawned = drained.added.len();
                        report.rejected = drained.rejected;
                    }
                    Err(e) => self.fail(&mut report, TickStage::Spawn, e.into()),
                },
            }
        }

        // ③ Engine step
        match self.engine.step() {
            Ok(()) => report.stepped = true,
            Err(e) => self.fail(&mut report, TickStage::Step, e.into()),
        }

        // ④ Vehicle snapshot
        match self.tracker.refresh(&mut self.engine, tick) {
            Ok(refresh) => {
                report.vehicles = refresh.published;
                report.refresh = Some(refresh);
            }
            Err(e) => self.fail(&mut report, TickStage::Refresh, e.into()),
        }
        let snapshot = self.tracker.latest();
        report.sim_time = snapshot.sim_time;

        // ⑤ Signal rule
        let now_ms = self.clock.now_ms();
        match self.rule.tick(&mut self.engine, &snapshot, now_ms) {
            Ok(outcome) => report.rule = Some(outcome),
            Err(e) => self.fail(&mut report, TickStage::Rule, e.into()),
        }

        // ⑥ Light snapshot
        match pull_lights(&mut self.engine) {
            Ok(lights) => {
                report.lights = lights.len();
                self.lights.store(lights);
            }
            Err(e) => self.fail(&mut report, TickStage::Lights, e.into()),
        }

        trace!(tick, vehicles = report.vehicles, spawned = report.spawned, failures = report.failures.len(), "tick done");
        self.observer.on_tick_end(&report);
        report
    }

    /// Log a failed stage (transient ones through the throttle) and record
    /// it in the report.
    fn fail(&mut self, report: &mut TickReport, stage: TickStage, err: ControlError) {
        let transient = err.is_transient();
        if transient {
            if let Some(suppressed) = self.throttle.allow(self.clock.now_ms()) {
                warn!(tick = report.tick, stage = %stage, suppressed, error = %err, "engine unavailable");
            }
        } else {
            warn!(tick = report.tick, stage = %stage, error = %err, "tick stage failed");
        }
        report.failures.push(TickFailure { stage, transient, message: err.to_string() });
    }

    // ── Commands ──────────────────────────────────────────────────────────

    /// Apply every queued command in send order.  Returns how many ran.
    pub(crate) fn apply_commands(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(command) = self.commands.try_recv() {
            trace!(command = command.name(), "applying command");
            self.apply(command);
            applied += 1;
        }
        applied
    }

    fn apply(&mut self, command: Command) {
        match command {
            Command::Spawn(request) => self.queue.push(request),
            Command::SpawnRandom { vehicle_type, count } => {
                if let Err(e) = self.queue.enqueue_random(&self.catalog, &mut self.rng, vehicle_type, count) {
                    warn!(count, error = %e, "random spawn dropped");
                }
            }
            Command::ConfigureRule { light, edge, threshold } => self.rule.configure(light, edge, threshold),
            Command::ToggleRule => {
                self.rule.toggle();
            }
            Command::SetRulePhases { red, green } => {
                self.rule.set_phases(red, green);
                info!(red, green, "signal rule phases set");
            }
            Command::SetRuleInterval { ms } => {
                self.rule.set_interval_ms(ms);
                info!(interval_ms = self.rule.config().debounce_interval_ms, "signal rule interval set");
            }
            Command::ConfigureLoad(config) => self.load.configure(config),
            Command::ToggleLoad => {
                self.load.toggle();
            }
            Command::SetPhase { light, phase } => {
                let result = self.engine.set_light_phase(&light, phase);
                self.manual_light("set_phase", &light, result);
            }
            Command::SetState { light, state } => {
                let result = self.engine.set_light_state(&light, &state);
                self.manual_light("set_state", &light, result);
            }
            Command::SetProgram { light, program } => {
                let result = self.engine.set_light_program(&light, &program);
                self.manual_light("set_program", &light, result);
            }
        }
    }

    fn manual_light(&mut self, action: &'static str, light: &LightId, result: EngineResult<()>) {
        match result {
            Ok(()) => info!(light = %light, action, "manual light change applied"),
            Err(e) if e.is_transient() => {
                if let Some(suppressed) = self.throttle.allow(self.clock.now_ms()) {
                    warn!(light = %light, action, suppressed, error = %e, "engine unavailable");
                }
            }
            Err(e) => warn!(light = %light, action, error = %e, "manual light change failed"),
        }
    }

    // ── Session ───────────────────────────────────────────────────────────

    /// Start the engine unless it is already connected.
    pub(crate) fn start_engine(&mut self) -> EngineResult<()> {
        if self.engine.is_connected() {
            return Ok(());
        }
        self.engine.start()
    }

    /// Close the engine and forget everything tied to its session.  The
    /// spawn queue and rule/load configuration survive; random route choice
    /// continues on a stream derived from the old one.
    pub(crate) fn close_session(&mut self) -> EngineResult<()> {
        let closed = if self.engine.is_connected() { self.engine.close() } else { Ok(()) };
        self.registrar.reset();
        self.tracker.reset();
        self.rule.reset_debounce();
        self.load.reset();
        self.throttle.reset();
        self.lights.store(Vec::new());
        self.rng = self.rng.child(self.tick);
        debug!(ticks = self.tick, "session closed");
        self.observer.on_shutdown(self.tick);
        self.tick = 0;
        closed
    }
}
