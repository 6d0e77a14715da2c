//! Fluent builder for constructing a [`StepController`].

use std::sync::Arc;

use tc_core::{Clock, RouteCatalog, SimRng, SystemClock};
use tc_engine::SimEngine;
use tc_signal::{SignalRuleConfig, SignalRuleEngine};
use tc_spawn::{LoadConfig, LoadGenerator, RouteRegistrar, SpawnQueue};
use tc_track::{Published, VehicleSnapshotTracker};

use crate::throttle::LogThrottle;
use crate::tick::TickCore;
use crate::{ControlResult, ControllerConfig, NoopObserver, StepController, TickObserver};

/// Fluent builder for [`StepController<E>`].
///
/// # Required inputs
///
/// - `E: SimEngine` — the engine; not started until the first `run`,
///   `play`, or `step_once`
///
/// # Optional inputs (have defaults)
///
/// | Method          | Default                       |
/// |-----------------|-------------------------------|
/// | `.catalog(c)`   | `RouteCatalog::empty()`       |
/// | `.config(c)`    | `ControllerConfig::default()` |
/// | `.clock(c)`     | `SystemClock`                 |
/// | `.observer(o)`  | `NoopObserver`                |
/// | `.rule(c)`      | disabled, untargeted rule     |
/// | `.load(c)`      | disabled periodic burst       |
///
/// # Example
///
/// ```rust,ignore
/// let controller = ControllerBuilder::new(MemoryEngine::new(network))
///     .catalog(Arc::new(catalog))
///     .config(ControllerConfig::default().with_seed(7))
///     .build()?;
/// controller.play()?;
/// ```
pub struct ControllerBuilder<E: SimEngine> {
    engine:   E,
    catalog:  Option<Arc<RouteCatalog>>,
    config:   ControllerConfig,
    clock:    Option<Arc<dyn Clock>>,
    observer: Option<Box<dyn TickObserver>>,
    rule:     SignalRuleConfig,
    load:     LoadConfig,
}

impl<E: SimEngine> ControllerBuilder<E> {
    pub fn new(engine: E) -> Self {
        Self {
            engine,
            catalog:  None,
            config:   ControllerConfig::default(),
            clock:    None,
            observer: None,
            rule:     SignalRuleConfig::default(),
            load:     LoadConfig::default(),
        }
    }

    /// Routes available for spawning, loaded once and shared by reference.
    pub fn catalog(mut self, catalog: Arc<RouteCatalog>) -> Self {
        self.catalog = Some(catalog);
        self
    }

    pub fn config(mut self, config: ControllerConfig) -> Self {
        self.config = config;
        self
    }

    /// Wall clock used for rule debouncing and log throttling.
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn observer(mut self, observer: impl TickObserver) -> Self {
        self.observer = Some(Box::new(observer));
        self
    }

    /// Initial signal rule settings.
    pub fn rule(mut self, config: SignalRuleConfig) -> Self {
        self.rule = config;
        self
    }

    /// Initial load generator settings.  The generator starts disabled.
    pub fn load(mut self, config: LoadConfig) -> Self {
        self.load = config;
        self
    }

    /// Validate the configuration and assemble an idle, `Stopped`
    /// controller.
    pub fn build(self) -> ControlResult<StepController<E>> {
        self.config.validate()?;

        let catalog = self.catalog.unwrap_or_else(|| Arc::new(RouteCatalog::empty()));
        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock::new()));
        let observer = self.observer.unwrap_or_else(|| Box::new(NoopObserver));
        let (commands_tx, commands_rx) = crossbeam_channel::unbounded();

        let core = TickCore {
            engine:    self.engine,
            catalog:   Arc::clone(&catalog),
            queue:     SpawnQueue::new(),
            registrar: RouteRegistrar::new(),
            load:      LoadGenerator::new(self.load),
            tracker:   VehicleSnapshotTracker::new(),
            rule:      SignalRuleEngine::new(self.rule),
            lights:    Arc::new(Published::new(Vec::new())),
            rng:       SimRng::new(self.config.seed),
            clock,
            throttle:  LogThrottle::new(self.config.throttle_window_ms),
            commands:  commands_rx,
            observer,
            max_spawns_per_tick: self.config.max_spawns_per_tick,
            tick:      0,
        };
        Ok(StepController::assemble(self.config, catalog, core, commands_tx))
    }
}
