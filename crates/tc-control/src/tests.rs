//! Unit tests for tc-control.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, Sender};
use tc_analytics::{TrackingSample, VehicleTracking};
use tc_core::{EdgeId, LightId, ManualClock, RouteCatalog, RouteId, RouteInfo, VehicleId};
use tc_engine::{
    EngineError, EngineResult, LightDef, Lookup, MemoryEngine, MemoryNetworkBuilder, SimEngine,
    VehicleSpawn, VehicleState,
};
use tc_signal::RuleOutcome;
use tc_spawn::{LoadConfig, LoadPolicy, SpawnError};

use crate::{
    ControlError, ControllerBuilder, ControllerConfig, LogThrottle, RunState, StepController,
    TickObserver, TickReport, TickStage, FALLBACK_EDGE_LENGTH_M,
};

// ── Helpers ───────────────────────────────────────────────────────────────────

/// `in` (250 m) → junction J1 → `out` (100 m), both 10 m/s, so a vehicle
/// covers 1 m per 0.1 s step.  J1 holds `in` on red in phase 0 and lets it
/// go in phase 1; both phases last far longer than any test.
fn engine() -> MemoryEngine {
    let mut b = MemoryNetworkBuilder::new();
    let w = b.add_node(0.0, 0.0);
    let c = b.add_node(250.0, 0.0);
    let e = b.add_node(350.0, 0.0);
    b.add_edge("in", w, c, 10.0);
    b.add_edge("out", c, e, 10.0);
    b.add_light(
        LightDef::new("J1", vec![EdgeId::from("in")])
            .with_phase("r", 10_000.0)
            .with_phase("G", 10_000.0),
    );
    MemoryEngine::new(b.build())
}

fn catalog() -> Arc<RouteCatalog> {
    let routes = vec![
        RouteInfo::new("r0", vec![EdgeId::from("in"), EdgeId::from("out")]),
        RouteInfo::new("r1", vec![EdgeId::from("out")]),
    ];
    Arc::new(RouteCatalog::new(routes).unwrap())
}

fn builder<E: SimEngine>(engine: E) -> (ControllerBuilder<E>, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new(0));
    let b = ControllerBuilder::new(engine)
        .catalog(catalog())
        .clock(clock.clone())
        .config(ControllerConfig::default().with_tick_interval(Duration::from_millis(1)));
    (b, clock)
}

fn controller() -> StepController<MemoryEngine> {
    builder(engine()).0.build().unwrap()
}

fn wait_for(mut cond: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        thread::sleep(Duration::from_millis(1));
    }
    cond()
}

/// Delegates to a [`MemoryEngine`] but never reports edge lengths.
struct NoLengths(MemoryEngine);

impl SimEngine for NoLengths {
    fn start(&mut self) -> EngineResult<()> { self.0.start() }
    fn close(&mut self) -> EngineResult<()> { self.0.close() }
    fn is_connected(&self) -> bool { self.0.is_connected() }
    fn step(&mut self) -> EngineResult<()> { self.0.step() }
    fn time(&mut self) -> EngineResult<f64> { self.0.time() }
    fn add_route(&mut self, route: &RouteId, edges: &[EdgeId]) -> EngineResult<()> {
        self.0.add_route(route, edges)
    }
    fn add_vehicle(&mut self, spawn: &VehicleSpawn) -> EngineResult<()> { self.0.add_vehicle(spawn) }
    fn departed_ids(&mut self) -> EngineResult<Vec<VehicleId>> { self.0.departed_ids() }
    fn arrived_ids(&mut self) -> EngineResult<Vec<VehicleId>> { self.0.arrived_ids() }
    fn vehicle_state(&mut self, id: &VehicleId) -> EngineResult<Lookup<VehicleState>> {
        self.0.vehicle_state(id)
    }
    fn edge_length(&mut self, _edge: &EdgeId) -> EngineResult<Lookup<f64>> { Ok(Lookup::NotFound) }
    fn light_ids(&mut self) -> EngineResult<Vec<LightId>> { self.0.light_ids() }
    fn light_phase(&mut self, light: &LightId) -> EngineResult<usize> { self.0.light_phase(light) }
    fn set_light_phase(&mut self, light: &LightId, phase: usize) -> EngineResult<()> {
        self.0.set_light_phase(light, phase)
    }
    fn light_state(&mut self, light: &LightId) -> EngineResult<String> { self.0.light_state(light) }
    fn light_program(&mut self, light: &LightId) -> EngineResult<String> { self.0.light_program(light) }
}

/// Delegates to a [`MemoryEngine`]; every `step` blocks until the test
/// opens the gate.
struct Gated {
    inner:   MemoryEngine,
    entered: Arc<AtomicBool>,
    gate:    Receiver<()>,
}

fn gated() -> (Gated, Arc<AtomicBool>, Sender<()>) {
    let entered = Arc::new(AtomicBool::new(false));
    let (open, gate) = crossbeam_channel::unbounded();
    (Gated { inner: engine(), entered: entered.clone(), gate }, entered, open)
}

impl SimEngine for Gated {
    fn start(&mut self) -> EngineResult<()> { self.inner.start() }
    fn close(&mut self) -> EngineResult<()> { self.inner.close() }
    fn is_connected(&self) -> bool { self.inner.is_connected() }
    fn step(&mut self) -> EngineResult<()> {
        self.entered.store(true, Ordering::SeqCst);
        let _ = self.gate.recv_timeout(Duration::from_secs(5));
        self.inner.step()
    }
    fn time(&mut self) -> EngineResult<f64> { self.inner.time() }
    fn add_route(&mut self, route: &RouteId, edges: &[EdgeId]) -> EngineResult<()> {
        self.inner.add_route(route, edges)
    }
    fn add_vehicle(&mut self, spawn: &VehicleSpawn) -> EngineResult<()> { self.inner.add_vehicle(spawn) }
    fn departed_ids(&mut self) -> EngineResult<Vec<VehicleId>> { self.inner.departed_ids() }
    fn arrived_ids(&mut self) -> EngineResult<Vec<VehicleId>> { self.inner.arrived_ids() }
    fn vehicle_state(&mut self, id: &VehicleId) -> EngineResult<Lookup<VehicleState>> {
        self.inner.vehicle_state(id)
    }
    fn edge_length(&mut self, edge: &EdgeId) -> EngineResult<Lookup<f64>> { self.inner.edge_length(edge) }
    fn light_ids(&mut self) -> EngineResult<Vec<LightId>> { self.inner.light_ids() }
    fn light_phase(&mut self, light: &LightId) -> EngineResult<usize> { self.inner.light_phase(light) }
    fn set_light_phase(&mut self, light: &LightId, phase: usize) -> EngineResult<()> {
        self.inner.set_light_phase(light, phase)
    }
    fn light_state(&mut self, light: &LightId) -> EngineResult<String> { self.inner.light_state(light) }
    fn light_program(&mut self, light: &LightId) -> EngineResult<String> { self.inner.light_program(light) }
}

/// Counts callbacks from the tick core.
#[derive(Clone, Default)]
struct Counting {
    starts:    Arc<AtomicU64>,
    ends:      Arc<AtomicU64>,
    shutdowns: Arc<AtomicU64>,
}

impl TickObserver for Counting {
    fn on_tick_start(&mut self, _tick: u64) {
        self.starts.fetch_add(1, Ordering::SeqCst);
    }

    fn on_tick_end(&mut self, _report: &TickReport) {
        self.ends.fetch_add(1, Ordering::SeqCst);
    }

    fn on_shutdown(&mut self, _final_tick: u64) {
        self.shutdowns.fetch_add(1, Ordering::SeqCst);
    }
}

// ── Config ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod config {
    use super::*;

    #[test]
    fn defaults() {
        let c = ControllerConfig::default();
        assert_eq!(c.tick_interval, Duration::from_millis(100));
        assert_eq!(c.join_timeout, Duration::from_millis(500));
        assert_eq!(c.max_spawns_per_tick, 50);
        assert_eq!(c.throttle_window_ms, 1_500);
        assert!(c.validate().is_ok());
    }

    #[test]
    fn builder_rejects_invalid_config() {
        let cfg = ControllerConfig::default().with_max_spawns_per_tick(0);
        let err = ControllerBuilder::new(engine()).config(cfg).build().err().unwrap();
        assert!(matches!(err, ControlError::Config(_)));

        let cfg = ControllerConfig::default().with_join_timeout(Duration::ZERO);
        assert!(cfg.validate().is_err());
    }
}

// ── LogThrottle ───────────────────────────────────────────────────────────────

#[cfg(test)]
mod throttle {
    use super::*;

    #[test]
    fn one_message_per_window() {
        let mut t = LogThrottle::new(1_500);
        assert_eq!(t.allow(0), Some(0));
        assert_eq!(t.allow(10), None);
        assert_eq!(t.allow(1_499), None);
        assert_eq!(t.allow(1_500), Some(2));
        assert_eq!(t.allow(1_501), None);
        t.reset();
        assert_eq!(t.allow(1_502), Some(0));
    }
}

// ── Lifecycle ─────────────────────────────────────────────────────────────────

#[cfg(test)]
mod lifecycle {
    use super::*;
    use tracing_test::traced_test;

    #[test]
    fn starts_stopped() {
        let c = controller();
        assert_eq!(c.state(), RunState::Stopped);
        assert!(!c.is_backend_started());
        assert!(!c.is_auto_running());
        assert_eq!(c.tick_count(), 0);
        assert!(c.latest_vehicle_snapshot().is_empty());
    }

    #[test]
    fn run_is_idempotent() {
        let c = controller();
        c.run().unwrap();
        assert_eq!(c.state(), RunState::Paused);
        assert!(c.is_backend_started());
        c.run().unwrap();
        assert_eq!(c.state(), RunState::Paused);
    }

    #[test]
    fn failed_start_stays_stopped_and_can_retry() {
        let mut eng = engine();
        eng.fail_next_start("no license");
        let c = builder(eng).0.build().unwrap();
        let err = c.run().unwrap_err();
        assert!(matches!(err, ControlError::Engine(EngineError::Start(_))));
        assert_eq!(c.state(), RunState::Stopped);
        assert!(c.step_once().is_ok());
        assert_eq!(c.state(), RunState::Paused);
    }

    #[test]
    fn step_once_auto_starts() {
        let c = controller();
        let report = c.step_once().unwrap();
        assert_eq!(report.tick, 1);
        assert!(report.stepped);
        assert!(report.is_clean());
        assert!(c.is_backend_started());
        assert_eq!(c.tick_count(), 1);
        assert!((report.sim_time - 0.1).abs() < 1e-9);
    }

    #[test]
    fn play_then_pause() {
        let c = controller();
        assert_eq!(c.play().unwrap(), RunState::Running);
        assert!(c.is_auto_running());
        assert_eq!(c.play().unwrap(), RunState::Running);
        assert!(wait_for(|| c.tick_count() >= 3));

        assert_eq!(c.pause(), RunState::Paused);
        assert!(!c.is_auto_running());
        let frozen = c.tick_count();
        thread::sleep(Duration::from_millis(20));
        assert_eq!(c.tick_count(), frozen);

        // Pausing again is a no-op; stepping still works.
        assert_eq!(c.pause(), RunState::Paused);
        assert_eq!(c.step_once().unwrap().tick, frozen + 1);
    }

    #[test]
    fn pause_when_stopped_is_noop() {
        let c = controller();
        assert_eq!(c.pause(), RunState::Stopped);
    }

    #[test]
    fn shutdown_is_idempotent_and_resets_session() {
        let c = controller();
        c.enqueue_spawn("r0", "car", 2).unwrap();
        c.step_once().unwrap();
        assert_eq!(c.vehicle_count(), 2);

        c.shutdown().unwrap();
        c.shutdown().unwrap();
        assert_eq!(c.state(), RunState::Stopped);
        assert!(!c.is_backend_started());
        assert_eq!(c.tick_count(), 0);
        assert!(c.latest_vehicle_snapshot().is_empty());
        assert!(c.latest_signal_snapshot().is_empty());
    }

    #[test]
    fn shutdown_stops_driver() {
        let c = controller();
        c.play().unwrap();
        assert!(wait_for(|| c.tick_count() >= 1));
        c.shutdown().unwrap();
        assert_eq!(c.state(), RunState::Stopped);
        assert!(!c.is_auto_running());
    }

    #[test]
    fn restart_opens_fresh_session() {
        let c = controller();
        c.enqueue_spawn("r0", "car", 1).unwrap();
        c.step_once().unwrap();
        c.restart().unwrap();
        assert_eq!(c.state(), RunState::Paused);
        assert_eq!(c.tick_count(), 0);

        // Routes are registered again in the new session.
        c.enqueue_spawn("r0", "car", 1).unwrap();
        let report = c.step_once().unwrap();
        assert_eq!(report.spawned, 1);
        assert!(report.is_clean());
        assert!(c.with_engine(|e| e.has_route(&RouteId::from("r0"))));
    }

    #[test]
    fn observer_sees_ticks_and_shutdown() {
        let counting = Counting::default();
        let c = builder(engine()).0.observer(counting.clone()).build().unwrap();
        c.step_once().unwrap();
        c.step_once().unwrap();
        c.shutdown().unwrap();
        assert_eq!(counting.starts.load(Ordering::SeqCst), 2);
        assert_eq!(counting.ends.load(Ordering::SeqCst), 2);
        assert_eq!(counting.shutdowns.load(Ordering::SeqCst), 1);
    }

    #[test]
    #[traced_test]
    fn pause_reports_unconfirmed_stop() {
        let (engine, entered, open) = gated();
        let c = builder(engine)
            .0
            .config(
                ControllerConfig::default()
                    .with_tick_interval(Duration::from_millis(1))
                    .with_join_timeout(Duration::from_millis(5)),
            )
            .build()
            .unwrap();
        c.play().unwrap();
        assert!(wait_for(|| entered.load(Ordering::SeqCst)));

        assert_eq!(c.pause(), RunState::Paused);
        assert!(c.is_driver_detached());
        assert!(logs_contain("confirmed=false"));

        // The detached driver finishes its tick and exits.
        open.send(()).unwrap();
        assert!(wait_for(|| !c.is_driver_detached()));
        drop(open);
        c.shutdown().unwrap();
    }

    #[test]
    fn confirmed_stop_leaves_nothing_detached() {
        let c = controller();
        c.play().unwrap();
        assert!(wait_for(|| c.tick_count() >= 1));
        c.pause();
        assert!(!c.is_driver_detached());
    }

    #[test]
    fn drop_while_running_joins_driver() {
        let c = controller();
        c.play().unwrap();
        assert!(wait_for(|| c.tick_count() >= 1));
        drop(c);
    }
}

// ── Spawning ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod spawning {
    use super::*;

    #[test]
    fn invalid_requests_rejected_at_the_boundary() {
        let c = controller();
        assert!(matches!(c.enqueue_spawn("", "car", 1), Err(ControlError::Spawn(SpawnError::EmptyRoute))));
        assert!(matches!(c.enqueue_spawn("r0", "", 1), Err(ControlError::Spawn(SpawnError::EmptyVehicleType))));
        assert!(matches!(c.enqueue_spawn("r0", "car", 0), Err(ControlError::Spawn(SpawnError::ZeroCount))));
        assert!(matches!(
            c.enqueue_spawn_at(2, "car", 1),
            Err(ControlError::Spawn(SpawnError::RouteIndexOutOfRange { index: 2, len: 2 }))
        ));
        assert_eq!(c.pending_spawns(), 0);
    }

    #[test]
    fn drain_is_capped_per_tick() {
        let (b, _) = builder(engine());
        let c = b.config(ControllerConfig::default().with_max_spawns_per_tick(2)).build().unwrap();
        c.enqueue_spawn("r0", "car", 3).unwrap();
        assert_eq!(c.pending_spawns(), 3);

        let first = c.step_once().unwrap();
        assert_eq!(first.spawned, 2);
        assert_eq!(c.pending_spawns(), 1);

        let second = c.step_once().unwrap();
        assert_eq!(second.spawned, 1);
        assert_eq!(c.pending_spawns(), 0);
        assert_eq!(c.with_engine(|e| e.add_vehicle_calls()), 3);
    }

    #[test]
    fn spawned_vehicles_show_up_in_the_same_tick() {
        let c = controller();
        c.enqueue_spawn_at(0, "car", 2).unwrap();
        let report = c.step_once().unwrap();
        assert_eq!(report.vehicles, 2);
        let snap = c.latest_vehicle_snapshot();
        assert_eq!(snap.count_on_edge("in"), 2);
        let first = &snap.vehicles[0];
        assert!(first.id.as_str().starts_with("inj_"));
        assert_eq!(first.route.as_str(), "r0");
        assert_eq!(first.vehicle_type.as_str(), "car");
        assert_eq!(c.vehicle(first.id.as_str()).map(|v| v.edge), Some(EdgeId::from("in")));
        assert_eq!(c.vehicles_on_edge("in"), 2);
    }

    #[test]
    fn random_spawns_use_catalog_routes() {
        let c = controller();
        c.enqueue_spawn_random("car", 6).unwrap();
        assert_eq!(c.pending_spawns(), 6);
        c.step_once().unwrap();
        let snap = c.latest_vehicle_snapshot();
        assert_eq!(snap.len(), 6);
        assert!(snap.vehicles.iter().all(|v| v.route.as_str() == "r0" || v.route.as_str() == "r1"));
    }

    #[test]
    fn random_spawn_needs_routes() {
        let c = ControllerBuilder::new(engine()).build().unwrap();
        assert!(matches!(c.enqueue_spawn_random("car", 1), Err(ControlError::Spawn(SpawnError::EmptyCatalog))));
    }

    #[test]
    fn queue_survives_shutdown() {
        let c = controller();
        c.run().unwrap();
        c.enqueue_spawn("r0", "car", 2).unwrap();
        c.shutdown().unwrap();
        assert_eq!(c.pending_spawns(), 2);
        assert_eq!(c.step_once().unwrap().spawned, 2);
    }

    #[test]
    fn load_generator_one_shot() {
        let c = controller();
        c.configure_load(LoadConfig::default().with_policy(LoadPolicy::one_shot(5))).unwrap();
        c.toggle_load().unwrap();
        assert!(c.is_load_enabled());

        let report = c.step_once().unwrap();
        assert_eq!(report.load_queued, 5);
        assert_eq!(report.spawned, 5);
        assert_eq!(c.step_once().unwrap().load_queued, 0);
    }

    #[test]
    fn load_generator_periodic() {
        let c = controller();
        c.configure_load(LoadConfig::default().with_policy(LoadPolicy::PeriodicBurst {
            interval_ticks:        3,
            vehicles_per_interval: 2,
        }))
        .unwrap();
        c.toggle_load().unwrap();
        let queued: Vec<u32> = (0..6).map(|_| c.step_once().unwrap().load_queued).collect();
        assert_eq!(queued, vec![0, 0, 2, 0, 0, 2]);
        assert_eq!(c.load_config().vehicle_type.as_str(), "veh_passenger");
    }
}

// ── Tick sequence ─────────────────────────────────────────────────────────────

#[cfg(test)]
mod tick {
    use super::*;
    use tracing_test::traced_test;

    #[test]
    fn rule_reacts_to_fresh_snapshot() {
        let c = controller();
        c.configure_rule("J1", "in", 1).unwrap();
        c.toggle_rule().unwrap();
        c.enqueue_spawn("r0", "car", 1).unwrap();

        let report = c.step_once().unwrap();
        assert_eq!(report.rule, Some(RuleOutcome::Applied { from: 0, to: 1, vehicles: 1 }));
        let lights = c.latest_signal_snapshot();
        assert_eq!(lights.len(), 1);
        assert_eq!(lights[0].phase_index, 1);
        assert_eq!(lights[0].state, "G");
    }

    #[test]
    fn rule_debounces_on_the_injected_clock() {
        let (b, clock) = builder(engine());
        let c = b.build().unwrap();
        c.configure_rule("J1", "in", 1).unwrap();
        c.set_rule_interval_ms(1_000).unwrap();
        c.toggle_rule().unwrap();
        assert!(c.rule_config().enabled);

        c.enqueue_spawn("r0", "car", 1).unwrap();
        c.step_once().unwrap();
        let id = c.latest_vehicle_snapshot().vehicles[0].id.clone();
        c.with_engine(|e| e.forget_vehicle(&id));

        clock.set_ms(999);
        assert_eq!(c.step_once().unwrap().rule, Some(RuleOutcome::Debounced));
        clock.set_ms(1_000);
        assert_eq!(c.step_once().unwrap().rule, Some(RuleOutcome::Applied { from: 1, to: 0, vehicles: 0 }));
    }

    #[test]
    fn rule_phases_are_configurable() {
        let c = controller();
        c.set_rule_phases(1, 0).unwrap();
        c.configure_rule("J1", "in", 5).unwrap();
        c.toggle_rule().unwrap();
        let report = c.step_once().unwrap();
        assert_eq!(report.rule, Some(RuleOutcome::Applied { from: 0, to: 1, vehicles: 0 }));
    }

    #[test]
    fn manual_light_commands() {
        let c = controller();
        c.run().unwrap();
        c.set_phase("J1", 1).unwrap();
        c.step_once().unwrap();
        assert_eq!(c.latest_signal_snapshot()[0].phase_index, 1);

        c.set_state("J1", "y").unwrap();
        c.step_once().unwrap();
        assert_eq!(c.latest_signal_snapshot()[0].state, "y");

        c.set_program("J1", "0").unwrap();
        c.step_once().unwrap();
        let light = &c.latest_signal_snapshot()[0];
        assert_eq!((light.phase_index, light.program_id.as_str()), (0, "0"));
    }

    #[test]
    fn failed_manual_command_does_not_fail_the_tick() {
        let c = controller();
        c.set_phase("nope", 1).unwrap();
        let report = c.step_once().unwrap();
        assert_eq!(report.commands, 1);
        assert!(report.is_clean());
    }

    #[test]
    fn stale_vehicle_dropped_without_crash() {
        let c = controller();
        c.enqueue_spawn("r0", "car", 2).unwrap();
        c.step_once().unwrap();
        let gone = c.latest_vehicle_snapshot().vehicles[0].id.clone();
        c.with_engine(|e| e.forget_vehicle(&gone));

        let report = c.step_once().unwrap();
        assert_eq!(report.refresh.as_ref().map(|r| r.stale), Some(1));
        assert!(c.vehicle(gone.as_str()).is_none());
        assert_eq!(c.vehicle_count(), 1);
    }

    #[test]
    fn disconnected_engine_fails_stages_not_the_driver() {
        let c = controller();
        c.step_once().unwrap();
        c.with_engine(|e| e.disconnect());

        let report = c.step_once().unwrap();
        assert!(!report.stepped);
        for stage in [TickStage::Step, TickStage::Refresh, TickStage::Lights] {
            assert!(report.failed(stage), "{stage} should have failed");
        }
        assert!(report.failures.iter().all(|f| f.transient));
        assert_eq!(report.rule, Some(RuleOutcome::Disabled));
        // Previous snapshot stays published.
        assert_eq!(c.latest_vehicle_snapshot().tick, 1);
    }

    #[test]
    #[traced_test]
    fn transient_failures_are_throttled() {
        let (b, clock) = builder(engine());
        let c = b.build().unwrap();
        c.run().unwrap();
        c.with_engine(|e| e.disconnect());

        c.step_once().unwrap();
        c.step_once().unwrap();
        clock.advance_ms(1_500);
        c.step_once().unwrap();

        logs_assert(|lines: &[&str]| {
            match lines.iter().filter(|l| l.contains("engine unavailable")).count() {
                2 => Ok(()),
                n => Err(format!("expected 2 throttled warnings, got {n}")),
            }
        });
        assert!(logs_contain("suppressed=5"));
    }

    #[test]
    fn driver_publishes_while_readers_read() {
        let c = Arc::new(controller());
        c.enqueue_spawn("r0", "car", 20).unwrap();
        c.play().unwrap();

        let reader = {
            let c = Arc::clone(&c);
            thread::spawn(move || {
                let mut last_tick = 0;
                for _ in 0..200 {
                    let snap = c.latest_vehicle_snapshot();
                    assert!(snap.tick >= last_tick);
                    assert!(snap.vehicles.windows(2).all(|w| w[0].id < w[1].id));
                    last_tick = snap.tick;
                    thread::yield_now();
                }
            })
        };
        reader.join().unwrap();
        assert!(wait_for(|| c.vehicle_count() == 20));
        c.pause();
    }
}

// ── Analytics ─────────────────────────────────────────────────────────────────

#[cfg(test)]
mod analytics {
    use super::*;

    #[test]
    fn tracking_sample_mirrors_snapshot() {
        let c = controller();
        c.enqueue_spawn("r0", "car", 2).unwrap();
        c.step_once().unwrap();
        let sample = c.tracking_sample();
        assert_eq!(sample.vehicles.len(), 2);
        assert!((sample.time_secs - 0.1).abs() < 1e-9);
        assert_eq!(sample.edge_lengths.get("in").copied(), Some(250.0));
        assert!(sample.vehicles.iter().all(|v| v.edge.as_str() == "in"));
    }

    #[test]
    fn tracking_sample_falls_back_for_unknown_lengths() {
        let c = builder(NoLengths(engine())).0.build().unwrap();
        c.enqueue_spawn("r0", "car", 1).unwrap();
        c.step_once().unwrap();
        assert_eq!(c.tracking_sample().edge_lengths.get("in").copied(), Some(FALLBACK_EDGE_LENGTH_M));
    }

    #[test]
    fn trip_finishes_when_vehicle_vanishes() {
        let c = controller();
        c.enqueue_spawn("r0", "car", 1).unwrap();
        c.step_once().unwrap();
        let first = c.compute_metrics(&c.tracking_sample());
        assert_eq!(first.vehicle_count, 1);
        assert_eq!(first.trips.finished, 0);

        for _ in 0..10 {
            c.step_once().unwrap();
        }
        let id = c.latest_vehicle_snapshot().vehicles[0].id.clone();
        c.with_engine(|e| e.forget_vehicle(&id));
        c.step_once().unwrap();

        let m = c.compute_metrics(&c.tracking_sample());
        assert_eq!(m.vehicle_count, 0);
        assert_eq!(m.trips.finished, 1);
        assert!((m.trips.average_secs - 1.1).abs() < 1e-9);
        assert_eq!(m.trips.short, 1);
        assert_eq!(c.metrics_history().len(), 2);
    }

    #[test]
    fn compute_metrics_accepts_external_samples() {
        let c = controller();
        let mut sample = TrackingSample::new(
            1.0,
            vec![VehicleTracking::new("A", "edgeX", 0.05), VehicleTracking::new("B", "edgeX", 5.0)],
            Default::default(),
        );
        sample.edge_lengths.insert(EdgeId::from("edgeX"), 200.0);
        let m = c.compute_metrics(&sample);
        assert!((m.density_for_edge("edgeX") - 10.0).abs() < 1e-9);
        assert!((m.average_speed - 2.525).abs() < 1e-9);
        assert_eq!(c.metrics_history().vehicle_counts(), vec![2]);
    }

    #[test]
    fn shutdown_clears_analytics() {
        let c = controller();
        c.compute_metrics(&TrackingSample::new(0.0, vec![VehicleTracking::new("a", "e", 1.0)], Default::default()));
        c.shutdown().unwrap();
        assert!(c.metrics_history().is_empty());
        let m = c.compute_metrics(&TrackingSample::default());
        assert_eq!(m.trips.finished, 0);
    }
}
