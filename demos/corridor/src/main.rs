//! corridor — drive one signalised crossing through the step controller.
//!
//! Runs the in-memory engine in the background, keeps it fed from the load
//! generator, lets the signal rule give `w_in` green when traffic builds
//! up, and logs trip and congestion metrics every few hundred
//! milliseconds.
//!
//! Usage: `corridor [routes.csv]`.  Without an argument the embedded route
//! table below is used.  Set `RUST_LOG=debug` for per-tick detail.

mod network;

use std::io::Cursor;
use std::path::Path;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::Result;
use tracing::info;
use tracing_subscriber::EnvFilter;

use tc_analytics::Metrics;
use tc_control::{ControllerBuilder, ControllerConfig, TickObserver, TickReport};
use tc_core::{load_routes_csv, load_routes_reader};
use tc_engine::MemoryEngine;
use tc_spawn::{LoadConfig, LoadPolicy};

use network::build_network;

// ── Constants ─────────────────────────────────────────────────────────────────

const SEED:              u64 = 42;
const TICK_INTERVAL_MS:  u64 = 5;
const REPORT_EVERY_MS:   u64 = 250;
const REPORTS:           u32 = 12;
const RULE_THRESHOLD:    u32 = 4;
const BURST_EVERY_TICKS: u32 = 25;
const BURST_VEHICLES:    u32 = 6;

const ROUTES_CSV: &str = "\
route_id,edges,display_name\n\
r_we,w_in c_e,West to east\n\
r_ws,w_in c_s,West to south\n\
r_ns,n_in c_s,North to south\n\
r_ne,n_in c_e,\n\
";

// ── Observer ──────────────────────────────────────────────────────────────────

/// Logs every tick that had a failing stage.
struct FailureLogger;

impl TickObserver for FailureLogger {
    fn on_tick_end(&mut self, report: &TickReport) {
        for failure in &report.failures {
            tracing::debug!(tick = report.tick, stage = %failure.stage, error = %failure.message, "stage failed");
        }
    }
}

// ── main ──────────────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let catalog = match std::env::args().nth(1) {
        Some(path) => load_routes_csv(Path::new(&path))?,
        None => load_routes_reader(Cursor::new(ROUTES_CSV))?,
    };
    info!(routes = catalog.len(), "route catalog loaded");
    let catalog = Arc::new(catalog);

    let config = ControllerConfig::default()
        .with_seed(SEED)
        .with_tick_interval(Duration::from_millis(TICK_INTERVAL_MS));
    let controller = ControllerBuilder::new(MemoryEngine::new(build_network()))
        .catalog(Arc::clone(&catalog))
        .config(config)
        .observer(FailureLogger)
        .load(LoadConfig::default().with_policy(LoadPolicy::PeriodicBurst {
            interval_ticks:        BURST_EVERY_TICKS,
            vehicles_per_interval: BURST_VEHICLES,
        }))
        .build()?;

    controller.configure_rule("C", "w_in", RULE_THRESHOLD)?;
    controller.set_rule_phases(1, 0)?;
    controller.toggle_rule()?;
    controller.toggle_load()?;
    controller.enqueue_spawn("r_ns", "veh_passenger", 5)?;

    let t0 = Instant::now();
    controller.play()?;
    for _ in 0..REPORTS {
        thread::sleep(Duration::from_millis(REPORT_EVERY_MS));
        let metrics = controller.compute_metrics(&controller.tracking_sample());
        log_metrics(controller.tick_count(), &metrics);
    }
    controller.pause();

    // A few manual ticks with the light forced to serve the side street.
    controller.set_phase("C", 1)?;
    for _ in 0..3 {
        let report = controller.step_once()?;
        info!(tick = report.tick, vehicles = report.vehicles, sim_time = report.sim_time, "manual step");
    }
    if let Some(light) = controller.latest_signal_snapshot().first() {
        info!(light = %light.id, phase = light.phase_index, state = %light.state, "light after manual steps");
    }

    let history = controller.metrics_history();
    let peak = history.vehicle_counts().into_iter().max().unwrap_or(0);
    info!(
        points = history.len(),
        peak_vehicles = peak,
        ticks = controller.tick_count(),
        pending = controller.pending_spawns(),
        wall_ms = t0.elapsed().as_millis() as u64,
        "run finished"
    );

    controller.shutdown()?;
    Ok(())
}

fn log_metrics(tick: u64, m: &Metrics) {
    let congested_edges = m.congested_edges();
    let congested: Vec<&str> = congested_edges.iter().map(|e| e.as_str()).collect();
    info!(
        tick,
        sim_time = m.sim_time,
        vehicles = m.vehicle_count,
        stopped = m.stopped_count,
        avg_kmh = m.average_speed_kmh(),
        w_in_density = m.density_for_edge("w_in"),
        trips = m.trips.finished,
        avg_trip_s = m.trips.average_secs,
        congested = ?congested,
        "metrics"
    );
}
