//! `LoadGenerator` — bulk traffic on top of the spawn queue.
//!
//! Two policies share one surface:
//!
//! - **Periodic burst**: while enabled, every `interval_ticks` ticks queue
//!   `vehicles_per_interval` single-vehicle requests on random routes.  The
//!   tick counter restarts whenever the generator is toggled, so the first
//!   burst comes `interval_ticks` ticks after enabling.
//! - **One-shot burst**: on the first tick after enabling, queue
//!   `total_vehicles` single-vehicle requests on random routes, then do
//!   nothing until disabled and enabled again.
//!
//! The generator only ever enqueues; the queue's per-tick cap still bounds
//! how fast the vehicles actually reach the engine.

use tracing::{info, warn};

use tc_core::{RouteCatalog, SimRng, VehicleTypeId};

use crate::SpawnQueue;

pub const DEFAULT_INTERVAL_TICKS: u32 = 30;
pub const DEFAULT_VEHICLES_PER_INTERVAL: u32 = 10;
pub const DEFAULT_TOTAL_VEHICLES: u32 = 100;
pub const DEFAULT_VEHICLE_TYPE: &str = "veh_passenger";

// ── Configuration ─────────────────────────────────────────────────────────────

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum LoadPolicy {
    PeriodicBurst { interval_ticks: u32, vehicles_per_interval: u32 },
    OneShotBurst { total_vehicles: u32 },
}

impl LoadPolicy {
    /// Periodic bursts of `vehicles_per_interval` every 30 ticks.
    pub fn periodic(vehicles_per_interval: u32) -> Self {
        LoadPolicy::PeriodicBurst {
            interval_ticks:        DEFAULT_INTERVAL_TICKS,
            vehicles_per_interval: vehicles_per_interval.max(1),
        }
    }

    pub fn one_shot(total_vehicles: u32) -> Self {
        LoadPolicy::OneShotBurst { total_vehicles: total_vehicles.max(1) }
    }

    /// Clamp every count to at least 1.
    pub fn normalized(self) -> Self {
        match self {
            LoadPolicy::PeriodicBurst { interval_ticks, vehicles_per_interval } => LoadPolicy::PeriodicBurst {
                interval_ticks:        interval_ticks.max(1),
                vehicles_per_interval: vehicles_per_interval.max(1),
            },
            LoadPolicy::OneShotBurst { total_vehicles } => {
                LoadPolicy::OneShotBurst { total_vehicles: total_vehicles.max(1) }
            }
        }
    }
}

impl Default for LoadPolicy {
    fn default() -> Self {
        LoadPolicy::PeriodicBurst {
            interval_ticks:        DEFAULT_INTERVAL_TICKS,
            vehicles_per_interval: DEFAULT_VEHICLES_PER_INTERVAL,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LoadConfig {
    pub policy:       LoadPolicy,
    pub vehicle_type: VehicleTypeId,
}

impl Default for LoadConfig {
    fn default() -> Self {
        Self { policy: LoadPolicy::default(), vehicle_type: VehicleTypeId::from(DEFAULT_VEHICLE_TYPE) }
    }
}

impl LoadConfig {
    pub fn with_policy(mut self, policy: LoadPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_vehicle_type(mut self, vehicle_type: impl Into<VehicleTypeId>) -> Self {
        self.vehicle_type = vehicle_type.into();
        self
    }
}

// ── LoadGenerator ─────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct LoadGenerator {
    config:       LoadConfig,
    enabled:      bool,
    tick_counter: u32,
    /// One-shot latch; cleared when the generator is disabled.
    executed:     bool,
}

impl LoadGenerator {
    pub fn new(config: LoadConfig) -> Self {
        let mut generator = Self::default();
        generator.configure(config);
        generator
    }

    /// Replace the policy and vehicle type.  Does not change enabled state.
    pub fn configure(&mut self, config: LoadConfig) {
        let mut config = config;
        config.policy = config.policy.normalized();
        if config.vehicle_type.is_blank() {
            config.vehicle_type = VehicleTypeId::from(DEFAULT_VEHICLE_TYPE);
        }
        info!(policy = ?config.policy, vehicle_type = %config.vehicle_type, "load generator configured");
        self.config = config;
    }

    pub fn config(&self) -> &LoadConfig {
        &self.config
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Flip enabled/disabled and return the new state.
    pub fn toggle(&mut self) -> bool {
        self.set_enabled(!self.enabled);
        self.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
        self.tick_counter = 0;
        if !enabled {
            self.executed = false;
        }
        info!(enabled, "load generator toggled");
    }

    /// Forget progress toward the next burst and the one-shot latch.
    pub fn reset(&mut self) {
        self.tick_counter = 0;
        self.executed = false;
    }

    /// Called once per tick.  Returns the number of requests queued.
    pub fn tick(&mut self, queue: &mut SpawnQueue, catalog: &RouteCatalog, rng: &mut SimRng) -> u32 {
        if !self.enabled {
            return 0;
        }
        let count = match self.config.policy {
            LoadPolicy::PeriodicBurst { interval_ticks, vehicles_per_interval } => {
                self.tick_counter += 1;
                if self.tick_counter < interval_ticks {
                    return 0;
                }
                self.tick_counter = 0;
                vehicles_per_interval
            }
            LoadPolicy::OneShotBurst { total_vehicles } => {
                if self.executed {
                    return 0;
                }
                // Latched even if the burst below is refused; toggle to retry.
                self.executed = true;
                total_vehicles
            }
        };

        match queue.enqueue_random(catalog, rng, self.config.vehicle_type.clone(), count) {
            Ok(queued) => {
                info!(queued, routes = catalog.len(), "load burst queued");
                queued
            }
            Err(e) => {
                warn!(error = %e, "load burst skipped");
                0
            }
        }
    }
}
