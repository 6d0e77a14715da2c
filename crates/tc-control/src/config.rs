//! `ControllerConfig` — pacing, bounds, and history sizes.

use std::time::Duration;

use crate::{ControlError, ControlResult};

pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_millis(100);
pub const DEFAULT_JOIN_TIMEOUT: Duration = Duration::from_millis(500);
pub const DEFAULT_MAX_SPAWNS_PER_TICK: usize = 50;
pub const DEFAULT_THROTTLE_WINDOW_MS: u64 = 1_500;
pub const DEFAULT_TRIP_HISTORY: usize = 10_000;
pub const DEFAULT_METRICS_HISTORY: usize = 600;

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ControllerConfig {
    /// Pause between two driver ticks.  Best effort; a slow tick is not
    /// made up for.
    pub tick_interval: Duration,

    /// How long `pause`/`shutdown` wait for the driver to exit before
    /// detaching it.
    pub join_timeout: Duration,

    /// Upper bound on `add_vehicle` calls per tick.
    pub max_spawns_per_tick: usize,

    /// Seed for random route choice.  The same seed and the same command
    /// sequence pick the same routes.
    pub seed: u64,

    /// Transient engine failures are logged at most once per window.
    pub throttle_window_ms: u64,

    /// Finished trips kept for trip statistics.
    pub trip_history_capacity: usize,

    /// Points kept by the metrics history.
    pub metrics_history_capacity: usize,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            tick_interval:            DEFAULT_TICK_INTERVAL,
            join_timeout:             DEFAULT_JOIN_TIMEOUT,
            max_spawns_per_tick:      DEFAULT_MAX_SPAWNS_PER_TICK,
            seed:                     42,
            throttle_window_ms:       DEFAULT_THROTTLE_WINDOW_MS,
            trip_history_capacity:    DEFAULT_TRIP_HISTORY,
            metrics_history_capacity: DEFAULT_METRICS_HISTORY,
        }
    }
}

impl ControllerConfig {
    pub fn with_tick_interval(mut self, interval: Duration) -> Self {
        self.tick_interval = interval;
        self
    }

    pub fn with_join_timeout(mut self, timeout: Duration) -> Self {
        self.join_timeout = timeout;
        self
    }

    pub fn with_max_spawns_per_tick(mut self, max: usize) -> Self {
        self.max_spawns_per_tick = max;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_throttle_window_ms(mut self, ms: u64) -> Self {
        self.throttle_window_ms = ms;
        self
    }

    pub fn with_trip_history_capacity(mut self, capacity: usize) -> Self {
        self.trip_history_capacity = capacity;
        self
    }

    pub fn with_metrics_history_capacity(mut self, capacity: usize) -> Self {
        self.metrics_history_capacity = capacity;
        self
    }

    pub fn validate(&self) -> ControlResult<()> {
        if self.max_spawns_per_tick == 0 {
            return Err(ControlError::Config("max_spawns_per_tick must be at least 1".into()));
        }
        if self.join_timeout.is_zero() {
            return Err(ControlError::Config("join_timeout must be non-zero".into()));
        }
        if self.trip_history_capacity == 0 || self.metrics_history_capacity == 0 {
            return Err(ControlError::Config("history capacities must be at least 1".into()));
        }
        Ok(())
    }
}
