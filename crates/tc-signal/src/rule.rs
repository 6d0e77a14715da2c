//! `SignalRuleEngine` — drive one light's phase from one edge's load.

use tracing::info;

use tc_core::{EdgeId, LightId};
use tc_engine::{EngineResult, SimEngine};
use tc_track::VehicleSnapshot;

use crate::config::MIN_DEBOUNCE_MS;
use crate::SignalRuleConfig;

/// What one [`SignalRuleEngine::tick`] decided.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RuleOutcome {
    Disabled,
    /// Enabled, but the light or the watched edge is not set.
    Unconfigured,
    /// The previous change was less than the debounce interval ago.
    Debounced,
    /// The light already shows the target phase.
    Unchanged { phase: usize, vehicles: usize },
    Applied { from: usize, to: usize, vehicles: usize },
}

#[derive(Debug, Default)]
pub struct SignalRuleEngine {
    config:          SignalRuleConfig,
    /// Clock reading (ms) of the last applied phase change.
    last_applied_ms: Option<u64>,
}

impl SignalRuleEngine {
    pub fn new(config: SignalRuleConfig) -> Self {
        Self { config: config.normalized(), last_applied_ms: None }
    }

    pub fn config(&self) -> &SignalRuleConfig {
        &self.config
    }

    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    /// Watch `edge` and drive `light`; a threshold below 1 is raised to 1.
    pub fn configure(&mut self, light: LightId, edge: EdgeId, threshold: u32) {
        self.config.light_id = light;
        self.config.watched_edge_id = edge;
        self.config.vehicle_threshold = threshold.max(1);
        info!(
            light = %self.config.light_id,
            edge = %self.config.watched_edge_id,
            threshold = self.config.vehicle_threshold,
            "signal rule configured"
        );
    }

    /// Flip enabled/disabled and return the new state.
    pub fn toggle(&mut self) -> bool {
        self.config.enabled = !self.config.enabled;
        info!(enabled = self.config.enabled, "signal rule toggled");
        self.config.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.config.enabled = enabled;
    }

    pub fn set_phases(&mut self, red: usize, green: usize) {
        self.config.red_phase_index = red;
        self.config.green_phase_index = green;
    }

    /// Minimum time between two applied changes; values below 50 ms are
    /// raised to 50.
    pub fn set_interval_ms(&mut self, ms: u64) {
        self.config.debounce_interval_ms = ms.max(MIN_DEBOUNCE_MS);
    }

    /// Forget the last change so the next tick may act immediately.
    pub fn reset_debounce(&mut self) {
        self.last_applied_ms = None;
    }

    /// Evaluate the rule against the latest snapshot.
    ///
    /// Engine errors are returned to the caller; they never disable the
    /// rule and never start a debounce window.
    pub fn tick<E: SimEngine>(
        &mut self,
        engine:   &mut E,
        snapshot: &VehicleSnapshot,
        now_ms:   u64,
    ) -> EngineResult<RuleOutcome> {
        let cfg = &self.config;
        if !cfg.enabled {
            return Ok(RuleOutcome::Disabled);
        }
        if !cfg.is_targeted() {
            return Ok(RuleOutcome::Unconfigured);
        }
        if let Some(last) = self.last_applied_ms {
            if now_ms.saturating_sub(last) < cfg.debounce_interval_ms {
                return Ok(RuleOutcome::Debounced);
            }
        }

        let vehicles = snapshot.count_on_edge(cfg.watched_edge_id.as_str());
        let target = if vehicles >= cfg.vehicle_threshold as usize {
            cfg.green_phase_index
        } else {
            cfg.red_phase_index
        };

        let current = engine.light_phase(&cfg.light_id)?;
        if current == target {
            return Ok(RuleOutcome::Unchanged { phase: current, vehicles });
        }
        engine.set_light_phase(&cfg.light_id, target)?;
        info!(
            light = %cfg.light_id,
            edge = %cfg.watched_edge_id,
            vehicles,
            threshold = cfg.vehicle_threshold,
            from = current,
            to = target,
            "signal rule switched phase"
        );
        self.last_applied_ms = Some(now_ms);
        Ok(RuleOutcome::Applied { from: current, to: target, vehicles })
    }
}
