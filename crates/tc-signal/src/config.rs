use tc_core::{EdgeId, LightId};

pub const DEFAULT_THRESHOLD: u32 = 5;
pub const DEFAULT_DEBOUNCE_MS: u64 = 1_000;
pub const MIN_DEBOUNCE_MS: u64 = 50;
pub const DEFAULT_GREEN_PHASE: usize = 1;
pub const DEFAULT_RED_PHASE: usize = 0;

/// Settings of the single signal rule.
///
/// Unset ids are empty; the rule does nothing until both are set.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SignalRuleConfig {
    pub light_id:             LightId,
    pub watched_edge_id:      EdgeId,
    /// Always ≥ 1.
    pub vehicle_threshold:    u32,
    /// Always ≥ 50.
    pub debounce_interval_ms: u64,
    pub green_phase_index:    usize,
    pub red_phase_index:      usize,
    pub enabled:              bool,
}

impl Default for SignalRuleConfig {
    fn default() -> Self {
        Self {
            light_id:             LightId::default(),
            watched_edge_id:      EdgeId::default(),
            vehicle_threshold:    DEFAULT_THRESHOLD,
            debounce_interval_ms: DEFAULT_DEBOUNCE_MS,
            green_phase_index:    DEFAULT_GREEN_PHASE,
            red_phase_index:      DEFAULT_RED_PHASE,
            enabled:              false,
        }
    }
}

impl SignalRuleConfig {
    pub fn with_target(
        mut self,
        light:     impl Into<LightId>,
        edge:      impl Into<EdgeId>,
        threshold: u32,
    ) -> Self {
        self.light_id = light.into();
        self.watched_edge_id = edge.into();
        self.vehicle_threshold = threshold.max(1);
        self
    }

    pub fn with_phases(mut self, red: usize, green: usize) -> Self {
        self.red_phase_index = red;
        self.green_phase_index = green;
        self
    }

    pub fn with_debounce_ms(mut self, ms: u64) -> Self {
        self.debounce_interval_ms = ms.max(MIN_DEBOUNCE_MS);
        self
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// `true` once both the light and the watched edge are set.
    pub fn is_targeted(&self) -> bool {
        !self.light_id.is_blank() && !self.watched_edge_id.is_blank()
    }

    /// Re-apply the lower bounds (for configs built by hand or deserialized).
    pub fn normalized(mut self) -> Self {
        self.vehicle_threshold = self.vehicle_threshold.max(1);
        self.debounce_interval_ms = self.debounce_interval_ms.max(MIN_DEBOUNCE_MS);
        self
    }
}
