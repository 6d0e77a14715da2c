//! Control intents queued by callers and applied inside the tick lock.
//!
//! Callers never mutate the queue, the rule, or the load generator
//! directly.  They validate their input, send a [`Command`], and return
//! without waiting for a running tick.  The tick core drains the channel
//! at the start of every tick and before every query that reads the state
//! those commands change, so commands from all threads take effect in the
//! order they were sent.

use tc_core::{EdgeId, LightId, VehicleTypeId};
use tc_spawn::{LoadConfig, SpawnRequest};

#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// Append an already validated request.
    Spawn(SpawnRequest),
    /// `count` single-vehicle requests on random catalog routes.
    SpawnRandom { vehicle_type: VehicleTypeId, count: u32 },

    ConfigureRule { light: LightId, edge: EdgeId, threshold: u32 },
    ToggleRule,
    SetRulePhases { red: usize, green: usize },
    SetRuleInterval { ms: u64 },

    ConfigureLoad(LoadConfig),
    ToggleLoad,

    SetPhase { light: LightId, phase: usize },
    SetState { light: LightId, state: String },
    SetProgram { light: LightId, program: String },
}

impl Command {
    /// Short name for logs.
    pub fn name(&self) -> &'static str {
        match self {
            Command::Spawn(_) => "spawn",
            Command::SpawnRandom { .. } => "spawn_random",
            Command::ConfigureRule { .. } => "configure_rule",
            Command::ToggleRule => "toggle_rule",
            Command::SetRulePhases { .. } => "set_rule_phases",
            Command::SetRuleInterval { .. } => "set_rule_interval",
            Command::ConfigureLoad(_) => "configure_load",
            Command::ToggleLoad => "toggle_load",
            Command::SetPhase { .. } => "set_phase",
            Command::SetState { .. } => "set_state",
            Command::SetProgram { .. } => "set_program",
        }
    }
}
