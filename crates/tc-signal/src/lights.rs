//! Per-tick pull of every traffic light's state.

use tc_core::LightId;
use tc_engine::{EngineResult, SimEngine};

/// One light as seen at the end of a tick.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LightSnapshot {
    pub id:          LightId,
    pub phase_index: usize,
    /// Signal characters, one per controlled link (`"GrGr"`).
    pub state:       String,
    pub program_id:  String,
}

/// Read phase, state, and program of every light the engine knows.
///
/// Fails as a whole if any query fails, so callers never publish a list
/// that is missing some lights.
pub fn pull_lights<E: SimEngine>(engine: &mut E) -> EngineResult<Vec<LightSnapshot>> {
    let ids = engine.light_ids()?;
    let mut out = Vec::with_capacity(ids.len());
    for id in ids {
        let phase_index = engine.light_phase(&id)?;
        let state = engine.light_state(&id)?;
        let program_id = engine.light_program(&id)?;
        out.push(LightSnapshot { id, phase_index, state, program_id });
    }
    Ok(out)
}
