use tc_core::{EdgeId, LightId, RouteId, VehicleId};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("engine is not connected")]
    NotConnected,

    #[error("engine is already started")]
    AlreadyStarted,

    #[error("engine failed to start: {0}")]
    Start(String),

    #[error("engine does not support {0}")]
    Unsupported(&'static str),

    #[error("route {0} is not known to the engine")]
    UnknownRoute(RouteId),

    #[error("route {0} is already registered")]
    DuplicateRoute(RouteId),

    #[error("route {0} references unknown edge {1}")]
    UnknownEdge(RouteId, EdgeId),

    #[error("vehicle {0} already exists")]
    DuplicateVehicle(VehicleId),

    #[error("invalid depart time {0:?}")]
    InvalidDepart(String),

    #[error("traffic light {0} is not known to the engine")]
    UnknownLight(LightId),

    #[error("traffic light {light}: {reason}")]
    InvalidPhase { light: LightId, reason: String },
}

impl EngineError {
    /// `true` when the engine is merely unreachable right now (not started,
    /// or momentarily disconnected).  Callers swallow these and retry on the
    /// next tick.
    pub fn is_transient(&self) -> bool {
        matches!(self, EngineError::NotConnected)
    }
}

pub type EngineResult<T> = Result<T, EngineError>;
