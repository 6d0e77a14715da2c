use tc_engine::EngineError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SpawnError {
    #[error("spawn request has an empty route id")]
    EmptyRoute,

    #[error("spawn request has an empty vehicle type")]
    EmptyVehicleType,

    #[error("spawn count must be at least 1")]
    ZeroCount,

    #[error("route index {index} out of range (catalog has {len} routes)")]
    RouteIndexOutOfRange { index: usize, len: usize },

    #[error("route catalog is empty")]
    EmptyCatalog,

    #[error("engine error: {0}")]
    Engine(#[from] EngineError),
}

impl SpawnError {
    /// `true` if the underlying engine was merely unreachable.
    pub fn is_transient(&self) -> bool {
        matches!(self, SpawnError::Engine(e) if e.is_transient())
    }
}

pub type SpawnResult<T> = Result<T, SpawnError>;
