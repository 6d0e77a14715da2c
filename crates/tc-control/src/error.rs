use tc_engine::EngineError;
use tc_spawn::SpawnError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ControlError {
    #[error("engine error: {0}")]
    Engine(#[from] EngineError),

    #[error("spawn request rejected: {0}")]
    Spawn(#[from] SpawnError),

    /// The tick core's command channel is closed.
    #[error("controller command channel is closed")]
    DriverGone,

    #[error("controller configuration error: {0}")]
    Config(String),

    #[error("failed to spawn driver thread: {0}")]
    Thread(#[from] std::io::Error),
}

impl ControlError {
    /// `true` if the engine was merely unreachable; the next tick retries.
    pub fn is_transient(&self) -> bool {
        match self {
            ControlError::Engine(e) => e.is_transient(),
            ControlError::Spawn(e) => e.is_transient(),
            _ => false,
        }
    }
}

pub type ControlResult<T> = Result<T, ControlError>;
