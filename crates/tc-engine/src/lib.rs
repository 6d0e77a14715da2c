//! `tc-engine` — the contract with the external microscopic simulator.
//!
//! # Crate layout
//!
//! | Module      | Contents                                                        |
//! |-------------|-----------------------------------------------------------------|
//! | [`engine`]  | `SimEngine` trait, `Lookup<T>`, `VehicleState`, `VehicleSpawn`  |
//! | [`error`]   | `EngineError`, `EngineResult<T>`                                |
//! | [`network`] | `MemoryNetwork` + `MemoryNetworkBuilder` (edges, lights)        |
//! | [`state`]   | `MemVehicle` — per-vehicle movement state inside `MemoryEngine` |
//! | [`memory`]  | `MemoryEngine` — in-process implementation of `SimEngine`       |
//!
//! # Threading
//!
//! Engines are single-threaded internally.  `SimEngine` is `Send` so it can
//! move onto the driver thread, but every call takes `&mut self`: the
//! controller guarantees that exactly one thread drives an engine at a time.
//!
//! # Liveness queries
//!
//! Asking about a vehicle the engine has already dropped is not an error;
//! it returns [`Lookup::NotFound`].  Errors are reserved for the engine
//! itself being unreachable or rejecting a request.

pub mod engine;
pub mod error;
pub mod memory;
pub mod network;
pub mod state;

#[cfg(test)]
mod tests;

pub use engine::{Lookup, PlacementHints, Position, SimEngine, VehicleSpawn, VehicleState};
pub use error::{EngineError, EngineResult};
pub use memory::MemoryEngine;
pub use network::{LightDef, MemoryNetwork, MemoryNetworkBuilder, NodeIndex};
pub use state::MemVehicle;
