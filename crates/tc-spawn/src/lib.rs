//! `tc-spawn` — getting vehicles into the engine without stalling it.
//!
//! # Crate layout
//!
//! | Module        | Contents                                                   |
//! |---------------|------------------------------------------------------------|
//! | [`queue`]     | `SpawnRequest`, `SpawnQueue`, `DrainReport`                |
//! | [`registrar`] | `RouteRegistrar` — one-time route registration per session |
//! | [`load`]      | `LoadPolicy`, `LoadConfig`, `LoadGenerator`                |
//! | [`error`]     | `SpawnError`, `SpawnResult<T>`                             |
//!
//! # Flow
//!
//! ```text
//! callers / LoadGenerator ──enqueue──▶ SpawnQueue ──drain(max)──▶ SimEngine::add_vehicle
//!                                          ▲
//!                              RouteRegistrar::ensure (before first drain)
//! ```
//!
//! Enqueuing never touches the engine.  Only `drain`, called once per tick
//! by the controller, issues `add_vehicle` calls, and never more than
//! `max_per_tick` of them.

pub mod error;
pub mod load;
pub mod queue;
pub mod registrar;


pub use error::{SpawnError, SpawnResult};
pub use load::{LoadConfig, LoadGenerator, LoadPolicy};
pub use queue::{DrainReport, SpawnQueue, SpawnRequest};
pub use registrar::RouteRegistrar;
