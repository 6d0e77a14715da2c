//! `tc-core` — foundational types for the `traffic_ctl` workspace.
//!
//! Every other `tc-*` crate depends on this one.  It has no `tc-*`
//! dependencies and only a handful of external ones (`rand`, `thiserror`,
//! `csv`, `serde`).
//!
//! # What lives here
//!
//! | Module        | Contents                                                   |
//! |---------------|------------------------------------------------------------|
//! | [`ids`]       | `VehicleId`, `RouteId`, `EdgeId`, `LightId`, `VehicleTypeId` |
//! | [`clock`]     | `Clock` trait, `SystemClock`, `ManualClock`                |
//! | [`rng`]       | `SimRng` (seeded, single-threaded)                         |
//! | [`catalog`]   | `RouteInfo`, `RouteCatalog`                                |
//! | [`loader`]    | `load_routes_csv`, `load_routes_reader`                    |
//! | [`error`]     | `CoreError`, `CoreResult`                                  |
//!
//! # Feature flags
//!
//! | Flag    | Effect                                                     |
//! |---------|------------------------------------------------------------|
//! | `serde` | Adds `Serialize`/`Deserialize` to all public types.        |

pub mod catalog;
pub mod clock;
pub mod error;
pub mod ids;
pub mod loader;
pub mod rng;


// ── Re-exports ────────────────────────────────────────────────────────────────

pub use catalog::{RouteCatalog, RouteInfo};
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{CoreError, CoreResult};
pub use ids::{EdgeId, LightId, RouteId, VehicleId, VehicleTypeId};
pub use loader::{load_routes_csv, load_routes_reader};
pub use rng::SimRng;
