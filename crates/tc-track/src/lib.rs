//! `tc-track` — which vehicles are alive, and what readers get to see.
//!
//! # Crate layout
//!
//! | Module       | Contents                                                    |
//! |--------------|-------------------------------------------------------------|
//! | [`publish`]  | `Published<T>` — single-reference-swap publication slot      |
//! | [`snapshot`] | `VehicleSnapshotEntry`, `VehicleSnapshot` + query helpers    |
//! | [`tracker`]  | `VehicleSnapshotTracker`, `RefreshReport`                    |
//!
//! # Reconciliation (one tick)
//!
//! ```text
//! departed ids ──▶ insert ┐
//! arrived ids  ──▶ remove ├─▶ ActiveIdSet ──sorted copy──▶ vehicle_state(id) per id
//! teleports    ──▶ remove ┘                                  │Found     │NotFound
//!                                                            ▼          ▼
//!                                                   snapshot entry   mark gone
//!                                                            │          │
//!                                   publish (swap) ◀─────────┘   remove after loop
//! ```
//!
//! Readers hold an `Arc` to a fully built snapshot.  The tracker never
//! mutates a published snapshot; it builds the next one and swaps it in.

pub mod publish;
pub mod snapshot;
pub mod tracker;


pub use publish::Published;
pub use snapshot::{VehicleSnapshot, VehicleSnapshotEntry};
pub use tracker::{RefreshReport, VehicleSnapshotTracker};
