//! `tc-analytics` — trip times, per-edge load, and congestion.
//!
//! # Crate layout
//!
//! | Module      | Contents                                                   |
//! |-------------|------------------------------------------------------------|
//! | [`sample`]  | `TrackingSample`, `VehicleTracking` (input)                |
//! | [`metrics`] | `Metrics`, `TripStats`, `TripBucket`, policy constants     |
//! | [`trips`]   | `TripAnalytics` — start-time map and finished-trip history |
//! | [`history`] | `MetricsHistory`, `MetricsPoint` — bounded rolling series  |
//!
//! # Trip model
//!
//! A trip starts the first time a vehicle id appears in a sample and ends
//! on the first sample that no longer contains it.  Trip time is the
//! difference of the two sample times, clamped at zero.  Nothing here talks
//! to the engine; the controller feeds samples built from its snapshots.

pub mod history;
pub mod metrics;
pub mod sample;
pub mod trips;


pub use history::{MetricsHistory, MetricsPoint};
pub use metrics::{
    Metrics, TripBucket, TripStats, CONGESTION_MIN_VEHICLES, CONGESTION_STOPPED_SHARE,
    LONG_TRIP_SECS, SHORT_TRIP_SECS, STOPPED_SPEED,
};
pub use sample::{TrackingSample, VehicleTracking};
pub use trips::TripAnalytics;
