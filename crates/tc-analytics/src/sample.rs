//! Input to [`TripAnalytics::compute`][crate::TripAnalytics::compute].

use std::collections::BTreeMap;

use tc_core::{EdgeId, VehicleId};

/// One vehicle in a sample.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct VehicleTracking {
    pub id:    VehicleId,
    pub edge:  EdgeId,
    /// Metres per second.
    pub speed: f64,
}

impl VehicleTracking {
    pub fn new(id: impl Into<VehicleId>, edge: impl Into<EdgeId>, speed: f64) -> Self {
        Self { id: id.into(), edge: edge.into(), speed }
    }
}

/// Everything the analytics need about one moment of the simulation.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TrackingSample {
    /// Simulation clock, seconds.
    pub time_secs:    f64,
    pub vehicles:     Vec<VehicleTracking>,
    /// Edge → length in metres.  Edges missing here get no density.
    pub edge_lengths: BTreeMap<EdgeId, f64>,
}

impl TrackingSample {
    pub fn new(time_secs: f64, vehicles: Vec<VehicleTracking>, edge_lengths: BTreeMap<EdgeId, f64>) -> Self {
        Self { time_secs, vehicles, edge_lengths }
    }
}
