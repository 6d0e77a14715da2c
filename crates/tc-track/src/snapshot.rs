//! Immutable per-tick view of every tracked vehicle.

use std::collections::BTreeMap;
use std::sync::Arc;

use tc_core::{EdgeId, RouteId, VehicleId, VehicleTypeId};
use tc_engine::Position;

/// One vehicle as seen at the end of a tick.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct VehicleSnapshotEntry {
    pub id:           VehicleId,
    pub edge:         EdgeId,
    /// Empty if the engine could not report the route.
    pub route:        RouteId,
    /// Empty if the engine could not report the type.
    pub vehicle_type: VehicleTypeId,
    /// Metres per second.
    pub speed:        f64,
    pub position:     Position,
}

/// Everything readers may know about vehicles after one tick.
///
/// `vehicles` is sorted by id.  Built from scratch each tick and never
/// modified once published.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct VehicleSnapshot {
    /// Controller tick that produced this snapshot (0 = nothing yet).
    pub tick:         u64,
    /// Engine clock in seconds at the end of that tick.
    pub sim_time:     f64,
    pub vehicles:     Vec<VehicleSnapshotEntry>,
    /// Lengths (metres) of edges the engine has reported so far.  Shared
    /// between snapshots until a new edge is seen.
    pub edge_lengths: Arc<BTreeMap<EdgeId, f64>>,
}

impl VehicleSnapshot {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.vehicles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vehicles.is_empty()
    }

    pub fn by_id(&self, id: &str) -> Option<&VehicleSnapshotEntry> {
        self.vehicles
            .binary_search_by(|v| v.id.as_str().cmp(id))
            .ok()
            .map(|i| &self.vehicles[i])
    }

    pub fn contains(&self, id: &str) -> bool {
        self.by_id(id).is_some()
    }

    pub fn on_edge<'a>(&'a self, edge: &'a str) -> impl Iterator<Item = &'a VehicleSnapshotEntry> + 'a {
        self.vehicles.iter().filter(move |v| v.edge.as_str() == edge)
    }

    pub fn count_on_edge(&self, edge: &str) -> usize {
        self.on_edge(edge).count()
    }

    /// Mean speed in m/s over all vehicles; 0 when there are none.
    pub fn average_speed(&self) -> f64 {
        if self.vehicles.is_empty() {
            return 0.0;
        }
        self.vehicles.iter().map(|v| v.speed).sum::<f64>() / self.vehicles.len() as f64
    }

    pub fn edge_length(&self, edge: &str) -> Option<f64> {
        self.edge_lengths.get(edge).copied()
    }
}
