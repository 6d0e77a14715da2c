//! Per-vehicle movement state inside [`MemoryEngine`][crate::MemoryEngine].

use tc_core::{EdgeId, RouteId, VehicleTypeId};

/// Movement state for a single inserted vehicle.
///
/// A vehicle is on `route_edges[edge_idx]`, `offset_m` metres from the start
/// of that edge.  When the offset passes the edge length the vehicle moves
/// onto the next edge, or arrives if there is none.
#[derive(Debug, Clone, PartialEq)]
pub struct MemVehicle {
    pub route:        RouteId,
    pub vehicle_type: VehicleTypeId,
    pub route_edges:  Vec<EdgeId>,
    pub edge_idx:     usize,
    pub offset_m:     f64,
    /// Metres per second, as reported for the last step.
    pub speed:        f64,
}

impl MemVehicle {
    pub fn new(
        route:        RouteId,
        vehicle_type: VehicleTypeId,
        route_edges:  Vec<EdgeId>,
        offset_m:     f64,
        speed:        f64,
    ) -> Self {
        Self { route, vehicle_type, route_edges, edge_idx: 0, offset_m, speed }
    }

    /// Edge the vehicle is on, or `None` once it has run off the route.
    pub fn edge(&self) -> Option<&EdgeId> {
        self.route_edges.get(self.edge_idx)
    }

    pub fn is_last_edge(&self) -> bool {
        self.edge_idx + 1 >= self.route_edges.len()
    }
}

/// A vehicle accepted by `add_vehicle` that has not reached its depart time.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingVehicle {
    pub depart_secs: f64,
    pub vehicle:     MemVehicle,
}
