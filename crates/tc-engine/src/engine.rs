//! The `SimEngine` trait — everything the controller asks of the simulator.

use tc_core::{EdgeId, LightId, RouteId, VehicleId, VehicleTypeId};

use crate::{EngineError, EngineResult};

// ── Query results ─────────────────────────────────────────────────────────────

/// Outcome of a per-object query.
///
/// `NotFound` means the engine no longer tracks the object (a vehicle that
/// arrived, teleported away, or never existed).  It is a normal answer, not
/// an error.
#[derive(Clone, Debug, PartialEq)]
pub enum Lookup<T> {
    Found(T),
    NotFound,
}

impl<T> Lookup<T> {
    pub fn found(self) -> Option<T> {
        match self {
            Lookup::Found(v) => Some(v),
            Lookup::NotFound => None,
        }
    }

    pub fn is_found(&self) -> bool {
        matches!(self, Lookup::Found(_))
    }
}

/// Cartesian network coordinates in metres.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance(self, other: Position) -> f64 {
        (other.x - self.x).hypot(other.y - self.y)
    }

    /// Point `t ∈ [0, 1]` of the way from `self` to `other`.
    pub fn lerp(self, other: Position, t: f64) -> Position {
        Position {
            x: self.x + (other.x - self.x) * t,
            y: self.y + (other.y - self.y) * t,
        }
    }
}

/// Live state of one vehicle, as reported by the engine.
#[derive(Clone, Debug, PartialEq)]
pub struct VehicleState {
    /// Edge the vehicle currently occupies.  Empty while the engine has the
    /// vehicle on an internal junction lane or has not inserted it yet.
    pub edge:         EdgeId,
    /// Metres per second.
    pub speed:        f64,
    pub position:     Position,
    /// Best-effort: `None` if the engine could not report it.
    pub route:        Option<RouteId>,
    /// Best-effort: `None` if the engine could not report it.
    pub vehicle_type: Option<VehicleTypeId>,
}

// ── Vehicle insertion ─────────────────────────────────────────────────────────

/// Insertion hints passed through to the engine verbatim.
///
/// The defaults (`best` lane, `random` position, `max` speed, `current`
/// arrival lane) let the engine pick a free slot and insert the vehicle
/// already moving, which keeps large bursts from blocking the first edge.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlacementHints {
    pub depart_lane:  String,
    pub depart_pos:   String,
    pub depart_speed: String,
    pub arrival_lane: String,
}

impl Default for PlacementHints {
    fn default() -> Self {
        Self {
            depart_lane:  "best".to_owned(),
            depart_pos:   "random".to_owned(),
            depart_speed: "max".to_owned(),
            arrival_lane: "current".to_owned(),
        }
    }
}

/// One `add_vehicle` call.
#[derive(Clone, Debug, PartialEq)]
pub struct VehicleSpawn {
    pub id:           VehicleId,
    pub route:        RouteId,
    pub vehicle_type: VehicleTypeId,
    /// Depart time in seconds, formatted with two decimals (`"12.30"`).
    pub depart:       String,
    pub hints:        PlacementHints,
}

impl VehicleSpawn {
    /// A spawn departing at engine time `now`.
    pub fn departing_at(
        id:           VehicleId,
        route:        RouteId,
        vehicle_type: VehicleTypeId,
        now:          f64,
    ) -> Self {
        Self {
            id,
            route,
            vehicle_type,
            depart: format_depart(now),
            hints:  PlacementHints::default(),
        }
    }
}

/// Engine depart-time format: seconds with exactly two decimals, `.`
/// as the separator regardless of locale.
pub fn format_depart(secs: f64) -> String {
    format!("{secs:.2}")
}

// ── SimEngine ─────────────────────────────────────────────────────────────────

/// The external simulator, driven one fixed step at a time.
///
/// Methods with default bodies are optional capabilities; the defaults
/// report [`EngineError::Unsupported`] and callers are expected to tolerate
/// that.
pub trait SimEngine: Send + 'static {
    // ── Lifecycle ─────────────────────────────────────────────────────────

    /// Launch (or connect to) the engine.
    fn start(&mut self) -> EngineResult<()>;

    /// Release the engine.  Closing a closed engine is not an error.
    fn close(&mut self) -> EngineResult<()>;

    fn is_connected(&self) -> bool;

    /// Advance the simulation by one fixed time unit.
    fn step(&mut self) -> EngineResult<()>;

    /// Current simulation clock in seconds.
    fn time(&mut self) -> EngineResult<f64>;

    // ── Routes and vehicles ───────────────────────────────────────────────

    /// Register a route.  Registering the same ID twice is an error.
    fn add_route(&mut self, route: &RouteId, edges: &[EdgeId]) -> EngineResult<()>;

    /// Inject one vehicle.
    fn add_vehicle(&mut self, spawn: &VehicleSpawn) -> EngineResult<()>;

    /// Vehicles that entered the network during the last step.
    fn departed_ids(&mut self) -> EngineResult<Vec<VehicleId>>;

    /// Vehicles that reached the end of their route during the last step.
    fn arrived_ids(&mut self) -> EngineResult<Vec<VehicleId>>;

    /// Vehicles that started a teleport during the last step.
    fn teleport_start_ids(&mut self) -> EngineResult<Vec<VehicleId>> {
        Err(EngineError::Unsupported("teleport start reports"))
    }

    /// Vehicles that finished a teleport during the last step.
    fn teleport_end_ids(&mut self) -> EngineResult<Vec<VehicleId>> {
        Err(EngineError::Unsupported("teleport end reports"))
    }

    /// Edge, speed, position (and best-effort route/type) of one vehicle.
    fn vehicle_state(&mut self, id: &VehicleId) -> EngineResult<Lookup<VehicleState>>;

    /// Length of an edge in metres.
    fn edge_length(&mut self, edge: &EdgeId) -> EngineResult<Lookup<f64>>;

    // ── Traffic lights ────────────────────────────────────────────────────

    fn light_ids(&mut self) -> EngineResult<Vec<LightId>>;

    fn light_phase(&mut self, light: &LightId) -> EngineResult<usize>;

    fn set_light_phase(&mut self, light: &LightId, phase: usize) -> EngineResult<()>;

    /// Signal state string, one character per controlled link (`"GrGr"`).
    fn light_state(&mut self, light: &LightId) -> EngineResult<String>;

    fn set_light_state(&mut self, _light: &LightId, _state: &str) -> EngineResult<()> {
        Err(EngineError::Unsupported("setting raw signal states"))
    }

    fn light_program(&mut self, light: &LightId) -> EngineResult<String>;

    fn set_light_program(&mut self, _light: &LightId, _program: &str) -> EngineResult<()> {
        Err(EngineError::Unsupported("switching signal programs"))
    }
}
