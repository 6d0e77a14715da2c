//! `MemoryEngine` — a small in-process simulator implementing [`SimEngine`].
//!
//! # Model
//!
//! Each step advances the clock by `step_length_secs` and then, in order:
//!
//! 1. Advances every light whose state was not overridden by
//!    `set_light_state`, moving to the next phase once the current phase's
//!    duration has elapsed.
//! 2. Inserts pending vehicles whose depart time has been reached
//!    (reported by `departed_ids`).
//! 3. Moves every vehicle `speed_limit * step_length` metres along its
//!    route, whatever its insertion speed.  A vehicle reaching the end of a
//!    signal-controlled edge stops there (speed 0) while the light shows
//!    anything but `G`/`g` for that edge.  A vehicle running off its last edge arrives and is dropped
//!    (reported by `arrived_ids`).
//!
//! There is no car following: vehicles on the same edge do not interact.
//! Insertion is deterministic; a `"random"` depart position starts at the
//! beginning of the first edge.

use std::collections::BTreeMap;

use tracing::debug;

use tc_core::{EdgeId, LightId, RouteId, VehicleId};

use crate::network::{is_green, MemoryNetwork};
use crate::state::PendingVehicle;
use crate::{
    EngineError, EngineResult, Lookup, MemVehicle, SimEngine, VehicleSpawn, VehicleState,
};

/// Depart times within this many seconds of the clock count as reached.
const DEPART_EPSILON: f64 = 1e-6;

// ── Light runtime ─────────────────────────────────────────────────────────────

#[derive(Clone, Debug)]
struct LightRuntime {
    phase:          usize,
    elapsed:        f64,
    program:        String,
    /// Set by `set_light_state`; cleared by any phase or program change.
    state_override: Option<String>,
}

// ── MemoryEngine ──────────────────────────────────────────────────────────────

pub struct MemoryEngine {
    network:          MemoryNetwork,
    step_length_secs: f64,

    connected:        bool,
    time:             f64,
    routes:           BTreeMap<RouteId, Vec<EdgeId>>,
    pending:          BTreeMap<VehicleId, PendingVehicle>,
    vehicles:         BTreeMap<VehicleId, MemVehicle>,
    lights:           BTreeMap<LightId, LightRuntime>,
    departed:         Vec<VehicleId>,
    arrived:          Vec<VehicleId>,

    // ── Test hooks ────────────────────────────────────────────────────────
    teleport_reports: bool,
    fail_next_start:  Option<String>,
    add_vehicle_calls: u64,
}

impl MemoryEngine {
    /// An engine over `network` with the default 0.1 s step.
    pub fn new(network: MemoryNetwork) -> Self {
        Self {
            network,
            step_length_secs: 0.1,
            connected:        false,
            time:             0.0,
            routes:           BTreeMap::new(),
            pending:          BTreeMap::new(),
            vehicles:         BTreeMap::new(),
            lights:           BTreeMap::new(),
            departed:         Vec::new(),
            arrived:          Vec::new(),
            teleport_reports: true,
            fail_next_start:  None,
            add_vehicle_calls: 0,
        }
    }

    pub fn with_step_length(mut self, secs: f64) -> Self {
        self.step_length_secs = secs;
        self
    }

    /// When `false`, the teleport queries answer `Unsupported`, like an
    /// engine build without that API.
    pub fn with_teleport_reports(mut self, enabled: bool) -> Self {
        self.teleport_reports = enabled;
        self
    }

    pub fn network(&self) -> &MemoryNetwork {
        &self.network
    }

    pub fn step_length_secs(&self) -> f64 {
        self.step_length_secs
    }

    /// Vehicles currently on the network (inserted, not yet arrived).
    pub fn running_count(&self) -> usize {
        self.vehicles.len()
    }

    /// Vehicles accepted by `add_vehicle` but not yet inserted.
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Total `add_vehicle` calls since construction, accepted or not.
    pub fn add_vehicle_calls(&self) -> u64 {
        self.add_vehicle_calls
    }

    pub fn has_route(&self, route: &RouteId) -> bool {
        self.routes.contains_key(route)
    }

    // ── Fault injection ───────────────────────────────────────────────────

    /// Make the next `start` fail with [`EngineError::Start`].
    pub fn fail_next_start(&mut self, reason: impl Into<String>) {
        self.fail_next_start = Some(reason.into());
    }

    /// Drop the connection without resetting state, so every call answers
    /// `NotConnected` until the next `start`.
    pub fn disconnect(&mut self) {
        self.connected = false;
    }

    /// Remove a vehicle without reporting it as arrived, the way a real
    /// engine silently drops a vehicle that teleported off the network.
    pub fn forget_vehicle(&mut self, id: &VehicleId) -> bool {
        self.vehicles.remove(id).is_some()
    }

    // ── Internals ─────────────────────────────────────────────────────────

    fn ensure_connected(&self) -> EngineResult<()> {
        if self.connected { Ok(()) } else { Err(EngineError::NotConnected) }
    }

    fn reset_session(&mut self) {
        self.time = 0.0;
        self.routes.clear();
        self.pending.clear();
        self.vehicles.clear();
        self.departed.clear();
        self.arrived.clear();
        self.lights = self
            .network
            .lights
            .values()
            .map(|def| {
                (def.id.clone(), LightRuntime {
                    phase:          0,
                    elapsed:        0.0,
                    program:        def.program.clone(),
                    state_override: None,
                })
            })
            .collect();
    }

    fn runtime(&self, light: &LightId) -> EngineResult<&LightRuntime> {
        self.lights.get(light).ok_or_else(|| EngineError::UnknownLight(light.clone()))
    }

    fn runtime_mut(&mut self, light: &LightId) -> EngineResult<&mut LightRuntime> {
        self.lights.get_mut(light).ok_or_else(|| EngineError::UnknownLight(light.clone()))
    }

    fn current_state(&self, light: &LightId) -> EngineResult<String> {
        let rt = self.runtime(light)?;
        if let Some(state) = &rt.state_override {
            return Ok(state.clone());
        }
        Ok(self
            .network
            .lights
            .get(light)
            .and_then(|def| def.phases.get(rt.phase))
            .map(|(state, _)| state.clone())
            .unwrap_or_default())
    }

    /// `true` if a vehicle at the end of `edge` may leave it.
    fn may_leave(&self, edge: &EdgeId) -> bool {
        let Some((light, link)) = self.network.signals.get(edge) else {
            return true;
        };
        match self.current_state(light) {
            Ok(state) => state.chars().nth(*link).is_none_or(is_green),
            Err(_) => true,
        }
    }

    fn advance_lights(&mut self, dt: f64) {
        for (id, rt) in self.lights.iter_mut() {
            if rt.state_override.is_some() {
                continue;
            }
            let Some(def) = self.network.lights.get(id) else { continue };
            if def.phases.is_empty() {
                continue;
            }
            rt.elapsed += dt;
            // At most one full cycle per step.
            for changes in 1..=def.phases.len() {
                let duration = def.phases[rt.phase].1;
                if rt.elapsed + DEPART_EPSILON < duration {
                    break;
                }
                rt.phase = (rt.phase + 1) % def.phases.len();
                if !duration.is_finite() || duration <= 0.0 || changes == def.phases.len() {
                    rt.elapsed = 0.0;
                    break;
                }
                rt.elapsed -= duration;
            }
        }
    }

    fn insert_departures(&mut self) {
        let due: Vec<VehicleId> = self
            .pending
            .iter()
            .filter(|(_, p)| p.depart_secs <= self.time + DEPART_EPSILON)
            .map(|(id, _)| id.clone())
            .collect();
        for id in due {
            if let Some(p) = self.pending.remove(&id) {
                self.vehicles.insert(id.clone(), p.vehicle);
                self.departed.push(id);
            }
        }
    }

    fn move_vehicles(&mut self, dt: f64) {
        let ids: Vec<VehicleId> = self.vehicles.keys().cloned().collect();
        for id in ids {
            let Some(mut v) = self.vehicles.remove(&id) else { continue };
            let mut left = dt;
            let mut travelled = 0.0;
            let arrived = loop {
                let Some(edge_id) = v.edge().cloned() else { break true };
                let Some(edge) = self.network.edge(&edge_id) else { break true };
                let limit = edge.speed_limit;
                let room = (edge.length_m - v.offset_m).max(0.0);
                let reach = limit * left;
                if reach < room {
                    v.offset_m += reach;
                    travelled += reach;
                    break false;
                }
                v.offset_m = edge.length_m;
                travelled += room;
                if !self.may_leave(&edge_id) {
                    break false;
                }
                if v.is_last_edge() {
                    break true;
                }
                left -= if limit > 0.0 { room / limit } else { left };
                v.edge_idx += 1;
                v.offset_m = 0.0;
                if left <= 0.0 {
                    break false;
                }
            };
            if arrived {
                self.arrived.push(id);
            } else {
                v.speed = if dt > 0.0 { travelled / dt } else { 0.0 };
                self.vehicles.insert(id, v);
            }
        }
    }
}

impl Default for MemoryEngine {
    fn default() -> Self {
        Self::new(MemoryNetwork::empty())
    }
}

// ── SimEngine ─────────────────────────────────────────────────────────────────

impl SimEngine for MemoryEngine {
    fn start(&mut self) -> EngineResult<()> {
        if self.connected {
            return Err(EngineError::AlreadyStarted);
        }
        if let Some(reason) = self.fail_next_start.take() {
            return Err(EngineError::Start(reason));
        }
        self.reset_session();
        self.connected = true;
        debug!(edges = self.network.edge_count(), lights = self.lights.len(), "memory engine started");
        Ok(())
    }

    fn close(&mut self) -> EngineResult<()> {
        if self.connected {
            debug!(time = self.time, "memory engine closed");
        }
        self.connected = false;
        self.reset_session();
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    fn step(&mut self) -> EngineResult<()> {
        self.ensure_connected()?;
        self.departed.clear();
        self.arrived.clear();
        let dt = self.step_length_secs;
        self.time += dt;
        self.advance_lights(dt);
        self.insert_departures();
        self.move_vehicles(dt);
        Ok(())
    }

    fn time(&mut self) -> EngineResult<f64> {
        self.ensure_connected()?;
        Ok(self.time)
    }

    fn add_route(&mut self, route: &RouteId, edges: &[EdgeId]) -> EngineResult<()> {
        self.ensure_connected()?;
        if self.routes.contains_key(route) {
            return Err(EngineError::DuplicateRoute(route.clone()));
        }
        if let Some(missing) = edges.iter().find(|e| self.network.edge(e).is_none()) {
            return Err(EngineError::UnknownEdge(route.clone(), missing.clone()));
        }
        self.routes.insert(route.clone(), edges.to_vec());
        Ok(())
    }

    fn add_vehicle(&mut self, spawn: &VehicleSpawn) -> EngineResult<()> {
        self.ensure_connected()?;
        self.add_vehicle_calls += 1;
        if self.vehicles.contains_key(&spawn.id) || self.pending.contains_key(&spawn.id) {
            return Err(EngineError::DuplicateVehicle(spawn.id.clone()));
        }
        let edges = self
            .routes
            .get(&spawn.route)
            .ok_or_else(|| EngineError::UnknownRoute(spawn.route.clone()))?
            .clone();
        let depart_secs: f64 = spawn
            .depart
            .trim()
            .parse()
            .map_err(|_| EngineError::InvalidDepart(spawn.depart.clone()))?;

        let first = edges.first().and_then(|e| self.network.edge(e));
        let limit = first.map_or(0.0, |e| e.speed_limit);
        let length = first.map_or(0.0, |e| e.length_m);
        let speed = match spawn.hints.depart_speed.as_str() {
            "max" => limit,
            s => s.parse::<f64>().unwrap_or(0.0).clamp(0.0, limit),
        };
        let offset = spawn.hints.depart_pos.parse::<f64>().unwrap_or(0.0).clamp(0.0, length);

        let vehicle = MemVehicle::new(
            spawn.route.clone(),
            spawn.vehicle_type.clone(),
            edges,
            offset,
            speed,
        );
        self.pending.insert(spawn.id.clone(), PendingVehicle { depart_secs, vehicle });
        Ok(())
    }

    fn departed_ids(&mut self) -> EngineResult<Vec<VehicleId>> {
        self.ensure_connected()?;
        Ok(self.departed.clone())
    }

    fn arrived_ids(&mut self) -> EngineResult<Vec<VehicleId>> {
        self.ensure_connected()?;
        Ok(self.arrived.clone())
    }

    fn teleport_start_ids(&mut self) -> EngineResult<Vec<VehicleId>> {
        self.ensure_connected()?;
        if !self.teleport_reports {
            return Err(EngineError::Unsupported("teleport start reports"));
        }
        Ok(Vec::new())
    }

    fn teleport_end_ids(&mut self) -> EngineResult<Vec<VehicleId>> {
        self.ensure_connected()?;
        if !self.teleport_reports {
            return Err(EngineError::Unsupported("teleport end reports"));
        }
        Ok(Vec::new())
    }

    fn vehicle_state(&mut self, id: &VehicleId) -> EngineResult<Lookup<VehicleState>> {
        self.ensure_connected()?;
        let Some(v) = self.vehicles.get(id) else {
            return Ok(Lookup::NotFound);
        };
        let (edge, position) = match v.edge().and_then(|e| self.network.edge(e).map(|d| (e, d))) {
            Some((edge_id, data)) => (edge_id.clone(), self.network.position_on(data, v.offset_m)),
            None => (EdgeId::default(), Default::default()),
        };
        Ok(Lookup::Found(VehicleState {
            edge,
            speed:        v.speed,
            position,
            route:        Some(v.route.clone()),
            vehicle_type: Some(v.vehicle_type.clone()),
        }))
    }

    fn edge_length(&mut self, edge: &EdgeId) -> EngineResult<Lookup<f64>> {
        self.ensure_connected()?;
        Ok(match self.network.edge(edge) {
            Some(data) => Lookup::Found(data.length_m),
            None => Lookup::NotFound,
        })
    }

    fn light_ids(&mut self) -> EngineResult<Vec<LightId>> {
        self.ensure_connected()?;
        Ok(self.lights.keys().cloned().collect())
    }

    fn light_phase(&mut self, light: &LightId) -> EngineResult<usize> {
        self.ensure_connected()?;
        Ok(self.runtime(light)?.phase)
    }

    fn set_light_phase(&mut self, light: &LightId, phase: usize) -> EngineResult<()> {
        self.ensure_connected()?;
        let phases = self.network.lights.get(light).map_or(0, |def| def.phases.len());
        let rt = self.runtime_mut(light)?;
        if phase >= phases {
            return Err(EngineError::InvalidPhase {
                light:  light.clone(),
                reason: format!("phase {phase} out of range (light has {phases})"),
            });
        }
        rt.phase = phase;
        rt.elapsed = 0.0;
        rt.state_override = None;
        Ok(())
    }

    fn light_state(&mut self, light: &LightId) -> EngineResult<String> {
        self.ensure_connected()?;
        self.current_state(light)
    }

    fn set_light_state(&mut self, light: &LightId, state: &str) -> EngineResult<()> {
        self.ensure_connected()?;
        let links = self.network.lights.get(light).map_or(0, |def| def.controlled.len());
        let rt = self.runtime_mut(light)?;
        if state.chars().count() != links {
            return Err(EngineError::InvalidPhase {
                light:  light.clone(),
                reason: format!("state {state:?} must have {links} characters"),
            });
        }
        rt.state_override = Some(state.to_owned());
        Ok(())
    }

    fn light_program(&mut self, light: &LightId) -> EngineResult<String> {
        self.ensure_connected()?;
        Ok(self.runtime(light)?.program.clone())
    }

    fn set_light_program(&mut self, light: &LightId, program: &str) -> EngineResult<()> {
        self.ensure_connected()?;
        let rt = self.runtime_mut(light)?;
        rt.program = program.to_owned();
        rt.phase = 0;
        rt.elapsed = 0.0;
        rt.state_override = None;
        Ok(())
    }
}
