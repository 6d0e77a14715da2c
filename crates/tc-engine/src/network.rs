//! Static network for [`MemoryEngine`][crate::MemoryEngine] and its builder.
//!
//! # Data layout
//!
//! Nodes are plain points indexed by [`NodeIndex`].  Edges are keyed by
//! their string [`EdgeId`] in a `BTreeMap` so iteration order (and therefore
//! every derived report) is deterministic.
//!
//! A traffic light controls an ordered list of incoming edges.  Character
//! `i` of the light's state string applies to `controlled[i]`: `G`/`g` lets
//! vehicles leave the edge, anything else holds them at the stop line.

use std::collections::BTreeMap;

use tc_core::{EdgeId, LightId};

use crate::Position;

/// Index of a node added with [`MemoryNetworkBuilder::add_node`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeIndex(pub u32);

impl NodeIndex {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

// ── Edges ─────────────────────────────────────────────────────────────────────

#[derive(Clone, Debug)]
pub struct EdgeData {
    pub from:        NodeIndex,
    pub to:          NodeIndex,
    /// Metres.
    pub length_m:    f64,
    /// Metres per second.
    pub speed_limit: f64,
}

// ── Lights ────────────────────────────────────────────────────────────────────

/// Definition of one fixed-time traffic light.
#[derive(Clone, Debug)]
pub struct LightDef {
    pub id:         LightId,
    /// Program ID reported by `light_program` (`"0"` unless overridden).
    pub program:    String,
    /// Incoming edges, in signal-state character order.
    pub controlled: Vec<EdgeId>,
    /// `(state, duration_secs)` per phase.  Every state string must have one
    /// character per controlled edge.
    pub phases:     Vec<(String, f64)>,
}

impl LightDef {
    pub fn new(id: impl Into<LightId>, controlled: Vec<EdgeId>) -> Self {
        Self { id: id.into(), program: "0".to_owned(), controlled, phases: Vec::new() }
    }

    /// A NaN, infinite or negative duration is stored as `0.0`: the phase
    /// is left on the next step.
    pub fn with_phase(mut self, state: impl Into<String>, duration_secs: f64) -> Self {
        let duration_secs = if duration_secs.is_finite() { duration_secs.max(0.0) } else { 0.0 };
        self.phases.push((state.into(), duration_secs));
        self
    }

    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }
}

/// `true` if the signal character lets traffic through.
#[inline]
pub fn is_green(c: char) -> bool {
    matches!(c, 'G' | 'g')
}

// ── MemoryNetwork ─────────────────────────────────────────────────────────────

/// Immutable road network.  Build with [`MemoryNetworkBuilder`].
#[derive(Clone, Debug, Default)]
pub struct MemoryNetwork {
    pub node_pos: Vec<Position>,
    pub edges:    BTreeMap<EdgeId, EdgeData>,
    pub lights:   BTreeMap<LightId, LightDef>,
    /// Controlled edge → (light, link index).
    pub signals:  BTreeMap<EdgeId, (LightId, usize)>,
}

impl MemoryNetwork {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn node_count(&self) -> usize {
        self.node_pos.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn edge(&self, id: &EdgeId) -> Option<&EdgeData> {
        self.edges.get(id)
    }

    /// Position `offset_m` metres along `edge`, clamped to its end points.
    pub fn position_on(&self, edge: &EdgeData, offset_m: f64) -> Position {
        let a = self.node_pos[edge.from.index()];
        let b = self.node_pos[edge.to.index()];
        let t = if edge.length_m > 0.0 { (offset_m / edge.length_m).clamp(0.0, 1.0) } else { 1.0 };
        a.lerp(b, t)
    }
}

// ── MemoryNetworkBuilder ──────────────────────────────────────────────────────

/// Construct a [`MemoryNetwork`] incrementally, then call [`build`](Self::build).
///
/// # Example
///
/// ```
/// use tc_engine::{LightDef, MemoryNetworkBuilder};
///
/// let mut b = MemoryNetworkBuilder::new();
/// let w = b.add_node(0.0, 0.0);
/// let c = b.add_node(200.0, 0.0);
/// let e = b.add_node(400.0, 0.0);
/// b.add_edge("in", w, c, 13.9);
/// b.add_edge("out", c, e, 13.9);
/// b.add_light(LightDef::new("J1", vec!["in".into()]).with_phase("G", 30.0).with_phase("r", 30.0));
/// let net = b.build();
/// assert_eq!(net.edge_count(), 2);
/// assert_eq!(net.edge(&"in".into()).unwrap().length_m, 200.0);
/// ```
#[derive(Default)]
pub struct MemoryNetworkBuilder {
    nodes:  Vec<Position>,
    edges:  BTreeMap<EdgeId, EdgeData>,
    lights: Vec<LightDef>,
}

impl MemoryNetworkBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node and return its index (sequential from 0).
    pub fn add_node(&mut self, x: f64, y: f64) -> NodeIndex {
        let id = NodeIndex(self.nodes.len() as u32);
        self.nodes.push(Position::new(x, y));
        id
    }

    /// Add a directed edge whose length is the straight-line distance
    /// between its end nodes.  Re-adding an ID replaces the earlier edge.
    pub fn add_edge(
        &mut self,
        id:          impl Into<EdgeId>,
        from:        NodeIndex,
        to:          NodeIndex,
        speed_limit: f64,
    ) -> &mut Self {
        let length_m = self.nodes[from.index()].distance(self.nodes[to.index()]);
        self.add_edge_with_length(id, from, to, length_m, speed_limit)
    }

    /// Add a directed edge with an explicit length (curved roads).
    pub fn add_edge_with_length(
        &mut self,
        id:          impl Into<EdgeId>,
        from:        NodeIndex,
        to:          NodeIndex,
        length_m:    f64,
        speed_limit: f64,
    ) -> &mut Self {
        self.edges.insert(id.into(), EdgeData { from, to, length_m, speed_limit });
        self
    }

    pub fn add_light(&mut self, light: LightDef) -> &mut Self {
        self.lights.push(light);
        self
    }

    pub fn node_count(&self) -> usize { self.nodes.len() }
    pub fn edge_count(&self) -> usize { self.edges.len() }

    pub fn build(self) -> MemoryNetwork {
        let mut signals = BTreeMap::new();
        let mut lights = BTreeMap::new();
        for light in self.lights {
            for (link, edge) in light.controlled.iter().enumerate() {
                signals.insert(edge.clone(), (light.id.clone(), link));
            }
            lights.insert(light.id.clone(), light);
        }
        MemoryNetwork { node_pos: self.nodes, edges: self.edges, lights, signals }
    }
}
