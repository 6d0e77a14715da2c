//! `VehicleSnapshotTracker` — reconciles the active set once per tick.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{debug, trace};

use tc_core::{EdgeId, VehicleId};
use tc_engine::{EngineError, EngineResult, Lookup, SimEngine};

use crate::{Published, VehicleSnapshot, VehicleSnapshotEntry};

#[cfg(feature = "fx-hash")]
type IdSet = rustc_hash::FxHashSet<VehicleId>;
#[cfg(not(feature = "fx-hash"))]
type IdSet = std::collections::HashSet<VehicleId>;

/// What one [`VehicleSnapshotTracker::refresh`] did.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RefreshReport {
    pub departed:   usize,
    pub arrived:    usize,
    /// Ids dropped because the engine reported a teleport.
    pub teleported: usize,
    /// Ids dropped because the engine no longer knew them.
    pub stale:      usize,
    /// Active vehicles left out of this snapshot because they were between
    /// edges.
    pub off_edge:   usize,
    /// Entries in the published snapshot.
    pub published:  usize,
}

/// Owns the set of vehicle ids believed alive and publishes a fresh
/// [`VehicleSnapshot`] after every successful refresh.
///
/// Every id in a published snapshot is in the active set at the time of
/// publication.
pub struct VehicleSnapshotTracker {
    active:       IdSet,
    edge_lengths: Arc<BTreeMap<EdgeId, f64>>,
    published:    Arc<Published<VehicleSnapshot>>,
}

impl VehicleSnapshotTracker {
    pub fn new() -> Self {
        Self {
            active:       IdSet::default(),
            edge_lengths: Arc::default(),
            published:    Arc::new(Published::default()),
        }
    }

    /// Shared handle to the publication slot, for readers on other threads.
    pub fn snapshot_handle(&self) -> Arc<Published<VehicleSnapshot>> {
        Arc::clone(&self.published)
    }

    /// Latest published snapshot.
    pub fn latest(&self) -> Arc<VehicleSnapshot> {
        self.published.load()
    }

    pub fn is_active(&self, id: &str) -> bool {
        self.active.contains(id)
    }

    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    /// Pull the last step's events, query every active vehicle, and publish
    /// the result.
    ///
    /// On error the active set keeps whatever events were already applied
    /// and the previous snapshot stays published.
    pub fn refresh<E: SimEngine>(&mut self, engine: &mut E, tick: u64) -> EngineResult<RefreshReport> {
        let mut report = RefreshReport::default();

        // Each list is applied as soon as the engine hands it over; a later
        // failure must not lose it.
        let departed = engine.departed_ids()?;
        report.departed = departed.len();
        self.active.extend(departed);

        let arrived = engine.arrived_ids()?;
        report.arrived = arrived.len();
        for id in &arrived {
            self.active.remove(id);
        }
        report.teleported += self.drop_reported(engine.teleport_start_ids(), "start");
        report.teleported += self.drop_reported(engine.teleport_end_ids(), "end");

        // Iterate a sorted copy; removals wait until the loop is done.
        let mut ids: Vec<VehicleId> = self.active.iter().cloned().collect();
        ids.sort_unstable();

        let mut entries = Vec::with_capacity(ids.len());
        let mut gone = Vec::new();
        for id in ids {
            let state = match engine.vehicle_state(&id)? {
                Lookup::Found(state) => state,
                Lookup::NotFound => {
                    gone.push(id);
                    continue;
                }
            };
            if state.edge.is_blank() {
                report.off_edge += 1;
                continue;
            }
            entries.push(VehicleSnapshotEntry {
                id,
                edge:         state.edge,
                route:        state.route.unwrap_or_default(),
                vehicle_type: state.vehicle_type.unwrap_or_default(),
                speed:        state.speed,
                position:     state.position,
            });
        }

        report.stale = gone.len();
        for id in &gone {
            self.active.remove(id);
        }

        self.learn_edge_lengths(engine, &entries);

        let sim_time = engine.time()?;
        report.published = entries.len();
        self.published.store(VehicleSnapshot {
            tick,
            sim_time,
            vehicles: entries,
            edge_lengths: Arc::clone(&self.edge_lengths),
        });

        if report.stale > 0 || report.teleported > 0 {
            debug!(stale = report.stale, teleported = report.teleported, "dropped vanished vehicles");
        }
        trace!(tick, active = self.active.len(), published = report.published, "vehicle snapshot published");
        Ok(report)
    }

    /// Forget every vehicle and publish an empty snapshot.  Cached edge
    /// lengths are dropped too; the next engine may have a different network.
    pub fn reset(&mut self) {
        self.active.clear();
        self.edge_lengths = Arc::default();
        self.published.store(VehicleSnapshot::empty());
    }

    // ── Internals ─────────────────────────────────────────────────────────

    fn drop_reported(&mut self, ids: EngineResult<Vec<VehicleId>>, which: &str) -> usize {
        match ids {
            Ok(ids) => ids.iter().filter(|id| self.active.remove(*id)).count(),
            Err(EngineError::Unsupported(_)) => 0,
            Err(e) => {
                debug!(which, error = %e, "teleport query failed");
                0
            }
        }
    }

    /// Cache lengths of edges seen for the first time.  Lookups that fail
    /// are retried on a later tick.
    fn learn_edge_lengths<E: SimEngine>(&mut self, engine: &mut E, entries: &[VehicleSnapshotEntry]) {
        let mut fresh: Vec<(EdgeId, f64)> = Vec::new();
        for entry in entries {
            if self.edge_lengths.contains_key(&entry.edge) || fresh.iter().any(|(e, _)| *e == entry.edge) {
                continue;
            }
            match engine.edge_length(&entry.edge) {
                Ok(Lookup::Found(len)) => fresh.push((entry.edge.clone(), len)),
                Ok(Lookup::NotFound) => trace!(edge = %entry.edge, "edge length unknown"),
                Err(e) => debug!(edge = %entry.edge, error = %e, "edge length query failed"),
            }
        }
        if !fresh.is_empty() {
            Arc::make_mut(&mut self.edge_lengths).extend(fresh);
        }
    }
}

impl Default for VehicleSnapshotTracker {
    fn default() -> Self {
        Self::new()
    }
}
