//! `SpawnQueue` — FIFO of pending injections, drained a bounded amount per tick.
//!
//! A request for `k` vehicles stays at the head of the queue until `k`
//! `add_vehicle` calls have been issued for it, possibly across several
//! ticks.  A large backlog therefore costs at most `max_per_tick` engine
//! calls per tick; the rest waits.

use std::collections::VecDeque;

use tracing::{debug, warn};

use tc_core::{RouteCatalog, RouteId, SimRng, VehicleId, VehicleTypeId};
use tc_engine::{SimEngine, VehicleSpawn};

use crate::{SpawnError, SpawnResult};

/// Pending injection of `remaining` vehicles of one type on one route.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SpawnRequest {
    pub route:        RouteId,
    pub vehicle_type: VehicleTypeId,
    /// Always ≥ 1 while the request is queued.
    pub remaining:    u32,
}

impl SpawnRequest {
    /// Validate and build a request.
    pub fn new(
        route:        impl Into<RouteId>,
        vehicle_type: impl Into<VehicleTypeId>,
        count:        u32,
    ) -> SpawnResult<Self> {
        let route = route.into();
        let vehicle_type = vehicle_type.into();
        if route.is_blank() {
            return Err(SpawnError::EmptyRoute);
        }
        if vehicle_type.is_blank() {
            return Err(SpawnError::EmptyVehicleType);
        }
        if count == 0 {
            return Err(SpawnError::ZeroCount);
        }
        Ok(Self { route, vehicle_type, remaining: count })
    }
}

/// What one [`SpawnQueue::drain`] call did.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DrainReport {
    /// `add_vehicle` calls the engine accepted.
    pub added:     Vec<VehicleId>,
    /// `add_vehicle` calls the engine rejected.  The unit is consumed anyway.
    pub rejected:  usize,
    /// Units still queued after this call.
    pub remaining: u64,
}

impl DrainReport {
    /// Total engine calls issued.
    pub fn calls(&self) -> usize {
        self.added.len() + self.rejected
    }
}

// ── SpawnQueue ────────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct SpawnQueue {
    requests: VecDeque<SpawnRequest>,
}

impl SpawnQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a request for `count` vehicles.  Rejected requests leave the
    /// queue unchanged.
    pub fn enqueue(
        &mut self,
        route:        impl Into<RouteId>,
        vehicle_type: impl Into<VehicleTypeId>,
        count:        u32,
    ) -> SpawnResult<()> {
        self.push(SpawnRequest::new(route, vehicle_type, count)?);
        Ok(())
    }

    /// Append an already validated request.
    pub fn push(&mut self, request: SpawnRequest) {
        debug!(route = %request.route, vehicle_type = %request.vehicle_type, count = request.remaining, "queued spawn request");
        self.requests.push_back(request);
    }

    /// Queue `count` single-vehicle requests, each on a uniformly random
    /// catalog route.  Returns the number of requests queued.
    pub fn enqueue_random(
        &mut self,
        catalog:      &RouteCatalog,
        rng:          &mut SimRng,
        vehicle_type: impl Into<VehicleTypeId>,
        count:        u32,
    ) -> SpawnResult<u32> {
        let vehicle_type = vehicle_type.into();
        if vehicle_type.is_blank() {
            return Err(SpawnError::EmptyVehicleType);
        }
        if count == 0 {
            return Err(SpawnError::ZeroCount);
        }
        if catalog.is_empty() {
            return Err(SpawnError::EmptyCatalog);
        }
        for _ in 0..count {
            let Some(route) = catalog.choose(rng) else { break };
            self.requests.push_back(SpawnRequest {
                route:        route.id.clone(),
                vehicle_type: vehicle_type.clone(),
                remaining:    1,
            });
        }
        debug!(count, routes = catalog.len(), "queued random-route spawns");
        Ok(count)
    }

    /// Queue `count` vehicles on the catalog route at `index`.
    pub fn enqueue_at(
        &mut self,
        catalog:      &RouteCatalog,
        index:        usize,
        vehicle_type: impl Into<VehicleTypeId>,
        count:        u32,
    ) -> SpawnResult<()> {
        let route = catalog
            .get(index)
            .ok_or(SpawnError::RouteIndexOutOfRange { index, len: catalog.len() })?;
        self.enqueue(route.id.clone(), vehicle_type, count)
    }

    /// Issue up to `max_per_tick` `add_vehicle` calls, oldest request first.
    ///
    /// Every vehicle gets a fresh process-unique id and departs at the
    /// engine's current time.  A rejected call still consumes its unit so a
    /// bad request cannot block the queue.  If the engine is unreachable the
    /// drain stops at once, leaving the current unit queued, and the error is
    /// returned.
    pub fn drain<E: SimEngine>(&mut self, engine: &mut E, max_per_tick: usize) -> SpawnResult<DrainReport> {
        let mut report = DrainReport::default();
        if self.requests.is_empty() || max_per_tick == 0 {
            report.remaining = self.pending_units();
            return Ok(report);
        }

        let now = engine.time()?;
        while report.calls() < max_per_tick {
            let Some(head) = self.requests.front_mut() else { break };
            let spawn = VehicleSpawn::departing_at(
                VehicleId::next_injected(),
                head.route.clone(),
                head.vehicle_type.clone(),
                now,
            );
            match engine.add_vehicle(&spawn) {
                Ok(()) => report.added.push(spawn.id),
                Err(e) if e.is_transient() => return Err(e.into()),
                Err(e) => {
                    warn!(vehicle = %spawn.id, route = %spawn.route, error = %e, "engine rejected vehicle");
                    report.rejected += 1;
                }
            }
            head.remaining -= 1;
            if head.remaining == 0 {
                self.requests.pop_front();
            }
        }

        report.remaining = self.pending_units();
        if report.calls() > 0 {
            debug!(added = report.added.len(), rejected = report.rejected, remaining = report.remaining, "drained spawn queue");
        }
        Ok(report)
    }

    /// Number of queued requests.
    pub fn len(&self) -> usize {
        self.requests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }

    /// Total vehicles still to be injected across all requests.
    pub fn pending_units(&self) -> u64 {
        self.requests.iter().map(|r| u64::from(r.remaining)).sum()
    }

    pub fn front(&self) -> Option<&SpawnRequest> {
        self.requests.front()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SpawnRequest> + '_ {
        self.requests.iter()
    }

    pub fn clear(&mut self) {
        self.requests.clear();
    }
}
