//! `TripAnalytics` — the stateful half of the analytics.

use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};

use tracing::trace;

use tc_core::{EdgeId, VehicleId};

use crate::metrics::STOPPED_SPEED;
use crate::{Metrics, TrackingSample, TripStats};

/// Remembers when each vehicle was first seen and how long finished trips
/// took.
///
/// Feed it one sample at a time, in time order.  A vehicle missing from a
/// sample counts as finished at that sample's time, even if the sample is
/// empty.
#[derive(Debug)]
pub struct TripAnalytics {
    start_times: HashMap<VehicleId, f64>,
    last_seen:   HashSet<VehicleId>,
    /// Oldest first; at most `capacity` entries.
    finished:    VecDeque<f64>,
    capacity:    usize,
}

impl TripAnalytics {
    /// `capacity` bounds the finished-trip history (minimum 1).
    pub fn new(capacity: usize) -> Self {
        Self {
            start_times: HashMap::new(),
            last_seen:   HashSet::new(),
            finished:    VecDeque::new(),
            capacity:    capacity.max(1),
        }
    }

    pub fn compute(&mut self, sample: &TrackingSample) -> Metrics {
        let now = sample.time_secs;
        let mut metrics = Metrics { sim_time: now, ..Metrics::default() };

        // ── Counts ────────────────────────────────────────────────────────
        let mut speed_sum = 0.0;
        let mut current: HashSet<VehicleId> = HashSet::with_capacity(sample.vehicles.len());
        for v in &sample.vehicles {
            speed_sum += v.speed;
            metrics.vehicle_count += 1;
            let stopped = v.speed <= STOPPED_SPEED;
            if stopped {
                metrics.stopped_count += 1;
            }
            if !v.edge.is_blank() {
                *metrics.vehicles_per_edge.entry(v.edge.clone()).or_default() += 1;
                if stopped {
                    *metrics.stopped_per_edge.entry(v.edge.clone()).or_default() += 1;
                }
            }
            if !v.id.is_blank() {
                self.start_times.entry(v.id.clone()).or_insert(now);
                current.insert(v.id.clone());
            }
        }
        if metrics.vehicle_count > 0 {
            metrics.average_speed = speed_sum / metrics.vehicle_count as f64;
        }
        metrics.density_per_edge = densities(&metrics.vehicles_per_edge, &sample.edge_lengths);

        // ── Finished trips ────────────────────────────────────────────────
        let mut gone: Vec<&VehicleId> = self.last_seen.difference(&current).collect();
        gone.sort_unstable();
        for id in gone {
            if let Some(start) = self.start_times.remove(id) {
                let secs = (now - start).max(0.0);
                trace!(vehicle = %id, secs, "trip finished");
                if self.finished.len() == self.capacity {
                    self.finished.pop_front();
                }
                self.finished.push_back(secs);
            }
        }
        self.last_seen = current;

        metrics.trips = TripStats::from_times(&self.finished);
        metrics
    }

    /// Finished trip times in seconds, oldest first.
    pub fn finished_trips(&self) -> impl Iterator<Item = f64> + '_ {
        self.finished.iter().copied()
    }

    /// Vehicles with a recorded start time.
    pub fn open_trips(&self) -> usize {
        self.start_times.len()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Forget every open and finished trip.
    pub fn reset(&mut self) {
        self.start_times.clear();
        self.last_seen.clear();
        self.finished.clear();
    }
}

/// `count / (length_m / 1000)` for every edge with a known positive length.
fn densities(counts: &BTreeMap<EdgeId, usize>, lengths: &BTreeMap<EdgeId, f64>) -> BTreeMap<EdgeId, f64> {
    counts
        .iter()
        .filter_map(|(edge, &n)| {
            let len = *lengths.get(edge)?;
            (len > 0.0).then(|| (edge.clone(), n as f64 / (len / 1000.0)))
        })
        .collect()
}
