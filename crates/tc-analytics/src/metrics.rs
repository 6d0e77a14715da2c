//! `Metrics` — one aggregate view computed from a tracking sample.

use std::collections::BTreeMap;

use tc_core::EdgeId;

// ── Policy constants ──────────────────────────────────────────────────────────

/// A vehicle at or below this speed (m/s) counts as stopped.
pub const STOPPED_SPEED: f64 = 0.1;

/// Trips shorter than this (seconds) are short.
pub const SHORT_TRIP_SECS: f64 = 60.0;

/// Trips longer than this (seconds) are long.  Both bounds are medium.
pub const LONG_TRIP_SECS: f64 = 300.0;

/// An edge needs at least this many vehicles before it can be congested.
pub const CONGESTION_MIN_VEHICLES: usize = 10;

/// Share of stopped vehicles at which an edge counts as congested.
pub const CONGESTION_STOPPED_SHARE: f64 = 0.6;

/// `km/h = m/s × 3.6`
const MS_TO_KMH: f64 = 3.6;

// ── Trip statistics ───────────────────────────────────────────────────────────

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TripBucket {
    /// `< 60 s`
    Short,
    /// `60 s ..= 300 s`
    Medium,
    /// `> 300 s`
    Long,
}

impl TripBucket {
    pub fn classify(secs: f64) -> Self {
        if secs < SHORT_TRIP_SECS {
            TripBucket::Short
        } else if secs <= LONG_TRIP_SECS {
            TripBucket::Medium
        } else {
            TripBucket::Long
        }
    }
}

/// Summary of the finished-trip history.  All times in seconds; zero when
/// no trip has finished.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TripStats {
    pub finished:     usize,
    pub average_secs: f64,
    pub min_secs:     f64,
    pub max_secs:     f64,
    pub short:        usize,
    pub medium:       usize,
    pub long:         usize,
}

impl TripStats {
    pub fn from_times<'a>(times: impl IntoIterator<Item = &'a f64>) -> Self {
        let mut stats = TripStats::default();
        let mut sum = 0.0;
        let mut min = f64::INFINITY;
        let mut max = 0.0f64;
        for &t in times {
            stats.finished += 1;
            sum += t;
            min = min.min(t);
            max = max.max(t);
            match TripBucket::classify(t) {
                TripBucket::Short => stats.short += 1,
                TripBucket::Medium => stats.medium += 1,
                TripBucket::Long => stats.long += 1,
            }
        }
        if stats.finished > 0 {
            stats.average_secs = sum / stats.finished as f64;
            stats.min_secs = min;
            stats.max_secs = max;
        }
        stats
    }
}

// ── Metrics ───────────────────────────────────────────────────────────────────

/// Aggregate view of one sample plus the trip history up to it.
///
/// Per-edge maps are ordered by edge id.  `stopped_per_edge` only has
/// entries for edges with at least one stopped vehicle; `density_per_edge`
/// only for edges with a known positive length.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Metrics {
    /// Sample time, seconds.
    pub sim_time:          f64,
    /// Mean speed in m/s; 0 for an empty sample.
    pub average_speed:     f64,
    pub vehicle_count:     usize,
    pub stopped_count:     usize,
    pub vehicles_per_edge: BTreeMap<EdgeId, usize>,
    pub stopped_per_edge:  BTreeMap<EdgeId, usize>,
    /// Vehicles per kilometre.
    pub density_per_edge:  BTreeMap<EdgeId, f64>,
    pub trips:             TripStats,
}

impl Metrics {
    /// Share of all vehicles that are stopped; 0 when there are none.
    pub fn stopped_ratio(&self) -> f64 {
        if self.vehicle_count == 0 {
            return 0.0;
        }
        self.stopped_count as f64 / self.vehicle_count as f64
    }

    pub fn average_speed_kmh(&self) -> f64 {
        self.average_speed * MS_TO_KMH
    }

    pub fn vehicles_on_edge(&self, edge: &str) -> usize {
        self.vehicles_per_edge.get(edge).copied().unwrap_or(0)
    }

    pub fn stopped_on_edge(&self, edge: &str) -> usize {
        self.stopped_per_edge.get(edge).copied().unwrap_or(0)
    }

    pub fn stopped_ratio_for_edge(&self, edge: &str) -> f64 {
        match self.vehicles_on_edge(edge) {
            0 => 0.0,
            total => self.stopped_on_edge(edge) as f64 / total as f64,
        }
    }

    /// Vehicles per km, or 0 when the edge's length was unknown.
    pub fn density_for_edge(&self, edge: &str) -> f64 {
        self.density_per_edge.get(edge).copied().unwrap_or(0.0)
    }

    /// At least [`CONGESTION_MIN_VEHICLES`] vehicles on the edge and at
    /// least [`CONGESTION_STOPPED_SHARE`] of them stopped.
    pub fn is_edge_congested(&self, edge: &str) -> bool {
        let total = self.vehicles_on_edge(edge);
        if total < CONGESTION_MIN_VEHICLES {
            return false;
        }
        self.stopped_on_edge(edge) as f64 / total as f64 >= CONGESTION_STOPPED_SHARE
    }

    /// Every congested edge, sorted by id.
    pub fn congested_edges(&self) -> Vec<EdgeId> {
        self.vehicles_per_edge
            .keys()
            .filter(|e| self.is_edge_congested(e.as_str()))
            .cloned()
            .collect()
    }
}
