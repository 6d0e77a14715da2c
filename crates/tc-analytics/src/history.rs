//! `MetricsHistory` — a bounded rolling series for charts and exports.

use std::collections::VecDeque;

use crate::Metrics;

/// One recorded [`Metrics`] call.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MetricsPoint {
    pub sim_time:      f64,
    pub average_speed: f64,
    pub vehicle_count: usize,
}

impl From<&Metrics> for MetricsPoint {
    fn from(m: &Metrics) -> Self {
        Self { sim_time: m.sim_time, average_speed: m.average_speed, vehicle_count: m.vehicle_count }
    }
}

/// Keeps the newest `max_size` points; the oldest is evicted first.
#[derive(Clone, Debug)]
pub struct MetricsHistory {
    max_size: usize,
    points:   VecDeque<MetricsPoint>,
}

impl MetricsHistory {
    /// `max_size` below 1 is raised to 1.
    pub fn new(max_size: usize) -> Self {
        let max_size = max_size.max(1);
        Self { max_size, points: VecDeque::with_capacity(max_size.min(1024)) }
    }

    pub fn record(&mut self, metrics: &Metrics) {
        self.push(MetricsPoint::from(metrics));
    }

    pub fn push(&mut self, point: MetricsPoint) {
        while self.points.len() >= self.max_size {
            self.points.pop_front();
        }
        self.points.push_back(point);
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &MetricsPoint> {
        self.points.iter()
    }

    pub fn latest(&self) -> Option<&MetricsPoint> {
        self.points.back()
    }

    pub fn times(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.sim_time).collect()
    }

    pub fn average_speeds(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.average_speed).collect()
    }

    pub fn vehicle_counts(&self) -> Vec<usize> {
        self.points.iter().map(|p| p.vehicle_count).collect()
    }

    pub fn reset(&mut self) {
        self.points.clear();
    }
}
