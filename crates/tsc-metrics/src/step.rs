//! Metrics of a single tick.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tsc_core::{IntersectionId, LaneId, PhaseIndex, Tick};

/// One intersection under one strategy at one tick.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct IntersectionMetrics {
    pub intersection:  IntersectionId,
    pub phase:         PhaseIndex,
    pub is_yellow:     bool,
    pub time_in_phase: u32,
    /// Accumulated waiting time summed over vehicles on controlled lanes.
    pub waiting_time:  f64,
    /// The same total divided by the number of vehicles that have waited.
    pub mean_waiting:  f64,
    pub queue_length:  u32,
    pub lane_halted:   BTreeMap<LaneId, u32>,
    pub emergency:     bool,
}

/// Network-wide figures for one strategy at one tick.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StepMetrics {
    pub tick:          Tick,
    pub waiting_time:  f64,
    pub queue_length:  u32,
    /// Vehicles that completed their trip during this tick.
    pub throughput:    u32,
    pub intersections: Vec<IntersectionMetrics>,
}

impl StepMetrics {
    /// Sum per-intersection figures into network totals.
    pub fn from_intersections(tick: Tick, throughput: u32, intersections: Vec<IntersectionMetrics>) -> Self {
        let waiting_time = intersections.iter().map(|m| m.waiting_time.max(0.0)).sum();
        let queue_length = intersections.iter().map(|m| m.queue_length).sum();
        Self { tick, waiting_time, queue_length, throughput, intersections }
    }

    /// Intersections currently servicing an emergency vehicle.
    pub fn emergencies(&self) -> usize {
        self.intersections.iter().filter(|m| m.emergency).count()
    }
}
