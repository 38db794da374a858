//! What a controller sees of its intersection each tick.
//!
//! Snapshots are assembled by the caller from engine queries.  A query that
//! failed has already been degraded to "no data", so every field here is
//! plain data and every aggregate is non-negative.

use serde::{Deserialize, Serialize};
use tsc_core::{IntersectionId, LaneId, VehicleId};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VehicleSnapshot {
    pub id:               VehicleId,
    pub vtype:            String,
    /// Metres between the vehicle and the stop line (lane length − position).
    pub distance_to_stop: f64,
    /// Accumulated seconds spent halted.
    pub waiting_time:     f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LaneSnapshot {
    pub lane:     LaneId,
    pub length:   f64,
    pub halted:   u32,
    pub vehicles: Vec<VehicleSnapshot>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct IntersectionSnapshot {
    pub intersection: IntersectionId,
    pub lanes:        Vec<LaneSnapshot>,
}

impl IntersectionSnapshot {
    pub fn empty(intersection: IntersectionId) -> Self {
        Self { intersection, lanes: Vec::new() }
    }

    /// Halted vehicles over all controlled lanes.
    pub fn queue_length(&self) -> u32 {
        self.lanes.iter().map(|l| l.halted).sum()
    }

    /// Sum of accumulated waiting time of every vehicle on a controlled lane.
    pub fn total_waiting_time(&self) -> f64 {
        self.vehicles().map(|v| v.waiting_time.max(0.0)).sum()
    }

    /// Vehicles with a positive waiting time.
    pub fn waiting_vehicles(&self) -> usize {
        self.vehicles().filter(|v| v.waiting_time > 0.0).count()
    }

    pub fn vehicles(&self) -> impl Iterator<Item = &VehicleSnapshot> {
        self.lanes.iter().flat_map(|l| l.vehicles.iter())
    }
}
