//! Tiered emergency-vehicle detection.
//!
//! | Tier           | Distance to stop line | Reported                       |
//! |----------------|-----------------------|--------------------------------|
//! | `EarlyWarning` | ≤ far threshold       | once per vehicle               |
//! | `Reservation`  | ≤ mid threshold       | once per vehicle               |
//! | `Preemption`   | ≤ near threshold      | every tick while it holds      |
//!
//! The tiers are nested: a vehicle first seen inside the mid threshold
//! announces both its early warning and its reservation on that tick.
//! Announcements are remembered per vehicle until [`EmergencyCoordinator::reset`].

use std::collections::BTreeMap;

use log::{debug, info};
use serde::{Deserialize, Serialize};
use tsc_core::{EmergencyThresholds, LaneId, Movement, PhaseIndex, Tick, VehicleId};
use tsc_topology::PhaseTopologyMap;

use crate::IntersectionSnapshot;

#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
pub enum EmergencyTier {
    EarlyWarning,
    Reservation,
    Preemption,
}

impl EmergencyTier {
    pub const ALL: [EmergencyTier; 3] = [EmergencyTier::EarlyWarning, EmergencyTier::Reservation, EmergencyTier::Preemption];

    /// Innermost tier whose threshold contains `distance_m`, if any.
    pub fn classify(distance_m: f64, thresholds: &EmergencyThresholds) -> Option<EmergencyTier> {
        if distance_m <= thresholds.near_m {
            Some(EmergencyTier::Preemption)
        } else if distance_m <= thresholds.mid_m {
            Some(EmergencyTier::Reservation)
        } else if distance_m <= thresholds.far_m {
            Some(EmergencyTier::EarlyWarning)
        } else {
            None
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            EmergencyTier::EarlyWarning => "early-warning",
            EmergencyTier::Reservation  => "reservation",
            EmergencyTier::Preemption   => "preemption",
        }
    }
}

/// One emergency vehicle observed on a controlled lane this tick.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EmergencyEvent {
    pub vehicle:      VehicleId,
    pub lane:         LaneId,
    pub movement:     Movement,
    pub distance_m:   f64,
    pub tier:         EmergencyTier,
    /// Green phase that serves the vehicle's movement.
    pub target_phase: PhaseIndex,
}

/// Per-intersection detector.  Owned by an adaptive controller.
#[derive(Clone, Debug)]
pub struct EmergencyCoordinator {
    emergency_type: String,
    thresholds:     EmergencyThresholds,
    /// Highest tier announced per vehicle.
    announced:      BTreeMap<VehicleId, EmergencyTier>,
    counts:         [u64; 3],
}

impl EmergencyCoordinator {
    pub fn new(emergency_type: impl Into<String>, thresholds: EmergencyThresholds) -> Self {
        Self {
            emergency_type: emergency_type.into(),
            thresholds,
            announced: BTreeMap::new(),
            counts: [0; 3],
        }
    }

    /// Vehicle types containing the configured type string are emergencies.
    pub fn is_emergency_type(&self, vtype: &str) -> bool {
        vtype.contains(self.emergency_type.as_str())
    }

    /// Scan a snapshot for emergency vehicles inside the far threshold.
    ///
    /// Events come back in lane order, then in lane-vehicle order (closest
    /// to the stop line first), which is the order in which the controller
    /// considers them.  Vehicles on lanes the topology cannot classify are
    /// ignored.
    pub fn scan(&mut self, now: Tick, snapshot: &IntersectionSnapshot, topology: &PhaseTopologyMap) -> Vec<EmergencyEvent> {
        let mut events = Vec::new();
        for lane in &snapshot.lanes {
            for v in &lane.vehicles {
                if !self.is_emergency_type(&v.vtype) {
                    continue;
                }
                let Some(tier) = EmergencyTier::classify(v.distance_to_stop, &self.thresholds) else {
                    continue;
                };
                let Some(movement) = topology.movement_of(&lane.lane) else {
                    debug!("{}: emergency {} on unclassified lane {}", snapshot.intersection, v.id, lane.lane);
                    continue;
                };
                let target_phase = topology.phase_for(movement.action());
                self.announce(now, snapshot, &v.id, tier, v.distance_to_stop);
                events.push(EmergencyEvent {
                    vehicle: v.id.clone(),
                    lane: lane.lane.clone(),
                    movement,
                    distance_m: v.distance_to_stop,
                    tier,
                    target_phase,
                });
            }
        }
        events
    }

    /// Record every tier up to `tier` not yet announced for `vehicle`.
    fn announce(&mut self, now: Tick, snapshot: &IntersectionSnapshot, vehicle: &VehicleId, tier: EmergencyTier, distance: f64) {
        let previous = self.announced.get(vehicle).copied();
        if previous.is_some_and(|p| p >= tier) {
            return;
        }
        for t in EmergencyTier::ALL.into_iter().filter(|&t| t <= tier && previous.is_none_or(|p| t > p)) {
            self.counts[t as usize] += 1;
            info!("{now} {}: {} for {vehicle} at {distance:.1} m", snapshot.intersection, t.as_str());
        }
        self.announced.insert(vehicle.clone(), tier);
    }

    /// Highest tier announced so far for a vehicle.
    pub fn tier_of(&self, vehicle: &VehicleId) -> Option<EmergencyTier> {
        self.announced.get(vehicle).copied()
    }

    /// Distinct vehicles that reached `tier`.
    pub fn count(&self, tier: EmergencyTier) -> u64 {
        self.counts[tier as usize]
    }

    pub fn reset(&mut self) {
        self.announced.clear();
        self.counts = [0; 3];
    }
}
