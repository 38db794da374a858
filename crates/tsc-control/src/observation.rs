//! The adaptive controller's state vector.
//!
//! Each controlled lane contributes its movement group (0..8); each vehicle
//! on it is placed in one of ten distance bands, finer near the stop line.
//! Cell `group * 10 + band` is set to 1 when at least one vehicle occupies
//! it.  The layout is fixed so a model trained on one intersection reads
//! any other the same way.

use tsc_core::Movement;
use tsc_topology::PhaseTopologyMap;

use crate::IntersectionSnapshot;

pub const BAND_COUNT: usize = 10;
pub const OBSERVATION_LEN: usize = Movement::COUNT * BAND_COUNT;

/// Exclusive upper bounds (metres) of bands 0..9; band 9 is open-ended.
pub const BAND_BOUNDS_M: [f64; BAND_COUNT - 1] = [7.0, 14.0, 21.0, 28.0, 40.0, 60.0, 100.0, 160.0, 400.0];

/// Distance band for a distance to the stop line.
pub fn distance_band(distance_m: f64) -> usize {
    BAND_BOUNDS_M
        .iter()
        .position(|&bound| distance_m < bound)
        .unwrap_or(BAND_COUNT - 1)
}

/// Multi-hot occupancy of (movement group × distance band).
#[derive(Clone, Debug, PartialEq)]
pub struct Observation([f32; OBSERVATION_LEN]);

impl Default for Observation {
    fn default() -> Self {
        Self([0.0; OBSERVATION_LEN])
    }
}

impl Observation {
    /// Encode a snapshot.  Lanes the topology could not classify are skipped.
    pub fn encode(snapshot: &IntersectionSnapshot, topology: &PhaseTopologyMap) -> Self {
        let mut obs = Self::default();
        for lane in &snapshot.lanes {
            let Some(movement) = topology.movement_of(&lane.lane) else {
                continue;
            };
            for v in &lane.vehicles {
                obs.mark(movement, distance_band(v.distance_to_stop));
            }
        }
        obs
    }

    pub fn mark(&mut self, movement: Movement, band: usize) {
        let cell = movement.group_code() as usize * BAND_COUNT + band.min(BAND_COUNT - 1);
        self.0[cell] = 1.0;
    }

    pub fn is_set(&self, movement: Movement, band: usize) -> bool {
        band < BAND_COUNT && self.0[movement.group_code() as usize * BAND_COUNT + band] > 0.0
    }

    /// Occupied cells of `movement` among its first `bands` bands.
    pub fn occupied_bands(&self, movement: Movement, bands: usize) -> usize {
        (0..bands.min(BAND_COUNT)).filter(|&b| self.is_set(movement, b)).count()
    }

    /// Occupied cells in total.
    pub fn occupancy(&self) -> usize {
        self.0.iter().filter(|&&c| c > 0.0).count()
    }

    #[inline]
    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }
}
