//! Seeded demand generation.
//!
//! Departure ticks follow a Weibull(k = 2) ramp: draws are sorted and
//! rescaled linearly onto `0..max_steps`, so traffic builds up early in the
//! run and tails off towards the end.  Three quarters of the vehicles take a
//! straight route and one quarter a turning route.

use serde::{Deserialize, Serialize};
use tsc_core::{RouteId, SimRng, Tick, VehicleId};

/// Weibull shape parameter of the departure ramp.
const WEIBULL_SHAPE: f64 = 2.0;

/// Share of vehicles assigned a straight route.
const STRAIGHT_SHARE: f64 = 0.75;

/// Vehicle type of generated demand.
pub const STANDARD_VTYPE: &str = "standard_car";

/// One scheduled vehicle insertion.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Departure {
    pub tick:    Tick,
    pub vehicle: VehicleId,
    pub route:   RouteId,
    pub vtype:   String,
}

/// Departures sorted by tick.  Loaded unchanged into both sessions.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DemandPlan {
    departures: Vec<Departure>,
}

impl DemandPlan {
    /// Build a plan from explicit departures (sorted on construction).
    pub fn from_departures(mut departures: Vec<Departure>) -> Self {
        departures.sort_by_key(|d| d.tick);
        Self { departures }
    }

    /// Generate `vehicle_count` departures over `0..max_steps`.
    ///
    /// Routes whose id starts with `!` are never used.  When `turning` is
    /// empty every vehicle goes straight; when both lists are empty the plan
    /// is empty.
    pub fn generate(
        straight:      &[RouteId],
        turning:       &[RouteId],
        vehicle_count: u32,
        max_steps:     u64,
        seed:          u64,
    ) -> Self {
        let straight: Vec<&RouteId> = straight.iter().filter(|r| !r.is_internal()).collect();
        let turning: Vec<&RouteId> = turning.iter().filter(|r| !r.is_internal()).collect();
        if (straight.is_empty() && turning.is_empty()) || vehicle_count == 0 || max_steps == 0 {
            return Self::default();
        }

        let mut rng = SimRng::new(seed);
        let ticks = ramp(&mut rng, vehicle_count as usize, max_steps);

        let departures = ticks
            .into_iter()
            .enumerate()
            .filter_map(|(i, tick)| {
                let go_straight = turning.is_empty() || (!straight.is_empty() && rng.gen_bool(STRAIGHT_SHARE));
                let pool = if go_straight { &straight } else { &turning };
                let route = (*rng.choose(pool)?).clone();
                Some(Departure {
                    tick,
                    vehicle: VehicleId::new(format!("veh_{i}")),
                    route,
                    vtype: STANDARD_VTYPE.to_owned(),
                })
            })
            .collect();
        Self { departures }
    }

    pub fn departures(&self) -> &[Departure] {
        &self.departures
    }

    pub fn len(&self) -> usize {
        self.departures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.departures.is_empty()
    }
}

/// Sorted Weibull draws rescaled onto `[0, max_steps - 1]` and rounded.
fn ramp(rng: &mut SimRng, n: usize, max_steps: u64) -> Vec<Tick> {
    // Inverse CDF: F⁻¹(u) = (-ln(1 - u))^(1/k).
    let mut draws: Vec<f64> = (0..n)
        .map(|_| {
            let u: f64 = rng.random();
            (-(1.0 - u).ln()).powf(1.0 / WEIBULL_SHAPE)
        })
        .collect();
    draws.sort_by(f64::total_cmp);

    let (lo, hi) = match (draws.first(), draws.last()) {
        (Some(&lo), Some(&hi)) => (lo, hi),
        _ => return Vec::new(),
    };
    let top = (max_steps - 1) as f64;
    let span = hi - lo;
    draws
        .into_iter()
        .map(|d| {
            let scaled = if span > 0.0 { (d - lo) / span * top } else { 0.0 };
            Tick(scaled.round().clamp(0.0, top) as u64)
        })
        .collect()
}
