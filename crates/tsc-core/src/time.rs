//! Simulation time and run configuration.
//!
//! Time is a monotonically increasing `Tick` counter; one tick is one
//! discrete engine step (one simulated second for the engines this targets).
//! Both sessions of a dual run share the same tick value at all times.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{CoreError, CoreResult};

// ── Tick ─────────────────────────────────────────────────────────────────────

/// An absolute simulation tick counter.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Tick(pub u64);

impl Tick {
    pub const ZERO: Tick = Tick(0);

    /// Return the tick `n` steps after `self`.
    #[inline]
    pub fn offset(self, n: u64) -> Tick {
        Tick(self.0 + n)
    }

    /// Ticks elapsed from `earlier` to `self`, saturating at zero.
    #[inline]
    pub fn since(self, earlier: Tick) -> u64 {
        self.0.saturating_sub(earlier.0)
    }

    /// `true` when this tick is a positive multiple of `interval`.
    ///
    /// Tick 0 never qualifies, and `interval == 0` disables the schedule.
    #[inline]
    pub fn is_scheduled(self, interval: u64) -> bool {
        interval > 0 && self.0 >= interval && self.0.is_multiple_of(interval)
    }
}

impl std::ops::Add<u64> for Tick {
    type Output = Tick;
    #[inline]
    fn add(self, rhs: u64) -> Tick {
        Tick(self.0 + rhs)
    }
}

impl std::ops::Sub for Tick {
    type Output = u64;
    #[inline]
    fn sub(self, rhs: Tick) -> u64 {
        self.0 - rhs.0
    }
}

impl fmt::Display for Tick {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "T{}", self.0)
    }
}

// ── EmergencyThresholds ───────────────────────────────────────────────────────

/// Distance-to-stop-line thresholds (metres) for the three emergency tiers.
///
/// Must be strictly nested: `far > mid > near > 0`.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmergencyThresholds {
    /// At or inside this distance: early warning.
    pub far_m:  f64,
    /// At or inside this distance: reservation.
    pub mid_m:  f64,
    /// At or inside this distance: preemption.
    pub near_m: f64,
}

impl Default for EmergencyThresholds {
    fn default() -> Self {
        Self { far_m: 250.0, mid_m: 120.0, near_m: 50.0 }
    }
}

// ── RunConfig ─────────────────────────────────────────────────────────────────

/// Parameters of one comparison run, shared by both strategies.
///
/// Deserialises with per-field defaults so a JSON file only needs to name
/// what it overrides.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Ticks to simulate (exclusive upper bound).
    pub max_steps: u64,

    /// Master seed for demand generation and emergency route choice.
    pub seed: u64,

    /// Vehicles in the generated demand.
    pub vehicle_count: u32,

    /// Green hold between adaptive decisions.
    pub green_duration_adaptive: u32,

    /// Green length of every phase in the fixed cycle.
    pub green_duration_fixed: u32,

    /// Minimum yellow dwell between two distinct greens.
    pub yellow_duration: u32,

    /// Inject one emergency vehicle every N ticks (never at tick 0).
    /// `0` disables injection.
    pub emergency_interval: u64,

    /// Vehicle type id used for injected vehicles.  Detection matches any
    /// type containing this string.
    pub emergency_type: String,

    pub thresholds: EmergencyThresholds,

    /// Bound of the live snapshot channel.
    pub snapshot_capacity: usize,

    /// Keep every Nth tick in reported time series.
    pub downsample_stride: usize,

    /// Sleep after each tick, for live visualisation.  `0` = no throttle.
    pub step_delay_ms: u64,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            max_steps:               5400,
            seed:                    42,
            vehicle_count:           1000,
            green_duration_adaptive: 10,
            green_duration_fixed:    30,
            yellow_duration:         4,
            emergency_interval:      120,
            emergency_type:          "emergency".to_owned(),
            thresholds:              EmergencyThresholds::default(),
            snapshot_capacity:       1024,
            downsample_stride:       10,
            step_delay_ms:           0,
        }
    }
}

impl RunConfig {
    /// The tick at which the run ends (exclusive upper bound).
    #[inline]
    pub fn end_tick(&self) -> Tick {
        Tick(self.max_steps)
    }

    /// Ticks between two adaptive decisions.
    #[inline]
    pub fn decision_interval(&self) -> u32 {
        self.green_duration_adaptive + self.yellow_duration
    }

    /// Reject configurations that would make a controller ill-defined.
    pub fn validate(&self) -> CoreResult<()> {
        if self.max_steps == 0 {
            return Err(CoreError::Config("max_steps must be positive".into()));
        }
        for (name, value) in [
            ("green_duration_adaptive", self.green_duration_adaptive),
            ("green_duration_fixed", self.green_duration_fixed),
            ("yellow_duration", self.yellow_duration),
        ] {
            if value == 0 {
                return Err(CoreError::Config(format!("{name} must be at least 1 tick")));
            }
        }
        let t = &self.thresholds;
        if !(t.far_m > t.mid_m && t.mid_m > t.near_m && t.near_m > 0.0) {
            return Err(CoreError::Config(format!(
                "emergency thresholds must satisfy far > mid > near > 0 (got {} / {} / {})",
                t.far_m, t.mid_m, t.near_m
            )));
        }
        if self.emergency_type.is_empty() {
            return Err(CoreError::Config("emergency_type must not be empty".into()));
        }
        if self.snapshot_capacity == 0 {
            return Err(CoreError::Config("snapshot_capacity must be positive".into()));
        }
        if self.downsample_stride == 0 {
            return Err(CoreError::Config("downsample_stride must be positive".into()));
        }
        Ok(())
    }
}
