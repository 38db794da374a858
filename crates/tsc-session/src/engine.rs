//! The capability contract every simulation engine must provide.

use std::path::PathBuf;
use std::time::Duration;

use tsc_core::{
    IntersectionId, LaneGeometry, LaneId, LaneLink, PhaseIndex, RouteId, SignalProgram, VehicleId,
};

use crate::{DemandPlan, SessionResult};

/// Everything an engine needs to bring one instance up.
///
/// Both sessions of a dual run receive clones of the same config, apart
/// from `label`, so they see identical demand.
#[derive(Clone, Debug)]
pub struct SessionConfig {
    /// Human-readable name used in logs and errors (`"adaptive"`, `"fixed"`).
    pub label:        String,
    /// Network description for engines that load one from disk.
    pub network_path: Option<PathBuf>,
    /// Departures to load at start.
    pub demand:       DemandPlan,
    /// Upper bound on any single non-step engine call.
    pub io_timeout:   Duration,
}

impl SessionConfig {
    pub fn new(label: impl Into<String>, demand: DemandPlan) -> Self {
        Self {
            label: label.into(),
            network_path: None,
            demand,
            io_timeout: Duration::from_secs(5),
        }
    }

    /// Same config under a different label.
    pub fn relabel(&self, label: impl Into<String>) -> Self {
        Self { label: label.into(), ..self.clone() }
    }
}

/// Narrow interface onto one external microscopic traffic engine.
///
/// Implementations own the process or connection; the session wrapper only
/// tracks lifecycle.  Calls other than [`advance`][Self::advance] should
/// return within `SessionConfig::io_timeout`; the session wrapper reports a
/// slower call as [`SessionError::Timeout`][crate::SessionError::Timeout].
pub trait SimulationEngine: Send {
    // ── Lifecycle ─────────────────────────────────────────────────────────

    fn start(&mut self, config: &SessionConfig) -> SessionResult<()>;

    /// Release the engine.  Closing twice must be harmless.
    fn close(&mut self) -> SessionResult<()>;

    fn is_alive(&self) -> bool;

    /// Advance exactly one discrete time unit.
    fn advance(&mut self) -> SessionResult<()>;

    // ── Read queries ──────────────────────────────────────────────────────

    fn intersection_ids(&self) -> SessionResult<Vec<IntersectionId>>;

    /// Incoming lanes controlled by an intersection, without duplicates.
    fn controlled_lanes(&self, intersection: &IntersectionId) -> SessionResult<Vec<LaneId>>;

    fn lane_vehicles(&self, lane: &LaneId) -> SessionResult<Vec<VehicleId>>;

    /// Seconds the vehicle has spent halted so far.
    fn vehicle_waiting_time(&self, vehicle: &VehicleId) -> SessionResult<f64>;

    fn vehicle_type(&self, vehicle: &VehicleId) -> SessionResult<String>;

    /// Metres from the start of the vehicle's current lane.
    fn vehicle_lane_position(&self, vehicle: &VehicleId) -> SessionResult<f64>;

    fn lane_length(&self, lane: &LaneId) -> SessionResult<f64>;

    /// Vehicles on the lane moving slower than the halting speed.
    fn lane_halted(&self, lane: &LaneId) -> SessionResult<u32>;

    fn lane_geometry(&self, lane: &LaneId) -> SessionResult<LaneGeometry>;

    /// First compiled program of the intersection, if any.
    fn signal_program(&self, intersection: &IntersectionId) -> SessionResult<Option<SignalProgram>>;

    /// `links[i]` = connections governed by signal index `i`.
    fn controlled_links(&self, intersection: &IntersectionId) -> SessionResult<Vec<Vec<LaneLink>>>;

    fn current_phase(&self, intersection: &IntersectionId) -> SessionResult<PhaseIndex>;

    /// Vehicles that completed their trip during the last step.
    fn arrived_count(&self) -> SessionResult<u32>;

    fn route_ids(&self) -> SessionResult<Vec<RouteId>>;

    // ── Writes ────────────────────────────────────────────────────────────

    fn set_phase(&mut self, intersection: &IntersectionId, phase: PhaseIndex) -> SessionResult<()>;

    /// Insert a vehicle that departs at the next step.
    fn add_vehicle(&mut self, vehicle: &VehicleId, route: &RouteId, vtype: &str) -> SessionResult<()>;
}
