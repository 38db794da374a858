//! `tsc-core`: foundational types for the traffic-signal comparison framework.
//!
//! This crate is a dependency of every other `tsc-*` crate.  It has no
//! `tsc-*` dependencies and minimal external ones (`rand`, `thiserror`,
//! `serde`).
//!
//! # What lives here
//!
//! | Module        | Contents                                                   |
//! |---------------|------------------------------------------------------------|
//! | [`ids`]       | `PhaseIndex`, `SignalIndex`, `IntersectionId`, `LaneId`, … |
//! | [`geo`]       | `Point`, terminal-segment bearing                          |
//! | [`movement`]  | `Approach`, `Turn`, `Movement`, `ActionClass`              |
//! | [`program`]   | Raw signal program, link, and lane-geometry data           |
//! | [`time`]      | `Tick`, `RunConfig`, `EmergencyThresholds`                 |
//! | [`rng`]       | `SimRng` (seeded, run-level)                               |
//! | [`error`]     | `CoreError`, `CoreResult`                                  |

pub mod error;
pub mod geo;
pub mod ids;
pub mod movement;
pub mod program;
pub mod rng;
pub mod time;


// ── Re-exports ────────────────────────────────────────────────────────────────

pub use error::{CoreError, CoreResult};
pub use geo::Point;
pub use ids::{IntersectionId, LaneId, PhaseIndex, RouteId, SignalIndex, VehicleId};
pub use movement::{ActionClass, Approach, Movement, Turn};
pub use program::{LaneGeometry, LaneLink, PhaseDef, SignalProgram};
pub use rng::SimRng;
pub use time::{EmergencyThresholds, RunConfig, Tick};
