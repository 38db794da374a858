//! `tsc-topology`: phase-topology discovery.
//!
//! # Crate layout
//!
//! | Module     | Contents                                                       |
//! |------------|----------------------------------------------------------------|
//! | [`map`]    | `PhaseTopologyMap` (immutable), `TopologyOrigin`               |
//! | [`build`]  | `build_topology` and its named heuristic steps                 |
//! | [`error`]  | `TopologyError`, `TopologyResult<T>`                           |
//!
//! # Pipeline
//!
//! ```text
//! lane geometry ──classify_lane──▶ lane → Movement
//! links ──signal_movements──▶ signal index → {Movement}
//! program ──green_phases──▶ green phase list (fixed cycle order)
//!         ──scoring_phases──▶ any phase showing green
//!         ──phase_service──▶ phase → {Movement served}
//! action ──best_phase──▶ phase   (else cyclic_fallback over greens)
//! green phase ──yellow_successor──▶ yellow phase
//! ```
//!
//! Discovery never fails from the caller's point of view:
//! [`PhaseTopologyMap::discover`] falls back to the fixed four-phase layout
//! (greens 0, 2, 4, 6; yellows immediately after) and logs a warning.

pub mod build;
pub mod error;
pub mod map;


pub use build::{
    RawTopology, best_phase, build_topology, classify_lane, cyclic_fallback, green_phases,
    phase_service, scoring_phases, signal_movements, yellow_successor,
};
pub use error::{TopologyError, TopologyResult};
pub use map::{PhaseTopologyMap, TopologyOrigin};
