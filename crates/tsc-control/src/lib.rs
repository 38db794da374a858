//! `tsc-control`: per-intersection signal controllers.
//!
//! # Crate layout
//!
//! | Module          | Contents                                                     |
//! |-----------------|--------------------------------------------------------------|
//! | [`controller`]  | `SignalController` trait, `ControllerState`, `Signal`, config |
//! | [`fixed`]       | `FixedCycleController`: clock-driven round robin             |
//! | [`adaptive`]    | `AdaptiveController`: model-driven, emergency preemption     |
//! | [`emergency`]   | `EmergencyCoordinator`, tiers, events                        |
//! | [`observation`] | 80-cell multi-hot `Observation`, distance bands              |
//! | [`model`]       | `DecisionModel` trait, `OccupancyModel`, `IndexModel`        |
//! | [`snapshot`]    | `IntersectionSnapshot`: per-tick input of every controller   |
//! | [`error`]       | `ControlError`, `ControlResult<T>`                           |
//!
//! # Tick contract
//!
//! The caller builds one [`IntersectionSnapshot`] per intersection per tick
//! and calls [`SignalController::tick`].  The returned
//! [`ControlStep::command`] is the phase to push to the engine, if any.
//! Controllers never talk to an engine themselves.

pub mod adaptive;
pub mod controller;
pub mod emergency;
pub mod error;
pub mod fixed;
pub mod model;
pub mod observation;
pub mod snapshot;


pub use adaptive::{AdaptiveController, DecisionRecord};
pub use controller::{
    ControlStep, ControllerConfig, ControllerCounters, ControllerState, Signal, SignalController,
};
pub use emergency::{EmergencyCoordinator, EmergencyEvent, EmergencyTier};
pub use error::{ControlError, ControlResult};
pub use fixed::FixedCycleController;
pub use model::{DecisionModel, IndexModel, OccupancyModel};
pub use observation::{Observation, distance_band};
pub use snapshot::{IntersectionSnapshot, LaneSnapshot, VehicleSnapshot};
