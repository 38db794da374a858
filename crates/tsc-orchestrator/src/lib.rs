//! `tsc-orchestrator`: runs both strategies side by side in lockstep.
//!
//! # Crate layout
//!
//! | Module           | Contents                                                      |
//! |------------------|---------------------------------------------------------------|
//! | [`orchestrator`] | `DualOrchestrator`: the lockstep loop, emergency injection     |
//! | [`handle`]       | `OrchestratorHandle`: worker thread, `initialize`/`start`/…    |
//! | [`status`]       | `OrchestratorState`, `SharedStatus` atomics, `RunStatus`       |
//! | [`config`]       | `ScenarioConfig`, `Strategy`                                   |
//! | [`factory`]      | `EngineFactory` (implemented for `MemoryNetwork`)              |
//! | [`observer`]     | `RunObserver` hooks, `TickSnapshot`                            |
//! | [`report`]       | `RunReport`, `RunOutcome`, `RunResults`                        |
//! | [`error`]        | `OrchestratorError`, `OrchestratorResult<T>`                   |
//!
//! # Quick-start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use tsc_control::OccupancyModel;
//! use tsc_orchestrator::{OrchestratorHandle, ScenarioConfig};
//! use tsc_session::MemoryNetwork;
//!
//! let mut handle = OrchestratorHandle::new(MemoryNetwork::four_way(), Arc::new(OccupancyModel::default()));
//! handle.initialize(ScenarioConfig::default())?;
//! handle.start()?;
//! handle.wait()?;
//! let comparison = handle.comparison_metrics();
//! ```

mod collect;

pub mod config;
pub mod error;
pub mod factory;
pub mod handle;
pub mod observer;
pub mod orchestrator;
pub mod report;
pub mod status;

#[cfg(test)]
mod tests;

pub use config::{ScenarioConfig, Strategy};
pub use error::{OrchestratorError, OrchestratorResult};
pub use factory::EngineFactory;
pub use handle::OrchestratorHandle;
pub use observer::{NoopObserver, RunObserver, TickSnapshot};
pub use orchestrator::DualOrchestrator;
pub use report::{ControllerSummary, RunOutcome, RunReport, RunResults};
pub use status::{OrchestratorState, RunStatus, SharedStatus};
