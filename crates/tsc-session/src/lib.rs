//! `tsc-session`: one connection to one simulation-engine instance.
//!
//! # Crate layout
//!
//! | Module      | Contents                                                        |
//! |-------------|-----------------------------------------------------------------|
//! | [`engine`]  | `SimulationEngine` capability trait, `SessionConfig`            |
//! | [`session`] | `SimulationSession<E>` lifecycle wrapper, `OrDegrade`           |
//! | [`memory`]  | `MemoryNetwork`, `MemoryEngine`: in-process engine for tests    |
//! | [`demand`]  | `DemandPlan`: seeded departure list shared by both sessions     |
//! | [`error`]   | `SessionError`, `SessionResult<T>`                              |
//!
//! # Lifecycle
//!
//! ```text
//! SimulationSession::new ──start──▶ open ──step/query/mutate──▶ open
//!                                     │
//!                                   close (idempotent, errors swallowed)
//!                                     ▼
//!                                   closed
//! ```
//!
//! No call is retried.  A failed `step` is the caller's signal to abort the
//! run; failed queries are usually degraded to "no data" with
//! [`OrDegrade`].

pub mod demand;
pub mod engine;
pub mod error;
pub mod memory;
pub mod session;

#[cfg(test)]
mod tests;

pub use demand::{DemandPlan, Departure};
pub use engine::{SessionConfig, SimulationEngine};
pub use error::{SessionError, SessionResult};
pub use memory::{MemoryEngine, MemoryNetwork};
pub use session::{OrDegrade, SessionStatus, SimulationSession};
