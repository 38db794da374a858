use thiserror::Error;

use tsc_control::ControlError;
use tsc_core::{CoreError, Tick};
use tsc_session::SessionError;

use crate::Strategy;

#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("invalid scenario: {0}")]
    Configuration(#[from] CoreError),

    #[error("cannot {action} while {state}")]
    InvalidState {
        action: &'static str,
        state:  &'static str,
    },

    /// Unexpected failure inside the lockstep loop.  Aborts the run.
    #[error("{strategy} session failed at {tick}: {source}")]
    Run {
        tick:     Tick,
        strategy: Strategy,
        #[source]
        source:   SessionError,
    },

    #[error("session error: {0}")]
    Session(#[from] SessionError),

    #[error("controller error: {0}")]
    Control(#[from] ControlError),

    #[error("failed to spawn run worker: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("run worker panicked")]
    WorkerPanicked,
}

pub type OrchestratorResult<T> = Result<T, OrchestratorError>;
