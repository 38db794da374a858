//! Lock-free run status shared between the worker and its readers.

use std::sync::atomic::{AtomicBool, AtomicU8, AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Top-level orchestrator lifecycle.
///
/// ```text
/// idle ──configure──▶ configured ──run──▶ running ──▶ completed | stopped | failed
///   ▲                                                        │
///   └──────────────────────────── reset ─────────────────────┘
/// ```
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum OrchestratorState {
    Idle       = 0,
    Configured = 1,
    Running    = 2,
    Stopped    = 3,
    Completed  = 4,
    Failed     = 5,
}

impl OrchestratorState {
    pub fn as_str(self) -> &'static str {
        match self {
            OrchestratorState::Idle       => "idle",
            OrchestratorState::Configured => "configured",
            OrchestratorState::Running    => "running",
            OrchestratorState::Stopped    => "stopped",
            OrchestratorState::Completed  => "completed",
            OrchestratorState::Failed     => "failed",
        }
    }

    /// The run has ended and its report is final.
    pub fn is_finished(self) -> bool {
        matches!(self, OrchestratorState::Stopped | OrchestratorState::Completed | OrchestratorState::Failed)
    }

    fn from_u8(v: u8) -> Self {
        match v {
            1 => OrchestratorState::Configured,
            2 => OrchestratorState::Running,
            3 => OrchestratorState::Stopped,
            4 => OrchestratorState::Completed,
            5 => OrchestratorState::Failed,
            _ => OrchestratorState::Idle,
        }
    }
}

/// Point-in-time view returned by `status()`.  May be one tick stale.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunStatus {
    pub state:        OrchestratorState,
    pub initialized:  bool,
    pub running:      bool,
    pub current_step: u64,
    pub max_steps:    u64,
}

/// Counters written by the worker, read from anywhere.
///
/// `running` is the cooperative cancel flag: the loop reads it at the top
/// of every iteration and `stop` clears it.
#[derive(Debug, Default)]
pub struct SharedStatus {
    state:        AtomicU8,
    running:      AtomicBool,
    current_step: AtomicU64,
    max_steps:    AtomicU64,
}

impl SharedStatus {
    pub fn state(&self) -> OrchestratorState {
        OrchestratorState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub(crate) fn set_state(&self, state: OrchestratorState) {
        self.state.store(state as u8, Ordering::Release);
    }

    #[inline]
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    pub(crate) fn set_running(&self, running: bool) {
        self.running.store(running, Ordering::Release);
    }

    /// Ask the loop to exit at the next iteration boundary.
    pub fn request_stop(&self) {
        self.set_running(false);
    }

    #[inline]
    pub fn current_step(&self) -> u64 {
        self.current_step.load(Ordering::Relaxed)
    }

    pub(crate) fn set_current_step(&self, step: u64) {
        self.current_step.store(step, Ordering::Relaxed);
    }

    pub(crate) fn set_max_steps(&self, max_steps: u64) {
        self.max_steps.store(max_steps, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> RunStatus {
        let state = self.state();
        RunStatus {
            state,
            initialized:  state != OrchestratorState::Idle,
            running:      self.is_running(),
            current_step: self.current_step(),
            max_steps:    self.max_steps.load(Ordering::Relaxed),
        }
    }

    pub(crate) fn clear(&self) {
        self.set_state(OrchestratorState::Idle);
        self.set_running(false);
        self.set_current_step(0);
        self.set_max_steps(0);
    }
}
