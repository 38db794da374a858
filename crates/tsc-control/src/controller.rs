//! The controller seam and the GREEN/YELLOW state both variants share.

use serde::{Deserialize, Serialize};
use tsc_core::{EmergencyThresholds, IntersectionId, PhaseIndex, RunConfig, Tick};
use tsc_topology::PhaseTopologyMap;

use crate::{ControlError, ControlResult, IntersectionSnapshot};

// ── Signal state ──────────────────────────────────────────────────────────────

/// Which phase is active and, during yellow, which green comes next.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Signal {
    Green(PhaseIndex),
    Yellow { yellow: PhaseIndex, next: PhaseIndex },
}

/// Per-intersection controller state.
///
/// Exactly one phase is active at a time.  A switch between two distinct
/// greens always passes through [`Signal::Yellow`] for at least the
/// configured yellow duration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ControllerState {
    pub signal:        Signal,
    /// Ticks since the last signal transition.
    pub time_in_phase: u32,
    /// Green → yellow transitions so far.
    pub phase_changes: u64,
}

impl ControllerState {
    pub fn new(initial: PhaseIndex) -> Self {
        Self { signal: Signal::Green(initial), time_in_phase: 0, phase_changes: 0 }
    }

    /// Physical phase currently commanded.
    pub fn current_phase(&self) -> PhaseIndex {
        match self.signal {
            Signal::Green(p) => p,
            Signal::Yellow { yellow, .. } => yellow,
        }
    }

    /// Green phase that is active or about to become active.
    pub fn target_phase(&self) -> PhaseIndex {
        match self.signal {
            Signal::Green(p) => p,
            Signal::Yellow { next, .. } => next,
        }
    }

    #[inline]
    pub fn is_yellow(&self) -> bool {
        matches!(self.signal, Signal::Yellow { .. })
    }

    /// Leave the current green for its yellow successor, heading to `next`.
    /// Returns the yellow phase to command.
    pub(crate) fn begin_yellow(&mut self, topology: &PhaseTopologyMap, next: PhaseIndex) -> PhaseIndex {
        let yellow = topology.yellow_after(self.target_phase());
        self.signal = Signal::Yellow { yellow, next };
        self.time_in_phase = 0;
        self.phase_changes += 1;
        yellow
    }

    /// Change where an in-progress yellow leads without restarting its dwell.
    pub(crate) fn retarget(&mut self, next: PhaseIndex) {
        if let Signal::Yellow { yellow, .. } = self.signal {
            self.signal = Signal::Yellow { yellow, next };
        }
    }

    /// Activate the pending green once the yellow has run for `dwell` ticks.
    pub(crate) fn finish_yellow(&mut self, dwell: u32) -> Option<PhaseIndex> {
        match self.signal {
            Signal::Yellow { next, .. } if self.time_in_phase >= dwell => {
                self.signal = Signal::Green(next);
                self.time_in_phase = 0;
                Some(next)
            }
            _ => None,
        }
    }
}

// ── Configuration ─────────────────────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq)]
pub struct ControllerConfig {
    pub green_duration:  u32,
    pub yellow_duration: u32,
    pub emergency_type:  String,
    pub thresholds:      EmergencyThresholds,
}

impl ControllerConfig {
    pub fn fixed(run: &RunConfig) -> Self {
        Self::with_green(run, run.green_duration_fixed)
    }

    pub fn adaptive(run: &RunConfig) -> Self {
        Self::with_green(run, run.green_duration_adaptive)
    }

    fn with_green(run: &RunConfig, green_duration: u32) -> Self {
        Self {
            green_duration,
            yellow_duration: run.yellow_duration,
            emergency_type: run.emergency_type.clone(),
            thresholds: run.thresholds,
        }
    }

    /// Ticks between two adaptive decisions.
    #[inline]
    pub fn decision_interval(&self) -> u32 {
        self.green_duration + self.yellow_duration
    }

    pub fn validate(&self) -> ControlResult<()> {
        if self.green_duration == 0 || self.yellow_duration == 0 {
            return Err(ControlError::Config(format!(
                "green ({}) and yellow ({}) durations must be at least 1 tick",
                self.green_duration, self.yellow_duration
            )));
        }
        Ok(())
    }
}

// ── SignalController ──────────────────────────────────────────────────────────

/// Outcome of one controller tick.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct ControlStep {
    /// Phase to send to the engine, when it changed this tick.
    pub command:   Option<PhaseIndex>,
    /// An emergency vehicle is being serviced.
    pub emergency: bool,
}

/// Strategy-specific counters, zero where a strategy does not track one.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControllerCounters {
    /// Full passes through the fixed green sequence.
    pub cycles:      u64,
    /// Decisions requested from the model.
    pub decisions:   u64,
    /// Emergency preemptions started.
    pub preemptions: u64,
}

/// A per-intersection signal state machine, driven once per tick.
///
/// The first tick always commands the initial green so the engine and the
/// controller agree from the start.
pub trait SignalController: Send {
    /// Short strategy label for logs and output.
    fn kind(&self) -> &'static str;

    fn intersection(&self) -> &IntersectionId;

    fn tick(&mut self, now: Tick, snapshot: &IntersectionSnapshot) -> ControlStep;

    fn state(&self) -> &ControllerState;

    fn counters(&self) -> ControllerCounters {
        ControllerCounters::default()
    }

    /// Return to the initial state, dropping counters and history.
    fn reset(&mut self);
}
