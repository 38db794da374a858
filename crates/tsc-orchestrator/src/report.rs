//! What a finished run hands back.

use serde::{Deserialize, Serialize};
use tsc_core::{IntersectionId, Tick};
use tsc_metrics::{ComparisonMetrics, RunResult, compare};

use crate::Strategy;

/// How the lockstep loop ended.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "reason", rename_all = "snake_case")]
pub enum RunOutcome {
    /// Reached `max_steps`.
    Completed,
    /// `stop` was requested.
    Stopped,
    /// A session failed; metrics up to the failing tick are kept.
    Failed(String),
}

/// Reduced metrics of every strategy that ran.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RunResults {
    pub adaptive: Option<RunResult>,
    pub fixed:    Option<RunResult>,
}

impl RunResults {
    pub fn get(&self, strategy: Strategy) -> Option<&RunResult> {
        match strategy {
            Strategy::Adaptive   => self.adaptive.as_ref(),
            Strategy::FixedCycle => self.fixed.as_ref(),
        }
    }

    pub(crate) fn set(&mut self, strategy: Strategy, result: RunResult) {
        match strategy {
            Strategy::Adaptive   => self.adaptive = Some(result),
            Strategy::FixedCycle => self.fixed = Some(result),
        }
    }

    /// Adaptive against fixed.  `None` for a single-strategy run.
    pub fn comparison(&self) -> Option<ComparisonMetrics> {
        Some(compare(self.adaptive.as_ref()?, self.fixed.as_ref()?))
    }
}

/// Final controller counters for one intersection.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ControllerSummary {
    pub strategy:      Strategy,
    pub intersection:  IntersectionId,
    pub phase_changes: u64,
    /// Completed fixed cycles; zero for adaptive control.
    pub cycles:        u64,
    /// Model decisions; zero for fixed-cycle control.
    pub decisions:     u64,
    pub preemptions:   u64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    pub scenario:    String,
    pub outcome:     RunOutcome,
    /// Ticks fully processed by every session.
    pub ticks:       u64,
    pub results:     RunResults,
    pub controllers: Vec<ControllerSummary>,
    /// Ticks at which an emergency vehicle was injected.
    pub injected:    Vec<Tick>,
    pub elapsed_ms:  u64,
}

impl RunReport {
    pub fn is_completed(&self) -> bool {
        self.outcome == RunOutcome::Completed
    }

    pub fn comparison(&self) -> Option<ComparisonMetrics> {
        self.results.comparison()
    }
}
