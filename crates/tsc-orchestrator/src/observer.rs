//! Run observer hooks and the live snapshot record.

use serde::{Deserialize, Serialize};
use tsc_core::{RouteId, Tick, VehicleId};
use tsc_metrics::StepMetrics;

use crate::{RunReport, ScenarioConfig, Strategy};

/// Callbacks invoked by [`DualOrchestrator::run`][crate::DualOrchestrator::run].
///
/// All methods default to no-ops.
pub trait RunObserver {
    /// Called once, after both sessions are open and before the first tick.
    fn on_run_start(&mut self, _scenario: &ScenarioConfig) {}

    fn on_tick_start(&mut self, _tick: Tick) {}

    /// One strategy's metrics for the tick, after all its controllers ran.
    fn on_step(&mut self, _strategy: Strategy, _metrics: &StepMetrics) {}

    /// An emergency vehicle was injected into every open session.
    fn on_emergency(&mut self, _tick: Tick, _vehicle: &VehicleId, _route: &RouteId) {}

    fn on_tick_end(&mut self, _tick: Tick) {}

    /// Called once after the sessions are closed, whatever the outcome.
    fn on_run_end(&mut self, _report: &RunReport) {}
}

/// A [`RunObserver`] that does nothing.
pub struct NoopObserver;

impl RunObserver for NoopObserver {}

/// What the worker publishes on the live channel every tick.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TickSnapshot {
    pub tick:     Tick,
    pub adaptive: Option<StepMetrics>,
    pub fixed:    Option<StepMetrics>,
}

impl TickSnapshot {
    pub fn get(&self, strategy: Strategy) -> Option<&StepMetrics> {
        match strategy {
            Strategy::Adaptive   => self.adaptive.as_ref(),
            Strategy::FixedCycle => self.fixed.as_ref(),
        }
    }
}
