//! `tsc-metrics`: what a run measured, and how two runs compare.
//!
//! # Crate layout
//!
//! | Module        | Contents                                                     |
//! |---------------|--------------------------------------------------------------|
//! | [`step`]      | `StepMetrics`, `IntersectionMetrics`: one tick, one strategy  |
//! | [`aggregate`] | `MetricsAggregator` → `RunResult`; `compare` → `ComparisonMetrics` |
//!
//! Every figure is derived from engine queries of the tick it describes and
//! is never negative.  Improvements are the measured relative differences;
//! nothing is rescaled or clamped.

pub mod aggregate;
pub mod step;

#[cfg(test)]
mod tests;

pub use aggregate::{ComparisonMetrics, ComparisonSeries, Improvement, MetricsAggregator, RunResult, TimeSeries, compare};
pub use step::{IntersectionMetrics, StepMetrics};
