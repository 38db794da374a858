//! Flat rows written by output backends.

use serde::Serialize;
use tsc_metrics::StepMetrics;
use tsc_orchestrator::Strategy;

/// Network totals of one strategy at one tick.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepRow {
    pub tick:         u64,
    pub strategy:     &'static str,
    pub waiting_time: f64,
    pub queue_length: u32,
    pub throughput:   u32,
}

/// One intersection of one strategy at one tick.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IntersectionRow {
    pub tick:         u64,
    pub strategy:     &'static str,
    pub intersection: String,
    pub phase:        u16,
    pub is_yellow:    bool,
    pub waiting_time: f64,
    pub queue_length: u32,
    pub emergency:    bool,
}

impl StepRow {
    pub fn from_metrics(strategy: Strategy, m: &StepMetrics) -> Self {
        Self {
            tick:         m.tick.0,
            strategy:     strategy.label(),
            waiting_time: m.waiting_time,
            queue_length: m.queue_length,
            throughput:   m.throughput,
        }
    }
}

impl IntersectionRow {
    /// One row per intersection in `m`.
    pub fn from_metrics(strategy: Strategy, m: &StepMetrics) -> Vec<Self> {
        m.intersections
            .iter()
            .map(|i| Self {
                tick:         m.tick.0,
                strategy:     strategy.label(),
                intersection: i.intersection.to_string(),
                phase:        i.phase.0,
                is_yellow:    i.is_yellow,
                waiting_time: i.waiting_time,
                queue_length: i.queue_length,
                emergency:    i.emergency,
            })
            .collect()
    }
}
