//! Reduction of per-tick streams into run summaries and comparisons.

use serde::{Deserialize, Serialize};

use crate::StepMetrics;

// ── TimeSeries ────────────────────────────────────────────────────────────────

/// Every `stride`-th tick of a run, starting at the first.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TimeSeries {
    pub ticks:        Vec<u64>,
    pub waiting_time: Vec<f64>,
    pub queue_length: Vec<u32>,
    pub throughput:   Vec<u32>,
}

// ── RunResult ─────────────────────────────────────────────────────────────────

/// Summary of one strategy's run.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RunResult {
    pub steps:             u64,
    pub mean_waiting_time: f64,
    pub peak_waiting_time: f64,
    pub mean_queue_length: f64,
    pub peak_queue_length: u32,
    pub total_throughput:  u64,
    pub series:            TimeSeries,
}

/// Collects one strategy's per-tick metrics.
#[derive(Clone, Debug, Default)]
pub struct MetricsAggregator {
    steps: Vec<StepMetrics>,
}

impl MetricsAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, step: StepMetrics) {
        self.steps.push(step);
    }

    pub fn steps(&self) -> &[StepMetrics] {
        &self.steps
    }

    pub fn last(&self) -> Option<&StepMetrics> {
        self.steps.last()
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn clear(&mut self) {
        self.steps.clear();
    }

    /// Summarise everything recorded so far.  An empty run yields zeros.
    ///
    /// `stride` of 0 is treated as 1.
    pub fn reduce(&self, stride: usize) -> RunResult {
        let n = self.steps.len();
        if n == 0 {
            return RunResult::default();
        }
        let waiting = self.steps.iter().map(|s| s.waiting_time);
        let queue = self.steps.iter().map(|s| s.queue_length);

        let mut series = TimeSeries::default();
        for s in self.steps.iter().step_by(stride.max(1)) {
            series.ticks.push(s.tick.0);
            series.waiting_time.push(s.waiting_time);
            series.queue_length.push(s.queue_length);
            series.throughput.push(s.throughput);
        }

        RunResult {
            steps:             n as u64,
            mean_waiting_time: waiting.clone().sum::<f64>() / n as f64,
            peak_waiting_time: waiting.fold(0.0, f64::max),
            mean_queue_length: queue.clone().map(f64::from).sum::<f64>() / n as f64,
            peak_queue_length: queue.max().unwrap_or(0),
            total_throughput:  self.steps.iter().map(|s| u64::from(s.throughput)).sum(),
            series,
        }
    }
}

// ── Comparison ────────────────────────────────────────────────────────────────

/// Relative difference of adaptive against fixed, in percent.
///
/// Positive is better for the adaptive strategy in every field.  A field is
/// 0 when the fixed baseline is 0.
#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Improvement {
    pub waiting_time_reduction: f64,
    pub queue_length_reduction: f64,
    pub throughput_increase:    f64,
}

/// Both strategies' down-sampled curves on a shared tick axis.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ComparisonSeries {
    pub ticks:            Vec<u64>,
    pub adaptive_waiting: Vec<f64>,
    pub fixed_waiting:    Vec<f64>,
    pub adaptive_queue:   Vec<u32>,
    pub fixed_queue:      Vec<u32>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ComparisonMetrics {
    pub adaptive:    RunResult,
    pub fixed:       RunResult,
    pub improvement: Improvement,
    pub series:      ComparisonSeries,
}

fn reduction(baseline: f64, candidate: f64) -> f64 {
    if baseline > 0.0 { (baseline - candidate) / baseline * 100.0 } else { 0.0 }
}

fn increase(baseline: f64, candidate: f64) -> f64 {
    if baseline > 0.0 { (candidate - baseline) / baseline * 100.0 } else { 0.0 }
}

/// Compare two reduced runs.  Series are truncated to the shorter run.
pub fn compare(adaptive: &RunResult, fixed: &RunResult) -> ComparisonMetrics {
    let improvement = Improvement {
        waiting_time_reduction: reduction(fixed.mean_waiting_time, adaptive.mean_waiting_time),
        queue_length_reduction: reduction(fixed.mean_queue_length, adaptive.mean_queue_length),
        throughput_increase:    increase(fixed.total_throughput as f64, adaptive.total_throughput as f64),
    };

    let (a, f) = (&adaptive.series, &fixed.series);
    let n = a.ticks.len().min(f.ticks.len());
    let series = ComparisonSeries {
        ticks:            a.ticks[..n].to_vec(),
        adaptive_waiting: a.waiting_time[..n].to_vec(),
        fixed_waiting:    f.waiting_time[..n].to_vec(),
        adaptive_queue:   a.queue_length[..n].to_vec(),
        fixed_queue:      f.queue_length[..n].to_vec(),
    };

    ComparisonMetrics { adaptive: adaptive.clone(), fixed: fixed.clone(), improvement, series }
}
