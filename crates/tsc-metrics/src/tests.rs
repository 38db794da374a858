use std::collections::BTreeMap;

use tsc_core::{IntersectionId, PhaseIndex, Tick};

use crate::*;

fn intersection(id: &str, waiting: f64, queue: u32) -> IntersectionMetrics {
    IntersectionMetrics {
        intersection:  IntersectionId::from(id),
        phase:         PhaseIndex(0),
        is_yellow:     false,
        time_in_phase: 0,
        waiting_time:  waiting,
        mean_waiting:  0.0,
        queue_length:  queue,
        lane_halted:   BTreeMap::new(),
        emergency:     false,
    }
}

fn step(tick: u64, waiting: f64, queue: u32, throughput: u32) -> StepMetrics {
    StepMetrics::from_intersections(Tick(tick), throughput, vec![intersection("TL", waiting, queue)])
}

fn run(values: &[(f64, u32, u32)]) -> MetricsAggregator {
    let mut agg = MetricsAggregator::new();
    for (i, &(w, q, t)) in values.iter().enumerate() {
        agg.record(step(i as u64, w, q, t));
    }
    agg
}

// ── Step ──────────────────────────────────────────────────────────────────────

mod steps {
    use super::*;

    #[test]
    fn totals_sum_over_intersections() {
        let mut b = intersection("B", 4.0, 2);
        b.emergency = true;
        let s = StepMetrics::from_intersections(Tick(3), 1, vec![intersection("A", 6.0, 3), b]);
        assert_eq!(s.waiting_time, 10.0);
        assert_eq!(s.queue_length, 5);
        assert_eq!(s.throughput, 1);
        assert_eq!(s.emergencies(), 1);
    }

    #[test]
    fn no_intersections_is_zero() {
        let s = StepMetrics::from_intersections(Tick(0), 0, Vec::new());
        assert_eq!(s.waiting_time, 0.0);
        assert_eq!(s.queue_length, 0);
    }
}

// ── Reduce ────────────────────────────────────────────────────────────────────

mod reduce {
    use super::*;

    #[test]
    fn empty_run_is_all_zero() {
        let r = MetricsAggregator::new().reduce(10);
        assert_eq!(r, RunResult::default());
    }

    #[test]
    fn means_peaks_and_totals() {
        let r = run(&[(2.0, 1, 0), (4.0, 3, 2), (6.0, 2, 1)]).reduce(1);
        assert_eq!(r.steps, 3);
        assert!((r.mean_waiting_time - 4.0).abs() < 1e-9);
        assert_eq!(r.peak_waiting_time, 6.0);
        assert!((r.mean_queue_length - 2.0).abs() < 1e-9);
        assert_eq!(r.peak_queue_length, 3);
        assert_eq!(r.total_throughput, 3);
    }

    #[test]
    fn series_takes_every_stride_th_tick() {
        let values: Vec<_> = (0..25).map(|i| (i as f64, i, 0)).collect();
        let r = run(&values).reduce(10);
        assert_eq!(r.series.ticks, vec![0, 10, 20]);
        assert_eq!(r.series.queue_length, vec![0, 10, 20]);
        assert_eq!(r.series.waiting_time, vec![0.0, 10.0, 20.0]);
    }

    #[test]
    fn zero_stride_keeps_every_tick() {
        let r = run(&[(1.0, 1, 1), (1.0, 1, 1)]).reduce(0);
        assert_eq!(r.series.ticks.len(), 2);
    }
}

// ── Compare ───────────────────────────────────────────────────────────────────

mod comparison {
    use super::*;

    #[test]
    fn improvement_formulas() {
        let adaptive = run(&[(5.0, 2, 12)]).reduce(1);
        let fixed = run(&[(10.0, 4, 10)]).reduce(1);
        let c = compare(&adaptive, &fixed);
        assert!((c.improvement.waiting_time_reduction - 50.0).abs() < 1e-9);
        assert!((c.improvement.queue_length_reduction - 50.0).abs() < 1e-9);
        assert!((c.improvement.throughput_increase - 20.0).abs() < 1e-9);
    }

    #[test]
    fn worse_adaptive_is_negative_not_clamped() {
        let adaptive = run(&[(15.0, 6, 5)]).reduce(1);
        let fixed = run(&[(10.0, 4, 10)]).reduce(1);
        let c = compare(&adaptive, &fixed);
        assert!((c.improvement.waiting_time_reduction + 50.0).abs() < 1e-9);
        assert!((c.improvement.queue_length_reduction + 50.0).abs() < 1e-9);
        assert!((c.improvement.throughput_increase + 50.0).abs() < 1e-9);
    }

    #[test]
    fn zero_baseline_gives_zero() {
        let adaptive = run(&[(3.0, 1, 4)]).reduce(1);
        let fixed = run(&[(0.0, 0, 0)]).reduce(1);
        assert_eq!(compare(&adaptive, &fixed).improvement, Improvement::default());
    }

    #[test]
    fn series_are_aligned_to_the_shorter_run() {
        let adaptive = run(&[(1.0, 1, 0); 30]).reduce(10);
        let fixed = run(&[(2.0, 2, 0); 15]).reduce(10);
        let c = compare(&adaptive, &fixed);
        assert_eq!(c.series.ticks, vec![0, 10]);
        assert_eq!(c.series.adaptive_waiting, vec![1.0, 1.0]);
        assert_eq!(c.series.fixed_queue, vec![2, 2]);
    }

    #[test]
    fn serializes_to_json() {
        let r = run(&[(1.0, 1, 1)]).reduce(1);
        let json = serde_json::to_value(compare(&r, &r)).unwrap();
        assert_eq!(json["improvement"]["waiting_time_reduction"], 0.0);
        assert_eq!(json["adaptive"]["total_throughput"], 1);
    }
}

// ── Properties ────────────────────────────────────────────────────────────────

mod properties {
    use proptest::prelude::*;

    use super::*;

    proptest! {
        #[test]
        fn summaries_are_non_negative(
            values in prop::collection::vec((0.0f64..1e4, 0u32..500, 0u32..20), 0..200),
            stride in 1usize..20,
        ) {
            let r = run(&values).reduce(stride);
            prop_assert!(r.mean_waiting_time >= 0.0);
            prop_assert!(r.mean_queue_length >= 0.0);
            prop_assert!(r.peak_waiting_time >= r.mean_waiting_time - 1e-6);
            prop_assert!(f64::from(r.peak_queue_length) >= r.mean_queue_length - 1e-6);
            prop_assert_eq!(r.series.ticks.len(), values.len().div_ceil(stride));
        }
    }
}
