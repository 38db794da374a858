use std::ops::Range;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use tsc_control::OccupancyModel;
use tsc_core::{
    IntersectionId, LaneGeometry, LaneId, LaneLink, PhaseIndex, RouteId, RunConfig, SignalProgram, Tick,
    VehicleId,
};
use tsc_session::{
    DemandPlan, MemoryEngine, MemoryNetwork, SessionConfig, SessionError, SessionResult, SimulationEngine,
};

use crate::*;

// ── Helpers ───────────────────────────────────────────────────────────────────

fn run_config(max_steps: u64) -> RunConfig {
    RunConfig {
        max_steps,
        vehicle_count: 60,
        green_duration_adaptive: 10,
        green_duration_fixed: 10,
        yellow_duration: 4,
        emergency_interval: 120,
        ..RunConfig::default()
    }
}

fn scenario(max_steps: u64) -> ScenarioConfig {
    ScenarioConfig::new("test", run_config(max_steps))
}

fn model() -> Arc<dyn tsc_control::DecisionModel> {
    Arc::new(OccupancyModel::default())
}

type Injections = Arc<Mutex<Vec<(Strategy, VehicleId, RouteId, String)>>>;

/// `MemoryEngine` that records every `add_vehicle` call.
///
/// Lane queries fail while the tick being collected lies in `blackout`;
/// with `rejects` set every `add_vehicle` is refused.
struct RecordingEngine {
    inner:    MemoryEngine,
    strategy: Strategy,
    log:      Injections,
    advanced: u64,
    blackout: Option<Range<u64>>,
    rejects:  bool,
}

impl RecordingEngine {
    fn lane_query<T>(&self, read: impl FnOnce(&MemoryEngine) -> SessionResult<T>) -> SessionResult<T> {
        // Tick n is collected after the (n + 1)-th advance.
        let tick = self.advanced.saturating_sub(1);
        match &self.blackout {
            Some(window) if window.contains(&tick) => Err(SessionError::Engine("connection lost".into())),
            _ => read(&self.inner),
        }
    }
}

impl SimulationEngine for RecordingEngine {
    fn start(&mut self, config: &SessionConfig) -> SessionResult<()> {
        self.inner.start(config)
    }
    fn close(&mut self) -> SessionResult<()> {
        self.inner.close()
    }
    fn is_alive(&self) -> bool {
        self.inner.is_alive()
    }
    fn advance(&mut self) -> SessionResult<()> {
        self.inner.advance()?;
        self.advanced += 1;
        Ok(())
    }
    fn intersection_ids(&self) -> SessionResult<Vec<IntersectionId>> {
        self.inner.intersection_ids()
    }
    fn controlled_lanes(&self, intersection: &IntersectionId) -> SessionResult<Vec<LaneId>> {
        self.lane_query(|e| e.controlled_lanes(intersection))
    }
    fn lane_vehicles(&self, lane: &LaneId) -> SessionResult<Vec<VehicleId>> {
        self.lane_query(|e| e.lane_vehicles(lane))
    }
    fn vehicle_waiting_time(&self, vehicle: &VehicleId) -> SessionResult<f64> {
        self.inner.vehicle_waiting_time(vehicle)
    }
    fn vehicle_type(&self, vehicle: &VehicleId) -> SessionResult<String> {
        self.inner.vehicle_type(vehicle)
    }
    fn vehicle_lane_position(&self, vehicle: &VehicleId) -> SessionResult<f64> {
        self.inner.vehicle_lane_position(vehicle)
    }
    fn lane_length(&self, lane: &LaneId) -> SessionResult<f64> {
        self.inner.lane_length(lane)
    }
    fn lane_halted(&self, lane: &LaneId) -> SessionResult<u32> {
        self.lane_query(|e| e.lane_halted(lane))
    }
    fn lane_geometry(&self, lane: &LaneId) -> SessionResult<LaneGeometry> {
        self.inner.lane_geometry(lane)
    }
    fn signal_program(&self, intersection: &IntersectionId) -> SessionResult<Option<SignalProgram>> {
        self.inner.signal_program(intersection)
    }
    fn controlled_links(&self, intersection: &IntersectionId) -> SessionResult<Vec<Vec<LaneLink>>> {
        self.inner.controlled_links(intersection)
    }
    fn current_phase(&self, intersection: &IntersectionId) -> SessionResult<PhaseIndex> {
        self.inner.current_phase(intersection)
    }
    fn arrived_count(&self) -> SessionResult<u32> {
        self.inner.arrived_count()
    }
    fn route_ids(&self) -> SessionResult<Vec<RouteId>> {
        self.inner.route_ids()
    }
    fn set_phase(&mut self, intersection: &IntersectionId, phase: PhaseIndex) -> SessionResult<()> {
        self.inner.set_phase(intersection, phase)
    }
    fn add_vehicle(&mut self, vehicle: &VehicleId, route: &RouteId, vtype: &str) -> SessionResult<()> {
        if self.rejects {
            return Err(SessionError::Rejected(format!("{vehicle} refused")));
        }
        if let Ok(mut log) = self.log.lock() {
            log.push((self.strategy, vehicle.clone(), route.clone(), vtype.to_owned()));
        }
        self.inner.add_vehicle(vehicle, route, vtype)
    }
}

/// Four-way network; optionally one strategy's engine dies at a given tick.
#[derive(Clone)]
struct TestFactory {
    network:  MemoryNetwork,
    fail:     Option<(Strategy, Tick)>,
    blackout: Option<Range<u64>>,
    reject:   Vec<Strategy>,
    log:      Injections,
}

impl TestFactory {
    fn new() -> Self {
        Self {
            network:  MemoryNetwork::four_way(),
            fail:     None,
            blackout: None,
            reject:   Vec::new(),
            log:      Injections::default(),
        }
    }

    fn failing(strategy: Strategy, at: Tick) -> Self {
        Self { fail: Some((strategy, at)), ..Self::new() }
    }

    /// Lane queries of both engines fail for the ticks in `window`.
    fn blackout(window: Range<u64>) -> Self {
        Self { blackout: Some(window), ..Self::new() }
    }

    fn rejecting(reject: &[Strategy]) -> Self {
        Self { reject: reject.to_vec(), ..Self::new() }
    }
}

impl EngineFactory for TestFactory {
    type Engine = RecordingEngine;

    fn create(&self, strategy: Strategy) -> SessionResult<RecordingEngine> {
        let mut inner = MemoryEngine::new(self.network.clone());
        if let Some((s, at)) = self.fail {
            if s == strategy {
                inner = inner.fail_at(at);
            }
        }
        Ok(RecordingEngine {
            inner,
            strategy,
            log: Arc::clone(&self.log),
            advanced: 0,
            blackout: self.blackout.clone(),
            rejects: self.reject.contains(&strategy),
        })
    }

    fn demand(&self, run: &RunConfig) -> DemandPlan {
        self.network.demand(run.vehicle_count, run.max_steps, run.seed)
    }
}

fn run_to_end<F: EngineFactory>(orchestrator: &mut DualOrchestrator<F>, scenario: ScenarioConfig) -> RunReport {
    orchestrator.configure(scenario).unwrap();
    orchestrator.run(&mut NoopObserver).unwrap()
}

// ── Configuration ─────────────────────────────────────────────────────────────

#[cfg(test)]
mod configuration {
    use super::*;

    #[test]
    fn default_scenario_is_dual_and_valid() {
        let s = ScenarioConfig::default();
        assert!(s.is_dual());
        assert!(s.validate().is_ok());
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let s: ScenarioConfig =
            serde_json::from_str(r#"{ "scenario": "downtown", "run": { "max_steps": 600 } }"#).unwrap();
        assert_eq!(s.scenario, "downtown");
        assert_eq!(s.run.max_steps, 600);
        assert_eq!(s.run.emergency_interval, 120);
        assert_eq!(s.strategies, Strategy::ALL.to_vec());
    }

    #[test]
    fn strategy_names_are_snake_case() {
        let s: Vec<Strategy> = serde_json::from_str(r#"["fixed_cycle"]"#).unwrap();
        assert_eq!(s, vec![Strategy::FixedCycle]);
        assert_eq!(Strategy::FixedCycle.to_string(), "fixed");
    }

    #[test]
    fn rejects_bad_scenarios() {
        let mut s = scenario(100);
        s.scenario = "  ".into();
        assert!(s.validate().is_err());

        let mut s = scenario(100);
        s.network_path = Some("/definitely/not/here.net.xml".into());
        assert!(s.validate().is_err());

        let mut s = scenario(100);
        s.strategies = vec![Strategy::Adaptive, Strategy::Adaptive];
        assert!(s.validate().is_err());

        let mut s = scenario(100);
        s.strategies.clear();
        assert!(s.validate().is_err());

        assert!(scenario(0).validate().is_err());
    }

    #[test]
    fn configure_failure_starts_nothing() {
        let mut orch = DualOrchestrator::new(TestFactory::new(), model());
        let mut bad = scenario(100);
        bad.run.yellow_duration = 0;
        assert!(matches!(orch.configure(bad), Err(OrchestratorError::Configuration(_))));
        assert_eq!(orch.state(), OrchestratorState::Idle);
        assert_eq!(orch.session_steps(Strategy::Adaptive), None);
    }

    #[test]
    fn run_requires_configuration() {
        let mut orch = DualOrchestrator::new(TestFactory::new(), model());
        let err = orch.run(&mut NoopObserver).unwrap_err();
        assert!(matches!(err, OrchestratorError::InvalidState { action: "run", state: "idle" }));
    }
}

// ── Lockstep loop ─────────────────────────────────────────────────────────────

#[cfg(test)]
mod lockstep {
    use super::*;

    #[test]
    fn sessions_never_drift() {
        let mut orch = DualOrchestrator::new(TestFactory::new(), model());
        let report = run_to_end(&mut orch, scenario(300));
        assert_eq!(report.outcome, RunOutcome::Completed);
        assert_eq!(report.ticks, 300);
        assert_eq!(orch.session_steps(Strategy::Adaptive), Some(300));
        assert_eq!(orch.session_steps(Strategy::FixedCycle), Some(300));
        assert_eq!(orch.step_metrics(Strategy::Adaptive).map(<[_]>::len), Some(300));
        assert_eq!(orch.step_metrics(Strategy::FixedCycle).map(<[_]>::len), Some(300));
        assert_eq!(orch.state(), OrchestratorState::Completed);
    }

    #[test]
    fn step_ticks_match_loop_counter() {
        let mut orch = DualOrchestrator::new(TestFactory::new(), model());
        run_to_end(&mut orch, scenario(50));
        let ticks: Vec<u64> = orch.step_metrics(Strategy::FixedCycle).unwrap().iter().map(|m| m.tick.0).collect();
        assert_eq!(ticks, (0..50).collect::<Vec<_>>());
    }

    #[test]
    fn observer_sees_every_tick_and_strategy() {
        #[derive(Default)]
        struct Counter {
            starts: u64,
            ends:   u64,
            steps:  Vec<(Strategy, u64)>,
            ended:  bool,
        }
        impl RunObserver for Counter {
            fn on_tick_start(&mut self, _: Tick) {
                self.starts += 1;
            }
            fn on_step(&mut self, strategy: Strategy, metrics: &tsc_metrics::StepMetrics) {
                self.steps.push((strategy, metrics.tick.0));
            }
            fn on_tick_end(&mut self, _: Tick) {
                self.ends += 1;
            }
            fn on_run_end(&mut self, report: &RunReport) {
                self.ended = report.is_completed();
            }
        }

        let mut orch = DualOrchestrator::new(TestFactory::new(), model());
        orch.configure(scenario(20)).unwrap();
        let mut counter = Counter::default();
        orch.run(&mut counter).unwrap();
        assert_eq!((counter.starts, counter.ends), (20, 20));
        assert_eq!(counter.steps.len(), 40);
        assert_eq!(counter.steps[0], (Strategy::Adaptive, 0));
        assert_eq!(counter.steps[1], (Strategy::FixedCycle, 0));
        assert!(counter.ended);
    }

    #[test]
    fn metrics_are_never_negative() {
        let mut orch = DualOrchestrator::new(TestFactory::new(), model());
        let mut s = scenario(400);
        s.run.vehicle_count = 300;
        run_to_end(&mut orch, s);
        for strategy in Strategy::ALL {
            for m in orch.step_metrics(strategy).unwrap() {
                assert!(m.waiting_time >= 0.0);
                for i in &m.intersections {
                    assert!(i.waiting_time >= 0.0);
                    assert!(i.mean_waiting >= 0.0);
                }
            }
        }
    }

    #[test]
    fn traffic_flows_under_both_strategies() {
        let mut orch = DualOrchestrator::new(TestFactory::new(), model());
        let report = run_to_end(&mut orch, scenario(600));
        let adaptive = report.results.adaptive.as_ref().unwrap();
        let fixed = report.results.fixed.as_ref().unwrap();
        assert!(adaptive.total_throughput > 0);
        assert!(fixed.total_throughput > 0);
        assert_eq!(adaptive.series.ticks.len(), 60);
    }

    #[test]
    fn same_seed_same_results() {
        let mut a = DualOrchestrator::new(TestFactory::new(), model());
        let mut b = DualOrchestrator::new(TestFactory::new(), model());
        let ra = run_to_end(&mut a, scenario(250));
        let rb = run_to_end(&mut b, scenario(250));
        assert_eq!(ra.results, rb.results);
        assert_eq!(ra.injected, rb.injected);
    }

    #[test]
    fn grid_gets_one_controller_per_intersection() {
        let mut orch = DualOrchestrator::new(MemoryNetwork::grid(2, 2), model());
        let report = run_to_end(&mut orch, scenario(60));
        assert_eq!(orch.controllers(Strategy::Adaptive).map(<[_]>::len), Some(4));
        assert_eq!(orch.controllers(Strategy::FixedCycle).map(<[_]>::len), Some(4));
        assert_eq!(report.controllers.len(), 8);
        let first = &orch.step_metrics(Strategy::FixedCycle).unwrap()[0];
        assert_eq!(first.intersections.len(), 4);
    }

    #[test]
    fn fixed_controllers_cycle_during_the_run() {
        let mut orch = DualOrchestrator::new(TestFactory::new(), model());
        let report = run_to_end(&mut orch, scenario(300));
        let fixed = report.controllers.iter().find(|c| c.strategy == Strategy::FixedCycle).unwrap();
        // 10 green + 4 yellow: one change every 14 ticks from tick 10.
        assert_eq!(fixed.phase_changes, 300 / 14);
    }

    #[test]
    fn controller_counters_reach_the_report() {
        let mut orch = DualOrchestrator::new(TestFactory::new(), model());
        let report = run_to_end(&mut orch, scenario(300));
        let summary = |strategy| report.controllers.iter().find(|c| c.strategy == strategy).unwrap();

        let fixed = summary(Strategy::FixedCycle);
        assert!(fixed.cycles > 0);
        assert_eq!((fixed.decisions, fixed.preemptions), (0, 0));

        let adaptive = summary(Strategy::Adaptive);
        assert!(adaptive.decisions > 0);
        assert_eq!(adaptive.cycles, 0);
    }
}

// ── Emergency injection ───────────────────────────────────────────────────────

#[cfg(test)]
mod injection {
    use super::*;

    #[derive(Default)]
    struct Seen(Vec<(Tick, VehicleId)>);

    impl RunObserver for Seen {
        fn on_emergency(&mut self, tick: Tick, vehicle: &VehicleId, _: &RouteId) {
            self.0.push((tick, vehicle.clone()));
        }
    }

    #[test]
    fn injects_at_interval_multiples_only() {
        let mut orch = DualOrchestrator::new(TestFactory::new(), model());
        let report = run_to_end(&mut orch, scenario(300));
        assert_eq!(report.injected, vec![Tick(120), Tick(240)]);
    }

    #[test]
    fn same_vehicle_and_route_in_both_sessions() {
        let factory = TestFactory::new();
        let log = Arc::clone(&factory.log);
        let mut orch = DualOrchestrator::new(factory, model());
        run_to_end(&mut orch, scenario(300));

        let log = log.lock().unwrap();
        assert_eq!(log.len(), 4);
        for pair in log.chunks(2) {
            let (a, f) = (&pair[0], &pair[1]);
            assert_eq!(a.0, Strategy::Adaptive);
            assert_eq!(f.0, Strategy::FixedCycle);
            assert_eq!(a.1, f.1);
            assert_eq!(a.2, f.2);
            assert_eq!(a.3, "emergency");
            assert!(!a.2.is_internal());
        }
        assert_eq!(log[0].1.as_str(), "emergency-120");
        assert_eq!(log[2].1.as_str(), "emergency-240");
    }

    #[test]
    fn zero_interval_disables_injection() {
        let mut orch = DualOrchestrator::new(TestFactory::new(), model());
        let mut s = scenario(300);
        s.run.emergency_interval = 0;
        let report = run_to_end(&mut orch, s);
        assert!(report.injected.is_empty());
    }

    #[test]
    fn observer_is_told_about_injections() {
        let mut orch = DualOrchestrator::new(TestFactory::new(), model());
        orch.configure(scenario(130)).unwrap();
        let mut seen = Seen::default();
        orch.run(&mut seen).unwrap();
        assert_eq!(seen.0, vec![(Tick(120), VehicleId::new("emergency-120"))]);
    }

    #[test]
    fn refused_everywhere_is_not_recorded() {
        let mut orch = DualOrchestrator::new(TestFactory::rejecting(&Strategy::ALL), model());
        orch.configure(scenario(300)).unwrap();
        let mut seen = Seen::default();
        let report = orch.run(&mut seen).unwrap();
        assert!(report.is_completed());
        assert!(report.injected.is_empty());
        assert!(seen.0.is_empty());
    }

    #[test]
    fn accepted_by_one_session_is_recorded() {
        let factory = TestFactory::rejecting(&[Strategy::FixedCycle]);
        let log = Arc::clone(&factory.log);
        let mut orch = DualOrchestrator::new(factory, model());
        orch.configure(scenario(300)).unwrap();
        let mut seen = Seen::default();
        let report = orch.run(&mut seen).unwrap();
        assert_eq!(report.injected, vec![Tick(120), Tick(240)]);
        assert_eq!(seen.0.len(), 2);
        let log = log.lock().unwrap();
        assert_eq!(log.len(), 2);
        assert!(log.iter().all(|entry| entry.0 == Strategy::Adaptive));
    }

    #[test]
    fn adaptive_side_services_the_injected_vehicle() {
        let mut orch = DualOrchestrator::new(TestFactory::new(), model());
        let mut s = scenario(240);
        s.run.vehicle_count = 10;
        run_to_end(&mut orch, s);
        let serviced = orch
            .step_metrics(Strategy::Adaptive)
            .unwrap()
            .iter()
            .filter(|m| m.tick.0 > 120)
            .any(|m| m.emergencies() > 0);
        assert!(serviced);
        let fixed_flagged = orch.step_metrics(Strategy::FixedCycle).unwrap().iter().any(|m| m.emergencies() > 0);
        assert!(!fixed_flagged);
    }
}

// ── Degraded collection ───────────────────────────────────────────────────────

#[cfg(test)]
mod degrade {
    use super::*;

    #[test]
    fn lane_query_failures_do_not_abort_the_run() {
        let mut orch = DualOrchestrator::new(TestFactory::blackout(200..210), model());
        let mut s = scenario(300);
        s.run.vehicle_count = 300;
        let report = run_to_end(&mut orch, s);
        assert_eq!(report.outcome, RunOutcome::Completed);
        assert_eq!(report.ticks, 300);
        assert_eq!(orch.session_steps(Strategy::Adaptive), Some(300));
        assert_eq!(orch.session_steps(Strategy::FixedCycle), Some(300));
    }

    #[test]
    fn queue_holds_and_waiting_drops_to_zero_while_degraded() {
        let mut orch = DualOrchestrator::new(TestFactory::blackout(200..210), model());
        let mut s = scenario(300);
        s.run.vehicle_count = 300;
        run_to_end(&mut orch, s);

        for strategy in Strategy::ALL {
            let steps = orch.step_metrics(strategy).unwrap();
            let before = &steps[199];
            assert!(!before.intersections[0].lane_halted.is_empty());
            for m in &steps[200..210] {
                assert_eq!(m.queue_length, before.queue_length, "{strategy} at {}", m.tick);
                assert_eq!(m.waiting_time, 0.0);
                for (now, then) in m.intersections.iter().zip(&before.intersections) {
                    assert_eq!(now.queue_length, then.queue_length);
                    assert_eq!(now.waiting_time, 0.0);
                    assert_eq!(now.mean_waiting, 0.0);
                    assert!(now.lane_halted.is_empty());
                }
            }
            assert!(!steps[210].intersections[0].lane_halted.is_empty());
            assert!(steps.iter().all(|m| m.waiting_time >= 0.0));
        }
    }
}

// ── Failure, stop, single strategy ────────────────────────────────────────────

#[cfg(test)]
mod outcomes {
    use super::*;

    #[test]
    fn session_failure_keeps_partial_metrics() {
        let mut orch = DualOrchestrator::new(TestFactory::failing(Strategy::FixedCycle, Tick(50)), model());
        let report = run_to_end(&mut orch, scenario(300));
        assert!(matches!(report.outcome, RunOutcome::Failed(_)));
        assert_eq!(report.ticks, 50);
        assert_eq!(report.results.adaptive.as_ref().map(|r| r.steps), Some(50));
        assert_eq!(report.results.fixed.as_ref().map(|r| r.steps), Some(50));
        assert_eq!(orch.state(), OrchestratorState::Failed);
        assert!(!orch.status().running);
    }

    #[test]
    fn failure_reason_names_the_session() {
        let mut orch = DualOrchestrator::new(TestFactory::failing(Strategy::Adaptive, Tick(5)), model());
        let report = run_to_end(&mut orch, scenario(30));
        match report.outcome {
            RunOutcome::Failed(reason) => assert!(reason.contains("adaptive"), "{reason}"),
            other => panic!("expected failure, got {other:?}"),
        }
    }

    #[test]
    fn stop_exits_at_the_next_boundary() {
        struct StopAt {
            status: Arc<SharedStatus>,
            at:     Tick,
        }
        impl RunObserver for StopAt {
            fn on_tick_end(&mut self, tick: Tick) {
                if tick == self.at {
                    self.status.request_stop();
                }
            }
        }

        let mut orch = DualOrchestrator::new(TestFactory::new(), model());
        orch.configure(scenario(300)).unwrap();
        let mut observer = StopAt { status: orch.shared_status(), at: Tick(99) };
        let report = orch.run(&mut observer).unwrap();
        assert_eq!(report.outcome, RunOutcome::Stopped);
        assert_eq!(report.ticks, 100);
        assert_eq!(orch.session_steps(Strategy::Adaptive), Some(100));
        assert_eq!(orch.session_steps(Strategy::FixedCycle), Some(100));
        assert_eq!(orch.state(), OrchestratorState::Stopped);
    }

    #[test]
    fn single_strategy_run() {
        let mut orch = DualOrchestrator::new(TestFactory::new(), model());
        let report = run_to_end(&mut orch, scenario(100).only(Strategy::FixedCycle));
        assert!(report.results.adaptive.is_none());
        assert_eq!(report.results.fixed.as_ref().map(|r| r.steps), Some(100));
        assert!(report.comparison().is_none());
        assert_eq!(orch.session_steps(Strategy::Adaptive), None);
    }

    #[test]
    fn reset_returns_to_idle() {
        let mut orch = DualOrchestrator::new(TestFactory::new(), model());
        run_to_end(&mut orch, scenario(20));
        assert!(orch.configure(scenario(20)).is_err());
        orch.reset().unwrap();
        assert_eq!(orch.state(), OrchestratorState::Idle);
        assert!(orch.report().is_none());
        assert_eq!(orch.results(), RunResults::default());
        run_to_end(&mut orch, scenario(20));
        assert_eq!(orch.session_steps(Strategy::Adaptive), Some(20));
    }
}

// ── Handle ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod handle {
    use super::*;

    #[test]
    fn full_lifecycle() {
        let mut handle = OrchestratorHandle::new(TestFactory::new(), model());
        assert!(!handle.status().initialized);

        handle.initialize(scenario(200)).unwrap();
        let status = handle.status();
        assert!(status.initialized);
        assert_eq!(status.max_steps, 200);
        assert_eq!(status.state, OrchestratorState::Configured);

        handle.start().unwrap();
        let report = handle.wait().unwrap().cloned().unwrap();
        assert_eq!(report.outcome, RunOutcome::Completed);

        let status = handle.status();
        assert_eq!(status.state, OrchestratorState::Completed);
        assert_eq!(status.current_step, 200);
        assert!(!status.running);

        assert!(handle.results().and_then(|r| r.adaptive).is_some());
        let comparison = handle.comparison_metrics().unwrap();
        assert_eq!(comparison.series.ticks.len(), 20);
    }

    #[test]
    fn snapshots_arrive_in_tick_order() {
        let mut handle = OrchestratorHandle::new(TestFactory::new(), model());
        handle.initialize(scenario(150)).unwrap();
        handle.start().unwrap();
        handle.wait().unwrap();
        let snapshots = handle.drain_snapshots();
        assert_eq!(snapshots.len(), 150);
        assert!(snapshots.windows(2).all(|w| w[0].tick < w[1].tick));
        assert!(snapshots.iter().all(|s| s.adaptive.is_some() && s.fixed.is_some()));
    }

    #[test]
    fn full_channel_drops_instead_of_blocking() {
        let mut handle = OrchestratorHandle::new(TestFactory::new(), model());
        let mut s = scenario(100);
        s.run.snapshot_capacity = 2;
        handle.initialize(s).unwrap();
        handle.start().unwrap();
        let report = handle.wait().unwrap().cloned().unwrap();
        assert!(report.is_completed());
        assert_eq!(handle.drain_snapshots().len(), 2);
    }

    #[test]
    fn stop_is_cooperative() {
        let mut handle = OrchestratorHandle::new(TestFactory::new(), model());
        let mut s = scenario(1_000_000);
        s.run.step_delay_ms = 1;
        handle.initialize(s).unwrap();
        handle.start().unwrap();
        handle.stop();
        let report = handle.wait().unwrap().cloned().unwrap();
        assert_eq!(report.outcome, RunOutcome::Stopped);
        assert!(report.ticks < 1_000_000);
        assert_eq!(handle.status().state, OrchestratorState::Stopped);
    }

    #[test]
    fn comparison_is_readable_while_running() {
        let mut handle = OrchestratorHandle::new(TestFactory::new(), model());
        let mut s = scenario(1_000_000);
        s.run.step_delay_ms = 1;
        handle.initialize(s).unwrap();
        handle.start().unwrap();

        let deadline = Instant::now() + Duration::from_secs(30);
        let first = loop {
            if let Some(c) = handle.comparison_metrics() {
                break c;
            }
            assert!(Instant::now() < deadline, "no results published");
            thread::sleep(Duration::from_millis(5));
        };
        assert!(handle.status().running);
        assert!(handle.is_running());
        assert!(!first.series.ticks.is_empty());

        thread::sleep(Duration::from_millis(100));
        let later = handle.comparison_metrics().unwrap();
        assert!(later.series.ticks.len() >= first.series.ticks.len());

        handle.stop();
        let report = handle.wait().unwrap().cloned().unwrap();
        assert_eq!(report.outcome, RunOutcome::Stopped);
    }

    #[test]
    fn reset_recovers_from_a_panicked_worker() {
        let failing: Arc<dyn tsc_control::DecisionModel> =
            Arc::new(|_: &tsc_control::Observation| -> tsc_core::ActionClass { panic!("model failure") });
        let mut handle = OrchestratorHandle::new(TestFactory::new(), failing);
        handle.initialize(scenario(100)).unwrap();
        handle.start().unwrap();
        assert!(matches!(handle.wait(), Err(OrchestratorError::WorkerPanicked)));
        assert_eq!(handle.status().state, OrchestratorState::Failed);
        assert!(handle.initialize(scenario(10)).is_err());

        handle.reset().unwrap();
        assert_eq!(handle.status().state, OrchestratorState::Idle);
        assert!(handle.results().is_none());

        handle.initialize(scenario(50).only(Strategy::FixedCycle)).unwrap();
        handle.start().unwrap();
        let report = handle.wait().unwrap().cloned().unwrap();
        assert!(report.is_completed());
        assert_eq!(report.ticks, 50);
        assert_eq!(handle.status().current_step, 50);
    }

    #[test]
    fn start_before_initialize_is_rejected() {
        let mut handle = OrchestratorHandle::new(TestFactory::new(), model());
        assert!(matches!(handle.start(), Err(OrchestratorError::InvalidState { action: "start", .. })));
    }

    #[test]
    fn reset_then_reinitialize() {
        let mut handle = OrchestratorHandle::new(TestFactory::new(), model());
        handle.initialize(scenario(30)).unwrap();
        handle.start().unwrap();
        handle.wait().unwrap();
        handle.reset().unwrap();
        assert_eq!(handle.status().state, OrchestratorState::Idle);
        assert!(handle.results().is_none());

        handle.initialize(scenario(40).only(Strategy::Adaptive)).unwrap();
        handle.start().unwrap();
        let report = handle.wait().unwrap().cloned().unwrap();
        assert_eq!(report.ticks, 40);
        assert!(handle.comparison_metrics().is_none());
    }

    #[test]
    fn initialize_after_finish_resets_implicitly() {
        let mut handle = OrchestratorHandle::new(TestFactory::new(), model());
        handle.initialize(scenario(10)).unwrap();
        handle.start().unwrap();
        handle.wait().unwrap();
        handle.initialize(scenario(15)).unwrap();
        assert_eq!(handle.status().state, OrchestratorState::Configured);
        assert!(handle.results().is_none());
    }
}
