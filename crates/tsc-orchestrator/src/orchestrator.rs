//! The `DualOrchestrator` and its lockstep loop.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, Sender, TrySendError};
use log::{debug, error, info, warn};

use tsc_control::{
    AdaptiveController, ControllerConfig, DecisionModel, FixedCycleController, SignalController,
};
use tsc_core::{RouteId, RunConfig, SimRng, Tick, VehicleId};
use tsc_metrics::{ComparisonMetrics, MetricsAggregator, StepMetrics};
use tsc_session::{OrDegrade, SessionConfig, SimulationEngine, SimulationSession};

use crate::collect::{collect, discover_topology, intersection_metrics};
use crate::{
    ControllerSummary, EngineFactory, OrchestratorError, OrchestratorResult, OrchestratorState,
    RunObserver, RunOutcome, RunReport, RunResults, RunStatus, ScenarioConfig, SharedStatus, Strategy,
    TickSnapshot,
};

/// Ticks between two progress lines.
const PROGRESS_INTERVAL: u64 = 1000;

// ── Per-strategy state ────────────────────────────────────────────────────────

/// One session, its controllers, and its metric stream.
struct StrategyRun<E: SimulationEngine> {
    strategy:    Strategy,
    session:     SimulationSession<E>,
    /// One per intersection, built after the first step.
    controllers: Vec<Box<dyn SignalController>>,
    /// Last non-degraded queue length, parallel to `controllers`.
    last_queue:  Vec<u32>,
    ready:       bool,
    metrics:     MetricsAggregator,
}

impl<E: SimulationEngine> StrategyRun<E> {
    fn new(strategy: Strategy, session: SimulationSession<E>) -> Self {
        Self {
            strategy,
            session,
            controllers: Vec::new(),
            last_queue: Vec::new(),
            ready: false,
            metrics: MetricsAggregator::new(),
        }
    }

    fn build_controllers(&mut self, now: Tick, run: &RunConfig, model: &Arc<dyn DecisionModel>) -> OrchestratorResult<()> {
        let strategy = self.strategy;
        let ids = self
            .session
            .query(|e| e.intersection_ids())
            .map_err(|source| OrchestratorError::Run { tick: now, strategy, source })?;

        for id in ids {
            let topology = discover_topology(&self.session, &id);
            let controller: Box<dyn SignalController> = match strategy {
                Strategy::Adaptive => {
                    Box::new(AdaptiveController::new(topology, ControllerConfig::adaptive(run), Arc::clone(model))?)
                }
                Strategy::FixedCycle => Box::new(FixedCycleController::new(topology, ControllerConfig::fixed(run))?),
            };
            self.controllers.push(controller);
            self.last_queue.push(0);
        }
        info!("{strategy}: {} intersections under control", self.controllers.len());
        self.ready = true;
        Ok(())
    }

    /// Snapshot, tick, and command every intersection; return the tick's metrics.
    fn control_tick(&mut self, now: Tick) -> StepMetrics {
        let mut rows = Vec::with_capacity(self.controllers.len());
        for (controller, last_queue) in self.controllers.iter_mut().zip(self.last_queue.iter_mut()) {
            let id = controller.intersection().clone();
            let collected = collect(&self.session, &id);
            let step = controller.tick(now, &collected.snapshot);
            if let Some(phase) = step.command {
                self.session.set_phase(&id, phase).or_degrade("set phase", ());
            }
            rows.push(intersection_metrics(controller.as_ref(), &collected, step, last_queue));
        }
        let throughput = self.session.query(|e| e.arrived_count()).or_degrade("arrived count", 0);
        StepMetrics::from_intersections(now, throughput, rows)
    }

    fn summaries(&self) -> impl Iterator<Item = ControllerSummary> + '_ {
        self.controllers.iter().map(|c| {
            let counters = c.counters();
            ControllerSummary {
                strategy:      self.strategy,
                intersection:  c.intersection().clone(),
                phase_changes: c.state().phase_changes,
                cycles:        counters.cycles,
                decisions:     counters.decisions,
                preemptions:   counters.preemptions,
            }
        })
    }
}

// ── DualOrchestrator ──────────────────────────────────────────────────────────

/// Drives one session per strategy in lockstep.
///
/// Every loop iteration steps each session exactly once before any
/// controller runs, so all sessions always share the same tick.
///
/// ```text
/// while tick < max_steps and running:
///   ① step every session                       (failure aborts the run)
///   ② first tick only: discover topology, build controllers
///   ③ scheduled tick: inject one emergency vehicle into every session
///   ④ per session, per intersection: snapshot → controller.tick → set_phase
///   ⑤ record StepMetrics, notify observer, publish TickSnapshot
///   every downsample_stride ticks: publish reduced RunResults
/// ```
pub struct DualOrchestrator<F: EngineFactory> {
    factory:   F,
    model:     Arc<dyn DecisionModel>,
    scenario:  Option<ScenarioConfig>,
    runs:      Vec<StrategyRun<F::Engine>>,
    /// Ticks already used for injection.
    injected:  BTreeSet<Tick>,
    status:    Arc<SharedStatus>,
    snapshots: Option<Sender<TickSnapshot>>,
    dropped:   u64,
    /// One-slot channel holding the latest reduced results of a live run.
    /// The receiver half lets the worker replace a value nobody has read.
    live:      Option<(Sender<RunResults>, Receiver<RunResults>)>,
    report:    Option<RunReport>,
}

impl<F: EngineFactory> DualOrchestrator<F> {
    pub fn new(factory: F, model: Arc<dyn DecisionModel>) -> Self {
        Self {
            factory,
            model,
            scenario: None,
            runs: Vec::new(),
            injected: BTreeSet::new(),
            status: Arc::new(SharedStatus::default()),
            snapshots: None,
            dropped: 0,
            live: None,
            report: None,
        }
    }

    // ── Lifecycle ─────────────────────────────────────────────────────────

    /// Validate and store the scenario.  No session is started here.
    pub fn configure(&mut self, scenario: ScenarioConfig) -> OrchestratorResult<()> {
        let state = self.state();
        if !matches!(state, OrchestratorState::Idle | OrchestratorState::Configured) {
            return Err(OrchestratorError::InvalidState { action: "configure", state: state.as_str() });
        }
        scenario.validate()?;
        self.status.set_max_steps(scenario.run.max_steps);
        self.status.set_current_step(0);
        self.status.set_state(OrchestratorState::Configured);
        info!(
            "scenario `{}` configured: {} ticks, strategies {:?}",
            scenario.scenario, scenario.run.max_steps, scenario.strategies
        );
        self.scenario = Some(scenario);
        Ok(())
    }

    /// Publish a [`TickSnapshot`] per tick on `sender`.  Full channels drop.
    pub fn attach_snapshots(&mut self, sender: Sender<TickSnapshot>) {
        self.snapshots = Some(sender);
    }

    /// Keep the latest [`RunResults`] in a `bounded(1)` channel while
    /// running, refreshed every `downsample_stride` ticks.
    pub(crate) fn attach_results(&mut self, channel: (Sender<RunResults>, Receiver<RunResults>)) {
        self.live = Some(channel);
    }

    /// Run to completion, stop, or failure on the calling thread.
    ///
    /// A session failure inside the loop does not return `Err`: the run is
    /// aborted, sessions are closed, and the report carries
    /// [`RunOutcome::Failed`] with the metrics gathered so far.
    pub fn run<O: RunObserver>(&mut self, observer: &mut O) -> OrchestratorResult<RunReport> {
        self.ensure_configured("run")?;
        self.status.set_running(true);
        self.execute(observer)
    }

    /// The loop proper.  Expects the caller to have raised `running`.
    pub(crate) fn execute<O: RunObserver>(&mut self, observer: &mut O) -> OrchestratorResult<RunReport> {
        let scenario = self.ensure_configured("run")?.clone();
        let started = Instant::now();

        if let Err(e) = self.open_sessions(&scenario) {
            error!("scenario `{}`: could not open sessions: {e}", scenario.scenario);
            self.close_sessions();
            self.status.set_running(false);
            self.status.set_state(OrchestratorState::Failed);
            return Err(e);
        }
        self.status.set_state(OrchestratorState::Running);
        observer.on_run_start(&scenario);

        let run = &scenario.run;
        let mut tick = Tick::ZERO;
        let outcome = loop {
            if tick >= run.end_tick() {
                break RunOutcome::Completed;
            }
            if !self.status.is_running() {
                info!("scenario `{}`: stop requested at {tick}", scenario.scenario);
                break RunOutcome::Stopped;
            }

            observer.on_tick_start(tick);
            if let Err(e) = self.process_tick(tick, run, observer) {
                error!("scenario `{}`: run aborted: {e}", scenario.scenario);
                break RunOutcome::Failed(e.to_string());
            }
            observer.on_tick_end(tick);

            tick = tick + 1;
            self.status.set_current_step(tick.0);
            if tick.0.is_multiple_of(run.downsample_stride as u64) {
                self.publish_results();
            }
            if tick.0.is_multiple_of(PROGRESS_INTERVAL) {
                self.log_progress(tick, run.max_steps);
            }
            if run.step_delay_ms > 0 {
                thread::sleep(Duration::from_millis(run.step_delay_ms));
            }
        };

        self.status.set_running(false);
        self.close_sessions();
        if self.dropped > 0 {
            debug!("{} live snapshots dropped on a full channel", self.dropped);
        }

        let report = RunReport {
            scenario:    scenario.scenario.clone(),
            ticks:       tick.0,
            results:     self.results(),
            controllers: self.runs.iter().flat_map(StrategyRun::summaries).collect(),
            injected:    self.injected.iter().copied().collect(),
            elapsed_ms:  started.elapsed().as_millis() as u64,
            outcome,
        };
        self.status.set_state(match report.outcome {
            RunOutcome::Completed => OrchestratorState::Completed,
            RunOutcome::Stopped   => OrchestratorState::Stopped,
            RunOutcome::Failed(_) => OrchestratorState::Failed,
        });
        info!(
            "scenario `{}` ended after {} ticks ({:?}) in {} ms",
            report.scenario, report.ticks, report.outcome, report.elapsed_ms
        );
        observer.on_run_end(&report);
        self.report = Some(report.clone());
        Ok(report)
    }

    /// Ask the loop to exit at the next iteration boundary.
    pub fn request_stop(&self) {
        self.status.request_stop();
    }

    /// Drop every session, controller, metric, and the scenario.
    pub fn reset(&mut self) -> OrchestratorResult<()> {
        if self.status.is_running() {
            return Err(OrchestratorError::InvalidState { action: "reset", state: "running" });
        }
        self.close_sessions();
        self.runs.clear();
        self.injected.clear();
        self.scenario = None;
        self.report = None;
        self.snapshots = None;
        self.dropped = 0;
        self.live = None;
        self.status.clear();
        Ok(())
    }

    // ── Reads ─────────────────────────────────────────────────────────────

    pub fn state(&self) -> OrchestratorState {
        self.status.state()
    }

    pub fn status(&self) -> RunStatus {
        self.status.snapshot()
    }

    /// The counters a handle shares with its worker.
    pub fn shared_status(&self) -> Arc<SharedStatus> {
        Arc::clone(&self.status)
    }

    pub fn scenario(&self) -> Option<&ScenarioConfig> {
        self.scenario.as_ref()
    }

    /// Reduced metrics of every strategy, as of the last recorded tick.
    pub fn results(&self) -> RunResults {
        let stride = self.scenario.as_ref().map_or(1, |s| s.run.downsample_stride);
        let mut results = RunResults::default();
        for run in &self.runs {
            results.set(run.strategy, run.metrics.reduce(stride));
        }
        results
    }

    pub fn comparison_metrics(&self) -> Option<ComparisonMetrics> {
        self.results().comparison()
    }

    pub fn report(&self) -> Option<&RunReport> {
        self.report.as_ref()
    }

    /// Successful steps of a strategy's session.
    pub fn session_steps(&self, strategy: Strategy) -> Option<u64> {
        self.find(strategy).map(|r| r.session.steps())
    }

    pub fn step_metrics(&self, strategy: Strategy) -> Option<&[StepMetrics]> {
        self.find(strategy).map(|r| r.metrics.steps())
    }

    pub fn controllers(&self, strategy: Strategy) -> Option<&[Box<dyn SignalController>]> {
        self.find(strategy).map(|r| r.controllers.as_slice())
    }

    pub fn injected_ticks(&self) -> impl Iterator<Item = Tick> + '_ {
        self.injected.iter().copied()
    }

    // ── Internals ─────────────────────────────────────────────────────────

    fn find(&self, strategy: Strategy) -> Option<&StrategyRun<F::Engine>> {
        self.runs.iter().find(|r| r.strategy == strategy)
    }

    fn ensure_configured(&self, action: &'static str) -> OrchestratorResult<&ScenarioConfig> {
        let state = self.state();
        match (&self.scenario, state) {
            (Some(scenario), OrchestratorState::Configured) => Ok(scenario),
            _ => Err(OrchestratorError::InvalidState { action, state: state.as_str() }),
        }
    }

    /// Start one session per strategy, all loaded with the same demand.
    fn open_sessions(&mut self, scenario: &ScenarioConfig) -> OrchestratorResult<()> {
        self.runs.clear();
        self.injected.clear();
        self.report = None;

        let demand = self.factory.demand(&scenario.run);
        let mut base = SessionConfig::new(scenario.scenario.clone(), demand);
        base.network_path = scenario.network_path.clone();

        for &strategy in &scenario.strategies {
            let engine = self.factory.create(strategy)?;
            let config = base.relabel(strategy.label());
            let mut session = SimulationSession::new(strategy.label(), engine);
            session.start(&config)?;
            self.runs.push(StrategyRun::new(strategy, session));
        }
        Ok(())
    }

    fn close_sessions(&mut self) {
        for run in &mut self.runs {
            run.session.close();
        }
    }

    fn process_tick<O: RunObserver>(&mut self, now: Tick, run: &RunConfig, observer: &mut O) -> OrchestratorResult<()> {
        // ① lockstep advance
        for r in &mut self.runs {
            let strategy = r.strategy;
            r.session.step().map_err(|source| OrchestratorError::Run { tick: now, strategy, source })?;
        }

        // ② topology is read once the engines have loaded their first step
        for r in &mut self.runs {
            if !r.ready {
                r.build_controllers(now, run, &self.model)?;
            }
        }

        // ③ emergency injection, at most once per tick
        if now.is_scheduled(run.emergency_interval) && !self.injected.contains(&now) {
            self.inject_emergency(now, run, observer);
        }

        // ④ ⑤ control and record
        let mut snapshot = TickSnapshot { tick: now, adaptive: None, fixed: None };
        for r in &mut self.runs {
            let metrics = r.control_tick(now);
            observer.on_step(r.strategy, &metrics);
            r.metrics.record(metrics.clone());
            match r.strategy {
                Strategy::Adaptive   => snapshot.adaptive = Some(metrics),
                Strategy::FixedCycle => snapshot.fixed = Some(metrics),
            }
        }
        self.publish(snapshot);
        Ok(())
    }

    /// Same vehicle id and route in every session.  Per-session failures
    /// are logged and do not abort the tick; the tick is recorded as used
    /// only when at least one session accepted the vehicle.
    fn inject_emergency<O: RunObserver>(&mut self, now: Tick, run: &RunConfig, observer: &mut O) {
        let Some(first) = self.runs.first() else { return };
        let routes: Vec<RouteId> = first
            .session
            .query(|e| e.route_ids())
            .or_degrade("route ids", Vec::new())
            .into_iter()
            .filter(|r| !r.is_internal())
            .collect();

        let mut rng = SimRng::child(run.seed, now.0);
        let Some(route) = rng.choose(&routes).cloned() else {
            warn!("{now}: no route available for emergency injection");
            return;
        };
        let vehicle = VehicleId::new(format!("emergency-{}", now.0));

        let mut accepted = 0;
        for r in &mut self.runs {
            match r.session.add_vehicle(&vehicle, &route, &run.emergency_type) {
                Ok(()) => accepted += 1,
                Err(e) => warn!("{now}: emergency injection into {} session failed: {e}", r.strategy),
            }
        }
        if accepted == 0 {
            warn!("{now}: no session accepted {vehicle}");
            return;
        }
        self.injected.insert(now);
        info!("{now}: injected {vehicle} on route {route}");
        observer.on_emergency(now, &vehicle, &route);
    }

    fn publish(&mut self, snapshot: TickSnapshot) {
        let Some(sender) = self.snapshots.as_ref() else { return };
        let sent = sender.try_send(snapshot);
        match sent {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => self.dropped += 1,
            Err(TrySendError::Disconnected(_)) => {
                debug!("live snapshot receiver gone; no longer publishing");
                self.snapshots = None;
            }
        }
    }

    fn publish_results(&self) {
        let Some((sender, slot)) = self.live.as_ref() else { return };
        // Only this thread sends, so once the stale value is taken the slot is free.
        let _ = slot.try_recv();
        let _ = sender.try_send(self.results());
    }

    fn log_progress(&self, tick: Tick, max_steps: u64) {
        let summary: Vec<String> = self
            .runs
            .iter()
            .filter_map(|r| {
                r.metrics.last().map(|m| {
                    format!("{} waiting {:.1} queue {}", r.strategy, m.waiting_time, m.queue_length)
                })
            })
            .collect();
        info!("tick {}/{max_steps}: {}", tick.0, summary.join(" | "));
    }
}
