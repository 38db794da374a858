//! Caller-owned handle running the orchestrator on a worker thread.

use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{Receiver, bounded};
use log::{error, warn};

use tsc_control::DecisionModel;
use tsc_metrics::ComparisonMetrics;

use crate::{
    DualOrchestrator, EngineFactory, NoopObserver, OrchestratorError, OrchestratorResult,
    OrchestratorState, RunObserver, RunReport, RunResults, RunStatus, ScenarioConfig, SharedStatus,
    TickSnapshot,
};

type Finished<F> = (DualOrchestrator<F>, OrchestratorResult<RunReport>);

/// `initialize → start → (stop) → results / comparison_metrics → reset`.
///
/// The orchestrator is moved onto a dedicated thread for the run and comes
/// back through the join handle.  Status reads go through shared atomics
/// and never block; they may lag the worker by a tick.  Live per-tick
/// snapshots arrive on a bounded channel and are dropped when it is full.
/// Results read during a run are the latest reduction the worker
/// published, at most `downsample_stride` ticks old.
///
/// The handle keeps its own copy of the factory and model so that a
/// [`reset`][Self::reset] can rebuild the orchestrator if the worker panicked.
pub struct OrchestratorHandle<F: EngineFactory> {
    factory:   F,
    model:     Arc<dyn DecisionModel>,
    idle:      Option<DualOrchestrator<F>>,
    worker:    Option<JoinHandle<Finished<F>>>,
    status:    Arc<SharedStatus>,
    snapshots: Option<Receiver<TickSnapshot>>,
    live_rx:   Option<Receiver<RunResults>>,
    live:      Option<RunResults>,
    report:    Option<RunReport>,
}

impl<F: EngineFactory + Clone> OrchestratorHandle<F> {
    pub fn new(factory: F, model: Arc<dyn DecisionModel>) -> Self {
        let orchestrator = DualOrchestrator::new(factory.clone(), Arc::clone(&model));
        Self {
            factory,
            model,
            status:    orchestrator.shared_status(),
            idle:      Some(orchestrator),
            worker:    None,
            snapshots: None,
            live_rx:   None,
            live:      None,
            report:    None,
        }
    }

    /// Validate the scenario and prepare a run.  Nothing is started.
    ///
    /// A finished previous run is reset first.
    pub fn initialize(&mut self, scenario: ScenarioConfig) -> OrchestratorResult<()> {
        self.poll();
        let capacity = scenario.run.snapshot_capacity;
        let orchestrator = self.orchestrator_mut("initialize")?;
        if orchestrator.state().is_finished() {
            orchestrator.reset()?;
        }
        orchestrator.configure(scenario)?;
        let (tx, rx) = bounded(capacity);
        orchestrator.attach_snapshots(tx);
        let (live_tx, live_rx) = bounded(1);
        orchestrator.attach_results((live_tx, live_rx.clone()));
        self.snapshots = Some(rx);
        self.live_rx = Some(live_rx);
        self.live = None;
        self.report = None;
        Ok(())
    }

    pub fn start(&mut self) -> OrchestratorResult<()> {
        self.start_with(NoopObserver)
    }

    /// Start the run on a worker thread, reporting to `observer` there.
    pub fn start_with<O: RunObserver + Send + 'static>(&mut self, mut observer: O) -> OrchestratorResult<()> {
        let state = self.orchestrator_mut("start")?.state();
        if state != OrchestratorState::Configured {
            return Err(OrchestratorError::InvalidState { action: "start", state: state.as_str() });
        }
        let Some(mut orchestrator) = self.idle.take() else {
            return Err(OrchestratorError::InvalidState { action: "start", state: "running" });
        };
        let name = orchestrator.scenario().map_or_else(|| "run".to_owned(), |s| s.scenario.clone());

        // Raised here, not on the worker, so a stop issued right after
        // start is never overwritten.
        self.status.set_running(true);
        let worker = thread::Builder::new()
            .name(format!("tsc-{name}"))
            .spawn(move || {
                let result = orchestrator.execute(&mut observer);
                (orchestrator, result)
            })
            .map_err(|e| {
                self.status.set_running(false);
                self.status.set_state(OrchestratorState::Failed);
                OrchestratorError::Spawn(e)
            })?;
        self.worker = Some(worker);
        Ok(())
    }

    /// Request a cooperative stop.  The worker exits at the next tick
    /// boundary and closes its sessions; use [`wait`][Self::wait] to join.
    pub fn stop(&self) {
        self.status.request_stop();
    }

    /// Block until the worker finishes and return its report.
    ///
    /// Returns `Ok(None)` when no run has finished yet and none is active.
    pub fn wait(&mut self) -> OrchestratorResult<Option<&RunReport>> {
        if let Some(worker) = self.worker.take() {
            let (orchestrator, result) = worker.join().map_err(|_| {
                self.status.set_running(false);
                self.status.set_state(OrchestratorState::Failed);
                OrchestratorError::WorkerPanicked
            })?;
            self.idle = Some(orchestrator);
            self.report = Some(result?);
        }
        Ok(self.report.as_ref())
    }

    /// Stop any active run, then discard all run state.
    ///
    /// After a worker panic the orchestrator is rebuilt from the stored
    /// factory and model, so the handle is usable again.
    pub fn reset(&mut self) -> OrchestratorResult<()> {
        self.stop();
        if let Err(e) = self.wait() {
            error!("run ended with an error before reset: {e}");
        }
        match self.idle.as_mut() {
            Some(orchestrator) => orchestrator.reset()?,
            None => {
                warn!("orchestrator lost with its worker; rebuilding");
                let orchestrator = DualOrchestrator::new(self.factory.clone(), Arc::clone(&self.model));
                self.status = orchestrator.shared_status();
                self.idle = Some(orchestrator);
            }
        }
        self.snapshots = None;
        self.live_rx = None;
        self.live = None;
        self.report = None;
        Ok(())
    }

    // ── Reads ─────────────────────────────────────────────────────────────

    pub fn status(&self) -> RunStatus {
        self.status.snapshot()
    }

    pub fn is_running(&self) -> bool {
        self.status.is_running()
    }

    /// Per-strategy results: final once the run has ended, otherwise the
    /// latest published reduction.  `None` before the first publication.
    pub fn results(&mut self) -> Option<RunResults> {
        self.poll();
        if let Some(report) = &self.report {
            return Some(report.results.clone());
        }
        if let Some(latest) = self.live_rx.as_ref().and_then(|rx| rx.try_iter().last()) {
            self.live = Some(latest);
        }
        self.live.clone()
    }

    /// Same sources as [`results`][Self::results].  `None` after a
    /// single-strategy run.
    pub fn comparison_metrics(&mut self) -> Option<ComparisonMetrics> {
        self.results().and_then(|r| r.comparison())
    }

    pub fn report(&mut self) -> Option<&RunReport> {
        self.poll();
        self.report.as_ref()
    }

    /// Take every snapshot published so far without blocking.
    pub fn drain_snapshots(&self) -> Vec<TickSnapshot> {
        self.snapshots.as_ref().map(|rx| rx.try_iter().collect()).unwrap_or_default()
    }

    pub fn snapshots(&self) -> Option<&Receiver<TickSnapshot>> {
        self.snapshots.as_ref()
    }

    // ── Internals ─────────────────────────────────────────────────────────

    /// Collect a worker that has already finished.
    fn poll(&mut self) {
        if self.worker.as_ref().is_some_and(JoinHandle::is_finished) {
            if let Err(e) = self.wait() {
                error!("run worker: {e}");
            }
        }
    }

    fn orchestrator_mut(&mut self, action: &'static str) -> OrchestratorResult<&mut DualOrchestrator<F>> {
        match (&mut self.idle, &self.worker) {
            (Some(orchestrator), _) => Ok(orchestrator),
            (None, Some(_)) => Err(OrchestratorError::InvalidState { action, state: "running" }),
            (None, None) => Err(OrchestratorError::WorkerPanicked),
        }
    }
}

impl<F: EngineFactory> Drop for OrchestratorHandle<F> {
    fn drop(&mut self) {
        self.status.request_stop();
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}
