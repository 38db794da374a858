//! Lifecycle wrapper around one engine instance.

use std::time::{Duration, Instant};

use log::{debug, warn};

use tsc_core::{IntersectionId, PhaseIndex, RouteId, VehicleId};

use crate::{SessionConfig, SessionError, SessionResult, SimulationEngine};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SessionStatus {
    /// Constructed, never started.
    Idle,
    Open,
    Closed,
}

/// One labelled connection to one engine instance.
///
/// Counts successful steps so a caller driving two sessions can check they
/// never drift.  Dropping an open session closes it.
///
/// Every query and mutation is held to the `io_timeout` of the config the
/// session was started with; an overrun discards the result and reports
/// [`SessionError::Timeout`].  `step` is exempt.
pub struct SimulationSession<E: SimulationEngine> {
    label:      String,
    engine:     E,
    status:     SessionStatus,
    steps:      u64,
    io_timeout: Duration,
}

impl<E: SimulationEngine> SimulationSession<E> {
    pub fn new(label: impl Into<String>, engine: E) -> Self {
        Self {
            label: label.into(),
            engine,
            status: SessionStatus::Idle,
            steps: 0,
            io_timeout: Duration::from_secs(5),
        }
    }

    // ── Lifecycle ─────────────────────────────────────────────────────────

    pub fn start(&mut self, config: &SessionConfig) -> SessionResult<()> {
        match self.status {
            SessionStatus::Open => {
                return Err(SessionError::Rejected(format!("session `{}` is already open", self.label)));
            }
            SessionStatus::Closed => return Err(SessionError::Closed(self.label.clone())),
            SessionStatus::Idle => {}
        }
        self.engine.start(config)?;
        self.io_timeout = config.io_timeout;
        self.status = SessionStatus::Open;
        debug!("session `{}` started", self.label);
        Ok(())
    }

    /// Advance the engine by one tick.
    ///
    /// Fails with [`SessionError::NotAlive`] when the session is not open or
    /// the engine process has gone away.
    pub fn step(&mut self) -> SessionResult<()> {
        self.ensure_open()?;
        if !self.engine.is_alive() {
            return Err(SessionError::NotAlive(self.label.clone()));
        }
        self.engine.advance()?;
        self.steps += 1;
        Ok(())
    }

    /// Close the engine.  Never fails; closing twice or closing a session
    /// that was never started is a no-op.
    pub fn close(&mut self) {
        if self.status == SessionStatus::Open {
            if let Err(e) = self.engine.close() {
                debug!("session `{}`: close failed ({e}); ignoring", self.label);
            }
        }
        if self.status != SessionStatus::Closed {
            debug!("session `{}` closed after {} steps", self.label, self.steps);
        }
        self.status = SessionStatus::Closed;
    }

    // ── Access ────────────────────────────────────────────────────────────

    /// Run a read query against the engine.
    pub fn query<T>(&self, f: impl FnOnce(&E) -> SessionResult<T>) -> SessionResult<T> {
        self.ensure_open()?;
        let started = Instant::now();
        let result = f(&self.engine);
        self.within_budget(started, result)
    }

    /// Run a write operation against the engine.
    pub fn mutate<T>(&mut self, f: impl FnOnce(&mut E) -> SessionResult<T>) -> SessionResult<T> {
        self.ensure_open()?;
        let started = Instant::now();
        let result = f(&mut self.engine);
        self.within_budget(started, result)
    }

    /// Per-call budget for queries and mutations.
    #[inline]
    pub fn io_timeout(&self) -> Duration {
        self.io_timeout
    }

    pub fn set_phase(&mut self, intersection: &IntersectionId, phase: PhaseIndex) -> SessionResult<()> {
        self.mutate(|e| e.set_phase(intersection, phase))
    }

    pub fn add_vehicle(&mut self, vehicle: &VehicleId, route: &RouteId, vtype: &str) -> SessionResult<()> {
        self.mutate(|e| e.add_vehicle(vehicle, route, vtype))
    }

    #[inline]
    pub fn label(&self) -> &str {
        &self.label
    }

    #[inline]
    pub fn status(&self) -> SessionStatus {
        self.status
    }

    #[inline]
    pub fn is_open(&self) -> bool {
        self.status == SessionStatus::Open
    }

    /// Successful `step` calls so far.
    #[inline]
    pub fn steps(&self) -> u64 {
        self.steps
    }

    /// The wrapped engine, bypassing lifecycle checks.
    pub fn engine(&self) -> &E {
        &self.engine
    }

    fn within_budget<T>(&self, started: Instant, result: SessionResult<T>) -> SessionResult<T> {
        let elapsed = started.elapsed();
        if elapsed > self.io_timeout {
            warn!("session `{}`: engine call took {elapsed:?}, budget {:?}", self.label, self.io_timeout);
            return Err(SessionError::Timeout(self.io_timeout));
        }
        result
    }

    fn ensure_open(&self) -> SessionResult<()> {
        match self.status {
            SessionStatus::Open => Ok(()),
            SessionStatus::Idle => Err(SessionError::NotAlive(self.label.clone())),
            SessionStatus::Closed => Err(SessionError::Closed(self.label.clone())),
        }
    }
}

impl<E: SimulationEngine> Drop for SimulationSession<E> {
    fn drop(&mut self) {
        self.close();
    }
}

// ── Degrade policy ────────────────────────────────────────────────────────────

/// Replace a failed query with a fallback value, logging the failure at
/// `debug`.  This is the single place "no data this tick" is decided.
///
/// A lost connection and a rejected request degrade the same way; only the
/// log line tells them apart.
pub trait OrDegrade<T> {
    fn or_degrade(self, what: &str, fallback: T) -> T;
}

impl<T> OrDegrade<T> for SessionResult<T> {
    fn or_degrade(self, what: &str, fallback: T) -> T {
        match self {
            Ok(v) => v,
            Err(e) if e.is_connection_failure() => {
                debug!("{what}: engine unreachable ({e}); degrading to no data");
                fallback
            }
            Err(e) => {
                debug!("{what}: {e}; degrading to no data");
                fallback
            }
        }
    }
}
