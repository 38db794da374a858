//! Where engines and their shared demand come from.

use tsc_core::RunConfig;
use tsc_session::{DemandPlan, MemoryEngine, MemoryNetwork, SessionResult, SimulationEngine};

use crate::Strategy;

/// Creates one engine instance per strategy and the demand both receive.
///
/// `demand` is called once per run, so both sessions load the same plan.
pub trait EngineFactory: Send + 'static {
    type Engine: SimulationEngine + 'static;

    fn create(&self, strategy: Strategy) -> SessionResult<Self::Engine>;

    fn demand(&self, run: &RunConfig) -> DemandPlan;
}

impl EngineFactory for MemoryNetwork {
    type Engine = MemoryEngine;

    fn create(&self, _strategy: Strategy) -> SessionResult<MemoryEngine> {
        Ok(MemoryEngine::new(self.clone()))
    }

    fn demand(&self, run: &RunConfig) -> DemandPlan {
        MemoryNetwork::demand(self, run.vehicle_count, run.max_steps, run.seed)
    }
}
