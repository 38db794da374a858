//! Clock-driven round-robin controller.

use tsc_core::{IntersectionId, PhaseIndex, Tick};
use tsc_topology::PhaseTopologyMap;

use crate::{
    ControlError, ControlResult, ControlStep, ControllerConfig, ControllerCounters, ControllerState,
    IntersectionSnapshot, Signal, SignalController,
};

/// Cycles through the topology's green phases in program order, each held
/// for `green_duration` and followed by `yellow_duration` of its yellow.
///
/// Traffic never influences the phase; the snapshot is ignored.
pub struct FixedCycleController {
    topology: PhaseTopologyMap,
    config:   ControllerConfig,
    sequence: Vec<PhaseIndex>,
    position: usize,
    state:    ControllerState,
    cycles:   u64,
    started:  bool,
}

impl FixedCycleController {
    pub fn new(topology: PhaseTopologyMap, config: ControllerConfig) -> ControlResult<Self> {
        config.validate()?;
        let sequence = topology.green_phases().to_vec();
        let Some(&first) = sequence.first() else {
            return Err(ControlError::Config(format!("{} has no green phases", topology.intersection())));
        };
        Ok(Self {
            topology,
            config,
            sequence,
            position: 0,
            state: ControllerState::new(first),
            cycles: 0,
            started: false,
        })
    }

    /// Completed passes through the whole sequence.
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    pub fn sequence(&self) -> &[PhaseIndex] {
        &self.sequence
    }
}

impl SignalController for FixedCycleController {
    fn kind(&self) -> &'static str {
        "fixed-cycle"
    }

    fn intersection(&self) -> &IntersectionId {
        self.topology.intersection()
    }

    fn tick(&mut self, _now: Tick, _snapshot: &IntersectionSnapshot) -> ControlStep {
        let mut command = None;
        if !self.started {
            self.started = true;
            command = Some(self.state.current_phase());
        }

        match self.state.signal {
            Signal::Yellow { .. } => {
                if let Some(green) = self.state.finish_yellow(self.config.yellow_duration) {
                    self.position = (self.position + 1) % self.sequence.len();
                    if self.position == 0 {
                        self.cycles += 1;
                    }
                    command = Some(green);
                }
            }
            Signal::Green(_) if self.state.time_in_phase >= self.config.green_duration => {
                let next = self.sequence[(self.position + 1) % self.sequence.len()];
                command = Some(self.state.begin_yellow(&self.topology, next));
            }
            Signal::Green(_) => {}
        }

        self.state.time_in_phase += 1;
        ControlStep { command, emergency: false }
    }

    fn state(&self) -> &ControllerState {
        &self.state
    }

    fn counters(&self) -> ControllerCounters {
        ControllerCounters { cycles: self.cycles, ..ControllerCounters::default() }
    }

    fn reset(&mut self) {
        self.position = 0;
        self.state = ControllerState::new(self.sequence[0]);
        self.cycles = 0;
        self.started = false;
    }
}
