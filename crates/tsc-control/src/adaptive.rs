//! Model-driven controller with emergency preemption.

use std::sync::Arc;

use log::{info, warn};
use serde::{Deserialize, Serialize};
use tsc_core::{ActionClass, IntersectionId, PhaseIndex, Tick, VehicleId};
use tsc_topology::PhaseTopologyMap;

use crate::{
    ControlError, ControlResult, ControlStep, ControllerConfig, ControllerCounters, ControllerState,
    DecisionModel, EmergencyCoordinator, EmergencyEvent, EmergencyTier, IntersectionSnapshot, Observation, Signal,
    SignalController,
};

/// One model decision, kept for the run's decision log.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DecisionRecord {
    pub tick:         Tick,
    pub action:       ActionClass,
    pub phase:        PhaseIndex,
    /// Occupied observation cells when the decision was taken.
    pub occupancy:    usize,
    pub queue_length: u32,
    pub waiting_time: f64,
}

/// Asks a [`DecisionModel`] for a new action every
/// `green_duration + yellow_duration` ticks and inserts the yellow
/// transition when the chosen phase differs from the active one.
///
/// Every tick, before the normal cadence, preemption-tier events from the
/// [`EmergencyCoordinator`] may take over: the first such vehicle is served
/// until it is no longer observed, and nothing else (neither the model nor a
/// second emergency vehicle) can move the signal meanwhile.
pub struct AdaptiveController {
    topology:       PhaseTopologyMap,
    config:         ControllerConfig,
    model:          Arc<dyn DecisionModel>,
    coordinator:    EmergencyCoordinator,
    initial:        PhaseIndex,
    state:          ControllerState,
    since_decision: u32,
    started:        bool,
    servicing:      Option<VehicleId>,
    preemptions:    u64,
    decisions:      Vec<DecisionRecord>,
}

impl AdaptiveController {
    pub fn new(topology: PhaseTopologyMap, config: ControllerConfig, model: Arc<dyn DecisionModel>) -> ControlResult<Self> {
        config.validate()?;
        let Some(&initial) = topology.green_phases().first() else {
            return Err(ControlError::Config(format!("{} has no green phases", topology.intersection())));
        };
        let coordinator = EmergencyCoordinator::new(config.emergency_type.clone(), config.thresholds);
        Ok(Self {
            topology,
            config,
            model,
            coordinator,
            initial,
            state: ControllerState::new(initial),
            since_decision: 0,
            started: false,
            servicing: None,
            preemptions: 0,
            decisions: Vec::new(),
        })
    }

    pub fn decisions(&self) -> &[DecisionRecord] {
        &self.decisions
    }

    /// Emergency services that forced a phase change.
    pub fn preemptions(&self) -> u64 {
        self.preemptions
    }

    /// Vehicle currently holding the signal, if any.
    pub fn servicing(&self) -> Option<&VehicleId> {
        self.servicing.as_ref()
    }

    pub fn coordinator(&self) -> &EmergencyCoordinator {
        &self.coordinator
    }

    pub fn topology(&self) -> &PhaseTopologyMap {
        &self.topology
    }

    /// Clear a finished service and pick up a new one.  Returns `true` while
    /// an emergency owns the signal.
    fn service_emergency(&mut self, now: Tick, events: &[EmergencyEvent], command: &mut Option<PhaseIndex>) -> bool {
        let id = self.topology.intersection();

        if let Some(vehicle) = &self.servicing {
            if !events.iter().any(|e| &e.vehicle == vehicle) {
                info!("{now} {id}: emergency {vehicle} cleared; resuming from {}", self.state.target_phase());
                self.servicing = None;
                self.since_decision = 0;
            }
        }

        if self.servicing.is_none() {
            if let Some(event) = events.iter().find(|e| e.tier == EmergencyTier::Preemption) {
                let target = event.target_phase;
                if target != self.state.target_phase() {
                    match self.state.signal {
                        Signal::Green(_) => *command = Some(self.state.begin_yellow(&self.topology, target)),
                        Signal::Yellow { .. } => self.state.retarget(target),
                    }
                    self.preemptions += 1;
                    info!("{now} {id}: preempting to {target} for {}", event.vehicle);
                } else {
                    info!("{now} {id}: holding {target} for {}", event.vehicle);
                }
                self.servicing = Some(event.vehicle.clone());
            }
        }

        self.servicing.is_some()
    }

    fn decide(&mut self, now: Tick, observation: &Observation, snapshot: &IntersectionSnapshot, command: &mut Option<PhaseIndex>) {
        self.since_decision = 0;
        let action = match self.model.decide(observation) {
            Ok(a) => a,
            Err(e) => {
                warn!("{now} {}: {e}; holding {}", self.topology.intersection(), self.state.target_phase());
                return;
            }
        };
        let phase = self.topology.phase_for(action);
        if phase != self.state.target_phase() {
            *command = Some(self.state.begin_yellow(&self.topology, phase));
        }
        self.decisions.push(DecisionRecord {
            tick: now,
            action,
            phase,
            occupancy: observation.occupancy(),
            queue_length: snapshot.queue_length(),
            waiting_time: snapshot.total_waiting_time(),
        });
    }
}

impl SignalController for AdaptiveController {
    fn kind(&self) -> &'static str {
        "adaptive"
    }

    fn intersection(&self) -> &IntersectionId {
        self.topology.intersection()
    }

    fn tick(&mut self, now: Tick, snapshot: &IntersectionSnapshot) -> ControlStep {
        let mut command = None;
        if !self.started {
            self.started = true;
            command = Some(self.state.current_phase());
        }

        let events = self.coordinator.scan(now, snapshot, &self.topology);
        let emergency = self.service_emergency(now, &events, &mut command);

        if let Some(green) = self.state.finish_yellow(self.config.yellow_duration) {
            command = Some(green);
        } else if !emergency
            && !self.state.is_yellow()
            && self.since_decision >= self.config.decision_interval()
        {
            let observation = Observation::encode(snapshot, &self.topology);
            self.decide(now, &observation, snapshot, &mut command);
        }

        self.state.time_in_phase += 1;
        self.since_decision += 1;
        ControlStep { command, emergency }
    }

    fn state(&self) -> &ControllerState {
        &self.state
    }

    fn counters(&self) -> ControllerCounters {
        ControllerCounters {
            decisions:   self.decisions.len() as u64,
            preemptions: self.preemptions,
            ..ControllerCounters::default()
        }
    }

    fn reset(&mut self) {
        self.state = ControllerState::new(self.initial);
        self.since_decision = 0;
        self.started = false;
        self.servicing = None;
        self.preemptions = 0;
        self.decisions.clear();
        self.coordinator.reset();
    }
}
