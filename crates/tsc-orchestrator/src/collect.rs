//! Engine reads: topology input once per session, snapshots every tick.
//!
//! Snapshot collection is where failed engine queries become "no data this tick": a failed
//! query is logged at `debug` and replaced by an empty value, and the
//! intersection's queue length falls back to the last value seen.

use std::collections::BTreeMap;

use tsc_control::{ControlStep, IntersectionSnapshot, LaneSnapshot, SignalController, VehicleSnapshot};
use tsc_core::{IntersectionId, LaneId};
use tsc_metrics::IntersectionMetrics;
use tsc_session::{OrDegrade, SessionResult, SimulationEngine, SimulationSession};
use tsc_topology::{PhaseTopologyMap, RawTopology, TopologyError};

/// Read program, links, and lane geometry, then build or fall back.
pub(crate) fn discover_topology<E: SimulationEngine>(
    session:      &SimulationSession<E>,
    intersection: &IntersectionId,
) -> PhaseTopologyMap {
    let raw = session
        .query(|e| {
            let program = e.signal_program(intersection)?;
            let links = e.controlled_links(intersection)?;
            let lanes = e
                .controlled_lanes(intersection)?
                .iter()
                .map(|lane| e.lane_geometry(lane))
                .collect::<SessionResult<Vec<_>>>()?;
            Ok(RawTopology { program, links, lanes })
        })
        .map_err(|e| TopologyError::Session(e.to_string()));
    PhaseTopologyMap::discover(intersection.clone(), raw)
}

/// Tracks whether any query of the current collection had to be degraded.
struct Degrade<'a> {
    label:    &'a str,
    degraded: bool,
}

impl Degrade<'_> {
    fn take<T>(&mut self, result: SessionResult<T>, what: impl FnOnce() -> String, fallback: T) -> T {
        match result {
            Ok(v) => v,
            Err(e) => {
                self.degraded = true;
                SessionResult::<T>::Err(e).or_degrade(&format!("{}: {}", self.label, what()), fallback)
            }
        }
    }
}

pub(crate) struct Collected {
    pub snapshot: IntersectionSnapshot,
    pub degraded: bool,
}

/// Read everything a controller needs about one intersection this tick.
pub(crate) fn collect<E: SimulationEngine>(
    session:      &SimulationSession<E>,
    intersection: &IntersectionId,
) -> Collected {
    let mut d = Degrade { label: session.label(), degraded: false };

    let lanes = d.take(
        session.query(|e| e.controlled_lanes(intersection)),
        || format!("controlled lanes of {intersection}"),
        Vec::new(),
    );

    let lanes = lanes
        .into_iter()
        .map(|lane| {
            let length = d.take(session.query(|e| e.lane_length(&lane)), || format!("length of {lane}"), 0.0);
            let halted = d.take(session.query(|e| e.lane_halted(&lane)), || format!("halted on {lane}"), 0);
            let ids = d.take(session.query(|e| e.lane_vehicles(&lane)), || format!("vehicles on {lane}"), Vec::new());
            let vehicles = ids
                .into_iter()
                .map(|id| {
                    let vtype = d.take(session.query(|e| e.vehicle_type(&id)), || format!("type of {id}"), String::new());
                    let pos = d.take(session.query(|e| e.vehicle_lane_position(&id)), || format!("position of {id}"), 0.0);
                    let waiting_time =
                        d.take(session.query(|e| e.vehicle_waiting_time(&id)), || format!("waiting time of {id}"), 0.0);
                    VehicleSnapshot {
                        id,
                        vtype,
                        distance_to_stop: (length - pos).max(0.0),
                        waiting_time: waiting_time.max(0.0),
                    }
                })
                .collect();
            LaneSnapshot { lane, length, halted, vehicles }
        })
        .collect();

    Collected {
        snapshot: IntersectionSnapshot { intersection: intersection.clone(), lanes },
        degraded: d.degraded,
    }
}

/// Build the per-intersection metrics row after the controller has ticked.
///
/// `last_queue` holds the most recent non-degraded queue length.
pub(crate) fn intersection_metrics(
    controller: &dyn SignalController,
    collected:  &Collected,
    step:       ControlStep,
    last_queue: &mut u32,
) -> IntersectionMetrics {
    let snapshot = &collected.snapshot;
    let queue_length = if collected.degraded {
        *last_queue
    } else {
        *last_queue = snapshot.queue_length();
        *last_queue
    };
    let waiting_time = snapshot.total_waiting_time();
    let waiting_vehicles = snapshot.waiting_vehicles();
    let lane_halted: BTreeMap<LaneId, u32> = snapshot.lanes.iter().map(|l| (l.lane.clone(), l.halted)).collect();

    let state = controller.state();
    IntersectionMetrics {
        intersection: snapshot.intersection.clone(),
        phase: state.current_phase(),
        is_yellow: state.is_yellow(),
        time_in_phase: state.time_in_phase,
        waiting_time,
        mean_waiting: if waiting_vehicles > 0 { waiting_time / waiting_vehicles as f64 } else { 0.0 },
        queue_length,
        lane_halted,
        emergency: step.emergency,
    }
}
