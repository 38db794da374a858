//! Pure topology construction from raw engine data.
//!
//! Each heuristic is a free function so it can be tested on its own;
//! [`build_topology`] only wires them together.

use std::collections::{BTreeMap, BTreeSet};

use log::{debug, warn};

use tsc_core::geo::terminal_bearing;
use tsc_core::{
    ActionClass, Approach, IntersectionId, LaneGeometry, LaneId, LaneLink, Movement, PhaseIndex,
    SignalProgram, Turn,
};

use crate::{PhaseTopologyMap, TopologyError, TopologyOrigin, TopologyResult};

/// Everything discovery reads from an engine for one intersection.
#[derive(Clone, Debug, Default)]
pub struct RawTopology {
    /// First compiled program, if the engine reported one.
    pub program: Option<SignalProgram>,
    /// `links[i]` = connections controlled by signal index `i`.
    pub links:   Vec<Vec<LaneLink>>,
    /// Geometry of every controlled incoming lane.
    pub lanes:   Vec<LaneGeometry>,
}

// ── Heuristic steps ───────────────────────────────────────────────────────────

/// Classify a lane by the heading of its terminal segment and its position
/// within the approach.
///
/// The outermost lane of a multi-lane approach is treated as the dedicated
/// left-turn lane.  Returns `None` for lanes without a usable shape.
pub fn classify_lane(geometry: &LaneGeometry) -> Option<Movement> {
    let bearing = terminal_bearing(&geometry.shape)?;
    let approach = Approach::from_heading(bearing);
    let turn = if geometry.is_outermost() { Turn::Left } else { Turn::Through };
    Some(Movement::new(approach, turn))
}

/// Movements reached through each signal index.
pub fn signal_movements(
    links:          &[Vec<LaneLink>],
    lane_movements: &BTreeMap<LaneId, Movement>,
) -> Vec<BTreeSet<Movement>> {
    links
        .iter()
        .map(|group| {
            group
                .iter()
                .filter_map(|link| lane_movements.get(&link.from).copied())
                .collect()
        })
        .collect()
}

/// Green phases in program order: at least one `G`/`g` and no yellow.
///
/// If the program has none, every second phase starting at 0 is assumed to
/// be green.
pub fn green_phases(program: &SignalProgram) -> Vec<PhaseIndex> {
    let greens: Vec<PhaseIndex> = program
        .phases
        .iter()
        .enumerate()
        .filter(|(_, p)| p.is_green_phase())
        .map(|(i, _)| PhaseIndex(i as u16))
        .collect();
    if !greens.is_empty() {
        return greens;
    }
    (0..program.phase_count()).step_by(2).map(|i| PhaseIndex(i as u16)).collect()
}

/// Every phase showing green on at least one signal, in program order.
///
/// Wider than [`green_phases`]: a phase that turns one stream yellow while
/// another keeps or gains green still counts as serving that stream.
pub fn scoring_phases(program: &SignalProgram) -> Vec<PhaseIndex> {
    program
        .phases
        .iter()
        .enumerate()
        .filter(|(_, p)| p.has_green())
        .map(|(i, _)| PhaseIndex(i as u16))
        .collect()
}

/// Movements served by each candidate phase.  Phases that serve no
/// classified movement are omitted.
pub fn phase_service(
    program: &SignalProgram,
    greens:  &[PhaseIndex],
    signals: &[BTreeSet<Movement>],
) -> BTreeMap<PhaseIndex, BTreeSet<Movement>> {
    let mut service = BTreeMap::new();
    for &g in greens {
        let Some(phase) = program.phases.get(g.index()) else {
            continue;
        };
        let served: BTreeSet<Movement> = phase
            .green_indices()
            .filter_map(|i| signals.get(i))
            .flatten()
            .copied()
            .collect();
        if !served.is_empty() {
            service.insert(g, served);
        }
    }
    service
}

/// The phase serving the most of `action`'s target movements.
///
/// Ties keep the lowest phase index.  `None` when no phase serves any target.
pub fn best_phase(
    action:  ActionClass,
    service: &BTreeMap<PhaseIndex, BTreeSet<Movement>>,
) -> Option<PhaseIndex> {
    let targets = action.targets();
    let mut best: Option<(PhaseIndex, usize)> = None;
    for (&phase, served) in service {
        let score = targets.iter().filter(|m| served.contains(m)).count();
        if score > 0 && best.is_none_or(|(_, s)| score > s) {
            best = Some((phase, score));
        }
    }
    best.map(|(p, _)| p)
}

/// Deterministic stand-in when no phase serves an action.
///
/// # Panics
/// Panics if `greens` is empty; [`green_phases`] never returns an empty list
/// for a non-empty program.
pub fn cyclic_fallback(action: ActionClass, greens: &[PhaseIndex]) -> PhaseIndex {
    greens[action.index() % greens.len()]
}

/// The phase that follows `green` in program order.
pub fn yellow_successor(program: &SignalProgram, green: PhaseIndex) -> PhaseIndex {
    let n = program.phase_count().max(1);
    PhaseIndex(((green.index() + 1) % n) as u16)
}

// ── Assembly ──────────────────────────────────────────────────────────────────

/// Classify every lane that has a usable shape.
fn classify_lanes(lanes: &[LaneGeometry]) -> BTreeMap<LaneId, Movement> {
    lanes
        .iter()
        .filter_map(|g| classify_lane(g).map(|m| (g.lane.clone(), m)))
        .collect()
}

/// Build a topology map from raw engine data.
///
/// Pure: no engine access.  An intersection without links still gets a
/// valid map; every action then takes its cyclic fallback.
pub fn build_topology(intersection: IntersectionId, raw: &RawTopology) -> TopologyResult<PhaseTopologyMap> {
    let program = raw
        .program
        .as_ref()
        .ok_or_else(|| TopologyError::MissingProgram(intersection.clone()))?;
    if program.phases.is_empty() {
        return Err(TopologyError::EmptyProgram(intersection));
    }

    let lane_movements = classify_lanes(&raw.lanes);
    let signals = signal_movements(&raw.links, &lane_movements);
    let greens = green_phases(program);
    let service = phase_service(program, &scoring_phases(program), &signals);

    let mut action_phases = [PhaseIndex::INVALID; 4];
    for action in ActionClass::ALL {
        action_phases[action.index()] = match best_phase(action, &service) {
            Some(p) => p,
            None => {
                let p = cyclic_fallback(action, &greens);
                debug!("{intersection}: no phase serves {action}; using {p}");
                p
            }
        };
    }

    let yellow_after = greens
        .iter()
        .chain(service.keys())
        .map(|&g| (g, yellow_successor(program, g)))
        .collect();

    Ok(PhaseTopologyMap {
        intersection,
        phase_count: program.phase_count(),
        green_phases: greens,
        action_phases,
        yellow_after,
        phase_service: service,
        lane_movements,
        origin: TopologyOrigin::Discovered,
    })
}

impl PhaseTopologyMap {
    /// Build from engine data, or fall back to the fixed four-phase layout.
    ///
    /// Never fails.  A fallback is logged at `warn`.
    pub fn discover(intersection: IntersectionId, raw: TopologyResult<RawTopology>) -> Self {
        let (built, lanes) = match raw {
            Ok(raw) => (build_topology(intersection.clone(), &raw), classify_lanes(&raw.lanes)),
            Err(e) => (Err(e), BTreeMap::new()),
        };
        match built {
            Ok(map) => map,
            Err(e) => {
                warn!("{intersection}: topology discovery failed ({e}); using default four-phase layout");
                PhaseTopologyMap::fallback(intersection, lanes)
            }
        }
    }
}
