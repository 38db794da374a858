//! The immutable per-intersection phase map.

use std::collections::{BTreeMap, BTreeSet};

use tsc_core::{ActionClass, IntersectionId, LaneId, Movement, PhaseIndex};

/// How a [`PhaseTopologyMap`] was obtained.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TopologyOrigin {
    /// Built from the engine's program and connectivity.
    Discovered,
    /// Discovery failed; the fixed four-phase layout is in use.
    Fallback,
}

/// Movement → phase and phase → yellow mapping for one intersection.
///
/// Built once per session at the first tick and never mutated.  Every phase
/// index it hands out is `< phase_count()`.
#[derive(Clone, Debug)]
pub struct PhaseTopologyMap {
    pub(crate) intersection:   IntersectionId,
    pub(crate) phase_count:    usize,
    pub(crate) green_phases:   Vec<PhaseIndex>,
    pub(crate) action_phases:  [PhaseIndex; 4],
    pub(crate) yellow_after:   BTreeMap<PhaseIndex, PhaseIndex>,
    pub(crate) phase_service:  BTreeMap<PhaseIndex, BTreeSet<Movement>>,
    pub(crate) lane_movements: BTreeMap<LaneId, Movement>,
    pub(crate) origin:         TopologyOrigin,
}

impl PhaseTopologyMap {
    /// Phases in the fixed four-phase layout.
    pub const FALLBACK_PHASE_COUNT: usize = 8;

    /// The fixed layout used when discovery fails: greens 0, 2, 4, 6 mapped
    /// to the four actions in order, each followed by its yellow.
    ///
    /// Lane classification is independent of the program, so callers pass
    /// whatever lane movements they could still derive.
    pub fn fallback(intersection: IntersectionId, lane_movements: BTreeMap<LaneId, Movement>) -> Self {
        let greens = [PhaseIndex(0), PhaseIndex(2), PhaseIndex(4), PhaseIndex(6)];
        let yellow_after = greens.iter().map(|&g| (g, PhaseIndex(g.0 + 1))).collect();
        let phase_service = ActionClass::ALL
            .iter()
            .zip(greens)
            .map(|(a, g)| (g, a.targets().into_iter().collect()))
            .collect();
        Self {
            intersection,
            phase_count: Self::FALLBACK_PHASE_COUNT,
            green_phases: greens.to_vec(),
            action_phases: greens,
            yellow_after,
            phase_service,
            lane_movements,
            origin: TopologyOrigin::Fallback,
        }
    }

    // ── Queries ───────────────────────────────────────────────────────────

    #[inline]
    pub fn intersection(&self) -> &IntersectionId {
        &self.intersection
    }

    #[inline]
    pub fn phase_count(&self) -> usize {
        self.phase_count
    }

    #[inline]
    pub fn origin(&self) -> TopologyOrigin {
        self.origin
    }

    #[inline]
    pub fn is_fallback(&self) -> bool {
        self.origin == TopologyOrigin::Fallback
    }

    /// Green phases in program order.  Never empty.
    #[inline]
    pub fn green_phases(&self) -> &[PhaseIndex] {
        &self.green_phases
    }

    /// Physical green phase for an action class.
    #[inline]
    pub fn phase_for(&self, action: ActionClass) -> PhaseIndex {
        self.action_phases[action.index()]
    }

    /// Yellow phase that must follow `green` before any other green.
    ///
    /// Phases outside the discovered set use the immediate successor.
    pub fn yellow_after(&self, green: PhaseIndex) -> PhaseIndex {
        self.yellow_after.get(&green).copied().unwrap_or_else(|| {
            let next = (green.index() + 1) % self.phase_count.max(1);
            PhaseIndex(next as u16)
        })
    }

    /// Movement class of a controlled lane, if it could be classified.
    #[inline]
    pub fn movement_of(&self, lane: &LaneId) -> Option<Movement> {
        self.lane_movements.get(lane).copied()
    }

    /// Movements a green phase serves (empty for unknown phases).
    pub fn served_by(&self, phase: PhaseIndex) -> impl Iterator<Item = Movement> + '_ {
        self.phase_service.get(&phase).into_iter().flatten().copied()
    }

    /// Every classified controlled lane.
    pub fn lanes(&self) -> impl Iterator<Item = (&LaneId, Movement)> {
        self.lane_movements.iter().map(|(l, &m)| (l, m))
    }
}
