//! Raw signal-program and lane-geometry data as reported by an engine.
//!
//! These are plain values with no behaviour beyond character tests on phase
//! state strings.  `tsc-topology` turns them into a `PhaseTopologyMap`.
//!
//! # Phase state strings
//!
//! One character per signal index:
//!
//! | Char      | Meaning                      |
//! |-----------|------------------------------|
//! | `G` / `g` | green (priority / yielding)  |
//! | `y` / `Y` | yellow                       |
//! | `r` / …   | anything else counts as stop |

use serde::{Deserialize, Serialize};

use crate::{LaneId, Point};

/// One phase of a compiled signal program.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PhaseDef {
    pub state:         String,
    /// Nominal duration from the program; informational only.
    pub duration_secs: f64,
}

impl PhaseDef {
    pub fn new(state: impl Into<String>, duration_secs: f64) -> Self {
        Self { state: state.into(), duration_secs }
    }

    #[inline]
    pub fn has_green(&self) -> bool {
        self.state.chars().any(is_green)
    }

    #[inline]
    pub fn has_yellow(&self) -> bool {
        self.state.chars().any(is_yellow)
    }

    /// `true` when the phase shows green and no yellow anywhere.
    #[inline]
    pub fn is_green_phase(&self) -> bool {
        self.has_green() && !self.has_yellow()
    }

    /// Green at signal `index`?  Out-of-range indices are not green.
    #[inline]
    pub fn green_at(&self, index: usize) -> bool {
        self.state.chars().nth(index).is_some_and(is_green)
    }

    /// Iterator over the signal indices showing green.
    pub fn green_indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.state
            .chars()
            .enumerate()
            .filter(|&(_, c)| is_green(c))
            .map(|(i, _)| i)
    }
}

#[inline]
fn is_green(c: char) -> bool {
    matches!(c, 'G' | 'g')
}

#[inline]
fn is_yellow(c: char) -> bool {
    matches!(c, 'y' | 'Y')
}

/// The compiled phase program of one intersection.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SignalProgram {
    pub program_id: String,
    pub phases:     Vec<PhaseDef>,
}

impl SignalProgram {
    pub fn new(program_id: impl Into<String>, phases: Vec<PhaseDef>) -> Self {
        Self { program_id: program_id.into(), phases }
    }

    #[inline]
    pub fn phase_count(&self) -> usize {
        self.phases.len()
    }
}

/// One controlled connection behind a signal index.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaneLink {
    pub from: LaneId,
    pub to:   LaneId,
    pub via:  Option<LaneId>,
}

impl LaneLink {
    pub fn new(from: impl Into<LaneId>, to: impl Into<LaneId>) -> Self {
        Self { from: from.into(), to: to.into(), via: None }
    }
}

/// Shape and placement of one lane.
///
/// `index` counts from the right-most lane of the edge (0) outwards, so the
/// lane with `index == edge_lane_count - 1` is the outermost (left-most)
/// lane of a multi-lane approach.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LaneGeometry {
    pub lane:            LaneId,
    pub shape:           Vec<Point>,
    pub length:          f64,
    pub index:           u8,
    pub edge_lane_count: u8,
}

impl LaneGeometry {
    /// Outermost lane of an approach with more than one lane.
    #[inline]
    pub fn is_outermost(&self) -> bool {
        self.edge_lane_count > 1 && self.index + 1 == self.edge_lane_count
    }
}
