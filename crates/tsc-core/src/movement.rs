//! Movement and action classes.
//!
//! A [`Movement`] is an abstract traffic stream: *which arm a vehicle comes
//! from* and *whether it goes straight or turns left*, independent of any
//! engine's phase numbering.  There are eight of them.
//!
//! An [`ActionClass`] is one of the four canonical decisions an adaptive
//! controller can make; each one serves two opposing movements:
//!
//! | Action        | Served movements                 | Group codes |
//! |---------------|----------------------------------|-------------|
//! | `NsThrough`   | north-through, south-through     | 2, 6        |
//! | `NsLeft`      | north-left, south-left           | 3, 7        |
//! | `EwThrough`   | west-through, east-through       | 0, 4        |
//! | `EwLeft`      | west-left, east-left             | 1, 5        |
//!
//! Group codes fix the layout of the adaptive controller's observation
//! vector (`group * 10 + distance_band`).

use std::fmt;

use serde::{Deserialize, Serialize};

// ── Approach ──────────────────────────────────────────────────────────────────

/// The compass arm an incoming lane belongs to.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug, Serialize, Deserialize)]
pub enum Approach {
    West,
    North,
    East,
    South,
}

impl Approach {
    pub const ALL: [Approach; 4] = [Approach::West, Approach::North, Approach::East, Approach::South];

    /// Classify by the heading of a vehicle travelling towards the stop line.
    ///
    /// A vehicle heading east (bearing in `[315, 45)`) arrives on the west
    /// arm; heading north on the south arm; and so on.
    pub fn from_heading(bearing_deg: f64) -> Approach {
        let b = bearing_deg.rem_euclid(360.0);
        if !(45.0..315.0).contains(&b) {
            Approach::West
        } else if b < 135.0 {
            Approach::South
        } else if b < 225.0 {
            Approach::East
        } else {
            Approach::North
        }
    }

    #[inline]
    pub fn is_north_south(self) -> bool {
        matches!(self, Approach::North | Approach::South)
    }

    /// Group code of this arm's through movement.
    #[inline]
    fn base_code(self) -> u8 {
        match self {
            Approach::West  => 0,
            Approach::North => 2,
            Approach::East  => 4,
            Approach::South => 6,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Approach::West  => "west",
            Approach::North => "north",
            Approach::East  => "east",
            Approach::South => "south",
        }
    }
}

// ── Turn / Movement ───────────────────────────────────────────────────────────

#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug, Serialize, Deserialize)]
pub enum Turn {
    /// Straight ahead (right turns share the through lane).
    Through,
    /// Dedicated left-turn lane.
    Left,
}

/// One of the eight abstract movement classes.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug, Serialize, Deserialize)]
pub struct Movement {
    pub approach: Approach,
    pub turn:     Turn,
}

impl Movement {
    pub const COUNT: usize = 8;

    #[inline]
    pub const fn new(approach: Approach, turn: Turn) -> Self {
        Self { approach, turn }
    }

    /// Stable code in `0..8` used as the observation-vector group.
    #[inline]
    pub fn group_code(self) -> u8 {
        self.approach.base_code() + matches!(self.turn, Turn::Left) as u8
    }

    /// Inverse of [`group_code`][Self::group_code].
    pub fn from_group_code(code: u8) -> Option<Movement> {
        let approach = match code / 2 {
            0 => Approach::West,
            1 => Approach::North,
            2 => Approach::East,
            3 => Approach::South,
            _ => return None,
        };
        let turn = if code % 2 == 1 { Turn::Left } else { Turn::Through };
        Some(Movement { approach, turn })
    }

    /// The action class whose green serves this movement.
    pub fn action(self) -> ActionClass {
        match (self.approach.is_north_south(), self.turn) {
            (true, Turn::Through)  => ActionClass::NsThrough,
            (true, Turn::Left)     => ActionClass::NsLeft,
            (false, Turn::Through) => ActionClass::EwThrough,
            (false, Turn::Left)    => ActionClass::EwLeft,
        }
    }
}

impl fmt::Display for Movement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let turn = match self.turn {
            Turn::Through => "through",
            Turn::Left    => "left",
        };
        write!(f, "{}-{}", self.approach.as_str(), turn)
    }
}

// ── ActionClass ───────────────────────────────────────────────────────────────

/// One of the four canonical adaptive-controller decisions.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug, Serialize, Deserialize)]
pub enum ActionClass {
    NsThrough = 0,
    NsLeft    = 1,
    EwThrough = 2,
    EwLeft    = 3,
}

impl ActionClass {
    pub const ALL: [ActionClass; 4] = [
        ActionClass::NsThrough,
        ActionClass::NsLeft,
        ActionClass::EwThrough,
        ActionClass::EwLeft,
    ];

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    /// The two opposing movements this action is meant to serve.
    pub fn targets(self) -> [Movement; 2] {
        use Approach::*;
        match self {
            ActionClass::NsThrough => [Movement::new(North, Turn::Through), Movement::new(South, Turn::Through)],
            ActionClass::NsLeft    => [Movement::new(North, Turn::Left), Movement::new(South, Turn::Left)],
            ActionClass::EwThrough => [Movement::new(West, Turn::Through), Movement::new(East, Turn::Through)],
            ActionClass::EwLeft    => [Movement::new(West, Turn::Left), Movement::new(East, Turn::Left)],
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ActionClass::NsThrough => "ns-through",
            ActionClass::NsLeft    => "ns-left",
            ActionClass::EwThrough => "ew-through",
            ActionClass::EwLeft    => "ew-left",
        }
    }
}

impl TryFrom<usize> for ActionClass {
    type Error = usize;

    /// Accepts exactly `0..4`; returns the rejected index otherwise.
    fn try_from(n: usize) -> Result<Self, usize> {
        ActionClass::ALL.get(n).copied().ok_or(n)
    }
}

impl fmt::Display for ActionClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
