//! Strongly typed identifier wrappers.
//!
//! Two families live here:
//!
//! - Integer indices into a signal program (`PhaseIndex`, `SignalIndex`).
//!   These are `Copy + Ord + Hash` with an `INVALID` sentinel.
//! - Engine-assigned string names (`IntersectionId`, `LaneId`, `VehicleId`,
//!   `RouteId`).  The external engine owns these names; we only compare and
//!   forward them.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Generate a typed index wrapper around a primitive integer.
macro_rules! typed_index {
    ($(#[$attr:meta])* $vis:vis struct $name:ident($inner:ty);) => {
        $(#[$attr])*
        #[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug, Serialize, Deserialize)]
        #[serde(transparent)]
        $vis struct $name(pub $inner);

        impl $name {
            /// Sentinel meaning "no valid index".
            pub const INVALID: $name = $name(<$inner>::MAX);

            /// Cast to `usize` for direct use as a `Vec` index.
            #[inline(always)]
            pub fn index(self) -> usize {
                self.0 as usize
            }
        }

        impl Default for $name {
            #[inline(always)]
            fn default() -> Self {
                Self::INVALID
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }

        impl TryFrom<usize> for $name {
            type Error = std::num::TryFromIntError;
            fn try_from(n: usize) -> Result<$name, Self::Error> {
                <$inner>::try_from(n).map($name)
            }
        }
    };
}

/// Generate an owned string-name wrapper.
macro_rules! string_id {
    ($(#[$attr:meta])* $vis:vis struct $name:ident;) => {
        $(#[$attr])*
        #[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug, Serialize, Deserialize)]
        #[serde(transparent)]
        $vis struct $name(pub String);

        impl $name {
            pub fn new(name: impl Into<String>) -> Self {
                Self(name.into())
            }

            #[inline]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_owned())
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }
    };
}

typed_index! {
    /// Index of a phase inside an intersection's compiled signal program.
    pub struct PhaseIndex(u16);
}

typed_index! {
    /// Index of one signal head (one character of a phase state string).
    pub struct SignalIndex(u16);
}

string_id! {
    /// Engine name of a signal-controlled intersection.
    pub struct IntersectionId;
}

string_id! {
    /// Engine name of a lane.
    pub struct LaneId;
}

string_id! {
    /// Engine name of a vehicle.
    pub struct VehicleId;
}

string_id! {
    /// Engine name of a route.
    pub struct RouteId;
}

impl RouteId {
    /// Engines prefix internal/auto-generated routes with `!`; those are
    /// never valid targets for injected vehicles.
    #[inline]
    pub fn is_internal(&self) -> bool {
        self.0.starts_with('!')
    }
}
