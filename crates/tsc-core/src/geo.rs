//! Planar network coordinates and bearing helpers.
//!
//! Engines report lane shapes as polylines in a local Cartesian frame
//! (metres, x east, y north).  Only the direction of a lane's final segment
//! matters for movement classification, so this module stays tiny.

use serde::{Deserialize, Serialize};

/// A point in the engine's local network frame.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    #[inline]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Bearing of the vector `self → to` in degrees, counter-clockwise from
    /// east, normalised to `[0, 360)`.
    pub fn bearing_to(self, to: Point) -> f64 {
        let deg = (to.y - self.y).atan2(to.x - self.x).to_degrees();
        deg.rem_euclid(360.0)
    }
}

/// Bearing of the last segment of a polyline, or `None` when the shape has
/// fewer than two points or the last segment is degenerate.
pub fn terminal_bearing(shape: &[Point]) -> Option<f64> {
    let [.., a, b] = shape else {
        return None;
    };
    if a == b {
        return None;
    }
    Some(a.bearing_to(*b))
}

impl std::fmt::Display for Point {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:.2}, {:.2})", self.x, self.y)
    }
}
