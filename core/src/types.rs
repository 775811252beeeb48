//! Shared primitive types used across the entire simulation.

use serde::{Deserialize, Serialize};

/// Identifies one engine session in the event log.
pub type RunId = String;

/// One frame of the simulation loop. Counts calls to `tick`, not time.
pub type Tick = u64;

/// Milliseconds on the single monotonic simulation axis.
pub type Millis = f64;

pub type SettlerId    = u64;
pub type HouseId      = u64;
pub type FarmId       = u64;
pub type CropId       = u64;
pub type ProjectileId = u64;

/// A position on the planet play-field.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance_to(&self, other: Point) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }

    /// Linear blend towards `other`; `t` is not clamped.
    pub fn lerp(&self, other: Point, t: f64) -> Point {
        Point {
            x: self.x + (other.x - self.x) * t,
            y: self.y + (other.y - self.y) * t,
        }
    }

    pub fn offset(&self, dx: f64, dy: f64) -> Point {
        Point { x: self.x + dx, y: self.y + dy }
    }
}
