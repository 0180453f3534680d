//! World-frame points.

use core::fmt;
use core::ops::{Add, Sub};
use libm::{atan2, sqrt};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A point `(x, y, z)` in the warehouse world frame.
///
/// `x` runs across streets, `y` is height above the floor and `z` runs along
/// the rack rows. The floor plane is `y = 0`.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Position3 {
    /// Cross-street coordinate.
    pub x: f64,
    /// Height above the floor.
    pub y: f64,
    /// Along-row coordinate.
    pub z: f64,
}

impl Position3 {
    /// Construct a new position.
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Position3 { x, y, z }
    }

    /// The same point projected onto the floor.
    pub const fn on_floor(self) -> Self {
        Position3::new(self.x, 0.0, self.z)
    }

    /// Euclidean length of the vector from the origin.
    pub fn length(&self) -> f64 {
        sqrt(self.x * self.x + self.y * self.y + self.z * self.z)
    }

    /// Multiply every component by `factor`.
    pub fn scale(self, factor: f64) -> Self {
        Position3::new(self.x * factor, self.y * factor, self.z * factor)
    }

    /// Euclidean distance to `other`.
    pub fn distance_to(&self, other: &Position3) -> f64 {
        (*other - *self).length()
    }

    /// Distance to `other` measured in the floor plane, ignoring height.
    pub fn horizontal_distance_to(&self, other: &Position3) -> f64 {
        let dx = other.x - self.x;
        let dz = other.z - self.z;
        sqrt(dx * dx + dz * dz)
    }

    /// Yaw of the vector pointing from `self` to `other`.
    ///
    /// Yaw is measured about the vertical axis, zero along `+z` and `PI / 2`
    /// along `+x`.
    pub fn yaw_to(&self, other: &Position3) -> f64 {
        atan2(other.x - self.x, other.z - self.z)
    }
}

impl Add for Position3 {
    type Output = Position3;

    fn add(self, rhs: Position3) -> Position3 {
        Position3::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl Sub for Position3 {
    type Output = Position3;

    fn sub(self, rhs: Position3) -> Position3 {
        Position3::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl fmt::Display for Position3 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(x: {:.2}, y: {:.2}, z: {:.2})", self.x, self.y, self.z)
    }
}
