//! Scalar and vector arithmetic in pixel space

use serde::{Deserialize, Serialize};

/// A 2D vector in rectangular form.
///
/// Pixel space convention: x grows rightwards, y grows downwards.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vector2 {
    pub x: f64,
    pub y: f64,
}

impl Vector2 {
    pub const ZERO: Vector2 = Vector2 { x: 0.0, y: 0.0 };

    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Multiply by the scalar s.
    #[inline]
    pub fn scaled(self, s: f64) -> Self {
        Self {
            x: self.x * s,
            y: self.y * s,
        }
    }

    /// Component-wise sum.
    #[inline]
    pub fn plus(self, other: Vector2) -> Self {
        Self {
            x: self.x + other.x,
            y: self.y + other.y,
        }
    }

    /// Euclidean length.
    #[inline]
    pub fn magnitude(self) -> f64 {
        (self.x * self.x + self.y * self.y).sqrt()
    }
}

/// Squared distance between (x0, y0) and (x1, y1).
#[inline]
pub fn dist_sq(x0: f64, y0: f64, x1: f64, y1: f64) -> f64 {
    let dx = x0 - x1;
    let dy = y0 - y1;
    dx * dx + dy * dy
}

/// Distance between (x0, y0) and (x1, y1).
#[inline]
pub fn dist(x0: f64, y0: f64, x1: f64, y1: f64) -> f64 {
    dist_sq(x0, y0, x1, y1).sqrt()
}
