//! Spatial interpolation
//!
//! Interpolate scattered station samples over pixel space:
//! - IDW: inverse distance weighting over the k nearest neighbors
//! - TPS: thin plate spline surface fitting
//! - k-d tree: the spatial index backing the neighbor searches
//! - bilinear: unit-square interpolation between four grid vectors

pub mod idw;
pub mod kdtree;
pub mod tps;

pub use idw::InverseDistanceWeighting;
pub use kdtree::{KdTree, Neighbor, NeighborHeap};
pub use tps::ThinPlateSpline;

use windfield_core::Vector2;

/// A value that can be interpolated: averaged with weights and started
/// from zero. Scalars and 2-vectors both qualify.
pub trait SampleValue: Copy {
    fn zero() -> Self;
    fn plus(self, other: Self) -> Self;
    fn scaled(self, s: f64) -> Self;
}

impl SampleValue for f64 {
    fn zero() -> Self {
        0.0
    }

    fn plus(self, other: Self) -> Self {
        self + other
    }

    fn scaled(self, s: f64) -> Self {
        self * s
    }
}

impl SampleValue for Vector2 {
    fn zero() -> Self {
        Vector2::ZERO
    }

    fn plus(self, other: Self) -> Self {
        Vector2::plus(self, other)
    }

    fn scaled(self, s: f64) -> Self {
        Vector2::scaled(self, s)
    }
}

/// A sample point with x, y pixel coordinates and a value.
///
/// Points are immutable once handed to an interpolator; the building
/// interpolator takes ownership of its point set.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SamplePoint<V = f64> {
    pub x: f64,
    pub y: f64,
    pub value: V,
}

impl<V: SampleValue> SamplePoint<V> {
    pub fn new(x: f64, y: f64, value: V) -> Self {
        Self { x, y, value }
    }

    /// Squared Euclidean distance to (other_x, other_y)
    #[inline]
    pub fn dist_sq(&self, other_x: f64, other_y: f64) -> f64 {
        let dx = self.x - other_x;
        let dy = self.y - other_y;
        dx * dx + dy * dy
    }

    /// Euclidean distance to (other_x, other_y)
    #[inline]
    pub fn dist(&self, other_x: f64, other_y: f64) -> f64 {
        self.dist_sq(other_x, other_y).sqrt()
    }

    /// Coordinate on the given axis (0 = x, 1 = y)
    #[inline]
    pub(crate) fn coord(&self, axis: u8) -> f64 {
        if axis == 0 {
            self.x
        } else {
            self.y
        }
    }
}

/// Interpolators compile a point set into a reusable evaluator.
pub trait Interpolate {
    type Value;

    /// Interpolated value at the point (x, y).
    fn interpolate(&self, x: f64, y: f64) -> Self::Value;
}

/// Bilinear interpolation of four corner vectors at the fractional
/// position (x, y) within the unit square, g00 at the origin.
pub fn bilinear(x: f64, y: f64, g00: Vector2, g10: Vector2, g01: Vector2, g11: Vector2) -> Vector2 {
    let s = (1.0 - x) * (1.0 - y);
    let t = x * (1.0 - y);
    let u = (1.0 - x) * y;
    let v = x * y;
    Vector2::new(
        g00.x * s + g10.x * t + g01.x * u + g11.x * v,
        g00.y * s + g10.y * t + g01.y * u + g11.y * v,
    )
}
