//! Inverse Distance Weighting (IDW) interpolation
//!
//! Estimates the value at a point as the average of its k nearest
//! samples, each weighted by the inverse of its squared distance. Used
//! for the wind vector field, where every station contributes a 2-vector.
//!
//! Reference:
//! Shepard, D. (1968). A two-dimensional interpolation function for
//! irregularly-spaced data. ACM National Conference.

use windfield_core::{Error, Result};

use super::kdtree::{KdTree, NeighborHeap};
use super::{Interpolate, SamplePoint, SampleValue};

/// A compiled IDW evaluator over a fixed point set.
///
/// Builds its k-d tree once at construction; evaluation is a k-nearest
/// lookup plus a weighted average. The evaluator itself is read-only, so
/// shared references may evaluate concurrently, each with its own
/// scratch heap.
#[derive(Debug)]
pub struct InverseDistanceWeighting<V = f64> {
    tree: KdTree<V>,
    k: usize,
}

impl<V: SampleValue> InverseDistanceWeighting<V> {
    /// Compile an evaluator using the k closest neighbors per query.
    ///
    /// # Errors
    /// [`Error::InsufficientPoints`] when fewer than k points are given.
    ///
    /// # Panics
    /// `k` must be at least 1; an average over zero neighbors is
    /// undefined.
    pub fn new(points: Vec<SamplePoint<V>>, k: usize) -> Result<Self> {
        assert!(k > 0, "at least one neighbor is required");
        if points.len() < k {
            return Err(Error::InsufficientPoints {
                required: k,
                actual: points.len(),
            });
        }
        Ok(Self {
            tree: KdTree::build(points),
            k,
        })
    }

    pub fn k(&self) -> usize {
        self.k
    }

    /// A scratch heap sized for this evaluator's queries.
    pub fn scratch(&self) -> NeighborHeap {
        NeighborHeap::new(self.k)
    }

    /// Interpolate at (x, y) reusing the caller's scratch heap.
    ///
    /// A neighbor at exactly zero distance short-circuits: its value is
    /// returned verbatim. That is an exact-match shortcut, not an
    /// approximation, and it keeps 1/d² finite.
    pub fn evaluate_into(&self, x: f64, y: f64, heap: &mut NeighborHeap) -> V {
        self.tree.nearest_into(x, y, heap);

        let mut sum = V::zero();
        let mut weight_sum = 0.0;
        for (idx, distance_sq) in heap.filled() {
            let sample = self.tree.points()[idx].value;
            if distance_sq == 0.0 {
                return sample;
            }
            let weight = 1.0 / distance_sq;
            sum = sum.plus(sample.scaled(weight));
            weight_sum += weight;
        }
        sum.scaled(1.0 / weight_sum)
    }
}

impl<V: SampleValue> Interpolate for InverseDistanceWeighting<V> {
    type Value = V;

    fn interpolate(&self, x: f64, y: f64) -> V {
        let mut heap = self.scratch();
        self.evaluate_into(x, y, &mut heap)
    }
}
