//! 2D k-d tree for spatial indexing
//!
//! Backs the k-nearest-neighbor searches of the IDW interpolator. The
//! tree is built once per point set and read-only afterwards; query
//! scratch state lives in an explicit [`NeighborHeap`] owned by the
//! caller, so one tree can serve concurrent read-only queries.
//!
//! Reference:
//! Bentley, J.L. (1975). Multidimensional binary search trees used
//! for associative searching. CACM, 18(9).

use super::{SamplePoint, SampleValue};

const DIMS: u8 = 2;

/// A balanced k-d tree over 2D sample points.
#[derive(Debug)]
pub struct KdTree<V = f64> {
    nodes: Vec<KdNode>,
    points: Vec<SamplePoint<V>>,
    root: Option<usize>,
}

#[derive(Debug)]
struct KdNode {
    /// Index into `points`
    point_idx: usize,
    /// Split axis: 0 = x, 1 = y, cycling with depth
    axis: u8,
    left: Option<usize>,
    right: Option<usize>,
}

/// One result of a k-nearest-neighbor query.
#[derive(Debug, Clone, Copy)]
pub struct Neighbor<V = f64> {
    pub point: SamplePoint<V>,
    pub distance_sq: f64,
    pub index: usize,
}

/// Fixed-size bounded max-heap used as per-query scratch space.
///
/// The worst (most distant) neighbor found so far sits at the root, so a
/// candidate only needs one comparison to be rejected. Reset between
/// queries; never stored inside the tree.
#[derive(Debug)]
pub struct NeighborHeap {
    slots: Vec<Slot>,
}

#[derive(Debug, Clone, Copy)]
struct Slot {
    point_idx: Option<usize>,
    distance_sq: f64,
}

impl NeighborHeap {
    const EMPTY: Slot = Slot {
        point_idx: None,
        distance_sq: f64::INFINITY,
    };

    /// Scratch space for queries of k neighbors.
    pub fn new(k: usize) -> Self {
        Self {
            slots: vec![Self::EMPTY; k],
        }
    }

    pub fn k(&self) -> usize {
        self.slots.len()
    }

    /// Prepare for a fresh query.
    fn reset(&mut self) {
        self.slots.fill(Self::EMPTY);
    }

    /// Squared distance of the worst neighbor currently held. A zero
    /// capacity heap accepts no candidate at all.
    #[inline]
    fn worst(&self) -> f64 {
        self.slots
            .first()
            .map_or(f64::NEG_INFINITY, |s| s.distance_sq)
    }

    /// Replace the worst neighbor and push the new key down from the top
    /// until the max-heap property holds again.
    fn replace_worst(&mut self, point_idx: usize, distance_sq: f64) {
        let key = Slot {
            point_idx: Some(point_idx),
            distance_sq,
        };
        let len = self.slots.len();
        let mut i = 0;
        loop {
            let mut child = i * 2 + 1;
            if child >= len {
                break;
            }
            let right = child + 1;
            if right < len && self.slots[right].distance_sq > self.slots[child].distance_sq {
                child = right;
            }
            if key.distance_sq >= self.slots[child].distance_sq {
                break;
            }
            self.slots[i] = self.slots[child];
            i = child;
        }
        self.slots[i] = key;
    }

    /// Filled slots as (point index, squared distance), in no defined order.
    pub(crate) fn filled(&self) -> impl Iterator<Item = (usize, f64)> + '_ {
        self.slots
            .iter()
            .filter_map(|s| s.point_idx.map(|i| (i, s.distance_sq)))
    }
}

impl<V: SampleValue> KdTree<V> {
    /// Build a k-d tree, taking ownership of the points.
    ///
    /// Each level sorts its slice by the current axis and pivots on the
    /// median, then scans backwards over equal axis values so the chosen
    /// node is the first of a run of ties. The left subtree is strictly
    /// smaller on the axis; ties go right. Repeated sorting makes the
    /// build O(n log n) expected rather than guaranteed, which is fine at
    /// station-count scale.
    pub fn build(points: Vec<SamplePoint<V>>) -> Self {
        let mut tree = Self {
            nodes: Vec::with_capacity(points.len()),
            points,
            root: None,
        };
        if !tree.points.is_empty() {
            let mut indices: Vec<usize> = (0..tree.points.len()).collect();
            tree.root = Some(tree.build_recursive(&mut indices, 0));
        }
        tree
    }

    fn build_recursive(&mut self, indices: &mut [usize], depth: usize) -> usize {
        let axis = (depth % DIMS as usize) as u8;
        indices.sort_by(|&a, &b| {
            self.points[a]
                .coord(axis)
                .partial_cmp(&self.points[b].coord(axis))
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        // Pivot on the median, then take the first of any run of points
        // sharing the median's axis value. Keeps repeated coordinates from
        // piling into one subtree forever.
        let mut median = indices.len() / 2;
        let pivot_coord = self.points[indices[median]].coord(axis);
        while median > 0 && self.points[indices[median - 1]].coord(axis) == pivot_coord {
            median -= 1;
        }

        let node_idx = self.nodes.len();
        self.nodes.push(KdNode {
            point_idx: indices[median],
            axis,
            left: None,
            right: None,
        });

        if median > 0 {
            let mut left_indices = indices[..median].to_vec();
            let left = self.build_recursive(&mut left_indices, depth + 1);
            self.nodes[node_idx].left = Some(left);
        }
        if median + 1 < indices.len() {
            let mut right_indices = indices[median + 1..].to_vec();
            let right = self.build_recursive(&mut right_indices, depth + 1);
            self.nodes[node_idx].right = Some(right);
        }

        node_idx
    }

    /// Number of points in the tree.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// The point set in build order.
    pub fn points(&self) -> &[SamplePoint<V>] {
        &self.points
    }

    /// Find the `heap.k()` points nearest to (x, y), filling the caller's
    /// scratch heap.
    ///
    /// Slots stay empty only when the tree holds fewer than k points;
    /// callers wanting exactly k results must check `len() >= k` first.
    /// Result order within the heap is unspecified, as is the ordering of
    /// equidistant neighbors.
    pub fn nearest_into(&self, x: f64, y: f64, heap: &mut NeighborHeap) {
        heap.reset();
        if let Some(root) = self.root {
            self.search(root, x, y, heap);
        }
    }

    /// Find the k nearest points to (x, y), sorted by ascending distance.
    pub fn k_nearest(&self, x: f64, y: f64, k: usize) -> Vec<Neighbor<V>> {
        if k == 0 {
            return Vec::new();
        }
        let mut heap = NeighborHeap::new(k);
        self.nearest_into(x, y, &mut heap);

        let mut results: Vec<Neighbor<V>> = heap
            .filled()
            .map(|(index, distance_sq)| Neighbor {
                point: self.points[index],
                distance_sq,
                index,
            })
            .collect();
        results.sort_by(|a, b| {
            a.distance_sq
                .partial_cmp(&b.distance_sq)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        results
    }

    fn search(&self, node_idx: usize, x: f64, y: f64, heap: &mut NeighborHeap) {
        let node = &self.nodes[node_idx];
        let point = &self.points[node.point_idx];

        // Signed distance from the query to this node's splitting plane.
        let plane_distance = point.coord(node.axis) - if node.axis == 0 { x } else { y };

        let (containing, other) = if plane_distance <= 0.0 {
            (node.right, node.left)
        } else {
            (node.left, node.right)
        };

        // Descend into the half containing the query first.
        if let Some(child) = containing {
            self.search(child, x, y, heap);
        }

        // Compare this node's own point against the worst neighbor held.
        let d2 = point.dist_sq(x, y);
        if d2 < heap.worst() {
            heap.replace_worst(node.point_idx, d2);
        }

        // The far half can only matter if the splitting plane is closer
        // than the worst neighbor.
        if let Some(child) = other {
            if plane_distance * plane_distance < heap.worst() {
                self.search(child, x, y, heap);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn sample_points() -> Vec<SamplePoint> {
        vec![
            SamplePoint::new(2.0, 3.0, 10.0),
            SamplePoint::new(5.0, 4.0, 20.0),
            SamplePoint::new(9.0, 6.0, 30.0),
            SamplePoint::new(4.0, 7.0, 40.0),
            SamplePoint::new(8.0, 1.0, 50.0),
            SamplePoint::new(7.0, 2.0, 60.0),
            SamplePoint::new(1.0, 8.0, 70.0),
            SamplePoint::new(6.0, 5.0, 80.0),
        ]
    }

    fn brute_force_knn(points: &[SamplePoint], x: f64, y: f64, k: usize) -> Vec<f64> {
        let mut dists: Vec<f64> = points.iter().map(|p| p.dist_sq(x, y)).collect();
        dists.sort_by(|a, b| a.partial_cmp(b).unwrap());
        dists.truncate(k);
        dists
    }

    #[test]
    fn test_build_and_size() {
        let tree = KdTree::build(sample_points());
        assert_eq!(tree.len(), 8);
        assert!(!tree.is_empty());
    }

    #[test]
    fn test_empty_tree() {
        let tree: KdTree = KdTree::build(Vec::new());
        assert!(tree.is_empty());
        assert!(tree.k_nearest(0.0, 0.0, 3).is_empty());
    }

    #[test]
    fn test_nearest_exact_hit() {
        let tree = KdTree::build(sample_points());
        let results = tree.k_nearest(5.0, 4.0, 1);
        assert_eq!(results.len(), 1);
        assert!(results[0].distance_sq < 1e-12);
        assert!((results[0].point.value - 20.0).abs() < 1e-12);
    }

    #[test]
    fn test_k_nearest_sorted_and_correct() {
        let pts = sample_points();
        let tree = KdTree::build(pts.clone());
        let results = tree.k_nearest(5.0, 5.0, 3);
        assert_eq!(results.len(), 3);
        for w in results.windows(2) {
            assert!(w[0].distance_sq <= w[1].distance_sq);
        }

        let expected = brute_force_knn(&pts, 5.0, 5.0, 3);
        for (r, e) in results.iter().zip(expected) {
            assert!((r.distance_sq - e).abs() < 1e-12);
        }
    }

    #[test]
    fn test_k_larger_than_point_count() {
        let tree = KdTree::build(sample_points());
        let results = tree.k_nearest(5.0, 5.0, 100);
        assert_eq!(results.len(), 8);
    }

    #[test]
    fn test_matches_brute_force_randomized() {
        // Randomized point sets of increasing size, repeated query points.
        for (seed, n) in [(1u64, 10usize), (2, 100), (3, 500), (4, 1000)] {
            let mut rng = StdRng::seed_from_u64(seed);
            let pts: Vec<SamplePoint> = (0..n)
                .map(|i| {
                    SamplePoint::new(
                        rng.random_range(0.0..100.0),
                        rng.random_range(0.0..100.0),
                        i as f64,
                    )
                })
                .collect();
            let tree = KdTree::build(pts.clone());

            for _ in 0..25 {
                let qx = rng.random_range(-10.0..110.0);
                let qy = rng.random_range(-10.0..110.0);
                let k = 5.min(n);
                let got = tree.k_nearest(qx, qy, k);
                let expected = brute_force_knn(&pts, qx, qy, k);
                assert_eq!(got.len(), k);
                for (g, e) in got.iter().zip(expected) {
                    assert!(
                        (g.distance_sq - e).abs() < 1e-9,
                        "n={n} query=({qx:.2},{qy:.2}): {} vs {e}",
                        g.distance_sq
                    );
                }
            }
        }
    }

    #[test]
    fn test_duplicate_coordinates_terminate() {
        // Many points sharing axis values: the backward tie scan must not
        // recurse unboundedly and queries stay correct.
        let mut pts = Vec::new();
        for i in 0..50 {
            pts.push(SamplePoint::new(5.0, (i % 10) as f64, i as f64));
        }
        let tree = KdTree::build(pts.clone());
        assert_eq!(tree.len(), 50);

        let got = tree.k_nearest(5.0, 3.0, 7);
        let expected = brute_force_knn(&pts, 5.0, 3.0, 7);
        for (g, e) in got.iter().zip(expected) {
            assert!((g.distance_sq - e).abs() < 1e-12);
        }
    }

    #[test]
    fn test_collinear_points() {
        let pts: Vec<SamplePoint> = (0..10)
            .map(|i| SamplePoint::new(i as f64, 0.0, i as f64))
            .collect();
        let tree = KdTree::build(pts);
        let results = tree.k_nearest(4.5, 0.0, 3);
        assert_eq!(results.len(), 3);
        assert!(results[0].distance_sq <= 0.25 + 1e-12);
    }

    #[test]
    fn test_zero_capacity_heap_finds_nothing() {
        let tree = KdTree::build(sample_points());
        let mut heap = NeighborHeap::new(0);
        tree.nearest_into(5.0, 5.0, &mut heap);
        assert_eq!(heap.filled().count(), 0);
        assert!(tree.k_nearest(5.0, 5.0, 0).is_empty());
    }

    #[test]
    fn test_scratch_heap_reuse() {
        let tree = KdTree::build(sample_points());
        let mut heap = NeighborHeap::new(2);

        tree.nearest_into(2.0, 3.0, &mut heap);
        let first: Vec<usize> = heap.filled().map(|(i, _)| i).collect();
        assert_eq!(first.len(), 2);

        tree.nearest_into(9.0, 6.0, &mut heap);
        let mut best: Vec<(usize, f64)> = heap.filled().collect();
        best.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap());
        assert!(best[0].1 < 1e-12);
        assert!((tree.points()[best[0].0].value - 30.0).abs() < 1e-12);
    }
}
