//! Thin Plate Spline (TPS) interpolation
//!
//! Fits a smooth surface through scalar control points by solving the
//! (n+3)x(n+3) system L·X = B, where L holds the pairwise radial basis
//! responses plus an affine block and B the control values. The rigidity
//! parameter relaxes exact interpolation: 0 passes through every control
//! point, larger values trade that for smoothness.
//!
//! Reference:
//! Elonen, J. (2003-2005). TPSDemo. <http://elonen.iki.fi/code/tpsdemo>
//! Duchon, J. (1976). Interpolation des fonctions de deux variables
//! suivant le principe de la flexion des plaques minces.

use windfield_core::{Error, Result};

use crate::linalg::{self, Matrix};

use super::{Interpolate, SamplePoint};

/// TPS radial basis kernel for 2D: U(r) = r² · ln(r), with U(0) = 0.
#[inline]
fn kernel(r: f64) -> f64 {
    if r == 0.0 {
        0.0
    } else {
        r * r * r.ln()
    }
}

/// A compiled thin-plate-spline evaluator over a fixed point set.
///
/// Owns the control points and solved weight vector for its whole
/// lifetime; evaluation is O(n) per query.
#[derive(Debug)]
pub struct ThinPlateSpline {
    points: Vec<SamplePoint>,
    weights: Vec<f64>,
    a1: f64,
    a2: f64,
    a3: f64,
}

impl ThinPlateSpline {
    /// Fit a spline to the control points.
    ///
    /// # Errors
    /// - [`Error::InsufficientPoints`] for fewer than 3 points
    /// - [`Error::SingularMatrix`] when the system has no unique solution
    ///   (for example collinear control points)
    pub fn new(points: Vec<SamplePoint>, rigidity: f64) -> Result<Self> {
        let n = points.len();
        if n < 3 {
            return Err(Error::InsufficientPoints {
                required: 3,
                actual: n,
            });
        }

        let l = build_l(&points, rigidity);
        let b = build_b(&points);
        let x = linalg::solve(l, b)?;

        let solution = x.column(0);
        Ok(Self {
            a1: solution[n],
            a2: solution[n + 1],
            a3: solution[n + 2],
            weights: solution[..n].to_vec(),
            points,
        })
    }

    pub fn control_points(&self) -> &[SamplePoint] {
        &self.points
    }
}

impl Interpolate for ThinPlateSpline {
    type Value = f64;

    fn interpolate(&self, x: f64, y: f64) -> f64 {
        let mut z = self.a1 + self.a2 * x + self.a3 * y;
        for (point, &weight) in self.points.iter().zip(&self.weights) {
            z += weight * kernel(point.dist(x, y));
        }
        z
    }
}

/// Build the symmetric (n+3)x(n+3) system matrix: kernel responses in the
/// top-left block, the affine columns (1, x, y) appended, and the rigidity
/// term `rigidity · mean_pairwise_distance²` on the diagonal.
fn build_l(points: &[SamplePoint], rigidity: f64) -> Matrix {
    let n = points.len();
    let mut l = Matrix::zeros(n + 3, n + 3);
    let mut mean_dist = 0.0;

    for i in 0..n {
        let (x, y) = (points[i].x, points[i].y);
        for (j, other) in points.iter().enumerate().skip(i + 1) {
            let d = other.dist(x, y);
            l[(i, j)] = kernel(d);
            mean_dist += d * 2.0;
        }
        l[(i, n)] = 1.0;
        l[(i, n + 1)] = x;
        l[(i, n + 2)] = y;
    }

    mean_dist /= (n * n) as f64;
    for k in 0..n {
        l[(k, k)] = rigidity * mean_dist * mean_dist;
    }

    // L is diagonally symmetric: copy the computed upper triangle down.
    for i in 0..n + 3 {
        for j in i + 1..n + 3 {
            l[(j, i)] = l[(i, j)];
        }
    }
    l
}

/// The control values as an (n+3)x1 column, affine rows zero.
fn build_b(points: &[SamplePoint]) -> Matrix {
    let mut b = Matrix::zeros(points.len() + 3, 1);
    for (i, point) in points.iter().enumerate() {
        b[(i, 0)] = point.value;
    }
    b
}
