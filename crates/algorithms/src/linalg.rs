//! Dense linear solver
//!
//! LU decomposition with partial pivoting and forward/backward
//! substitution, used to fit the thin-plate-spline system. Plain
//! double-precision Gaussian elimination: no iterative refinement, so
//! large or near-degenerate systems inherit the usual conditioning
//! sensitivity.
//!
//! Reference:
//! the JAMA package (NIST), LUDecomposition.

use ndarray::Array2;
use windfield_core::{Error, Result};

/// A dense row-major matrix of f64.
#[derive(Debug, Clone, PartialEq)]
pub struct Matrix {
    data: Array2<f64>,
}

impl Matrix {
    /// Create a rows x cols matrix filled with zeros.
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self {
            data: Array2::zeros((rows, cols)),
        }
    }

    /// Create a single-column matrix from a slice of values.
    pub fn column_vector(values: &[f64]) -> Self {
        let mut m = Self::zeros(values.len(), 1);
        for (i, &v) in values.iter().enumerate() {
            m[(i, 0)] = v;
        }
        m
    }

    pub fn rows(&self) -> usize {
        self.data.nrows()
    }

    pub fn cols(&self) -> usize {
        self.data.ncols()
    }

    /// Copy the elements of a single column out into a Vec.
    pub fn column(&self, col: usize) -> Vec<f64> {
        self.data.column(col).to_vec()
    }

    /// Swap rows i and j in place.
    fn swap_rows(&mut self, i: usize, j: usize) {
        if i != j {
            for col in 0..self.cols() {
                self.data.swap((i, col), (j, col));
            }
        }
    }

    /// Copy rows according to the pivot permutation: row i of the result
    /// is row pivots[i] of self.
    fn permuted(&self, pivots: &[usize]) -> Self {
        let mut out = Self::zeros(self.rows(), self.cols());
        for (i, &p) in pivots.iter().enumerate() {
            for j in 0..self.cols() {
                out[(i, j)] = self[(p, j)];
            }
        }
        out
    }
}

impl std::ops::Index<(usize, usize)> for Matrix {
    type Output = f64;

    fn index(&self, (row, col): (usize, usize)) -> &f64 {
        &self.data[[row, col]]
    }
}

impl std::ops::IndexMut<(usize, usize)> for Matrix {
    fn index_mut(&mut self, (row, col): (usize, usize)) -> &mut f64 {
        &mut self.data[[row, col]]
    }
}

/// Decompose `m` in place into its L/U factors, returning the row pivot
/// permutation.
///
/// Partial pivoting: at column k the row with the largest absolute value
/// at or below the diagonal becomes the pivot row. An exactly-zero pivot
/// skips elimination for that column; the zero stays on the diagonal and
/// is what [`is_singular`] detects afterwards. Singularity is not an
/// error at this level.
pub fn lu_decompose(m: &mut Matrix) -> Vec<usize> {
    let rows = m.rows();
    let cols = m.cols();
    let mut pivots: Vec<usize> = (0..rows).collect();

    for k in 0..cols {
        // Find pivot p.
        let mut p = k;
        for i in (k + 1)..rows {
            if m[(i, k)].abs() > m[(p, k)].abs() {
                p = i;
            }
        }

        // Exchange if necessary.
        if p != k {
            m.swap_rows(p, k);
            pivots.swap(p, k);
        }

        // Compute multipliers and eliminate the k-th column.
        if m[(k, k)] != 0.0 {
            for i in (k + 1)..rows {
                m[(i, k)] /= m[(k, k)];
                for j in (k + 1)..cols {
                    let delta = m[(i, k)] * m[(k, j)];
                    m[(i, j)] -= delta;
                }
            }
        }
    }

    pivots
}

/// Whether a decomposed matrix has an exactly-zero diagonal entry.
pub fn is_singular(m: &Matrix) -> bool {
    (0..m.rows().min(m.cols())).any(|i| m[(i, i)] == 0.0)
}

/// Solve `a · x = b` for x, consuming both matrices.
///
/// # Errors
/// - [`Error::DimensionMismatch`] if the row counts disagree
/// - [`Error::SingularMatrix`] if `a` has no unique inverse
pub fn solve(mut a: Matrix, b: Matrix) -> Result<Matrix> {
    if a.rows() != b.rows() {
        return Err(Error::DimensionMismatch {
            left: a.rows(),
            right: b.rows(),
        });
    }

    let pivots = lu_decompose(&mut a);
    if is_singular(&a) {
        return Err(Error::SingularMatrix);
    }

    let n = a.cols();
    let mut x = b.permuted(&pivots);

    // Solve L · y = P·b
    for k in 0..n {
        for i in (k + 1)..n {
            for j in 0..x.cols() {
                let delta = x[(k, j)] * a[(i, k)];
                x[(i, j)] -= delta;
            }
        }
    }

    // Solve U · x = y
    for k in (0..n).rev() {
        for j in 0..x.cols() {
            x[(k, j)] /= a[(k, k)];
        }
        for i in 0..k {
            for j in 0..x.cols() {
                let delta = x[(k, j)] * a[(i, k)];
                x[(i, j)] -= delta;
            }
        }
    }

    Ok(x)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn from_rows(rows: &[&[f64]]) -> Matrix {
        let mut m = Matrix::zeros(rows.len(), rows[0].len());
        for (i, row) in rows.iter().enumerate() {
            for (j, &v) in row.iter().enumerate() {
                m[(i, j)] = v;
            }
        }
        m
    }

    fn mat_vec(m: &Matrix, v: &[f64]) -> Vec<f64> {
        (0..m.rows())
            .map(|i| (0..m.cols()).map(|j| m[(i, j)] * v[j]).sum())
            .collect()
    }

    #[test]
    fn test_solve_identity() {
        let a = from_rows(&[&[1.0, 0.0], &[0.0, 1.0]]);
        let b = Matrix::column_vector(&[3.0, -7.0]);
        let x = solve(a, b).unwrap();
        assert!((x[(0, 0)] - 3.0).abs() < 1e-12);
        assert!((x[(1, 0)] + 7.0).abs() < 1e-12);
    }

    #[test]
    fn test_solve_requires_pivoting() {
        // Zero in the top-left corner forces a row exchange.
        let a = from_rows(&[&[0.0, 2.0], &[3.0, 1.0]]);
        let b = Matrix::column_vector(&[4.0, 5.0]);
        let x = solve(a, b).unwrap();
        // 2y = 4 -> y = 2; 3x + y = 5 -> x = 1
        assert!((x[(0, 0)] - 1.0).abs() < 1e-12);
        assert!((x[(1, 0)] - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_solve_round_trips() {
        // Random non-singular systems: verify A·x ≈ b.
        use rand::rngs::StdRng;
        use rand::{Rng, SeedableRng};

        for seed in 0..20u64 {
            let mut rng = StdRng::seed_from_u64(seed);
            let n = 3 + (seed as usize % 5);

            let mut a = Matrix::zeros(n, n);
            let mut b = vec![0.0; n];
            for i in 0..n {
                for j in 0..n {
                    a[(i, j)] = rng.random_range(-5.0..5.0);
                }
                // Diagonal dominance keeps the system well away from singular.
                a[(i, i)] += 20.0;
                b[i] = rng.random_range(-5.0..5.0);
            }

            let x = solve(a.clone(), Matrix::column_vector(&b)).unwrap();
            let xv = x.column(0);
            let bv = mat_vec(&a, &xv);
            for i in 0..n {
                assert!(
                    (bv[i] - b[i]).abs() < 1e-8,
                    "seed {seed}: residual {} at row {i}",
                    (bv[i] - b[i]).abs()
                );
            }
        }
    }

    #[test]
    fn test_singular_matrix_detected() {
        let a = from_rows(&[&[1.0, 2.0], &[2.0, 4.0]]);
        let b = Matrix::column_vector(&[1.0, 2.0]);
        assert_eq!(solve(a, b), Err(windfield_core::Error::SingularMatrix));
    }

    #[test]
    fn test_zero_column_is_singular() {
        let a = from_rows(&[&[1.0, 0.0, 2.0], &[3.0, 0.0, 4.0], &[5.0, 0.0, 6.0]]);
        let b = Matrix::column_vector(&[1.0, 1.0, 1.0]);
        assert_eq!(solve(a, b), Err(windfield_core::Error::SingularMatrix));
    }

    #[test]
    fn test_dimension_mismatch() {
        let a = Matrix::zeros(3, 3);
        let b = Matrix::column_vector(&[1.0, 2.0]);
        assert_eq!(
            solve(a, b),
            Err(windfield_core::Error::DimensionMismatch { left: 3, right: 2 })
        );
    }

    #[test]
    fn test_multiple_rhs_columns() {
        let a = from_rows(&[&[2.0, 0.0], &[0.0, 4.0]]);
        let mut b = Matrix::zeros(2, 2);
        b[(0, 0)] = 2.0;
        b[(1, 0)] = 4.0;
        b[(0, 1)] = 6.0;
        b[(1, 1)] = 8.0;
        let x = solve(a, b).unwrap();
        assert!((x[(0, 0)] - 1.0).abs() < 1e-12);
        assert!((x[(1, 0)] - 1.0).abs() < 1e-12);
        assert!((x[(0, 1)] - 3.0).abs() < 1e-12);
        assert!((x[(1, 1)] - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_lu_pivot_permutation() {
        let mut a = from_rows(&[&[0.0, 1.0], &[2.0, 0.0]]);
        let pivots = lu_decompose(&mut a);
        assert_eq!(pivots, vec![1, 0]);
        assert!(!is_singular(&a));
    }
}
