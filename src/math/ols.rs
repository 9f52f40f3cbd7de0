//! Least squares solver.
//!
//! The reference engine regresses the treated series on a small design matrix
//! (intercept plus control series, or intercept plus time trend):
//!
//! ```text
//! minimize Σ (y_i - x_i^T β)^2
//! ```
//!
//! Implementation choices:
//! - SVD handles the tall (more rows than columns) pre-period matrix and
//!   degrades gracefully when the control series is nearly constant.
//! - Two columns keep the decomposition cheap even for ten-day data.

use nalgebra::{DMatrix, DVector};

/// SVD solution of `x β ≈ y`.
///
/// `None` when no tolerance yields finite coefficients.
pub fn solve_least_squares(x: &DMatrix<f64>, y: &DVector<f64>) -> Option<DVector<f64>> {
    let svd = x.clone().svd(true, true);

    for tol in [1e-10, 1e-8, 1e-6] {
        if let Ok(beta) = svd.solve(y, tol) {
            if beta.iter().all(|v| v.is_finite()) {
                return Some(beta);
            }
        }
    }

    None
}

/// Fit `y ≈ X β` from row-major design rows.
///
/// Returns the coefficients and the sum of squared residuals.
pub fn fit_rows(rows: &[Vec<f64>], y: &[f64]) -> Option<(Vec<f64>, f64)> {
    let n = rows.len();
    let p = rows.first()?.len();
    if n == 0 || p == 0 || y.len() != n || rows.iter().any(|r| r.len() != p) {
        return None;
    }

    let flat: Vec<f64> = rows.iter().flatten().copied().collect();
    let x = DMatrix::from_row_slice(n, p, &flat);
    let yv = DVector::from_column_slice(y);
    let beta = solve_least_squares(&x, &yv)?;

    let sse = (&x * &beta - &yv).iter().map(|r| r * r).sum();
    Some((beta.iter().copied().collect(), sse))
}

/// Dot product of a design row with coefficients.
pub fn predict_row(row: &[f64], beta: &[f64]) -> f64 {
    row.iter().zip(beta).map(|(x, b)| x * b).sum()
}
