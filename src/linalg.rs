//! Dense linear solves used by the Levenberg-Marquardt step.
//!
//! Three strategies are provided, from cheapest to most general:
//!
//! - [`small_inverse`]: closed-form inverse of a 1x1 or 2x2 matrix with a
//!   positive determinant. Tiny systems never reach the decomposition backend.
//! - [`solve_symmetric`]: LLᵀ (Cholesky) factorization of a symmetric positive
//!   definite matrix. Refuses matrices that are not positive definite or whose
//!   factor shows extreme ill-conditioning, so the caller can fall back.
//! - [`solve`]: minimum-norm solve through a thin SVD. Singular values at or
//!   below `eps` are treated as zero, which handles rank-deficient systems.
//!
//! Every call builds its own factorization, so independent solves can run on
//! separate threads.

use faer::linalg::solvers::Solve;
use faer::Side;
use ndarray::{Array1, Array2};

use crate::error::{LmError, Result};
use crate::utils::matrix_convert::{
    faer_column_to_ndarray, faer_to_ndarray, ndarray_to_faer, ndarray_vec_to_faer_rhs,
};

/// Default threshold below which singular values are discarded by [`solve`].
pub const DEFAULT_SVD_EPSILON: f64 = 1e-8;

/// Determinant of a matrix with at most two rows.
///
/// Returns `None` for non-square or larger matrices. The determinant of the
/// empty matrix is 1.
pub fn determinant(a: &Array2<f64>) -> Option<f64> {
    if a.nrows() != a.ncols() {
        return None;
    }
    match a.nrows() {
        0 => Some(1.0),
        1 => Some(a[[0, 0]]),
        2 => Some(a[[0, 0]] * a[[1, 1]] - a[[0, 1]] * a[[1, 0]]),
        _ => None,
    }
}

/// Closed-form inverse of a 1x1 or 2x2 matrix.
///
/// Only matrices with a strictly positive determinant are inverted; anything
/// else returns `None` and should go through the decomposition path.
pub fn small_inverse(a: &Array2<f64>) -> Option<Array2<f64>> {
    let det = determinant(a)?;
    if !(det > 0.0) {
        return None;
    }

    let inv = match a.nrows() {
        0 => Array2::zeros((0, 0)),
        1 => Array2::from_elem((1, 1), 1.0 / det),
        _ => {
            let mut inv = Array2::zeros((2, 2));
            inv[[0, 0]] = a[[1, 1]] / det;
            inv[[0, 1]] = -a[[0, 1]] / det;
            inv[[1, 0]] = -a[[1, 0]] / det;
            inv[[1, 1]] = a[[0, 0]] / det;
            inv
        }
    };
    Some(inv)
}

/// Solve `A x = b` for a symmetric positive definite `A`.
///
/// # Errors
///
/// * `LmError::DimensionMismatch` if `A` is not square or `b` has the wrong length
/// * `LmError::SingularMatrix` if the factorization fails, the Cholesky factor
///   is too badly conditioned, or the solution is not finite
pub fn solve_symmetric(a: &Array2<f64>, b: &Array1<f64>) -> Result<Array1<f64>> {
    check_square_system(a, b)?;
    let n = a.nrows();
    if n == 0 {
        return Ok(Array1::zeros(0));
    }

    let a_faer = ndarray_to_faer(a);
    let llt = a_faer
        .llt(Side::Lower)
        .map_err(|_| LmError::SingularMatrix)?;

    // cond(A) ~ (max L_ii / min L_ii)^2
    let l = llt.L();
    let mut min_diag = f64::INFINITY;
    let mut max_diag = 0.0_f64;
    for i in 0..n {
        let d = l[(i, i)].abs();
        min_diag = min_diag.min(d);
        max_diag = max_diag.max(d);
    }
    let inverse_condition = (min_diag / max_diag).powi(2);
    if !(inverse_condition >= f64::EPSILON) {
        log::trace!(
            "solve_symmetric: refusing factor with inverse condition estimate {:e}",
            inverse_condition
        );
        return Err(LmError::SingularMatrix);
    }

    let mut rhs = ndarray_vec_to_faer_rhs(b);
    llt.solve_in_place(rhs.as_mut());
    let x = faer_column_to_ndarray(rhs.as_ref());

    if x.iter().any(|v| !v.is_finite()) {
        return Err(LmError::SingularMatrix);
    }
    Ok(x)
}

/// Minimum-norm solve of `A x = b` through a thin singular value decomposition.
///
/// `A` may be rectangular (m x n, with `b` of length m). Singular values less
/// than or equal to `eps` are zeroed in the pseudo-inverse.
///
/// # Errors
///
/// * `LmError::DimensionMismatch` if `b` does not have one entry per row of `A`
/// * `LmError::LinearAlgebraError` if the decomposition cannot be computed
pub fn solve(a: &Array2<f64>, b: &Array1<f64>, eps: f64) -> Result<Array1<f64>> {
    if a.nrows() != b.len() {
        return Err(LmError::DimensionMismatch(format!(
            "Right-hand side has length {}, expected {}",
            b.len(),
            a.nrows()
        )));
    }
    if a.is_empty() {
        return Ok(Array1::zeros(a.ncols()));
    }

    let a_faer = ndarray_to_faer(a);
    let svd = a_faer
        .thin_svd()
        .map_err(|e| LmError::LinearAlgebraError(format!("SVD failed: {:?}", e)))?;

    let u = faer_to_ndarray(svd.U());
    let v = faer_to_ndarray(svd.V());
    let singular_values = svd.S().column_vector();

    // x = V * S^+ * U^T * b
    let mut projected = u.t().dot(b);
    for (i, p) in projected.iter_mut().enumerate() {
        let s = singular_values[i];
        if s > eps {
            *p /= s;
        } else {
            *p = 0.0;
        }
    }
    let x = v.dot(&projected);

    if x.iter().any(|v| !v.is_finite()) {
        return Err(LmError::LinearAlgebraError(
            "Minimum-norm solution is not finite".to_string(),
        ));
    }
    Ok(x)
}

fn check_square_system(a: &Array2<f64>, b: &Array1<f64>) -> Result<()> {
    if a.nrows() != a.ncols() {
        return Err(LmError::DimensionMismatch(format!(
            "Expected a square matrix, got {}x{}",
            a.nrows(),
            a.ncols()
        )));
    }
    if a.nrows() != b.len() {
        return Err(LmError::DimensionMismatch(format!(
            "Right-hand side has length {}, expected {}",
            b.len(),
            a.nrows()
        )));
    }
    Ok(())
}
