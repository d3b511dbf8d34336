//! Step calculation for the Levenberg-Marquardt algorithm.
//!
//! The step solves `H_lm * delta = rhs` where `H_lm` is the Gauss-Newton
//! Hessian with a damped diagonal. The solve tries, in order:
//!
//! 1. the closed-form inverse, for systems of at most 2x2 with a positive
//!    determinant;
//! 2. a Cholesky solve, which `H_lm` normally admits since it is symmetric
//!    positive definite by construction;
//! 3. a minimum-norm SVD solve, when a tiny lambda leaves `H_lm` numerically
//!    singular.
//!
//! Only a failure of the last strategy is reported to the caller.

use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::linalg;

/// Linear solve strategy that produced a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SolveStrategy {
    /// Closed-form inverse of a 1x1 or 2x2 system.
    Direct,

    /// Cholesky factorization of the symmetric positive definite system.
    Symmetric,

    /// Minimum-norm solve through the singular value decomposition.
    MinimumNorm,
}

/// Result of a Levenberg-Marquardt step calculation.
#[derive(Debug, Clone)]
pub struct StepResult {
    /// The calculated step vector
    pub step: Array1<f64>,

    /// The strategy that solved the damped system
    pub strategy: SolveStrategy,
}

/// Handles step calculation for the Levenberg-Marquardt algorithm.
pub struct LmStep;

impl LmStep {
    /// Gauss-Newton quantities `(g, H) = (w * J^T e, w * J^T J)` for weight `w`.
    pub fn normal_equations(
        jacobian: &Array2<f64>,
        residuals: &Array1<f64>,
        weight: f64,
    ) -> (Array1<f64>, Array2<f64>) {
        let jt = jacobian.t();
        let gradient = jt.dot(residuals) * weight;
        let hessian = jt.dot(jacobian) * weight;
        (gradient, hessian)
    }

    /// Damp the diagonal: `H_lm[i][i] = H[i][i] + H[i][i] * lambda + lambda`.
    pub fn damped_hessian(hessian: &Array2<f64>, lambda: f64) -> Array2<f64> {
        let mut damped = hessian.clone();
        for i in 0..damped.nrows() {
            let d = damped[[i, i]];
            damped[[i, i]] += d * lambda + lambda;
        }
        damped
    }

    /// Solve `hessian_lm * step = rhs` with the three-tier fallback.
    ///
    /// # Errors
    ///
    /// Returns the error of the minimum-norm solve when the Cholesky path
    /// refused the system and the SVD could not be computed either, or any
    /// dimension mismatch.
    pub fn solve(hessian_lm: &Array2<f64>, rhs: &Array1<f64>) -> Result<StepResult> {
        if hessian_lm.nrows() <= 2 {
            if let Some(inverse) = linalg::small_inverse(hessian_lm) {
                return Ok(StepResult {
                    step: inverse.dot(rhs),
                    strategy: SolveStrategy::Direct,
                });
            }
        }

        match linalg::solve_symmetric(hessian_lm, rhs) {
            Ok(step) => Ok(StepResult {
                step,
                strategy: SolveStrategy::Symmetric,
            }),
            Err(err) if err.is_recoverable() => {
                // Tiny lambda makes the damped Hessian numerically singular.
                log::debug!("LM: symmetric solve failed ({}), using minimum-norm solve", err);
                let step = linalg::solve(hessian_lm, rhs, linalg::DEFAULT_SVD_EPSILON)?;
                Ok(StepResult {
                    step,
                    strategy: SolveStrategy::MinimumNorm,
                })
            }
            Err(err) => Err(err),
        }
    }
}
