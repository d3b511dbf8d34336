//! Levenberg-Marquardt driver for compile-time sized problems.
//!
//! Same control flow, constants and stopping rules as
//! [`LevenbergMarquardt::solve`](super::LevenbergMarquardt::solve), on
//! nalgebra static vectors. The damped system stays on the stack for the
//! closed-form and Cholesky solves; only the minimum-norm fallback goes
//! through [`linalg::solve`]. This variant emits no log records.

use nalgebra::{SMatrix, SVector};

use crate::error::Result;
use crate::linalg;
use crate::model::FixedLeastSquaresModel;
use crate::utils::matrix_convert::{
    nalgebra_to_ndarray, nalgebra_vec_to_ndarray, ndarray_vec_to_nalgebra,
};

use super::algorithm::LevenbergMarquardt;
use super::config::{
    LmConfig, INITIAL_LAMBDA, LAMBDA_FACTOR, MAX_INNER_ITERATIONS, MEASUREMENT_WEIGHT,
};
use super::convergence::LmStatus;
use super::report::{IterationRecord, LmResult};
use super::step::SolveStrategy;

/// Fit a fixed-size `model` to `observation` starting from `seed`.
///
/// # Errors
///
/// - [`LmError::InvalidInput`](crate::LmError::InvalidInput) if the configuration is invalid
/// - any error raised by the model
/// - [`LmError::LinearAlgebraError`](crate::LmError::LinearAlgebraError) if no
///   linear solver could produce a step
///
/// # Example
///
/// ```
/// use lmfit_core::lm::{levenberg_marquardt_fixed, LmConfig};
/// use lmfit_core::{FixedLeastSquaresModel, Result};
/// use nalgebra::{Vector1, Vector2};
///
/// struct Square;
///
/// impl FixedLeastSquaresModel<1, 2> for Square {
///     fn evaluate(&self, x: &Vector1<f64>) -> Result<Vector2<f64>> {
///         Ok(Vector2::new(x[0] * x[0], x[0]))
///     }
/// }
///
/// let config = LmConfig::default();
/// let result =
///     levenberg_marquardt_fixed(&Square, Vector1::new(1.0), &Vector2::new(4.0, 2.0), &config)
///         .unwrap();
/// assert!((result.params[0] - 2.0).abs() < 1e-6);
/// ```
pub fn levenberg_marquardt_fixed<M, const NI: usize, const NO: usize>(
    model: &M,
    seed: SVector<f64, NI>,
    observation: &SVector<f64, NO>,
    config: &LmConfig,
) -> Result<LmResult<SVector<f64, NI>>>
where
    M: FixedLeastSquaresModel<NI, NO> + ?Sized,
{
    config.validate()?;

    let mut x = seed;
    let mut lambda = INITIAL_LAMBDA;
    let mut status = LmStatus::NotConverged;
    let mut history = Vec::new();

    let h = model.evaluate(&x)?;
    let mut func_evals = 1;
    let mut norm_start = model.difference(observation, &h).norm();

    let mut done = config.max_iterations == 0;
    if norm_start < config.abs_tolerance {
        status = LmStatus::ConvergedAbsTolerance;
        done = true;
    }

    let mut iteration = 0;
    while !done {
        iteration += 1;

        let h = model.evaluate(&x)?;
        func_evals += 1;
        let error = model.difference(observation, &h);
        norm_start = error.norm();
        let iteration_norm = norm_start;

        let jacobian: SMatrix<f64, NO, NI> = model.jacobian(&x)?;
        let jt = jacobian.transpose();
        let rhs: SVector<f64, NI> = -(jt * error) * MEASUREMENT_WEIGHT;
        let hessian: SMatrix<f64, NI, NI> = (jt * jacobian) * MEASUREMENT_WEIGHT;

        let mut attempts = 0;
        let mut short_circuited = false;
        let (x_try, norm_try, strategy) = loop {
            let hessian_lm = damped_hessian(&hessian, lambda);
            let (step, strategy) = solve_step(&hessian_lm, &rhs)?;
            let x_try = x - step;

            let h_try = model.evaluate(&x_try)?;
            func_evals += 1;
            let norm_try = model.difference(observation, &h_try).norm();
            attempts += 1;

            if norm_try > norm_start {
                lambda *= LAMBDA_FACTOR;
                if attempts >= MAX_INNER_ITERATIONS {
                    short_circuited = true;
                    break (x_try, norm_start, strategy);
                }
            } else {
                break (x_try, norm_try, strategy);
            }
        };

        if !short_circuited && (norm_start - norm_try) / norm_start < config.rel_tolerance {
            status = LmStatus::ConvergedRelTolerance;
            done = true;
        }
        if norm_try < config.abs_tolerance {
            status = LmStatus::ConvergedAbsTolerance;
            done = true;
        }
        if iteration >= config.max_iterations {
            done = true;
        }

        if !short_circuited {
            x = x_try;
        }
        norm_start = norm_try;
        lambda /= LAMBDA_FACTOR;

        history.push(IterationRecord {
            iteration,
            norm_start: iteration_norm,
            norm_try,
            lambda,
            inner_attempts: attempts,
            short_circuited,
            strategy,
        });
    }

    Ok(LmResult {
        status,
        params: x,
        norm: norm_start,
        iterations: iteration,
        func_evals,
        lambda,
        history,
    })
}

/// Damp the diagonal: `H_lm[i][i] = H[i][i] + H[i][i] * lambda + lambda`.
fn damped_hessian<const N: usize>(
    hessian: &SMatrix<f64, N, N>,
    lambda: f64,
) -> SMatrix<f64, N, N> {
    let mut damped = *hessian;
    for i in 0..N {
        let d = damped[(i, i)];
        damped[(i, i)] += d * lambda + lambda;
    }
    damped
}

/// Closed-form inverse for at most 2x2 systems with a positive determinant.
fn small_inverse<const N: usize>(a: &SMatrix<f64, N, N>) -> Option<SMatrix<f64, N, N>> {
    let det = match N {
        0 => 1.0,
        1 => a[(0, 0)],
        2 => a[(0, 0)] * a[(1, 1)] - a[(0, 1)] * a[(1, 0)],
        _ => return None,
    };
    if !(det > 0.0) {
        return None;
    }

    let mut inv = SMatrix::<f64, N, N>::zeros();
    match N {
        1 => inv[(0, 0)] = 1.0 / det,
        2 => {
            inv[(0, 0)] = a[(1, 1)] / det;
            inv[(0, 1)] = -a[(0, 1)] / det;
            inv[(1, 0)] = -a[(1, 0)] / det;
            inv[(1, 1)] = a[(0, 0)] / det;
        }
        _ => {}
    }
    Some(inv)
}

/// Solve `hessian_lm * step = rhs` with the same three-tier fallback as
/// [`LmStep::solve`](super::step::LmStep::solve).
fn solve_step<const N: usize>(
    hessian_lm: &SMatrix<f64, N, N>,
    rhs: &SVector<f64, N>,
) -> Result<(SVector<f64, N>, SolveStrategy)> {
    if let Some(inverse) = small_inverse(hessian_lm) {
        return Ok((inverse * rhs, SolveStrategy::Direct));
    }

    if let Some(cholesky) = (*hessian_lm).cholesky() {
        let l = cholesky.l_dirty();
        let mut min_diag = f64::INFINITY;
        let mut max_diag = 0.0_f64;
        for i in 0..N {
            let d = l[(i, i)].abs();
            min_diag = min_diag.min(d);
            max_diag = max_diag.max(d);
        }
        if (min_diag / max_diag).powi(2) >= f64::EPSILON {
            let step = cholesky.solve(rhs);
            if step.iter().all(|v| v.is_finite()) {
                return Ok((step, SolveStrategy::Symmetric));
            }
        }
    }

    let step = linalg::solve(
        &nalgebra_to_ndarray(hessian_lm),
        &nalgebra_vec_to_ndarray(rhs),
        linalg::DEFAULT_SVD_EPSILON,
    )?;
    Ok((ndarray_vec_to_nalgebra::<N>(&step)?, SolveStrategy::MinimumNorm))
}

impl LevenbergMarquardt {
    /// Fit a fixed-size model with this optimizer's configuration.
    ///
    /// See [`levenberg_marquardt_fixed`].
    pub fn solve_fixed<M, const NI: usize, const NO: usize>(
        &self,
        model: &M,
        seed: SVector<f64, NI>,
        observation: &SVector<f64, NO>,
    ) -> Result<LmResult<SVector<f64, NI>>>
    where
        M: FixedLeastSquaresModel<NI, NO> + ?Sized,
    {
        levenberg_marquardt_fixed(model, seed, observation, self.config())
    }
}
