//! Finite difference methods for numerical differentiation.
//!
//! This module computes model Jacobians with one-sided (forward) differences.
//! The step for parameter `i` grows with its magnitude:
//! `eps_i = 1e-7 + |x_i| * 1e-7`. Each call costs one baseline evaluation plus
//! one evaluation per parameter; nothing is cached between calls.

use ndarray::{Array1, Array2};

use crate::error::{LmError, Result};
use crate::model::LeastSquaresModel;

#[cfg(feature = "fixed")]
use crate::model::FixedLeastSquaresModel;
#[cfg(feature = "fixed")]
use nalgebra::{SMatrix, SVector};

/// Relative (and absolute floor) factor for the finite difference step.
pub const STEP_FACTOR: f64 = 1e-7;

/// Step size used when perturbing a parameter with value `value`.
pub fn step_size(value: f64) -> f64 {
    STEP_FACTOR + (value * STEP_FACTOR).abs()
}

/// Compute the Jacobian matrix of `model` using forward finite differences.
///
/// Column `i` is `difference(h(x + eps_i * e_i), h(x)) / eps_i`, so models
/// with a custom `difference` (wrapped angles, for instance) differentiate
/// correctly across their discontinuities.
///
/// # Arguments
///
/// * `model` - The model to differentiate
/// * `params` - The parameter values at which to evaluate the Jacobian
///
/// # Returns
///
/// * `Result<Array2<f64>>` - The Jacobian, one row per measurement and one
///   column per parameter
pub fn jacobian<M>(model: &M, params: &Array1<f64>) -> Result<Array2<f64>>
where
    M: LeastSquaresModel + ?Sized,
{
    let n_params = params.len();

    // Nominal function value
    let h0 = model.evaluate(params)?;
    let n_outputs = h0.len();

    let mut jac = Array2::zeros((n_outputs, n_params));

    for i in 0..n_params {
        let mut perturbed = params.clone();
        let eps = step_size(perturbed[i]);
        perturbed[i] += eps;

        let hi = model.evaluate(&perturbed)?;
        if hi.len() != n_outputs {
            return Err(LmError::DimensionMismatch(format!(
                "Model returned {} values at perturbed parameter {}, expected {}",
                hi.len(),
                i,
                n_outputs
            )));
        }

        let column = model.difference(&hi, &h0) / eps;
        jac.column_mut(i).assign(&column);
    }

    Ok(jac)
}

/// Forward-difference Jacobian for a fixed-size model.
#[cfg(feature = "fixed")]
pub fn jacobian_fixed<M, const NI: usize, const NO: usize>(
    model: &M,
    params: &SVector<f64, NI>,
) -> Result<SMatrix<f64, NO, NI>>
where
    M: FixedLeastSquaresModel<NI, NO> + ?Sized,
{
    let h0 = model.evaluate(params)?;
    let mut jac = SMatrix::<f64, NO, NI>::zeros();

    for i in 0..NI {
        let mut perturbed = *params;
        let eps = step_size(perturbed[i]);
        perturbed[i] += eps;

        let hi = model.evaluate(&perturbed)?;
        jac.set_column(i, &(model.difference(&hi, &h0) / eps));
    }

    Ok(jac)
}
