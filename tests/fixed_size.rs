//! Integration tests for the fixed-size driver.

#![cfg(feature = "fixed")]

mod common;

use approx::assert_relative_eq;
use common::TrigModel;
use lmfit_core::lm::{LmConfig, SolveStrategy};
use lmfit_core::{
    levenberg_marquardt, levenberg_marquardt_fixed, FixedLeastSquaresModel, LevenbergMarquardt,
    LmStatus, Result,
};
use nalgebra::{Matrix1, Matrix3, Vector1, Vector3, Vector4, Vector5};
use ndarray::array;

#[test]
fn test_fixed_trig_model_from_unit_seed() {
    let observation = Vector5::new(0.2, 0.3, 0.4, 0.5, 0.6);
    let result = levenberg_marquardt_fixed(
        &TrigModel,
        Vector4::repeat(1.0),
        &observation,
        &LmConfig::default(),
    )
    .unwrap();

    assert_eq!(result.status, LmStatus::ConvergedRelTolerance);
    let expected = [0.101358, 1.15485, 1.12093, 0.185534];
    for (p, e) in result.params.iter().zip(expected) {
        assert_relative_eq!(*p, e, epsilon = 1e-4);
    }
}

#[test]
fn test_fixed_and_general_drivers_agree() {
    let fixed = LevenbergMarquardt::new()
        .solve_fixed(
            &TrigModel,
            Vector4::repeat(1.0),
            &Vector5::new(0.2, 0.3, 0.4, 0.5, 0.6),
        )
        .unwrap();
    let general = levenberg_marquardt(
        &TrigModel,
        array![1.0, 1.0, 1.0, 1.0],
        &array![0.2, 0.3, 0.4, 0.5, 0.6],
    )
    .unwrap();

    assert_eq!(fixed.status, general.status);
    for i in 0..4 {
        assert_relative_eq!(fixed.params[i], general.params[i], epsilon = 1e-8);
    }
    assert_relative_eq!(fixed.norm, general.norm, epsilon = 1e-10);
}

#[test]
fn test_fixed_exact_seed() {
    let seed = Vector4::new(0.2, 0.3, 0.4, 0.5);
    let observation = FixedLeastSquaresModel::<4, 5>::evaluate(&TrigModel, &seed).unwrap();

    let result =
        levenberg_marquardt_fixed(&TrigModel, seed, &observation, &LmConfig::default()).unwrap();

    assert_eq!(result.status, LmStatus::ConvergedAbsTolerance);
    assert_eq!(result.iterations, 0);
    assert_eq!(result.params, seed);
}

#[test]
fn test_fixed_iteration_cap() {
    let config = LmConfig::new(0.0, 0.0, 3);
    let result = levenberg_marquardt_fixed(
        &TrigModel,
        Vector4::repeat(1.0),
        &Vector5::new(0.2, 0.3, 0.4, 0.5, 0.6),
        &config,
    )
    .unwrap();

    assert_eq!(result.status, LmStatus::NotConverged);
    assert_eq!(result.iterations, 3);
    assert_eq!(result.history.len(), 3);
}

/// Identity model whose Jacobian has the wrong sign, so every step goes uphill.
struct Uphill;

impl FixedLeastSquaresModel<1, 1> for Uphill {
    fn evaluate(&self, x: &Vector1<f64>) -> Result<Vector1<f64>> {
        Ok(*x)
    }

    fn jacobian(&self, _x: &Vector1<f64>) -> Result<Matrix1<f64>> {
        Ok(Matrix1::new(-1.0))
    }
}

#[test]
fn test_fixed_every_trial_rejected_short_circuits() {
    let config = LmConfig::new(1e-16, 1e-16, 3);
    let result =
        levenberg_marquardt_fixed(&Uphill, Vector1::new(0.0), &Vector1::new(1.0), &config).unwrap();

    assert_eq!(result.status, LmStatus::NotConverged);
    assert_eq!(result.iterations, 3);
    assert_eq!(result.params, Vector1::new(0.0));
    assert_eq!(result.norm, 1.0);
    assert_eq!(result.func_evals, 1 + 3 * (1 + 5));
    for record in &result.history {
        assert!(record.short_circuited);
        assert_eq!(record.inner_attempts, 5);
        assert_eq!(record.norm_try, record.norm_start);
    }
    assert_relative_eq!(result.lambda, 1e11, max_relative = 1e-9);
}

/// The third parameter does not influence any measurement.
struct Unobservable;

impl FixedLeastSquaresModel<3, 3> for Unobservable {
    fn evaluate(&self, x: &Vector3<f64>) -> Result<Vector3<f64>> {
        Ok(Vector3::new(1e7 * x[0], 1e7 * x[1], 1.0))
    }

    fn jacobian(&self, _x: &Vector3<f64>) -> Result<Matrix3<f64>> {
        Ok(Matrix3::new(1e7, 0.0, 0.0, 0.0, 1e7, 0.0, 0.0, 0.0, 0.0))
    }
}

#[test]
fn test_fixed_near_singular_hessian_falls_back_to_minimum_norm() {
    let result = levenberg_marquardt_fixed(
        &Unobservable,
        Vector3::zeros(),
        &Vector3::new(5e6, -2.5e6, 1.0),
        &LmConfig::default(),
    )
    .unwrap();

    assert_eq!(result.history[0].strategy, SolveStrategy::MinimumNorm);
    assert!(result.params.iter().all(|v| v.is_finite()));
    assert_relative_eq!(result.params[0], 0.5, epsilon = 1e-6);
    assert_relative_eq!(result.params[1], -0.25, epsilon = 1e-6);
    assert!(result.params[2].abs() < 1e-12);
}
