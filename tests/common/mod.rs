//! Shared models for the integration tests.

#![allow(dead_code)]

use lmfit_core::{LeastSquaresModel, Result};
use ndarray::{array, Array1, Array2};
use std::f64::consts::PI;

#[cfg(feature = "fixed")]
use lmfit_core::FixedLeastSquaresModel;
#[cfg(feature = "fixed")]
use nalgebra::{SVector, Vector4, Vector5};

/// Four parameters mapped to five trigonometric measurements.
pub struct TrigModel;

fn trig(x0: f64, x1: f64, x2: f64, x3: f64) -> [f64; 5] {
    [
        (x0 + 0.1).sin(),
        (x1 * x2).cos(),
        x1 * x2.cos(),
        x0.atan2(x3),
        x2.atan2(x1),
    ]
}

impl LeastSquaresModel for TrigModel {
    fn evaluate(&self, x: &Array1<f64>) -> Result<Array1<f64>> {
        Ok(Array1::from(trig(x[0], x[1], x[2], x[3]).to_vec()))
    }
}

#[cfg(feature = "fixed")]
impl FixedLeastSquaresModel<4, 5> for TrigModel {
    fn evaluate(&self, x: &Vector4<f64>) -> Result<Vector5<f64>> {
        Ok(SVector::from(trig(x[0], x[1], x[2], x[3])))
    }
}

/// Closed-form Jacobian of [`TrigModel`].
pub fn trig_jacobian(x: &Array1<f64>) -> Array2<f64> {
    let (x0, x1, x2, x3) = (x[0], x[1], x[2], x[3]);
    let r03 = x0 * x0 + x3 * x3;
    let r12 = x1 * x1 + x2 * x2;
    array![
        [(x0 + 0.1).cos(), 0.0, 0.0, 0.0],
        [0.0, -x2 * (x1 * x2).sin(), -x1 * (x1 * x2).sin(), 0.0],
        [0.0, x2.cos(), -x1 * x2.sin(), 0.0],
        [x3 / r03, 0.0, 0.0, -x0 / r03],
        [0.0, -x2 / r12, x1 / r12, 0.0],
    ]
}

pub fn wrap(angle: f64) -> f64 {
    (angle + PI).rem_euclid(2.0 * PI) - PI
}

/// Bearings from a planar position to fixed beacons, in (-pi, pi].
pub struct BearingModel {
    pub beacons: Vec<(f64, f64)>,
}

impl LeastSquaresModel for BearingModel {
    fn evaluate(&self, x: &Array1<f64>) -> Result<Array1<f64>> {
        Ok(self
            .beacons
            .iter()
            .map(|&(bx, by)| (by - x[1]).atan2(bx - x[0]))
            .collect())
    }

    fn difference(&self, a: &Array1<f64>, b: &Array1<f64>) -> Array1<f64> {
        (a - b).mapv(wrap)
    }
}
