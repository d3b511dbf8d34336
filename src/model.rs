//! Least-squares model definitions.
//!
//! A model maps a parameter vector `x` to a vector of predicted measurements
//! `h(x)`. The optimizer fits `x` so that `h(x)` matches an observation vector
//! `z` in a least-squares sense. Besides evaluating `h`, a model can provide:
//!
//! - an analytic Jacobian `dh/dx`; without one, a forward-difference
//!   approximation is used (see [`crate::utils::finite_difference`]);
//! - a `difference` operation used to form residuals, for measurement spaces
//!   that are not Euclidean (angles that wrap around, for example).

use ndarray::{Array1, Array2};

use crate::error::Result;
use crate::utils::finite_difference;

#[cfg(feature = "fixed")]
use nalgebra::{SMatrix, SVector};

/// A least-squares model whose dimensions are known at run time.
///
/// # Example
///
/// ```
/// use lmfit_core::{LeastSquaresModel, Result};
/// use ndarray::{array, Array1};
///
/// struct Circle;
///
/// impl LeastSquaresModel for Circle {
///     fn evaluate(&self, x: &Array1<f64>) -> Result<Array1<f64>> {
///         Ok(array![x[0].cos(), x[0].sin()])
///     }
/// }
///
/// let j = Circle.jacobian(&array![0.0]).unwrap();
/// assert!((j[[1, 0]] - 1.0).abs() < 1e-6);
/// ```
pub trait LeastSquaresModel {
    /// Evaluate the model function `h(x)`.
    fn evaluate(&self, params: &Array1<f64>) -> Result<Array1<f64>>;

    /// Evaluate the Jacobian `dh/dx` at the given parameters.
    ///
    /// The result has one row per measurement and one column per parameter.
    /// The default implementation differentiates [`evaluate`](Self::evaluate)
    /// numerically. Override it whenever a closed form is available.
    fn jacobian(&self, params: &Array1<f64>) -> Result<Array2<f64>> {
        finite_difference::jacobian(self, params)
    }

    /// Difference between two measurement vectors, `a - b` by default.
    fn difference(&self, a: &Array1<f64>, b: &Array1<f64>) -> Array1<f64> {
        a - b
    }
}

impl<M: LeastSquaresModel + ?Sized> LeastSquaresModel for &M {
    fn evaluate(&self, params: &Array1<f64>) -> Result<Array1<f64>> {
        (**self).evaluate(params)
    }

    fn jacobian(&self, params: &Array1<f64>) -> Result<Array2<f64>> {
        (**self).jacobian(params)
    }

    fn difference(&self, a: &Array1<f64>, b: &Array1<f64>) -> Array1<f64> {
        (**self).difference(a, b)
    }
}

/// Analytic Jacobian closure type used when none is supplied.
pub type JacobianFn = fn(&Array1<f64>) -> Array2<f64>;

/// A model built from closures instead of a dedicated type.
///
/// ```
/// use lmfit_core::model::FnModel;
/// use lmfit_core::LeastSquaresModel;
/// use ndarray::{array, Array1};
///
/// let model = FnModel::new(|x: &Array1<f64>| array![x[0] * x[0], x[1]]);
/// let h = model.evaluate(&array![3.0, 1.0]).unwrap();
/// assert_eq!(h, array![9.0, 1.0]);
/// ```
pub struct FnModel<F, J = JacobianFn> {
    eval: F,
    jacobian: Option<J>,
}

impl<F> FnModel<F>
where
    F: Fn(&Array1<f64>) -> Array1<f64>,
{
    /// Create a model from an evaluation closure; the Jacobian is computed numerically.
    pub fn new(eval: F) -> Self {
        Self {
            eval,
            jacobian: None,
        }
    }
}

impl<F, J> FnModel<F, J> {
    /// Attach an analytic Jacobian closure.
    pub fn with_jacobian<J2>(self, jacobian: J2) -> FnModel<F, J2>
    where
        J2: Fn(&Array1<f64>) -> Array2<f64>,
    {
        FnModel {
            eval: self.eval,
            jacobian: Some(jacobian),
        }
    }
}

impl<F, J> LeastSquaresModel for FnModel<F, J>
where
    F: Fn(&Array1<f64>) -> Array1<f64>,
    J: Fn(&Array1<f64>) -> Array2<f64>,
{
    fn evaluate(&self, params: &Array1<f64>) -> Result<Array1<f64>> {
        Ok((self.eval)(params))
    }

    fn jacobian(&self, params: &Array1<f64>) -> Result<Array2<f64>> {
        match &self.jacobian {
            Some(jacobian) => Ok(jacobian(params)),
            None => finite_difference::jacobian(self, params),
        }
    }
}

/// A least-squares model with `NI` parameters and `NO` measurements fixed at
/// compile time.
#[cfg(feature = "fixed")]
pub trait FixedLeastSquaresModel<const NI: usize, const NO: usize> {
    /// Evaluate the model function `h(x)`.
    fn evaluate(&self, params: &SVector<f64, NI>) -> Result<SVector<f64, NO>>;

    /// Evaluate the Jacobian `dh/dx`; numerical by default.
    fn jacobian(&self, params: &SVector<f64, NI>) -> Result<SMatrix<f64, NO, NI>> {
        finite_difference::jacobian_fixed(self, params)
    }

    /// Difference between two measurement vectors, `a - b` by default.
    fn difference(&self, a: &SVector<f64, NO>, b: &SVector<f64, NO>) -> SVector<f64, NO> {
        a - b
    }
}
