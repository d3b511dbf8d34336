//! Implementation of the Levenberg-Marquardt algorithm.
//!
//! The driver fits the parameters `x` of a [`LeastSquaresModel`] so that the
//! model output `h(x)` matches an observation `z`. Each outer iteration forms
//! the weighted Gauss-Newton system from the Jacobian, then tries damped steps
//! until one does not increase the residual norm, raising lambda after every
//! rejected trial. Lambda is lowered once at the end of every outer iteration.

use ndarray::{Array1, Array2};

use crate::error::{LmError, Result};
use crate::model::LeastSquaresModel;

use super::config::{
    LmConfig, INITIAL_LAMBDA, LAMBDA_FACTOR, MAX_INNER_ITERATIONS, MEASUREMENT_WEIGHT,
};
use super::convergence::LmStatus;
use super::report::{IterationRecord, LmResult};
use super::step::{LmStep, SolveStrategy};

/// Outcome of the damped trials of one outer iteration.
struct Trial {
    params: Array1<f64>,
    norm: f64,
    attempts: usize,
    short_circuited: bool,
    strategy: SolveStrategy,
}

/// The Levenberg-Marquardt optimizer.
#[derive(Debug, Clone, Default)]
pub struct LevenbergMarquardt {
    /// Configuration options
    config: LmConfig,
}

impl LevenbergMarquardt {
    /// Create a new Levenberg-Marquardt optimizer with default configuration.
    pub fn new() -> Self {
        Self {
            config: LmConfig::default(),
        }
    }

    /// Create a new Levenberg-Marquardt optimizer with the given configuration.
    pub fn with_config(config: LmConfig) -> Self {
        Self { config }
    }

    /// Create a new Levenberg-Marquardt optimizer with default configuration.
    pub fn with_default_config() -> Self {
        Self::new()
    }

    /// Set the absolute tolerance on the residual norm.
    pub fn with_abs_tolerance(mut self, abs_tolerance: f64) -> Self {
        self.config.abs_tolerance = abs_tolerance;
        self
    }

    /// Set the tolerance on the relative decrease of the residual norm.
    pub fn with_rel_tolerance(mut self, rel_tolerance: f64) -> Self {
        self.config.rel_tolerance = rel_tolerance;
        self
    }

    /// Set the maximum number of iterations.
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.config.max_iterations = max_iterations;
        self
    }

    /// The configuration in use.
    pub fn config(&self) -> &LmConfig {
        &self.config
    }

    /// Fit `model` to `observation` starting from `seed`.
    ///
    /// Returns the best parameters together with the termination status.
    /// Hitting the iteration cap is reported through
    /// [`LmStatus::NotConverged`], not as an error.
    ///
    /// # Errors
    ///
    /// - [`LmError::InvalidInput`] if the configuration is invalid
    /// - [`LmError::DimensionMismatch`] if the model output, the Jacobian and
    ///   the observation disagree on their sizes
    /// - any error raised by the model
    /// - [`LmError::LinearAlgebraError`] if no linear solver could produce a step
    pub fn solve<M>(
        &self,
        model: &M,
        seed: Array1<f64>,
        observation: &Array1<f64>,
    ) -> Result<LmResult>
    where
        M: LeastSquaresModel + ?Sized,
    {
        self.config.validate()?;

        let mut x = seed;
        let mut lambda = INITIAL_LAMBDA;
        let mut status = LmStatus::NotConverged;
        let mut func_evals = 0;
        let mut history = Vec::new();

        let h = model.evaluate(&x)?;
        func_evals += 1;
        check_measurements(&h, observation)?;
        let error = model.difference(observation, &h);
        let mut norm_start = error.dot(&error).sqrt();

        log::debug!("LM: initial guess for the model is {:?}", x);
        log::trace!("LM: starting error {:?}", error);
        log::debug!("LM: starting norm is {:.6e}", norm_start);

        let mut done = self.config.max_iterations == 0;
        if norm_start < self.config.abs_tolerance {
            log::debug!("LM: starting norm is below the absolute tolerance");
            status = LmStatus::ConvergedAbsTolerance;
            done = true;
        }

        let mut iteration = 0;
        while !done {
            iteration += 1;

            let h = model.evaluate(&x)?;
            func_evals += 1;
            check_measurements(&h, observation)?;
            let error = model.difference(observation, &h);
            norm_start = error.dot(&error).sqrt();
            let iteration_norm = norm_start;

            let jacobian = model.jacobian(&x)?;
            check_jacobian(&jacobian, observation.len(), x.len())?;

            let (gradient, hessian) =
                LmStep::normal_equations(&jacobian, &error, MEASUREMENT_WEIGHT);
            let rhs = -gradient;

            log::trace!("LM: jacobian {:?}", jacobian);
            log::trace!("LM: hessian {:?}", hessian);

            let trial = self.damped_trials(
                model,
                &x,
                observation,
                &hessian,
                &rhs,
                norm_start,
                &mut lambda,
                &mut func_evals,
            )?;

            if !trial.short_circuited
                && (norm_start - trial.norm) / norm_start < self.config.rel_tolerance
            {
                log::debug!("LM: relative improvement below tolerance");
                status = LmStatus::ConvergedRelTolerance;
                done = true;
            }
            if trial.norm < self.config.abs_tolerance {
                log::debug!("LM: residual norm below absolute tolerance");
                status = LmStatus::ConvergedAbsTolerance;
                done = true;
            }
            if iteration >= self.config.max_iterations {
                log::debug!("LM: reached {} iterations", iteration);
                done = true;
            }

            if !trial.short_circuited {
                x = trial.params;
            }
            let norm_try = trial.norm;
            norm_start = norm_try;
            lambda /= LAMBDA_FACTOR;

            log::debug!(
                "LM: iteration {} norm {:.6e} lambda {:.3e}",
                iteration,
                norm_start,
                lambda
            );

            history.push(IterationRecord {
                iteration,
                norm_start: iteration_norm,
                norm_try,
                lambda,
                inner_attempts: trial.attempts,
                short_circuited: trial.short_circuited,
                strategy: trial.strategy,
            });
        }

        log::debug!(
            "LM: finished after {} iterations with status {:?}",
            iteration,
            status
        );

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

    /// Try damped steps from `x` until one does not increase the residual norm.
    ///
    /// Lambda is raised after each rejected trial. When
    /// [`MAX_INNER_ITERATIONS`] trials are all rejected the iteration is
    /// short-circuited: the returned norm is `norm_start` and the trial
    /// parameters must not be committed.
    #[allow(clippy::too_many_arguments)]
    fn damped_trials<M>(
        &self,
        model: &M,
        x: &Array1<f64>,
        observation: &Array1<f64>,
        hessian: &Array2<f64>,
        rhs: &Array1<f64>,
        norm_start: f64,
        lambda: &mut f64,
        func_evals: &mut usize,
    ) -> Result<Trial>
    where
        M: LeastSquaresModel + ?Sized,
    {
        let mut attempts = 0;
        loop {
            let hessian_lm = LmStep::damped_hessian(hessian, *lambda);
            let step = LmStep::solve(&hessian_lm, rhs)?;
            let x_try = x - &step.step;

            let h_try = model.evaluate(&x_try)?;
            *func_evals += 1;
            check_measurements(&h_try, observation)?;
            let error_try = model.difference(observation, &h_try);
            let norm_try = error_try.dot(&error_try).sqrt();
            attempts += 1;

            log::trace!("LM: trial {:?} norm {:.6e}", x_try, norm_try);

            if norm_try > norm_start {
                *lambda *= LAMBDA_FACTOR;
                if attempts >= MAX_INNER_ITERATIONS {
                    log::debug!(
                        "LM: {} trials increased the norm, keeping the current parameters",
                        attempts
                    );
                    return Ok(Trial {
                        params: x_try,
                        norm: norm_start,
                        attempts,
                        short_circuited: true,
                        strategy: step.strategy,
                    });
                }
                log::debug!("LM: trial rejected, lambda = {:.3e}", *lambda);
            } else {
                return Ok(Trial {
                    params: x_try,
                    norm: norm_try,
                    attempts,
                    short_circuited: false,
                    strategy: step.strategy,
                });
            }
        }
    }
}

/// Fit `model` to `observation` from `seed` with the default configuration.
///
/// # Example
///
/// ```
/// use lmfit_core::{levenberg_marquardt, LmStatus};
/// use lmfit_core::model::FnModel;
/// use ndarray::{array, Array1};
///
/// // y = a * t + b sampled at t = 0, 1, 2
/// let model = FnModel::new(|p: &Array1<f64>| array![p[1], p[0] + p[1], 2.0 * p[0] + p[1]]);
/// let result = levenberg_marquardt(&model, array![0.0, 0.0], &array![1.0, 3.0, 5.0]).unwrap();
///
/// assert!(result.converged());
/// assert!((result.params[0] - 2.0).abs() < 1e-6);
/// assert!((result.params[1] - 1.0).abs() < 1e-6);
/// ```
pub fn levenberg_marquardt<M>(
    model: &M,
    seed: Array1<f64>,
    observation: &Array1<f64>,
) -> Result<LmResult>
where
    M: LeastSquaresModel + ?Sized,
{
    LevenbergMarquardt::new().solve(model, seed, observation)
}

fn check_measurements(h: &Array1<f64>, observation: &Array1<f64>) -> Result<()> {
    if h.len() != observation.len() {
        return Err(LmError::DimensionMismatch(format!(
            "model produced {} measurements, observation has {}",
            h.len(),
            observation.len()
        )));
    }
    Ok(())
}

fn check_jacobian(jacobian: &Array2<f64>, n_measurements: usize, n_params: usize) -> Result<()> {
    if jacobian.nrows() != n_measurements || jacobian.ncols() != n_params {
        return Err(LmError::DimensionMismatch(format!(
            "Jacobian has shape {}x{}, expected {}x{}",
            jacobian.nrows(),
            jacobian.ncols(),
            n_measurements,
            n_params
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::FnModel;
    use approx::assert_relative_eq;
    use ndarray::array;

    /// Exponential decay `a * exp(-b * t)` sampled at fixed times.
    fn decay_model() -> FnModel<impl Fn(&Array1<f64>) -> Array1<f64>> {
        FnModel::new(|p: &Array1<f64>| {
            Array1::from_iter((0..6).map(|i| p[0] * (-p[1] * i as f64 * 0.5).exp()))
        })
    }

    fn decay_data(a: f64, b: f64) -> Array1<f64> {
        Array1::from_iter((0..6).map(|i| a * (-b * i as f64 * 0.5).exp()))
    }

    #[test]
    fn test_fits_exponential_decay() {
        let model = decay_model();
        let result = LevenbergMarquardt::new()
            .with_abs_tolerance(1e-12)
            .solve(&model, array![1.0, 0.1], &decay_data(3.0, 0.7))
            .unwrap();

        assert!(result.converged());
        assert_relative_eq!(result.params[0], 3.0, epsilon = 1e-6);
        assert_relative_eq!(result.params[1], 0.7, epsilon = 1e-6);
        assert_eq!(result.history.len(), result.iterations);
    }

    #[test]
    fn test_exact_seed_returns_immediately() {
        let model = decay_model();
        let seed = array![3.0, 0.7];
        let result = LevenbergMarquardt::new()
            .with_abs_tolerance(1e-12)
            .solve(&model, seed.clone(), &decay_data(3.0, 0.7))
            .unwrap();

        assert_eq!(result.status, LmStatus::ConvergedAbsTolerance);
        assert_eq!(result.iterations, 0);
        assert_eq!(result.func_evals, 1);
        assert_eq!(result.params, seed);
        assert_eq!(result.lambda, INITIAL_LAMBDA);
        assert!(result.history.is_empty());
    }

    #[test]
    fn test_iteration_cap_is_not_an_error() {
        let model = decay_model();
        let result = LevenbergMarquardt::new()
            .with_abs_tolerance(0.0)
            .with_rel_tolerance(0.0)
            .with_max_iterations(1)
            .solve(&model, array![1.0, 0.1], &decay_data(3.0, 0.7))
            .unwrap();

        assert_eq!(result.status, LmStatus::NotConverged);
        assert_eq!(result.iterations, 1);
    }

    #[test]
    fn test_zero_iterations_keeps_seed() {
        let model = decay_model();
        let result = LevenbergMarquardt::new()
            .with_max_iterations(0)
            .solve(&model, array![1.0, 0.1], &decay_data(3.0, 0.7))
            .unwrap();

        assert_eq!(result.status, LmStatus::NotConverged);
        assert_eq!(result.iterations, 0);
        assert_eq!(result.params, array![1.0, 0.1]);
    }

    #[test]
    fn test_observation_size_mismatch() {
        let model = decay_model();
        let err = levenberg_marquardt(&model, array![1.0, 0.1], &array![1.0, 2.0]).unwrap_err();
        assert!(matches!(err, LmError::DimensionMismatch(_)));
    }

    #[test]
    fn test_jacobian_shape_mismatch() {
        let model = FnModel::new(|p: &Array1<f64>| array![p[0], p[1]])
            .with_jacobian(|_: &Array1<f64>| Array2::eye(3));
        let err = levenberg_marquardt(&model, array![0.0, 0.0], &array![1.0, 2.0]).unwrap_err();
        assert!(matches!(err, LmError::DimensionMismatch(_)));
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let model = decay_model();
        let err = LevenbergMarquardt::new()
            .with_rel_tolerance(f64::NAN)
            .solve(&model, array![1.0, 0.1], &decay_data(3.0, 0.7))
            .unwrap_err();
        assert!(matches!(err, LmError::InvalidInput(_)));
    }

    #[test]
    fn test_model_error_propagates() {
        struct Failing;
        impl LeastSquaresModel for Failing {
            fn evaluate(&self, _params: &Array1<f64>) -> Result<Array1<f64>> {
                Err(LmError::FunctionEvaluation("sensor offline".to_string()))
            }
        }

        let err = levenberg_marquardt(&Failing, array![0.0], &array![1.0]).unwrap_err();
        assert!(matches!(err, LmError::FunctionEvaluation(_)));
    }

    #[test]
    fn test_optimizer_is_shareable() {
        fn assert_send_sync<T: Send + Sync + Clone>() {}
        assert_send_sync::<LevenbergMarquardt>();
    }
}
