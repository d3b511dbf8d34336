//! Configuration options for the Levenberg-Marquardt algorithm.
//!
//! Only the stopping criteria are configurable. The damping schedule and the
//! measurement weight are fixed constants of the algorithm.

use serde::{Deserialize, Serialize};

use crate::error::{LmError, Result};

/// Default absolute tolerance on the residual norm.
pub const DEFAULT_ABS_TOLERANCE: f64 = 1e-16;

/// Default tolerance on the relative decrease of the residual norm.
pub const DEFAULT_REL_TOLERANCE: f64 = 1e-16;

/// Default cap on outer iterations.
pub const DEFAULT_MAX_ITERATIONS: usize = 100;

/// Initial value of the damping parameter.
pub const INITIAL_LAMBDA: f64 = 0.1;

/// Factor applied to lambda after a rejected trial (multiply) and at the end
/// of every outer iteration (divide).
pub const LAMBDA_FACTOR: f64 = 10.0;

/// Uniform inverse measurement covariance applied to the gradient and the
/// Gauss-Newton Hessian.
pub const MEASUREMENT_WEIGHT: f64 = 10.0;

/// Number of damped trials per outer iteration before it is short-circuited.
pub const MAX_INNER_ITERATIONS: usize = 5;

/// Configuration options for the Levenberg-Marquardt algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LmConfig {
    /// Stop once the residual norm falls below this value. Default: 1e-16
    pub abs_tolerance: f64,

    /// Stop once an accepted step shrinks the residual norm by less than this
    /// fraction. Default: 1e-16
    pub rel_tolerance: f64,

    /// Maximum number of outer iterations. Default: 100
    pub max_iterations: usize,
}

impl Default for LmConfig {
    fn default() -> Self {
        Self {
            abs_tolerance: DEFAULT_ABS_TOLERANCE,
            rel_tolerance: DEFAULT_REL_TOLERANCE,
            max_iterations: DEFAULT_MAX_ITERATIONS,
        }
    }
}

impl LmConfig {
    /// Creates a configuration with the given tolerances and iteration cap.
    pub fn new(abs_tolerance: f64, rel_tolerance: f64, max_iterations: usize) -> Self {
        Self {
            abs_tolerance,
            rel_tolerance,
            max_iterations,
        }
    }

    /// Parse a configuration from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: LmConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Check that the tolerances are usable.
    pub fn validate(&self) -> Result<()> {
        if !(self.abs_tolerance >= 0.0) {
            return Err(LmError::InvalidInput(format!(
                "abs_tolerance must be non-negative, got {}",
                self.abs_tolerance
            )));
        }
        if !(self.rel_tolerance >= 0.0) {
            return Err(LmError::InvalidInput(format!(
                "rel_tolerance must be non-negative, got {}",
                self.rel_tolerance
            )));
        }
        Ok(())
    }
}
