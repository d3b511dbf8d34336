//! Optimization results and per-iteration records.

use ndarray::Array1;
use std::fmt;

use super::convergence::LmStatus;
use super::step::SolveStrategy;

/// Bookkeeping for one outer iteration of the driver.
#[derive(Debug, Clone, PartialEq)]
pub struct IterationRecord {
    /// 1-based outer iteration number
    pub iteration: usize,

    /// Residual norm at the start of the iteration
    pub norm_start: f64,

    /// Residual norm of the last trial; equals `norm_start` when short-circuited
    pub norm_try: f64,

    /// Damping parameter carried into the next iteration
    pub lambda: f64,

    /// Number of damped trials evaluated
    pub inner_attempts: usize,

    /// Whether every trial increased the residual norm
    pub short_circuited: bool,

    /// Solver that produced the last trial step
    pub strategy: SolveStrategy,
}

impl IterationRecord {
    /// Whether the trial parameters were committed.
    pub fn committed(&self) -> bool {
        !self.short_circuited
    }
}

/// Result of the Levenberg-Marquardt optimization.
///
/// `P` is the parameter container: `Array1<f64>` for the general driver and a
/// nalgebra static vector for the fixed-size one.
#[derive(Debug, Clone)]
pub struct LmResult<P = Array1<f64>> {
    /// How the optimization terminated
    pub status: LmStatus,

    /// Best parameter values found
    pub params: P,

    /// Residual norm associated with `params`
    pub norm: f64,

    /// Number of outer iterations performed
    pub iterations: usize,

    /// Number of model evaluations made by the driver (Jacobian evaluations excluded)
    pub func_evals: usize,

    /// Final value of the damping parameter
    pub lambda: f64,

    /// One record per outer iteration
    pub history: Vec<IterationRecord>,
}

impl<P> LmResult<P> {
    /// Returns true if one of the convergence tests passed.
    pub fn converged(&self) -> bool {
        self.status.is_converged()
    }

    /// Damping value at the end of each outer iteration.
    pub fn lambda_trajectory(&self) -> Vec<f64> {
        self.history.iter().map(|r| r.lambda).collect()
    }
}

impl<P: fmt::Debug> fmt::Display for LmResult<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Optimization Result:")?;
        writeln!(f, "  Status: {} ({})", self.status, self.status.code())?;
        writeln!(f, "  Residual norm: {:.6e}", self.norm)?;
        writeln!(f, "  Iterations: {}", self.iterations)?;
        writeln!(f, "  Function evaluations: {}", self.func_evals)?;
        writeln!(f, "  Lambda: {:.3e}", self.lambda)?;
        writeln!(f, "  Parameters: {:?}", self.params)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn record(iteration: usize, lambda: f64, short_circuited: bool) -> IterationRecord {
        IterationRecord {
            iteration,
            norm_start: 1.0,
            norm_try: 0.5,
            lambda,
            inner_attempts: 1,
            short_circuited,
            strategy: SolveStrategy::Symmetric,
        }
    }

    #[test]
    fn test_result_display_and_trajectory() {
        let result = LmResult {
            status: LmStatus::ConvergedRelTolerance,
            params: array![1.0, 2.0],
            norm: 0.25,
            iterations: 2,
            func_evals: 5,
            lambda: 0.001,
            history: vec![record(1, 0.01, false), record(2, 0.001, true)],
        };

        let text = result.to_string();
        assert!(text.contains("Iterations: 2"));
        assert!(text.contains("(2)"));
        assert!(result.converged());
        assert_eq!(result.lambda_trajectory(), vec![0.01, 0.001]);
        assert!(result.history[0].committed());
        assert!(!result.history[1].committed());
    }
}
