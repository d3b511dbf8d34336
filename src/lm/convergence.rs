//! Termination status of the Levenberg-Marquardt driver.
//!
//! Running out of iterations is not an error: the driver still returns its
//! best parameters and reports the situation through [`LmStatus`]. Callers
//! must inspect the status, not just whether a value came back.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Possible termination states of the optimizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LmStatus {
    /// The iteration cap was reached before any convergence test passed.
    NotConverged,

    /// No status has been determined.
    Unknown,

    /// The residual norm fell below the absolute tolerance.
    ConvergedAbsTolerance,

    /// An accepted step improved the residual norm by less than the relative tolerance.
    ConvergedRelTolerance,
}

impl Default for LmStatus {
    fn default() -> Self {
        LmStatus::Unknown
    }
}

impl LmStatus {
    /// Returns true if one of the convergence tests passed.
    pub fn is_converged(&self) -> bool {
        matches!(
            self,
            LmStatus::ConvergedAbsTolerance | LmStatus::ConvergedRelTolerance
        )
    }

    /// Stable integer code: -1, 0, 1, 2 in declaration order.
    pub fn code(&self) -> i32 {
        match self {
            LmStatus::NotConverged => -1,
            LmStatus::Unknown => 0,
            LmStatus::ConvergedAbsTolerance => 1,
            LmStatus::ConvergedRelTolerance => 2,
        }
    }

    /// Inverse of [`code`](Self::code).
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            -1 => Some(LmStatus::NotConverged),
            0 => Some(LmStatus::Unknown),
            1 => Some(LmStatus::ConvergedAbsTolerance),
            2 => Some(LmStatus::ConvergedRelTolerance),
            _ => None,
        }
    }

    /// Returns a description of the status.
    pub fn description(&self) -> &'static str {
        match self {
            LmStatus::NotConverged => "Terminated: did not converge",
            LmStatus::Unknown => "Status unknown",
            LmStatus::ConvergedAbsTolerance => "Converged: residual norm below absolute tolerance",
            LmStatus::ConvergedRelTolerance => {
                "Converged: relative improvement below relative tolerance"
            }
        }
    }
}

impl fmt::Display for LmStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}
