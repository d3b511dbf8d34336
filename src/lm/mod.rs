//! Levenberg-Marquardt algorithm implementation.
//!
//! [`LevenbergMarquardt`] drives models whose sizes are known at run time
//! (ndarray containers). With the `fixed` feature,
//! [`levenberg_marquardt_fixed`] runs the same algorithm on nalgebra static
//! vectors.

pub mod algorithm;
pub mod config;
pub mod convergence;
#[cfg(feature = "fixed")]
pub mod fixed;
pub mod report;
pub mod step;

// Re-export key types
pub use algorithm::{levenberg_marquardt, LevenbergMarquardt};
pub use config::LmConfig;
pub use convergence::LmStatus;
#[cfg(feature = "fixed")]
pub use fixed::levenberg_marquardt_fixed;
pub use report::{IterationRecord, LmResult};
pub use step::{LmStep, SolveStrategy, StepResult};
