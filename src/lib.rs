//! # lmfit-core
//!
//! `lmfit-core` is a Rust implementation of the Levenberg-Marquardt algorithm
//! for nonlinear least-squares fitting of a model to an observation vector.
//!
//! The library provides:
//! - A general driver for models whose sizes are known at run time
//! - A fixed-size driver on nalgebra static vectors (feature `fixed`)
//! - Forward-difference Jacobians for models without an analytic one
//! - Custom measurement differences for non-Euclidean measurement spaces
//!
//! ## Basic Usage
//!
//! ```
//! use lmfit_core::{LeastSquaresModel, LevenbergMarquardt, Result};
//! use ndarray::{array, Array1};
//!
//! struct Decay;
//!
//! impl LeastSquaresModel for Decay {
//!     fn evaluate(&self, p: &Array1<f64>) -> Result<Array1<f64>> {
//!         Ok(Array1::from_iter((0..5).map(|t| p[0] * (-p[1] * t as f64).exp())))
//!     }
//! }
//!
//! let observation = Array1::from_iter((0..5).map(|t| 2.0 * (-0.5 * t as f64).exp()));
//! let result = LevenbergMarquardt::new()
//!     .with_abs_tolerance(1e-12)
//!     .solve(&Decay, array![1.0, 1.0], &observation)
//!     .unwrap();
//!
//! assert!(result.converged());
//! assert!((result.params[0] - 2.0).abs() < 1e-6);
//! ```

pub mod error;
pub mod linalg;
pub mod lm;
pub mod model;
pub mod utils;

// Re-exports for convenience
pub use error::{LmError, Result};
pub use lm::{levenberg_marquardt, LevenbergMarquardt, LmConfig, LmResult, LmStatus};
pub use model::LeastSquaresModel;

#[cfg(feature = "fixed")]
pub use lm::levenberg_marquardt_fixed;
#[cfg(feature = "fixed")]
pub use model::FixedLeastSquaresModel;

/// Version of the library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
