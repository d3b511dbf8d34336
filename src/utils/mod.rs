//! Utility functions and helpers for the lmfit-core library.

pub mod finite_difference;
pub mod matrix_convert;

// Re-export commonly used utilities
pub use finite_difference::{jacobian, step_size};
pub use matrix_convert::{
    faer_column_to_ndarray, faer_to_ndarray, ndarray_to_faer, ndarray_vec_to_faer_rhs,
};
