//! Matrix conversion utilities for the lmfit-core library.
//!
//! The drivers work on two container families:
//! - ndarray (Array2, Array1) for problems sized at run time
//! - nalgebra (SMatrix, SVector) for problems sized at compile time
//!
//! The decomposition backend is faer, so every linear solve crosses the
//! ndarray <-> faer boundary through the functions here.

use faer::{Mat, MatRef};
use ndarray::{Array1, Array2};

// === ndarray <-> faer conversions ===

/// Convert an ndarray Array2 to a faer Mat.
///
/// Note: ndarray is row-major by default, faer is column-major, so the copy
/// goes element by element.
pub fn ndarray_to_faer(arr: &Array2<f64>) -> Mat<f64> {
    Mat::from_fn(arr.nrows(), arr.ncols(), |i, j| arr[[i, j]])
}

/// Convert a faer matrix view to an ndarray Array2.
pub fn faer_to_ndarray(mat: MatRef<'_, f64>) -> Array2<f64> {
    Array2::from_shape_fn((mat.nrows(), mat.ncols()), |(i, j)| mat[(i, j)])
}

/// Convert an ndarray Array1 to a single-column faer Mat, the shape the
/// in-place solvers expect for a right-hand side.
pub fn ndarray_vec_to_faer_rhs(arr: &Array1<f64>) -> Mat<f64> {
    Mat::from_fn(arr.len(), 1, |i, _| arr[i])
}

/// Convert the first column of a faer matrix view to an ndarray Array1.
pub fn faer_column_to_ndarray(mat: MatRef<'_, f64>) -> Array1<f64> {
    Array1::from_shape_fn(mat.nrows(), |i| mat[(i, 0)])
}

// === ndarray <-> nalgebra conversions ===

#[cfg(feature = "fixed")]
pub use self::static_convert::*;

#[cfg(feature = "fixed")]
mod static_convert {
    use nalgebra::{SMatrix, SVector};
    use ndarray::{Array1, Array2};

    use crate::error::{LmError, Result};

    /// Convert a nalgebra static matrix to an ndarray Array2.
    pub fn nalgebra_to_ndarray<const R: usize, const C: usize>(
        mat: &SMatrix<f64, R, C>,
    ) -> Array2<f64> {
        Array2::from_shape_fn((R, C), |(i, j)| mat[(i, j)])
    }

    /// Convert a nalgebra static vector to an ndarray Array1.
    pub fn nalgebra_vec_to_ndarray<const N: usize>(vec: &SVector<f64, N>) -> Array1<f64> {
        Array1::from_shape_fn(N, |i| vec[i])
    }

    /// Convert an ndarray Array1 to a nalgebra static vector.
    ///
    /// # Errors
    ///
    /// * `LmError::DimensionMismatch` if the array length is not `N`
    pub fn ndarray_vec_to_nalgebra<const N: usize>(arr: &Array1<f64>) -> Result<SVector<f64, N>> {
        if arr.len() != N {
            return Err(LmError::DimensionMismatch(format!(
                "Expected vector of length {}, got {}",
                N,
                arr.len()
            )));
        }
        Ok(SVector::<f64, N>::from_fn(|i, _| arr[i]))
    }
}
