//! Small dense linear algebra for the reference arms (row-major storage).

use crate::error::{ClusterError, Result};

/// Relative tolerance under which a pivot counts as zero
const PIVOT_TOLERANCE: f64 = 1e-12;

fn not_positive_semidefinite() -> ClusterError {
    ClusterError::InvalidConfig("covariance matrix is not positive semi-definite".to_string())
}

/// Cholesky factorisation A = L·Lᵀ of a symmetric positive semi-definite d×d matrix
///
/// Returns the lower-triangular L. A zero pivot (singular but valid
/// covariance, e.g. perfectly correlated coordinates) yields a zero column
/// in L. Fails when the matrix is not symmetric or has a negative pivot.
pub fn cholesky_decompose(a: &[f64], d: usize) -> Result<Vec<f64>> {
    if a.len() != d * d {
        return Err(ClusterError::DimensionMismatch {
            expected: d * d,
            found: a.len(),
        });
    }

    let scale = (0..d).map(|i| a[i * d + i].abs()).fold(0.0, f64::max);
    let tolerance = PIVOT_TOLERANCE * scale;
    for i in 0..d {
        for j in 0..i {
            if (a[i * d + j] - a[j * d + i]).abs() > PIVOT_TOLERANCE * scale.max(1.0) {
                return Err(ClusterError::InvalidConfig(
                    "covariance matrix is not symmetric".to_string(),
                ));
            }
        }
    }

    let mut l = vec![0.0; d * d];
    for i in 0..d {
        for j in 0..=i {
            let mut sum = a[i * d + j];
            for k in 0..j {
                sum -= l[i * d + k] * l[j * d + k];
            }

            if i == j {
                if sum.is_nan() || sum < -tolerance {
                    return Err(not_positive_semidefinite());
                }
                l[i * d + i] = if sum <= tolerance { 0.0 } else { sum.sqrt() };
            } else if l[j * d + j] == 0.0 {
                // zero pivot: the remaining entry in this column must vanish too
                if sum.is_nan() || sum.abs() > tolerance.max(PIVOT_TOLERANCE) {
                    return Err(not_positive_semidefinite());
                }
            } else {
                l[i * d + j] = sum / l[j * d + j];
            }
        }
    }

    Ok(l)
}

/// y = L·x for lower-triangular L
pub fn lower_mat_vec_mul(l: &[f64], x: &[f64], d: usize) -> Vec<f64> {
    (0..d)
        .map(|i| (0..=i).map(|j| l[i * d + j] * x[j]).sum())
        .collect()
}
