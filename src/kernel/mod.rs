//! Gaussian kernel with fixed bandwidth
//!
//! k(x, y) = exp(-‖x - y‖² / h), h = [`KERNEL_BANDWIDTH`].
//! Mathematically k lies in (0, 1] and k(x, x) = 1. In f64 the exponential
//! underflows to exactly 0.0 once ‖x - y‖² / h exceeds about 745, that is for
//! ‖x - y‖ above roughly 1930. Such pairs contribute nothing to the kernel
//! sums, which is the limit value the estimators expect.

use crate::error::{ClusterError, Result};
use crate::types::KERNEL_BANDWIDTH;

/// Squared Euclidean distance ‖x - y‖²
pub fn squared_distance(x: &[f64], y: &[f64]) -> Result<f64> {
    if x.len() != y.len() {
        return Err(ClusterError::DimensionMismatch {
            expected: x.len(),
            found: y.len(),
        });
    }
    Ok(x.iter()
        .zip(y.iter())
        .map(|(&a, &b)| {
            let diff = a - b;
            diff * diff
        })
        .sum())
}

/// Kernel similarity between two observations
///
/// Returns a value in [0, 1]; 0.0 only through underflow for very distant points.
pub fn kernel(x: &[f64], y: &[f64]) -> Result<f64> {
    let dist = squared_distance(x, y)?;
    Ok((-dist / KERNEL_BANDWIDTH).exp())
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f64 = 1e-12;

    #[test]
    fn test_self_similarity_is_one() {
        let x = vec![3.5, -2.0, 100.0];
        assert_eq!(kernel(&x, &x).unwrap(), 1.0);
    }

    #[test]
    fn test_known_value() {
        // ‖(0,0) - (50,50)‖² = 5000 -> exp(-1)
        let k = kernel(&[0.0, 0.0], &[50.0, 50.0]).unwrap();
        assert!((k - (-1.0f64).exp()).abs() < EPSILON);
    }

    #[test]
    fn test_symmetric_and_in_range() {
        let x = vec![1.0, 7.0];
        let y = vec![-40.0, 12.5];
        let kxy = kernel(&x, &y).unwrap();
        let kyx = kernel(&y, &x).unwrap();

        assert_eq!(kxy, kyx);
        assert!(kxy > 0.0 && kxy <= 1.0);
    }

    #[test]
    fn test_far_points_approach_zero() {
        let k = kernel(&[0.0], &[1000.0]).unwrap();
        assert!(k < 1e-80);
        assert!(k > 0.0);
    }

    #[test]
    fn test_distant_points_underflow_to_zero() {
        // ‖x - y‖² / h = 800, past the f64 exponent range
        assert_eq!(kernel(&[0.0], &[2000.0]).unwrap(), 0.0);
        // ‖x - y‖² / h = 720 is still a positive subnormal-range value
        assert!(kernel(&[0.0], &[1897.0]).unwrap() > 0.0);
    }

    #[test]
    fn test_dimension_mismatch() {
        let err = kernel(&[1.0, 2.0], &[1.0]).unwrap_err();
        assert_eq!(
            err,
            ClusterError::DimensionMismatch {
                expected: 2,
                found: 1
            }
        );
    }
}
