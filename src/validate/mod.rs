//! Shape and finiteness checks for a round's observation batches.
//!
//! Dimensionality is checked later by the kernel itself, so that a mismatch
//! is reported against the estimation task (arm or pair) that hit it.

use crate::error::{ClusterError, Result};
use crate::types::Observation;

/// Check whether a slice contains NaN or infinite values
pub fn has_invalid_values(values: &[f64]) -> bool {
    values.iter().any(|v| !v.is_finite())
}

/// Validate one arm's batch: exact length, finite values
pub fn validate_batch(arm: usize, batch: &[Observation], samples_per_arm: usize) -> Result<()> {
    if batch.len() != samples_per_arm {
        return Err(ClusterError::SampleCountMismatch {
            arm,
            expected: samples_per_arm,
            found: batch.len(),
        });
    }

    match batch.iter().position(|obs| has_invalid_values(obs)) {
        Some(index) => Err(ClusterError::NonFiniteObservation { arm, index }),
        None => Ok(()),
    }
}
