//! Theoretical sample complexity τ of the variance-aware algorithm
//!
//! τ = 8·N·(2·log⌈log₂ M⌉ + log(32(N²−N)/δ))·M,
//! M = max(128·V_max / Δ_min², 128 / (3·Δ_min))
//!
//! Δ_min is the smallest estimated distance between arms with different
//! ground-truth labels and V_max the largest variance estimate. τ is a
//! diagnostic for comparing against observed sample counts; it never steers
//! the adaptive loop.

use crate::error::{ClusterError, Result};
use crate::estimator::RoundEstimates;

fn degenerate(reason: impl Into<String>) -> ClusterError {
    ClusterError::DegenerateComplexityBound {
        reason: reason.into(),
    }
}

/// Compute τ from one round's estimates and the arms' true labels
pub fn theoretical_complexity(
    labels: &[Option<usize>],
    delta: f64,
    estimates: &RoundEstimates,
) -> Result<f64> {
    let arms = labels.len();
    if arms != estimates.variances.len() || arms != estimates.distances.size() {
        return Err(ClusterError::DimensionMismatch {
            expected: arms,
            found: estimates.variances.len(),
        });
    }

    let labels: Vec<usize> = labels
        .iter()
        .copied()
        .collect::<Option<Vec<_>>>()
        .ok_or_else(|| degenerate("ground-truth labels are missing"))?;

    let delta_min = (0..arms)
        .flat_map(|i| (0..i).map(move |j| (i, j)))
        .filter(|&(i, j)| labels[i] != labels[j])
        .map(|(i, j)| estimates.distances.get(i, j))
        .min_by(f64::total_cmp)
        .ok_or_else(|| degenerate("all arms share one cluster"))?;

    if delta_min <= 0.0 {
        return Err(degenerate("arms from different clusters have zero estimated distance"));
    }

    let v_max = estimates
        .variances
        .iter()
        .copied()
        .max_by(f64::total_cmp)
        .unwrap_or(0.0);

    let n = arms as f64;
    let log_term = (32.0 * (n * n - n) / delta).ln();

    let variance_term = 128.0 * v_max / (delta_min * delta_min);
    let range_term = 128.0 / (3.0 * delta_min);
    let dominant = variance_term.max(range_term);

    let rounds = dominant.log2().ceil();
    if rounds < 1.0 {
        return Err(degenerate(format!(
            "log2 of the dominant term ({dominant}) gives no rounds"
        )));
    }

    let tau = 8.0 * n * (2.0 * rounds.ln() + log_term) * dominant;
    if !tau.is_finite() {
        return Err(degenerate("bound is not finite"));
    }
    Ok(tau)
}
