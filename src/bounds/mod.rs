//! Confidence bounds and the per-round sample budget
//!
//! Round k spends δ_k = δ / (4k²) of the failure probability, so that
//! Σ_k δ_k stays below δ over the whole unbounded schedule. Two arms are
//! declared indistinguishable in round k when d̂_ij <= bound(k, i, j).
//!
//! - Variance-aware (VKABC):
//!   C₁·ψ·L/n_k + (√V̂_i + √V̂_j)·√(2·L/n_k), L = log(8(N²−N)/δ_k)
//! - Variance-agnostic (KABC):
//!   2·√(ψ/n_k) + 2·√(2·ψ·log(2(N²−N)/δ_k)/n_k)

use serde::{Deserialize, Serialize};

use crate::error::{ClusterError, Result};
use crate::types::{
    BoundVariant, KERNEL_RANGE, VARIANCE_AGNOSTIC_BUDGET_FACTOR, VARIANCE_AWARE_BUDGET_FACTOR,
    VARIANCE_AWARE_CONSTANT,
};

/// N² − N, the number of ordered arm pairs
pub fn pair_multiplicity(arms: usize) -> f64 {
    let n = arms as f64;
    n * n - n
}

/// Per-round confidence budget δ_k = δ / (4k²)
pub fn round_delta(delta: f64, round: u32) -> f64 {
    let k = round as f64;
    delta / (4.0 * k * k)
}

fn undefined(round: u32, samples: u64, delta: f64) -> ClusterError {
    ClusterError::UndefinedConfidenceBound {
        round,
        samples,
        delta,
    }
}

/// Logarithm that refuses non-positive or non-finite arguments and negative results
fn bounded_log(argument: f64) -> Option<f64> {
    if !(argument.is_finite() && argument > 0.0) {
        return None;
    }
    let value = argument.ln();
    (value >= 0.0).then_some(value)
}

// ==================== Sample Budget ====================

/// n_k = ceil(2^k · (2·log k + log(c·(N²−N)/δ)))
///
/// c is 32 for VKABC and 8 for KABC. With a single arm there are no pairs;
/// the multiplicity is taken as 1 so that the first round still draws a
/// finite batch.
pub fn sample_budget(variant: BoundVariant, round: u32, delta: f64, arms: usize) -> Result<u64> {
    let factor = match variant {
        BoundVariant::VarianceAware => VARIANCE_AWARE_BUDGET_FACTOR,
        BoundVariant::VarianceAgnostic => VARIANCE_AGNOSTIC_BUDGET_FACTOR,
    };
    let pairs = pair_multiplicity(arms).max(1.0);
    let k = round as f64;

    let log_term = bounded_log(factor * pairs / delta)
        .map(|union_log| 2.0 * k.ln() + union_log)
        .ok_or_else(|| undefined(round, 0, delta))?;

    let budget = (2f64.powi(round as i32) * log_term).ceil();
    if !budget.is_finite() || budget < 2.0 {
        return Err(undefined(round, 0, delta));
    }
    Ok(budget as u64)
}

// ==================== Bounds ====================

/// Similarity threshold for one round, shared by every pair comparison
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "variant")]
pub enum ConfidenceBound {
    VarianceAware {
        /// C₁·ψ·L/n_k
        constant_term: f64,
        /// √(2·L/n_k), multiplied by √V̂_i + √V̂_j
        deviation_scale: f64,
    },
    VarianceAgnostic {
        threshold: f64,
    },
}

impl ConfidenceBound {
    /// Build the bound for round `round` with `samples` observations per arm
    pub fn for_round(
        variant: BoundVariant,
        round: u32,
        samples: u64,
        delta: f64,
        arms: usize,
    ) -> Result<Self> {
        match variant {
            BoundVariant::VarianceAware => Self::variance_aware(round, samples, delta, arms),
            BoundVariant::VarianceAgnostic => Self::variance_agnostic(round, samples, delta, arms),
        }
    }

    pub fn variance_aware(round: u32, samples: u64, delta: f64, arms: usize) -> Result<Self> {
        if samples == 0 {
            return Err(undefined(round, samples, delta));
        }
        let delta_k = round_delta(delta, round);
        let log_value = bounded_log(8.0 * pair_multiplicity(arms) / delta_k)
            .ok_or_else(|| undefined(round, samples, delta))?;

        let log_ratio = log_value / samples as f64;
        Ok(ConfidenceBound::VarianceAware {
            constant_term: VARIANCE_AWARE_CONSTANT * KERNEL_RANGE.sqrt() * log_ratio,
            deviation_scale: (2.0 * log_ratio).sqrt(),
        })
    }

    pub fn variance_agnostic(round: u32, samples: u64, delta: f64, arms: usize) -> Result<Self> {
        if samples == 0 {
            return Err(undefined(round, samples, delta));
        }
        let delta_k = round_delta(delta, round);
        let log_value = bounded_log(2.0 * pair_multiplicity(arms) / delta_k)
            .ok_or_else(|| undefined(round, samples, delta))?;

        let n = samples as f64;
        let threshold =
            2.0 * (KERNEL_RANGE / n).sqrt() + 2.0 * (2.0 * KERNEL_RANGE * log_value / n).sqrt();
        Ok(ConfidenceBound::VarianceAgnostic { threshold })
    }

    /// Threshold for the pair (i, j) given their variance estimates
    ///
    /// Negative variance estimates count as zero here.
    pub fn threshold(&self, variance_i: f64, variance_j: f64) -> f64 {
        match *self {
            ConfidenceBound::VarianceAware {
                constant_term,
                deviation_scale,
            } => {
                let spread = variance_i.max(0.0).sqrt() + variance_j.max(0.0).sqrt();
                constant_term + spread * deviation_scale
            }
            ConfidenceBound::VarianceAgnostic { threshold } => threshold,
        }
    }

    /// Whether an estimated distance is within the bound
    pub fn indistinguishable(&self, distance: f64, variance_i: f64, variance_j: f64) -> bool {
        distance <= self.threshold(variance_i, variance_j)
    }
}
