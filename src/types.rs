use serde::{Deserialize, Serialize};

use crate::error::{ClusterError, Result};

// ==================== Constants ====================

/// Fixed bandwidth h of the Gaussian kernel exp(-‖x - y‖² / h)
pub const KERNEL_BANDWIDTH: f64 = 5000.0;

/// First round of the adaptive schedule
pub const FIRST_ROUND: u32 = 2;

/// Leading constant C₁ of the variance-aware bound
pub const VARIANCE_AWARE_CONSTANT: f64 = 32.0 / 3.0;

/// Kernel-range constant ψ (the kernel is bounded by 1)
pub const KERNEL_RANGE: f64 = 1.0;

/// Union-bound multiplier inside the VKABC sample budget
pub const VARIANCE_AWARE_BUDGET_FACTOR: f64 = 32.0;

/// Union-bound multiplier inside the KABC sample budget
pub const VARIANCE_AGNOSTIC_BUDGET_FACTOR: f64 = 8.0;

/// One observation vector in ℝ^d
pub type Observation = Vec<f64>;

// ==================== Configuration ====================

/// Which confidence bound drives the adaptive loop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BoundVariant {
    /// VKABC: Bernstein-style bound using per-arm variance estimates
    VarianceAware,
    /// KABC: worst-case bound independent of the arms' variances
    VarianceAgnostic,
}

impl BoundVariant {
    pub fn name(&self) -> &'static str {
        match self {
            BoundVariant::VarianceAware => "VKABC",
            BoundVariant::VarianceAgnostic => "KABC",
        }
    }
}

/// Parameters of one clustering run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusteringConfig {
    pub variant: BoundVariant,
    /// Overall failure probability δ ∈ (0, 1)
    pub delta: f64,
    /// Target number of clusters K
    pub target_clusters: usize,
    /// Optional cap on executed rounds; `None` keeps the loop unbounded
    #[serde(default)]
    pub max_rounds: Option<u32>,
    /// Seed for the run's RNG when none is injected
    #[serde(default)]
    pub seed: Option<u64>,
}

impl ClusteringConfig {
    pub fn new(variant: BoundVariant, delta: f64, target_clusters: usize) -> Self {
        Self {
            variant,
            delta,
            target_clusters,
            max_rounds: None,
            seed: None,
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_max_rounds(mut self, max_rounds: u32) -> Self {
        self.max_rounds = Some(max_rounds);
        self
    }

    /// Check parameter ranges
    pub fn validate(&self) -> Result<()> {
        if !(self.delta > 0.0 && self.delta < 1.0) {
            return Err(ClusterError::InvalidConfig(format!(
                "delta must lie in (0, 1), got {}",
                self.delta
            )));
        }
        if self.target_clusters == 0 {
            return Err(ClusterError::InvalidConfig(
                "target cluster count must be at least 1".to_string(),
            ));
        }
        if self.max_rounds == Some(0) {
            return Err(ClusterError::InvalidConfig(
                "max_rounds must be at least 1 when set".to_string(),
            ));
        }
        Ok(())
    }
}

// ==================== Results ====================

/// Diagnostics for one executed round
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoundReport {
    pub round: u32,
    pub samples_per_arm: u64,
    pub delta_k: f64,
    pub components: usize,
}

/// Outcome of a clustering run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusteringResult {
    /// Partition of arm indices into connected components
    pub clusters: Vec<Vec<usize>>,
    /// Σ N·n_k over all executed rounds
    pub total_samples: u64,
    /// τ, only for the variance-aware variant and only when defined
    pub theoretical_bound: Option<f64>,
    pub rounds: Vec<RoundReport>,
}

impl ClusteringResult {
    pub fn cluster_count(&self) -> usize {
        self.clusters.len()
    }

    /// Cluster index per arm, for arms `0..arm_count`
    ///
    /// `arm_count` must cover every arm in the partition. Debug builds assert
    /// this; release builds skip members at or above `arm_count`.
    pub fn labels(&self, arm_count: usize) -> Vec<Option<usize>> {
        let mut labels = vec![None; arm_count];
        for (cluster, members) in self.clusters.iter().enumerate() {
            for &arm in members {
                debug_assert!(
                    arm < arm_count,
                    "arm {arm} in cluster {cluster} is outside 0..{arm_count}"
                );
                if let Some(slot) = labels.get_mut(arm) {
                    *slot = Some(cluster);
                }
            }
        }
        labels
    }
}
