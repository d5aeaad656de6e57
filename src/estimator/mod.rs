//! Kernel variance and kernel distance estimators
//!
//! For a batch x_1..x_n of one arm:
//! - V̂ = (1/(n-1)) · Σ_t [ k(x_t, x_t) − (1/n)·Σ_s k(x_t, x_s) ]
//!
//! For equal-length batches a, b of two arms:
//! - d̂² = (1/n²) · Σ_{k,l} [ k(a_k, a_l) − 2·k(a_k, b_l) + k(b_k, b_l) ]
//! - d̂ = √max(0, d̂²)
//!
//! Both reduce to three kinds of kernel sums: the self-similarity sum of each
//! arm and the cross-similarity sum of each pair. A round evaluates every
//! self sum once (variance task) and every cross sum once (distance task) in a
//! single rayon pass, then assembles variances and distances by index.

use std::cmp::Ordering;

use rayon::prelude::*;

use crate::error::{ClusterError, Result, TaskTarget};
use crate::kernel::kernel;
use crate::types::Observation;

// ==================== Kernel Sums ====================

/// Self-similarity sums of one batch
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SelfSimilarity {
    /// Σ_t k(x_t, x_t)
    pub diagonal: f64,
    /// Σ_{t,s} k(x_t, x_s)
    pub total: f64,
}

/// Σ_{t,s} k(x_t, x_s), evaluating each unordered pair once
pub fn self_similarity(samples: &[Observation]) -> Result<SelfSimilarity> {
    let mut diagonal = 0.0;
    let mut off_diagonal = 0.0;

    for (t, x) in samples.iter().enumerate() {
        diagonal += kernel(x, x)?;
        for y in &samples[..t] {
            off_diagonal += kernel(x, y)?;
        }
    }

    Ok(SelfSimilarity {
        diagonal,
        total: diagonal + 2.0 * off_diagonal,
    })
}

/// Σ_{k,l} k(a_k, b_l)
///
/// The two batches are put in a canonical order first, so the floating-point
/// summation order (and therefore the result) does not depend on which batch
/// is passed first.
pub fn cross_similarity(a: &[Observation], b: &[Observation]) -> Result<f64> {
    let (first, second) = canonical_order(a, b);
    let mut sum = 0.0;
    for x in first {
        for y in second {
            sum += kernel(x, y)?;
        }
    }
    Ok(sum)
}

fn canonical_order<'a>(
    a: &'a [Observation],
    b: &'a [Observation],
) -> (&'a [Observation], &'a [Observation]) {
    let ordering = a
        .iter()
        .flatten()
        .zip(b.iter().flatten())
        .map(|(x, y)| x.total_cmp(y))
        .find(|o| o.is_ne())
        .unwrap_or(Ordering::Equal);

    if ordering == Ordering::Greater {
        (b, a)
    } else {
        (a, b)
    }
}

fn variance_from_sums(n: usize, sums: &SelfSimilarity) -> f64 {
    let n = n as f64;
    (sums.diagonal - sums.total / n) / (n - 1.0)
}

fn distance_from_sums(n: usize, self_a: f64, self_b: f64, cross: f64) -> f64 {
    let n = n as f64;
    let d_squared = (self_a + self_b - 2.0 * cross) / (n * n);
    // The statistic can dip below zero on small batches
    d_squared.max(0.0).sqrt()
}

// ==================== Estimators ====================

/// Unbiased kernel variance estimate of one arm's batch
///
/// The value can be slightly negative from sampling noise and is returned
/// unclamped.
pub fn estimate_variance(samples: &[Observation]) -> Result<f64> {
    let n = samples.len();
    if n < 2 {
        return Err(ClusterError::InsufficientSamples {
            samples: n,
            required: 2,
        });
    }
    let sums = self_similarity(samples)?;
    Ok(variance_from_sums(n, &sums))
}

/// Kernel distance estimate between two equal-length batches
pub fn estimate_distance(a: &[Observation], b: &[Observation]) -> Result<f64> {
    if a.len() != b.len() {
        return Err(ClusterError::BatchLengthMismatch {
            left: a.len(),
            right: b.len(),
        });
    }
    if a.is_empty() {
        return Err(ClusterError::InsufficientSamples {
            samples: 0,
            required: 1,
        });
    }

    let self_a = self_similarity(a)?.total;
    let self_b = self_similarity(b)?.total;
    let cross = cross_similarity(a, b)?;
    Ok(distance_from_sums(a.len(), self_a, self_b, cross))
}

// ==================== Round Tasks ====================

/// Result of one estimation task
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TaskOutput {
    Variance {
        arm: usize,
        sums: SelfSimilarity,
        variance: f64,
    },
    Distance {
        first: usize,
        second: usize,
        cross: f64,
    },
}

/// An independent unit of estimation work within a round
pub trait EstimationTask: Send + Sync {
    /// Arm or pair this task covers
    fn target(&self) -> TaskTarget;

    fn run(&self) -> Result<TaskOutput>;
}

/// Self-similarity and variance of one arm
#[derive(Debug, Clone, Copy)]
pub struct VarianceTask<'a> {
    pub arm: usize,
    pub samples: &'a [Observation],
}

impl EstimationTask for VarianceTask<'_> {
    fn target(&self) -> TaskTarget {
        TaskTarget::Arm(self.arm)
    }

    fn run(&self) -> Result<TaskOutput> {
        let n = self.samples.len();
        if n < 2 {
            return Err(ClusterError::InsufficientSamples {
                samples: n,
                required: 2,
            });
        }
        let sums = self_similarity(self.samples)?;
        Ok(TaskOutput::Variance {
            arm: self.arm,
            sums,
            variance: variance_from_sums(n, &sums),
        })
    }
}

/// Cross-similarity of one unordered arm pair (first > second)
#[derive(Debug, Clone, Copy)]
pub struct DistanceTask<'a> {
    pub first: usize,
    pub second: usize,
    pub left: &'a [Observation],
    pub right: &'a [Observation],
}

impl EstimationTask for DistanceTask<'_> {
    fn target(&self) -> TaskTarget {
        TaskTarget::Pair(self.first, self.second)
    }

    fn run(&self) -> Result<TaskOutput> {
        if self.left.len() != self.right.len() {
            return Err(ClusterError::BatchLengthMismatch {
                left: self.left.len(),
                right: self.right.len(),
            });
        }
        Ok(TaskOutput::Distance {
            first: self.first,
            second: self.second,
            cross: cross_similarity(self.left, self.right)?,
        })
    }
}

/// Work item scheduled in the round's parallel pass
#[derive(Debug, Clone, Copy)]
pub enum WorkItem<'a> {
    Variance(VarianceTask<'a>),
    Distance(DistanceTask<'a>),
}

impl WorkItem<'_> {
    pub fn task(&self) -> &dyn EstimationTask {
        match self {
            WorkItem::Variance(task) => task,
            WorkItem::Distance(task) => task,
        }
    }
}

/// One variance task per arm, then one distance task per pair (i > j)
pub fn plan_round(batches: &[Vec<Observation>]) -> Vec<WorkItem<'_>> {
    let arms = batches.len();
    let mut items = Vec::with_capacity(arms + arms * arms.saturating_sub(1) / 2);

    for (arm, samples) in batches.iter().enumerate() {
        items.push(WorkItem::Variance(VarianceTask { arm, samples }));
    }
    for first in 0..arms {
        for second in 0..first {
            items.push(WorkItem::Distance(DistanceTask {
                first,
                second,
                left: &batches[first],
                right: &batches[second],
            }));
        }
    }

    items
}

// ==================== Round Estimates ====================

/// Dense symmetric distance matrix with zero diagonal (row-major)
#[derive(Debug, Clone, PartialEq)]
pub struct DistanceMatrix {
    size: usize,
    values: Vec<f64>,
}

impl DistanceMatrix {
    pub fn zeros(size: usize) -> Self {
        Self {
            size,
            values: vec![0.0; size * size],
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.values[i * self.size + j]
    }

    /// Writes both (i, j) and (j, i)
    pub fn set(&mut self, i: usize, j: usize, value: f64) {
        self.values[i * self.size + j] = value;
        self.values[j * self.size + i] = value;
    }
}

/// Variances and distances from one round of batches
#[derive(Debug, Clone, PartialEq)]
pub struct RoundEstimates {
    pub variances: Vec<f64>,
    pub distances: DistanceMatrix,
}

/// Run all variance and distance tasks for a round in one parallel pass
///
/// The first failing task aborts the round; its error is tagged with the
/// round index and the arm or pair involved.
pub fn estimate_round(round: u32, batches: &[Vec<Observation>]) -> Result<RoundEstimates> {
    let arms = batches.len();
    let items = plan_round(batches);

    let outputs = items
        .par_iter()
        .map(|item| {
            let task = item.task();
            task.run().map_err(|err| err.in_task(round, task.target()))
        })
        .collect::<Result<Vec<TaskOutput>>>()?;

    let mut variances = vec![0.0; arms];
    let mut self_sums = vec![0.0; arms];
    let mut cross_sums = Vec::with_capacity(outputs.len().saturating_sub(arms));

    for output in outputs {
        match output {
            TaskOutput::Variance {
                arm,
                sums,
                variance,
            } => {
                variances[arm] = variance;
                self_sums[arm] = sums.total;
            }
            TaskOutput::Distance {
                first,
                second,
                cross,
            } => cross_sums.push((first, second, cross)),
        }
    }

    let mut distances = DistanceMatrix::zeros(arms);
    for (first, second, cross) in cross_sums {
        let n = batches[first].len();
        let distance = distance_from_sums(n, self_sums[first], self_sums[second], cross);
        distances.set(first, second, distance);
    }

    Ok(RoundEstimates {
        variances,
        distances,
    })
}
