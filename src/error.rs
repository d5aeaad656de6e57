//! Error taxonomy for the clustering engine.

use std::fmt;

use thiserror::Error;

/// Unit of estimation work that failed inside a round.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskTarget {
    /// Per-arm self-similarity / variance task
    Arm(usize),
    /// Per-pair cross-similarity task, stored as (i, j) with i > j
    Pair(usize, usize),
}

impl fmt::Display for TaskTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskTarget::Arm(arm) => write!(f, "arm {arm}"),
            TaskTarget::Pair(i, j) => write!(f, "pair ({i}, {j})"),
        }
    }
}

/// Errors raised by the clustering engine
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ClusterError {
    #[error("dimension mismatch: expected {expected}, found {found}")]
    DimensionMismatch { expected: usize, found: usize },

    #[error("insufficient samples: need at least {required}, got {samples}")]
    InsufficientSamples { samples: usize, required: usize },

    #[error("batch lengths differ: {left} vs {right}")]
    BatchLengthMismatch { left: usize, right: usize },

    #[error("arm {arm} returned {found} observations, expected {expected}")]
    SampleCountMismatch {
        arm: usize,
        expected: usize,
        found: usize,
    },

    #[error("arm {arm} produced a non-finite value in observation {index}")]
    NonFiniteObservation { arm: usize, index: usize },

    #[error("confidence bound undefined at round {round} (n = {samples}, delta = {delta})")]
    UndefinedConfidenceBound { round: u32, samples: u64, delta: f64 },

    #[error("theoretical complexity bound unavailable: {reason}")]
    DegenerateComplexityBound { reason: String },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("no clustering with {target} components after {rounds} rounds (last round found {clusters})")]
    RoundLimitExceeded {
        rounds: u32,
        clusters: usize,
        target: usize,
    },

    #[error("round {round}: {task} failed: {source}")]
    Task {
        round: u32,
        task: TaskTarget,
        #[source]
        source: Box<ClusterError>,
    },

    #[error("arm {arm}: {message}")]
    Arm { arm: usize, message: String },
}

impl ClusterError {
    /// Attach the round index and failing task to a task-level error
    pub fn in_task(self, round: u32, task: TaskTarget) -> Self {
        ClusterError::Task {
            round,
            task,
            source: Box::new(self),
        }
    }
}

pub type Result<T> = std::result::Result<T, ClusterError>;
