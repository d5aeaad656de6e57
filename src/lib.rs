//! # kabc - adaptive kernel-based clustering of arms
//!
//! Given N arms (distributions that can only be sampled), find which arms
//! share an underlying distribution with as few samples as possible, at
//! confidence 1 − δ.
//!
//! - **VKABC** - variance-aware confidence bound, tighter for low-variance arms
//! - **KABC** - variance-agnostic worst-case bound
//!
//! ## Modules
//!
//! - [`kernel`] - Gaussian kernel with fixed bandwidth
//! - [`estimator`] - kernel variance / distance estimators, parallel round pass
//! - [`bounds`] - per-round confidence bounds and sample budgets
//! - [`graph`] - indistinguishability graph, connected components
//! - [`adaptive`] - adaptive round controller
//! - [`complexity`] - theoretical sample complexity τ
//! - [`arm`] - arm capability, Gaussian and mixture arms
//!
//! ## Example
//!
//! ```rust
//! use kabc::{AdaptiveClusterer, BoundVariant, ClusteringConfig, GaussianArm};
//!
//! let arms = vec![
//!     GaussianArm::isotropic(vec![0.0, 0.0], 1.0, Some(0)).unwrap(),
//!     GaussianArm::isotropic(vec![500.0, 0.0], 1.0, Some(1)).unwrap(),
//! ];
//! let config = ClusteringConfig::new(BoundVariant::VarianceAware, 0.5, 2).with_seed(7);
//! let result = AdaptiveClusterer::new(config).unwrap().run(&arms).unwrap();
//! assert_eq!(result.clusters, vec![vec![0], vec![1]]);
//! ```

#![deny(clippy::all)]

pub mod adaptive;
pub mod arm;
pub mod bounds;
pub mod complexity;
pub mod error;
pub mod estimator;
pub mod graph;
pub mod kernel;
pub mod logging;
pub mod matrix;
pub mod types;
pub mod validate;

pub use adaptive::{run_adaptive_clustering, AdaptiveClusterer, RoundOutcome, SampleLedger};
pub use arm::{Arm, GaussianArm, MixtureArm};
pub use bounds::{round_delta, sample_budget, ConfidenceBound};
pub use complexity::theoretical_complexity;
pub use error::{ClusterError, Result, TaskTarget};
pub use estimator::{estimate_distance, estimate_round, estimate_variance, RoundEstimates};
pub use graph::{connected_components, IndistinguishabilityGraph};
pub use kernel::kernel;
pub use types::*;
