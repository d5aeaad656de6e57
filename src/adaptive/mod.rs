//! Adaptive round controller
//!
//! Runs rounds k = 2, 3, 4, … with budgets n_k that roughly double each
//! round. Every round draws a fresh batch of n_k observations per arm,
//! estimates variances and distances, links every pair whose distance is
//! within the round's confidence bound, and takes the connected components
//! of that graph as the current clustering. The run stops at the first round
//! with at least K components.
//!
//! There is no built-in round cap. If K exceeds the number of arms, or the
//! arms never separate, the loop only stops at the caller's `max_rounds`
//! (when set); otherwise it keeps going with ever larger batches.

use std::ops::ControlFlow;

use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info, trace, warn};

use crate::arm::Arm;
use crate::bounds::{round_delta, sample_budget, ConfidenceBound};
use crate::complexity::theoretical_complexity;
use crate::error::{ClusterError, Result, TaskTarget};
use crate::estimator::{estimate_round, RoundEstimates};
use crate::graph::IndistinguishabilityGraph;
use crate::types::{
    BoundVariant, ClusteringConfig, ClusteringResult, Observation, RoundReport, FIRST_ROUND,
};
use crate::validate::validate_batch;

// ==================== Sample Ledger ====================

/// Running sample count, folded over the executed rounds
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SampleLedger {
    pub rounds: u32,
    pub total_samples: u64,
}

impl SampleLedger {
    /// Ledger after one more round of `samples_per_arm` draws on `arms` arms
    pub fn record(self, arms: usize, samples_per_arm: u64) -> Self {
        Self {
            rounds: self.rounds + 1,
            total_samples: self
                .total_samples
                .saturating_add((arms as u64).saturating_mul(samples_per_arm)),
        }
    }
}

/// Everything one round produced
#[derive(Debug, Clone)]
pub struct RoundOutcome {
    pub report: RoundReport,
    pub clusters: Vec<Vec<usize>>,
    pub estimates: RoundEstimates,
}

/// State carried from one round to the next
#[derive(Debug, Default)]
struct RunProgress {
    ledger: SampleLedger,
    reports: Vec<RoundReport>,
    theoretical_bound: Option<f64>,
    last_components: usize,
}

// ==================== Controller ====================

/// Adaptive clustering of arms into K groups
#[derive(Debug, Clone)]
pub struct AdaptiveClusterer {
    config: ClusteringConfig,
}

impl AdaptiveClusterer {
    pub fn new(config: ClusteringConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &ClusteringConfig {
        &self.config
    }

    /// Run with a `ChaCha8Rng` seeded from the config (or the clock)
    pub fn run<A: Arm>(&self, arms: &[A]) -> Result<ClusteringResult> {
        let seed = self.config.seed.unwrap_or_else(|| {
            use std::time::{SystemTime, UNIX_EPOCH};
            SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_nanos() as u64)
                .unwrap_or(42)
        });
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        self.run_with_rng(arms, &mut rng)
    }

    /// Run with a caller-supplied random source
    pub fn run_with_rng<A: Arm>(
        &self,
        arms: &[A],
        rng: &mut dyn RngCore,
    ) -> Result<ClusteringResult> {
        if arms.is_empty() {
            return Err(ClusterError::InvalidConfig(
                "at least one arm is required".to_string(),
            ));
        }

        let variant = self.config.variant;
        let target = self.config.target_clusters;
        info!(
            algorithm = variant.name(),
            arms = arms.len(),
            delta = self.config.delta,
            target_clusters = target,
            "starting adaptive clustering"
        );
        if target > arms.len() && self.config.max_rounds.is_none() {
            warn!(
                target_clusters = target,
                arms = arms.len(),
                "target cluster count exceeds arm count; the run will not terminate"
            );
        }

        let labels: Vec<Option<usize>> = arms.iter().map(|arm| arm.cluster_label()).collect();

        let flow = (FIRST_ROUND..).try_fold(RunProgress::default(), |mut progress, round| {
            if let Some(max_rounds) = self.config.max_rounds {
                if progress.ledger.rounds >= max_rounds {
                    return ControlFlow::Break(Err(ClusterError::RoundLimitExceeded {
                        rounds: progress.ledger.rounds,
                        clusters: progress.last_components,
                        target,
                    }));
                }
            }

            let outcome = match self.execute_round(round, arms, rng) {
                Ok(outcome) => outcome,
                Err(err) => return ControlFlow::Break(Err(err)),
            };

            progress.ledger = progress
                .ledger
                .record(arms.len(), outcome.report.samples_per_arm);
            progress.last_components = outcome.clusters.len();
            progress.reports.push(outcome.report.clone());

            if round == FIRST_ROUND && variant == BoundVariant::VarianceAware {
                progress.theoretical_bound =
                    first_round_complexity(&labels, self.config.delta, &outcome.estimates);
            }

            if outcome.clusters.len() >= target {
                info!(
                    algorithm = variant.name(),
                    rounds = progress.ledger.rounds,
                    total_samples = progress.ledger.total_samples,
                    clusters = outcome.clusters.len(),
                    "adaptive clustering finished"
                );
                return ControlFlow::Break(Ok(ClusteringResult {
                    clusters: outcome.clusters,
                    total_samples: progress.ledger.total_samples,
                    theoretical_bound: progress.theoretical_bound,
                    rounds: progress.reports,
                }));
            }

            ControlFlow::Continue(progress)
        });

        match flow {
            ControlFlow::Break(result) => result,
            ControlFlow::Continue(progress) => Err(ClusterError::RoundLimitExceeded {
                rounds: progress.ledger.rounds,
                clusters: progress.last_components,
                target,
            }),
        }
    }

    /// Sample, estimate and cluster for a single round
    pub fn execute_round<A: Arm>(
        &self,
        round: u32,
        arms: &[A],
        rng: &mut dyn RngCore,
    ) -> Result<RoundOutcome> {
        let variant = self.config.variant;
        let delta = self.config.delta;
        let samples_per_arm = sample_budget(variant, round, delta, arms.len())?;
        let batch_len = usize::try_from(samples_per_arm)
            .map_err(|_| ClusterError::UndefinedConfidenceBound {
                round,
                samples: samples_per_arm,
                delta,
            })?;

        let batches = draw_batches(round, arms, batch_len, rng)?;
        let estimates = estimate_round(round, &batches)?;
        let graph = self.build_graph(round, samples_per_arm, &estimates)?;
        let clusters = graph.connected_components();

        debug!(
            round,
            samples_per_arm,
            edges = graph.edge_count(),
            components = clusters.len(),
            "round complete"
        );

        Ok(RoundOutcome {
            report: RoundReport {
                round,
                samples_per_arm,
                delta_k: round_delta(delta, round),
                components: clusters.len(),
            },
            clusters,
            estimates,
        })
    }

    fn build_graph(
        &self,
        round: u32,
        samples_per_arm: u64,
        estimates: &RoundEstimates,
    ) -> Result<IndistinguishabilityGraph> {
        let arms = estimates.variances.len();
        let mut graph = IndistinguishabilityGraph::new(arms);
        if arms < 2 {
            return Ok(graph);
        }

        let bound = ConfidenceBound::for_round(
            self.config.variant,
            round,
            samples_per_arm,
            self.config.delta,
            arms,
        )?;

        for i in 0..arms {
            for j in 0..i {
                let distance = estimates.distances.get(i, j);
                let threshold =
                    bound.threshold(estimates.variances[i], estimates.variances[j]);
                trace!(round, i, j, distance, threshold, "comparing arms");
                if distance <= threshold {
                    graph.connect(i, j);
                }
            }
        }

        Ok(graph)
    }
}

fn draw_batches<A: Arm>(
    round: u32,
    arms: &[A],
    samples_per_arm: usize,
    rng: &mut dyn RngCore,
) -> Result<Vec<Vec<Observation>>> {
    arms.iter()
        .enumerate()
        .map(|(index, arm)| {
            let batch = arm
                .sample(samples_per_arm, rng)
                .and_then(|batch| validate_batch(index, &batch, samples_per_arm).map(|_| batch))
                .map_err(|err| err.in_task(round, TaskTarget::Arm(index)))?;
            Ok(batch)
        })
        .collect()
}

fn first_round_complexity(
    labels: &[Option<usize>],
    delta: f64,
    estimates: &RoundEstimates,
) -> Option<f64> {
    match theoretical_complexity(labels, delta, estimates) {
        Ok(tau) => Some(tau),
        Err(err) => {
            warn!(error = %err, "theoretical bound unavailable");
            None
        }
    }
}

/// Cluster `arms` into at least `target_clusters` groups
///
/// Returns the partition, the total number of samples drawn and, for the
/// variance-aware variant, the theoretical bound τ when it is defined.
pub fn run_adaptive_clustering<A: Arm>(
    variant: BoundVariant,
    delta: f64,
    target_clusters: usize,
    arms: &[A],
    rng: &mut dyn RngCore,
) -> Result<ClusteringResult> {
    AdaptiveClusterer::new(ClusteringConfig::new(variant, delta, target_clusters))?
        .run_with_rng(arms, rng)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arm::GaussianArm;

    /// Arm returning fixed observations on every call
    struct FixedArm {
        value: Vec<f64>,
        jitter: f64,
    }

    impl Arm for FixedArm {
        fn sample(&self, n: usize, rng: &mut dyn RngCore) -> Result<Vec<Observation>> {
            Ok((0..n)
                .map(|_| {
                    self.value
                        .iter()
                        .map(|v| v + self.jitter * (rng.gen::<f64>() - 0.5))
                        .collect()
                })
                .collect())
        }
    }

    /// Arm that returns one observation too few
    struct ShortArm;

    impl Arm for ShortArm {
        fn sample(&self, n: usize, _rng: &mut dyn RngCore) -> Result<Vec<Observation>> {
            Ok(vec![vec![0.0]; n.saturating_sub(1)])
        }
    }

    /// Arm whose sampler always fails
    struct BrokenArm;

    impl Arm for BrokenArm {
        fn sample(&self, _n: usize, _rng: &mut dyn RngCore) -> Result<Vec<Observation>> {
            Err(ClusterError::Arm {
                arm: 0,
                message: "sensor offline".to_string(),
            })
        }
    }

    fn clusterer(variant: BoundVariant, target: usize) -> AdaptiveClusterer {
        AdaptiveClusterer::new(ClusteringConfig::new(variant, 0.5, target).with_seed(7)).unwrap()
    }

    #[test]
    fn test_ledger_fold() {
        let ledger = [33u64, 80, 190]
            .iter()
            .fold(SampleLedger::default(), |ledger, &n| ledger.record(4, n));
        assert_eq!(ledger.rounds, 3);
        assert_eq!(ledger.total_samples, 4 * (33 + 80 + 190));
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let config = ClusteringConfig::new(BoundVariant::VarianceAware, 1.5, 2);
        assert!(matches!(
            AdaptiveClusterer::new(config),
            Err(ClusterError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_no_arms_is_rejected() {
        let arms: Vec<GaussianArm> = Vec::new();
        let err = clusterer(BoundVariant::VarianceAware, 1).run(&arms).unwrap_err();
        assert!(matches!(err, ClusterError::InvalidConfig(_)));
    }

    #[test]
    fn test_far_apart_arms_separate() {
        // points 1000 apart have kernel similarity ~0, so d̂ is close to √2
        let arms = vec![
            FixedArm { value: vec![0.0], jitter: 0.0 },
            FixedArm { value: vec![1000.0], jitter: 0.0 },
            FixedArm { value: vec![0.0], jitter: 0.0 },
        ];

        for variant in [BoundVariant::VarianceAware, BoundVariant::VarianceAgnostic] {
            let result = clusterer(variant, 2).run(&arms).unwrap();
            assert_eq!(result.clusters, vec![vec![0, 2], vec![1]]);
            assert_eq!(result.rounds[0].round, FIRST_ROUND);

            let mut expected_total = 0;
            for report in &result.rounds {
                let n = sample_budget(variant, report.round, 0.5, 3).unwrap();
                assert_eq!(report.samples_per_arm, n);
                expected_total += 3 * n;
            }
            assert_eq!(result.total_samples, expected_total);
            assert_eq!(result.rounds.last().map(|r| r.components), Some(2));
        }
    }

    #[test]
    fn test_round_cap_stops_unsatisfiable_run() {
        let arms = vec![
            FixedArm { value: vec![0.0], jitter: 1.0 },
            FixedArm { value: vec![0.0], jitter: 1.0 },
        ];
        let clusterer = AdaptiveClusterer::new(
            ClusteringConfig::new(BoundVariant::VarianceAgnostic, 0.5, 2)
                .with_seed(3)
                .with_max_rounds(3),
        )
        .unwrap();

        let err = clusterer.run(&arms).unwrap_err();
        assert_eq!(
            err,
            ClusterError::RoundLimitExceeded {
                rounds: 3,
                clusters: 1,
                target: 2
            }
        );
    }

    #[test]
    fn test_short_batch_aborts_round() {
        let arms: Vec<Box<dyn Arm>> = vec![
            Box::new(FixedArm { value: vec![0.0], jitter: 0.0 }),
            Box::new(ShortArm),
        ];
        let err = clusterer(BoundVariant::VarianceAware, 2).run(&arms).unwrap_err();

        match err {
            ClusterError::Task { round, task, source } => {
                assert_eq!(round, FIRST_ROUND);
                assert_eq!(task, TaskTarget::Arm(1));
                assert!(matches!(*source, ClusterError::SampleCountMismatch { arm: 1, .. }));
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_sampler_failure_is_tagged_with_round() {
        let arms: Vec<Box<dyn Arm>> = vec![Box::new(BrokenArm)];
        let err = clusterer(BoundVariant::VarianceAgnostic, 1).run(&arms).unwrap_err();

        assert!(err.to_string().contains("sensor offline"));
        assert!(matches!(
            err,
            ClusterError::Task {
                round: 2,
                task: TaskTarget::Arm(0),
                ..
            }
        ));
    }

    #[test]
    fn test_dimension_mismatch_names_pair() {
        let arms = vec![
            FixedArm { value: vec![0.0, 0.0], jitter: 0.1 },
            FixedArm { value: vec![0.0], jitter: 0.1 },
        ];
        let err = clusterer(BoundVariant::VarianceAgnostic, 2).run(&arms).unwrap_err();
        assert!(matches!(
            err,
            ClusterError::Task {
                round: 2,
                task: TaskTarget::Pair(1, 0),
                ..
            }
        ));
    }

    #[test]
    fn test_execute_round_report() {
        let arms = vec![
            GaussianArm::isotropic(vec![0.0, 0.0], 1.0, Some(0)).unwrap(),
            GaussianArm::isotropic(vec![0.0, 0.0], 1.0, Some(0)).unwrap(),
        ];
        let clusterer = clusterer(BoundVariant::VarianceAware, 1);
        let mut rng = ChaCha8Rng::seed_from_u64(5);

        let outcome = clusterer.execute_round(3, &arms, &mut rng).unwrap();
        assert_eq!(outcome.report.round, 3);
        assert_eq!(
            outcome.report.samples_per_arm,
            sample_budget(BoundVariant::VarianceAware, 3, 0.5, 2).unwrap()
        );
        assert!((outcome.report.delta_k - 0.5 / 36.0).abs() < 1e-15);
        assert_eq!(outcome.clusters, vec![vec![0, 1]]);
        assert_eq!(outcome.report.components, 1);
    }

    #[test]
    fn test_variance_agnostic_has_no_theoretical_bound() {
        let arms = vec![
            FixedArm { value: vec![0.0], jitter: 0.0 },
            FixedArm { value: vec![1000.0], jitter: 0.0 },
        ];
        let result = clusterer(BoundVariant::VarianceAgnostic, 2).run(&arms).unwrap();
        assert_eq!(result.theoretical_bound, None);
    }

    #[test]
    fn test_unlabeled_arms_have_no_theoretical_bound() {
        let arms = vec![
            FixedArm { value: vec![0.0], jitter: 0.0 },
            FixedArm { value: vec![1000.0], jitter: 0.0 },
        ];
        let result = clusterer(BoundVariant::VarianceAware, 2).run(&arms).unwrap();
        assert_eq!(result.clusters.len(), 2);
        assert_eq!(result.theoretical_bound, None);
    }

    #[test]
    fn test_free_function_entry_point() {
        let arms = vec![GaussianArm::isotropic(vec![0.0], 1.0, Some(0)).unwrap()];
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let result =
            run_adaptive_clustering(BoundVariant::VarianceAware, 0.5, 1, &arms, &mut rng).unwrap();
        assert_eq!(result.clusters, vec![vec![0]]);
    }
}
