//! Arms: sampleable sources of observations
//!
//! The clustering engine only ever calls [`Arm::sample`]. Each call must
//! return fresh, independent draws. The random source is passed in by the
//! caller so seeded runs are reproducible.
//!
//! Two reference arms are provided: a multivariate Gaussian and a two-component
//! Gaussian mixture.

use rand::prelude::*;

use crate::error::{ClusterError, Result};
use crate::matrix::{cholesky_decompose, lower_mat_vec_mul};
use crate::types::Observation;

/// Floor for the uniform draw in Box-Muller, keeps ln(u) finite
const MIN_UNIFORM: f64 = 1e-300;

/// An independently sampleable distribution
pub trait Arm {
    /// Draw `n` fresh observations
    fn sample(&self, n: usize, rng: &mut dyn RngCore) -> Result<Vec<Observation>>;

    /// Ground-truth cluster label, used only for evaluation
    fn cluster_label(&self) -> Option<usize> {
        None
    }
}

impl<A: Arm + ?Sized> Arm for Box<A> {
    fn sample(&self, n: usize, rng: &mut dyn RngCore) -> Result<Vec<Observation>> {
        (**self).sample(n, rng)
    }

    fn cluster_label(&self) -> Option<usize> {
        (**self).cluster_label()
    }
}

impl<A: Arm + ?Sized> Arm for &A {
    fn sample(&self, n: usize, rng: &mut dyn RngCore) -> Result<Vec<Observation>> {
        (**self).sample(n, rng)
    }

    fn cluster_label(&self) -> Option<usize> {
        (**self).cluster_label()
    }
}

/// Standard normal via Box-Muller
fn standard_normal(rng: &mut dyn RngCore) -> f64 {
    let u1: f64 = rng.gen::<f64>().max(MIN_UNIFORM);
    let u2: f64 = rng.gen();
    (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()
}

// ==================== Gaussian ====================

/// Multivariate normal N(mean, covariance)
#[derive(Debug, Clone, PartialEq)]
pub struct GaussianArm {
    mean: Vec<f64>,
    /// Lower Cholesky factor of the covariance
    factor: Vec<f64>,
    label: Option<usize>,
}

impl GaussianArm {
    /// Build from a mean and a covariance given as rows
    ///
    /// Fails when the covariance is not d×d, not symmetric, or not positive
    /// semi-definite. Singular covariances are accepted.
    pub fn new(mean: Vec<f64>, covariance: &[Vec<f64>], label: Option<usize>) -> Result<Self> {
        let d = mean.len();
        if d == 0 {
            return Err(ClusterError::InvalidConfig(
                "mean must have at least one dimension".to_string(),
            ));
        }
        if covariance.len() != d {
            return Err(ClusterError::DimensionMismatch {
                expected: d,
                found: covariance.len(),
            });
        }

        let mut flat = Vec::with_capacity(d * d);
        for row in covariance {
            if row.len() != d {
                return Err(ClusterError::DimensionMismatch {
                    expected: d,
                    found: row.len(),
                });
            }
            flat.extend_from_slice(row);
        }

        Ok(Self {
            factor: cholesky_decompose(&flat, d)?,
            mean,
            label,
        })
    }

    /// N(mean, variance·I)
    pub fn isotropic(mean: Vec<f64>, variance: f64, label: Option<usize>) -> Result<Self> {
        let d = mean.len();
        let covariance: Vec<Vec<f64>> = (0..d)
            .map(|i| (0..d).map(|j| if i == j { variance } else { 0.0 }).collect())
            .collect();
        Self::new(mean, &covariance, label)
    }

    pub fn dimension(&self) -> usize {
        self.mean.len()
    }

    pub fn mean(&self) -> &[f64] {
        &self.mean
    }

    fn draw(&self, rng: &mut dyn RngCore) -> Observation {
        let d = self.dimension();
        let z: Vec<f64> = (0..d).map(|_| standard_normal(rng)).collect();
        lower_mat_vec_mul(&self.factor, &z, d)
            .into_iter()
            .zip(&self.mean)
            .map(|(offset, &mu)| mu + offset)
            .collect()
    }
}

impl Arm for GaussianArm {
    fn sample(&self, n: usize, rng: &mut dyn RngCore) -> Result<Vec<Observation>> {
        Ok((0..n).map(|_| self.draw(rng)).collect())
    }

    fn cluster_label(&self) -> Option<usize> {
        self.label
    }
}

// ==================== Mixture ====================

/// Two-component Gaussian mixture: each observation comes from `secondary`
/// with probability `mix` and from `primary` otherwise
#[derive(Debug, Clone, PartialEq)]
pub struct MixtureArm {
    primary: GaussianArm,
    secondary: GaussianArm,
    mix: f64,
    label: Option<usize>,
}

impl MixtureArm {
    pub fn new(
        primary: GaussianArm,
        secondary: GaussianArm,
        mix: f64,
        label: Option<usize>,
    ) -> Result<Self> {
        if !(0.0..=1.0).contains(&mix) {
            return Err(ClusterError::InvalidConfig(format!(
                "mixing weight must lie in [0, 1], got {mix}"
            )));
        }
        if primary.dimension() != secondary.dimension() {
            return Err(ClusterError::DimensionMismatch {
                expected: primary.dimension(),
                found: secondary.dimension(),
            });
        }
        Ok(Self {
            primary,
            secondary,
            mix,
            label,
        })
    }

    pub fn mix(&self) -> f64 {
        self.mix
    }
}

impl Arm for MixtureArm {
    fn sample(&self, n: usize, rng: &mut dyn RngCore) -> Result<Vec<Observation>> {
        Ok((0..n)
            .map(|_| {
                let u: f64 = rng.gen();
                if u < self.mix {
                    self.secondary.draw(rng)
                } else {
                    self.primary.draw(rng)
                }
            })
            .collect())
    }

    fn cluster_label(&self) -> Option<usize> {
        self.label
    }
}
