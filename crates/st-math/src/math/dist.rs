//! Continuous-distribution models with incremental update.
//!
//! Detectors are polymorphic over a small capability set: incorporate a new
//! scalar observation as the `new_n`-th point (`with_point`), query the
//! density at a point (`pdf`), and expose summary statistics. The concrete
//! variants live in a tagged enum so that `with_point` stays monomorphic
//! and serialization is trivial.
//!
//! # Parameterization
//!
//! [`NormalDistribution`] tracks `(mean, variance, n)` and updates with
//! Welford's recurrence:
//!
//! ```text
//! mean'     = mean + (x - mean) / n'
//! M2'       = variance * (n' - 1) + (x - mean)(x - mean')
//! variance' = M2' / n'
//! ```
//!
//! A single sample pins the mean at the observation and initializes the
//! variance to the small positive floor [`VARIANCE_FLOOR`], which keeps
//! `pdf` finite for a single sample and on degenerate constant-valued
//! streams.

use serde::{Deserialize, Serialize};

use super::stable::gaussian_pdf;

/// Smallest variance a distribution will report.
///
/// A single sample initializes here, and the Welford estimate is floored
/// here, so `pdf` stays finite everywhere.
pub const VARIANCE_FLOOR: f64 = 1e-9;

/// Normal distribution summarized by mean, variance, and sample count.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NormalDistribution {
    /// Sample mean.
    pub mean: f64,
    /// Variance estimate, floored at [`VARIANCE_FLOOR`].
    pub variance: f64,
    /// Number of observations incorporated.
    pub n: u32,
}

impl NormalDistribution {
    /// An empty prototype: no observations yet.
    pub fn new() -> Self {
        NormalDistribution {
            mean: 0.0,
            variance: VARIANCE_FLOOR,
            n: 0,
        }
    }

    /// Incorporate `x` as the `new_n`-th observation.
    ///
    /// `new_n == 1` starts fresh from this point: the mean is pinned at
    /// `x` and the variance is initialized to [`VARIANCE_FLOOR`],
    /// discarding any prior statistics.
    pub fn with_point(&self, x: f64, new_n: u32) -> Self {
        if new_n <= 1 {
            return NormalDistribution {
                mean: x,
                variance: VARIANCE_FLOOR,
                n: 1,
            };
        }
        let count = f64::from(new_n);
        let delta = x - self.mean;
        let mean = self.mean + delta / count;
        let m2 = self.variance * f64::from(new_n - 1) + delta * (x - mean);
        NormalDistribution {
            mean,
            variance: (m2 / count).max(VARIANCE_FLOOR),
            n: new_n,
        }
    }

    /// Gaussian density at `x`. Strictly non-negative.
    pub fn pdf(&self, x: f64) -> f64 {
        gaussian_pdf(x, self.mean, self.variance.max(VARIANCE_FLOOR))
    }
}

impl Default for NormalDistribution {
    fn default() -> Self {
        Self::new()
    }
}

/// Tagged continuous-distribution model.
///
/// Normal is the only variant the shipped detectors need; the enum exists
/// so new conjugate families slot in without changing detector code.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Distribution {
    /// Univariate Normal with incremental Welford update.
    Normal(NormalDistribution),
}

impl Distribution {
    /// A fresh Normal prototype with no observations.
    pub fn normal() -> Self {
        Distribution::Normal(NormalDistribution::new())
    }

    /// Incorporate `x` as the `new_n`-th observation.
    pub fn with_point(&self, x: f64, new_n: u32) -> Self {
        match self {
            Distribution::Normal(d) => Distribution::Normal(d.with_point(x, new_n)),
        }
    }

    /// Density at `x`. Strictly non-negative.
    pub fn pdf(&self, x: f64) -> f64 {
        match self {
            Distribution::Normal(d) => d.pdf(x),
        }
    }

    /// Current mean.
    pub fn mean(&self) -> f64 {
        match self {
            Distribution::Normal(d) => d.mean,
        }
    }

    /// Current variance.
    pub fn variance(&self) -> f64 {
        match self {
            Distribution::Normal(d) => d.variance,
        }
    }

    /// Number of observations incorporated.
    pub fn n(&self) -> u32 {
        match self {
            Distribution::Normal(d) => d.n,
        }
    }
}

impl Default for Distribution {
    fn default() -> Self {
        Self::normal()
    }
}
