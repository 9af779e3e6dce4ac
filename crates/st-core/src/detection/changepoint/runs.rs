//! Run hypotheses and run-set maintenance.
//!
//! A run is a hypothesis "the current regime started at `start`, the
//! observations since then are drawn from `dist`, and the posterior weight
//! of this hypothesis is `prob`". The processor maintains a bounded,
//! oldest-first ordered set of runs and updates it once per measurement:
//!
//! 1. Each existing run grows: its weight is multiplied by the predictive
//!    density of the new observation and by the no-change prior `1 − H`.
//! 2. A fresh run is appended with prior weight `H`, representing "a
//!    changepoint occurred at this step".
//! 3. The set is truncated oldest-first to the history cap, then the
//!    weights are renormalised to sum to 1.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use st_math::{normalise, Distribution};

/// Prior probability of a changepoint at each step (Adams & MacKay hazard).
pub const HAZARD_PRIOR: f64 = 0.01;

/// Prior probability that the current regime continues.
pub const GROWTH_FACTOR: f64 = 1.0 - HAZARD_PRIOR;

/// A single run-length hypothesis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Run {
    /// Distribution of observations since `start`.
    pub dist: Distribution,
    /// Normalised posterior weight of this hypothesis.
    pub prob: f64,
    /// Instant the hypothesised regime began.
    pub start: DateTime<Utc>,
}

impl Run {
    /// Create a run.
    pub fn new(dist: Distribution, prob: f64, start: DateTime<Utc>) -> Self {
        Run { dist, prob, start }
    }
}

/// Why a run-set update could not produce a usable posterior.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunsUpdateError {
    /// The update produced no runs at all.
    Empty,
    /// The weights were NaN, infinite, or summed to zero.
    Saturated,
}

/// Ordered collection of runs, oldest first, newest last.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunSet {
    runs: Vec<Run>,
}

impl From<Vec<Run>> for RunSet {
    fn from(runs: Vec<Run>) -> Self {
        RunSet { runs }
    }
}

impl RunSet {
    /// An empty run set.
    pub fn new() -> Self {
        RunSet { runs: Vec::new() }
    }

    pub fn len(&self) -> usize {
        self.runs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Run> {
        self.runs.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Run> {
        self.runs.iter()
    }

    pub fn clear(&mut self) {
        self.runs.clear();
    }

    /// The newest run, if any.
    pub fn newest(&self) -> Option<&Run> {
        self.runs.last()
    }

    /// The first run whose distribution has exactly `n` observations.
    pub fn run_with_n(&self, n: u32) -> Option<&Run> {
        self.runs.iter().find(|r| r.dist.n() == n)
    }

    /// Apply one measurement to the set, producing its successor.
    ///
    /// Grows every existing run, appends the fresh "changepoint now"
    /// hypothesis started at `time`, truncates oldest-first to
    /// `max_history`, and renormalises the posterior weights.
    pub fn update(
        &self,
        x: f64,
        time: DateTime<Utc>,
        max_history: usize,
        initial: &Distribution,
    ) -> Result<RunSet, RunsUpdateError> {
        let mut next = Vec::with_capacity(self.runs.len() + 1);
        for run in &self.runs {
            let weight = run.prob * run.dist.pdf(x) * GROWTH_FACTOR;
            next.push(Run::new(
                run.dist.with_point(x, run.dist.n() + 1),
                weight,
                run.start,
            ));
        }
        next.push(Run::new(initial.with_point(x, 1), HAZARD_PRIOR, time));

        if next.len() > max_history {
            let excess = next.len() - max_history;
            next.drain(..excess);
        }
        if next.is_empty() {
            return Err(RunsUpdateError::Empty);
        }

        let mut weights: Vec<f64> = next.iter().map(|r| r.prob).collect();
        if normalise(&mut weights).is_none() {
            return Err(RunsUpdateError::Saturated);
        }
        for (run, weight) in next.iter_mut().zip(weights) {
            run.prob = weight;
        }
        Ok(RunSet { runs: next })
    }

    /// Index of the most likely run, excluding the newest.
    ///
    /// The newest run is the "changepoint now" hypothesis introduced this
    /// step; excluding it keeps it from winning by construction. Ties go
    /// to the oldest run.
    pub fn most_likely(&self) -> usize {
        if self.runs.len() <= 1 {
            return 0;
        }
        let mut best = 0;
        for (i, run) in self.runs[..self.runs.len() - 1].iter().enumerate() {
            if run.prob > self.runs[best].prob {
                best = i;
            }
        }
        best
    }

    /// Index of the run whose distribution gives `x` the highest density.
    /// Ties go to the oldest run.
    pub fn best_pdf(&self, x: f64) -> usize {
        let mut best = 0;
        let mut best_pdf = f64::NEG_INFINITY;
        for (i, run) in self.runs.iter().enumerate() {
            let pdf = run.dist.pdf(x);
            if pdf > best_pdf {
                best = i;
                best_pdf = pdf;
            }
        }
        best
    }

    /// The run with the most observations. Ties go to the oldest run.
    pub fn largest_n(&self) -> Option<&Run> {
        self.runs.iter().reduce(|a, b| if b.dist.n() > a.dist.n() { b } else { a })
    }

    /// Sum of posterior weights; 1 ± ε after a successful update.
    pub fn prob_sum(&self) -> f64 {
        self.runs.iter().map(|r| r.prob).sum()
    }
}
