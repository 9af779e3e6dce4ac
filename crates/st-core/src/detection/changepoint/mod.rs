//! Bayesian online changepoint detection.
//!
//! Maintains a posterior over run-length hypotheses for one stream and
//! emits a severity-scored event when the posterior stops favouring the
//! pre-change regime for long enough.
//!
//! # Algorithm
//!
//! Per measurement:
//!
//! 1. Reset on the first observation or after an inactivity gap.
//! 2. Track the latest observation, tolerating out-of-order arrivals.
//! 3. While the stream is considered normal, snapshot the run set and a
//!    composite of the old regime for later severity scoring.
//! 4. Grow every run by the new observation, append the fresh
//!    "changepoint now" hypothesis, truncate to the history cap, and
//!    renormalise (see [`runs`]).
//! 5. Count consecutive steps on which the most likely run moved.
//! 6. Cancel a lone outlier when the pre-change hypothesis keeps being the
//!    best density fit, restoring the snapshotted normal runs.
//! 7. After more than `trigger_count` consecutive anomalies, score the
//!    change and emit if it beats the severity threshold and the
//!    per-stream rate limit, then reset.
//!
//! Arithmetic saturation (NaN or zero posterior mass) and empty updates
//! are surfaced to the log as their structured error kinds and absorbed
//! by resetting the per-stream state; nothing propagates.

pub mod runs;
pub mod severity;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use st_common::{ChangepointEvent, Error, Measurement, Result};
use st_math::Distribution;
use tracing::{debug, info, warn};

use crate::config::ChangepointConfig;
use crate::detection::Detector;

use runs::{Run, RunSet, RunsUpdateError};
use severity::severity;

/// Sentinel weight marking a composite built from a live snapshot.
const COMPOSITE_PROB: f64 = -2.0;

/// Sentinel weight marking a composite built before any runs existed.
const EMPTY_COMPOSITE_PROB: f64 = -1.0;

/// Per-stream detector state, serialized for checkpoints.
///
/// Field order matches the persisted checkpoint record layout.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProcessorState {
    /// Current run hypotheses, oldest first.
    pub current_runs: RunSet,
    /// Snapshot of `current_runs` from the last step considered normal.
    pub normal_runs: RunSet,
    /// Composite of the old regime used for severity scoring.
    pub composite_old_normal: Option<Run>,
    /// Latest observation accepted.
    pub last_observed: Option<Measurement>,
    /// Time of the last emitted event; survives resets for rate limiting.
    pub last_event_time: Option<DateTime<Utc>>,
    /// Consecutive steps on which the most likely run moved.
    pub consecutive_anomalies: u32,
    /// Consecutive best-fit-normal steps since the last anomaly.
    pub consecutive_normal_after_outlier: u32,
    /// Most likely run index from the previous step.
    pub previous_most_likely_index: usize,
}

/// Per-stream Bayesian changepoint detector.
#[derive(Debug, Clone)]
pub struct ChangepointProcessor {
    config: ChangepointConfig,
    initial: Distribution,
    state: ProcessorState,
}

impl ChangepointProcessor {
    /// Create a processor with the default Normal prototype.
    pub fn new(config: ChangepointConfig) -> Result<Self> {
        Self::with_initial(config, Distribution::normal())
    }

    /// Create a processor with an explicit initial-distribution prototype.
    pub fn with_initial(config: ChangepointConfig, initial: Distribution) -> Result<Self> {
        config.validate()?;
        Ok(ChangepointProcessor {
            config,
            initial,
            state: ProcessorState::default(),
        })
    }

    /// Restore a processor from checkpointed state.
    pub fn restore(
        config: ChangepointConfig,
        initial: Distribution,
        state: ProcessorState,
    ) -> Result<Self> {
        config.validate()?;
        Ok(ChangepointProcessor {
            config,
            initial,
            state,
        })
    }

    /// The active configuration.
    pub fn config(&self) -> &ChangepointConfig {
        &self.config
    }

    /// The read-only initial-distribution prototype.
    pub fn initial(&self) -> &Distribution {
        &self.initial
    }

    /// The per-stream state, as persisted in checkpoints.
    pub fn state(&self) -> &ProcessorState {
        &self.state
    }

    /// Process one measurement; emits at most one event.
    pub fn on_measurement(&mut self, m: &Measurement) -> Option<ChangepointEvent> {
        let x = match m.value {
            Some(v) if v.is_finite() && !m.lossy => v,
            _ => {
                debug!(stream = %m.stream, "dropping unobservable measurement");
                return None;
            }
        };

        // Inactivity purge / first observation.
        match &self.state.last_observed {
            None => {
                self.reset_to(m);
                return None;
            }
            Some(last) => {
                if last.stream != m.stream {
                    debug!(
                        stream = %m.stream,
                        expected = %last.stream,
                        "dropping measurement routed to the wrong key"
                    );
                    return None;
                }
                if m.time - last.time >= self.config.inactivity_purge() {
                    debug!(stream = %m.stream, "inactivity gap; resetting detector state");
                    self.reset_to(m);
                    return None;
                }
            }
        }

        // Out-of-order guard: process the value, but never move the clock
        // backwards.
        if self
            .state
            .last_observed
            .as_ref()
            .is_some_and(|last| m.time >= last.time)
        {
            self.state.last_observed = Some(m.clone());
        }

        // While normal, keep the pre-change picture for severity scoring.
        if self.state.consecutive_anomalies == 0 {
            self.state.normal_runs = self.state.current_runs.clone();
            self.state.composite_old_normal = Some(self.composite_old_normal());
        }

        let max_history = self.config.max_history as usize;
        match self
            .state
            .current_runs
            .update(x, m.time, max_history, &self.initial)
        {
            Ok(updated) => self.state.current_runs = updated,
            Err(cause) => {
                self.absorb_update_error(cause, m);
                return None;
            }
        }

        let most_likely = self.state.current_runs.most_likely();

        if most_likely != self.state.previous_most_likely_index {
            self.state.consecutive_anomalies += 1;
        }

        let len = self.state.current_runs.len();
        let highest_pdf = self.state.current_runs.best_pdf(x);
        if len >= 2 && highest_pdf == len - 2 {
            // The pre-change hypothesis is still the best density fit.
            self.state.consecutive_normal_after_outlier += 1;
            if self.state.consecutive_normal_after_outlier > self.config.ignore_outlier_after {
                debug!(stream = %m.stream, "lonely outlier cancelled; restoring normal runs");
                match self
                    .state
                    .normal_runs
                    .update(x, m.time, max_history, &self.initial)
                {
                    Ok(restored) => self.state.current_runs = restored,
                    Err(cause) => {
                        self.absorb_update_error(cause, m);
                        return None;
                    }
                }
                self.state.consecutive_anomalies = 0;
                self.state.consecutive_normal_after_outlier = 0;
                return None;
            }
        } else {
            self.state.consecutive_normal_after_outlier = 0;
        }

        if most_likely == self.state.previous_most_likely_index {
            self.state.consecutive_anomalies = 0;
            self.state.consecutive_normal_after_outlier = 0;
        }
        self.state.previous_most_likely_index = most_likely;

        if self.state.consecutive_anomalies > self.config.trigger_count {
            let event = self.try_emit(m, most_likely);
            self.state.consecutive_anomalies = 0;
            if event.is_some() {
                return event;
            }
        }
        None
    }

    /// Score the suspected change and emit if it clears both gates.
    fn try_emit(&mut self, m: &Measurement, most_likely: usize) -> Option<ChangepointEvent> {
        let new_normal = self
            .state
            .current_runs
            .run_with_n(1)
            .or_else(|| self.state.current_runs.newest())?
            .clone();
        let old_normal = match &self.state.composite_old_normal {
            Some(run) => run.clone(),
            None => self.composite_old_normal(),
        };

        let score = severity(old_normal.dist.mean(), new_normal.dist.mean());
        if score <= self.config.severity_threshold {
            return None;
        }
        let spaced_out = match self.state.last_event_time {
            None => true,
            Some(last) => m.time - last >= self.config.min_event_interval(),
        };
        if !spaced_out {
            debug!(stream = %m.stream, "event suppressed by minimum interval");
            return None;
        }

        let start = self
            .state
            .current_runs
            .get(most_likely)
            .map(|r| r.start)
            .unwrap_or(m.time);
        let old_mean = old_normal.dist.mean();
        let new_mean = new_normal.dist.mean();
        let direction = if new_mean > old_mean {
            "increased"
        } else {
            "decreased"
        };
        let description = format!(
            "Mean {} from {:.2} to {:.2}",
            direction, old_mean, new_mean
        );

        let event = ChangepointEvent::new(m.stream.clone(), m.time, start, score, description);
        info!(
            stream = %m.stream,
            severity = score,
            old_mean,
            new_mean,
            "changepoint detected"
        );
        self.state.last_event_time = Some(m.time);
        self.reset_to(m);
        Some(event)
    }

    /// Composite of the old regime: the best-informed distribution paired
    /// with the start of the previously most likely run.
    fn composite_old_normal(&self) -> Run {
        let runs = &self.state.current_runs;
        match runs.largest_n() {
            None => Run::new(self.initial, EMPTY_COMPOSITE_PROB, DateTime::UNIX_EPOCH),
            Some(best_informed) => {
                let idx = self
                    .state
                    .previous_most_likely_index
                    .min(runs.len().saturating_sub(1));
                let start = runs
                    .get(idx)
                    .map(|r| r.start)
                    .unwrap_or(DateTime::UNIX_EPOCH);
                Run::new(best_informed.dist, COMPOSITE_PROB, start)
            }
        }
    }

    /// Absorb a failed run-set update.
    ///
    /// The failure is surfaced to the log as the structured error it maps
    /// to, then the per-stream state is reset seeded with the offending
    /// measurement; nothing propagates to the caller.
    fn absorb_update_error(&mut self, cause: RunsUpdateError, m: &Measurement) {
        let error = match cause {
            RunsUpdateError::Empty => Error::EmptyRunSet {
                stream: m.stream.to_string(),
            },
            RunsUpdateError::Saturated => Error::ArithmeticSaturation {
                stream: m.stream.to_string(),
                detail: "posterior weights NaN, infinite, or zero-sum".to_string(),
            },
        };
        warn!(
            code = error.code(),
            category = %error.category(),
            error = %error,
            "resetting detector state"
        );
        self.reset_to(m);
    }

    /// Clear all learned state, seeding from `m`.
    ///
    /// The last event time survives so the rate limit holds across resets.
    fn reset_to(&mut self, m: &Measurement) {
        self.state.current_runs.clear();
        self.state.normal_runs.clear();
        self.state.composite_old_normal = None;
        self.state.last_observed = Some(m.clone());
        self.state.consecutive_anomalies = 0;
        self.state.consecutive_normal_after_outlier = 0;
        self.state.previous_most_likely_index = 0;
    }
}

impl Detector for ChangepointProcessor {
    fn on_measurement(&mut self, measurement: &Measurement) -> Option<ChangepointEvent> {
        ChangepointProcessor::on_measurement(self, measurement)
    }

    fn reset(&mut self, seed: &Measurement) {
        self.reset_to(seed);
    }
}
