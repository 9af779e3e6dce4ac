//! Per-stream dataflow contract and reference pipeline.
//!
//! The framework shards input by stream: each key's detector and grouper
//! are exclusively owned and processed strictly in arrival order, with no
//! shared mutable state across shards. Timers are event-time timers that
//! fire when the per-key watermark (the maximum event time observed)
//! passes their registered instant.
//!
//! Late-data policy: measurements older than `watermark − allowed_lateness`
//! are dropped before they reach the detector, as are lossy measurements
//! and measurements without a usable scalar.
//!
//! [`AnomalyPipeline`] is the reference single-threaded host: it wires a
//! changepoint processor and a temporal grouper per key and drives the
//! watermark/timer contract. Production hosts shard the same state
//! machines across threads or nodes.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use st_common::{EventGroup, Measurement, Result, StreamId};
use st_math::Distribution;
use tracing::debug;

use crate::config::{ChangepointConfig, GrouperConfig};
use crate::detection::changepoint::{ChangepointProcessor, ProcessorState};
use crate::grouping::temporal::TemporalEventGrouper;

/// Configuration for the reference pipeline.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Changepoint detector configuration.
    #[serde(default)]
    pub detector: ChangepointConfig,
    /// Temporal grouper configuration.
    #[serde(default)]
    pub grouper: GrouperConfig,
    /// How far behind the watermark a measurement may arrive, in seconds.
    #[serde(default)]
    pub allowed_lateness_secs: u32,
}

impl PipelineConfig {
    /// Validate all nested configuration. Fatal at construction.
    pub fn validate(&self) -> Result<()> {
        self.detector.validate()?;
        self.grouper.validate()
    }

    /// Allowed lateness as a duration.
    pub fn allowed_lateness(&self) -> Duration {
        Duration::seconds(i64::from(self.allowed_lateness_secs))
    }
}

/// Exclusive per-key state: detector, grouper, and watermark.
#[derive(Debug, Clone)]
struct KeyState {
    processor: ChangepointProcessor,
    grouper: TemporalEventGrouper,
    watermark: DateTime<Utc>,
}

/// Single-threaded reference host for the per-stream dataflow contract.
#[derive(Debug)]
pub struct AnomalyPipeline {
    config: PipelineConfig,
    processor_template: ChangepointProcessor,
    grouper_template: TemporalEventGrouper,
    keys: HashMap<StreamId, KeyState>,
}

impl AnomalyPipeline {
    /// Create a pipeline with the default Normal prototype.
    pub fn new(config: PipelineConfig) -> Result<Self> {
        Self::with_initial(config, Distribution::normal())
    }

    /// Create a pipeline with an explicit initial-distribution prototype.
    ///
    /// The prototype and configuration are read-only after startup and
    /// shared (by clone) across all keys.
    pub fn with_initial(config: PipelineConfig, initial: Distribution) -> Result<Self> {
        config.validate()?;
        let processor_template =
            ChangepointProcessor::with_initial(config.detector.clone(), initial)?;
        let grouper_template = TemporalEventGrouper::new(config.grouper.clone())?;
        Ok(AnomalyPipeline {
            config,
            processor_template,
            grouper_template,
            keys: HashMap::new(),
        })
    }

    /// The active configuration.
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Process one measurement, returning any finalized event groups.
    pub fn on_measurement(&mut self, m: &Measurement) -> Result<Vec<EventGroup>> {
        if !m.is_observable() {
            debug!(stream = %m.stream, "dropping lossy or valueless measurement");
            return Ok(Vec::new());
        }

        let state = self.keys.entry(m.stream.clone()).or_insert_with(|| KeyState {
            processor: self.processor_template.clone(),
            grouper: self.grouper_template.clone(),
            watermark: m.time,
        });

        if m.time < state.watermark - self.config.allowed_lateness() {
            debug!(stream = %m.stream, "dropping measurement behind the watermark");
            return Ok(Vec::new());
        }
        if m.time > state.watermark {
            state.watermark = m.time;
        }

        let mut out = Vec::new();
        fire_due_timers(state, &mut out);

        if let Some(event) = state.processor.on_measurement(m) {
            if let Some(finalized) = state.grouper.on_group(EventGroup::single(event))? {
                out.push(finalized);
            }
        }
        Ok(out)
    }

    /// Advance one stream's watermark without an element, firing any due
    /// timers. Hosts call this on idle streams.
    pub fn advance_watermark(&mut self, stream: &StreamId, to: DateTime<Utc>) -> Vec<EventGroup> {
        let mut out = Vec::new();
        if let Some(state) = self.keys.get_mut(stream) {
            if to > state.watermark {
                state.watermark = to;
            }
            fire_due_timers(state, &mut out);
        }
        out
    }

    /// Drain every key by firing its outstanding timer, emitting all
    /// still-active groups. Streams are drained in key order.
    pub fn finish(&mut self) -> Vec<EventGroup> {
        let mut streams: Vec<StreamId> = self.keys.keys().cloned().collect();
        streams.sort();
        let mut out = Vec::new();
        for stream in streams {
            if let Some(state) = self.keys.get_mut(&stream) {
                if let Some(deadline) = state.grouper.timer_deadline() {
                    if let Some(group) = state.grouper.on_timer(deadline) {
                        out.push(group);
                    }
                }
            }
        }
        out
    }

    /// Checkpoint every key's detector state, in key order.
    ///
    /// Taken between measurement processings, so the record is atomic per
    /// key; groupers re-arm from incoming events after a restore.
    pub fn checkpoint(&self) -> BTreeMap<StreamId, ProcessorState> {
        self.keys
            .iter()
            .map(|(stream, state)| (stream.clone(), state.processor.state().clone()))
            .collect()
    }

    /// Restore per-key detector state from a checkpoint.
    ///
    /// Watermarks resume from each restored key's last observation.
    pub fn restore(&mut self, checkpoint: BTreeMap<StreamId, ProcessorState>) -> Result<()> {
        for (stream, processor_state) in checkpoint {
            let watermark = processor_state
                .last_observed
                .as_ref()
                .map(|m| m.time)
                .unwrap_or(DateTime::UNIX_EPOCH);
            let processor = ChangepointProcessor::restore(
                self.config.detector.clone(),
                self.processor_template_initial(),
                processor_state,
            )?;
            self.keys.insert(
                stream,
                KeyState {
                    processor,
                    grouper: self.grouper_template.clone(),
                    watermark,
                },
            );
        }
        Ok(())
    }

    /// Detector state for one key, if the key exists.
    pub fn processor_state(&self, stream: &StreamId) -> Option<&ProcessorState> {
        self.keys.get(stream).map(|s| s.processor.state())
    }

    /// Streams with live state.
    pub fn streams(&self) -> impl Iterator<Item = &StreamId> {
        self.keys.keys()
    }

    fn processor_template_initial(&self) -> Distribution {
        *self.processor_template.initial()
    }
}

fn fire_due_timers(state: &mut KeyState, out: &mut Vec<EventGroup>) {
    while let Some(deadline) = state.grouper.timer_deadline() {
        if deadline > state.watermark {
            break;
        }
        if let Some(group) = state.grouper.on_timer(deadline) {
            out.push(group);
        }
    }
}
