//! Per-key state checkpointing.
//!
//! The per-key checkpoint record is the detector's [`ProcessorState`]:
//! current runs, normal-runs snapshot, the composite old normal, the last
//! observation, the last event time, and the three counters, in that
//! order. Serialization is JSON via serde; round-trip equality holds, so a
//! restored processor yields identical outputs on any subsequent
//! measurement sequence.
//!
//! Snapshots are taken between measurement processings; there are no
//! partial records.

use st_common::Result;
use st_math::Distribution;

use crate::config::ChangepointConfig;
use crate::detection::changepoint::{ChangepointProcessor, ProcessorState};

/// Serialize one key's detector state.
pub fn save(processor: &ChangepointProcessor) -> Result<String> {
    Ok(serde_json::to_string(processor.state())?)
}

/// Restore one key's detector from a serialized record.
///
/// The configuration and initial-distribution prototype are not part of
/// the record; they are read-only startup state supplied by the host.
pub fn load(
    config: ChangepointConfig,
    initial: Distribution,
    record: &str,
) -> Result<ChangepointProcessor> {
    let state: ProcessorState = serde_json::from_str(record)?;
    ChangepointProcessor::restore(config, initial, state)
}
