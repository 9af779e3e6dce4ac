//! Stream Triage detection engine.
//!
//! Measurements arrive from ingestion sources, are keyed per stream, and
//! each stream is independently analyzed by a detector which emits anomaly
//! events. The engine is a set of purely synchronous per-key state
//! machines: the Bayesian online changepoint processor, the temporal event
//! grouper that coalesces consecutive events into incident groups, and the
//! reference pipeline that wires them together behind the keying,
//! watermarking, and late-data contract of the host runtime.
//!
//! No async, no locking: per-key state is exclusively owned by its shard,
//! and timers are event-time timers driven by the per-key watermark.

pub mod checkpoint;
pub mod config;
pub mod detection;
pub mod flow;
pub mod grouping;
pub mod logging;

pub use config::{ChangepointConfig, GrouperConfig};
pub use detection::changepoint::ChangepointProcessor;
pub use detection::Detector;
pub use flow::{AnomalyPipeline, PipelineConfig};
pub use grouping::temporal::TemporalEventGrouper;
