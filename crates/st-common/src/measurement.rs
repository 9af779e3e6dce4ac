//! Measurement value objects.
//!
//! A measurement is an immutable observation produced by an ingestion source
//! and routed to detectors by stream. Detectors observe a single scalar per
//! measurement (`value`); which scalar that is depends on the measurement
//! kind (RTT in milliseconds for latency tests, loss fraction for loss
//! tests, and so on).
//!
//! Measurements flagged `lossy` carry no usable scalar and are filtered out
//! before they reach any detector.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::id::StreamId;

/// The kind of network test a measurement came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MeasurementKind {
    /// Round-trip latency in milliseconds.
    Latency,
    /// Packet loss fraction in [0, 1].
    Loss,
    /// Hop count of the observed forward path.
    PathLength,
    /// Flow byte rate.
    Flow,
}

impl std::fmt::Display for MeasurementKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MeasurementKind::Latency => write!(f, "latency"),
            MeasurementKind::Loss => write!(f, "loss"),
            MeasurementKind::PathLength => write!(f, "path_length"),
            MeasurementKind::Flow => write!(f, "flow"),
        }
    }
}

impl std::str::FromStr for MeasurementKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "latency" => Ok(MeasurementKind::Latency),
            "loss" => Ok(MeasurementKind::Loss),
            "path_length" => Ok(MeasurementKind::PathLength),
            "flow" => Ok(MeasurementKind::Flow),
            _ => Err(format!("unknown measurement kind: {}", s)),
        }
    }
}

/// An immutable telemetry observation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    /// Stream this observation belongs to.
    pub stream: StreamId,
    /// Event time of the observation.
    pub time: DateTime<Utc>,
    /// Kind of test that produced it.
    pub kind: MeasurementKind,
    /// Whether the observation suffered loss and carries no usable scalar.
    pub lossy: bool,
    /// The scalar detectors observe. `None` when the source could not
    /// produce one.
    pub value: Option<f64>,
}

impl Measurement {
    /// Create a measurement of the given kind.
    pub fn new(
        stream: impl Into<StreamId>,
        time: DateTime<Utc>,
        kind: MeasurementKind,
        value: Option<f64>,
        lossy: bool,
    ) -> Self {
        Measurement {
            stream: stream.into(),
            time,
            kind,
            lossy,
            value,
        }
    }

    /// Latency observation (RTT in milliseconds).
    pub fn latency(stream: impl Into<StreamId>, time: DateTime<Utc>, rtt_ms: f64) -> Self {
        Self::new(stream, time, MeasurementKind::Latency, Some(rtt_ms), false)
    }

    /// Loss observation (fraction of probes lost).
    pub fn loss(stream: impl Into<StreamId>, time: DateTime<Utc>, fraction: f64) -> Self {
        Self::new(stream, time, MeasurementKind::Loss, Some(fraction), false)
    }

    /// Path-length observation (forward-path hop count).
    pub fn path_length(stream: impl Into<StreamId>, time: DateTime<Utc>, hops: f64) -> Self {
        Self::new(stream, time, MeasurementKind::PathLength, Some(hops), false)
    }

    /// Flow observation (byte rate).
    pub fn flow(stream: impl Into<StreamId>, time: DateTime<Utc>, rate: f64) -> Self {
        Self::new(stream, time, MeasurementKind::Flow, Some(rate), false)
    }

    /// A lossy observation with no usable scalar.
    pub fn lost(stream: impl Into<StreamId>, time: DateTime<Utc>, kind: MeasurementKind) -> Self {
        Self::new(stream, time, kind, None, true)
    }

    /// Whether a detector can observe this measurement.
    pub fn is_observable(&self) -> bool {
        !self.lossy && self.value.map(f64::is_finite).unwrap_or(false)
    }
}
