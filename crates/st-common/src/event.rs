//! Anomaly events and event groups.
//!
//! A [`ChangepointEvent`] is the detector's output: a severity-scored
//! statement that the generating distribution of a stream changed at some
//! past instant. Consecutive events from the same stream are coalesced
//! downstream into an [`EventGroup`] bounded by a maximum span and an
//! inter-event gap.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::id::StreamId;

/// Event type tag used in serialized output.
pub const CHANGEPOINT_EVENT_TYPE: &str = "changepoint";

/// A detected distribution change in a single stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangepointEvent {
    /// Stream the change was observed on.
    pub stream: StreamId,
    /// Event time: when the change was detected.
    pub time: DateTime<Utc>,
    /// Estimated instant the new regime started.
    pub start: DateTime<Utc>,
    /// Severity in [0, 100].
    pub severity: u8,
    /// Time between the regime start and its detection, in nanoseconds.
    pub detection_latency_ns: i64,
    /// Human-readable description encoding direction and mean values.
    pub description: String,
    /// Caller-supplied tags, sorted by key.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub tags: BTreeMap<String, String>,
}

impl ChangepointEvent {
    /// Create an event detected at `time` for a regime that started at
    /// `start`. Detection latency is derived from the two instants.
    pub fn new(
        stream: impl Into<StreamId>,
        time: DateTime<Utc>,
        start: DateTime<Utc>,
        severity: u8,
        description: impl Into<String>,
    ) -> Self {
        let latency = time - start;
        ChangepointEvent {
            stream: stream.into(),
            time,
            start,
            severity,
            detection_latency_ns: latency.num_nanoseconds().unwrap_or(i64::MAX),
            description: description.into(),
            tags: BTreeMap::new(),
        }
    }

    /// Attach a caller tag.
    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    /// The serialized event type tag.
    pub fn event_type(&self) -> &'static str {
        CHANGEPOINT_EVENT_TYPE
    }

    /// Detection latency as a duration.
    pub fn detection_latency(&self) -> Duration {
        Duration::nanoseconds(self.detection_latency_ns)
    }
}

/// A set of events from one stream considered part of the same incident.
///
/// Invariants: all events share one stream; the first event's time equals
/// `start`; events are non-decreasing in time; `end` is set only when the
/// group is finalized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventGroup {
    /// Time of the group's first event.
    pub start: DateTime<Utc>,
    /// Set when the group is finalized and emitted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<DateTime<Utc>>,
    /// Member events, ordered by time.
    pub events: Vec<ChangepointEvent>,
}

impl EventGroup {
    /// Wrap a single event in an unfinalized group.
    pub fn single(event: ChangepointEvent) -> Self {
        EventGroup {
            start: event.time,
            end: None,
            events: vec![event],
        }
    }

    /// The stream all member events belong to, if the group is non-empty
    /// and consistent.
    pub fn stream(&self) -> Option<&StreamId> {
        let first = self.events.first()?;
        Some(&first.stream)
    }

    /// Whether every member event shares one stream.
    pub fn is_single_stream(&self) -> bool {
        match self.events.split_first() {
            None => true,
            Some((first, rest)) => rest.iter().all(|e| e.stream == first.stream),
        }
    }

    /// Time of the latest member event.
    pub fn last_event_time(&self) -> Option<DateTime<Utc>> {
        self.events.iter().map(|e| e.time).max()
    }
}
