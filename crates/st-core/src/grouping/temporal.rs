//! Temporal event grouping.
//!
//! Coalesces consecutive events from one stream into an [`EventGroup`]
//! bounded by a maximum total span and a maximum inter-event gap. The
//! grouper is a per-key state machine with one event-time timer: the
//! active group is finalized either when a later event arrives beyond the
//! gap, or when the watermark passes `start + max_span`.
//!
//! Every event that enters the grouper is emitted exactly once as part of
//! exactly one group, provided the stream eventually goes idle or its
//! timer fires.

use chrono::{DateTime, Utc};
use st_common::{Error, EventGroup, Result};
use tracing::{debug, warn};

use crate::config::GrouperConfig;

/// Per-stream temporal event grouper.
#[derive(Debug, Clone)]
pub struct TemporalEventGrouper {
    config: GrouperConfig,
    active: Option<EventGroup>,
    deadline: Option<DateTime<Utc>>,
}

impl TemporalEventGrouper {
    /// Create a grouper, validating its configuration.
    pub fn new(config: GrouperConfig) -> Result<Self> {
        config.validate()?;
        Ok(TemporalEventGrouper {
            config,
            active: None,
            deadline: None,
        })
    }

    /// The active configuration.
    pub fn config(&self) -> &GrouperConfig {
        &self.config
    }

    /// The currently accumulating group, if any.
    pub fn active(&self) -> Option<&EventGroup> {
        self.active.as_ref()
    }

    /// The registered event-time timer, if a group is active.
    ///
    /// The host fires it via [`on_timer`](Self::on_timer) once the
    /// stream's watermark passes this instant.
    pub fn timer_deadline(&self) -> Option<DateTime<Utc>> {
        self.deadline
    }

    /// Feed an incoming group of one or more events for a single stream.
    ///
    /// Returns a finalized group when the incoming group starts beyond
    /// the allowed gap from the active one. A group whose events span
    /// multiple streams is rejected with a hard error; the host keys one
    /// grouper per stream, so every admitted group shares the active
    /// group's stream.
    pub fn on_group(&mut self, group: EventGroup) -> Result<Option<EventGroup>> {
        if group.events.is_empty() {
            return Err(Error::InvalidInput("empty event group".to_string()));
        }
        if !group.is_single_stream() {
            let streams: Vec<&str> = group.events.iter().map(|e| e.stream.as_str()).collect();
            warn!(streams = ?streams, "rejecting multi-stream event group");
            return Err(Error::MultiStreamGroup(streams.join(",")));
        }

        let active = match self.active.take() {
            None => {
                self.deadline = Some(group.start + self.config.max_span());
                self.active = Some(group);
                return Ok(None);
            }
            Some(active) => active,
        };

        // Empty groups are rejected at entry, so the active group always
        // has a latest event; fall back to its start if that ever breaks.
        let last = active.last_event_time().unwrap_or(active.start);
        if group.start > last + self.config.max_gap() {
            debug!("gap exceeded; finalizing active group");
            let finalized = EventGroup {
                start: active.start,
                end: Some(last),
                events: active.events,
            };
            self.deadline = Some(group.start + self.config.max_span());
            self.active = Some(group);
            return Ok(Some(finalized));
        }

        // Merge; the existing timer keeps running.
        let mut merged = active;
        merged.events.extend(group.events);
        self.active = Some(merged);
        Ok(None)
    }

    /// Fire the max-span timer at `t`, emitting the active group.
    pub fn on_timer(&mut self, t: DateTime<Utc>) -> Option<EventGroup> {
        self.deadline = None;
        let active = self.active.take()?;
        Some(EventGroup {
            start: active.start,
            end: Some(t),
            events: active.events,
        })
    }
}
