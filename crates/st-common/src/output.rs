//! Line-protocol event encoding.
//!
//! Events serialize to a single line:
//!
//! ```text
//! <event_type>,<sorted tag=value list> <sorted field=value list> <nanos>
//! ```
//!
//! Tags always include `stream=<stream_id>` and `event_type=<event_type>`
//! in addition to any caller tags, sorted lexicographically by key. Fields
//! are `description="<escaped>"`, `detection_latency=<nanos>i`, and
//! `severity=<n>i`, also in lexicographic key order. The trailing timestamp
//! is the event time in nanoseconds since the Unix epoch.
//!
//! Escaping: tag values escape commas, equals signs, and spaces; field
//! string values escape double quotes and backslashes.

use std::collections::BTreeMap;
use std::fmt::Write;

use crate::event::ChangepointEvent;

/// Escape a tag key or value for line-protocol output.
fn escape_tag(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            ',' | '=' | ' ' => {
                out.push('\\');
                out.push(c);
            }
            _ => out.push(c),
        }
    }
    out
}

/// Escape a field string value for line-protocol output.
fn escape_field_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '"' | '\\' => {
                out.push('\\');
                out.push(c);
            }
            _ => out.push(c),
        }
    }
    out
}

/// Serialize an event to its line-protocol form.
///
/// The output is bit-exact for a given event: tag and field order are
/// total, and no locale- or platform-dependent formatting is used.
pub fn to_line_protocol(event: &ChangepointEvent) -> String {
    // Reserved tags win over caller tags with the same key.
    let mut tags: BTreeMap<String, String> = event.tags.clone();
    tags.insert("event_type".to_string(), event.event_type().to_string());
    tags.insert("stream".to_string(), event.stream.to_string());

    let mut line = String::with_capacity(128);
    line.push_str(event.event_type());
    for (key, value) in &tags {
        let _ = write!(line, ",{}={}", escape_tag(key), escape_tag(value));
    }

    // Field keys in lexicographic order: description, detection_latency,
    // severity.
    let _ = write!(
        line,
        " description=\"{}\",detection_latency={}i,severity={}i",
        escape_field_string(&event.description),
        event.detection_latency_ns,
        event.severity,
    );

    let nanos = event.time.timestamp_nanos_opt().unwrap_or_default();
    let _ = write!(line, " {}", nanos);
    line
}
