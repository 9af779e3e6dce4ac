//! Detection engine configuration.
//!
//! The core consumes a flat map of dotted keys supplied by the host
//! runtime. Each typed config carries the published defaults, can be built
//! from that map with [`ChangepointConfig::from_flat`] /
//! [`GrouperConfig::from_flat`], and validates its ranges at construction.
//! Out-of-range or unparseable values are fatal; absent keys fall back to
//! the defaults.

use std::collections::HashMap;

use chrono::Duration;
use serde::{Deserialize, Serialize};
use st_common::{Error, Result};

/// Flat configuration key names.
pub mod keys {
    pub const MAX_HISTORY: &str = "detector.changepoint.maxHistory";
    pub const TRIGGER_COUNT: &str = "detector.changepoint.triggerCount";
    pub const IGNORE_OUTLIER_AFTER: &str = "detector.changepoint.ignoreOutlierAfter";
    pub const INACTIVITY_PURGE_SEC: &str = "detector.changepoint.inactivityPurgeSec";
    pub const MIN_EVENT_INTERVAL_SEC: &str = "detector.changepoint.minEventIntervalSec";
    pub const SEVERITY_THRESHOLD: &str = "detector.changepoint.severityThreshold";
    pub const MAX_EVENT_LENGTH: &str = "eventGrouping.time.maximumEventLength";
    pub const MAX_EVENT_INTERVAL: &str = "eventGrouping.time.maximumEventInterval";
}

fn default_max_history() -> u32 {
    20
}

fn default_trigger_count() -> u32 {
    10
}

fn default_ignore_outlier_after() -> u32 {
    1
}

fn default_inactivity_purge_secs() -> u32 {
    60
}

fn default_min_event_interval_secs() -> u32 {
    10
}

fn default_severity_threshold() -> u8 {
    30
}

fn default_max_span_secs() -> u32 {
    60
}

fn default_max_gap_secs() -> u32 {
    10
}

/// Configuration for the changepoint processor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangepointConfig {
    /// Maximum run hypotheses retained per stream.
    #[serde(default = "default_max_history")]
    pub max_history: u32,

    /// Consecutive anomalies before emission is considered.
    #[serde(default = "default_trigger_count")]
    pub trigger_count: u32,

    /// Consecutive normal observations that cancel a recent outlier.
    #[serde(default = "default_ignore_outlier_after")]
    pub ignore_outlier_after: u32,

    /// Gap after which per-stream state resets, in seconds.
    #[serde(default = "default_inactivity_purge_secs")]
    pub inactivity_purge_secs: u32,

    /// Minimum spacing between emitted events, in seconds.
    #[serde(default = "default_min_event_interval_secs")]
    pub min_event_interval_secs: u32,

    /// Minimum severity an event must exceed to be emitted.
    #[serde(default = "default_severity_threshold")]
    pub severity_threshold: u8,
}

impl Default for ChangepointConfig {
    fn default() -> Self {
        ChangepointConfig {
            max_history: default_max_history(),
            trigger_count: default_trigger_count(),
            ignore_outlier_after: default_ignore_outlier_after(),
            inactivity_purge_secs: default_inactivity_purge_secs(),
            min_event_interval_secs: default_min_event_interval_secs(),
            severity_threshold: default_severity_threshold(),
        }
    }
}

impl ChangepointConfig {
    /// Build from the host's flat dotted-key map, validating ranges.
    pub fn from_flat(map: &HashMap<String, String>) -> Result<Self> {
        let config = ChangepointConfig {
            max_history: parse_u32(map, keys::MAX_HISTORY, default_max_history())?,
            trigger_count: parse_u32(map, keys::TRIGGER_COUNT, default_trigger_count())?,
            ignore_outlier_after: parse_u32(
                map,
                keys::IGNORE_OUTLIER_AFTER,
                default_ignore_outlier_after(),
            )?,
            inactivity_purge_secs: parse_u32(
                map,
                keys::INACTIVITY_PURGE_SEC,
                default_inactivity_purge_secs(),
            )?,
            min_event_interval_secs: parse_u32(
                map,
                keys::MIN_EVENT_INTERVAL_SEC,
                default_min_event_interval_secs(),
            )?,
            severity_threshold: parse_u8(
                map,
                keys::SEVERITY_THRESHOLD,
                default_severity_threshold(),
            )?,
        };
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration ranges. Fatal at construction.
    pub fn validate(&self) -> Result<()> {
        if self.max_history == 0 {
            return Err(Error::Config(format!(
                "{} must be >= 1, got 0",
                keys::MAX_HISTORY
            )));
        }
        if self.trigger_count == 0 {
            return Err(Error::Config(format!(
                "{} must be >= 1, got 0",
                keys::TRIGGER_COUNT
            )));
        }
        if self.ignore_outlier_after == 0 {
            return Err(Error::Config(format!(
                "{} must be >= 1, got 0",
                keys::IGNORE_OUTLIER_AFTER
            )));
        }
        if self.inactivity_purge_secs == 0 {
            return Err(Error::Config(format!(
                "{} must be >= 1, got 0",
                keys::INACTIVITY_PURGE_SEC
            )));
        }
        if self.severity_threshold > 100 {
            return Err(Error::Config(format!(
                "{} must be <= 100, got {}",
                keys::SEVERITY_THRESHOLD,
                self.severity_threshold
            )));
        }
        Ok(())
    }

    /// Inactivity purge gap as a duration.
    pub fn inactivity_purge(&self) -> Duration {
        Duration::seconds(i64::from(self.inactivity_purge_secs))
    }

    /// Minimum event spacing as a duration.
    pub fn min_event_interval(&self) -> Duration {
        Duration::seconds(i64::from(self.min_event_interval_secs))
    }
}

/// Configuration for the temporal event grouper.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrouperConfig {
    /// Maximum total duration of a group, in seconds.
    #[serde(default = "default_max_span_secs")]
    pub max_span_secs: u32,

    /// Maximum allowed gap between consecutive events, in seconds.
    #[serde(default = "default_max_gap_secs")]
    pub max_gap_secs: u32,
}

impl Default for GrouperConfig {
    fn default() -> Self {
        GrouperConfig {
            max_span_secs: default_max_span_secs(),
            max_gap_secs: default_max_gap_secs(),
        }
    }
}

impl GrouperConfig {
    /// Build from the host's flat dotted-key map, validating ranges.
    pub fn from_flat(map: &HashMap<String, String>) -> Result<Self> {
        let config = GrouperConfig {
            max_span_secs: parse_u32(map, keys::MAX_EVENT_LENGTH, default_max_span_secs())?,
            max_gap_secs: parse_u32(map, keys::MAX_EVENT_INTERVAL, default_max_gap_secs())?,
        };
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration ranges. Fatal at construction.
    pub fn validate(&self) -> Result<()> {
        if self.max_span_secs == 0 {
            return Err(Error::Config(format!(
                "{} must be >= 1, got 0",
                keys::MAX_EVENT_LENGTH
            )));
        }
        if self.max_gap_secs == 0 {
            return Err(Error::Config(format!(
                "{} must be >= 1, got 0",
                keys::MAX_EVENT_INTERVAL
            )));
        }
        Ok(())
    }

    /// Maximum group span as a duration.
    pub fn max_span(&self) -> Duration {
        Duration::seconds(i64::from(self.max_span_secs))
    }

    /// Maximum inter-event gap as a duration.
    pub fn max_gap(&self) -> Duration {
        Duration::seconds(i64::from(self.max_gap_secs))
    }
}

fn parse_u32(map: &HashMap<String, String>, key: &str, default: u32) -> Result<u32> {
    match map.get(key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse::<u32>()
            .map_err(|e| Error::Config(format!("{}: {} ({:?})", key, e, raw))),
    }
}

fn parse_u8(map: &HashMap<String, String>, key: &str, default: u8) -> Result<u8> {
    match map.get(key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse::<u8>()
            .map_err(|e| Error::Config(format!("{}: {} ({:?})", key, e, raw))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flat(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_defaults() {
        let c = ChangepointConfig::default();
        assert_eq!(c.max_history, 20);
        assert_eq!(c.trigger_count, 10);
        assert_eq!(c.ignore_outlier_after, 1);
        assert_eq!(c.inactivity_purge_secs, 60);
        assert_eq!(c.min_event_interval_secs, 10);
        assert_eq!(c.severity_threshold, 30);

        let g = GrouperConfig::default();
        assert_eq!(g.max_span_secs, 60);
        assert_eq!(g.max_gap_secs, 10);
    }

    #[test]
    fn test_from_flat_overrides() {
        let map = flat(&[
            ("detector.changepoint.maxHistory", "40"),
            ("detector.changepoint.severityThreshold", "55"),
            ("unrelated.key", "ignored"),
        ]);
        let c = ChangepointConfig::from_flat(&map).unwrap();
        assert_eq!(c.max_history, 40);
        assert_eq!(c.severity_threshold, 55);
        assert_eq!(c.trigger_count, 10);
    }

    #[test]
    fn test_from_flat_absent_keys_use_defaults() {
        let c = ChangepointConfig::from_flat(&HashMap::new()).unwrap();
        assert_eq!(c, ChangepointConfig::default());
        let g = GrouperConfig::from_flat(&HashMap::new()).unwrap();
        assert_eq!(g, GrouperConfig::default());
    }

    #[test]
    fn test_unparseable_value_is_fatal() {
        let map = flat(&[("detector.changepoint.maxHistory", "twenty")]);
        let err = ChangepointConfig::from_flat(&map).unwrap_err();
        assert_eq!(err.code(), 40);
    }

    #[test]
    fn test_out_of_range_is_fatal() {
        let map = flat(&[("detector.changepoint.maxHistory", "0")]);
        assert!(ChangepointConfig::from_flat(&map).is_err());

        let map = flat(&[("detector.changepoint.severityThreshold", "101")]);
        assert!(ChangepointConfig::from_flat(&map).is_err());

        let map = flat(&[("eventGrouping.time.maximumEventLength", "0")]);
        assert!(GrouperConfig::from_flat(&map).is_err());
    }

    #[test]
    fn test_duration_helpers() {
        let c = ChangepointConfig::default();
        assert_eq!(c.inactivity_purge(), Duration::seconds(60));
        assert_eq!(c.min_event_interval(), Duration::seconds(10));
        let g = GrouperConfig::default();
        assert_eq!(g.max_span(), Duration::seconds(60));
        assert_eq!(g.max_gap(), Duration::seconds(10));
    }
}
