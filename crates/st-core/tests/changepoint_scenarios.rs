//! End-to-end detector scenarios: regime jumps, outliers, inactivity,
//! and rate limiting.

use chrono::{DateTime, Duration, TimeZone, Utc};
use st_common::Measurement;
use st_core::{ChangepointConfig, ChangepointProcessor};

fn t(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(1_750_000_000 + secs, 0).unwrap()
}

fn latency(secs: i64, value: f64) -> Measurement {
    Measurement::latency("amp-icmp-1", t(secs), value)
}

#[test]
fn step_jump_emits_exactly_one_event() {
    let mut p = ChangepointProcessor::new(ChangepointConfig::default()).unwrap();
    let mut events = Vec::new();

    // 200 measurements in a 50ms regime, then 200 in a 150ms regime,
    // 1s apart.
    for i in 0..200 {
        events.extend(p.on_measurement(&latency(i, 50.0)));
    }
    for i in 200..400 {
        events.extend(p.on_measurement(&latency(i, 150.0)));
    }

    assert_eq!(events.len(), 1, "expected exactly one changepoint event");
    let event = &events[0];
    assert!(event.severity > 40, "severity {} too low", event.severity);
    assert!(event.description.contains("increased"));
    // Detected within trigger_count plus a small margin of the jump.
    assert!(event.time >= t(200));
    assert!(event.time <= t(200 + 15));
    assert!(event.detection_latency() >= Duration::zero());
}

#[test]
fn single_outlier_is_cancelled() {
    let mut p = ChangepointProcessor::new(ChangepointConfig::default()).unwrap();

    // 100 values at 50ms, one spike at 500ms, then 100 values at 50ms.
    for i in 0..100 {
        assert!(p.on_measurement(&latency(i, 50.0)).is_none());
    }
    assert!(p.on_measurement(&latency(100, 500.0)).is_none());
    for i in 101..201 {
        assert!(
            p.on_measurement(&latency(i, 50.0)).is_none(),
            "spurious event after lone outlier at step {}",
            i
        );
    }
}

#[test]
fn inactivity_gap_restarts_from_empty() {
    let mut p = ChangepointProcessor::new(ChangepointConfig::default()).unwrap();

    for i in 0..50 {
        assert!(p.on_measurement(&latency(i, 50.0)).is_none());
    }
    // 120s of silence, then a very different value.
    assert!(p.on_measurement(&latency(49 + 120, 200.0)).is_none());
    // The second burst began from empty: one seed observation, no runs.
    assert!(p.state().current_runs.is_empty());

    // And keeps quiet while the new regime establishes itself.
    for i in 0..30 {
        assert!(p.on_measurement(&latency(49 + 121 + i, 200.0)).is_none());
    }
}

#[test]
fn oscillating_stream_respects_min_event_interval() {
    let mut p = ChangepointProcessor::new(ChangepointConfig::default()).unwrap();
    let mut events = Vec::new();

    // Mean flips between 50 and 150 every 3 seconds at 1s cadence.
    for i in 0..240 {
        let v = if (i / 3) % 2 == 0 { 50.0 } else { 150.0 };
        events.extend(p.on_measurement(&latency(i, v)));
    }

    assert!(!events.is_empty(), "oscillation should produce events");
    for pair in events.windows(2) {
        let spacing = pair[1].time - pair[0].time;
        assert!(
            spacing >= Duration::seconds(10),
            "events {} apart violate the rate limit",
            spacing
        );
    }
}

#[test]
fn first_emission_requires_trigger_count_plus_one() {
    // With exact constant data the emission step is deterministic: the
    // anomaly counter starts one step after the jump and the event fires
    // when it first exceeds trigger_count.
    for trigger_count in [3u32, 10] {
        let config = ChangepointConfig {
            trigger_count,
            ..Default::default()
        };
        let mut p = ChangepointProcessor::new(config).unwrap();
        let jump = 100i64;
        let mut event_time = None;
        for i in 0..jump {
            assert!(p.on_measurement(&latency(i, 50.0)).is_none());
        }
        for i in jump..jump + 40 {
            if let Some(e) = p.on_measurement(&latency(i, 150.0)) {
                event_time = Some(e.time);
                break;
            }
        }
        assert_eq!(
            event_time,
            Some(t(jump + i64::from(trigger_count) + 1)),
            "trigger_count {}",
            trigger_count
        );
    }
}

#[test]
fn severity_threshold_is_strict() {
    // A clean 50 -> 150 jump scores exactly 50.
    for (threshold, expect_event) in [(50u8, false), (49u8, true)] {
        let config = ChangepointConfig {
            severity_threshold: threshold,
            ..Default::default()
        };
        let mut p = ChangepointProcessor::new(config).unwrap();
        let mut emitted = false;
        for i in 0..100 {
            p.on_measurement(&latency(i, 50.0));
        }
        for i in 100..160 {
            if p.on_measurement(&latency(i, 150.0)).is_some() {
                emitted = true;
            }
        }
        assert_eq!(emitted, expect_event, "threshold {}", threshold);
    }
}

#[test]
fn downward_jump_is_described_as_decrease() {
    let mut p = ChangepointProcessor::new(ChangepointConfig::default()).unwrap();
    let mut events = Vec::new();
    for i in 0..100 {
        p.on_measurement(&latency(i, 150.0));
    }
    for i in 100..160 {
        events.extend(p.on_measurement(&latency(i, 50.0)));
    }
    assert_eq!(events.len(), 1);
    assert!(events[0].description.contains("decreased"));
}
