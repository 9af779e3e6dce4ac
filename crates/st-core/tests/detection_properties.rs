//! Property tests over the detector's universal invariants.

use chrono::{DateTime, Duration, TimeZone, Utc};
use proptest::prelude::*;
use st_common::Measurement;
use st_core::{ChangepointConfig, ChangepointProcessor};

fn t(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(1_750_000_000 + secs, 0).unwrap()
}

fn latency(secs: i64, value: f64) -> Measurement {
    Measurement::latency("amp-icmp-1", t(secs), value)
}

proptest! {
    /// Posterior weights always sum to 1 and the run set is bounded by
    /// the history cap, for any measurement sequence.
    #[test]
    fn posterior_normalised_and_bounded(
        values in proptest::collection::vec(0.1_f64..1000.0, 1..200)
    ) {
        let config = ChangepointConfig::default();
        let cap = config.max_history as usize;
        let mut p = ChangepointProcessor::new(config).unwrap();
        for (i, v) in values.iter().enumerate() {
            p.on_measurement(&latency(i as i64, *v));
            let runs = &p.state().current_runs;
            prop_assert!(runs.len() <= cap);
            if !runs.is_empty() {
                prop_assert!((runs.prob_sum() - 1.0).abs() < 1e-9);
            }
        }
    }

    /// A monotonically constant stream never emits, whatever the value.
    #[test]
    fn constant_stream_never_emits(value in 0.1_f64..10000.0, len in 30usize..300) {
        let mut p = ChangepointProcessor::new(ChangepointConfig::default()).unwrap();
        for i in 0..len {
            prop_assert!(p.on_measurement(&latency(i as i64, value)).is_none());
        }
    }

    /// Emitted events always clear the severity threshold and respect the
    /// minimum inter-event spacing.
    #[test]
    fn events_gated_by_severity_and_spacing(
        seed_values in proptest::collection::vec(1.0_f64..500.0, 50..150)
    ) {
        let config = ChangepointConfig::default();
        let threshold = config.severity_threshold;
        let min_interval = config.min_event_interval();
        let mut p = ChangepointProcessor::new(config).unwrap();

        let mut events = Vec::new();
        for (i, v) in seed_values.iter().enumerate() {
            events.extend(p.on_measurement(&latency(i as i64, *v)));
        }
        for event in &events {
            prop_assert!(event.severity > threshold);
            prop_assert!(event.severity <= 100);
        }
        for pair in events.windows(2) {
            prop_assert!(pair[1].time - pair[0].time >= min_interval);
        }
    }

    /// Replaying from a mid-sequence checkpoint produces the same events
    /// as an uninterrupted run.
    #[test]
    fn checkpoint_replay_is_deterministic(
        head in proptest::collection::vec(40.0_f64..60.0, 10..60),
        tail in proptest::collection::vec(140.0_f64..160.0, 10..60),
    ) {
        use st_core::checkpoint;
        use st_math::Distribution;

        let mut full = ChangepointProcessor::new(ChangepointConfig::default()).unwrap();
        let mut split = ChangepointProcessor::new(ChangepointConfig::default()).unwrap();

        let mut full_events = Vec::new();
        let mut split_events = Vec::new();
        for (i, v) in head.iter().enumerate() {
            full_events.extend(full.on_measurement(&latency(i as i64, *v)));
            split_events.extend(split.on_measurement(&latency(i as i64, *v)));
        }

        let record = checkpoint::save(&split).unwrap();
        let mut split = checkpoint::load(
            ChangepointConfig::default(),
            Distribution::normal(),
            &record,
        ).unwrap();

        for (i, v) in tail.iter().enumerate() {
            let secs = (head.len() + i) as i64;
            full_events.extend(full.on_measurement(&latency(secs, *v)));
            split_events.extend(split.on_measurement(&latency(secs, *v)));
        }
        prop_assert_eq!(full_events, split_events);
    }
}

/// The inactivity boundary is inclusive: a gap of exactly the purge
/// duration resets, one nanosecond less does not.
#[test]
fn inactivity_boundary_is_inclusive() {
    let config = ChangepointConfig::default();
    let purge = config.inactivity_purge();

    let mut resets = ChangepointProcessor::new(config.clone()).unwrap();
    resets.on_measurement(&latency(0, 50.0));
    resets.on_measurement(&latency(1, 50.0));
    let at_boundary = Measurement::latency("amp-icmp-1", t(1) + purge, 50.0);
    resets.on_measurement(&at_boundary);
    assert!(resets.state().current_runs.is_empty(), "gap == purge must reset");

    let mut keeps = ChangepointProcessor::new(config).unwrap();
    keeps.on_measurement(&latency(0, 50.0));
    keeps.on_measurement(&latency(1, 50.0));
    let just_under = Measurement::latency(
        "amp-icmp-1",
        t(1) + purge - Duration::nanoseconds(1),
        50.0,
    );
    keeps.on_measurement(&just_under);
    assert!(
        !keeps.state().current_runs.is_empty(),
        "gap one nanosecond under the purge must not reset"
    );
}
