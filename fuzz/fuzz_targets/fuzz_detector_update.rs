//! Fuzz target for the detector update loop.
//!
//! Feeds arbitrary scalar sequences through a processor: updates must
//! never panic and the posterior must stay normalised.

#![no_main]

use chrono::{DateTime, Utc};
use libfuzzer_sys::fuzz_target;
use st_common::Measurement;
use st_core::{ChangepointConfig, ChangepointProcessor};

fuzz_target!(|values: Vec<f64>| {
    let mut processor = match ChangepointProcessor::new(ChangepointConfig::default()) {
        Ok(p) => p,
        Err(_) => return,
    };
    for (i, value) in values.iter().take(512).enumerate() {
        let time = DateTime::<Utc>::UNIX_EPOCH + chrono::Duration::seconds(i as i64);
        let m = Measurement::latency("fuzz", time, *value);
        let _ = processor.on_measurement(&m);
        let runs = &processor.state().current_runs;
        if !runs.is_empty() {
            assert!((runs.prob_sum() - 1.0).abs() < 1e-6);
        }
    }
});
