//! Fuzz target for checkpoint record parsing.
//!
//! Tests that restoring per-key detector state from arbitrary bytes never
//! panics, only returns an error.

#![no_main]

use libfuzzer_sys::fuzz_target;
use st_core::config::ChangepointConfig;
use st_math::Distribution;

fuzz_target!(|data: &[u8]| {
    if let Ok(record) = std::str::from_utf8(data) {
        let _ = st_core::checkpoint::load(
            ChangepointConfig::default(),
            Distribution::normal(),
            record,
        );
    }
});
