//! Fuzz target for flat configuration parsing.
//!
//! Tests that arbitrary key/value maps produce a config or an error,
//! never a panic.

#![no_main]

use std::collections::HashMap;

use libfuzzer_sys::fuzz_target;
use st_core::config::{ChangepointConfig, GrouperConfig};

fuzz_target!(|pairs: Vec<(String, String)>| {
    let map: HashMap<String, String> = pairs.into_iter().collect();
    let _ = ChangepointConfig::from_flat(&map);
    let _ = GrouperConfig::from_flat(&map);
});
