//! Fuzz target for engine configuration parsing.
//!
//! Parsing and validation must return errors on bad input, never panic.

#![no_main]

use bn_config::{validate_inference, InferenceConfig};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    for parsed in [
        InferenceConfig::from_toml_str(text),
        InferenceConfig::from_json_str(text),
    ] {
        if let Ok(config) = parsed {
            let _ = validate_inference(&config);
            let _ = bn_config::snapshot::fingerprint(&config);
        }
    }
});
