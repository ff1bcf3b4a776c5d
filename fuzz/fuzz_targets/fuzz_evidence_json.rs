//! Fuzz target for evidence deserialisation.
//!
//! Arbitrary JSON is decoded as an assignment and checked against a fixed
//! registry; out-of-range states and wrong value kinds must be rejected.

#![no_main]

use bn_core::{Assignment, VariablesBuilder};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let mut vb = VariablesBuilder::new();
    let _ = vb.new_multinomial("A", 3);
    let _ = vb.new_gaussian("B");
    let variables = vb.build();

    if let Ok(assignment) = serde_json::from_slice::<Assignment>(data) {
        let _ = assignment.validate(&variables);
    }
});
