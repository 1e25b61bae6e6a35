//! Fuzz target: `commands::parse`
//!
//! Arbitrary inbound payloads must parse or fail with a typed error.
//! Whatever parses must survive a serialize/parse round trip.
//!
//! cargo fuzz run fuzz_command_parse

#![no_main]

use dryerctl::app::commands;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(cmd) = commands::parse(data) {
        let again = serde_json::to_vec(&cmd).expect("commands always serialize");
        assert_eq!(commands::parse(&again), Ok(cmd));
    }
});
