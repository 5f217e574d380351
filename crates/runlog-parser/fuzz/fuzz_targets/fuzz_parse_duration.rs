// Copyright (c) 2026 - present Nicholas D. Crosbie
// SPDX-License-Identifier: MIT

//! Fuzz target for duration parsing
//!
//! `parse_duration` sees whatever digits the runner printed, including
//! values far outside any real test run.

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;

use runlog_parser::engine::parse_duration;

#[derive(Debug, Arbitrary)]
struct DurationInput {
    value: String,
    unit: u8,
}

fuzz_target!(|input: DurationInput| {
    let unit = match input.unit % 5 {
        0 => "ms",
        1 => "s",
        2 => "m",
        3 => "h",
        _ => "d",
    };
    // Should return Ok or Err, never panic
    let _ = parse_duration(&input.value, unit);
});
