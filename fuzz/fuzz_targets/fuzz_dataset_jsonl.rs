//! Fuzz target for processed dataset parsing.
//!
//! Channel rows accept loosely typed cells; malformed lines must surface as
//! dataset errors with a line number.

#![no_main]

use libfuzzer_sys::fuzz_target;
use std::io::Cursor;
use std::path::Path;
use yts_core::dataset::parse_jsonl;
use yts_core::mlops::drift::build_baseline;

fuzz_target!(|data: &[u8]| {
    if let Ok(rows) = parse_jsonl(Cursor::new(data), Path::new("fuzz.jsonl")) {
        let baseline = build_baseline(&rows);
        for stats in baseline.numeric.values() {
            assert!(stats.std.is_finite() && stats.std > 0.0);
        }
    }
});
