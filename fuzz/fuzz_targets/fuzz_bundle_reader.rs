//! Fuzz target for model bundle reading.
//!
//! Bundles are ZIP archives with a checksummed manifest. Opening and
//! verifying arbitrary bytes must return an error, never panic.

#![no_main]

use libfuzzer_sys::fuzz_target;
use yts_bundle::BundleReader;

fuzz_target!(|data: &[u8]| {
    // Most random inputs fail at the ZIP directory; the rest exercise
    // manifest parsing and per-member checksum verification.
    if let Ok(mut reader) = BundleReader::from_bytes(data.to_vec()) {
        let _ = reader.verify_all();
    }
});
