//! Fuzz target for `Link` header parsing.
//!
//! Run with:
//! cargo +nightly fuzz run fuzz_link_header -- -max_total_time=600

#![no_main]

use libfuzzer_sys::fuzz_target;
use tfokta_client::pagination::parse_next_link;

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        if let Some(next) = parse_next_link(s) {
            assert!(!next.is_empty());
            assert!(!next.contains('>'));
        }
    }
});
