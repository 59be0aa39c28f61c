//! Fuzz target for error response decoding.
//!
//! Error bodies come straight off the wire and must never panic the
//! classifier, whatever the status.
//!
//! Run with:
//! cargo +nightly fuzz run fuzz_error_body -- -max_total_time=600

#![no_main]

use libfuzzer_sys::fuzz_target;
use tfokta_core::error_for_status;

fuzz_target!(|data: &[u8]| {
    if data.len() < 2 {
        return;
    }
    let status = 100 + u16::from_be_bytes([data[0], data[1]]) % 500;
    let body = String::from_utf8_lossy(&data[2..]);

    let error = error_for_status(status, &body, None);
    let _ = error.to_string();
    assert_eq!(error.is_not_found(), status == 404);
});
