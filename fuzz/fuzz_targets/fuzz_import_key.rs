//! Fuzz target for import key parsing.
//!
//! Run with:
//! cargo +nightly fuzz run fuzz_import_key -- -max_total_time=600

#![no_main]

use libfuzzer_sys::fuzz_target;
use tfokta_core::ImportKey;

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        if let Ok(key) = s.parse::<ImportKey>() {
            assert!(!key.last().trim().is_empty());

            // display form parses back to the same key
            let reparsed = ImportKey::parse(&key.to_string(), key.parts().len()).unwrap();
            assert_eq!(key, reparsed);
        }

        for expected in 1..=3 {
            if let Ok(key) = ImportKey::parse(s, expected) {
                assert_eq!(key.parts().len(), expected);
            }
        }
    }
});
