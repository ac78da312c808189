// Copyright (c) 2025, The Palimpsest Developers
// SPDX-License-Identifier: BSD-3-Clause

#![no_main]

use libfuzzer_sys::fuzz_target;
use palimpsest::Data;

// Any JSON text that parses into ledger data must render back to equivalent data
fuzz_target!(|data: &[u8]| {
    if let Ok(text) = core::str::from_utf8(data) {
        if let Ok(parsed) = Data::from_json_str(text) {
            let reparsed = Data::from_json_str(&parsed.to_json_string()).unwrap();
            assert_eq!(reparsed, parsed);
        }
    }
});
