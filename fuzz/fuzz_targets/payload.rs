// Copyright (c) 2025, The Palimpsest Developers
// SPDX-License-Identifier: BSD-3-Clause

#![no_main]

use libfuzzer_sys::fuzz_target;
use palimpsest::Payload;

// A payload that decodes must re-encode to bytes that decode to the same payload
fuzz_target!(|data: &[u8]| {
    if let Ok(payload) = Payload::from_bytes(data) {
        let bytes = payload.to_bytes().unwrap();
        assert_eq!(Payload::from_bytes(&bytes).unwrap(), payload);
    }
});
