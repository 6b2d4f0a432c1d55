//! Fuzz target for the upload parser.
//!
//! The parser must never panic on malformed input, and any table it returns
//! must be rectangular with unique headers.

#![no_main]

use std::collections::HashSet;

use iotsentry::Parser;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Only process reasonable-sized inputs to avoid OOM
    if data.len() > 100_000 {
        return;
    }

    let parser = Parser::new();
    if let Ok(table) = parser.parse_bytes(data) {
        let width = table.column_count();
        assert!(table.rows.iter().all(|r| r.len() == width));

        let unique: HashSet<&str> = table.headers.iter().map(String::as_str).collect();
        assert_eq!(unique.len(), width);
    }
});
