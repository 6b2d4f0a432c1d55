//! Fuzz target for schema reconciliation.
//!
//! Arbitrary schemas and column lists must reconcile without panicking, and
//! an accepted table must contain exactly the schema's columns in order.

#![no_main]

use arbitrary::Arbitrary;
use iotsentry::{DataTable, FeatureSchema, Reconciler, Reconciliation};
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Arbitrary)]
struct Input {
    schema: Vec<String>,
    columns: Vec<String>,
    with_schema: bool,
}

fuzz_target!(|input: Input| {
    let row = vec!["0".to_string(); input.columns.len()];
    let table = DataTable::new(input.columns, vec![row], b',');

    let schema = if input.with_schema {
        match FeatureSchema::new(input.schema) {
            Ok(schema) => Some(schema),
            Err(_) => return,
        }
    } else {
        None
    };

    match Reconciler::new().reconcile(&table, schema.as_ref()) {
        Reconciliation::Accepted { usable, .. } => {
            let schema = schema.expect("accepted without a schema");
            assert_eq!(usable.headers, schema.features());
        }
        Reconciliation::Rejected { missing } => assert!(!missing.is_empty()),
        Reconciliation::Legacy { usable } => {
            assert!(schema.is_none());
            assert_eq!(usable.row_count(), 1);
        }
    }
});
