//! Expected-feature schema and table reconciliation.

mod feature;
mod reconcile;

pub use feature::FeatureSchema;
pub use reconcile::{DEFAULT_INDEX_COLUMN, Reconciler, Reconciliation};
