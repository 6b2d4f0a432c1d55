//! Matching an uploaded table's columns against the expected-feature schema.

use std::collections::BTreeSet;

use tracing::debug;

use super::feature::FeatureSchema;
use crate::input::DataTable;

/// Column name of the stray index that spreadsheet exports leave behind.
pub const DEFAULT_INDEX_COLUMN: &str = "Unnamed: 0";

/// Result of reconciling a table against a schema.
#[derive(Debug, Clone, PartialEq)]
pub enum Reconciliation {
    /// Every schema feature is present. `usable` holds exactly the schema's
    /// columns, in schema order.
    Accepted {
        extra: BTreeSet<String>,
        usable: DataTable,
    },
    /// The transform declares no feature names; the table is passed through
    /// in upload order.
    Legacy { usable: DataTable },
    /// At least one schema feature is absent. No numeric work may follow.
    Rejected { missing: BTreeSet<String> },
}

impl Reconciliation {
    /// The table the inference stage should consume, unless rejected.
    pub fn usable(&self) -> Option<&DataTable> {
        match self {
            Reconciliation::Accepted { usable, .. } | Reconciliation::Legacy { usable } => {
                Some(usable)
            }
            Reconciliation::Rejected { .. } => None,
        }
    }

    pub fn is_rejected(&self) -> bool {
        matches!(self, Reconciliation::Rejected { .. })
    }
}

/// Decides which uploaded columns feed the model, and in what order.
#[derive(Debug, Clone)]
pub struct Reconciler {
    index_column: String,
}

impl Reconciler {
    /// Create a reconciler that ignores the default `"Unnamed: 0"` index column.
    pub fn new() -> Self {
        Self::with_index_column(DEFAULT_INDEX_COLUMN)
    }

    /// Create a reconciler that ignores a custom index column name.
    pub fn with_index_column(index_column: impl Into<String>) -> Self {
        Self {
            index_column: index_column.into(),
        }
    }

    /// Name of the column treated as a stray index.
    pub fn index_column(&self) -> &str {
        &self.index_column
    }

    /// Remove the stray index column from a table, returning whether it was present.
    pub fn strip_index(&self, table: &mut DataTable) -> bool {
        table.drop_column(&self.index_column)
    }

    /// Reconcile `table` against `schema`.
    ///
    /// The index column never counts as missing or extra and never reaches
    /// the usable table. With no schema the table degrades to
    /// [`Reconciliation::Legacy`].
    pub fn reconcile(&self, table: &DataTable, schema: Option<&FeatureSchema>) -> Reconciliation {
        let Some(schema) = schema else {
            let mut usable = table.clone();
            self.strip_index(&mut usable);
            debug!(
                columns = usable.column_count(),
                "no feature schema, passing table through in upload order"
            );
            return Reconciliation::Legacy { usable };
        };

        // Resolve every schema feature to an upload position in one pass.
        let mut indices = Vec::with_capacity(schema.len());
        let mut missing = BTreeSet::new();
        for feature in schema.iter() {
            match table
                .column_index(feature)
                .filter(|_| feature != self.index_column)
            {
                Some(index) => indices.push(index),
                None => {
                    missing.insert(feature.to_string());
                }
            }
        }

        if !missing.is_empty() {
            debug!(missing = missing.len(), "table rejected");
            return Reconciliation::Rejected { missing };
        }

        let extra: BTreeSet<String> = table
            .headers
            .iter()
            .filter(|h| **h != self.index_column && !schema.contains(h))
            .cloned()
            .collect();

        let usable = table.select(&indices);

        debug!(
            features = schema.len(),
            extra = extra.len(),
            "table accepted"
        );
        Reconciliation::Accepted { extra, usable }
    }
}

impl Default for Reconciler {
    fn default() -> Self {
        Self::new()
    }
}
