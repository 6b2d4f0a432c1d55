//! Merging predictions back into the uploaded table.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::export::{ExportFormat, write_table};
use crate::error::{Result, SentryError};
use crate::input::DataTable;

/// Name of the column holding predicted labels.
pub const PREDICTION_COLUMN: &str = "Prediction_Attack_type";

/// Occurrence count per predicted label, in first-appearance order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LabelDistribution {
    counts: IndexMap<String, usize>,
}

impl LabelDistribution {
    /// Tally a prediction vector.
    pub fn from_labels<S: AsRef<str>>(labels: &[S]) -> Self {
        let mut counts: IndexMap<String, usize> = IndexMap::new();
        for label in labels {
            *counts.entry(label.as_ref().to_string()).or_insert(0) += 1;
        }
        Self { counts }
    }

    /// Count for one label (0 if never predicted).
    pub fn get(&self, label: &str) -> usize {
        self.counts.get(label).copied().unwrap_or(0)
    }

    /// Sum of all counts; equals the number of classified rows.
    pub fn total(&self) -> usize {
        self.counts.values().sum()
    }

    /// Number of distinct labels.
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, usize)> {
        self.counts.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// Labels sorted by descending count; ties keep first-appearance order.
    pub fn by_count(&self) -> Vec<(&str, usize)> {
        let mut entries: Vec<_> = self.iter().collect();
        entries.sort_by(|a, b| b.1.cmp(&a.1));
        entries
    }
}

/// The uploaded table with a prediction column.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AugmentedTable {
    table: DataTable,
    prediction_column: String,
    replaced_existing: bool,
}

impl AugmentedTable {
    pub fn table(&self) -> &DataTable {
        &self.table
    }

    pub fn into_table(self) -> DataTable {
        self.table
    }

    pub fn prediction_column(&self) -> &str {
        &self.prediction_column
    }

    /// Whether the upload already had a column with the prediction name.
    pub fn replaced_existing(&self) -> bool {
        self.replaced_existing
    }

    pub fn row_count(&self) -> usize {
        self.table.row_count()
    }

    /// Predicted labels in row order.
    pub fn predictions(&self) -> Vec<&str> {
        self.table
            .column_by_name(&self.prediction_column)
            .unwrap_or_default()
    }

    /// Encode as UTF-8 comma-separated text with a header row.
    pub fn to_csv_bytes(&self) -> Result<Vec<u8>> {
        self.to_bytes(ExportFormat::Csv)
    }

    /// Encode in any export format.
    pub fn to_bytes(&self, format: ExportFormat) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        write_table(&self.table, format, &mut buf)?;
        Ok(buf)
    }
}

/// Attach `predictions` to `original` under `column` and tally them.
///
/// A length mismatch means an earlier stage dropped or invented rows and is
/// reported as [`SentryError::ShapeMismatch`]. An existing column with the
/// same name is overwritten in place; every other column is retained.
pub fn assemble(
    original: DataTable,
    predictions: Vec<String>,
    column: &str,
) -> Result<(AugmentedTable, LabelDistribution)> {
    if predictions.len() != original.row_count() {
        return Err(SentryError::ShapeMismatch {
            expected: original.row_count(),
            actual: predictions.len(),
        });
    }

    let distribution = LabelDistribution::from_labels(&predictions);
    let mut table = original;
    let replaced_existing = table.set_column(column, predictions);

    Ok((
        AugmentedTable {
            table,
            prediction_column: column.to_string(),
            replaced_existing,
        },
        distribution,
    ))
}
