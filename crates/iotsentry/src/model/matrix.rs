//! Dense numeric matrix handed between the transform and the classifier.

use crate::error::{DiagnosticContext, Result, SentryError};
use crate::input::DataTable;

/// Row-major `f64` matrix with named columns.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureMatrix {
    columns: Vec<String>,
    n_rows: usize,
    data: Vec<f64>,
}

impl FeatureMatrix {
    /// Build a matrix from row-major data.
    ///
    /// Fails with a transform error when `data.len()` is not
    /// `n_rows * columns.len()`.
    pub fn new(columns: Vec<String>, n_rows: usize, data: Vec<f64>) -> Result<Self> {
        if data.len() != n_rows * columns.len() {
            let context = DiagnosticContext::new(n_rows, columns);
            return Err(SentryError::transform(
                format!("matrix holds {} values", data.len()),
                context,
            ));
        }
        Ok(Self {
            columns,
            n_rows,
            data,
        })
    }

    /// Coerce every cell of a table to a finite number.
    ///
    /// `true`/`false` map to 1/0. Blank, null-like, non-numeric and
    /// non-finite cells are a transform error naming the offending cell.
    pub fn from_table(table: &DataTable) -> Result<Self> {
        let n_cols = table.column_count();
        let mut data = Vec::with_capacity(table.row_count() * n_cols);

        for (row_idx, row) in table.rows.iter().enumerate() {
            for col_idx in 0..n_cols {
                let raw = row.get(col_idx).map(String::as_str).unwrap_or("");
                match parse_cell(raw) {
                    Some(value) => data.push(value),
                    None => {
                        let context =
                            DiagnosticContext::new(table.row_count(), table.headers.clone());
                        let reason = if DataTable::is_null_value(raw) {
                            "missing value"
                        } else {
                            "non-numeric value"
                        };
                        return Err(SentryError::transform(
                            format!(
                                "{} '{}' in column '{}' at row {}",
                                reason,
                                raw,
                                table.headers[col_idx],
                                row_idx + 1
                            ),
                            context,
                        ));
                    }
                }
            }
        }

        Self::new(table.headers.clone(), table.row_count(), data)
    }

    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    pub fn n_cols(&self) -> usize {
        self.columns.len()
    }

    pub fn column_names(&self) -> &[String] {
        &self.columns
    }

    /// One row of the matrix.
    pub fn row(&self, index: usize) -> &[f64] {
        let width = self.n_cols();
        &self.data[index * width..(index + 1) * width]
    }

    pub fn rows(&self) -> impl Iterator<Item = &[f64]> {
        (0..self.n_rows).map(move |i| self.row(i))
    }

    /// Shape description for error reports.
    pub fn context(&self) -> DiagnosticContext {
        DiagnosticContext::new(self.n_rows, self.columns.clone())
    }

    /// Apply `f(column, value)` to every cell, keeping shape and names.
    pub fn map_columns(&self, f: impl Fn(usize, f64) -> f64) -> FeatureMatrix {
        let width = self.n_cols();
        let data = self
            .data
            .iter()
            .enumerate()
            .map(|(i, &v)| f(i % width, v))
            .collect();
        FeatureMatrix {
            columns: self.columns.clone(),
            n_rows: self.n_rows,
            data,
        }
    }
}

fn parse_cell(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    if trimmed.eq_ignore_ascii_case("true") {
        return Some(1.0);
    }
    if trimmed.eq_ignore_ascii_case("false") {
        return Some(0.0);
    }
    trimmed.parse::<f64>().ok().filter(|v| v.is_finite())
}
