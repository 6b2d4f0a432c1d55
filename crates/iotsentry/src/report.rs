//! Results of a prediction run.

use std::collections::BTreeSet;
use std::fmt;

use serde::Serialize;

use crate::error::SentryError;
use crate::input::SourceMetadata;
use crate::output::{AugmentedTable, LabelDistribution};

/// How the usable columns were chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReconcileMode {
    /// Columns selected by name against the transform's feature list.
    Strict,
    /// No feature list available; columns taken in upload order.
    Legacy,
}

/// A non-fatal diagnostic attached to a successful run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Notice {
    IndexColumnDropped { column: String },
    ExtraColumnsIgnored { columns: BTreeSet<String> },
    DegradedMode { reason: String },
    PredictionColumnReplaced { column: String },
}

impl Notice {
    /// Warnings deserve more prominent display than informational notices.
    pub fn is_warning(&self) -> bool {
        matches!(
            self,
            Notice::ExtraColumnsIgnored { .. } | Notice::DegradedMode { .. }
        )
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Notice::IndexColumnDropped { column } => {
                write!(f, "Dropped index column '{}'", column)
            }
            Notice::ExtraColumnsIgnored { columns } => {
                let names: Vec<&str> = columns.iter().map(String::as_str).collect();
                write!(
                    f,
                    "Extra features in uploaded data (will be ignored): {}",
                    names.join(", ")
                )
            }
            Notice::DegradedMode { reason } => {
                write!(f, "Degraded mode: {}", reason)
            }
            Notice::PredictionColumnReplaced { column } => {
                write!(f, "Existing column '{}' was overwritten", column)
            }
        }
    }
}

/// Everything a successful run produces.
#[derive(Debug, Clone, Serialize)]
pub struct PredictionReport {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<SourceMetadata>,
    pub mode: ReconcileMode,
    pub table: AugmentedTable,
    pub distribution: LabelDistribution,
    pub notices: Vec<Notice>,
}

impl PredictionReport {
    pub fn row_count(&self) -> usize {
        self.table.row_count()
    }

    /// Columns present in the upload but not used by the model.
    pub fn ignored_columns(&self) -> BTreeSet<String> {
        self.notices
            .iter()
            .find_map(|n| match n {
                Notice::ExtraColumnsIgnored { columns } => Some(columns.clone()),
                _ => None,
            })
            .unwrap_or_default()
    }

    pub fn is_degraded(&self) -> bool {
        self.mode == ReconcileMode::Legacy
    }

    /// A compact, serializable summary holding the first `preview_rows` rows.
    pub fn view(&self, preview_rows: usize) -> ReportView {
        let table = self.table.table();
        ReportView {
            source: self.source.clone(),
            mode: self.mode,
            row_count: table.row_count(),
            prediction_column: self.table.prediction_column().to_string(),
            headers: table.headers.clone(),
            preview: table.head(preview_rows).to_vec(),
            distribution: self.distribution.clone(),
            notices: self.notices.clone(),
        }
    }
}

/// Summary of a report for JSON responses.
#[derive(Debug, Clone, Serialize)]
pub struct ReportView {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<SourceMetadata>,
    pub mode: ReconcileMode,
    pub row_count: usize,
    pub prediction_column: String,
    pub headers: Vec<String>,
    pub preview: Vec<Vec<String>>,
    pub distribution: LabelDistribution,
    pub notices: Vec<Notice>,
}

/// Outcome of one run, with errors folded in.
#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RunOutcome {
    Delivered { report: Box<PredictionReport> },
    Rejected { missing: BTreeSet<String> },
    Failed { kind: String, message: String },
}

impl RunOutcome {
    pub fn is_delivered(&self) -> bool {
        matches!(self, RunOutcome::Delivered { .. })
    }

    pub fn report(&self) -> Option<&PredictionReport> {
        match self {
            RunOutcome::Delivered { report } => Some(report),
            _ => None,
        }
    }
}

impl From<crate::error::Result<PredictionReport>> for RunOutcome {
    fn from(result: crate::error::Result<PredictionReport>) -> Self {
        match result {
            Ok(report) => RunOutcome::Delivered {
                report: Box::new(report),
            },
            Err(SentryError::MissingFeatures { missing }) => RunOutcome::Rejected { missing },
            Err(e) => RunOutcome::Failed {
                kind: e.kind().to_string(),
                message: e.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::DataTable;
    use crate::output::{PREDICTION_COLUMN, assemble};

    fn report(notices: Vec<Notice>) -> PredictionReport {
        let table = DataTable::from_rows(&["a"], &[&["1"], &["2"], &["3"]]);
        let labels = vec!["DDoS".to_string(), "Benign".to_string(), "DDoS".to_string()];
        let (table, distribution) = assemble(table, labels, PREDICTION_COLUMN).unwrap();
        PredictionReport {
            source: None,
            mode: ReconcileMode::Strict,
            table,
            distribution,
            notices,
        }
    }

    #[test]
    fn test_notice_messages() {
        let columns: BTreeSet<String> = ["z", "y"].iter().map(|s| s.to_string()).collect();
        let notice = Notice::ExtraColumnsIgnored { columns };
        assert_eq!(
            notice.to_string(),
            "Extra features in uploaded data (will be ignored): y, z"
        );
        assert!(notice.is_warning());
        assert!(
            !Notice::IndexColumnDropped {
                column: "Unnamed: 0".into()
            }
            .is_warning()
        );
    }

    #[test]
    fn test_ignored_columns() {
        let columns: BTreeSet<String> = ["extra"].iter().map(|s| s.to_string()).collect();
        let r = report(vec![Notice::ExtraColumnsIgnored {
            columns: columns.clone(),
        }]);
        assert_eq!(r.ignored_columns(), columns);
        assert!(report(Vec::new()).ignored_columns().is_empty());
    }

    #[test]
    fn test_view_truncates_preview() {
        let view = report(Vec::new()).view(2);
        assert_eq!(view.row_count, 3);
        assert_eq!(view.preview.len(), 2);
        assert_eq!(view.headers, vec!["a", PREDICTION_COLUMN]);
        assert_eq!(view.distribution.get("DDoS"), 2);
    }

    #[test]
    fn test_outcome_from_errors() {
        let missing: BTreeSet<String> = ["rate"].iter().map(|s| s.to_string()).collect();
        let outcome = RunOutcome::from(Err(SentryError::MissingFeatures {
            missing: missing.clone(),
        }));
        assert!(matches!(outcome, RunOutcome::Rejected { missing: m } if m == missing));

        let outcome = RunOutcome::from(Err(SentryError::ShapeMismatch {
            expected: 2,
            actual: 1,
        }));
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["status"], "failed");
        assert_eq!(json["kind"], "shape_mismatch");
    }

    #[test]
    fn test_delivered_serialization() {
        let outcome = RunOutcome::from(Ok(report(Vec::new())));
        assert!(outcome.is_delivered());

        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["status"], "delivered");
        assert_eq!(json["report"]["mode"], "strict");
        assert_eq!(json["report"]["distribution"]["DDoS"], 2);
    }
}
