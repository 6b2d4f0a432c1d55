//! Main Sentry struct and public API.

use std::path::Path;

use tracing::{debug, info, warn};

use crate::error::{Result, SentryError};
use crate::inference::infer;
use crate::input::{DataTable, Parser, ParserConfig, SourceMetadata};
use crate::model::ModelBundle;
use crate::output::{PREDICTION_COLUMN, assemble};
use crate::report::{Notice, PredictionReport, ReconcileMode, RunOutcome};
use crate::schema::{DEFAULT_INDEX_COLUMN, Reconciler, Reconciliation};

/// Configuration for a Sentry instance.
#[derive(Debug, Clone)]
pub struct SentryConfig {
    /// Parser configuration for file and upload input.
    pub parser: ParserConfig,
    /// Column dropped from every upload before reconciliation.
    pub index_column: String,
    /// Name of the appended label column.
    pub prediction_column: String,
}

impl Default for SentryConfig {
    fn default() -> Self {
        Self {
            parser: ParserConfig::default(),
            index_column: DEFAULT_INDEX_COLUMN.to_string(),
            prediction_column: PREDICTION_COLUMN.to_string(),
        }
    }
}

/// Attack-type classifier over uploaded traffic tables.
///
/// Holds the loaded model bundle and runs the
/// reconcile -> transform -> predict -> assemble sequence for each table.
/// Safe to share across threads; nothing is mutated after construction.
#[derive(Debug, Clone)]
pub struct Sentry {
    config: SentryConfig,
    parser: Parser,
    reconciler: Reconciler,
    bundle: ModelBundle,
}

impl Sentry {
    /// Create a Sentry with default configuration.
    pub fn new(bundle: ModelBundle) -> Self {
        Self::with_config(bundle, SentryConfig::default())
    }

    /// Create a Sentry with custom configuration.
    pub fn with_config(bundle: ModelBundle, config: SentryConfig) -> Self {
        let parser = Parser::with_config(config.parser.clone());
        let reconciler = Reconciler::with_index_column(config.index_column.clone());

        Self {
            config,
            parser,
            reconciler,
            bundle,
        }
    }

    pub fn config(&self) -> &SentryConfig {
        &self.config
    }

    pub fn bundle(&self) -> &ModelBundle {
        &self.bundle
    }

    pub fn parser(&self) -> &Parser {
        &self.parser
    }

    /// Classify every row of `table`.
    ///
    /// Fails with [`SentryError::MissingFeatures`] before any numeric work
    /// when the table lacks expected features.
    pub fn predict(&self, mut table: DataTable) -> Result<PredictionReport> {
        debug!(
            rows = table.row_count(),
            columns = table.column_count(),
            "table received"
        );
        if table.row_count() == 0 {
            return Err(SentryError::EmptyData("table has no data rows".to_string()));
        }

        let mut notices = Vec::new();
        if self.reconciler.strip_index(&mut table) {
            debug!(column = self.reconciler.index_column(), "index column stripped");
            notices.push(Notice::IndexColumnDropped {
                column: self.reconciler.index_column().to_string(),
            });
        }

        let (mode, usable) = match self.reconciler.reconcile(&table, self.bundle.schema()) {
            Reconciliation::Rejected { missing } => {
                info!(missing = missing.len(), "rejected table with missing features");
                return Err(SentryError::MissingFeatures { missing });
            }
            Reconciliation::Accepted { extra, usable } => {
                if !extra.is_empty() {
                    warn!(
                        count = extra.len(),
                        "uploaded table has extra columns that will be ignored"
                    );
                    notices.push(Notice::ExtraColumnsIgnored { columns: extra });
                }
                (ReconcileMode::Strict, usable)
            }
            Reconciliation::Legacy { usable } => {
                warn!(
                    transform = self.bundle.transform().name(),
                    "transform has no feature names, using upload column order"
                );
                notices.push(Notice::DegradedMode {
                    reason: "the transform does not record its feature names, so columns are \
                             used in upload order"
                        .to_string(),
                });
                (ReconcileMode::Legacy, usable)
            }
        };
        debug!(?mode, features = usable.column_count(), "reconciled");

        let labels = infer(
            &usable,
            self.bundle.transform(),
            self.bundle.classifier(),
        )?;

        let (augmented, distribution) = assemble(table, labels, &self.config.prediction_column)?;
        if augmented.replaced_existing() {
            warn!(
                column = augmented.prediction_column(),
                "overwrote existing prediction column"
            );
            notices.push(Notice::PredictionColumnReplaced {
                column: augmented.prediction_column().to_string(),
            });
        }

        info!(
            rows = augmented.row_count(),
            labels = distribution.len(),
            "predictions assembled"
        );

        Ok(PredictionReport {
            source: None,
            mode,
            table: augmented,
            distribution,
            notices,
        })
    }

    /// Parse and classify a file on disk.
    pub fn predict_file(&self, path: impl AsRef<Path>) -> Result<PredictionReport> {
        let (table, source) = self.parser.parse_file(path)?;
        self.predict_with_source(table, source)
    }

    /// Parse and classify uploaded bytes.
    pub fn predict_upload(&self, name: &str, bytes: &[u8]) -> Result<PredictionReport> {
        let (table, source) = self.parser.parse_upload(name, bytes)?;
        self.predict_with_source(table, source)
    }

    /// Like [`Sentry::predict`], with errors folded into the outcome.
    pub fn process(&self, table: DataTable) -> RunOutcome {
        RunOutcome::from(self.predict(table))
    }

    fn predict_with_source(
        &self,
        table: DataTable,
        source: SourceMetadata,
    ) -> Result<PredictionReport> {
        let mut report = self.predict(table)?;
        report.source = Some(source);
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{DecisionTree, StandardScaler, TreeEnsemble, TreeNode};
    use std::io::Write;
    use tempfile::NamedTempFile;

    /// `rate > 0` after scaling -> DDoS, else Benign.
    fn classifier() -> TreeEnsemble {
        let tree = DecisionTree::new(vec![
            TreeNode::Split {
                feature: 0,
                threshold: 0.0,
                left: 1,
                right: 2,
            },
            TreeNode::Leaf {
                value: vec![1.0, 0.0],
            },
            TreeNode::Leaf {
                value: vec![0.0, 1.0],
            },
        ]);
        TreeEnsemble::new(vec!["Benign".into(), "DDoS".into()], 2, vec![tree]).unwrap()
    }

    fn sentry(names: Option<Vec<&str>>) -> Sentry {
        let names = names.map(|n| n.into_iter().map(String::from).collect());
        let scaler = StandardScaler::new(names, vec![0.0, 0.0], vec![1.0, 1.0]).unwrap();
        Sentry::new(ModelBundle::new(scaler, classifier()).unwrap())
    }

    #[test]
    fn test_predict_appends_labels() {
        let table = DataTable::from_rows(
            &["Unnamed: 0", "syn", "rate", "note"],
            &[&["0", "1", "5", "x"], &["1", "1", "-2", "y"]],
        );
        let report = sentry(Some(vec!["rate", "syn"])).predict(table).unwrap();

        assert_eq!(report.mode, ReconcileMode::Strict);
        assert_eq!(report.table.predictions(), vec!["DDoS", "Benign"]);
        assert_eq!(
            report.table.table().headers,
            vec!["syn", "rate", "note", PREDICTION_COLUMN]
        );
        assert!(report.notices.contains(&Notice::IndexColumnDropped {
            column: "Unnamed: 0".into()
        }));
        assert!(report.ignored_columns().contains("note"));
        assert_eq!(report.distribution.total(), 2);
    }

    #[test]
    fn test_missing_features_reject_before_inference() {
        // "rate" would fail numeric coercion if it were ever reached.
        let table = DataTable::from_rows(&["rate"], &[&["not a number"]]);
        let err = sentry(Some(vec!["rate", "syn"])).predict(table).unwrap_err();

        match err {
            SentryError::MissingFeatures { missing } => {
                assert_eq!(missing.into_iter().collect::<Vec<_>>(), vec!["syn"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_legacy_mode_uses_upload_order() {
        let table = DataTable::from_rows(&["a", "b"], &[&["3", "0"], &["-3", "0"]]);
        let report = sentry(None).predict(table).unwrap();

        assert!(report.is_degraded());
        assert_eq!(report.table.predictions(), vec!["DDoS", "Benign"]);
        assert!(
            report
                .notices
                .iter()
                .any(|n| matches!(n, Notice::DegradedMode { .. }))
        );
    }

    #[test]
    fn test_legacy_width_mismatch_is_transform_error() {
        let table = DataTable::from_rows(&["a", "b", "c"], &[&["1", "2", "3"]]);
        let err = sentry(None).predict(table).unwrap_err();
        assert_eq!(err.kind(), "transform");
    }

    #[test]
    fn test_existing_prediction_column_is_replaced() {
        let table = DataTable::from_rows(
            &["rate", "syn", PREDICTION_COLUMN],
            &[&["4", "0", "stale"]],
        );
        let report = sentry(Some(vec!["rate", "syn"])).predict(table).unwrap();

        assert_eq!(report.table.table().column_count(), 3);
        assert_eq!(report.table.predictions(), vec!["DDoS"]);
        assert!(
            report
                .notices
                .iter()
                .any(|n| matches!(n, Notice::PredictionColumnReplaced { .. }))
        );
    }

    #[test]
    fn test_empty_table() {
        let table = DataTable::from_rows(&["rate", "syn"], &[]);
        let err = sentry(Some(vec!["rate", "syn"])).predict(table).unwrap_err();
        assert_eq!(err.kind(), "empty_data");
    }

    #[test]
    fn test_process_folds_outcomes() {
        let s = sentry(Some(vec!["rate", "syn"]));

        let ok = s.process(DataTable::from_rows(&["rate", "syn"], &[&["1", "1"]]));
        assert!(ok.is_delivered());

        let rejected = s.process(DataTable::from_rows(&["rate"], &[&["1"]]));
        assert!(matches!(rejected, RunOutcome::Rejected { .. }));

        let failed = s.process(DataTable::from_rows(&["rate", "syn"], &[&["", "1"]]));
        assert!(matches!(failed, RunOutcome::Failed { ref kind, .. } if kind == "transform"));
    }

    #[test]
    fn test_predict_file_records_source() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b",rate,syn\n0,2,1\n1,-1,0\n").unwrap();

        let report = sentry(Some(vec!["rate", "syn"]))
            .predict_file(file.path())
            .unwrap();

        let source = report.source.as_ref().unwrap();
        assert_eq!(source.row_count, 2);
        assert_eq!(report.table.predictions(), vec!["DDoS", "Benign"]);
    }

    #[test]
    fn test_custom_config() {
        let config = SentryConfig {
            index_column: "idx".to_string(),
            prediction_column: "label".to_string(),
            ..SentryConfig::default()
        };
        let base = sentry(Some(vec!["rate", "syn"]));
        let s = Sentry::with_config(base.bundle().clone(), config);

        let table = DataTable::from_rows(&["idx", "rate", "syn"], &[&["7", "1", "0"]]);
        let report = s.predict(table).unwrap();
        assert_eq!(report.table.table().headers, vec!["rate", "syn", "label"]);
    }
}
