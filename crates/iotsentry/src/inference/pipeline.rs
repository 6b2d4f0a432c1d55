//! Two-stage transform -> predict computation.

use tracing::debug;

use crate::error::{Result, SentryError};
use crate::input::DataTable;
use crate::model::{Classifier, FeatureMatrix, FeatureTransform};

/// Predict one label per row of a reconciled table.
///
/// The table's cells are coerced to numbers, normalized by `transform` and
/// classified by `classifier`. Any failure aborts the whole table; there are
/// no partial results. Labels come back in input row order.
pub fn infer(
    usable: &DataTable,
    transform: &dyn FeatureTransform,
    classifier: &dyn Classifier,
) -> Result<Vec<String>> {
    let raw = FeatureMatrix::from_table(usable)?;
    debug!(
        rows = raw.n_rows(),
        columns = raw.n_cols(),
        transform = transform.name(),
        "normalizing features"
    );

    let normalized = transform.transform(&raw)?;
    if normalized.n_rows() != raw.n_rows() {
        return Err(SentryError::ShapeMismatch {
            expected: raw.n_rows(),
            actual: normalized.n_rows(),
        });
    }
    check_finite(&normalized)?;

    let labels = classifier.predict(&normalized).map_err(|e| match e {
        SentryError::Prediction { .. } | SentryError::ShapeMismatch { .. } => e,
        other => SentryError::prediction(other.to_string(), normalized.context()),
    })?;

    if labels.len() != raw.n_rows() {
        return Err(SentryError::ShapeMismatch {
            expected: raw.n_rows(),
            actual: labels.len(),
        });
    }

    debug!(rows = labels.len(), classifier = classifier.name(), "predicted");
    Ok(labels)
}

/// A finite input divided by a tiny fitted scale can overflow.
fn check_finite(normalized: &FeatureMatrix) -> Result<()> {
    for (row_idx, row) in normalized.rows().enumerate() {
        if let Some(col_idx) = row.iter().position(|v| !v.is_finite()) {
            let column = normalized
                .column_names()
                .get(col_idx)
                .map(String::as_str)
                .unwrap_or("?");
            return Err(SentryError::prediction(
                format!(
                    "non-finite value after normalization in column '{}' at row {}",
                    column,
                    row_idx + 1
                ),
                normalized.context(),
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{DecisionTree, StandardScaler, TreeEnsemble, TreeNode};

    struct ShortClassifier;

    impl Classifier for ShortClassifier {
        fn name(&self) -> &str {
            "short"
        }

        fn classes(&self) -> &[String] {
            &[]
        }

        fn n_features(&self) -> usize {
            1
        }

        fn predict(&self, _input: &FeatureMatrix) -> Result<Vec<String>> {
            Ok(Vec::new())
        }
    }

    struct FailingClassifier;

    impl Classifier for FailingClassifier {
        fn name(&self) -> &str {
            "failing"
        }

        fn classes(&self) -> &[String] {
            &[]
        }

        fn n_features(&self) -> usize {
            1
        }

        fn predict(&self, _input: &FeatureMatrix) -> Result<Vec<String>> {
            Err(SentryError::Config("weights not loaded".to_string()))
        }
    }

    fn scaler() -> StandardScaler {
        StandardScaler::new(None, vec![10.0], vec![5.0]).unwrap()
    }

    fn threshold_model() -> TreeEnsemble {
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
        TreeEnsemble::new(vec!["Benign".into(), "Scan".into()], 1, vec![tree]).unwrap()
    }

    #[test]
    fn test_infer_normalizes_before_predicting() {
        // Normalized value is (x - 10) / 5, so only x > 10 crosses the split.
        let table = DataTable::from_rows(&["rate"], &[&["12"], &["3"], &["10"]]);
        let labels = infer(&table, &scaler(), &threshold_model()).unwrap();
        assert_eq!(labels, vec!["Scan", "Benign", "Benign"]);
    }

    #[test]
    fn test_overflow_after_normalization_is_prediction_error() {
        let tiny = StandardScaler::new(None, vec![0.0], vec![1e-10]).unwrap();
        let table = DataTable::from_rows(&["rate"], &[&["1"], &["1e300"]]);
        let err = infer(&table, &tiny, &threshold_model()).unwrap_err();

        assert_eq!(err.kind(), "prediction");
        let message = err.to_string();
        assert!(message.contains("'rate'"), "message was: {message}");
        assert!(message.contains("row 2"), "message was: {message}");
    }

    #[test]
    fn test_non_numeric_cell_is_transform_error() {
        let table = DataTable::from_rows(&["rate"], &[&["12"], &["fast"]]);
        let err = infer(&table, &scaler(), &threshold_model()).unwrap_err();
        assert_eq!(err.kind(), "transform");
    }

    #[test]
    fn test_short_prediction_is_shape_mismatch() {
        let table = DataTable::from_rows(&["rate"], &[&["1"], &["2"]]);
        let err = infer(&table, &scaler(), &ShortClassifier).unwrap_err();
        assert!(matches!(
            err,
            SentryError::ShapeMismatch {
                expected: 2,
                actual: 0
            }
        ));
    }

    #[test]
    fn test_classifier_failures_become_prediction_errors() {
        let table = DataTable::from_rows(&["rate"], &[&["1"]]);
        let err = infer(&table, &scaler(), &FailingClassifier).unwrap_err();

        match err {
            SentryError::Prediction { message, context } => {
                assert!(message.contains("weights not loaded"));
                assert_eq!(context.rows, 1);
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
