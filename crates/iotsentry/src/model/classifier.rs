//! Fitted classifiers.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use super::matrix::FeatureMatrix;
use crate::error::{Result, SentryError};

/// A fitted classifier producing one label per matrix row.
pub trait Classifier: Send + Sync {
    /// Short name used in logs and summaries.
    fn name(&self) -> &str;

    /// Labels the classifier can emit.
    fn classes(&self) -> &[String];

    /// Number of input columns the classifier expects.
    fn n_features(&self) -> usize;

    /// Predict one label per row, in row order.
    fn predict(&self, input: &FeatureMatrix) -> Result<Vec<String>>;
}

/// A node of a fitted decision tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TreeNode {
    /// Rows with `x[feature] <= threshold` go to `left`, the rest to `right`.
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    /// Per-class weights (counts or fractions) at a leaf.
    Leaf { value: Vec<f64> },
}

/// A fitted decision tree stored as a flat node list rooted at index 0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTree {
    nodes: Vec<TreeNode>,
}

impl DecisionTree {
    pub fn new(nodes: Vec<TreeNode>) -> Self {
        Self { nodes }
    }

    pub fn nodes(&self) -> &[TreeNode] {
        &self.nodes
    }

    /// Walk from the root to the leaf reached by `row`.
    ///
    /// Returns `None` for a dangling child, an out-of-range feature, or a
    /// child that does not point forward.
    fn leaf(&self, row: &[f64]) -> Option<&[f64]> {
        let mut index = 0;
        loop {
            match self.nodes.get(index)? {
                TreeNode::Leaf { value } => return Some(value),
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    let next = if *row.get(*feature)? <= *threshold {
                        *left
                    } else {
                        *right
                    };
                    if next <= index {
                        return None;
                    }
                    index = next;
                }
            }
        }
    }

    fn validate(&self, n_features: usize, n_classes: usize) -> std::result::Result<(), String> {
        if self.nodes.is_empty() {
            return Err("tree has no nodes".to_string());
        }

        for (i, node) in self.nodes.iter().enumerate() {
            match node {
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    if *feature >= n_features {
                        return Err(format!(
                            "node {} splits on feature {} of {}",
                            i, feature, n_features
                        ));
                    }
                    if !threshold.is_finite() {
                        return Err(format!("node {} has a non-finite threshold", i));
                    }
                    for child in [*left, *right] {
                        if child <= i || child >= self.nodes.len() {
                            return Err(format!("node {} has invalid child {}", i, child));
                        }
                    }
                }
                TreeNode::Leaf { value } => {
                    if value.len() != n_classes {
                        return Err(format!(
                            "leaf {} has {} class weights, expected {}",
                            i,
                            value.len(),
                            n_classes
                        ));
                    }
                    if value.iter().any(|v| !v.is_finite() || *v < 0.0) {
                        return Err(format!("leaf {} has invalid class weights", i));
                    }
                }
            }
        }

        Ok(())
    }
}

/// Averaging ensemble of decision trees (extra-trees / random-forest style).
///
/// Each tree votes with its leaf's normalized class distribution; the label
/// is the first class with the highest mean probability.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreeEnsemble {
    classes: Vec<String>,
    n_features_in: usize,
    trees: Vec<DecisionTree>,
}

impl TreeEnsemble {
    pub fn new(classes: Vec<String>, n_features_in: usize, trees: Vec<DecisionTree>) -> Result<Self> {
        let ensemble = Self {
            classes,
            n_features_in,
            trees,
        };
        ensemble.validate().map_err(SentryError::Config)?;
        Ok(ensemble)
    }

    pub fn trees(&self) -> &[DecisionTree] {
        &self.trees
    }

    /// Check internal consistency after deserialization.
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.classes.is_empty() {
            return Err("classifier declares no classes".to_string());
        }
        let mut seen = HashSet::new();
        if let Some(dup) = self.classes.iter().find(|c| !seen.insert(c.as_str())) {
            return Err(format!("duplicate class '{}'", dup));
        }
        if self.n_features_in == 0 {
            return Err("classifier declares no input features".to_string());
        }
        if self.trees.is_empty() {
            return Err("ensemble has no trees".to_string());
        }
        for (i, tree) in self.trees.iter().enumerate() {
            tree.validate(self.n_features_in, self.classes.len())
                .map_err(|e| format!("tree {}: {}", i, e))?;
        }
        Ok(())
    }

    /// Mean class probabilities for every row.
    pub fn predict_proba(&self, input: &FeatureMatrix) -> Result<Vec<Vec<f64>>> {
        if input.n_cols() != self.n_features_in {
            return Err(SentryError::prediction(
                format!(
                    "classifier expects {} features, got {}",
                    self.n_features_in,
                    input.n_cols()
                ),
                input.context(),
            ));
        }

        let n_trees = self.trees.len() as f64;
        let mut probabilities = Vec::with_capacity(input.n_rows());
        for (row_idx, row) in input.rows().enumerate() {
            let mut acc = vec![0.0; self.classes.len()];
            for (tree_idx, tree) in self.trees.iter().enumerate() {
                let Some(leaf) = tree.leaf(row) else {
                    return Err(SentryError::prediction(
                        format!("tree {} is malformed at row {}", tree_idx, row_idx + 1),
                        input.context(),
                    ));
                };
                let total: f64 = leaf.iter().sum();
                if total > 0.0 {
                    for (slot, weight) in acc.iter_mut().zip(leaf) {
                        *slot += weight / total;
                    }
                }
            }
            acc.iter_mut().for_each(|p| *p /= n_trees);
            probabilities.push(acc);
        }

        Ok(probabilities)
    }
}

impl Classifier for TreeEnsemble {
    fn name(&self) -> &str {
        "tree_ensemble"
    }

    fn classes(&self) -> &[String] {
        &self.classes
    }

    fn n_features(&self) -> usize {
        self.n_features_in
    }

    fn predict(&self, input: &FeatureMatrix) -> Result<Vec<String>> {
        let probabilities = self.predict_proba(input)?;
        probabilities
            .iter()
            .map(|p| {
                self.classes.get(argmax(p)).cloned().ok_or_else(|| {
                    SentryError::prediction("leaf weights exceed class count", input.context())
                })
            })
            .collect()
    }
}

/// Index of the first maximum.
fn argmax(values: &[f64]) -> usize {
    let mut best = 0;
    for (i, v) in values.iter().enumerate() {
        if *v > values[best] {
            best = i;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classes() -> Vec<String> {
        vec!["Benign".to_string(), "DDoS".to_string()]
    }

    /// `x[feature] <= threshold` -> Benign, else DDoS.
    fn stump(feature: usize, threshold: f64) -> DecisionTree {
        DecisionTree::new(vec![
            TreeNode::Split {
                feature,
                threshold,
                left: 1,
                right: 2,
            },
            TreeNode::Leaf {
                value: vec![10.0, 0.0],
            },
            TreeNode::Leaf {
                value: vec![1.0, 9.0],
            },
        ])
    }

    fn matrix(rows: &[&[f64]]) -> FeatureMatrix {
        let width = rows[0].len();
        let columns = (0..width).map(|i| format!("f{}", i)).collect();
        let data = rows.iter().flat_map(|r| r.iter().copied()).collect();
        FeatureMatrix::new(columns, rows.len(), data).unwrap()
    }

    #[test]
    fn test_single_tree_prediction() {
        let model = TreeEnsemble::new(classes(), 2, vec![stump(1, 0.5)]).unwrap();
        let labels = model.predict(&matrix(&[&[9.0, 0.1], &[0.0, 3.0]])).unwrap();
        assert_eq!(labels, vec!["Benign", "DDoS"]);
    }

    #[test]
    fn test_ensemble_averages_probabilities() {
        let model =
            TreeEnsemble::new(classes(), 2, vec![stump(0, 0.0), stump(1, 0.0)]).unwrap();
        let proba = model.predict_proba(&matrix(&[&[1.0, -1.0]])).unwrap();

        // Tree 0 says DDoS (0.1, 0.9); tree 1 says Benign (1.0, 0.0).
        assert!((proba[0][0] - 0.55).abs() < 1e-12);
        assert!((proba[0][1] - 0.45).abs() < 1e-12);
        assert_eq!(model.predict(&matrix(&[&[1.0, -1.0]])).unwrap(), vec!["Benign"]);
    }

    #[test]
    fn test_ties_pick_first_class() {
        assert_eq!(argmax(&[0.5, 0.5]), 0);
        assert_eq!(argmax(&[0.1, 0.7, 0.7]), 1);
    }

    #[test]
    fn test_width_mismatch_is_prediction_error() {
        let model = TreeEnsemble::new(classes(), 2, vec![stump(0, 0.0)]).unwrap();
        let err = model.predict(&matrix(&[&[1.0, 2.0, 3.0]])).unwrap_err();
        assert_eq!(err.kind(), "prediction");
    }

    #[test]
    fn test_validate_rejects_bad_trees() {
        let backwards = DecisionTree::new(vec![
            TreeNode::Leaf {
                value: vec![1.0, 0.0],
            },
            TreeNode::Split {
                feature: 0,
                threshold: 0.0,
                left: 0,
                right: 0,
            },
        ]);
        assert!(TreeEnsemble::new(classes(), 1, vec![backwards]).is_err());
        assert!(TreeEnsemble::new(classes(), 1, vec![stump(3, 0.0)]).is_err());
        assert!(TreeEnsemble::new(classes(), 1, Vec::new()).is_err());

        let dup = vec!["a".to_string(), "a".to_string()];
        assert!(TreeEnsemble::new(dup, 1, vec![stump(0, 0.0)]).is_err());
    }

    #[test]
    fn test_nodes_deserialize_untagged() {
        let json = r#"{"nodes": [
            {"feature": 0, "threshold": 1.5, "left": 1, "right": 2},
            {"value": [3, 0]},
            {"value": [0, 3]}
        ]}"#;
        let tree: DecisionTree = serde_json::from_str(json).unwrap();
        assert_eq!(tree.nodes().len(), 3);
        assert!(matches!(tree.nodes()[0], TreeNode::Split { feature: 0, .. }));
        assert!(matches!(tree.nodes()[2], TreeNode::Leaf { .. }));
    }

    #[test]
    fn test_unvalidated_tree_fails_instead_of_panicking() {
        // A self-loop and a dangling child, deserialized without validation.
        let json = r#"{
            "classes": ["Benign", "DDoS"],
            "n_features_in": 1,
            "trees": [{"nodes": [
                {"feature": 0, "threshold": 0.0, "left": 0, "right": 7}
            ]}]
        }"#;
        let model: TreeEnsemble = serde_json::from_str(json).unwrap();
        assert!(model.validate().is_err());

        for value in [-1.0, 1.0] {
            let err = model.predict(&matrix(&[&[value]])).unwrap_err();
            assert_eq!(err.kind(), "prediction");
        }
    }

    #[test]
    fn test_out_of_range_feature_fails() {
        let tree = stump(4, 0.0);
        assert!(tree.leaf(&[1.0]).is_none());
        assert_eq!(stump(0, 0.0).leaf(&[1.0]), Some(&[1.0, 9.0][..]));
    }
}
