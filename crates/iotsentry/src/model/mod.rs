//! Fitted model artifacts and the bundle that carries them.
//!
//! A bundle is a normalization transform plus a classifier, both fitted
//! elsewhere and serialized as JSON:
//!
//! - `scaler.json`: a [`ScalerArtifact`] tagged by `kind` (`standard` or
//!   `min_max`), optionally recording `feature_names_in`.
//! - `extra_trees_model.json`: a [`TreeEnsemble`] of flat-node decision trees.
//!
//! The bundle is loaded once, then shared read-only by every request.

mod bundle;
mod classifier;
mod matrix;
mod transform;

pub use bundle::{
    BUNDLE_DIR_NAME, BundleLoader, BundleSummary, DEFAULT_CLASSIFIER_FILE, DEFAULT_TRANSFORM_FILE,
    ModelBundle, default_bundle_dir,
};
pub use classifier::{Classifier, DecisionTree, TreeEnsemble, TreeNode};
pub use matrix::FeatureMatrix;
pub use transform::{FeatureTransform, MinMaxScaler, ScalerArtifact, StandardScaler};
