//! Loading the fitted transform + classifier pair.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::classifier::{Classifier, TreeEnsemble};
use super::transform::{FeatureTransform, ScalerArtifact};
use crate::error::{Result, SentryError};
use crate::schema::FeatureSchema;

/// Directory, next to the executable, that holds the bundle.
pub const BUNDLE_DIR_NAME: &str = "model";

/// Default file name of the serialized transform.
pub const DEFAULT_TRANSFORM_FILE: &str = "scaler.json";

/// Default file name of the serialized classifier.
pub const DEFAULT_CLASSIFIER_FILE: &str = "extra_trees_model.json";

/// Bundle directory resolved against the running executable's location.
pub fn default_bundle_dir() -> Result<PathBuf> {
    let exe = std::env::current_exe().map_err(|e| SentryError::Io {
        path: PathBuf::from("<current executable>"),
        source: e,
    })?;
    let dir = exe.parent().ok_or_else(|| {
        SentryError::Config(format!(
            "executable path '{}' has no parent directory",
            exe.display()
        ))
    })?;
    Ok(dir.join(BUNDLE_DIR_NAME))
}

/// The loaded transform and classifier, shared read-only.
#[derive(Clone)]
pub struct ModelBundle {
    transform: Arc<dyn FeatureTransform>,
    classifier: Arc<dyn Classifier>,
    schema: Option<FeatureSchema>,
    source: Option<PathBuf>,
}

impl ModelBundle {
    /// Assemble a bundle from already-fitted artifacts.
    ///
    /// Fails if the transform declares an unusable feature list.
    pub fn new(
        transform: impl FeatureTransform + 'static,
        classifier: impl Classifier + 'static,
    ) -> Result<Self> {
        Self::from_shared(Arc::new(transform), Arc::new(classifier))
    }

    /// Assemble a bundle from shared artifacts.
    pub fn from_shared(
        transform: Arc<dyn FeatureTransform>,
        classifier: Arc<dyn Classifier>,
    ) -> Result<Self> {
        let schema = transform
            .feature_names()
            .map(|names| FeatureSchema::new(names.to_vec()))
            .transpose()?;

        Ok(Self {
            transform,
            classifier,
            schema,
            source: None,
        })
    }

    /// Expected-feature contract, or `None` for legacy transforms.
    pub fn schema(&self) -> Option<&FeatureSchema> {
        self.schema.as_ref()
    }

    pub fn transform(&self) -> &dyn FeatureTransform {
        self.transform.as_ref()
    }

    pub fn classifier(&self) -> &dyn Classifier {
        self.classifier.as_ref()
    }

    /// Directory the bundle was loaded from, if it came from disk.
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    /// Serializable description for display.
    pub fn summary(&self) -> BundleSummary {
        BundleSummary {
            source: self.source.clone(),
            transform: self.transform.name().to_string(),
            classifier: self.classifier.name().to_string(),
            n_features: self.transform.n_features(),
            features: self.schema.as_ref().map(|s| s.features().to_vec()),
            classes: self.classifier.classes().to_vec(),
        }
    }
}

impl fmt::Debug for ModelBundle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelBundle")
            .field("transform", &self.transform.name())
            .field("classifier", &self.classifier.name())
            .field("schema", &self.schema)
            .field("source", &self.source)
            .finish()
    }
}

/// Bundle description returned by `schema` commands and endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BundleSummary {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<PathBuf>,
    pub transform: String,
    pub classifier: String,
    pub n_features: usize,
    /// `None` when the transform predates recorded feature names.
    pub features: Option<Vec<String>>,
    pub classes: Vec<String>,
}

/// Reads the bundle from a directory.
#[derive(Debug, Clone)]
pub struct BundleLoader {
    dir: PathBuf,
    transform_file: String,
    classifier_file: String,
}

impl BundleLoader {
    /// Load from `dir` with the default file names.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            transform_file: DEFAULT_TRANSFORM_FILE.to_string(),
            classifier_file: DEFAULT_CLASSIFIER_FILE.to_string(),
        }
    }

    /// Load from the `model` directory next to the running executable.
    pub fn from_executable() -> Result<Self> {
        Ok(Self::new(default_bundle_dir()?))
    }

    pub fn with_transform_file(mut self, name: impl Into<String>) -> Self {
        self.transform_file = name.into();
        self
    }

    pub fn with_classifier_file(mut self, name: impl Into<String>) -> Self {
        self.classifier_file = name.into();
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn transform_path(&self) -> PathBuf {
        self.dir.join(&self.transform_file)
    }

    pub fn classifier_path(&self) -> PathBuf {
        self.dir.join(&self.classifier_file)
    }

    /// Read and deserialize both artifacts.
    pub fn load(&self) -> Result<ModelBundle> {
        let transform_path = self.transform_path();
        let classifier_path = self.classifier_path();

        // Report every absent file before touching either one.
        for path in [&transform_path, &classifier_path] {
            if !path.is_file() {
                return Err(SentryError::ArtifactNotFound { path: path.clone() });
            }
        }

        let scaler: ScalerArtifact = read_artifact(&transform_path)?;
        scaler.validate().map_err(|message| SentryError::ArtifactCorrupt {
            path: transform_path.clone(),
            message,
        })?;

        let ensemble: TreeEnsemble = read_artifact(&classifier_path)?;
        ensemble
            .validate()
            .map_err(|message| SentryError::ArtifactCorrupt {
                path: classifier_path.clone(),
                message,
            })?;

        if scaler.n_features() != ensemble.n_features() {
            warn!(
                transform = scaler.n_features(),
                classifier = ensemble.n_features(),
                "transform and classifier disagree on feature count"
            );
        }

        let mut bundle =
            ModelBundle::new(scaler, ensemble).map_err(|e| SentryError::ArtifactCorrupt {
                path: transform_path.clone(),
                message: e.to_string(),
            })?;
        bundle.source = Some(self.dir.clone());

        info!(
            dir = %self.dir.display(),
            transform = bundle.transform().name(),
            features = bundle.transform().n_features(),
            classes = bundle.classifier().classes().len(),
            schema = bundle.schema().is_some(),
            "model bundle loaded"
        );

        Ok(bundle)
    }
}

fn read_artifact<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let bytes = std::fs::read(path).map_err(|e| SentryError::ArtifactCorrupt {
        path: path.to_path_buf(),
        message: format!("unreadable: {}", e),
    })?;
    serde_json::from_slice(&bytes).map_err(|e| SentryError::ArtifactCorrupt {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const SCALER: &str = r#"{
        "kind": "standard",
        "feature_names_in": ["a", "b"],
        "mean": [0.0, 0.0],
        "scale": [1.0, 1.0]
    }"#;

    const MODEL: &str = r#"{
        "classes": ["Benign", "DDoS"],
        "n_features_in": 2,
        "trees": [{"nodes": [
            {"feature": 0, "threshold": 0.5, "left": 1, "right": 2},
            {"value": [1, 0]},
            {"value": [0, 1]}
        ]}]
    }"#;

    fn bundle_dir(scaler: Option<&str>, model: Option<&str>) -> TempDir {
        let dir = TempDir::new().unwrap();
        if let Some(s) = scaler {
            std::fs::write(dir.path().join(DEFAULT_TRANSFORM_FILE), s).unwrap();
        }
        if let Some(m) = model {
            std::fs::write(dir.path().join(DEFAULT_CLASSIFIER_FILE), m).unwrap();
        }
        dir
    }

    #[test]
    fn test_load_bundle() {
        let dir = bundle_dir(Some(SCALER), Some(MODEL));
        let bundle = BundleLoader::new(dir.path()).load().unwrap();

        assert_eq!(bundle.schema().unwrap().features(), &["a", "b"]);
        assert_eq!(bundle.classifier().classes(), &["Benign", "DDoS"]);
        assert_eq!(bundle.source(), Some(dir.path()));

        let summary = bundle.summary();
        assert_eq!(summary.n_features, 2);
        assert_eq!(summary.transform, "standard_scaler");
    }

    #[test]
    fn test_missing_artifact() {
        let dir = bundle_dir(Some(SCALER), None);
        let err = BundleLoader::new(dir.path()).load().unwrap_err();

        match err {
            SentryError::ArtifactNotFound { path } => {
                assert!(path.ends_with(DEFAULT_CLASSIFIER_FILE));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_corrupt_artifact() {
        let dir = bundle_dir(Some("{not json"), Some(MODEL));
        let err = BundleLoader::new(dir.path()).load().unwrap_err();
        assert_eq!(err.kind(), "artifact_corrupt");

        let dir = bundle_dir(Some(SCALER), Some(r#"{"classes": [], "n_features_in": 2, "trees": []}"#));
        let err = BundleLoader::new(dir.path()).load().unwrap_err();
        assert_eq!(err.kind(), "artifact_corrupt");
    }

    #[test]
    fn test_read_failure_is_corrupt_artifact() {
        // The file vanished after the existence check.
        let dir = TempDir::new().unwrap();
        let err = read_artifact::<ScalerArtifact>(&dir.path().join("gone.json")).unwrap_err();

        assert_eq!(err.kind(), "artifact_corrupt");
        assert!(err.to_string().contains("unreadable"));
    }

    #[test]
    fn test_custom_file_names() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("t.json"), SCALER).unwrap();
        std::fs::write(dir.path().join("c.json"), MODEL).unwrap();

        let loader = BundleLoader::new(dir.path())
            .with_transform_file("t.json")
            .with_classifier_file("c.json");
        assert!(loader.load().is_ok());
    }

    #[test]
    fn test_default_dir_is_next_to_executable() {
        let dir = default_bundle_dir().unwrap();
        let exe = std::env::current_exe().unwrap();

        assert!(dir.ends_with(BUNDLE_DIR_NAME));
        assert_eq!(dir.parent(), exe.parent());
    }
}
