//! Fitted normalization transforms.

use serde::{Deserialize, Serialize};

use super::matrix::FeatureMatrix;
use crate::error::{Result, SentryError};
use crate::schema::FeatureSchema;

/// A fitted transform that re-expresses raw feature values.
pub trait FeatureTransform: Send + Sync {
    /// Short name used in logs and summaries.
    fn name(&self) -> &str;

    /// Feature names the transform was fitted on, when the artifact records them.
    fn feature_names(&self) -> Option<&[String]>;

    /// Number of input columns the transform expects.
    fn n_features(&self) -> usize;

    /// Transform a matrix. Rows are preserved one to one.
    fn transform(&self, input: &FeatureMatrix) -> Result<FeatureMatrix>;
}

/// Serialized scaler artifact, tagged by `kind`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ScalerArtifact {
    Standard(StandardScaler),
    MinMax(MinMaxScaler),
}

impl ScalerArtifact {
    /// Check internal consistency after deserialization.
    pub fn validate(&self) -> std::result::Result<(), String> {
        match self {
            ScalerArtifact::Standard(s) => s.validate(),
            ScalerArtifact::MinMax(s) => s.validate(),
        }
    }
}

impl FeatureTransform for ScalerArtifact {
    fn name(&self) -> &str {
        match self {
            ScalerArtifact::Standard(s) => s.name(),
            ScalerArtifact::MinMax(s) => s.name(),
        }
    }

    fn feature_names(&self) -> Option<&[String]> {
        match self {
            ScalerArtifact::Standard(s) => s.feature_names(),
            ScalerArtifact::MinMax(s) => s.feature_names(),
        }
    }

    fn n_features(&self) -> usize {
        match self {
            ScalerArtifact::Standard(s) => s.n_features(),
            ScalerArtifact::MinMax(s) => s.n_features(),
        }
    }

    fn transform(&self, input: &FeatureMatrix) -> Result<FeatureMatrix> {
        match self {
            ScalerArtifact::Standard(s) => s.transform(input),
            ScalerArtifact::MinMax(s) => s.transform(input),
        }
    }
}

/// Standardization: `(x - mean) / scale`.
///
/// A missing `mean` disables centering, a missing `scale` disables scaling,
/// and a zero scale entry leaves that column unscaled.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StandardScaler {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feature_names_in: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mean: Option<Vec<f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale: Option<Vec<f64>>,
}

impl StandardScaler {
    pub fn new(feature_names_in: Option<Vec<String>>, mean: Vec<f64>, scale: Vec<f64>) -> Result<Self> {
        let scaler = Self {
            feature_names_in,
            mean: Some(mean),
            scale: Some(scale),
        };
        scaler.validate().map_err(SentryError::Config)?;
        Ok(scaler)
    }

    fn validate(&self) -> std::result::Result<(), String> {
        check_widths(
            self.feature_names_in.as_deref(),
            &[("mean", self.mean.as_deref()), ("scale", self.scale.as_deref())],
        )
    }
}

impl FeatureTransform for StandardScaler {
    fn name(&self) -> &str {
        "standard_scaler"
    }

    fn feature_names(&self) -> Option<&[String]> {
        self.feature_names_in.as_deref()
    }

    fn n_features(&self) -> usize {
        width_of(
            self.feature_names_in.as_deref(),
            &[self.mean.as_deref(), self.scale.as_deref()],
        )
    }

    fn transform(&self, input: &FeatureMatrix) -> Result<FeatureMatrix> {
        check_input_width(self, input)?;
        Ok(input.map_columns(|col, x| {
            let mean = self
                .mean
                .as_ref()
                .and_then(|m| m.get(col).copied())
                .unwrap_or(0.0);
            let scale = self
                .scale
                .as_ref()
                .and_then(|s| s.get(col).copied())
                .filter(|s| *s != 0.0)
                .unwrap_or(1.0);
            (x - mean) / scale
        }))
    }
}

/// Range scaling: `x * scale + min`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MinMaxScaler {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feature_names_in: Option<Vec<String>>,
    pub min: Vec<f64>,
    pub scale: Vec<f64>,
}

impl MinMaxScaler {
    pub fn new(feature_names_in: Option<Vec<String>>, min: Vec<f64>, scale: Vec<f64>) -> Result<Self> {
        let scaler = Self {
            feature_names_in,
            min,
            scale,
        };
        scaler.validate().map_err(SentryError::Config)?;
        Ok(scaler)
    }

    fn validate(&self) -> std::result::Result<(), String> {
        check_widths(
            self.feature_names_in.as_deref(),
            &[("min", Some(self.min.as_slice())), ("scale", Some(self.scale.as_slice()))],
        )
    }
}

impl FeatureTransform for MinMaxScaler {
    fn name(&self) -> &str {
        "min_max_scaler"
    }

    fn feature_names(&self) -> Option<&[String]> {
        self.feature_names_in.as_deref()
    }

    fn n_features(&self) -> usize {
        self.min.len()
    }

    fn transform(&self, input: &FeatureMatrix) -> Result<FeatureMatrix> {
        check_input_width(self, input)?;
        Ok(input.map_columns(|col, x| {
            let scale = self.scale.get(col).copied().unwrap_or(1.0);
            let min = self.min.get(col).copied().unwrap_or(0.0);
            x * scale + min
        }))
    }
}

fn width_of(names: Option<&[String]>, vectors: &[Option<&[f64]>]) -> usize {
    names
        .map(<[String]>::len)
        .or_else(|| vectors.iter().flatten().map(|v| v.len()).next())
        .unwrap_or(0)
}

/// All present vectors must share one non-zero width, be finite, and agree
/// with the feature names when those are recorded.
fn check_widths(
    names: Option<&[String]>,
    vectors: &[(&str, Option<&[f64]>)],
) -> std::result::Result<(), String> {
    let width = width_of(names, &vectors.iter().map(|(_, v)| *v).collect::<Vec<_>>());
    if width == 0 {
        return Err("scaler declares no features".to_string());
    }

    if let Some(names) = names {
        FeatureSchema::new(names.to_vec()).map_err(|e| e.to_string())?;
    }

    for (label, vector) in vectors {
        let Some(vector) = vector else { continue };
        if vector.len() != width {
            return Err(format!(
                "'{}' has {} entries, expected {}",
                label,
                vector.len(),
                width
            ));
        }
        if vector.iter().any(|v| !v.is_finite()) {
            return Err(format!("'{}' contains non-finite values", label));
        }
    }

    Ok(())
}

fn check_input_width(transform: &dyn FeatureTransform, input: &FeatureMatrix) -> Result<()> {
    if input.n_cols() != transform.n_features() {
        return Err(SentryError::transform(
            format!(
                "{} expects {} features, got {}",
                transform.name(),
                transform.n_features(),
                input.n_cols()
            ),
            input.context(),
        ));
    }
    Ok(())
}
