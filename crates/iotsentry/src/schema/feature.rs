//! The expected-feature contract declared by a fitted transform.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SentryError};

/// Ordered, duplicate-free list of feature names a transform was fitted on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct FeatureSchema {
    features: Vec<String>,
}

impl FeatureSchema {
    /// Create a schema, rejecting empty lists, blank names and duplicates.
    pub fn new(features: Vec<String>) -> Result<Self> {
        if features.is_empty() {
            return Err(SentryError::InvalidSchema(
                "feature list is empty".to_string(),
            ));
        }

        let mut seen = HashSet::with_capacity(features.len());
        for name in &features {
            if name.trim().is_empty() {
                return Err(SentryError::InvalidSchema(
                    "feature list contains a blank name".to_string(),
                ));
            }
            if !seen.insert(name.as_str()) {
                return Err(SentryError::InvalidSchema(format!(
                    "duplicate feature name '{}'",
                    name
                )));
            }
        }

        Ok(Self { features })
    }

    /// Feature names in fit order.
    pub fn features(&self) -> &[String] {
        &self.features
    }

    /// Number of features.
    pub fn len(&self) -> usize {
        self.features.len()
    }

    /// Always false; kept for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Whether a feature is part of the schema.
    pub fn contains(&self, name: &str) -> bool {
        self.features.iter().any(|f| f == name)
    }

    /// Position of a feature in fit order.
    pub fn position(&self, name: &str) -> Option<usize> {
        self.features.iter().position(|f| f == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.features.iter().map(String::as_str)
    }
}

impl TryFrom<Vec<String>> for FeatureSchema {
    type Error = SentryError;

    fn try_from(features: Vec<String>) -> Result<Self> {
        Self::new(features)
    }
}

impl From<FeatureSchema> for Vec<String> {
    fn from(schema: FeatureSchema) -> Self {
        schema.features
    }
}
