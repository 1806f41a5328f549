//! Serialized model artifacts.
//!
//! Artifacts are exported offline as JSON keyed by model key:
//!
//! ```json
//! { "models": { "BETIK BIASA_Selangor": { "kind": "linear", ... } } }
//! ```
//!
//! Two kinds are supported: a linear model and a gradient-boosted tree
//! ensemble stored in flat arrays (one entry per node, `-1` children mark a
//! leaf). A tree routes left when `feature < split_condition`.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::{ModelRegistry, RegressionCapability};
use crate::domain::catalog::ModelKey;
use crate::domain::features::{FeatureImportances, FeatureVector, FEATURE_COUNT};

#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("could not read model artifacts `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse model artifacts: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("model artifact set contains no models")]
    Empty,
    #[error("model `{model_key}` is invalid: {reason}")]
    InvalidModel { model_key: String, reason: String },
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LinearModel {
    pub intercept: f64,
    pub coefficients: [f64; FEATURE_COUNT],
    pub importances: [f64; FEATURE_COUNT],
}

impl LinearModel {
    pub fn predict(&self, features: &FeatureVector) -> f64 {
        let x = features.to_array();
        self.intercept + self.coefficients.iter().zip(x.iter()).map(|(w, xi)| w * xi).sum::<f64>()
    }
}

/// Raw node arrays as they appear on disk, before validation.
#[derive(Clone, Debug, Deserialize)]
struct TreeSpec {
    left_children: Vec<i32>,
    right_children: Vec<i32>,
    split_indices: Vec<usize>,
    split_conditions: Vec<f64>,
    leaf_values: Vec<f64>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "TreeSpec")]
pub struct RegressionTree {
    left_children: Vec<i32>,
    right_children: Vec<i32>,
    split_indices: Vec<usize>,
    split_conditions: Vec<f64>,
    leaf_values: Vec<f64>,
}

impl TryFrom<TreeSpec> for RegressionTree {
    type Error = String;

    fn try_from(spec: TreeSpec) -> Result<Self, Self::Error> {
        let node_count = spec.left_children.len();
        if node_count == 0 {
            return Err("tree has no nodes".to_string());
        }
        let lengths = [
            spec.right_children.len(),
            spec.split_indices.len(),
            spec.split_conditions.len(),
            spec.leaf_values.len(),
        ];
        if lengths.iter().any(|len| *len != node_count) {
            return Err(format!("node arrays disagree in length (expected {node_count})"));
        }

        for node in 0..node_count {
            let (left, right) = (spec.left_children[node], spec.right_children[node]);
            if left < 0 {
                if right >= 0 {
                    return Err(format!("node {node} has a right child but no left child"));
                }
                if !spec.leaf_values[node].is_finite() {
                    return Err(format!("leaf {node} has a non-finite value"));
                }
                continue;
            }

            // Children must point forward so evaluation always terminates.
            for child in [left, right] {
                let in_range = usize::try_from(child)
                    .map(|child| child > node && child < node_count)
                    .unwrap_or(false);
                if !in_range {
                    return Err(format!("node {node} has out-of-order child {child}"));
                }
            }
            if spec.split_indices[node] >= FEATURE_COUNT {
                return Err(format!(
                    "node {node} splits on feature {} (only {FEATURE_COUNT} exist)",
                    spec.split_indices[node]
                ));
            }
            if !spec.split_conditions[node].is_finite() {
                return Err(format!("node {node} has a non-finite split condition"));
            }
        }

        Ok(Self {
            left_children: spec.left_children,
            right_children: spec.right_children,
            split_indices: spec.split_indices,
            split_conditions: spec.split_conditions,
            leaf_values: spec.leaf_values,
        })
    }
}

impl RegressionTree {
    pub fn predict(&self, x: &[f64; FEATURE_COUNT]) -> f64 {
        let mut node = 0usize;
        loop {
            let left = self.left_children[node];
            if left < 0 {
                return self.leaf_values[node];
            }
            let next = if x[self.split_indices[node]] < self.split_conditions[node] {
                left
            } else {
                self.right_children[node]
            };
            node = next as usize;
        }
    }

    pub fn node_count(&self) -> usize {
        self.left_children.len()
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TreeEnsemble {
    pub base_score: f64,
    pub trees: Vec<RegressionTree>,
    pub importances: [f64; FEATURE_COUNT],
}

impl TreeEnsemble {
    pub fn predict(&self, features: &FeatureVector) -> f64 {
        let x = features.to_array();
        self.base_score + self.trees.iter().map(|tree| tree.predict(&x)).sum::<f64>()
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ModelArtifact {
    Linear(LinearModel),
    TreeEnsemble(TreeEnsemble),
}

impl ModelArtifact {
    fn importances_array(&self) -> &[f64; FEATURE_COUNT] {
        match self {
            Self::Linear(model) => &model.importances,
            Self::TreeEnsemble(model) => &model.importances,
        }
    }

    fn validate(&self) -> Result<(), String> {
        if self.importances_array().iter().any(|value| !value.is_finite()) {
            return Err("importances must be finite".to_string());
        }
        match self {
            Self::Linear(model) => {
                let finite = model.intercept.is_finite()
                    && model.coefficients.iter().all(|value| value.is_finite());
                if !finite {
                    return Err("linear weights must be finite".to_string());
                }
            }
            Self::TreeEnsemble(model) => {
                if !model.base_score.is_finite() {
                    return Err("base_score must be finite".to_string());
                }
                if model.trees.is_empty() {
                    return Err("tree ensemble has no trees".to_string());
                }
            }
        }
        Ok(())
    }
}

impl RegressionCapability for ModelArtifact {
    fn infer(&self, features: &FeatureVector) -> f64 {
        match self {
            Self::Linear(model) => model.predict(features),
            Self::TreeEnsemble(model) => model.predict(features),
        }
    }

    fn importances(&self) -> FeatureImportances {
        FeatureImportances(*self.importances_array())
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelArtifactSet {
    pub models: BTreeMap<String, ModelArtifact>,
}

impl ModelArtifactSet {
    pub fn from_json(raw: &str) -> Result<Self, ArtifactError> {
        Ok(serde_json::from_str(raw)?)
    }

    pub fn load(path: &Path) -> Result<Self, ArtifactError> {
        let raw = fs::read_to_string(path)
            .map_err(|source| ArtifactError::ReadFile { path: path.to_path_buf(), source })?;
        Self::from_json(&raw)
    }

    pub fn into_registry(self) -> Result<ModelRegistry, ArtifactError> {
        if self.models.is_empty() {
            return Err(ArtifactError::Empty);
        }

        let mut registry = ModelRegistry::new();
        for (model_key, artifact) in self.models {
            artifact
                .validate()
                .map_err(|reason| ArtifactError::InvalidModel { model_key: model_key.clone(), reason })?;
            registry.insert(ModelKey(model_key), Arc::new(artifact));
        }
        Ok(registry)
    }
}
