//! Regression capabilities and the registry that binds them to model keys.

pub mod artifact;

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::domain::catalog::ModelKey;
use crate::domain::features::{FeatureImportances, FeatureVector};
use crate::errors::DomainError;

pub use artifact::{ArtifactError, LinearModel, ModelArtifact, ModelArtifactSet, RegressionTree, TreeEnsemble};

/// A fitted price model. Implementations must be pure: the same feature
/// vector always yields the same price.
pub trait RegressionCapability: Send + Sync {
    fn infer(&self, features: &FeatureVector) -> f64;
    fn importances(&self) -> FeatureImportances;
}

/// A registered model together with its static importance vector.
#[derive(Clone)]
pub struct ModelHandle {
    pub capability: Arc<dyn RegressionCapability>,
    pub importances: FeatureImportances,
}

impl fmt::Debug for ModelHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelHandle").field("importances", &self.importances).finish_non_exhaustive()
    }
}

#[derive(Clone, Default)]
pub struct ModelRegistry {
    models: HashMap<ModelKey, ModelHandle>,
}

impl ModelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: ModelKey, capability: Arc<dyn RegressionCapability>) {
        let importances = capability.importances();
        self.models.insert(key, ModelHandle { capability, importances });
    }

    pub fn with_model(mut self, key: impl Into<ModelKey>, capability: Arc<dyn RegressionCapability>) -> Self {
        self.insert(key.into(), capability);
        self
    }

    /// Unknown keys are a hard failure; there is no fallback model.
    pub fn lookup(&self, key: &ModelKey) -> Result<&ModelHandle, DomainError> {
        self.models
            .get(key)
            .ok_or_else(|| DomainError::ModelNotFound { model_key: key.to_string() })
    }

    pub fn contains(&self, key: &ModelKey) -> bool {
        self.models.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &ModelKey> {
        self.models.keys()
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}

impl fmt::Debug for ModelRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keys: Vec<&str> = self.models.keys().map(ModelKey::as_str).collect();
        keys.sort_unstable();
        f.debug_struct("ModelRegistry").field("keys", &keys).finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::{ModelRegistry, RegressionCapability};
    use crate::domain::catalog::ModelKey;
    use crate::domain::features::{FeatureImportances, FeatureVector};
    use crate::errors::DomainError;

    struct Constant(f64);

    impl RegressionCapability for Constant {
        fn infer(&self, _features: &FeatureVector) -> f64 {
            self.0
        }

        fn importances(&self) -> FeatureImportances {
            FeatureImportances([0.2; 5])
        }
    }

    #[test]
    fn lookup_returns_capability_and_importances() {
        let registry = ModelRegistry::new().with_model("BETIK BIASA_Selangor", Arc::new(Constant(4.2)));

        let handle = registry.lookup(&ModelKey::from("BETIK BIASA_Selangor")).expect("registered");

        assert_eq!(handle.importances, FeatureImportances([0.2; 5]));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn unknown_key_is_model_not_found() {
        let registry = ModelRegistry::new().with_model("BETIK BIASA_Selangor", Arc::new(Constant(4.2)));

        let error = registry.lookup(&ModelKey::from("BETIK BIASA_Johor")).expect_err("missing");

        assert_eq!(
            error,
            DomainError::ModelNotFound { model_key: "BETIK BIASA_Johor".to_string() }
        );
    }
}
