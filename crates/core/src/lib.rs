pub mod catalog;
pub mod config;
pub mod domain;
pub mod errors;
pub mod model;
pub mod policy;
pub mod pricing;
pub mod stores;

pub use catalog::CatalogResolver;
pub use domain::catalog::{CanonicalKey, ModelKey};
pub use domain::features::{CostRegime, FeatureImportances, FeatureVector, ManualOverride};
pub use domain::market::{CostBasisRow, PriceHistoryRow, PricePoint};
pub use errors::{ApplicationError, DomainError, InterfaceError};
pub use model::{ModelArtifactSet, ModelRegistry, RegressionCapability};
pub use policy::PolicyTables;
pub use pricing::{
    AuditStatus, Explainer, ExplanationSummary, PredictionReport, PriceAssessment, PriceRequest,
    RequestMode, SentinelPipeline, FALLBACK_EXPLANATION,
};
pub use stores::{CostBasisStore, PriceHistoryStore};
