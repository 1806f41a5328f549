//! The sentinel pricing pipeline.
//!
//! Control flow per request: catalog resolution, model lookup (fail fast),
//! feature resolution for the requested mode, fair price with the regulated
//! override, the 31-day horizon, then the audit of any observed price.
//! Every collaborator is read-only after construction, so one pipeline value
//! can serve any number of concurrent requests.

pub mod audit;
pub mod explanation;
pub mod fair_price;
pub mod features;
pub mod horizon;
pub mod report;

use chrono::NaiveDate;
use serde::Serialize;
use tracing::debug;

use crate::catalog::CatalogResolver;
use crate::config::PipelineConfig;
use crate::domain::catalog::{CanonicalKey, ModelKey};
use crate::domain::features::{CostRegime, FeatureImportances, FeatureVector};
use crate::domain::market::PricePoint;
use crate::errors::DomainError;
use crate::model::ModelRegistry;
use crate::policy::{
    normalize_premise, PolicyTables, PremiseWeightTable, RegulationPolicy, ToleranceRegistry,
};
use crate::stores::{CostBasisStore, PriceHistoryStore};

pub use audit::{AuditClassifier, AuditStatus, AuditVerdict};
pub use explanation::{Explainer, ExplanationSummary, StaticExplainer, FALLBACK_EXPLANATION};
pub use fair_price::{FairPrice, FairPriceEngine};
pub use features::{FeatureMode, FeatureResolution, FeatureResolver, RequestMode, ResolvedFeatures};
pub use horizon::{HorizonForecaster, HORIZON_DAYS};
pub use report::PredictionReport;

#[derive(Clone, Debug, PartialEq)]
pub struct PriceRequest {
    pub item: String,
    pub region: String,
    pub premise: Option<String>,
    pub observed_price: Option<f64>,
    pub mode: RequestMode,
    pub festive: bool,
    /// Forecast anchor for manual requests.
    pub today: NaiveDate,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PriceAssessment {
    pub key: CanonicalKey,
    pub model_key: ModelKey,
    pub premise: String,
    pub mode: RequestMode,
    pub regime: CostRegime,
    pub anchor_date: NaiveDate,
    pub features: FeatureVector,
    pub fair_price: FairPrice,
    pub observed_price: Option<f64>,
    pub audit: AuditVerdict,
    pub importances: FeatureImportances,
    pub history: Vec<PricePoint>,
    pub forecast: Vec<PricePoint>,
    pub tolerance_floor: f64,
    pub data_cutoff: NaiveDate,
}

impl PriceAssessment {
    /// Offset 0 of the horizon is inferred separately from the fair price and
    /// is not guaranteed to equal it.
    pub fn forecast_anchor_drift(&self) -> f64 {
        self.forecast.first().map(|point| point.price - self.fair_price.price).unwrap_or(0.0)
    }

    pub fn explanation_summary(&self) -> ExplanationSummary {
        ExplanationSummary {
            item: self.key.item.clone(),
            region: self.key.region.clone(),
            fair_price: self.fair_price.price,
            currency_now: self.features.currency_now,
            fuel_now: self.features.fuel_now,
            regime: self.regime,
            audit_status: self.audit.status,
            gap_sen: self.audit.gap_sen(),
            is_controlled: self.fair_price.is_controlled,
        }
    }
}

#[derive(Clone, Debug)]
pub struct SentinelPipeline {
    catalog: CatalogResolver,
    models: ModelRegistry,
    features: FeatureResolver,
    fair_price: FairPriceEngine,
    audit: AuditClassifier,
    history: PriceHistoryStore,
    settings: PipelineConfig,
}

impl SentinelPipeline {
    pub fn new(
        policy: &PolicyTables,
        settings: PipelineConfig,
        cost_basis: CostBasisStore,
        history: PriceHistoryStore,
        models: ModelRegistry,
    ) -> Self {
        Self {
            catalog: CatalogResolver::new(&policy.aliases),
            models,
            features: FeatureResolver::new(cost_basis, settings.east_region.clone()),
            fair_price: FairPriceEngine::new(RegulationPolicy::new(&policy.regulation)),
            audit: AuditClassifier::new(
                ToleranceRegistry::new(&policy.tolerances, settings.default_tolerance),
                PremiseWeightTable::new(&policy.premise_weights),
            ),
            history,
            settings,
        }
    }

    pub fn settings(&self) -> &PipelineConfig {
        &self.settings
    }

    pub fn models(&self) -> &ModelRegistry {
        &self.models
    }

    pub fn cost_basis(&self) -> &CostBasisStore {
        self.features.cost_basis()
    }

    pub fn history(&self) -> &PriceHistoryStore {
        &self.history
    }

    /// The numeric pipeline. Deterministic for fixed stores and inputs.
    pub fn assess(&self, request: &PriceRequest) -> Result<PriceAssessment, DomainError> {
        if let Some(observed) = request.observed_price {
            if !observed.is_finite() || observed <= 0.0 {
                return Err(DomainError::InvalidRequest(format!(
                    "observed price must be a positive number (got {observed})"
                )));
            }
        }

        let key = self.catalog.resolve(&request.item, &request.region);
        let model_key = key.model_key();
        let model = self.models.lookup(&model_key)?;

        let anchor_date = request.mode.anchor_date(request.today);
        let resolved =
            match self.features.resolve(request.mode.feature_mode(), &key.region, request.festive)? {
                FeatureResolution::Resolved(resolved) => resolved,
                FeatureResolution::FlatProjection => {
                    return Err(DomainError::CostBasisNotFound { date: anchor_date })
                }
            };

        let fair_price = self.fair_price.price(&key.item, model, &resolved.features);
        let forecast = HorizonForecaster::new(&self.features, &self.fair_price).forecast(
            &key.item,
            &key.region,
            anchor_date,
            fair_price,
            request.festive,
            model,
        )?;

        let premise = request
            .premise
            .as_deref()
            .filter(|premise| !premise.trim().is_empty())
            .map(normalize_premise)
            .unwrap_or_else(|| normalize_premise(&self.settings.default_premise));
        let audit =
            self.audit.audit(fair_price.price, request.observed_price, &model_key, &key.item, &premise);

        let history = self.history.recent(&key, self.settings.history_limit).to_vec();

        debug!(
            event_name = "sentinel.pipeline.assessed",
            model_key = %model_key,
            mode = request.mode.as_str(),
            regime = resolved.regime.as_str(),
            fair_price = fair_price.price,
            is_controlled = fair_price.is_controlled,
            audit_status = audit.status.as_str(),
            history_points = history.len(),
            "price assessed"
        );

        Ok(PriceAssessment {
            key,
            model_key,
            premise,
            mode: request.mode,
            regime: resolved.regime,
            anchor_date,
            features: resolved.features,
            fair_price,
            observed_price: request.observed_price,
            audit,
            importances: model.importances,
            history,
            forecast,
            tolerance_floor: self.audit.tolerance_floor(),
            data_cutoff: self.settings.data_cutoff,
        })
    }

    /// Numeric pipeline plus prose. The explainer cannot fail the request.
    pub async fn predict(
        &self,
        request: &PriceRequest,
        explainer: &dyn Explainer,
        correlation_id: &str,
    ) -> Result<PredictionReport, DomainError> {
        let assessment = self.assess(request)?;
        let reasoning = explainer.explain(&assessment.explanation_summary()).await;
        Ok(PredictionReport::from_assessment(&assessment, reasoning, correlation_id))
    }
}
