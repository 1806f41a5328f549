use async_trait::async_trait;
use serde::Serialize;

use super::audit::AuditStatus;
use crate::domain::features::CostRegime;

/// Substituted whenever the reasoning collaborator fails or times out.
pub const FALLBACK_EXPLANATION: &str = "Analysis engine busy.";

/// The computed fields handed to the reasoning collaborator.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ExplanationSummary {
    pub item: String,
    pub region: String,
    pub fair_price: f64,
    pub currency_now: f64,
    pub fuel_now: f64,
    pub regime: CostRegime,
    pub audit_status: AuditStatus,
    pub gap_sen: f64,
    pub is_controlled: bool,
}

/// Turns a numeric assessment into prose. Implementations must never fail
/// the request: they return [`FALLBACK_EXPLANATION`] instead.
#[async_trait]
pub trait Explainer: Send + Sync {
    async fn explain(&self, summary: &ExplanationSummary) -> String;
}

/// Always answers with the fallback string; used when no collaborator is configured.
#[derive(Clone, Copy, Debug, Default)]
pub struct StaticExplainer;

#[async_trait]
impl Explainer for StaticExplainer {
    async fn explain(&self, _summary: &ExplanationSummary) -> String {
        FALLBACK_EXPLANATION.to_string()
    }
}
