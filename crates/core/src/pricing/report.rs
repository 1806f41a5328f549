//! Client-facing response shape.

use chrono::NaiveDate;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use super::audit::AuditStatus;
use super::PriceAssessment;
use crate::domain::features::CostRegime;
use crate::domain::market::PricePoint;

/// Impact assigned to the policy component for controlled items.
pub const CONTROLLED_POLICY_IMPACT: f64 = -25.0;
pub const MARKET_POLICY_IMPACT: f64 = -5.0;

/// Half-away-from-zero rounding on the decimal value. Non-finite input is
/// returned unchanged.
pub fn round_half_away(value: f64, decimal_places: u32) -> f64 {
    Decimal::from_f64(value)
        .map(|decimal| decimal.round_dp_with_strategy(decimal_places, RoundingStrategy::MidpointAwayFromZero))
        .and_then(|decimal| decimal.to_f64())
        .unwrap_or(value)
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PredictionReport {
    pub pricing_hub: PricingHub,
    pub visual_analytics: VisualAnalytics,
    pub sentinel_meta: SentinelMeta,
    pub sentinel_reasoning: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PricingHub {
    pub fair_price: f64,
    pub actual_market_price: Option<f64>,
    pub is_controlled: bool,
    pub audit_report: AuditReport,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AuditReport {
    pub status: AuditStatus,
    pub color: String,
    pub gap_sen: f64,
    pub buffer_sen: f64,
    pub multiplier: f64,
    pub tolerance: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VisualAnalytics {
    pub feature_impact: Vec<FeatureImpact>,
    pub historical_line: Vec<PricePoint>,
    pub future_line: Vec<PricePoint>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FeatureImpact {
    pub label: String,
    pub impact: f64,
    pub description: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SentinelMeta {
    pub item: String,
    pub state: String,
    pub premise: String,
    pub model_key: String,
    pub regime: CostRegime,
    /// `listed` or `marker` for controlled items, absent otherwise.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub regulation: Option<String>,
    pub mode: String,
    pub anchor_date: NaiveDate,
    pub tolerance_floor: f64,
    pub data_cutoff: NaiveDate,
    /// First forecast point minus the current fair price. Non-zero when the
    /// anchor-day cost basis differs from the inputs the fair price used.
    pub forecast_anchor_drift: f64,
    pub correlation_id: String,
}

impl PredictionReport {
    pub fn from_assessment(
        assessment: &PriceAssessment,
        reasoning: impl Into<String>,
        correlation_id: impl Into<String>,
    ) -> Self {
        let audit = &assessment.audit;
        let pricing_hub = PricingHub {
            fair_price: round_half_away(assessment.fair_price.price, 2),
            actual_market_price: assessment.observed_price,
            is_controlled: assessment.fair_price.is_controlled,
            audit_report: AuditReport {
                status: audit.status,
                color: audit.status.color().to_string(),
                gap_sen: audit.gap_sen(),
                buffer_sen: audit.buffer_sen(),
                multiplier: audit.multiplier,
                tolerance: audit.tolerance,
            },
        };

        let visual_analytics = VisualAnalytics {
            feature_impact: feature_impact(assessment),
            historical_line: rounded_line(&assessment.history),
            future_line: rounded_line(&assessment.forecast),
        };

        let sentinel_meta = SentinelMeta {
            item: assessment.key.item.clone(),
            state: assessment.key.region.clone(),
            premise: assessment.premise.clone(),
            model_key: assessment.model_key.to_string(),
            regime: assessment.regime,
            regulation: assessment.fair_price.regulation.map(|path| path.as_str().to_string()),
            mode: assessment.mode.as_str().to_string(),
            anchor_date: assessment.anchor_date,
            tolerance_floor: assessment.tolerance_floor,
            data_cutoff: assessment.data_cutoff,
            forecast_anchor_drift: round_half_away(assessment.forecast_anchor_drift(), 4),
            correlation_id: correlation_id.into(),
        };

        Self { pricing_hub, visual_analytics, sentinel_meta, sentinel_reasoning: reasoning.into() }
    }
}

fn feature_impact(assessment: &PriceAssessment) -> Vec<FeatureImpact> {
    let importances = &assessment.importances;
    let policy_impact = if assessment.fair_price.is_controlled {
        CONTROLLED_POLICY_IMPACT
    } else {
        MARKET_POLICY_IMPACT
    };

    vec![
        FeatureImpact {
            label: "USD (Lagged)".to_string(),
            impact: round_half_away(importances.currency_lag() * 100.0, 2),
            description: "Imported feed cost impact.".to_string(),
        },
        FeatureImpact {
            label: "Diesel (Lagged)".to_string(),
            impact: round_half_away(importances.fuel_lag() * -100.0, 2),
            description: "Logistics cost suppression.".to_string(),
        },
        FeatureImpact {
            label: "Supply Policy".to_string(),
            impact: policy_impact,
            description: "Institutional price rigidity.".to_string(),
        },
    ]
}

fn rounded_line(points: &[PricePoint]) -> Vec<PricePoint> {
    points
        .iter()
        .map(|point| PricePoint { date: point.date, price: round_half_away(point.price, 2) })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::round_half_away;

    #[test]
    fn rounding_is_half_away_from_zero() {
        assert_eq!(round_half_away(2.125, 2), 2.13);
        assert_eq!(round_half_away(-2.125, 2), -2.13);
        assert_eq!(round_half_away(53.25, 1), 53.3);
        assert_eq!(round_half_away(9.8712, 2), 9.87);
    }

    #[test]
    fn non_finite_values_pass_through() {
        assert!(round_half_away(f64::NAN, 2).is_nan());
        assert_eq!(round_half_away(f64::INFINITY, 2), f64::INFINITY);
    }
}
