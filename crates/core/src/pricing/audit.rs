//! Premise-weighted anomaly audit of an observed price against the fair price.

use serde::{Deserialize, Serialize};

use super::report::round_half_away;
use crate::domain::catalog::ModelKey;
use crate::policy::{PremiseWeightTable, ToleranceRegistry};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditStatus {
    HighRisk,
    Caution,
    Stabilized,
    Safe,
    MonitoringOnly,
}

impl AuditStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::HighRisk => "HIGH_RISK",
            Self::Caution => "CAUTION",
            Self::Stabilized => "STABILIZED",
            Self::Safe => "SAFE",
            Self::MonitoringOnly => "MONITORING_ONLY",
        }
    }

    pub fn color(&self) -> &'static str {
        match self {
            Self::HighRisk => "Red",
            Self::Caution => "Yellow",
            Self::Stabilized => "Green",
            Self::Safe => "Blue",
            Self::MonitoringOnly => "Grey",
        }
    }
}

/// First matching band wins. Both band edges are exclusive, so a gap of
/// exactly one buffer is still STABILIZED.
pub fn classify_gap(gap: f64, buffer: f64) -> AuditStatus {
    if gap > 2.0 * buffer {
        AuditStatus::HighRisk
    } else if gap > buffer {
        AuditStatus::Caution
    } else if gap < -buffer {
        AuditStatus::Safe
    } else {
        AuditStatus::Stabilized
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct AuditVerdict {
    pub status: AuditStatus,
    /// `observed - fair`; zero when nothing was observed.
    pub gap: f64,
    pub buffer: f64,
    pub tolerance: f64,
    pub multiplier: f64,
}

impl AuditVerdict {
    pub fn gap_sen(&self) -> f64 {
        round_half_away(self.gap * 100.0, 1)
    }

    pub fn buffer_sen(&self) -> f64 {
        round_half_away(self.buffer * 100.0, 1)
    }
}

/// Pure audit over the four numeric inputs.
pub fn classify(fair_price: f64, observed: Option<f64>, tolerance: f64, multiplier: f64) -> AuditVerdict {
    let buffer = tolerance * multiplier;
    match observed {
        None => AuditVerdict {
            status: AuditStatus::MonitoringOnly,
            gap: 0.0,
            buffer,
            tolerance,
            multiplier,
        },
        Some(observed) => {
            let gap = observed - fair_price;
            AuditVerdict { status: classify_gap(gap, buffer), gap, buffer, tolerance, multiplier }
        }
    }
}

#[derive(Clone, Debug)]
pub struct AuditClassifier {
    tolerances: ToleranceRegistry,
    premise_weights: PremiseWeightTable,
}

impl AuditClassifier {
    pub fn new(tolerances: ToleranceRegistry, premise_weights: PremiseWeightTable) -> Self {
        Self { tolerances, premise_weights }
    }

    pub fn audit(
        &self,
        fair_price: f64,
        observed: Option<f64>,
        model_key: &ModelKey,
        canonical_item: &str,
        premise: &str,
    ) -> AuditVerdict {
        classify(
            fair_price,
            observed,
            self.tolerances.tolerance(model_key),
            self.premise_weights.multiplier(canonical_item, premise),
        )
    }

    pub fn tolerance_floor(&self) -> f64 {
        self.tolerances.default_tolerance()
    }
}

#[cfg(test)]
mod tests {
    use super::{classify, classify_gap, AuditClassifier, AuditStatus};
    use crate::domain::catalog::ModelKey;
    use crate::policy::{PolicyTables, PremiseWeightTable, ToleranceRegistry, CHICKEN};

    #[test]
    fn bands_are_ordered_and_boundaries_are_inclusive_of_stabilized() {
        for buffer in [0.05, 0.142, 1.0] {
            assert_eq!(classify_gap(2.0001 * buffer, buffer), AuditStatus::HighRisk);
            assert_eq!(classify_gap(2.0 * buffer, buffer), AuditStatus::Caution);
            assert_eq!(classify_gap(1.5 * buffer, buffer), AuditStatus::Caution);
            assert_eq!(classify_gap(1.0 * buffer, buffer), AuditStatus::Stabilized);
            assert_eq!(classify_gap(0.0, buffer), AuditStatus::Stabilized);
            assert_eq!(classify_gap(-1.0 * buffer, buffer), AuditStatus::Stabilized);
            assert_eq!(classify_gap(-1.0001 * buffer, buffer), AuditStatus::Safe);
        }
    }

    #[test]
    fn zero_buffer_flags_any_overprice() {
        assert_eq!(classify_gap(0.01, 0.0), AuditStatus::HighRisk);
        assert_eq!(classify_gap(0.0, 0.0), AuditStatus::Stabilized);
        assert_eq!(classify_gap(-0.01, 0.0), AuditStatus::Safe);
    }

    #[test]
    fn missing_observation_is_monitoring_only() {
        let verdict = classify(9.87, None, 0.142, 1.0);

        assert_eq!(verdict.status, AuditStatus::MonitoringOnly);
        assert_eq!(verdict.gap, 0.0);
        assert_eq!(verdict.status.color(), "Grey");
    }

    #[test]
    fn overpriced_chicken_in_selangor_is_high_risk() {
        let verdict = classify(9.87, Some(10.40), 0.142, 1.0);

        assert_eq!(verdict.status, AuditStatus::HighRisk);
        assert_eq!(verdict.gap_sen(), 53.0);
        assert_eq!(verdict.buffer_sen(), 14.2);
        assert_eq!(verdict.status.color(), "Red");
    }

    #[test]
    fn classifier_weights_tolerance_by_premise() {
        let tables = PolicyTables::default();
        let classifier = AuditClassifier::new(
            ToleranceRegistry::new(&tables.tolerances, 0.15),
            PremiseWeightTable::new(&tables.premise_weights),
        );
        let key = ModelKey::from("AYAM BERSIH - STANDARD_Selangor");

        let verdict = classifier.audit(9.87, Some(10.10), &key, CHICKEN, "mini_mart");

        assert_eq!(verdict.multiplier, 1.15);
        assert!((verdict.buffer - 0.142 * 1.15).abs() < 1e-12);
        assert_eq!(verdict.status, AuditStatus::Caution);
        assert_eq!(classifier.tolerance_floor(), 0.15);
    }

    #[test]
    fn status_serializes_in_screaming_snake_case() {
        let json = serde_json::to_string(&AuditStatus::MonitoringOnly).expect("serializes");

        assert_eq!(json, "\"MONITORING_ONLY\"");
    }
}
