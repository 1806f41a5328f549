//! Feature resolution for the three input modes.
//!
//! The 60-day currency lag and 30-day fuel lag mean that the feature vector
//! for a future date is already observable in the cost-basis table, which is
//! what lets the horizon forecaster run real inference per day.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::features::{CostRegime, FeatureVector, ManualOverride};
use crate::domain::market::{CostBasisRow, FuelVariant};
use crate::errors::DomainError;
use crate::stores::CostBasisStore;

/// How the feature vector for a single inference is obtained.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum FeatureMode {
    /// Exact-date lookup; a missing row fails the request.
    Historical { target_date: NaiveDate },
    /// Caller-supplied cost basis; no lookup, no regime detection.
    Manual(ManualOverride),
    /// Exact-date lookup for one horizon day; a missing row is tolerated.
    ForecastStep { date: NaiveDate },
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ResolvedFeatures {
    pub features: FeatureVector,
    pub regime: CostRegime,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum FeatureResolution {
    Resolved(ResolvedFeatures),
    /// No cost basis for a forecast day; the caller repeats the current price.
    FlatProjection,
}

#[derive(Clone, Debug)]
pub struct FeatureResolver {
    cost_basis: CostBasisStore,
    east_region: String,
}

impl FeatureResolver {
    pub fn new(cost_basis: CostBasisStore, east_region: impl Into<String>) -> Self {
        Self { cost_basis, east_region: east_region.into() }
    }

    pub fn cost_basis(&self) -> &CostBasisStore {
        &self.cost_basis
    }

    pub fn resolve(
        &self,
        mode: FeatureMode,
        region: &str,
        festive: bool,
    ) -> Result<FeatureResolution, DomainError> {
        match mode {
            FeatureMode::Historical { target_date } => {
                self.historical(target_date, region, festive).map(FeatureResolution::Resolved)
            }
            FeatureMode::Manual(manual) => {
                Self::manual(&manual, festive).map(FeatureResolution::Resolved)
            }
            FeatureMode::ForecastStep { date } => Ok(self
                .forecast_step(date, region, festive)
                .map(|features| {
                    FeatureResolution::Resolved(ResolvedFeatures {
                        features,
                        regime: CostRegime::Stable,
                    })
                })
                .unwrap_or(FeatureResolution::FlatProjection)),
        }
    }

    fn historical(
        &self,
        target_date: NaiveDate,
        region: &str,
        festive: bool,
    ) -> Result<ResolvedFeatures, DomainError> {
        let row = self
            .cost_basis
            .get(target_date)
            .ok_or(DomainError::CostBasisNotFound { date: target_date })?;

        Ok(ResolvedFeatures {
            features: self.features_from_row(row, region, festive),
            regime: detect_regime(&self.cost_basis, target_date),
        })
    }

    fn manual(manual: &ManualOverride, festive: bool) -> Result<ResolvedFeatures, DomainError> {
        if let Some(field) = manual.first_invalid_field() {
            return Err(DomainError::InvalidRequest(format!(
                "manual override field `{field}` must be a finite number"
            )));
        }
        Ok(ResolvedFeatures { features: manual.features(festive), regime: CostRegime::Stable })
    }

    fn forecast_step(
        &self,
        date: NaiveDate,
        region: &str,
        festive: bool,
    ) -> Option<FeatureVector> {
        self.cost_basis.get(date).map(|row| self.features_from_row(row, region, festive))
    }

    pub fn fuel_variant(&self, region: &str) -> FuelVariant {
        if region.trim().eq_ignore_ascii_case(self.east_region.trim()) {
            FuelVariant::East
        } else {
            FuelVariant::Standard
        }
    }

    fn features_from_row(&self, row: &CostBasisRow, region: &str, festive: bool) -> FeatureVector {
        let (fuel_now, fuel_lag30) = row.fuel(self.fuel_variant(region));
        FeatureVector {
            currency_now: row.usd,
            currency_lag60: row.usd_lag_60,
            fuel_now,
            fuel_lag30,
            festive,
        }
    }
}

/// DOWN when the lagged currency basis fell versus the prior calendar day,
/// UP otherwise, STABLE when either day is missing.
pub fn detect_regime(cost_basis: &CostBasisStore, date: NaiveDate) -> CostRegime {
    let Some(current) = cost_basis.get(date) else {
        return CostRegime::Stable;
    };
    let Some(prior) = date.pred_opt().and_then(|prior| cost_basis.get(prior)) else {
        return CostRegime::Stable;
    };

    if current.usd_lag_60 < prior.usd_lag_60 {
        CostRegime::Down
    } else {
        CostRegime::Up
    }
}

/// Request-facing mode: a forecast step is never requested directly.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum RequestMode {
    Historical { target_date: NaiveDate },
    Manual(ManualOverride),
}

impl RequestMode {
    /// Exactly one of a target date or a manual override must be supplied.
    pub fn from_parts(
        target_date: Option<NaiveDate>,
        manual: Option<ManualOverride>,
    ) -> Result<Self, DomainError> {
        match (target_date, manual) {
            (Some(target_date), None) => Ok(Self::Historical { target_date }),
            (None, Some(manual)) => Ok(Self::Manual(manual)),
            (Some(_), Some(_)) => Err(DomainError::InvalidRequest(
                "supply either a target date or a manual override, not both".to_string(),
            )),
            (None, None) => Err(DomainError::InvalidRequest(
                "a target date or a complete manual override is required".to_string(),
            )),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Historical { .. } => "historical",
            Self::Manual(_) => "manual",
        }
    }

    /// Date the forecast horizon starts from. Manual overrides carry no
    /// date of their own, so they anchor on the request's `today`.
    pub fn anchor_date(&self, today: NaiveDate) -> NaiveDate {
        match *self {
            Self::Historical { target_date } => target_date,
            Self::Manual(_) => today,
        }
    }

    pub fn feature_mode(&self) -> FeatureMode {
        match *self {
            Self::Historical { target_date } => FeatureMode::Historical { target_date },
            Self::Manual(manual) => FeatureMode::Manual(manual),
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::{detect_regime, FeatureMode, FeatureResolution, FeatureResolver, RequestMode};
    use crate::domain::features::{CostRegime, ManualOverride};
    use crate::domain::market::{CostBasisRow, FuelVariant};
    use crate::errors::DomainError;
    use crate::stores::CostBasisStore;

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, day).expect("valid date")
    }

    fn row(day: u32, usd_lag_60: f64) -> CostBasisRow {
        CostBasisRow {
            date: date(day),
            usd: 4.45,
            usd_lag_60,
            diesel: 2.15,
            diesel_lag_30: 2.10,
            diesel_east: 2.05,
            diesel_east_lag_30: 2.00,
        }
    }

    fn resolver(rows: Vec<CostBasisRow>) -> FeatureResolver {
        FeatureResolver::new(CostBasisStore::from_rows(rows), "Sarawak")
    }

    #[test]
    fn regime_is_down_only_on_strict_decrease() {
        let store = CostBasisStore::from_rows([
            row(1, 4.72),
            row(2, 4.70),
            row(3, 4.70),
            row(4, 4.75),
            row(6, 4.60),
        ]);

        assert_eq!(detect_regime(&store, date(2)), CostRegime::Down);
        assert_eq!(detect_regime(&store, date(3)), CostRegime::Up);
        assert_eq!(detect_regime(&store, date(4)), CostRegime::Up);
        assert_eq!(detect_regime(&store, date(1)), CostRegime::Stable);
        assert_eq!(detect_regime(&store, date(6)), CostRegime::Stable);
    }

    #[test]
    fn historical_mode_uses_row_and_regime() {
        let resolver = resolver(vec![row(1, 4.72), row(2, 4.70)]);

        let resolved = resolver.historical(date(2), "Selangor", false).expect("row exists");

        assert_eq!(resolved.features.to_array(), [4.45, 4.70, 2.15, 2.10, 0.0]);
        assert_eq!(resolved.regime, CostRegime::Down);
    }

    #[test]
    fn east_region_reads_east_fuel_series() {
        let resolver = resolver(vec![row(1, 4.72)]);

        let resolved = resolver.historical(date(1), "Sarawak", true).expect("row exists");

        assert_eq!(resolver.fuel_variant("Sarawak"), FuelVariant::East);
        assert_eq!(resolver.fuel_variant("Kelantan"), FuelVariant::Standard);
        assert_eq!(resolved.features.to_array(), [4.45, 4.72, 2.05, 2.00, 1.0]);
    }

    #[test]
    fn historical_mode_fails_on_missing_date() {
        let resolver = resolver(vec![row(1, 4.72)]);

        let error = resolver
            .resolve(FeatureMode::Historical { target_date: date(9) }, "Selangor", false)
            .expect_err("missing row");

        assert_eq!(error, DomainError::CostBasisNotFound { date: date(9) });
    }

    #[test]
    fn forecast_step_tolerates_missing_date() {
        let resolver = resolver(vec![row(1, 4.72)]);

        let hit = resolver
            .resolve(FeatureMode::ForecastStep { date: date(1) }, "Selangor", false)
            .expect("never fails");
        let miss = resolver
            .resolve(FeatureMode::ForecastStep { date: date(9) }, "Selangor", false)
            .expect("never fails");

        assert!(matches!(hit, FeatureResolution::Resolved(_)));
        assert_eq!(miss, FeatureResolution::FlatProjection);
    }

    #[test]
    fn manual_mode_skips_regime_and_rejects_non_finite_input() {
        let manual = ManualOverride {
            currency_now: 4.75,
            currency_lag60: 4.70,
            fuel_now: 2.15,
            fuel_lag30: 2.10,
        };
        let resolved = FeatureResolver::manual(&manual, false).expect("finite input");
        assert_eq!(resolved.regime, CostRegime::Stable);
        assert_eq!(resolved.features.to_array(), [4.75, 4.70, 2.15, 2.10, 0.0]);

        let broken = ManualOverride { fuel_now: f64::NAN, ..manual };
        let error = FeatureResolver::manual(&broken, false).expect_err("NaN rejected");
        assert!(matches!(error, DomainError::InvalidRequest(ref message) if message.contains("diesel_now")));
    }

    #[test]
    fn request_modes_resolve_and_anchor_by_their_own_rules() {
        let resolver = resolver(vec![row(1, 4.72), row(2, 4.70)]);
        let manual = ManualOverride {
            currency_now: 4.75,
            currency_lag60: 4.70,
            fuel_now: 2.15,
            fuel_lag30: 2.10,
        };
        let historical = RequestMode::Historical { target_date: date(2) };
        let overridden = RequestMode::Manual(manual);

        assert_eq!(
            resolver.resolve(historical.feature_mode(), "Selangor", false),
            resolver.historical(date(2), "Selangor", false).map(FeatureResolution::Resolved)
        );
        assert_eq!(
            resolver.resolve(overridden.feature_mode(), "Selangor", true),
            FeatureResolver::manual(&manual, true).map(FeatureResolution::Resolved)
        );
        assert_eq!(historical.anchor_date(date(20)), date(2));
        assert_eq!(overridden.anchor_date(date(20)), date(20));
    }

    #[test]
    fn request_mode_requires_exactly_one_source() {
        let manual = ManualOverride {
            currency_now: 4.75,
            currency_lag60: 4.70,
            fuel_now: 2.15,
            fuel_lag30: 2.10,
        };

        assert_eq!(
            RequestMode::from_parts(Some(date(2)), None),
            Ok(RequestMode::Historical { target_date: date(2) })
        );
        assert_eq!(RequestMode::from_parts(None, Some(manual)), Ok(RequestMode::Manual(manual)));
        assert!(RequestMode::from_parts(Some(date(2)), Some(manual)).is_err());
        assert!(RequestMode::from_parts(None, None).is_err());
    }
}
