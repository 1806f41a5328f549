use chrono::{Days, NaiveDate};

use super::fair_price::{FairPrice, FairPriceEngine};
use super::features::{FeatureMode, FeatureResolution, FeatureResolver};
use crate::domain::market::PricePoint;
use crate::errors::DomainError;
use crate::model::ModelHandle;

/// Offsets 0..=30 from the anchor date.
pub const HORIZON_DAYS: u64 = 31;

/// Per-day inference across the forecast window. Offset 0 is the anchor
/// date itself and is computed independently of the current fair price.
pub struct HorizonForecaster<'a> {
    features: &'a FeatureResolver,
    engine: &'a FairPriceEngine,
}

impl<'a> HorizonForecaster<'a> {
    pub fn new(features: &'a FeatureResolver, engine: &'a FairPriceEngine) -> Self {
        Self { features, engine }
    }

    pub fn forecast(
        &self,
        canonical_item: &str,
        region: &str,
        anchor: NaiveDate,
        current: FairPrice,
        festive: bool,
        model: &ModelHandle,
    ) -> Result<Vec<PricePoint>, DomainError> {
        (0..HORIZON_DAYS)
            .map(|offset| {
                let date = anchor.checked_add_days(Days::new(offset)).ok_or_else(|| {
                    DomainError::InvalidRequest(format!(
                        "forecast horizon from {anchor} runs past the supported calendar"
                    ))
                })?;

                let price = if current.is_controlled {
                    current.price
                } else {
                    match self.features.resolve(FeatureMode::ForecastStep { date }, region, festive)? {
                        FeatureResolution::Resolved(step) => {
                            self.engine.price(canonical_item, model, &step.features).price
                        }
                        FeatureResolution::FlatProjection => current.price,
                    }
                };

                Ok(PricePoint { date, price })
            })
            .collect()
    }
}
