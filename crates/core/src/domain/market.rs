use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Which fuel series a region is priced against.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FuelVariant {
    Standard,
    East,
}

/// One day of exogenous cost-basis signals.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CostBasisRow {
    pub date: NaiveDate,
    pub usd: f64,
    pub usd_lag_60: f64,
    pub diesel: f64,
    pub diesel_lag_30: f64,
    pub diesel_east: f64,
    pub diesel_east_lag_30: f64,
}

impl CostBasisRow {
    /// Returns `(fuel_now, fuel_lag_30)` for the given variant.
    pub fn fuel(&self, variant: FuelVariant) -> (f64, f64) {
        match variant {
            FuelVariant::Standard => (self.diesel, self.diesel_lag_30),
            FuelVariant::East => (self.diesel_east, self.diesel_east_lag_30),
        }
    }
}

/// Observed retail price for an item in a region on a given day.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PriceHistoryRow {
    pub date: NaiveDate,
    pub item: String,
    pub region: String,
    pub price: f64,
}

/// A dated price, used for both the historical series and forecast points.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub price: f64,
}
