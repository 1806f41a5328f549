use serde::{Deserialize, Serialize};

pub const FEATURE_COUNT: usize = 5;

/// Column order the regression models were fit with. Never reorder.
pub const FEATURE_NAMES: [&str; FEATURE_COUNT] =
    ["usd_now", "usd_lag_60", "diesel_now", "diesel_lag_30", "is_festive"];

pub const USD_LAG_INDEX: usize = 1;
pub const DIESEL_LAG_INDEX: usize = 3;

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    pub currency_now: f64,
    pub currency_lag60: f64,
    pub fuel_now: f64,
    pub fuel_lag30: f64,
    pub festive: bool,
}

impl FeatureVector {
    pub fn to_array(&self) -> [f64; FEATURE_COUNT] {
        [
            self.currency_now,
            self.currency_lag60,
            self.fuel_now,
            self.fuel_lag30,
            if self.festive { 1.0 } else { 0.0 },
        ]
    }
}

/// Caller-supplied cost basis for simulation requests.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ManualOverride {
    pub currency_now: f64,
    pub currency_lag60: f64,
    pub fuel_now: f64,
    pub fuel_lag30: f64,
}

impl ManualOverride {
    pub fn features(&self, festive: bool) -> FeatureVector {
        FeatureVector {
            currency_now: self.currency_now,
            currency_lag60: self.currency_lag60,
            fuel_now: self.fuel_now,
            fuel_lag30: self.fuel_lag30,
            festive,
        }
    }

    /// Name of the first non-finite component, if any.
    pub fn first_invalid_field(&self) -> Option<&'static str> {
        [
            ("usd_now", self.currency_now),
            ("usd_lag_60", self.currency_lag60),
            ("diesel_now", self.fuel_now),
            ("diesel_lag_30", self.fuel_lag30),
        ]
        .into_iter()
        .find(|(_, value)| !value.is_finite())
        .map(|(name, _)| name)
    }
}

/// Static per-model feature importances, in [`FEATURE_NAMES`] order.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureImportances(pub [f64; FEATURE_COUNT]);

impl FeatureImportances {
    pub fn get(&self, index: usize) -> f64 {
        self.0.get(index).copied().unwrap_or(0.0)
    }

    pub fn currency_lag(&self) -> f64 {
        self.get(USD_LAG_INDEX)
    }

    pub fn fuel_lag(&self) -> f64 {
        self.get(DIESEL_LAG_INDEX)
    }
}

/// Direction of the lagged currency basis versus the prior day.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CostRegime {
    Up,
    Down,
    #[default]
    Stable,
}

impl CostRegime {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Up => "UP",
            Self::Down => "DOWN",
            Self::Stable => "STABLE",
        }
    }
}
