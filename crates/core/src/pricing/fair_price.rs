use serde::Serialize;

use crate::domain::features::FeatureVector;
use crate::model::ModelHandle;
use crate::policy::{RegulationMatch, RegulationPolicy};

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct FairPrice {
    pub price: f64,
    pub is_controlled: bool,
    /// Which regulation path pinned the price, if any.
    #[serde(skip)]
    pub regulation: Option<RegulationMatch>,
}

impl FairPrice {
    pub fn market(price: f64) -> Self {
        Self { price, is_controlled: false, regulation: None }
    }

    pub fn regulated(regulation: RegulationMatch) -> Self {
        Self { price: regulation.ceiling(), is_controlled: true, regulation: Some(regulation) }
    }
}

/// Model inference plus the regulated-item override.
#[derive(Clone, Debug)]
pub struct FairPriceEngine {
    regulation: RegulationPolicy,
}

impl FairPriceEngine {
    pub fn new(regulation: RegulationPolicy) -> Self {
        Self { regulation }
    }

    pub fn regulation(&self, canonical_item: &str) -> Option<RegulationMatch> {
        self.regulation.classify(canonical_item)
    }

    /// A controlled item never reaches the model: its ceiling replaces
    /// inference outright, whatever the features say.
    pub fn price(&self, canonical_item: &str, model: &ModelHandle, features: &FeatureVector) -> FairPrice {
        match self.regulation(canonical_item) {
            Some(regulated) => FairPrice::regulated(regulated),
            None => FairPrice::market(model.capability.infer(features)),
        }
    }
}
