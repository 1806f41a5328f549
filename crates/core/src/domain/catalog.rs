use std::fmt;

use serde::{Deserialize, Serialize};

/// Canonical (item, region) identity after alias resolution.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CanonicalKey {
    pub item: String,
    pub region: String,
}

impl CanonicalKey {
    pub fn new(item: impl Into<String>, region: impl Into<String>) -> Self {
        Self { item: item.into(), region: region.into() }
    }

    pub fn model_key(&self) -> ModelKey {
        ModelKey(format!("{}_{}", self.item, self.region))
    }
}

/// `ITEM_Region` key shared by the model and tolerance registries.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ModelKey(pub String);

impl ModelKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ModelKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for ModelKey {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for ModelKey {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::CanonicalKey;

    #[test]
    fn model_key_joins_item_and_region_with_underscore() {
        let key = CanonicalKey::new("AYAM BERSIH - STANDARD", "Selangor");

        assert_eq!(key.model_key().as_str(), "AYAM BERSIH - STANDARD_Selangor");
        assert_eq!(key.model_key().to_string(), "AYAM BERSIH - STANDARD_Selangor");
    }
}
