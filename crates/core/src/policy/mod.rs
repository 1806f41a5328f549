//! Immutable policy tables: item aliases, regulated items, per-model tolerance
//! floors and per-premise tolerance multipliers.
//!
//! The tables are built once (from built-in defaults, optionally replaced
//! section by section from a TOML file) and handed to the pipeline at
//! construction time. Nothing here is mutated after startup.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::catalog::ModelKey;

pub const CHICKEN: &str = "AYAM BERSIH - STANDARD";
pub const PAPAYA: &str = "BETIK BIASA";
pub const COOKING_OIL: &str = "MINYAK MASAK PAKET (PELBAGAI JENAMA)";

pub const DEFAULT_CEILING_PRICE: f64 = 2.50;
pub const DEFAULT_PREMISE_MULTIPLIER: f64 = 1.0;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RegulationTable {
    /// Ceiling applied to items matched only by marker.
    pub ceiling_price: f64,
    /// Case-insensitive substrings of the canonical item name.
    pub markers: Vec<String>,
    /// Explicitly regulated canonical items and their ceiling.
    pub items: BTreeMap<String, f64>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PolicyTables {
    pub aliases: BTreeMap<String, String>,
    pub regulation: RegulationTable,
    pub tolerances: BTreeMap<String, f64>,
    pub premise_weights: BTreeMap<String, BTreeMap<String, f64>>,
}

#[derive(Debug, Error)]
pub enum PolicyError {
    #[error("could not read policy file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse policy file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("policy validation failed: {0}")]
    Validation(String),
}

impl Default for PolicyTables {
    fn default() -> Self {
        let aliases = BTreeMap::from([
            ("ayam bersih".to_string(), CHICKEN.to_string()),
            ("betik biasa".to_string(), PAPAYA.to_string()),
            ("minyak masak paket".to_string(), COOKING_OIL.to_string()),
        ]);

        let regulation = RegulationTable {
            ceiling_price: DEFAULT_CEILING_PRICE,
            markers: vec!["MINYAK".to_string()],
            items: BTreeMap::from([(COOKING_OIL.to_string(), DEFAULT_CEILING_PRICE)]),
        };

        let tolerances = [
            (CHICKEN, "Selangor", 0.142),
            (CHICKEN, "Kelantan", 0.156),
            (CHICKEN, "Sarawak", 0.171),
            (PAPAYA, "Selangor", 0.118),
            (PAPAYA, "Kelantan", 0.124),
            (PAPAYA, "Sarawak", 0.133),
            (COOKING_OIL, "Selangor", 0.05),
            (COOKING_OIL, "Kelantan", 0.05),
            (COOKING_OIL, "Sarawak", 0.05),
        ]
        .into_iter()
        .map(|(item, region, mae)| (format!("{item}_{region}"), mae))
        .collect();

        let premise_weights = [
            (CHICKEN, [1.00, 1.05, 1.11, 1.15]),
            (PAPAYA, [1.00, 1.03, 0.98, 1.09]),
            (COOKING_OIL, [1.00, 1.03, 1.00, 1.12]),
        ]
        .into_iter()
        .map(|(item, [hyper, super_, wet, mini])| {
            let weights = BTreeMap::from([
                ("hypermarket".to_string(), hyper),
                ("supermarket".to_string(), super_),
                ("wet_market".to_string(), wet),
                ("mini_mart".to_string(), mini),
            ]);
            (item.to_string(), weights)
        })
        .collect();

        Self { aliases, regulation, tolerances, premise_weights }
    }
}

impl PolicyTables {
    /// Built-in defaults, with any section present in `path` replacing the
    /// corresponding default section wholesale.
    pub fn load(path: Option<&Path>) -> Result<Self, PolicyError> {
        let mut tables = Self::default();
        if let Some(path) = path {
            let raw = fs::read_to_string(path)
                .map_err(|source| PolicyError::ReadFile { path: path.to_path_buf(), source })?;
            let patch = toml::from_str::<PolicyPatch>(&raw)
                .map_err(|source| PolicyError::ParseFile { path: path.to_path_buf(), source })?;
            tables.apply_patch(patch);
        }
        tables.validate()?;
        Ok(tables)
    }

    fn apply_patch(&mut self, patch: PolicyPatch) {
        if let Some(aliases) = patch.aliases {
            self.aliases = aliases;
        }
        if let Some(regulation) = patch.regulation {
            if let Some(ceiling_price) = regulation.ceiling_price {
                self.regulation.ceiling_price = ceiling_price;
            }
            if let Some(markers) = regulation.markers {
                self.regulation.markers = markers;
            }
            if let Some(items) = regulation.items {
                self.regulation.items = items;
            }
        }
        if let Some(tolerances) = patch.tolerances {
            self.tolerances = tolerances;
        }
        if let Some(premise_weights) = patch.premise_weights {
            self.premise_weights = premise_weights;
        }
    }

    pub fn validate(&self) -> Result<(), PolicyError> {
        let ceilings = std::iter::once(("regulation.ceiling_price", self.regulation.ceiling_price))
            .chain(self.regulation.items.values().map(|price| ("regulation.items", *price)));
        for (field, price) in ceilings {
            if !price.is_finite() || price <= 0.0 {
                return Err(PolicyError::Validation(format!(
                    "{field} must be a positive price (got {price})"
                )));
            }
        }

        if self.regulation.markers.iter().any(|marker| marker.trim().is_empty()) {
            return Err(PolicyError::Validation(
                "regulation.markers must not contain empty strings".to_string(),
            ));
        }

        for (key, tolerance) in &self.tolerances {
            if !tolerance.is_finite() || *tolerance < 0.0 {
                return Err(PolicyError::Validation(format!(
                    "tolerances.`{key}` must be a non-negative number (got {tolerance})"
                )));
            }
        }

        for (item, weights) in &self.premise_weights {
            for (premise, weight) in weights {
                if !weight.is_finite() || *weight <= 0.0 {
                    return Err(PolicyError::Validation(format!(
                        "premise_weights.`{item}`.{premise} must be positive (got {weight})"
                    )));
                }
            }
        }

        Ok(())
    }
}

#[derive(Debug, Default, Deserialize)]
struct PolicyPatch {
    aliases: Option<BTreeMap<String, String>>,
    regulation: Option<RegulationPatch>,
    tolerances: Option<BTreeMap<String, f64>>,
    premise_weights: Option<BTreeMap<String, BTreeMap<String, f64>>>,
}

#[derive(Debug, Default, Deserialize)]
struct RegulationPatch {
    ceiling_price: Option<f64>,
    markers: Option<Vec<String>>,
    items: Option<BTreeMap<String, f64>>,
}

/// How an item came to be treated as price-controlled.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum RegulationMatch {
    Listed { ceiling: f64 },
    Marker { ceiling: f64 },
}

impl RegulationMatch {
    pub fn ceiling(&self) -> f64 {
        match self {
            Self::Listed { ceiling } | Self::Marker { ceiling } => *ceiling,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Listed { .. } => "listed",
            Self::Marker { .. } => "marker",
        }
    }
}

#[derive(Clone, Debug)]
pub struct RegulationPolicy {
    items: HashMap<String, f64>,
    markers: Vec<String>,
    ceiling_price: f64,
}

impl RegulationPolicy {
    pub fn new(table: &RegulationTable) -> Self {
        Self {
            items: table.items.iter().map(|(item, price)| (item.clone(), *price)).collect(),
            markers: table.markers.iter().map(|marker| marker.to_uppercase()).collect(),
            ceiling_price: table.ceiling_price,
        }
    }

    /// Explicit listing wins; otherwise any marker contained in the upper-cased
    /// item name marks it as controlled, including partial-word matches.
    pub fn classify(&self, canonical_item: &str) -> Option<RegulationMatch> {
        if let Some(ceiling) = self.items.get(canonical_item) {
            return Some(RegulationMatch::Listed { ceiling: *ceiling });
        }

        let upper = canonical_item.to_uppercase();
        self.markers
            .iter()
            .any(|marker| upper.contains(marker.as_str()))
            .then_some(RegulationMatch::Marker { ceiling: self.ceiling_price })
    }
}

#[derive(Clone, Debug)]
pub struct ToleranceRegistry {
    entries: HashMap<String, f64>,
    default_tolerance: f64,
}

impl ToleranceRegistry {
    pub fn new(entries: &BTreeMap<String, f64>, default_tolerance: f64) -> Self {
        Self {
            entries: entries.iter().map(|(key, value)| (key.clone(), *value)).collect(),
            default_tolerance,
        }
    }

    pub fn tolerance(&self, model_key: &ModelKey) -> f64 {
        self.entries.get(model_key.as_str()).copied().unwrap_or(self.default_tolerance)
    }

    pub fn default_tolerance(&self) -> f64 {
        self.default_tolerance
    }
}

#[derive(Clone, Debug)]
pub struct PremiseWeightTable {
    weights: HashMap<String, HashMap<String, f64>>,
}

impl PremiseWeightTable {
    pub fn new(weights: &BTreeMap<String, BTreeMap<String, f64>>) -> Self {
        let weights = weights
            .iter()
            .map(|(item, premises)| {
                let premises = premises
                    .iter()
                    .map(|(premise, weight)| (normalize_premise(premise), *weight))
                    .collect();
                (item.clone(), premises)
            })
            .collect();
        Self { weights }
    }

    pub fn multiplier(&self, canonical_item: &str, premise: &str) -> f64 {
        self.weights
            .get(canonical_item)
            .and_then(|premises| premises.get(&normalize_premise(premise)))
            .copied()
            .unwrap_or(DEFAULT_PREMISE_MULTIPLIER)
    }
}

/// `"Wet Market"`, `"wet-market"` and `"wet_market"` all normalise to `wet_market`.
pub fn normalize_premise(premise: &str) -> String {
    premise
        .trim()
        .to_lowercase()
        .chars()
        .map(|ch| if ch == ' ' || ch == '-' { '_' } else { ch })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::*;

    #[test]
    fn defaults_cover_demo_catalog() {
        let tables = PolicyTables::default();

        assert_eq!(tables.aliases.get("ayam bersih").map(String::as_str), Some(CHICKEN));
        assert_eq!(tables.tolerances.get("AYAM BERSIH - STANDARD_Selangor"), Some(&0.142));
        assert!(tables.validate().is_ok());
    }

    #[test]
    fn listed_item_is_regulated_with_its_own_ceiling() {
        let mut table = PolicyTables::default().regulation;
        table.items.insert("GULA PASIR KASAR".to_string(), 2.85);
        let policy = RegulationPolicy::new(&table);

        assert_eq!(
            policy.classify("GULA PASIR KASAR"),
            Some(RegulationMatch::Listed { ceiling: 2.85 })
        );
        assert_eq!(policy.classify(COOKING_OIL).map(|m| m.ceiling()), Some(2.50));
    }

    #[test]
    fn marker_matches_substrings_including_partial_words() {
        let policy = RegulationPolicy::new(&PolicyTables::default().regulation);

        assert_eq!(
            policy.classify("minyak sawit curah"),
            Some(RegulationMatch::Marker { ceiling: DEFAULT_CEILING_PRICE })
        );
        assert_eq!(
            policy.classify("KERAMINYAKAN"),
            Some(RegulationMatch::Marker { ceiling: DEFAULT_CEILING_PRICE })
        );
        assert_eq!(policy.classify(CHICKEN), None);
    }

    #[test]
    fn tolerance_falls_back_to_default() {
        let registry = ToleranceRegistry::new(&PolicyTables::default().tolerances, 0.15);

        assert_eq!(registry.tolerance(&ModelKey::from("BETIK BIASA_Selangor")), 0.118);
        assert_eq!(registry.tolerance(&ModelKey::from("BETIK BIASA_Johor")), 0.15);
    }

    #[test]
    fn premise_multiplier_normalises_input_and_defaults_to_one() {
        let table = PremiseWeightTable::new(&PolicyTables::default().premise_weights);

        assert_eq!(table.multiplier(CHICKEN, "Wet Market"), 1.11);
        assert_eq!(table.multiplier(PAPAYA, "wet-market"), 0.98);
        assert_eq!(table.multiplier(CHICKEN, "other"), 1.0);
        assert_eq!(table.multiplier("DURIAN", "hypermarket"), 1.0);
    }

    #[test]
    fn file_sections_replace_defaults() -> Result<(), String> {
        let dir = TempDir::new().map_err(|err| err.to_string())?;
        let path = dir.path().join("policy.toml");
        fs::write(
            &path,
            r#"
[tolerances]
"AYAM BERSIH - STANDARD_Selangor" = 0.2

[regulation]
markers = ["GULA"]
"#,
        )
        .map_err(|err| err.to_string())?;

        let tables = PolicyTables::load(Some(&path)).map_err(|err| err.to_string())?;

        assert_eq!(tables.tolerances.len(), 1);
        assert_eq!(tables.regulation.markers, vec!["GULA".to_string()]);
        assert_eq!(tables.regulation.ceiling_price, DEFAULT_CEILING_PRICE);
        assert_eq!(tables.aliases.len(), 3);
        Ok(())
    }

    #[test]
    fn negative_tolerance_is_rejected() -> Result<(), String> {
        let dir = TempDir::new().map_err(|err| err.to_string())?;
        let path = dir.path().join("policy.toml");
        fs::write(&path, "[tolerances]\n\"X_Y\" = -0.1\n").map_err(|err| err.to_string())?;

        match PolicyTables::load(Some(&path)) {
            Err(PolicyError::Validation(message)) => {
                assert!(message.contains("X_Y"));
                Ok(())
            }
            other => Err(format!("expected validation failure, got {other:?}")),
        }
    }
}
