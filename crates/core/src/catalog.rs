//! Free-text item and region names to canonical registry keys.

use std::collections::{BTreeMap, HashMap};

use crate::domain::catalog::CanonicalKey;

/// Resolves user-facing item and region names.
///
/// Resolution never fails: an unknown item passes through unchanged so that the
/// model registry lookup is the single place an unknown combination is rejected.
#[derive(Clone, Debug, Default)]
pub struct CatalogResolver {
    aliases: HashMap<String, String>,
}

impl CatalogResolver {
    pub fn new(aliases: &BTreeMap<String, String>) -> Self {
        let aliases = aliases
            .iter()
            .map(|(alias, canonical)| (alias.trim().to_lowercase(), canonical.clone()))
            .collect();
        Self { aliases }
    }

    pub fn resolve(&self, item: &str, region: &str) -> CanonicalKey {
        CanonicalKey::new(self.canonical_item(item), canonical_region(region))
    }

    pub fn canonical_item(&self, item: &str) -> String {
        self.aliases.get(&item.trim().to_lowercase()).cloned().unwrap_or_else(|| item.to_string())
    }
}

/// Upper-cases the first character and lower-cases the rest.
pub fn canonical_region(region: &str) -> String {
    let mut chars = region.trim().chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}
