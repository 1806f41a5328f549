use std::path::PathBuf;

use sentinel_core::policy::{CHICKEN, COOKING_OIL, PAPAYA};
use sentinel_core::{ModelArtifactSet, ModelKey, PolicyTables};

fn asset(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../assets").join(name)
}

#[test]
fn shipped_models_cover_every_demo_series() {
    let registry = ModelArtifactSet::load(&asset("price_models.json"))
        .and_then(ModelArtifactSet::into_registry)
        .expect("shipped model artifacts should validate");

    assert_eq!(registry.len(), 9);
    for item in [CHICKEN, PAPAYA, COOKING_OIL] {
        for region in ["Selangor", "Kelantan", "Sarawak"] {
            let key = ModelKey(format!("{item}_{region}"));
            assert!(registry.contains(&key), "missing model {key}");
        }
    }
}

#[test]
fn shipped_policy_matches_built_in_tables_plus_english_aliases() {
    let shipped = PolicyTables::load(Some(&asset("policy.toml"))).expect("policy should validate");
    let built_in = PolicyTables::default();

    assert_eq!(shipped.tolerances, built_in.tolerances);
    assert_eq!(shipped.premise_weights, built_in.premise_weights);
    assert_eq!(shipped.aliases.get("chicken").map(String::as_str), Some(CHICKEN));
    for (alias, canonical) in &built_in.aliases {
        assert_eq!(shipped.aliases.get(alias), Some(canonical));
    }
}
