use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use sentinel_agent::{AnalystService, LlmClient};
use sentinel_core::config::{AssetsConfig, PipelineConfig};
use sentinel_db::{connect_with_settings, migrations, DemoDataset};
use serde_json::{json, Value};
use tempfile::TempDir;

use crate::bootstrap::AssetSource;
use crate::state::{AppState, AssetHandle};

pub const CHICKEN_SELANGOR_MODEL: &str = "AYAM BERSIH - STANDARD_Selangor";

const MODELS_FILE: &str = "price_models.json";

pub fn write_models(dir: &Path, document: Value) -> PathBuf {
    let path = dir.join(MODELS_FILE);
    std::fs::write(&path, document.to_string()).expect("write model artifacts");
    path
}

pub fn write_default_models(dir: &Path) -> PathBuf {
    let linear = |intercept: f64| {
        json!({
            "kind": "linear",
            "intercept": intercept,
            "coefficients": [0.3, 1.2, 0.15, 0.35, 0.4],
            "importances": [0.15, 0.45, 0.1, 0.2, 0.1]
        })
    };
    write_models(
        dir,
        json!({
            "models": {
                CHICKEN_SELANGOR_MODEL: linear(1.2),
                "AYAM BERSIH - STANDARD_Sarawak": linear(1.8),
                "BETIK BIASA_Selangor": {
                    "kind": "tree_ensemble",
                    "base_score": 4.0,
                    "importances": [0.1, 0.3, 0.2, 0.3, 0.1],
                    "trees": [{
                        "left_children": [1, -1, -1],
                        "right_children": [2, -1, -1],
                        "split_indices": [1, 0, 0],
                        "split_conditions": [4.5, 0.0, 0.0],
                        "leaf_values": [0.0, -0.1, 0.2]
                    }]
                },
                "MINYAK MASAK PAKET (PELBAGAI JENAMA)_Kelantan": linear(2.5)
            }
        }),
    )
}

/// App state over a seeded in-memory database. The returned directory holds
/// the model artifacts and must outlive the state.
pub async fn app_state(client: Option<Arc<dyn LlmClient>>) -> (AppState, TempDir) {
    let dir = tempfile::tempdir().expect("tempdir");
    let models_path = write_default_models(dir.path());

    let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
    migrations::run_pending(&pool).await.expect("migrate");
    let cutoff = NaiveDate::from_ymd_opt(2025, 7, 28).expect("valid date");
    DemoDataset::for_cutoff(cutoff).load(&pool).await.expect("seed demo data");

    let source = AssetSource::new(
        pool,
        AssetsConfig { models_path, policy_path: None },
        PipelineConfig::default(),
    );
    let pipeline = source.load().await.expect("load assets");
    let analyst =
        AnalystService::new(client, Duration::from_millis(200)).expect("analyst service");

    let state = AppState {
        assets: Arc::new(AssetHandle::new(pipeline)),
        analyst: Arc::new(analyst),
        source: Arc::new(source),
    };
    (state, dir)
}
