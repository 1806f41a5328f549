use std::sync::Arc;

use sentinel_agent::AnalystService;
use sentinel_core::config::{AppConfig, AssetsConfig, ConfigError, LoadOptions, PipelineConfig};
use sentinel_core::model::ArtifactError;
use sentinel_core::policy::PolicyError;
use sentinel_core::{ApplicationError, ModelArtifactSet, PolicyTables, SentinelPipeline};
use sentinel_db::repositories::{load_cost_basis_store, load_price_history_store};
use sentinel_db::{connect_with_config, migrations, DbPool, RepositoryError};
use thiserror::Error;
use tracing::info;

use crate::state::{AppState, AssetHandle};

pub struct Application {
    pub config: AppConfig,
    pub db_pool: DbPool,
    pub state: AppState,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("database connection failed: {0}")]
    DatabaseConnect(#[source] sqlx::Error),
    #[error("database migration failed: {0}")]
    Migration(#[source] sqlx::migrate::MigrateError),
    #[error("policy tables could not be loaded: {0}")]
    Policy(#[from] PolicyError),
    #[error("model artifacts could not be loaded: {0}")]
    Artifacts(#[from] ArtifactError),
    #[error("market data could not be loaded: {0}")]
    MarketData(#[from] RepositoryError),
    #[error("reasoning collaborator could not be configured: {0}")]
    Analyst(String),
}

impl From<BootstrapError> for ApplicationError {
    fn from(error: BootstrapError) -> Self {
        match error {
            BootstrapError::DatabaseConnect(_)
            | BootstrapError::Migration(_)
            | BootstrapError::MarketData(_) => Self::Persistence(error.to_string()),
            BootstrapError::Analyst(_) => Self::Integration(error.to_string()),
            BootstrapError::Config(_) | BootstrapError::Policy(_) | BootstrapError::Artifacts(_) => {
                Self::Configuration(error.to_string())
            }
        }
    }
}

/// Everything needed to rebuild a pipeline snapshot from scratch.
#[derive(Clone)]
pub struct AssetSource {
    db_pool: DbPool,
    assets: AssetsConfig,
    pipeline: PipelineConfig,
}

impl AssetSource {
    pub fn new(db_pool: DbPool, assets: AssetsConfig, pipeline: PipelineConfig) -> Self {
        Self { db_pool, assets, pipeline }
    }

    pub fn db_pool(&self) -> &DbPool {
        &self.db_pool
    }

    pub async fn load(&self) -> Result<SentinelPipeline, BootstrapError> {
        let policy = PolicyTables::load(self.assets.policy_path.as_deref())?;
        let models = ModelArtifactSet::load(&self.assets.models_path)?.into_registry()?;
        let cost_basis = load_cost_basis_store(&self.db_pool).await?;
        let history = load_price_history_store(&self.db_pool).await?;

        info!(
            event_name = "system.assets.loaded",
            correlation_id = "bootstrap",
            models = models.len(),
            cost_basis_rows = cost_basis.len(),
            price_series = history.series_count(),
            "pricing assets loaded"
        );

        Ok(SentinelPipeline::new(&policy, self.pipeline.clone(), cost_basis, history, models))
    }
}

pub async fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config).await
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        "starting application bootstrap"
    );

    let db_pool =
        connect_with_config(&config.database).await.map_err(BootstrapError::DatabaseConnect)?;
    info!(
        event_name = "system.bootstrap.database_connected",
        correlation_id = "bootstrap",
        "database connection established"
    );

    migrations::run_pending(&db_pool).await.map_err(BootstrapError::Migration)?;
    info!(
        event_name = "system.bootstrap.migrations_applied",
        correlation_id = "bootstrap",
        "database migrations applied"
    );

    let source =
        AssetSource::new(db_pool.clone(), config.assets.clone(), config.pipeline.clone());
    let pipeline = source.load().await?;

    let analyst = AnalystService::from_config(&config.llm)
        .map_err(|error| BootstrapError::Analyst(error.to_string()))?;
    info!(
        event_name = "system.bootstrap.analyst_ready",
        correlation_id = "bootstrap",
        provider = config.llm.provider.as_str(),
        enabled = analyst.is_enabled(),
        "reasoning collaborator configured"
    );

    let state = AppState {
        assets: Arc::new(AssetHandle::new(pipeline)),
        analyst: Arc::new(analyst),
        source: Arc::new(source),
    };

    Ok(Application { config, db_pool, state })
}
