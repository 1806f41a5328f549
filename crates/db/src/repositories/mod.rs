use async_trait::async_trait;
use thiserror::Error;

use sentinel_core::{CostBasisRow, CostBasisStore, PriceHistoryRow, PriceHistoryStore};

pub mod cost_basis;
pub mod price_history;

pub use cost_basis::SqlCostBasisRepository;
pub use price_history::SqlPriceHistoryRepository;

use crate::DbPool;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
}

#[async_trait]
pub trait CostBasisRepository: Send + Sync {
    async fn list_all(&self) -> Result<Vec<CostBasisRow>, RepositoryError>;
    async fn upsert_many(&self, rows: &[CostBasisRow]) -> Result<u64, RepositoryError>;
    async fn count(&self) -> Result<i64, RepositoryError>;
}

#[async_trait]
pub trait PriceHistoryRepository: Send + Sync {
    async fn list_all(&self) -> Result<Vec<PriceHistoryRow>, RepositoryError>;
    async fn upsert_many(&self, rows: &[PriceHistoryRow]) -> Result<u64, RepositoryError>;
    async fn count(&self) -> Result<i64, RepositoryError>;
}

/// Reads the whole cost-basis table into an immutable snapshot.
pub async fn load_cost_basis_store(pool: &DbPool) -> Result<CostBasisStore, RepositoryError> {
    let rows = SqlCostBasisRepository::new(pool.clone()).list_all().await?;
    Ok(CostBasisStore::from_rows(rows))
}

/// Reads the whole price-history table into an immutable snapshot.
pub async fn load_price_history_store(pool: &DbPool) -> Result<PriceHistoryStore, RepositoryError> {
    let rows = SqlPriceHistoryRepository::new(pool.clone()).list_all().await?;
    Ok(PriceHistoryStore::from_rows(rows))
}
