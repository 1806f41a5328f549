use async_trait::async_trait;
use chrono::NaiveDate;
use sentinel_core::PriceHistoryRow;
use sqlx::{sqlite::SqliteRow, Row};

use super::{PriceHistoryRepository, RepositoryError};
use crate::DbPool;

pub struct SqlPriceHistoryRepository {
    pool: DbPool,
}

impl SqlPriceHistoryRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    fn row_from_sql(row: &SqliteRow) -> Result<PriceHistoryRow, RepositoryError> {
        let date: NaiveDate = row.try_get("date")?;
        let price: f64 = row.try_get("price")?;
        if !price.is_finite() {
            return Err(RepositoryError::Decode(format!("non-finite price on {date}")));
        }
        Ok(PriceHistoryRow { date, item: row.try_get("item")?, region: row.try_get("state")?, price })
    }
}

#[async_trait]
impl PriceHistoryRepository for SqlPriceHistoryRepository {
    async fn list_all(&self) -> Result<Vec<PriceHistoryRow>, RepositoryError> {
        let rows = sqlx::query(
            r#"
            SELECT date, item, state, price
            FROM price_history
            ORDER BY item, state, date
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(Self::row_from_sql).collect()
    }

    async fn upsert_many(&self, rows: &[PriceHistoryRow]) -> Result<u64, RepositoryError> {
        let mut tx = self.pool.begin().await?;
        let mut affected = 0;
        for row in rows {
            affected += sqlx::query(
                "INSERT OR REPLACE INTO price_history (date, item, state, price) VALUES (?, ?, ?, ?)",
            )
            .bind(row.date)
            .bind(&row.item)
            .bind(&row.region)
            .bind(row.price)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        }
        tx.commit().await?;
        Ok(affected)
    }

    async fn count(&self) -> Result<i64, RepositoryError> {
        Ok(sqlx::query_scalar("SELECT COUNT(*) FROM price_history").fetch_one(&self.pool).await?)
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use sentinel_core::{CanonicalKey, PriceHistoryRow};

    use super::SqlPriceHistoryRepository;
    use crate::repositories::{load_price_history_store, PriceHistoryRepository};
    use crate::{connect_with_settings, migrations};

    fn row(day: u32, region: &str, price: f64) -> PriceHistoryRow {
        PriceHistoryRow {
            date: NaiveDate::from_ymd_opt(2025, 5, day).expect("valid date"),
            item: "BETIK BIASA".to_string(),
            region: region.to_string(),
            price,
        }
    }

    #[tokio::test]
    async fn history_loads_into_per_series_snapshot() {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrate");
        let repository = SqlPriceHistoryRepository::new(pool.clone());

        repository
            .upsert_many(&[
                row(3, "Selangor", 4.30),
                row(1, "Selangor", 4.10),
                row(1, "Kelantan", 3.90),
            ])
            .await
            .expect("insert");

        let store = load_price_history_store(&pool).await.expect("load");
        let selangor = store.recent(&CanonicalKey::new("BETIK BIASA", "Selangor"), 10);

        assert_eq!(repository.count().await.expect("count"), 3);
        assert_eq!(store.series_count(), 2);
        assert_eq!(selangor.len(), 2);
        assert_eq!(selangor[0].price, 4.10);
        assert_eq!(selangor[1].price, 4.30);
    }
}
