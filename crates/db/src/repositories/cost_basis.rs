use async_trait::async_trait;
use chrono::NaiveDate;
use sentinel_core::CostBasisRow;
use sqlx::{sqlite::SqliteRow, Row};

use super::{CostBasisRepository, RepositoryError};
use crate::DbPool;

pub struct SqlCostBasisRepository {
    pool: DbPool,
}

impl SqlCostBasisRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    fn row_from_sql(row: &SqliteRow) -> Result<CostBasisRow, RepositoryError> {
        let date: NaiveDate = row.try_get("date")?;
        Ok(CostBasisRow {
            date,
            usd: row.try_get("usd")?,
            usd_lag_60: row.try_get("usd_lag_60")?,
            diesel: row.try_get("diesel")?,
            diesel_lag_30: row.try_get("diesel_lag_30")?,
            diesel_east: row.try_get("diesel_eastmsia")?,
            diesel_east_lag_30: row.try_get("diesel_em_lag_30")?,
        })
    }
}

#[async_trait]
impl CostBasisRepository for SqlCostBasisRepository {
    async fn list_all(&self) -> Result<Vec<CostBasisRow>, RepositoryError> {
        let rows = sqlx::query(
            r#"
            SELECT date, usd, usd_lag_60, diesel, diesel_lag_30, diesel_eastmsia, diesel_em_lag_30
            FROM cost_basis
            ORDER BY date
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(Self::row_from_sql).collect()
    }

    async fn upsert_many(&self, rows: &[CostBasisRow]) -> Result<u64, RepositoryError> {
        let mut tx = self.pool.begin().await?;
        let mut affected = 0;
        for row in rows {
            affected += sqlx::query(
                r#"
                INSERT OR REPLACE INTO cost_basis
                    (date, usd, usd_lag_60, diesel, diesel_lag_30, diesel_eastmsia, diesel_em_lag_30)
                VALUES (?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(row.date)
            .bind(row.usd)
            .bind(row.usd_lag_60)
            .bind(row.diesel)
            .bind(row.diesel_lag_30)
            .bind(row.diesel_east)
            .bind(row.diesel_east_lag_30)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        }
        tx.commit().await?;
        Ok(affected)
    }

    async fn count(&self) -> Result<i64, RepositoryError> {
        Ok(sqlx::query_scalar("SELECT COUNT(*) FROM cost_basis").fetch_one(&self.pool).await?)
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use sentinel_core::CostBasisRow;

    use super::SqlCostBasisRepository;
    use crate::repositories::{load_cost_basis_store, CostBasisRepository};
    use crate::{connect_with_settings, migrations};

    fn row(day: u32, usd_lag_60: f64) -> CostBasisRow {
        CostBasisRow {
            date: NaiveDate::from_ymd_opt(2025, 3, day).expect("valid date"),
            usd: 4.45,
            usd_lag_60,
            diesel: 3.35,
            diesel_lag_30: 3.35,
            diesel_east: 2.15,
            diesel_east_lag_30: 2.15,
        }
    }

    #[tokio::test]
    async fn rows_round_trip_through_sqlite_in_date_order() {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrate");
        let repository = SqlCostBasisRepository::new(pool.clone());

        repository.upsert_many(&[row(2, 4.70), row(1, 4.72)]).await.expect("insert");
        let rows = repository.list_all().await.expect("list");

        assert_eq!(rows, vec![row(1, 4.72), row(2, 4.70)]);
    }

    #[tokio::test]
    async fn upsert_replaces_existing_date() {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrate");
        let repository = SqlCostBasisRepository::new(pool.clone());

        repository.upsert_many(&[row(1, 4.72)]).await.expect("insert");
        repository.upsert_many(&[row(1, 4.60)]).await.expect("replace");

        assert_eq!(repository.count().await.expect("count"), 1);
        let store = load_cost_basis_store(&pool).await.expect("load");
        assert_eq!(store.get(row(1, 0.0).date).map(|r| r.usd_lag_60), Some(4.60));
    }
}
