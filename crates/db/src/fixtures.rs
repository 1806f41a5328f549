use chrono::{Datelike, Days, NaiveDate};
use sentinel_core::policy::{CHICKEN, COOKING_OIL, PAPAYA};
use sentinel_core::{CostBasisRow, PriceHistoryRow};

use crate::connection::DbPool;
use crate::repositories::{
    CostBasisRepository, PriceHistoryRepository, RepositoryError, SqlCostBasisRepository,
    SqlPriceHistoryRepository,
};

/// Cost basis runs this many days past the data cutoff so the horizon always has rows.
pub const COST_BASIS_LEAD_DAYS: u64 = 30;

const DIESEL_SUBSIDY_END: (i32, u32, u32) = (2024, 6, 10);
const SUBSIDISED_DIESEL: f64 = 2.15;
const MARKET_DIESEL: f64 = 3.35;

/// (item, region, base price, seasonal amplitude, period in days)
const DEMO_SERIES: &[(&str, &str, f64, f64, i64)] = &[
    (CHICKEN, "Selangor", 9.60, 0.35, 90),
    (CHICKEN, "Kelantan", 9.30, 0.30, 90),
    (CHICKEN, "Sarawak", 10.20, 0.40, 90),
    (PAPAYA, "Selangor", 4.20, 0.20, 60),
    (PAPAYA, "Kelantan", 3.90, 0.15, 60),
    (PAPAYA, "Sarawak", 4.60, 0.25, 60),
    (COOKING_OIL, "Selangor", 2.50, 0.0, 1),
    (COOKING_OIL, "Kelantan", 2.50, 0.0, 1),
    (COOKING_OIL, "Sarawak", 2.50, 0.0, 1),
];

/// Deterministic market data for local runs and tests.
///
/// Every value is derived from the day offset against a fixed origin, so
/// loading the same cutoff twice produces identical tables.
#[derive(Clone, Debug)]
pub struct DemoDataset {
    origin: NaiveDate,
    cutoff: NaiveDate,
}

impl DemoDataset {
    pub fn new(origin: NaiveDate, cutoff: NaiveDate) -> Self {
        Self { origin, cutoff }
    }

    /// History begins on January 1st of the year before the cutoff.
    pub fn for_cutoff(cutoff: NaiveDate) -> Self {
        let origin = NaiveDate::from_ymd_opt(cutoff.year() - 1, 1, 1).unwrap_or(cutoff);
        Self::new(origin, cutoff)
    }

    pub fn origin(&self) -> NaiveDate {
        self.origin
    }

    pub fn cutoff(&self) -> NaiveDate {
        self.cutoff
    }

    pub fn cost_basis_end(&self) -> NaiveDate {
        self.cutoff.checked_add_days(Days::new(COST_BASIS_LEAD_DAYS)).unwrap_or(self.cutoff)
    }

    pub fn cost_basis_rows(&self) -> Vec<CostBasisRow> {
        let subsidy_end = NaiveDate::from_ymd_opt(
            DIESEL_SUBSIDY_END.0,
            DIESEL_SUBSIDY_END.1,
            DIESEL_SUBSIDY_END.2,
        );

        days_between(self.origin, self.cost_basis_end())
            .map(|date| {
                let offset = self.offset(date);
                let diesel_on = |day: NaiveDate, day_offset: i64| match subsidy_end {
                    Some(end) if day >= end => round4(MARKET_DIESEL + 0.04 * wave(day_offset, 28)),
                    _ => SUBSIDISED_DIESEL,
                };
                let lag_30 = date.checked_sub_days(Days::new(30)).unwrap_or(date);

                CostBasisRow {
                    date,
                    usd: usd_at(offset),
                    usd_lag_60: usd_at(offset - 60),
                    diesel: diesel_on(date, offset),
                    diesel_lag_30: diesel_on(lag_30, offset - 30),
                    diesel_east: SUBSIDISED_DIESEL,
                    diesel_east_lag_30: SUBSIDISED_DIESEL,
                }
            })
            .collect()
    }

    pub fn price_history_rows(&self) -> Vec<PriceHistoryRow> {
        let mut rows = Vec::new();
        for (item, region, base, amplitude, period) in DEMO_SERIES {
            for date in days_between(self.origin, self.cutoff) {
                let offset = self.offset(date);
                let currency_push = 0.5 * (usd_at(offset - 60) - 4.55);
                let price = if *amplitude == 0.0 {
                    *base
                } else {
                    round2(base + amplitude * wave(offset, *period) + currency_push)
                };
                rows.push(PriceHistoryRow {
                    date,
                    item: (*item).to_string(),
                    region: (*region).to_string(),
                    price,
                });
            }
        }
        rows
    }

    /// Upserts both tables; re-running leaves row counts unchanged.
    pub async fn load(&self, pool: &DbPool) -> Result<SeedResult, RepositoryError> {
        let cost_basis = self.cost_basis_rows();
        let history = self.price_history_rows();

        SqlCostBasisRepository::new(pool.clone()).upsert_many(&cost_basis).await?;
        SqlPriceHistoryRepository::new(pool.clone()).upsert_many(&history).await?;

        tracing::info!(
            event_name = "sentinel.db.demo_seeded",
            cost_basis_rows = cost_basis.len(),
            price_history_rows = history.len(),
            cutoff = %self.cutoff,
            "demo market data loaded"
        );

        Ok(SeedResult {
            cost_basis_rows: cost_basis.len(),
            price_history_rows: history.len(),
            series: DEMO_SERIES.len(),
            first_date: self.origin,
            last_cost_basis_date: self.cost_basis_end(),
        })
    }

    /// Checks that the cutoff and the full horizon are covered.
    pub async fn verify(&self, pool: &DbPool) -> Result<VerificationResult, RepositoryError> {
        let mut checks = Vec::new();

        let cutoff_row: i64 =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM cost_basis WHERE date = ?1)")
                .bind(self.cutoff)
                .fetch_one(pool)
                .await?;
        checks.push(("cost-basis-cutoff", cutoff_row == 1));

        let horizon_rows: i64 = sqlx::query_scalar(
            "SELECT COUNT(1) FROM cost_basis WHERE date > ?1 AND date <= ?2",
        )
        .bind(self.cutoff)
        .bind(self.cost_basis_end())
        .fetch_one(pool)
        .await?;
        checks.push(("cost-basis-horizon", horizon_rows == COST_BASIS_LEAD_DAYS as i64));

        let series: i64 = sqlx::query_scalar(
            "SELECT COUNT(1) FROM (SELECT DISTINCT item, state FROM price_history)",
        )
        .fetch_one(pool)
        .await?;
        checks.push(("price-history-series", series >= DEMO_SERIES.len() as i64));

        let latest: Option<String> = sqlx::query_scalar("SELECT MAX(date) FROM price_history")
            .fetch_one(pool)
            .await?;
        let expected = self.cutoff.format("%Y-%m-%d").to_string();
        checks.push(("price-history-cutoff", latest.as_deref() == Some(expected.as_str())));

        let all_present = checks.iter().all(|(_, passed)| *passed);
        Ok(VerificationResult { all_present, checks })
    }

    /// Removes all market data.
    pub async fn clean(pool: &DbPool) -> Result<(), RepositoryError> {
        let mut tx = pool.begin().await?;
        sqlx::query("DELETE FROM price_history").execute(&mut *tx).await?;
        sqlx::query("DELETE FROM cost_basis").execute(&mut *tx).await?;
        tx.commit().await?;
        Ok(())
    }

    fn offset(&self, date: NaiveDate) -> i64 {
        (date - self.origin).num_days()
    }
}

#[derive(Debug)]
pub struct SeedResult {
    pub cost_basis_rows: usize,
    pub price_history_rows: usize,
    pub series: usize,
    pub first_date: NaiveDate,
    pub last_cost_basis_date: NaiveDate,
}

#[derive(Debug)]
pub struct VerificationResult {
    pub all_present: bool,
    pub checks: Vec<(&'static str, bool)>,
}

fn days_between(start: NaiveDate, end: NaiveDate) -> impl Iterator<Item = NaiveDate> {
    start.iter_days().take_while(move |date| *date <= end)
}

/// Triangle wave in [-1, 1].
fn wave(offset: i64, period: i64) -> f64 {
    let period = period.max(2);
    let half = period / 2;
    let phase = offset.rem_euclid(period);
    1.0 - 2.0 * ((phase - half).abs() as f64 / half as f64)
}

fn usd_at(offset: i64) -> f64 {
    round4(4.55 + 0.25 * wave(offset, 120) + 0.03 * wave(offset, 14))
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    fn cutoff() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 7, 28).expect("valid date")
    }

    #[test]
    fn wave_stays_in_unit_band() {
        for offset in -200..200 {
            let value = wave(offset, 90);
            assert!((-1.0..=1.0).contains(&value), "offset {offset} gave {value}");
        }
    }

    #[test]
    fn cost_basis_extends_past_cutoff_and_lags_are_consistent() {
        let dataset = DemoDataset::for_cutoff(cutoff());
        let rows = dataset.cost_basis_rows();

        assert_eq!(rows.first().map(|row| row.date), NaiveDate::from_ymd_opt(2024, 1, 1));
        assert_eq!(rows.last().map(|row| row.date), NaiveDate::from_ymd_opt(2025, 8, 27));
        assert_eq!(rows.len(), 605);

        let by_date = |date: NaiveDate| rows.iter().find(|row| row.date == date);
        let today = NaiveDate::from_ymd_opt(2025, 5, 1).expect("valid date");
        let sixty_back = today - Days::new(60);
        assert_eq!(
            by_date(today).map(|row| row.usd_lag_60),
            by_date(sixty_back).map(|row| row.usd)
        );
        assert!(rows.iter().all(|row| row.diesel_east == SUBSIDISED_DIESEL));
    }

    #[test]
    fn diesel_switches_to_market_rate_after_subsidy_end() {
        let rows = DemoDataset::for_cutoff(cutoff()).cost_basis_rows();
        let before = NaiveDate::from_ymd_opt(2024, 6, 9).expect("valid date");
        let after = NaiveDate::from_ymd_opt(2024, 8, 1).expect("valid date");

        let diesel = |date| rows.iter().find(|row| row.date == date).map(|row| row.diesel);
        assert_eq!(diesel(before), Some(SUBSIDISED_DIESEL));
        assert!(diesel(after).is_some_and(|value| value > 3.0));
    }

    #[test]
    fn price_history_is_deterministic_and_regulated_oil_is_flat() {
        let first = DemoDataset::for_cutoff(cutoff()).price_history_rows();
        let second = DemoDataset::for_cutoff(cutoff()).price_history_rows();

        assert_eq!(first, second);
        assert_eq!(first.len(), 575 * DEMO_SERIES.len());
        assert!(first.iter().filter(|row| row.item == COOKING_OIL).all(|row| row.price == 2.50));
        assert!(first.iter().all(|row| row.price > 0.0 && row.date <= cutoff()));
    }
}
