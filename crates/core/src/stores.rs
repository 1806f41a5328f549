//! Read-only, date-indexed tables loaded once at startup.

use std::collections::{BTreeMap, HashMap};

use chrono::NaiveDate;

use crate::domain::catalog::CanonicalKey;
use crate::domain::market::{CostBasisRow, PriceHistoryRow, PricePoint};

#[derive(Clone, Debug, Default)]
pub struct CostBasisStore {
    rows: BTreeMap<NaiveDate, CostBasisRow>,
}

impl CostBasisStore {
    /// Builds the store; if a date repeats, the last row wins.
    pub fn from_rows(rows: impl IntoIterator<Item = CostBasisRow>) -> Self {
        Self { rows: rows.into_iter().map(|row| (row.date, row)).collect() }
    }

    pub fn get(&self, date: NaiveDate) -> Option<&CostBasisRow> {
        self.rows.get(&date)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.rows.keys().next().copied()
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.rows.keys().next_back().copied()
    }
}

#[derive(Clone, Debug, Default)]
pub struct PriceHistoryStore {
    series: HashMap<CanonicalKey, Vec<PricePoint>>,
}

impl PriceHistoryStore {
    pub fn from_rows(rows: impl IntoIterator<Item = PriceHistoryRow>) -> Self {
        let mut by_key: HashMap<CanonicalKey, BTreeMap<NaiveDate, f64>> = HashMap::new();
        for row in rows {
            by_key
                .entry(CanonicalKey::new(row.item, row.region))
                .or_default()
                .insert(row.date, row.price);
        }

        let series = by_key
            .into_iter()
            .map(|(key, points)| {
                let points =
                    points.into_iter().map(|(date, price)| PricePoint { date, price }).collect();
                (key, points)
            })
            .collect();

        Self { series }
    }

    /// The most recent `limit` observations, oldest first.
    pub fn recent(&self, key: &CanonicalKey, limit: usize) -> &[PricePoint] {
        match self.series.get(key) {
            Some(points) => &points[points.len().saturating_sub(limit)..],
            None => &[],
        }
    }

    pub fn series_count(&self) -> usize {
        self.series.len()
    }

    pub fn observation_count(&self) -> usize {
        self.series.values().map(Vec::len).sum()
    }
}
