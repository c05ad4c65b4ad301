//! Date-aligned table of price, addresses, supply and derived market cap.

use crate::error::ModelError;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One date on which all three source series have a value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AlignedRow {
    pub date: NaiveDate,
    pub price: f64,
    pub addresses: f64,
    pub supply: f64,
    /// price × supply
    pub market_cap: f64,
}

impl AlignedRow {
    pub fn new(date: NaiveDate, price: f64, addresses: f64, supply: f64) -> Self {
        Self {
            date,
            price,
            addresses,
            supply,
            market_cap: price * supply,
        }
    }
}

/// Inner join of the three source series, dates strictly increasing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawDataset")]
pub struct AlignedDataset {
    rows: Vec<AlignedRow>,
}

#[derive(Deserialize)]
struct RawDataset {
    rows: Vec<AlignedRow>,
}

impl TryFrom<RawDataset> for AlignedDataset {
    type Error = ModelError;

    fn try_from(raw: RawDataset) -> Result<Self, Self::Error> {
        AlignedDataset::from_rows(raw.rows)
    }
}

impl AlignedDataset {
    /// Build from caller-supplied rows, rejecting out-of-order or duplicate dates.
    pub fn from_rows(rows: Vec<AlignedRow>) -> Result<Self, ModelError> {
        if let Some(w) = rows.windows(2).find(|w| w[0].date >= w[1].date) {
            return Err(ModelError::misaligned(format!(
                "aligned rows out of order at {} -> {}",
                w[0].date, w[1].date
            )));
        }
        Ok(Self { rows })
    }

    /// Rows must already be in strictly increasing date order.
    pub(crate) fn from_sorted_rows(rows: Vec<AlignedRow>) -> Self {
        debug_assert!(rows.windows(2).all(|w| w[0].date < w[1].date));
        Self { rows }
    }

    pub fn rows(&self) -> &[AlignedRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.rows.first().map(|r| r.date)
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.rows.last().map(|r| r.date)
    }

    /// Subset of rows with `start <= date <= end`. Order is preserved.
    pub fn window(&self, start: NaiveDate, end: NaiveDate) -> AlignedDataset {
        let rows = self
            .rows
            .iter()
            .filter(|r| r.date >= start && r.date <= end)
            .copied()
            .collect();
        Self { rows }
    }

    /// Subset of rows matching `keep`. Order is preserved.
    pub fn filter(&self, mut keep: impl FnMut(&AlignedRow) -> bool) -> AlignedDataset {
        let rows = self.rows.iter().filter(|r| keep(r)).copied().collect();
        Self { rows }
    }
}
