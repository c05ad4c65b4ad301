//! Three-series date alignment.
//!
//! Price, active addresses and supply are inner-joined on date. A date missing
//! from any one series is dropped: scoring needs all three values per day, so
//! there is no forward-fill here.

use crate::domain::{AlignedDataset, AlignedRow, TimeSeries};
use crate::error::ModelError;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Optional inclusive date window applied after the join.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlignOptions {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl AlignOptions {
    fn contains(&self, date: NaiveDate) -> bool {
        self.start.map_or(true, |s| date >= s) && self.end.map_or(true, |e| date <= e)
    }
}

/// Inner-join three series on date and derive market cap = price × supply.
pub fn align_series(
    price: &TimeSeries,
    addresses: &TimeSeries,
    supply: &TimeSeries,
    opts: &AlignOptions,
) -> Result<AlignedDataset, ModelError> {
    for series in [price, addresses, supply] {
        if series.is_empty() {
            return Err(ModelError::misaligned(format!(
                "series '{}' is empty",
                series.name()
            )));
        }
    }
    if let (Some(s), Some(e)) = (opts.start, opts.end) {
        if s > e {
            return Err(ModelError::misaligned(format!(
                "date window start {s} is after end {e}"
            )));
        }
    }

    let (p, a, s) = (price.points(), addresses.points(), supply.points());
    let (mut i, mut j, mut k) = (0, 0, 0);
    let mut rows = Vec::with_capacity(p.len().min(a.len()).min(s.len()));

    // Merge walk: all three inputs are strictly increasing by construction.
    while i < p.len() && j < a.len() && k < s.len() {
        let max_date = p[i].date.max(a[j].date).max(s[k].date);
        let mut advanced = false;
        for (idx, pts) in [(&mut i, p), (&mut j, a), (&mut k, s)] {
            if pts[*idx].date.cmp(&max_date) == Ordering::Less {
                *idx += 1;
                advanced = true;
            }
        }
        if advanced {
            continue;
        }

        let date = max_date;
        if opts.contains(date) {
            rows.push(AlignedRow::new(date, p[i].value, a[j].value, s[k].value));
        }
        i += 1;
        j += 1;
        k += 1;
    }

    if rows.is_empty() {
        return Err(ModelError::misaligned(format!(
            "no date shared by '{}', '{}' and '{}' in the requested range",
            price.name(),
            addresses.name(),
            supply.name()
        )));
    }

    let union = p.len().max(a.len()).max(s.len());
    tracing::debug!(
        rows = rows.len(),
        dropped_from_longest = union - rows.len(),
        "aligned series"
    );

    Ok(AlignedDataset::from_sorted_rows(rows))
}
