//! Daily date-keyed series (price, active addresses, supply).

use crate::error::ModelError;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One observation of a daily series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeriesPoint {
    pub date: NaiveDate,
    pub value: f64,
}

impl SeriesPoint {
    pub fn new(date: NaiveDate, value: f64) -> Self {
        Self { date, value }
    }
}

/// Ordered sequence of (date, value) pairs.
///
/// Invariant: dates are strictly increasing (so no duplicates) and every value
/// is finite. Enforced by [`TimeSeries::new`]; [`TimeSeries::canonicalize`]
/// repairs raw input instead of rejecting it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawSeries")]
pub struct TimeSeries {
    name: String,
    points: Vec<SeriesPoint>,
}

#[derive(Deserialize)]
struct RawSeries {
    name: String,
    points: Vec<SeriesPoint>,
}

impl TryFrom<RawSeries> for TimeSeries {
    type Error = ModelError;

    fn try_from(raw: RawSeries) -> Result<Self, Self::Error> {
        TimeSeries::new(raw.name, raw.points)
    }
}

impl TimeSeries {
    /// Build a series, rejecting unsorted, duplicated, or non-finite input.
    pub fn new(name: impl Into<String>, points: Vec<SeriesPoint>) -> Result<Self, ModelError> {
        let name = name.into();
        for (i, p) in points.iter().enumerate() {
            if !p.value.is_finite() {
                return Err(ModelError::InvalidSeries {
                    name,
                    reason: format!("non-finite value {} on {}", p.value, p.date),
                });
            }
            if i > 0 && points[i - 1].date >= p.date {
                let reason = if points[i - 1].date == p.date {
                    format!("duplicate date {}", p.date)
                } else {
                    format!("dates not increasing at {} -> {}", points[i - 1].date, p.date)
                };
                return Err(ModelError::InvalidSeries { name, reason });
            }
        }
        Ok(Self { name, points })
    }

    /// Sort ascending, keep the first occurrence of each date, drop non-finite values.
    pub fn canonicalize(name: impl Into<String>, mut points: Vec<SeriesPoint>) -> Self {
        points.retain(|p| p.value.is_finite());
        // stable sort keeps input order among equal dates, so dedup keeps the first
        points.sort_by_key(|p| p.date);
        points.dedup_by_key(|p| p.date);
        Self {
            name: name.into(),
            points,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn points(&self) -> &[SeriesPoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.points.first().map(|p| p.date)
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.points.last().map(|p| p.date)
    }

    /// Value on `date`, if present. Binary search over the sorted dates.
    pub fn get(&self, date: NaiveDate) -> Option<f64> {
        self.points
            .binary_search_by_key(&date, |p| p.date)
            .ok()
            .map(|i| self.points[i].value)
    }

    pub fn into_points(self) -> Vec<SeriesPoint> {
        self.points
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn new_accepts_strictly_increasing_dates() {
        let ts = TimeSeries::new(
            "price",
            vec![
                SeriesPoint::new(d("2015-01-01"), 1.0),
                SeriesPoint::new(d("2015-01-02"), 2.0),
            ],
        )
        .unwrap();
        assert_eq!(ts.len(), 2);
        assert_eq!(ts.first_date(), Some(d("2015-01-01")));
        assert_eq!(ts.get(d("2015-01-02")), Some(2.0));
        assert_eq!(ts.get(d("2015-01-03")), None);
    }

    #[test]
    fn new_rejects_duplicate_dates() {
        let err = TimeSeries::new(
            "price",
            vec![
                SeriesPoint::new(d("2015-01-01"), 1.0),
                SeriesPoint::new(d("2015-01-01"), 2.0),
            ],
        )
        .unwrap_err();
        assert!(matches!(err, ModelError::InvalidSeries { ref reason, .. } if reason.contains("duplicate")));
    }

    #[test]
    fn new_rejects_unsorted_dates() {
        let err = TimeSeries::new(
            "supply",
            vec![
                SeriesPoint::new(d("2015-01-02"), 1.0),
                SeriesPoint::new(d("2015-01-01"), 2.0),
            ],
        )
        .unwrap_err();
        assert!(matches!(err, ModelError::InvalidSeries { .. }));
    }

    #[test]
    fn new_rejects_nan() {
        let err = TimeSeries::new("price", vec![SeriesPoint::new(d("2015-01-01"), f64::NAN)])
            .unwrap_err();
        assert!(matches!(err, ModelError::InvalidSeries { .. }));
    }

    #[test]
    fn canonicalize_sorts_dedupes_and_drops_nan() {
        let ts = TimeSeries::canonicalize(
            "addresses",
            vec![
                SeriesPoint::new(d("2015-01-03"), 3.0),
                SeriesPoint::new(d("2015-01-01"), 1.0),
                SeriesPoint::new(d("2015-01-02"), f64::NAN),
                SeriesPoint::new(d("2015-01-01"), 99.0),
            ],
        );
        assert_eq!(ts.len(), 2);
        assert_eq!(ts.points()[0].value, 1.0);
        assert_eq!(ts.points()[1].date, d("2015-01-03"));
        // canonical output always satisfies the constructor invariant
        assert!(TimeSeries::new("addresses", ts.points().to_vec()).is_ok());
    }

    #[test]
    fn deserialize_enforces_date_order() {
        let ok = r#"{"name":"price","points":[{"date":"2015-01-01","value":1.0},{"date":"2015-01-02","value":2.0}]}"#;
        let ts: TimeSeries = serde_json::from_str(ok).unwrap();
        assert_eq!(ts.len(), 2);

        let swapped = r#"{"name":"price","points":[{"date":"2015-01-02","value":1.0},{"date":"2015-01-01","value":2.0}]}"#;
        let err = serde_json::from_str::<TimeSeries>(swapped).unwrap_err();
        assert!(err.to_string().contains("not increasing"));
    }
}
