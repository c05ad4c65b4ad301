//! Overvaluation scoring against a fitted Metcalfe model.

use super::fit::{domain_violation, FitResult};
use crate::domain::AlignedDataset;
use crate::error::ModelError;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OvervaluationPoint {
    pub date: NaiveDate,
    pub actual_cap: f64,
    pub predicted_cap: f64,
    /// actual / predicted; above 1.0 means the network trades over model value.
    pub ratio: f64,
    /// `ratio` in the fit's log base.
    pub log_ratio: f64,
}

/// Per-date overvaluation, one point per aligned row, in date order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OvervaluationSeries {
    points: Vec<OvervaluationPoint>,
}

impl OvervaluationSeries {
    pub fn points(&self) -> &[OvervaluationPoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn latest(&self) -> Option<&OvervaluationPoint> {
        self.points.last()
    }
}

/// Score every row of `data` against `fit`.
///
/// No filtering happens here: a row that violates the log domain is an error,
/// so callers apply their domain policy to the dataset first.
pub fn score_overvaluation(
    data: &AlignedDataset,
    fit: &FitResult,
) -> Result<OvervaluationSeries, ModelError> {
    let mut points = Vec::with_capacity(data.len());
    for row in data.rows() {
        if let Some((field, value)) = domain_violation(row) {
            return Err(ModelError::InvalidDomain {
                date: row.date,
                field,
                value,
            });
        }
        let predicted_cap = fit.predict(row.addresses);
        let ratio = row.market_cap / predicted_cap;
        points.push(OvervaluationPoint {
            date: row.date,
            actual_cap: row.market_cap,
            predicted_cap,
            ratio,
            log_ratio: fit.log_base.log(ratio),
        });
    }
    Ok(OvervaluationSeries { points })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::AlignedRow;
    use crate::model::{LogBase, FitOptions, fit_metcalfe};

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2017, 12, day).unwrap()
    }

    fn fixed_fit(base: LogBase) -> FitResult {
        FitResult {
            exponent: 2.0,
            scale: 0.5,
            intercept: base.log(0.5),
            r_squared: 1.0,
            residual_std_error: 0.0,
            exponent_std_error: 0.0,
            intercept_std_error: 0.0,
            n_points: 3,
            excluded: 0,
            log_base: base,
        }
    }

    #[test]
    fn ratio_is_actual_over_predicted() {
        let ds = AlignedDataset::from_rows(vec![
            AlignedRow::new(d(1), 100.0, 10.0, 1.0),
            AlignedRow::new(d(2), 50.0, 10.0, 1.0),
        ])
        .unwrap();
        let series = score_overvaluation(&ds, &fixed_fit(LogBase::Natural)).unwrap();
        assert_eq!(series.len(), 2);
        let p = series.points()[0];
        assert_eq!(p.predicted_cap, 50.0);
        assert_eq!(p.ratio, 2.0);
        assert!((p.log_ratio - 2f64.ln()).abs() < 1e-15);
        assert_eq!(series.points()[1].ratio, 1.0);
        assert_eq!(series.points()[1].log_ratio, 0.0);
    }

    #[test]
    fn log_ratio_uses_fit_base() {
        let ds = AlignedDataset::from_rows(vec![AlignedRow::new(d(1), 500.0, 10.0, 1.0)]).unwrap();
        let series = score_overvaluation(&ds, &fixed_fit(LogBase::Base10)).unwrap();
        assert!((series.points()[0].log_ratio - 1.0).abs() < 1e-12);
    }

    #[test]
    fn preserves_order_and_length() {
        let rows: Vec<_> = (1..=10)
            .map(|i| AlignedRow::new(d(i), i as f64 * 3.0, i as f64 * 7.0, 2.0))
            .collect();
        let ds = AlignedDataset::from_rows(rows).unwrap();
        let fit = fit_metcalfe(&ds, &FitOptions::default()).unwrap();
        let series = score_overvaluation(&ds, &fit).unwrap();
        assert_eq!(series.len(), ds.len());
        for (p, r) in series.points().iter().zip(ds.rows()) {
            assert_eq!(p.date, r.date);
            assert_eq!(p.actual_cap, r.market_cap);
        }
    }

    #[test]
    fn zero_addresses_propagates_domain_error() {
        let ds = AlignedDataset::from_rows(vec![AlignedRow::new(d(1), 1.0, 0.0, 1.0)]).unwrap();
        let err = score_overvaluation(&ds, &fixed_fit(LogBase::Natural)).unwrap_err();
        assert!(matches!(err, ModelError::InvalidDomain { .. }));
    }
}
