//! Generalized Metcalfe fit: market cap ∝ addresses^k.
//!
//! Ordinary least squares of `log(market_cap)` on `{log(addresses), 1}`:
//! - slope     → exponent `k`
//! - intercept → `log(C)`, so `C = base^intercept`
//!
//! Sums are taken about the means to keep the normal equations well
//! conditioned for market caps in the 1e9..1e12 range.

use super::options::{DomainPolicy, FitOptions, LogBase};
use crate::domain::{AlignedDataset, AlignedRow};
use crate::error::{DomainField, ModelError};
use serde::{Deserialize, Serialize};

/// Two coefficients plus a residual estimate need at least one degree of freedom.
pub const MIN_FIT_POINTS: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FitResult {
    /// Fitted power `k` (2.0 is classic Metcalfe).
    pub exponent: f64,
    /// Scale constant `C`.
    pub scale: f64,
    /// Regression intercept in log space (`log_base(C)`).
    pub intercept: f64,
    pub r_squared: f64,
    pub residual_std_error: f64,
    pub exponent_std_error: f64,
    pub intercept_std_error: f64,
    /// Points that entered the regression.
    pub n_points: usize,
    /// Rows dropped by [`DomainPolicy::Exclude`].
    pub excluded: usize,
    pub log_base: LogBase,
}

impl FitResult {
    /// Model market cap for an address count: `C × addresses^k`.
    pub fn predict(&self, addresses: f64) -> f64 {
        self.scale * addresses.powf(self.exponent)
    }
}

/// First non-positive or non-finite value in a row, if any.
pub fn domain_violation(row: &AlignedRow) -> Option<(DomainField, f64)> {
    let bad = |v: f64| !(v.is_finite() && v > 0.0);
    if bad(row.addresses) {
        Some((DomainField::Addresses, row.addresses))
    } else if bad(row.market_cap) {
        Some((DomainField::MarketCap, row.market_cap))
    } else {
        None
    }
}

/// Fit the generalized Metcalfe relationship to an aligned dataset.
pub fn fit_metcalfe(data: &AlignedDataset, opts: &FitOptions) -> Result<FitResult, ModelError> {
    let base = opts.log_base;
    let mut xs = Vec::with_capacity(data.len());
    let mut ys = Vec::with_capacity(data.len());
    let mut excluded = 0usize;

    for row in data.rows() {
        if let Some((field, value)) = domain_violation(row) {
            match opts.domain_policy {
                DomainPolicy::Fail => {
                    return Err(ModelError::InvalidDomain {
                        date: row.date,
                        field,
                        value,
                    })
                }
                DomainPolicy::Exclude => {
                    excluded += 1;
                    continue;
                }
            }
        }
        xs.push(base.log(row.addresses));
        ys.push(base.log(row.market_cap));
    }

    let n = xs.len();
    if n < MIN_FIT_POINTS {
        return Err(ModelError::InsufficientData {
            required: MIN_FIT_POINTS,
            found: n,
        });
    }

    let nf = n as f64;
    let mean_x = xs.iter().sum::<f64>() / nf;
    let mean_y = ys.iter().sum::<f64>() / nf;

    let mut sxx = 0.0;
    let mut sxy = 0.0;
    let mut syy = 0.0;
    for (&x, &y) in xs.iter().zip(&ys) {
        let dx = x - mean_x;
        let dy = y - mean_y;
        sxx += dx * dx;
        sxy += dx * dy;
        syy += dy * dy;
    }

    if sxx <= f64::EPSILON * nf * mean_x.abs().max(1.0) {
        return Err(ModelError::DegenerateData {
            reason: format!("all {n} address values are identical; slope is undefined"),
        });
    }

    let slope = sxy / sxx;
    let intercept = mean_y - slope * mean_x;

    let ss_res: f64 = xs
        .iter()
        .zip(&ys)
        .map(|(&x, &y)| {
            let e = y - (intercept + slope * x);
            e * e
        })
        .sum();

    // Flat response with a perfect fit: nothing left unexplained.
    let r_squared = if syy > 0.0 {
        (1.0 - ss_res / syy).clamp(0.0, 1.0)
    } else {
        1.0
    };

    let dof = nf - 2.0;
    let sigma2 = ss_res / dof;
    let residual_std_error = sigma2.sqrt();
    let exponent_std_error = (sigma2 / sxx).sqrt();
    let intercept_std_error = (sigma2 * (1.0 / nf + mean_x * mean_x / sxx)).sqrt();

    let fit = FitResult {
        exponent: slope,
        scale: base.exp(intercept),
        intercept,
        r_squared,
        residual_std_error,
        exponent_std_error,
        intercept_std_error,
        n_points: n,
        excluded,
        log_base: base,
    };

    tracing::debug!(
        k = fit.exponent,
        c = fit.scale,
        r2 = fit.r_squared,
        n = fit.n_points,
        excluded,
        "metcalfe fit"
    );

    Ok(fit)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn dataset(addresses: &[f64], caps: &[f64]) -> AlignedDataset {
        let start = NaiveDate::from_ymd_opt(2015, 1, 1).unwrap();
        let rows = addresses
            .iter()
            .zip(caps)
            .enumerate()
            .map(|(i, (&a, &c))| {
                AlignedRow::new(start + chrono::Duration::days(i as i64), c, a, 1.0)
            })
            .collect();
        AlignedDataset::from_rows(rows).unwrap()
    }

    #[test]
    fn exact_power_law_is_recovered() {
        let addresses = [10.0, 20.0, 40.0, 80.0, 160.0];
        let caps: Vec<f64> = addresses.iter().map(|a: &f64| 3.0 * a.powf(2.0)).collect();
        let fit = fit_metcalfe(&dataset(&addresses, &caps), &FitOptions::default()).unwrap();
        assert!((fit.exponent - 2.0).abs() < 1e-10);
        assert!((fit.scale - 3.0).abs() < 1e-9);
        assert!((fit.r_squared - 1.0).abs() < 1e-12);
        assert!(fit.residual_std_error < 1e-10);
    }

    #[test]
    fn base10_gives_same_exponent_and_scale() {
        let addresses = [100.0, 150.0, 200.0, 250.0, 300.0];
        let caps = [1000.0, 1800.0, 2500.0, 3300.0, 4200.0];
        let ds = dataset(&addresses, &caps);
        let ln = fit_metcalfe(&ds, &FitOptions::default()).unwrap();
        let log10 = fit_metcalfe(
            &ds,
            &FitOptions {
                log_base: LogBase::Base10,
                ..FitOptions::default()
            },
        )
        .unwrap();
        assert!((ln.exponent - log10.exponent).abs() < 1e-10);
        assert!((ln.scale - log10.scale).abs() / ln.scale < 1e-9);
        assert!((ln.intercept - log10.intercept).abs() > 1e-3);
    }

    #[test]
    fn two_points_is_insufficient_three_is_enough() {
        let err = fit_metcalfe(&dataset(&[1.0, 2.0], &[1.0, 4.0]), &FitOptions::default())
            .unwrap_err();
        assert_eq!(
            err,
            ModelError::InsufficientData {
                required: 3,
                found: 2
            }
        );
        assert!(
            fit_metcalfe(&dataset(&[1.0, 2.0, 3.0], &[1.0, 4.0, 10.0]), &FitOptions::default())
                .is_ok()
        );
    }

    #[test]
    fn exclude_policy_drops_zero_addresses() {
        let fit = fit_metcalfe(
            &dataset(&[0.0, 10.0, 20.0, 40.0], &[5.0, 100.0, 400.0, 1600.0]),
            &FitOptions::default(),
        )
        .unwrap();
        assert_eq!(fit.excluded, 1);
        assert_eq!(fit.n_points, 3);
        assert!((fit.exponent - 2.0).abs() < 1e-10);
    }

    #[test]
    fn exclusion_can_leave_too_few_points() {
        let err = fit_metcalfe(
            &dataset(&[0.0, -3.0, 20.0, 40.0], &[5.0, 1.0, 400.0, 1600.0]),
            &FitOptions::default(),
        )
        .unwrap_err();
        assert!(matches!(err, ModelError::InsufficientData { found: 2, .. }));
    }

    #[test]
    fn fail_policy_reports_first_bad_row() {
        let opts = FitOptions {
            domain_policy: DomainPolicy::Fail,
            ..FitOptions::default()
        };
        let err = fit_metcalfe(
            &dataset(&[10.0, -1.0, 20.0, 40.0], &[100.0, 5.0, 400.0, 1600.0]),
            &opts,
        )
        .unwrap_err();
        match err {
            ModelError::InvalidDomain { date, field, value } => {
                assert_eq!(date, NaiveDate::from_ymd_opt(2015, 1, 2).unwrap());
                assert_eq!(field, DomainField::Addresses);
                assert_eq!(value, -1.0);
            }
            other => panic!("expected InvalidDomain, got {other:?}"),
        }
    }

    #[test]
    fn zero_market_cap_is_a_domain_violation() {
        let opts = FitOptions {
            domain_policy: DomainPolicy::Fail,
            ..FitOptions::default()
        };
        let err = fit_metcalfe(&dataset(&[10.0, 20.0, 30.0], &[100.0, 0.0, 900.0]), &opts)
            .unwrap_err();
        assert!(matches!(
            err,
            ModelError::InvalidDomain {
                field: DomainField::MarketCap,
                ..
            }
        ));
    }

    #[test]
    fn constant_addresses_are_degenerate() {
        let err = fit_metcalfe(
            &dataset(&[50.0, 50.0, 50.0], &[1.0, 2.0, 3.0]),
            &FitOptions::default(),
        )
        .unwrap_err();
        assert!(matches!(err, ModelError::DegenerateData { .. }));
    }

    #[test]
    fn predict_matches_scale_and_exponent() {
        let fit = fit_metcalfe(
            &dataset(&[1.0, 2.0, 4.0], &[5.0, 20.0, 80.0]),
            &FitOptions::default(),
        )
        .unwrap();
        assert!((fit.predict(8.0) - 320.0).abs() < 1e-8);
    }
}
