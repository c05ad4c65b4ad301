//! Single model run: align → fit → score.
//!
//! Each stage is a pure function from `metcalfe-core`; this module only chains
//! them and keeps every intermediate product so it can be exported.

use chrono::NaiveDate;
use metcalfe_core::domain::{AlignedDataset, TimeSeries};
use metcalfe_core::fingerprint::{run_id, RunId};
use metcalfe_core::model::{
    domain_violation, fit_metcalfe, score_overvaluation, DomainPolicy, FitResult,
    OvervaluationSeries,
};
use metcalfe_core::{align_series, ModelError, ModelOptions};
use serde::{Deserialize, Serialize};

/// Row counts of the three inputs before the join.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputLengths {
    pub price: usize,
    pub addresses: usize,
    pub supply: usize,
}

/// Everything one run produced.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelRun {
    pub run_id: RunId,
    pub options: ModelOptions,
    pub inputs: InputLengths,
    /// Aligned rows that passed the domain policy (the rows that were scored).
    pub dataset: AlignedDataset,
    /// Dates dropped by [`DomainPolicy::Exclude`].
    pub excluded_dates: Vec<NaiveDate>,
    pub fit: FitResult,
    pub series: OvervaluationSeries,
}

/// Apply the non-positive value policy to an aligned dataset.
///
/// `Exclude` returns the surviving rows and the dropped dates; `Fail` returns
/// the first violation as `InvalidDomain`.
pub fn apply_domain_policy(
    data: &AlignedDataset,
    policy: DomainPolicy,
) -> Result<(AlignedDataset, Vec<NaiveDate>), ModelError> {
    let mut excluded = Vec::new();
    for row in data.rows() {
        if let Some((field, value)) = domain_violation(row) {
            match policy {
                DomainPolicy::Fail => {
                    return Err(ModelError::InvalidDomain {
                        date: row.date,
                        field,
                        value,
                    })
                }
                DomainPolicy::Exclude => excluded.push(row.date),
            }
        }
    }
    if excluded.is_empty() {
        return Ok((data.clone(), excluded));
    }
    let kept = data.filter(|r| domain_violation(r).is_none());
    Ok((kept, excluded))
}

/// Run the full model on three already-acquired series.
pub fn run_model(
    price: &TimeSeries,
    addresses: &TimeSeries,
    supply: &TimeSeries,
    options: &ModelOptions,
) -> Result<ModelRun, ModelError> {
    let aligned = align_series(price, addresses, supply, &options.align)?;
    tracing::info!(
        rows = aligned.len(),
        price = price.len(),
        addresses = addresses.len(),
        supply = supply.len(),
        "aligned inputs"
    );

    // The fitter applies the same policy itself and counts exclusions.
    let fit = fit_metcalfe(&aligned, &options.fit)?;
    let (dataset, excluded_dates) = apply_domain_policy(&aligned, options.fit.domain_policy)?;
    if !excluded_dates.is_empty() {
        tracing::warn!(
            excluded = excluded_dates.len(),
            first = %excluded_dates[0],
            "rows with non-positive addresses or market cap excluded"
        );
    }

    let series = score_overvaluation(&dataset, &fit)?;
    tracing::info!(
        k = fit.exponent,
        r2 = fit.r_squared,
        points = series.len(),
        "model fitted and scored"
    );

    Ok(ModelRun {
        run_id: run_id(&aligned, options),
        options: *options,
        inputs: InputLengths {
            price: price.len(),
            addresses: addresses.len(),
            supply: supply.len(),
        },
        dataset,
        excluded_dates,
        fit,
        series,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use metcalfe_core::domain::SeriesPoint;
    use metcalfe_core::model::FitOptions;

    fn day(i: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2016, 3, i).unwrap()
    }

    fn series(name: &str, values: &[f64]) -> TimeSeries {
        TimeSeries::new(
            name,
            values
                .iter()
                .enumerate()
                .map(|(i, &v)| SeriesPoint::new(day(i as u32 + 1), v))
                .collect(),
        )
        .unwrap()
    }

    fn inputs(addresses: &[f64]) -> (TimeSeries, TimeSeries, TimeSeries) {
        let n = addresses.len();
        let price: Vec<f64> = (0..n).map(|i| 400.0 + 10.0 * i as f64).collect();
        (
            series("price", &price),
            series("addresses", addresses),
            series("supply", &vec![1.5e7; n]),
        )
    }

    #[test]
    fn exclude_policy_scores_only_valid_rows() {
        let (p, a, s) = inputs(&[1e5, 0.0, 1.2e5, 1.3e5, 1.5e5]);
        let run = run_model(&p, &a, &s, &ModelOptions::default()).unwrap();
        assert_eq!(run.excluded_dates, vec![day(2)]);
        assert_eq!(run.fit.excluded, 1);
        assert_eq!(run.dataset.len(), 4);
        assert_eq!(run.series.len(), 4);
        assert_eq!(run.inputs.addresses, 5);
    }

    #[test]
    fn fail_policy_aborts_run() {
        let (p, a, s) = inputs(&[1e5, 0.0, 1.2e5, 1.3e5]);
        let opts = ModelOptions {
            fit: FitOptions {
                domain_policy: DomainPolicy::Fail,
                ..FitOptions::default()
            },
            ..ModelOptions::default()
        };
        assert!(matches!(
            run_model(&p, &a, &s, &opts),
            Err(ModelError::InvalidDomain { .. })
        ));
    }

    #[test]
    fn clean_data_passes_policy_unchanged() {
        let (p, a, s) = inputs(&[1e5, 1.1e5, 1.2e5]);
        let aligned = align_series(&p, &a, &s, &Default::default()).unwrap();
        let (kept, excluded) = apply_domain_policy(&aligned, DomainPolicy::Fail).unwrap();
        assert!(excluded.is_empty());
        assert_eq!(kept, aligned);
    }

    #[test]
    fn same_inputs_same_run_id() {
        let (p, a, s) = inputs(&[1e5, 1.1e5, 1.25e5, 1.4e5]);
        let r1 = run_model(&p, &a, &s, &ModelOptions::default()).unwrap();
        let r2 = run_model(&p, &a, &s, &ModelOptions::default()).unwrap();
        assert_eq!(r1, r2);
        assert_eq!(r1.run_id.hash(), r2.run_id.hash());
    }
}
