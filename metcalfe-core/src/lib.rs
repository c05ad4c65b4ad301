//! Metcalfe Core: series, alignment, model fit, overvaluation scoring.
//!
//! This crate contains the reusable core of the overvaluation pipeline:
//! - Domain types (daily series, aligned dataset)
//! - Three-series inner-join alignment with market-cap derivation
//! - Generalized Metcalfe fit (log-log OLS, configurable log base and domain policy)
//! - Per-date overvaluation scoring against a fit
//! - Series sources (CSV file, CSV over HTTP) behind one trait
//! - Dataset and options fingerprinting (run identifiers)

pub mod align;
pub mod data;
pub mod domain;
pub mod error;
pub mod fingerprint;
pub mod model;

pub use align::{align_series, AlignOptions};
pub use error::{DomainField, ModelError};
pub use fingerprint::{Digest, ModelOptions, RunId};

#[cfg(test)]
mod tests {
    use super::*;

    /// Compile-time check: pipeline types are Send + Sync so runs can be
    /// fanned out across threads.
    #[allow(dead_code)]
    fn assert_send_sync() {
        fn require_send<T: Send>() {}
        fn require_sync<T: Sync>() {}

        require_send::<domain::TimeSeries>();
        require_sync::<domain::TimeSeries>();
        require_send::<domain::AlignedDataset>();
        require_sync::<domain::AlignedDataset>();
        require_send::<model::FitResult>();
        require_sync::<model::FitResult>();
        require_send::<model::OvervaluationSeries>();
        require_sync::<model::OvervaluationSeries>();
        require_send::<ModelError>();
        require_sync::<ModelError>();
        require_send::<data::HttpCsvSource>();
        require_sync::<data::HttpCsvSource>();
    }

    #[test]
    fn series_source_is_object_safe() {
        fn _check(src: &dyn data::SeriesSource) -> Result<domain::TimeSeries, data::DataError> {
            src.fetch()
        }
    }
}
