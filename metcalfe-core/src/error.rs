//! Model-stage error types.
//!
//! Every stage of the pipeline fails synchronously with one of these. There is
//! no partial-success mode: the caller decides whether to retry with different
//! inputs (e.g. a wider date range).

use chrono::NaiveDate;
use thiserror::Error;

/// Which column of an aligned row violated the logarithm domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DomainField {
    Addresses,
    MarketCap,
}

impl std::fmt::Display for DomainField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DomainField::Addresses => write!(f, "active addresses"),
            DomainField::MarketCap => write!(f, "market cap"),
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum ModelError {
    /// Empty input series, or no date shared by all series.
    #[error("misaligned data: {reason}")]
    MisalignedData { reason: String },

    /// A value where a logarithm is required is zero, negative, or not finite.
    #[error("invalid domain on {date}: {field} = {value} (logarithm undefined)")]
    InvalidDomain {
        date: NaiveDate,
        field: DomainField,
        value: f64,
    },

    /// Too few valid points for a two-parameter fit with a residual estimate.
    #[error("insufficient data: need at least {required} valid points, found {found}")]
    InsufficientData { required: usize, found: usize },

    /// A series violated its construction invariant (ordering, duplicates, NaN).
    #[error("invalid series '{name}': {reason}")]
    InvalidSeries { name: String, reason: String },

    /// The regressor has zero variance, so the slope is undefined.
    #[error("degenerate data: {reason}")]
    DegenerateData { reason: String },
}

impl ModelError {
    pub fn misaligned(reason: impl Into<String>) -> Self {
        ModelError::MisalignedData {
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_domain_message_names_field_and_date() {
        let err = ModelError::InvalidDomain {
            date: NaiveDate::from_ymd_opt(2015, 3, 1).unwrap(),
            field: DomainField::Addresses,
            value: 0.0,
        };
        let msg = err.to_string();
        assert!(msg.contains("2015-03-01"));
        assert!(msg.contains("active addresses"));
    }

    #[test]
    fn insufficient_data_message_reports_counts() {
        let err = ModelError::InsufficientData {
            required: 3,
            found: 2,
        };
        assert_eq!(
            err.to_string(),
            "insufficient data: need at least 3 valid points, found 2"
        );
    }
}
