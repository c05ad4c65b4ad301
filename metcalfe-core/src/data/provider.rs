//! Series source trait and structured acquisition errors.
//!
//! The SeriesSource trait abstracts over where a daily series comes from (a
//! local CSV, a CSV served over HTTP) so the pipeline only ever sees a
//! [`TimeSeries`] and tests can substitute in-memory data.

use crate::domain::TimeSeries;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Structured error types for data acquisition.
///
/// These are designed to be displayable in CLI output as-is.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("column '{column}' not found (available: {available})")]
    MissingColumn { column: String, available: String },

    #[error("line {line}: cannot parse date '{raw}'")]
    BadDate { line: u64, raw: String },

    #[error("line {line}: cannot parse value '{raw}'")]
    BadValue { line: u64, raw: String },

    #[error("network unreachable: {0}")]
    NetworkUnreachable(String),

    #[error("HTTP {status} from {url}")]
    HttpStatus { status: u16, url: String },

    #[error("source '{0}' returned no rows")]
    Empty(String),
}

/// Where a series came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataSource {
    CsvFile,
    Http,
    InMemory,
}

/// Trait for series sources.
pub trait SeriesSource: Send + Sync {
    /// Human-readable name used in logs and errors.
    fn name(&self) -> &str;

    fn kind(&self) -> DataSource;

    /// Fetch and canonicalize the full series.
    fn fetch(&self) -> Result<TimeSeries, DataError>;
}

/// A series already held in memory.
#[derive(Debug, Clone)]
pub struct InMemorySource {
    series: TimeSeries,
}

impl InMemorySource {
    pub fn new(series: TimeSeries) -> Self {
        Self { series }
    }
}

impl SeriesSource for InMemorySource {
    fn name(&self) -> &str {
        self.series.name()
    }

    fn kind(&self) -> DataSource {
        DataSource::InMemory
    }

    fn fetch(&self) -> Result<TimeSeries, DataError> {
        if self.series.is_empty() {
            return Err(DataError::Empty(self.series.name().to_string()));
        }
        Ok(self.series.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::SeriesPoint;
    use chrono::NaiveDate;

    #[test]
    fn in_memory_source_returns_clone() {
        let d = NaiveDate::from_ymd_opt(2015, 1, 1).unwrap();
        let ts = TimeSeries::new("price", vec![SeriesPoint::new(d, 314.0)]).unwrap();
        let src = InMemorySource::new(ts.clone());
        assert_eq!(src.name(), "price");
        assert_eq!(src.kind(), DataSource::InMemory);
        assert_eq!(src.fetch().unwrap(), ts);
    }

    #[test]
    fn empty_in_memory_source_is_an_error() {
        let src = InMemorySource::new(TimeSeries::new("supply", vec![]).unwrap());
        assert!(matches!(src.fetch(), Err(DataError::Empty(_))));
    }
}
