//! CSV import/export of daily series.
//!
//! Input tables come from several aggregators, so the reader is driven by
//! column names and accepts the date and number styles they publish
//! ("2015-01-01", "Jan 01, 2015", "1,234.56", "$1,234.56"). Missing cells
//! ("", "-", "null", "NaN") are skipped rather than rejected.

use super::provider::{DataError, DataSource, SeriesSource};
use crate::domain::{SeriesPoint, TimeSeries};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use std::io::Read;
use std::path::{Path, PathBuf};

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%b %d, %Y", "%B %d, %Y", "%m/%d/%Y", "%Y/%m/%d"];
const DATETIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];

/// Column mapping for one series.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvSeriesReader {
    pub date_column: String,
    pub value_column: String,
}

impl CsvSeriesReader {
    pub fn new(date_column: impl Into<String>, value_column: impl Into<String>) -> Self {
        Self {
            date_column: date_column.into(),
            value_column: value_column.into(),
        }
    }

    /// Parse a CSV stream into a canonical series named `name`.
    pub fn read<R: Read>(&self, name: &str, input: R) -> Result<TimeSeries, DataError> {
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(input);

        let headers = rdr.headers()?.clone();
        let date_idx = find_column(&headers, &self.date_column)?;
        let value_idx = find_column(&headers, &self.value_column)?;

        let mut points = Vec::new();
        let mut skipped = 0usize;
        for record in rdr.records() {
            let record = record?;
            let line = record.position().map(|p| p.line()).unwrap_or(0);
            let raw_date = record.get(date_idx).unwrap_or("");
            let raw_value = record.get(value_idx).unwrap_or("");

            let Some(value) = parse_value(raw_value, line)? else {
                skipped += 1;
                continue;
            };
            let date = parse_date(raw_date).ok_or_else(|| DataError::BadDate {
                line,
                raw: raw_date.to_string(),
            })?;
            points.push(SeriesPoint::new(date, value));
        }

        let raw_len = points.len();
        let series = TimeSeries::canonicalize(name, points);
        if series.is_empty() {
            return Err(DataError::Empty(name.to_string()));
        }
        tracing::debug!(
            series = name,
            rows = series.len(),
            missing = skipped,
            duplicates_or_nan = raw_len - series.len(),
            "parsed csv series"
        );
        Ok(series)
    }

    pub fn read_str(&self, name: &str, text: &str) -> Result<TimeSeries, DataError> {
        self.read(name, text.as_bytes())
    }

    pub fn read_path(&self, name: &str, path: &Path) -> Result<TimeSeries, DataError> {
        let file = std::fs::File::open(path).map_err(|source| DataError::Io {
            path: path.display().to_string(),
            source,
        })?;
        self.read(name, file)
    }
}

fn find_column(headers: &csv::StringRecord, wanted: &str) -> Result<usize, DataError> {
    headers
        .iter()
        .position(|h| h.trim_start_matches('\u{feff}').eq_ignore_ascii_case(wanted))
        .ok_or_else(|| DataError::MissingColumn {
            column: wanted.to_string(),
            available: headers.iter().collect::<Vec<_>>().join(", "),
        })
}

/// Parse a date cell in any of the accepted formats.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    DATE_FORMATS
        .iter()
        .find_map(|f| NaiveDate::parse_from_str(raw, f).ok())
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|f| NaiveDateTime::parse_from_str(raw, f).ok())
                .map(|dt| dt.date())
        })
        .or_else(|| DateTime::parse_from_rfc3339(raw).ok().map(|dt| dt.date_naive()))
}

/// `Ok(None)` for a missing cell, `Err` for something that is not a number.
fn parse_value(raw: &str, line: u64) -> Result<Option<f64>, DataError> {
    let cleaned: String = raw
        .trim()
        .chars()
        .filter(|c| *c != ',' && *c != '$')
        .collect();
    if cleaned.is_empty()
        || cleaned == "-"
        || cleaned.eq_ignore_ascii_case("null")
        || cleaned.eq_ignore_ascii_case("nan")
    {
        return Ok(None);
    }
    cleaned
        .parse::<f64>()
        .map(Some)
        .map_err(|_| DataError::BadValue {
            line,
            raw: raw.to_string(),
        })
}

/// Persist a series as a two-column `date,value` CSV.
pub fn write_series_csv(path: &Path, series: &TimeSeries) -> Result<(), DataError> {
    let io_err = |source| DataError::Io {
        path: path.display().to_string(),
        source,
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(io_err)?;
    }
    let mut wtr = csv::Writer::from_path(path)?;
    wtr.write_record(["date", "value"])?;
    for p in series.points() {
        wtr.write_record([p.date.to_string(), p.value.to_string()])?;
    }
    wtr.flush().map_err(io_err)?;
    Ok(())
}

/// A series read from a local CSV file.
#[derive(Debug, Clone)]
pub struct CsvFileSource {
    name: String,
    path: PathBuf,
    reader: CsvSeriesReader,
}

impl CsvFileSource {
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>, reader: CsvSeriesReader) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            reader,
        }
    }
}

impl SeriesSource for CsvFileSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> DataSource {
        DataSource::CsvFile
    }

    fn fetch(&self) -> Result<TimeSeries, DataError> {
        self.reader.read_path(&self.name, &self.path)
    }
}
