//! Data acquisition: series sources and CSV import/export

pub mod csv_series;
pub mod http;
pub mod provider;

pub use csv_series::{parse_date, write_series_csv, CsvFileSource, CsvSeriesReader};
pub use http::HttpCsvSource;
pub use provider::{DataError, DataSource, InMemorySource, SeriesSource};
