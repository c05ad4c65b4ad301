//! CSV-over-HTTP series source.
//!
//! Fetches a published CSV (chart exports from blockchain explorers and price
//! aggregators) and parses it with [`CsvSeriesReader`]. Transient failures
//! (connect errors, timeouts, 429, 5xx) are retried with exponential backoff;
//! anything else fails immediately.

use super::csv_series::CsvSeriesReader;
use super::provider::{DataError, DataSource, SeriesSource};
use crate::domain::TimeSeries;
use std::time::Duration;

/// Upper bound on a single backoff sleep.
const MAX_BACKOFF: Duration = Duration::from_secs(60);

/// Sleep before retry `attempt` (1-based): `base * 2^(attempt - 1)`, capped.
fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
    base.saturating_mul(factor).min(MAX_BACKOFF)
}

pub struct HttpCsvSource {
    name: String,
    url: String,
    reader: CsvSeriesReader,
    client: reqwest::blocking::Client,
    max_retries: u32,
    base_delay: Duration,
}

impl HttpCsvSource {
    pub fn new(
        name: impl Into<String>,
        url: impl Into<String>,
        reader: CsvSeriesReader,
    ) -> Result<Self, DataError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(concat!("metcalfe/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| DataError::NetworkUnreachable(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            name: name.into(),
            url: url.into(),
            reader,
            client,
            max_retries: 3,
            base_delay: Duration::from_millis(500),
        })
    }

    pub fn with_retries(mut self, max_retries: u32, base_delay: Duration) -> Self {
        self.max_retries = max_retries;
        self.base_delay = base_delay;
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    fn fetch_body(&self) -> Result<String, DataError> {
        let mut last_error = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let delay = backoff_delay(self.base_delay, attempt);
                tracing::warn!(
                    source = %self.name,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    "retrying download"
                );
                std::thread::sleep(delay);
            }

            match self.client.get(&self.url).send() {
                Ok(resp) => {
                    let status = resp.status();
                    if status.is_success() {
                        return resp
                            .text()
                            .map_err(|e| DataError::NetworkUnreachable(e.to_string()));
                    }
                    let err = DataError::HttpStatus {
                        status: status.as_u16(),
                        url: self.url.clone(),
                    };
                    if status == reqwest::StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
                    {
                        last_error = Some(err);
                        continue;
                    }
                    return Err(err);
                }
                Err(e) => {
                    if e.is_connect() || e.is_timeout() {
                        last_error = Some(DataError::NetworkUnreachable(e.to_string()));
                        continue;
                    }
                    return Err(DataError::NetworkUnreachable(e.to_string()));
                }
            }
        }

        Err(last_error
            .unwrap_or_else(|| DataError::NetworkUnreachable("max retries exceeded".into())))
    }
}

impl SeriesSource for HttpCsvSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> DataSource {
        DataSource::Http
    }

    fn fetch(&self) -> Result<TimeSeries, DataError> {
        tracing::info!(source = %self.name, url = %self.url, "downloading series");
        let body = self.fetch_body()?;
        self.reader.read_str(&self.name, &body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_keeps_url_and_retry_policy() {
        let src = HttpCsvSource::new(
            "price",
            "https://example.invalid/price.csv",
            CsvSeriesReader::new("date", "close"),
        )
        .unwrap()
        .with_retries(5, Duration::from_millis(10));
        assert_eq!(src.name(), "price");
        assert_eq!(src.url(), "https://example.invalid/price.csv");
        assert_eq!(src.kind(), DataSource::Http);
        assert_eq!(src.max_retries, 5);
        assert_eq!(src.base_delay, Duration::from_millis(10));
    }

    #[test]
    fn backoff_doubles_then_caps() {
        let base = Duration::from_millis(500);
        assert_eq!(backoff_delay(base, 1), Duration::from_millis(500));
        assert_eq!(backoff_delay(base, 3), Duration::from_secs(2));
        assert_eq!(backoff_delay(base, 40), MAX_BACKOFF);
        assert_eq!(backoff_delay(Duration::MAX, u32::MAX), MAX_BACKOFF);
    }
}
