//! Serializable run configuration (TOML).
//!
//! ```toml
//! [inputs.price]
//! path = "data/price.csv"
//! date_column = "Date"
//! value_column = "Close"
//!
//! [inputs.addresses]
//! url = "https://example.org/active-addresses.csv"
//! value_column = "active_addresses"
//!
//! [inputs.supply]
//! path = "data/supply.csv"
//! value_column = "supply"
//!
//! [model]
//! log_base = "natural"        # or "base10"
//! domain_policy = "exclude"   # or "fail"
//! start_date = "2013-01-01"
//!
//! [report]
//! output_dir = "results"
//! episode_threshold = 2.0
//!
//! [sweep]
//! window_days = 730
//! step_days = 90
//! ```

use chrono::NaiveDate;
use metcalfe_core::data::{CsvFileSource, CsvSeriesReader, DataError, HttpCsvSource, SeriesSource};
use metcalfe_core::model::{DomainPolicy, FitOptions, LogBase};
use metcalfe_core::{AlignOptions, ModelOptions};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Complete configuration for one model run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    pub inputs: InputsConfig,
    #[serde(default)]
    pub model: ModelSection,
    #[serde(default)]
    pub report: ReportConfig,
    #[serde(default)]
    pub sweep: Option<SweepConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputsConfig {
    pub price: InputSpec,
    pub addresses: InputSpec,
    pub supply: InputSpec,
}

/// Where one series lives and which columns hold it. Exactly one of
/// `path` / `url` must be set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputSpec {
    #[serde(default)]
    pub path: Option<PathBuf>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_date_column")]
    pub date_column: String,
    pub value_column: String,
}

fn default_date_column() -> String {
    "date".to_string()
}

impl InputSpec {
    pub fn local(path: impl Into<PathBuf>, value_column: impl Into<String>) -> Self {
        Self {
            path: Some(path.into()),
            url: None,
            date_column: default_date_column(),
            value_column: value_column.into(),
        }
    }

    fn validate(&self, name: &str) -> Result<(), ConfigError> {
        match (&self.path, &self.url) {
            (Some(_), Some(_)) => Err(ConfigError::Invalid(format!(
                "inputs.{name}: set either path or url, not both"
            ))),
            (None, None) => Err(ConfigError::Invalid(format!(
                "inputs.{name}: one of path or url is required"
            ))),
            _ if self.value_column.trim().is_empty() => Err(ConfigError::Invalid(format!(
                "inputs.{name}: value_column is empty"
            ))),
            _ => Ok(()),
        }
    }

    /// Build the series source. Relative paths resolve against `base_dir`.
    pub fn to_source(&self, name: &str, base_dir: &Path) -> Result<Box<dyn SeriesSource>, DataError> {
        let reader = CsvSeriesReader::new(&self.date_column, &self.value_column);
        match (&self.path, &self.url) {
            (Some(path), _) => {
                let path = if path.is_relative() {
                    base_dir.join(path)
                } else {
                    path.clone()
                };
                Ok(Box::new(CsvFileSource::new(name, path, reader)))
            }
            (None, Some(url)) => Ok(Box::new(HttpCsvSource::new(name, url.clone(), reader)?)),
            (None, None) => Err(DataError::Empty(name.to_string())),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelSection {
    #[serde(default)]
    pub log_base: LogBase,
    #[serde(default)]
    pub domain_policy: DomainPolicy,
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
}

impl ModelSection {
    pub fn options(&self) -> ModelOptions {
        ModelOptions {
            align: AlignOptions {
                start: self.start_date,
                end: self.end_date,
            },
            fit: FitOptions {
                log_base: self.log_base,
                domain_policy: self.domain_policy,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportConfig {
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    /// Ratio at or above which a day counts toward an overvaluation episode.
    #[serde(default = "default_episode_threshold")]
    pub episode_threshold: f64,
    #[serde(default = "default_true")]
    pub parquet: bool,
    #[serde(default = "default_true")]
    pub markdown: bool,
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("results")
}

fn default_episode_threshold() -> f64 {
    2.0
}

fn default_true() -> bool {
    true
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            episode_threshold: default_episode_threshold(),
            parquet: true,
            markdown: true,
        }
    }
}

/// Rolling-window refit settings (calendar days).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SweepConfig {
    pub window_days: u32,
    pub step_days: u32,
}

/// Longest window or step accepted, in days (a century).
pub const MAX_SWEEP_DAYS: u32 = 36_500;

impl SweepConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [("window_days", self.window_days), ("step_days", self.step_days)] {
            if value == 0 || value > MAX_SWEEP_DAYS {
                return Err(ConfigError::Invalid(format!(
                    "sweep.{field} must be in 1..={MAX_SWEEP_DAYS}, got {value}"
                )));
            }
        }
        Ok(())
    }
}

impl RunConfig {
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: RunConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml(&content)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.inputs.price.validate("price")?;
        self.inputs.addresses.validate("addresses")?;
        self.inputs.supply.validate("supply")?;

        if let (Some(s), Some(e)) = (self.model.start_date, self.model.end_date) {
            if s > e {
                return Err(ConfigError::Invalid(format!(
                    "model.start_date {s} is after model.end_date {e}"
                )));
            }
        }
        if !(self.report.episode_threshold.is_finite() && self.report.episode_threshold > 0.0) {
            return Err(ConfigError::Invalid(
                "report.episode_threshold must be a positive number".into(),
            ));
        }
        if let Some(sweep) = &self.sweep {
            sweep.validate()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
[inputs.price]
path = "price.csv"
date_column = "Date"
value_column = "Close"

[inputs.addresses]
path = "addresses.csv"
value_column = "active_addresses"

[inputs.supply]
url = "https://example.org/supply.csv"
value_column = "supply"
"#;

    #[test]
    fn minimal_config_gets_defaults() {
        let cfg = RunConfig::from_toml(MINIMAL).unwrap();
        assert_eq!(cfg.model.log_base, LogBase::Natural);
        assert_eq!(cfg.model.domain_policy, DomainPolicy::Exclude);
        assert_eq!(cfg.inputs.addresses.date_column, "date");
        assert_eq!(cfg.report.output_dir, PathBuf::from("results"));
        assert_eq!(cfg.report.episode_threshold, 2.0);
        assert!(cfg.report.parquet && cfg.report.markdown);
        assert!(cfg.sweep.is_none());
    }

    #[test]
    fn model_section_maps_to_options() {
        let toml = format!(
            "{MINIMAL}\n[model]\nlog_base = \"base10\"\ndomain_policy = \"fail\"\nstart_date = \"2014-01-01\"\n"
        );
        let cfg = RunConfig::from_toml(&toml).unwrap();
        let opts = cfg.model.options();
        assert_eq!(opts.fit.log_base, LogBase::Base10);
        assert_eq!(opts.fit.domain_policy, DomainPolicy::Fail);
        assert_eq!(opts.align.start, NaiveDate::from_ymd_opt(2014, 1, 1));
        assert_eq!(opts.align.end, None);
    }

    #[test]
    fn input_with_path_and_url_is_rejected() {
        let toml = MINIMAL.replace(
            "path = \"price.csv\"",
            "path = \"price.csv\"\nurl = \"https://example.org/p.csv\"",
        );
        let err = RunConfig::from_toml(&toml).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(ref m) if m.contains("inputs.price")));
    }

    #[test]
    fn inverted_date_window_is_rejected() {
        let toml = format!(
            "{MINIMAL}\n[model]\nstart_date = \"2016-01-01\"\nend_date = \"2015-01-01\"\n"
        );
        assert!(matches!(
            RunConfig::from_toml(&toml),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn zero_sweep_step_is_rejected() {
        let toml = format!("{MINIMAL}\n[sweep]\nwindow_days = 365\nstep_days = 0\n");
        assert!(matches!(
            RunConfig::from_toml(&toml),
            Err(ConfigError::Invalid(ref m)) if m.contains("step_days")
        ));
    }

    #[test]
    fn sweep_longer_than_a_century_is_rejected() {
        let toml = format!("{MINIMAL}\n[sweep]\nwindow_days = 4000000000\nstep_days = 30\n");
        assert!(matches!(
            RunConfig::from_toml(&toml),
            Err(ConfigError::Invalid(ref m)) if m.contains("window_days")
        ));
    }

    #[test]
    fn unknown_log_base_is_a_parse_error() {
        let toml = format!("{MINIMAL}\n[model]\nlog_base = \"log2\"\n");
        assert!(matches!(RunConfig::from_toml(&toml), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn relative_paths_resolve_against_base_dir() {
        let cfg = RunConfig::from_toml(MINIMAL).unwrap();
        let src = cfg
            .inputs
            .price
            .to_source("price", Path::new("/data/btc"))
            .unwrap();
        assert_eq!(src.name(), "price");
        assert_eq!(src.kind(), metcalfe_core::data::DataSource::CsvFile);
    }
}
