//! Input loading for the runner.
//!
//! Resolves the three configured inputs to series sources and fetches them.
//! Sources are independent, so a failure names the input that broke.

use std::path::Path;

use metcalfe_core::data::{DataError, DataSource, SeriesSource};
use metcalfe_core::domain::TimeSeries;
use thiserror::Error;

use crate::config::{InputSpec, InputsConfig};

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("input '{input}': {source}")]
    Input {
        input: &'static str,
        #[source]
        source: DataError,
    },
}

/// The three fetched inputs plus where each came from.
#[derive(Debug, Clone)]
pub struct LoadedInputs {
    pub price: TimeSeries,
    pub addresses: TimeSeries,
    pub supply: TimeSeries,
    pub sources: [DataSource; 3],
}

fn fetch(name: &'static str, source: &dyn SeriesSource) -> Result<TimeSeries, LoadError> {
    let series = source.fetch().map_err(|e| LoadError::Input {
        input: name,
        source: e,
    })?;
    tracing::info!(input = name, kind = ?source.kind(), rows = series.len(), "loaded series");
    Ok(series)
}

/// Fetch all inputs. Relative paths resolve against `base_dir`
/// (normally the directory holding the config file).
pub fn load_inputs(inputs: &InputsConfig, base_dir: &Path) -> Result<LoadedInputs, LoadError> {
    let load = |name: &'static str, spec: &InputSpec| -> Result<(TimeSeries, DataSource), LoadError> {
        let source = spec
            .to_source(name, base_dir)
            .map_err(|e| LoadError::Input { input: name, source: e })?;
        Ok((fetch(name, source.as_ref())?, source.kind()))
    };

    let (price, k0) = load("price", &inputs.price)?;
    let (addresses, k1) = load("addresses", &inputs.addresses)?;
    let (supply, k2) = load("supply", &inputs.supply)?;
    Ok(LoadedInputs {
        price,
        addresses,
        supply,
        sources: [k0, k1, k2],
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(dir: &Path, name: &str, body: &str) {
        std::fs::write(dir.join(name), body).unwrap();
    }

    fn specs() -> InputsConfig {
        InputsConfig {
            price: InputSpec::local("p.csv", "close"),
            addresses: InputSpec::local("a.csv", "active"),
            supply: InputSpec::local("s.csv", "supply"),
        }
    }

    #[test]
    fn loads_relative_paths_from_base_dir() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "p.csv", "date,close\n2020-01-01,7200\n2020-01-02,6985\n");
        write(dir.path(), "a.csv", "date,active\n2020-01-01,600000\n");
        write(dir.path(), "s.csv", "date,supply\n2020-01-02,18000000\n2020-01-01,17999000\n");

        let loaded = load_inputs(&specs(), dir.path()).unwrap();
        assert_eq!(loaded.price.len(), 2);
        assert_eq!(loaded.addresses.len(), 1);
        // Canonicalized into date order.
        assert_eq!(loaded.supply.points()[0].value, 17_999_000.0);
        assert_eq!(loaded.sources, [DataSource::CsvFile; 3]);
    }

    #[test]
    fn missing_file_names_the_input() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "p.csv", "date,close\n2020-01-01,7200\n");
        let err = load_inputs(&specs(), dir.path()).unwrap_err();
        assert!(err.to_string().starts_with("input 'addresses'"));
    }
}
