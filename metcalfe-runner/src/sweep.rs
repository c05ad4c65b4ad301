//! Rolling-window refits.
//!
//! Refits the Metcalfe model over fixed-length calendar windows to show how
//! the exponent `k` drifts across market regimes. Windows are independent and
//! stateless, so they are fitted in parallel; output keeps window order.

use crate::config::{ConfigError, SweepConfig};
use chrono::{Duration, NaiveDate};
use metcalfe_core::domain::AlignedDataset;
use metcalfe_core::model::{fit_metcalfe, FitOptions, FitResult};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Fit outcome for one window. A failed window records its error and does
/// not abort the sweep.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowFit {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub rows: usize,
    pub fit: Option<FitResult>,
    pub error: Option<String>,
}

/// Inclusive bounds of every full window between `first` and `last`.
///
/// Only windows that fit entirely inside the range are produced, so a range
/// shorter than one window yields none.
pub fn window_bounds(first: NaiveDate, last: NaiveDate, cfg: &SweepConfig) -> Vec<(NaiveDate, NaiveDate)> {
    let span = Duration::days(i64::from(cfg.window_days) - 1);
    let step = Duration::days(i64::from(cfg.step_days));
    let mut out = Vec::new();
    let mut start = first;
    // Past the representable calendar means past `last` as well.
    while let Some(end) = start.checked_add_signed(span) {
        if end > last {
            break;
        }
        out.push((start, end));
        match start.checked_add_signed(step) {
            Some(next) => start = next,
            None => break,
        }
    }
    out
}

pub fn sweep_windows(
    data: &AlignedDataset,
    cfg: &SweepConfig,
    opts: &FitOptions,
) -> Result<Vec<WindowFit>, ConfigError> {
    cfg.validate()?;
    let (Some(first), Some(last)) = (data.first_date(), data.last_date()) else {
        return Ok(Vec::new());
    };

    let bounds = window_bounds(first, last, cfg);
    tracing::debug!(windows = bounds.len(), window_days = cfg.window_days, "sweeping");

    let fits = bounds
        .par_iter()
        .map(|&(start, end)| {
            let window = data.window(start, end);
            let (fit, error) = match fit_metcalfe(&window, opts) {
                Ok(fit) => (Some(fit), None),
                Err(e) => (None, Some(e.to_string())),
            };
            WindowFit {
                start,
                end,
                rows: window.len(),
                fit,
                error,
            }
        })
        .collect();
    Ok(fits)
}
