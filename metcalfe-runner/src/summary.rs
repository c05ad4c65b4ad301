//! Overvaluation summary statistics: pure functions over a scored series.
//!
//! Every statistic is a pure function: overvaluation points in, scalar or
//! episode list out. No dependencies on config, export, or I/O.

use chrono::NaiveDate;
use metcalfe_core::model::{OvervaluationPoint, OvervaluationSeries};
use serde::{Deserialize, Serialize};

/// A maximal run of consecutive scored points with `ratio >= threshold`.
///
/// "Consecutive" is in series order: a day missing from the aligned data
/// does not break an episode.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Episode {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub points: usize,
    pub peak_date: NaiveDate,
    pub peak_ratio: f64,
}

/// Aggregate view of one run's overvaluation series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OvervaluationSummary {
    pub points: usize,
    pub first_date: NaiveDate,
    pub last_date: NaiveDate,
    pub latest_ratio: f64,
    pub max_ratio: f64,
    pub max_ratio_date: NaiveDate,
    pub min_ratio: f64,
    pub min_ratio_date: NaiveDate,
    pub mean_log_ratio: f64,
    /// Share of points with ratio > 1.
    pub fraction_overvalued: f64,
    pub episode_threshold: f64,
    pub episodes: Vec<Episode>,
}

impl OvervaluationSummary {
    /// `None` for an empty series.
    pub fn compute(series: &OvervaluationSeries, episode_threshold: f64) -> Option<Self> {
        let pts = series.points();
        let first = pts.first()?;
        let last = pts.last()?;
        let max = extreme(pts, |a, b| a > b)?;
        let min = extreme(pts, |a, b| a < b)?;

        Some(Self {
            points: pts.len(),
            first_date: first.date,
            last_date: last.date,
            latest_ratio: last.ratio,
            max_ratio: max.ratio,
            max_ratio_date: max.date,
            min_ratio: min.ratio,
            min_ratio_date: min.date,
            mean_log_ratio: mean_log_ratio(pts),
            fraction_overvalued: fraction_above(pts, 1.0),
            episode_threshold,
            episodes: episodes(pts, episode_threshold),
        })
    }
}

// ─── Individual statistics ──────────────────────────────────────────

/// First point whose ratio beats every other under `better`.
fn extreme(
    pts: &[OvervaluationPoint],
    better: impl Fn(f64, f64) -> bool,
) -> Option<&OvervaluationPoint> {
    pts.iter()
        .fold(None, |best: Option<&OvervaluationPoint>, p| match best {
            Some(b) if !better(p.ratio, b.ratio) => Some(b),
            _ => Some(p),
        })
}

/// Mean of the log ratios. Returns 0.0 for an empty slice.
pub fn mean_log_ratio(pts: &[OvervaluationPoint]) -> f64 {
    if pts.is_empty() {
        return 0.0;
    }
    pts.iter().map(|p| p.log_ratio).sum::<f64>() / pts.len() as f64
}

/// Share of points with `ratio > level`. Returns 0.0 for an empty slice.
pub fn fraction_above(pts: &[OvervaluationPoint], level: f64) -> f64 {
    if pts.is_empty() {
        return 0.0;
    }
    pts.iter().filter(|p| p.ratio > level).count() as f64 / pts.len() as f64
}

/// Maximal runs of points with `ratio >= threshold`, in date order.
pub fn episodes(pts: &[OvervaluationPoint], threshold: f64) -> Vec<Episode> {
    let mut out = Vec::new();
    let mut current: Option<Episode> = None;

    for p in pts {
        if p.ratio >= threshold {
            match current.as_mut() {
                Some(ep) => {
                    ep.end = p.date;
                    ep.points += 1;
                    if p.ratio > ep.peak_ratio {
                        ep.peak_ratio = p.ratio;
                        ep.peak_date = p.date;
                    }
                }
                None => {
                    current = Some(Episode {
                        start: p.date,
                        end: p.date,
                        points: 1,
                        peak_date: p.date,
                        peak_ratio: p.ratio,
                    })
                }
            }
        } else if let Some(ep) = current.take() {
            out.push(ep);
        }
    }
    out.extend(current);
    out
}
