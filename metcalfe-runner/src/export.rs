//! Reporting and export: JSON, CSV, Parquet, and Markdown artifacts.
//!
//! Provides the export formats for a model run:
//! - **JSON**: run manifest (options, fit, summary, sweep) with schema versioning
//! - **CSV**: overvaluation series and sweep table for plotting tools
//! - **Parquet**: overvaluation series for dataframe tooling
//! - **Markdown**: human-readable single-run report
//!
//! Manifests carry no wall-clock timestamp, so re-running on identical input
//! reproduces every artifact byte for byte.

use std::fs::File;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use metcalfe_core::model::{FitResult, LogBase, OvervaluationSeries};
use metcalfe_core::ModelOptions;
use polars::prelude::{Column, DataFrame, NamedFrom, ParquetWriter, Series};
use serde::{Deserialize, Serialize};

use crate::config::ReportConfig;
use crate::pipeline::{InputLengths, ModelRun};
use crate::summary::OvervaluationSummary;
use crate::sweep::WindowFit;

pub const SCHEMA_VERSION: u32 = 1;

/// Persisted description of one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunManifest {
    pub schema_version: u32,
    pub run_id: String,
    pub config_id: String,
    pub dataset_hash: String,
    pub options: ModelOptions,
    pub inputs: InputLengths,
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    pub excluded_dates: Vec<NaiveDate>,
    pub fit: FitResult,
    pub summary: OvervaluationSummary,
    #[serde(default)]
    pub sweep: Option<Vec<WindowFit>>,
}

impl RunManifest {
    pub fn new(run: &ModelRun, summary: OvervaluationSummary, sweep: Option<Vec<WindowFit>>) -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            run_id: run.run_id.hash(),
            config_id: run.run_id.config_id.to_string(),
            dataset_hash: run.run_id.dataset_hash.to_string(),
            options: run.options,
            inputs: run.inputs,
            period_start: summary.first_date,
            period_end: summary.last_date,
            excluded_dates: run.excluded_dates.clone(),
            fit: run.fit,
            summary,
            sweep,
        }
    }
}

// ─── JSON export ────────────────────────────────────────────────────

pub fn export_json(manifest: &RunManifest) -> Result<String> {
    serde_json::to_string_pretty(manifest).context("failed to serialize run manifest to JSON")
}

/// Deserialize a manifest, rejecting schema versions newer than this build.
pub fn import_json(json: &str) -> Result<RunManifest> {
    let manifest: RunManifest =
        serde_json::from_str(json).context("failed to deserialize run manifest from JSON")?;
    if manifest.schema_version > SCHEMA_VERSION {
        bail!(
            "unsupported schema version {} (max supported: {})",
            manifest.schema_version,
            SCHEMA_VERSION
        );
    }
    Ok(manifest)
}

// ─── CSV export ─────────────────────────────────────────────────────

/// Columns: date, actual_cap, predicted_cap, ratio, log_ratio
pub fn export_series_csv(series: &OvervaluationSeries) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(["date", "actual_cap", "predicted_cap", "ratio", "log_ratio"])?;
    for p in series.points() {
        wtr.write_record([
            p.date.to_string(),
            format!("{:.2}", p.actual_cap),
            format!("{:.2}", p.predicted_cap),
            format!("{:.6}", p.ratio),
            format!("{:.6}", p.log_ratio),
        ])?;
    }
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

/// Columns: start, end, rows, exponent, scale, r_squared, error
pub fn export_sweep_csv(windows: &[WindowFit]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(["start", "end", "rows", "exponent", "scale", "r_squared", "error"])?;
    for w in windows {
        let (k, c, r2) = match &w.fit {
            Some(f) => (
                format!("{:.6}", f.exponent),
                format!("{:.6e}", f.scale),
                format!("{:.6}", f.r_squared),
            ),
            None => Default::default(),
        };
        wtr.write_record([
            w.start.to_string(),
            w.end.to_string(),
            w.rows.to_string(),
            k,
            c,
            r2,
            w.error.clone().unwrap_or_default(),
        ])?;
    }
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

// ─── Parquet export ─────────────────────────────────────────────────

pub fn write_series_parquet(path: &Path, series: &OvervaluationSeries) -> Result<()> {
    let pts = series.points();
    let dates: Vec<String> = pts.iter().map(|p| p.date.to_string()).collect();
    let actual: Vec<f64> = pts.iter().map(|p| p.actual_cap).collect();
    let predicted: Vec<f64> = pts.iter().map(|p| p.predicted_cap).collect();
    let ratio: Vec<f64> = pts.iter().map(|p| p.ratio).collect();
    let log_ratio: Vec<f64> = pts.iter().map(|p| p.log_ratio).collect();

    let columns: Vec<Column> = vec![
        Series::new("date".into(), dates).into(),
        Series::new("actual_cap".into(), actual).into(),
        Series::new("predicted_cap".into(), predicted).into(),
        Series::new("ratio".into(), ratio).into(),
        Series::new("log_ratio".into(), log_ratio).into(),
    ];
    let mut df = DataFrame::new(columns).context("failed to build overvaluation dataframe")?;

    let mut file = File::create(path)
        .with_context(|| format!("failed to create parquet {}", path.display()))?;
    ParquetWriter::new(&mut file)
        .finish(&mut df)
        .context("failed to write overvaluation parquet")?;
    Ok(())
}

// ─── Markdown report ────────────────────────────────────────────────

pub fn render_markdown_report(manifest: &RunManifest) -> String {
    let fit = &manifest.fit;
    let s = &manifest.summary;
    let log_name = match fit.log_base {
        LogBase::Natural => "ln",
        LogBase::Base10 => "log10",
    };

    let mut md = String::with_capacity(2048);
    md.push_str("# Metcalfe Overvaluation Report\n\n");

    md.push_str("## Metadata\n\n");
    md.push_str("| Field | Value |\n");
    md.push_str("| --- | --- |\n");
    md.push_str(&format!("| Run ID | `{}` |\n", manifest.run_id));
    md.push_str(&format!(
        "| Period | {} to {} |\n",
        manifest.period_start, manifest.period_end
    ));
    md.push_str(&format!(
        "| Input rows | price {}, addresses {}, supply {} |\n",
        manifest.inputs.price, manifest.inputs.addresses, manifest.inputs.supply
    ));
    md.push_str(&format!("| Scored rows | {} |\n", s.points));
    md.push_str(&format!(
        "| Excluded rows | {} |\n",
        manifest.excluded_dates.len()
    ));
    md.push_str(&format!("| Dataset Hash | {} |\n", manifest.dataset_hash));
    md.push('\n');

    md.push_str("## Fit\n\n");
    md.push_str(&format!(
        "`{log_name}(market_cap) = {:.4} + {:.4} * {log_name}(addresses)`\n\n",
        fit.intercept, fit.exponent
    ));
    md.push_str("| Statistic | Value |\n");
    md.push_str("| --- | --- |\n");
    md.push_str(&format!(
        "| Exponent k | {:.4} ± {:.4} |\n",
        fit.exponent, fit.exponent_std_error
    ));
    md.push_str(&format!("| Scale C | {:.6e} |\n", fit.scale));
    md.push_str(&format!("| R² | {:.4} |\n", fit.r_squared));
    md.push_str(&format!(
        "| Residual std. error | {:.4} |\n",
        fit.residual_std_error
    ));
    md.push_str(&format!("| Points | {} |\n", fit.n_points));
    md.push('\n');

    md.push_str("## Overvaluation\n\n");
    md.push_str("| Statistic | Value |\n");
    md.push_str("| --- | --- |\n");
    md.push_str(&format!(
        "| Latest ratio ({}) | {:.3} |\n",
        s.last_date, s.latest_ratio
    ));
    md.push_str(&format!(
        "| Max ratio | {:.3} on {} |\n",
        s.max_ratio, s.max_ratio_date
    ));
    md.push_str(&format!(
        "| Min ratio | {:.3} on {} |\n",
        s.min_ratio, s.min_ratio_date
    ));
    md.push_str(&format!("| Mean log ratio | {:.4} |\n", s.mean_log_ratio));
    md.push_str(&format!(
        "| Days overvalued | {:.1}% |\n",
        s.fraction_overvalued * 100.0
    ));
    md.push('\n');

    md.push_str(&format!(
        "## Episodes (ratio ≥ {:.2})\n\n",
        s.episode_threshold
    ));
    if s.episodes.is_empty() {
        md.push_str("None.\n");
    } else {
        md.push_str("| Start | End | Days | Peak | Peak Date |\n");
        md.push_str("| --- | --- | --- | --- | --- |\n");
        for ep in &s.episodes {
            md.push_str(&format!(
                "| {} | {} | {} | {:.3} | {} |\n",
                ep.start, ep.end, ep.points, ep.peak_ratio, ep.peak_date
            ));
        }
    }

    if let Some(sweep) = &manifest.sweep {
        md.push_str("\n## Rolling Exponent\n\n");
        md.push_str("| Window | Rows | k | R² |\n");
        md.push_str("| --- | --- | --- | --- |\n");
        for w in sweep {
            match &w.fit {
                Some(f) => md.push_str(&format!(
                    "| {} to {} | {} | {:.4} | {:.4} |\n",
                    w.start, w.end, w.rows, f.exponent, f.r_squared
                )),
                None => md.push_str(&format!(
                    "| {} to {} | {} | — | — |\n",
                    w.start, w.end, w.rows
                )),
            }
        }
    }

    md
}

// ─── Artifact bundle ────────────────────────────────────────────────

/// Paths written by [`save_artifacts`].
#[derive(Debug, Clone)]
pub struct ArtifactPaths {
    pub run_dir: PathBuf,
    pub manifest: PathBuf,
    pub series_csv: PathBuf,
    pub series_parquet: Option<PathBuf>,
    pub report_markdown: Option<PathBuf>,
    pub sweep_csv: Option<PathBuf>,
}

/// Save the artifact set for a run under `report.output_dir/run_<id>/`:
/// - `manifest.json`: options, fit, summary, sweep
/// - `overvaluation.csv`: the scored series
/// - `overvaluation.parquet`: same, when enabled
/// - `report.md`: when enabled
/// - `sweep.csv`: when a sweep was run
pub fn save_artifacts(
    run: &ModelRun,
    manifest: &RunManifest,
    report: &ReportConfig,
) -> Result<ArtifactPaths> {
    let run_dir = report
        .output_dir
        .join(format!("run_{}", run.run_id.short()));
    std::fs::create_dir_all(&run_dir)
        .with_context(|| format!("failed to create artifact dir: {}", run_dir.display()))?;

    let manifest_path = run_dir.join("manifest.json");
    std::fs::write(&manifest_path, export_json(manifest)?)
        .with_context(|| format!("failed to write {}", manifest_path.display()))?;

    let series_csv = run_dir.join("overvaluation.csv");
    std::fs::write(&series_csv, export_series_csv(&run.series)?)
        .with_context(|| format!("failed to write {}", series_csv.display()))?;

    let series_parquet = if report.parquet {
        let path = run_dir.join("overvaluation.parquet");
        write_series_parquet(&path, &run.series)?;
        Some(path)
    } else {
        None
    };

    let report_markdown = if report.markdown {
        let path = run_dir.join("report.md");
        std::fs::write(&path, render_markdown_report(manifest))
            .with_context(|| format!("failed to write {}", path.display()))?;
        Some(path)
    } else {
        None
    };

    let sweep_csv = match &manifest.sweep {
        Some(windows) => {
            let path = run_dir.join("sweep.csv");
            std::fs::write(&path, export_sweep_csv(windows)?)
                .with_context(|| format!("failed to write {}", path.display()))?;
            Some(path)
        }
        None => None,
    };

    tracing::info!(dir = %run_dir.display(), "artifacts saved");

    Ok(ArtifactPaths {
        run_dir,
        manifest: manifest_path,
        series_csv,
        series_parquet,
        report_markdown,
        sweep_csv,
    })
}

/// Load a manifest from an artifact directory. Rejects unknown schema versions.
pub fn load_manifest(dir: &Path) -> Result<RunManifest> {
    let manifest_path = dir.join("manifest.json");
    let json = std::fs::read_to_string(&manifest_path)
        .with_context(|| format!("failed to read {}", manifest_path.display()))?;
    import_json(&json)
}
