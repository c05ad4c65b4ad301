//! Metcalfe CLI: run, fit, sweep, and download commands.
//!
//! Commands:
//! - `run`: full pipeline from a TOML config, prints a summary, saves artifacts
//! - `fit`: quick fit on three local CSVs, prints the fitted law
//! - `sweep`: rolling-window refits from a TOML config
//! - `download`: fetch one series over HTTP and store it as `date,value` CSV

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use metcalfe_core::data::{write_series_csv, CsvSeriesReader, HttpCsvSource, SeriesSource};
use metcalfe_core::model::{DomainPolicy, FitOptions, FitResult, LogBase};
use metcalfe_core::{AlignOptions, ModelOptions};
use metcalfe_runner::{
    load_inputs, run_model, save_artifacts, sweep_windows, ModelRun, OvervaluationSummary,
    RunConfig, RunManifest, SweepConfig, WindowFit,
};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "metcalfe",
    about = "Metcalfe's Law valuation model: fit network value and score overvaluation"
)]
struct Cli {
    /// Verbose logging (debug level unless RUST_LOG is set).
    #[arg(short, long, global = true, default_value_t = false)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full pipeline from a TOML config file and save artifacts.
    Run {
        /// Path to a TOML config file.
        #[arg(long)]
        config: PathBuf,

        /// Override the config's output directory.
        #[arg(long)]
        output_dir: Option<PathBuf>,
    },
    /// Fit the model on three local CSV files and print the result.
    Fit {
        /// Price CSV.
        #[arg(long)]
        price: PathBuf,

        /// Active-address CSV.
        #[arg(long)]
        addresses: PathBuf,

        /// Circulating-supply CSV.
        #[arg(long)]
        supply: PathBuf,

        /// Date column name, shared by all three files.
        #[arg(long, default_value = "date")]
        date_column: String,

        #[arg(long, default_value = "price")]
        price_column: String,

        #[arg(long, default_value = "active_addresses")]
        addresses_column: String,

        #[arg(long, default_value = "supply")]
        supply_column: String,

        /// Logarithm base: natural or base10.
        #[arg(long, default_value = "natural")]
        log_base: LogBase,

        /// Non-positive value handling: exclude or fail.
        #[arg(long, default_value = "exclude")]
        domain_policy: DomainPolicy,

        /// Start date (YYYY-MM-DD).
        #[arg(long)]
        start: Option<String>,

        /// End date (YYYY-MM-DD).
        #[arg(long)]
        end: Option<String>,
    },
    /// Refit over rolling windows and print how the exponent drifts.
    Sweep {
        /// Path to a TOML config file.
        #[arg(long)]
        config: PathBuf,

        /// Window length in days. Overrides `[sweep]` in the config.
        #[arg(long)]
        window_days: Option<u32>,

        /// Step between window starts in days. Overrides `[sweep]` in the config.
        #[arg(long)]
        step_days: Option<u32>,
    },
    /// Download one series over HTTP and store it as `date,value` CSV.
    Download {
        #[arg(long)]
        url: String,

        /// Output CSV path.
        #[arg(long)]
        out: PathBuf,

        #[arg(long, default_value = "date")]
        date_column: String,

        #[arg(long)]
        value_column: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Run { config, output_dir } => run_cmd(&config, output_dir),
        Commands::Fit {
            price,
            addresses,
            supply,
            date_column,
            price_column,
            addresses_column,
            supply_column,
            log_base,
            domain_policy,
            start,
            end,
        } => {
            let reader = |col: &str| CsvSeriesReader::new(&date_column, col);
            let options = ModelOptions {
                align: AlignOptions {
                    start: parse_opt_date(start.as_deref())?,
                    end: parse_opt_date(end.as_deref())?,
                },
                fit: FitOptions {
                    log_base,
                    domain_policy,
                },
            };
            let p = reader(&price_column).read_path("price", &price)?;
            let a = reader(&addresses_column).read_path("addresses", &addresses)?;
            let s = reader(&supply_column).read_path("supply", &supply)?;
            let run = run_model(&p, &a, &s, &options)?;
            print_fit(&run.fit);
            if let Some(latest) = run.series.latest() {
                println!(
                    "Latest ({}):  actual {:.3e}  predicted {:.3e}  ratio {:.3}",
                    latest.date, latest.actual_cap, latest.predicted_cap, latest.ratio
                );
            }
            Ok(())
        }
        Commands::Sweep {
            config,
            window_days,
            step_days,
        } => sweep_cmd(&config, window_days, step_days),
        Commands::Download {
            url,
            out,
            date_column,
            value_column,
        } => download_cmd(url, &out, &date_column, &value_column),
    }
}

/// Compact stderr logging. `RUST_LOG` wins over `--verbose`.
fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();
}

fn parse_opt_date(s: Option<&str>) -> Result<Option<NaiveDate>> {
    s.map(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d"))
        .transpose()
        .context("dates must be YYYY-MM-DD")
}

fn config_dir(path: &Path) -> &Path {
    path.parent().unwrap_or_else(|| Path::new("."))
}

fn load_and_run(config: &RunConfig, config_path: &Path) -> Result<ModelRun> {
    let inputs = load_inputs(&config.inputs, config_dir(config_path))?;
    let run = run_model(
        &inputs.price,
        &inputs.addresses,
        &inputs.supply,
        &config.model.options(),
    )?;
    Ok(run)
}

fn run_cmd(config_path: &Path, output_dir: Option<PathBuf>) -> Result<()> {
    let mut config = RunConfig::from_file(config_path)?;
    if let Some(dir) = output_dir {
        config.report.output_dir = dir;
    }

    tracing::info!(config = %config_path.display(), "starting run");
    let run = load_and_run(&config, config_path)?;
    let Some(summary) = OvervaluationSummary::compute(&run.series, config.report.episode_threshold)
    else {
        bail!("no rows were scored");
    };
    let sweep = config
        .sweep
        .as_ref()
        .map(|s| sweep_windows(&run.dataset, s, &run.options.fit))
        .transpose()?;

    print_summary(&run, &summary);
    if let Some(windows) = &sweep {
        print_sweep(windows);
    }

    let manifest = RunManifest::new(&run, summary, sweep);
    let paths = save_artifacts(&run, &manifest, &config.report)?;
    tracing::info!(run_id = %run.run_id, dir = %paths.run_dir.display(), "run complete");
    println!("Artifacts saved to: {}", paths.run_dir.display());
    Ok(())
}

fn sweep_cmd(config_path: &Path, window_days: Option<u32>, step_days: Option<u32>) -> Result<()> {
    let config = RunConfig::from_file(config_path)?;
    let base = config.sweep;
    let sweep = SweepConfig {
        window_days: match (window_days, base) {
            (Some(w), _) => w,
            (None, Some(b)) => b.window_days,
            (None, None) => bail!("--window-days is required when the config has no [sweep]"),
        },
        step_days: step_days
            .or(base.map(|b| b.step_days))
            .unwrap_or(30),
    };

    let run = load_and_run(&config, config_path)?;
    let windows = sweep_windows(&run.dataset, &sweep, &run.options.fit)?;
    if windows.is_empty() {
        tracing::warn!(
            rows = run.dataset.len(),
            window_days = sweep.window_days,
            "no full sweep window in data range"
        );
        println!(
            "Data spans fewer than {} days; no full windows.",
            sweep.window_days
        );
        return Ok(());
    }
    print_fit(&run.fit);
    print_sweep(&windows);
    Ok(())
}

fn download_cmd(url: String, out: &Path, date_column: &str, value_column: &str) -> Result<()> {
    let name = out
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "series".to_string());
    let source = HttpCsvSource::new(name, url, CsvSeriesReader::new(date_column, value_column))?;
    let series = source.fetch()?;
    if let Some(parent) = out.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    write_series_csv(out, &series)?;
    tracing::info!(source = %source.url(), rows = series.len(), out = %out.display(), "series saved");
    println!(
        "Saved {} rows ({} to {}) to {}",
        series.len(),
        series.first_date().map(|d| d.to_string()).unwrap_or_default(),
        series.last_date().map(|d| d.to_string()).unwrap_or_default(),
        out.display()
    );
    Ok(())
}

fn print_fit(fit: &FitResult) {
    println!("=== Metcalfe Fit ===");
    println!(
        "Exponent k:      {:.4} ± {:.4}",
        fit.exponent, fit.exponent_std_error
    );
    println!("Scale C:         {:.6e}", fit.scale);
    println!("R²:              {:.4}", fit.r_squared);
    println!("Residual SE:     {:.4}", fit.residual_std_error);
    println!("Points:          {} ({} excluded)", fit.n_points, fit.excluded);
    println!();
}

fn print_summary(run: &ModelRun, s: &OvervaluationSummary) {
    print_fit(&run.fit);
    println!("=== Overvaluation ===");
    println!("Run ID:          {}", run.run_id);
    println!("Period:          {} to {}", s.first_date, s.last_date);
    println!("Latest ratio:    {:.3}", s.latest_ratio);
    println!("Max ratio:       {:.3} ({})", s.max_ratio, s.max_ratio_date);
    println!("Min ratio:       {:.3} ({})", s.min_ratio, s.min_ratio_date);
    println!("Days overvalued: {:.1}%", s.fraction_overvalued * 100.0);
    println!(
        "Episodes ≥ {:.2}: {}",
        s.episode_threshold,
        s.episodes.len()
    );
    for ep in &s.episodes {
        println!(
            "  {} to {}  ({} days, peak {:.3} on {})",
            ep.start, ep.end, ep.points, ep.peak_ratio, ep.peak_date
        );
    }
    println!();
}

fn print_sweep(windows: &[WindowFit]) {
    println!("=== Rolling Exponent ===");
    println!("{:<24} {:>6} {:>9} {:>8}", "Window", "Rows", "k", "R²");
    println!("{}", "-".repeat(50));
    for w in windows {
        let range = format!("{} to {}", w.start, w.end);
        match &w.fit {
            Some(f) => println!(
                "{:<24} {:>6} {:>9.4} {:>8.4}",
                range, w.rows, f.exponent, f.r_squared
            ),
            None => println!(
                "{:<24} {:>6}  {}",
                range,
                w.rows,
                w.error.as_deref().unwrap_or("failed")
            ),
        }
    }
    println!();
}
