//! Metcalfe Runner: run orchestration, summaries, sweeps, artifacts.
//!
//! This crate builds on `metcalfe-core` to provide:
//! - TOML run configuration
//! - Input loading from local or remote CSV sources
//! - Single-run pipeline (align, fit, score) with domain policy handling
//! - Overvaluation summary and episode detection
//! - Rolling-window exponent sweeps
//! - JSON / CSV / Parquet / Markdown export

pub mod config;
pub mod export;
pub mod loader;
pub mod pipeline;
pub mod summary;
pub mod sweep;

pub use config::{
    ConfigError, InputSpec, InputsConfig, ModelSection, ReportConfig, RunConfig, SweepConfig,
    MAX_SWEEP_DAYS,
};
pub use export::{
    export_json, export_series_csv, export_sweep_csv, import_json, load_manifest,
    render_markdown_report, save_artifacts, write_series_parquet, ArtifactPaths, RunManifest,
    SCHEMA_VERSION,
};
pub use loader::{load_inputs, LoadError, LoadedInputs};
pub use pipeline::{apply_domain_policy, run_model, InputLengths, ModelRun};
pub use summary::{Episode, OvervaluationSummary};
pub use sweep::{sweep_windows, window_bounds, WindowFit};
