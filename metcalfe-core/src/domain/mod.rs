//! Domain types for the Metcalfe overvaluation pipeline

pub mod dataset;
pub mod series;

pub use dataset::{AlignedDataset, AlignedRow};
pub use series::{SeriesPoint, TimeSeries};
