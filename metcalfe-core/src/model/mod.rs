//! Metcalfe model: fit and overvaluation scoring.

pub mod fit;
pub mod options;
pub mod score;

pub use fit::{domain_violation, fit_metcalfe, FitResult, MIN_FIT_POINTS};
pub use options::{DomainPolicy, FitOptions, LogBase};
pub use score::{score_overvaluation, OvervaluationPoint, OvervaluationSeries};
