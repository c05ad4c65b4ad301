//! Fit configuration: logarithm base and non-positive value policy.

use serde::{Deserialize, Serialize};

/// Logarithm base used throughout a run.
///
/// The exponent `k` is identical under either base; the intercept and the
/// reported log ratio are not, so one base is carried from fit to scoring.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogBase {
    #[default]
    Natural,
    Base10,
}

impl LogBase {
    pub fn log(self, x: f64) -> f64 {
        match self {
            LogBase::Natural => x.ln(),
            LogBase::Base10 => x.log10(),
        }
    }

    /// Inverse of [`LogBase::log`].
    pub fn exp(self, x: f64) -> f64 {
        match self {
            LogBase::Natural => x.exp(),
            LogBase::Base10 => 10f64.powf(x),
        }
    }
}

impl std::str::FromStr for LogBase {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "natural" | "ln" | "e" => Ok(LogBase::Natural),
            "base10" | "log10" | "10" => Ok(LogBase::Base10),
            other => Err(format!("unknown log base '{other}' (expected natural or base10)")),
        }
    }
}

/// What to do with rows whose addresses or market cap are not strictly positive.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DomainPolicy {
    /// Drop the row from the fit and count it.
    #[default]
    Exclude,
    /// Abort with `InvalidDomain` on the first offending row.
    Fail,
}

impl std::str::FromStr for DomainPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "exclude" => Ok(DomainPolicy::Exclude),
            "fail" => Ok(DomainPolicy::Fail),
            other => Err(format!("unknown domain policy '{other}' (expected exclude or fail)")),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FitOptions {
    #[serde(default)]
    pub log_base: LogBase,
    #[serde(default)]
    pub domain_policy: DomainPolicy,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_and_exp_are_inverse() {
        for base in [LogBase::Natural, LogBase::Base10] {
            let x = 12345.678;
            assert!((base.exp(base.log(x)) - x).abs() / x < 1e-12);
        }
    }

    #[test]
    fn parse_names() {
        assert_eq!("ln".parse::<LogBase>().unwrap(), LogBase::Natural);
        assert_eq!("Base10".parse::<LogBase>().unwrap(), LogBase::Base10);
        assert_eq!("fail".parse::<DomainPolicy>().unwrap(), DomainPolicy::Fail);
        assert!("log2".parse::<LogBase>().is_err());
    }
}
