//! Run fingerprinting: deterministic identity of a dataset and its model options.
//!
//! Two runs with the same aligned rows and options get the same [`RunId`], which
//! names the artifact directory and lets repeated runs be recognised as identical.

use crate::align::AlignOptions;
use crate::domain::AlignedDataset;
use crate::model::FitOptions;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Hex-encoded BLAKE3 digest.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Digest(String);

impl Digest {
    fn of(hasher: &blake3::Hasher) -> Self {
        Self(hasher.finalize().to_hex().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identity of one run: what was asked (options) and what it ran on (data).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunId {
    pub config_id: Digest,
    pub dataset_hash: Digest,
}

impl RunId {
    /// Combined digest of both components.
    pub fn hash(&self) -> String {
        let mut hasher = blake3::Hasher::new();
        hasher.update(self.config_id.as_str().as_bytes());
        hasher.update(b":");
        hasher.update(self.dataset_hash.as_str().as_bytes());
        Digest::of(&hasher).0
    }

    /// First 12 hex chars of [`RunId::hash`], used for directory names.
    pub fn short(&self) -> String {
        let mut h = self.hash();
        h.truncate(12);
        h
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.short())
    }
}

/// Everything besides the data that determines a run's output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelOptions {
    #[serde(default)]
    pub align: AlignOptions,
    #[serde(default)]
    pub fit: FitOptions,
}

impl ModelOptions {
    /// Hash of the canonical JSON form (field order is fixed by the struct).
    pub fn config_id(&self) -> Digest {
        let json = serde_json::to_string(self).unwrap_or_default();
        let mut hasher = blake3::Hasher::new();
        hasher.update(json.as_bytes());
        Digest::of(&hasher)
    }
}

/// Content hash of aligned rows: date as days-from-CE plus the exact f64 bits.
pub fn dataset_hash(data: &AlignedDataset) -> Digest {
    use chrono::Datelike;

    let mut hasher = blake3::Hasher::new();
    for row in data.rows() {
        hasher.update(&row.date.num_days_from_ce().to_le_bytes());
        for v in [row.price, row.addresses, row.supply] {
            hasher.update(&v.to_bits().to_le_bytes());
        }
    }
    Digest::of(&hasher)
}

pub fn run_id(data: &AlignedDataset, opts: &ModelOptions) -> RunId {
    RunId {
        config_id: opts.config_id(),
        dataset_hash: dataset_hash(data),
    }
}
