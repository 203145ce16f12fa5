//! Configuration fingerprinting.
//!
//! A `ConfigFingerprint` is the BLAKE3 hash of the canonical JSON of a
//! `BarrierConfig`. Label manifests and signal files both carry it, so a
//! signal run can prove it used the settings that produced the training labels.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config::BarrierConfig;

/// Hex-encoded BLAKE3 hash of a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConfigFingerprint(pub String);

impl ConfigFingerprint {
    pub fn of(config: &BarrierConfig) -> Self {
        // Struct fields serialize in declaration order, so the JSON is canonical.
        let canonical =
            serde_json::to_string(config).unwrap_or_else(|_| format!("{config:?}"));
        Self(blake3::hash(canonical.as_bytes()).to_hex().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First 12 hex characters, for log lines.
    pub fn short(&self) -> &str {
        &self.0[..self.0.len().min(12)]
    }
}

impl fmt::Display for ConfigFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
