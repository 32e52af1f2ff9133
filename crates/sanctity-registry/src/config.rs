//! Registry configuration, loaded from TOML.
//!
//! ```toml
//! lock-shards = 32
//! default-entropy-threshold = 7.2
//! max-proof-bytes = 1048576
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{RegistryError, Result};

/// Tunables for a [`crate::Registry`]. Every field has a default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default, rename_all = "kebab-case")]
pub struct RegistryConfig {
    /// Number of independently locked partitions of the record table.
    pub lock_shards: usize,
    /// Entropy threshold in bits per byte used by `check_entropy_default`.
    pub default_entropy_threshold: f64,
    /// Proofs longer than this are rejected before reaching the verifier.
    pub max_proof_bytes: usize,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        RegistryConfig {
            lock_shards: 16,
            default_entropy_threshold: 7.2,
            max_proof_bytes: 1024 * 1024,
        }
    }
}

impl RegistryConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: RegistryConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Reject values the registry cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.lock_shards == 0 {
            return Err(RegistryError::Config {
                detail: "lock-shards must be at least 1".to_string(),
            });
        }
        if !self.default_entropy_threshold.is_finite() || self.default_entropy_threshold < 0.0 {
            return Err(RegistryError::Config {
                detail: format!(
                    "default-entropy-threshold must be finite and non-negative, got {}",
                    self.default_entropy_threshold
                ),
            });
        }
        if self.max_proof_bytes == 0 {
            return Err(RegistryError::Config {
                detail: "max-proof-bytes must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}
