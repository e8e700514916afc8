//! Scaling run configuration.
//!
//! Can be written as TOML or YAML; every field has a default so an empty
//! file is a valid configuration.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{PolyrankError, Result};

/// How the cohort index treats two results for the same student and subject.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicatePolicy {
    /// Fail with `PolyrankError::DuplicateResult`.
    #[default]
    Reject,
    /// Keep the last row seen for the pair.
    LastWins,
}

impl std::str::FromStr for DuplicatePolicy {
    type Err = PolyrankError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().replace('-', "_").as_str() {
            "reject" => Ok(Self::Reject),
            "last_wins" => Ok(Self::LastWins),
            other => Err(PolyrankError::Config(format!(
                "unknown duplicate policy '{other}' (expected 'reject' or 'last_wins')"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScalingConfig {
    /// Iteration cap.
    #[serde(default = "default_iterations")]
    pub iterations: usize,

    /// Early-stop threshold in student positions; 0 disables early stopping.
    #[serde(default)]
    pub swing: f64,

    #[serde(default)]
    pub duplicate_policy: DuplicatePolicy,

    /// Polyrank targets are clamped to [eps, 1 - eps] before the logit.
    #[serde(default = "default_clamp_eps")]
    pub clamp_eps: f64,

    /// Fit subjects on the rayon pool (needs the `parallel` feature).
    #[serde(default)]
    pub parallel: bool,
}

fn default_iterations() -> usize { 100 }
fn default_clamp_eps()  -> f64   { 1e-6 }

impl Default for ScalingConfig {
    fn default() -> Self {
        Self {
            iterations: default_iterations(),
            swing: 0.0,
            duplicate_policy: DuplicatePolicy::default(),
            clamp_eps: default_clamp_eps(),
            parallel: false,
        }
    }
}

impl ScalingConfig {
    pub fn validate(&self) -> Result<()> {
        if !self.swing.is_finite() || self.swing < 0.0 {
            return Err(PolyrankError::Config(format!(
                "swing must be a finite, non-negative number of positions (got {})",
                self.swing
            )));
        }
        if !(self.clamp_eps > 0.0 && self.clamp_eps < 0.5) {
            return Err(PolyrankError::Config(format!(
                "clamp_eps must lie in (0, 0.5) (got {})",
                self.clamp_eps
            )));
        }
        Ok(())
    }

    /// Whether the swing threshold is active.
    pub fn early_stopping(&self) -> bool {
        self.swing > 0.0
    }

    /// Load from a TOML file.
    pub fn from_toml(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let config: Self = toml::from_str(&content)
            .map_err(|e| PolyrankError::Config(format!("{}: {e}", path.as_ref().display())))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a YAML file.
    pub fn from_yaml(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let config: Self = serde_yaml::from_str(&content)
            .map_err(|e| PolyrankError::Config(format!("{}: {e}", path.as_ref().display())))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from TOML or YAML, chosen by file extension (TOML otherwise).
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        match path.extension().and_then(|e| e.to_str()) {
            Some("yaml") | Some("yml") => Self::from_yaml(path),
            _ => Self::from_toml(path),
        }
    }
}
