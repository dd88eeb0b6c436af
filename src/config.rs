//! Merge Configuration
//!
//! Tunables for a merge job. Loaded from a JSON file (written with defaults
//! when missing) or from `GRIDMERGE_*` environment variables.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tokio::fs;

/// Relative tolerance used when deciding whether a rupture was seen under the
/// whole ensemble weight. Matches a single-precision equality test.
pub const DEFAULT_WEIGHT_TOLERANCE: f64 = f32::EPSILON as f64;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MergeConfig {
    /// Relative tolerance for the constant-value shortcut
    pub weight_tolerance: f64,
    /// Check placement, rates and geometry of every record while accumulating.
    /// Section associations are checked regardless.
    pub validate_records: bool,
    /// Number of contiguous location ranges merged in parallel (1 = sequential)
    pub shards: usize,
    /// Log progress at info level every N realizations (0 = never)
    pub progress_every: usize,
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            weight_tolerance: DEFAULT_WEIGHT_TOLERANCE,
            validate_records: true,
            shards: 1,
            progress_every: 0,
        }
    }
}

impl MergeConfig {
    /// Defaults overridden by `GRIDMERGE_WEIGHT_TOLERANCE`,
    /// `GRIDMERGE_VALIDATE_RECORDS`, `GRIDMERGE_SHARDS` and
    /// `GRIDMERGE_PROGRESS_EVERY`. A `.env` file is honored.
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Defaults overridden by whatever `lookup` returns for each
    /// `GRIDMERGE_*` name.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();
        if let Some(value) = lookup("GRIDMERGE_WEIGHT_TOLERANCE") {
            config.weight_tolerance = value
                .trim()
                .parse()
                .with_context(|| format!("GRIDMERGE_WEIGHT_TOLERANCE is not a number: {}", value))?;
        }
        if let Some(value) = lookup("GRIDMERGE_VALIDATE_RECORDS") {
            config.validate_records = value
                .trim()
                .parse()
                .with_context(|| format!("GRIDMERGE_VALIDATE_RECORDS is not true/false: {}", value))?;
        }
        if let Some(value) = lookup("GRIDMERGE_SHARDS") {
            config.shards = value
                .trim()
                .parse()
                .with_context(|| format!("GRIDMERGE_SHARDS is not a count: {}", value))?;
        }
        if let Some(value) = lookup("GRIDMERGE_PROGRESS_EVERY") {
            config.progress_every = value
                .trim()
                .parse()
                .with_context(|| format!("GRIDMERGE_PROGRESS_EVERY is not a count: {}", value))?;
        }
        config.validate()?;
        Ok(config)
    }

    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            let default = Self::default();
            default.save(path).await?;
            return Ok(default);
        }
        let content = fs::read_to_string(path)
            .await
            .with_context(|| format!("reading merge config {}", path.display()))?;
        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("parsing merge config {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    pub async fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path.as_ref(), content).await?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if !self.weight_tolerance.is_finite() || self.weight_tolerance < 0.0 {
            bail!("weight_tolerance must be finite and non-negative, got {}", self.weight_tolerance);
        }
        if self.shards == 0 {
            bail!("shards must be at least 1");
        }
        Ok(())
    }
}
