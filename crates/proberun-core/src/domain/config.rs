//! Run configuration and target identity.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{OrchestraError, Result};

/// Largest accepted probe timeout multiplier.
pub const MAX_TIMEOUT_MULTIPLIER: f64 = 1000.0;

/// System under test.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct TargetConfig {
    pub base_url: String,
    /// `development`, `staging` or `production`.
    pub environment: String,
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3000".to_string(),
            environment: "development".to_string(),
        }
    }
}

/// Options supplied by the caller for one run. Read-only while the run executes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct RunConfig {
    /// Names of the probes that run this invocation.
    pub enabled_probes: BTreeSet<String>,

    /// Maximum probes in flight at once (≥ 1).
    pub concurrency_limit: usize,

    /// Minimum passing overall score (0..100).
    pub overall_threshold: f64,

    /// Per-category floors (0..100).
    pub category_minimums: BTreeMap<String, f64>,

    /// Maximum tolerated critical issues.
    pub critical_issue_limit: usize,

    /// Pause between batches, for rate-limited targets.
    pub batch_delay_ms: Option<u64>,

    /// Probe timeout as a multiple of its expected latency.
    pub timeout_multiplier: f64,

    pub target: TargetConfig,

    /// Seed for probes that sample; `None` lets each probe pick its own.
    pub seed: Option<u64>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            enabled_probes: BTreeSet::new(),
            concurrency_limit: 2,
            overall_threshold: 85.0,
            category_minimums: BTreeMap::new(),
            critical_issue_limit: 0,
            batch_delay_ms: None,
            timeout_multiplier: 2.0,
            target: TargetConfig::default(),
            seed: None,
        }
    }
}

impl RunConfig {
    /// Config enabling exactly `probes`, other options at their defaults.
    pub fn with_probes<I, S>(probes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            enabled_probes: probes.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    pub fn with_category_minimum(mut self, category: impl Into<String>, minimum: f64) -> Self {
        self.category_minimums.insert(category.into(), minimum);
        self
    }

    pub fn batch_delay(&self) -> Option<Duration> {
        self.batch_delay_ms.map(Duration::from_millis)
    }

    /// Reject option values no run could honour.
    pub fn validate(&self) -> Result<()> {
        if self.concurrency_limit == 0 {
            return Err(OrchestraError::config(
                "concurrency limit must be at least 1",
            ));
        }
        check_score_range("overall threshold", self.overall_threshold)?;
        for (category, minimum) in &self.category_minimums {
            check_score_range(&format!("minimum for category '{category}'"), *minimum)?;
        }
        if !(self.timeout_multiplier > 0.0 && self.timeout_multiplier <= MAX_TIMEOUT_MULTIPLIER) {
            return Err(OrchestraError::config(format!(
                "timeout multiplier must be within (0, {MAX_TIMEOUT_MULTIPLIER}], got {}",
                self.timeout_multiplier
            )));
        }
        Ok(())
    }

    /// Deterministic SHA-256 over the options that decide a verdict.
    pub fn digest(&self) -> String {
        let mut hasher = Sha256::new();
        for probe in &self.enabled_probes {
            hasher.update(probe.as_bytes());
            hasher.update(b"\0");
        }
        hasher.update(format!("threshold={}", self.overall_threshold).as_bytes());
        hasher.update(b"\0");
        for (category, minimum) in &self.category_minimums {
            hasher.update(format!("min:{category}={minimum}").as_bytes());
            hasher.update(b"\0");
        }
        hasher.update(format!("critical_limit={}", self.critical_issue_limit).as_bytes());
        hex::encode(hasher.finalize())
    }

    /// Parse a TOML configuration document.
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        Ok(toml::from_str(raw)?)
    }

    /// Load a TOML configuration file.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_toml_str(&raw)
    }
}

fn check_score_range(label: &str, value: f64) -> Result<()> {
    if value.is_finite() && (0.0..=100.0).contains(&value) {
        Ok(())
    } else {
        Err(OrchestraError::config(format!(
            "{label} must be within 0..=100, got {value}"
        )))
    }
}
