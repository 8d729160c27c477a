//! Probe contract and the values probes produce.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::config::RunConfig;

/// Metric key used for aggregation unless a descriptor names another one.
pub const DEFAULT_SCORE_METRIC: &str = "score";

/// Probe family discriminant.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum ProbeFamily {
    /// Model-quality checks (generation quality, language accuracy, streaming).
    Ai,
    /// Browser-facing checks (layout, chat, citations, accessibility).
    Ui,
}

impl fmt::Display for ProbeFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProbeFamily::Ai => write!(f, "ai"),
            ProbeFamily::Ui => write!(f, "ui"),
        }
    }
}

/// Issue severity.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Critical,
    Major,
    Minor,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Critical => write!(f, "critical"),
            Severity::Major => write!(f, "major"),
            Severity::Minor => write!(f, "minor"),
        }
    }
}

/// A problem a probe observed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Issue {
    pub severity: Severity,
    pub description: String,
    pub recommendation: String,
}

impl Issue {
    pub fn new(
        severity: Severity,
        description: impl Into<String>,
        recommendation: impl Into<String>,
    ) -> Self {
        Self {
            severity,
            description: description.into(),
            recommendation: recommendation.into(),
        }
    }

    pub fn critical(description: impl Into<String>, recommendation: impl Into<String>) -> Self {
        Self::new(Severity::Critical, description, recommendation)
    }

    pub fn major(description: impl Into<String>, recommendation: impl Into<String>) -> Self {
        Self::new(Severity::Major, description, recommendation)
    }

    pub fn minor(description: impl Into<String>, recommendation: impl Into<String>) -> Self {
        Self::new(Severity::Minor, description, recommendation)
    }
}

/// Static description of a probe: identity, scoring weight and timing.
///
/// Immutable for the lifetime of a run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProbeDescriptor {
    /// Unique probe name (the key used by `RunConfig::enabled_probes`).
    pub name: String,

    pub family: ProbeFamily,

    /// Category whose weight pool this probe contributes to.
    pub category: String,

    /// Weight within the category (0..1). Renormalised over probes that ran.
    pub weight: f64,

    /// Metric key read by the aggregator.
    #[serde(default = "default_score_metric")]
    pub score_metric: String,

    /// Expected latency of one invocation in milliseconds; drives the timeout.
    #[serde(default)]
    pub expected_latency_ms: Option<u64>,
}

fn default_score_metric() -> String {
    DEFAULT_SCORE_METRIC.to_string()
}

impl ProbeDescriptor {
    pub fn new(
        name: impl Into<String>,
        family: ProbeFamily,
        category: impl Into<String>,
        weight: f64,
    ) -> Self {
        Self {
            name: name.into(),
            family,
            category: category.into(),
            weight,
            score_metric: default_score_metric(),
            expected_latency_ms: None,
        }
    }

    /// Read the aggregated score from `metric` instead of `score`.
    pub fn with_score_metric(mut self, metric: impl Into<String>) -> Self {
        self.score_metric = metric.into();
        self
    }

    /// A zero latency means none is declared.
    pub fn with_expected_latency(mut self, latency: Duration) -> Self {
        let ms = latency.as_millis() as u64;
        self.expected_latency_ms = (ms > 0).then_some(ms);
        self
    }

    /// Per-invocation timeout: `multiplier` × expected latency.
    ///
    /// `None` when the probe declares no (or a zero) expected latency, or
    /// when the product is not representable as a [`Duration`].
    pub fn timeout(&self, multiplier: f64) -> Option<Duration> {
        self.expected_latency_ms
            .filter(|ms| *ms > 0)
            .and_then(|ms| Duration::try_from_secs_f64(ms as f64 / 1000.0 * multiplier).ok())
            .filter(|timeout| !timeout.is_zero())
    }
}

/// What a probe returns when it completes.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProbeOutput {
    pub success: bool,
    pub metrics: BTreeMap<String, f64>,
    pub issues: Vec<Issue>,
    pub duration_ms: u64,
}

impl ProbeOutput {
    pub fn passed() -> Self {
        Self {
            success: true,
            ..Self::default()
        }
    }

    pub fn with_metric(mut self, key: impl Into<String>, value: f64) -> Self {
        self.metrics.insert(key.into(), value);
        self
    }

    pub fn with_issue(mut self, issue: Issue) -> Self {
        self.issues.push(issue);
        self
    }

    pub fn with_duration_ms(mut self, duration_ms: u64) -> Self {
        self.duration_ms = duration_ms;
        self
    }
}

/// The settled outcome of one probe in one run.
///
/// Produced exactly once per enabled probe; never mutated afterwards.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProbeResult {
    pub probe_name: String,
    pub family: ProbeFamily,
    pub category: String,
    pub success: bool,
    pub metrics: BTreeMap<String, f64>,
    pub issues: Vec<Issue>,
    pub duration_ms: u64,
}

impl ProbeResult {
    /// Stamp a probe's own output with its descriptor identity.
    pub fn from_output(descriptor: &ProbeDescriptor, output: ProbeOutput) -> Self {
        Self {
            probe_name: descriptor.name.clone(),
            family: descriptor.family,
            category: descriptor.category.clone(),
            success: output.success,
            metrics: output.metrics,
            issues: output.issues,
            duration_ms: output.duration_ms,
        }
    }

    /// Substitute result for a probe that errored, panicked or timed out.
    pub fn failed(descriptor: &ProbeDescriptor, message: impl Into<String>, duration_ms: u64) -> Self {
        let message = message.into();
        Self {
            probe_name: descriptor.name.clone(),
            family: descriptor.family,
            category: descriptor.category.clone(),
            success: false,
            metrics: BTreeMap::new(),
            issues: vec![Issue::critical(
                message,
                format!(
                    "Investigate why probe '{}' could not complete and re-run it",
                    descriptor.name
                ),
            )],
            duration_ms,
        }
    }

    /// The metric value named `metric`, if the probe reported it.
    pub fn metric(&self, metric: &str) -> Option<f64> {
        self.metrics.get(metric).copied()
    }

    pub fn count_issues(&self, severity: Severity) -> usize {
        self.issues.iter().filter(|i| i.severity == severity).count()
    }
}

/// Read-only context handed to every probe invocation.
#[derive(Debug, Clone)]
pub struct ProbeContext {
    pub run_id: Uuid,
    pub config: Arc<RunConfig>,
}

/// A named quality check.
///
/// Implementations own their measurement logic; the orchestration core only
/// sees the [`ProbeOutput`] or the error.
#[async_trait]
pub trait Probe: Send + Sync {
    fn descriptor(&self) -> &ProbeDescriptor;

    /// Execute the check once.
    async fn run(&self, ctx: &ProbeContext) -> anyhow::Result<ProbeOutput>;

    /// Release external resources. Called once per run after the result is final.
    async fn cleanup(&self) -> anyhow::Result<()> {
        Ok(())
    }
}
