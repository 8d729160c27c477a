//! Run-level aggregates: composite score, summary, and the final result.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::config::{RunConfig, TargetConfig};
use crate::domain::probe::{Issue, ProbeResult, Severity};
use crate::threshold::Violation;

/// Weighted scores per category and overall, each in 0..100.
///
/// Derived per run; only ever persisted as part of a [`RunResult`].
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CompositeScore {
    pub per_category: BTreeMap<String, f64>,
    /// Categories where every probe that ran failed; scored 0.
    pub flagged_categories: BTreeSet<String>,
    pub overall: f64,
}

impl CompositeScore {
    pub fn category(&self, category: &str) -> Option<f64> {
        self.per_category.get(category).copied()
    }

    pub fn is_flagged(&self, category: &str) -> bool {
        self.flagged_categories.contains(category)
    }
}

/// Counts over the settled probe results.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    pub total_probes: usize,
    pub passed_probes: usize,
    pub failed_probes: usize,
    pub critical_issues: usize,
    pub major_issues: usize,
    pub minor_issues: usize,
    /// Passed probes as a percentage of probes run.
    pub coverage: f64,
    pub execution_time_ms: u64,
}

impl RunSummary {
    pub fn from_results(results: &[ProbeResult], execution_time_ms: u64) -> Self {
        let total_probes = results.len();
        let passed_probes = results.iter().filter(|r| r.success).count();
        let count = |severity| results.iter().map(|r| r.count_issues(severity)).sum();
        let coverage = if total_probes == 0 {
            0.0
        } else {
            passed_probes as f64 / total_probes as f64 * 100.0
        };

        Self {
            total_probes,
            passed_probes,
            failed_probes: total_probes - passed_probes,
            critical_issues: count(Severity::Critical),
            major_issues: count(Severity::Major),
            minor_issues: count(Severity::Minor),
            coverage,
            execution_time_ms,
        }
    }
}

/// The thresholds a run was judged against, kept for report rendering.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ThresholdSnapshot {
    pub overall_threshold: f64,
    pub category_minimums: BTreeMap<String, f64>,
    pub critical_issue_limit: usize,
}

impl From<&RunConfig> for ThresholdSnapshot {
    fn from(config: &RunConfig) -> Self {
        Self {
            overall_threshold: config.overall_threshold,
            category_minimums: config.category_minimums.clone(),
            critical_issue_limit: config.critical_issue_limit,
        }
    }
}

/// Lifecycle of an orchestrator instance.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    Idle,
    Running,
    Completed,
}

/// Final, read-only record of one run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RunResult {
    pub run_id: Uuid,
    /// Positionally ordered like the enabled probe set.
    pub probe_results: Vec<ProbeResult>,
    /// Registered probes left out of this run, in registration order.
    #[serde(default)]
    pub skipped_probes: Vec<String>,
    pub composite_score: CompositeScore,
    pub success: bool,
    pub critical_issue_count: usize,
    pub summary: RunSummary,
    pub violations: Vec<Violation>,
    pub recommendations: Vec<String>,
    /// Run-scoped issues not attributable to a single probe.
    pub issues: Vec<Issue>,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    pub target: TargetConfig,
    pub thresholds: ThresholdSnapshot,
    pub config_digest: String,
    /// Set when the run could not execute; the result is then a structured failure.
    pub error: Option<String>,
}

impl RunResult {
    /// Structured failure for a run that never produced probe results.
    pub fn aborted(
        run_id: Uuid,
        config: &RunConfig,
        started_at: DateTime<Utc>,
        error: impl std::fmt::Display,
    ) -> Self {
        let message = error.to_string();
        let ended_at = Utc::now();
        let execution_time_ms = (ended_at - started_at).num_milliseconds().max(0) as u64;

        Self {
            run_id,
            probe_results: Vec::new(),
            skipped_probes: Vec::new(),
            composite_score: CompositeScore::default(),
            success: false,
            critical_issue_count: 1,
            summary: RunSummary {
                critical_issues: 1,
                execution_time_ms,
                ..RunSummary::default()
            },
            violations: Vec::new(),
            recommendations: vec![
                format!("Fix the run setup before re-running: {message}"),
                "Check connectivity to the target system and the enabled probe set".to_string(),
            ],
            issues: vec![Issue::critical(
                message.clone(),
                "Fix the run setup before re-running",
            )],
            started_at,
            ended_at,
            target: config.target.clone(),
            thresholds: ThresholdSnapshot::from(config),
            config_digest: config.digest(),
            error: Some(message),
        }
    }

    pub fn duration_ms(&self) -> u64 {
        (self.ended_at - self.started_at).num_milliseconds().max(0) as u64
    }

    pub fn passed_count(&self) -> usize {
        self.probe_results.iter().filter(|r| r.success).count()
    }

    pub fn failed_count(&self) -> usize {
        self.probe_results.iter().filter(|r| !r.success).count()
    }
}
