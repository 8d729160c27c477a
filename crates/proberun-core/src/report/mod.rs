//! Report emission for finished runs.
//!
//! Supported formats:
//! - `json` - structural serialization of the run
//! - `markdown` - narrative report for PRs and wikis
//! - `html` - standalone styled page with score cards
//!
//! Each requested format is rendered and written on its own; a failure in
//! one never blocks the others.

mod html;
mod json;
mod markdown;

use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono::{DateTime, Utc};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::RunResult;
use crate::error::{OrchestraError, Result};
use crate::metrics::METRICS;
use crate::obs;

/// File stem shared by every emitted report.
pub const REPORT_FILE_STEM: &str = "proberun-report";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    Json,
    Markdown,
    Html,
}

impl ReportFormat {
    pub const ALL: [ReportFormat; 3] = [ReportFormat::Json, ReportFormat::Markdown, ReportFormat::Html];

    pub fn file_extension(self) -> &'static str {
        match self {
            ReportFormat::Json => "json",
            ReportFormat::Markdown => "md",
            ReportFormat::Html => "html",
        }
    }

    pub fn file_name(self) -> String {
        format!("{REPORT_FILE_STEM}.{}", self.file_extension())
    }

    /// Parse a comma-separated list such as `json,markdown`.
    pub fn parse_list(raw: &str) -> Result<BTreeSet<ReportFormat>> {
        raw.split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(ReportFormat::from_str)
            .collect()
    }
}

impl FromStr for ReportFormat {
    type Err = OrchestraError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "json" => Ok(ReportFormat::Json),
            "markdown" | "md" => Ok(ReportFormat::Markdown),
            "html" => Ok(ReportFormat::Html),
            _ => Err(OrchestraError::config(format!(
                "unknown report format '{s}'. Valid formats: json, markdown, html"
            ))),
        }
    }
}

impl fmt::Display for ReportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReportFormat::Json => write!(f, "json"),
            ReportFormat::Markdown => write!(f, "markdown"),
            ReportFormat::Html => write!(f, "html"),
        }
    }
}

/// Where and how a run's reports are written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportSettings {
    pub formats: BTreeSet<ReportFormat>,
    pub destination: PathBuf,
}

impl ReportSettings {
    pub fn new(destination: impl Into<PathBuf>) -> Self {
        Self {
            formats: [ReportFormat::Json, ReportFormat::Markdown].into_iter().collect(),
            destination: destination.into(),
        }
    }

    pub fn with_formats(mut self, formats: impl IntoIterator<Item = ReportFormat>) -> Self {
        self.formats = formats.into_iter().collect();
        self
    }
}

/// Identity block at the top of every report.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ReportMetadata {
    pub test_type: String,
    pub execution_date: DateTime<Utc>,
    pub environment: String,
    pub base_url: String,
    pub version: String,
    pub run_id: Uuid,
    pub config_digest: String,
}

impl ReportMetadata {
    pub fn for_run(result: &RunResult, test_type: &str) -> Self {
        Self {
            test_type: test_type.to_string(),
            execution_date: result.started_at,
            environment: result.target.environment.clone(),
            base_url: result.target.base_url.clone(),
            version: crate::VERSION.to_string(),
            run_id: result.run_id,
            config_digest: result.config_digest.clone(),
        }
    }
}

/// Result of emitting one format.
#[derive(Debug)]
pub struct EmitOutcome {
    pub format: ReportFormat,
    pub result: Result<PathBuf>,
}

impl EmitOutcome {
    pub fn path(&self) -> Option<&Path> {
        self.result.as_ref().ok().map(PathBuf::as_path)
    }

    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

/// Pass/fail glyph for a score row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Status {
    Pass,
    Warn,
    Fail,
}

impl Status {
    pub(crate) fn glyph(self) -> &'static str {
        match self {
            Status::Pass => "✅",
            Status::Warn => "⚠️",
            Status::Fail => "❌",
        }
    }

    pub(crate) fn css_class(self) -> &'static str {
        match self {
            Status::Pass => "pass",
            Status::Warn => "warn",
            Status::Fail => "fail",
        }
    }

    pub(crate) fn overall(result: &RunResult) -> Self {
        if result.composite_score.overall >= result.thresholds.overall_threshold {
            Status::Pass
        } else {
            Status::Fail
        }
    }

    /// Categories with a floor pass or fail against it; others only warn
    /// when under the overall threshold.
    pub(crate) fn category(result: &RunResult, category: &str, score: f64) -> Self {
        if result.composite_score.is_flagged(category) {
            return Status::Fail;
        }
        match result.thresholds.category_minimums.get(category) {
            Some(minimum) if score < *minimum => Status::Fail,
            Some(_) => Status::Pass,
            None if score < result.thresholds.overall_threshold => Status::Warn,
            None => Status::Pass,
        }
    }
}

/// Renders and writes reports for finished runs.
#[derive(Debug, Clone)]
pub struct ReportEmitter {
    test_type: String,
}

impl ReportEmitter {
    /// `test_type` is the label shown in report headers, e.g. `UI integration`.
    pub fn new(test_type: impl Into<String>) -> Self {
        Self {
            test_type: test_type.into(),
        }
    }

    /// Render `result` as `format` without touching the filesystem.
    pub fn render(&self, format: ReportFormat, result: &RunResult) -> Result<String> {
        let metadata = ReportMetadata::for_run(result, &self.test_type);
        match format {
            ReportFormat::Json => json::render(result, &metadata),
            ReportFormat::Markdown => Ok(markdown::render(result, &metadata)),
            ReportFormat::Html => Ok(html::render(result, &metadata)),
        }
    }

    /// Write one file per format under `destination`, in format order.
    pub async fn emit(
        &self,
        result: &RunResult,
        formats: &BTreeSet<ReportFormat>,
        destination: &Path,
    ) -> Vec<EmitOutcome> {
        let prepared = tokio::fs::create_dir_all(destination)
            .await
            .map_err(|e| e.to_string());

        let tasks = formats.iter().map(|&format| {
            let prepared = prepared.clone();
            async move {
                let written = match prepared {
                    Ok(()) => self.write_one(format, result, destination).await,
                    Err(reason) => Err(OrchestraError::ReportEmission {
                        format,
                        reason: format!("cannot create {}: {reason}", destination.display()),
                    }),
                };
                match &written {
                    Ok(path) => obs::emit_report_emitted(&format.to_string(), path),
                    Err(e) => {
                        METRICS.inc_report_failures();
                        obs::emit_report_failed(&format.to_string(), e);
                    }
                }
                EmitOutcome {
                    format,
                    result: written,
                }
            }
        });

        join_all(tasks).await
    }

    async fn write_one(
        &self,
        format: ReportFormat,
        result: &RunResult,
        destination: &Path,
    ) -> Result<PathBuf> {
        let content = self
            .render(format, result)
            .map_err(|e| OrchestraError::ReportEmission {
                format,
                reason: e.to_string(),
            })?;
        let path = destination.join(format.file_name());
        tokio::fs::write(&path, content)
            .await
            .map_err(|e| OrchestraError::ReportEmission {
                format,
                reason: format!("write {}: {e}", path.display()),
            })?;
        Ok(path)
    }
}

pub(crate) fn format_duration(ms: u64) -> String {
    if ms >= 1000 {
        format!("{:.1}s", ms as f64 / 1000.0)
    } else {
        format!("{ms}ms")
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::domain::{
        CompositeScore, Issue, ProbeDescriptor, ProbeFamily, ProbeOutput, ProbeResult, RunConfig,
        RunSummary, ThresholdSnapshot,
    };
    use std::collections::BTreeMap;

    /// A failed run with one critical issue and two categories.
    pub(crate) fn sample_run() -> RunResult {
        let config = RunConfig::with_probes(["latency", "wcag"])
            .with_category_minimum("a11y", 85.0);
        let latency = ProbeDescriptor::new("latency", ProbeFamily::Ui, "perf", 1.0);
        let wcag = ProbeDescriptor::new("wcag", ProbeFamily::Ui, "a11y", 1.0);
        let probe_results = vec![
            ProbeResult::from_output(&latency, ProbeOutput::passed().with_metric("score", 90.0)),
            ProbeResult::from_output(
                &wcag,
                ProbeOutput::passed()
                    .with_metric("score", 60.0)
                    .with_issue(Issue::critical(
                        "form fields lack <label> & aria text",
                        "Label every form field",
                    )),
            ),
        ];
        let started_at = Utc::now();
        RunResult {
            run_id: Uuid::new_v4(),
            summary: RunSummary::from_results(&probe_results, 1250),
            probe_results,
            skipped_probes: vec!["contrast".to_string()],
            composite_score: CompositeScore {
                per_category: BTreeMap::from([("a11y".to_string(), 60.0), ("perf".to_string(), 90.0)]),
                flagged_categories: Default::default(),
                overall: 78.0,
            },
            success: false,
            critical_issue_count: 1,
            violations: Vec::new(),
            recommendations: vec![
                "Resolve the 1 critical issue(s) before release (at most 0 allowed)".to_string(),
                "Label every form field".to_string(),
            ],
            issues: Vec::new(),
            started_at,
            ended_at: started_at,
            target: config.target.clone(),
            thresholds: ThresholdSnapshot::from(&config),
            config_digest: config.digest(),
            error: None,
        }
    }

    #[test]
    fn test_format_parse_and_display() {
        assert_eq!("md".parse::<ReportFormat>().unwrap(), ReportFormat::Markdown);
        assert_eq!("HTML".parse::<ReportFormat>().unwrap(), ReportFormat::Html);
        assert!("pdf".parse::<ReportFormat>().is_err());
        assert_eq!(ReportFormat::Markdown.to_string(), "markdown");
        assert_eq!(ReportFormat::Markdown.file_name(), "proberun-report.md");
    }

    #[test]
    fn test_parse_list() {
        let formats = ReportFormat::parse_list("json, html,").unwrap();
        assert_eq!(
            formats.into_iter().collect::<Vec<_>>(),
            vec![ReportFormat::Json, ReportFormat::Html]
        );
        assert!(ReportFormat::parse_list("json,yaml").is_err());
    }

    #[test]
    fn test_category_status() {
        let run = sample_run();
        assert_eq!(Status::category(&run, "a11y", 60.0), Status::Fail);
        assert_eq!(Status::category(&run, "perf", 90.0), Status::Pass);
        assert_eq!(Status::category(&run, "perf", 70.0), Status::Warn);
        assert_eq!(Status::overall(&run), Status::Fail);
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(250), "250ms");
        assert_eq!(format_duration(1500), "1.5s");
    }

    #[tokio::test]
    async fn test_emit_writes_every_format() {
        let dir = tempfile::tempdir().unwrap();
        let run = sample_run();
        let outcomes = ReportEmitter::new("UI integration")
            .emit(&run, &ReportFormat::ALL.into_iter().collect(), dir.path())
            .await;

        assert_eq!(outcomes.len(), 3);
        for outcome in &outcomes {
            let path = outcome.path().expect("written");
            assert!(path.exists());
            assert_eq!(path.extension().unwrap(), outcome.format.file_extension());
        }
    }

    #[tokio::test]
    async fn test_emit_does_not_mutate_result() {
        let dir = tempfile::tempdir().unwrap();
        let run = sample_run();
        let before = run.clone();
        ReportEmitter::new("UI integration")
            .emit(&run, &ReportSettings::new(dir.path()).formats, dir.path())
            .await;
        assert_eq!(run, before);
    }
}
