//! Machine-readable JSON report.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::domain::{CompositeScore, Issue, ProbeResult, RunResult, RunSummary, ThresholdSnapshot};
use crate::error::Result;
use crate::report::ReportMetadata;
use crate::threshold::Violation;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct JsonReport<'a> {
    metadata: &'a ReportMetadata,
    summary: JsonSummary<'a>,
    scores: &'a CompositeScore,
    thresholds: &'a ThresholdSnapshot,
    probe_results: &'a [ProbeResult],
    skipped_probes: &'a [String],
    violations: &'a [Violation],
    issues: &'a [Issue],
    recommendations: &'a [String],
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<&'a str>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct JsonSummary<'a> {
    success: bool,
    overall_score: f64,
    /// Wall time in milliseconds.
    duration: u64,
    critical_issue_count: usize,
    started_at: DateTime<Utc>,
    ended_at: DateTime<Utc>,
    test_summary: &'a RunSummary,
}

pub(super) fn render(result: &RunResult, metadata: &ReportMetadata) -> Result<String> {
    let report = JsonReport {
        metadata,
        summary: JsonSummary {
            success: result.success,
            overall_score: result.composite_score.overall,
            duration: result.duration_ms(),
            critical_issue_count: result.critical_issue_count,
            started_at: result.started_at,
            ended_at: result.ended_at,
            test_summary: &result.summary,
        },
        scores: &result.composite_score,
        thresholds: &result.thresholds,
        probe_results: &result.probe_results,
        skipped_probes: &result.skipped_probes,
        violations: &result.violations,
        issues: &result.issues,
        recommendations: &result.recommendations,
        error: result.error.as_deref(),
    };
    Ok(serde_json::to_string_pretty(&report)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::tests::sample_run;

    #[test]
    fn test_top_level_shape() {
        let run = sample_run();
        let json = render(&run, &ReportMetadata::for_run(&run, "UI integration")).unwrap();
        let v: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(v["metadata"]["testType"], "UI integration");
        assert_eq!(v["metadata"]["environment"], "development");
        assert_eq!(v["summary"]["success"], false);
        assert_eq!(v["summary"]["testSummary"]["totalProbes"], 2);
        assert_eq!(v["scores"]["perCategory"]["a11y"], 60.0);
        assert_eq!(v["probeResults"].as_array().unwrap().len(), 2);
        assert_eq!(v["skippedProbes"][0], "contrast");
        assert_eq!(v["recommendations"][1], "Label every form field");
        assert!(v.get("error").is_none());
    }

    #[test]
    fn test_scores_round_trip_exactly() {
        let mut run = sample_run();
        run.composite_score.overall = 100.0 / 3.0;
        run.composite_score
            .per_category
            .insert("perf".to_string(), 0.1 + 0.2);

        let json = render(&run, &ReportMetadata::for_run(&run, "AI")).unwrap();
        let v: serde_json::Value = serde_json::from_str(&json).unwrap();

        let overall = v["summary"]["overallScore"].as_f64().unwrap();
        assert_eq!(overall.to_bits(), (100.0f64 / 3.0).to_bits());
        let perf = v["scores"]["perCategory"]["perf"].as_f64().unwrap();
        assert_eq!(perf.to_bits(), (0.1f64 + 0.2).to_bits());
    }
}
