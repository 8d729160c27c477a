//! Markdown report.

use crate::domain::{ProbeResult, RunResult, Severity, DEFAULT_SCORE_METRIC};
use crate::report::{format_duration, ReportMetadata, Status};

pub(super) fn render(result: &RunResult, metadata: &ReportMetadata) -> String {
    let mut md = String::new();

    md.push_str(&render_header(result, metadata));
    md.push('\n');
    md.push_str(&render_scores(result));
    md.push('\n');
    md.push_str(&render_recommendations(result));
    md.push('\n');
    md.push_str(&render_summary(result));
    md.push('\n');
    md.push_str(&render_probe_results(result));
    md.push('\n');
    md.push_str(&render_footer(metadata));

    md
}

fn render_header(result: &RunResult, metadata: &ReportMetadata) -> String {
    let verdict = if result.success {
        "✅ PASSED"
    } else {
        "❌ FAILED"
    };
    let mut out = format!("# 🧪 {} Test Report\n\n", metadata.test_type);
    out.push_str("## 📋 Overview\n\n");
    out.push_str(&format!(
        "- **Executed**: {}\n- **Environment**: {}\n- **Base URL**: {}\n- **Duration**: {}\n- **Run ID**: `{}`\n- **Result**: {}\n",
        metadata.execution_date.format("%Y-%m-%d %H:%M:%S UTC"),
        metadata.environment,
        metadata.base_url,
        format_duration(result.duration_ms()),
        metadata.run_id,
        verdict,
    ));
    if let Some(error) = &result.error {
        out.push_str(&format!("- **Error**: {error}\n"));
    }
    out
}

fn render_scores(result: &RunResult) -> String {
    let score = &result.composite_score;
    let mut out = String::from("## 📊 Score Overview\n\n");
    out.push_str("| Category | Score | Status |\n");
    out.push_str("|----------|-------|--------|\n");
    out.push_str(&format!(
        "| **Overall** | {:.1}/100 | {} |\n",
        score.overall,
        Status::overall(result).glyph()
    ));
    for (category, value) in &score.per_category {
        out.push_str(&format!(
            "| {} | {:.1}/100 | {} |\n",
            category,
            value,
            Status::category(result, category, *value).glyph()
        ));
    }
    out
}

fn render_recommendations(result: &RunResult) -> String {
    let mut out = String::from("## 💡 Recommendations\n\n");
    for (i, line) in result.recommendations.iter().enumerate() {
        out.push_str(&format!("{}. {}\n", i + 1, line));
    }
    out
}

fn render_summary(result: &RunResult) -> String {
    let s = &result.summary;
    let mut out = String::from("## 📈 Test Summary\n\n");
    out.push_str(&format!(
        "- **Probes run**: {}\n- **Passed**: {}\n- **Failed**: {}\n- **Coverage**: {:.1}%\n\n",
        s.total_probes, s.passed_probes, s.failed_probes, s.coverage
    ));
    out.push_str("### Issues\n\n");
    out.push_str(&format!(
        "- 🔴 Critical: {}\n- 🟡 Major: {}\n- 🟢 Minor: {}\n",
        s.critical_issues, s.major_issues, s.minor_issues
    ));
    out
}

fn render_probe_results(result: &RunResult) -> String {
    let mut out = String::from("## 🔍 Probe Results\n\n");
    if result.probe_results.is_empty() {
        out.push_str("_No probes ran._\n\n");
    }
    for probe in &result.probe_results {
        out.push_str(&render_probe(probe));
    }
    for name in &result.skipped_probes {
        out.push_str(&format!("### ⏭️ {name}\n\n- **Status**: skipped (disabled for this run)\n\n"));
    }
    out
}

fn render_probe(probe: &ProbeResult) -> String {
    let glyph = if probe.success { "✅" } else { "❌" };
    let mut out = format!("### {} {}\n\n", glyph, probe.probe_name);
    out.push_str(&format!(
        "- **Family**: {}\n- **Category**: {}\n",
        probe.family, probe.category
    ));
    if let Some(score) = probe.metric(DEFAULT_SCORE_METRIC) {
        out.push_str(&format!("- **Score**: {score:.1}/100\n"));
    }
    out.push_str(&format!(
        "- **Duration**: {}\n",
        format_duration(probe.duration_ms)
    ));

    let extra: Vec<_> = probe
        .metrics
        .iter()
        .filter(|(k, _)| k.as_str() != DEFAULT_SCORE_METRIC)
        .collect();
    if !extra.is_empty() {
        out.push_str("- **Metrics**:\n");
        for (name, value) in extra {
            out.push_str(&format!("  - {name}: {value:.1}\n"));
        }
    }

    if !probe.issues.is_empty() {
        out.push_str("- **Issues**:\n");
        for issue in &probe.issues {
            let marker = match issue.severity {
                Severity::Critical => "🔴",
                Severity::Major => "🟡",
                Severity::Minor => "🟢",
            };
            out.push_str(&format!(
                "  - {} {}: {}\n",
                marker, issue.severity, issue.description
            ));
        }
    }
    out.push('\n');
    out
}

fn render_footer(metadata: &ReportMetadata) -> String {
    format!(
        "---\n\n*This report was generated automatically by proberun {} (config `{}`).*\n",
        metadata.version,
        &metadata.config_digest[..metadata.config_digest.len().min(12)]
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::tests::sample_run;

    fn rendered() -> String {
        let run = sample_run();
        render(&run, &ReportMetadata::for_run(&run, "UI integration"))
    }

    #[test]
    fn test_score_table_rows() {
        let md = rendered();
        assert!(md.contains("## 📊 Score Overview"));
        assert!(md.contains("| **Overall** | 78.0/100 | ❌ |"));
        assert!(md.contains("| a11y | 60.0/100 | ❌ |"));
        assert!(md.contains("| perf | 90.0/100 | ✅ |"));
    }

    #[test]
    fn test_recommendations_follow_scores_as_ordered_list() {
        let md = rendered();
        let scores = md.find("## 📊 Score Overview").unwrap();
        let recs = md.find("## 💡 Recommendations").unwrap();
        assert!(recs > scores);
        assert!(md.contains("1. Resolve the 1 critical issue(s)"));
        assert!(md.contains("2. Label every form field"));
    }

    #[test]
    fn test_header_and_details() {
        let md = rendered();
        assert!(md.starts_with("# 🧪 UI integration Test Report"));
        assert!(md.contains("- **Result**: ❌ FAILED"));
        assert!(md.contains("- 🔴 Critical: 1"));
        assert!(md.contains("### ✅ wcag"));
        assert!(md.contains("🔴 critical: form fields lack"));
    }

    #[test]
    fn test_skipped_probes_follow_executed_ones() {
        let md = rendered();
        let executed = md.find("### ✅ wcag").unwrap();
        let skipped = md.find("### ⏭️ contrast").unwrap();
        assert!(skipped > executed);
        assert!(md.contains("- **Status**: skipped (disabled for this run)"));
    }
}
