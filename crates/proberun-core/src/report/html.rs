//! Standalone HTML report with embedded styles.

use crate::domain::{ProbeResult, RunResult, DEFAULT_SCORE_METRIC};
use crate::report::{format_duration, ReportMetadata, Status};

pub(super) fn render(result: &RunResult, metadata: &ReportMetadata) -> String {
    let mut html = String::new();

    html.push_str(&render_head(metadata));
    html.push_str("<body>\n<div class=\"container\">\n");
    html.push_str(&render_header(result, metadata));
    html.push_str("<div class=\"content\">\n");
    html.push_str(&render_score_cards(result));
    html.push_str(&render_recommendations(result));
    html.push_str(&render_summary(result));
    html.push_str(&render_probe_table(result));
    html.push_str("</div>\n");
    html.push_str(&render_footer(metadata));
    html.push_str("</div>\n</body>\n</html>\n");

    html
}

fn render_head(metadata: &ReportMetadata) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>{} Test Report</title>
    <style>
{CSS}
    </style>
</head>
"#,
        html_escape(&metadata.test_type)
    )
}

fn render_header(result: &RunResult, metadata: &ReportMetadata) -> String {
    let (class, verdict) = if result.success {
        ("pass", "PASSED")
    } else {
        ("fail", "FAILED")
    };
    let mut out = format!(
        r#"<div class="header">
    <h1>{} Test Report</h1>
    <p class="meta">{} &middot; {} &middot; {} &middot; {}</p>
    <p class="verdict {}">{}</p>
"#,
        html_escape(&metadata.test_type),
        metadata.execution_date.format("%Y-%m-%d %H:%M:%S UTC"),
        html_escape(&metadata.environment),
        html_escape(&metadata.base_url),
        format_duration(result.duration_ms()),
        class,
        verdict,
    );
    if let Some(error) = &result.error {
        out.push_str(&format!("    <p class=\"error\">{}</p>\n", html_escape(error)));
    }
    out.push_str("</div>\n");
    out
}

fn score_card(label: &str, value: f64, status: Status) -> String {
    format!(
        r#"<div class="score-card {}">
    <div class="score-label">{}</div>
    <div class="score-value">{:.1}</div>
    <div class="score-status">{}</div>
</div>
"#,
        status.css_class(),
        html_escape(label),
        value,
        status.glyph()
    )
}

fn render_score_cards(result: &RunResult) -> String {
    let score = &result.composite_score;
    let mut out = String::from("<h2>Score Overview</h2>\n<div class=\"score-grid\">\n");
    out.push_str(&score_card("Overall", score.overall, Status::overall(result)));
    for (category, value) in &score.per_category {
        out.push_str(&score_card(
            category,
            *value,
            Status::category(result, category, *value),
        ));
    }
    out.push_str("</div>\n");
    out
}

fn render_recommendations(result: &RunResult) -> String {
    let mut out = String::from("<h2>Recommendations</h2>\n<ol class=\"recommendations\">\n");
    for line in &result.recommendations {
        out.push_str(&format!("    <li>{}</li>\n", html_escape(line)));
    }
    out.push_str("</ol>\n");
    out
}

fn render_summary(result: &RunResult) -> String {
    let s = &result.summary;
    format!(
        r#"<h2>Test Summary</h2>
<ul class="summary">
    <li>Probes run: {}</li>
    <li>Passed: {}</li>
    <li>Failed: {}</li>
    <li>Coverage: {:.1}%</li>
    <li class="critical">Critical issues: {}</li>
    <li class="major">Major issues: {}</li>
    <li class="minor">Minor issues: {}</li>
</ul>
"#,
        s.total_probes,
        s.passed_probes,
        s.failed_probes,
        s.coverage,
        s.critical_issues,
        s.major_issues,
        s.minor_issues
    )
}

fn render_probe_row(probe: &ProbeResult) -> String {
    let score = probe
        .metric(DEFAULT_SCORE_METRIC)
        .map(|s| format!("{s:.1}"))
        .unwrap_or_else(|| "-".to_string());
    let issues: Vec<String> = probe
        .issues
        .iter()
        .map(|i| {
            format!(
                "<span class=\"issue {}\">{}</span>",
                i.severity,
                html_escape(&i.description)
            )
        })
        .collect();
    format!(
        "<tr class=\"{}\"><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>\n",
        if probe.success { "pass" } else { "fail" },
        html_escape(&probe.probe_name),
        html_escape(&probe.category),
        score,
        format_duration(probe.duration_ms),
        issues.join("<br>")
    )
}

fn render_probe_table(result: &RunResult) -> String {
    let mut out = String::from(
        "<h2>Probe Results</h2>\n<table class=\"probes\">\n<tr><th>Probe</th><th>Category</th><th>Score</th><th>Duration</th><th>Issues</th></tr>\n",
    );
    for probe in &result.probe_results {
        out.push_str(&render_probe_row(probe));
    }
    for name in &result.skipped_probes {
        out.push_str(&format!(
            "<tr class=\"skipped\"><td>{}</td><td colspan=\"4\">skipped (disabled for this run)</td></tr>\n",
            html_escape(name)
        ));
    }
    out.push_str("</table>\n");
    out
}

fn render_footer(metadata: &ReportMetadata) -> String {
    format!(
        "<div class=\"footer\">Generated automatically by proberun {} &middot; run {}</div>\n",
        html_escape(&metadata.version),
        metadata.run_id
    )
}

fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

const CSS: &str = r#"
body { font-family: -apple-system, BlinkMacSystemFont, "Segoe UI", sans-serif; background: #f5f6f8; color: #1f2933; margin: 0; }
.container { max-width: 1080px; margin: 0 auto; padding: 24px; }
.header { background: #1f2933; color: #fff; padding: 24px; border-radius: 8px; }
.header .meta { opacity: 0.8; }
.verdict { font-size: 1.4em; font-weight: bold; }
.verdict.pass { color: #3ecf8e; }
.verdict.fail { color: #ff6b6b; }
.error { color: #ffb4b4; }
.score-grid { display: grid; grid-template-columns: repeat(auto-fill, minmax(180px, 1fr)); gap: 16px; }
.score-card { background: #fff; border-radius: 8px; padding: 16px; border-top: 4px solid #ccc; text-align: center; }
.score-card.pass { border-top-color: #3ecf8e; }
.score-card.warn { border-top-color: #f5a623; }
.score-card.fail { border-top-color: #ff6b6b; }
.score-value { font-size: 2em; font-weight: bold; }
.recommendations li { margin: 6px 0; }
table.probes { width: 100%; border-collapse: collapse; background: #fff; }
table.probes th, table.probes td { padding: 8px; border-bottom: 1px solid #e4e7eb; text-align: left; }
tr.fail td:first-child { color: #d64545; }
.issue.critical { color: #d64545; }
.issue.major { color: #c77c02; }
.issue.minor { color: #2f8132; }
.footer { margin-top: 32px; font-size: 0.85em; color: #7b8794; text-align: center; }
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::tests::sample_run;

    #[test]
    fn test_escape() {
        assert_eq!(
            html_escape(r#"<a href="x">Tom & Jerry's</a>"#),
            "&lt;a href=&quot;x&quot;&gt;Tom &amp; Jerry&#39;s&lt;/a&gt;"
        );
    }

    #[test]
    fn test_interpolated_text_is_escaped() {
        let run = sample_run();
        let html = render(&run, &ReportMetadata::for_run(&run, "UI <integration>"));
        assert!(html.contains("UI &lt;integration&gt; Test Report"));
        assert!(html.contains("form fields lack &lt;label&gt; &amp; aria text"));
        assert!(!html.contains("<label>"));
    }

    #[test]
    fn test_score_cards_and_recommendations() {
        let run = sample_run();
        let html = render(&run, &ReportMetadata::for_run(&run, "UI"));
        assert!(html.contains("<div class=\"score-grid\">"));
        assert!(html.contains("<div class=\"score-card fail\">"));
        assert!(html.contains("<li>Label every form field</li>"));
        assert!(html.contains("<p class=\"verdict fail\">FAILED</p>"));
    }

    #[test]
    fn test_skipped_probes_listed() {
        let run = sample_run();
        let html = render(&run, &ReportMetadata::for_run(&run, "UI"));
        assert!(html.contains("<tr class=\"skipped\"><td>contrast</td>"));
    }
}
