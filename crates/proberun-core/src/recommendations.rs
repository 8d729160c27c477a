//! Human-actionable follow-ups derived from a verdict.

use std::collections::BTreeSet;

use crate::domain::{ProbeResult, Severity};
use crate::threshold::{ThresholdRule, ThresholdVerdict};

/// Emitted when no rule was violated and no probe raised a critical or major issue.
pub const ALL_CLEAR: &str =
    "All quality gates passed; maintain current quality and keep monitoring regressions";

/// Build the recommendation list for a run.
///
/// One line per violation in rule order, then the distinct recommendations
/// attached to critical issues in probe order, then those attached to major
/// issues. Minor issues never produce a line. Deterministic for equal input.
pub fn synthesize(verdict: &ThresholdVerdict, results: &[ProbeResult]) -> Vec<String> {
    let mut lines: Vec<String> = verdict
        .violations
        .iter()
        .map(|violation| match &violation.rule {
            ThresholdRule::CriticalIssueLimit { limit, found } => format!(
                "Resolve the {found} critical issue(s) before release (at most {limit} allowed)"
            ),
            ThresholdRule::CategoryMinimum {
                category,
                minimum,
                actual,
            } => format!("Improve {category}: scored {actual:.1}, needs at least {minimum:.1}"),
            ThresholdRule::MissingCategory { category } => format!(
                "Restore the {category} probes: none of them completed, so the category was scored 0"
            ),
            ThresholdRule::OverallThreshold { threshold, actual } => format!(
                "Raise the overall score from {actual:.1} to the {threshold:.1} threshold"
            ),
        })
        .collect();

    let mut seen = BTreeSet::new();
    for severity in [Severity::Critical, Severity::Major] {
        for issue in results
            .iter()
            .flat_map(|r| r.issues.iter())
            .filter(|i| i.severity == severity)
        {
            if !issue.recommendation.is_empty() && seen.insert(issue.recommendation.as_str()) {
                lines.push(issue.recommendation.clone());
            }
        }
    }

    if lines.is_empty() {
        lines.push(ALL_CLEAR.to_string());
    }
    lines
}
