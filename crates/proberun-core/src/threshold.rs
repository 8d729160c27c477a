//! Pass/fail rules applied to a composite score.
//!
//! Rules are checked in a fixed order: the critical-issue floor, each
//! category minimum, each flagged (entirely failed) category, then the
//! overall threshold. Every violated rule is reported, not only the first.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::domain::{CompositeScore, RunConfig};
use crate::obs;

// ---------------------------------------------------------------------------
// Rules
// ---------------------------------------------------------------------------

/// A rule that can fail a run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ThresholdRule {
    /// More critical issues than `limit` were found. Independent of any score.
    CriticalIssueLimit { limit: usize, found: usize },
    /// A category scored below its configured floor.
    CategoryMinimum {
        category: String,
        minimum: f64,
        actual: f64,
    },
    /// Every probe in the category failed to run.
    MissingCategory { category: String },
    /// The overall score is below the passing threshold.
    OverallThreshold { threshold: f64, actual: f64 },
}

/// A single rule violation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Violation {
    pub rule: ThresholdRule,
    /// Human-readable explanation.
    pub reason: String,
}

impl Violation {
    fn new(rule: ThresholdRule) -> Self {
        let reason = match &rule {
            ThresholdRule::CriticalIssueLimit { limit, found } => {
                format!("{found} critical issue(s) found, limit is {limit}")
            }
            ThresholdRule::CategoryMinimum {
                category,
                minimum,
                actual,
            } => format!("category '{category}' scored {actual:.1}, minimum is {minimum:.1}"),
            ThresholdRule::MissingCategory { category } => {
                format!("every probe in category '{category}' failed to run")
            }
            ThresholdRule::OverallThreshold { threshold, actual } => {
                format!("overall score {actual:.1} is below threshold {threshold:.1}")
            }
        };
        Self { rule, reason }
    }
}

// ---------------------------------------------------------------------------
// Verdict
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ThresholdVerdict {
    /// Violations in rule order (empty when passed).
    pub violations: Vec<Violation>,
}

impl ThresholdVerdict {
    pub fn passed(&self) -> bool {
        self.violations.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Evaluator
// ---------------------------------------------------------------------------

/// Thresholds a run is judged against.
#[derive(Debug, Clone, PartialEq)]
pub struct ThresholdEvaluator {
    pub overall_threshold: f64,
    pub category_minimums: BTreeMap<String, f64>,
    pub critical_issue_limit: usize,
}

impl From<&RunConfig> for ThresholdEvaluator {
    fn from(config: &RunConfig) -> Self {
        Self {
            overall_threshold: config.overall_threshold,
            category_minimums: config.category_minimums.clone(),
            critical_issue_limit: config.critical_issue_limit,
        }
    }
}

impl ThresholdEvaluator {
    pub fn evaluate(&self, score: &CompositeScore, critical_issue_count: usize) -> ThresholdVerdict {
        let mut violations = Vec::new();

        if critical_issue_count > self.critical_issue_limit {
            violations.push(Violation::new(ThresholdRule::CriticalIssueLimit {
                limit: self.critical_issue_limit,
                found: critical_issue_count,
            }));
        }

        // categories whose probes were all disabled are absent and not judged
        for (category, minimum) in &self.category_minimums {
            if let Some(actual) = score.category(category) {
                if actual.is_nan() || actual < *minimum {
                    violations.push(Violation::new(ThresholdRule::CategoryMinimum {
                        category: category.clone(),
                        minimum: *minimum,
                        actual,
                    }));
                }
            }
        }

        for category in &score.flagged_categories {
            violations.push(Violation::new(ThresholdRule::MissingCategory {
                category: category.clone(),
            }));
        }

        if score.overall.is_nan() || score.overall < self.overall_threshold {
            violations.push(Violation::new(ThresholdRule::OverallThreshold {
                threshold: self.overall_threshold,
                actual: score.overall,
            }));
        }

        let verdict = ThresholdVerdict { violations };
        obs::emit_threshold_evaluated(verdict.passed(), verdict.violations.len());
        verdict
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    fn evaluator() -> ThresholdEvaluator {
        ThresholdEvaluator::from(&RunConfig::default())
    }

    fn score(overall: f64, categories: &[(&str, f64)]) -> CompositeScore {
        CompositeScore {
            per_category: categories
                .iter()
                .map(|(c, s)| (c.to_string(), *s))
                .collect(),
            flagged_categories: BTreeSet::new(),
            overall,
        }
    }

    #[test]
    fn test_clean_score_passes() {
        let verdict = evaluator().evaluate(&score(92.0, &[("ai_quality", 92.0)]), 0);
        assert!(verdict.passed());
        assert!(verdict.violations.is_empty());
    }

    #[test]
    fn test_critical_issue_fails_perfect_score() {
        let verdict = evaluator().evaluate(&score(100.0, &[("accessibility", 100.0)]), 1);
        assert!(!verdict.passed());
        assert_eq!(verdict.violations.len(), 1);
        assert!(matches!(
            verdict.violations[0].rule,
            ThresholdRule::CriticalIssueLimit { limit: 0, found: 1 }
        ));
    }

    #[test]
    fn test_all_violations_reported_in_rule_order() {
        let mut evaluator = evaluator();
        evaluator
            .category_minimums
            .insert("accessibility".to_string(), 85.0);
        let mut composite = score(40.0, &[("accessibility", 60.0), ("functionality", 0.0)]);
        composite.flagged_categories.insert("functionality".to_string());

        let verdict = evaluator.evaluate(&composite, 2);
        let kinds: Vec<_> = verdict
            .violations
            .iter()
            .map(|v| match &v.rule {
                ThresholdRule::CriticalIssueLimit { .. } => "critical",
                ThresholdRule::CategoryMinimum { .. } => "minimum",
                ThresholdRule::MissingCategory { .. } => "missing",
                ThresholdRule::OverallThreshold { .. } => "overall",
            })
            .collect();
        assert_eq!(kinds, vec!["critical", "minimum", "missing", "overall"]);
    }

    #[test]
    fn test_minimum_for_absent_category_is_skipped() {
        let mut evaluator = evaluator();
        evaluator.category_minimums.insert("ai_quality".to_string(), 85.0);
        let verdict = evaluator.evaluate(&score(90.0, &[("functionality", 90.0)]), 0);
        assert!(verdict.passed());
    }

    #[test]
    fn test_nan_scores_fail_closed() {
        let mut evaluator = evaluator();
        evaluator.category_minimums.insert("x".to_string(), 85.0);
        let verdict = evaluator.evaluate(&score(f64::NAN, &[("x", f64::NAN)]), 0);
        assert_eq!(verdict.violations.len(), 2);
        assert!(matches!(
            verdict.violations[0].rule,
            ThresholdRule::CategoryMinimum { .. }
        ));
        assert!(matches!(
            verdict.violations[1].rule,
            ThresholdRule::OverallThreshold { .. }
        ));
    }

    #[test]
    fn test_score_equal_to_threshold_passes() {
        let verdict = evaluator().evaluate(&score(85.0, &[("ui", 85.0)]), 0);
        assert!(verdict.passed());
    }

    #[test]
    fn test_rule_serde_is_tagged() {
        let rule = ThresholdRule::MissingCategory {
            category: "functionality".to_string(),
        };
        let json = serde_json::to_value(&rule).unwrap();
        assert_eq!(json["type"], "missing_category");
        assert_eq!(json["category"], "functionality");
    }
}
