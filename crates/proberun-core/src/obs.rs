//! Structured observability hooks for the run lifecycle.
//!
//! Every stage reports through these functions instead of printing, so
//! subscribers (and tests) see stable `event = "..."` keys:
//!
//! - `run.started` / `run.finished` / `run.rejected`
//! - `batch.started`
//! - `probe.finished` / `probe.failed` / `probe.timed_out`
//! - `score.aggregated` / `threshold.evaluated`
//! - `report.emitted` / `report.failed`
//! - `cleanup.failed`

use std::future::Future;

use tracing::instrument::Instrumented;
use tracing::{info, warn, Instrument};

/// Run-scoped tracing span; every event inside the run carries `run_id`.
///
/// ```ignore
/// let span = RunSpan::new("0b7c...");
/// span.instrument(async { /* events here are tagged */ }).await;
/// ```
#[derive(Debug, Clone)]
pub struct RunSpan {
    span: tracing::Span,
}

impl RunSpan {
    pub fn new(run_id: &str) -> Self {
        Self {
            span: tracing::info_span!("proberun.run", run_id = %run_id),
        }
    }

    /// Attach the span to `fut` so it is entered on every poll.
    pub fn instrument<F: Future>(self, fut: F) -> Instrumented<F> {
        fut.instrument(self.span)
    }
}

pub fn emit_run_started(run_id: &str, probe_count: usize, concurrency_limit: usize) {
    info!(
        event = "run.started",
        run_id = %run_id,
        probe_count = probe_count,
        concurrency_limit = concurrency_limit,
    );
}

pub fn emit_run_finished(run_id: &str, duration_ms: u64, success: bool, critical_issues: usize) {
    info!(
        event = "run.finished",
        run_id = %run_id,
        duration_ms = duration_ms,
        success = success,
        critical_issues = critical_issues,
    );
}

/// The run could not start or aborted before producing probe results.
pub fn emit_run_rejected(run_id: &str, reason: &dyn std::fmt::Display) {
    warn!(event = "run.rejected", run_id = %run_id, reason = %reason);
}

pub fn emit_batch_started(batch_index: usize, batch_size: usize) {
    info!(event = "batch.started", batch = batch_index, size = batch_size);
}

pub fn emit_probe_finished(probe: &str, success: bool, duration_ms: u64) {
    info!(
        event = "probe.finished",
        probe = %probe,
        success = success,
        duration_ms = duration_ms,
    );
}

pub fn emit_probe_failed(probe: &str, error: &dyn std::fmt::Display) {
    warn!(event = "probe.failed", probe = %probe, error = %error);
}

pub fn emit_probe_timed_out(probe: &str, timeout_ms: u64) {
    warn!(event = "probe.timed_out", probe = %probe, timeout_ms = timeout_ms);
}

pub fn emit_score_aggregated(overall: f64, categories: usize, flagged: usize) {
    info!(
        event = "score.aggregated",
        overall = overall,
        categories = categories,
        flagged = flagged,
    );
}

pub fn emit_threshold_evaluated(success: bool, violations: usize) {
    info!(
        event = "threshold.evaluated",
        success = success,
        violations = violations,
    );
}

pub fn emit_report_emitted(format: &str, path: &std::path::Path) {
    info!(event = "report.emitted", format = %format, path = %path.display());
}

pub fn emit_report_failed(format: &str, error: &dyn std::fmt::Display) {
    warn!(event = "report.failed", format = %format, error = %error);
}

pub fn emit_cleanup_failed(probe: &str, error: &dyn std::fmt::Display) {
    warn!(event = "cleanup.failed", probe = %probe, error = %error);
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_test::traced_test;

    #[tokio::test]
    #[traced_test]
    async fn test_run_span_tags_events() {
        RunSpan::new("run-span-7")
            .instrument(async { emit_batch_started(0, 2) })
            .await;
        assert!(logs_contain("batch.started"));
        assert!(logs_contain("run-span-7"));
    }

    #[traced_test]
    #[test]
    fn test_probe_failed_is_logged_with_probe_name() {
        emit_probe_failed("realtime_chat", &"socket closed");
        assert!(logs_contain("probe.failed"));
        assert!(logs_contain("realtime_chat"));
    }

    #[traced_test]
    #[test]
    fn test_run_finished_carries_verdict() {
        emit_run_finished("run-42", 1200, false, 3);
        assert!(logs_contain("run.finished"));
        assert!(logs_contain("critical_issues=3"));
    }
}
