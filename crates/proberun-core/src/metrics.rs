//! Process-wide run counters.
//!
//! Incremented at the call site without locking; [`Metrics::flush`] emits
//! the current values as one `tracing::info!` event at the end of a run.

use std::sync::atomic::{AtomicU64, Ordering};

/// Global metrics singleton.
pub static METRICS: Metrics = Metrics::new();

pub struct Metrics {
    probes_executed: AtomicU64,
    probe_failures: AtomicU64,
    probe_timeouts: AtomicU64,
    report_failures: AtomicU64,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub const fn new() -> Self {
        Self {
            probes_executed: AtomicU64::new(0),
            probe_failures: AtomicU64::new(0),
            probe_timeouts: AtomicU64::new(0),
            report_failures: AtomicU64::new(0),
        }
    }

    pub fn inc_probes_executed(&self) {
        self.probes_executed.fetch_add(1, Ordering::Relaxed);
    }

    /// Errored or panicked probes. Timeouts are counted separately.
    pub fn inc_probe_failures(&self) {
        self.probe_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_probe_timeouts(&self) {
        self.probe_timeouts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_report_failures(&self) {
        self.report_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn flush(&self) {
        tracing::info!(
            metric = "flush",
            probes_executed = self.probes_executed(),
            probe_failures = self.probe_failures(),
            probe_timeouts = self.probe_timeouts(),
            report_failures = self.report_failures(),
        );
    }

    pub fn probes_executed(&self) -> u64 {
        self.probes_executed.load(Ordering::Relaxed)
    }

    pub fn probe_failures(&self) -> u64 {
        self.probe_failures.load(Ordering::Relaxed)
    }

    pub fn probe_timeouts(&self) -> u64 {
        self.probe_timeouts.load(Ordering::Relaxed)
    }

    pub fn report_failures(&self) -> u64 {
        self.report_failures.load(Ordering::Relaxed)
    }

    /// Reset all counters to zero (useful in tests).
    pub fn reset(&self) {
        self.probes_executed.store(0, Ordering::Relaxed);
        self.probe_failures.store(0, Ordering::Relaxed);
        self.probe_timeouts.store(0, Ordering::Relaxed);
        self.report_failures.store(0, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_increment() {
        let m = Metrics::new();
        m.inc_probes_executed();
        m.inc_probes_executed();
        m.inc_probe_failures();
        m.inc_probe_timeouts();
        m.inc_report_failures();
        assert_eq!(m.probes_executed(), 2);
        assert_eq!(m.probe_failures(), 1);
        assert_eq!(m.probe_timeouts(), 1);
        assert_eq!(m.report_failures(), 1);
    }

    #[test]
    fn reset_zeroes_all() {
        let m = Metrics::new();
        m.inc_probes_executed();
        m.inc_probe_timeouts();
        m.reset();
        assert_eq!(m.probes_executed(), 0);
        assert_eq!(m.probe_timeouts(), 0);
    }
}
