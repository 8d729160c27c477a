//! Batched, failure-isolating probe execution.
//!
//! Probes are partitioned into sequential batches of `limit`. Every probe in
//! a batch is spawned on its own task, wrapped in its timeout, and the batch
//! settles completely before the next one starts. Errors, panics and
//! timeouts come back as failed [`ProbeResult`]s in the probe's position.

use std::future::Future;
use std::time::Duration;

use futures::future::join_all;
use tokio::task::JoinError;
use tokio::time::Instant;
use tracing::instrument;

use crate::domain::{ProbeDescriptor, ProbeResult, RunConfig};
use crate::error::{OrchestraError, Result};
use crate::metrics::METRICS;
use crate::obs;

/// Runs probe invocations with a concurrency ceiling.
#[derive(Debug, Clone)]
pub struct BatchExecutor {
    limit: usize,
    batch_delay: Option<Duration>,
    timeout_multiplier: f64,
}

/// How one spawned invocation ended.
enum Settled {
    Completed(anyhow::Result<ProbeResult>),
    TimedOut(Duration),
}

impl BatchExecutor {
    /// A limit of zero is rejected before anything runs.
    pub fn new(limit: usize) -> Result<Self> {
        if limit == 0 {
            return Err(OrchestraError::config(
                "concurrency limit must be at least 1",
            ));
        }
        Ok(Self {
            limit,
            batch_delay: None,
            timeout_multiplier: 2.0,
        })
    }

    pub fn from_config(config: &RunConfig) -> Result<Self> {
        Ok(Self::new(config.concurrency_limit)?
            .with_batch_delay(config.batch_delay())
            .with_timeout_multiplier(config.timeout_multiplier))
    }

    /// Pause inserted between consecutive batches.
    pub fn with_batch_delay(mut self, delay: Option<Duration>) -> Self {
        self.batch_delay = delay;
        self
    }

    pub fn with_timeout_multiplier(mut self, multiplier: f64) -> Self {
        self.timeout_multiplier = multiplier;
        self
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Execute `invoke` once per descriptor and return the results in input order.
    ///
    /// `invoke` is called on the current task to build each future; the future
    /// itself runs on a spawned task so a panic stays contained.
    #[instrument(skip_all, fields(probes = probes.len(), limit = self.limit))]
    pub async fn run<F, Fut>(&self, probes: &[ProbeDescriptor], invoke: F) -> Vec<ProbeResult>
    where
        F: Fn(ProbeDescriptor) -> Fut,
        Fut: Future<Output = anyhow::Result<ProbeResult>> + Send + 'static,
    {
        let mut results = Vec::with_capacity(probes.len());
        let batch_count = probes.len().div_ceil(self.limit);

        for (index, batch) in probes.chunks(self.limit).enumerate() {
            obs::emit_batch_started(index, batch.len());

            let handles: Vec<_> = batch
                .iter()
                .map(|descriptor| {
                    let fut = invoke(descriptor.clone());
                    let timeout = descriptor.timeout(self.timeout_multiplier);
                    tokio::spawn(async move {
                        let started = Instant::now();
                        let settled = match timeout {
                            Some(limit) => match tokio::time::timeout(limit, fut).await {
                                Ok(outcome) => Settled::Completed(outcome),
                                Err(_) => Settled::TimedOut(limit),
                            },
                            None => Settled::Completed(fut.await),
                        };
                        (settled, started.elapsed())
                    })
                })
                .collect();

            let joined = join_all(handles).await;
            for (descriptor, outcome) in batch.iter().zip(joined) {
                results.push(settle(descriptor, outcome));
            }

            if index + 1 < batch_count {
                if let Some(delay) = self.batch_delay {
                    tokio::time::sleep(delay).await;
                }
            }
        }

        results
    }
}

fn settle(
    descriptor: &ProbeDescriptor,
    outcome: std::result::Result<(Settled, Duration), JoinError>,
) -> ProbeResult {
    METRICS.inc_probes_executed();

    let result = match outcome {
        Ok((Settled::Completed(Ok(mut result)), elapsed)) => {
            if result.duration_ms == 0 {
                result.duration_ms = elapsed.as_millis() as u64;
            }
            result
        }
        Ok((Settled::Completed(Err(e)), elapsed)) => {
            METRICS.inc_probe_failures();
            obs::emit_probe_failed(&descriptor.name, &e);
            ProbeResult::failed(
                descriptor,
                format!("probe '{}' failed: {e:#}", descriptor.name),
                elapsed.as_millis() as u64,
            )
        }
        Ok((Settled::TimedOut(limit), elapsed)) => {
            METRICS.inc_probe_timeouts();
            obs::emit_probe_timed_out(&descriptor.name, limit.as_millis() as u64);
            ProbeResult::failed(
                descriptor,
                format!(
                    "probe '{}' timed out after {}ms",
                    descriptor.name,
                    limit.as_millis()
                ),
                elapsed.as_millis() as u64,
            )
        }
        Err(join_err) => {
            METRICS.inc_probe_failures();
            obs::emit_probe_failed(&descriptor.name, &join_err);
            let reason = if join_err.is_panic() {
                "panicked"
            } else {
                "was cancelled"
            };
            ProbeResult::failed(
                descriptor,
                format!("probe '{}' {reason}", descriptor.name),
                0,
            )
        }
    };

    obs::emit_probe_finished(&result.probe_name, result.success, result.duration_ms);
    result
}
