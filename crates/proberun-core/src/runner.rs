//! The composition root for a run.
//!
//! [`Orchestrator::run_all`] resolves the enabled probes, drives the
//! [`BatchExecutor`], scores and judges the results, emits reports and then
//! cleans up every registered probe. It always returns a [`RunResult`]:
//! configuration and wiring errors, and even a panic inside the pipeline,
//! come back as a structured failure.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use futures::future::join_all;
use futures::FutureExt;
use uuid::Uuid;

use crate::domain::{
    Probe, ProbeContext, ProbeDescriptor, ProbeResult, RunConfig, RunResult, RunState, RunSummary,
    Severity, ThresholdSnapshot,
};
use crate::error::{OrchestraError, Result};
use crate::executor::BatchExecutor;
use crate::metrics::METRICS;
use crate::obs::{self, RunSpan};
use crate::recommendations;
use crate::report::{EmitOutcome, ReportEmitter, ReportSettings};
use crate::scoring::ScoreAggregator;
use crate::threshold::ThresholdEvaluator;

/// Label used in report headers unless overridden.
pub const DEFAULT_TEST_TYPE: &str = "Integration";

/// A finished run plus what happened to its reports.
#[derive(Debug)]
pub struct RunOutcome {
    pub result: RunResult,
    pub reports: Vec<EmitOutcome>,
}

/// Owns the probe set and runs it.
pub struct Orchestrator {
    probes: Vec<Arc<dyn Probe>>,
    aggregator: ScoreAggregator,
    reporting: Option<ReportSettings>,
    test_type: String,
    state: Mutex<RunState>,
}

impl Default for Orchestrator {
    fn default() -> Self {
        Self::new()
    }
}

impl Orchestrator {
    pub fn new() -> Self {
        Self {
            probes: Vec::new(),
            aggregator: ScoreAggregator::new(),
            reporting: None,
            test_type: DEFAULT_TEST_TYPE.to_string(),
            state: Mutex::new(RunState::Idle),
        }
    }

    /// Register a probe. Registration order is result order.
    pub fn with_probe(mut self, probe: Arc<dyn Probe>) -> Self {
        self.probes.push(probe);
        self
    }

    pub fn with_probes(mut self, probes: impl IntoIterator<Item = Arc<dyn Probe>>) -> Self {
        self.probes.extend(probes);
        self
    }

    pub fn with_category_weight(mut self, category: impl Into<String>, weight: f64) -> Self {
        self.aggregator = self.aggregator.with_category_weight(category, weight);
        self
    }

    pub fn with_category_weights(mut self, weights: BTreeMap<String, f64>) -> Self {
        self.aggregator = self.aggregator.with_category_weights(weights);
        self
    }

    /// Enable report emission after each run.
    pub fn with_reporting(mut self, settings: ReportSettings) -> Self {
        self.reporting = Some(settings);
        self
    }

    pub fn with_test_type(mut self, test_type: impl Into<String>) -> Self {
        self.test_type = test_type.into();
        self
    }

    /// Descriptors of every registered probe, in registration order.
    pub fn descriptors(&self) -> Vec<ProbeDescriptor> {
        self.probes.iter().map(|p| p.descriptor().clone()).collect()
    }

    pub fn state(&self) -> RunState {
        self.state
            .lock()
            .map(|state| *state)
            .unwrap_or(RunState::Idle)
    }

    /// Execute one full run and return its result.
    pub async fn run_all(&self, config: RunConfig) -> RunResult {
        self.run(config).await.result
    }

    /// Like [`run_all`](Self::run_all), also returning the report outcomes.
    pub async fn run(&self, config: RunConfig) -> RunOutcome {
        let run_id = Uuid::new_v4();
        RunSpan::new(&run_id.to_string())
            .instrument(self.run_in_span(run_id, config))
            .await
    }

    async fn run_in_span(&self, run_id: Uuid, config: RunConfig) -> RunOutcome {
        let started_at = Utc::now();
        let run_label = run_id.to_string();

        let _guard = match RunGuard::acquire(&self.state) {
            Ok(guard) => guard,
            Err(e) => {
                obs::emit_run_rejected(&run_label, &e);
                return RunOutcome {
                    result: RunResult::aborted(run_id, &config, started_at, e),
                    reports: Vec::new(),
                };
            }
        };

        let executed = AssertUnwindSafe(self.execute(run_id, started_at, &config))
            .catch_unwind()
            .await;
        let result = match executed {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => {
                obs::emit_run_rejected(&run_label, &e);
                RunResult::aborted(run_id, &config, started_at, e)
            }
            Err(_) => {
                let e = OrchestraError::Internal("run pipeline panicked".to_string());
                obs::emit_run_rejected(&run_label, &e);
                RunResult::aborted(run_id, &config, started_at, e)
            }
        };

        let reports = match &self.reporting {
            Some(settings) => {
                ReportEmitter::new(self.test_type.clone())
                    .emit(&result, &settings.formats, &settings.destination)
                    .await
            }
            None => Vec::new(),
        };

        self.cleanup().await;

        METRICS.flush();
        obs::emit_run_finished(
            &run_label,
            result.duration_ms(),
            result.success,
            result.critical_issue_count,
        );

        RunOutcome { result, reports }
    }

    /// Call `cleanup` on every registered probe concurrently.
    ///
    /// Failures are logged and returned; they never propagate.
    pub async fn cleanup(&self) -> Vec<OrchestraError> {
        let outcomes = join_all(self.probes.iter().map(|probe| async move {
            let name = &probe.descriptor().name;
            match AssertUnwindSafe(probe.cleanup()).catch_unwind().await {
                Ok(Ok(())) => None,
                Ok(Err(e)) => Some(OrchestraError::Cleanup {
                    probe: name.clone(),
                    reason: format!("{e:#}"),
                }),
                Err(_) => Some(OrchestraError::Cleanup {
                    probe: name.clone(),
                    reason: "cleanup panicked".to_string(),
                }),
            }
        }))
        .await;

        let failures: Vec<OrchestraError> = outcomes.into_iter().flatten().collect();
        for failure in &failures {
            if let OrchestraError::Cleanup { probe, reason } = failure {
                obs::emit_cleanup_failed(probe, reason);
            }
        }
        failures
    }

    /// Resolve the enabled probes, failing on unknown names or an empty set.
    fn resolve(&self, config: &RunConfig) -> Result<Vec<Arc<dyn Probe>>> {
        let mut seen = HashSet::new();
        for probe in &self.probes {
            let name = &probe.descriptor().name;
            if !seen.insert(name.as_str()) {
                return Err(OrchestraError::config(format!(
                    "probe '{name}' is registered more than once"
                )));
            }
        }

        if let Some(unknown) = config
            .enabled_probes
            .iter()
            .find(|name| !seen.contains(name.as_str()))
        {
            return Err(OrchestraError::config(format!(
                "unknown probe '{unknown}' enabled"
            )));
        }

        let enabled: Vec<_> = self
            .probes
            .iter()
            .filter(|p| config.enabled_probes.contains(&p.descriptor().name))
            .cloned()
            .collect();
        if enabled.is_empty() {
            return Err(OrchestraError::config("no probes enabled for this run"));
        }
        Ok(enabled)
    }

    async fn execute(
        &self,
        run_id: Uuid,
        started_at: DateTime<Utc>,
        config: &RunConfig,
    ) -> Result<RunResult> {
        config.validate()?;
        let enabled = self.resolve(config)?;
        self.aggregator
            .check_categories(&self.descriptors(), &config.category_minimums)?;
        let executor = BatchExecutor::from_config(config)?;

        let descriptors: Vec<ProbeDescriptor> =
            enabled.iter().map(|p| p.descriptor().clone()).collect();
        obs::emit_run_started(&run_id.to_string(), descriptors.len(), executor.limit());

        let by_name: HashMap<String, Arc<dyn Probe>> = enabled
            .iter()
            .map(|p| (p.descriptor().name.clone(), Arc::clone(p)))
            .collect();
        let ctx = ProbeContext {
            run_id,
            config: Arc::new(config.clone()),
        };

        let probe_results = executor
            .run(&descriptors, |descriptor| {
                let probe = by_name.get(&descriptor.name).cloned();
                let ctx = ctx.clone();
                async move {
                    let probe = probe.ok_or_else(|| {
                        anyhow::anyhow!("probe '{}' is not registered", descriptor.name)
                    })?;
                    let output = probe.run(&ctx).await?;
                    Ok(ProbeResult::from_output(&descriptor, output))
                }
            })
            .await;

        let composite_score = self.aggregator.aggregate(&descriptors, &probe_results)?;
        let critical_issue_count: usize = probe_results
            .iter()
            .map(|r| r.count_issues(Severity::Critical))
            .sum();
        let verdict =
            ThresholdEvaluator::from(config).evaluate(&composite_score, critical_issue_count);
        let recommendations = recommendations::synthesize(&verdict, &probe_results);

        let skipped_probes = self
            .probes
            .iter()
            .map(|p| &p.descriptor().name)
            .filter(|name| !config.enabled_probes.contains(*name))
            .cloned()
            .collect();

        let ended_at = Utc::now();
        let execution_time_ms = (ended_at - started_at).num_milliseconds().max(0) as u64;

        Ok(RunResult {
            run_id,
            summary: RunSummary::from_results(&probe_results, execution_time_ms),
            probe_results,
            skipped_probes,
            composite_score,
            success: verdict.passed(),
            critical_issue_count,
            violations: verdict.violations,
            recommendations,
            issues: Vec::new(),
            started_at,
            ended_at,
            target: config.target.clone(),
            thresholds: ThresholdSnapshot::from(config),
            config_digest: config.digest(),
            error: None,
        })
    }
}

/// Holds the orchestrator in `Running`; moves it to `Completed` on drop.
struct RunGuard<'a> {
    state: &'a Mutex<RunState>,
}

impl<'a> RunGuard<'a> {
    fn acquire(state: &'a Mutex<RunState>) -> Result<Self> {
        let mut current = state
            .lock()
            .map_err(|_| OrchestraError::Internal("run state lock poisoned".to_string()))?;
        if *current == RunState::Running {
            return Err(OrchestraError::AlreadyRunning);
        }
        *current = RunState::Running;
        Ok(Self { state })
    }
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        if let Ok(mut current) = self.state.lock() {
            *current = RunState::Completed;
        }
    }
}
