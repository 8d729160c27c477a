//! proberun core library
//!
//! Runs a set of independent quality probes with bounded concurrency, folds
//! their metrics into weighted category and overall scores, judges the score
//! against thresholds and hard floors, and renders the outcome as reports.

pub mod domain;
pub mod error;
pub mod executor;
pub mod metrics;
pub mod obs;
pub mod recommendations;
pub mod report;
pub mod runner;
pub mod scoring;
pub mod telemetry;
pub mod threshold;

pub use domain::{
    CompositeScore, Issue, Probe, ProbeContext, ProbeDescriptor, ProbeFamily, ProbeOutput,
    ProbeResult, RunConfig, RunResult, RunState, RunSummary, Severity, TargetConfig,
    ThresholdSnapshot, DEFAULT_SCORE_METRIC,
};
pub use error::{OrchestraError, Result};
pub use executor::BatchExecutor;
pub use metrics::METRICS;
pub use obs::RunSpan;
pub use report::{EmitOutcome, ReportEmitter, ReportFormat, ReportMetadata, ReportSettings};
pub use runner::{Orchestrator, RunOutcome};
pub use scoring::ScoreAggregator;
pub use telemetry::init_tracing;
pub use threshold::{ThresholdEvaluator, ThresholdRule, ThresholdVerdict, Violation};

/// Crate version recorded in report metadata.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
