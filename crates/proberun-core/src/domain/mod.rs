//! Domain model shared by every stage of a run.

pub mod config;
pub mod probe;
pub mod run;

pub use config::{RunConfig, TargetConfig};
pub use probe::{
    Issue, Probe, ProbeContext, ProbeDescriptor, ProbeFamily, ProbeOutput, ProbeResult, Severity,
    DEFAULT_SCORE_METRIC,
};
pub use run::{CompositeScore, RunResult, RunState, RunSummary, ThresholdSnapshot};
