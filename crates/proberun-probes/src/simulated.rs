//! Simulated probes that sample sub-metrics from fixed ranges.
//!
//! A run seed makes every probe deterministic; each probe mixes its own
//! name into the seed so probes do not share a sample stream.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use proberun_core::{Issue, Probe, ProbeContext, ProbeDescriptor, ProbeOutput, DEFAULT_SCORE_METRIC};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tracing::debug;

use crate::catalog::BuiltinProbe;
use crate::error::{ProbeError, Result};

/// Inclusive sampling range for one sub-metric.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MetricRange {
    pub name: String,
    pub min: f64,
    pub max: f64,
}

impl MetricRange {
    pub fn new(name: impl Into<String>, min: f64, max: f64) -> Self {
        Self {
            name: name.into(),
            min,
            max,
        }
    }
}

/// How a simulated probe behaves.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SimulationProfile {
    pub metrics: Vec<MetricRange>,

    /// Score at or above which the probe counts as passed.
    pub pass_bar: f64,

    /// Probability (0..1) of raising the critical issue on a run.
    pub critical_rate: f64,

    pub latency: Duration,

    pub critical_issue: String,
    pub critical_recommendation: String,
}

impl SimulationProfile {
    pub fn validate(&self, probe: &str) -> Result<()> {
        let invalid = |reason: String| ProbeError::InvalidProfile {
            probe: probe.to_string(),
            reason,
        };
        if self.metrics.is_empty() {
            return Err(invalid("no metrics to sample".to_string()));
        }
        for m in &self.metrics {
            if !(0.0..=100.0).contains(&m.min) || !(0.0..=100.0).contains(&m.max) || m.min > m.max {
                return Err(invalid(format!(
                    "metric '{}' range {}..{} is not within 0..=100",
                    m.name, m.min, m.max
                )));
            }
        }
        if !(0.0..=1.0).contains(&self.critical_rate) {
            return Err(invalid(format!(
                "critical rate {} is not a probability",
                self.critical_rate
            )));
        }
        if !(0.0..=100.0).contains(&self.pass_bar) {
            return Err(invalid(format!("pass bar {} is out of range", self.pass_bar)));
        }
        Ok(())
    }
}

/// Probe that fabricates plausible measurements from a [`SimulationProfile`].
#[derive(Debug, Clone)]
pub struct SimulatedProbe {
    descriptor: ProbeDescriptor,
    profile: SimulationProfile,
}

impl SimulatedProbe {
    pub fn new(descriptor: ProbeDescriptor, profile: SimulationProfile) -> Result<Self> {
        profile.validate(&descriptor.name)?;
        Ok(Self {
            descriptor,
            profile,
        })
    }

    pub fn builtin(probe: BuiltinProbe) -> Self {
        Self {
            descriptor: probe.descriptor(),
            profile: probe.profile(),
        }
    }

    pub fn profile(&self) -> &SimulationProfile {
        &self.profile
    }

    fn rng(&self, seed: Option<u64>) -> StdRng {
        match seed {
            Some(seed) => StdRng::seed_from_u64(seed ^ name_hash(&self.descriptor.name)),
            None => StdRng::from_entropy(),
        }
    }

    /// Draw one measurement. Pure given the rng state.
    fn sample(&self, rng: &mut StdRng) -> ProbeOutput {
        let mut metrics = BTreeMap::new();
        for range in &self.profile.metrics {
            let value = if range.min == range.max {
                range.min
            } else {
                rng.gen_range(range.min..=range.max)
            };
            metrics.insert(range.name.clone(), round1(value));
        }
        let score = round1(metrics.values().sum::<f64>() / metrics.len() as f64);

        let mut issues = Vec::new();
        for (name, value) in &metrics {
            if *value < self.profile.pass_bar {
                issues.push(Issue::minor(
                    format!("{name} measured {value:.1}, below {:.1}", self.profile.pass_bar),
                    format!("Investigate the {name} regression"),
                ));
            }
        }
        if score < self.profile.pass_bar {
            issues.push(Issue::major(
                format!(
                    "{} scored {score:.1}, below the {:.1} pass bar",
                    self.descriptor.name, self.profile.pass_bar
                ),
                format!("Review recent changes affecting {}", self.descriptor.name),
            ));
        }
        let critical = rng.gen_bool(self.profile.critical_rate);
        if critical {
            issues.push(Issue::critical(
                self.profile.critical_issue.clone(),
                self.profile.critical_recommendation.clone(),
            ));
        }

        metrics.insert(DEFAULT_SCORE_METRIC.to_string(), score);
        ProbeOutput {
            success: score >= self.profile.pass_bar && !critical,
            metrics,
            issues,
            duration_ms: 0,
        }
    }
}

#[async_trait]
impl Probe for SimulatedProbe {
    fn descriptor(&self) -> &ProbeDescriptor {
        &self.descriptor
    }

    async fn run(&self, ctx: &ProbeContext) -> anyhow::Result<ProbeOutput> {
        let started = Instant::now();
        let output = {
            let mut rng = self.rng(ctx.config.seed);
            self.sample(&mut rng)
        };
        debug!(
            probe = %self.descriptor.name,
            target = %ctx.config.target.base_url,
            "simulating probe"
        );
        tokio::time::sleep(self.profile.latency).await;
        Ok(output.with_duration_ms(started.elapsed().as_millis() as u64))
    }

    async fn cleanup(&self) -> anyhow::Result<()> {
        debug!(probe = %self.descriptor.name, "released simulated resources");
        Ok(())
    }
}

/// FNV-1a; stable across platforms and releases.
fn name_hash(name: &str) -> u64 {
    name.bytes().fold(0xcbf2_9ce4_8422_2325, |hash, b| {
        (hash ^ u64::from(b)).wrapping_mul(0x0100_0000_01b3)
    })
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use proberun_core::{ProbeFamily, RunConfig, Severity};
    use std::sync::Arc;
    use uuid::Uuid;

    fn ctx(seed: Option<u64>) -> ProbeContext {
        ProbeContext {
            run_id: Uuid::new_v4(),
            config: Arc::new(RunConfig {
                seed,
                ..RunConfig::default()
            }),
        }
    }

    fn fixed_profile(value: f64, critical_rate: f64) -> SimulationProfile {
        SimulationProfile {
            metrics: vec![MetricRange::new("a", value, value), MetricRange::new("b", value, value)],
            pass_bar: 85.0,
            critical_rate,
            latency: Duration::from_millis(10),
            critical_issue: "broken".into(),
            critical_recommendation: "fix it".into(),
        }
    }

    fn descriptor() -> ProbeDescriptor {
        ProbeDescriptor::new("sim", ProbeFamily::Ui, "functionality", 1.0)
    }

    #[tokio::test(start_paused = true)]
    async fn test_seeded_runs_repeat() {
        let probe = SimulatedProbe::builtin(BuiltinProbe::NovaModel);
        let a = probe.run(&ctx(Some(7))).await.unwrap();
        let b = probe.run(&ctx(Some(7))).await.unwrap();
        assert_eq!(a.metrics, b.metrics);
        assert_eq!(a.issues, b.issues);
        assert_eq!(a.success, b.success);
    }

    #[tokio::test(start_paused = true)]
    async fn test_probes_do_not_share_streams() {
        let nova = SimulatedProbe::builtin(BuiltinProbe::NovaModel);
        let a11y = SimulatedProbe::builtin(BuiltinProbe::Accessibility);
        assert_ne!(nova.rng(Some(1)).gen::<u64>(), a11y.rng(Some(1)).gen::<u64>());
    }

    #[tokio::test(start_paused = true)]
    async fn test_score_is_mean_within_ranges() {
        let probe = SimulatedProbe::builtin(BuiltinProbe::Accessibility);
        let out = probe.run(&ctx(Some(42))).await.unwrap();
        let score = out.metrics[DEFAULT_SCORE_METRIC];
        for range in &probe.profile().metrics {
            let v = out.metrics[&range.name];
            assert!(v >= range.min - 0.05 && v <= range.max + 0.05, "{} = {v}", range.name);
        }
        assert!((80.0..=99.0).contains(&score));
    }

    #[tokio::test(start_paused = true)]
    async fn test_low_score_fails_with_major_issue() {
        let probe = SimulatedProbe::new(descriptor(), fixed_profile(70.0, 0.0)).unwrap();
        let out = probe.run(&ctx(Some(3))).await.unwrap();
        assert!(!out.success);
        assert_eq!(out.metrics[DEFAULT_SCORE_METRIC], 70.0);
        assert!(out.issues.iter().any(|i| i.severity == Severity::Major));
        assert_eq!(out.issues.iter().filter(|i| i.severity == Severity::Minor).count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_certain_critical_issue() {
        let probe = SimulatedProbe::new(descriptor(), fixed_profile(95.0, 1.0)).unwrap();
        let out = probe.run(&ctx(None)).await.unwrap();
        assert!(!out.success);
        assert_eq!(out.metrics[DEFAULT_SCORE_METRIC], 95.0);
        assert_eq!(out.issues.len(), 1);
        assert_eq!(out.issues[0].severity, Severity::Critical);
        assert_eq!(out.issues[0].recommendation, "fix it");
    }

    #[tokio::test(start_paused = true)]
    async fn test_latency_is_reported() {
        let probe = SimulatedProbe::new(descriptor(), fixed_profile(95.0, 0.0)).unwrap();
        let out = probe.run(&ctx(Some(1))).await.unwrap();
        assert!(out.success);
        assert!(out.duration_ms >= 10);
    }

    #[test]
    fn test_invalid_profiles_rejected() {
        let mut profile = fixed_profile(90.0, 0.0);
        profile.metrics[0] = MetricRange::new("a", 95.0, 90.0);
        assert!(SimulatedProbe::new(descriptor(), profile).is_err());

        let profile = fixed_profile(90.0, 1.5);
        let err = SimulatedProbe::new(descriptor(), profile).unwrap_err();
        assert!(err.to_string().contains("probability"));

        let mut profile = fixed_profile(90.0, 0.0);
        profile.metrics.clear();
        assert!(SimulatedProbe::new(descriptor(), profile).is_err());
    }

    #[test]
    fn test_name_hash_stable() {
        assert_eq!(name_hash(""), 0xcbf2_9ce4_8422_2325);
        assert_ne!(name_hash("nova_model"), name_hash("accessibility"));
    }
}
