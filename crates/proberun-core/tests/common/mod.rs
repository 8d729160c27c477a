#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use proberun_core::{Issue, Probe, ProbeContext, ProbeDescriptor, ProbeFamily, ProbeOutput};

/// What a scripted probe does when run.
#[derive(Debug, Clone)]
pub enum Script {
    Score(f64),
    Fail(&'static str),
    Panic,
}

/// Probe whose behaviour is fixed up front.
pub struct ScriptedProbe {
    descriptor: ProbeDescriptor,
    script: Script,
    delay: Duration,
    issues: Vec<Issue>,
    cleanup_fails: bool,
    pub runs: Arc<AtomicUsize>,
    pub cleanups: Arc<AtomicUsize>,
}

impl ScriptedProbe {
    pub fn new(name: &str, category: &str, weight: f64, script: Script) -> Self {
        Self {
            descriptor: ProbeDescriptor::new(name, ProbeFamily::Ui, category, weight),
            script,
            delay: Duration::ZERO,
            issues: Vec::new(),
            cleanup_fails: false,
            runs: Arc::new(AtomicUsize::new(0)),
            cleanups: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn expecting(mut self, latency: Duration) -> Self {
        self.descriptor = self.descriptor.with_expected_latency(latency);
        self
    }

    pub fn with_issue(mut self, issue: Issue) -> Self {
        self.issues.push(issue);
        self
    }

    pub fn failing_cleanup(mut self) -> Self {
        self.cleanup_fails = true;
        self
    }

    pub fn shared(self) -> Arc<dyn Probe> {
        Arc::new(self)
    }
}

#[async_trait]
impl Probe for ScriptedProbe {
    fn descriptor(&self) -> &ProbeDescriptor {
        &self.descriptor
    }

    async fn run(&self, _ctx: &ProbeContext) -> anyhow::Result<ProbeOutput> {
        self.runs.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        match &self.script {
            Script::Score(score) => {
                let mut output = ProbeOutput::passed().with_metric("score", *score);
                for issue in &self.issues {
                    output = output.with_issue(issue.clone());
                }
                Ok(output)
            }
            Script::Fail(reason) => anyhow::bail!("{reason}"),
            Script::Panic => panic!("scripted panic in {}", self.descriptor.name),
        }
    }

    async fn cleanup(&self) -> anyhow::Result<()> {
        self.cleanups.fetch_add(1, Ordering::SeqCst);
        if self.cleanup_fails {
            anyhow::bail!("resource already released");
        }
        Ok(())
    }
}
