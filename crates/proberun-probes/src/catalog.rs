//! Built-in probe catalog.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use proberun_core::{Probe, ProbeDescriptor, ProbeFamily};
use serde::{Deserialize, Serialize};

use crate::error::ProbeError;
use crate::simulated::{MetricRange, SimulatedProbe, SimulationProfile};

/// Built-in probes.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum BuiltinProbe {
    /// Generation quality of the chat model.
    NovaModel,

    /// Grammar, vocabulary and register of Japanese answers.
    JapaneseAccuracy,

    /// Token streaming latency and stability.
    StreamingResponse,

    /// Combined text and image understanding.
    MultimodalInput,

    /// Layout across device breakpoints.
    ResponsiveDesign,

    /// WebSocket chat delivery and typing indicators.
    RealtimeChat,

    /// Citation display for retrieved documents.
    DocumentSourceDisplay,

    /// WCAG 2.1 AA checks.
    Accessibility,
}

impl BuiltinProbe {
    pub const ALL: [BuiltinProbe; 8] = [
        BuiltinProbe::NovaModel,
        BuiltinProbe::JapaneseAccuracy,
        BuiltinProbe::StreamingResponse,
        BuiltinProbe::MultimodalInput,
        BuiltinProbe::ResponsiveDesign,
        BuiltinProbe::RealtimeChat,
        BuiltinProbe::DocumentSourceDisplay,
        BuiltinProbe::Accessibility,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            BuiltinProbe::NovaModel => "nova_model",
            BuiltinProbe::JapaneseAccuracy => "japanese_accuracy",
            BuiltinProbe::StreamingResponse => "streaming_response",
            BuiltinProbe::MultimodalInput => "multimodal_input",
            BuiltinProbe::ResponsiveDesign => "responsive_design",
            BuiltinProbe::RealtimeChat => "realtime_chat",
            BuiltinProbe::DocumentSourceDisplay => "document_source_display",
            BuiltinProbe::Accessibility => "accessibility",
        }
    }

    pub fn family(&self) -> ProbeFamily {
        match self {
            BuiltinProbe::NovaModel
            | BuiltinProbe::JapaneseAccuracy
            | BuiltinProbe::StreamingResponse
            | BuiltinProbe::MultimodalInput => ProbeFamily::Ai,
            _ => ProbeFamily::Ui,
        }
    }

    pub fn category(&self) -> &'static str {
        match self {
            BuiltinProbe::NovaModel
            | BuiltinProbe::JapaneseAccuracy
            | BuiltinProbe::StreamingResponse
            | BuiltinProbe::MultimodalInput => "ai_quality",
            BuiltinProbe::ResponsiveDesign => "user_experience",
            BuiltinProbe::RealtimeChat | BuiltinProbe::DocumentSourceDisplay => "functionality",
            BuiltinProbe::Accessibility => "accessibility",
        }
    }

    /// Weight within the probe's category.
    pub fn weight(&self) -> f64 {
        match self {
            BuiltinProbe::NovaModel | BuiltinProbe::JapaneseAccuracy => 0.3,
            BuiltinProbe::StreamingResponse | BuiltinProbe::MultimodalInput => 0.2,
            _ => 0.25,
        }
    }

    pub fn expected_latency(&self) -> Duration {
        let ms = match self {
            BuiltinProbe::NovaModel => 1200,
            BuiltinProbe::JapaneseAccuracy => 900,
            BuiltinProbe::StreamingResponse => 1500,
            BuiltinProbe::MultimodalInput => 2000,
            BuiltinProbe::ResponsiveDesign => 800,
            BuiltinProbe::RealtimeChat => 600,
            BuiltinProbe::DocumentSourceDisplay => 700,
            BuiltinProbe::Accessibility => 1000,
        };
        Duration::from_millis(ms)
    }

    /// Environment variable that toggles this probe, e.g. `INCLUDE_REALTIME_CHAT`.
    pub fn env_toggle(&self) -> String {
        format!("INCLUDE_{}", self.name().to_uppercase())
    }

    pub fn descriptor(&self) -> ProbeDescriptor {
        ProbeDescriptor::new(self.name(), self.family(), self.category(), self.weight())
            .with_expected_latency(self.expected_latency())
    }

    /// Sub-metric ranges and issue rates used by the simulated implementation.
    pub fn profile(&self) -> SimulationProfile {
        let ranges: &[(&str, f64, f64)] = match self {
            BuiltinProbe::NovaModel => &[
                ("accuracy", 80.0, 98.0),
                ("coherence", 82.0, 97.0),
                ("relevance", 80.0, 96.0),
                ("creativity", 70.0, 92.0),
            ],
            BuiltinProbe::JapaneseAccuracy => &[
                ("grammar", 80.0, 97.0),
                ("vocabulary", 82.0, 98.0),
                ("context", 78.0, 95.0),
                ("formality", 80.0, 96.0),
            ],
            BuiltinProbe::StreamingResponse => &[
                ("stream_stability", 85.0, 99.0),
                ("content_coherence", 80.0, 96.0),
                ("real_time", 75.0, 95.0),
            ],
            BuiltinProbe::MultimodalInput => &[
                ("text_accuracy", 85.0, 97.0),
                ("image_understanding", 75.0, 94.0),
                ("integration", 78.0, 95.0),
            ],
            BuiltinProbe::ResponsiveDesign => &[
                ("layout_consistency", 82.0, 98.0),
                ("performance", 75.0, 95.0),
                ("cross_device", 80.0, 97.0),
            ],
            BuiltinProbe::RealtimeChat => &[
                ("reliability", 85.0, 99.0),
                ("performance", 78.0, 96.0),
                ("user_experience", 80.0, 96.0),
            ],
            BuiltinProbe::DocumentSourceDisplay => &[
                ("attribution", 80.0, 97.0),
                ("citation_format", 85.0, 99.0),
                ("link_validity", 88.0, 100.0),
                ("relevance", 78.0, 95.0),
            ],
            BuiltinProbe::Accessibility => &[
                ("perceivable", 80.0, 98.0),
                ("operable", 82.0, 97.0),
                ("understandable", 85.0, 99.0),
                ("robust", 80.0, 96.0),
            ],
        };

        let (pass_bar, critical_rate, critical, remedy) = match self {
            BuiltinProbe::NovaModel => (
                85.0,
                0.02,
                "model returned an empty or truncated completion",
                "Check model quota and the inference endpoint health",
            ),
            BuiltinProbe::JapaneseAccuracy => (
                85.0,
                0.02,
                "answer switched to the wrong politeness register",
                "Pin the response register in the Japanese system prompt",
            ),
            BuiltinProbe::StreamingResponse => (
                80.0,
                0.03,
                "stream stalled before the final token",
                "Inspect the streaming proxy for buffering and idle timeouts",
            ),
            BuiltinProbe::MultimodalInput => (
                80.0,
                0.03,
                "image attachment was ignored by the model",
                "Verify image payloads reach the model with the expected encoding",
            ),
            BuiltinProbe::ResponsiveDesign => (
                85.0,
                0.02,
                "chat input is hidden below the fold on small screens",
                "Fix the mobile breakpoint so the chat input stays visible",
            ),
            BuiltinProbe::RealtimeChat => (
                85.0,
                0.03,
                "messages were lost after a WebSocket reconnect",
                "Replay undelivered messages when the socket reconnects",
            ),
            BuiltinProbe::DocumentSourceDisplay => (
                85.0,
                0.02,
                "citations link to documents the user cannot access",
                "Filter cited sources through the user's permissions",
            ),
            BuiltinProbe::Accessibility => (
                85.0,
                0.05,
                "keyboard focus is trapped in the chat input",
                "Make every interactive element reachable and escapable by keyboard",
            ),
        };

        SimulationProfile {
            metrics: ranges
                .iter()
                .map(|(name, min, max)| MetricRange::new(*name, *min, *max))
                .collect(),
            pass_bar,
            critical_rate,
            latency: self.expected_latency(),
            critical_issue: critical.to_string(),
            critical_recommendation: remedy.to_string(),
        }
    }
}

impl FromStr for BuiltinProbe {
    type Err = ProbeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BuiltinProbe::ALL
            .into_iter()
            .find(|p| p.name() == s)
            .ok_or_else(|| ProbeError::UnknownProbe(s.to_string()))
    }
}

impl fmt::Display for BuiltinProbe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Which probe families a run covers.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Suite {
    Ai,
    Ui,
    All,
}

impl Suite {
    pub fn families(&self) -> &'static [ProbeFamily] {
        match self {
            Suite::Ai => &[ProbeFamily::Ai],
            Suite::Ui => &[ProbeFamily::Ui],
            Suite::All => &[ProbeFamily::Ai, ProbeFamily::Ui],
        }
    }

    pub fn probes(&self) -> Vec<BuiltinProbe> {
        BuiltinProbe::ALL
            .into_iter()
            .filter(|p| self.families().contains(&p.family()))
            .collect()
    }

    /// Label used in report headers.
    pub fn test_type(&self) -> &'static str {
        match self {
            Suite::Ai => "AI integration",
            Suite::Ui => "UI integration",
            Suite::All => "Full integration",
        }
    }

    /// Category weights; every family shares the overall score equally.
    ///
    /// Within the UI family each of the four probes carries a quarter of
    /// the family score.
    pub fn category_weights(&self) -> BTreeMap<String, f64> {
        let share = 1.0 / self.families().len() as f64;
        let mut weights = BTreeMap::new();
        for family in self.families() {
            let family_weights: &[(&str, f64)] = match family {
                ProbeFamily::Ai => &[("ai_quality", 1.0)],
                ProbeFamily::Ui => &[
                    ("user_experience", 0.25),
                    ("functionality", 0.5),
                    ("accessibility", 0.25),
                ],
            };
            for (category, weight) in family_weights {
                weights.insert(category.to_string(), weight * share);
            }
        }
        weights
    }

    /// Default per-category floors. Tunable per run.
    pub fn category_minimums(&self) -> BTreeMap<String, f64> {
        let mut minimums = BTreeMap::new();
        if self.families().contains(&ProbeFamily::Ui) {
            minimums.insert("accessibility".to_string(), 85.0);
        }
        minimums
    }

    /// Simulated implementations of every probe in the suite.
    pub fn build_probes(&self) -> Vec<Arc<dyn Probe>> {
        self.probes()
            .into_iter()
            .map(|p| Arc::new(SimulatedProbe::builtin(p)) as Arc<dyn Probe>)
            .collect()
    }
}

impl FromStr for Suite {
    type Err = ProbeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "ai" => Ok(Suite::Ai),
            "ui" => Ok(Suite::Ui),
            "all" => Ok(Suite::All),
            _ => Err(ProbeError::UnknownSuite(s.to_string())),
        }
    }
}

impl fmt::Display for Suite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Suite::Ai => write!(f, "ai"),
            Suite::Ui => write!(f, "ui"),
            Suite::All => write!(f, "all"),
        }
    }
}
