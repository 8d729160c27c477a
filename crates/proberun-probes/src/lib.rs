//! Built-in probe families for proberun.
//!
//! The AI family checks model output quality; the UI family checks the chat
//! front end. Both ship as simulated probes whose samples are reproducible
//! under a run seed.

pub mod catalog;
pub mod error;
pub mod simulated;

pub use catalog::{BuiltinProbe, Suite};
pub use error::{ProbeError, Result};
pub use simulated::{MetricRange, SimulatedProbe, SimulationProfile};
