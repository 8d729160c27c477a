//! Errors raised while building probes.

/// Probe construction and lookup errors.
#[derive(Debug, thiserror::Error)]
pub enum ProbeError {
    #[error("unknown probe '{0}'")]
    UnknownProbe(String),

    #[error("unknown suite '{0}'; expected ai, ui or all")]
    UnknownSuite(String),

    #[error("invalid simulation profile for {probe}: {reason}")]
    InvalidProfile { probe: String, reason: String },
}

pub type Result<T> = std::result::Result<T, ProbeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(
            ProbeError::UnknownProbe("ghost".into()).to_string(),
            "unknown probe 'ghost'"
        );
        let err = ProbeError::InvalidProfile {
            probe: "nova_model".into(),
            reason: "min above max".into(),
        };
        assert!(err.to_string().contains("nova_model"));
    }
}
