//! Error type for the session layer, composed from the layers beneath it.

use std::fmt;

use harmony_model::ModelError;
use harmony_strategy::StrategyError;

/// Failures the session core can raise. Config and space errors abort
/// session startup; per-request errors set a FAIL response but leave the
/// session running, unless the error is `StrategyInternal` or a stage's
/// `fini` fails (both fatal, per the pipeline's stage-fault rule).
#[derive(Debug, Clone, PartialEq)]
pub enum SessionError {
    Model(ModelError),
    Strategy(StrategyError),
    /// A configuration key was missing or held an out-of-range value.
    ConfigInvalid { detail: String },
    /// A point's term count or kind disagreed with the session's space.
    SpaceMismatch { detail: String },
    /// A request named a trial id the session never issued. REPORT treats
    /// this as a no-op; KILL treats it as a failure.
    UnknownId { id: u32 },
    /// The strategy's own state machine violated an invariant; fatal to the
    /// session.
    StrategyInternal { detail: String },
    /// A pipeline stage's `init`/`join`/`fini` failed.
    StageFault { stage: String, detail: String },
    /// Allocation or IO failure outside the strategy/pipeline's own errors.
    Resource { detail: String },
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Model(e) => write!(f, "{e}"),
            Self::Strategy(e) => write!(f, "{e}"),
            Self::ConfigInvalid { detail } => write!(f, "invalid session configuration: {detail}"),
            Self::SpaceMismatch { detail } => write!(f, "point/space mismatch: {detail}"),
            Self::UnknownId { id } => write!(f, "unknown trial id {id}"),
            Self::StrategyInternal { detail } => write!(f, "strategy internal error: {detail}"),
            Self::StageFault { stage, detail } => write!(f, "stage '{stage}' failed: {detail}"),
            Self::Resource { detail } => write!(f, "resource error: {detail}"),
        }
    }
}

impl std::error::Error for SessionError {}

impl From<ModelError> for SessionError {
    fn from(e: ModelError) -> Self {
        Self::Model(e)
    }
}

impl From<StrategyError> for SessionError {
    fn from(e: StrategyError) -> Self {
        match e {
            StrategyError::Internal { detail } => Self::StrategyInternal { detail },
            other => Self::Strategy(other),
        }
    }
}

impl SessionError {
    /// `true` for errors the session core treats as fatal (abort the
    /// session) rather than as a per-request FAIL.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::StrategyInternal { .. } | Self::StageFault { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strategy_internal_is_fatal() {
        let e: SessionError = StrategyError::Internal { detail: "boom".into() }.into();
        assert!(matches!(e, SessionError::StrategyInternal { .. }));
        assert!(e.is_fatal());
    }

    #[test]
    fn strategy_config_is_not_fatal() {
        let e: SessionError = StrategyError::Config { detail: "bad".into() }.into();
        assert!(!e.is_fatal());
    }

    #[test]
    fn stage_fault_is_fatal() {
        let e = SessionError::StageFault { stage: "cache".into(), detail: "disk full".into() };
        assert!(e.is_fatal());
    }
}
