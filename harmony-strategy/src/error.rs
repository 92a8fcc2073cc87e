//! Error type for the strategy layer.

use std::fmt;

use harmony_model::ModelError;

/// Failures a strategy can raise. Strategy errors at `init` abort session
/// startup; errors from any other operation are surfaced to the current
/// client request (see the session core's error-propagation rules) without
/// tearing down the session.
#[derive(Debug, Clone, PartialEq)]
pub enum StrategyError {
    /// The underlying data model rejected an operation (e.g. an out-of-grid
    /// point, or a space/point length mismatch).
    Model(ModelError),
    /// A required configuration key was missing or malformed.
    Config { detail: String },
    /// The strategy's internal state machine reached a condition it cannot
    /// recover from gracefully (e.g. a report for an id never generated by
    /// this strategy's own counter, or a simplex with mismatched dimensionality).
    Internal { detail: String },
}

impl fmt::Display for StrategyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Model(e) => write!(f, "{e}"),
            Self::Config { detail } => write!(f, "strategy configuration error: {detail}"),
            Self::Internal { detail } => write!(f, "strategy internal error: {detail}"),
        }
    }
}

impl std::error::Error for StrategyError {}

impl From<ModelError> for StrategyError {
    fn from(e: ModelError) -> Self {
        Self::Model(e)
    }
}
