//! Error type for the data model layer.

use std::fmt;

/// Failures that can arise from configuration, space, or point operations.
#[derive(Debug, Clone, PartialEq)]
pub enum ModelError {
    /// A configuration key was requested but neither set nor registered with a default.
    ConfigMissing { key: String },
    /// A configuration value could not be parsed as the requested type.
    ConfigInvalid { key: String, raw: String, want: &'static str },
    /// A dimension failed its own invariants (e.g. `min > max`, non-positive step).
    DimensionInvalid { detail: String },
    /// A point's term count or type disagreed with the space it was checked against.
    SpaceMismatch { detail: String },
    /// `point_parse` could not make sense of its input.
    ParseFailed { detail: String },
}

impl fmt::Display for ModelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConfigMissing { key } => write!(f, "config key '{key}' has no value or default"),
            Self::ConfigInvalid { key, raw, want } => {
                write!(f, "config key '{key}' = '{raw}' is not a valid {want}")
            }
            Self::DimensionInvalid { detail } => write!(f, "invalid dimension: {detail}"),
            Self::SpaceMismatch { detail } => write!(f, "space mismatch: {detail}"),
            Self::ParseFailed { detail } => write!(f, "parse failed: {detail}"),
        }
    }
}

impl std::error::Error for ModelError {}
