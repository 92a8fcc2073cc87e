//! [`Value`]: the tagged scalar that fills one term of a [`super::Point`].

use std::cmp::Ordering;

/// One coordinate of a point: an integer, a real, or an enumerated string.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum Value {
    Int(i64),
    Real(f64),
    Enum(String),
}

impl Value {
    #[must_use]
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_real(&self) -> Option<f64> {
        match self {
            Self::Real(v) => Some(*v),
            Self::Int(v) => Some(*v as f64),
            Self::Enum(_) => None,
        }
    }

    #[must_use]
    pub fn as_enum(&self) -> Option<&str> {
        match self {
            Self::Enum(v) => Some(v.as_str()),
            _ => None,
        }
    }

    /// Ordering within a single dimension's legal values. Cross-tag
    /// comparisons (e.g. `Int` vs `Enum`) are a space-mismatch bug by
    /// construction, so they return `None` rather than an arbitrary answer.
    #[must_use]
    pub fn partial_cmp_same_tag(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Self::Int(a), Self::Int(b)) => Some(a.cmp(b)),
            (Self::Real(a), Self::Real(b)) => a.partial_cmp(b),
            (Self::Enum(a), Self::Enum(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{v}"),
            Self::Real(v) => write!(f, "{v}"),
            Self::Enum(v) => write!(f, "{v}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn as_real_widens_int() {
        assert_eq!(Value::Int(3).as_real(), Some(3.0));
    }

    #[test]
    fn cross_tag_compare_is_none() {
        assert_eq!(Value::Int(1).partial_cmp_same_tag(&Value::Real(1.0)), None);
    }

    #[test]
    fn same_tag_compare_orders() {
        assert_eq!(Value::Int(1).partial_cmp_same_tag(&Value::Int(2)), Some(Ordering::Less));
    }
}
