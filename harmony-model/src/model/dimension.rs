//! [`Dimension`]: one axis of a [`super::Space`].

use rand::Rng;

use super::value::Value;
use crate::error::ModelError;

/// One tunable axis: a bounded integer range, a bounded real range, or an
/// enumerated set of strings.
#[derive(Debug, Clone, PartialEq)]
pub enum Dimension {
    Integer { name: String, min: i64, max: i64, step: i64 },
    Real { name: String, min: f64, max: f64 },
    Enum { name: String, values: Vec<String> },
}

impl Dimension {
    /// # Errors
    ///
    /// Returns [`ModelError::DimensionInvalid`] if `min > max` or `step <= 0`.
    pub fn integer(name: impl Into<String>, min: i64, max: i64, step: i64) -> Result<Self, ModelError> {
        if min > max {
            return Err(ModelError::DimensionInvalid { detail: "integer dimension min > max".into() });
        }
        if step <= 0 {
            return Err(ModelError::DimensionInvalid { detail: "integer dimension step must be positive".into() });
        }
        Ok(Self::Integer { name: name.into(), min, max, step })
    }

    /// # Errors
    ///
    /// Returns [`ModelError::DimensionInvalid`] if `min > max`.
    pub fn real(name: impl Into<String>, min: f64, max: f64) -> Result<Self, ModelError> {
        if min > max {
            return Err(ModelError::DimensionInvalid { detail: "real dimension min > max".into() });
        }
        Ok(Self::Real { name: name.into(), min, max })
    }

    /// # Errors
    ///
    /// Returns [`ModelError::DimensionInvalid`] if `values` is empty.
    pub fn enumerated(name: impl Into<String>, values: Vec<String>) -> Result<Self, ModelError> {
        if values.is_empty() {
            return Err(ModelError::DimensionInvalid { detail: "enum dimension needs at least one value".into() });
        }
        Ok(Self::Enum { name: name.into(), values })
    }

    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Integer { name, .. } | Self::Real { name, .. } | Self::Enum { name, .. } => name,
        }
    }

    /// `true` for dimensions with a countable set of legal values.
    #[must_use]
    pub fn is_finite(&self) -> bool {
        !matches!(self, Self::Real { .. })
    }

    /// Number of legal values. Panics (invariant violation, not user error)
    /// if called on a real dimension; callers must check [`Self::is_finite`].
    #[must_use]
    pub fn limit(&self) -> u64 {
        match self {
            Self::Integer { min, max, step, .. } => ((max - min) / step) as u64 + 1,
            Self::Enum { values, .. } => values.len() as u64,
            Self::Real { .. } => panic!("limit() called on an infinite dimension"),
        }
    }

    /// Map a legal index in `[0, limit())` to its value.
    #[must_use]
    pub fn value(&self, index: u64) -> Value {
        match self {
            Self::Integer { min, step, .. } => Value::Int(min + (index as i64) * step),
            Self::Enum { values, .. } => Value::Enum(values[index as usize].clone()),
            Self::Real { .. } => panic!("value(index) called on an infinite dimension"),
        }
    }

    /// Map a value back to its index. Returns `None` if the value is not a
    /// legal grid point.
    #[must_use]
    pub fn index(&self, v: &Value) -> Option<u64> {
        match (self, v) {
            (Self::Integer { min, max, step, .. }, Value::Int(x)) => {
                if x < min || x > max || (x - min) % step != 0 {
                    None
                } else {
                    Some(((x - min) / step) as u64)
                }
            }
            (Self::Enum { values, .. }, Value::Enum(s)) => values.iter().position(|v| v == s).map(|i| i as u64),
            _ => None,
        }
    }

    /// Draw a uniformly random legal value.
    pub fn random<R: Rng + ?Sized>(&self, rng: &mut R) -> Value {
        match self {
            Self::Integer { min, step, .. } => {
                let n = self.limit();
                let i = rng.random_range(0..n);
                Value::Int(min + (i as i64) * step)
            }
            Self::Real { min, max, .. } => Value::Real(rng.random_range(*min..=*max)),
            Self::Enum { values, .. } => {
                let i = rng.random_range(0..values.len());
                Value::Enum(values[i].clone())
            }
        }
    }

    /// Snap an arbitrary value onto this dimension's nearest legal grid
    /// point. Integers round to the nearest step and clamp to range; reals
    /// clamp to range; enums require an exact match.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::SpaceMismatch`] if `v` is an enum value not in
    /// this dimension's set, or if the value's tag does not match the
    /// dimension's kind.
    pub fn align(&self, v: &Value) -> Result<Value, ModelError> {
        match self {
            Self::Integer { min, max, step, .. } => {
                let x = match v {
                    Value::Int(x) => *x,
                    Value::Real(r) => r.round() as i64,
                    Value::Enum(_) => {
                        return Err(ModelError::SpaceMismatch { detail: "enum value does not fit an integer dimension".into() });
                    }
                };
                let clamped = x.clamp(*min, *max);
                let steps_from_min = ((clamped - min) as f64 / *step as f64).round() as i64;
                let snapped = (min + steps_from_min * step).clamp(*min, *max);
                Ok(Value::Int(snapped))
            }
            Self::Real { min, max, .. } => {
                let x = match v {
                    Value::Real(x) => *x,
                    Value::Int(i) => *i as f64,
                    Value::Enum(_) => {
                        return Err(ModelError::SpaceMismatch { detail: "enum value does not fit a real dimension".into() });
                    }
                };
                Ok(Value::Real(x.clamp(*min, *max)))
            }
            Self::Enum { values, .. } => {
                let Value::Enum(s) = v else {
                    return Err(ModelError::SpaceMismatch { detail: "non-enum value does not fit an enum dimension".into() });
                };
                if values.contains(s) {
                    Ok(Value::Enum(s.clone()))
                } else {
                    Err(ModelError::SpaceMismatch { detail: format!("'{s}' is not a legal value of enum dimension") })
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    #[test]
    fn integer_limit_counts_inclusive_range() {
        let d = Dimension::integer("i", 0, 2, 1).unwrap();
        assert_eq!(d.limit(), 3);
    }

    #[test]
    fn integer_index_value_round_trip() {
        let d = Dimension::integer("i", 0, 10, 2).unwrap();
        for i in 0..d.limit() {
            let v = d.value(i);
            assert_eq!(d.index(&v), Some(i));
        }
    }

    #[test]
    fn integer_rejects_invalid_bounds() {
        assert!(Dimension::integer("i", 5, 0, 1).is_err());
        assert!(Dimension::integer("i", 0, 5, 0).is_err());
    }

    #[test]
    fn enum_requires_nonempty() {
        assert!(Dimension::enumerated("e", vec![]).is_err());
    }

    #[test]
    fn align_clamps_real_to_bounds() {
        let d = Dimension::real("r", -1.0, 1.0).unwrap();
        assert_eq!(d.align(&Value::Real(5.0)).unwrap(), Value::Real(1.0));
        assert_eq!(d.align(&Value::Real(-5.0)).unwrap(), Value::Real(-1.0));
    }

    #[test]
    fn align_snaps_integer_to_step_grid() {
        let d = Dimension::integer("i", 0, 10, 2).unwrap();
        assert_eq!(d.align(&Value::Int(3)).unwrap(), Value::Int(4));
        assert_eq!(d.align(&Value::Int(1)).unwrap(), Value::Int(0));
    }

    #[test]
    fn align_is_idempotent() {
        let d = Dimension::integer("i", 0, 10, 3).unwrap();
        for raw in [0, 1, 2, 5, 11, -3] {
            let once = d.align(&Value::Int(raw)).unwrap();
            let twice = d.align(&once).unwrap();
            assert_eq!(once, twice);
        }
    }

    #[test]
    fn align_rejects_unknown_enum_value() {
        let d = Dimension::enumerated("e", vec!["a".into(), "b".into()]).unwrap();
        assert!(d.align(&Value::Enum("c".into())).is_err());
    }

    #[test]
    fn random_stays_in_bounds() {
        let d = Dimension::real("r", -2.0, 2.0).unwrap();
        let mut rng = SmallRng::seed_from_u64(7);
        for _ in 0..50 {
            let v = d.random(&mut rng).as_real().unwrap();
            assert!((-2.0..=2.0).contains(&v));
        }
    }
}
