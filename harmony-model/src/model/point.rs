//! [`Point`]: one candidate drawn from a [`super::Space`].

use super::space::Space;
use super::value::Value;
use crate::error::ModelError;

/// A concrete value per dimension of a space, identified by a monotonic id.
/// `id == 0` is reserved to mean "no point" (e.g. the best point before any
/// report has arrived).
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Point {
    pub id: u32,
    pub terms: Vec<Value>,
}

impl Point {
    #[must_use]
    pub fn new(id: u32, terms: Vec<Value>) -> Self {
        Self { id, terms }
    }

    /// The reserved "no point" sentinel.
    #[must_use]
    pub fn none() -> Self {
        Self { id: 0, terms: Vec::new() }
    }

    #[must_use]
    pub fn is_none(&self) -> bool {
        self.id == 0
    }

    /// Snap every term onto its dimension's nearest legal grid point.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::SpaceMismatch`] if `self.terms.len() !=
    /// space.len()`, or if any term fails [`super::Dimension::align`].
    pub fn align(&self, space: &Space) -> Result<Self, ModelError> {
        if self.terms.len() != space.len() {
            return Err(ModelError::SpaceMismatch {
                detail: format!("point has {} terms, space has {}", self.terms.len(), space.len()),
            });
        }
        let terms = self
            .terms
            .iter()
            .enumerate()
            .map(|(i, v)| space.dimension(i).align(v))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { id: self.id, terms })
    }

    /// Build a point from raw real coordinates, assigning `id` and
    /// re-aligning each term to `space`'s dimension kind. Used by simplex
    /// strategies after a reflect/expand/shrink move leaves the legal grid.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::SpaceMismatch`] if `coords.len() !=
    /// space.len()`, or if `space` has an enum dimension (no real
    /// embedding).
    pub fn from_coords(id: u32, coords: &[f64], space: &Space) -> Result<Self, ModelError> {
        if coords.len() != space.len() {
            return Err(ModelError::SpaceMismatch { detail: "coordinate count does not match space".into() });
        }
        let terms = coords
            .iter()
            .enumerate()
            .map(|(i, &c)| match space.dimension(i) {
                super::dimension::Dimension::Enum { .. } => Err(ModelError::SpaceMismatch {
                    detail: "cannot derive an enum term from simplex coordinates".into(),
                }),
                super::dimension::Dimension::Integer { .. } => Ok(Value::Int(c.round() as i64)),
                super::dimension::Dimension::Real { .. } => Ok(Value::Real(c)),
            })
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(id, terms).align(space)
    }

    /// Render as `(v1, v2, ...)`, the format [`parse`] reads back.
    #[must_use]
    pub fn format(&self) -> String {
        let inner = self.terms.iter().map(ToString::to_string).collect::<Vec<_>>().join(", ");
        format!("({inner})")
    }

    /// Parse `(v1, v2, ...)` against `space`'s dimension kinds, assigning
    /// `id`.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::ParseFailed`] on malformed input or a term
    /// count mismatch, or [`ModelError::SpaceMismatch`] if a term cannot be
    /// interpreted as its dimension's kind.
    pub fn parse(id: u32, text: &str, space: &Space) -> Result<Self, ModelError> {
        let trimmed = text.trim();
        let inner = trimmed
            .strip_prefix('(')
            .and_then(|s| s.strip_suffix(')'))
            .ok_or_else(|| ModelError::ParseFailed { detail: format!("expected '(...)', got '{text}'") })?;
        let raw_terms: Vec<&str> = if inner.trim().is_empty() { Vec::new() } else { inner.split(',').map(str::trim).collect() };
        if raw_terms.len() != space.len() {
            return Err(ModelError::ParseFailed {
                detail: format!("expected {} terms, got {}", space.len(), raw_terms.len()),
            });
        }
        let mut terms = Vec::with_capacity(raw_terms.len());
        for (i, raw) in raw_terms.iter().enumerate() {
            let dim = space.dimension(i);
            let value = match dim {
                super::dimension::Dimension::Integer { .. } => raw
                    .parse::<i64>()
                    .map(Value::Int)
                    .map_err(|_| ModelError::ParseFailed { detail: format!("'{raw}' is not an integer") })?,
                super::dimension::Dimension::Real { .. } => raw
                    .parse::<f64>()
                    .map(Value::Real)
                    .map_err(|_| ModelError::ParseFailed { detail: format!("'{raw}' is not a real number") })?,
                super::dimension::Dimension::Enum { .. } => Value::Enum((*raw).to_string()),
            };
            terms.push(dim.align(&value)?);
        }
        Ok(Self { id, terms })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::dimension::Dimension;

    fn sample_space() -> Space {
        Space::new(vec![
            Dimension::integer("i", 0, 10, 1).unwrap(),
            Dimension::real("r", -1.0, 1.0).unwrap(),
            Dimension::enumerated("e", vec!["lo".into(), "hi".into()]).unwrap(),
        ])
        .unwrap()
    }

    #[test]
    fn format_then_parse_round_trips() {
        let space = sample_space();
        let p = Point::new(3, vec![Value::Int(4), Value::Real(0.5), Value::Enum("hi".into())]);
        let text = p.format();
        let parsed = Point::parse(3, &text, &space).unwrap();
        assert_eq!(parsed, p);
    }

    #[test]
    fn align_is_idempotent() {
        let space = sample_space();
        let p = Point::new(1, vec![Value::Int(4), Value::Real(5.0), Value::Enum("lo".into())]);
        let once = p.align(&space).unwrap();
        let twice = once.align(&space).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn align_rejects_length_mismatch() {
        let space = sample_space();
        let p = Point::new(1, vec![Value::Int(4)]);
        assert!(p.align(&space).is_err());
    }

    #[test]
    fn from_coords_rebuilds_typed_terms() {
        let space = sample_space();
        let p = Point::from_coords(9, &[4.0, 0.5, 0.0], &space);
        assert!(p.is_err(), "enum dimension has no real embedding");
    }

    #[test]
    fn none_point_has_zero_id() {
        assert!(Point::none().is_none());
    }

    #[test]
    fn parse_rejects_wrong_term_count() {
        let space = sample_space();
        assert!(Point::parse(1, "(1, 2.0)", &space).is_err());
    }

    #[test]
    fn serializes_to_json_and_back_losslessly() {
        let p = Point::new(7, vec![Value::Int(4), Value::Real(0.5), Value::Enum("hi".into())]);
        let json = serde_json::to_string(&p).unwrap();
        let back: Point = serde_json::from_str(&json).unwrap();
        assert_eq!(back, p);
    }
}
