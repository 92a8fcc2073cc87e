//! [`Vertex`]: a point paired with its observed performance, the unit the
//! simplex strategies move around in.

use super::performance::Performance;
use super::point::Point;
use crate::error::ModelError;

/// A point plus its performance. Simplex strategies keep vertices rather
/// than bare points so every geometric move (reflect, expand, contract,
/// shrink) carries its fitness along for the ranking step that follows it.
#[derive(Debug, Clone, PartialEq)]
pub struct Vertex {
    pub point: Point,
    pub perf: Performance,
}

impl Vertex {
    #[must_use]
    pub fn new(point: Point, perf: Performance) -> Self {
        Self { point, perf }
    }

    /// Real-valued coordinates for geometric operations (reflect, centroid,
    /// distance). Enum terms have no real embedding.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::SpaceMismatch`] if any term is an enum value.
    pub fn coords(&self) -> Result<Vec<f64>, ModelError> {
        self.point
            .terms
            .iter()
            .map(|v| v.as_real().ok_or_else(|| ModelError::SpaceMismatch { detail: "simplex geometry requires numeric dimensions".into() }))
            .collect()
    }

}

#[cfg(test)]
mod tests {
    use super::*;
    use super::super::dimension::Dimension;
    use super::super::space::Space;
    use super::super::value::Value;

    #[test]
    fn coords_widens_integers() {
        let space = Space::new(vec![Dimension::integer("x", 0, 10, 1).unwrap()]).unwrap();
        let v = Vertex::new(Point::new(1, vec![Value::Int(4)]), Performance::worst(1));
        assert_eq!(v.coords().unwrap(), vec![4.0]);
        let back = Point::from_coords(2, &[7.0], &space).unwrap();
        assert_eq!(back.terms[0], Value::Int(7));
    }

    #[test]
    fn coords_rejects_enum_dimensions() {
        let v = Vertex::new(Point::new(1, vec![Value::Enum("a".into())]), Performance::worst(1));
        assert!(v.coords().is_err());
    }
}
