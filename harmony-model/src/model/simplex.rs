//! Pure coordinate-space geometry shared by the simplex-based strategies.
//!
//! Everything here operates on raw `&[f64]` coordinate vectors (as produced
//! by [`super::Vertex::coords`]) rather than on [`super::Point`] directly,
//! since reflect/expand/contract/shrink moves routinely leave the legal
//! grid until the caller re-aligns the result.

/// Arithmetic mean of a set of coordinate vectors. All vectors must have
/// the same length; the result has that length too.
#[must_use]
pub fn centroid(points: &[Vec<f64>]) -> Vec<f64> {
    assert!(!points.is_empty(), "centroid of an empty set is undefined");
    let dim = points[0].len();
    let mut sum = vec![0.0; dim];
    for p in points {
        for (s, v) in sum.iter_mut().zip(p) {
            *s += v;
        }
    }
    let n = points.len() as f64;
    sum.into_iter().map(|s| s / n).collect()
}

/// Euclidean distance between two coordinate vectors.
#[must_use]
pub fn distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - y).powi(2)).sum::<f64>().sqrt()
}

/// Move `point` away from `pivot` by `coeff`: `pivot + coeff * (point - pivot)`.
/// `coeff > 1` expands past `point`, `0 < coeff < 1` contracts toward
/// `pivot`, `coeff < 0` reflects through `pivot`.
#[must_use]
pub fn transform(pivot: &[f64], point: &[f64], coeff: f64) -> Vec<f64> {
    pivot.iter().zip(point).map(|(p, x)| p + coeff * (x - p)).collect()
}

/// `true` if every vertex coordinate set is within `tol` of the first one
/// (the simplex has degenerated to a single point).
#[must_use]
pub fn collapsed(points: &[Vec<f64>], tol: f64) -> bool {
    points.iter().skip(1).all(|p| distance(&points[0], p) < tol)
}

/// `true` if every coordinate of `point` lies within `[lo[i], hi[i]]`.
#[must_use]
pub fn in_bounds(point: &[f64], lo: &[f64], hi: &[f64]) -> bool {
    point.iter().zip(lo).zip(hi).all(|((&x, &l), &h)| x >= l && x <= h)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn centroid_of_unit_triangle() {
        let pts = vec![vec![0.0, 0.0], vec![2.0, 0.0], vec![1.0, 3.0]];
        assert_eq!(centroid(&pts), vec![1.0, 1.0]);
    }

    #[test]
    fn transform_with_coeff_one_is_identity() {
        let pivot = vec![0.0, 0.0];
        let point = vec![3.0, 4.0];
        assert_eq!(transform(&pivot, &point, 1.0), point);
    }

    #[test]
    fn transform_with_negative_coeff_reflects() {
        let pivot = vec![0.0];
        let point = vec![2.0];
        assert_eq!(transform(&pivot, &point, -1.0), vec![-2.0]);
    }

    #[test]
    fn collapsed_detects_degenerate_simplex() {
        let pts = vec![vec![1.0, 1.0], vec![1.0000001, 1.0], vec![1.0, 1.0000001]];
        assert!(collapsed(&pts, 1e-4));
        let spread = vec![vec![0.0, 0.0], vec![5.0, 0.0]];
        assert!(!collapsed(&spread, 1e-4));
    }

    #[test]
    fn in_bounds_checks_every_axis() {
        assert!(in_bounds(&[1.0, 2.0], &[0.0, 0.0], &[5.0, 5.0]));
        assert!(!in_bounds(&[1.0, 6.0], &[0.0, 0.0], &[5.0, 5.0]));
    }
}
