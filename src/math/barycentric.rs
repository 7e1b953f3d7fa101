use nalgebra::{DMatrix, DVector};

use super::{Point, TOLERANCE};

/// Signed measure of a full-dimensional simplex, up to the `1/D!` factor.
///
/// Positive for a counter-clockwise triangle in 2D and for a right-handed
/// tetrahedron in 3D. Returns `None` unless `vertices` holds `D + 1` points.
#[must_use]
pub fn simplex_orientation<const D: usize>(vertices: &[Point<D>]) -> Option<f64> {
    if vertices.len() != D + 1 {
        return None;
    }
    let edges = DMatrix::from_fn(D, D, |r, c| vertices[c + 1][r] - vertices[0][r]);
    Some(edges.determinant())
}

/// Barycentric weights of `point` with respect to a full-dimensional simplex.
///
/// Returns `D + 1` weights summing to one, in the order of `vertices`. The
/// weights may be negative when the point lies outside the simplex.
/// Returns `None` for a degenerate (flat) simplex.
#[must_use]
pub fn simplex_barycentric<const D: usize>(
    vertices: &[Point<D>],
    point: &Point<D>,
) -> Option<Vec<f64>> {
    if vertices.len() != D + 1 {
        return None;
    }
    let edges = DMatrix::from_fn(D, D, |r, c| vertices[c + 1][r] - vertices[0][r]);
    let scale = (1..=D)
        .map(|i| (vertices[i] - vertices[0]).norm())
        .fold(0.0_f64, f64::max);
    if scale < TOLERANCE {
        return None;
    }
    #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
    let flatness = scale.powi(D as i32) * TOLERANCE;
    if edges.determinant().abs() < flatness {
        return None;
    }
    let rhs = DVector::from_fn(D, |r, _| point[r] - vertices[0][r]);
    let solution = edges.lu().solve(&rhs)?;
    let mut weights = Vec::with_capacity(D + 1);
    weights.push(1.0 - solution.iter().sum::<f64>());
    weights.extend(solution.iter().copied());
    Some(weights)
}

/// Barycentric weights, over all of `vertices`, of the point of the simplex
/// closest to `point`.
///
/// Each face of the simplex is tried: the point is projected onto the affine
/// hull of the face, and projections falling inside their face compete on
/// distance. Returns `None` for an empty vertex list.
#[must_use]
pub fn closest_simplex_weights<const D: usize>(
    vertices: &[Point<D>],
    point: &Point<D>,
) -> Option<Vec<f64>> {
    let n = vertices.len();
    if n == 0 || n > D + 1 {
        return None;
    }
    let mut best: Option<(f64, Vec<f64>)> = None;
    for mask in 1..(1usize << n) {
        let face: Vec<usize> = (0..n).filter(|i| mask & (1 << i) != 0).collect();
        let Some(face_weights) = face_projection(vertices, &face, point) else {
            continue;
        };
        if face_weights.iter().any(|w| *w < -TOLERANCE) {
            continue;
        }
        let mut weights = vec![0.0; n];
        for (i, w) in face.iter().zip(&face_weights) {
            weights[*i] = w.max(0.0);
        }
        let total: f64 = weights.iter().sum();
        for w in &mut weights {
            *w /= total;
        }
        let distance = (interpolate(vertices, &weights) - point).norm();
        if best.as_ref().map_or(true, |(d, _)| distance < *d) {
            best = Some((distance, weights));
        }
    }
    best.map(|(_, weights)| weights)
}

/// Weights of the orthogonal projection of `point` onto the affine hull of
/// `vertices[face]`, or `None` for a degenerate face.
fn face_projection<const D: usize>(
    vertices: &[Point<D>],
    face: &[usize],
    point: &Point<D>,
) -> Option<Vec<f64>> {
    let origin = vertices[*face.first()?];
    let k = face.len() - 1;
    if k == 0 {
        return Some(vec![1.0]);
    }
    let edges = DMatrix::from_fn(D, k, |r, c| vertices[face[c + 1]][r] - origin[r]);
    let gram = edges.transpose() * &edges;
    let scale = gram.diagonal().iter().copied().fold(0.0_f64, f64::max);
    let order = i32::try_from(k).ok()?;
    if scale < TOLERANCE || gram.determinant().abs() < scale.powi(order) * TOLERANCE {
        return None;
    }
    let rhs = edges.transpose() * DVector::from_fn(D, |r, _| point[r] - origin[r]);
    let solution = gram.lu().solve(&rhs)?;
    let mut weights = Vec::with_capacity(k + 1);
    weights.push(1.0 - solution.iter().sum::<f64>());
    weights.extend(solution.iter().copied());
    Some(weights)
}

/// Weighted sum of points.
#[must_use]
pub fn interpolate<const D: usize>(points: &[Point<D>], weights: &[f64]) -> Point<D> {
    let mut coords = nalgebra::SVector::<f64, D>::zeros();
    for (p, w) in points.iter().zip(weights) {
        coords += p.coords * *w;
    }
    Point::from(coords)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::math::{Point2, Point3};
    use approx::assert_relative_eq;

    const TOL: f64 = 1e-12;

    fn unit_triangle() -> Vec<Point2> {
        vec![
            Point2::new(0.0, 0.0),
            Point2::new(1.0, 0.0),
            Point2::new(0.0, 1.0),
        ]
    }

    #[test]
    fn triangle_centroid_weights() {
        let w = simplex_barycentric(&unit_triangle(), &Point2::new(1.0 / 3.0, 1.0 / 3.0)).unwrap();
        for value in w {
            assert_relative_eq!(value, 1.0 / 3.0, epsilon = TOL);
        }
    }

    #[test]
    fn triangle_vertex_weights_are_unit() {
        let tri = unit_triangle();
        let w = simplex_barycentric(&tri, &tri[1]).unwrap();
        assert_relative_eq!(w[0], 0.0, epsilon = TOL);
        assert_relative_eq!(w[1], 1.0, epsilon = TOL);
        assert_relative_eq!(w[2], 0.0, epsilon = TOL);
    }

    #[test]
    fn outside_point_has_negative_weight() {
        let w = simplex_barycentric(&unit_triangle(), &Point2::new(1.0, 1.0)).unwrap();
        assert!(w[0] < 0.0, "w={w:?}");
        assert_relative_eq!(w.iter().sum::<f64>(), 1.0, epsilon = TOL);
    }

    #[test]
    fn flat_triangle_is_rejected() {
        let flat = vec![
            Point2::new(0.0, 0.0),
            Point2::new(1.0, 0.0),
            Point2::new(2.0, 0.0),
        ];
        assert!(simplex_barycentric(&flat, &Point2::new(0.5, 0.0)).is_none());
    }

    #[test]
    fn tetrahedron_weights_reconstruct_point() {
        let tet = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(2.0, 0.0, 0.0),
            Point3::new(0.0, 2.0, 0.0),
            Point3::new(0.0, 0.0, 2.0),
        ];
        let p = Point3::new(0.3, 0.4, 0.5);
        let w = simplex_barycentric(&tet, &p).unwrap();
        let back = interpolate(&tet, &w);
        assert_relative_eq!(back, p, epsilon = TOL);
    }

    #[test]
    fn orientation_sign() {
        let tri = unit_triangle();
        assert!(simplex_orientation(&tri).unwrap() > 0.0);
        let flipped = vec![tri[1], tri[0], tri[2]];
        assert!(simplex_orientation(&flipped).unwrap() < 0.0);
    }

    #[test]
    fn orientation_needs_full_simplex() {
        let tri = unit_triangle();
        assert_eq!(simplex_orientation(&tri[..2]), None);
        let flat = [tri[0], tri[1], Point2::new(2.0, 0.0)];
        assert_relative_eq!(simplex_orientation(&flat).unwrap(), 0.0, epsilon = TOL);
    }

    /// Obtuse at the third vertex. Below the long edge, zeroing the negative
    /// weight and renormalizing lands near `(1.27, 0)`, far from the foot of
    /// the perpendicular.
    #[test]
    fn closest_point_on_obtuse_triangle() {
        let tri = vec![
            Point2::new(0.0, 0.0),
            Point2::new(10.0, 0.0),
            Point2::new(9.0, 1.0),
        ];
        let q = Point2::new(0.5, -0.1);
        let w = closest_simplex_weights(&tri, &q).unwrap();
        assert_relative_eq!(interpolate(&tri, &w), Point2::new(0.5, 0.0), epsilon = TOL);
        assert_relative_eq!(w[2], 0.0, epsilon = TOL);
    }

    #[test]
    fn closest_point_in_vertex_region() {
        let tri = unit_triangle();
        let w = closest_simplex_weights(&tri, &Point2::new(-1.0, -2.0)).unwrap();
        assert_relative_eq!(w[0], 1.0, epsilon = TOL);
        let inside = Point2::new(0.2, 0.3);
        let w = closest_simplex_weights(&tri, &inside).unwrap();
        assert_relative_eq!(interpolate(&tri, &w), inside, epsilon = TOL);
    }

    #[test]
    fn closest_point_on_tetrahedron_face() {
        let tet = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
            Point3::new(0.0, 0.0, 1.0),
        ];
        let w = closest_simplex_weights(&tet, &Point3::new(0.2, 0.3, -0.5)).unwrap();
        assert_relative_eq!(interpolate(&tet, &w), Point3::new(0.2, 0.3, 0.0), epsilon = TOL);
    }
}
