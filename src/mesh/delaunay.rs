use spade::{DelaunayTriangulation, InsertionError, Point2 as SpadePoint2, Triangulation};

use super::TriangulatedSurface;
use crate::error::MappingError;
use crate::math::Point2;

impl TriangulatedSurface<2> {
    /// Delaunay triangulation of scattered points.
    ///
    /// Duplicate points are merged, so the result may hold fewer vertices
    /// than the input. Triangles are counter-clockwise.
    ///
    /// # Errors
    ///
    /// Returns [`MappingError::Degenerate`] for non-finite coordinates or when
    /// the points do not span a triangle.
    pub fn delaunay(points: &[Point2]) -> Result<Self, MappingError> {
        let mut triangulation = DelaunayTriangulation::<SpadePoint2<f64>>::new();
        for p in points {
            triangulation
                .insert(SpadePoint2::new(p.x, p.y))
                .map_err(|e: InsertionError| MappingError::Degenerate(format!("delaunay insert: {e}")))?;
        }
        if triangulation.num_inner_faces() == 0 {
            return Err(MappingError::Degenerate(
                "points do not span a triangle".into(),
            ));
        }

        let vertices: Vec<Point2> = triangulation
            .vertices()
            .map(|v| {
                let pos = v.position();
                Point2::new(pos.x, pos.y)
            })
            .collect();
        let triangles: Vec<[usize; 3]> = triangulation
            .inner_faces()
            .map(|face| face.vertices().map(|v| v.fix().index()))
            .collect();

        Self::new(vertices, triangles)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::math::simplex_orientation;
    use crate::mesh::SimplicialMesh;

    fn p(x: f64, y: f64) -> Point2 {
        Point2::new(x, y)
    }

    #[test]
    fn square_produces_2_triangles() {
        let mesh = TriangulatedSurface::delaunay(&[
            p(0.0, 0.0),
            p(1.0, 0.0),
            p(1.0, 1.0),
            p(0.0, 1.0),
        ])
        .unwrap();
        assert_eq!(mesh.nb_vertices(), 4);
        assert_eq!(mesh.nb_elements(), 2);
    }

    #[test]
    fn triangles_are_counter_clockwise() {
        let mesh = TriangulatedSurface::delaunay(&[
            p(0.0, 0.0),
            p(2.0, 0.0),
            p(2.0, 1.0),
            p(0.0, 1.0),
            p(1.0, 0.5),
        ])
        .unwrap();
        for e in 0..mesh.nb_elements() {
            assert!(simplex_orientation(&mesh.element_points(e).unwrap()).unwrap() > 0.0);
        }
    }

    #[test]
    fn collinear_points_are_degenerate() {
        let result = TriangulatedSurface::delaunay(&[p(0.0, 0.0), p(1.0, 0.0), p(2.0, 0.0)]);
        assert!(matches!(result, Err(MappingError::Degenerate(_))));
    }
}
