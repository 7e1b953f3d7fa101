pub mod attributes;
mod delaunay;
pub mod locate;

pub use attributes::{VertexAttribute, VertexAttributes};
pub use locate::{Location, LocatorParams, LocatorStrategy, PointLocator};

use crate::error::MappingError;
use crate::math::{BoundingBox, Point};

/// Read access shared by every simplicial mesh.
///
/// Elements are simplices given as `simplex_size()` vertex indices.
pub trait SimplicialMesh<const D: usize> {
    /// Number of vertices per element: 2 for segments, 3 for triangles,
    /// 4 for tetrahedra.
    fn simplex_size(&self) -> usize;

    fn points(&self) -> &[Point<D>];

    fn nb_elements(&self) -> usize;

    /// Vertex indices of `element`, `None` when out of range.
    fn element_vertices(&self, element: usize) -> Option<&[usize]>;

    fn vertex_attributes(&self) -> &VertexAttributes;

    fn nb_vertices(&self) -> usize {
        self.points().len()
    }

    fn point(&self, vertex: usize) -> Option<&Point<D>> {
        self.points().get(vertex)
    }

    /// Positions of the vertices of `element`.
    fn element_points(&self, element: usize) -> Option<Vec<Point<D>>> {
        self.element_vertices(element)?
            .iter()
            .map(|v| self.point(*v).copied())
            .collect()
    }

    fn bounding_box(&self) -> Option<BoundingBox<D>> {
        BoundingBox::from_points(self.points())
    }
}

/// Mesh of simplices with `K` vertices each, embedded in `D` dimensions.
#[derive(Debug, Clone, PartialEq)]
pub struct SimplexMesh<const D: usize, const K: usize> {
    points: Vec<Point<D>>,
    elements: Vec<[usize; K]>,
    attributes: VertexAttributes,
}

/// Polyline made of segments.
pub type EdgedCurve<const D: usize> = SimplexMesh<D, 2>;

/// Surface made of triangles.
pub type TriangulatedSurface<const D: usize> = SimplexMesh<D, 3>;

/// Volume made of tetrahedra.
pub type TetrahedralSolid<const D: usize> = SimplexMesh<D, 4>;

impl<const D: usize, const K: usize> Default for SimplexMesh<D, K> {
    fn default() -> Self {
        Self {
            points: Vec::new(),
            elements: Vec::new(),
            attributes: VertexAttributes::new(0),
        }
    }
}

impl<const D: usize, const K: usize> SimplexMesh<D, K> {
    /// Builds a mesh, checking that every element references existing,
    /// distinct vertices.
    ///
    /// # Errors
    ///
    /// Returns [`MappingError::InvalidTopology`] for a bad element.
    pub fn new(points: Vec<Point<D>>, elements: Vec<[usize; K]>) -> Result<Self, MappingError> {
        for (index, element) in elements.iter().enumerate() {
            Self::check_element(points.len(), index, element)?;
        }
        let attributes = VertexAttributes::new(points.len());
        Ok(Self {
            points,
            elements,
            attributes,
        })
    }

    fn check_element(nb_points: usize, index: usize, element: &[usize; K]) -> Result<(), MappingError> {
        if let Some(v) = element.iter().find(|v| **v >= nb_points) {
            return Err(MappingError::InvalidTopology(format!(
                "element {index} references vertex {v}, mesh has {nb_points}"
            )));
        }
        for (i, a) in element.iter().enumerate() {
            if element[i + 1..].contains(a) {
                return Err(MappingError::InvalidTopology(format!(
                    "element {index} repeats vertex {a}"
                )));
            }
        }
        Ok(())
    }

    /// Appends a vertex and returns its index.
    pub fn add_vertex(&mut self, point: Point<D>) -> usize {
        self.points.push(point);
        self.attributes.resize(self.points.len());
        self.points.len() - 1
    }

    /// Appends an element and returns its index.
    ///
    /// # Errors
    ///
    /// Returns [`MappingError::InvalidTopology`] for a bad element.
    pub fn add_element(&mut self, element: [usize; K]) -> Result<usize, MappingError> {
        Self::check_element(self.points.len(), self.elements.len(), &element)?;
        self.elements.push(element);
        Ok(self.elements.len() - 1)
    }

    #[must_use]
    pub fn elements(&self) -> &[[usize; K]] {
        &self.elements
    }

    pub fn attributes_mut(&mut self) -> &mut VertexAttributes {
        &mut self.attributes
    }

    pub(crate) fn set_points(&mut self, points: Vec<Point<D>>) {
        debug_assert_eq!(points.len(), self.points.len());
        self.points = points;
    }

    pub(crate) fn set_attributes(&mut self, attributes: VertexAttributes) {
        self.attributes = attributes;
    }

    /// Same topology and attributes, vertices moved to `points`.
    ///
    /// # Errors
    ///
    /// Returns [`MappingError::InvalidTopology`] if the point count differs.
    pub fn with_points(&self, points: Vec<Point<D>>) -> Result<Self, MappingError> {
        if points.len() != self.points.len() {
            return Err(MappingError::InvalidTopology(format!(
                "expected {} points, got {}",
                self.points.len(),
                points.len()
            )));
        }
        Ok(Self {
            points,
            elements: self.elements.clone(),
            attributes: self.attributes.clone(),
        })
    }
}

impl<const D: usize, const K: usize> SimplicialMesh<D> for SimplexMesh<D, K> {
    fn simplex_size(&self) -> usize {
        K
    }

    fn points(&self) -> &[Point<D>] {
        &self.points
    }

    fn nb_elements(&self) -> usize {
        self.elements.len()
    }

    fn element_vertices(&self, element: usize) -> Option<&[usize]> {
        self.elements.get(element).map(<[usize; K]>::as_slice)
    }

    fn vertex_attributes(&self) -> &VertexAttributes {
        &self.attributes
    }
}

/// Geometric support of one model item.
#[derive(Debug, Clone, PartialEq)]
pub enum ItemMesh<const D: usize> {
    Curve(EdgedCurve<D>),
    Triangulated(TriangulatedSurface<D>),
    Tetrahedral(TetrahedralSolid<D>),
}

impl<const D: usize> ItemMesh<D> {
    /// Read access through the common mesh interface.
    #[must_use]
    pub fn as_simplicial(&self) -> &dyn SimplicialMesh<D> {
        match self {
            Self::Curve(mesh) => mesh,
            Self::Triangulated(mesh) => mesh,
            Self::Tetrahedral(mesh) => mesh,
        }
    }

    pub(crate) fn attributes_mut(&mut self) -> &mut VertexAttributes {
        match self {
            Self::Curve(mesh) => mesh.attributes_mut(),
            Self::Triangulated(mesh) => mesh.attributes_mut(),
            Self::Tetrahedral(mesh) => mesh.attributes_mut(),
        }
    }

    pub(crate) fn set_points(&mut self, points: Vec<Point<D>>) {
        match self {
            Self::Curve(mesh) => mesh.set_points(points),
            Self::Triangulated(mesh) => mesh.set_points(points),
            Self::Tetrahedral(mesh) => mesh.set_points(points),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::math::Point2;

    fn p(x: f64, y: f64) -> Point2 {
        Point2::new(x, y)
    }

    #[test]
    fn new_checks_vertex_indices() {
        let points = vec![p(0.0, 0.0), p(1.0, 0.0), p(0.0, 1.0)];
        assert!(TriangulatedSurface::<2>::new(points.clone(), vec![[0, 1, 2]]).is_ok());
        assert!(TriangulatedSurface::<2>::new(points.clone(), vec![[0, 1, 3]]).is_err());
        assert!(TriangulatedSurface::<2>::new(points, vec![[0, 1, 1]]).is_err());
    }

    #[test]
    fn incremental_construction_resizes_attributes() {
        let mut curve = EdgedCurve::<2>::default();
        let a = curve.add_vertex(p(0.0, 0.0));
        curve.attributes_mut().set_value("t", a, &[1.0]).unwrap();
        let b = curve.add_vertex(p(1.0, 0.0));
        curve.add_element([a, b]).unwrap();
        assert_eq!(curve.nb_vertices(), 2);
        assert_eq!(curve.nb_elements(), 1);
        assert!(curve.vertex_attributes().value("t", b).is_none());
        assert_eq!(curve.element_points(0).unwrap(), vec![p(0.0, 0.0), p(1.0, 0.0)]);
    }

    #[test]
    fn item_mesh_exposes_simplex_size() {
        let curve = ItemMesh::Curve(EdgedCurve::<2>::default());
        let surface = ItemMesh::Triangulated(TriangulatedSurface::<2>::default());
        assert_eq!(curve.as_simplicial().simplex_size(), 2);
        assert_eq!(surface.as_simplicial().simplex_size(), 3);
    }
}
