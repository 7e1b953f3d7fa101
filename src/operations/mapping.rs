use uuid::Uuid;

use super::{cell_mesh, stratigraphic_point, IMPLICIT_ATTRIBUTE, STRATIGRAPHIC_LOCATION_ATTRIBUTE};
use crate::error::{MappingError, Result};
use crate::math::{interpolate, simplex_orientation, Point};
use crate::mesh::locate::build_locator;
use crate::mesh::{LocatorParams, PointLocator, SimplicialMesh};
use crate::model::GeologicalModel;

/// Forward and inverse stratigraphic mapping over one cell mesh.
///
/// Both locators are built once, so a mapping answers repeated queries on
/// the same item without rescanning the mesh. Vertices may lack
/// stratigraphic coordinates: only queries landing on an element touching
/// such a vertex fail.
pub struct MeshMapping<const D: usize> {
    item: Uuid,
    geometric_points: Vec<Point<D>>,
    stratigraphic_points: Vec<Option<Point<D>>>,
    implicit_values: Vec<Option<f64>>,
    /// Element vertices, reordered so every stratigraphic image is
    /// positively oriented.
    elements: Vec<Vec<usize>>,
    /// Elements whose vertices all carry stratigraphic coordinates, in the
    /// order the stratigraphic locator indexes them.
    mapped_elements: Vec<usize>,
    geometric: Box<dyn PointLocator<D>>,
    stratigraphic: Box<dyn PointLocator<D>>,
}

impl<const D: usize> std::fmt::Debug for MeshMapping<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MeshMapping")
            .field("item", &self.item)
            .field("nb_vertices", &self.geometric_points.len())
            .field("nb_elements", &self.elements.len())
            .field("nb_mapped_elements", &self.mapped_elements.len())
            .finish_non_exhaustive()
    }
}

impl<const D: usize> MeshMapping<D> {
    /// Builds the mapping of cell item `item`.
    ///
    /// # Errors
    ///
    /// Returns [`MappingError::InvalidTopology`] unless `mesh` is made of
    /// `D + 1`-vertex simplices, and [`MappingError::AttributeDimension`]
    /// for a stratigraphic location of the wrong size.
    pub fn new(
        item: Uuid,
        mesh: &dyn SimplicialMesh<D>,
        params: LocatorParams,
    ) -> std::result::Result<Self, MappingError> {
        if mesh.simplex_size() != D + 1 {
            return Err(MappingError::InvalidTopology(format!(
                "item {item} has {}-vertex elements, mapping needs {}",
                mesh.simplex_size(),
                D + 1
            )));
        }
        let mut stratigraphic_points = Vec::with_capacity(mesh.nb_vertices());
        for v in 0..mesh.nb_vertices() {
            match stratigraphic_point(item, mesh, v) {
                Ok(point) => stratigraphic_points.push(Some(point)),
                Err(MappingError::MissingAttribute { .. }) => stratigraphic_points.push(None),
                Err(error) => return Err(error),
            }
        }
        let implicit_values = (0..mesh.nb_vertices())
            .map(|v| {
                mesh.vertex_attributes()
                    .value(IMPLICIT_ATTRIBUTE, v)
                    .and_then(|value| value.first().copied())
            })
            .collect();
        let geometric_points = mesh.points().to_vec();
        let mut elements = Vec::with_capacity(mesh.nb_elements());
        let mut mapped_elements = Vec::new();
        for e in 0..mesh.nb_elements() {
            let Some(vertices) = mesh.element_vertices(e) else {
                continue;
            };
            let mut vertices = vertices.to_vec();
            let image: Option<Vec<_>> = vertices.iter().map(|v| stratigraphic_points[*v]).collect();
            if let Some(image) = image {
                if simplex_orientation(&image).is_some_and(|o| o < 0.0) {
                    vertices.swap(0, 1);
                }
                mapped_elements.push(elements.len());
            }
            elements.push(vertices);
        }
        let geometric = build_locator(geometric_points.clone(), elements.clone(), params);
        // unattributed vertices are unreferenced; any stored point keeps the
        // locator bounds unchanged
        let filler = stratigraphic_points
            .iter()
            .flatten()
            .next()
            .copied()
            .unwrap_or_else(Point::origin);
        let stratigraphic = build_locator(
            stratigraphic_points.iter().map(|p| p.unwrap_or(filler)).collect(),
            mapped_elements.iter().map(|e| elements[*e].clone()).collect(),
            params,
        );
        Ok(Self {
            item,
            geometric_points,
            stratigraphic_points,
            implicit_values,
            elements,
            mapped_elements,
            geometric,
            stratigraphic,
        })
    }

    /// Mapping of cell item `item` of `model`.
    ///
    /// # Errors
    ///
    /// Returns an error unless `item` is a cell item of `model`.
    pub fn for_item(model: &GeologicalModel<D>, item: Uuid, params: LocatorParams) -> Result<Self> {
        Ok(Self::new(item, cell_mesh(model, item)?, params)?)
    }

    #[must_use]
    pub fn item(&self) -> Uuid {
        self.item
    }

    /// Stratigraphic coordinates stored on `vertex`.
    #[must_use]
    pub fn vertex_stratigraphic_point(&self, vertex: usize) -> Option<&Point<D>> {
        self.stratigraphic_points.get(vertex)?.as_ref()
    }

    /// Stratigraphic image of a geometric point.
    ///
    /// # Errors
    ///
    /// Returns [`MappingError::OutsideMesh`] if no element holds `point`
    /// within the locator tolerances, and
    /// [`MappingError::MissingAttribute`] if the element found has a vertex
    /// without stratigraphic coordinates.
    pub fn stratigraphic_point(&self, point: &Point<D>) -> std::result::Result<Point<D>, MappingError> {
        let location = self
            .geometric
            .locate(point)
            .ok_or(MappingError::OutsideMesh { item: self.item })?;
        let corners = self.elements[location.element]
            .iter()
            .map(|v| self.stratigraphic_points[*v].ok_or_else(|| self.missing(*v)))
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(interpolate(&corners, &location.weights))
    }

    /// Geometric point whose stratigraphic image is `point`.
    ///
    /// # Errors
    ///
    /// Returns [`MappingError::OutsideMesh`] if no stratigraphic element
    /// holds `point` within the locator tolerances.
    pub fn geometric_point(&self, point: &Point<D>) -> std::result::Result<Point<D>, MappingError> {
        let location = self
            .stratigraphic
            .locate(point)
            .ok_or(MappingError::OutsideMesh { item: self.item })?;
        let element = self.mapped_elements[location.element];
        let corners: Vec<_> = self.elements[element]
            .iter()
            .map(|v| self.geometric_points[*v])
            .collect();
        Ok(interpolate(&corners, &location.weights))
    }

    /// Implicit function interpolated at a geometric point. The
    /// stratigraphic location may be unset.
    ///
    /// # Errors
    ///
    /// Returns [`MappingError::OutsideMesh`] if no element holds `point`, and
    /// [`MappingError::MissingAttribute`] if a vertex of the element found
    /// has no implicit value.
    pub fn implicit_value(&self, point: &Point<D>) -> std::result::Result<f64, MappingError> {
        let location = self
            .geometric
            .locate(point)
            .ok_or(MappingError::OutsideMesh { item: self.item })?;
        let mut value = 0.0;
        for (vertex, weight) in self.elements[location.element].iter().zip(&location.weights) {
            let implicit = self.implicit_values[*vertex].ok_or_else(|| MappingError::MissingAttribute {
                item: self.item,
                vertex: *vertex,
                attribute: IMPLICIT_ATTRIBUTE.to_owned(),
            })?;
            value += weight * implicit;
        }
        Ok(value)
    }

    fn missing(&self, vertex: usize) -> MappingError {
        let attribute = if self.implicit_values[vertex].is_some() {
            STRATIGRAPHIC_LOCATION_ATTRIBUTE
        } else {
            IMPLICIT_ATTRIBUTE
        };
        MappingError::MissingAttribute {
            item: self.item,
            vertex,
            attribute: attribute.to_owned(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::math::{Point2, Point3};
    use crate::mesh::{TetrahedralSolid, TriangulatedSurface};
    use approx::assert_relative_eq;
    use proptest::prelude::*;

    /// Unit square split in two triangles; stratigraphic coordinates are an
    /// affine image `(u, w) = (2x + 1, y - 3)`.
    fn square() -> TriangulatedSurface<2> {
        let points = vec![
            Point2::new(0.0, 0.0),
            Point2::new(1.0, 0.0),
            Point2::new(1.0, 1.0),
            Point2::new(0.0, 1.0),
        ];
        let mut mesh = TriangulatedSurface::new(points.clone(), vec![[0, 1, 2], [0, 2, 3]]).unwrap();
        for (v, p) in points.iter().enumerate() {
            let attributes = mesh.attributes_mut();
            attributes
                .set_value(STRATIGRAPHIC_LOCATION_ATTRIBUTE, v, &[2.0 * p.x + 1.0])
                .unwrap();
            attributes.set_value(IMPLICIT_ATTRIBUTE, v, &[p.y - 3.0]).unwrap();
        }
        mesh
    }

    /// 4x3 grid over `[0, 4] x [0, 3]` with a non-affine but monotone
    /// stratigraphic image `(x + 0.1 y^2, 2y + 0.3 x)`.
    fn warped_grid() -> TriangulatedSurface<2> {
        let mut points = Vec::new();
        for j in 0..4 {
            for i in 0..5 {
                points.push(Point2::new(f64::from(i), f64::from(j)));
            }
        }
        let mut elements = Vec::new();
        for j in 0..3 {
            for i in 0..4 {
                let a = j * 5 + i;
                elements.push([a, a + 1, a + 6]);
                elements.push([a, a + 6, a + 5]);
            }
        }
        let mut mesh = TriangulatedSurface::new(points.clone(), elements).unwrap();
        for (v, p) in points.iter().enumerate() {
            let attributes = mesh.attributes_mut();
            attributes
                .set_value(STRATIGRAPHIC_LOCATION_ATTRIBUTE, v, &[p.x + 0.1 * p.y * p.y])
                .unwrap();
            attributes
                .set_value(IMPLICIT_ATTRIBUTE, v, &[2.0 * p.y + 0.3 * p.x])
                .unwrap();
        }
        mesh
    }

    fn unit_tetrahedra() -> TetrahedralSolid<3> {
        let points = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
            Point3::new(0.0, 0.0, 1.0),
            Point3::new(1.0, 1.0, 1.0),
        ];
        let mut mesh = TetrahedralSolid::new(points.clone(), vec![[0, 1, 2, 3], [1, 2, 3, 4]]).unwrap();
        for (v, p) in points.iter().enumerate() {
            let attributes = mesh.attributes_mut();
            attributes
                .set_value(STRATIGRAPHIC_LOCATION_ATTRIBUTE, v, &[p.x, p.y + 0.5 * p.z])
                .unwrap();
            attributes.set_value(IMPLICIT_ATTRIBUTE, v, &[10.0 * p.z]).unwrap();
        }
        mesh
    }

    #[test]
    fn forward_is_affine() {
        let mapping = MeshMapping::new(Uuid::new_v4(), &square(), LocatorParams::default()).unwrap();
        let image = mapping.stratigraphic_point(&Point2::new(0.25, 0.5)).unwrap();
        assert_relative_eq!(image, Point2::new(1.5, -2.5), epsilon = 1e-12);
        assert_relative_eq!(
            mapping.implicit_value(&Point2::new(0.25, 0.5)).unwrap(),
            -2.5,
            epsilon = 1e-12
        );
    }

    #[test]
    fn vertex_query_returns_attribute() {
        let mapping = MeshMapping::new(Uuid::new_v4(), &square(), LocatorParams::default()).unwrap();
        let image = mapping.stratigraphic_point(&Point2::new(1.0, 1.0)).unwrap();
        assert_relative_eq!(image, *mapping.vertex_stratigraphic_point(2).unwrap(), epsilon = 1e-12);
    }

    #[test]
    fn mirrored_image_is_still_invertible() {
        let mut mesh = square();
        // u = -x reverses every stratigraphic triangle
        for v in 0..4 {
            let x = mesh.points()[v].x;
            mesh.attributes_mut()
                .set_value(STRATIGRAPHIC_LOCATION_ATTRIBUTE, v, &[-x])
                .unwrap();
        }
        let mapping = MeshMapping::new(Uuid::new_v4(), &mesh, LocatorParams::default()).unwrap();
        let back = mapping.geometric_point(&Point2::new(-0.75, -2.75)).unwrap();
        assert_relative_eq!(back, Point2::new(0.75, 0.25), epsilon = 1e-9);
    }

    #[test]
    fn outside_points_fail() {
        let item = Uuid::new_v4();
        let mapping = MeshMapping::new(item, &square(), LocatorParams::default()).unwrap();
        assert!(matches!(
            mapping.stratigraphic_point(&Point2::new(2.0, 0.5)),
            Err(MappingError::OutsideMesh { item: i }) if i == item
        ));
        assert!(mapping.geometric_point(&Point2::new(10.0, 0.0)).is_err());
    }

    #[test]
    fn missing_attribute_only_affects_touching_elements() {
        let mut mesh = square();
        mesh.attributes_mut().unset_value(IMPLICIT_ATTRIBUTE, 3);
        let mapping = MeshMapping::new(Uuid::new_v4(), &mesh, LocatorParams::default()).unwrap();
        // element [0, 1, 2] is fully attributed
        let image = mapping.stratigraphic_point(&Point2::new(0.75, 0.25)).unwrap();
        assert_relative_eq!(image, Point2::new(2.5, -2.75), epsilon = 1e-12);
        assert_relative_eq!(
            mapping.geometric_point(&image).unwrap(),
            Point2::new(0.75, 0.25),
            epsilon = 1e-9
        );
        // element [0, 2, 3] touches vertex 3
        let err = mapping.stratigraphic_point(&Point2::new(0.25, 0.75)).unwrap_err();
        assert!(matches!(
            err,
            MappingError::MissingAttribute { vertex: 3, ref attribute, .. } if attribute == IMPLICIT_ATTRIBUTE
        ));
        assert!(mapping.implicit_value(&Point2::new(0.25, 0.75)).is_err());
        assert!(mapping.vertex_stratigraphic_point(3).is_none());
    }

    #[test]
    fn implicit_value_without_location() {
        let mut mesh = square();
        mesh.attributes_mut()
            .unset_value(STRATIGRAPHIC_LOCATION_ATTRIBUTE, 3);
        let mapping = MeshMapping::new(Uuid::new_v4(), &mesh, LocatorParams::default()).unwrap();
        assert_relative_eq!(
            mapping.implicit_value(&Point2::new(0.25, 0.75)).unwrap(),
            -2.25,
            epsilon = 1e-12
        );
        assert!(matches!(
            mapping.stratigraphic_point(&Point2::new(0.25, 0.75)),
            Err(MappingError::MissingAttribute { vertex: 3, ref attribute, .. })
                if attribute == STRATIGRAPHIC_LOCATION_ATTRIBUTE
        ));
    }

    #[test]
    fn tetrahedral_mapping() {
        let mapping =
            MeshMapping::new(Uuid::new_v4(), &unit_tetrahedra(), LocatorParams::default()).unwrap();
        let q = Point3::new(0.2, 0.2, 0.2);
        let image = mapping.stratigraphic_point(&q).unwrap();
        assert_relative_eq!(image, Point3::new(0.2, 0.3, 2.0), epsilon = 1e-12);
        assert_relative_eq!(mapping.geometric_point(&image).unwrap(), q, epsilon = 1e-9);
    }

    #[test]
    fn rejects_facet_meshes() {
        let curve = crate::mesh::EdgedCurve::<2>::default();
        assert!(matches!(
            MeshMapping::new(Uuid::new_v4(), &curve, LocatorParams::default()),
            Err(MappingError::InvalidTopology(_))
        ));
    }

    proptest! {
        #[test]
        fn square_round_trip(x in 0.0f64..=1.0, y in 0.0f64..=1.0) {
            let mapping = MeshMapping::new(Uuid::new_v4(), &square(), LocatorParams::default()).unwrap();
            let p = Point2::new(x, y);
            let back = mapping.geometric_point(&mapping.stratigraphic_point(&p).unwrap()).unwrap();
            prop_assert!((back - p).norm() < 1e-9, "{p} came back as {back}");
        }

        #[test]
        fn warped_grid_round_trip(x in 0.0f64..=4.0, y in 0.0f64..=3.0) {
            let mapping =
                MeshMapping::new(Uuid::new_v4(), &warped_grid(), LocatorParams::default()).unwrap();
            let p = Point2::new(x, y);
            let back = mapping.geometric_point(&mapping.stratigraphic_point(&p).unwrap()).unwrap();
            prop_assert!((back - p).norm() < 1e-8, "{p} came back as {back}");
        }

        #[test]
        fn tetrahedra_round_trip(a in 0.0f64..1.0, b in 0.0f64..1.0, c in 0.0f64..1.0) {
            // barycentric sample of the first tetrahedron
            let total = 1.0 + a + b + c;
            let p = Point3::new(a / total, b / total, c / total);
            let mapping =
                MeshMapping::new(Uuid::new_v4(), &unit_tetrahedra(), LocatorParams::default()).unwrap();
            let back = mapping.geometric_point(&mapping.stratigraphic_point(&p).unwrap()).unwrap();
            prop_assert!((back - p).norm() < 1e-8, "{p} came back as {back}");
        }
    }
}
