use std::cmp::Ordering;

use tracing::debug;
use uuid::Uuid;

use super::{cell_mesh, facet_mesh, stratigraphic_point};
use crate::error::{MappingError, Result};
use crate::math::{distance, simplex_orientation, Point};
use crate::mesh::{ItemMesh, SimplicialMesh};
use crate::model::GeologicalModel;

/// Parameters for matching facet vertices with cell vertices.
#[derive(Debug, Clone, Copy)]
pub struct SnapParams {
    /// Maximum distance between two vertices considered the same location.
    pub tolerance: f64,
}

impl Default for SnapParams {
    fn default() -> Self {
        Self { tolerance: 1e-8 }
    }
}

/// Copies of a facet item mesh moved to stratigraphic space, as seen from a
/// cell item.
///
/// A boundary facet yields one mesh. An internal facet separates two sides
/// of the cell, each with its own stratigraphic coordinates, and yields two
/// meshes: the front (the side its elements' normals point to) then the
/// back.
#[derive(Debug, Clone, Copy)]
pub struct StratigraphicItemMesh {
    parent: Uuid,
    item: Uuid,
    snap: SnapParams,
}

impl StratigraphicItemMesh {
    #[must_use]
    pub fn new(parent: Uuid, item: Uuid) -> Self {
        Self {
            parent,
            item,
            snap: SnapParams::default(),
        }
    }

    #[must_use]
    pub fn with_snap(mut self, snap: SnapParams) -> Self {
        self.snap = snap;
        self
    }

    /// # Errors
    ///
    /// Returns [`MappingError::NotBoundaryNorInternal`] unless the item is a
    /// boundary or an internal item of the parent, and
    /// [`MappingError::InvalidTopology`] when an item vertex has no
    /// coincident parent vertex.
    pub fn execute<const D: usize>(&self, model: &GeologicalModel<D>) -> Result<Vec<ItemMesh<D>>> {
        let boundary = model.is_boundary(self.item, self.parent);
        if !boundary && !model.is_internal(self.item, self.parent) {
            return Err(MappingError::NotBoundaryNorInternal {
                item: self.item,
                parent: self.parent,
            }
            .into());
        }
        let parent = cell_mesh(model, self.parent)?;
        let facet = facet_mesh(model, self.item)?;
        let matches = coincident_vertices(facet.points(), parent.points(), self.snap.tolerance);
        if boundary {
            let resolved = boundary_side(facet, parent, &matches);
            let vertices = (0..facet.nb_vertices())
                .map(|v| resolved[v].or_else(|| matches[v].first().copied()))
                .collect::<Vec<_>>();
            return Ok(vec![self.rebuild(model, parent, &vertices)?]);
        }
        let (front, back) = sides(facet, parent, &matches);
        debug!(
            item = %self.item,
            parent = %self.parent,
            front = front.iter().flatten().count(),
            back = back.iter().flatten().count(),
            "resolved internal item sides"
        );
        let pick = |first: &[Option<usize>], second: &[Option<usize>]| {
            (0..facet.nb_vertices())
                .map(|v| first[v].or(second[v]).or_else(|| matches[v].first().copied()))
                .collect::<Vec<_>>()
        };
        Ok(vec![
            self.rebuild(model, parent, &pick(&front, &back))?,
            self.rebuild(model, parent, &pick(&back, &front))?,
        ])
    }

    /// Item mesh whose vertex `v` moves to the stratigraphic coordinates of
    /// parent vertex `vertices[v]`.
    fn rebuild<const D: usize>(
        &self,
        model: &GeologicalModel<D>,
        parent: &dyn SimplicialMesh<D>,
        vertices: &[Option<usize>],
    ) -> Result<ItemMesh<D>> {
        let points = vertices
            .iter()
            .enumerate()
            .map(|(v, parent_vertex)| {
                let parent_vertex = parent_vertex.ok_or_else(|| {
                    MappingError::InvalidTopology(format!(
                        "vertex {v} of item {} matches no vertex of {}",
                        self.item, self.parent
                    ))
                })?;
                stratigraphic_point(self.parent, parent, parent_vertex)
            })
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(match model.mesh(self.item)? {
            ItemMesh::Curve(mesh) => ItemMesh::Curve(mesh.with_points(points)?),
            ItemMesh::Triangulated(mesh) => ItemMesh::Triangulated(mesh.with_points(points)?),
            ItemMesh::Tetrahedral(mesh) => ItemMesh::Tetrahedral(mesh.with_points(points)?),
        })
    }
}

/// For every point of `items`, the indices of `parents` within `tolerance`,
/// closest first.
fn coincident_vertices<const D: usize>(
    items: &[Point<D>],
    parents: &[Point<D>],
    tolerance: f64,
) -> Vec<Vec<usize>> {
    let mut order: Vec<usize> = (0..parents.len()).collect();
    order.sort_by(|a, b| parents[*a][0].total_cmp(&parents[*b][0]));
    items
        .iter()
        .map(|point| {
            let start = order.partition_point(|p| parents[*p][0] < point[0] - tolerance);
            let mut found: Vec<(f64, usize)> = order[start..]
                .iter()
                .take_while(|p| parents[**p][0] <= point[0] + tolerance)
                .map(|p| (distance(point, &parents[*p]), *p))
                .filter(|(d, _)| *d <= tolerance)
                .collect();
            found.sort_by(|a, b| a.0.total_cmp(&b.0));
            found.into_iter().map(|(_, p)| p).collect()
        })
        .collect()
}

/// Parent elements incident to each parent vertex.
fn incidence<const D: usize>(parent: &dyn SimplicialMesh<D>) -> Vec<Vec<usize>> {
    let mut incident = vec![Vec::new(); parent.nb_vertices()];
    for element in 0..parent.nb_elements() {
        for v in parent.element_vertices(element).unwrap_or_default() {
            incident[*v].push(element);
        }
    }
    incident
}

/// Parent elements holding coincident copies of every vertex of a facet
/// element, each with the copies listed in facet vertex order.
fn enclosing_elements<const D: usize>(
    facet_vertices: &[usize],
    parent: &dyn SimplicialMesh<D>,
    incident: &[Vec<usize>],
    matches: &[Vec<usize>],
) -> Vec<(usize, Vec<usize>)> {
    let Some(first) = facet_vertices.first() else {
        return Vec::new();
    };
    let mut candidates: Vec<usize> = matches[*first]
        .iter()
        .flat_map(|p| incident[*p].iter().copied())
        .collect();
    candidates.sort_unstable();
    candidates.dedup();
    candidates
        .into_iter()
        .filter_map(|candidate| {
            let parent_vertices = parent.element_vertices(candidate)?;
            let chosen = facet_vertices
                .iter()
                .map(|fv| {
                    parent_vertices
                        .iter()
                        .copied()
                        .find(|pv| matches[*fv].contains(pv))
                })
                .collect::<Option<Vec<usize>>>()?;
            Some((candidate, chosen))
        })
        .collect()
}

/// Parent vertex under each vertex of a boundary facet, taken from the
/// parent elements the facet elements lie on. Where a fault splits the
/// parent, this picks the copy on the facet's own side.
fn boundary_side<const D: usize>(
    facet: &dyn SimplicialMesh<D>,
    parent: &dyn SimplicialMesh<D>,
    matches: &[Vec<usize>],
) -> Vec<Option<usize>> {
    let incident = incidence(parent);
    let mut resolved = vec![None; facet.nb_vertices()];
    for element in 0..facet.nb_elements() {
        let Some(facet_vertices) = facet.element_vertices(element) else {
            continue;
        };
        let enclosing = enclosing_elements(facet_vertices, parent, &incident, matches);
        let Some((_, chosen)) = enclosing.first() else {
            continue;
        };
        for (fv, pv) in facet_vertices.iter().zip(chosen) {
            resolved[*fv].get_or_insert(*pv);
        }
    }
    resolved
}

/// Parent vertex seen on the front and on the back of each facet vertex.
///
/// Each parent element enclosing a facet element lies on one side, given by
/// the orientation of the facet element completed with the remaining parent
/// vertex.
fn sides<const D: usize>(
    facet: &dyn SimplicialMesh<D>,
    parent: &dyn SimplicialMesh<D>,
    matches: &[Vec<usize>],
) -> (Vec<Option<usize>>, Vec<Option<usize>>) {
    let incident = incidence(parent);
    let mut front = vec![None; facet.nb_vertices()];
    let mut back = vec![None; facet.nb_vertices()];
    for element in 0..facet.nb_elements() {
        let (Some(facet_vertices), Some(facet_points)) =
            (facet.element_vertices(element), facet.element_points(element))
        else {
            continue;
        };
        for (candidate, chosen) in enclosing_elements(facet_vertices, parent, &incident, matches) {
            let Some(parent_vertices) = parent.element_vertices(candidate) else {
                continue;
            };
            let Some(opposite) = parent_vertices.iter().find(|pv| !chosen.contains(pv)) else {
                continue;
            };
            let Some(opposite_point) = parent.point(*opposite) else {
                continue;
            };
            let mut corners = facet_points.clone();
            corners.push(*opposite_point);
            let side = match simplex_orientation(&corners).and_then(|o| o.partial_cmp(&0.0)) {
                Some(Ordering::Greater) => &mut front,
                Some(Ordering::Less) => &mut back,
                _ => continue,
            };
            for (fv, pv) in facet_vertices.iter().zip(&chosen) {
                side[*fv].get_or_insert(*pv);
            }
        }
    }
    (front, back)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::error::GeostrataError;
    use crate::math::Point2;
    use crate::mesh::{EdgedCurve, TriangulatedSurface};
    use crate::model::{CrossSection, ModelBuilder};
    use crate::operations::{IMPLICIT_ATTRIBUTE, STRATIGRAPHIC_LOCATION_ATTRIBUTE};
    use approx::assert_relative_eq;

    const THROW: f64 = 0.3;

    /// Square `[0, 2] x [-1, 1]` cut along `y = 0` by a fault: the lower half
    /// is shifted down by `THROW` in stratigraphic space, the upper half up.
    fn faulted_section() -> (CrossSection, Uuid, Uuid, Uuid, Uuid) {
        let points = vec![
            Point2::new(0.0, -1.0),
            Point2::new(2.0, -1.0),
            Point2::new(0.0, 0.0),
            Point2::new(2.0, 0.0),
            Point2::new(0.0, 0.0),
            Point2::new(2.0, 0.0),
            Point2::new(0.0, 1.0),
            Point2::new(2.0, 1.0),
        ];
        let elements = vec![[0, 1, 3], [0, 3, 2], [4, 5, 7], [4, 7, 6]];
        let mut model = CrossSection::new();
        let mut builder = ModelBuilder::new(&mut model);
        let surface = builder
            .add_surface(TriangulatedSurface::new(points.clone(), elements).unwrap())
            .unwrap();
        let attributes = builder.item_attributes_mut(surface).unwrap();
        for (v, p) in points.iter().enumerate() {
            let shift = if v < 4 { -THROW } else { THROW };
            attributes
                .set_value(STRATIGRAPHIC_LOCATION_ATTRIBUTE, v, &[p.x])
                .unwrap();
            attributes.set_value(IMPLICIT_ATTRIBUTE, v, &[p.y + shift]).unwrap();
        }
        let segment = |a: Point2, b: Point2| EdgedCurve::new(vec![a, b], vec![[0, 1]]).unwrap();
        let fault = builder
            .add_line(segment(Point2::new(0.0, 0.0), Point2::new(2.0, 0.0)))
            .unwrap();
        let bottom = builder
            .add_line(segment(Point2::new(0.0, -1.0), Point2::new(2.0, -1.0)))
            .unwrap();
        let loose = builder
            .add_line(segment(Point2::new(0.0, 5.0), Point2::new(2.0, 5.0)))
            .unwrap();
        builder.add_internal(fault, surface).unwrap();
        builder.add_boundary(bottom, surface).unwrap();
        (model, surface, fault, bottom, loose)
    }

    fn curve_points(mesh: &ItemMesh<2>) -> Vec<Point2> {
        mesh.as_simplicial().points().to_vec()
    }

    #[test]
    fn boundary_item_gives_one_mesh() {
        let (model, surface, _, bottom, _) = faulted_section();
        let meshes = StratigraphicItemMesh::new(surface, bottom).execute(&model).unwrap();
        assert_eq!(meshes.len(), 1);
        let points = curve_points(&meshes[0]);
        assert_relative_eq!(points[0], Point2::new(0.0, -1.0 - THROW), epsilon = 1e-12);
        assert_relative_eq!(points[1], Point2::new(2.0, -1.0 - THROW), epsilon = 1e-12);
    }

    #[test]
    fn internal_item_gives_front_and_back() {
        let (model, surface, fault, _, _) = faulted_section();
        let meshes = StratigraphicItemMesh::new(surface, fault).execute(&model).unwrap();
        assert_eq!(meshes.len(), 2);
        let front = curve_points(&meshes[0]);
        let back = curve_points(&meshes[1]);
        // the fault runs along +x, so its front is the upper half
        assert_relative_eq!(front[0], Point2::new(0.0, THROW), epsilon = 1e-12);
        assert_relative_eq!(front[1], Point2::new(2.0, THROW), epsilon = 1e-12);
        assert_relative_eq!(back[0], Point2::new(0.0, -THROW), epsilon = 1e-12);
        assert_relative_eq!(back[1], Point2::new(2.0, -THROW), epsilon = 1e-12);
        assert_eq!(meshes[0].as_simplicial().nb_elements(), 1);
    }

    #[test]
    fn boundary_line_at_fault_corner_keeps_its_side() {
        let (mut model, surface, _, _, _) = faulted_section();
        let segment = |a: Point2, b: Point2| EdgedCurve::new(vec![a, b], vec![[0, 1]]).unwrap();
        let mut builder = ModelBuilder::new(&mut model);
        let left_upper = builder
            .add_line(segment(Point2::new(0.0, 0.0), Point2::new(0.0, 1.0)))
            .unwrap();
        let left_lower = builder
            .add_line(segment(Point2::new(0.0, -1.0), Point2::new(0.0, 0.0)))
            .unwrap();
        builder.add_boundary(left_upper, surface).unwrap();
        builder.add_boundary(left_lower, surface).unwrap();

        let upper = StratigraphicItemMesh::new(surface, left_upper).execute(&model).unwrap();
        assert_eq!(upper.len(), 1);
        let upper = curve_points(&upper[0]);
        assert_relative_eq!(upper[0], Point2::new(0.0, THROW), epsilon = 1e-12);
        assert_relative_eq!(upper[1], Point2::new(0.0, 1.0 + THROW), epsilon = 1e-12);

        let lower = StratigraphicItemMesh::new(surface, left_lower).execute(&model).unwrap();
        let lower = curve_points(&lower[0]);
        assert_relative_eq!(lower[0], Point2::new(0.0, -1.0 - THROW), epsilon = 1e-12);
        assert_relative_eq!(lower[1], Point2::new(0.0, -THROW), epsilon = 1e-12);
    }

    #[test]
    fn unrelated_item_is_rejected() {
        let (model, surface, _, _, loose) = faulted_section();
        assert!(matches!(
            StratigraphicItemMesh::new(surface, loose).execute(&model),
            Err(GeostrataError::Mapping(MappingError::NotBoundaryNorInternal { .. }))
        ));
    }

    #[test]
    fn coincident_vertices_are_sorted_by_distance() {
        let parents = vec![
            Point2::new(1.0, 0.0),
            Point2::new(0.0, 0.0),
            Point2::new(1e-9, 0.0),
            Point2::new(0.0, 1e-3),
        ];
        let matches = coincident_vertices(&[Point2::new(0.0, 0.0)], &parents, 1e-8);
        assert_eq!(matches, vec![vec![1, 2]]);
    }
}
