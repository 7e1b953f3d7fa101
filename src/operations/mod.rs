//! Stratigraphic coordinate mapping over item meshes.
//!
//! A stratigraphic point has the model dimension: its first `D - 1`
//! coordinates are the stratigraphic location, the last one is the implicit
//! value. Both are read from vertex attributes of the cell items (surfaces in
//! a section, blocks in a 3D model).

mod bounding_box;
mod coordinates;
mod invalid;
mod item_mesh;
mod mapping;

pub use bounding_box::StratigraphicBoundingBox;
pub use coordinates::StratigraphicCoordinatesFromVertex;
pub use invalid::InvalidStratigraphicElements;
pub use item_mesh::{SnapParams, StratigraphicItemMesh};
pub use mapping::MeshMapping;

use uuid::Uuid;

use crate::error::{MappingError, Result};
use crate::math::Point;
use crate::mesh::SimplicialMesh;
use crate::model::GeologicalModel;

/// Vertex attribute holding the `D - 1` stratigraphic location values.
pub const STRATIGRAPHIC_LOCATION_ATTRIBUTE: &str = "stratigraphic_location";

/// Vertex attribute holding the implicit function value.
pub const IMPLICIT_ATTRIBUTE: &str = "implicit_function";

/// Stratigraphic point stored on `vertex` of `mesh`.
///
/// # Errors
///
/// Returns [`MappingError::MissingAttribute`] when either attribute is unset
/// at the vertex.
pub fn stratigraphic_point<const D: usize>(
    item: Uuid,
    mesh: &dyn SimplicialMesh<D>,
    vertex: usize,
) -> std::result::Result<Point<D>, MappingError> {
    let attributes = mesh.vertex_attributes();
    let missing = |attribute: &str| MappingError::MissingAttribute {
        item,
        vertex,
        attribute: attribute.to_owned(),
    };
    let location = attributes
        .value(STRATIGRAPHIC_LOCATION_ATTRIBUTE, vertex)
        .ok_or_else(|| missing(STRATIGRAPHIC_LOCATION_ATTRIBUTE))?;
    let implicit = attributes
        .value(IMPLICIT_ATTRIBUTE, vertex)
        .and_then(|value| value.first().copied())
        .ok_or_else(|| missing(IMPLICIT_ATTRIBUTE))?;
    if location.len() + 1 != D {
        return Err(MappingError::AttributeDimension {
            attribute: STRATIGRAPHIC_LOCATION_ATTRIBUTE.to_owned(),
            expected: D - 1,
            found: location.len(),
        });
    }
    let mut point = Point::<D>::origin();
    point.coords.as_mut_slice()[..D - 1].copy_from_slice(location);
    point[D - 1] = implicit;
    Ok(point)
}

/// Mesh of a cell item: a surface in a section, a block in a 3D model.
pub(crate) fn cell_mesh<const D: usize>(
    model: &GeologicalModel<D>,
    item: Uuid,
) -> Result<&dyn SimplicialMesh<D>> {
    let kind = GeologicalModel::<D>::cell_kind();
    model.component_of_kind(item, kind)?;
    Ok(model.mesh(item)?.as_simplicial())
}

/// Mesh of a facet item: a line in a section, a surface in a 3D model.
pub(crate) fn facet_mesh<const D: usize>(
    model: &GeologicalModel<D>,
    item: Uuid,
) -> Result<&dyn SimplicialMesh<D>> {
    model.component_of_kind(item, GeologicalModel::<D>::facet_kind())?;
    Ok(model.mesh(item)?.as_simplicial())
}
