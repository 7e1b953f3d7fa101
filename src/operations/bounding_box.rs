use uuid::Uuid;

use super::{
    cell_mesh, stratigraphic_point, IMPLICIT_ATTRIBUTE, STRATIGRAPHIC_LOCATION_ATTRIBUTE,
};
use crate::error::Result;
use crate::math::BoundingBox;
use crate::mesh::SimplicialMesh;
use crate::model::GeologicalModel;

/// Axis-aligned bounds of stratigraphic coordinates.
///
/// Over the whole model, cell items without stratigraphic attributes are
/// skipped. A single item must carry them on every vertex.
#[derive(Debug, Clone, Copy, Default)]
pub struct StratigraphicBoundingBox {
    item: Option<Uuid>,
}

impl StratigraphicBoundingBox {
    /// Bounds over every cell item of the model.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Bounds over one cell item.
    #[must_use]
    pub fn of_item(item: Uuid) -> Self {
        Self { item: Some(item) }
    }

    /// Returns `None` when no vertex carries stratigraphic coordinates.
    ///
    /// # Errors
    ///
    /// Returns an error if a considered vertex misses an attribute or the
    /// requested item is not a cell item.
    pub fn execute<const D: usize>(&self, model: &GeologicalModel<D>) -> Result<Option<BoundingBox<D>>> {
        if let Some(item) = self.item {
            return item_box(item, cell_mesh(model, item)?);
        }
        let mut bbox: Option<BoundingBox<D>> = None;
        for component in model.components(GeologicalModel::<D>::cell_kind()) {
            let item = component.id();
            let mesh = cell_mesh(model, item)?;
            let attributes = mesh.vertex_attributes();
            if !attributes.has_attribute(STRATIGRAPHIC_LOCATION_ATTRIBUTE)
                || !attributes.has_attribute(IMPLICIT_ATTRIBUTE)
            {
                continue;
            }
            if let Some(other) = item_box(item, mesh)? {
                match bbox.as_mut() {
                    Some(bbox) => bbox.add_box(&other),
                    None => bbox = Some(other),
                }
            }
        }
        Ok(bbox)
    }
}

fn item_box<const D: usize>(item: Uuid, mesh: &dyn SimplicialMesh<D>) -> Result<Option<BoundingBox<D>>> {
    let mut bbox: Option<BoundingBox<D>> = None;
    for vertex in 0..mesh.nb_vertices() {
        let point = stratigraphic_point(item, mesh, vertex)?;
        match bbox.as_mut() {
            Some(bbox) => bbox.add_point(&point),
            None => bbox = Some(BoundingBox::from_point(point)),
        }
    }
    Ok(bbox)
}
