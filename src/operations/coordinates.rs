use uuid::Uuid;

use super::{cell_mesh, stratigraphic_point};
use crate::error::{MappingError, Result};
use crate::math::Point;
use crate::model::GeologicalModel;

/// Reads the stratigraphic coordinates stored on a vertex of a cell item.
pub struct StratigraphicCoordinatesFromVertex {
    item: Uuid,
    vertex: usize,
}

impl StratigraphicCoordinatesFromVertex {
    #[must_use]
    pub fn new(item: Uuid, vertex: usize) -> Self {
        Self { item, vertex }
    }

    /// # Errors
    ///
    /// Returns an error if `item` is not a cell item of `model` or the vertex
    /// carries no stratigraphic coordinates.
    pub fn execute<const D: usize>(&self, model: &GeologicalModel<D>) -> Result<Point<D>> {
        let mesh = cell_mesh(model, self.item)?;
        if self.vertex >= mesh.nb_vertices() {
            return Err(MappingError::InvalidTopology(format!(
                "vertex {} out of range, item {} has {}",
                self.vertex,
                self.item,
                mesh.nb_vertices()
            ))
            .into());
        }
        Ok(stratigraphic_point(self.item, mesh, self.vertex)?)
    }
}
