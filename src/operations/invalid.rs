use tracing::info;
use uuid::Uuid;

use super::{cell_mesh, stratigraphic_point, IMPLICIT_ATTRIBUTE};
use crate::error::Result;
use crate::math::simplex_orientation;
use crate::mesh::SimplicialMesh;
use crate::model::GeologicalModel;

/// Lists cell elements whose stratigraphic image is negatively oriented,
/// i.e. where the mapping folds over itself.
///
/// Cell items without an implicit attribute are skipped.
#[derive(Debug, Clone, Copy, Default)]
pub struct InvalidStratigraphicElements;

impl InvalidStratigraphicElements {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Returns `(item, element)` pairs.
    ///
    /// # Errors
    ///
    /// Returns an error if an attributed item misses a value on a vertex.
    pub fn execute<const D: usize>(&self, model: &GeologicalModel<D>) -> Result<Vec<(Uuid, usize)>> {
        let mut invalid = Vec::new();
        for component in model.components(GeologicalModel::<D>::cell_kind()) {
            let item = component.id();
            let mesh = cell_mesh(model, item)?;
            if !mesh.vertex_attributes().has_attribute(IMPLICIT_ATTRIBUTE) {
                continue;
            }
            for element in negative_elements(item, mesh)? {
                info!(%item, element, "negative stratigraphic orientation");
                invalid.push((item, element));
            }
        }
        Ok(invalid)
    }
}

fn negative_elements<const D: usize>(item: Uuid, mesh: &dyn SimplicialMesh<D>) -> Result<Vec<usize>> {
    let mut negative = Vec::new();
    for element in 0..mesh.nb_elements() {
        let Some(vertices) = mesh.element_vertices(element) else {
            continue;
        };
        let image = vertices
            .iter()
            .map(|v| stratigraphic_point(item, mesh, *v))
            .collect::<std::result::Result<Vec<_>, _>>()?;
        if simplex_orientation(&image).is_some_and(|o| o < 0.0) {
            negative.push(element);
        }
    }
    Ok(negative)
}
