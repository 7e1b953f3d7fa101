use tracing::{debug, info};
use uuid::Uuid;

use super::GeologicalModel;
use crate::crs::{CoordinateTransform, CrsInfo};
use crate::error::{ComponentError, CrsError, Result};
use crate::mesh::{
    EdgedCurve, ItemMesh, SimplicialMesh, TetrahedralSolid, TriangulatedSurface, VertexAttributes,
};
use crate::topology::{Component, ComponentKind, ComponentType, FaultType, HorizonType, RelationGraph};

/// Sole mutation surface of a [`GeologicalModel`].
///
/// Every operation validates its inputs before touching the model, so a
/// failed call leaves the model unchanged.
#[derive(Debug)]
pub struct ModelBuilder<'a, const D: usize> {
    model: &'a mut GeologicalModel<D>,
    /// Set when horizons and units mirror a horizons stack, which then owns
    /// their removal and metadata.
    stack_locked: bool,
}

impl<'a, const D: usize> ModelBuilder<'a, D> {
    #[must_use]
    pub fn new(model: &'a mut GeologicalModel<D>) -> Self {
        Self {
            model,
            stack_locked: false,
        }
    }

    /// Refuses removal and metadata edits of horizons and stratigraphic
    /// units.
    pub(crate) fn with_locked_stack_nodes(mut self) -> Self {
        self.stack_locked = true;
        self
    }

    fn check_unlocked(&self, id: Uuid, kind: ComponentKind) -> Result<()> {
        let stack_kind = matches!(kind, ComponentKind::Horizon | ComponentKind::StratigraphicUnit);
        if self.stack_locked && stack_kind {
            return Err(ComponentError::StackManaged { kind, id }.into());
        }
        Ok(())
    }

    // --- Collections ---

    fn add_collection(&mut self, kind: ComponentKind) -> Uuid {
        self.model.catalog.create(kind)
    }

    fn add_collection_with_id(&mut self, kind: ComponentKind, id: Uuid) -> Result<Uuid> {
        Ok(self.model.catalog.create_with_id(kind, id)?)
    }

    pub fn add_fault(&mut self) -> Uuid {
        self.add_collection(ComponentKind::Fault)
    }

    /// # Errors
    ///
    /// Returns [`ComponentError::Duplicate`] if `id` is already registered.
    pub fn add_fault_with_id(&mut self, id: Uuid) -> Result<Uuid> {
        self.add_collection_with_id(ComponentKind::Fault, id)
    }

    /// # Errors
    ///
    /// Returns an error if the catalog refuses the fault type.
    pub fn add_fault_with_type(&mut self, fault_type: FaultType) -> Result<Uuid> {
        let id = self.add_fault();
        self.set_fault_type(id, fault_type)?;
        Ok(id)
    }

    pub fn add_horizon(&mut self) -> Uuid {
        self.add_collection(ComponentKind::Horizon)
    }

    /// # Errors
    ///
    /// Returns [`ComponentError::Duplicate`] if `id` is already registered.
    pub fn add_horizon_with_id(&mut self, id: Uuid) -> Result<Uuid> {
        self.add_collection_with_id(ComponentKind::Horizon, id)
    }

    /// # Errors
    ///
    /// Returns an error if the catalog refuses the horizon type.
    pub fn add_horizon_with_type(&mut self, horizon_type: HorizonType) -> Result<Uuid> {
        let id = self.add_horizon();
        self.model
            .catalog
            .set_type(id, ComponentType::Horizon(horizon_type))?;
        Ok(id)
    }

    pub fn add_fault_block(&mut self) -> Uuid {
        self.add_collection(ComponentKind::FaultBlock)
    }

    /// # Errors
    ///
    /// Returns [`ComponentError::Duplicate`] if `id` is already registered.
    pub fn add_fault_block_with_id(&mut self, id: Uuid) -> Result<Uuid> {
        self.add_collection_with_id(ComponentKind::FaultBlock, id)
    }

    pub fn add_stratigraphic_unit(&mut self) -> Uuid {
        self.add_collection(ComponentKind::StratigraphicUnit)
    }

    /// # Errors
    ///
    /// Returns [`ComponentError::Duplicate`] if `id` is already registered.
    pub fn add_stratigraphic_unit_with_id(&mut self, id: Uuid) -> Result<Uuid> {
        self.add_collection_with_id(ComponentKind::StratigraphicUnit, id)
    }

    // --- Metadata ---

    /// Renames any component of `kind`.
    ///
    /// # Errors
    ///
    /// Returns an error unless `id` names a component of `kind`.
    pub fn set_name(&mut self, id: Uuid, kind: ComponentKind, name: impl Into<String>) -> Result<()> {
        self.check_unlocked(id, kind)?;
        Ok(self.model.catalog.set_name(id, kind, name)?)
    }

    /// # Errors
    ///
    /// Returns an error unless `id` is a fault.
    pub fn set_fault_name(&mut self, id: Uuid, name: impl Into<String>) -> Result<()> {
        self.set_name(id, ComponentKind::Fault, name)
    }

    /// # Errors
    ///
    /// Returns an error unless `id` is a fault.
    pub fn set_fault_type(&mut self, id: Uuid, fault_type: FaultType) -> Result<()> {
        Ok(self
            .model
            .catalog
            .set_type(id, ComponentType::Fault(fault_type))?)
    }

    /// # Errors
    ///
    /// Returns an error unless `id` is a horizon.
    pub fn set_horizon_name(&mut self, id: Uuid, name: impl Into<String>) -> Result<()> {
        self.set_name(id, ComponentKind::Horizon, name)
    }

    /// # Errors
    ///
    /// Returns an error unless `id` is a horizon.
    pub fn set_horizon_type(&mut self, id: Uuid, horizon_type: HorizonType) -> Result<()> {
        self.check_unlocked(id, ComponentKind::Horizon)?;
        Ok(self
            .model
            .catalog
            .set_type(id, ComponentType::Horizon(horizon_type))?)
    }

    /// # Errors
    ///
    /// Returns an error unless `id` is a fault block.
    pub fn set_fault_block_name(&mut self, id: Uuid, name: impl Into<String>) -> Result<()> {
        self.set_name(id, ComponentKind::FaultBlock, name)
    }

    /// # Errors
    ///
    /// Returns an error unless `id` is a stratigraphic unit.
    pub fn set_stratigraphic_unit_name(&mut self, id: Uuid, name: impl Into<String>) -> Result<()> {
        self.set_name(id, ComponentKind::StratigraphicUnit, name)
    }

    /// # Errors
    ///
    /// Returns an error unless `id` is a line.
    pub fn set_line_name(&mut self, id: Uuid, name: impl Into<String>) -> Result<()> {
        self.set_name(id, ComponentKind::Line, name)
    }

    /// # Errors
    ///
    /// Returns an error unless `id` is a surface.
    pub fn set_surface_name(&mut self, id: Uuid, name: impl Into<String>) -> Result<()> {
        self.set_name(id, ComponentKind::Surface, name)
    }

    /// # Errors
    ///
    /// Returns an error unless `id` is a block.
    pub fn set_block_name(&mut self, id: Uuid, name: impl Into<String>) -> Result<()> {
        self.set_name(id, ComponentKind::Block, name)
    }

    // --- Removal ---

    fn remove_collection(&mut self, id: Uuid, kind: ComponentKind) -> Result<()> {
        self.model.catalog.get_of_kind(id, kind)?;
        self.check_unlocked(id, kind)?;
        let dropped = self.model.membership.remove_node(id);
        self.model.catalog.remove(id, kind)?;
        debug!(%id, %kind, dropped, "removed collection");
        Ok(())
    }

    /// Removes a fault and its memberships. Its items stay in the model.
    ///
    /// # Errors
    ///
    /// Returns an error unless `id` is a fault.
    pub fn remove_fault(&mut self, id: Uuid) -> Result<()> {
        self.remove_collection(id, ComponentKind::Fault)
    }

    /// # Errors
    ///
    /// Returns an error unless `id` is a horizon.
    pub fn remove_horizon(&mut self, id: Uuid) -> Result<()> {
        self.remove_collection(id, ComponentKind::Horizon)
    }

    /// # Errors
    ///
    /// Returns an error unless `id` is a fault block.
    pub fn remove_fault_block(&mut self, id: Uuid) -> Result<()> {
        self.remove_collection(id, ComponentKind::FaultBlock)
    }

    /// # Errors
    ///
    /// Returns an error unless `id` is a stratigraphic unit.
    pub fn remove_stratigraphic_unit(&mut self, id: Uuid) -> Result<()> {
        self.remove_collection(id, ComponentKind::StratigraphicUnit)
    }

    fn remove_item(&mut self, id: Uuid, kind: ComponentKind) -> Result<()> {
        self.model.catalog.get_of_kind(id, kind)?;
        let dropped = self.model.membership.remove_node(id)
            + self.model.boundaries.remove_node(id)
            + self.model.internals.remove_node(id);
        self.model.meshes.remove(&id);
        self.model.catalog.remove(id, kind)?;
        debug!(%id, %kind, dropped, "removed item");
        Ok(())
    }

    /// Removes a line, its mesh and every relation it takes part in.
    ///
    /// # Errors
    ///
    /// Returns an error unless `id` is a line.
    pub fn remove_line(&mut self, id: Uuid) -> Result<()> {
        self.remove_item(id, ComponentKind::Line)
    }

    /// # Errors
    ///
    /// Returns an error unless `id` is a surface.
    pub fn remove_surface(&mut self, id: Uuid) -> Result<()> {
        self.remove_item(id, ComponentKind::Surface)
    }

    /// # Errors
    ///
    /// Returns an error unless `id` is a block.
    pub fn remove_block(&mut self, id: Uuid) -> Result<()> {
        self.remove_item(id, ComponentKind::Block)
    }

    // --- Items ---

    fn check_item_kind(kind: ComponentKind) -> Result<()> {
        if GeologicalModel::<D>::supports_item_kind(kind) {
            Ok(())
        } else {
            Err(ComponentError::UnsupportedKind { kind, dimension: D }.into())
        }
    }

    fn add_item(&mut self, kind: ComponentKind, id: Option<Uuid>, mesh: ItemMesh<D>) -> Result<Uuid> {
        Self::check_item_kind(kind)?;
        let id = match id {
            Some(id) => self.model.catalog.create_with_id(kind, id)?,
            None => self.model.catalog.create(kind),
        };
        self.model.meshes.insert(id, mesh);
        Ok(id)
    }

    /// # Errors
    ///
    /// Returns [`ComponentError::UnsupportedKind`] in a 3D model.
    pub fn add_line(&mut self, mesh: EdgedCurve<D>) -> Result<Uuid> {
        self.add_item(ComponentKind::Line, None, ItemMesh::Curve(mesh))
    }

    /// # Errors
    ///
    /// Returns an error in a 3D model or if `id` is already registered.
    pub fn add_line_with_id(&mut self, id: Uuid, mesh: EdgedCurve<D>) -> Result<Uuid> {
        self.add_item(ComponentKind::Line, Some(id), ItemMesh::Curve(mesh))
    }

    /// # Errors
    ///
    /// Never fails for 2D and 3D models; kept fallible for symmetry.
    pub fn add_surface(&mut self, mesh: TriangulatedSurface<D>) -> Result<Uuid> {
        self.add_item(ComponentKind::Surface, None, ItemMesh::Triangulated(mesh))
    }

    /// # Errors
    ///
    /// Returns an error if `id` is already registered.
    pub fn add_surface_with_id(&mut self, id: Uuid, mesh: TriangulatedSurface<D>) -> Result<Uuid> {
        self.add_item(ComponentKind::Surface, Some(id), ItemMesh::Triangulated(mesh))
    }

    /// # Errors
    ///
    /// Returns [`ComponentError::UnsupportedKind`] in a 2D model.
    pub fn add_block(&mut self, mesh: TetrahedralSolid<D>) -> Result<Uuid> {
        self.add_item(ComponentKind::Block, None, ItemMesh::Tetrahedral(mesh))
    }

    /// # Errors
    ///
    /// Returns an error in a 2D model or if `id` is already registered.
    pub fn add_block_with_id(&mut self, id: Uuid, mesh: TetrahedralSolid<D>) -> Result<Uuid> {
        self.add_item(ComponentKind::Block, Some(id), ItemMesh::Tetrahedral(mesh))
    }

    /// Replaces the mesh of an item with one of the same kind.
    ///
    /// # Errors
    ///
    /// Returns an error if `id` is not an item or the mesh kind differs.
    pub fn set_item_mesh(&mut self, id: Uuid, mesh: ItemMesh<D>) -> Result<()> {
        let kind = self.model.catalog.get(id)?.kind();
        let expected = match mesh {
            ItemMesh::Curve(_) => ComponentKind::Line,
            ItemMesh::Triangulated(_) => ComponentKind::Surface,
            ItemMesh::Tetrahedral(_) => ComponentKind::Block,
        };
        if kind != expected {
            return Err(ComponentError::WrongKind {
                id,
                expected,
                found: kind,
            }
            .into());
        }
        self.model.meshes.insert(id, mesh);
        Ok(())
    }

    /// Vertex attributes of an item mesh, for writing.
    ///
    /// # Errors
    ///
    /// Returns an error if `id` has no mesh.
    pub fn item_attributes_mut(&mut self, id: Uuid) -> Result<&mut VertexAttributes> {
        self.model
            .meshes
            .get_mut(&id)
            .map(ItemMesh::attributes_mut)
            .ok_or_else(|| ComponentError::UnknownId(id).into())
    }

    // --- Membership ---

    /// Adds `item` to `collection`. Faults and horizons gather facet items
    /// (lines in 2D, surfaces in 3D); fault blocks and stratigraphic units
    /// gather cell items (surfaces in 2D, blocks in 3D). Adding an existing
    /// relation is a no-op.
    ///
    /// # Errors
    ///
    /// Returns an error for unknown ids and
    /// [`ComponentError::InvalidRelation`] for an incompatible pairing.
    pub fn add_item_in_collection(&mut self, item: Uuid, collection: Uuid) -> Result<()> {
        let item_kind = self.model.catalog.get(item)?.kind();
        let collection_kind = self.model.catalog.get(collection)?.kind();
        let expected = match collection_kind {
            ComponentKind::Fault | ComponentKind::Horizon => GeologicalModel::<D>::facet_kind(),
            ComponentKind::FaultBlock | ComponentKind::StratigraphicUnit => {
                GeologicalModel::<D>::cell_kind()
            }
            _ => {
                return Err(ComponentError::InvalidRelation {
                    item,
                    collection,
                    reason: format!("a {collection_kind} is not a collection"),
                }
                .into())
            }
        };
        if item_kind != expected {
            return Err(ComponentError::InvalidRelation {
                item,
                collection,
                reason: format!("a {collection_kind} gathers {expected} items, not {item_kind} items"),
            }
            .into());
        }
        self.model.membership.add_edge(collection, item);
        Ok(())
    }

    /// Removes `item` from `collection`. Returns whether the relation existed.
    pub fn remove_item_from_collection(&mut self, item: Uuid, collection: Uuid) -> bool {
        self.model.membership.remove_edge(collection, item)
    }

    fn add_typed(
        &mut self,
        item: Uuid,
        item_kind: ComponentKind,
        collection: Uuid,
        collection_kind: ComponentKind,
    ) -> Result<()> {
        self.model.catalog.get_of_kind(item, item_kind)?;
        self.model.catalog.get_of_kind(collection, collection_kind)?;
        self.add_item_in_collection(item, collection)
    }

    /// # Errors
    ///
    /// Returns an error for mis-kinded ids or in a 3D model.
    pub fn add_line_in_fault(&mut self, line: Uuid, fault: Uuid) -> Result<()> {
        self.add_typed(line, ComponentKind::Line, fault, ComponentKind::Fault)
    }

    /// # Errors
    ///
    /// Returns an error for mis-kinded ids or in a 3D model.
    pub fn add_line_in_horizon(&mut self, line: Uuid, horizon: Uuid) -> Result<()> {
        self.add_typed(line, ComponentKind::Line, horizon, ComponentKind::Horizon)
    }

    /// # Errors
    ///
    /// Returns an error for mis-kinded ids or in a 2D model.
    pub fn add_surface_in_fault(&mut self, surface: Uuid, fault: Uuid) -> Result<()> {
        self.add_typed(surface, ComponentKind::Surface, fault, ComponentKind::Fault)
    }

    /// # Errors
    ///
    /// Returns an error for mis-kinded ids or in a 2D model.
    pub fn add_surface_in_horizon(&mut self, surface: Uuid, horizon: Uuid) -> Result<()> {
        self.add_typed(surface, ComponentKind::Surface, horizon, ComponentKind::Horizon)
    }

    /// # Errors
    ///
    /// Returns an error for mis-kinded ids or in a 3D model.
    pub fn add_surface_in_fault_block(&mut self, surface: Uuid, fault_block: Uuid) -> Result<()> {
        self.add_typed(
            surface,
            ComponentKind::Surface,
            fault_block,
            ComponentKind::FaultBlock,
        )
    }

    /// # Errors
    ///
    /// Returns an error for mis-kinded ids or in a 3D model.
    pub fn add_surface_in_stratigraphic_unit(&mut self, surface: Uuid, unit: Uuid) -> Result<()> {
        self.add_typed(
            surface,
            ComponentKind::Surface,
            unit,
            ComponentKind::StratigraphicUnit,
        )
    }

    /// # Errors
    ///
    /// Returns an error for mis-kinded ids or in a 2D model.
    pub fn add_block_in_fault_block(&mut self, block: Uuid, fault_block: Uuid) -> Result<()> {
        self.add_typed(block, ComponentKind::Block, fault_block, ComponentKind::FaultBlock)
    }

    /// # Errors
    ///
    /// Returns an error for mis-kinded ids or in a 2D model.
    pub fn add_block_in_stratigraphic_unit(&mut self, block: Uuid, unit: Uuid) -> Result<()> {
        self.add_typed(block, ComponentKind::Block, unit, ComponentKind::StratigraphicUnit)
    }

    // --- Item topology ---

    fn check_facet_of_cell(&self, facet: Uuid, cell: Uuid) -> Result<()> {
        let facet_kind = GeologicalModel::<D>::facet_kind();
        let cell_kind = GeologicalModel::<D>::cell_kind();
        self.model.catalog.get_of_kind(facet, facet_kind)?;
        self.model.catalog.get_of_kind(cell, cell_kind)?;
        Ok(())
    }

    /// Records that `boundary` lies on the border of `incident`.
    ///
    /// # Errors
    ///
    /// Returns an error for mis-kinded ids or if `boundary` is already
    /// internal to `incident`.
    pub fn add_boundary(&mut self, boundary: Uuid, incident: Uuid) -> Result<()> {
        self.check_facet_of_cell(boundary, incident)?;
        if self.model.internals.has_edge(incident, boundary) {
            return Err(ComponentError::InvalidRelation {
                item: boundary,
                collection: incident,
                reason: "item is already internal".into(),
            }
            .into());
        }
        self.model.boundaries.add_edge(incident, boundary);
        Ok(())
    }

    /// Records that `internal` lies inside `embedding`.
    ///
    /// # Errors
    ///
    /// Returns an error for mis-kinded ids or if `internal` is already a
    /// boundary of `embedding`.
    pub fn add_internal(&mut self, internal: Uuid, embedding: Uuid) -> Result<()> {
        self.check_facet_of_cell(internal, embedding)?;
        if self.model.boundaries.has_edge(embedding, internal) {
            return Err(ComponentError::InvalidRelation {
                item: internal,
                collection: embedding,
                reason: "item is already a boundary".into(),
            }
            .into());
        }
        self.model.internals.add_edge(embedding, internal);
        Ok(())
    }

    pub fn remove_boundary(&mut self, boundary: Uuid, incident: Uuid) -> bool {
        self.model.boundaries.remove_edge(incident, boundary)
    }

    pub fn remove_internal(&mut self, internal: Uuid, embedding: Uuid) -> bool {
        self.model.internals.remove_edge(embedding, internal)
    }

    // --- Whole model ---

    /// Deep-copies `source` into the model, keeping every id.
    ///
    /// # Errors
    ///
    /// Returns [`ComponentError::NotEmpty`] unless the model is empty.
    pub fn copy(&mut self, source: &GeologicalModel<D>) -> Result<()> {
        if !self.model.is_empty() {
            return Err(ComponentError::NotEmpty.into());
        }
        self.model.catalog = source.catalog.clone();
        self.model.membership = source.membership.clone();
        self.model.boundaries = source.boundaries.clone();
        self.model.internals = source.internals.clone();
        self.model.meshes = source.meshes.clone();
        self.model.crs = source.crs.clone();
        info!(components = source.catalog.len(), "copied model");
        Ok(())
    }

    /// Declares the reference system the model coordinates are expressed in.
    pub fn set_coordinate_reference_system(&mut self, crs: CrsInfo) {
        self.model.crs = Some(crs);
    }

    /// Moves every item point from the current reference system to `target`.
    ///
    /// # Errors
    ///
    /// Returns [`CrsError::Unset`] if the model has no reference system, or
    /// the transform error. No point moves on error.
    pub fn convert_coordinate_reference_system(
        &mut self,
        transform: &dyn CoordinateTransform<D>,
        target: CrsInfo,
    ) -> Result<()> {
        let source = self.model.crs.clone().ok_or(CrsError::Unset)?;
        let mut converted = Vec::with_capacity(self.model.meshes.len());
        for (id, mesh) in &self.model.meshes {
            let points = mesh
                .as_simplicial()
                .points()
                .iter()
                .map(|p| transform.convert(p, &source, &target))
                .collect::<std::result::Result<Vec<_>, CrsError>>()?;
            converted.push((*id, points));
        }
        for (id, points) in converted {
            if let Some(mesh) = self.model.meshes.get_mut(&id) {
                mesh.set_points(points);
            }
        }
        info!(from = %source, to = %target, "converted coordinate reference system");
        self.model.crs = Some(target);
        Ok(())
    }

    pub(crate) fn insert_component(&mut self, component: Component) -> Result<()> {
        Ok(self.model.catalog.insert(component)?)
    }

    pub(crate) fn insert_mesh(&mut self, id: Uuid, mesh: ItemMesh<D>) {
        self.model.meshes.insert(id, mesh);
    }

    pub(crate) fn restore_relations(
        &mut self,
        membership: RelationGraph,
        boundaries: RelationGraph,
        internals: RelationGraph,
    ) {
        self.model.membership = membership;
        self.model.boundaries = boundaries;
        self.model.internals = internals;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::error::GeostrataError;
    use crate::math::{Point2, Point3};
    use crate::model::{CrossSection, StructuralModel};

    fn segment(x: f64) -> EdgedCurve<2> {
        EdgedCurve::new(vec![Point2::new(x, 0.0), Point2::new(x, 1.0)], vec![[0, 1]]).unwrap()
    }

    fn unit_triangle() -> TriangulatedSurface<2> {
        TriangulatedSurface::new(
            vec![
                Point2::new(0.0, 0.0),
                Point2::new(1.0, 0.0),
                Point2::new(0.0, 1.0),
            ],
            vec![[0, 1, 2]],
        )
        .unwrap()
    }

    /// Two faults sharing one line: fault0 holds 3 lines, fault1 holds 2.
    fn two_faults() -> (CrossSection, [Uuid; 2], Vec<Uuid>) {
        let mut model = CrossSection::new();
        let mut builder = ModelBuilder::new(&mut model);
        let faults = [builder.add_fault(), builder.add_fault()];
        let lines: Vec<Uuid> = (0..4)
            .map(|i| builder.add_line(segment(f64::from(i))).unwrap())
            .collect();
        builder.add_line_in_fault(lines[0], faults[0]).unwrap();
        builder.add_line_in_fault(lines[1], faults[0]).unwrap();
        builder.add_line_in_fault(lines[2], faults[0]).unwrap();
        builder.add_line_in_fault(lines[2], faults[1]).unwrap();
        builder.add_line_in_fault(lines[3], faults[1]).unwrap();
        (model, faults, lines)
    }

    #[test]
    fn shared_line_has_two_collections() {
        let (model, faults, lines) = two_faults();
        assert_eq!(model.nb_items(faults[0]), 3);
        assert_eq!(model.nb_items(faults[1]), 2);
        assert_eq!(model.nb_collections(lines[2]), 2);
        for line in [lines[0], lines[1], lines[3]] {
            assert_eq!(model.nb_collections(line), 1);
        }
        assert_eq!(
            model.fault_items(faults[0]).unwrap(),
            vec![lines[0], lines[1], lines[2]]
        );
    }

    #[test]
    fn removing_a_fault_cascades() {
        let (mut model, faults, lines) = two_faults();
        ModelBuilder::new(&mut model).remove_fault(faults[0]).unwrap();
        assert_eq!(model.nb_faults(), 1);
        assert_eq!(model.nb_collections(lines[0]), 0);
        assert_eq!(model.nb_collections(lines[2]), 1);
        assert_eq!(model.collections_of(lines[2]).collect::<Vec<_>>(), vec![faults[1]]);
        assert!(matches!(
            model.fault(faults[0]),
            Err(GeostrataError::Component(ComponentError::NotFound { .. }))
        ));
    }

    #[test]
    fn removing_a_line_cascades() {
        let (mut model, faults, lines) = two_faults();
        ModelBuilder::new(&mut model).remove_line(lines[2]).unwrap();
        assert_eq!(model.nb_items(faults[0]), 2);
        assert_eq!(model.nb_items(faults[1]), 1);
        assert_eq!(model.nb_lines(), 3);
        assert!(model.mesh(lines[2]).is_err());
    }

    #[test]
    fn locked_builder_keeps_stack_nodes() {
        let mut model = CrossSection::new();
        let horizon = ModelBuilder::new(&mut model).add_horizon();
        let mut locked = ModelBuilder::new(&mut model).with_locked_stack_nodes();
        let typed = locked.add_horizon_with_type(HorizonType::Conformal).unwrap();
        assert!(matches!(
            locked.remove_horizon(horizon),
            Err(GeostrataError::Component(ComponentError::StackManaged { id, .. })) if id == horizon
        ));
        assert!(locked.set_name(horizon, ComponentKind::Horizon, "h").is_err());
        let fault = locked.add_fault();
        locked.set_fault_name(fault, "F1").unwrap();
        assert_eq!(model.nb_horizons(), 2);
        assert!(model.horizon(typed).unwrap().has_type());
        ModelBuilder::new(&mut model).remove_horizon(horizon).unwrap();
        assert_eq!(model.nb_horizons(), 1);
    }

    #[test]
    fn metadata_updates() {
        let mut model = CrossSection::new();
        let mut builder = ModelBuilder::new(&mut model);
        let fault = builder.add_fault_with_type(FaultType::Normal).unwrap();
        let horizon = builder.add_horizon();
        builder.set_fault_name(fault, "F1").unwrap();
        builder.set_horizon_type(horizon, HorizonType::Topography).unwrap();
        assert!(builder.set_fault_name(horizon, "oops").is_err());
        assert_eq!(model.fault(fault).unwrap().name(), "F1");
        assert_eq!(model.fault(fault).unwrap().fault_type(), FaultType::Normal);
        assert!(model.horizon(horizon).unwrap().has_type());
        assert_eq!(model.horizon(horizon).unwrap().name(), "unknown");
        assert_eq!(
            model.component_id_from_name(ComponentKind::Fault, "F1"),
            Some(fault)
        );
    }

    #[test]
    fn incompatible_pairings_are_rejected() {
        let mut model = CrossSection::new();
        let mut builder = ModelBuilder::new(&mut model);
        let fault = builder.add_fault();
        let block = builder.add_fault_block();
        let surface = builder.add_surface(unit_triangle()).unwrap();
        let line = builder.add_line(segment(0.0)).unwrap();
        assert!(matches!(
            builder.add_item_in_collection(surface, fault),
            Err(GeostrataError::Component(ComponentError::InvalidRelation { .. }))
        ));
        assert!(builder.add_item_in_collection(line, block).is_err());
        assert!(builder.add_item_in_collection(line, surface).is_err());
        builder.add_surface_in_fault_block(surface, block).unwrap();
        assert_eq!(model.nb_items(fault), 0);
        assert_eq!(model.nb_items(block), 1);
    }

    #[test]
    fn item_kinds_follow_dimension() {
        let mut model = CrossSection::new();
        let result = ModelBuilder::new(&mut model).add_block(TetrahedralSolid::default());
        assert!(matches!(
            result,
            Err(GeostrataError::Component(ComponentError::UnsupportedKind { dimension: 2, .. }))
        ));
        assert!(model.is_empty());

        let mut model = StructuralModel::new();
        let line = EdgedCurve::new(vec![Point3::origin(), Point3::new(1.0, 0.0, 0.0)], vec![[0, 1]])
            .unwrap();
        assert!(ModelBuilder::new(&mut model).add_line(line).is_err());
    }

    #[test]
    fn boundary_and_internal_are_exclusive() {
        let mut model = CrossSection::new();
        let mut builder = ModelBuilder::new(&mut model);
        let surface = builder.add_surface(unit_triangle()).unwrap();
        let border = builder.add_line(segment(0.0)).unwrap();
        let inner = builder.add_line(segment(0.25)).unwrap();
        builder.add_boundary(border, surface).unwrap();
        builder.add_internal(inner, surface).unwrap();
        assert!(builder.add_internal(border, surface).is_err());
        assert!(builder.add_boundary(surface, border).is_err());
        assert!(model.is_boundary(border, surface));
        assert!(model.is_internal(inner, surface));
        assert_eq!(model.incidences(border).collect::<Vec<_>>(), vec![surface]);
        assert_eq!(model.embeddings(inner).collect::<Vec<_>>(), vec![surface]);
        assert_eq!(model.boundaries(surface).count(), 1);
        assert_eq!(model.internal_items(surface).count(), 1);
    }

    #[test]
    fn removing_a_surface_drops_item_topology() {
        let mut model = CrossSection::new();
        let mut builder = ModelBuilder::new(&mut model);
        let surface = builder.add_surface(unit_triangle()).unwrap();
        let border = builder.add_line(segment(0.0)).unwrap();
        builder.add_boundary(border, surface).unwrap();
        builder.remove_surface(surface).unwrap();
        assert_eq!(model.incidences(border).count(), 0);
        assert_eq!(model.nb_surfaces(), 0);
    }

    #[test]
    fn copy_is_independent() {
        let (source, faults, lines) = two_faults();
        let mut copy = CrossSection::new();
        ModelBuilder::new(&mut copy).copy(&source).unwrap();
        assert_eq!(copy.nb_faults(), 2);
        assert_eq!(copy.nb_lines(), 4);
        assert_eq!(copy.nb_collections(lines[2]), 2);

        let mut builder = ModelBuilder::new(&mut copy);
        builder.remove_line(lines[0]).unwrap();
        builder.set_fault_name(faults[1], "renamed").unwrap();
        assert_eq!(source.nb_lines(), 4);
        assert_eq!(source.nb_items(faults[0]), 3);
        assert_eq!(source.fault(faults[1]).unwrap().name(), "unknown");

        let mut target = source.clone();
        assert!(matches!(
            ModelBuilder::new(&mut target).copy(&source),
            Err(GeostrataError::Component(ComponentError::NotEmpty))
        ));
    }
}
