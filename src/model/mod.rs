mod builder;
mod stratigraphic;

pub use builder::ModelBuilder;
pub use stratigraphic::{
    Stratigraphic, StratigraphicBuilder, StratigraphicModel, StratigraphicSection,
};

use std::collections::HashMap;

use uuid::Uuid;

use crate::crs::CrsInfo;
use crate::error::{ComponentError, Result};
use crate::math::BoundingBox;
use crate::mesh::{EdgedCurve, ItemMesh, SimplicialMesh, TetrahedralSolid, TriangulatedSurface};
use crate::topology::{Component, ComponentCatalog, ComponentKind, RelationGraph};

/// Structural model of dimension `D`: geological features, their geometric
/// items and the relations between them.
///
/// Read-only; every mutation goes through [`ModelBuilder`].
#[derive(Debug, Clone, Default)]
pub struct GeologicalModel<const D: usize> {
    catalog: ComponentCatalog,
    /// collection -> item
    membership: RelationGraph,
    /// incident item -> boundary item
    boundaries: RelationGraph,
    /// embedding item -> internal item
    internals: RelationGraph,
    meshes: HashMap<Uuid, ItemMesh<D>>,
    crs: Option<CrsInfo>,
}

/// 2D model made of lines and surfaces.
pub type CrossSection = GeologicalModel<2>;

/// 3D model made of surfaces and blocks.
pub type StructuralModel = GeologicalModel<3>;

impl<const D: usize> GeologicalModel<D> {
    /// Creates a new, empty model.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// File extension used when saving this kind of model.
    #[must_use]
    pub fn native_extension() -> &'static str {
        if D == 2 {
            "og_xsctn"
        } else {
            "og_strm"
        }
    }

    /// Item kind filling the model space: surfaces in 2D, blocks in 3D.
    #[must_use]
    pub fn cell_kind() -> ComponentKind {
        if D == 2 {
            ComponentKind::Surface
        } else {
            ComponentKind::Block
        }
    }

    /// Item kind separating cells: lines in 2D, surfaces in 3D.
    #[must_use]
    pub fn facet_kind() -> ComponentKind {
        if D == 2 {
            ComponentKind::Line
        } else {
            ComponentKind::Surface
        }
    }

    /// Whether items of `kind` can live in this model.
    #[must_use]
    pub fn supports_item_kind(kind: ComponentKind) -> bool {
        kind == Self::cell_kind() || kind == Self::facet_kind()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.catalog.is_empty()
    }

    /// # Errors
    ///
    /// Returns [`ComponentError::UnknownId`] if `id` is not registered.
    pub fn component(&self, id: Uuid) -> Result<&Component> {
        Ok(self.catalog.get(id)?)
    }

    #[must_use]
    pub fn has_component(&self, id: Uuid) -> bool {
        self.catalog.contains(id)
    }

    /// # Errors
    ///
    /// Returns an error unless `id` names a component of `kind`.
    pub fn component_of_kind(&self, id: Uuid, kind: ComponentKind) -> Result<&Component> {
        Ok(self.catalog.get_of_kind(id, kind)?)
    }

    /// Components of `kind` in creation order.
    pub fn components(&self, kind: ComponentKind) -> impl Iterator<Item = &Component> + '_ {
        self.catalog.iter_kind(kind)
    }

    #[must_use]
    pub fn nb_components(&self, kind: ComponentKind) -> usize {
        self.catalog.count(kind)
    }

    #[must_use]
    pub fn component_id_from_name(&self, kind: ComponentKind, name: &str) -> Option<Uuid> {
        self.catalog.find_by_name(kind, name)
    }

    /// # Errors
    ///
    /// Returns an error unless `id` is a fault of the model.
    pub fn fault(&self, id: Uuid) -> Result<&Component> {
        self.component_of_kind(id, ComponentKind::Fault)
    }

    /// # Errors
    ///
    /// Returns an error unless `id` is a horizon of the model.
    pub fn horizon(&self, id: Uuid) -> Result<&Component> {
        self.component_of_kind(id, ComponentKind::Horizon)
    }

    /// # Errors
    ///
    /// Returns an error unless `id` is a fault block of the model.
    pub fn fault_block(&self, id: Uuid) -> Result<&Component> {
        self.component_of_kind(id, ComponentKind::FaultBlock)
    }

    /// # Errors
    ///
    /// Returns an error unless `id` is a stratigraphic unit of the model.
    pub fn stratigraphic_unit(&self, id: Uuid) -> Result<&Component> {
        self.component_of_kind(id, ComponentKind::StratigraphicUnit)
    }

    pub fn faults(&self) -> impl Iterator<Item = &Component> + '_ {
        self.components(ComponentKind::Fault)
    }

    pub fn horizons(&self) -> impl Iterator<Item = &Component> + '_ {
        self.components(ComponentKind::Horizon)
    }

    pub fn fault_blocks(&self) -> impl Iterator<Item = &Component> + '_ {
        self.components(ComponentKind::FaultBlock)
    }

    pub fn stratigraphic_units(&self) -> impl Iterator<Item = &Component> + '_ {
        self.components(ComponentKind::StratigraphicUnit)
    }

    pub fn lines(&self) -> impl Iterator<Item = &Component> + '_ {
        self.components(ComponentKind::Line)
    }

    pub fn surfaces(&self) -> impl Iterator<Item = &Component> + '_ {
        self.components(ComponentKind::Surface)
    }

    pub fn blocks(&self) -> impl Iterator<Item = &Component> + '_ {
        self.components(ComponentKind::Block)
    }

    #[must_use]
    pub fn nb_faults(&self) -> usize {
        self.nb_components(ComponentKind::Fault)
    }

    #[must_use]
    pub fn nb_horizons(&self) -> usize {
        self.nb_components(ComponentKind::Horizon)
    }

    #[must_use]
    pub fn nb_fault_blocks(&self) -> usize {
        self.nb_components(ComponentKind::FaultBlock)
    }

    #[must_use]
    pub fn nb_stratigraphic_units(&self) -> usize {
        self.nb_components(ComponentKind::StratigraphicUnit)
    }

    #[must_use]
    pub fn nb_lines(&self) -> usize {
        self.nb_components(ComponentKind::Line)
    }

    #[must_use]
    pub fn nb_surfaces(&self) -> usize {
        self.nb_components(ComponentKind::Surface)
    }

    #[must_use]
    pub fn nb_blocks(&self) -> usize {
        self.nb_components(ComponentKind::Block)
    }

    // --- Collection membership ---

    /// Items of `collection` in the order they were added.
    pub fn items_of(&self, collection: Uuid) -> impl Iterator<Item = Uuid> + '_ {
        self.membership.children_of(collection)
    }

    /// Collections containing `item`.
    pub fn collections_of(&self, item: Uuid) -> impl Iterator<Item = Uuid> + '_ {
        self.membership.parents_of(item)
    }

    #[must_use]
    pub fn nb_items(&self, collection: Uuid) -> usize {
        self.membership.nb_children(collection)
    }

    #[must_use]
    pub fn nb_collections(&self, item: Uuid) -> usize {
        self.membership.nb_parents(item)
    }

    #[must_use]
    pub fn is_item_in_collection(&self, item: Uuid, collection: Uuid) -> bool {
        self.membership.has_edge(collection, item)
    }

    fn items_of_kind(&self, collection: Uuid, kind: ComponentKind) -> Result<Vec<Uuid>> {
        self.component_of_kind(collection, kind)?;
        Ok(self.items_of(collection).collect())
    }

    /// # Errors
    ///
    /// Returns an error unless `fault` is a fault of the model.
    pub fn fault_items(&self, fault: Uuid) -> Result<Vec<Uuid>> {
        self.items_of_kind(fault, ComponentKind::Fault)
    }

    /// # Errors
    ///
    /// Returns an error unless `horizon` is a horizon of the model.
    pub fn horizon_items(&self, horizon: Uuid) -> Result<Vec<Uuid>> {
        self.items_of_kind(horizon, ComponentKind::Horizon)
    }

    /// # Errors
    ///
    /// Returns an error unless `fault_block` is a fault block of the model.
    pub fn fault_block_items(&self, fault_block: Uuid) -> Result<Vec<Uuid>> {
        self.items_of_kind(fault_block, ComponentKind::FaultBlock)
    }

    /// # Errors
    ///
    /// Returns an error unless `unit` is a stratigraphic unit of the model.
    pub fn stratigraphic_unit_items(&self, unit: Uuid) -> Result<Vec<Uuid>> {
        self.items_of_kind(unit, ComponentKind::StratigraphicUnit)
    }

    // --- Item topology ---

    /// Items bounding `item`.
    pub fn boundaries(&self, item: Uuid) -> impl Iterator<Item = Uuid> + '_ {
        self.boundaries.children_of(item)
    }

    /// Items bounded by `item`.
    pub fn incidences(&self, item: Uuid) -> impl Iterator<Item = Uuid> + '_ {
        self.boundaries.parents_of(item)
    }

    /// Items embedded inside `item`.
    pub fn internal_items(&self, item: Uuid) -> impl Iterator<Item = Uuid> + '_ {
        self.internals.children_of(item)
    }

    /// Items `item` is embedded in.
    pub fn embeddings(&self, item: Uuid) -> impl Iterator<Item = Uuid> + '_ {
        self.internals.parents_of(item)
    }

    #[must_use]
    pub fn is_boundary(&self, item: Uuid, parent: Uuid) -> bool {
        self.boundaries.has_edge(parent, item)
    }

    #[must_use]
    pub fn is_internal(&self, item: Uuid, parent: Uuid) -> bool {
        self.internals.has_edge(parent, item)
    }

    // --- Geometry ---

    /// Mesh of any item.
    ///
    /// # Errors
    ///
    /// Returns [`ComponentError::UnknownId`] if `item` has no mesh.
    pub fn mesh(&self, item: Uuid) -> Result<&ItemMesh<D>> {
        self.meshes
            .get(&item)
            .ok_or_else(|| ComponentError::UnknownId(item).into())
    }

    /// # Errors
    ///
    /// Returns an error unless `line` is a line of the model.
    pub fn line_mesh(&self, line: Uuid) -> Result<&EdgedCurve<D>> {
        match self.mesh(line)? {
            ItemMesh::Curve(mesh) => Ok(mesh),
            _ => Err(self.wrong_item_kind(line, ComponentKind::Line)),
        }
    }

    /// # Errors
    ///
    /// Returns an error unless `surface` is a surface of the model.
    pub fn surface_mesh(&self, surface: Uuid) -> Result<&TriangulatedSurface<D>> {
        match self.mesh(surface)? {
            ItemMesh::Triangulated(mesh) => Ok(mesh),
            _ => Err(self.wrong_item_kind(surface, ComponentKind::Surface)),
        }
    }

    /// # Errors
    ///
    /// Returns an error unless `block` is a block of the model.
    pub fn block_mesh(&self, block: Uuid) -> Result<&TetrahedralSolid<D>> {
        match self.mesh(block)? {
            ItemMesh::Tetrahedral(mesh) => Ok(mesh),
            _ => Err(self.wrong_item_kind(block, ComponentKind::Block)),
        }
    }

    fn wrong_item_kind(&self, id: Uuid, expected: ComponentKind) -> crate::error::GeostrataError {
        match self.catalog.get(id) {
            Ok(component) => ComponentError::WrongKind {
                id,
                expected,
                found: component.kind(),
            }
            .into(),
            Err(e) => e.into(),
        }
    }

    /// Bounding box of every item mesh.
    #[must_use]
    pub fn bounding_box(&self) -> Option<BoundingBox<D>> {
        self.meshes
            .values()
            .filter_map(|mesh| mesh.as_simplicial().bounding_box())
            .reduce(|mut acc, bbox| {
                acc.add_box(&bbox);
                acc
            })
    }

    #[must_use]
    pub fn coordinate_reference_system(&self) -> Option<&CrsInfo> {
        self.crs.as_ref()
    }

    pub(crate) fn catalog(&self) -> &ComponentCatalog {
        &self.catalog
    }

    pub(crate) fn membership(&self) -> &RelationGraph {
        &self.membership
    }

    pub(crate) fn boundary_graph(&self) -> &RelationGraph {
        &self.boundaries
    }

    pub(crate) fn internal_graph(&self) -> &RelationGraph {
        &self.internals
    }

    pub(crate) fn meshes(&self) -> impl Iterator<Item = (Uuid, &ItemMesh<D>)> + '_ {
        self.catalog
            .ids(Self::facet_kind())
            .chain(self.catalog.ids(Self::cell_kind()))
            .filter_map(move |id| self.meshes.get(&id).map(|mesh| (id, mesh)))
    }
}
