use std::cell::RefCell;
use std::collections::HashMap;
use std::ops::Deref;
use std::rc::Rc;

use tracing::{debug, info};
use uuid::Uuid;

use super::{GeologicalModel, ModelBuilder};
use crate::error::{ComponentError, GeostrataError, MappingError, Result, StackError};
use crate::math::{BoundingBox, Point, Vector, TOLERANCE};
use crate::mesh::{
    EdgedCurve, ItemMesh, LocatorParams, SimplicialMesh, TriangulatedSurface, VertexAttributes,
};
use crate::operations::{
    InvalidStratigraphicElements, MeshMapping, StratigraphicBoundingBox,
    StratigraphicCoordinatesFromVertex, StratigraphicItemMesh, IMPLICIT_ATTRIBUTE,
    STRATIGRAPHIC_LOCATION_ATTRIBUTE,
};
use crate::stack::{HorizonsStack, HorizonsStackBuilder, UnitSplit};
use crate::topology::{Component, ComponentKind, HorizonType};

/// Mappings of cell items, built on first query and dropped whenever a
/// [`StratigraphicBuilder`] opens on the model.
#[derive(Default)]
struct MappingCache<const D: usize> {
    mappings: RefCell<HashMap<Uuid, Rc<MeshMapping<D>>>>,
}

impl<const D: usize> MappingCache<D> {
    fn get(&self, item: Uuid) -> Option<Rc<MeshMapping<D>>> {
        self.mappings.borrow().get(&item).cloned()
    }

    fn insert(&self, item: Uuid, mapping: Rc<MeshMapping<D>>) {
        self.mappings.borrow_mut().insert(item, mapping);
    }

    fn clear(&mut self) {
        self.mappings.get_mut().clear();
    }
}

impl<const D: usize> Clone for MappingCache<D> {
    fn clone(&self) -> Self {
        Self::default()
    }
}

impl<const D: usize> std::fmt::Debug for MappingCache<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let cached = self.mappings.try_borrow().map_or(0, |mappings| mappings.len());
        f.debug_struct("MappingCache").field("cached", &cached).finish()
    }
}

/// Geological model carrying a horizons stack and stratigraphic
/// coordinates on its cell items.
///
/// Derefs to the underlying [`GeologicalModel`] for every structural query.
#[derive(Debug, Clone, Default)]
pub struct Stratigraphic<const D: usize> {
    model: GeologicalModel<D>,
    stack: HorizonsStack<D>,
    horizon_isovalues: HashMap<Uuid, f64>,
    locator: LocatorParams,
    mappings: MappingCache<D>,
}

/// Cross-section with stratigraphic coordinates.
pub type StratigraphicSection = Stratigraphic<2>;

/// 3D model with stratigraphic coordinates.
pub type StratigraphicModel = Stratigraphic<3>;

impl<const D: usize> Deref for Stratigraphic<D> {
    type Target = GeologicalModel<D>;

    fn deref(&self) -> &Self::Target {
        &self.model
    }
}

impl<const D: usize> Stratigraphic<D> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Wraps an existing model with an empty horizons stack.
    #[must_use]
    pub fn from_model(model: GeologicalModel<D>) -> Self {
        Self {
            model,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn native_extension() -> &'static str {
        if D == 2 {
            "og_stgs"
        } else {
            "og_stgm"
        }
    }

    #[must_use]
    pub fn model(&self) -> &GeologicalModel<D> {
        &self.model
    }

    #[must_use]
    pub fn horizons_stack(&self) -> &HorizonsStack<D> {
        &self.stack
    }

    /// Point-location parameters used by coordinate queries.
    #[must_use]
    pub fn locator_params(&self) -> LocatorParams {
        self.locator
    }

    /// Stratigraphic coordinates stored on a vertex of a cell item.
    ///
    /// # Errors
    ///
    /// Returns [`MappingError::MissingAttribute`] if the vertex has none.
    pub fn stratigraphic_coordinates_from_vertex_id(
        &self,
        item: Uuid,
        vertex: usize,
    ) -> Result<Point<D>> {
        StratigraphicCoordinatesFromVertex::new(item, vertex).execute(&self.model)
    }

    /// # Errors
    ///
    /// Returns [`MappingError::OutsideMesh`] if `point` is not on the item,
    /// and [`MappingError::MissingAttribute`] if the element holding it has
    /// an unattributed vertex.
    pub fn stratigraphic_coordinates_from_geometric_point(
        &self,
        item: Uuid,
        point: &Point<D>,
    ) -> Result<Point<D>> {
        Ok(self.mesh_mapping(item)?.stratigraphic_point(point)?)
    }

    /// # Errors
    ///
    /// Returns [`MappingError::OutsideMesh`] if no element of the item maps
    /// onto `point`.
    pub fn geometric_coordinates_from_stratigraphic_point(
        &self,
        item: Uuid,
        point: &Point<D>,
    ) -> Result<Point<D>> {
        Ok(self.mesh_mapping(item)?.geometric_point(point)?)
    }

    /// Mapping of one cell item. Built on first use and kept until the
    /// model is next edited.
    ///
    /// # Errors
    ///
    /// Returns an error if `item` is not a cell item.
    pub fn mesh_mapping(&self, item: Uuid) -> Result<Rc<MeshMapping<D>>> {
        if let Some(mapping) = self.mappings.get(item) {
            return Ok(mapping);
        }
        let mapping = Rc::new(MeshMapping::for_item(&self.model, item, self.locator)?);
        self.mappings.insert(item, Rc::clone(&mapping));
        debug!(%item, "built stratigraphic mapping");
        Ok(mapping)
    }

    /// Bounds of every stratigraphic coordinate in the model.
    ///
    /// # Errors
    ///
    /// Returns an error if an attributed item misses a value.
    pub fn stratigraphic_bounding_box(&self) -> Result<Option<BoundingBox<D>>> {
        StratigraphicBoundingBox::new().execute(&self.model)
    }

    /// Implicit value stored on a vertex of a cell item.
    ///
    /// # Errors
    ///
    /// Returns [`MappingError::MissingAttribute`] if the vertex has none.
    pub fn implicit_value(&self, item: Uuid, vertex: usize) -> Result<f64> {
        let mesh = self.model.mesh(item)?.as_simplicial();
        mesh.vertex_attributes()
            .value(IMPLICIT_ATTRIBUTE, vertex)
            .and_then(|v| v.first().copied())
            .ok_or_else(|| {
                MappingError::MissingAttribute {
                    item,
                    vertex,
                    attribute: IMPLICIT_ATTRIBUTE.to_owned(),
                }
                .into()
            })
    }

    /// Implicit value interpolated at a geometric point of a cell item.
    ///
    /// # Errors
    ///
    /// Returns [`MappingError::OutsideMesh`] if `point` is not on the item.
    pub fn implicit_value_at(&self, item: Uuid, point: &Point<D>) -> Result<f64> {
        Ok(self.mesh_mapping(item)?.implicit_value(point)?)
    }

    /// Implicit value of a horizon, if one was assigned.
    ///
    /// # Errors
    ///
    /// Returns an error if `horizon` is not in the horizons stack.
    pub fn horizon_implicit_value(&self, horizon: Uuid) -> Result<Option<f64>> {
        self.stack.horizon(horizon)?;
        Ok(self.horizon_isovalues.get(&horizon).copied())
    }

    /// Whether implicit values grow upward, read from the first unit bounded
    /// by two horizons.
    #[must_use]
    pub fn increasing_stack_isovalues(&self) -> Option<bool> {
        let unit = self.stack.stratigraphic_units().find(|unit| {
            self.stack.above(unit.id()).is_ok() && self.stack.under(unit.id()).is_ok()
        })?;
        let above = self.stack.above(unit.id()).ok()?;
        let under = self.stack.under(unit.id()).ok()?;
        let above = self.horizon_isovalues.get(&above)?;
        let under = self.horizon_isovalues.get(&under)?;
        Some(above > under)
    }

    /// Whether `value` lies on the upper side of `horizon`.
    ///
    /// # Errors
    ///
    /// Returns [`StackError::UndefinedDirection`] when the isovalues do not
    /// tell which way is up, and [`StackError::MissingIsovalue`] when the
    /// horizon has no isovalue.
    pub fn implicit_value_is_above_horizon(&self, value: f64, horizon: Uuid) -> Result<bool> {
        let increasing = self
            .increasing_stack_isovalues()
            .ok_or(StackError::UndefinedDirection)?;
        let isovalue = self
            .horizon_isovalues
            .get(&horizon)
            .ok_or(StackError::MissingIsovalue(horizon))?;
        Ok(increasing == (value >= *isovalue))
    }

    /// Stratigraphic unit whose horizons bracket `value`.
    ///
    /// A unit with a single bounding horizon holds every value on its side
    /// of that horizon.
    #[must_use]
    pub fn containing_stratigraphic_unit(&self, value: f64) -> Option<Uuid> {
        let increasing = self.increasing_stack_isovalues()?;
        let is_above = |horizon: Uuid| {
            self.horizon_isovalues
                .get(&horizon)
                .map(|isovalue| increasing == (value >= *isovalue))
        };
        self.stack.stratigraphic_units().map(|unit| unit.id()).find(|unit| {
            let under = self.stack.under(*unit).ok().and_then(is_above);
            let above = self.stack.above(*unit).ok().and_then(is_above);
            match (under, above) {
                (Some(over_base), Some(over_top)) => over_base && !over_top,
                (Some(over_base), None) => over_base,
                (None, Some(over_top)) => !over_top,
                (None, None) => false,
            }
        })
    }

    /// Cell elements whose stratigraphic image is folded.
    ///
    /// # Errors
    ///
    /// Returns an error if an attributed item misses a value.
    pub fn invalid_stratigraphic_elements(&self) -> Result<Vec<(Uuid, usize)>> {
        InvalidStratigraphicElements::new().execute(&self.model)
    }

    fn stratigraphic_item_meshes(&self, parent: Uuid, item: Uuid) -> Result<Vec<ItemMesh<D>>> {
        StratigraphicItemMesh::new(parent, item).execute(&self.model)
    }

    pub(crate) fn horizon_isovalues(&self) -> Vec<(Uuid, f64)> {
        let mut isovalues: Vec<_> = self
            .horizon_isovalues
            .iter()
            .map(|(id, value)| (*id, *value))
            .collect();
        isovalues.sort_unstable_by(|a, b| a.0.cmp(&b.0));
        isovalues
    }
}

impl Stratigraphic<2> {
    /// Line of a section moved to stratigraphic space, as seen from
    /// `surface`: one curve for a boundary line, front and back curves for
    /// an internal one.
    ///
    /// # Errors
    ///
    /// Returns [`MappingError::NotBoundaryNorInternal`] if `line` is neither
    /// a boundary nor an internal line of `surface`.
    pub fn stratigraphic_line(&self, surface: Uuid, line: Uuid) -> Result<Vec<EdgedCurve<2>>> {
        self.stratigraphic_item_meshes(surface, line)?
            .into_iter()
            .map(|mesh| match mesh {
                ItemMesh::Curve(curve) => Ok(curve),
                _ => Err(GeostrataError::from(ComponentError::WrongKind {
                    id: line,
                    expected: ComponentKind::Line,
                    found: ComponentKind::Surface,
                })),
            })
            .collect()
    }
}

impl Stratigraphic<3> {
    /// Surface of a 3D model moved to stratigraphic space, as seen from
    /// `block`: one surface for a boundary, front and back surfaces for an
    /// internal one.
    ///
    /// # Errors
    ///
    /// Returns [`MappingError::NotBoundaryNorInternal`] if `surface` is
    /// neither a boundary nor an internal surface of `block`.
    pub fn stratigraphic_surface(
        &self,
        block: Uuid,
        surface: Uuid,
    ) -> Result<Vec<TriangulatedSurface<3>>> {
        self.stratigraphic_item_meshes(block, surface)?
            .into_iter()
            .map(|mesh| match mesh {
                ItemMesh::Triangulated(triangles) => Ok(triangles),
                _ => Err(GeostrataError::from(ComponentError::WrongKind {
                    id: surface,
                    expected: ComponentKind::Surface,
                    found: ComponentKind::Block,
                })),
            })
            .collect()
    }
}

/// Mutation surface of a [`Stratigraphic`] model.
///
/// Horizons and units created here exist in both the model and its stack
/// under the same id. Opening a builder drops the cached mappings.
#[derive(Debug)]
pub struct StratigraphicBuilder<'a, const D: usize> {
    target: &'a mut Stratigraphic<D>,
}

impl<'a, const D: usize> StratigraphicBuilder<'a, D> {
    #[must_use]
    pub fn new(target: &'a mut Stratigraphic<D>) -> Self {
        target.mappings.clear();
        Self { target }
    }

    /// Builder over the structural part, for items, faults, fault blocks and
    /// memberships. Removing, renaming or retyping a horizon or a unit
    /// through it fails with [`ComponentError::StackManaged`].
    pub fn model_builder(&mut self) -> ModelBuilder<'_, D> {
        ModelBuilder::new(&mut self.target.model).with_locked_stack_nodes()
    }

    fn structure(&mut self) -> ModelBuilder<'_, D> {
        ModelBuilder::new(&mut self.target.model)
    }

    /// Builder over the horizons stack alone.
    pub fn stack_builder(&mut self) -> HorizonsStackBuilder<'_, D> {
        HorizonsStackBuilder::new(&mut self.target.stack)
    }

    pub fn set_locator_params(&mut self, params: LocatorParams) {
        self.target.locator = params;
    }

    // --- Stack nodes ---

    /// # Errors
    ///
    /// Fails only if the new id is already taken in the stack.
    pub fn add_horizon(&mut self) -> Result<Uuid> {
        let id = self.structure().add_horizon();
        self.stack_builder().add_horizon_with_id(id)
    }

    /// # Errors
    ///
    /// Fails only if the new id is already taken in the stack.
    pub fn add_stratigraphic_unit(&mut self) -> Result<Uuid> {
        let id = self.structure().add_stratigraphic_unit();
        self.stack_builder().add_stratigraphic_unit_with_id(id)
    }

    /// # Errors
    ///
    /// Returns an error unless `id` is a horizon of the model.
    pub fn set_horizon_name(&mut self, id: Uuid, name: impl Into<String>) -> Result<()> {
        let name = name.into();
        self.structure().set_horizon_name(id, name.clone())?;
        if self.target.stack.contains(id) {
            self.stack_builder().set_horizon_name(id, name)?;
        }
        Ok(())
    }

    /// # Errors
    ///
    /// Returns an error unless `id` is a horizon of the model.
    pub fn set_horizon_type(&mut self, id: Uuid, horizon_type: HorizonType) -> Result<()> {
        self.structure().set_horizon_type(id, horizon_type)?;
        if self.target.stack.contains(id) {
            self.stack_builder().set_horizon_type(id, horizon_type)?;
        }
        Ok(())
    }

    /// # Errors
    ///
    /// Returns an error unless `id` is a stratigraphic unit of the model.
    pub fn set_stratigraphic_unit_name(&mut self, id: Uuid, name: impl Into<String>) -> Result<()> {
        let name = name.into();
        self.structure()
            .set_stratigraphic_unit_name(id, name.clone())?;
        if self.target.stack.contains(id) {
            self.stack_builder().set_stratigraphic_unit_name(id, name)?;
        }
        Ok(())
    }

    /// Removes a horizon from the model, the stack and the isovalues.
    ///
    /// # Errors
    ///
    /// Returns an error unless `id` is a horizon of the model.
    pub fn remove_horizon(&mut self, id: Uuid) -> Result<()> {
        self.structure().remove_horizon(id)?;
        if self.target.stack.contains(id) {
            self.stack_builder().remove_horizon(id)?;
        }
        self.target.horizon_isovalues.remove(&id);
        Ok(())
    }

    /// # Errors
    ///
    /// Returns an error unless `id` is a stratigraphic unit of the model.
    pub fn remove_stratigraphic_unit(&mut self, id: Uuid) -> Result<()> {
        self.structure().remove_stratigraphic_unit(id)?;
        if self.target.stack.contains(id) {
            self.stack_builder().remove_stratigraphic_unit(id)?;
        }
        Ok(())
    }

    /// # Errors
    ///
    /// See [`HorizonsStackBuilder::add_horizon_under`].
    pub fn add_horizon_under(&mut self, horizon: Uuid, unit: Uuid) -> Result<()> {
        self.stack_builder().add_horizon_under(horizon, unit)
    }

    /// # Errors
    ///
    /// See [`HorizonsStackBuilder::add_horizon_above`].
    pub fn add_horizon_above(&mut self, horizon: Uuid, unit: Uuid) -> Result<()> {
        self.stack_builder().add_horizon_above(horizon, unit)
    }

    /// Splits a unit of the stack and mirrors the split in the model. The
    /// original unit leaves the model together with its memberships.
    ///
    /// # Errors
    ///
    /// Returns an error if `unit` is not a stratigraphic unit of the stack.
    pub fn add_horizon_in_stratigraphic_unit(&mut self, unit: Uuid) -> Result<UnitSplit> {
        let in_model = self.target.model.has_component(unit);
        if in_model {
            self.target
                .model
                .component_of_kind(unit, ComponentKind::StratigraphicUnit)?;
        }
        let split = self.stack_builder().add_horizon_in_stratigraphic_unit(unit)?;
        let missing = missing_stack_nodes(&self.target.model, &self.target.stack)?;
        if in_model {
            let dropped = self.target.model.nb_items(unit);
            self.structure().remove_stratigraphic_unit(unit)?;
            debug!(%unit, dropped, "replaced split unit in model");
        }
        self.register_stack_nodes(missing)?;
        Ok(split)
    }

    /// Replaces the horizons stack. Stack nodes missing from the model are
    /// added to it with the same id, name and type; isovalues of horizons
    /// absent from the new stack are dropped.
    ///
    /// # Errors
    ///
    /// Returns an error if a stack id names a different kind in the model.
    pub fn set_horizons_stack(&mut self, stack: HorizonsStack<D>) -> Result<()> {
        let missing = missing_stack_nodes(&self.target.model, &stack)?;
        self.target.stack = stack;
        self.register_stack_nodes(missing)?;
        let stack = &self.target.stack;
        self.target
            .horizon_isovalues
            .retain(|horizon, _| stack.contains(*horizon));
        Ok(())
    }

    /// Inserts nodes returned by [`missing_stack_nodes`], whose ids are new
    /// to the model.
    fn register_stack_nodes(&mut self, missing: Vec<Component>) -> Result<()> {
        let mut builder = self.structure();
        for component in missing {
            builder.insert_component(component)?;
        }
        Ok(())
    }

    // --- Stratigraphic coordinates ---

    fn cell_attributes(&mut self, item: Uuid) -> Result<&mut VertexAttributes> {
        self.target
            .model
            .component_of_kind(item, GeologicalModel::<D>::cell_kind())?;
        self.target
            .model
            .meshes
            .get_mut(&item)
            .map(ItemMesh::attributes_mut)
            .ok_or_else(|| ComponentError::UnknownId(item).into())
    }

    /// Sets both the location and the implicit value of a vertex.
    ///
    /// # Errors
    ///
    /// Returns an error unless `item` is a cell item holding `vertex`.
    pub fn set_stratigraphic_coordinates(
        &mut self,
        item: Uuid,
        vertex: usize,
        point: &Point<D>,
    ) -> Result<()> {
        let coords = point.coords.as_slice();
        self.set_stratigraphic_location(item, vertex, &coords[..D - 1])?;
        self.set_implicit_value(item, vertex, coords[D - 1])
    }

    /// # Errors
    ///
    /// Returns [`MappingError::AttributeDimension`] unless `location` holds
    /// `D - 1` values.
    pub fn set_stratigraphic_location(
        &mut self,
        item: Uuid,
        vertex: usize,
        location: &[f64],
    ) -> Result<()> {
        if location.len() + 1 != D {
            return Err(MappingError::AttributeDimension {
                attribute: STRATIGRAPHIC_LOCATION_ATTRIBUTE.to_owned(),
                expected: D - 1,
                found: location.len(),
            }
            .into());
        }
        let attributes = self.cell_attributes(item)?;
        attributes.set_value(STRATIGRAPHIC_LOCATION_ATTRIBUTE, vertex, location)?;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns an error unless `item` is a cell item holding `vertex`.
    pub fn set_implicit_value(&mut self, item: Uuid, vertex: usize, value: f64) -> Result<()> {
        let attributes = self.cell_attributes(item)?;
        attributes.set_value(IMPLICIT_ATTRIBUTE, vertex, &[value])?;
        Ok(())
    }

    /// Copies a scalar vertex attribute of `item` into its implicit values.
    /// Vertices where the field is unset keep their implicit value.
    ///
    /// # Errors
    ///
    /// Returns an error if the field is missing or not scalar.
    pub fn implicit_values_from_scalar_field(&mut self, item: Uuid, field: &str) -> Result<()> {
        let attributes = self.cell_attributes(item)?;
        let source = attributes
            .attribute(field)
            .ok_or_else(|| MappingError::MissingAttribute {
                item,
                vertex: 0,
                attribute: field.to_owned(),
            })?;
        if source.dimension() != 1 {
            return Err(MappingError::AttributeDimension {
                attribute: field.to_owned(),
                expected: 1,
                found: source.dimension(),
            }
            .into());
        }
        let values: Vec<(usize, f64)> = (0..source.assigned_flags().len())
            .filter_map(|v| source.value(v).and_then(|x| x.first()).map(|x| (v, *x)))
            .collect();
        for (vertex, value) in values {
            attributes.set_value(IMPLICIT_ATTRIBUTE, vertex, &[value])?;
        }
        Ok(())
    }

    /// Sets the stratigraphic location of every cell vertex to its geometric
    /// coordinates, leaving out `implicit_axis`.
    ///
    /// # Errors
    ///
    /// Returns [`MappingError::InvalidAxis`] if `implicit_axis >= D`.
    pub fn stratigraphic_location_from_axes(&mut self, implicit_axis: usize) -> Result<()> {
        if implicit_axis >= D {
            return Err(MappingError::InvalidAxis {
                axis: implicit_axis,
                dimension: D,
            }
            .into());
        }
        let items: Vec<Uuid> = self
            .target
            .model
            .components(GeologicalModel::<D>::cell_kind())
            .map(|c| c.id())
            .collect();
        for item in items {
            let points = self.target.model.mesh(item)?.as_simplicial().points().to_vec();
            let attributes = self.cell_attributes(item)?;
            for (vertex, point) in points.iter().enumerate() {
                let location: Vec<f64> = (0..D)
                    .filter(|axis| *axis != implicit_axis)
                    .map(|axis| point[axis])
                    .collect();
                attributes.set_value(STRATIGRAPHIC_LOCATION_ATTRIBUTE, vertex, &location)?;
            }
        }
        Ok(())
    }

    /// Multiplies every implicit value and every horizon isovalue by
    /// `factor`.
    pub fn rescale_implicit_values(&mut self, factor: f64) {
        let items: Vec<Uuid> = self
            .target
            .model
            .components(GeologicalModel::<D>::cell_kind())
            .map(|c| c.id())
            .collect();
        let mut builder = ModelBuilder::new(&mut self.target.model);
        for item in items {
            if let Ok(attributes) = builder.item_attributes_mut(item) {
                attributes.update_values(IMPLICIT_ATTRIBUTE, |value| {
                    for x in value {
                        *x *= factor;
                    }
                });
            }
        }
        for isovalue in self.target.horizon_isovalues.values_mut() {
            *isovalue *= factor;
        }
        debug!(factor, "rescaled implicit values");
    }

    /// Rescales implicit values so that the stratigraphic aspect ratio of the
    /// first and last axes matches the geometric one. Returns the factor.
    ///
    /// # Errors
    ///
    /// Returns [`MappingError::Degenerate`] when the model or its
    /// stratigraphic image has no extent along the first or the last axis.
    /// Nothing is rescaled then.
    pub fn rescale_implicit_values_to_bbox_scale(&mut self) -> Result<f64> {
        let degenerate = |what: &str| MappingError::Degenerate(format!("{what} has no extent"));
        let geometric = self
            .target
            .model
            .bounding_box()
            .ok_or_else(|| degenerate("model"))?
            .diagonal();
        let stratigraphic = self
            .target
            .stratigraphic_bounding_box()?
            .ok_or_else(|| degenerate("stratigraphic space"))?
            .diagonal();
        let factor = bbox_scale_factor(&geometric, &stratigraphic)?;
        self.rescale_implicit_values(factor);
        info!(factor, "rescaled implicit values to bounding box");
        Ok(factor)
    }

    /// # Errors
    ///
    /// Returns an error if `horizon` is not in the horizons stack.
    pub fn set_horizon_implicit_value(&mut self, horizon: Uuid, value: f64) -> Result<()> {
        self.target.stack.horizon(horizon)?;
        self.target.horizon_isovalues.insert(horizon, value);
        Ok(())
    }

    /// Deep-copies `source`, stack and isovalues included.
    ///
    /// # Errors
    ///
    /// Returns [`ComponentError::NotEmpty`] unless the target is empty.
    pub fn copy(&mut self, source: &Stratigraphic<D>) -> Result<()> {
        if !self.target.stack.catalog().is_empty() || !self.target.horizon_isovalues.is_empty() {
            return Err(ComponentError::NotEmpty.into());
        }
        self.structure().copy(&source.model)?;
        self.stack_builder().copy(&source.stack)?;
        self.target.horizon_isovalues = source.horizon_isovalues.clone();
        self.target.locator = source.locator;
        Ok(())
    }

    pub(crate) fn restore_isovalues(&mut self, isovalues: Vec<(Uuid, f64)>) {
        self.target.horizon_isovalues = isovalues.into_iter().collect();
    }

    pub(crate) fn restore_stack(&mut self, stack: HorizonsStack<D>) {
        self.target.stack = stack;
    }

    pub(crate) fn restore_model(&mut self, model: GeologicalModel<D>) {
        self.target.model = model;
    }
}

/// Stack nodes absent from `model`, after checking that every stack id the
/// model already holds names a component of the same kind.
fn missing_stack_nodes<const D: usize>(
    model: &GeologicalModel<D>,
    stack: &HorizonsStack<D>,
) -> Result<Vec<Component>> {
    let mut missing = Vec::new();
    for component in stack.catalog().iter() {
        match model.component(component.id()) {
            Ok(existing) if existing.kind() != component.kind() => {
                return Err(ComponentError::WrongKind {
                    id: component.id(),
                    expected: component.kind(),
                    found: existing.kind(),
                }
                .into());
            }
            Ok(_) => {}
            Err(_) => missing.push(component.clone()),
        }
    }
    Ok(missing)
}

/// Factor bringing the stratigraphic ratio of the last to the first axis
/// extent to the geometric one.
fn bbox_scale_factor<const D: usize>(
    geometric: &Vector<D>,
    stratigraphic: &Vector<D>,
) -> std::result::Result<f64, MappingError> {
    let extents = [
        ("model", 0, geometric[0]),
        ("model", D - 1, geometric[D - 1]),
        ("stratigraphic location", 0, stratigraphic[0]),
        ("implicit function", D - 1, stratigraphic[D - 1]),
    ];
    for (what, axis, extent) in extents {
        if extent.is_nan() || extent < TOLERANCE {
            return Err(MappingError::Degenerate(format!(
                "{what} has no extent along axis {axis}"
            )));
        }
    }
    Ok(stratigraphic[0] * geometric[D - 1] / (geometric[0] * stratigraphic[D - 1]))
}
