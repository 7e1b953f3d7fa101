use tracing::{debug, info};
use uuid::Uuid;

use super::{HorizonsStack, StackState};
use crate::error::{ComponentError, Result, StackError};
use crate::topology::{Component, ComponentKind, ComponentType, HorizonType, RelationGraph};

/// Nodes created when a stratigraphic unit is split by a new horizon.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnitSplit {
    pub horizon: Uuid,
    pub unit_above: Uuid,
    pub unit_under: Uuid,
}

/// Sole mutation surface of a [`HorizonsStack`].
#[derive(Debug)]
pub struct HorizonsStackBuilder<'a, const D: usize> {
    stack: &'a mut HorizonsStack<D>,
}

impl<'a, const D: usize> HorizonsStackBuilder<'a, D> {
    #[must_use]
    pub fn new(stack: &'a mut HorizonsStack<D>) -> Self {
        Self { stack }
    }

    fn touch(&mut self) {
        self.stack.state = if self.stack.catalog.is_empty() {
            StackState::Empty
        } else {
            StackState::Building
        };
        self.stack.top = None;
        self.stack.bottom = None;
    }

    /// Appends a disconnected horizon.
    pub fn add_horizon(&mut self) -> Uuid {
        let id = self.stack.catalog.create(ComponentKind::Horizon);
        self.touch();
        id
    }

    /// Appends a disconnected horizon under a caller-provided id.
    ///
    /// # Errors
    ///
    /// Returns [`ComponentError::Duplicate`] if `id` is already used.
    pub fn add_horizon_with_id(&mut self, id: Uuid) -> Result<Uuid> {
        self.stack
            .catalog
            .create_with_id(ComponentKind::Horizon, id)?;
        self.touch();
        Ok(id)
    }

    /// Appends a disconnected stratigraphic unit.
    pub fn add_stratigraphic_unit(&mut self) -> Uuid {
        let id = self.stack.catalog.create(ComponentKind::StratigraphicUnit);
        self.touch();
        id
    }

    /// Appends a disconnected stratigraphic unit under a caller-provided id.
    ///
    /// # Errors
    ///
    /// Returns [`ComponentError::Duplicate`] if `id` is already used.
    pub fn add_stratigraphic_unit_with_id(&mut self, id: Uuid) -> Result<Uuid> {
        self.stack
            .catalog
            .create_with_id(ComponentKind::StratigraphicUnit, id)?;
        self.touch();
        Ok(id)
    }

    /// # Errors
    ///
    /// Returns an error if `id` is not a horizon of the stack.
    pub fn set_horizon_name(&mut self, id: Uuid, name: impl Into<String>) -> Result<()> {
        Ok(self
            .stack
            .catalog
            .set_name(id, ComponentKind::Horizon, name)?)
    }

    /// # Errors
    ///
    /// Returns an error if `id` is not a horizon of the stack.
    pub fn set_horizon_type(&mut self, id: Uuid, horizon_type: HorizonType) -> Result<()> {
        Ok(self
            .stack
            .catalog
            .set_type(id, ComponentType::Horizon(horizon_type))?)
    }

    /// # Errors
    ///
    /// Returns an error if `id` is not a stratigraphic unit of the stack.
    pub fn set_stratigraphic_unit_name(&mut self, id: Uuid, name: impl Into<String>) -> Result<()> {
        Ok(self
            .stack
            .catalog
            .set_name(id, ComponentKind::StratigraphicUnit, name)?)
    }

    /// Places `horizon` directly under `unit`.
    ///
    /// # Errors
    ///
    /// Returns [`StackError::Conflict`] if either node is already bound to a
    /// different node on that side, [`StackError::Cycle`] if `horizon` is
    /// already above `unit`, and a component error for unknown or
    /// mis-kinded ids. The stack is unchanged on error.
    pub fn add_horizon_under(&mut self, horizon: Uuid, unit: Uuid) -> Result<()> {
        self.check_pair(horizon, unit)?;
        self.link(unit, horizon)
    }

    /// Places `horizon` directly above `unit`.
    ///
    /// # Errors
    ///
    /// Same conditions as [`Self::add_horizon_under`].
    pub fn add_horizon_above(&mut self, horizon: Uuid, unit: Uuid) -> Result<()> {
        self.check_pair(horizon, unit)?;
        self.link(horizon, unit)
    }

    fn check_pair(&self, horizon: Uuid, unit: Uuid) -> Result<()> {
        self.stack
            .catalog
            .get_of_kind(horizon, ComponentKind::Horizon)?;
        self.stack
            .catalog
            .get_of_kind(unit, ComponentKind::StratigraphicUnit)?;
        Ok(())
    }

    /// Records `above` directly above `under`.
    fn link(&mut self, above: Uuid, under: Uuid) -> Result<()> {
        if above == under || self.stack.is_above(under, above) {
            return Err(StackError::Cycle { above, under }.into());
        }
        if let Some(existing) = self.stack.above_of.get(&under) {
            if *existing == above {
                return Ok(());
            }
            return Err(StackError::Conflict {
                node: under,
                existing: *existing,
                requested: above,
            }
            .into());
        }
        if let Some(existing) = self.stack.under_of.get(&above) {
            return Err(StackError::Conflict {
                node: above,
                existing: *existing,
                requested: under,
            }
            .into());
        }
        self.stack.above_of.insert(under, above);
        self.stack.under_of.insert(above, under);
        self.touch();
        Ok(())
    }

    /// Records that `erosion` truncates `eroded`.
    ///
    /// # Errors
    ///
    /// Returns an error if either id is not in the stack.
    pub fn add_erosion_relation(&mut self, erosion: Uuid, eroded: Uuid) -> Result<()> {
        self.stack.catalog.get(erosion)?;
        self.stack.catalog.get(eroded)?;
        self.stack.erosions.add_edge(erosion, eroded);
        Ok(())
    }

    /// Records that `baselap_top` laps onto `baselap`.
    ///
    /// # Errors
    ///
    /// Returns an error if either id is not in the stack.
    pub fn add_baselap_relation(&mut self, baselap_top: Uuid, baselap: Uuid) -> Result<()> {
        self.stack.catalog.get(baselap_top)?;
        self.stack.catalog.get(baselap)?;
        self.stack.baselaps.add_edge(baselap_top, baselap);
        Ok(())
    }

    fn unlink_node(&mut self, id: Uuid) {
        if let Some(above) = self.stack.above_of.remove(&id) {
            self.stack.under_of.remove(&above);
        }
        if let Some(under) = self.stack.under_of.remove(&id) {
            self.stack.above_of.remove(&under);
        }
        self.stack.erosions.remove_node(id);
        self.stack.baselaps.remove_node(id);
    }

    /// Removes a horizon and every relation it takes part in.
    ///
    /// # Errors
    ///
    /// Returns an error if `id` is not a horizon of the stack.
    pub fn remove_horizon(&mut self, id: Uuid) -> Result<()> {
        self.remove_node(id, ComponentKind::Horizon)
    }

    /// Removes a stratigraphic unit and every relation it takes part in.
    ///
    /// # Errors
    ///
    /// Returns an error if `id` is not a stratigraphic unit of the stack.
    pub fn remove_stratigraphic_unit(&mut self, id: Uuid) -> Result<()> {
        self.remove_node(id, ComponentKind::StratigraphicUnit)
    }

    fn remove_node(&mut self, id: Uuid, kind: ComponentKind) -> Result<()> {
        self.stack.catalog.get_of_kind(id, kind)?;
        self.unlink_node(id);
        self.stack.catalog.remove(id, kind)?;
        debug!(%id, %kind, "removed from horizons stack");
        self.touch();
        Ok(())
    }

    /// Splits `unit` with a new horizon. The unit is replaced by a unit
    /// above and a unit under the new horizon, which inherit its outer
    /// relations and are named after it.
    ///
    /// # Errors
    ///
    /// Returns an error if `unit` is not a stratigraphic unit of the stack.
    pub fn add_horizon_in_stratigraphic_unit(&mut self, unit: Uuid) -> Result<UnitSplit> {
        let name = self
            .stack
            .catalog
            .get_of_kind(unit, ComponentKind::StratigraphicUnit)?
            .name()
            .to_owned();
        let above = self.stack.above_of.get(&unit).copied();
        let under = self.stack.under_of.get(&unit).copied();
        let eroded_by: Vec<Uuid> = self.stack.erosions.parents_of(unit).collect();
        let laps_onto: Vec<Uuid> = self.stack.baselaps.children_of(unit).collect();

        self.unlink_node(unit);
        self.stack
            .catalog
            .remove(unit, ComponentKind::StratigraphicUnit)?;

        let split = UnitSplit {
            horizon: self.stack.catalog.create(ComponentKind::Horizon),
            unit_above: self.stack.catalog.create(ComponentKind::StratigraphicUnit),
            unit_under: self.stack.catalog.create(ComponentKind::StratigraphicUnit),
        };
        self.stack.catalog.set_name(
            split.unit_above,
            ComponentKind::StratigraphicUnit,
            format!("{name}_above"),
        )?;
        self.stack.catalog.set_name(
            split.unit_under,
            ComponentKind::StratigraphicUnit,
            format!("{name}_under"),
        )?;
        self.link(split.unit_above, split.horizon)?;
        self.link(split.horizon, split.unit_under)?;
        if let Some(above) = above {
            self.link(above, split.unit_above)?;
        }
        if let Some(under) = under {
            self.link(split.unit_under, under)?;
        }
        for erosion in eroded_by {
            self.stack.erosions.add_edge(erosion, split.unit_above);
        }
        for baselap in laps_onto {
            self.stack.baselaps.add_edge(split.unit_under, baselap);
        }
        debug!(%unit, horizon = %split.horizon, "split stratigraphic unit");
        Ok(split)
    }

    /// Checks that the stack is one linear column and records its top and
    /// bottom horizons.
    ///
    /// # Errors
    ///
    /// Returns [`StackError::NotLinear`] if the stack has no horizon or is
    /// not a single chain.
    pub fn compute_top_and_bottom_horizons(&mut self) -> Result<()> {
        let column = self.stack.column()?;
        let is_horizon = |id: &&Uuid| {
            self.stack
                .catalog
                .get_of_kind(**id, ComponentKind::Horizon)
                .is_ok()
        };
        let bottom = column.iter().find(is_horizon).copied();
        let top = column.iter().rev().find(is_horizon).copied();
        let (Some(bottom), Some(top)) = (bottom, top) else {
            return Err(StackError::NotLinear("stack has no horizon".into()).into());
        };
        self.stack.top = Some(top);
        self.stack.bottom = Some(bottom);
        self.stack.state = StackState::Built;
        info!(nodes = column.len(), "horizons stack built");
        Ok(())
    }

    /// Copies `source` into the stack, keeping every id.
    ///
    /// # Errors
    ///
    /// Returns [`ComponentError::NotEmpty`] unless the stack is empty.
    pub fn copy(&mut self, source: &HorizonsStack<D>) -> Result<()> {
        if !self.stack.catalog.is_empty() {
            return Err(ComponentError::NotEmpty.into());
        }
        *self.stack = source.clone();
        debug!(nodes = source.catalog.len(), "copied horizons stack");
        Ok(())
    }

    pub(crate) fn restore_relations(
        &mut self,
        above_pairs: Vec<(Uuid, Uuid)>,
        erosions: RelationGraph,
        baselaps: RelationGraph,
    ) -> Result<()> {
        for (above, under) in above_pairs {
            self.stack.catalog.get(above)?;
            self.stack.catalog.get(under)?;
            self.link(above, under)?;
        }
        self.stack.erosions = erosions;
        self.stack.baselaps = baselaps;
        Ok(())
    }

    pub(crate) fn insert_component(&mut self, component: Component) -> Result<()> {
        self.stack.catalog.insert(component)?;
        self.touch();
        Ok(())
    }
}

impl<const D: usize> HorizonsStack<D> {
    /// Builds a stack from names listed from the top of the column down.
    ///
    /// Horizons and units alternate. With `h` horizons there must be either
    /// `h - 1` units (the column starts and ends with a horizon) or `h + 1`
    /// units (a unit lies above the top horizon and under the bottom one).
    ///
    /// # Errors
    ///
    /// Returns [`StackError::InvalidNames`] for list lengths that do not
    /// alternate.
    pub fn from_top_to_bottom_names<S: AsRef<str>>(horizons: &[S], units: &[S]) -> Result<Self> {
        let outer_units = if horizons.is_empty() {
            None
        } else if units.len() + 1 == horizons.len() {
            Some(false)
        } else if units.len() == horizons.len() + 1 {
            Some(true)
        } else {
            None
        };
        let Some(outer_units) = outer_units else {
            return Err(StackError::InvalidNames(format!(
                "{} horizons cannot alternate with {} units",
                horizons.len(),
                units.len()
            ))
            .into());
        };

        let mut stack = Self::new();
        let mut builder = HorizonsStackBuilder::new(&mut stack);
        let mut column = Vec::with_capacity(horizons.len() + units.len());
        let mut unit_names = units.iter();
        if outer_units {
            if let Some(name) = unit_names.next() {
                column.push(builder.named_unit(name.as_ref())?);
            }
        }
        for (index, name) in horizons.iter().enumerate() {
            column.push(builder.named_horizon(name.as_ref())?);
            let last = index + 1 == horizons.len();
            if !last || outer_units {
                if let Some(unit) = unit_names.next() {
                    column.push(builder.named_unit(unit.as_ref())?);
                }
            }
        }
        for pair in column.windows(2) {
            builder.link(pair[0], pair[1])?;
        }
        builder.compute_top_and_bottom_horizons()?;
        Ok(stack)
    }

    /// Builds a stack from names listed from the bottom of the column up.
    ///
    /// # Errors
    ///
    /// Same conditions as [`Self::from_top_to_bottom_names`].
    pub fn from_bottom_to_top_names<S: AsRef<str>>(horizons: &[S], units: &[S]) -> Result<Self> {
        let horizons: Vec<&str> = horizons.iter().rev().map(|s| s.as_ref()).collect();
        let units: Vec<&str> = units.iter().rev().map(|s| s.as_ref()).collect();
        Self::from_top_to_bottom_names(&horizons, &units)
    }
}

impl<const D: usize> HorizonsStackBuilder<'_, D> {
    fn named_horizon(&mut self, name: &str) -> Result<Uuid> {
        let id = self.add_horizon();
        self.set_horizon_name(id, name)?;
        Ok(id)
    }

    fn named_unit(&mut self, name: &str) -> Result<Uuid> {
        let id = self.add_stratigraphic_unit();
        self.set_stratigraphic_unit_name(id, name)?;
        Ok(id)
    }
}
