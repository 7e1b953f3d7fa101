mod builder;

pub use builder::{HorizonsStackBuilder, UnitSplit};

use std::collections::HashMap;

use uuid::Uuid;

use crate::error::{Result, StackError, StackSide};
use crate::topology::{Component, ComponentCatalog, ComponentKind, RelationGraph};

/// Construction state of a horizons stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StackState {
    /// No node yet.
    #[default]
    Empty,
    /// Nodes exist; the column has not been validated since the last change.
    Building,
    /// The column is one linear chain with known top and bottom horizons.
    Built,
}

/// Ordered depositional column of horizons and stratigraphic units.
///
/// Every node has at most one node directly above and one directly under
/// it. Relations are stored in both directions, so `above(under(x)) == x`
/// whenever `under(x)` is set.
#[derive(Debug, Clone, Default)]
pub struct HorizonsStack<const D: usize> {
    catalog: ComponentCatalog,
    above_of: HashMap<Uuid, Uuid>,
    under_of: HashMap<Uuid, Uuid>,
    erosions: RelationGraph,
    baselaps: RelationGraph,
    state: StackState,
    top: Option<Uuid>,
    bottom: Option<Uuid>,
}

/// Horizons stack of a cross-section.
pub type HorizonsStack2D = HorizonsStack<2>;

/// Horizons stack of a 3D model.
pub type HorizonsStack3D = HorizonsStack<3>;

impl<const D: usize> HorizonsStack<D> {
    /// Creates a new, empty stack.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// File extension used when saving this stack.
    #[must_use]
    pub fn native_extension() -> &'static str {
        if D == 2 {
            "og_hst2d"
        } else {
            "og_hst3d"
        }
    }

    #[must_use]
    pub fn state(&self) -> StackState {
        self.state
    }

    #[must_use]
    pub fn nb_horizons(&self) -> usize {
        self.catalog.count(ComponentKind::Horizon)
    }

    #[must_use]
    pub fn nb_stratigraphic_units(&self) -> usize {
        self.catalog.count(ComponentKind::StratigraphicUnit)
    }

    /// # Errors
    ///
    /// Returns an error if `id` is not a horizon of this stack.
    pub fn horizon(&self, id: Uuid) -> Result<&Component> {
        Ok(self.catalog.get_of_kind(id, ComponentKind::Horizon)?)
    }

    /// # Errors
    ///
    /// Returns an error if `id` is not a stratigraphic unit of this stack.
    pub fn stratigraphic_unit(&self, id: Uuid) -> Result<&Component> {
        Ok(self.catalog.get_of_kind(id, ComponentKind::StratigraphicUnit)?)
    }

    pub fn horizons(&self) -> impl Iterator<Item = &Component> + '_ {
        self.catalog.iter_kind(ComponentKind::Horizon)
    }

    pub fn stratigraphic_units(&self) -> impl Iterator<Item = &Component> + '_ {
        self.catalog.iter_kind(ComponentKind::StratigraphicUnit)
    }

    #[must_use]
    pub fn contains(&self, id: Uuid) -> bool {
        self.catalog.contains(id)
    }

    #[must_use]
    pub fn horizon_id_from_name(&self, name: &str) -> Option<Uuid> {
        self.catalog.find_by_name(ComponentKind::Horizon, name)
    }

    #[must_use]
    pub fn stratigraphic_unit_id_from_name(&self, name: &str) -> Option<Uuid> {
        self.catalog
            .find_by_name(ComponentKind::StratigraphicUnit, name)
    }

    /// Node directly above `id`.
    ///
    /// # Errors
    ///
    /// Returns an error if `id` is unknown or has nothing above it.
    pub fn above(&self, id: Uuid) -> Result<Uuid> {
        self.catalog.get(id)?;
        self.above_of.get(&id).copied().ok_or_else(|| {
            StackError::Unbound {
                node: id,
                side: StackSide::Above,
            }
            .into()
        })
    }

    /// Node directly under `id`.
    ///
    /// # Errors
    ///
    /// Returns an error if `id` is unknown or has nothing under it.
    pub fn under(&self, id: Uuid) -> Result<Uuid> {
        self.catalog.get(id)?;
        self.under_of.get(&id).copied().ok_or_else(|| {
            StackError::Unbound {
                node: id,
                side: StackSide::Under,
            }
            .into()
        })
    }

    /// Whether `above` sits somewhere higher than `under` in the column.
    #[must_use]
    pub fn is_above(&self, above: Uuid, under: Uuid) -> bool {
        let mut current = under;
        for _ in 0..self.catalog.len() {
            match self.above_of.get(&current) {
                Some(next) if *next == above => return true,
                Some(next) => current = *next,
                None => return false,
            }
        }
        false
    }

    /// Highest horizon, known once the stack is built.
    #[must_use]
    pub fn top_horizon(&self) -> Option<Uuid> {
        self.top
    }

    /// Lowest horizon, known once the stack is built.
    #[must_use]
    pub fn bottom_horizon(&self) -> Option<Uuid> {
        self.bottom
    }

    /// Whether `eroded` is truncated by the erosion surface `erosion`.
    #[must_use]
    pub fn is_eroded_by(&self, eroded: Uuid, erosion: Uuid) -> bool {
        self.erosions.has_edge(erosion, eroded)
    }

    /// Whether `baselap` is the base on which `baselap_top` laps.
    #[must_use]
    pub fn is_baselap_of(&self, baselap: Uuid, baselap_top: Uuid) -> bool {
        self.baselaps.has_edge(baselap_top, baselap)
    }

    /// Every node from bottom to top.
    ///
    /// # Errors
    ///
    /// Returns [`StackError::NotLinear`] unless the nodes form exactly one
    /// chain.
    pub fn column(&self) -> Result<Vec<Uuid>> {
        let all: Vec<Uuid> = ComponentKind::ALL
            .into_iter()
            .flat_map(|kind| self.catalog.ids(kind))
            .collect();
        let mut bottoms = all.iter().filter(|id| !self.under_of.contains_key(*id));
        let (Some(bottom), None) = (bottoms.next(), bottoms.next()) else {
            return Err(StackError::NotLinear(format!(
                "expected a single bottom node among {} nodes",
                all.len()
            ))
            .into());
        };
        let mut column = vec![*bottom];
        let mut current = *bottom;
        while let Some(next) = self.above_of.get(&current) {
            if column.len() > all.len() {
                return Err(StackError::NotLinear("column loops".into()).into());
            }
            column.push(*next);
            current = *next;
        }
        if column.len() != all.len() {
            return Err(StackError::NotLinear(format!(
                "{} of {} nodes reachable from the bottom",
                column.len(),
                all.len()
            ))
            .into());
        }
        Ok(column)
    }

    /// Horizon names from top to bottom.
    ///
    /// # Errors
    ///
    /// Returns an error unless the stack is a single chain.
    pub fn horizon_names_from_top(&self) -> Result<Vec<String>> {
        Ok(self
            .column()?
            .into_iter()
            .rev()
            .filter_map(|id| self.horizon(id).ok().map(|h| h.name().to_owned()))
            .collect())
    }

    pub(crate) fn catalog(&self) -> &ComponentCatalog {
        &self.catalog
    }

    /// `(above, under)` pairs.
    pub(crate) fn above_pairs(&self) -> Vec<(Uuid, Uuid)> {
        let mut pairs: Vec<_> = self
            .under_of
            .iter()
            .map(|(above, under)| (*above, *under))
            .collect();
        pairs.sort_unstable();
        pairs
    }

    pub(crate) fn erosion_pairs(&self) -> Vec<(Uuid, Vec<Uuid>)> {
        self.erosions.children_lists()
    }

    pub(crate) fn baselap_pairs(&self) -> Vec<(Uuid, Vec<Uuid>)> {
        self.baselaps.children_lists()
    }
}
