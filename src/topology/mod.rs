pub mod component;
pub mod relations;

pub use component::{
    Component, ComponentKind, ComponentType, FaultType, HorizonType, DEFAULT_NAME,
};
pub use relations::{OrderedIdSet, RelationGraph};

use std::collections::HashMap;

use slotmap::SlotMap;
use uuid::Uuid;

use crate::error::ComponentError;

slotmap::new_key_type! {
    /// Storage key of a component inside one catalog.
    pub struct ComponentKey;
}

/// Central registry that owns every component of a model.
///
/// Components live in a generational arena; the uuid index maps public
/// identities to storage keys. Per-kind id sets keep creation order and
/// give O(1) counts.
#[derive(Debug, Clone, Default)]
pub struct ComponentCatalog {
    components: SlotMap<ComponentKey, Component>,
    index: HashMap<Uuid, ComponentKey>,
    by_kind: HashMap<ComponentKind, OrderedIdSet>,
}

impl ComponentCatalog {
    /// Creates a new, empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a component of `kind` under a fresh uuid.
    pub fn create(&mut self, kind: ComponentKind) -> Uuid {
        let mut id = Uuid::new_v4();
        while self.index.contains_key(&id) {
            id = Uuid::new_v4();
        }
        self.register(Component::new(id, kind));
        id
    }

    /// Registers a component of `kind` under a caller-provided uuid.
    ///
    /// # Errors
    ///
    /// Returns [`ComponentError::Duplicate`] if `id` is already registered.
    pub fn create_with_id(&mut self, kind: ComponentKind, id: Uuid) -> Result<Uuid, ComponentError> {
        self.insert(Component::new(id, kind))?;
        Ok(id)
    }

    /// Registers a fully described component.
    ///
    /// # Errors
    ///
    /// Returns [`ComponentError::Duplicate`] if its uuid is already registered.
    pub fn insert(&mut self, component: Component) -> Result<(), ComponentError> {
        if self.index.contains_key(&component.id()) {
            return Err(ComponentError::Duplicate(component.id()));
        }
        self.register(component);
        Ok(())
    }

    fn register(&mut self, component: Component) {
        let id = component.id();
        let kind = component.kind();
        let key = self.components.insert(component);
        self.index.insert(id, key);
        self.by_kind.entry(kind).or_default().insert(id);
    }

    #[must_use]
    pub fn contains(&self, id: Uuid) -> bool {
        self.index.contains_key(&id)
    }

    /// Returns the component registered under `id`, whatever its kind.
    ///
    /// # Errors
    ///
    /// Returns [`ComponentError::UnknownId`] if nothing is registered under `id`.
    pub fn get(&self, id: Uuid) -> Result<&Component, ComponentError> {
        self.index
            .get(&id)
            .and_then(|key| self.components.get(*key))
            .ok_or(ComponentError::UnknownId(id))
    }

    /// Returns the component registered under `id`, checking its kind.
    ///
    /// # Errors
    ///
    /// Returns [`ComponentError::NotFound`] if `id` is unknown and
    /// [`ComponentError::WrongKind`] if it names a component of another kind.
    pub fn get_of_kind(&self, id: Uuid, kind: ComponentKind) -> Result<&Component, ComponentError> {
        let component = self
            .get(id)
            .map_err(|_| ComponentError::NotFound { kind, id })?;
        if component.kind() != kind {
            return Err(ComponentError::WrongKind {
                id,
                expected: kind,
                found: component.kind(),
            });
        }
        Ok(component)
    }

    fn get_mut_of_kind(
        &mut self,
        id: Uuid,
        kind: ComponentKind,
    ) -> Result<&mut Component, ComponentError> {
        self.get_of_kind(id, kind)?;
        self.index
            .get(&id)
            .and_then(|key| self.components.get_mut(*key))
            .ok_or(ComponentError::NotFound { kind, id })
    }

    /// Renames a component of `kind`.
    ///
    /// # Errors
    ///
    /// Returns an error if `id` does not name a component of `kind`.
    pub fn set_name(
        &mut self,
        id: Uuid,
        kind: ComponentKind,
        name: impl Into<String>,
    ) -> Result<(), ComponentError> {
        self.get_mut_of_kind(id, kind)?.set_name(name);
        Ok(())
    }

    /// Sets the type of a fault or horizon. `NoType` clears it.
    ///
    /// # Errors
    ///
    /// Returns an error if `id` does not name a component of the kind the
    /// type applies to.
    pub fn set_type(&mut self, id: Uuid, component_type: ComponentType) -> Result<(), ComponentError> {
        self.get_mut_of_kind(id, component_type.kind())?
            .set_type(component_type);
        Ok(())
    }

    /// Unregisters a component of `kind` and returns it.
    ///
    /// # Errors
    ///
    /// Returns an error if `id` does not name a component of `kind`.
    pub fn remove(&mut self, id: Uuid, kind: ComponentKind) -> Result<Component, ComponentError> {
        self.get_of_kind(id, kind)?;
        let key = self
            .index
            .remove(&id)
            .ok_or(ComponentError::NotFound { kind, id })?;
        if let Some(ids) = self.by_kind.get_mut(&kind) {
            ids.remove(&id);
        }
        self.components
            .remove(key)
            .ok_or(ComponentError::NotFound { kind, id })
    }

    /// Number of registered components of `kind`.
    #[must_use]
    pub fn count(&self, kind: ComponentKind) -> usize {
        self.by_kind.get(&kind).map_or(0, OrderedIdSet::len)
    }

    /// Total number of registered components.
    #[must_use]
    pub fn len(&self) -> usize {
        self.components.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    /// Ids of `kind` in creation order.
    pub fn ids(&self, kind: ComponentKind) -> impl Iterator<Item = Uuid> + '_ {
        self.by_kind
            .get(&kind)
            .into_iter()
            .flat_map(|ids| ids.iter())
    }

    /// Components of `kind` in creation order.
    pub fn iter_kind(&self, kind: ComponentKind) -> impl Iterator<Item = &Component> + '_ {
        self.ids(kind).filter_map(move |id| self.get(id).ok())
    }

    /// Every component, grouped by kind, each group in creation order.
    pub fn iter(&self) -> impl Iterator<Item = &Component> + '_ {
        ComponentKind::ALL
            .into_iter()
            .flat_map(move |kind| self.iter_kind(kind))
    }

    /// First component of `kind` named `name`.
    #[must_use]
    pub fn find_by_name(&self, kind: ComponentKind, name: &str) -> Option<Uuid> {
        self.iter_kind(kind)
            .find(|component| component.name() == name)
            .map(Component::id)
    }
}
