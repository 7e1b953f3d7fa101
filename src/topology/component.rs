use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Name given to every component until it is renamed.
pub const DEFAULT_NAME: &str = "unknown";

/// Discriminates the seven component kinds of a geological model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ComponentKind {
    Fault,
    Horizon,
    FaultBlock,
    StratigraphicUnit,
    Line,
    Surface,
    Block,
}

impl ComponentKind {
    /// Every kind, collections first.
    pub const ALL: [Self; 7] = [
        Self::Fault,
        Self::Horizon,
        Self::FaultBlock,
        Self::StratigraphicUnit,
        Self::Line,
        Self::Surface,
        Self::Block,
    ];

    /// Whether the kind aggregates geometric items.
    #[must_use]
    pub fn is_collection(self) -> bool {
        matches!(
            self,
            Self::Fault | Self::Horizon | Self::FaultBlock | Self::StratigraphicUnit
        )
    }

    /// Whether the kind is a geometric item.
    #[must_use]
    pub fn is_item(self) -> bool {
        !self.is_collection()
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Fault => "fault",
            Self::Horizon => "horizon",
            Self::FaultBlock => "fault block",
            Self::StratigraphicUnit => "stratigraphic unit",
            Self::Line => "line",
            Self::Surface => "surface",
            Self::Block => "block",
        }
    }
}

impl fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tectonic type of a fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum FaultType {
    #[default]
    NoType,
    Normal,
    Reverse,
    StrikeSlip,
    Listric,
    Decollement,
}

/// Depositional type of a horizon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum HorizonType {
    #[default]
    NoType,
    Conformal,
    NonConformal,
    Topography,
    Intrusion,
}

/// Kind-specific type carried by faults and horizons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ComponentType {
    Fault(FaultType),
    Horizon(HorizonType),
}

impl ComponentType {
    /// Kind this type can be attached to.
    #[must_use]
    pub fn kind(self) -> ComponentKind {
        match self {
            Self::Fault(_) => ComponentKind::Fault,
            Self::Horizon(_) => ComponentKind::Horizon,
        }
    }

    /// `NoType` values carry no information and read as unset.
    fn normalized(self) -> Option<Self> {
        match self {
            Self::Fault(FaultType::NoType) | Self::Horizon(HorizonType::NoType) => None,
            other => Some(other),
        }
    }
}

impl From<FaultType> for ComponentType {
    fn from(value: FaultType) -> Self {
        Self::Fault(value)
    }
}

impl From<HorizonType> for ComponentType {
    fn from(value: HorizonType) -> Self {
        Self::Horizon(value)
    }
}

/// Identity and metadata of a registered component.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Component {
    id: Uuid,
    kind: ComponentKind,
    name: String,
    component_type: Option<ComponentType>,
}

impl Component {
    /// Creates a component with the default name and no type.
    #[must_use]
    pub fn new(id: Uuid, kind: ComponentKind) -> Self {
        Self {
            id,
            kind,
            name: DEFAULT_NAME.to_owned(),
            component_type: None,
        }
    }

    #[must_use]
    pub fn id(&self) -> Uuid {
        self.id
    }

    #[must_use]
    pub fn kind(&self) -> ComponentKind {
        self.kind
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// True iff a type other than `NoType` has been set.
    #[must_use]
    pub fn has_type(&self) -> bool {
        self.component_type.is_some()
    }

    #[must_use]
    pub fn component_type(&self) -> Option<ComponentType> {
        self.component_type
    }

    /// Fault type, `NoType` when unset or when the component is not a fault.
    #[must_use]
    pub fn fault_type(&self) -> FaultType {
        match self.component_type {
            Some(ComponentType::Fault(t)) => t,
            _ => FaultType::NoType,
        }
    }

    /// Horizon type, `NoType` when unset or when the component is not a horizon.
    #[must_use]
    pub fn horizon_type(&self) -> HorizonType {
        match self.component_type {
            Some(ComponentType::Horizon(t)) => t,
            _ => HorizonType::NoType,
        }
    }

    pub(crate) fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// Caller guarantees `component_type.kind() == self.kind`.
    pub(crate) fn set_type(&mut self, component_type: ComponentType) {
        self.component_type = component_type.normalized();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_component_has_defaults() {
        let c = Component::new(Uuid::new_v4(), ComponentKind::Fault);
        assert_eq!(c.name(), DEFAULT_NAME);
        assert!(!c.has_type());
        assert_eq!(c.fault_type(), FaultType::NoType);
    }

    #[test]
    fn setting_no_type_clears_type() {
        let mut c = Component::new(Uuid::new_v4(), ComponentKind::Horizon);
        c.set_type(HorizonType::Topography.into());
        assert!(c.has_type());
        assert_eq!(c.horizon_type(), HorizonType::Topography);
        c.set_type(HorizonType::NoType.into());
        assert!(!c.has_type());
    }

    #[test]
    fn collection_and_item_kinds_partition() {
        let collections = ComponentKind::ALL
            .iter()
            .filter(|k| k.is_collection())
            .count();
        let items = ComponentKind::ALL.iter().filter(|k| k.is_item()).count();
        assert_eq!(collections, 4);
        assert_eq!(items, 3);
        assert_eq!(ComponentKind::FaultBlock.to_string(), "fault block");
    }
}
