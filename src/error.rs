use thiserror::Error;
use uuid::Uuid;

use crate::topology::ComponentKind;

/// Top-level error type for geostrata.
#[derive(Debug, Error)]
pub enum GeostrataError {
    #[error(transparent)]
    Component(#[from] ComponentError),

    #[error(transparent)]
    Stack(#[from] StackError),

    #[error(transparent)]
    Mapping(#[from] MappingError),

    #[error(transparent)]
    Persistence(#[from] PersistenceError),

    #[error(transparent)]
    Crs(#[from] CrsError),
}

/// Errors related to the component catalog and the relationship graph.
#[derive(Debug, Error)]
pub enum ComponentError {
    #[error("{kind} {id} not found")]
    NotFound { kind: ComponentKind, id: Uuid },

    #[error("component {0} is not registered")]
    UnknownId(Uuid),

    #[error("{kind} items are not supported in {dimension}D models")]
    UnsupportedKind { kind: ComponentKind, dimension: usize },

    #[error("component {id} is a {found}, expected a {expected}")]
    WrongKind {
        id: Uuid,
        expected: ComponentKind,
        found: ComponentKind,
    },

    #[error("cannot relate {item} to {collection}: {reason}")]
    InvalidRelation {
        item: Uuid,
        collection: Uuid,
        reason: String,
    },

    #[error("component {0} is already registered")]
    Duplicate(Uuid),

    #[error("target must be empty before copy")]
    NotEmpty,

    #[error("{kind} {id} mirrors a horizons stack node and is edited through the stratigraphic builder")]
    StackManaged { kind: ComponentKind, id: Uuid },
}

/// Which side of a stack node an adjacency query looked at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StackSide {
    Above,
    Under,
}

impl std::fmt::Display for StackSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Above => f.write_str("above"),
            Self::Under => f.write_str("under"),
        }
    }
}

/// Errors related to the horizons stack.
#[derive(Debug, Error)]
pub enum StackError {
    #[error("{node} is already bound to {existing}, cannot rebind to {requested}")]
    Conflict {
        node: Uuid,
        existing: Uuid,
        requested: Uuid,
    },

    #[error("nothing is {side} {node}")]
    Unbound { node: Uuid, side: StackSide },

    #[error("placing {above} above {under} would close a cycle")]
    Cycle { above: Uuid, under: Uuid },

    #[error("invalid name lists: {0}")]
    InvalidNames(String),

    #[error("stack is not a single linear column: {0}")]
    NotLinear(String),

    #[error("horizon {0} has no implicit value")]
    MissingIsovalue(Uuid),

    #[error("horizon isovalues do not define a stacking direction")]
    UndefinedDirection,
}

/// Errors related to stratigraphic coordinate mapping.
#[derive(Debug, Error)]
pub enum MappingError {
    #[error("vertex {vertex} of {item} has no value for attribute '{attribute}'")]
    MissingAttribute {
        item: Uuid,
        vertex: usize,
        attribute: String,
    },

    #[error("query point lies outside the mesh of {item}")]
    OutsideMesh { item: Uuid },

    #[error("{item} is neither a boundary nor an internal item of {parent}")]
    NotBoundaryNorInternal { item: Uuid, parent: Uuid },

    #[error("attribute '{attribute}' holds {expected} values per vertex, got {found}")]
    AttributeDimension {
        attribute: String,
        expected: usize,
        found: usize,
    },

    #[error("invalid mesh topology: {0}")]
    InvalidTopology(String),

    #[error("degenerate geometry: {0}")]
    Degenerate(String),

    #[error("axis {axis} does not exist in {dimension}D")]
    InvalidAxis { axis: usize, dimension: usize },
}

/// Errors related to saving and loading files.
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Encoding(#[from] bincode::Error),

    #[error("expected a '.{expected}' file, got '{found}'")]
    UnexpectedExtension { expected: String, found: String },

    #[error("file content is not a geostrata archive")]
    UnexpectedFormat,
}

/// Errors related to coordinate reference systems.
#[derive(Debug, Error)]
pub enum CrsError {
    #[error("model has no coordinate reference system")]
    Unset,

    #[error("unknown coordinate reference system {authority}:{code}")]
    Unknown { authority: String, code: String },

    #[error("coordinate transform failed: {0}")]
    Transform(String),
}

/// Convenience type alias for results using [`GeostrataError`].
pub type Result<T> = std::result::Result<T, GeostrataError>;
