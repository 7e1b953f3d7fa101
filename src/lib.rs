pub mod crs;
pub mod error;
pub mod io;
pub mod math;
pub mod mesh;
pub mod model;
pub mod operations;
pub mod stack;
pub mod topology;

pub use error::{GeostrataError, Result};
pub use model::{
    CrossSection, GeologicalModel, ModelBuilder, Stratigraphic, StratigraphicBuilder,
    StratigraphicModel, StratigraphicSection, StructuralModel,
};
pub use stack::{HorizonsStack, HorizonsStackBuilder};
