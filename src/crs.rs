//! Coordinate reference system descriptors and the conversion capability.
//!
//! Projection engines live outside this crate; a model only records which
//! system its coordinates use and delegates conversions to a
//! [`CoordinateTransform`].

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::CrsError;
use crate::math::Point;

/// Identity of a coordinate reference system, e.g. `EPSG:32631`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CrsInfo {
    pub authority: String,
    pub code: String,
    pub name: String,
}

impl CrsInfo {
    #[must_use]
    pub fn new(authority: impl Into<String>, code: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            authority: authority.into(),
            code: code.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for CrsInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.authority, self.code)
    }
}

/// Lookup of registered reference systems by authority and code.
pub trait CrsCatalog {
    /// # Errors
    ///
    /// Returns [`CrsError::Unknown`] if no system is registered under the pair.
    fn find(&self, authority: &str, code: &str) -> Result<&CrsInfo, CrsError>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// In-memory catalog, keyed by `(authority, code)`.
#[derive(Debug, Clone, Default)]
pub struct CrsRegistry {
    entries: BTreeMap<(String, String), CrsInfo>,
}

impl CrsRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `info`, replacing any entry with the same authority and code.
    pub fn register(&mut self, info: CrsInfo) -> Option<CrsInfo> {
        self.entries
            .insert((info.authority.clone(), info.code.clone()), info)
    }

    pub fn iter(&self) -> impl Iterator<Item = &CrsInfo> + '_ {
        self.entries.values()
    }
}

impl CrsCatalog for CrsRegistry {
    fn find(&self, authority: &str, code: &str) -> Result<&CrsInfo, CrsError> {
        self.entries
            .get(&(authority.to_owned(), code.to_owned()))
            .ok_or_else(|| CrsError::Unknown {
                authority: authority.to_owned(),
                code: code.to_owned(),
            })
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

/// Converts points between two reference systems.
pub trait CoordinateTransform<const D: usize> {
    /// # Errors
    ///
    /// Returns [`CrsError::Transform`] when the pair is not supported.
    fn convert(&self, point: &Point<D>, source: &CrsInfo, target: &CrsInfo)
        -> Result<Point<D>, CrsError>;
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::error::GeostrataError;
    use crate::math::Point2;
    use crate::mesh::{EdgedCurve, SimplicialMesh};
    use crate::model::{CrossSection, ModelBuilder};

    /// Shifts x by a fixed false easting between two known systems.
    struct FalseEasting {
        from: CrsInfo,
        to: CrsInfo,
        offset: f64,
    }

    impl CoordinateTransform<2> for FalseEasting {
        fn convert(
            &self,
            point: &Point2,
            source: &CrsInfo,
            target: &CrsInfo,
        ) -> Result<Point2, CrsError> {
            if *source != self.from || *target != self.to {
                return Err(CrsError::Transform(format!("{source} -> {target}")));
            }
            Ok(Point2::new(point.x + self.offset, point.y))
        }
    }

    fn local() -> CrsInfo {
        CrsInfo::new("LOCAL", "1", "site grid")
    }

    fn utm() -> CrsInfo {
        CrsInfo::new("EPSG", "32631", "WGS 84 / UTM zone 31N")
    }

    #[test]
    fn registry_lookup() {
        let mut registry = CrsRegistry::new();
        assert!(registry.is_empty());
        registry.register(utm());
        registry.register(local());
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.find("EPSG", "32631").unwrap().name, "WGS 84 / UTM zone 31N");
        assert!(matches!(
            registry.find("EPSG", "4326"),
            Err(CrsError::Unknown { .. })
        ));
        assert_eq!(utm().to_string(), "EPSG:32631");
    }

    #[test]
    fn conversion_moves_every_point() {
        let mut model = CrossSection::new();
        let mut builder = ModelBuilder::new(&mut model);
        let line = builder
            .add_line(
                EdgedCurve::new(vec![Point2::new(0.0, 0.0), Point2::new(1.0, 2.0)], vec![[0, 1]])
                    .unwrap(),
            )
            .unwrap();
        let transform = FalseEasting {
            from: local(),
            to: utm(),
            offset: 500.0,
        };
        assert!(matches!(
            builder.convert_coordinate_reference_system(&transform, utm()),
            Err(GeostrataError::Crs(CrsError::Unset))
        ));
        builder.set_coordinate_reference_system(local());
        builder
            .convert_coordinate_reference_system(&transform, utm())
            .unwrap();
        assert_eq!(model.coordinate_reference_system(), Some(&utm()));
        let points = model.line_mesh(line).unwrap().points().to_vec();
        assert_eq!(points, vec![Point2::new(500.0, 0.0), Point2::new(501.0, 2.0)]);
    }

    #[test]
    fn failed_conversion_leaves_model_untouched() {
        let mut model = CrossSection::new();
        let mut builder = ModelBuilder::new(&mut model);
        builder
            .add_line(
                EdgedCurve::new(vec![Point2::new(0.0, 0.0), Point2::new(1.0, 0.0)], vec![[0, 1]])
                    .unwrap(),
            )
            .unwrap();
        builder.set_coordinate_reference_system(utm());
        let transform = FalseEasting {
            from: local(),
            to: utm(),
            offset: 1.0,
        };
        assert!(builder
            .convert_coordinate_reference_system(&transform, local())
            .is_err());
        assert_eq!(model.coordinate_reference_system(), Some(&utm()));
        assert_eq!(*model.bounding_box().unwrap().max(), Point2::new(1.0, 0.0));
    }
}
