//! Native file formats.
//!
//! Every file starts with a bincode-encoded [`FileHeader`] naming the
//! format, followed by the model payload. Files must carry the native
//! extension of their variant.

mod snapshot;

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{PersistenceError, Result};
use crate::model::{
    CrossSection, GeologicalModel, Stratigraphic, StratigraphicModel, StratigraphicSection,
    StructuralModel,
};
use crate::stack::HorizonsStack;
use snapshot::{ModelSnapshot, StackSnapshot, StratigraphicSnapshot};

/// Leading bytes of every geostrata file.
pub const MAGIC: [u8; 4] = *b"GSTR";

/// Payload layout version, bumped on incompatible changes.
pub const FORMAT_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct FileHeader {
    magic: [u8; 4],
    extension: String,
    version: u32,
}

fn check_extension(path: &Path, expected: &str) -> Result<()> {
    let found = path
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or_default();
    if found != expected {
        return Err(PersistenceError::UnexpectedExtension {
            expected: expected.to_owned(),
            found: found.to_owned(),
        }
        .into());
    }
    Ok(())
}

fn write_file<T: Serialize>(path: &Path, extension: &str, payload: &T) -> Result<()> {
    check_extension(path, extension)?;
    let header = FileHeader {
        magic: MAGIC,
        extension: extension.to_owned(),
        version: FORMAT_VERSION,
    };
    let mut writer = BufWriter::new(File::create(path).map_err(PersistenceError::from)?);
    bincode::serialize_into(&mut writer, &header).map_err(PersistenceError::from)?;
    bincode::serialize_into(&mut writer, payload).map_err(PersistenceError::from)?;
    writer.flush().map_err(PersistenceError::from)?;
    Ok(())
}

fn read_file<T: DeserializeOwned>(path: &Path, extension: &str) -> Result<T> {
    check_extension(path, extension)?;
    let mut reader = BufReader::new(File::open(path).map_err(PersistenceError::from)?);
    let header: FileHeader =
        bincode::deserialize_from(&mut reader).map_err(PersistenceError::from)?;
    if header.magic != MAGIC || header.extension != extension || header.version != FORMAT_VERSION {
        return Err(PersistenceError::UnexpectedFormat.into());
    }
    Ok(bincode::deserialize_from(&mut reader).map_err(PersistenceError::from)?)
}

fn save_model<const D: usize>(model: &GeologicalModel<D>, path: &Path) -> Result<()> {
    let snapshot = ModelSnapshot::capture(model);
    write_file(path, GeologicalModel::<D>::native_extension(), &snapshot)?;
    info!(path = %path.display(), components = snapshot.nb_components(), "saved model");
    Ok(())
}

fn load_model<const D: usize>(path: &Path) -> Result<GeologicalModel<D>> {
    let snapshot: ModelSnapshot = read_file(path, GeologicalModel::<D>::native_extension())?;
    info!(path = %path.display(), components = snapshot.nb_components(), "loaded model");
    snapshot.restore()
}

fn save_stratigraphic<const D: usize>(model: &Stratigraphic<D>, path: &Path) -> Result<()> {
    let snapshot = StratigraphicSnapshot::capture(model);
    write_file(path, Stratigraphic::<D>::native_extension(), &snapshot)?;
    info!(path = %path.display(), components = snapshot.nb_components(), "saved stratigraphic model");
    Ok(())
}

fn load_stratigraphic<const D: usize>(path: &Path) -> Result<Stratigraphic<D>> {
    let snapshot: StratigraphicSnapshot =
        read_file(path, Stratigraphic::<D>::native_extension())?;
    info!(path = %path.display(), components = snapshot.nb_components(), "loaded stratigraphic model");
    snapshot.restore()
}

/// Saves a cross-section to a `.og_xsctn` file.
///
/// # Errors
///
/// Returns a [`PersistenceError`] on a wrong extension or an I/O failure.
pub fn save_cross_section(model: &CrossSection, path: impl AsRef<Path>) -> Result<()> {
    save_model(model, path.as_ref())
}

/// Loads a cross-section from a `.og_xsctn` file.
///
/// # Errors
///
/// Returns a [`PersistenceError`] if the file cannot be read or is not a
/// cross-section.
pub fn load_cross_section(path: impl AsRef<Path>) -> Result<CrossSection> {
    load_model(path.as_ref())
}

/// Saves a structural model to a `.og_strm` file.
///
/// # Errors
///
/// Returns a [`PersistenceError`] on a wrong extension or an I/O failure.
pub fn save_structural_model(model: &StructuralModel, path: impl AsRef<Path>) -> Result<()> {
    save_model(model, path.as_ref())
}

/// Loads a structural model from a `.og_strm` file.
///
/// # Errors
///
/// Returns a [`PersistenceError`] if the file cannot be read or is not a
/// structural model.
pub fn load_structural_model(path: impl AsRef<Path>) -> Result<StructuralModel> {
    load_model(path.as_ref())
}

/// Saves a stratigraphic section, stack and isovalues included, to a
/// `.og_stgs` file.
///
/// # Errors
///
/// Returns a [`PersistenceError`] on a wrong extension or an I/O failure.
pub fn save_stratigraphic_section(model: &StratigraphicSection, path: impl AsRef<Path>) -> Result<()> {
    save_stratigraphic(model, path.as_ref())
}

/// # Errors
///
/// Returns a [`PersistenceError`] if the file cannot be read or is not a
/// stratigraphic section.
pub fn load_stratigraphic_section(path: impl AsRef<Path>) -> Result<StratigraphicSection> {
    load_stratigraphic(path.as_ref())
}

/// Saves a stratigraphic model to a `.og_stgm` file.
///
/// # Errors
///
/// Returns a [`PersistenceError`] on a wrong extension or an I/O failure.
pub fn save_stratigraphic_model(model: &StratigraphicModel, path: impl AsRef<Path>) -> Result<()> {
    save_stratigraphic(model, path.as_ref())
}

/// # Errors
///
/// Returns a [`PersistenceError`] if the file cannot be read or is not a
/// stratigraphic model.
pub fn load_stratigraphic_model(path: impl AsRef<Path>) -> Result<StratigraphicModel> {
    load_stratigraphic(path.as_ref())
}

/// Saves a horizons stack to a `.og_hst2d` or `.og_hst3d` file.
///
/// # Errors
///
/// Returns a [`PersistenceError`] on a wrong extension or an I/O failure.
pub fn save_horizons_stack<const D: usize>(
    stack: &HorizonsStack<D>,
    path: impl AsRef<Path>,
) -> Result<()> {
    let path = path.as_ref();
    let snapshot = StackSnapshot::capture(stack);
    write_file(path, HorizonsStack::<D>::native_extension(), &snapshot)?;
    info!(path = %path.display(), nodes = snapshot.nb_components(), "saved horizons stack");
    Ok(())
}

/// Loads a horizons stack. A stack saved once built is built again on load.
///
/// # Errors
///
/// Returns a [`PersistenceError`] if the file cannot be read, or a stack
/// error if the stored column is inconsistent.
pub fn load_horizons_stack<const D: usize>(path: impl AsRef<Path>) -> Result<HorizonsStack<D>> {
    let path = path.as_ref();
    let snapshot: StackSnapshot = read_file(path, HorizonsStack::<D>::native_extension())?;
    info!(path = %path.display(), nodes = snapshot.nb_components(), "loaded horizons stack");
    snapshot.restore()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::crs::CrsInfo;
    use crate::error::GeostrataError;
    use crate::math::{Point2, Point3};
    use crate::mesh::{EdgedCurve, SimplicialMesh, TetrahedralSolid, TriangulatedSurface};
    use crate::model::{ModelBuilder, StratigraphicBuilder};
    use crate::stack::{HorizonsStackBuilder, StackState};
    use crate::topology::{FaultType, HorizonType};
    use uuid::Uuid;

    fn init_tracing() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    }

    fn segment(x: f64) -> EdgedCurve<2> {
        EdgedCurve::new(vec![Point2::new(x, 0.0), Point2::new(x, 1.0)], vec![[0, 1]]).unwrap()
    }

    fn square() -> TriangulatedSurface<2> {
        TriangulatedSurface::new(
            vec![
                Point2::new(0.0, 0.0),
                Point2::new(1.0, 0.0),
                Point2::new(1.0, 1.0),
                Point2::new(0.0, 1.0),
            ],
            vec![[0, 1, 2], [0, 2, 3]],
        )
        .unwrap()
    }

    /// Fault holding three lines of which the middle one was removed, a
    /// horizon sharing the last line, and a bounded surface.
    fn sample_section() -> (CrossSection, Uuid, Uuid, Vec<Uuid>, Uuid) {
        let mut model = CrossSection::new();
        let mut builder = ModelBuilder::new(&mut model);
        let fault = builder.add_fault_with_type(FaultType::Normal).unwrap();
        builder.set_fault_name(fault, "f1").unwrap();
        let horizon = builder.add_horizon_with_type(HorizonType::Conformal).unwrap();
        builder.set_horizon_name(horizon, "top").unwrap();
        let lines: Vec<Uuid> = (0..3)
            .map(|i| builder.add_line(segment(f64::from(i))).unwrap())
            .collect();
        for line in &lines {
            builder.add_line_in_fault(*line, fault).unwrap();
        }
        builder.add_line_in_horizon(lines[2], horizon).unwrap();
        builder.remove_line(lines[1]).unwrap();
        let surface = builder.add_surface(square()).unwrap();
        builder.add_boundary(lines[0], surface).unwrap();
        builder
            .item_attributes_mut(surface)
            .unwrap()
            .set_value("porosity", 2, &[0.25])
            .unwrap();
        (model, fault, horizon, lines, surface)
    }

    #[test]
    fn cross_section_round_trip() {
        init_tracing();
        let (model, fault, horizon, lines, surface) = sample_section();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("section.og_xsctn");
        save_cross_section(&model, &path).unwrap();
        let loaded = load_cross_section(&path).unwrap();

        assert_eq!(loaded.nb_faults(), 1);
        assert_eq!(loaded.nb_horizons(), 1);
        assert_eq!(loaded.nb_lines(), 2);
        assert_eq!(loaded.nb_surfaces(), 1);
        assert_eq!(loaded.fault(fault).unwrap().name(), "f1");
        assert_eq!(loaded.fault(fault).unwrap().fault_type(), FaultType::Normal);
        assert_eq!(
            loaded.horizon(horizon).unwrap().horizon_type(),
            HorizonType::Conformal
        );
        assert_eq!(
            loaded.items_of(fault).collect::<Vec<_>>(),
            vec![lines[0], lines[2]]
        );
        assert_eq!(loaded.nb_collections(lines[2]), 2);
        assert_eq!(loaded.nb_items(horizon), 1);
        assert!(loaded.is_boundary(lines[0], surface));
        assert_eq!(loaded.surface_mesh(surface).unwrap(), model.surface_mesh(surface).unwrap());
        assert_eq!(
            loaded
                .surface_mesh(surface)
                .unwrap()
                .vertex_attributes()
                .value("porosity", 2),
            Some(&[0.25][..])
        );
        assert!(loaded
            .surface_mesh(surface)
            .unwrap()
            .vertex_attributes()
            .value("porosity", 0)
            .is_none());
    }

    #[test]
    fn structural_model_round_trip() {
        let mut model = StructuralModel::new();
        let mut builder = ModelBuilder::new(&mut model);
        let block = builder
            .add_block(
                TetrahedralSolid::new(
                    vec![
                        Point3::new(0.0, 0.0, 0.0),
                        Point3::new(1.0, 0.0, 0.0),
                        Point3::new(0.0, 1.0, 0.0),
                        Point3::new(0.0, 0.0, 1.0),
                    ],
                    vec![[0, 1, 2, 3]],
                )
                .unwrap(),
            )
            .unwrap();
        let unit = builder.add_stratigraphic_unit();
        builder.add_block_in_stratigraphic_unit(block, unit).unwrap();
        builder.set_coordinate_reference_system(CrsInfo::new("EPSG", "32631", "WGS 84 / UTM 31N"));

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.og_strm");
        save_structural_model(&model, &path).unwrap();
        let loaded = load_structural_model(&path).unwrap();
        assert_eq!(loaded.nb_blocks(), 1);
        assert_eq!(loaded.stratigraphic_unit_items(unit).unwrap(), vec![block]);
        assert_eq!(loaded.block_mesh(block).unwrap(), model.block_mesh(block).unwrap());
        assert_eq!(
            loaded.coordinate_reference_system().unwrap().to_string(),
            "EPSG:32631"
        );
    }

    #[test]
    fn horizons_stack_round_trip() {
        let mut stack =
            HorizonsStack::<3>::from_bottom_to_top_names(&["base", "middle", "top"], &["lower", "upper"])
                .unwrap();
        let top = stack.horizon_id_from_name("top").unwrap();
        let lower = stack.stratigraphic_unit_id_from_name("lower").unwrap();
        HorizonsStackBuilder::new(&mut stack)
            .add_erosion_relation(top, lower)
            .unwrap();
        HorizonsStackBuilder::new(&mut stack)
            .compute_top_and_bottom_horizons()
            .unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stack.og_hst3d");
        save_horizons_stack(&stack, &path).unwrap();
        let loaded = load_horizons_stack::<3>(&path).unwrap();
        assert_eq!(loaded.state(), StackState::Built);
        assert_eq!(loaded.column().unwrap(), stack.column().unwrap());
        assert_eq!(loaded.top_horizon(), Some(top));
        assert!(loaded.is_eroded_by(lower, top));
        assert_eq!(
            loaded.horizon_names_from_top().unwrap(),
            vec!["top", "middle", "base"]
        );
    }

    #[test]
    fn stratigraphic_section_round_trip() {
        let mut section = StratigraphicSection::new();
        let mut builder = StratigraphicBuilder::new(&mut section);
        let base = builder.add_horizon().unwrap();
        let unit = builder.add_stratigraphic_unit().unwrap();
        builder.add_horizon_under(base, unit).unwrap();
        builder.set_horizon_implicit_value(base, -3.0).unwrap();
        let surface = builder.model_builder().add_surface(square()).unwrap();
        builder.model_builder().add_surface_in_stratigraphic_unit(surface, unit).unwrap();
        for (v, depth) in [0.0, 1.0, 2.0, 3.0].into_iter().enumerate() {
            builder
                .set_stratigraphic_coordinates(surface, v, &Point2::new(1.0, depth))
                .unwrap();
        }

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("section.og_stgs");
        save_stratigraphic_section(&section, &path).unwrap();
        let loaded = load_stratigraphic_section(&path).unwrap();
        assert_eq!(loaded.horizon_implicit_value(base).unwrap(), Some(-3.0));
        assert_eq!(loaded.horizons_stack().under(unit).unwrap(), base);
        assert_eq!(loaded.nb_items(unit), 1);
        assert_eq!(
            loaded.stratigraphic_coordinates_from_vertex_id(surface, 3).unwrap(),
            Point2::new(1.0, 3.0)
        );
    }

    #[test]
    fn wrong_extension_is_rejected() {
        let (model, ..) = sample_section();
        let dir = tempfile::tempdir().unwrap();
        let result = save_cross_section(&model, dir.path().join("section.txt"));
        assert!(matches!(
            result,
            Err(GeostrataError::Persistence(PersistenceError::UnexpectedExtension { .. }))
        ));
    }

    #[test]
    fn renamed_file_is_rejected() {
        let (model, ..) = sample_section();
        let dir = tempfile::tempdir().unwrap();
        let section = dir.path().join("section.og_xsctn");
        save_cross_section(&model, &section).unwrap();
        let renamed = dir.path().join("section.og_strm");
        std::fs::copy(&section, &renamed).unwrap();
        assert!(matches!(
            load_structural_model(&renamed),
            Err(GeostrataError::Persistence(PersistenceError::UnexpectedFormat))
        ));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = load_cross_section(dir.path().join("absent.og_xsctn"));
        assert!(matches!(
            result,
            Err(GeostrataError::Persistence(PersistenceError::Io(_)))
        ));
    }
}
