use tracing::debug;

use crate::math::{
    closest_simplex_weights, interpolate, simplex_barycentric, BoundingBox, Point,
};

/// Spatial indexing strategy for point location.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocatorStrategy {
    /// Tests every element. Fine for small meshes.
    BruteForce,
    /// Uniform grid over the mesh bounding box. The cell count is capped at
    /// [`MAX_GRID_CELLS`].
    Grid { cells_per_axis: usize },
}

/// Upper bound on the number of cells of a [`GridLocator`].
pub const MAX_GRID_CELLS: usize = 1 << 20;

/// Parameters controlling point location.
#[derive(Debug, Clone, Copy)]
pub struct LocatorParams {
    /// Slack on barycentric weights when testing containment.
    pub tolerance: f64,
    /// Maximum distance to the nearest element, relative to the mesh
    /// bounding-box diagonal, for a point outside every element.
    pub outside_tolerance: f64,
    pub strategy: LocatorStrategy,
}

impl Default for LocatorParams {
    fn default() -> Self {
        Self {
            tolerance: 1e-8,
            outside_tolerance: 1e-6,
            strategy: LocatorStrategy::Grid { cells_per_axis: 16 },
        }
    }
}

/// Element found for a query point, with the barycentric weights of the
/// point in that element.
#[derive(Debug, Clone, PartialEq)]
pub struct Location {
    pub element: usize,
    /// One weight per element vertex, summing to one.
    pub weights: Vec<f64>,
    /// `false` when the point was snapped onto the nearest element.
    pub inside: bool,
}

/// Point-location capability over a set of full-dimensional simplices.
pub trait PointLocator<const D: usize> {
    /// Element containing `point`, or the nearest one within the outside
    /// tolerance.
    fn locate(&self, point: &Point<D>) -> Option<Location>;
}

/// Builds the locator selected by `params.strategy`.
///
/// `elements` hold `D + 1` indices into `points` each.
#[must_use]
pub fn build_locator<const D: usize>(
    points: Vec<Point<D>>,
    elements: Vec<Vec<usize>>,
    params: LocatorParams,
) -> Box<dyn PointLocator<D>> {
    let simplices = Simplices::new(points, elements);
    match params.strategy {
        LocatorStrategy::BruteForce => Box::new(BruteForceLocator { simplices, params }),
        LocatorStrategy::Grid { cells_per_axis } => {
            let bounded = cells_per_axis.clamp(1, max_cells_per_axis(D));
            if bounded != cells_per_axis {
                debug!(requested = cells_per_axis, used = bounded, "clamped grid resolution");
            }
            Box::new(GridLocator::new(simplices, params, bounded))
        }
    }
}

/// Largest per-axis resolution keeping a `dimension`-dimensional grid within
/// [`MAX_GRID_CELLS`].
fn max_cells_per_axis(dimension: usize) -> usize {
    let mut n = 1usize;
    while (0..dimension)
        .try_fold(1usize, |acc, _| acc.checked_mul(n + 1))
        .is_some_and(|cells| cells <= MAX_GRID_CELLS)
    {
        n += 1;
    }
    n
}

#[derive(Debug, Clone)]
struct Simplices<const D: usize> {
    points: Vec<Point<D>>,
    elements: Vec<Vec<usize>>,
    bbox: Option<BoundingBox<D>>,
}

impl<const D: usize> Simplices<D> {
    fn new(points: Vec<Point<D>>, elements: Vec<Vec<usize>>) -> Self {
        let bbox = BoundingBox::from_points(&points);
        Self {
            points,
            elements,
            bbox,
        }
    }

    fn corners(&self, element: usize) -> Option<Vec<Point<D>>> {
        self.elements
            .get(element)?
            .iter()
            .map(|v| self.points.get(*v).copied())
            .collect()
    }

    fn containing(&self, element: usize, point: &Point<D>, tolerance: f64) -> Option<Location> {
        let corners = self.corners(element)?;
        let weights = simplex_barycentric(&corners, point)?;
        weights.iter().all(|w| *w >= -tolerance).then_some(Location {
            element,
            weights,
            inside: true,
        })
    }

    fn nearest(&self, point: &Point<D>, params: &LocatorParams) -> Option<Location> {
        let diagonal = self.bbox.map_or(0.0, |bbox| bbox.diagonal().norm());
        let max_distance = params.outside_tolerance * diagonal;
        let mut best: Option<(f64, Location)> = None;
        for element in 0..self.elements.len() {
            let Some(corners) = self.corners(element) else {
                continue;
            };
            let Some(weights) = closest_simplex_weights(&corners, point) else {
                continue;
            };
            let distance = (interpolate(&corners, &weights) - point).norm();
            if best.as_ref().map_or(true, |(d, _)| distance < *d) {
                best = Some((
                    distance,
                    Location {
                        element,
                        weights,
                        inside: false,
                    },
                ));
            }
        }
        let (distance, location) = best?;
        if distance > max_distance {
            debug!(distance, max_distance, "point outside mesh");
            return None;
        }
        debug!(distance, element = location.element, "snapped point onto nearest element");
        Some(location)
    }
}

/// Tests every element in turn.
#[derive(Debug, Clone)]
pub struct BruteForceLocator<const D: usize> {
    simplices: Simplices<D>,
    params: LocatorParams,
}

impl<const D: usize> PointLocator<D> for BruteForceLocator<D> {
    fn locate(&self, point: &Point<D>) -> Option<Location> {
        (0..self.simplices.elements.len())
            .find_map(|e| self.simplices.containing(e, point, self.params.tolerance))
            .or_else(|| self.simplices.nearest(point, &self.params))
    }
}

/// Buckets elements into a uniform grid over the mesh bounding box.
#[derive(Debug, Clone)]
pub struct GridLocator<const D: usize> {
    simplices: Simplices<D>,
    params: LocatorParams,
    cells_per_axis: usize,
    cells: Vec<Vec<usize>>,
}

impl<const D: usize> GridLocator<D> {
    fn new(simplices: Simplices<D>, params: LocatorParams, cells_per_axis: usize) -> Self {
        let nb_cells = (0..D).fold(1usize, |acc, _| acc.saturating_mul(cells_per_axis));
        let mut locator = Self {
            simplices,
            params,
            cells_per_axis,
            cells: vec![Vec::new(); nb_cells],
        };
        for element in 0..locator.simplices.elements.len() {
            let Some(corners) = locator.simplices.corners(element) else {
                continue;
            };
            let Some(element_box) = BoundingBox::from_points(&corners) else {
                continue;
            };
            let low = locator.cell_coords(element_box.min());
            let high = locator.cell_coords(element_box.max());
            for cell in locator.cells_in_range(&low, &high) {
                locator.cells[cell].push(element);
            }
        }
        locator
    }

    /// Grid coordinates of `point`, clamped into the grid.
    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss
    )]
    fn cell_coords(&self, point: &Point<D>) -> [usize; D] {
        let mut coords = [0usize; D];
        let Some(bbox) = self.simplices.bbox else {
            return coords;
        };
        let extent = bbox.diagonal();
        for (axis, coord) in coords.iter_mut().enumerate() {
            if extent[axis] <= 0.0 {
                continue;
            }
            let t = (point[axis] - bbox.min()[axis]) / extent[axis];
            let index = (t * self.cells_per_axis as f64).floor().max(0.0) as usize;
            *coord = index.min(self.cells_per_axis - 1);
        }
        coords
    }

    fn flat_index(&self, coords: &[usize; D]) -> usize {
        coords
            .iter()
            .rev()
            .fold(0, |acc, c| acc * self.cells_per_axis + c)
    }

    fn cells_in_range(&self, low: &[usize; D], high: &[usize; D]) -> Vec<usize> {
        let mut result = Vec::new();
        let mut current = *low;
        loop {
            result.push(self.flat_index(&current));
            let mut axis = 0;
            loop {
                if axis == D {
                    return result;
                }
                if current[axis] < high[axis] {
                    current[axis] += 1;
                    break;
                }
                current[axis] = low[axis];
                axis += 1;
            }
        }
    }
}

impl<const D: usize> PointLocator<D> for GridLocator<D> {
    fn locate(&self, point: &Point<D>) -> Option<Location> {
        let inside_grid = self
            .simplices
            .bbox
            .is_some_and(|bbox| bbox.contains(point, self.params.tolerance));
        if inside_grid {
            let cell = self.flat_index(&self.cell_coords(point));
            let found = self.cells[cell]
                .iter()
                .find_map(|e| self.simplices.containing(*e, point, self.params.tolerance));
            if found.is_some() {
                return found;
            }
        }
        self.simplices.nearest(point, &self.params)
    }
}
