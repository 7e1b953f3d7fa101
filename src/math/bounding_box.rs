use super::{Point, Vector};

/// Axis-aligned bounding box in `D` dimensions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox<const D: usize> {
    min: Point<D>,
    max: Point<D>,
}

impl<const D: usize> BoundingBox<D> {
    /// Creates a box reduced to a single point.
    #[must_use]
    pub fn from_point(point: Point<D>) -> Self {
        Self {
            min: point,
            max: point,
        }
    }

    /// Smallest box containing every point, or `None` for an empty input.
    #[must_use]
    pub fn from_points<'a, I>(points: I) -> Option<Self>
    where
        I: IntoIterator<Item = &'a Point<D>>,
    {
        let mut iter = points.into_iter();
        let mut bbox = Self::from_point(*iter.next()?);
        for p in iter {
            bbox.add_point(p);
        }
        Some(bbox)
    }

    /// Grows the box to contain `point`.
    pub fn add_point(&mut self, point: &Point<D>) {
        for axis in 0..D {
            self.min[axis] = self.min[axis].min(point[axis]);
            self.max[axis] = self.max[axis].max(point[axis]);
        }
    }

    /// Grows the box to contain `other`.
    pub fn add_box(&mut self, other: &Self) {
        self.add_point(&other.min);
        self.add_point(&other.max);
    }

    #[must_use]
    pub fn min(&self) -> &Point<D> {
        &self.min
    }

    #[must_use]
    pub fn max(&self) -> &Point<D> {
        &self.max
    }

    /// Extent along every axis.
    #[must_use]
    pub fn diagonal(&self) -> Vector<D> {
        self.max - self.min
    }

    /// Whether `point` lies inside the box enlarged by `tolerance`.
    #[must_use]
    pub fn contains(&self, point: &Point<D>, tolerance: f64) -> bool {
        (0..D).all(|axis| {
            point[axis] >= self.min[axis] - tolerance && point[axis] <= self.max[axis] + tolerance
        })
    }

    /// Whether the two boxes overlap, touching included.
    #[must_use]
    pub fn intersects(&self, other: &Self) -> bool {
        (0..D).all(|axis| self.min[axis] <= other.max[axis] && other.min[axis] <= self.max[axis])
    }
}
