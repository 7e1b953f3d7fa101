pub mod barycentric;
pub mod bounding_box;

pub use barycentric::{
    closest_simplex_weights, interpolate, simplex_barycentric, simplex_orientation,
};
pub use bounding_box::BoundingBox;

/// Point in `D`-dimensional space.
pub type Point<const D: usize> = nalgebra::Point<f64, D>;

/// Vector in `D`-dimensional space.
pub type Vector<const D: usize> = nalgebra::SVector<f64, D>;

/// 2D point type.
pub type Point2 = nalgebra::Point2<f64>;

/// 3D point type.
pub type Point3 = nalgebra::Point3<f64>;

/// 3D vector type.
pub type Vector3 = nalgebra::Vector3<f64>;

/// Global geometric tolerance for floating-point comparisons.
pub const TOLERANCE: f64 = 1e-10;

/// Euclidean distance between two points.
#[must_use]
pub fn distance<const D: usize>(a: &Point<D>, b: &Point<D>) -> f64 {
    (a - b).norm()
}
