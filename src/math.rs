//! Mathematical structs and functions.

use cgmath::{InnerSpace, Point2, Point3, Vector2, Vector3};
pub use polygon::Polygon2d;

mod polygon;

/// A 2D point
pub type Point2d = Point2<f64>;

/// A 2D vector
pub type Vector2d = Vector2<f64>;

/// A 3D point
pub type Point3d = Point3<f64>;

/// A 3D vector
pub type Vector3d = Vector3<f64>;

/// Projects a world location onto the ground plane.
pub fn flatten(point: Point3d) -> Point2d {
    Point2d::new(point.x, point.y)
}

/// Unit vector perpendicular to a heading on the ground plane,
/// pointing to the left in the left-handed world frame.
pub fn lateral(heading: Vector3d) -> Vector3d {
    Vector3d::new(-heading.y, heading.x, 0.0).normalize()
}

/// Squared distance between two world locations.
pub fn distance_squared(a: Point3d, b: Point3d) -> f64 {
    (b - a).magnitude2()
}

/// Squared distance between two world locations on the ground plane.
pub fn distance_squared_2d(a: Point3d, b: Point3d) -> f64 {
    let (dx, dy) = (b.x - a.x, b.y - a.y);
    dx * dx + dy * dy
}
