//! Road-graph waypoints and the short-term route buffer.

use crate::actor::Transform;
use crate::math::{Point3d, Vector3d};
use cgmath::InnerSpace;
use serde::{Deserialize, Serialize};

/// A point on the road graph.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Waypoint {
    transform: Transform,
    is_junction: bool,
}

/// An actor's short-term route; index 0 is nearest the actor.
pub type Buffer = Vec<Waypoint>;

impl Waypoint {
    pub fn new(transform: Transform, is_junction: bool) -> Self {
        Self {
            transform,
            is_junction,
        }
    }

    pub fn transform(&self) -> Transform {
        self.transform
    }

    pub fn location(&self) -> Point3d {
        self.transform.location
    }

    /// Unit vector pointing along the road at this waypoint.
    pub fn forward(&self) -> Vector3d {
        self.transform.rotation.forward()
    }

    /// Whether this waypoint lies inside a junction.
    pub fn is_junction(&self) -> bool {
        self.is_junction
    }

    pub fn distance(&self, other: &Waypoint) -> f64 {
        self.distance_squared(other).sqrt()
    }

    pub fn distance_squared(&self, other: &Waypoint) -> f64 {
        (other.location() - self.location()).magnitude2()
    }

    pub fn distance_to(&self, location: Point3d) -> f64 {
        (location - self.location()).magnitude()
    }
}

/// Finds the first waypoint further than `distance` metres from the front of
/// the buffer, together with its index. Falls back to the last entry when the
/// buffer is shorter than the requested distance.
///
/// The buffer must be non-empty.
pub fn target_waypoint_at(buffer: &[Waypoint], distance: f64) -> (Waypoint, usize) {
    let front = buffer[0];
    let distance_squared = distance * distance;
    for (index, waypoint) in buffer.iter().enumerate() {
        if front.distance_squared(waypoint) > distance_squared {
            return (*waypoint, index);
        }
    }
    (buffer[buffer.len() - 1], buffer.len() - 1)
}
