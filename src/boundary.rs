//! Bounding boxes and geodesic corridor polygons.
//!
//! A corridor is the actor's bounding box swept along its route buffer,
//! truncated by a speed- and lock-derived length. Corridors deform with the
//! road, so they are rebuilt every tick and memoised per actor.

use crate::actor::{ActorType, KinematicState, StaticAttributes};
use crate::collision::CollisionLockMap;
use crate::constants::{
    BOUNDARY_EXTENSION_MINIMUM, BOUNDARY_EXTENSION_RATE, COS_10_DEGREES, LOCKING_DISTANCE_PADDING,
    MAX_LOCKING_EXTENSION, WALKER_TIME_EXTENSION,
};
use crate::debug::debug_boundary;
use crate::math::{flatten, lateral, Point2d, Vector3d};
use crate::waypoint::{target_waypoint_at, Waypoint};
use crate::ActorId;
use cgmath::InnerSpace;
use smallvec::SmallVec;
use std::collections::HashMap;

/// Corridor boundaries memoised for the duration of one collision tick.
pub type GeodesicBoundaryMap = HashMap<ActorId, Vec<Point2d>>;

/// Speed-dependent longitudinal extension of a vehicle's corridor.
///
/// A live collision lock pins the extension to the established lead vehicle
/// so the corridor does not contract while the follower slows down.
pub fn bounding_box_extension(
    actor_id: ActorId,
    state: &KinematicState,
    locks: &CollisionLockMap,
) -> f64 {
    let forward_speed = state.forward_speed();
    let mut extension = BOUNDARY_EXTENSION_RATE * forward_speed + BOUNDARY_EXTENSION_MINIMUM;
    if let Some(lock) = locks.get(&actor_id) {
        let lock_length = lock.distance_to_lead_vehicle + LOCKING_DISTANCE_PADDING;
        if lock_length - lock.initial_lock_distance < MAX_LOCKING_EXTENSION {
            extension = lock_length;
        }
    }
    extension
}

/// Four corners of the actor's bounding box, oriented by its heading, in
/// clockwise order for the left-handed world frame.
///
/// Pedestrian boxes are grown by their speed to forecast where they will be.
pub fn actor_boundary(state: &KinematicState, attributes: &StaticAttributes) -> [Point2d; 4] {
    let heading = state.rotation.forward();
    let forecast = match attributes.actor_type {
        ActorType::Pedestrian => state.speed() * WALKER_TIME_EXTENSION,
        ActorType::Vehicle => 0.0,
    };
    let x = heading * (attributes.half_length + forecast);
    let y = lateral(heading) * (attributes.half_width + forecast);
    let location = state.location;
    [
        flatten(location + x - y),
        flatten(location - x - y),
        flatten(location - x + y),
        flatten(location + x + y),
    ]
}

/// The actor's geodesic corridor boundary, memoised per actor for the tick.
///
/// Vehicles sweep their width along the buffer from the front bumper until
/// the extension distance or the buffer runs out, emitting a rib whenever the
/// route heading has turned by ten degrees. Pedestrians do not follow the
/// road graph; their forecast box is the corridor.
#[allow(clippy::too_many_arguments)]
pub fn geodesic_boundary(
    actor_id: ActorId,
    geodesic_map: &mut GeodesicBoundaryMap,
    state: &KinematicState,
    attributes: &StaticAttributes,
    buffer: &[Waypoint],
    lead_distance: f64,
    locks: &CollisionLockMap,
) -> Vec<Point2d> {
    if let Some(boundary) = geodesic_map.get(&actor_id) {
        return boundary.clone();
    }

    let bbox = actor_boundary(state, attributes);
    let boundary = match attributes.actor_type {
        ActorType::Vehicle => {
            let extension = f64::max(
                lead_distance,
                bounding_box_extension(actor_id, state, locks),
            );
            let extension_squared = extension * extension;
            let width = attributes.half_width;

            let (start, start_index) = target_waypoint_at(buffer, attributes.half_length);

            let mut left_wall: SmallVec<[Point2d; 8]> = SmallVec::new();
            let mut right_wall: SmallVec<[Point2d; 8]> = SmallVec::new();
            let mut last_forward: Option<Vector3d> = None;

            for (index, waypoint) in buffer.iter().enumerate().skip(start_index) {
                let reached_end = start.distance_squared(waypoint) > extension_squared
                    || index == buffer.len() - 1;
                let emit = match last_forward {
                    None => true,
                    Some(last) => last.dot(waypoint.forward()) < COS_10_DEGREES || reached_end,
                };
                if emit {
                    let rib = lateral(waypoint.forward()) * width;
                    let location = waypoint.location();
                    left_wall.push(flatten(location + rib));
                    right_wall.push(flatten(location - rib));
                    last_forward = Some(waypoint.forward());
                }
                if reached_end {
                    break;
                }
            }

            // Clockwise trace: down the right wall from its far end, around
            // the box, then out along the left wall.
            let mut boundary = Vec::with_capacity(left_wall.len() + right_wall.len() + 4);
            boundary.extend(right_wall.iter().rev().copied());
            boundary.extend(bbox);
            boundary.extend(left_wall.iter().copied());
            boundary
        }
        ActorType::Pedestrian => bbox.to_vec(),
    };

    debug_boundary("geodesic", &boundary);
    geodesic_map.insert(actor_id, boundary.clone());
    boundary
}
