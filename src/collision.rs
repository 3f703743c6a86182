//! Collision avoidance: per tick, per ego, decide whether to yield, to whom
//! and with what distance margin remaining.

use crate::actor::{ActorType, LightColor, WorldSnapshot};
use crate::boundary::{bounding_box_extension, GeodesicBoundaryMap};
use crate::constants::{
    BOUNDARY_EXTENSION_MINIMUM, EPSILON_DIRECTION, JUNCTION_LOOK_AHEAD, MAX_COLLISION_RADIUS,
    PROXIMITY_TOUCH_MARGIN, SQUARE_ROOT_OF_TWO, VERTICAL_OVERLAP_THRESHOLD,
};
use crate::params::Parameters;
use crate::waypoint::target_waypoint_at;
use crate::{ActorId, TrackTraffic};
use cgmath::InnerSpace;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, trace};

pub use cache::GeometryComparison;
pub(crate) use cache::{geometry_between_actors, GeometryCache};

mod cache;

/// Per-ego hysteresis pinning the corridor length to an established lead
/// vehicle, preventing oscillation while closing in on it.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CollisionLock {
    pub lead_vehicle_id: ActorId,
    pub initial_lock_distance: f64,
    pub distance_to_lead_vehicle: f64,
}

/// Locks held across ticks, keyed by the following ego.
pub type CollisionLockMap = HashMap<ActorId, CollisionLock>;

/// Verdict for one ego for one tick.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CollisionHazard {
    pub hazard: bool,
    pub hazard_actor_id: Option<ActorId>,
    pub available_distance_margin: f64,
}

impl CollisionHazard {
    fn clear() -> Self {
        Self {
            hazard: false,
            hazard_actor_id: None,
            available_distance_margin: f64::INFINITY,
        }
    }
}

/// One hazard verdict per scheduled ego, in ego-list order.
pub type CollisionFrame = Vec<CollisionHazard>;

/// Runs collision avoidance for every scheduled ego.
///
/// Egos with incomplete snapshot entries are skipped silently. The corridor
/// and pairwise-geometry caches live exactly as long as this call.
pub fn collision_stage<R: Rng>(
    vehicle_ids: &[ActorId],
    snapshot: &WorldSnapshot,
    track: &impl TrackTraffic,
    parameters: &Parameters,
    locks: &mut CollisionLockMap,
    rng: &mut R,
) -> CollisionFrame {
    let mut geodesic_map = GeodesicBoundaryMap::new();
    let mut geometry_cache = GeometryCache::new();

    let mut frame = CollisionFrame::with_capacity(vehicle_ids.len());
    for &ego_id in vehicle_ids {
        frame.push(evaluate_ego(
            ego_id,
            snapshot,
            track,
            parameters,
            locks,
            rng,
            &mut geodesic_map,
            &mut geometry_cache,
        ));
    }
    frame
}

/// Filters and sorts the ego's collision candidates, then negotiates with
/// each in order of proximity until a hazard is committed.
#[allow(clippy::too_many_arguments)]
fn evaluate_ego<R: Rng>(
    ego_id: ActorId,
    snapshot: &WorldSnapshot,
    track: &impl TrackTraffic,
    parameters: &Parameters,
    locks: &mut CollisionLockMap,
    rng: &mut R,
    geodesic_map: &mut GeodesicBoundaryMap,
    geometry_cache: &mut GeometryCache,
) -> CollisionHazard {
    let mut verdict = CollisionHazard::clear();

    let (Some(ego_state), Some(_)) = (
        snapshot.states.get(&ego_id),
        snapshot.attributes.get(&ego_id),
    ) else {
        trace!(ego = %ego_id, "skipping ego with incomplete snapshot");
        return verdict;
    };
    let Some(ego_buffer) = snapshot.buffers.get(&ego_id).filter(|b| !b.is_empty()) else {
        trace!(ego = %ego_id, "skipping ego without a route buffer");
        return verdict;
    };

    let ego_location = ego_state.location;
    let look_ahead_index = target_waypoint_at(ego_buffer, JUNCTION_LOOK_AHEAD).1;

    // Actors with overlapping routes, inside the collision radius and at a
    // comparable height.
    let collision_radius_squared = MAX_COLLISION_RADIUS * MAX_COLLISION_RADIUS;
    let mut candidates: Vec<ActorId> = track
        .overlapping_vehicles(ego_id)
        .into_iter()
        .filter(|&other_id| other_id != ego_id)
        .filter(|other_id| snapshot.attributes.contains_key(other_id))
        .filter(|other_id| {
            snapshot.states.get(other_id).is_some_and(|other| {
                crate::math::distance_squared(other.location, ego_location)
                    < collision_radius_squared
                    && (ego_location.z - other.location.z).abs() < VERTICAL_OVERLAP_THRESHOLD
            })
        })
        .collect();

    candidates.sort_by(|a, b| {
        let da = crate::math::distance_squared_2d(snapshot.states[a].location, ego_location);
        let db = crate::math::distance_squared_2d(snapshot.states[b].location, ego_location);
        da.total_cmp(&db)
    });

    let reference_lead_distance = parameters.distance_to_leading_vehicle(ego_id);

    for other_id in candidates {
        let negotiable = parameters.collision_detection_enabled(ego_id, other_id)
            && snapshot.tl_states.contains_key(&ego_id)
            && snapshot
                .buffers
                .get(&other_id)
                .is_some_and(|b| !b.is_empty());
        if !negotiable {
            continue;
        }

        let (hazard, margin) = negotiate_collision(
            ego_id,
            other_id,
            snapshot,
            look_ahead_index,
            reference_lead_distance,
            parameters.distance_to_leading_vehicle(other_id),
            geometry_cache,
            geodesic_map,
            locks,
        );

        if hazard {
            // A detected hazard may still be suppressed, never the reverse.
            let draw = rng.gen_range(0..100) as f64;
            let committed = match snapshot.attributes[&other_id].actor_type {
                ActorType::Vehicle => parameters.percentage_ignore_vehicles(ego_id) <= draw,
                ActorType::Pedestrian => parameters.percentage_ignore_walkers(ego_id) <= draw,
            };
            if committed {
                debug!(ego = %ego_id, other = %other_id, margin, "collision hazard");
                crate::debug::debug_hazard(ego_id, other_id, margin);
                verdict = CollisionHazard {
                    hazard: true,
                    hazard_actor_id: Some(other_id),
                    available_distance_margin: margin,
                };
                break;
            }
        }
    }

    // A tick that commits no hazard releases any lock held by the ego.
    if !verdict.hazard {
        locks.remove(&ego_id);
    }
    verdict
}

/// Decides whether the reference vehicle must yield to the other actor, and
/// with what distance margin remaining. Updates the reference's collision
/// lock on the hazard path and releases it otherwise.
#[allow(clippy::too_many_arguments)]
fn negotiate_collision(
    reference_id: ActorId,
    other_id: ActorId,
    snapshot: &WorldSnapshot,
    look_ahead_index: usize,
    reference_lead_distance: f64,
    other_lead_distance: f64,
    geometry_cache: &mut GeometryCache,
    geodesic_map: &mut GeodesicBoundaryMap,
    locks: &mut CollisionLockMap,
) -> (bool, f64) {
    let mut hazard = false;
    let mut available_distance_margin = f64::INFINITY;

    let reference_state = &snapshot.states[&reference_id];
    let other_state = &snapshot.states[&other_id];
    let reference_attributes = &snapshot.attributes[&reference_id];
    let other_attributes = &snapshot.attributes[&other_id];
    let reference_buffer = &snapshot.buffers[&reference_id];
    let other_buffer = &snapshot.buffers[&other_id];
    let reference_tl = &snapshot.tl_states[&reference_id];

    let reference_location = reference_state.location;
    let other_location = other_state.location;
    let reference_heading = reference_state.rotation.forward();
    let other_heading = other_state.rotation.forward();

    let mut reference_to_other = other_location - reference_location;
    let magnitude = reference_to_other.magnitude();
    if magnitude > EPSILON_DIRECTION {
        reference_to_other /= magnitude;
    }
    let mut other_to_reference = reference_location - other_location;
    let magnitude = other_to_reference.magnitude();
    if magnitude > EPSILON_DIRECTION {
        other_to_reference /= magnitude;
    }

    let reference_length = reference_attributes.half_length * SQUARE_ROOT_OF_TWO;
    let other_length = other_attributes.half_length * SQUARE_ROOT_OF_TWO;
    let inter_vehicle_length = reference_length + other_length;

    let inter_vehicle_distance = crate::math::distance_squared(reference_location, other_location);
    let reference_extension = bounding_box_extension(reference_id, reference_state, locks);
    let other_extension = bounding_box_extension(other_id, other_state, locks);
    let ego_detection_range = (reference_extension + inter_vehicle_length).powi(2);
    let cross_detection_range =
        (reference_extension + inter_vehicle_length + other_extension).powi(2);

    let other_in_ego_range = inter_vehicle_distance < ego_detection_range;
    let other_in_cross_range = inter_vehicle_distance < cross_detection_range;
    let other_in_front = reference_heading.dot(reference_to_other) > 0.0;

    let closest_waypoint = &reference_buffer[0];
    let look_ahead_waypoint = &reference_buffer[look_ahead_index.min(reference_buffer.len() - 1)];
    let ego_inside_junction = closest_waypoint.is_junction();
    let ego_at_junction_entrance =
        !closest_waypoint.is_junction() && look_ahead_waypoint.is_junction();
    let ego_at_traffic_light = reference_tl.at_traffic_light;
    let ego_stopped_by_light = reference_tl.color != LightColor::Green;

    // A red light at a junction entrance already holds the ego; everything
    // else needs the other actor inside the speed-dependent detection range.
    if !(ego_at_junction_entrance && ego_at_traffic_light && ego_stopped_by_light)
        && ((ego_inside_junction && other_in_cross_range)
            || (!ego_inside_junction && other_in_front && other_in_ego_range))
    {
        let comparison = geometry_between_actors(
            geometry_cache,
            geodesic_map,
            reference_id,
            other_id,
            reference_state,
            other_state,
            reference_attributes,
            other_attributes,
            reference_buffer,
            other_buffer,
            locks,
            reference_lead_distance,
            other_lead_distance,
        );

        let corridors_touching = comparison.inter_geodesic_distance < PROXIMITY_TOUCH_MARGIN;
        let bodies_touching = comparison.inter_bbox_distance < PROXIMITY_TOUCH_MARGIN;
        let ego_path_clear = comparison.other_to_reference_geodesic > PROXIMITY_TOUCH_MARGIN;
        let other_path_clear = comparison.reference_to_other_geodesic > PROXIMITY_TOUCH_MARGIN;
        let ego_path_priority =
            comparison.reference_to_other_geodesic < comparison.other_to_reference_geodesic;
        let ego_angular_priority =
            reference_heading.dot(reference_to_other) < other_heading.dot(other_to_reference);

        // Whichever vehicle's path is farther from the other's body keeps
        // priority to move; the intruder yields.
        if corridors_touching
            && ((!bodies_touching
                && (!ego_path_clear
                    || (ego_path_clear
                        && other_path_clear
                        && !ego_angular_priority
                        && !ego_path_priority)))
                || (bodies_touching && !ego_angular_priority && !ego_path_priority))
        {
            hazard = true;

            let specific_distance_margin =
                f64::max(reference_lead_distance, BOUNDARY_EXTENSION_MINIMUM);
            available_distance_margin = f64::max(
                comparison.reference_to_other_geodesic - specific_distance_margin,
                0.0,
            );

            // Maintain the lock so the corridor keeps tracking the lead
            // vehicle while the follower slows down.
            match locks.get_mut(&reference_id) {
                Some(lock) if lock.lead_vehicle_id == other_id => {
                    lock.distance_to_lead_vehicle =
                        if comparison.other_to_reference_geodesic < PROXIMITY_TOUCH_MARGIN {
                            comparison.inter_bbox_distance
                        } else {
                            comparison.reference_to_other_geodesic
                        };
                }
                Some(lock) => {
                    *lock = CollisionLock {
                        lead_vehicle_id: other_id,
                        initial_lock_distance: comparison.inter_bbox_distance,
                        distance_to_lead_vehicle: comparison.inter_bbox_distance,
                    };
                }
                None => {
                    locks.insert(
                        reference_id,
                        CollisionLock {
                            lead_vehicle_id: other_id,
                            initial_lock_distance: comparison.inter_bbox_distance,
                            distance_to_lead_vehicle: comparison.inter_bbox_distance,
                        },
                    );
                }
            }
        }
    }

    // No hazard with this actor flushes any lock held by the reference.
    if !hazard {
        locks.remove(&reference_id);
    }

    (hazard, available_distance_margin)
}
