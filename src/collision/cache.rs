use crate::actor::{KinematicState, StaticAttributes};
use crate::boundary::{actor_boundary, geodesic_boundary, GeodesicBoundaryMap};
use crate::collision::CollisionLockMap;
use crate::math::Polygon2d;
use crate::waypoint::Waypoint;
use crate::ActorId;
use std::collections::HashMap;

/// The four minimum polygon distances between an ordered actor pair.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct GeometryComparison {
    /// Distance from the reference body to the other actor's corridor.
    pub reference_to_other_geodesic: f64,
    /// Distance from the other body to the reference actor's corridor.
    pub other_to_reference_geodesic: f64,
    /// Distance between the two corridors.
    pub inter_geodesic_distance: f64,
    /// Distance between the two bodies.
    pub inter_bbox_distance: f64,
}

impl GeometryComparison {
    /// The same comparison seen from the opposite side of the pair.
    fn reversed(self) -> Self {
        Self {
            reference_to_other_geodesic: self.other_to_reference_geodesic,
            other_to_reference_geodesic: self.reference_to_other_geodesic,
            ..self
        }
    }
}

/// Pairwise results keyed by the canonical `(min, max)` actor pair, living
/// for one collision tick.
pub(crate) type GeometryCache = HashMap<(ActorId, ActorId), GeometryComparison>;

/// Computes or recalls the geometry comparison for an actor pair.
///
/// Results are stored once per unordered pair; a query from the opposite side
/// gets the two directional fields swapped.
#[allow(clippy::too_many_arguments)]
pub(crate) fn geometry_between_actors(
    cache: &mut GeometryCache,
    geodesic_map: &mut GeodesicBoundaryMap,
    reference_id: ActorId,
    other_id: ActorId,
    reference_state: &KinematicState,
    other_state: &KinematicState,
    reference_attributes: &StaticAttributes,
    other_attributes: &StaticAttributes,
    reference_buffer: &[Waypoint],
    other_buffer: &[Waypoint],
    locks: &CollisionLockMap,
    reference_lead_distance: f64,
    other_lead_distance: f64,
) -> GeometryComparison {
    let key = (
        ActorId::min(reference_id, other_id),
        ActorId::max(reference_id, other_id),
    );

    if let Some(cached) = cache.get(&key) {
        return if reference_id == key.0 {
            *cached
        } else {
            cached.reversed()
        };
    }

    let reference_polygon =
        Polygon2d::from_boundary(&actor_boundary(reference_state, reference_attributes));
    let other_polygon = Polygon2d::from_boundary(&actor_boundary(other_state, other_attributes));

    let reference_geodesic = Polygon2d::from_boundary(&geodesic_boundary(
        reference_id,
        geodesic_map,
        reference_state,
        reference_attributes,
        reference_buffer,
        reference_lead_distance,
        locks,
    ));
    let other_geodesic = Polygon2d::from_boundary(&geodesic_boundary(
        other_id,
        geodesic_map,
        other_state,
        other_attributes,
        other_buffer,
        other_lead_distance,
        locks,
    ));

    let comparison = GeometryComparison {
        reference_to_other_geodesic: reference_polygon.distance(&other_geodesic),
        other_to_reference_geodesic: other_polygon.distance(&reference_geodesic),
        inter_geodesic_distance: reference_geodesic.distance(&other_geodesic),
        inter_bbox_distance: reference_polygon.distance(&other_polygon),
    };

    let stored = if reference_id == key.0 {
        comparison
    } else {
        comparison.reversed()
    };
    cache.insert(key, stored);

    comparison
}
