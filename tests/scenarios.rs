//! End-to-end scenarios driving both decision phases through the pilot.

use assert_approx_eq::assert_approx_eq;
use std::collections::HashMap;
use traffic_pilot::constants::{DEFAULT_LEAD_DISTANCE, HYBRID_MODE_DT};
use traffic_pilot::math::Point3d;
use traffic_pilot::{
    ActorId, ActorType, Buffer, Command, KinematicState, LightColor, Parameters, Pilot,
    PilotError, Rotation, StaticAttributes, TrafficLightState, Transform, Waypoint, WorldSnapshot,
};

const EGO: ActorId = ActorId(1);
const LEAD: ActorId = ActorId(2);
const WALKER: ActorId = ActorId(3);

fn moving_state(location: Point3d, yaw: f64, speed: f64, physics_enabled: bool) -> KinematicState {
    let rotation = Rotation::from_yaw(yaw);
    KinematicState {
        location,
        velocity: rotation.forward() * speed,
        rotation,
        physics_enabled,
    }
}

fn vehicle_attributes(speed_limit: f64) -> StaticAttributes {
    StaticAttributes {
        actor_type: ActorType::Vehicle,
        half_length: 2.3,
        half_width: 1.0,
        speed_limit,
    }
}

fn walker_attributes() -> StaticAttributes {
    StaticAttributes {
        actor_type: ActorType::Pedestrian,
        half_length: 0.5,
        half_width: 0.5,
        speed_limit: 0.0,
    }
}

fn green_light() -> TrafficLightState {
    TrafficLightState {
        color: LightColor::Green,
        at_traffic_light: false,
    }
}

fn route_buffer(
    start: Point3d,
    yaw: f64,
    spacing: f64,
    count: usize,
    junction: std::ops::Range<usize>,
) -> Buffer {
    let rotation = Rotation::from_yaw(yaw);
    let forward = rotation.forward();
    (0..count)
        .map(|i| {
            Waypoint::new(
                Transform {
                    location: start + forward * (spacing * i as f64),
                    rotation,
                },
                junction.contains(&i),
            )
        })
        .collect()
}

fn insert_actor(
    snapshot: &mut WorldSnapshot,
    actor_id: ActorId,
    state: KinematicState,
    attributes: StaticAttributes,
    tl_state: TrafficLightState,
    buffer: Buffer,
) {
    snapshot.states.insert(actor_id, state);
    snapshot.attributes.insert(actor_id, attributes);
    snapshot.tl_states.insert(actor_id, tl_state);
    snapshot.buffers.insert(actor_id, buffer);
}

fn pair_track(ego: ActorId, others: &[ActorId]) -> HashMap<ActorId, Vec<ActorId>> {
    HashMap::from([(ego, others.to_vec())])
}

/// Ego at the origin closing in on a slower lead vehicle 20 m ahead.
fn follower_snapshot(lead_x: f64, lead_speed: f64) -> WorldSnapshot {
    let mut snapshot = WorldSnapshot::default();
    insert_actor(
        &mut snapshot,
        EGO,
        moving_state(Point3d::new(0.0, 0.0, 0.0), 0.0, 10.0, true),
        vehicle_attributes(50.0),
        green_light(),
        route_buffer(Point3d::new(0.0, 0.0, 0.0), 0.0, 1.0, 60, 0..0),
    );
    insert_actor(
        &mut snapshot,
        LEAD,
        moving_state(Point3d::new(lead_x, 0.0, 0.0), 0.0, lead_speed, true),
        vehicle_attributes(50.0),
        green_light(),
        route_buffer(Point3d::new(lead_x, 0.0, 0.0), 0.0, 1.0, 60, 0..0),
    );
    snapshot
}

#[test]
fn head_to_tail_follower_yields_with_margin() {
    let mut pilot = Pilot::with_rng_seed(Parameters::new(), 42);
    let snapshot = follower_snapshot(20.0, 5.0);
    let track = pair_track(EGO, &[LEAD]);

    let (collision_frame, control_frame) = pilot
        .tick(0.0, &[EGO], &snapshot, &track, &[false])
        .unwrap();

    let hazard = &collision_frame[0];
    assert!(hazard.hazard);
    assert_eq!(hazard.hazard_actor_id, Some(LEAD));
    // Ego body to lead corridor, less the configured lead distance.
    let expected_margin = (20.0 - 2.0 * 2.3) - DEFAULT_LEAD_DISTANCE;
    assert_approx_eq!(hazard.available_distance_margin, expected_margin, 1e-6);
    assert!(hazard.available_distance_margin.is_finite());
    assert!(hazard.available_distance_margin >= 0.0);

    let lock = pilot.collision_lock(EGO).expect("lock created on hazard");
    assert_eq!(lock.lead_vehicle_id, LEAD);
    assert_approx_eq!(lock.initial_lock_distance, 20.0 - 2.0 * 2.3, 1e-6);
    assert_approx_eq!(lock.distance_to_lead_vehicle, 20.0 - 2.0 * 2.3, 1e-6);

    assert!(matches!(control_frame[0], Command::ApplyControl { .. }));
}

#[test]
fn departing_leader_clears_hazard_and_lock() {
    let mut pilot = Pilot::with_rng_seed(Parameters::new(), 42);
    let track = pair_track(EGO, &[LEAD]);

    // First tick establishes the following hazard and its lock.
    let snapshot = follower_snapshot(20.0, 5.0);
    pilot
        .tick(0.0, &[EGO], &snapshot, &track, &[false])
        .unwrap();
    assert!(pilot.collision_lock(EGO).is_some());

    // The leader has pulled far ahead at speed; the corridors no longer meet.
    let snapshot = follower_snapshot(40.0, 20.0);
    let (collision_frame, control_frame) = pilot
        .tick(HYBRID_MODE_DT, &[EGO], &snapshot, &track, &[false])
        .unwrap();

    let hazard = &collision_frame[0];
    assert!(!hazard.hazard);
    assert_eq!(hazard.hazard_actor_id, None);
    assert!(hazard.available_distance_margin.is_infinite());
    assert!(pilot.collision_lock(EGO).is_none());

    let Command::ApplyControl { control, .. } = control_frame[0] else {
        panic!("physics-enabled ego must be actuated");
    };
    assert!(control.throttle > 0.0);
    assert_approx_eq!(control.brake, 0.0);
}

#[test]
fn lock_pins_corridor_while_following() {
    let mut pilot = Pilot::with_rng_seed(Parameters::new(), 42);
    let track = pair_track(EGO, &[LEAD]);

    let snapshot = follower_snapshot(20.0, 5.0);
    pilot
        .tick(0.0, &[EGO], &snapshot, &track, &[false])
        .unwrap();
    let initial = pilot.collision_lock(EGO).unwrap().initial_lock_distance;

    // The ego has closed 2 m; the pinned corridor overlaps the lead body, so
    // the lock tracks the body-to-body distance.
    let mut snapshot = follower_snapshot(20.0, 5.0);
    snapshot.states.insert(
        EGO,
        moving_state(Point3d::new(2.0, 0.0, 0.0), 0.0, 10.0, true),
    );
    snapshot.buffers.insert(
        EGO,
        route_buffer(Point3d::new(2.0, 0.0, 0.0), 0.0, 1.0, 60, 0..0),
    );
    let (collision_frame, _) = pilot
        .tick(HYBRID_MODE_DT, &[EGO], &snapshot, &track, &[false])
        .unwrap();

    assert!(collision_frame[0].hazard);
    let lock = pilot.collision_lock(EGO).unwrap();
    assert_approx_eq!(lock.distance_to_lead_vehicle, 18.0 - 2.0 * 2.3, 1e-6);
    assert_approx_eq!(lock.initial_lock_distance, initial, 1e-9);

    // No overlap reported at all: the hazard clears and the lock goes away.
    let empty_track: HashMap<ActorId, Vec<ActorId>> = HashMap::new();
    let (collision_frame, _) = pilot
        .tick(2.0 * HYBRID_MODE_DT, &[EGO], &snapshot, &empty_track, &[false])
        .unwrap();
    assert!(!collision_frame[0].hazard);
    assert!(pilot.collision_lock(EGO).is_none());
}

#[test]
fn junction_cross_traffic_is_a_hazard() {
    let mut pilot = Pilot::with_rng_seed(Parameters::new(), 42);
    let mut snapshot = WorldSnapshot::default();
    // Ego is inside the junction, moving along +x.
    insert_actor(
        &mut snapshot,
        EGO,
        moving_state(Point3d::new(0.0, 0.0, 0.0), 0.0, 5.0, true),
        vehicle_attributes(50.0),
        green_light(),
        route_buffer(Point3d::new(0.0, 0.0, 0.0), 0.0, 1.0, 60, 0..10),
    );
    // Cross traffic approaches perpendicularly from the right.
    let yaw = std::f64::consts::FRAC_PI_2;
    insert_actor(
        &mut snapshot,
        LEAD,
        moving_state(Point3d::new(12.0, -10.0, 0.0), yaw, 5.0, true),
        vehicle_attributes(50.0),
        green_light(),
        route_buffer(Point3d::new(12.0, -10.0, 0.0), yaw, 1.0, 60, 0..0),
    );
    let track = pair_track(EGO, &[LEAD]);

    let (collision_frame, _) = pilot
        .tick(0.0, &[EGO], &snapshot, &track, &[false])
        .unwrap();

    let hazard = &collision_frame[0];
    assert!(hazard.hazard);
    assert_eq!(hazard.hazard_actor_id, Some(LEAD));
}

#[test]
fn red_light_at_junction_entrance_suppresses_negotiation() {
    let mut pilot = Pilot::with_rng_seed(Parameters::new(), 42);
    let mut snapshot = follower_snapshot(20.0, 5.0);
    // The junction starts just past the look-ahead point and the ego is held
    // at a red light.
    snapshot.buffers.insert(
        EGO,
        route_buffer(Point3d::new(0.0, 0.0, 0.0), 0.0, 1.0, 60, 5..60),
    );
    snapshot.tl_states.insert(
        EGO,
        TrafficLightState {
            color: LightColor::Red,
            at_traffic_light: true,
        },
    );
    let track = pair_track(EGO, &[LEAD]);

    // Collision avoidance stands down; the traffic-light hazard takes over.
    let (collision_frame, control_frame) = pilot
        .tick(0.0, &[EGO], &snapshot, &track, &[true])
        .unwrap();

    assert!(!collision_frame[0].hazard);
    let Command::ApplyControl { control, .. } = control_frame[0] else {
        panic!("physics-enabled ego must be actuated");
    };
    assert_approx_eq!(control.brake, 1.0);
    assert_approx_eq!(control.throttle, 0.0);

    let state = pilot.controller_state(EGO).unwrap();
    assert_approx_eq!(state.deviation_integral, 0.0);
    assert_approx_eq!(state.velocity_integral, 0.0);
}

#[test]
fn crossing_pedestrian_forces_emergency_stop() {
    let mut pilot = Pilot::with_rng_seed(Parameters::new(), 42);
    let mut snapshot = follower_snapshot(20.0, 5.0);
    snapshot.states.remove(&LEAD);
    let yaw = std::f64::consts::FRAC_PI_2;
    insert_actor(
        &mut snapshot,
        WALKER,
        moving_state(Point3d::new(6.0, 0.5, 0.0), yaw, 1.0, true),
        walker_attributes(),
        green_light(),
        route_buffer(Point3d::new(6.0, 0.5, 0.0), yaw, 1.0, 5, 0..0),
    );
    let track = pair_track(EGO, &[WALKER]);

    let (collision_frame, control_frame) = pilot
        .tick(0.0, &[EGO], &snapshot, &track, &[false])
        .unwrap();

    let hazard = &collision_frame[0];
    assert!(hazard.hazard);
    assert_eq!(hazard.hazard_actor_id, Some(WALKER));
    // The walker is already inside the lead-distance margin.
    assert_approx_eq!(hazard.available_distance_margin, 0.0, 1e-9);

    let Command::ApplyControl { control, .. } = control_frame[0] else {
        panic!("physics-enabled ego must be actuated");
    };
    assert_approx_eq!(control.brake, 1.0);
    assert_approx_eq!(control.throttle, 0.0);
}

#[test]
fn full_walker_ignore_suppresses_deterministically() {
    let mut parameters = Parameters::new();
    parameters.set_percentage_ignore_walkers(EGO, 100.0);
    let mut pilot = Pilot::with_rng_seed(parameters, 42);

    let mut snapshot = follower_snapshot(20.0, 5.0);
    snapshot.states.remove(&LEAD);
    let yaw = std::f64::consts::FRAC_PI_2;
    insert_actor(
        &mut snapshot,
        WALKER,
        moving_state(Point3d::new(6.0, 0.5, 0.0), yaw, 1.0, true),
        walker_attributes(),
        green_light(),
        route_buffer(Point3d::new(6.0, 0.5, 0.0), yaw, 1.0, 5, 0..0),
    );
    let track = pair_track(EGO, &[WALKER]);

    for tick in 0..20 {
        let (collision_frame, _) = pilot
            .tick(tick as f64 * HYBRID_MODE_DT, &[EGO], &snapshot, &track, &[false])
            .unwrap();
        assert!(!collision_frame[0].hazard);
    }
}

#[test]
fn physicsless_cruise_teleports_by_target_velocity() {
    let mut parameters = Parameters::new();
    parameters.set_synchronous_mode(true);
    let mut pilot = Pilot::with_rng_seed(parameters, 42);

    let mut snapshot = WorldSnapshot::default();
    // A buffer shorter than the displacement forces the exact extension path.
    insert_actor(
        &mut snapshot,
        EGO,
        moving_state(Point3d::new(0.0, 0.0, 0.0), 0.0, 30.0 / 3.6, false),
        vehicle_attributes(30.0),
        green_light(),
        route_buffer(Point3d::new(0.0, 0.0, 0.0), 0.0, 0.2, 2, 0..0),
    );
    let track: HashMap<ActorId, Vec<ActorId>> = HashMap::new();

    let (_, control_frame) = pilot
        .tick(0.0, &[EGO], &snapshot, &track, &[false])
        .unwrap();

    let Command::ApplyTransform { transform, .. } = control_frame[0] else {
        panic!("physics-less ego must be teleported");
    };
    let expected = (30.0 / 3.6) * HYBRID_MODE_DT;
    assert_approx_eq!(transform.location.x, expected, 1e-9);
    assert_approx_eq!(transform.location.y, 0.0, 1e-9);
    assert_approx_eq!(transform.rotation.yaw, 0.0, 1e-9);
}

#[test]
fn dynamic_target_velocity_is_clamped_to_the_limit() {
    let mut parameters = Parameters::new();
    parameters.set_synchronous_mode(true);
    let mut pilot = Pilot::with_rng_seed(parameters, 42);

    let mut snapshot = WorldSnapshot::default();
    // The lead is barely slower, so the follow law asks for more speed than
    // the 30 km/h limit allows.
    insert_actor(
        &mut snapshot,
        EGO,
        moving_state(Point3d::new(0.0, 0.0, 0.0), 0.0, 10.0, false),
        vehicle_attributes(30.0),
        green_light(),
        route_buffer(Point3d::new(0.0, 0.0, 0.0), 0.0, 0.1, 400, 0..0),
    );
    insert_actor(
        &mut snapshot,
        LEAD,
        moving_state(Point3d::new(19.0, 0.0, 0.0), 0.0, 9.0, true),
        vehicle_attributes(30.0),
        green_light(),
        route_buffer(Point3d::new(19.0, 0.0, 0.0), 0.0, 1.0, 40, 0..0),
    );
    let track = pair_track(EGO, &[LEAD]);

    let (collision_frame, control_frame) = pilot
        .tick(0.0, &[EGO], &snapshot, &track, &[false])
        .unwrap();
    assert!(collision_frame[0].hazard);

    let Command::ApplyTransform { transform, .. } = control_frame[0] else {
        panic!("physics-less ego must be teleported");
    };
    // Clamped displacement lands on the 0.5 m waypoint; the unclamped follow
    // speed would have reached the 0.6 m waypoint.
    assert_approx_eq!(transform.location.x, 0.5, 1e-9);
}

#[test]
fn collision_stage_is_deterministic_for_a_seed() {
    let snapshot = follower_snapshot(20.0, 5.0);
    let track = pair_track(EGO, &[LEAD]);

    let mut first = Pilot::with_rng_seed(Parameters::new(), 7);
    let mut second = Pilot::with_rng_seed(Parameters::new(), 7);

    let (frame_a, _) = first
        .tick(0.0, &[EGO], &snapshot, &track, &[false])
        .unwrap();
    let (frame_b, _) = second
        .tick(0.0, &[EGO], &snapshot, &track, &[false])
        .unwrap();

    assert_eq!(frame_a, frame_b);
    assert_eq!(
        first.collision_lock(EGO).copied(),
        second.collision_lock(EGO).copied()
    );
}

#[test]
fn candidates_above_or_below_are_ignored() {
    let mut pilot = Pilot::with_rng_seed(Parameters::new(), 42);
    let mut snapshot = follower_snapshot(20.0, 5.0);
    // Same planar pose, but on an overpass.
    let mut lead_state = snapshot.states[&LEAD];
    lead_state.location.z = 10.0;
    snapshot.states.insert(LEAD, lead_state);
    let track = pair_track(EGO, &[LEAD]);

    let (collision_frame, _) = pilot
        .tick(0.0, &[EGO], &snapshot, &track, &[false])
        .unwrap();
    assert!(!collision_frame[0].hazard);
}

#[test]
fn motion_planning_rejects_missing_egos() {
    let mut pilot = Pilot::with_rng_seed(Parameters::new(), 42);
    let snapshot = WorldSnapshot::default();
    let track: HashMap<ActorId, Vec<ActorId>> = HashMap::new();

    let missing = ActorId(99);
    let result = pilot.tick(0.0, &[missing], &snapshot, &track, &[false]);
    assert_eq!(
        result.unwrap_err(),
        PilotError::MissingActor {
            actor_id: missing,
            map: "state",
        }
    );
}
