use std::collections::HashMap;
use std::time::Instant;

use rand::rngs::StdRng;
use rand::SeedableRng;
use traffic_pilot::constants::HYBRID_MODE_DT;
use traffic_pilot::math::{Point3d, Vector3d};
use traffic_pilot::{
    ActorId, ActorType, Command, KinematicState, Parameters, Pilot, Rotation, StaticAttributes,
    Transform, TrafficLightState, Waypoint, WorldSnapshot,
};

const NUM_VEHICLES: u64 = 12;
const NUM_FRAMES: usize = 600;

/// A single-lane platoon of physics-less vehicles in synchronous hybrid mode.
/// The lead vehicle crawls, so the followers pile up behind it and the
/// decision core has to negotiate the queue every tick.
fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let vehicle_ids: Vec<ActorId> = (0..NUM_VEHICLES).map(ActorId).collect();

    let mut parameters = Parameters::new();
    parameters.set_synchronous_mode(true);
    parameters.randomise_speed_adjusts(&vehicle_ids, 10.0, &mut StdRng::seed_from_u64(11));
    // The platoon leader crawls at a fifth of the limit.
    parameters.set_percentage_speed_difference(vehicle_ids[NUM_VEHICLES as usize - 1], 80.0);

    let mut pilot = Pilot::new(parameters);

    // Vehicles queued along +x, 18 m apart, the leader in front.
    let mut positions: HashMap<ActorId, f64> = vehicle_ids
        .iter()
        .enumerate()
        .map(|(i, id)| (*id, 18.0 * i as f64))
        .collect();
    let mut velocities: HashMap<ActorId, f64> =
        vehicle_ids.iter().map(|id| (*id, 0.0)).collect();

    let track: HashMap<ActorId, Vec<ActorId>> = vehicle_ids
        .iter()
        .map(|id| {
            let others = vehicle_ids.iter().copied().filter(|o| o != id).collect();
            (*id, others)
        })
        .collect();
    let tl_frame = vec![false; vehicle_ids.len()];

    let mut hazard_ticks = 0usize;
    let start = Instant::now();
    for frame in 0..NUM_FRAMES {
        let time = frame as f64 * HYBRID_MODE_DT;
        let snapshot = build_snapshot(&vehicle_ids, &positions, &velocities);
        let (collision_frame, control_frame) = pilot
            .tick(time, &vehicle_ids, &snapshot, &track, &tl_frame)
            .expect("snapshot covers every scheduled vehicle");

        hazard_ticks += collision_frame.iter().filter(|h| h.hazard).count();
        for command in &control_frame {
            if let Command::ApplyTransform { actor_id, transform } = command {
                let displacement = transform.location.x - positions[actor_id];
                velocities.insert(*actor_id, displacement / HYBRID_MODE_DT);
                positions.insert(*actor_id, transform.location.x);
            }
        }
    }
    let elapsed = start.elapsed() / NUM_FRAMES as u32;

    println!(
        "Avg. frame: {:?} ({} vehicles, {} hazard verdicts over {} frames)",
        elapsed, NUM_VEHICLES, hazard_ticks, NUM_FRAMES
    );
}

fn build_snapshot(
    vehicle_ids: &[ActorId],
    positions: &HashMap<ActorId, f64>,
    velocities: &HashMap<ActorId, f64>,
) -> WorldSnapshot {
    let mut snapshot = WorldSnapshot::default();
    for id in vehicle_ids {
        let x = positions[id];
        snapshot.states.insert(
            *id,
            KinematicState {
                location: Point3d::new(x, 0.0, 0.0),
                velocity: Vector3d::new(velocities[id], 0.0, 0.0),
                rotation: Rotation::from_yaw(0.0),
                physics_enabled: false,
            },
        );
        snapshot.attributes.insert(
            *id,
            StaticAttributes {
                actor_type: ActorType::Vehicle,
                half_length: 2.3,
                half_width: 1.0,
                speed_limit: 50.0,
            },
        );
        snapshot.tl_states.insert(
            *id,
            TrafficLightState {
                color: traffic_pilot::LightColor::Green,
                at_traffic_light: false,
            },
        );
        snapshot.buffers.insert(
            *id,
            (0..100)
                .map(|i| {
                    Waypoint::new(
                        Transform {
                            location: Point3d::new(x + i as f64, 0.0, 0.0),
                            rotation: Rotation::from_yaw(0.0),
                        },
                        false,
                    )
                })
                .collect(),
        );
    }
    snapshot
}
