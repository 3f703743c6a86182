//! Motion planning: hazard verdicts in, actuation or teleport commands out.

use crate::actor::{Transform, WorldSnapshot};
use crate::collision::CollisionHazard;
use crate::constants::{
    CRITICAL_BRAKING_MARGIN, EPSILON_DIRECTION, EPSILON_RELATIVE_SPEED, FOLLOW_DISTANCE_RATE,
    HIGHWAY_SPEED, HYBRID_MODE_DT, MAX_BRAKE, MIN_FOLLOW_LEAD_DISTANCE, RELATIVE_APPROACH_SPEED,
    TARGET_WAYPOINT_HORIZON_LENGTH, TARGET_WAYPOINT_TIME_HORIZON,
};
use crate::error::{PilotError, Result};
use crate::math::{Point3d, Vector3d};
use crate::params::Parameters;
use crate::waypoint::target_waypoint_at;
use crate::ActorId;
use cgmath::InnerSpace;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub use pid::{ActuationSignal, PidConfig, PidGains, StateEntry};

pub mod pid;

/// Throttle, brake and steer for a physics-enabled vehicle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct VehicleControl {
    pub throttle: f64,
    pub brake: f64,
    pub steer: f64,
}

/// A command for the simulator to apply to one actor.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum Command {
    ApplyControl {
        actor_id: ActorId,
        control: VehicleControl,
    },
    ApplyTransform {
        actor_id: ActorId,
        transform: Transform,
    },
}

/// One command per scheduled ego, in ego-list order.
pub type ControlFrame = Vec<Command>;

/// Runs motion planning for every scheduled ego. `time` is the simulation
/// clock in seconds.
///
/// Unlike collision avoidance, a scheduled ego missing from a snapshot map is
/// a caller bug and reported as an error.
#[allow(clippy::too_many_arguments)]
pub fn motion_stage(
    vehicle_ids: &[ActorId],
    snapshot: &WorldSnapshot,
    parameters: &Parameters,
    pid_config: &PidConfig,
    collision_frame: &[CollisionHazard],
    tl_frame: &[bool],
    pid_states: &mut HashMap<ActorId, StateEntry>,
    teleport_instants: &mut HashMap<ActorId, f64>,
    time: f64,
) -> Result<ControlFrame> {
    if collision_frame.len() != vehicle_ids.len() {
        return Err(PilotError::FrameMismatch {
            frame: "collision",
            frame_len: collision_frame.len(),
            expected: vehicle_ids.len(),
        });
    }
    if tl_frame.len() != vehicle_ids.len() {
        return Err(PilotError::FrameMismatch {
            frame: "traffic light",
            frame_len: tl_frame.len(),
            expected: vehicle_ids.len(),
        });
    }

    vehicle_ids
        .iter()
        .enumerate()
        .map(|(index, &ego_id)| {
            plan_ego(
                ego_id,
                snapshot,
                parameters,
                pid_config,
                &collision_frame[index],
                tl_frame[index],
                pid_states,
                teleport_instants,
                time,
            )
        })
        .collect()
}

/// Resolves the longitudinal intent and produces the ego's command.
#[allow(clippy::too_many_arguments)]
fn plan_ego(
    ego_id: ActorId,
    snapshot: &WorldSnapshot,
    parameters: &Parameters,
    pid_config: &PidConfig,
    collision_hazard: &CollisionHazard,
    tl_hazard: bool,
    pid_states: &mut HashMap<ActorId, StateEntry>,
    teleport_instants: &mut HashMap<ActorId, f64>,
    time: f64,
) -> Result<Command> {
    let state = snapshot
        .states
        .get(&ego_id)
        .ok_or(PilotError::MissingActor {
            actor_id: ego_id,
            map: "state",
        })?;
    let attributes = snapshot
        .attributes
        .get(&ego_id)
        .ok_or(PilotError::MissingActor {
            actor_id: ego_id,
            map: "attribute",
        })?;
    let buffer = snapshot
        .buffers
        .get(&ego_id)
        .ok_or(PilotError::MissingActor {
            actor_id: ego_id,
            map: "buffer",
        })?;
    if buffer.is_empty() {
        return Err(PilotError::EmptyBuffer { actor_id: ego_id });
    }

    let ego_location = state.location;
    let ego_velocity = state.velocity;
    let ego_speed = state.speed();
    let ego_heading = state.rotation.forward();

    // Steering target ahead of the vehicle.
    let target_point_distance = f64::max(
        ego_speed * TARGET_WAYPOINT_TIME_HORIZON,
        TARGET_WAYPOINT_HORIZON_LENGTH,
    );
    let (target_waypoint, _) = target_waypoint_at(buffer, target_point_distance);
    let current_deviation = angular_deviation(ego_location, ego_heading, target_waypoint.location());

    let previous_state = *pid_states.entry(ego_id).or_insert(StateEntry {
        timestamp: time,
        ..Default::default()
    });

    let (longitudinal, lateral) = if ego_speed > HIGHWAY_SPEED {
        (pid_config.highway_longitudinal, pid_config.highway_lateral)
    } else {
        (pid_config.urban_longitudinal, pid_config.urban_lateral)
    };

    let max_target_velocity =
        parameters.vehicle_target_velocity(ego_id, attributes.speed_limit) / 3.6;
    let mut dynamic_target_velocity = max_target_velocity;
    let mut collision_emergency_stop = false;

    if let (true, Some(other_id)) = (collision_hazard.hazard, collision_hazard.hazard_actor_id) {
        let other_state = snapshot
            .states
            .get(&other_id)
            .ok_or(PilotError::MissingActor {
                actor_id: other_id,
                map: "state",
            })?;
        let other_velocity = other_state.velocity;
        let relative_speed = (ego_velocity - other_velocity).magnitude();
        let available_distance_margin = collision_hazard.available_distance_margin;
        let other_speed_along_heading = other_velocity.dot(ego_heading);

        // Only adjust while the ego is actually closing the gap.
        if relative_speed > EPSILON_RELATIVE_SPEED {
            let follow_lead_distance =
                relative_speed * FOLLOW_DISTANCE_RATE + MIN_FOLLOW_LEAD_DISTANCE;
            if available_distance_margin > follow_lead_distance {
                // Close the gap at a controlled relative speed.
                dynamic_target_velocity = other_speed_along_heading + RELATIVE_APPROACH_SPEED;
            } else if available_distance_margin > CRITICAL_BRAKING_MARGIN {
                // Match the lead vehicle's speed along the ego heading.
                dynamic_target_velocity =
                    f64::max(other_speed_along_heading, RELATIVE_APPROACH_SPEED);
            } else {
                collision_emergency_stop = true;
            }
        }
        if available_distance_margin < CRITICAL_BRAKING_MARGIN {
            collision_emergency_stop = true;
        }
    }

    dynamic_target_velocity = f64::min(dynamic_target_velocity, max_target_velocity);
    let emergency_stop = tl_hazard || collision_emergency_stop;

    if state.physics_enabled {
        let mut current_state = pid::state_update(
            previous_state,
            ego_speed,
            dynamic_target_velocity,
            current_deviation,
            time,
        );
        let mut signal = pid::run_step(current_state, previous_state, longitudinal, lateral);
        if emergency_stop {
            current_state.deviation_integral = 0.0;
            current_state.velocity_integral = 0.0;
            signal.throttle = 0.0;
            signal.brake = MAX_BRAKE;
        }
        pid_states.insert(ego_id, current_state);
        Ok(Command::ApplyControl {
            actor_id: ego_id,
            control: VehicleControl {
                throttle: signal.throttle,
                brake: signal.brake,
                steer: signal.steer,
            },
        })
    } else {
        // Physics-less vehicles carry no controller state.
        pid_states.insert(
            ego_id,
            StateEntry {
                timestamp: time,
                ..Default::default()
            },
        );
        let last_teleport = *teleport_instants.entry(ego_id).or_insert(time);
        let elapsed = time - last_teleport;

        let transform = if !emergency_stop
            && (parameters.synchronous_mode() || elapsed > HYBRID_MODE_DT)
        {
            // Teleport far enough along the route to realise the target
            // velocity over one hybrid timestep.
            let target_displacement = dynamic_target_velocity * HYBRID_MODE_DT;
            let (teleport_waypoint, _) = target_waypoint_at(buffer, target_displacement);
            let base_displacement = teleport_waypoint.distance_to(ego_location);
            let missing_displacement = f64::max(target_displacement - base_displacement, 0.0);
            Transform {
                location: teleport_waypoint.location()
                    + teleport_waypoint.forward() * missing_displacement,
                rotation: teleport_waypoint.transform().rotation,
            }
        } else {
            // Freeze in place on emergency stop, and between hybrid
            // timesteps in asynchronous mode.
            Transform {
                location: ego_location,
                rotation: state.rotation,
            }
        };
        Ok(Command::ApplyTransform {
            actor_id: ego_id,
            transform,
        })
    }
}

/// Signed angular deviation between the ego heading and the bearing to the
/// target; small when aligned, negative when the target lies to the right.
fn angular_deviation(ego_location: Point3d, ego_heading: Vector3d, target: Point3d) -> f64 {
    let mut to_target = target - ego_location;
    let magnitude = to_target.magnitude();
    if magnitude <= EPSILON_DIRECTION {
        return 0.0;
    }
    to_target /= magnitude;
    let deviation = 1.0 - ego_heading.dot(to_target);
    let cross_z = ego_heading.x * to_target.y - ego_heading.y * to_target.x;
    if cross_z < 0.0 {
        -deviation
    } else {
        deviation
    }
}
