//! Discrete PID controller producing throttle, brake and steer.

use crate::constants::{MAX_BRAKE, MAX_THROTTLE};
use serde::{Deserialize, Serialize};

/// Controller state carried between ticks for one vehicle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct StateEntry {
    pub deviation: f64,
    pub deviation_integral: f64,
    /// Simulation-clock second at which the state was taken.
    pub timestamp: f64,
    pub velocity: f64,
    pub velocity_integral: f64,
}

/// Saturated actuation produced by one controller step.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ActuationSignal {
    pub throttle: f64,
    pub brake: f64,
    pub steer: f64,
}

/// One proportional/integral/derivative gain triple.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PidGains {
    pub kp: f64,
    pub ki: f64,
    pub kd: f64,
}

impl PidGains {
    pub const fn new(kp: f64, ki: f64, kd: f64) -> Self {
        Self { kp, ki, kd }
    }
}

/// Longitudinal and lateral gain sets for both speed regimes.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PidConfig {
    pub urban_longitudinal: PidGains,
    pub highway_longitudinal: PidGains,
    pub urban_lateral: PidGains,
    pub highway_lateral: PidGains,
}

impl Default for PidConfig {
    fn default() -> Self {
        Self {
            urban_longitudinal: PidGains::new(2.0, 0.05, 0.07),
            highway_longitudinal: PidGains::new(4.0, 0.02, 0.03),
            urban_lateral: PidGains::new(9.0, 0.02, 1.0),
            highway_lateral: PidGains::new(7.0, 0.02, 1.0),
        }
    }
}

/// Folds the current measurements into a new controller state.
///
/// The velocity deviation is relative to the target, keeping the gains
/// independent of the cruise speed.
pub fn state_update(
    previous: StateEntry,
    current_velocity: f64,
    target_velocity: f64,
    angular_deviation: f64,
    timestamp: f64,
) -> StateEntry {
    let dt = timestamp - previous.timestamp;
    let velocity_deviation =
        (current_velocity - target_velocity) / f64::max(target_velocity, f64::EPSILON);
    StateEntry {
        deviation: angular_deviation,
        deviation_integral: angular_deviation * dt + previous.deviation_integral,
        timestamp,
        velocity: velocity_deviation,
        velocity_integral: velocity_deviation * dt + previous.velocity_integral,
    }
}

/// Produces saturated throttle, brake and steer from two consecutive states.
pub fn run_step(
    current: StateEntry,
    previous: StateEntry,
    longitudinal: PidGains,
    lateral: PidGains,
) -> ActuationSignal {
    let longitudinal_response = longitudinal.kp * current.velocity
        + longitudinal.ki * current.velocity_integral
        + longitudinal.kd * (current.velocity - previous.velocity);

    // A positive response means the vehicle is faster than its target.
    let (throttle, brake) = if longitudinal_response < 0.0 {
        (f64::min(longitudinal_response.abs(), MAX_THROTTLE), 0.0)
    } else {
        (0.0, f64::min(longitudinal_response, MAX_BRAKE))
    };

    let steer = lateral.kp * current.deviation
        + lateral.ki * current.deviation_integral
        + lateral.kd * (current.deviation - previous.deviation);

    ActuationSignal {
        throttle,
        brake,
        steer: steer.clamp(-1.0, 1.0),
    }
}
