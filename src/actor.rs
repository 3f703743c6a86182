//! Actor state records supplied by the simulator each tick.

use crate::math::{Point3d, Vector3d};
use crate::waypoint::Buffer;
use crate::ActorId;
use cgmath::InnerSpace;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A yaw-bearing orientation in the ground plane.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Rotation {
    /// Heading angle in radians, measured from the world x-axis.
    pub yaw: f64,
}

impl Rotation {
    pub fn from_yaw(yaw: f64) -> Self {
        Self { yaw }
    }

    /// Unit vector pointing along the heading.
    pub fn forward(&self) -> Vector3d {
        Vector3d::new(self.yaw.cos(), self.yaw.sin(), 0.0)
    }
}

/// A world pose.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub location: Point3d,
    pub rotation: Rotation,
}

/// The kind of simulated agent.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActorType {
    Vehicle,
    Pedestrian,
}

/// Per-tick kinematic snapshot of an actor.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct KinematicState {
    pub location: Point3d,
    pub velocity: Vector3d,
    pub rotation: Rotation,
    pub physics_enabled: bool,
}

impl KinematicState {
    /// The actor's speed in m/s.
    pub fn speed(&self) -> f64 {
        self.velocity.magnitude()
    }

    /// The actor's speed along its heading in m/s.
    pub fn forward_speed(&self) -> f64 {
        self.velocity.dot(self.rotation.forward())
    }
}

/// Static description of an actor.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct StaticAttributes {
    pub actor_type: ActorType,
    /// Half the actor's length in m.
    pub half_length: f64,
    /// Half the actor's width in m.
    pub half_width: f64,
    /// Posted speed limit in km/h.
    pub speed_limit: f64,
}

/// Signal colour reported for an actor's controlling traffic light.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum LightColor {
    Red,
    Yellow,
    Green,
    Off,
    Unknown,
}

/// Traffic-light relation of an actor.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrafficLightState {
    pub color: LightColor,
    pub at_traffic_light: bool,
}

/// The immutable world snapshot read by both decision phases.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct WorldSnapshot {
    pub states: HashMap<ActorId, KinematicState>,
    pub attributes: HashMap<ActorId, StaticAttributes>,
    pub tl_states: HashMap<ActorId, TrafficLightState>,
    pub buffers: HashMap<ActorId, Buffer>,
}
