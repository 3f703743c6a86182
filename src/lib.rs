use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

pub mod actor;
pub mod boundary;
pub mod collision;
pub mod constants;
pub mod debug;
pub mod error;
pub mod math;
pub mod motion;
pub mod params;
pub mod pilot;
pub mod waypoint;

pub use actor::{
    ActorType, KinematicState, LightColor, Rotation, StaticAttributes, TrafficLightState,
    Transform, WorldSnapshot,
};
pub use collision::{CollisionFrame, CollisionHazard, CollisionLock, CollisionLockMap};
pub use error::{PilotError, Result};
pub use motion::{Command, ControlFrame, PidConfig, PidGains, StateEntry, VehicleControl};
pub use params::Parameters;
pub use pilot::Pilot;
pub use waypoint::{Buffer, Waypoint};

/// Unique identifier of a simulated agent, issued by the simulator.
#[derive(
    Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Default, Serialize, Deserialize,
)]
pub struct ActorId(pub u64);

impl fmt::Display for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The external spatial index: reports the actors whose near-future routes
/// overlap the given actor's route.
pub trait TrackTraffic {
    fn overlapping_vehicles(&self, actor_id: ActorId) -> Vec<ActorId>;
}

impl TrackTraffic for HashMap<ActorId, Vec<ActorId>> {
    fn overlapping_vehicles(&self, actor_id: ActorId) -> Vec<ActorId> {
        self.get(&actor_id).cloned().unwrap_or_default()
    }
}
