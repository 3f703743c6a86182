//! The per-tick driver owning all state that survives ticks.

use crate::collision::{collision_stage, CollisionFrame, CollisionLock, CollisionLockMap};
use crate::error::Result;
use crate::motion::{motion_stage, ControlFrame, PidConfig, StateEntry};
use crate::params::Parameters;
use crate::{ActorId, TrackTraffic, WorldSnapshot};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::HashMap;

/// Drives the two decision phases over a tick and owns the cross-tick state:
/// collision locks, controller states and teleport instants.
pub struct Pilot {
    parameters: Parameters,
    pid_config: PidConfig,
    collision_locks: CollisionLockMap,
    pid_states: HashMap<ActorId, StateEntry>,
    teleport_instants: HashMap<ActorId, f64>,
    rng: StdRng,
}

impl Pilot {
    /// Creates a pilot with an entropy-seeded ignore-policy stream.
    pub fn new(parameters: Parameters) -> Self {
        Self::build(parameters, StdRng::from_entropy())
    }

    /// Creates a pilot with a deterministic ignore-policy stream.
    pub fn with_rng_seed(parameters: Parameters, seed: u64) -> Self {
        Self::build(parameters, StdRng::seed_from_u64(seed))
    }

    fn build(parameters: Parameters, rng: StdRng) -> Self {
        Self {
            parameters,
            pid_config: PidConfig::default(),
            collision_locks: CollisionLockMap::new(),
            pid_states: HashMap::new(),
            teleport_instants: HashMap::new(),
            rng,
        }
    }

    pub fn parameters(&self) -> &Parameters {
        &self.parameters
    }

    pub fn parameters_mut(&mut self) -> &mut Parameters {
        &mut self.parameters
    }

    pub fn set_pid_config(&mut self, pid_config: PidConfig) {
        self.pid_config = pid_config;
    }

    /// The collision lock currently held for an ego, if any.
    pub fn collision_lock(&self, actor_id: ActorId) -> Option<&CollisionLock> {
        self.collision_locks.get(&actor_id)
    }

    /// The controller state persisted for an ego, if any.
    pub fn controller_state(&self, actor_id: ActorId) -> Option<&StateEntry> {
        self.pid_states.get(&actor_id)
    }

    /// Advances one tick: collision avoidance, then motion planning.
    ///
    /// `tl_frame` carries the externally resolved traffic-light hazard per
    /// ego, aligned with `vehicle_ids`. `time` is the simulation clock in
    /// seconds.
    pub fn tick(
        &mut self,
        time: f64,
        vehicle_ids: &[ActorId],
        snapshot: &WorldSnapshot,
        track: &impl TrackTraffic,
        tl_frame: &[bool],
    ) -> Result<(CollisionFrame, ControlFrame)> {
        let collision_frame = collision_stage(
            vehicle_ids,
            snapshot,
            track,
            &self.parameters,
            &mut self.collision_locks,
            &mut self.rng,
        );
        let control_frame = motion_stage(
            vehicle_ids,
            snapshot,
            &self.parameters,
            &self.pid_config,
            &collision_frame,
            tl_frame,
            &mut self.pid_states,
            &mut self.teleport_instants,
            time,
        )?;
        Ok((collision_frame, control_frame))
    }
}
