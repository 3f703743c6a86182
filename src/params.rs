//! Runtime-tunable behaviour parameters.

use crate::constants::DEFAULT_LEAD_DISTANCE;
use crate::ActorId;
use rand::Rng;
use rand_distr::{Distribution, Normal};
use std::collections::{HashMap, HashSet};

/// Per-vehicle behaviour overrides with global defaults.
///
/// Owned by the enclosing pipeline; both decision phases only read it.
#[derive(Clone, Debug, Default)]
pub struct Parameters {
    lead_distances: HashMap<ActorId, f64>,
    ignore_vehicles_pct: HashMap<ActorId, f64>,
    ignore_walkers_pct: HashMap<ActorId, f64>,
    speed_diff_pct: HashMap<ActorId, f64>,
    global_speed_diff_pct: f64,
    detection_off: HashSet<(ActorId, ActorId)>,
    synchronous_mode: bool,
}

impl Parameters {
    pub fn new() -> Self {
        Default::default()
    }

    /// Sets the minimum distance a vehicle keeps to its leading vehicle.
    pub fn set_distance_to_leading_vehicle(&mut self, actor_id: ActorId, distance: f64) {
        self.lead_distances.insert(actor_id, distance);
    }

    /// Sets the probability (in percent) that a vehicle ignores a detected
    /// vehicle hazard.
    pub fn set_percentage_ignore_vehicles(&mut self, actor_id: ActorId, percentage: f64) {
        self.ignore_vehicles_pct.insert(actor_id, percentage);
    }

    /// Sets the probability (in percent) that a vehicle ignores a detected
    /// pedestrian hazard.
    pub fn set_percentage_ignore_walkers(&mut self, actor_id: ActorId, percentage: f64) {
        self.ignore_walkers_pct.insert(actor_id, percentage);
    }

    /// Sets a vehicle's deviation from its speed limit in percent.
    /// Positive values slow the vehicle down, negative values let it exceed
    /// the limit.
    pub fn set_percentage_speed_difference(&mut self, actor_id: ActorId, percentage: f64) {
        self.speed_diff_pct.insert(actor_id, percentage);
    }

    /// Sets the speed-limit deviation used for vehicles without an override.
    pub fn set_global_percentage_speed_difference(&mut self, percentage: f64) {
        self.global_speed_diff_pct = percentage;
    }

    /// Enables or disables collision detection for an ordered actor pair.
    pub fn set_collision_detection(&mut self, ego: ActorId, other: ActorId, enabled: bool) {
        if enabled {
            self.detection_off.remove(&(ego, other));
        } else {
            self.detection_off.insert((ego, other));
        }
    }

    pub fn set_synchronous_mode(&mut self, enabled: bool) {
        self.synchronous_mode = enabled;
    }

    pub fn distance_to_leading_vehicle(&self, actor_id: ActorId) -> f64 {
        self.lead_distances
            .get(&actor_id)
            .copied()
            .unwrap_or(DEFAULT_LEAD_DISTANCE)
    }

    pub fn collision_detection_enabled(&self, ego: ActorId, other: ActorId) -> bool {
        !self.detection_off.contains(&(ego, other))
    }

    pub fn percentage_ignore_vehicles(&self, actor_id: ActorId) -> f64 {
        self.ignore_vehicles_pct
            .get(&actor_id)
            .copied()
            .unwrap_or(0.0)
    }

    pub fn percentage_ignore_walkers(&self, actor_id: ActorId) -> f64 {
        self.ignore_walkers_pct
            .get(&actor_id)
            .copied()
            .unwrap_or(0.0)
    }

    /// Target velocity in km/h for a vehicle given its posted speed limit.
    pub fn vehicle_target_velocity(&self, actor_id: ActorId, speed_limit: f64) -> f64 {
        let difference = self
            .speed_diff_pct
            .get(&actor_id)
            .copied()
            .unwrap_or(self.global_speed_diff_pct);
        speed_limit * (1.0 - difference / 100.0)
    }

    pub fn synchronous_mode(&self) -> bool {
        self.synchronous_mode
    }

    /// Randomly assigns a speed-limit deviation to each vehicle, sampled from
    /// a normal distribution centred on the global value with the given
    /// standard deviation.
    pub fn randomise_speed_adjusts<R: Rng>(
        &mut self,
        actor_ids: &[ActorId],
        stddev: f64,
        rng: &mut R,
    ) {
        let distr =
            Normal::new(self.global_speed_diff_pct, stddev).expect("Invalid standard deviation");
        for actor_id in actor_ids {
            let percentage = distr.sample(rng).clamp(-25.0, 25.0);
            self.speed_diff_pct.insert(*actor_id, percentage);
        }
    }
}
