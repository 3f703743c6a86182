//! The fixed numeric contract of the decision core.
//!
//! Lengths are in metres, speeds in m/s and times in seconds unless noted.

/// Radius around an ego within which collision candidates are considered.
pub const MAX_COLLISION_RADIUS: f64 = 100.0;

/// Maximum height difference for two actors to be considered overlapping.
pub const VERTICAL_OVERLAP_THRESHOLD: f64 = 4.0;

/// Slope of the linear speed-to-corridor-length model.
pub const BOUNDARY_EXTENSION_RATE: f64 = 1.36;

/// Corridor length of a stationary vehicle.
pub const BOUNDARY_EXTENSION_MINIMUM: f64 = 2.0;

/// Padding added on top of the lead-vehicle distance when a lock pins the
/// corridor length.
pub const LOCKING_DISTANCE_PADDING: f64 = 4.0;

/// Maximum growth of a pinned corridor beyond its initial lock distance.
pub const MAX_LOCKING_EXTENSION: f64 = 10.0;

/// Cosine threshold for emitting a new corridor rib (10 degrees of heading
/// change).
pub const COS_10_DEGREES: f64 = 0.9848;

/// Forecast horizon applied to pedestrian bounding boxes.
pub const WALKER_TIME_EXTENSION: f64 = 1.5;

/// Diagonal factor for the conservative bounding-box length sum.
pub const SQUARE_ROOT_OF_TWO: f64 = 1.414;

/// Distance along the buffer used to detect an upcoming junction.
pub const JUNCTION_LOOK_AHEAD: f64 = 5.0;

/// Polygon distances below this count as touching; above it as clear.
pub const PROXIMITY_TOUCH_MARGIN: f64 = 0.1;

/// Zero-length direction vector guard.
pub const EPSILON_DIRECTION: f64 = 2.0 * f64::EPSILON;

/// Lead distance assumed for vehicles without a configured override.
pub const DEFAULT_LEAD_DISTANCE: f64 = 2.0;

/// Speed above which the highway PID gain set is selected.
pub const HIGHWAY_SPEED: f64 = 50.0 / 3.6;

/// Seconds of travel used to pick the steering target waypoint.
pub const TARGET_WAYPOINT_TIME_HORIZON: f64 = 1.0;

/// Minimum distance of the steering target waypoint.
pub const TARGET_WAYPOINT_HORIZON_LENGTH: f64 = 5.0;

/// Slope of the closing-speed-to-follow-distance law
/// (no closing speed keeps 5 m, 100 km/h of closing speed keeps 10 m).
pub const FOLLOW_DISTANCE_RATE: f64 = 0.18;

/// Follow distance maintained behind a lead vehicle at zero closing speed.
pub const MIN_FOLLOW_LEAD_DISTANCE: f64 = 5.0;

/// Relative speed used while closing the gap to a lead vehicle.
pub const RELATIVE_APPROACH_SPEED: f64 = 10.0 / 3.6;

/// Margin below which only an emergency stop is acceptable.
pub const CRITICAL_BRAKING_MARGIN: f64 = 0.25;

/// Relative speeds below this do not count as closing in.
pub const EPSILON_RELATIVE_SPEED: f64 = 0.001;

/// Fixed timestep of the teleportation cadence in hybrid mode.
pub const HYBRID_MODE_DT: f64 = 0.05;

/// Throttle saturation of the longitudinal controller.
pub const MAX_THROTTLE: f64 = 0.7;

/// Brake saturation of the longitudinal controller.
pub const MAX_BRAKE: f64 = 1.0;
