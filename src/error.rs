//! Error types for the motion-planning phase.
//!
//! Collision avoidance silently skips egos with incomplete snapshots; motion
//! planning treats the same situation as a caller bug and reports it.

use crate::ActorId;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PilotError {
    /// A scheduled ego is missing from one of the per-tick snapshot maps.
    #[error("actor {actor_id} is scheduled but missing from the {map} map")]
    MissingActor {
        actor_id: ActorId,
        map: &'static str,
    },

    /// A scheduled ego has an empty waypoint buffer.
    #[error("actor {actor_id} has an empty waypoint buffer")]
    EmptyBuffer { actor_id: ActorId },

    /// A hazard frame does not line up with the scheduled ego list.
    #[error("{frame} frame holds {frame_len} entries for {expected} scheduled egos")]
    FrameMismatch {
        frame: &'static str,
        frame_len: usize,
        expected: usize,
    },
}

pub type Result<T> = std::result::Result<T, PilotError>;
