//! The action advance engine.
//!
//! Every live action entity is advanced once per tick from the frozen
//! snapshot:
//!
//! - [`status`]: the lifecycle flags and their transition table
//! - [`ledger`]: the per-target hit record and interval gate
//! - [`motion`]: velocity integration and tracking
//! - [`collision`]: swept and overlap hit collection
//! - [`advance`](mod@advance): the per-tick state machine tying them together
//!
//! Advancing never mutates anything. It returns outputs that the resolvers
//! apply to the next buffer.

pub mod advance;
pub mod collision;
pub mod ledger;
pub mod motion;
pub mod status;

pub use advance::advance;
pub use collision::{CandidateHit, HitCollector};
pub use ledger::{HitLedger, LedgerEntry, LedgerHit};
pub use motion::look_rotation;
pub use status::ActionStatus;

use glam::Vec3;

/// Smallest magnitude treated as non-zero.
pub const EPSILON: f32 = f32::MIN_POSITIVE;

/// Remove the component of `v` along the unit `axis`.
#[must_use]
pub fn strip_axis(v: Vec3, axis: Vec3) -> Vec3 {
    v - axis * v.dot(axis)
}
