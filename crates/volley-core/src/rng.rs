//! Deterministic per-event random streams.
//!
//! Every random roll draws from a fresh `ChaCha8Rng` seeded from
//! `(seed, tick, entity, salt)`, so the outcome of a roll never depends on
//! how many other rolls happened first or on which thread ran it.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::entity::EntityId;

/// Salt for level-variance rolls on the attacking side.
pub const SALT_ATTACK: u64 = 0x0A77;
/// Salt for level-variance rolls on the defending side.
pub const SALT_DEFENSE: u64 = 0x0DEF;
/// Salt for pick-up rolls.
pub const SALT_PICK: u64 = 0x9_1C4;
/// Salt for spawn-table rolls.
pub const SALT_SPAWN: u64 = 0x5_9A3;

/// Random stream for one event.
#[must_use]
pub fn event_rng(seed: u64, tick: u64, entity: EntityId, salt: u64) -> ChaCha8Rng {
    let mut hasher = DefaultHasher::new();
    seed.hash(&mut hasher);
    tick.hash(&mut hasher);
    entity.hash(&mut hasher);
    salt.hash(&mut hasher);
    ChaCha8Rng::seed_from_u64(hasher.finish())
}
