//! Spawn tables.
//!
//! A spawn table lists what an action leaves behind at its trigger points:
//! child actions (a shockwave on impact, shrapnel on expiry) or visual
//! effects the presentation layer plays. Tables run in one of two modes:
//!
//! - [`SpawnMode::Chance`]: every entry matching the trigger rolls
//!   independently against its `chance`.
//! - [`SpawnMode::Weighted`]: exactly one matching entry is picked by weight.

use bitflags::bitflags;
use glam::{Quat, Vec3};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::entity::EntityId;

bitflags! {
    /// Points in an action's life that can spawn.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct SpawnTrigger: u32 {
        /// Damage window opened
        const INIT = 1 << 0;
        /// A target was hit
        const HIT = 1 << 1;
        /// A target took damage
        const DAMAGE = 1 << 2;
        /// The action was destroyed
        const DESTROY = 1 << 3;
    }
}

/// Entry selection mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpawnMode {
    /// Independent rolls per entry
    #[default]
    Chance,
    /// One entry by weight
    Weighted,
}

/// What an entry produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SpawnKind {
    /// A child action of the given definition
    Action {
        /// Action definition index
        action: usize,
    },
    /// A presentation effect id
    Effect {
        /// Effect id
        effect: u32,
    },
}

/// One row of a spawn table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpawnEntry {
    /// What to spawn
    pub kind: SpawnKind,
    /// When this entry is eligible
    pub triggers: SpawnTrigger,
    /// Probability in chance mode
    #[serde(default = "one")]
    pub chance: f32,
    /// Relative weight in weighted mode
    #[serde(default = "one")]
    pub weight: f32,
    /// Offset from the trigger position, in the action's local space
    #[serde(default)]
    pub offset: Vec3,
}

fn one() -> f32 {
    1.0
}

/// A spawn table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SpawnTable {
    /// Selection mode
    #[serde(default)]
    pub mode: SpawnMode,
    /// Entries
    #[serde(default)]
    pub entries: Vec<SpawnEntry>,
}

impl SpawnTable {
    /// Entries selected for `trigger`, in table order.
    pub fn select<R: Rng>(&self, trigger: SpawnTrigger, rng: &mut R) -> Vec<&SpawnEntry> {
        let eligible = self.entries.iter().filter(|e| e.triggers.intersects(trigger));
        match self.mode {
            SpawnMode::Chance => eligible.filter(|e| rng.gen::<f32>() < e.chance).collect(),
            SpawnMode::Weighted => {
                let eligible: Vec<_> = eligible.filter(|e| e.weight > 0.0).collect();
                let total: f32 = eligible.iter().map(|e| e.weight).sum();
                if total <= 0.0 {
                    return Vec::new();
                }
                let mut pick = rng.gen::<f32>() * total;
                for &entry in &eligible {
                    if pick < entry.weight {
                        return vec![entry];
                    }
                    pick -= entry.weight;
                }
                eligible.last().map(|e| vec![*e]).unwrap_or_default()
            }
        }
    }
}

/// A presentation effect the host should play.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpawnRequest {
    /// Effect id
    pub effect: u32,
    /// Trigger that produced it
    pub trigger: SpawnTrigger,
    /// Action whose table fired
    pub action: EntityId,
    /// World position
    pub position: Vec3,
    /// World rotation
    pub rotation: Quat,
    /// Tick it was produced on
    pub tick: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn entry(kind: SpawnKind, triggers: SpawnTrigger, chance: f32, weight: f32) -> SpawnEntry {
        SpawnEntry {
            kind,
            triggers,
            chance,
            weight,
            offset: Vec3::ZERO,
        }
    }

    #[test]
    fn chance_mode_filters_by_trigger() {
        let table = SpawnTable {
            mode: SpawnMode::Chance,
            entries: vec![
                entry(SpawnKind::Effect { effect: 1 }, SpawnTrigger::HIT, 1.0, 1.0),
                entry(SpawnKind::Effect { effect: 2 }, SpawnTrigger::INIT, 1.0, 1.0),
                entry(SpawnKind::Effect { effect: 3 }, SpawnTrigger::HIT, 0.0, 1.0),
            ],
        };
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let picked = table.select(SpawnTrigger::HIT, &mut rng);
        assert_eq!(picked.len(), 1);
        assert_eq!(picked[0].kind, SpawnKind::Effect { effect: 1 });
    }

    #[test]
    fn weighted_mode_picks_exactly_one() {
        let table = SpawnTable {
            mode: SpawnMode::Weighted,
            entries: vec![
                entry(SpawnKind::Action { action: 0 }, SpawnTrigger::DAMAGE, 1.0, 1.0),
                entry(SpawnKind::Action { action: 1 }, SpawnTrigger::DAMAGE, 1.0, 3.0),
            ],
        };
        let mut counts = [0_u32; 2];
        for seed in 0..400 {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let picked = table.select(SpawnTrigger::DAMAGE, &mut rng);
            assert_eq!(picked.len(), 1);
            if let SpawnKind::Action { action } = picked[0].kind {
                counts[action] += 1;
            }
        }
        assert!(counts[1] > counts[0] * 2, "counts {counts:?}");
    }

    #[test]
    fn weighted_mode_with_no_weight_spawns_nothing() {
        let table = SpawnTable {
            mode: SpawnMode::Weighted,
            entries: vec![entry(SpawnKind::Effect { effect: 1 }, SpawnTrigger::HIT, 1.0, 0.0)],
        };
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        assert!(table.select(SpawnTrigger::HIT, &mut rng).is_empty());
    }

    #[test]
    fn entries_parse_with_defaults() {
        let table: SpawnTable = serde_json::from_str(
            r#"{ "mode": "weighted", "entries": [ { "kind": { "type": "effect", "effect": 4 }, "triggers": "HIT | DESTROY" } ] }"#,
        )
        .unwrap();
        assert_eq!(table.entries[0].chance, 1.0);
        assert!(table.entries[0].triggers.contains(SpawnTrigger::DESTROY));
    }
}
