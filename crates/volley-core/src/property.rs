//! Property vectors and their aggregation.
//!
//! An actor's attack and defense are the sum of three sources:
//!
//! - its equipped item tree (every node contributes its item's vectors),
//! - its level curve, `(base + per_level * level)`, optionally rolled by a
//!   relative variance,
//! - its active buffs (additive first, then overrides in list order).
//!
//! [`mitigate`] and [`split_damage`] turn an attack/defense pair into the
//! health and torpidity loss of one hit.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::config::PropertyLayout;
use crate::definition::Definitions;
use crate::time::Time;

// =============================================================================
// PropertyVector
// =============================================================================

/// Fixed-length per-channel values.
///
/// Channels past the end read as zero, so empty vectors act as all-zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PropertyVector(Vec<f32>);

impl PropertyVector {
    /// All-zero vector with `count` channels.
    #[must_use]
    pub fn zeros(count: usize) -> Self {
        Self(vec![0.0; count])
    }

    /// Wrap raw values.
    #[must_use]
    pub fn from_values(values: Vec<f32>) -> Self {
        Self(values)
    }

    /// Channel value, zero past the end.
    #[must_use]
    pub fn get(&self, channel: usize) -> f32 {
        self.0.get(channel).copied().unwrap_or(0.0)
    }

    /// Channel count.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether there are no channels.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Raw values.
    #[must_use]
    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    /// Add `values` channel-wise, growing if needed.
    pub fn add_slice(&mut self, values: &[f32]) {
        if self.0.len() < values.len() {
            self.0.resize(values.len(), 0.0);
        }
        for (dst, src) in self.0.iter_mut().zip(values) {
            *dst += src;
        }
    }

    fn set(&mut self, channel: usize, value: f32) {
        if self.0.len() <= channel {
            self.0.resize(channel + 1, 0.0);
        }
        self.0[channel] = value;
    }
}

impl From<Vec<f32>> for PropertyVector {
    fn from(values: Vec<f32>) -> Self {
        Self(values)
    }
}

// =============================================================================
// Items and buffs
// =============================================================================

/// A node in an equipped item tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemInstance {
    /// Item definition index
    pub item: usize,
    /// Socketed or attached items
    #[serde(default)]
    pub children: Vec<ItemInstance>,
}

impl ItemInstance {
    /// A leaf item.
    #[must_use]
    pub fn new(item: usize) -> Self {
        Self {
            item,
            children: Vec::new(),
        }
    }

    /// Attach a child item.
    #[must_use]
    pub fn with_child(mut self, child: ItemInstance) -> Self {
        self.children.push(child);
        self
    }
}

/// Which side of the aggregate a buff touches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuffTarget {
    /// Attack vector
    Attack,
    /// Defense vector
    Defense,
}

/// How a buff combines with the channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuffOp {
    /// Added to the channel
    Add,
    /// Replaces the channel
    Override,
}

/// A timed modifier on one property channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Buff {
    /// Attack or defense
    pub target: BuffTarget,
    /// Channel index
    pub channel: usize,
    /// Combination rule
    pub op: BuffOp,
    /// Amount
    pub value: f32,
    /// Expiry; the buff is inactive from this time on
    pub until: Time,
}

impl Buff {
    /// Whether the buff applies at `now`.
    #[must_use]
    pub fn is_active(&self, now: Time) -> bool {
        now < self.until
    }
}

// =============================================================================
// Aggregation
// =============================================================================

/// Attack and defense of one actor at one moment.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Aggregate {
    /// Attack vector
    pub attack: PropertyVector,
    /// Defense vector
    pub defense: PropertyVector,
}

/// What the aggregator needs to know about an actor.
#[derive(Debug, Clone, Copy)]
pub struct PropertySource<'a> {
    /// Level curve index
    pub level_table: Option<usize>,
    /// Current level
    pub level: u32,
    /// Equipped item trees
    pub items: &'a [ItemInstance],
    /// Active and expired buffs
    pub buffs: &'a [Buff],
}

/// Sums item, level and buff contributions.
#[derive(Debug, Clone, Copy)]
pub struct Aggregator<'a> {
    definitions: &'a Definitions,
    layout: PropertyLayout,
}

impl<'a> Aggregator<'a> {
    /// Create an aggregator over the given tables.
    #[must_use]
    pub fn new(definitions: &'a Definitions, layout: PropertyLayout) -> Self {
        Self { definitions, layout }
    }

    /// Aggregate an actor at `now`.
    ///
    /// `rng` is drawn from only when the level curve has a positive variance.
    pub fn aggregate<R: Rng>(&self, source: &PropertySource<'_>, now: Time, rng: &mut R) -> Aggregate {
        let mut out = Aggregate {
            attack: PropertyVector::zeros(self.layout.count),
            defense: PropertyVector::zeros(self.layout.count),
        };

        for item in source.items {
            self.add_item(item, &mut out);
        }

        if let Some(index) = source.level_table {
            match self.definitions.levels.get(index) {
                Some(level) => {
                    #[allow(clippy::cast_precision_loss)]
                    let lv = source.level as f32;
                    let mut roll = |base: &[f32], per_level: &[f32], dst: &mut PropertyVector| {
                        for channel in 0..self.layout.count {
                            let b = base.get(channel).copied().unwrap_or(0.0);
                            let p = per_level.get(channel).copied().unwrap_or(0.0);
                            let mut value = b + p * lv;
                            if level.variance > 0.0 {
                                value *= 1.0 + level.variance * (2.0 * rng.gen::<f32>() - 1.0);
                            }
                            let current = dst.get(channel);
                            dst.set(channel, current + value);
                        }
                    };
                    roll(&level.attack_base, &level.attack_per_level, &mut out.attack);
                    roll(&level.defense_base, &level.defense_per_level, &mut out.defense);
                }
                None => tracing::warn!(level_table = index, "unknown level table, skipped"),
            }
        }

        let active: Vec<&Buff> = source.buffs.iter().filter(|b| b.is_active(now)).collect();
        for buff in active.iter().filter(|b| b.op == BuffOp::Add) {
            let dst = match buff.target {
                BuffTarget::Attack => &mut out.attack,
                BuffTarget::Defense => &mut out.defense,
            };
            let current = dst.get(buff.channel);
            dst.set(buff.channel, current + buff.value);
        }
        for buff in active.iter().filter(|b| b.op == BuffOp::Override) {
            let dst = match buff.target {
                BuffTarget::Attack => &mut out.attack,
                BuffTarget::Defense => &mut out.defense,
            };
            dst.set(buff.channel, buff.value);
        }

        out
    }

    fn add_item(&self, item: &ItemInstance, out: &mut Aggregate) {
        match self.definitions.items.get(item.item) {
            Some(def) => {
                out.attack.add_slice(&def.attack);
                out.defense.add_slice(&def.defense);
            }
            None => tracing::warn!(item = item.item, "unknown item, skipped"),
        }
        for child in &item.children {
            self.add_item(child, out);
        }
    }
}

// =============================================================================
// Damage math
// =============================================================================

/// Damage of one channel after defense.
///
/// Negative defense is a weakness: positive attack passes through amplified.
///
/// ```
/// use volley_core::property::mitigate;
///
/// assert_eq!(mitigate(10.0, 4.0), 6.0);
/// assert_eq!(mitigate(3.0, 4.0), 0.0);
/// assert_eq!(mitigate(10.0, -2.0), 12.0);
/// assert_eq!(mitigate(-1.0, -2.0), 0.0);
/// ```
#[must_use]
pub fn mitigate(attack: f32, defense: f32) -> f32 {
    if defense < 0.0 {
        if attack > 0.0 {
            attack - defense
        } else {
            0.0
        }
    } else {
        attack.max(defense) - defense
    }
}

/// Health and torpidity loss of one hit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DamageSplit {
    /// Sum of damage channels
    pub hit: f32,
    /// Sum of torpidity channels
    pub torpor: f32,
}

/// Mitigate every channel and sum into `hit` and `torpor`, times `count`.
#[must_use]
pub fn split_damage(
    attack: &PropertyVector,
    defense: &PropertyVector,
    layout: PropertyLayout,
    count: u32,
) -> DamageSplit {
    let mut split = DamageSplit::default();
    for channel in 0..layout.count {
        let value = mitigate(attack.get(channel), defense.get(channel));
        if channel < layout.hit_count {
            split.hit += value;
        } else {
            split.torpor += value;
        }
    }
    #[allow(clippy::cast_precision_loss)]
    let count = count as f32;
    split.hit *= count;
    split.torpor *= count;
    split
}
