//! Static definition tables.
//!
//! Definitions are authored data loaded once and shared read-only by every
//! worker. Everything refers to everything else by index into these flat
//! tables: an action names its collider and spawn table by index, a slot
//! names its action by index, an item instance names its item by index.
//!
//! # Example
//!
//! ```
//! use volley_core::config::PropertyLayout;
//! use volley_core::definition::Definitions;
//!
//! let json = r#"{
//!     "version": 3,
//!     "actions": [
//!         { "name": "jab", "collider": 0, "info": { "duration": 0.2, "destroy_time": 0.3, "value": 5.0 } }
//!     ],
//!     "colliders": [ { "shape": { "type": "sphere", "radius": 0.5 } } ]
//! }"#;
//!
//! let defs = Definitions::from_json(json, PropertyLayout::default()).unwrap();
//! assert_eq!(defs.version, 3);
//! assert_eq!(defs.action(0).unwrap().name, "jab");
//! ```

use bitflags::bitflags;
use glam::Vec3;
use serde::{Deserialize, Serialize};
use sweep::Shape;

use crate::config::{PropertyLayout, ACTOR_LAYER, OBSTACLE_LAYER};
use crate::error::DefinitionError;
use crate::spawner::{SpawnKind, SpawnTable};
use crate::time::Time;

// =============================================================================
// Flags and masks
// =============================================================================

bitflags! {
    /// Behavior switches of an action definition.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct ActionFlags: u32 {
        /// Keep only the closest hit and destroy the action on it.
        const DESTROY_ON_HIT = 1 << 0;
        /// Strip the gravity-axis component from directions.
        const MOVE_IN_AIR = 1 << 1;
        /// Integrate gravity into the action velocity.
        const USE_GRAVITY = 1 << 2;
        /// Owner ignores impacts during the actor-move window.
        const ACTOR_UNSTOPPABLE = 1 << 3;
        /// Owner is relocated by a swept cast during the actor-move window.
        const ACTOR_LOCATION = 1 << 4;
        /// Destination tracking snaps to the target's collider surface.
        const SNAP_TO_SURFACE = 1 << 5;
        /// Damage may pick up pickable targets.
        const PICK = 1 << 6;
    }
}

bitflags! {
    /// Relationship classes a hit predicate accepts.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct TargetMask: u32 {
        /// The owner itself
        const SELF = 1 << 0;
        /// Same camp
        const ALLY = 1 << 1;
        /// Different camp
        const ENEMY = 1 << 2;
        /// Camp 0 actors and obstacles
        const NEUTRAL = 1 << 3;
    }
}

bitflags! {
    /// Actor statuses an action tolerates on its owner.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct ActorStatusMask: u32 {
        /// Normal
        const NORMAL = 1 << 0;
        /// Knocked back
        const KNOCKBACK = 1 << 1;
        /// Stunned
        const STUNNED = 1 << 2;
        /// Dead
        const DEAD = 1 << 3;
    }
}

/// How an action's transform follows other entities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackingMode {
    /// Free flight along the integrated velocity.
    #[default]
    None,
    /// Follow the owner plus a local offset.
    Source,
    /// Home toward the live target.
    Destination,
    /// Blend of `Source` and `Destination`.
    All,
}

/// How the command layer resolves the launch direction.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "model", rename_all = "snake_case")]
pub enum AimModel {
    /// Straight at the aim point (hitscan, melee).
    #[default]
    Direct,
    /// Lead a constant-velocity target.
    Linear {
        /// Projectile speed
        speed: f32,
    },
    /// Ballistic solve under gravity, with lead.
    Parabola {
        /// Launch speed
        speed: f32,
    },
}

// =============================================================================
// Action definition
// =============================================================================

/// Timing and magnitude block copied into every action instance.
///
/// All times are relative to the action's creation time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ActionInfo {
    /// Start of the damage window
    pub damage_time: Time,
    /// Length of the damage window
    pub duration: Time,
    /// Lifetime; the action expires at `time + destroy_time`
    pub destroy_time: Time,
    /// When the action counts as performed
    pub perform_time: Time,
    /// Start of the owner-move window
    pub actor_move_start_time: Time,
    /// Length of the owner-move window
    pub actor_move_duration: Time,
    /// Reach: tracking clamp and default aim distance
    pub distance: f32,
    /// Radius of the splash query around the impact point
    pub splash_distance: f32,
    /// Uniform collider scale
    pub scale: f32,
    /// Repeat-hit interval; zero or less hits each target once
    pub interval: Time,
    /// Ledger value added per counted hit
    pub value: f32,
    /// Knockback impulse applied to targets with mass
    pub impact_force: f32,
}

impl Default for ActionInfo {
    fn default() -> Self {
        Self {
            damage_time: Time::ZERO,
            duration: Time::ZERO,
            destroy_time: Time::ZERO,
            perform_time: Time::ZERO,
            actor_move_start_time: Time::ZERO,
            actor_move_duration: Time::ZERO,
            distance: 0.0,
            splash_distance: 0.0,
            scale: 1.0,
            interval: Time::ZERO,
            value: 0.0,
            impact_force: 0.0,
        }
    }
}

impl ActionInfo {
    /// End of the damage window.
    #[must_use]
    pub fn damage_end(&self) -> Time {
        self.damage_time + self.duration
    }

    /// Copy scaled by an actor's range and distance multipliers.
    #[must_use]
    pub fn scaled(&self, range_scale: f32, distance_scale: f32) -> Self {
        Self {
            distance: self.distance * distance_scale,
            splash_distance: self.splash_distance * range_scale,
            scale: self.scale * range_scale,
            ..*self
        }
    }
}

/// One kind of action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ActionDefinition {
    /// Display name
    pub name: String,
    /// Behavior flags
    pub flags: ActionFlags,
    /// Tracking policy
    pub tracking: TrackingMode,
    /// Timing block
    pub info: ActionInfo,
    /// Flight speed along the direction
    pub move_speed: f32,
    /// Spawn/follow offset in the owner's local space
    pub offset: Vec3,
    /// Collider index
    pub collider: Option<usize>,
    /// Relationships that count as a hit (and stop a destroy-on-hit action)
    pub hit_type: TargetMask,
    /// Relationships that take damage
    pub damage_type: TargetMask,
    /// Collision layers the action queries
    pub damage_mask: u32,
    /// Owner statuses the action survives; empty means any
    pub actor_status_mask: ActorStatusMask,
    /// Base attack vector
    pub attack: Vec<f32>,
    /// Spawn table index
    pub spawn_table: Option<usize>,
    /// Horizontal aim limit from facing (radians); zero means unlimited
    pub max_yaw: f32,
    /// Vertical aim limit (radians); zero means unlimited
    pub max_pitch: f32,
    /// Aim model
    pub aim: AimModel,
    /// Class bit of this action
    pub action_class: u32,
    /// Classes that may start while this action keeps the owner busy
    pub action_mask: u32,
    /// How long the owner is busy after firing
    pub busy_time: Time,
    /// Slot cooldown after firing
    pub cooldown: Time,
    /// Rage spent on firing
    pub rage_cost: f32,
}

impl Default for ActionDefinition {
    fn default() -> Self {
        Self {
            name: String::new(),
            flags: ActionFlags::empty(),
            tracking: TrackingMode::None,
            info: ActionInfo::default(),
            move_speed: 0.0,
            offset: Vec3::ZERO,
            collider: None,
            hit_type: TargetMask::ENEMY | TargetMask::NEUTRAL,
            damage_type: TargetMask::ENEMY,
            damage_mask: ACTOR_LAYER | OBSTACLE_LAYER,
            actor_status_mask: ActorStatusMask::empty(),
            attack: Vec::new(),
            spawn_table: None,
            max_yaw: 0.0,
            max_pitch: 0.0,
            aim: AimModel::Direct,
            action_class: 1,
            action_mask: 0,
            busy_time: Time::ZERO,
            cooldown: Time::ZERO,
            rage_cost: 0.0,
        }
    }
}

// =============================================================================
// Other tables
// =============================================================================

/// A collider shape referenced by actions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ColliderDefinition {
    /// Local-space shape
    pub shape: Shape,
}

/// An equippable item's property contribution.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ItemDefinition {
    /// Display name
    pub name: String,
    /// Attack contribution
    pub attack: Vec<f32>,
    /// Defense contribution
    pub defense: Vec<f32>,
}

/// Level curve: `(base + per_level * level) * (1 ± variance)`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LevelDefinition {
    /// Attack at level zero
    pub attack_base: Vec<f32>,
    /// Attack gained per level
    pub attack_per_level: Vec<f32>,
    /// Defense at level zero
    pub defense_base: Vec<f32>,
    /// Defense gained per level
    pub defense_per_level: Vec<f32>,
    /// Relative random spread of each rolled channel
    pub variance: f32,
}

/// Piecewise-linear curve, clamped at both ends. An empty curve is `1.0`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Curve {
    /// `(x, y)` samples sorted by `x`
    pub points: Vec<(f32, f32)>,
}

impl Curve {
    /// Create a curve from samples.
    #[must_use]
    pub fn new(points: Vec<(f32, f32)>) -> Self {
        Self { points }
    }

    /// Evaluate at `x`.
    #[must_use]
    pub fn sample(&self, x: f32) -> f32 {
        let Some(&(x0, y0)) = self.points.first() else {
            return 1.0;
        };
        if x <= x0 {
            return y0;
        }
        for pair in self.points.windows(2) {
            let (xa, ya) = pair[0];
            let (xb, yb) = pair[1];
            if x <= xb {
                let span = xb - xa;
                if span <= f32::MIN_POSITIVE {
                    return yb;
                }
                return ya + (yb - ya) * (x - xa) / span;
            }
        }
        self.points.last().map_or(1.0, |&(_, y)| y)
    }

    fn is_sorted(&self) -> bool {
        self.points.windows(2).all(|p| p[0].0 <= p[1].0)
    }
}

/// Curves driving the pick-up chance.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PickCurves {
    /// Chance factor by remaining health fraction
    pub health: Curve,
    /// Chance factor by torpidity fraction
    pub torpidity: Curve,
    /// Chance factor by the target's animal value
    pub animal: Curve,
}

// =============================================================================
// Definitions
// =============================================================================

/// All static tables, indexed by integer id.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Definitions {
    /// Blob version, for cache invalidation by the host
    pub version: u32,
    /// Action definitions
    pub actions: Vec<ActionDefinition>,
    /// Collider shapes
    pub colliders: Vec<ColliderDefinition>,
    /// Items
    pub items: Vec<ItemDefinition>,
    /// Level curves
    pub levels: Vec<LevelDefinition>,
    /// Spawn tables
    pub spawn_tables: Vec<SpawnTable>,
    /// Pick-up chance curves
    pub pick_curves: PickCurves,
}

impl Definitions {
    /// Parse and validate definitions.
    ///
    /// # Errors
    ///
    /// Returns [`DefinitionError`] for malformed JSON or broken references.
    pub fn from_json(json: &str, layout: PropertyLayout) -> Result<Self, DefinitionError> {
        let defs: Self = serde_json::from_str(json)?;
        defs.validate(layout)?;
        tracing::info!(
            version = defs.version,
            actions = defs.actions.len(),
            colliders = defs.colliders.len(),
            items = defs.items.len(),
            spawn_tables = defs.spawn_tables.len(),
            "definitions loaded"
        );
        Ok(defs)
    }

    /// Check cross-references, vector lengths, times and shapes.
    ///
    /// Empty property vectors are allowed and read as all zeros.
    ///
    /// # Errors
    ///
    /// Returns the first [`DefinitionError`] found.
    pub fn validate(&self, layout: PropertyLayout) -> Result<(), DefinitionError> {
        let check_len = |what: String, v: &[f32]| {
            if v.is_empty() || v.len() == layout.count {
                Ok(())
            } else {
                Err(DefinitionError::PropertyLength {
                    what,
                    expected: layout.count,
                    found: v.len(),
                })
            }
        };

        for (index, action) in self.actions.iter().enumerate() {
            if let Some(collider) = action.collider {
                if collider >= self.colliders.len() {
                    return Err(DefinitionError::MissingCollider { action: index, collider });
                }
            }
            if let Some(table) = action.spawn_table {
                if table >= self.spawn_tables.len() {
                    return Err(DefinitionError::MissingSpawnTable { action: index, table });
                }
            }
            check_len(format!("action {index} attack"), &action.attack)?;

            let info = &action.info;
            for (field, value) in [
                ("damage_time", info.damage_time),
                ("duration", info.duration),
                ("destroy_time", info.destroy_time),
                ("perform_time", info.perform_time),
                ("actor_move_start_time", info.actor_move_start_time),
                ("actor_move_duration", info.actor_move_duration),
                ("busy_time", action.busy_time),
                ("cooldown", action.cooldown),
            ] {
                if value < Time::ZERO {
                    return Err(DefinitionError::NegativeTime { action: index, field, value });
                }
            }
        }

        for (index, collider) in self.colliders.iter().enumerate() {
            collider
                .shape
                .validate()
                .map_err(|source| DefinitionError::InvalidCollider { collider: index, source })?;
        }

        for (index, item) in self.items.iter().enumerate() {
            check_len(format!("item {index} attack"), &item.attack)?;
            check_len(format!("item {index} defense"), &item.defense)?;
        }

        for (index, level) in self.levels.iter().enumerate() {
            check_len(format!("level {index} attack_base"), &level.attack_base)?;
            check_len(format!("level {index} attack_per_level"), &level.attack_per_level)?;
            check_len(format!("level {index} defense_base"), &level.defense_base)?;
            check_len(format!("level {index} defense_per_level"), &level.defense_per_level)?;
        }

        for (index, table) in self.spawn_tables.iter().enumerate() {
            for entry in &table.entries {
                if let SpawnKind::Action { action } = entry.kind {
                    if action >= self.actions.len() {
                        return Err(DefinitionError::MissingSpawnAction { table: index, action });
                    }
                }
            }
        }

        for (name, curve) in [
            ("health", &self.pick_curves.health),
            ("torpidity", &self.pick_curves.torpidity),
            ("animal", &self.pick_curves.animal),
        ] {
            if !curve.is_sorted() {
                return Err(DefinitionError::UnsortedCurve { name });
            }
        }

        Ok(())
    }

    /// Action definition by index.
    #[must_use]
    pub fn action(&self, index: usize) -> Option<&ActionDefinition> {
        self.actions.get(index)
    }

    /// Collider shape by index.
    #[must_use]
    pub fn collider(&self, index: usize) -> Option<&Shape> {
        self.colliders.get(index).map(|c| &c.shape)
    }

    /// Spawn table by index.
    #[must_use]
    pub fn spawn_table(&self, index: usize) -> Option<&SpawnTable> {
        self.spawn_tables.get(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layout() -> PropertyLayout {
        PropertyLayout::new(2, 1)
    }

    #[test]
    fn defaults_parse_from_empty_object() {
        let defs = Definitions::from_json("{}", layout()).unwrap();
        assert!(defs.actions.is_empty());
    }

    #[test]
    fn flags_and_times_parse() {
        let json = r#"{
            "actions": [{
                "flags": "DESTROY_ON_HIT | USE_GRAVITY",
                "tracking": "destination",
                "aim": { "model": "parabola", "speed": 20.0 },
                "info": { "damage_time": 0.1, "interval": 0.2 }
            }]
        }"#;
        let defs = Definitions::from_json(json, layout()).unwrap();
        let action = defs.action(0).unwrap();
        assert!(action.flags.contains(ActionFlags::DESTROY_ON_HIT | ActionFlags::USE_GRAVITY));
        assert_eq!(action.tracking, TrackingMode::Destination);
        assert_eq!(action.aim, AimModel::Parabola { speed: 20.0 });
        assert_eq!(action.info.damage_time, Time::from_millis(100));
        assert_eq!(action.info.interval, Time::from_millis(200));
    }

    #[test]
    fn rejects_missing_collider() {
        let defs = Definitions {
            actions: vec![ActionDefinition {
                collider: Some(3),
                ..ActionDefinition::default()
            }],
            ..Definitions::default()
        };
        assert!(matches!(
            defs.validate(layout()),
            Err(DefinitionError::MissingCollider { action: 0, collider: 3 })
        ));
    }

    #[test]
    fn rejects_wrong_property_length() {
        let defs = Definitions {
            items: vec![ItemDefinition {
                attack: vec![1.0, 2.0, 3.0],
                ..ItemDefinition::default()
            }],
            ..Definitions::default()
        };
        assert!(matches!(
            defs.validate(layout()),
            Err(DefinitionError::PropertyLength { expected: 2, found: 3, .. })
        ));
    }

    #[test]
    fn rejects_negative_time() {
        let mut action = ActionDefinition::default();
        action.info.duration = Time::from_millis(-5);
        let defs = Definitions {
            actions: vec![action],
            ..Definitions::default()
        };
        assert!(matches!(
            defs.validate(layout()),
            Err(DefinitionError::NegativeTime { field: "duration", .. })
        ));
    }

    #[test]
    fn rejects_invalid_collider_shape() {
        let defs = Definitions {
            colliders: vec![ColliderDefinition {
                shape: Shape::sphere(-1.0),
            }],
            ..Definitions::default()
        };
        assert!(matches!(
            defs.validate(layout()),
            Err(DefinitionError::InvalidCollider { collider: 0, .. })
        ));
    }

    #[test]
    fn curve_sampling() {
        let curve = Curve::new(vec![(0.0, 1.0), (1.0, 0.0)]);
        assert!((curve.sample(-1.0) - 1.0).abs() < 1e-6);
        assert!((curve.sample(0.25) - 0.75).abs() < 1e-6);
        assert!(curve.sample(2.0).abs() < 1e-6);
        assert!((Curve::default().sample(0.3) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn rejects_unsorted_curve() {
        let defs = Definitions {
            pick_curves: PickCurves {
                health: Curve::new(vec![(1.0, 0.0), (0.0, 1.0)]),
                ..PickCurves::default()
            },
            ..Definitions::default()
        };
        assert!(matches!(
            defs.validate(layout()),
            Err(DefinitionError::UnsortedCurve { name: "health" })
        ));
    }

    #[test]
    fn info_scaling() {
        let info = ActionInfo {
            distance: 10.0,
            splash_distance: 2.0,
            ..ActionInfo::default()
        };
        let scaled = info.scaled(1.5, 2.0);
        assert!((scaled.distance - 20.0).abs() < 1e-6);
        assert!((scaled.splash_distance - 3.0).abs() < 1e-6);
        assert!((scaled.scale - 1.5).abs() < 1e-6);
    }
}
