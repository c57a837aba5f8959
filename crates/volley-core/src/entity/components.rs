//! Component structs for each entity type.
//!
//! Each tag owns one concrete component struct; there is no dynamic
//! component lookup. Actors carry the richest state, actions carry a frozen
//! launch record plus their advancing runtime state, obstacles are just a
//! body in space.

use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};
use sweep::{CollisionFilter, Pose, Shape};

use crate::action::{ActionStatus, HitLedger};
use crate::config::{ACTOR_LAYER, OBSTACLE_LAYER};
use crate::definition::{ActionInfo, ActorStatusMask};
use crate::property::{Buff, ItemInstance, PropertySource, PropertyVector};
use crate::time::Time;

use super::EntityId;

// =============================================================================
// Shared
// =============================================================================

/// World placement.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    /// Position
    pub position: Vec3,
    /// Orientation; local +Z is forward
    pub rotation: Quat,
}

impl Transform {
    /// Create a transform.
    #[must_use]
    pub const fn new(position: Vec3, rotation: Quat) -> Self {
        Self { position, rotation }
    }

    /// Unrotated transform at `position`.
    #[must_use]
    pub const fn at_position(position: Vec3) -> Self {
        Self::new(position, Quat::IDENTITY)
    }

    /// Facing direction.
    #[must_use]
    pub fn forward(&self) -> Vec3 {
        self.rotation * Vec3::Z
    }

    /// Map a local offset into world space.
    #[must_use]
    pub fn transform_point(&self, local: Vec3) -> Vec3 {
        self.position + self.rotation * local
    }

    /// Collision pose.
    #[must_use]
    pub const fn pose(&self) -> Pose {
        Pose::new(self.position, self.rotation)
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::at_position(Vec3::ZERO)
    }
}

/// Collision body of an actor or obstacle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BodyState {
    /// Local-space shape
    pub shape: Shape,
    /// Collision layer bits
    pub layer: u32,
}

impl BodyState {
    /// Create a body.
    #[must_use]
    pub const fn new(shape: Shape, layer: u32) -> Self {
        Self { shape, layer }
    }

    /// Filter the body is registered with.
    #[must_use]
    pub const fn filter(&self) -> CollisionFilter {
        CollisionFilter::new(self.layer, u32::MAX)
    }
}

// =============================================================================
// Actor
// =============================================================================

/// Actor motion.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MotionState {
    /// Linear velocity
    pub velocity: Vec3,
    /// Inverse mass; zero ignores impacts
    pub inverse_mass: f32,
    /// Impacts are ignored before this time
    pub unstoppable_until: Time,
    /// Knockback ends at this time
    pub knockback_until: Time,
}

impl Default for MotionState {
    fn default() -> Self {
        Self {
            velocity: Vec3::ZERO,
            inverse_mass: 1.0,
            unstoppable_until: Time::ZERO,
            knockback_until: Time::ZERO,
        }
    }
}

/// Coarse actor condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ActorStatus {
    /// Free to act
    #[default]
    Normal,
    /// Being pushed by a break
    Knockback,
    /// Cannot act
    Stunned,
    /// Out of health
    Dead,
}

impl ActorStatus {
    /// The matching bit of an [`ActorStatusMask`].
    #[must_use]
    pub const fn mask(self) -> ActorStatusMask {
        match self {
            Self::Normal => ActorStatusMask::NORMAL,
            Self::Knockback => ActorStatusMask::KNOCKBACK,
            Self::Stunned => ActorStatusMask::STUNNED,
            Self::Dead => ActorStatusMask::DEAD,
        }
    }

    /// Whether the actor may start actions.
    #[must_use]
    pub const fn can_act(self) -> bool {
        matches!(self, Self::Normal)
    }
}

/// Break cycle: `Active → Breaking → Idle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum BreakState {
    /// An action chain is running
    Active,
    /// Knocked out of the chain, recovering
    Breaking,
    /// Nothing running
    #[default]
    Idle,
}

/// One row of the delay table.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DelayEntry {
    /// Smallest break magnitude this row answers
    pub min_hit: f32,
    /// Knockback speed
    pub speed: f32,
    /// Knockback duration
    pub duration: Time,
    /// Turn to face the hit
    #[serde(default)]
    pub turn: bool,
}

/// Pick-up eligibility.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pickable {
    /// Animal value fed to the pick curve
    pub value: f32,
}

/// Actor combat state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CombatState {
    /// Faction; 0 is neutral
    pub camp: u32,
    /// Condition
    pub status: ActorStatus,
    /// Break cycle
    pub break_state: BreakState,
    /// Monotonic version; bumped on every break
    pub version: u32,
    /// Further breaks are ignored before this time
    pub alert_time: Time,
    /// Health
    pub health: f32,
    /// Maximum health
    pub max_health: f32,
    /// Torpidity (knock-out pressure)
    pub torpidity: f32,
    /// Maximum torpidity
    pub max_torpidity: f32,
    /// Rage resource
    pub rage: f32,
    /// Maximum rage
    pub max_rage: f32,
    /// Ledger total that breaks this actor; zero disables
    pub break_threshold: f32,
    /// Break responses
    pub delay_table: Vec<DelayEntry>,
    /// Level
    pub level: u32,
    /// Level curve index
    pub level_table: Option<usize>,
    /// Equipped item trees
    pub items: Vec<ItemInstance>,
    /// Timed modifiers
    pub buffs: Vec<Buff>,
    /// Pick-up eligibility
    pub pickable: Option<Pickable>,
    /// Who picked this actor up
    pub picked_by: Option<EntityId>,
}

impl Default for CombatState {
    fn default() -> Self {
        Self {
            camp: 0,
            status: ActorStatus::Normal,
            break_state: BreakState::Idle,
            version: 0,
            alert_time: Time::ZERO,
            health: 100.0,
            max_health: 100.0,
            torpidity: 0.0,
            max_torpidity: 100.0,
            rage: 0.0,
            max_rage: 100.0,
            break_threshold: 0.0,
            delay_table: Vec::new(),
            level: 0,
            level_table: None,
            items: Vec::new(),
            buffs: Vec::new(),
            pickable: None,
            picked_by: None,
        }
    }
}

impl CombatState {
    /// Set camp.
    #[must_use]
    pub fn with_camp(mut self, camp: u32) -> Self {
        self.camp = camp;
        self
    }

    /// Set health and maximum health.
    #[must_use]
    pub fn with_health(mut self, health: f32) -> Self {
        self.health = health;
        self.max_health = health;
        self
    }

    /// Set rage.
    #[must_use]
    pub fn with_rage(mut self, rage: f32) -> Self {
        self.rage = rage;
        self
    }

    /// Set break threshold.
    #[must_use]
    pub fn with_break_threshold(mut self, threshold: f32) -> Self {
        self.break_threshold = threshold;
        self
    }

    /// Set delay table.
    #[must_use]
    pub fn with_delay_table(mut self, table: Vec<DelayEntry>) -> Self {
        self.delay_table = table;
        self
    }

    /// Set equipped items.
    #[must_use]
    pub fn with_items(mut self, items: Vec<ItemInstance>) -> Self {
        self.items = items;
        self
    }

    /// Set level curve and level.
    #[must_use]
    pub fn with_level(mut self, table: usize, level: u32) -> Self {
        self.level_table = Some(table);
        self.level = level;
        self
    }

    /// Make the actor pickable.
    #[must_use]
    pub fn with_pickable(mut self, value: f32) -> Self {
        self.pickable = Some(Pickable { value });
        self
    }

    /// Aggregation input for this actor.
    #[must_use]
    pub fn property_source(&self) -> PropertySource<'_> {
        PropertySource {
            level_table: self.level_table,
            level: self.level,
            items: &self.items,
            buffs: &self.buffs,
        }
    }

    /// Index of the delay row with the largest `min_hit <= hit`.
    #[must_use]
    pub fn delay_index(&self, hit: f32) -> Option<usize> {
        self.delay_table
            .iter()
            .enumerate()
            .filter(|(_, e)| e.min_hit <= hit)
            .max_by(|(ia, a), (ib, b)| a.min_hit.total_cmp(&b.min_hit).then(ib.cmp(ia)))
            .map(|(i, _)| i)
    }
}

/// Per-slot runtime state.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SlotState {
    /// Action definition fired by this slot
    pub action_index: usize,
    /// Slot is cooling down before this time
    pub cooldown_until: Time,
}

impl SlotState {
    /// A ready slot.
    #[must_use]
    pub const fn new(action_index: usize) -> Self {
        Self {
            action_index,
            cooldown_until: Time::ZERO,
        }
    }
}

/// Busy window of an actor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ActorTime {
    /// End of the busy window
    pub busy_until: Time,
    /// Action classes allowed during the busy window
    pub action_mask: u32,
}

/// A request to fire a slot, queued by the host.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ActorCommand {
    /// Slot to fire
    pub slot: usize,
    /// Actor version the command was issued against
    pub version: u32,
    /// Target entity, tracked live
    pub target: Option<EntityId>,
    /// Aim point when there is no target
    pub aim_point: Option<Vec3>,
}

impl ActorCommand {
    /// Fire `slot` at nothing in particular.
    #[must_use]
    pub const fn new(slot: usize, version: u32) -> Self {
        Self {
            slot,
            version,
            target: None,
            aim_point: None,
        }
    }

    /// Aim at an entity.
    #[must_use]
    pub const fn at_target(mut self, target: EntityId) -> Self {
        self.target = Some(target);
        self
    }

    /// Aim at a point.
    #[must_use]
    pub const fn at_point(mut self, point: Vec3) -> Self {
        self.aim_point = Some(point);
        self
    }
}

/// Slots, cooldowns and the pending command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoadoutState {
    /// Action slots
    pub slots: Vec<SlotState>,
    /// Busy window
    pub actor_time: ActorTime,
    /// Scales collider size and splash radius
    pub range_scale: f32,
    /// Scales reach
    pub distance_scale: f32,
    /// Command to evaluate next tick
    pub pending: Option<ActorCommand>,
}

impl Default for LoadoutState {
    fn default() -> Self {
        Self {
            slots: Vec::new(),
            actor_time: ActorTime::default(),
            range_scale: 1.0,
            distance_scale: 1.0,
            pending: None,
        }
    }
}

impl LoadoutState {
    /// Loadout firing the given action definitions, one per slot.
    #[must_use]
    pub fn with_actions(actions: &[usize]) -> Self {
        Self {
            slots: actions.iter().copied().map(SlotState::new).collect(),
            ..Self::default()
        }
    }
}

/// Components for actor entities.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActorComponents {
    /// Placement
    pub transform: Transform,
    /// Motion
    pub motion: MotionState,
    /// Combat state
    pub combat: CombatState,
    /// Slots and commands
    pub loadout: LoadoutState,
    /// Collision body
    pub body: BodyState,
}

impl Default for ActorComponents {
    fn default() -> Self {
        Self {
            transform: Transform::default(),
            motion: MotionState::default(),
            combat: CombatState::default(),
            loadout: LoadoutState::default(),
            body: BodyState::new(Shape::capsule(0.5, 0.4), ACTOR_LAYER),
        }
    }
}

impl ActorComponents {
    /// Default actor at `position`.
    #[must_use]
    pub fn at_position(position: Vec3) -> Self {
        Self {
            transform: Transform::at_position(position),
            ..Self::default()
        }
    }
}

// =============================================================================
// Obstacle
// =============================================================================

/// Components for obstacle entities.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObstacleComponents {
    /// Placement
    pub transform: Transform,
    /// Collision body
    pub body: BodyState,
}

impl Default for ObstacleComponents {
    fn default() -> Self {
        Self {
            transform: Transform::default(),
            body: BodyState::new(Shape::cuboid(Vec3::ONE), OBSTACLE_LAYER),
        }
    }
}

impl ObstacleComponents {
    /// Obstacle with `shape` at `position`.
    #[must_use]
    pub fn new(position: Vec3, shape: Shape) -> Self {
        Self {
            transform: Transform::at_position(position),
            body: BodyState::new(shape, OBSTACLE_LAYER),
        }
    }
}

// =============================================================================
// Action
// =============================================================================

/// Launch record of an action, frozen at creation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActionState {
    /// Owner version at creation
    pub version: u32,
    /// Definition index
    pub action_index: usize,
    /// Slot that fired it; `None` for spawned children
    pub slot: Option<usize>,
    /// Creation time
    pub time: Time,
    /// Owner
    pub owner: EntityId,
    /// Owner camp at creation
    pub camp: u32,
    /// Tracked target
    pub target: Option<EntityId>,
    /// Launch direction
    pub direction: Vec3,
    /// Spawn position
    pub position: Vec3,
    /// Aim point at creation
    pub target_position: Vec3,
    /// Collider index
    pub collider: Option<usize>,
    /// Timing block, scaled by the owner's multipliers
    pub info: ActionInfo,
    /// Owner attack aggregate at creation
    pub attack: PropertyVector,
}

impl ActionState {
    /// Expiry time.
    #[must_use]
    pub fn max_time(&self) -> Time {
        self.time + self.info.destroy_time
    }
}

/// Components for action entities.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActionComponents {
    /// Placement
    pub transform: Transform,
    /// Flight velocity
    pub velocity: Vec3,
    /// Launch record
    pub state: ActionState,
    /// Lifecycle flags
    pub status: ActionStatus,
    /// Action-clock time at the last advance
    pub elapsed: Time,
    /// Per-target hit record
    pub ledger: HitLedger,
}

impl ActionComponents {
    /// Fresh runtime state for a launch record.
    #[must_use]
    pub fn launch(state: ActionState, rotation: Quat, move_speed: f32) -> Self {
        Self {
            transform: Transform::new(state.position, rotation),
            velocity: state.direction * move_speed,
            state,
            status: ActionStatus::empty(),
            elapsed: Time::ZERO,
            ledger: HitLedger::default(),
        }
    }
}
