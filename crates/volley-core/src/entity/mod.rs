//! Entity types.
//!
//! - [`EntityId`]: unique identifier, also the collision body key
//! - [`EntityTag`]: selects which plugin bundle runs on an entity
//! - [`EntityInner`]: typed component storage per tag
//! - [`Entity`]: id, tag and components together
//!
//! # Example
//!
//! ```
//! use volley_core::entity::{ActorComponents, Entity, EntityId, EntityInner, EntityTag};
//!
//! let actor = Entity::new(
//!     EntityId::new(42),
//!     EntityTag::Actor,
//!     EntityInner::Actor(ActorComponents::default()),
//! );
//!
//! assert_eq!(actor.id().as_u64(), 42);
//! assert!(actor.as_actor().is_some());
//! assert!(actor.as_action().is_none());
//! ```

pub mod components;

use serde::{Deserialize, Serialize};
use std::fmt;

pub use components::{
    ActionComponents, ActionState, ActorCommand, ActorComponents, ActorStatus, ActorTime,
    BodyState, BreakState, CombatState, DelayEntry, LoadoutState, MotionState,
    ObstacleComponents, Pickable, SlotState, Transform,
};

/// Unique entity identifier.
///
/// Ids are allocated monotonically by the arena and never reused, so they
/// double as the collision world's body keys.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct EntityId(u64);

impl EntityId {
    /// Create an id from a raw value.
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Raw value.
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Debug for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EntityId({})", self.0)
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for EntityId {
    fn from(id: u64) -> Self {
        Self::new(id)
    }
}

impl From<EntityId> for u64 {
    fn from(id: EntityId) -> Self {
        id.0
    }
}

/// Entity classification for plugin bundle selection.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityTag {
    /// Combatant that issues commands and takes damage
    Actor,
    /// A live action instance (projectile, swing, area)
    Action,
    /// Static collision geometry
    Obstacle,
}

impl fmt::Display for EntityTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Actor => write!(f, "Actor"),
            Self::Action => write!(f, "Action"),
            Self::Obstacle => write!(f, "Obstacle"),
        }
    }
}

/// Component storage, one variant per tag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EntityInner {
    /// Actor components
    Actor(ActorComponents),
    /// Action components
    Action(ActionComponents),
    /// Obstacle components
    Obstacle(ObstacleComponents),
}

impl EntityInner {
    /// Tag matching this variant.
    #[must_use]
    pub const fn tag(&self) -> EntityTag {
        match self {
            Self::Actor(_) => EntityTag::Actor,
            Self::Action(_) => EntityTag::Action,
            Self::Obstacle(_) => EntityTag::Obstacle,
        }
    }

    /// Transform, present on every variant.
    #[must_use]
    pub const fn transform(&self) -> &Transform {
        match self {
            Self::Actor(c) => &c.transform,
            Self::Action(c) => &c.transform,
            Self::Obstacle(c) => &c.transform,
        }
    }
}

/// An entity in the arena.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    id: EntityId,
    tag: EntityTag,
    inner: EntityInner,
}

impl Entity {
    /// Create an entity.
    #[must_use]
    pub const fn new(id: EntityId, tag: EntityTag, inner: EntityInner) -> Self {
        Self { id, tag, inner }
    }

    /// Id.
    #[must_use]
    pub const fn id(&self) -> EntityId {
        self.id
    }

    /// Tag.
    #[must_use]
    pub const fn tag(&self) -> EntityTag {
        self.tag
    }

    /// Components.
    #[must_use]
    pub const fn inner(&self) -> &EntityInner {
        &self.inner
    }

    /// Mutable components.
    #[must_use]
    pub fn inner_mut(&mut self) -> &mut EntityInner {
        &mut self.inner
    }

    /// Actor components, if this is an actor.
    #[must_use]
    pub const fn as_actor(&self) -> Option<&ActorComponents> {
        match &self.inner {
            EntityInner::Actor(c) => Some(c),
            _ => None,
        }
    }

    /// Mutable actor components.
    #[must_use]
    pub fn as_actor_mut(&mut self) -> Option<&mut ActorComponents> {
        match &mut self.inner {
            EntityInner::Actor(c) => Some(c),
            _ => None,
        }
    }

    /// Action components, if this is an action.
    #[must_use]
    pub const fn as_action(&self) -> Option<&ActionComponents> {
        match &self.inner {
            EntityInner::Action(c) => Some(c),
            _ => None,
        }
    }

    /// Mutable action components.
    #[must_use]
    pub fn as_action_mut(&mut self) -> Option<&mut ActionComponents> {
        match &mut self.inner {
            EntityInner::Action(c) => Some(c),
            _ => None,
        }
    }

    /// Obstacle components, if this is an obstacle.
    #[must_use]
    pub const fn as_obstacle(&self) -> Option<&ObstacleComponents> {
        match &self.inner {
            EntityInner::Obstacle(c) => Some(c),
            _ => None,
        }
    }

    /// Whether this is an actor.
    #[must_use]
    pub const fn is_actor(&self) -> bool {
        matches!(self.tag, EntityTag::Actor)
    }

    /// Whether this is an action.
    #[must_use]
    pub const fn is_action(&self) -> bool {
        matches!(self.tag, EntityTag::Action)
    }
}
