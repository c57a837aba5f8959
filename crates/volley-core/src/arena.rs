//! Entity storage.
//!
//! The arena holds every entity of one simulation buffer in a `BTreeMap`,
//! so iteration is always in id order. Ids are allocated monotonically and
//! never reused; the arena is cloned into the next buffer every tick, so two
//! buffers that started equal allocate identical ids.
//!
//! # Example
//!
//! ```
//! use glam::Vec3;
//! use volley_core::arena::Arena;
//! use volley_core::entity::{ActorComponents, EntityInner, EntityTag};
//!
//! let mut arena = Arena::new();
//! let id = arena.spawn(
//!     EntityTag::Actor,
//!     EntityInner::Actor(ActorComponents::at_position(Vec3::new(1.0, 0.0, 0.0))),
//! );
//!
//! assert_eq!(arena.actor(id).unwrap().transform.position.x, 1.0);
//! assert_eq!(arena.entity_count(), 1);
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::entity::{
    ActionComponents, ActorComponents, Entity, EntityId, EntityInner, EntityTag,
};

/// Deterministic entity container for one simulation buffer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Arena {
    next_id: u64,
    entities: BTreeMap<EntityId, Entity>,
    tick: u64,
}

impl Arena {
    /// Create an empty arena at tick 0.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an entity and return its id.
    pub fn spawn(&mut self, tag: EntityTag, inner: EntityInner) -> EntityId {
        debug_assert_eq!(tag, inner.tag(), "tag does not match components");
        let id = EntityId::new(self.next_id);
        self.next_id += 1;
        self.entities.insert(id, Entity::new(id, tag, inner));
        id
    }

    /// Remove an entity.
    pub fn despawn(&mut self, id: EntityId) -> Option<Entity> {
        self.entities.remove(&id)
    }

    /// Entity by id.
    #[must_use]
    pub fn get(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(&id)
    }

    /// Mutable entity by id.
    #[must_use]
    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.entities.get_mut(&id)
    }

    /// Actor components by id.
    #[must_use]
    pub fn actor(&self, id: EntityId) -> Option<&ActorComponents> {
        self.get(id)?.as_actor()
    }

    /// Mutable actor components by id.
    #[must_use]
    pub fn actor_mut(&mut self, id: EntityId) -> Option<&mut ActorComponents> {
        self.get_mut(id)?.as_actor_mut()
    }

    /// Action components by id.
    #[must_use]
    pub fn action(&self, id: EntityId) -> Option<&ActionComponents> {
        self.get(id)?.as_action()
    }

    /// Mutable action components by id.
    #[must_use]
    pub fn action_mut(&mut self, id: EntityId) -> Option<&mut ActionComponents> {
        self.get_mut(id)?.as_action_mut()
    }

    /// Ids in ascending order.
    pub fn entity_ids_sorted(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.entities.keys().copied()
    }

    /// Entities in id order.
    pub fn entities_sorted(&self) -> impl Iterator<Item = &Entity> + '_ {
        self.entities.values()
    }

    /// Mutable entities in id order.
    pub fn entities_sorted_mut(&mut self) -> impl Iterator<Item = &mut Entity> + '_ {
        self.entities.values_mut()
    }

    /// Actors in id order.
    pub fn actors_mut(&mut self) -> impl Iterator<Item = (EntityId, &mut ActorComponents)> + '_ {
        self.entities
            .iter_mut()
            .filter_map(|(id, e)| e.as_actor_mut().map(|a| (*id, a)))
    }

    /// Ids of actions owned by `owner`, in id order.
    #[must_use]
    pub fn actions_owned_by(&self, owner: EntityId) -> Vec<EntityId> {
        self.entities
            .values()
            .filter_map(|e| e.as_action().map(|a| (e.id(), a)))
            .filter(|(_, a)| a.state.owner == owner)
            .map(|(id, _)| id)
            .collect()
    }

    /// Number of entities.
    #[must_use]
    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    /// Number of entities with `tag`.
    #[must_use]
    pub fn count_tag(&self, tag: EntityTag) -> usize {
        self.entities.values().filter(|e| e.tag() == tag).count()
    }

    /// Whether the arena is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Current tick.
    #[must_use]
    pub const fn current_tick(&self) -> u64 {
        self.tick
    }

    /// Advance the tick counter.
    pub fn advance_tick(&mut self) {
        self.tick += 1;
    }
}
