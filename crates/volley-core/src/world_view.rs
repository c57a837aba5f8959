//! Scoped read-only access to the snapshot.
//!
//! A [`WorldView`] pairs the frozen arena with the tick's collision world
//! and only hands out the components its plugin declared in its
//! [`PluginDeclaration`].
//!
//! # Access Control
//!
//! Every component getter checks the declaration first:
//! - In debug builds, reading an undeclared component panics
//! - In release builds, it returns `None`
//!
//! [`WorldView::get_entity`], [`WorldView::tick`] and
//! [`WorldView::collision`] are always available.
//!
//! # Immutability
//!
//! The view only lends shared references. Plugins change the world by
//! returning outputs, which is what lets every plugin instance of a tick run
//! in parallel against the same snapshot.
//!
//! # Example
//!
//! ```
//! use glam::Vec3;
//! use sweep::World;
//! use volley_core::arena::Arena;
//! use volley_core::entity::{ActorComponents, EntityInner, EntityTag};
//! use volley_core::world_view::WorldView;
//!
//! let mut arena = Arena::new();
//! let id = arena.spawn(
//!     EntityTag::Actor,
//!     EntityInner::Actor(ActorComponents::at_position(Vec3::new(0.0, 0.0, 3.0))),
//! );
//! let world = World::default();
//!
//! let view = WorldView::full_access(&arena, &world, arena.current_tick());
//! assert_eq!(view.get_transform(id).unwrap().position.z, 3.0);
//! assert!(view.get_action(id).is_none());
//! ```

use sweep::CollisionWorld;

use crate::arena::Arena;
use crate::entity::{
    ActionComponents, BodyState, CombatState, Entity, EntityId, EntityInner, LoadoutState,
    MotionState, Transform,
};
use crate::plugin::{ComponentKind, PluginDeclaration};

/// Read-only, component-scoped view of one tick's snapshot.
///
/// Getters return `None` when the entity is missing or does not carry the
/// component (an obstacle has no [`CombatState`], for instance).
pub struct WorldView<'a> {
    /// The frozen arena.
    arena: &'a Arena,
    /// Collision snapshot built from the same arena.
    collision: &'a dyn CollisionWorld,
    tick: u64,
    /// Components the owning plugin declared.
    allowed_components: &'a [ComponentKind],
}

impl std::fmt::Debug for WorldView<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorldView")
            .field("tick", &self.tick)
            .field("entities", &self.arena.entity_count())
            .field("allowed_components", &self.allowed_components)
            .finish_non_exhaustive()
    }
}

impl<'a> WorldView<'a> {
    /// View scoped to a plugin's declared reads.
    ///
    /// # Arguments
    ///
    /// * `arena` - Frozen state of the tick
    /// * `collision` - Collision world built from `arena`
    /// * `decl` - Declaration whose `reads` bound the view
    /// * `tick` - Tick being executed
    #[must_use]
    pub fn for_plugin(
        arena: &'a Arena,
        collision: &'a dyn CollisionWorld,
        decl: &'a PluginDeclaration,
        tick: u64,
    ) -> Self {
        Self {
            arena,
            collision,
            tick,
            allowed_components: &decl.reads,
        }
    }

    /// Unscoped view, for tests and tooling.
    #[must_use]
    pub fn full_access(arena: &'a Arena, collision: &'a dyn CollisionWorld, tick: u64) -> Self {
        static ALL_COMPONENTS: &[ComponentKind] = &[
            ComponentKind::Transform,
            ComponentKind::Motion,
            ComponentKind::Combat,
            ComponentKind::Loadout,
            ComponentKind::Body,
            ComponentKind::Action,
        ];

        Self {
            arena,
            collision,
            tick,
            allowed_components: ALL_COMPONENTS,
        }
    }

    /// Tick of the snapshot.
    #[must_use]
    pub const fn tick(&self) -> u64 {
        self.tick
    }

    /// The tick's collision world.
    ///
    /// Not gated by the declaration: casts and distance queries only expose
    /// body indices and entity keys.
    #[must_use]
    pub fn collision(&self) -> &'a dyn CollisionWorld {
        self.collision
    }

    /// Raw entity, for tag and existence checks.
    #[must_use]
    pub fn get_entity(&self, id: EntityId) -> Option<&'a Entity> {
        self.arena.get(id)
    }

    /// Transform of any entity.
    #[must_use]
    pub fn get_transform(&self, id: EntityId) -> Option<&'a Transform> {
        self.check_access(ComponentKind::Transform)?;
        Some(self.arena.get(id)?.inner().transform())
    }

    /// Actor motion.
    #[must_use]
    pub fn get_motion(&self, id: EntityId) -> Option<&'a MotionState> {
        self.check_access(ComponentKind::Motion)?;
        Some(&self.arena.actor(id)?.motion)
    }

    /// Actor combat state.
    #[must_use]
    pub fn get_combat(&self, id: EntityId) -> Option<&'a CombatState> {
        self.check_access(ComponentKind::Combat)?;
        Some(&self.arena.actor(id)?.combat)
    }

    /// Actor loadout.
    #[must_use]
    pub fn get_loadout(&self, id: EntityId) -> Option<&'a LoadoutState> {
        self.check_access(ComponentKind::Loadout)?;
        Some(&self.arena.actor(id)?.loadout)
    }

    /// Collision body of an actor or obstacle.
    #[must_use]
    pub fn get_body(&self, id: EntityId) -> Option<&'a BodyState> {
        self.check_access(ComponentKind::Body)?;
        match self.arena.get(id)?.inner() {
            EntityInner::Actor(c) => Some(&c.body),
            EntityInner::Obstacle(c) => Some(&c.body),
            EntityInner::Action(_) => None,
        }
    }

    /// Action runtime state.
    #[must_use]
    pub fn get_action(&self, id: EntityId) -> Option<&'a ActionComponents> {
        self.check_access(ComponentKind::Action)?;
        self.arena.action(id)
    }

    /// `Some(())` when `kind` was declared.
    ///
    /// # Panics
    ///
    /// In debug builds, when `kind` was not declared.
    #[allow(clippy::unnecessary_wraps)]
    fn check_access(&self, kind: ComponentKind) -> Option<()> {
        if self.allowed_components.contains(&kind) {
            Some(())
        } else {
            #[cfg(debug_assertions)]
            panic!(
                "WorldView access denied: plugin tried to read {kind} but only declared {:?}",
                self.allowed_components
            );

            #[cfg(not(debug_assertions))]
            None
        }
    }
}
