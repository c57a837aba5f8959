//! The tick loop.
//!
//! Each [`Simulation::step`] runs four phases:
//!
//! 1. **SNAPSHOT**: `current` is frozen and a collision world is built from
//!    the bodies of live actors and obstacles
//! 2. **PLUGIN**: the command plugin (per actor) and the action plugin (per
//!    action) run in parallel and emit outputs
//! 3. **RESOLUTION**: outputs are sorted by (entity, plugin, sequence),
//!    `next` is cloned from `current`, and the resolver chain runs in order.
//!    Outputs a resolver returns are appended to the pool the later
//!    resolvers see
//! 4. **APPLY**: buffers swap and the tick advances
//!
//! # Determinism
//!
//! - Plugin outputs are sorted before resolution, so rayon's scheduling
//!   never reaches the resolvers
//! - Entities are visited in id order and collision results are ordered by
//!   body index
//! - Trace ids and per-event RNG streams derive from the master seed
//!
//! # Example
//!
//! ```
//! use glam::Vec3;
//! use volley_core::config::SimConfig;
//! use volley_core::definition::Definitions;
//! use volley_core::entity::{ActorComponents, EntityInner, EntityTag};
//! use volley_core::simulation::Simulation;
//!
//! let mut sim = Simulation::new(42, Definitions::default(), SimConfig::default());
//! let id = sim.arena_mut().spawn(
//!     EntityTag::Actor,
//!     EntityInner::Actor(ActorComponents::at_position(Vec3::ZERO)),
//! );
//!
//! for _ in 0..10 {
//!     sim.step();
//! }
//!
//! assert_eq!(sim.tick(), 10);
//! assert!(sim.arena().actor(id).is_some());
//! ```

use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use rayon::prelude::*;
use sweep::{RigidBody, World};
use tracing::{debug_span, trace};

use crate::arena::Arena;
use crate::config::SimConfig;
use crate::definition::Definitions;
use crate::entity::{ActorCommand, ActorStatus, EntityId, EntityInner};
use crate::output::{OutputEnvelope, PluginId, PluginInstanceId, TraceId};
use crate::plugin::{PluginContext, PluginRegistry};
use crate::resolver::{
    ActionResolver, DamageResolver, EventResolver, InterruptResolver, MotionResolver,
    ResolveContext, Resolver, SpawnResolver,
};
use crate::spawner::SpawnRequest;
use crate::time::Time;
use crate::world_view::WorldView;

/// Trace ids of resolver follow-ups count down from here so they never
/// collide with a plugin index.
const RESOLVER_TRACE_BASE: u64 = u64::MAX;

// =============================================================================
// Simulation
// =============================================================================

/// Double-buffered combat simulation.
///
/// # Double Buffering
///
/// - `current`: read-only snapshot the plugins see
/// - `next`: cloned from `current` at the start of resolution and written by
///   the resolvers
///
/// The buffers swap at the end of the tick.
///
/// # Determinism
///
/// Given the same seed, definitions, config, initial arena and commands,
/// every run produces identical state. Outputs are sorted before
/// resolution, resolvers run in a fixed order, and every random draw comes
/// from a stream keyed by the master seed.
pub struct Simulation {
    /// Current arena state (read-only during the plugin phase).
    current: Arena,
    /// Next arena state, written by resolvers.
    next: Arena,
    /// Plugins per entity tag.
    plugins: PluginRegistry,
    /// Resolver chain, run in order.
    resolvers: Vec<Arc<dyn Resolver>>,
    /// Shared handle to the event recorder in the chain.
    events: Arc<EventResolver>,
    /// Shared handle to the effect spawn recorder in the chain.
    spawns: Arc<SpawnResolver>,
    definitions: Definitions,
    config: SimConfig,
    /// Master seed for trace ids and event RNG.
    master_seed: u64,
}

impl fmt::Debug for Simulation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Simulation")
            .field("current", &self.current)
            .field("plugins", &self.plugins)
            .field("resolvers", &format!("[{} resolvers]", self.resolvers.len()))
            .field("config", &self.config)
            .field("master_seed", &self.master_seed)
            .finish_non_exhaustive()
    }
}

impl Simulation {
    /// Simulation at tick 0 with the default plugin bundles and the
    /// resolver chain `action → damage → interrupt → motion → spawn → event`.
    ///
    /// ```
    /// use volley_core::config::SimConfig;
    /// use volley_core::definition::Definitions;
    /// use volley_core::simulation::Simulation;
    ///
    /// let sim = Simulation::new(12345, Definitions::default(), SimConfig::default());
    /// assert_eq!(sim.tick(), 0);
    /// assert_eq!(sim.seed(), 12345);
    /// assert_eq!(sim.resolver_count(), 6);
    /// ```
    #[must_use]
    pub fn new(seed: u64, definitions: Definitions, config: SimConfig) -> Self {
        let events = Arc::new(EventResolver::new());
        let spawns = Arc::new(SpawnResolver::new());
        let resolvers: Vec<Arc<dyn Resolver>> = vec![
            Arc::new(ActionResolver::new()),
            Arc::new(DamageResolver::new()),
            Arc::new(InterruptResolver::new()),
            Arc::new(MotionResolver::new()),
            Arc::clone(&spawns) as Arc<dyn Resolver>,
            Arc::clone(&events) as Arc<dyn Resolver>,
        ];
        Self {
            current: Arena::new(),
            next: Arena::new(),
            plugins: PluginRegistry::default_bundles(),
            resolvers,
            events,
            spawns,
            definitions,
            config,
            master_seed: seed,
        }
    }

    /// Execute one tick.
    ///
    /// # Execution Phases
    ///
    /// 1. **SNAPSHOT**: `current` is frozen for the tick and a collision
    ///    world is built from live actors and obstacles.
    ///
    /// 2. **PLUGIN**: every plugin of every entity runs in parallel against
    ///    a [`WorldView`] scoped to its declared components.
    ///
    /// 3. **RESOLUTION**: `next` is cloned from `current` and pending
    ///    commands are cleared. Each resolver sees the outputs of the kinds
    ///    it handles; follow-up outputs it returns are wrapped under the
    ///    resolver's name and appended for the resolvers after it.
    ///
    /// 4. **APPLY**: the arenas swap and the tick counter advances.
    ///
    /// # Determinism
    ///
    /// Plugin outputs are sorted by (`entity_id`, `plugin_id`, sequence)
    /// before resolution. Follow-ups keep the order their resolver returned.
    pub fn step(&mut self) {
        let tick = self.current.current_tick();
        let now = Time::at_tick(tick, self.config.tick_length);
        let _span = debug_span!("step", tick).entered();

        // SNAPSHOT
        let world = self.collision_world();

        // PLUGIN
        let mut pool = self.execute_plugins_parallel(tick, now, &world);
        trace!(outputs = pool.len(), "plugin phase done");

        // RESOLUTION
        self.next.clone_from(&self.current);
        for (_, actor) in self.next.actors_mut() {
            actor.loadout.pending = None;
        }

        let ctx = ResolveContext {
            tick,
            now,
            dt: self.config.tick_length,
            seed: self.master_seed,
            definitions: &self.definitions,
            config: &self.config,
        };
        for (index, resolver) in self.resolvers.iter().enumerate() {
            let follow = {
                let relevant: Vec<_> = pool
                    .iter()
                    .filter(|o| resolver.handles().contains(&o.kind()))
                    .collect();
                resolver.resolve(&ctx, &relevant, &self.current, &mut self.next)
            };
            if follow.is_empty() {
                continue;
            }
            trace!(resolver = resolver.name(), follow = follow.len(), "follow-up outputs");
            let plugin_id = PluginId::from_static(resolver.name());
            let slot = RESOLVER_TRACE_BASE - index as u64;
            #[allow(clippy::cast_possible_truncation)]
            pool.extend(follow.into_iter().enumerate().map(|(seq, output)| {
                let subject = output.subject();
                OutputEnvelope::new(
                    output,
                    PluginInstanceId::new(subject, plugin_id.clone()),
                    self.generate_trace_id(tick, subject.as_u64(), slot),
                    tick,
                    seq as u32,
                )
            }));
        }

        // APPLY
        std::mem::swap(&mut self.current, &mut self.next);
        self.current.advance_tick();
    }

    /// Collision snapshot of live actors and obstacles.
    fn collision_world(&self) -> World {
        let bodies = self
            .current
            .entities_sorted()
            .filter_map(|entity| match entity.inner() {
                EntityInner::Actor(actor) if actor.combat.status != ActorStatus::Dead => Some(
                    (entity.id(), &actor.body, actor.transform.pose()),
                ),
                EntityInner::Obstacle(obstacle) => {
                    Some((entity.id(), &obstacle.body, obstacle.transform.pose()))
                }
                _ => None,
            })
            .map(|(id, body, pose)| RigidBody::new(id.as_u64(), body.shape, pose, body.filter()))
            .collect();
        World::new(bodies)
    }

    /// Run every plugin on the frozen snapshot and collect its outputs.
    ///
    /// Instances are gathered in entity id order, executed with rayon and
    /// wrapped in envelopes carrying their source and trace id.
    ///
    /// # Arguments
    ///
    /// * `tick` - The tick being executed
    /// * `now` - Simulation time at the start of the tick
    /// * `world` - Collision snapshot built for this tick
    ///
    /// # Returns
    ///
    /// Envelopes sorted by (`entity_id`, `plugin_id`, sequence).
    fn execute_plugins_parallel(&self, tick: u64, now: Time, world: &World) -> Vec<OutputEnvelope> {
        let plugin_instances: Vec<_> = self
            .current
            .entities_sorted()
            .flat_map(|entity| {
                self.plugins
                    .plugins_for(entity.tag())
                    .iter()
                    .enumerate()
                    .map(move |(idx, plugin)| (entity.id(), idx, Arc::clone(plugin)))
            })
            .collect();

        let mut all_outputs: Vec<OutputEnvelope> = plugin_instances
            .par_iter()
            .flat_map(|(entity_id, plugin_idx, plugin)| {
                let decl = plugin.declaration();
                let view = WorldView::for_plugin(&self.current, world, decl, tick);
                let trace_id = self.generate_trace_id(tick, entity_id.as_u64(), *plugin_idx as u64);

                let ctx = PluginContext {
                    entity_id: *entity_id,
                    tick,
                    trace_id,
                    now,
                    dt: self.config.tick_length,
                    seed: self.master_seed,
                    definitions: &self.definitions,
                    config: &self.config,
                };

                #[allow(clippy::cast_possible_truncation)]
                plugin
                    .run(&ctx, &view)
                    .into_iter()
                    .enumerate()
                    .map(|(seq, output)| {
                        OutputEnvelope::new(
                            output,
                            PluginInstanceId::new(*entity_id, decl.id.clone()),
                            trace_id,
                            tick,
                            seq as u32,
                        )
                    })
                    .collect::<Vec<_>>()
            })
            .collect();

        all_outputs.sort_by(|a, b| {
            a.source()
                .entity_id()
                .cmp(&b.source().entity_id())
                .then_with(|| a.source().plugin_id().as_str().cmp(b.source().plugin_id().as_str()))
                .then_with(|| a.sequence().cmp(&b.sequence()))
        });

        all_outputs
    }

    /// Deterministic trace id.
    ///
    /// Hashes the master seed, tick, entity and plugin slot. Plugins use
    /// their index in the registry; resolver follow-ups use slots counting
    /// down from [`RESOLVER_TRACE_BASE`].
    fn generate_trace_id(&self, tick: u64, entity: u64, plugin: u64) -> TraceId {
        let mut hasher = DefaultHasher::new();
        self.master_seed.hash(&mut hasher);
        tick.hash(&mut hasher);
        entity.hash(&mut hasher);
        plugin.hash(&mut hasher);
        TraceId::new(hasher.finish())
    }

    /// Queue a fire command for `actor`, picked up by the next step.
    ///
    /// Returns `false` when `actor` is not a live actor entity. A second
    /// submission before the step replaces the first.
    pub fn submit(&mut self, actor: EntityId, command: ActorCommand) -> bool {
        match self.current.actor_mut(actor) {
            Some(components) => {
                components.loadout.pending = Some(command);
                true
            }
            None => {
                trace!(actor = %actor, "command for unknown actor dropped");
                false
            }
        }
    }

    /// Serializable copy of the current state.
    #[must_use]
    pub fn snapshot(&self) -> Arena {
        self.current.clone()
    }

    /// Roll back to `snapshot`.
    ///
    /// Recorded events and spawn requests not yet drained are discarded.
    pub fn restore(&mut self, snapshot: Arena) {
        self.current = snapshot;
        self.next = Arena::new();
        self.events.clear();
        drop(self.spawns.take_requests());
    }

    /// Drain the events recorded since the last call.
    pub fn take_events(&self) -> Vec<OutputEnvelope> {
        self.events.take_events()
    }

    /// Drain the effect spawn requests recorded since the last call.
    pub fn take_spawn_requests(&self) -> Vec<SpawnRequest> {
        self.spawns.take_requests()
    }

    /// Current state.
    #[must_use]
    pub fn arena(&self) -> &Arena {
        &self.current
    }

    /// Current state, for setup between steps.
    #[must_use]
    pub fn arena_mut(&mut self) -> &mut Arena {
        &mut self.current
    }

    /// Current tick.
    #[must_use]
    pub fn tick(&self) -> u64 {
        self.current.current_tick()
    }

    /// Simulation time at the start of the current tick.
    #[must_use]
    pub fn now(&self) -> Time {
        Time::at_tick(self.tick(), self.config.tick_length)
    }

    /// Master seed.
    #[must_use]
    pub fn seed(&self) -> u64 {
        self.master_seed
    }

    /// Static tables.
    #[must_use]
    pub fn definitions(&self) -> &Definitions {
        &self.definitions
    }

    /// Configuration.
    #[must_use]
    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    /// Plugin registry, for adding host plugins.
    ///
    /// Plugins registered here run from the next [`step`](Self::step). Their
    /// index within a tag becomes part of the trace id, so register them in
    /// the same order on every run.
    ///
    /// ```
    /// use volley_core::config::SimConfig;
    /// use volley_core::definition::Definitions;
    /// use volley_core::entity::EntityTag;
    /// use volley_core::simulation::Simulation;
    ///
    /// let mut sim = Simulation::new(1, Definitions::default(), SimConfig::default());
    /// let before = sim.plugins_mut().plugins_for(EntityTag::Actor).len();
    /// assert!(before > 0);
    /// ```
    #[must_use]
    pub fn plugins_mut(&mut self) -> &mut PluginRegistry {
        &mut self.plugins
    }

    /// Append a resolver after the built-in chain.
    pub fn add_resolver(&mut self, resolver: Arc<dyn Resolver>) {
        self.resolvers.push(resolver);
    }

    /// Number of resolvers in the chain.
    #[must_use]
    pub fn resolver_count(&self) -> usize {
        self.resolvers.len()
    }
}

// =============================================================================
// Tests
// =============================================================================
