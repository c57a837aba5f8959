//! Spawn-table resolver.
//!
//! Action events are dispatched through [`EventSink`]. The spawn pass maps
//! them to trigger points and runs the action's spawn table:
//!
//! | Event | Trigger | Position |
//! |-------|---------|----------|
//! | `ActionInitialized` | `INIT` | action transform |
//! | `ActionHit` | `HIT` | contact point |
//! | `Damaged` | `DAMAGE` | contact point |
//! | `ActionDestroyed` (not broken) | `DESTROY` | action transform |
//!
//! Selected action entries become child actions owned by the parent's
//! owner; effect entries become [`SpawnRequest`]s for the presentation
//! layer plus an `EffectSpawned` event.

use std::sync::{Mutex, PoisonError};

use glam::Vec3;
use tracing::{trace, warn};

use crate::arena::Arena;
use crate::entity::{
    ActionComponents, ActionState, EntityId, EntityInner, EntityTag, Transform,
};
use crate::output::{Event, Output, OutputEnvelope, OutputKind};
use crate::rng::{event_rng, SALT_SPAWN};
use crate::spawner::{SpawnKind, SpawnRequest, SpawnTrigger};

use super::{ResolveContext, Resolver};

// =============================================================================
// Event sink
// =============================================================================

/// Receiver of action lifecycle events.
///
/// Every method defaults to doing nothing.
pub trait EventSink {
    /// An action ran its first advance.
    fn on_create(&mut self, _action: EntityId, _owner: EntityId) {}

    /// An action's damage window opened.
    fn on_init(&mut self, _action: EntityId, _transform: &Transform) {}

    /// An action counted a hit.
    fn on_hit(&mut self, _action: EntityId, _target: EntityId, _position: Vec3) {}

    /// A hit of an action dealt damage.
    fn on_damage(&mut self, _action: EntityId, _target: EntityId, _position: Vec3) {}

    /// An action was marked for removal.
    fn on_destroy(&mut self, _action: EntityId, _transform: &Transform, _broken: bool) {}
}

/// Route `event` to the matching sink method.
///
/// Returns `false` for events that are not about an action's lifecycle.
pub fn dispatch<S: EventSink + ?Sized>(event: &Event, sink: &mut S) -> bool {
    match event {
        Event::ActionCreated { action, owner, .. } => sink.on_create(*action, *owner),
        Event::ActionInitialized {
            action, transform, ..
        } => sink.on_init(*action, transform),
        Event::ActionHit {
            action,
            target,
            position,
            ..
        } => sink.on_hit(*action, *target, *position),
        Event::Damaged {
            action,
            target,
            position,
            ..
        } => sink.on_damage(*action, *target, *position),
        Event::ActionDestroyed {
            action,
            transform,
            broken,
            ..
        } => sink.on_destroy(*action, transform, *broken),
        _ => return false,
    }
    true
}

// =============================================================================
// Spawn pass
// =============================================================================

struct SpawnPass<'a, 'n> {
    ctx: &'a ResolveContext<'a>,
    next: &'n mut Arena,
    sequence: u64,
    requests: Vec<SpawnRequest>,
    follow: Vec<Output>,
}

impl SpawnPass<'_, '_> {
    fn fire(&mut self, action: EntityId, trigger: SpawnTrigger, position: Vec3) {
        let Some(parent) = self.next.action(action) else {
            return;
        };
        let Some(table) = self
            .ctx
            .definitions
            .action(parent.state.action_index)
            .and_then(|def| def.spawn_table)
        else {
            return;
        };
        let Some(table) = self.ctx.definitions.spawn_table(table) else {
            warn!(action = %action, table, "unknown spawn table");
            return;
        };

        let mut rng = event_rng(
            self.ctx.seed,
            self.ctx.tick,
            action,
            SALT_SPAWN.wrapping_add(self.sequence),
        );
        let rotation = parent.transform.rotation;
        let state = parent.state.clone();
        let selected: Vec<_> = table
            .select(trigger, &mut rng)
            .into_iter()
            .map(|entry| (entry.kind, position + rotation * entry.offset))
            .collect();

        for (kind, at) in selected {
            match kind {
                SpawnKind::Action { action: index } => {
                    self.spawn_child(&state, index, at, rotation);
                }
                SpawnKind::Effect { effect } => {
                    trace!(action = %action, effect, ?trigger, "effect requested");
                    self.requests.push(SpawnRequest {
                        effect,
                        trigger,
                        action,
                        position: at,
                        rotation,
                        tick: self.ctx.tick,
                    });
                    self.follow.push(Output::Event(Event::EffectSpawned {
                        effect,
                        action,
                        position: at,
                    }));
                }
            }
        }
    }

    fn spawn_child(&mut self, parent: &ActionState, index: usize, position: Vec3, rotation: glam::Quat) {
        let Some(def) = self.ctx.definitions.action(index) else {
            warn!(index, "spawn entry references unknown action");
            return;
        };
        let state = ActionState {
            version: parent.version,
            action_index: index,
            slot: None,
            time: self.ctx.now,
            owner: parent.owner,
            camp: parent.camp,
            target: parent.target,
            direction: rotation * Vec3::Z,
            position,
            target_position: parent.target_position,
            collider: def.collider,
            info: def.info,
            attack: parent.attack.clone(),
        };
        let child = self.next.spawn(
            EntityTag::Action,
            EntityInner::Action(ActionComponents::launch(state, rotation, def.move_speed)),
        );
        trace!(child = %child, owner = %parent.owner, index, "child action spawned");
    }
}

impl EventSink for SpawnPass<'_, '_> {
    fn on_init(&mut self, action: EntityId, transform: &Transform) {
        self.fire(action, SpawnTrigger::INIT, transform.position);
    }

    fn on_hit(&mut self, action: EntityId, _target: EntityId, position: Vec3) {
        self.fire(action, SpawnTrigger::HIT, position);
    }

    fn on_damage(&mut self, action: EntityId, _target: EntityId, position: Vec3) {
        self.fire(action, SpawnTrigger::DAMAGE, position);
    }

    fn on_destroy(&mut self, action: EntityId, transform: &Transform, broken: bool) {
        if !broken {
            self.fire(action, SpawnTrigger::DESTROY, transform.position);
        }
    }
}

// =============================================================================
// Resolver
// =============================================================================

/// Runs spawn tables and collects presentation effect requests.
///
/// ```
/// use volley_core::resolver::SpawnResolver;
///
/// let resolver = SpawnResolver::new();
/// assert!(resolver.take_requests().is_empty());
/// ```
#[derive(Debug, Default)]
pub struct SpawnResolver {
    requests: Mutex<Vec<SpawnRequest>>,
}

impl SpawnResolver {
    /// Create the resolver with no pending requests.
    #[must_use]
    pub fn new() -> Self {
        Self {
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Drain the effect requests recorded so far.
    pub fn take_requests(&self) -> Vec<SpawnRequest> {
        let mut requests = self.requests.lock().unwrap_or_else(PoisonError::into_inner);
        std::mem::take(&mut *requests)
    }

    /// Number of pending requests.
    #[must_use]
    pub fn request_count(&self) -> usize {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl Resolver for SpawnResolver {
    fn name(&self) -> &'static str {
        "spawn"
    }

    fn handles(&self) -> &[OutputKind] {
        &[OutputKind::Event]
    }

    fn resolve(
        &self,
        ctx: &ResolveContext<'_>,
        outputs: &[&OutputEnvelope],
        _current: &Arena,
        next: &mut Arena,
    ) -> Vec<Output> {
        let mut pass = SpawnPass {
            ctx,
            next,
            sequence: 0,
            requests: Vec::new(),
            follow: Vec::new(),
        };
        for envelope in outputs {
            if let Some(event) = envelope.output().as_event() {
                if dispatch(event, &mut pass) {
                    pass.sequence += 1;
                }
            }
        }

        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .append(&mut pass.requests);
        pass.follow
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::ActionStatus;
    use crate::config::SimConfig;
    use crate::definition::{ActionDefinition, Definitions};
    use crate::resolver::test_support::envelope;
    use crate::spawner::{SpawnEntry, SpawnMode, SpawnTable};
    use crate::time::Time;
    use glam::Quat;

    fn entry(kind: SpawnKind, triggers: SpawnTrigger) -> SpawnEntry {
        SpawnEntry {
            kind,
            triggers,
            chance: 1.0,
            weight: 1.0,
            offset: Vec3::new(0.0, 0.0, 1.0),
        }
    }

    fn definitions() -> Definitions {
        Definitions {
            actions: vec![
                ActionDefinition {
                    spawn_table: Some(0),
                    ..ActionDefinition::default()
                },
                ActionDefinition {
                    move_speed: 5.0,
                    ..ActionDefinition::default()
                },
            ],
            spawn_tables: vec![SpawnTable {
                mode: SpawnMode::Chance,
                entries: vec![
                    entry(SpawnKind::Action { action: 1 }, SpawnTrigger::HIT),
                    entry(
                        SpawnKind::Effect { effect: 7 },
                        SpawnTrigger::INIT | SpawnTrigger::DESTROY,
                    ),
                ],
            }],
            ..Definitions::default()
        }
    }

    struct Recorder(Vec<&'static str>);

    impl EventSink for Recorder {
        fn on_create(&mut self, _: EntityId, _: EntityId) {
            self.0.push("create");
        }
        fn on_destroy(&mut self, _: EntityId, _: &Transform, _: bool) {
            self.0.push("destroy");
        }
    }

    fn scene() -> (Arena, EntityId, EntityId) {
        let mut arena = Arena::new();
        let owner = EntityId::new(50);
        let mut action = ActionComponents::launch(
            ActionState {
                owner,
                version: 2,
                camp: 1,
                ..ActionState::default()
            },
            Quat::IDENTITY,
            0.0,
        );
        action.status = ActionStatus::CREATED;
        let id = arena.spawn(EntityTag::Action, EntityInner::Action(action));
        (arena, id, owner)
    }

    fn run(resolver: &SpawnResolver, arena: &mut Arena, events: Vec<Event>) -> Vec<Output> {
        let defs = definitions();
        let config = SimConfig::default();
        let ctx = ResolveContext {
            tick: 4,
            now: Time::from_millis(400),
            dt: config.tick_length,
            seed: 1,
            definitions: &defs,
            config: &config,
        };
        let envelopes: Vec<_> = events
            .into_iter()
            .map(|e| {
                let subject = e.primary_entity();
                envelope(e, subject)
            })
            .collect();
        let refs: Vec<_> = envelopes.iter().collect();
        let current = arena.clone();
        resolver.resolve(&ctx, &refs, &current, arena)
    }

    #[test]
    fn dispatch_routes_lifecycle_events_only() {
        let mut recorder = Recorder(Vec::new());
        let a = EntityId::new(1);
        assert!(dispatch(
            &Event::ActionCreated {
                action: a,
                owner: a,
                action_index: 0
            },
            &mut recorder
        ));
        assert!(dispatch(
            &Event::ActionDestroyed {
                action: a,
                owner: a,
                transform: Transform::default(),
                broken: false
            },
            &mut recorder
        ));
        assert!(!dispatch(&Event::Picked { target: a, by: a }, &mut recorder));
        assert_eq!(recorder.0, vec!["create", "destroy"]);
    }

    #[test]
    fn hit_spawns_child_for_owner() {
        let (mut arena, id, owner) = scene();
        let resolver = SpawnResolver::new();
        let follow = run(
            &resolver,
            &mut arena,
            vec![Event::ActionHit {
                action: id,
                owner,
                target: EntityId::new(9),
                position: Vec3::new(1.0, 0.0, 0.0),
                normal: Vec3::Z,
                count: 1,
            }],
        );
        assert!(follow.is_empty());

        let owned = arena.actions_owned_by(owner);
        assert_eq!(owned.len(), 2);
        let child = arena.action(owned[1]).unwrap();
        assert_eq!(child.state.action_index, 1);
        assert_eq!(child.state.version, 2);
        assert_eq!(child.state.camp, 1);
        assert_eq!(child.state.slot, None);
        assert_eq!(child.state.time, Time::from_millis(400));
        assert_eq!(child.transform.position, Vec3::new(1.0, 0.0, 1.0));
        assert_eq!(child.velocity, Vec3::new(0.0, 0.0, 5.0));
    }

    #[test]
    fn init_requests_effect() {
        let (mut arena, id, owner) = scene();
        let resolver = SpawnResolver::new();
        let follow = run(
            &resolver,
            &mut arena,
            vec![Event::ActionInitialized {
                action: id,
                owner,
                elapsed: Time::ZERO,
                transform: Transform::at_position(Vec3::new(0.0, 2.0, 0.0)),
            }],
        );

        assert_eq!(resolver.request_count(), 1);
        let requests = resolver.take_requests();
        assert_eq!(requests[0].effect, 7);
        assert_eq!(requests[0].trigger, SpawnTrigger::INIT);
        assert_eq!(requests[0].position, Vec3::new(0.0, 2.0, 1.0));
        assert_eq!(requests[0].tick, 4);
        assert!(resolver.take_requests().is_empty());
        assert!(matches!(
            follow[0].as_event(),
            Some(Event::EffectSpawned { effect: 7, .. })
        ));
    }

    #[test]
    fn broken_destroy_spawns_nothing() {
        let (mut arena, id, owner) = scene();
        let resolver = SpawnResolver::new();
        let destroyed = |broken| Event::ActionDestroyed {
            action: id,
            owner,
            transform: Transform::default(),
            broken,
        };
        run(&resolver, &mut arena, vec![destroyed(true)]);
        assert_eq!(resolver.request_count(), 0);
        run(&resolver, &mut arena, vec![destroyed(false)]);
        assert_eq!(resolver.request_count(), 1);
    }
}
