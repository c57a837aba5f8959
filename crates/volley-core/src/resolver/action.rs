//! Action lifecycle resolver.
//!
//! - Actions marked `DESTROY` last tick (and not `MANAGED`) are removed.
//! - `UpdateAction` writes back the advanced state.
//! - `CreateAction` spawns an action entity and charges the owner:
//!   cooldown, rage cost and busy window.

use tracing::{trace, warn};

use crate::action::ActionStatus;
use crate::arena::Arena;
use crate::entity::{ActionComponents, ActionState, ActorTime, BreakState, EntityInner, EntityTag};
use crate::output::{ActionLaunch, Command, Output, OutputEnvelope, OutputKind};

use super::{ResolveContext, Resolver};

/// Creates, updates and removes action entities.
///
/// ```
/// use volley_core::output::OutputKind;
/// use volley_core::resolver::{ActionResolver, Resolver};
///
/// let resolver = ActionResolver::new();
/// assert_eq!(resolver.handles(), &[OutputKind::Command]);
/// ```
#[derive(Debug, Clone, Default)]
pub struct ActionResolver;

impl ActionResolver {
    /// Create the resolver.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    fn dispose(current: &Arena, next: &mut Arena) {
        let disposable: Vec<_> = current
            .entities_sorted()
            .filter(|e| e.as_action().is_some_and(|a| a.status.is_disposable()))
            .map(crate::entity::Entity::id)
            .collect();
        for id in disposable {
            next.despawn(id);
        }
    }

    fn create(ctx: &ResolveContext<'_>, launch: &ActionLaunch, current: &Arena, next: &mut Arena) {
        let live = current
            .actor(launch.owner)
            .is_some_and(|owner| owner.combat.version == launch.version);
        if !live {
            trace!(owner = %launch.owner, "launch dropped, owner gone or version moved on");
            return;
        }
        let Some(def) = ctx.definitions.action(launch.action_index) else {
            warn!(index = launch.action_index, "launch references unknown definition");
            return;
        };

        let state = ActionState {
            version: launch.version,
            action_index: launch.action_index,
            slot: Some(launch.slot),
            time: ctx.now,
            owner: launch.owner,
            camp: launch.camp,
            target: launch.target,
            direction: launch.direction,
            position: launch.position,
            target_position: launch.target_position,
            collider: def.collider,
            info: launch.info,
            attack: launch.attack.clone(),
        };
        let components = ActionComponents::launch(state, launch.rotation, def.move_speed);
        let id = next.spawn(EntityTag::Action, EntityInner::Action(components));
        trace!(action = %id, owner = %launch.owner, index = launch.action_index, "action spawned");

        let Some(owner) = next.actor_mut(launch.owner) else {
            return;
        };
        if let Some(slot) = owner.loadout.slots.get_mut(launch.slot) {
            slot.cooldown_until = ctx.now + def.cooldown;
        }
        owner.combat.rage = (owner.combat.rage - def.rage_cost).max(0.0);
        owner.loadout.actor_time = ActorTime {
            busy_until: ctx.now + def.busy_time,
            action_mask: def.action_mask,
        };
        owner.combat.break_state = BreakState::Active;
    }
}

impl Resolver for ActionResolver {
    fn name(&self) -> &'static str {
        "action"
    }

    fn handles(&self) -> &[OutputKind] {
        &[OutputKind::Command]
    }

    fn resolve(
        &self,
        ctx: &ResolveContext<'_>,
        outputs: &[&OutputEnvelope],
        current: &Arena,
        next: &mut Arena,
    ) -> Vec<Output> {
        Self::dispose(current, next);

        for envelope in outputs {
            match envelope.output().as_command() {
                Some(Command::UpdateAction {
                    action,
                    status,
                    transform,
                    velocity,
                    elapsed,
                    ledger,
                }) => {
                    let Some(target) = next.action_mut(*action) else {
                        continue;
                    };
                    if let Some(status) = status {
                        target.status = *status;
                    }
                    if let Some(transform) = transform {
                        target.transform = *transform;
                    }
                    if let Some(velocity) = velocity {
                        target.velocity = *velocity;
                    }
                    if let Some(ledger) = ledger {
                        target.ledger.clone_from(ledger);
                    }
                    target.elapsed = *elapsed;
                    if target.status.contains(ActionStatus::DESTROY) {
                        target.ledger.clear();
                    }
                }
                Some(Command::CreateAction(launch)) => Self::create(ctx, launch, current, next),
                _ => {}
            }
        }
        Vec::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SimConfig;
    use crate::definition::{ActionDefinition, ActionInfo, Definitions};
    use crate::entity::{ActorComponents, EntityId, LoadoutState, Transform};
    use crate::property::PropertyVector;
    use crate::resolver::test_support::envelope;
    use crate::time::Time;
    use glam::{Quat, Vec3};

    fn definitions() -> Definitions {
        Definitions {
            actions: vec![ActionDefinition {
                move_speed: 10.0,
                cooldown: Time::from_millis(400),
                busy_time: Time::from_millis(200),
                action_mask: 0b10,
                rage_cost: 5.0,
                ..ActionDefinition::default()
            }],
            ..Definitions::default()
        }
    }

    fn launch(owner: EntityId, version: u32) -> ActionLaunch {
        ActionLaunch {
            owner,
            slot: 0,
            action_index: 0,
            version,
            camp: 1,
            target: None,
            position: Vec3::new(0.0, 1.0, 0.0),
            rotation: Quat::IDENTITY,
            direction: Vec3::Z,
            target_position: Vec3::new(0.0, 1.0, 10.0),
            info: ActionInfo::default(),
            attack: PropertyVector::zeros(4),
        }
    }

    fn run(arena: &mut Arena, outputs: &[OutputEnvelope], now: Time) {
        let defs = definitions();
        let config = SimConfig::default();
        let ctx = ResolveContext {
            tick: 0,
            now,
            dt: config.tick_length,
            seed: 0,
            definitions: &defs,
            config: &config,
        };
        let current = arena.clone();
        let refs: Vec<_> = outputs.iter().collect();
        let follow = ActionResolver::new().resolve(&ctx, &refs, &current, arena);
        assert!(follow.is_empty());
    }

    fn owner(arena: &mut Arena) -> EntityId {
        let mut actor = ActorComponents::at_position(Vec3::ZERO);
        actor.loadout = LoadoutState::with_actions(&[0]);
        actor.combat.rage = 12.0;
        arena.spawn(EntityTag::Actor, EntityInner::Actor(actor))
    }

    #[test]
    fn create_spawns_and_charges_owner() {
        let mut arena = Arena::new();
        let owner = owner(&mut arena);
        let now = Time::from_millis(1000);
        run(
            &mut arena,
            &[envelope(Command::CreateAction(Box::new(launch(owner, 0))), owner)],
            now,
        );

        let actions = arena.actions_owned_by(owner);
        assert_eq!(actions.len(), 1);
        let action = arena.action(actions[0]).unwrap();
        assert_eq!(action.state.time, now);
        assert_eq!(action.velocity, Vec3::new(0.0, 0.0, 10.0));
        assert!(action.status.is_empty());

        let actor = arena.actor(owner).unwrap();
        assert_eq!(actor.loadout.slots[0].cooldown_until, Time::from_millis(1400));
        assert_eq!(actor.loadout.actor_time.busy_until, Time::from_millis(1200));
        assert_eq!(actor.loadout.actor_time.action_mask, 0b10);
        assert!((actor.combat.rage - 7.0).abs() < 1e-6);
        assert_eq!(actor.combat.break_state, BreakState::Active);
    }

    #[test]
    fn stale_launch_is_dropped() {
        let mut arena = Arena::new();
        let owner = owner(&mut arena);
        run(
            &mut arena,
            &[envelope(Command::CreateAction(Box::new(launch(owner, 1))), owner)],
            Time::ZERO,
        );
        assert!(arena.actions_owned_by(owner).is_empty());
        assert!((arena.actor(owner).unwrap().combat.rage - 12.0).abs() < 1e-6);
    }

    #[test]
    fn update_writes_fields_and_destroy_clears_ledger() {
        let mut arena = Arena::new();
        let owner = owner(&mut arena);
        let mut components = ActionComponents::launch(
            ActionState {
                owner,
                ..ActionState::default()
            },
            Quat::IDENTITY,
            0.0,
        );
        components.ledger.record(owner, Time::ZERO, Time::ZERO, 1.0);
        let id = arena.spawn(EntityTag::Action, EntityInner::Action(components));

        let status = ActionStatus::CREATED | ActionStatus::DESTROY;
        let moved = Transform::at_position(Vec3::new(0.0, 0.0, 3.0));
        run(
            &mut arena,
            &[envelope(
                Command::UpdateAction {
                    action: id,
                    status: Some(status),
                    transform: Some(moved),
                    velocity: None,
                    elapsed: Time::from_millis(50),
                    ledger: None,
                },
                id,
            )],
            Time::ZERO,
        );

        let action = arena.action(id).unwrap();
        assert_eq!(action.status, status);
        assert_eq!(action.transform, moved);
        assert_eq!(action.elapsed, Time::from_millis(50));
        assert!(action.ledger.is_empty());

        // Removed on the following resolution.
        run(&mut arena, &[], Time::from_millis(50));
        assert!(arena.action(id).is_none());
    }

    #[test]
    fn managed_actions_survive_disposal() {
        let mut arena = Arena::new();
        let mut components = ActionComponents::default();
        components.status =
            ActionStatus::CREATED | ActionStatus::DESTROY | ActionStatus::MANAGED;
        let id = arena.spawn(EntityTag::Action, EntityInner::Action(components));
        run(&mut arena, &[], Time::ZERO);
        assert!(arena.action(id).is_some());
    }
}
