//! Break state machine: `Active → Breaking → Idle`.
//!
//! A break with `hit == 0` is a silent cancel: the actor's live actions are
//! cancelled and its version moves on, nothing else changes. A positive
//! break is ignored while the actor is alert; otherwise it also starts a
//! new alert window, resets the busy window and velocity, and applies the
//! delay-table row with the largest `min_hit <= hit`.
//!
//! At most one break is applied per actor per tick, the first in output
//! order.

use std::collections::BTreeSet;

use glam::Vec3;
use tracing::debug;

use crate::action::{look_rotation, strip_axis, ActionStatus};
use crate::arena::Arena;
use crate::entity::{ActorStatus, ActorTime, BreakState, EntityId};
use crate::output::{Command, Event, Output, OutputEnvelope, OutputKind};

use super::{ResolveContext, Resolver};

/// Applies `Break` commands.
///
/// ```
/// use volley_core::output::OutputKind;
/// use volley_core::resolver::{InterruptResolver, Resolver};
///
/// let resolver = InterruptResolver::new();
/// assert_eq!(resolver.name(), "interrupt");
/// assert_eq!(resolver.handles(), &[OutputKind::Command]);
/// ```
#[derive(Debug, Clone, Default)]
pub struct InterruptResolver;

impl InterruptResolver {
    /// Create the resolver.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Cancel every live action of `actor`.
    ///
    /// Reads `next` so actions already destroyed earlier in the chain are
    /// not reported twice.
    fn cancel_actions(actor: EntityId, next: &mut Arena, follow: &mut Vec<Output>) {
        for id in next.actions_owned_by(actor) {
            let Some(action) = next.action_mut(id) else {
                continue;
            };
            if action.status.contains(ActionStatus::DESTROY) {
                continue;
            }
            action.status.insert(ActionStatus::CREATED);
            action.status.advance(ActionStatus::DESTROY);
            action.status.advance(ActionStatus::BREAK);
            action.ledger.clear();
            follow.push(Output::Event(Event::ActionDestroyed {
                action: id,
                owner: actor,
                transform: action.transform,
                broken: true,
            }));
        }
    }

    fn apply(
        ctx: &ResolveContext<'_>,
        actor_id: EntityId,
        hit: f32,
        normal: Vec3,
        next: &mut Arena,
        follow: &mut Vec<Output>,
    ) {
        let Some(actor) = next.actor(actor_id) else {
            return;
        };
        let silent = hit <= 0.0;
        if !silent {
            if actor.combat.status == ActorStatus::Dead {
                return;
            }
            if ctx.now < actor.combat.alert_time {
                debug!(actor = %actor_id, hit, "break ignored while alert");
                return;
            }
        }

        Self::cancel_actions(actor_id, next, follow);

        let Some(actor) = next.actor_mut(actor_id) else {
            return;
        };
        actor.combat.version = actor.combat.version.wrapping_add(1);
        actor.loadout.actor_time = ActorTime::default();
        if silent {
            return;
        }

        actor.combat.alert_time = ctx.now + ctx.config.alert_duration;
        actor.motion.velocity = Vec3::ZERO;

        let row = actor.combat.delay_index(hit);
        match row.and_then(|i| actor.combat.delay_table.get(i)).copied() {
            Some(entry) => {
                actor.motion.velocity = -normal * entry.speed;
                actor.motion.knockback_until = ctx.now + entry.duration;
                actor.combat.status = ActorStatus::Knockback;
                actor.combat.break_state = BreakState::Breaking;
                if entry.turn {
                    let facing = strip_axis(normal, ctx.config.gravity_axis());
                    if let Some(rotation) = look_rotation(facing) {
                        actor.transform.rotation = rotation;
                    }
                }
            }
            None => actor.combat.break_state = BreakState::Idle,
        }

        let delay_index = row.and_then(|i| i32::try_from(i).ok()).unwrap_or(-1);
        debug!(actor = %actor_id, hit, delay_index, "actor broken");
        follow.push(Output::Event(Event::Broken {
            actor: actor_id,
            hit,
            delay_index,
        }));
    }
}

impl Resolver for InterruptResolver {
    fn name(&self) -> &'static str {
        "interrupt"
    }

    fn handles(&self) -> &[OutputKind] {
        &[OutputKind::Command]
    }

    fn resolve(
        &self,
        ctx: &ResolveContext<'_>,
        outputs: &[&OutputEnvelope],
        _current: &Arena,
        next: &mut Arena,
    ) -> Vec<Output> {
        let mut follow = Vec::new();
        let mut broken = BTreeSet::new();
        for envelope in outputs {
            let Some(Command::Break {
                actor, hit, normal, ..
            }) = envelope.output().as_command()
            else {
                continue;
            };
            if !broken.insert(*actor) {
                continue;
            }
            Self::apply(ctx, *actor, *hit, *normal, next, &mut follow);
        }
        follow
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SimConfig;
    use crate::definition::Definitions;
    use crate::entity::{
        ActionComponents, ActionState, ActorComponents, DelayEntry, EntityInner, EntityTag,
    };
    use crate::resolver::test_support::envelope;
    use crate::time::Time;
    use glam::Quat;

    const NOW: Time = Time::from_millis(2000);

    fn delay_table() -> Vec<DelayEntry> {
        vec![
            DelayEntry {
                min_hit: 10.0,
                speed: 2.0,
                duration: Time::from_millis(300),
                turn: false,
            },
            DelayEntry {
                min_hit: 50.0,
                speed: 6.0,
                duration: Time::from_millis(600),
                turn: true,
            },
        ]
    }

    struct Scene {
        arena: Arena,
        actor: EntityId,
        action: EntityId,
    }

    fn scene() -> Scene {
        let mut arena = Arena::new();
        let mut actor = ActorComponents::default();
        actor.combat = actor.combat.with_delay_table(delay_table());
        actor.combat.break_state = BreakState::Active;
        actor.loadout.actor_time.busy_until = Time::from_millis(5000);
        let actor = arena.spawn(EntityTag::Actor, EntityInner::Actor(actor));
        let mut action = ActionComponents::launch(
            ActionState {
                owner: actor,
                ..ActionState::default()
            },
            Quat::IDENTITY,
            0.0,
        );
        action.status = ActionStatus::CREATED;
        let action = arena.spawn(EntityTag::Action, EntityInner::Action(action));
        Scene {
            arena,
            actor,
            action,
        }
    }

    fn brk(actor: EntityId, hit: f32) -> Command {
        Command::Break {
            actor,
            hit,
            normal: Vec3::Z,
            source: None,
        }
    }

    fn run(arena: &mut Arena, commands: Vec<Command>) -> Vec<Output> {
        let defs = Definitions::default();
        let config = SimConfig::default();
        let ctx = ResolveContext {
            tick: 0,
            now: NOW,
            dt: config.tick_length,
            seed: 0,
            definitions: &defs,
            config: &config,
        };
        let envelopes: Vec<_> = commands
            .into_iter()
            .map(|c| {
                let subject = c.subject();
                envelope(c, subject)
            })
            .collect();
        let refs: Vec<_> = envelopes.iter().collect();
        let current = arena.clone();
        InterruptResolver::new().resolve(&ctx, &refs, &current, arena)
    }

    fn broken_index(follow: &[Output]) -> Option<i32> {
        follow.iter().find_map(|o| match o.as_event() {
            Some(Event::Broken { delay_index, .. }) => Some(*delay_index),
            _ => None,
        })
    }

    #[test]
    fn silent_cancel_only_cancels() {
        let mut s = scene();
        let follow = run(&mut s.arena, vec![brk(s.actor, 0.0)]);

        let actor = s.arena.actor(s.actor).unwrap();
        assert_eq!(actor.combat.version, 1);
        assert_eq!(actor.combat.alert_time, Time::ZERO);
        assert_eq!(actor.combat.break_state, BreakState::Active);
        assert_eq!(actor.loadout.actor_time, ActorTime::default());
        assert_eq!(broken_index(&follow), None);

        let action = s.arena.action(s.action).unwrap();
        assert!(action.status.contains(ActionStatus::DESTROY | ActionStatus::BREAK));
        assert!(matches!(
            follow[0].as_event(),
            Some(Event::ActionDestroyed { broken: true, .. })
        ));
    }

    #[test]
    fn strong_break_applies_largest_row() {
        let mut s = scene();
        let follow = run(&mut s.arena, vec![brk(s.actor, 60.0)]);

        let actor = s.arena.actor(s.actor).unwrap();
        assert_eq!(broken_index(&follow), Some(1));
        assert_eq!(actor.combat.status, ActorStatus::Knockback);
        assert_eq!(actor.combat.break_state, BreakState::Breaking);
        assert_eq!(actor.motion.velocity, Vec3::new(0.0, 0.0, -6.0));
        assert_eq!(actor.motion.knockback_until, NOW + Time::from_millis(600));
        assert_eq!(actor.combat.alert_time, NOW + SimConfig::default().alert_duration);
        assert!((actor.transform.forward() - Vec3::Z).length() < 1e-5);
    }

    #[test]
    fn weak_break_has_no_row() {
        let mut s = scene();
        let follow = run(&mut s.arena, vec![brk(s.actor, 5.0)]);

        let actor = s.arena.actor(s.actor).unwrap();
        assert_eq!(broken_index(&follow), Some(-1));
        assert_eq!(actor.combat.status, ActorStatus::Normal);
        assert_eq!(actor.combat.break_state, BreakState::Idle);
        assert_eq!(actor.motion.velocity, Vec3::ZERO);
    }

    #[test]
    fn alert_actor_ignores_breaks() {
        let mut s = scene();
        s.arena.actor_mut(s.actor).unwrap().combat.alert_time = NOW + Time::from_millis(1);
        let follow = run(&mut s.arena, vec![brk(s.actor, 60.0)]);

        assert!(follow.is_empty());
        assert_eq!(s.arena.actor(s.actor).unwrap().combat.version, 0);
        assert!(!s
            .arena
            .action(s.action)
            .unwrap()
            .status
            .contains(ActionStatus::DESTROY));
    }

    #[test]
    fn one_break_per_actor_per_tick() {
        let mut s = scene();
        let follow = run(&mut s.arena, vec![brk(s.actor, 12.0), brk(s.actor, 60.0)]);

        assert_eq!(s.arena.actor(s.actor).unwrap().combat.version, 1);
        assert_eq!(broken_index(&follow), Some(0));
        let broken_events = follow
            .iter()
            .filter(|o| matches!(o.as_event(), Some(Event::Broken { .. })))
            .count();
        assert_eq!(broken_events, 1);
    }

    #[test]
    fn already_destroyed_action_is_not_reported_again() {
        let mut s = scene();
        s.arena.action_mut(s.action).unwrap().status =
            ActionStatus::CREATED | ActionStatus::DESTROY;
        let follow = run(&mut s.arena, vec![brk(s.actor, 0.0)]);
        assert!(follow.is_empty());
    }
}
