//! Actor motion resolver.
//!
//! Per tick, in order:
//!
//! 1. `SetUnstoppable` raises an actor's unstoppable deadline
//! 2. `Impact` adds `direction * force * inverse_mass` to the velocity,
//!    unless the actor is unstoppable or dead
//! 3. `SetLocation` moves an actor (last one wins) and skips its
//!    integration this tick
//! 4. every other live actor integrates its velocity with damping
//! 5. knockback that has run out returns the actor to `Normal`/`Idle`
//! 6. expired buffs are dropped

use std::collections::BTreeMap;

use glam::Vec3;

use crate::arena::Arena;
use crate::entity::{ActorStatus, BreakState, EntityId};
use crate::output::{Command, Modifier, Output, OutputEnvelope, OutputKind};

use super::{ResolveContext, Resolver};

/// Applies actor-move effects and integrates actor velocity.
#[derive(Debug, Clone, Default)]
pub struct MotionResolver;

impl MotionResolver {
    /// Create the resolver.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Resolver for MotionResolver {
    fn name(&self) -> &'static str {
        "motion"
    }

    fn handles(&self) -> &[OutputKind] {
        &[OutputKind::Command, OutputKind::Modifier]
    }

    fn resolve(
        &self,
        ctx: &ResolveContext<'_>,
        outputs: &[&OutputEnvelope],
        _current: &Arena,
        next: &mut Arena,
    ) -> Vec<Output> {
        for envelope in outputs {
            if let Some(Command::SetUnstoppable { actor, until }) = envelope.output().as_command() {
                if let Some(actor) = next.actor_mut(*actor) {
                    actor.motion.unstoppable_until = actor.motion.unstoppable_until.max(*until);
                }
            }
        }

        for envelope in outputs {
            let Some(Modifier::Impact {
                target,
                direction,
                force,
                ..
            }) = envelope.output().as_modifier()
            else {
                continue;
            };
            let Some(actor) = next.actor_mut(*target) else {
                continue;
            };
            if actor.combat.status == ActorStatus::Dead || ctx.now < actor.motion.unstoppable_until {
                continue;
            }
            actor.motion.velocity +=
                direction.normalize_or_zero() * *force * actor.motion.inverse_mass;
        }

        let mut locations: BTreeMap<EntityId, Vec3> = BTreeMap::new();
        for envelope in outputs {
            if let Some(Command::SetLocation { actor, position }) = envelope.output().as_command() {
                locations.insert(*actor, *position);
            }
        }

        let dt = ctx.dt.as_secs_f32();
        let damping = (1.0 - ctx.config.knockback_damping * dt).max(0.0);
        let end = ctx.now + ctx.dt;
        for (id, actor) in next.actors_mut() {
            if actor.combat.status == ActorStatus::Dead {
                actor.motion.velocity = Vec3::ZERO;
            } else if let Some(position) = locations.get(&id) {
                actor.transform.position = *position;
            } else {
                actor.transform.position += actor.motion.velocity * dt;
                actor.motion.velocity *= damping;
            }

            if actor.combat.status == ActorStatus::Knockback && actor.motion.knockback_until <= end {
                actor.combat.status = ActorStatus::Normal;
                actor.combat.break_state = BreakState::Idle;
                actor.motion.velocity = Vec3::ZERO;
            }

            actor.combat.buffs.retain(|b| b.is_active(ctx.now));
        }

        Vec::new()
    }
}
