//! Damage resolver.
//!
//! Counted hits are assessed in parallel against the frozen snapshot:
//! attack is the action's base vector plus the attacker's live aggregate
//! (the creation snapshot when the attacker is gone), defense is the
//! target's aggregate. Each assessment pushes its buffer changes into an
//! [`EventQueue`]; the queue is then drained in hit order and applied to
//! the next buffer by one consumer.
//!
//! Follow-ups: `Damaged`, `Died` and `Picked` events, and a `Break`
//! command when a hit pushes an action's ledger total across the target's
//! break threshold.

use rand::Rng;
use rayon::prelude::*;
use tracing::{trace, warn};

use crate::arena::Arena;
use crate::definition::ActionFlags;
use crate::entity::{ActorStatus, EntityId};
use crate::output::{Command, DamageHit, Event, Modifier, Output, OutputEnvelope, OutputKind};
use crate::property::{split_damage, Aggregator, DamageSplit};
use crate::queue::EventQueue;
use crate::rng::{event_rng, SALT_ATTACK, SALT_DEFENSE, SALT_PICK};

use super::{ResolveContext, Resolver};

/// Buffer changes one hit can cause.
const BUFFER_EVENTS_PER_HIT: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq)]
enum BufferChange {
    Health { target: EntityId, amount: f32 },
    Torpidity { target: EntityId, amount: f32 },
    Rage { actor: EntityId, amount: f32 },
}

#[derive(Debug, Clone, Copy)]
struct Keyed {
    hit: usize,
    sub: u8,
    change: BufferChange,
}

#[derive(Debug, Clone, Copy)]
struct Assessed<'o> {
    hit: &'o DamageHit,
    split: DamageSplit,
    pick: bool,
}

/// Applies counted hits to health, torpidity and rage.
///
/// ```
/// use volley_core::output::OutputKind;
/// use volley_core::resolver::{DamageResolver, Resolver};
///
/// let resolver = DamageResolver::new();
/// assert_eq!(resolver.handles(), &[OutputKind::Modifier]);
/// ```
#[derive(Debug, Clone, Default)]
pub struct DamageResolver;

impl DamageResolver {
    /// Create the resolver.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    fn assess<'o>(
        ctx: &ResolveContext<'_>,
        index: usize,
        hit: &'o DamageHit,
        current: &Arena,
        queue: &EventQueue<Keyed>,
    ) -> Option<Assessed<'o>> {
        let attacker = current.actor(hit.attacker);
        if attacker.is_some_and(|a| a.combat.version != hit.version) {
            trace!(action = %hit.action, "damage from a stale action dropped");
            return None;
        }
        let target = current.actor(hit.target)?;
        if target.combat.status == ActorStatus::Dead {
            return None;
        }
        let Some(def) = ctx.definitions.action(hit.action_index) else {
            warn!(index = hit.action_index, "damage references unknown definition");
            return None;
        };

        let layout = ctx.config.property_layout;
        let aggregator = Aggregator::new(ctx.definitions, layout);
        let salt = index as u64;

        let mut attack = match attacker {
            Some(a) => {
                let mut rng = event_rng(ctx.seed, ctx.tick, hit.attacker, SALT_ATTACK.wrapping_add(salt));
                aggregator
                    .aggregate(&a.combat.property_source(), ctx.now, &mut rng)
                    .attack
            }
            None => hit.attack.clone(),
        };
        attack.add_slice(&def.attack);

        let mut rng = event_rng(ctx.seed, ctx.tick, hit.target, SALT_DEFENSE.wrapping_add(salt));
        let defense = aggregator
            .aggregate(&target.combat.property_source(), ctx.now, &mut rng)
            .defense;

        let split = split_damage(&attack, &defense, layout, hit.count);
        let changes = [
            BufferChange::Health {
                target: hit.target,
                amount: split.hit,
            },
            BufferChange::Torpidity {
                target: hit.target,
                amount: split.torpor,
            },
            BufferChange::Rage {
                actor: hit.attacker,
                amount: split.hit * ctx.config.rage_per_damage_dealt,
            },
            BufferChange::Rage {
                actor: hit.target,
                amount: split.hit * ctx.config.rage_per_damage_taken,
            },
        ];
        for (sub, change) in (0_u8..).zip(changes) {
            if let Err(err) = queue.push(Keyed {
                hit: index,
                sub,
                change,
            }) {
                warn!(%err, "damage buffer change lost");
            }
        }

        Some(Assessed {
            hit,
            split,
            pick: def.flags.contains(ActionFlags::PICK),
        })
    }

    /// Apply one change. Returns the actor that died from it, if any.
    fn apply(change: BufferChange, next: &mut Arena) -> Option<EntityId> {
        match change {
            BufferChange::Health { target, amount } => {
                let actor = next.actor_mut(target)?;
                if actor.combat.status == ActorStatus::Dead {
                    return None;
                }
                actor.combat.health = (actor.combat.health - amount).max(0.0);
                if actor.combat.health <= 0.0 {
                    actor.combat.status = ActorStatus::Dead;
                    return Some(target);
                }
            }
            BufferChange::Torpidity { target, amount } => {
                let actor = next.actor_mut(target)?;
                actor.combat.torpidity =
                    (actor.combat.torpidity + amount).clamp(0.0, actor.combat.max_torpidity);
            }
            BufferChange::Rage { actor, amount } => {
                let actor = next.actor_mut(actor)?;
                actor.combat.rage = (actor.combat.rage + amount).clamp(0.0, actor.combat.max_rage);
            }
        }
        None
    }

    fn try_pick(ctx: &ResolveContext<'_>, index: usize, hit: &DamageHit, next: &mut Arena) -> bool {
        let Some(target) = next.actor_mut(hit.target) else {
            return false;
        };
        let combat = &mut target.combat;
        let Some(pickable) = combat.pickable else {
            return false;
        };
        if combat.picked_by.is_some() || combat.status == ActorStatus::Dead {
            return false;
        }

        let curves = &ctx.definitions.pick_curves;
        let health = if combat.max_health > 0.0 {
            combat.health / combat.max_health
        } else {
            0.0
        };
        let torpidity = if combat.max_torpidity > 0.0 {
            combat.torpidity / combat.max_torpidity
        } else {
            0.0
        };
        let chance = curves.health.sample(health)
            * curves.torpidity.sample(torpidity)
            * curves.animal.sample(pickable.value);

        let mut rng = event_rng(
            ctx.seed,
            ctx.tick,
            hit.target,
            SALT_PICK.wrapping_add(index as u64),
        );
        if rng.gen::<f32>() < chance {
            combat.picked_by = Some(hit.attacker);
            return true;
        }
        false
    }
}

impl Resolver for DamageResolver {
    fn name(&self) -> &'static str {
        "damage"
    }

    fn handles(&self) -> &[OutputKind] {
        &[OutputKind::Modifier]
    }

    fn resolve(
        &self,
        ctx: &ResolveContext<'_>,
        outputs: &[&OutputEnvelope],
        current: &Arena,
        next: &mut Arena,
    ) -> Vec<Output> {
        let hits: Vec<&DamageHit> = outputs
            .iter()
            .filter_map(|e| match e.output().as_modifier() {
                Some(Modifier::Damage(hit)) => Some(hit.as_ref()),
                _ => None,
            })
            .collect();
        if hits.is_empty() {
            return Vec::new();
        }

        let mut queue = EventQueue::with_capacity(hits.len() * BUFFER_EVENTS_PER_HIT);
        let assessed: Vec<Option<Assessed<'_>>> = hits
            .par_iter()
            .enumerate()
            .map(|(index, hit)| Self::assess(ctx, index, *hit, current, &queue))
            .collect();

        let mut follow = Vec::new();
        let mut deaths: Vec<Option<EntityId>> = vec![None; hits.len()];
        for keyed in queue.drain_sorted_by_key(|k| (k.hit, k.sub)) {
            if let Some(dead) = Self::apply(keyed.change, next) {
                deaths[keyed.hit] = Some(dead);
            }
        }

        for (index, entry) in assessed.iter().enumerate() {
            let Some(Assessed { hit, split, pick }) = *entry else {
                continue;
            };
            trace!(
                attacker = %hit.attacker,
                target = %hit.target,
                hit = split.hit,
                torpor = split.torpor,
                "damage applied"
            );
            follow.push(Output::Event(Event::Damaged {
                attacker: hit.attacker,
                target: hit.target,
                action: hit.action,
                hit: split.hit,
                torpor: split.torpor,
                position: hit.position,
            }));

            if let Some(actor) = deaths[index] {
                follow.push(Output::Event(Event::Died {
                    actor,
                    killer: hit.attacker,
                }));
                continue;
            }

            if pick && Self::try_pick(ctx, index, hit, next) {
                follow.push(Output::Event(Event::Picked {
                    target: hit.target,
                    by: hit.attacker,
                }));
            }

            let threshold = next
                .actor(hit.target)
                .filter(|a| a.combat.status != ActorStatus::Dead)
                .map_or(0.0, |a| a.combat.break_threshold);
            let previous = hit.ledger_total - hit.ledger_delta;
            if threshold > 0.0 && previous < threshold && threshold <= hit.ledger_total {
                follow.push(Output::Command(Command::Break {
                    actor: hit.target,
                    hit: hit.ledger_total,
                    normal: hit.normal,
                    source: Some(hit.action),
                }));
            }
        }
        follow
    }
}
