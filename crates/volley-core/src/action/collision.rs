//! Hit collection for one action advance.
//!
//! An action that moved this tick sweeps its collider from the old
//! transform to the new one; an action that stayed put runs an overlap
//! query instead. Candidates then pass two predicates:
//!
//! 1. `hit_type`: can the action touch this target at all? Failing it
//!    drops the candidate without affecting the sweep.
//! 2. `damage_type`: may the action damage it? Hits that pass the first
//!    predicate but not this one still stop a destroy-on-hit action.
//!
//! Damage-eligible targets go through the hit ledger; every counted hit
//! becomes a [`Modifier::Damage`], an [`Event::ActionHit`] and optionally a
//! [`Modifier::Impact`].

use glam::Vec3;
use sweep::{ColliderCastInput, CollisionFilter, DistanceInput, Shape};
use tracing::trace;

use crate::definition::{ActionDefinition, Definitions, TargetMask};
use crate::entity::{ActionState, EntityId, EntityTag, Transform};
use crate::output::{DamageHit, Event, Modifier, Output};
use crate::time::Time;
use crate::world_view::WorldView;

use super::ledger::HitLedger;
use super::EPSILON;

// =============================================================================
// Candidate hits
// =============================================================================

/// One body touched by the query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CandidateHit {
    /// Touched entity
    pub entity: EntityId,
    /// Sweep fraction; zero for overlap queries
    pub fraction: f32,
    /// Contact point on the body
    pub position: Vec3,
    /// Contact normal, pointing from the body toward the action
    pub normal: Vec3,
    /// Relation of the entity to the action
    pub relation: TargetMask,
}

/// Collects hits along a sweep.
///
/// In closest-only mode the collector keeps a single hit and lowers
/// `max_fraction` to it, so later candidates beyond it are refused. Equal
/// fractions are broken by distance from the interpolated sweep position,
/// then by how squarely the normal faces the travel direction.
///
/// ```
/// use glam::Vec3;
/// use volley_core::action::{CandidateHit, HitCollector};
/// use volley_core::definition::TargetMask;
/// use volley_core::entity::EntityId;
///
/// let hit = |entity, fraction| CandidateHit {
///     entity: EntityId::new(entity),
///     fraction,
///     position: Vec3::new(0.0, 0.0, fraction * 10.0),
///     normal: Vec3::NEG_Z,
///     relation: TargetMask::ENEMY,
/// };
///
/// let mut collector = HitCollector::new(true, Vec3::ZERO, Vec3::new(0.0, 0.0, 10.0));
/// assert!(collector.add(hit(1, 0.6)));
/// assert!(collector.add(hit(2, 0.3)));
/// assert!(!collector.add(hit(3, 0.6)));
/// assert_eq!(collector.max_fraction(), 0.3);
/// assert_eq!(collector.hits().len(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct HitCollector {
    closest_only: bool,
    max_fraction: f32,
    start: Vec3,
    end: Vec3,
    hits: Vec<CandidateHit>,
}

impl HitCollector {
    /// Collector for a sweep from `start` to `end`.
    #[must_use]
    pub fn new(closest_only: bool, start: Vec3, end: Vec3) -> Self {
        Self {
            closest_only,
            max_fraction: 1.0,
            start,
            end,
            hits: Vec::new(),
        }
    }

    /// Offer a candidate. Returns whether it was kept.
    pub fn add(&mut self, hit: CandidateHit) -> bool {
        if hit.fraction > self.max_fraction {
            return false;
        }
        if !self.closest_only {
            self.hits.push(hit);
            return true;
        }
        if let Some(best) = self.hits.first() {
            if !self.prefers(&hit, best) {
                return false;
            }
        }
        self.max_fraction = hit.fraction;
        self.hits.clear();
        self.hits.push(hit);
        true
    }

    /// Largest fraction still accepted.
    #[must_use]
    pub const fn max_fraction(&self) -> f32 {
        self.max_fraction
    }

    /// Kept hits, in offer order.
    #[must_use]
    pub fn hits(&self) -> &[CandidateHit] {
        &self.hits
    }

    /// Earliest kept hit.
    #[must_use]
    pub fn closest(&self) -> Option<&CandidateHit> {
        self.hits.iter().min_by(|a, b| a.fraction.total_cmp(&b.fraction))
    }

    /// Whether any hit was kept.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }

    fn prefers(&self, a: &CandidateHit, b: &CandidateHit) -> bool {
        if a.fraction != b.fraction {
            return a.fraction < b.fraction;
        }
        let at = self.start.lerp(self.end, a.fraction);
        let (da, db) = (a.position.distance_squared(at), b.position.distance_squared(at));
        if da != db {
            return da < db;
        }
        let travel = (self.end - self.start).normalize_or_zero();
        a.normal.dot(-travel) > b.normal.dot(-travel)
    }
}

// =============================================================================
// Collision pass
// =============================================================================

/// Inputs of one collision pass.
#[derive(Debug, Clone, Copy)]
pub struct CollisionContext<'a> {
    /// The action entity
    pub action: EntityId,
    /// Launch record
    pub state: &'a ActionState,
    /// Definition
    pub definition: &'a ActionDefinition,
    /// Static tables
    pub definitions: &'a Definitions,
    /// Transform before this tick's motion
    pub from: Transform,
    /// Transform after this tick's motion
    pub to: Transform,
    /// Action-clock time of this advance
    pub elapsed: Time,
}

/// What a collision pass produced.
#[derive(Debug, Clone, Default)]
pub struct CollisionOutcome {
    /// Damage, impact and hit outputs
    pub outputs: Vec<Output>,
    /// The destroying hit of a destroy-on-hit action
    pub destroy_hit: Option<CandidateHit>,
    /// At least one damage output was produced
    pub damaged: bool,
    /// The ledger gained or advanced an entry
    pub ledger_changed: bool,
}

/// Run the collision pass and record counted hits in `ledger`.
pub fn collide(
    ctx: &CollisionContext<'_>,
    view: &WorldView<'_>,
    ledger: &mut HitLedger,
) -> CollisionOutcome {
    let mut outcome = CollisionOutcome::default();
    let Some(collider) = ctx.state.collider else {
        return outcome;
    };
    let Some(shape) = ctx.definitions.collider(collider) else {
        tracing::warn!(action = %ctx.action, collider, "unknown collider, collision skipped");
        return outcome;
    };
    let shape = shape.scaled(ctx.state.info.scale);
    let def = ctx.definition;
    let filter = CollisionFilter::query(def.damage_mask);
    let closest_only = def.flags.contains(crate::definition::ActionFlags::DESTROY_ON_HIT);

    let start = ctx.from.position;
    let end = ctx.to.position;
    let mut collector = HitCollector::new(closest_only, start, end);
    let collision = view.collision();

    if (end - start).length_squared() > EPSILON {
        let input = ColliderCastInput::new(shape, start, end)
            .with_orientation(ctx.to.rotation)
            .with_filter(filter);
        for hit in collision.cast_collider(&input) {
            let entity = EntityId::new(hit.entity);
            let relation = relation(view, ctx.state, entity);
            if !def.hit_type.intersects(relation) {
                continue;
            }
            collector.add(CandidateHit {
                entity,
                fraction: hit.fraction,
                position: hit.position,
                normal: hit.normal,
                relation,
            });
        }
    } else {
        overlap(&mut collector, view, ctx, shape, end, filter);
    }

    if closest_only {
        outcome.destroy_hit = collector.closest().copied();
    } else if ctx.state.info.splash_distance > EPSILON {
        if let Some(&impact) = collector.closest() {
            splash(&mut collector, view, ctx, impact, filter);
        }
    }

    for hit in collector.hits() {
        if !def.damage_type.intersects(hit.relation) {
            continue;
        }
        let counted = ledger.record(
            hit.entity,
            ctx.elapsed,
            ctx.state.info.interval,
            ctx.state.info.value,
        );
        if counted.count == 0 {
            continue;
        }
        trace!(
            action = %ctx.action,
            target = %hit.entity,
            count = counted.count,
            total = counted.total,
            "hit counted"
        );
        outcome.ledger_changed = true;
        outcome.damaged = true;

        outcome.outputs.push(
            Modifier::Damage(Box::new(DamageHit {
                attacker: ctx.state.owner,
                action: ctx.action,
                action_index: ctx.state.action_index,
                version: ctx.state.version,
                target: hit.entity,
                count: counted.count,
                position: hit.position,
                normal: hit.normal,
                ledger_total: counted.total,
                ledger_delta: counted.delta,
                attack: ctx.state.attack.clone(),
            }))
            .into(),
        );
        outcome.outputs.push(
            Event::ActionHit {
                action: ctx.action,
                owner: ctx.state.owner,
                target: hit.entity,
                position: hit.position,
                normal: hit.normal,
                count: counted.count,
            }
            .into(),
        );

        let force = ctx.state.info.impact_force;
        let has_mass = view.get_motion(hit.entity).is_some_and(|m| m.inverse_mass > 0.0);
        if force > 0.0 && has_mass {
            let travel = (end - start).normalize_or_zero();
            let direction = if travel == Vec3::ZERO { -hit.normal } else { travel };
            outcome.outputs.push(
                Modifier::Impact {
                    target: hit.entity,
                    direction,
                    force,
                    source: ctx.action,
                }
                .into(),
            );
        }
    }

    outcome
}

fn overlap(
    collector: &mut HitCollector,
    view: &WorldView<'_>,
    ctx: &CollisionContext<'_>,
    shape: Shape,
    position: Vec3,
    filter: CollisionFilter,
) {
    let input = DistanceInput::new(shape, position, 0.0)
        .with_orientation(ctx.to.rotation)
        .with_filter(filter);
    for hit in view.collision().calculate_distance(&input) {
        let entity = EntityId::new(hit.entity);
        let relation = relation(view, ctx.state, entity);
        if !ctx.definition.hit_type.intersects(relation) {
            continue;
        }
        collector.add(CandidateHit {
            entity,
            fraction: 0.0,
            position: hit.position,
            normal: hit.normal,
            relation,
        });
    }
}

fn splash(
    collector: &mut HitCollector,
    view: &WorldView<'_>,
    ctx: &CollisionContext<'_>,
    impact: CandidateHit,
    filter: CollisionFilter,
) {
    let input = DistanceInput::new(
        Shape::sphere(ctx.state.info.splash_distance),
        impact.position,
        0.0,
    )
    .with_filter(filter);
    for hit in view.collision().calculate_distance(&input) {
        let entity = EntityId::new(hit.entity);
        if collector.hits().iter().any(|h| h.entity == entity) {
            continue;
        }
        let relation = relation(view, ctx.state, entity);
        if !ctx.definition.hit_type.intersects(relation) {
            continue;
        }
        collector.add(CandidateHit {
            entity,
            fraction: impact.fraction,
            position: hit.position,
            normal: hit.normal,
            relation,
        });
    }
}

/// How `entity` relates to the action's owner.
#[must_use]
pub fn relation(view: &WorldView<'_>, state: &ActionState, entity: EntityId) -> TargetMask {
    if entity == state.owner {
        return TargetMask::SELF;
    }
    match view.get_entity(entity).map(crate::entity::Entity::tag) {
        Some(EntityTag::Actor) => {
            let camp = view.get_combat(entity).map_or(0, |c| c.camp);
            if camp == 0 || state.camp == 0 {
                TargetMask::NEUTRAL
            } else if camp == state.camp {
                TargetMask::ALLY
            } else {
                TargetMask::ENEMY
            }
        }
        _ => TargetMask::NEUTRAL,
    }
}
