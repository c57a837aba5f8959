//! The per-tick action state machine.
//!
//! One call advances one action from the frozen snapshot and returns its
//! outputs. The steps run in a fixed order:
//!
//! 1. destroyed actions are skipped; stale ones (owner gone or owner
//!    version moved on) are destroyed
//! 2. an action that expired last tick is destroyed
//! 3. the first advance sets `CREATED`
//! 4. lifetime: `elapsed = min(now, max_time) - time`, `DESTROIED` once
//!    `max_time <= now`, `PERFORM` once `elapsed >= perform_time`
//! 5. actor-follow window: unstoppable deadline and location sweep
//! 6. damage window: motion, then collision
//! 7. a destroy-on-hit action that hit something is destroyed at the hit
//! 8. an owner outside the definition's status mask cancels the action
//! 9. changed fields are written back in one update

use glam::Vec3;
use sweep::{ColliderCastInput, CollisionFilter};
use tracing::trace;

use crate::definition::{ActionDefinition, ActionFlags};
use crate::entity::{ActionComponents, CombatState, EntityId, Transform};
use crate::output::{Command, Event, Output};
use crate::plugin::PluginContext;
use crate::time::Time;
use crate::world_view::WorldView;

use super::collision::{self, CollisionContext};
use super::motion::{self, MotionInput};
use super::status::ActionStatus;
use super::{strip_axis, EPSILON};

/// Advance the action `ctx.entity_id` by one tick.
#[must_use]
pub fn advance(ctx: &PluginContext<'_>, view: &WorldView<'_>) -> Vec<Output> {
    let id = ctx.entity_id;
    let Some(action) = view.get_action(id) else {
        return Vec::new();
    };
    if action.status.contains(ActionStatus::DESTROY) {
        return Vec::new();
    }

    let state = &action.state;
    let owner = view
        .get_combat(state.owner)
        .filter(|combat| combat.version == state.version);
    let definition = ctx.definitions.action(state.action_index);

    let (Some(owner), Some(def)) = (owner, definition) else {
        if definition.is_none() {
            tracing::warn!(action = %id, index = state.action_index, "unknown action definition");
        } else {
            trace!(action = %id, owner = %state.owner, "stale action dropped");
        }
        return destroy_now(id, action, false);
    };

    if action.status.contains(ActionStatus::DESTROIED) {
        return destroy_now(id, action, false);
    }

    Advance {
        ctx,
        view,
        id,
        action,
        def,
        owner,
        status: action.status,
        transform: action.transform,
        velocity: action.velocity,
        elapsed: action.elapsed,
        ledger: None,
        outputs: Vec::new(),
    }
    .run()
}

fn destroy_now(id: EntityId, action: &ActionComponents, broken: bool) -> Vec<Output> {
    let mut status = action.status;
    status.insert(ActionStatus::CREATED);
    status.advance(ActionStatus::DESTROY);
    vec![
        Command::UpdateAction {
            action: id,
            status: Some(status),
            transform: None,
            velocity: None,
            elapsed: action.elapsed,
            ledger: None,
        }
        .into(),
        Event::ActionDestroyed {
            action: id,
            owner: action.state.owner,
            transform: action.transform,
            broken,
        }
        .into(),
    ]
}

struct Advance<'a, 'v> {
    ctx: &'a PluginContext<'a>,
    view: &'a WorldView<'v>,
    id: EntityId,
    action: &'a ActionComponents,
    def: &'a ActionDefinition,
    owner: &'a CombatState,
    status: ActionStatus,
    transform: Transform,
    velocity: Vec3,
    elapsed: Time,
    ledger: Option<crate::action::HitLedger>,
    outputs: Vec<Output>,
}

impl Advance<'_, '_> {
    fn run(mut self) -> Vec<Output> {
        let action = self.action;
        let state = &action.state;
        let info = state.info;

        if !self.status.contains(ActionStatus::CREATED) {
            self.status.advance(ActionStatus::CREATED);
            self.outputs.push(
                Event::ActionCreated {
                    action: self.id,
                    owner: state.owner,
                    action_index: state.action_index,
                }
                .into(),
            );
        }

        let now = self.ctx.now;
        let max_time = state.max_time();
        let previous = action.elapsed;
        self.elapsed = now.min(max_time) - state.time;
        let expired = max_time <= now;
        if expired {
            self.status.advance(ActionStatus::DESTROIED);
        }
        if self.elapsed >= info.perform_time {
            self.status.advance(ActionStatus::PERFORM);
        }

        if !expired {
            self.actor_follow(previous);
        }

        let window_open =
            !expired && info.damage_time <= self.elapsed && self.elapsed < info.damage_end();
        if window_open {
            self.damage_window(previous);
        }

        if !self.status.contains(ActionStatus::DESTROY) {
            self.external_break();
        }

        self.write_back();
        self.outputs
    }

    fn actor_follow(&mut self, previous: Time) {
        let action = self.action;
        let info = &action.state.info;
        if !info.actor_move_duration.is_positive() {
            return;
        }
        let start = info.actor_move_start_time;
        let end = start + info.actor_move_duration;
        if self.elapsed < start || previous > end {
            return;
        }
        let owner = action.state.owner;

        if self.def.flags.contains(ActionFlags::ACTOR_UNSTOPPABLE) {
            self.outputs.push(
                Command::SetUnstoppable {
                    actor: owner,
                    until: action.state.time + end,
                }
                .into(),
            );
        }

        if self.def.flags.contains(ActionFlags::ACTOR_LOCATION) {
            if let Some(position) = self.sweep_location(previous.max(start), end) {
                self.outputs
                    .push(Command::SetLocation { actor: owner, position }.into());
            }
        }
    }

    /// Sweep the owner's body toward its follow destination for this tick's
    /// share of the remaining window, stopping at the first thing in the way.
    fn sweep_location(&self, from_elapsed: Time, end: Time) -> Option<Vec3> {
        let state = &self.action.state;
        let owner = self.view.get_transform(state.owner)?;
        let body = self.view.get_body(state.owner)?;

        let destination = state
            .target
            .and_then(|target| self.view.get_transform(target))
            .map_or_else(
                || owner.position + owner.forward() * state.info.distance,
                |t| t.position,
            );
        let mut delta = destination - owner.position;
        if self.def.flags.contains(ActionFlags::MOVE_IN_AIR) {
            delta = strip_axis(delta, self.ctx.config.gravity_axis());
        }

        let remaining = end - from_elapsed;
        let share = if remaining.is_positive() {
            (self.ctx.dt.as_secs_f32() / remaining.as_secs_f32()).min(1.0)
        } else {
            1.0
        };
        let target_position = owner.position + delta * share;
        if (target_position - owner.position).length_squared() <= EPSILON {
            return None;
        }

        let input = ColliderCastInput::new(body.shape, owner.position, target_position)
            .with_orientation(owner.rotation)
            .with_filter(CollisionFilter::query(u32::MAX));
        let blocked = self
            .view
            .collision()
            .cast_collider(&input)
            .into_iter()
            .find(|hit| hit.entity != state.owner.as_u64());

        Some(blocked.map_or(target_position, |hit| input.point_at(hit.fraction)))
    }

    fn damage_window(&mut self, previous: Time) {
        let action = self.action;
        let state = &action.state;

        if !self.status.contains(ActionStatus::DAMAGE) {
            self.status.advance(ActionStatus::PERFORM);
            self.status.advance(ActionStatus::DAMAGE);
            self.outputs.push(
                Event::ActionInitialized {
                    action: self.id,
                    owner: state.owner,
                    elapsed: self.elapsed,
                    transform: self.transform,
                }
                .into(),
            );
        }

        let target_position = state
            .target
            .and_then(|target| self.view.get_transform(target))
            .map(|t| t.position);
        let target_body = state
            .target
            .and_then(|target| self.view.collision().rigid_body_index(target.as_u64()));
        let step = motion::step(
            &MotionInput {
                definition: self.def,
                state,
                transform: self.transform,
                velocity: self.velocity,
                owner: self.view.get_transform(state.owner),
                target_position,
                target_body,
            },
            self.view.collision(),
            self.ctx.dt,
            self.ctx.config,
        );

        let from = self.transform;
        self.transform = step.transform;
        self.velocity = step.velocity;

        let mut ledger = action.ledger.clone();
        let outcome = collision::collide(
            &CollisionContext {
                action: self.id,
                state,
                definition: self.def,
                definitions: self.ctx.definitions,
                from,
                to: step.transform,
                elapsed: self.elapsed,
            },
            self.view,
            &mut ledger,
        );
        self.outputs.extend(outcome.outputs);
        if outcome.ledger_changed {
            self.ledger = Some(ledger);
        }
        if outcome.damaged {
            self.status.advance(ActionStatus::DAMAGED);
        }

        if let Some(hit) = outcome.destroy_hit {
            let f = f64::from(hit.fraction.clamp(0.0, 1.0));
            let span = (self.elapsed - previous).as_secs_f64();
            self.elapsed = previous + Time::from_secs_f64(span * f);
            #[allow(clippy::cast_possible_truncation)]
            let position = from.position.lerp(step.transform.position, f as f32);
            self.transform = Transform::new(position, step.transform.rotation);
            self.status.advance(ActionStatus::DESTROY);
            trace!(action = %self.id, target = %hit.entity, "destroyed on hit");
            self.outputs.push(
                Event::ActionDestroyed {
                    action: self.id,
                    owner: state.owner,
                    transform: self.transform,
                    broken: false,
                }
                .into(),
            );
        }
    }

    fn external_break(&mut self) {
        let mask = self.def.actor_status_mask;
        if mask.is_empty() || mask.contains(self.owner.status.mask()) {
            return;
        }
        let action = self.action;
        let state = &action.state;
        self.status.advance(ActionStatus::DESTROY);
        self.status.advance(ActionStatus::BREAK);
        self.ledger = Some(crate::action::HitLedger::default());
        self.outputs.push(
            Command::Break {
                actor: state.owner,
                hit: 0.0,
                normal: Vec3::ZERO,
                source: Some(self.id),
            }
            .into(),
        );
        self.outputs.push(
            Event::ActionDestroyed {
                action: self.id,
                owner: state.owner,
                transform: self.transform,
                broken: true,
            }
            .into(),
        );
    }

    fn write_back(&mut self) {
        let action = self.action;
        let status = (self.status != action.status).then_some(self.status);
        let transform = (self.transform != action.transform).then_some(self.transform);
        let velocity = (self.velocity != action.velocity).then_some(self.velocity);
        let ledger = self.ledger.take();

        if status.is_none()
            && transform.is_none()
            && velocity.is_none()
            && ledger.is_none()
            && self.elapsed == action.elapsed
        {
            return;
        }
        self.outputs.push(
            Command::UpdateAction {
                action: self.id,
                status,
                transform,
                velocity,
                elapsed: self.elapsed,
                ledger,
            }
            .into(),
        );
    }
}
