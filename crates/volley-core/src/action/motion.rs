//! Action motion: velocity integration and tracking.
//!
//! Straight movers fly along their launch direction at the definition's
//! move speed; gravity movers integrate the configured gravity instead.
//! Tracking then decides where the action actually ends up this tick:
//!
//! | Mode | Position |
//! |------|----------|
//! | `None` | integrated velocity |
//! | `Destination` | homes toward the live target, clamped to `info.distance` from the spawn point |
//! | `Source` | owner transform plus the definition offset |
//! | `All` | halfway between the owner anchor and the destination, clamped to `info.distance` |

use glam::{EulerRot, Quat, Vec3};
use sweep::CollisionWorld;

use crate::config::SimConfig;
use crate::definition::{ActionDefinition, ActionFlags, TrackingMode};
use crate::entity::{ActionState, Transform};
use crate::time::Time;

use super::{strip_axis, EPSILON};

/// Rotation whose local +Z points along `direction`, with no roll.
///
/// Returns `None` for a zero-length direction.
#[must_use]
pub fn look_rotation(direction: Vec3) -> Option<Quat> {
    let dir = direction.try_normalize()?;
    let yaw = dir.x.atan2(dir.z);
    let pitch = -dir.y.clamp(-1.0, 1.0).asin();
    Some(Quat::from_euler(EulerRot::YXZ, yaw, pitch, 0.0))
}

/// Everything one motion step reads.
#[derive(Debug, Clone, Copy)]
pub struct MotionInput<'a> {
    /// Action definition
    pub definition: &'a ActionDefinition,
    /// Launch record
    pub state: &'a ActionState,
    /// Transform before the step
    pub transform: Transform,
    /// Velocity before the step
    pub velocity: Vec3,
    /// Live owner transform
    pub owner: Option<&'a Transform>,
    /// Live target position
    pub target_position: Option<Vec3>,
    /// Collision body index of the target, for surface snapping
    pub target_body: Option<usize>,
}

/// Result of one motion step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotionStep {
    /// Transform after the step
    pub transform: Transform,
    /// Velocity after the step
    pub velocity: Vec3,
}

/// Advance an action's transform by `dt`.
#[must_use]
pub fn step(
    input: &MotionInput<'_>,
    collision: &dyn CollisionWorld,
    dt: Time,
    config: &SimConfig,
) -> MotionStep {
    let def = input.definition;
    let secs = dt.as_secs_f32();
    let from = input.transform.position;
    let flight = flight_velocity(input, secs, config);
    let integrated = from + flight * secs;

    let (position, forced_rotation) = match def.tracking {
        TrackingMode::None => (integrated, None),
        TrackingMode::Destination => {
            let goal = destination(input, collision);
            let reach = def.move_speed * secs;
            let to_goal = goal - from;
            let moved = if to_goal.length() <= reach {
                goal
            } else {
                from + to_goal.normalize_or_zero() * reach
            };
            (
                clamp_reach(moved, input.state.position, input.state.info.distance),
                None,
            )
        }
        TrackingMode::Source => match input.owner {
            Some(owner) => (owner.transform_point(def.offset), Some(owner.rotation)),
            None => (integrated, None),
        },
        TrackingMode::All => match input.owner {
            Some(owner) => {
                let anchor = owner.transform_point(def.offset);
                let goal = destination(input, collision);
                (
                    clamp_reach(anchor.lerp(goal, 0.5), anchor, input.state.info.distance),
                    Some(owner.rotation),
                )
            }
            None => (integrated, None),
        },
    };

    let velocity = if def.tracking == TrackingMode::None || secs <= EPSILON {
        flight
    } else {
        (position - from) / secs
    };

    let rotation = forced_rotation
        .or_else(|| look_rotation(velocity))
        .unwrap_or(input.transform.rotation);

    MotionStep {
        transform: Transform::new(position, rotation),
        velocity,
    }
}

fn flight_velocity(input: &MotionInput<'_>, secs: f32, config: &SimConfig) -> Vec3 {
    let def = input.definition;
    let axis = config.gravity_axis();
    let in_air = def.flags.contains(ActionFlags::MOVE_IN_AIR);

    if def.flags.contains(ActionFlags::USE_GRAVITY) {
        let v = input.velocity + config.gravity * secs;
        if in_air {
            strip_axis(v, axis)
        } else {
            v
        }
    } else {
        let mut dir = input.state.direction;
        if in_air {
            dir = strip_axis(dir, axis).normalize_or_zero();
        }
        dir * def.move_speed
    }
}

fn destination(input: &MotionInput<'_>, collision: &dyn CollisionWorld) -> Vec3 {
    let Some(live) = input.target_position else {
        return input.state.target_position;
    };
    if !input.definition.flags.contains(ActionFlags::SNAP_TO_SURFACE) {
        return live;
    }
    input
        .target_body
        .and_then(|index| collision.point_distance(index, input.transform.position))
        .map_or(live, |hit| hit.position)
}

fn clamp_reach(position: Vec3, origin: Vec3, distance: f32) -> Vec3 {
    if distance > EPSILON {
        origin + (position - origin).clamp_length_max(distance)
    } else {
        position
    }
}
