//! Actor command layer.
//!
//! A pending [`ActorCommand`] is checked against the actor's state and,
//! once accepted, turned into an [`ActionLaunch`] with a solved aim.
//! Checks run in a fixed order so the first failing one names the
//! rejection.

pub mod aim;

use glam::Vec3;

use crate::action::{look_rotation, strip_axis, EPSILON};
use crate::config::SimConfig;
use crate::definition::{ActionDefinition, ActionFlags, AimModel, Definitions};
use crate::entity::{ActorCommand, CombatState, EntityId, LoadoutState, Transform};
use crate::error::CommandError;
use crate::output::ActionLaunch;
use crate::property::Aggregator;
use crate::rng::event_rng;
use crate::time::Time;

/// Check a command against an actor.
///
/// Order: version, slot, definition, status, busy window, cooldown, rage.
/// Returns the definition index and the definition on success.
///
/// # Errors
///
/// The first [`CommandError`] that applies.
pub fn validate<'d>(
    command: &ActorCommand,
    combat: &CombatState,
    loadout: &LoadoutState,
    definitions: &'d Definitions,
    now: Time,
) -> Result<(usize, &'d ActionDefinition), CommandError> {
    if command.version != combat.version {
        return Err(CommandError::StaleVersion {
            command: command.version,
            actor: combat.version,
        });
    }

    let slot = loadout
        .slots
        .get(command.slot)
        .ok_or(CommandError::UnknownSlot(command.slot))?;
    let definition = definitions
        .action(slot.action_index)
        .ok_or(CommandError::UnknownDefinition(slot.action_index))?;

    if !combat.status.can_act() {
        return Err(CommandError::Disabled);
    }

    let busy = loadout.actor_time;
    if now < busy.busy_until && definition.action_class & busy.action_mask == 0 {
        return Err(CommandError::Busy {
            until: busy.busy_until,
        });
    }

    if now < slot.cooldown_until {
        return Err(CommandError::Cooldown {
            slot: command.slot,
            ready_at: slot.cooldown_until,
        });
    }

    if combat.rage < definition.rage_cost {
        return Err(CommandError::InsufficientRage);
    }

    Ok((slot.action_index, definition))
}

/// Where the actor wants to shoot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AimTarget {
    /// Tracked entity, if any
    pub entity: Option<EntityId>,
    /// Point to aim at
    pub position: Vec3,
    /// Velocity of the tracked entity
    pub velocity: Vec3,
}

/// Everything needed to launch an accepted command.
#[derive(Debug, Clone, Copy)]
pub struct LaunchInput<'a> {
    /// Actor firing
    pub actor: EntityId,
    /// The accepted command
    pub command: &'a ActorCommand,
    /// Definition index
    pub action_index: usize,
    /// The definition
    pub definition: &'a ActionDefinition,
    /// Actor placement
    pub transform: &'a Transform,
    /// Actor combat state
    pub combat: &'a CombatState,
    /// Actor loadout
    pub loadout: &'a LoadoutState,
    /// Resolved aim, `None` to fire along the facing
    pub target: Option<AimTarget>,
}

/// Build the creation record for an accepted command.
#[must_use]
pub fn launch(
    input: &LaunchInput<'_>,
    definitions: &Definitions,
    config: &SimConfig,
    seed: u64,
    tick: u64,
    now: Time,
) -> ActionLaunch {
    let def = input.definition;
    let info = def
        .info
        .scaled(input.loadout.range_scale, input.loadout.distance_scale);
    let position = input.transform.transform_point(def.offset);

    let facing = input.transform.forward();
    let aim_point = input.target.map_or_else(
        || position + facing * info.distance.max(1.0),
        |t| t.position,
    );
    let velocity = input.target.map_or(Vec3::ZERO, |t| t.velocity);

    let direction = solve_direction(def, position, aim_point, velocity, facing, config);
    let direction = if def.max_yaw > 0.0 || def.max_pitch > 0.0 {
        aim::clamp_angles(
            direction,
            input.transform.rotation,
            def.max_yaw,
            def.max_pitch,
        )
    } else {
        direction
    };
    let rotation = look_rotation(direction).unwrap_or(input.transform.rotation);

    let mut rng = event_rng(seed, tick, input.actor, input.command.slot as u64);
    let aggregate = Aggregator::new(definitions, config.property_layout).aggregate(
        &input.combat.property_source(),
        now,
        &mut rng,
    );

    ActionLaunch {
        owner: input.actor,
        slot: input.command.slot,
        action_index: input.action_index,
        version: input.combat.version,
        camp: input.combat.camp,
        target: input.target.and_then(|t| t.entity),
        position,
        rotation,
        direction,
        target_position: aim_point,
        info,
        attack: aggregate.attack,
    }
}

fn solve_direction(
    def: &ActionDefinition,
    origin: Vec3,
    aim_point: Vec3,
    target_velocity: Vec3,
    facing: Vec3,
    config: &SimConfig,
) -> Vec3 {
    let straight = (aim_point - origin).try_normalize().unwrap_or(facing);
    let gravity = config.gravity;

    let direction = match def.aim {
        AimModel::Direct => straight,
        AimModel::Linear { speed } => {
            aim::linear_intercept(origin, aim_point, target_velocity, speed)
                .map_or(straight, |s| s.direction)
        }
        AimModel::Parabola { speed } if gravity.length_squared() > EPSILON => {
            aim::parabola_lead(origin, aim_point, target_velocity, speed, gravity)
                .map_or_else(|| aim::fallback_arc(origin, aim_point, gravity), |s| s.direction)
        }
        AimModel::Parabola { speed } => {
            aim::linear_intercept(origin, aim_point, target_velocity, speed)
                .map_or(straight, |s| s.direction)
        }
    };

    let grounded = def.flags.contains(ActionFlags::MOVE_IN_AIR)
        && !matches!(def.aim, AimModel::Parabola { .. });
    if !grounded {
        return direction;
    }
    let axis = config.gravity_axis();
    strip_axis(direction, axis)
        .try_normalize()
        .or_else(|| strip_axis(facing, axis).try_normalize())
        .unwrap_or(direction)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::ActionInfo;
    use crate::entity::SlotState;

    fn definitions() -> Definitions {
        let mut defs = Definitions::default();
        defs.actions.push(ActionDefinition {
            cooldown: Time::from_millis(500),
            rage_cost: 10.0,
            busy_time: Time::from_millis(300),
            action_class: 0b01,
            info: ActionInfo {
                distance: 10.0,
                ..ActionInfo::default()
            },
            ..ActionDefinition::default()
        });
        defs
    }

    fn actor() -> (CombatState, LoadoutState) {
        let combat = CombatState::default().with_rage(50.0);
        let loadout = LoadoutState::with_actions(&[0]);
        (combat, loadout)
    }

    mod validate_tests {
        use super::*;

        #[test]
        fn accepts_ready_slot() {
            let defs = definitions();
            let (combat, loadout) = actor();
            let (index, _) =
                validate(&ActorCommand::new(0, 0), &combat, &loadout, &defs, Time::ZERO).unwrap();
            assert_eq!(index, 0);
        }

        #[test]
        fn stale_version_is_checked_first() {
            let defs = definitions();
            let (mut combat, loadout) = actor();
            combat.version = 3;
            let err = validate(&ActorCommand::new(9, 1), &combat, &loadout, &defs, Time::ZERO)
                .unwrap_err();
            assert_eq!(err, CommandError::StaleVersion { command: 1, actor: 3 });
        }

        #[test]
        fn unknown_slot_and_definition() {
            let defs = definitions();
            let (combat, mut loadout) = actor();
            let err = validate(&ActorCommand::new(4, 0), &combat, &loadout, &defs, Time::ZERO)
                .unwrap_err();
            assert_eq!(err, CommandError::UnknownSlot(4));

            loadout.slots.push(SlotState::new(7));
            let err = validate(&ActorCommand::new(1, 0), &combat, &loadout, &defs, Time::ZERO)
                .unwrap_err();
            assert_eq!(err, CommandError::UnknownDefinition(7));
        }

        #[test]
        fn dead_actor_is_disabled() {
            let defs = definitions();
            let (mut combat, loadout) = actor();
            combat.status = crate::entity::ActorStatus::Dead;
            let err = validate(&ActorCommand::new(0, 0), &combat, &loadout, &defs, Time::ZERO)
                .unwrap_err();
            assert_eq!(err, CommandError::Disabled);
        }

        #[test]
        fn busy_window_respects_mask() {
            let defs = definitions();
            let (combat, mut loadout) = actor();
            loadout.actor_time.busy_until = Time::from_millis(200);
            let err = validate(&ActorCommand::new(0, 0), &combat, &loadout, &defs, Time::ZERO)
                .unwrap_err();
            assert_eq!(
                err,
                CommandError::Busy {
                    until: Time::from_millis(200)
                }
            );

            loadout.actor_time.action_mask = 0b01;
            assert!(
                validate(&ActorCommand::new(0, 0), &combat, &loadout, &defs, Time::ZERO).is_ok()
            );
        }

        #[test]
        fn cooldown_then_rage() {
            let defs = definitions();
            let (mut combat, mut loadout) = actor();
            loadout.slots[0].cooldown_until = Time::from_millis(500);
            let err = validate(
                &ActorCommand::new(0, 0),
                &combat,
                &loadout,
                &defs,
                Time::from_millis(100),
            )
            .unwrap_err();
            assert!(matches!(err, CommandError::Cooldown { slot: 0, .. }));

            combat.rage = 5.0;
            let err = validate(
                &ActorCommand::new(0, 0),
                &combat,
                &loadout,
                &defs,
                Time::from_millis(500),
            )
            .unwrap_err();
            assert_eq!(err, CommandError::InsufficientRage);
        }
    }

    mod launch_tests {
        use super::*;

        fn run(target: Option<AimTarget>, transform: &Transform) -> ActionLaunch {
            run_with(&definitions(), target, transform)
        }

        fn run_with(
            defs: &Definitions,
            target: Option<AimTarget>,
            transform: &Transform,
        ) -> ActionLaunch {
            let (combat, loadout) = actor();
            let command = ActorCommand::new(0, 0);
            let input = LaunchInput {
                actor: EntityId::new(1),
                command: &command,
                action_index: 0,
                definition: &defs.actions[0],
                transform,
                combat: &combat,
                loadout: &loadout,
                target,
            };
            launch(&input, defs, &SimConfig::default(), 7, 0, Time::ZERO)
        }

        #[test]
        fn no_target_fires_along_facing() {
            let transform = Transform::at_position(Vec3::ZERO);
            let l = run(None, &transform);
            assert!((l.direction - transform.forward()).length() < 1e-5);
            assert_eq!(l.target, None);
            assert_eq!(l.attack.len(), SimConfig::default().property_layout.count);
        }

        #[test]
        fn move_in_air_strips_height() {
            let mut defs = definitions();
            defs.actions[0].flags = ActionFlags::MOVE_IN_AIR;
            let transform = Transform::at_position(Vec3::ZERO);
            let target = AimTarget {
                entity: Some(EntityId::new(2)),
                position: Vec3::new(0.0, 3.0, 4.0),
                velocity: Vec3::ZERO,
            };
            let l = run_with(&defs, Some(target), &transform);
            assert!((l.direction - Vec3::Z).length() < 1e-5);
            assert_eq!(l.target, Some(EntityId::new(2)));
            assert_eq!(l.target_position, target.position);
        }

        #[test]
        fn launch_is_deterministic() {
            let transform = Transform::at_position(Vec3::new(1.0, 0.0, 1.0));
            assert_eq!(run(None, &transform), run(None, &transform));
        }
    }
}
