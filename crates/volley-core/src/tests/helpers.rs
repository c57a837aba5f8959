//! Scenario setup for whole-simulation tests.

use std::sync::Arc;

use glam::Vec3;
use sweep::Shape;

use crate::config::SimConfig;
use crate::definition::{ActionDefinition, ActionInfo, ColliderDefinition, Definitions};
use crate::entity::{
    ActionComponents, ActorComponents, CombatState, EntityId, EntityInner, EntityTag, LoadoutState,
};
use crate::output::{Command, Event, Output, OutputEnvelope, OutputKind, PluginId};
use crate::plugin::{ComponentKind, Plugin, PluginContext, PluginDeclaration};
use crate::simulation::Simulation;
use crate::time::Time;
use crate::world_view::WorldView;

/// Tick length used by every scenario.
pub const TICK: Time = Time::from_millis(50);

/// Collider 0: a wide sphere for overlap strikes.
pub const STRIKE_COLLIDER: usize = 0;

/// Collider 1: a small projectile sphere.
pub const BOLT_COLLIDER: usize = 1;

/// Config with a 50 ms tick and no knockback damping.
pub fn config() -> SimConfig {
    SimConfig::default()
        .with_tick_length(TICK)
        .with_knockback_damping(0.0)
}

/// Tables with the two standard colliders and `actions`.
pub fn definitions(actions: Vec<ActionDefinition>) -> Definitions {
    Definitions {
        actions,
        colliders: vec![
            ColliderDefinition {
                shape: Shape::sphere(2.0),
            },
            ColliderDefinition {
                shape: Shape::sphere(0.3),
            },
        ],
        ..Definitions::default()
    }
}

/// Stationary strike: window 0.1 s + 0.5 s, re-hits every 0.2 s, gone at
/// 0.5 s, 10 damage per hit.
pub fn strike() -> ActionDefinition {
    ActionDefinition {
        name: "strike".into(),
        collider: Some(STRIKE_COLLIDER),
        info: ActionInfo {
            damage_time: Time::from_millis(100),
            duration: Time::from_millis(500),
            destroy_time: Time::from_millis(500),
            interval: Time::from_millis(200),
            value: 10.0,
            ..ActionInfo::default()
        },
        attack: vec![10.0],
        ..ActionDefinition::default()
    }
}

/// Straight projectile at 20 m/s, live for one second.
pub fn bolt() -> ActionDefinition {
    ActionDefinition {
        name: "bolt".into(),
        collider: Some(BOLT_COLLIDER),
        move_speed: 20.0,
        info: ActionInfo {
            duration: Time::from_millis(1000),
            destroy_time: Time::from_millis(1000),
            value: 1.0,
            ..ActionInfo::default()
        },
        attack: vec![25.0],
        ..ActionDefinition::default()
    }
}

/// Route `tracing` output to the test harness. Safe to call repeatedly.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

/// Simulation over `defs` with the scenario config.
pub fn simulation(seed: u64, defs: Definitions) -> Simulation {
    init_tracing();
    Simulation::new(seed, defs, config())
}

/// Spawn an actor in `camp` at `position`, slots firing `actions`.
pub fn spawn_fighter(sim: &mut Simulation, position: Vec3, camp: u32, actions: &[usize]) -> EntityId {
    let mut actor = ActorComponents::at_position(position);
    actor.combat = CombatState::default().with_camp(camp);
    actor.loadout = LoadoutState::with_actions(actions);
    sim.arena_mut()
        .spawn(EntityTag::Actor, EntityInner::Actor(actor))
}

/// Attacker at the origin facing +Z, defender 2 m ahead, opposite camps.
pub fn setup_duel(sim: &mut Simulation) -> (EntityId, EntityId) {
    let attacker = spawn_fighter(sim, Vec3::ZERO, 1, &[0]);
    let defender = spawn_fighter(sim, Vec3::new(0.0, 0.0, 2.0), 2, &[]);
    (attacker, defender)
}

/// Step `n` times.
pub fn run_ticks(sim: &mut Simulation, n: usize) {
    for _ in 0..n {
        sim.step();
    }
}

/// Health of `actor`.
pub fn health(sim: &Simulation, actor: EntityId) -> f32 {
    sim.arena().actor(actor).map_or(0.0, |a| a.combat.health)
}

/// Rage of `actor`.
pub fn rage(sim: &Simulation, actor: EntityId) -> f32 {
    sim.arena().actor(actor).map_or(0.0, |a| a.combat.rage)
}

/// Live actions owned by `owner`.
pub fn actions_of<'a>(sim: &'a Simulation, owner: EntityId) -> Vec<&'a ActionComponents> {
    sim.arena()
        .actions_owned_by(owner)
        .into_iter()
        .filter_map(|id| sim.arena().action(id))
        .collect()
}

/// Events of `envelopes` matching `pred`.
pub fn events_where(envelopes: &[OutputEnvelope], pred: impl Fn(&Event) -> bool) -> Vec<Event> {
    envelopes
        .iter()
        .filter_map(|e| e.output().as_event())
        .filter(|e| pred(e))
        .cloned()
        .collect()
}

/// Host plugin that breaks one actor on one tick.
pub struct BreakOnTick {
    declaration: PluginDeclaration,
    actor: EntityId,
    tick: u64,
    hit: f32,
}

impl BreakOnTick {
    /// Break `actor` with magnitude `hit` during `tick`.
    pub fn new(actor: EntityId, tick: u64, hit: f32) -> Arc<Self> {
        Arc::new(Self {
            declaration: PluginDeclaration {
                id: PluginId::new("break_on_tick"),
                required_tags: vec![EntityTag::Actor],
                reads: vec![ComponentKind::Combat],
                emits: vec![OutputKind::Command],
            },
            actor,
            tick,
            hit,
        })
    }
}

impl Plugin for BreakOnTick {
    fn declaration(&self) -> &PluginDeclaration {
        &self.declaration
    }

    fn run(&self, ctx: &PluginContext<'_>, _view: &WorldView<'_>) -> Vec<Output> {
        if ctx.entity_id != self.actor || ctx.tick != self.tick {
            return Vec::new();
        }
        vec![Output::Command(Command::Break {
            actor: self.actor,
            hit: self.hit,
            normal: Vec3::Z,
            source: None,
        })]
    }
}
