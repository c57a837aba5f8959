//! # Volley Core
//!
//! Deterministic combat-action resolution for an entity simulation.
//!
//! Actors fire actions (projectiles, melee swings, area effects). Each tick
//! an action moves, sweeps its collider through the collision world,
//! classifies what it touched, and emits damage, impact, spawn and
//! lifecycle outputs. Resolvers turn those outputs into health, rage and
//! torpidity changes, knockback, interrupts and child actions.
//!
//! ## Architecture
//!
//! Entity-Plugin-Resolver over a double-buffered [`Arena`]:
//!
//! - **Entities**: actors, actions, static obstacles
//! - **Plugins**: the command plugin validates and aims actor commands, the
//!   action plugin advances actions
//! - **Resolvers**: action lifecycle, damage, interrupt, motion, spawn,
//!   event log
//!
//! ## Usage
//!
//! ```
//! use glam::Vec3;
//! use volley_core::{ActorComponents, Definitions, EntityInner, EntityTag, SimConfig, Simulation};
//!
//! let mut sim = Simulation::new(7, Definitions::default(), SimConfig::default());
//! sim.arena_mut().spawn(
//!     EntityTag::Actor,
//!     EntityInner::Actor(ActorComponents::at_position(Vec3::ZERO)),
//! );
//! sim.step();
//! assert_eq!(sim.tick(), 1);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub use sweep;

// Leaf modules
pub mod config;
pub mod definition;
pub mod error;
pub mod property;
pub mod queue;
pub mod rng;
pub mod spawner;
pub mod time;

// State
pub mod arena;
pub mod entity;
pub mod output;

// Behaviour
pub mod action;
pub mod command;
pub mod plugin;
pub mod plugins;
pub mod resolver;
pub mod simulation;
pub mod world_view;

pub use arena::Arena;
pub use config::SimConfig;
pub use definition::Definitions;
pub use entity::{ActorCommand, ActorComponents, EntityId, EntityInner, EntityTag};
pub use error::{CommandError, ConfigError, DefinitionError};
pub use output::{Command, Event, Modifier, Output, OutputEnvelope};
pub use simulation::Simulation;
pub use time::Time;

#[cfg(test)]
mod tests;
