//! Error types.
//!
//! Errors only surface at the edges: loading definitions and configuration,
//! validating commands, and pushing into a full queue. Inside a tick,
//! per-entity failures are logged and skipped.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::time::Time;

/// Authored definition tables failed to load or validate.
#[derive(Debug, Error)]
pub enum DefinitionError {
    /// JSON could not be parsed.
    #[error("failed to parse definitions: {0}")]
    Parse(#[from] serde_json::Error),

    /// An action references a collider that does not exist.
    #[error("action {action} references missing collider {collider}")]
    MissingCollider {
        /// Action index
        action: usize,
        /// Collider index
        collider: usize,
    },

    /// An action references a spawn table that does not exist.
    #[error("action {action} references missing spawn table {table}")]
    MissingSpawnTable {
        /// Action index
        action: usize,
        /// Spawn table index
        table: usize,
    },

    /// A spawn entry references an action that does not exist.
    #[error("spawn table {table} references missing action {action}")]
    MissingSpawnAction {
        /// Spawn table index
        table: usize,
        /// Action index
        action: usize,
    },

    /// A property vector has the wrong number of channels.
    #[error("{what} has {found} property channels, expected {expected}")]
    PropertyLength {
        /// Which table entry
        what: String,
        /// Configured channel count
        expected: usize,
        /// Authored channel count
        found: usize,
    },

    /// A time field is negative.
    #[error("action {action} has negative {field}: {value}")]
    NegativeTime {
        /// Action index
        action: usize,
        /// Field name
        field: &'static str,
        /// Offending value
        value: Time,
    },

    /// A collider shape is malformed.
    #[error("collider {collider} is invalid: {source}")]
    InvalidCollider {
        /// Collider index
        collider: usize,
        /// Underlying shape error
        #[source]
        source: sweep::CollisionError,
    },

    /// A curve's sample points are not sorted by `x`.
    #[error("curve {name} has unsorted points")]
    UnsortedCurve {
        /// Curve name
        name: &'static str,
    },
}

/// Simulation configuration failed to load or validate.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// JSON could not be parsed.
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    /// A field has an unusable value.
    #[error("invalid config field {field}: {reason}")]
    Invalid {
        /// Field name
        field: &'static str,
        /// What is wrong
        reason: String,
    },
}

/// Why an actor command did not fire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum CommandError {
    /// The slot is cooling down.
    #[error("slot {slot} is cooling down until {ready_at}")]
    Cooldown {
        /// Slot index
        slot: usize,
        /// When the slot becomes available
        ready_at: Time,
    },

    /// Not enough rage to pay the cost.
    #[error("insufficient rage")]
    InsufficientRage,

    /// Another action is running and does not permit this class.
    #[error("actor is busy until {until}")]
    Busy {
        /// End of the busy window
        until: Time,
    },

    /// The actor cannot act in its current status.
    #[error("actor is disabled")]
    Disabled,

    /// The slot does not exist on this actor.
    #[error("unknown slot {0}")]
    UnknownSlot(usize),

    /// The slot points at a definition that does not exist.
    #[error("unknown action definition {0}")]
    UnknownDefinition(usize),

    /// The command was issued against an older actor version.
    #[error("stale command version {command}, actor is at {actor}")]
    StaleVersion {
        /// Version carried by the command
        command: u32,
        /// Current actor version
        actor: u32,
    },
}

/// Append-only queue errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum QueueError {
    /// Capacity reserved for this phase is exhausted.
    #[error("queue is full (capacity {capacity})")]
    Full {
        /// Reserved capacity
        capacity: usize,
    },
}
