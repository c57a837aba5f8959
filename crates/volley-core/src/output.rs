//! Plugin and resolver outputs.
//!
//! Outputs are proposals. Plugins emit them from a frozen snapshot;
//! resolvers turn them into mutations of the next buffer, and may emit
//! follow-up outputs for resolvers later in the chain.
//!
//! - [`Command`]: direct state changes (create/update actions, breaks,
//!   actor-move effects)
//! - [`Modifier`]: value changes on a target (damage, impact)
//! - [`Event`]: notifications drained by the host
//!
//! Every output travels in an [`OutputEnvelope`] naming its source, trace
//! id, tick and sequence number.
//!
//! # Example
//!
//! ```
//! use glam::Vec3;
//! use volley_core::entity::EntityId;
//! use volley_core::output::{
//!     Command, Output, OutputEnvelope, OutputKind, PluginId, PluginInstanceId, TraceId,
//! };
//!
//! let command = Command::SetLocation {
//!     actor: EntityId::new(1),
//!     position: Vec3::new(0.0, 0.0, 4.0),
//! };
//!
//! let envelope = OutputEnvelope::new(
//!     Output::Command(command),
//!     PluginInstanceId::new(EntityId::new(7), PluginId::new("action")),
//!     TraceId::new(42),
//!     100,
//!     0,
//! );
//!
//! assert_eq!(envelope.kind(), OutputKind::Command);
//! assert_eq!(envelope.output().subject(), EntityId::new(1));
//! ```

use std::borrow::Cow;
use std::fmt;

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::action::{ActionStatus, HitLedger};
use crate::definition::ActionInfo;
use crate::entity::{EntityId, Transform};
use crate::error::CommandError;
use crate::property::PropertyVector;
use crate::time::Time;

// =============================================================================
// Identification
// =============================================================================

/// Unique plugin (or resolver) identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PluginId(Cow<'static, str>);

impl PluginId {
    /// Create from a runtime string.
    #[must_use]
    pub fn new(id: &str) -> Self {
        Self(Cow::Owned(id.to_string()))
    }

    /// Create from a static string without allocating.
    #[must_use]
    pub const fn from_static(id: &'static str) -> Self {
        Self(Cow::Borrowed(id))
    }

    /// The id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PluginId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for PluginId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// One plugin running on one entity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PluginInstanceId {
    entity_id: EntityId,
    plugin_id: PluginId,
}

impl PluginInstanceId {
    /// Create an instance id.
    #[must_use]
    pub fn new(entity_id: EntityId, plugin_id: PluginId) -> Self {
        Self {
            entity_id,
            plugin_id,
        }
    }

    /// Entity the plugin ran on.
    #[must_use]
    pub const fn entity_id(&self) -> EntityId {
        self.entity_id
    }

    /// Plugin id.
    #[must_use]
    pub fn plugin_id(&self) -> &PluginId {
        &self.plugin_id
    }
}

impl fmt::Display for PluginInstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.plugin_id, self.entity_id)
    }
}

/// Correlates outputs produced by one plugin run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TraceId(u64);

impl TraceId {
    /// Create a trace id.
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Raw value.
    #[must_use]
    pub const fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for TraceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "trace:{:016x}", self.0)
    }
}

// =============================================================================
// Payloads
// =============================================================================

/// Everything needed to create an action instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionLaunch {
    /// Owner actor
    pub owner: EntityId,
    /// Slot that fired it
    pub slot: usize,
    /// Definition index
    pub action_index: usize,
    /// Owner version the command was validated against
    pub version: u32,
    /// Owner camp
    pub camp: u32,
    /// Tracked target
    pub target: Option<EntityId>,
    /// Spawn position
    pub position: Vec3,
    /// Spawn rotation
    pub rotation: glam::Quat,
    /// Launch direction
    pub direction: Vec3,
    /// Aim point
    pub target_position: Vec3,
    /// Scaled timing block
    pub info: ActionInfo,
    /// Owner attack aggregate
    pub attack: PropertyVector,
}

/// One counted hit that may deal damage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DamageHit {
    /// Owner of the action
    pub attacker: EntityId,
    /// The action
    pub action: EntityId,
    /// Action definition index
    pub action_index: usize,
    /// Owner version the action belongs to
    pub version: u32,
    /// Hit target
    pub target: EntityId,
    /// Interval repetitions counted this tick
    pub count: u32,
    /// Contact point on the target
    pub position: Vec3,
    /// Contact normal, pointing from the target toward the action
    pub normal: Vec3,
    /// Ledger total for this target after the hit
    pub ledger_total: f32,
    /// Ledger increment of this hit
    pub ledger_delta: f32,
    /// Attack snapshot taken at creation
    pub attack: PropertyVector,
}

// =============================================================================
// Output Categories
// =============================================================================

/// Direct state change requests.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Command {
    /// Create an action from a validated actor command.
    CreateAction(Box<ActionLaunch>),
    /// Write back an action's advanced state; `None` fields are unchanged.
    UpdateAction {
        /// Action
        action: EntityId,
        /// New status
        status: Option<ActionStatus>,
        /// New transform
        transform: Option<Transform>,
        /// New velocity
        velocity: Option<Vec3>,
        /// Action-clock time of this advance
        elapsed: Time,
        /// New ledger
        ledger: Option<HitLedger>,
    },
    /// Break an actor's action chain. `hit == 0` is a silent cancel.
    Break {
        /// Actor to break
        actor: EntityId,
        /// Break magnitude
        hit: f32,
        /// Contact normal of the breaking hit
        normal: Vec3,
        /// Action that caused it
        source: Option<EntityId>,
    },
    /// Ignore impacts on an actor until `until`.
    SetUnstoppable {
        /// Actor
        actor: EntityId,
        /// Deadline
        until: Time,
    },
    /// Move an actor to a swept location.
    SetLocation {
        /// Actor
        actor: EntityId,
        /// Destination
        position: Vec3,
    },
}

impl Command {
    /// Entity the command acts on.
    #[must_use]
    pub fn subject(&self) -> EntityId {
        match self {
            Self::CreateAction(launch) => launch.owner,
            Self::UpdateAction { action, .. } => *action,
            Self::Break { actor, .. }
            | Self::SetUnstoppable { actor, .. }
            | Self::SetLocation { actor, .. } => *actor,
        }
    }
}

/// Value changes on a target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Modifier {
    /// A counted hit to be turned into damage.
    Damage(Box<DamageHit>),
    /// A velocity change scaled by the target's inverse mass.
    Impact {
        /// Target actor
        target: EntityId,
        /// Push direction
        direction: Vec3,
        /// Impulse magnitude
        force: f32,
        /// Action that caused it
        source: EntityId,
    },
}

impl Modifier {
    /// Entity being modified.
    #[must_use]
    pub fn target(&self) -> EntityId {
        match self {
            Self::Damage(hit) => hit.target,
            Self::Impact { target, .. } => *target,
        }
    }
}

/// Notifications for the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    /// An action ran its first advance.
    ActionCreated {
        /// Action
        action: EntityId,
        /// Owner
        owner: EntityId,
        /// Definition index
        action_index: usize,
    },
    /// An action's damage window opened.
    ActionInitialized {
        /// Action
        action: EntityId,
        /// Owner
        owner: EntityId,
        /// Action-clock time
        elapsed: Time,
        /// Transform at that moment
        transform: Transform,
    },
    /// An action counted a hit.
    ActionHit {
        /// Action
        action: EntityId,
        /// Owner
        owner: EntityId,
        /// Target
        target: EntityId,
        /// Contact point
        position: Vec3,
        /// Contact normal
        normal: Vec3,
        /// Interval repetitions
        count: u32,
    },
    /// An action was marked for removal.
    ActionDestroyed {
        /// Action
        action: EntityId,
        /// Owner
        owner: EntityId,
        /// Transform at that moment
        transform: Transform,
        /// Cancelled by a break rather than ending normally
        broken: bool,
    },
    /// A target took damage.
    Damaged {
        /// Attacker
        attacker: EntityId,
        /// Target
        target: EntityId,
        /// Action
        action: EntityId,
        /// Health removed
        hit: f32,
        /// Torpidity added
        torpor: f32,
        /// Contact point
        position: Vec3,
    },
    /// A target was picked up.
    Picked {
        /// Target
        target: EntityId,
        /// Picker
        by: EntityId,
    },
    /// An actor ran out of health.
    Died {
        /// Actor
        actor: EntityId,
        /// Who dealt the last damage
        killer: EntityId,
    },
    /// An actor was broken.
    Broken {
        /// Actor
        actor: EntityId,
        /// Break magnitude
        hit: f32,
        /// Chosen delay row, -1 for none
        delay_index: i32,
    },
    /// An actor command was refused.
    CommandRejected {
        /// Actor
        actor: EntityId,
        /// Slot
        slot: usize,
        /// Reason
        reason: CommandError,
    },
    /// A presentation effect was requested.
    EffectSpawned {
        /// Effect id
        effect: u32,
        /// Action whose table fired
        action: EntityId,
        /// World position
        position: Vec3,
    },
}

impl Event {
    /// The entity the event is mainly about.
    #[must_use]
    pub const fn primary_entity(&self) -> EntityId {
        match self {
            Self::ActionCreated { action, .. }
            | Self::ActionInitialized { action, .. }
            | Self::ActionHit { action, .. }
            | Self::ActionDestroyed { action, .. }
            | Self::EffectSpawned { action, .. } => *action,
            Self::Damaged { target, .. } | Self::Picked { target, .. } => *target,
            Self::Died { actor, .. }
            | Self::Broken { actor, .. }
            | Self::CommandRejected { actor, .. } => *actor,
        }
    }
}

// =============================================================================
// Top-Level Output Enum
// =============================================================================

/// Routing category of an output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OutputKind {
    /// [`Command`]
    Command,
    /// [`Modifier`]
    Modifier,
    /// [`Event`]
    Event,
}

impl fmt::Display for OutputKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Command => write!(f, "Command"),
            Self::Modifier => write!(f, "Modifier"),
            Self::Event => write!(f, "Event"),
        }
    }
}

/// Any output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Output {
    /// A command
    Command(Command),
    /// A modifier
    Modifier(Modifier),
    /// An event
    Event(Event),
}

impl Output {
    /// Routing category.
    #[must_use]
    pub const fn kind(&self) -> OutputKind {
        match self {
            Self::Command(_) => OutputKind::Command,
            Self::Modifier(_) => OutputKind::Modifier,
            Self::Event(_) => OutputKind::Event,
        }
    }

    /// The entity this output is about.
    #[must_use]
    pub fn subject(&self) -> EntityId {
        match self {
            Self::Command(c) => c.subject(),
            Self::Modifier(m) => m.target(),
            Self::Event(e) => e.primary_entity(),
        }
    }

    /// Command payload.
    #[must_use]
    pub const fn as_command(&self) -> Option<&Command> {
        match self {
            Self::Command(cmd) => Some(cmd),
            _ => None,
        }
    }

    /// Modifier payload.
    #[must_use]
    pub const fn as_modifier(&self) -> Option<&Modifier> {
        match self {
            Self::Modifier(m) => Some(m),
            _ => None,
        }
    }

    /// Event payload.
    #[must_use]
    pub const fn as_event(&self) -> Option<&Event> {
        match self {
            Self::Event(e) => Some(e),
            _ => None,
        }
    }
}

impl From<Command> for Output {
    fn from(cmd: Command) -> Self {
        Self::Command(cmd)
    }
}

impl From<Modifier> for Output {
    fn from(m: Modifier) -> Self {
        Self::Modifier(m)
    }
}

impl From<Event> for Output {
    fn from(e: Event) -> Self {
        Self::Event(e)
    }
}

// =============================================================================
// Output Envelope
// =============================================================================

/// An output with its provenance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputEnvelope {
    output: Output,
    source: PluginInstanceId,
    trace_id: TraceId,
    tick: u64,
    sequence: u32,
}

impl OutputEnvelope {
    /// Wrap an output.
    #[must_use]
    pub fn new(
        output: Output,
        source: PluginInstanceId,
        trace_id: TraceId,
        tick: u64,
        sequence: u32,
    ) -> Self {
        Self {
            output,
            source,
            trace_id,
            tick,
            sequence,
        }
    }

    /// The output.
    #[must_use]
    pub fn output(&self) -> &Output {
        &self.output
    }

    /// Unwrap the output.
    #[must_use]
    pub fn into_output(self) -> Output {
        self.output
    }

    /// Who emitted it.
    #[must_use]
    pub fn source(&self) -> &PluginInstanceId {
        &self.source
    }

    /// Trace id.
    #[must_use]
    pub const fn trace_id(&self) -> TraceId {
        self.trace_id
    }

    /// Tick it was emitted on.
    #[must_use]
    pub const fn tick(&self) -> u64 {
        self.tick
    }

    /// Position within the emitter's output list.
    #[must_use]
    pub const fn sequence(&self) -> u32 {
        self.sequence
    }

    /// Routing category.
    #[must_use]
    pub const fn kind(&self) -> OutputKind {
        self.output.kind()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    mod plugin_id_tests {
        use super::*;

        #[test]
        fn static_and_owned_are_equal() {
            const ID: PluginId = PluginId::from_static("action");
            assert_eq!(ID, PluginId::new("action"));
            assert_eq!(ID.as_str(), "action");
        }

        #[test]
        fn display_format() {
            let instance = PluginInstanceId::new(EntityId::new(3), PluginId::new("command"));
            assert_eq!(instance.to_string(), "command@3");
        }

        #[test]
        fn ordering_is_lexicographic() {
            assert!(PluginId::new("action") < PluginId::new("command"));
        }
    }

    mod output_tests {
        use super::*;

        #[test]
        fn kind_routing() {
            let cmd: Output = Command::SetUnstoppable {
                actor: EntityId::new(1),
                until: Time::from_millis(10),
            }
            .into();
            let modifier: Output = Modifier::Impact {
                target: EntityId::new(2),
                direction: Vec3::X,
                force: 1.0,
                source: EntityId::new(9),
            }
            .into();
            let event: Output = Event::Picked {
                target: EntityId::new(3),
                by: EntityId::new(1),
            }
            .into();

            assert_eq!(cmd.kind(), OutputKind::Command);
            assert_eq!(modifier.kind(), OutputKind::Modifier);
            assert_eq!(event.kind(), OutputKind::Event);
            assert!(cmd.as_command().is_some());
            assert!(modifier.as_event().is_none());
        }

        #[test]
        fn subjects() {
            let modifier: Output = Modifier::Impact {
                target: EntityId::new(2),
                direction: Vec3::X,
                force: 1.0,
                source: EntityId::new(9),
            }
            .into();
            assert_eq!(modifier.subject(), EntityId::new(2));

            let event: Output = Event::Broken {
                actor: EntityId::new(4),
                hit: 10.0,
                delay_index: -1,
            }
            .into();
            assert_eq!(event.subject(), EntityId::new(4));
        }

        #[test]
        fn envelope_serialization_roundtrip() {
            let envelope = OutputEnvelope::new(
                Output::Event(Event::CommandRejected {
                    actor: EntityId::new(1),
                    slot: 0,
                    reason: CommandError::InsufficientRage,
                }),
                PluginInstanceId::new(EntityId::new(1), PluginId::from_static("command")),
                TraceId::new(5),
                3,
                0,
            );
            let json = serde_json::to_string(&envelope).unwrap();
            let back: OutputEnvelope = serde_json::from_str(&json).unwrap();
            assert_eq!(envelope, back);
        }
    }
}
