//! Plugin trait and registry.
//!
//! Plugins are the read side of the tick. Each one declares the entity tags
//! it runs on and the components it reads, receives a [`WorldView`] scoped
//! to those components, and returns [`Output`]s. Plugins never mutate state,
//! so every plugin instance of a tick can run in parallel.
//!
//! # Declarations
//!
//! A [`PluginDeclaration`] is the contract between a plugin and the tick
//! loop:
//! - `required_tags`: entity tags the plugin may be registered for
//! - `reads`: components the [`WorldView`] will hand out
//! - `emits`: output kinds the plugin produces
//!
//! # Registration
//!
//! The [`PluginRegistry`] keeps one ordered bundle per [`EntityTag`]. The
//! position of a plugin in its bundle is part of its trace id, so hosts
//! must register in the same order on every run to stay deterministic.
//!
//! # Built-in Bundles
//!
//! [`PluginRegistry::default_bundles`] installs the command plugin on actors
//! and the action plugin on actions.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use volley_core::entity::EntityTag;
//! use volley_core::output::{Output, OutputKind};
//! use volley_core::plugin::{
//!     ComponentKind, Plugin, PluginContext, PluginDeclaration, PluginId, PluginRegistry,
//! };
//! use volley_core::world_view::WorldView;
//!
//! struct Idle {
//!     declaration: PluginDeclaration,
//! }
//!
//! impl Plugin for Idle {
//!     fn declaration(&self) -> &PluginDeclaration {
//!         &self.declaration
//!     }
//!
//!     fn run(&self, _ctx: &PluginContext<'_>, _view: &WorldView<'_>) -> Vec<Output> {
//!         Vec::new()
//!     }
//! }
//!
//! let mut registry = PluginRegistry::new();
//! registry.register(
//!     EntityTag::Actor,
//!     Arc::new(Idle {
//!         declaration: PluginDeclaration {
//!             id: PluginId::from_static("idle"),
//!             required_tags: vec![EntityTag::Actor],
//!             reads: vec![ComponentKind::Transform],
//!             emits: vec![OutputKind::Event],
//!         },
//!     }),
//! );
//! assert_eq!(registry.plugins_for(EntityTag::Actor).len(), 1);
//! ```

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::config::SimConfig;
use crate::definition::Definitions;
use crate::entity::{EntityId, EntityTag};
use crate::output::{Output, OutputKind, TraceId};
use crate::time::Time;
use crate::world_view::WorldView;

pub use crate::output::PluginId;

// =============================================================================
// Component Kind
// =============================================================================

/// Component categories a plugin may declare as read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ComponentKind {
    /// Placement of any entity
    Transform,
    /// Actor velocity and mass
    Motion,
    /// Actor combat state
    Combat,
    /// Actor slots and pending command
    Loadout,
    /// Collision bodies
    Body,
    /// Action runtime state
    Action,
}

impl fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Transform => "Transform",
            Self::Motion => "Motion",
            Self::Combat => "Combat",
            Self::Loadout => "Loadout",
            Self::Body => "Body",
            Self::Action => "Action",
        };
        f.write_str(name)
    }
}

// =============================================================================
// Plugin Declaration
// =============================================================================

/// What a plugin runs on, reads and emits.
#[derive(Debug, Clone)]
pub struct PluginDeclaration {
    /// Unique id
    pub id: PluginId,
    /// Tags the plugin runs on
    pub required_tags: Vec<EntityTag>,
    /// Components the plugin reads
    pub reads: Vec<ComponentKind>,
    /// Output kinds the plugin emits
    pub emits: Vec<OutputKind>,
}

impl PluginDeclaration {
    /// Whether the plugin runs on `tag`.
    #[must_use]
    pub fn supports_tag(&self, tag: EntityTag) -> bool {
        self.required_tags.contains(&tag)
    }

    /// Whether the plugin declared `kind`.
    #[must_use]
    pub fn reads_component(&self, kind: ComponentKind) -> bool {
        self.reads.contains(&kind)
    }
}

// =============================================================================
// Plugin Context
// =============================================================================

/// Per-run context handed to a plugin.
#[derive(Debug, Clone, Copy)]
pub struct PluginContext<'a> {
    /// Entity the plugin runs on
    pub entity_id: EntityId,
    /// Current tick
    pub tick: u64,
    /// Trace id of this run
    pub trace_id: TraceId,
    /// Simulation time at the start of the tick
    pub now: Time,
    /// Tick length
    pub dt: Time,
    /// Master seed
    pub seed: u64,
    /// Static tables
    pub definitions: &'a Definitions,
    /// Configuration
    pub config: &'a SimConfig,
}

// =============================================================================
// Plugin Trait
// =============================================================================

/// Read-only per-entity logic.
pub trait Plugin: Send + Sync {
    /// Static declaration.
    fn declaration(&self) -> &PluginDeclaration;

    /// Read the snapshot and propose changes.
    fn run(&self, ctx: &PluginContext<'_>, view: &WorldView<'_>) -> Vec<Output>;
}

// =============================================================================
// Plugin Registry
// =============================================================================

/// Plugin bundles keyed by entity tag.
#[derive(Default)]
pub struct PluginRegistry {
    bundles: HashMap<EntityTag, Vec<Arc<dyn Plugin>>>,
}

impl PluginRegistry {
    /// Empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            bundles: HashMap::new(),
        }
    }

    /// Add `plugin` to the bundle for `tag`.
    pub fn register(&mut self, tag: EntityTag, plugin: Arc<dyn Plugin>) {
        debug_assert!(
            plugin.declaration().supports_tag(tag),
            "plugin {} does not declare tag {tag}",
            plugin.declaration().id
        );
        self.bundles.entry(tag).or_default().push(plugin);
    }

    /// Plugins that run on `tag`, in registration order.
    #[must_use]
    pub fn plugins_for(&self, tag: EntityTag) -> &[Arc<dyn Plugin>] {
        self.bundles.get(&tag).map_or(&[], Vec::as_slice)
    }

    /// Total registrations across bundles.
    #[must_use]
    pub fn registration_count(&self) -> usize {
        self.bundles.values().map(Vec::len).sum()
    }

    /// Whether no plugin is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bundles.values().all(Vec::is_empty)
    }

    /// Remove every plugin.
    pub fn clear(&mut self) {
        self.bundles.clear();
    }

    /// The combat bundles: commands on actors, advance on actions.
    #[must_use]
    pub fn default_bundles() -> Self {
        use crate::plugins::{ActionPlugin, CommandPlugin};

        let mut registry = Self::new();
        registry.register(EntityTag::Actor, Arc::new(CommandPlugin::new()));
        registry.register(EntityTag::Action, Arc::new(ActionPlugin::new()));
        registry
    }
}

impl fmt::Debug for PluginRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginRegistry")
            .field("bundle_count", &self.bundles.len())
            .field("registration_count", &self.registration_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Nop {
        declaration: PluginDeclaration,
    }

    impl Plugin for Nop {
        fn declaration(&self) -> &PluginDeclaration {
            &self.declaration
        }

        fn run(&self, _ctx: &PluginContext<'_>, _view: &WorldView<'_>) -> Vec<Output> {
            Vec::new()
        }
    }

    fn nop(tags: Vec<EntityTag>) -> Arc<dyn Plugin> {
        Arc::new(Nop {
            declaration: PluginDeclaration {
                id: PluginId::from_static("nop"),
                required_tags: tags,
                reads: vec![ComponentKind::Transform],
                emits: vec![],
            },
        })
    }

    #[test]
    fn registry_groups_by_tag() {
        let mut registry = PluginRegistry::new();
        assert!(registry.is_empty());
        registry.register(EntityTag::Actor, nop(vec![EntityTag::Actor, EntityTag::Action]));
        registry.register(EntityTag::Action, nop(vec![EntityTag::Actor, EntityTag::Action]));
        assert_eq!(registry.plugins_for(EntityTag::Actor).len(), 1);
        assert_eq!(registry.plugins_for(EntityTag::Obstacle).len(), 0);
        assert_eq!(registry.registration_count(), 2);
        registry.clear();
        assert!(registry.is_empty());
    }

    #[test]
    fn default_bundles_cover_actors_and_actions() {
        let registry = PluginRegistry::default_bundles();
        assert_eq!(registry.plugins_for(EntityTag::Actor).len(), 1);
        assert_eq!(registry.plugins_for(EntityTag::Action).len(), 1);
        assert!(registry.plugins_for(EntityTag::Obstacle).is_empty());
    }

    #[test]
    fn declaration_queries() {
        let plugin = nop(vec![EntityTag::Actor]);
        let decl = plugin.declaration();
        assert!(decl.supports_tag(EntityTag::Actor));
        assert!(!decl.supports_tag(EntityTag::Obstacle));
        assert!(decl.reads_component(ComponentKind::Transform));
        assert!(!decl.reads_component(ComponentKind::Combat));
    }

    #[test]
    fn component_kind_display() {
        assert_eq!(ComponentKind::Loadout.to_string(), "Loadout");
    }
}
