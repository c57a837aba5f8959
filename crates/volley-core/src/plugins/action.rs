//! Action advance plugin.

use crate::action;
use crate::entity::EntityTag;
use crate::output::{Output, OutputKind, PluginId};
use crate::plugin::{ComponentKind, Plugin, PluginContext, PluginDeclaration};
use crate::world_view::WorldView;

/// Runs the action state machine on every action entity.
///
/// ```
/// use volley_core::plugin::Plugin;
/// use volley_core::plugins::ActionPlugin;
///
/// let plugin = ActionPlugin::new();
/// assert_eq!(plugin.declaration().id.as_str(), "action");
/// ```
pub struct ActionPlugin {
    declaration: PluginDeclaration,
}

impl ActionPlugin {
    /// Create the plugin.
    #[must_use]
    pub fn new() -> Self {
        Self {
            declaration: PluginDeclaration {
                id: PluginId::from_static("action"),
                required_tags: vec![EntityTag::Action],
                reads: vec![
                    ComponentKind::Transform,
                    ComponentKind::Motion,
                    ComponentKind::Combat,
                    ComponentKind::Body,
                    ComponentKind::Action,
                ],
                emits: vec![OutputKind::Command, OutputKind::Modifier, OutputKind::Event],
            },
        }
    }
}

impl Default for ActionPlugin {
    fn default() -> Self {
        Self::new()
    }
}

impl Plugin for ActionPlugin {
    fn declaration(&self) -> &PluginDeclaration {
        &self.declaration
    }

    fn run(&self, ctx: &PluginContext<'_>, view: &WorldView<'_>) -> Vec<Output> {
        action::advance(ctx, view)
    }
}
