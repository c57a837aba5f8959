//! Actor command plugin.
//!
//! Reads the actor's pending command, validates it and proposes a
//! `CreateAction`. Rejections become `CommandRejected` events.

use tracing::debug;

use crate::command::{self, AimTarget, LaunchInput};
use crate::entity::EntityTag;
use crate::output::{Command, Event, Output, OutputKind, PluginId};
use crate::plugin::{ComponentKind, Plugin, PluginContext, PluginDeclaration};
use crate::world_view::WorldView;

/// Fires actor slots.
///
/// ```
/// use volley_core::plugin::Plugin;
/// use volley_core::plugins::CommandPlugin;
///
/// let plugin = CommandPlugin::new();
/// assert_eq!(plugin.declaration().id.as_str(), "command");
/// ```
pub struct CommandPlugin {
    declaration: PluginDeclaration,
}

impl CommandPlugin {
    /// Create the plugin.
    #[must_use]
    pub fn new() -> Self {
        Self {
            declaration: PluginDeclaration {
                id: PluginId::from_static("command"),
                required_tags: vec![EntityTag::Actor],
                reads: vec![
                    ComponentKind::Transform,
                    ComponentKind::Motion,
                    ComponentKind::Combat,
                    ComponentKind::Loadout,
                ],
                emits: vec![OutputKind::Command, OutputKind::Event],
            },
        }
    }
}

impl Default for CommandPlugin {
    fn default() -> Self {
        Self::new()
    }
}

impl Plugin for CommandPlugin {
    fn declaration(&self) -> &PluginDeclaration {
        &self.declaration
    }

    fn run(&self, ctx: &PluginContext<'_>, view: &WorldView<'_>) -> Vec<Output> {
        let id = ctx.entity_id;
        let (Some(loadout), Some(combat), Some(transform)) = (
            view.get_loadout(id),
            view.get_combat(id),
            view.get_transform(id),
        ) else {
            return Vec::new();
        };
        let Some(pending) = loadout.pending.as_ref() else {
            return Vec::new();
        };

        let (action_index, definition) =
            match command::validate(pending, combat, loadout, ctx.definitions, ctx.now) {
                Ok(accepted) => accepted,
                Err(reason) => {
                    debug!(actor = %id, slot = pending.slot, %reason, "command rejected");
                    return vec![Output::Event(Event::CommandRejected {
                        actor: id,
                        slot: pending.slot,
                        reason,
                    })];
                }
            };

        // A vanished target degrades to the aim point, then to the facing.
        let tracked = pending.target.filter(|t| *t != id).and_then(|t| {
            let position = view.get_transform(t)?.position;
            let velocity = view.get_motion(t).map(|m| m.velocity).unwrap_or_default();
            Some(AimTarget {
                entity: Some(t),
                position,
                velocity,
            })
        });
        let target = tracked.or_else(|| {
            pending.aim_point.map(|position| AimTarget {
                entity: None,
                position,
                velocity: glam::Vec3::ZERO,
            })
        });

        let input = LaunchInput {
            actor: id,
            command: pending,
            action_index,
            definition,
            transform,
            combat,
            loadout,
            target,
        };
        let launch = command::launch(
            &input,
            ctx.definitions,
            ctx.config,
            ctx.seed,
            ctx.tick,
            ctx.now,
        );
        debug!(actor = %id, slot = pending.slot, action = action_index, "command accepted");

        vec![Output::Command(Command::CreateAction(Box::new(launch)))]
    }
}
