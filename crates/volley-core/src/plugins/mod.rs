//! Built-in plugins.
//!
//! - [`CommandPlugin`]: validates an actor's pending command and proposes
//!   the action it creates
//! - [`ActionPlugin`]: advances one live action per tick
//!
//! Both read only the frozen [`WorldView`](crate::world_view::WorldView)
//! and return [`Output`](crate::output::Output)s.
//! [`PluginRegistry::default_bundles()`](crate::plugin::PluginRegistry::default_bundles)
//! registers them on their entity tags.

mod action;
mod command;

pub use action::ActionPlugin;
pub use command::CommandPlugin;
