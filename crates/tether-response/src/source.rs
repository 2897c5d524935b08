//! Named command sources
//!
//! A command source is a plugin that emits commands under its own
//! namespace (`dialog.show`, ...). The response reaches sources by name
//! through a [`CommandSourceRegistry`].

use crate::command::Command;
use std::fmt;
use std::sync::Arc;

/// Plugin capability: emitting namespaced commands into a response
pub trait ResponseCommandSource: Send + Sync + fmt::Debug {
    /// Namespace prefixed to every command name
    fn namespace(&self) -> &str;

    /// Adjust a command before it is queued
    fn prepare(&self, _command: &mut Command) {}
}

/// Lookup of command sources by plugin name
pub trait CommandSourceRegistry: Send + Sync + fmt::Debug {
    /// Find a command source by plugin name
    fn command_source(&self, name: &str) -> Option<Arc<dyn ResponseCommandSource>>;
}
