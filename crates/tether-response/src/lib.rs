//! # Tether Response
//!
//! The response command queue returned by every call: an ordered list of
//! client-side commands, with helpers for the common DOM and script
//! commands and access to command source plugins by name.

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    missing_debug_implementations,
    rust_2018_idioms,
    unreachable_pub
)]

pub mod command;
pub mod queue;
pub mod response;
pub mod source;

pub use command::{Command, Component};
pub use queue::{CommandId, CommandQueue};
pub use response::{PluginCommands, Response};
pub use source::{CommandSourceRegistry, ResponseCommandSource};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::command::{Command, Component};
    pub use crate::queue::{CommandId, CommandQueue};
    pub use crate::response::{PluginCommands, Response};
    pub use crate::source::{CommandSourceRegistry, ResponseCommandSource};
}
