//! # Tether Plugin Runtime
//!
//! The plugin registry: classifies plugins by the capabilities they
//! expose, keeps them ordered by priority, and serves them by name.

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    missing_debug_implementations,
    rust_2018_idioms,
    unreachable_pub
)]

pub mod registry;

pub use registry::PluginRegistry;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::registry::PluginRegistry;
    pub use tether_plugin_api::prelude::*;
}
