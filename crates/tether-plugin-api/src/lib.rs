//! # Tether Plugin API
//!
//! This crate provides the SDK for developing Tether plugins.
//!
//! ## Capabilities
//!
//! - **Request Handlers**: own inbound calls and execute them
//! - **Code Generators**: emit client-side stubs
//! - **Response Command Sources**: emit namespaced response commands
//! - **Registry Providers**: accept callable registrations
//!
//! A plugin implements [`Plugin`] plus any number of capability traits,
//! and overrides the matching `as_*` accessor for each.
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use tether_plugin_api::prelude::*;
//!
//! #[derive(Debug)]
//! struct Toast;
//!
//! impl Plugin for Toast {
//!     fn name(&self) -> &str { "toast" }
//!
//!     fn as_command_source(self: Arc<Self>) -> Option<Arc<dyn ResponseCommandSource>> {
//!         Some(self)
//!     }
//! }
//!
//! impl ResponseCommandSource for Toast {
//!     fn namespace(&self) -> &str { "toast" }
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    missing_debug_implementations,
    rust_2018_idioms,
    unreachable_pub
)]

pub mod generator;
pub mod handler;
pub mod plugin;
pub mod provider;

#[cfg(feature = "testing")]
pub mod testing;

pub use generator::CodeGenerator;
pub use handler::RequestHandler;
pub use plugin::{Capability, CapabilitySet, Plugin, PluginDescriptor};
pub use provider::RegistryProvider;
pub use tether_response::ResponseCommandSource;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::generator::CodeGenerator;
    pub use crate::handler::RequestHandler;
    pub use crate::plugin::{Capability, CapabilitySet, Plugin, PluginDescriptor};
    pub use crate::provider::RegistryProvider;
    pub use tether_response::{Command, Response, ResponseCommandSource};
}
