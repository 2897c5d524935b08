//! Core plugin trait and capability types

use crate::generator::CodeGenerator;
use crate::handler::RequestHandler;
use crate::provider::RegistryProvider;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;
use tether_response::ResponseCommandSource;

/// Core plugin trait that all plugins must implement
///
/// What a plugin can do is given by the capability traits it implements.
/// Each capability is surfaced through an `as_*` accessor that a plugin
/// overrides to return itself:
///
/// ```rust,ignore
/// fn as_request_handler(self: Arc<Self>) -> Option<Arc<dyn RequestHandler>> {
///     Some(self)
/// }
/// ```
pub trait Plugin: Send + Sync + fmt::Debug {
    /// Plugin name (unique per capability)
    fn name(&self) -> &str;

    /// Plugin description
    fn description(&self) -> &str {
        ""
    }

    /// Request handler capability
    fn as_request_handler(self: Arc<Self>) -> Option<Arc<dyn RequestHandler>> {
        None
    }

    /// Client code generation capability
    fn as_code_generator(self: Arc<Self>) -> Option<Arc<dyn CodeGenerator>> {
        None
    }

    /// Response command source capability
    fn as_command_source(self: Arc<Self>) -> Option<Arc<dyn ResponseCommandSource>> {
        None
    }

    /// Registration capability
    fn as_registry_provider(self: Arc<Self>) -> Option<Arc<dyn RegistryProvider>> {
        None
    }
}

/// Capabilities a plugin may expose
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    /// Emits client-side code
    CodeGenerator,
    /// Owns and processes inbound calls
    RequestHandler,
    /// Emits namespaced response commands
    ResponseCommandSource,
    /// Accepts callable registrations
    RegistryProvider,
}

impl Capability {
    /// Every capability, in a fixed order
    pub const ALL: [Capability; 4] = [
        Capability::CodeGenerator,
        Capability::RequestHandler,
        Capability::ResponseCommandSource,
        Capability::RegistryProvider,
    ];
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Capability::CodeGenerator => write!(f, "code_generator"),
            Capability::RequestHandler => write!(f, "request_handler"),
            Capability::ResponseCommandSource => write!(f, "response_command_source"),
            Capability::RegistryProvider => write!(f, "registry_provider"),
        }
    }
}

/// Set of capabilities
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilitySet(BTreeSet<Capability>);

impl CapabilitySet {
    /// Empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Detect the capabilities a plugin exposes
    pub fn of(plugin: &Arc<dyn Plugin>) -> Self {
        let mut set = Self::new();
        if Arc::clone(plugin).as_code_generator().is_some() {
            set.insert(Capability::CodeGenerator);
        }
        if Arc::clone(plugin).as_request_handler().is_some() {
            set.insert(Capability::RequestHandler);
        }
        if Arc::clone(plugin).as_command_source().is_some() {
            set.insert(Capability::ResponseCommandSource);
        }
        if Arc::clone(plugin).as_registry_provider().is_some() {
            set.insert(Capability::RegistryProvider);
        }
        set
    }

    /// Add a capability
    pub fn insert(&mut self, capability: Capability) -> bool {
        self.0.insert(capability)
    }

    /// Remove a capability
    pub fn remove(&mut self, capability: Capability) -> bool {
        self.0.remove(&capability)
    }

    /// Check for a capability
    pub fn contains(&self, capability: Capability) -> bool {
        self.0.contains(&capability)
    }

    /// Check if the set is empty
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate in a fixed order
    pub fn iter(&self) -> impl Iterator<Item = Capability> + '_ {
        self.0.iter().copied()
    }
}

impl FromIterator<Capability> for CapabilitySet {
    fn from_iter<I: IntoIterator<Item = Capability>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Registered plugin, as reported by the registry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginDescriptor {
    /// Plugin name
    pub name: String,

    /// Effective priority (lower runs first)
    pub priority: i32,

    /// Capabilities the plugin is registered under
    pub capabilities: CapabilitySet,
}
