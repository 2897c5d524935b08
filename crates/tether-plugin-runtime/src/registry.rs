//! Plugin registry classified by capability

use parking_lot::RwLock;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::sync::Arc;
use tether_core::{Result, SetupError};
use tether_plugin_api::{
    Capability, CapabilitySet, CodeGenerator, Plugin, PluginDescriptor, RegistryProvider,
    RequestHandler,
};
use tether_response::{CommandSourceRegistry, ResponseCommandSource};
use tracing::{debug, info, warn};

/// Plugin registry
///
/// Each capability has its own name keyspace. All plugins share one
/// priority table, kept sorted, which gives the trial order for request
/// handlers and the emission order for code generators.
#[derive(Clone, Debug, Default)]
pub struct PluginRegistry {
    inner: Arc<RwLock<RegistryState>>,
}

#[derive(Debug, Default)]
struct RegistryState {
    /// Plugins by effective priority
    slots: BTreeMap<i32, PluginSlot>,

    /// Capability -> plugin name -> priority
    names: HashMap<Capability, HashMap<String, i32>>,
}

/// Registered plugin with its capability views
struct PluginSlot {
    plugin: Arc<dyn Plugin>,
    capabilities: CapabilitySet,
    handler: Option<Arc<dyn RequestHandler>>,
    generator: Option<Arc<dyn CodeGenerator>>,
    source: Option<Arc<dyn ResponseCommandSource>>,
    provider: Option<Arc<dyn RegistryProvider>>,
}

impl fmt::Debug for PluginSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginSlot")
            .field("name", &self.plugin.name())
            .field("capabilities", &self.capabilities)
            .finish()
    }
}

impl PluginSlot {
    fn new(plugin: Arc<dyn Plugin>) -> Self {
        let handler = Arc::clone(&plugin).as_request_handler();
        let generator = Arc::clone(&plugin).as_code_generator();
        let source = Arc::clone(&plugin).as_command_source();
        let provider = Arc::clone(&plugin).as_registry_provider();

        let capabilities = [
            (Capability::RequestHandler, handler.is_some()),
            (Capability::CodeGenerator, generator.is_some()),
            (Capability::ResponseCommandSource, source.is_some()),
            (Capability::RegistryProvider, provider.is_some()),
        ]
        .into_iter()
        .filter_map(|(capability, present)| present.then_some(capability))
        .collect();

        Self {
            plugin,
            capabilities,
            handler,
            generator,
            source,
            provider,
        }
    }

    fn name(&self) -> &str {
        self.plugin.name()
    }

    fn strip(&mut self, capability: Capability) {
        self.capabilities.remove(capability);
        match capability {
            Capability::RequestHandler => self.handler = None,
            Capability::CodeGenerator => self.generator = None,
            Capability::ResponseCommandSource => self.source = None,
            Capability::RegistryProvider => self.provider = None,
        }
    }
}

impl RegistryState {
    /// Remove the current holder of `name` in `capability`, if any
    fn evict(&mut self, capability: Capability, name: &str) {
        let Some(priority) = self
            .names
            .get_mut(&capability)
            .and_then(|names| names.remove(name))
        else {
            return;
        };

        warn!(
            plugin = %name,
            capability = %capability,
            priority,
            "Plugin replaced by a later registration"
        );

        let emptied = match self.slots.get_mut(&priority) {
            Some(slot) => {
                slot.strip(capability);
                slot.capabilities.is_empty()
            }
            None => false,
        };

        if emptied {
            self.slots.remove(&priority);
        }
    }

    /// Priorities whose slot would be left empty by evicting `name`
    fn released_by(&self, name: &str, capabilities: &CapabilitySet) -> BTreeSet<i32> {
        let held_at = |capability: Capability| {
            self.names
                .get(&capability)
                .and_then(|names| names.get(name))
                .copied()
        };

        capabilities
            .iter()
            .filter_map(held_at)
            .filter(|priority| {
                self.slots.get(priority).is_some_and(|slot| {
                    slot.capabilities.iter().all(|capability| {
                        capabilities.contains(capability) && held_at(capability) == Some(*priority)
                    })
                })
            })
            .collect()
    }

    fn free_priority(&self, requested: i32, released: &BTreeSet<i32>) -> Result<i32> {
        let mut priority = requested;
        while self.slots.contains_key(&priority) && !released.contains(&priority) {
            priority = priority.checked_add(1).ok_or_else(|| {
                SetupError::Config(format!("no free plugin priority at or above {requested}"))
            })?;
        }
        Ok(priority)
    }

    fn slot(&self, capability: Capability, name: &str) -> Option<&PluginSlot> {
        let priority = self.names.get(&capability)?.get(name)?;
        self.slots.get(priority)
    }
}

impl PluginRegistry {
    /// Create a new plugin registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a plugin at a requested priority
    ///
    /// The plugin is stored under each capability it exposes. A plugin
    /// already holding the same name in a capability is replaced there.
    /// When the priority is taken, the next free one is used. Returns the
    /// effective priority.
    pub fn register(&self, plugin: Arc<dyn Plugin>, priority: i32) -> Result<i32> {
        let slot = PluginSlot::new(plugin);
        let name = slot.name().to_string();

        if slot.capabilities.is_empty() {
            return Err(SetupError::UnrecognizedPlugin(name).into());
        }

        let mut state = self.inner.write();

        let released = state.released_by(&name, &slot.capabilities);
        let effective = state.free_priority(priority, &released)?;

        for capability in slot.capabilities.iter() {
            state.evict(capability, &name);
        }

        if effective != priority {
            debug!(
                plugin = %name,
                requested = priority,
                effective,
                "Plugin priority taken, moved to next free slot"
            );
        }

        for capability in slot.capabilities.iter() {
            state
                .names
                .entry(capability)
                .or_default()
                .insert(name.clone(), effective);
        }

        info!(
            plugin = %name,
            priority = effective,
            capabilities = ?slot.capabilities,
            "Plugin registered"
        );

        state.slots.insert(effective, slot);

        Ok(effective)
    }

    /// Find a plugin by name within a capability
    pub fn by_name(&self, capability: Capability, name: &str) -> Option<Arc<dyn Plugin>> {
        self.inner
            .read()
            .slot(capability, name)
            .map(|slot| Arc::clone(&slot.plugin))
    }

    /// Effective priority of a plugin within a capability
    pub fn priority_of(&self, capability: Capability, name: &str) -> Option<i32> {
        self.inner.read().names.get(&capability)?.get(name).copied()
    }

    /// Plugins exposing a capability, ascending by priority
    pub fn ordered_by_priority(&self, capability: Capability) -> Vec<Arc<dyn Plugin>> {
        self.inner
            .read()
            .slots
            .values()
            .filter(|slot| slot.capabilities.contains(capability))
            .map(|slot| Arc::clone(&slot.plugin))
            .collect()
    }

    /// Request handler by name
    pub fn request_handler(&self, name: &str) -> Option<Arc<dyn RequestHandler>> {
        self.inner
            .read()
            .slot(Capability::RequestHandler, name)
            .and_then(|slot| slot.handler.clone())
    }

    /// Code generator by name
    pub fn code_generator(&self, name: &str) -> Option<Arc<dyn CodeGenerator>> {
        self.inner
            .read()
            .slot(Capability::CodeGenerator, name)
            .and_then(|slot| slot.generator.clone())
    }

    /// Registry provider by name
    pub fn registry_provider(&self, name: &str) -> Option<Arc<dyn RegistryProvider>> {
        self.inner
            .read()
            .slot(Capability::RegistryProvider, name)
            .and_then(|slot| slot.provider.clone())
    }

    /// Request handlers, ascending by priority
    pub fn request_handlers(&self) -> Vec<Arc<dyn RequestHandler>> {
        self.inner
            .read()
            .slots
            .values()
            .filter_map(|slot| slot.handler.clone())
            .collect()
    }

    /// Code generators, ascending by priority
    pub fn code_generators(&self) -> Vec<Arc<dyn CodeGenerator>> {
        self.inner
            .read()
            .slots
            .values()
            .filter_map(|slot| slot.generator.clone())
            .collect()
    }

    /// Command sources, ascending by priority
    pub fn command_sources(&self) -> Vec<Arc<dyn ResponseCommandSource>> {
        self.inner
            .read()
            .slots
            .values()
            .filter_map(|slot| slot.source.clone())
            .collect()
    }

    /// Registry providers, ascending by priority
    pub fn registry_providers(&self) -> Vec<Arc<dyn RegistryProvider>> {
        self.inner
            .read()
            .slots
            .values()
            .filter_map(|slot| slot.provider.clone())
            .collect()
    }

    /// Every registered plugin, ascending by priority
    pub fn descriptors(&self) -> Vec<PluginDescriptor> {
        self.inner
            .read()
            .slots
            .iter()
            .map(|(priority, slot)| PluginDescriptor {
                name: slot.name().to_string(),
                priority: *priority,
                capabilities: slot.capabilities.clone(),
            })
            .collect()
    }

    /// Number of registered plugins
    pub fn len(&self) -> usize {
        self.inner.read().slots.len()
    }

    /// Check if no plugin is registered
    pub fn is_empty(&self) -> bool {
        self.inner.read().slots.is_empty()
    }
}

impl CommandSourceRegistry for PluginRegistry {
    fn command_source(&self, name: &str) -> Option<Arc<dyn ResponseCommandSource>> {
        self.inner
            .read()
            .slot(Capability::ResponseCommandSource, name)
            .and_then(|slot| slot.source.clone())
    }
}
