//! Configuration builder

use crate::types::{AppConfig, PluginConfig};
use serde_json::Value;
use tether_core::{RegistrationOptions, Result};

/// Builder for constructing configuration programmatically
#[derive(Debug, Default)]
pub struct ConfigBuilder {
    config: AppConfig,
}

impl ConfigBuilder {
    /// Create a new configuration builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable debug mode
    pub fn debug(mut self, debug: bool) -> Self {
        self.config.core.debug = debug;
        self
    }

    /// Set the client-side class prefix
    pub fn class_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.config.core.prefix.class = prefix.into();
        self
    }

    /// Set the client-side function prefix
    pub fn function_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.config.core.prefix.function = prefix.into();
        self
    }

    /// Set a global default option
    pub fn option(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.config.core.options.insert(key.into(), value.into());
        self
    }

    /// Declare an extra accumulating option key
    pub fn accumulating_key(mut self, key: impl Into<String>) -> Self {
        self.config.core.accumulating_keys.push(key.into());
        self
    }

    /// Override a plugin priority
    pub fn plugin_priority(mut self, name: impl Into<String>, priority: i32) -> Self {
        let name = name.into();
        match self.config.plugins.iter_mut().find(|p| p.name == name) {
            Some(plugin) => plugin.priority = Some(priority),
            None => self.config.plugins.push(PluginConfig {
                name,
                priority: Some(priority),
                enabled: true,
            }),
        }
        self
    }

    /// Disable a built-in plugin
    pub fn disable_plugin(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        match self.config.plugins.iter_mut().find(|p| p.name == name) {
            Some(plugin) => plugin.enabled = false,
            None => self.config.plugins.push(PluginConfig {
                name,
                priority: None,
                enabled: false,
            }),
        }
        self
    }

    /// Declare a function
    pub fn function(
        mut self,
        name: impl Into<String>,
        options: impl Into<RegistrationOptions>,
    ) -> Self {
        self.config.functions.insert(name.into(), options.into());
        self
    }

    /// Declare a class
    pub fn class(mut self, name: impl Into<String>, options: impl Into<RegistrationOptions>) -> Self {
        self.config.classes.insert(name.into(), options.into());
        self
    }

    /// Declare a directory
    pub fn directory(
        mut self,
        path: impl Into<String>,
        options: impl Into<RegistrationOptions>,
    ) -> Self {
        self.config.directories.insert(path.into(), options.into());
        self
    }

    /// Declare a namespace
    pub fn namespace(
        mut self,
        namespace: impl Into<String>,
        options: impl Into<RegistrationOptions>,
    ) -> Self {
        self.config
            .namespaces
            .insert(namespace.into(), options.into());
        self
    }

    /// Validate and build the configuration
    pub fn build(self) -> Result<AppConfig> {
        crate::validator::validate_config(&self.config)?;
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_config_builder() {
        let config = ConfigBuilder::new()
            .debug(true)
            .class_prefix("App")
            .option("tags", json!(["web"]))
            .plugin_priority("dialog", 150)
            .class("Sample", RegistrationOptions::default())
            .directory("/srv/ajax", "app::ajax")
            .build()
            .unwrap();

        assert!(config.core.debug);
        assert_eq!(config.core.prefix.class, "App");
        assert_eq!(config.plugin_priority("dialog"), Some(150));
        assert!(config.classes.contains_key("Sample"));
        assert_eq!(
            config.directories.get("/srv/ajax"),
            Some(&RegistrationOptions::Shorthand("app::ajax".to_string()))
        );
    }

    #[test]
    fn test_disable_plugin() {
        let config = ConfigBuilder::new()
            .plugin_priority("dialog", 150)
            .disable_plugin("dialog")
            .build()
            .unwrap();

        assert!(!config.plugin_enabled("dialog"));
        assert_eq!(config.plugins.len(), 1);
    }

    #[test]
    fn test_builder_rejects_invalid_prefix() {
        let result = ConfigBuilder::new().class_prefix("not valid").build();
        assert!(result.is_err());
    }
}
