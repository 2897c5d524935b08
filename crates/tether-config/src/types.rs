//! Configuration types

use crate::merger::MergePolicy;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tether_core::{Options, RegistrationOptions};

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AppConfig {
    /// Core settings
    #[serde(default)]
    pub core: CoreConfig,

    /// Plugin priority overrides, by plugin name
    #[serde(default)]
    pub plugins: Vec<PluginConfig>,

    /// Functions to register, by name
    #[serde(default)]
    pub functions: BTreeMap<String, RegistrationOptions>,

    /// Classes to register, by qualified name
    #[serde(default)]
    pub classes: BTreeMap<String, RegistrationOptions>,

    /// Directories to register, by path
    #[serde(default)]
    pub directories: BTreeMap<String, RegistrationOptions>,

    /// Namespaces to register, by namespace
    #[serde(default)]
    pub namespaces: BTreeMap<String, RegistrationOptions>,
}

impl AppConfig {
    /// Priority override for a plugin, if configured
    pub fn plugin_priority(&self, name: &str) -> Option<i32> {
        self.plugins
            .iter()
            .find(|p| p.name == name)
            .and_then(|p| p.priority)
    }

    /// Check if a plugin is enabled (plugins are enabled unless listed as disabled)
    pub fn plugin_enabled(&self, name: &str) -> bool {
        self.plugins
            .iter()
            .find(|p| p.name == name)
            .map(|p| p.enabled)
            .unwrap_or(true)
    }
}

/// Core configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CoreConfig {
    /// Debug mode (adds diagnostics to generated scripts)
    #[serde(default)]
    pub debug: bool,

    /// Client-side name prefixes
    #[serde(default)]
    pub prefix: PrefixConfig,

    /// Global default options applied to every class
    #[serde(default)]
    pub options: Options,

    /// Extra option keys whose list values accumulate across scopes
    #[serde(default)]
    pub accumulating_keys: Vec<String>,
}

impl CoreConfig {
    /// Merge policy with the default keys plus the configured extras
    pub fn merge_policy(&self) -> MergePolicy {
        self.accumulating_keys
            .iter()
            .fold(MergePolicy::new(), |policy, key| policy.with_key(key.as_str()))
    }
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            debug: false,
            prefix: PrefixConfig::default(),
            options: Options::new(),
            accumulating_keys: Vec::new(),
        }
    }
}

/// Client-side name prefixes for generated stubs
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PrefixConfig {
    /// Object prefix classes are exported under
    #[serde(default = "default_class_prefix")]
    pub class: String,

    /// Name prefix for exported functions
    #[serde(default = "default_function_prefix")]
    pub function: String,
}

fn default_class_prefix() -> String {
    "Tether".to_string()
}

fn default_function_prefix() -> String {
    "tether_".to_string()
}

impl Default for PrefixConfig {
    fn default() -> Self {
        Self {
            class: default_class_prefix(),
            function: default_function_prefix(),
        }
    }
}

/// Plugin configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PluginConfig {
    /// Plugin name
    pub name: String,

    /// Requested priority (lower runs first)
    #[serde(default)]
    pub priority: Option<i32>,

    /// Enabled
    #[serde(default = "default_true")]
    pub enabled: bool,
}

fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.core.prefix.class, "Tether");
        assert_eq!(config.core.prefix.function, "tether_");
        assert!(!config.core.debug);
        assert!(config.plugin_enabled("dialog"));
        assert_eq!(config.plugin_priority("dialog"), None);
    }

    #[test]
    fn test_plugin_overrides() {
        let config: AppConfig = serde_json::from_value(json!({
            "plugins": [
                {"name": "dialog", "priority": 50},
                {"name": "function", "enabled": false}
            ]
        }))
        .unwrap();

        assert_eq!(config.plugin_priority("dialog"), Some(50));
        assert!(!config.plugin_enabled("function"));
        assert!(config.plugin_enabled("class"));
    }

    #[test]
    fn test_merge_policy_extras() {
        let core: CoreConfig = serde_json::from_value(json!({
            "accumulating_keys": ["roles"]
        }))
        .unwrap();

        let policy = core.merge_policy();
        assert!(policy.is_accumulating("roles"));
        assert!(policy.is_accumulating("tags"));
    }

    #[test]
    fn test_registration_shorthand() {
        let config: AppConfig = serde_json::from_value(json!({
            "directories": {"/srv/ajax": "app::ajax"},
            "classes": {"Sample": {"protected": ["log"]}}
        }))
        .unwrap();

        assert_eq!(
            config.directories.get("/srv/ajax"),
            Some(&RegistrationOptions::Shorthand("app::ajax".to_string()))
        );
        assert!(matches!(
            config.classes.get("Sample"),
            Some(RegistrationOptions::Map(_))
        ));
    }
}
