//! Configuration validation

use crate::AppConfig;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use std::collections::HashSet;
use tether_core::{Options, RegistrationKind, Result, SetupError};

/// Client-side identifiers: letters, digits, `_` and `$`, no leading digit
static JS_IDENTIFIER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z_$][A-Za-z0-9_$]*$").expect("static regex is valid")
});

/// Validate configuration
pub fn validate_config(config: &AppConfig) -> Result<()> {
    validate_core(config)?;
    validate_plugins(config)?;
    validate_declarations(config)?;

    Ok(())
}

fn validate_core(config: &AppConfig) -> Result<()> {
    let prefix = &config.core.prefix;

    if !prefix.class.split('.').all(|part| JS_IDENTIFIER.is_match(part)) {
        return Err(invalid(format!(
            "class prefix '{}' is not a valid client identifier",
            prefix.class
        )));
    }

    if !prefix.function.is_empty() && !JS_IDENTIFIER.is_match(&prefix.function) {
        return Err(invalid(format!(
            "function prefix '{}' is not a valid client identifier",
            prefix.function
        )));
    }

    if config.core.accumulating_keys.iter().any(|k| k.is_empty()) {
        return Err(invalid("accumulating key cannot be empty"));
    }

    validate_options("core.options", &config.core.options)
}

fn validate_plugins(config: &AppConfig) -> Result<()> {
    let mut seen = HashSet::new();

    for plugin in &config.plugins {
        if plugin.name.is_empty() {
            return Err(invalid("plugin name cannot be empty"));
        }

        if !seen.insert(plugin.name.as_str()) {
            tracing::warn!(
                plugin = %plugin.name,
                "Plugin listed more than once, last entry wins"
            );
        }
    }

    Ok(())
}

fn validate_declarations(config: &AppConfig) -> Result<()> {
    let sections = [
        (RegistrationKind::Function, &config.functions),
        (RegistrationKind::Class, &config.classes),
        (RegistrationKind::Directory, &config.directories),
        (RegistrationKind::Namespace, &config.namespaces),
    ];

    for (kind, declarations) in sections {
        for (name, options) in declarations {
            if name.trim().is_empty() {
                return Err(invalid(format!("{kind} name cannot be empty")));
            }

            let options = options.clone().normalize(kind);
            validate_options(name, &options)?;
        }
    }

    Ok(())
}

/// Check the shape of option keys interpreted by the registry
fn validate_options(name: &str, options: &Options) -> Result<()> {
    for key in ["methods", "classes", "di"] {
        match options.get(key) {
            None | Some(Value::Object(_)) => {}
            Some(_) => {
                return Err(SetupError::malformed(name, format!("'{key}' must be a map")).into());
            }
        }
    }

    if let Some(separator) = options.get("separator") {
        match separator.as_str() {
            Some("." | "_") => {}
            _ => {
                return Err(
                    SetupError::malformed(name, "'separator' must be \".\" or \"_\"").into(),
                );
            }
        }
    }

    if let Some(extensions) = options.get("extensions") {
        let valid = extensions
            .as_array()
            .map(|exts| exts.iter().all(Value::is_string))
            .unwrap_or(false);
        if !valid {
            return Err(
                SetupError::malformed(name, "'extensions' must be a list of strings").into(),
            );
        }
    }

    Ok(())
}

fn invalid(reason: impl Into<String>) -> tether_core::Error {
    SetupError::Config(reason.into()).into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PluginConfig;
    use serde_json::json;

    #[test]
    fn test_valid_default_config() {
        assert!(validate_config(&AppConfig::default()).is_ok());
    }

    #[test]
    fn test_dotted_class_prefix() {
        let mut config = AppConfig::default();
        config.core.prefix.class = "App.Remote".to_string();
        assert!(validate_config(&config).is_ok());

        config.core.prefix.class = "App..Remote".to_string();
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_invalid_function_prefix() {
        let mut config = AppConfig::default();
        config.core.prefix.function = "1bad-".to_string();
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_empty_plugin_name() {
        let mut config = AppConfig::default();
        config.plugins.push(PluginConfig {
            name: String::new(),
            priority: None,
            enabled: true,
        });
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_malformed_declaration() {
        let config: AppConfig = serde_json::from_value(json!({
            "classes": {"Sample": {"methods": ["oops"]}}
        }))
        .unwrap();

        let err = validate_config(&config).unwrap_err();
        assert!(err.is_setup());
        assert!(err.to_string().contains("Sample"));
    }

    #[test]
    fn test_bad_separator() {
        let config: AppConfig = serde_json::from_value(json!({
            "namespaces": {"app": {"directory": "/srv", "separator": "/"}}
        }))
        .unwrap();
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_bad_extensions() {
        let config: AppConfig = serde_json::from_value(json!({
            "directories": {"/srv/ajax": {"extensions": "rs"}}
        }))
        .unwrap();
        assert!(validate_config(&config).is_err());
    }
}
