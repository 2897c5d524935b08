//! Configuration loading

use crate::{AppConfig, ConfigFormat};
use once_cell::sync::Lazy;
use regex::Regex;
use std::env;
use std::fs;
use std::path::Path;
use tether_core::{Result, SetupError};

/// Matches `${VAR}` or `${VAR:-default}`
static ENV_VAR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)(:-([^}]*))?\}").expect("static regex is valid")
});

/// Load configuration from a file
pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<AppConfig> {
    let path = path.as_ref();

    let content = fs::read_to_string(path).map_err(|e| {
        SetupError::Config(format!(
            "Failed to read config file {}: {e}",
            path.display()
        ))
    })?;

    let format = ConfigFormat::from_path(path)?;

    load_from_str(&content, format)
}

/// Expand environment variables in configuration string
/// Supports syntax: ${VAR} and ${VAR:-default}
fn expand_env_vars(content: &str) -> Result<String> {
    let mut result = String::with_capacity(content.len());
    let mut last_match = 0;

    for cap in ENV_VAR.captures_iter(content) {
        let Some(full_match) = cap.get(0) else {
            continue;
        };
        let var_name = cap.get(1).map(|m| m.as_str()).unwrap_or_default();
        let default_value = cap.get(3).map(|m| m.as_str());

        let value = match env::var(var_name) {
            Ok(val) => val,
            Err(_) => match default_value {
                Some(default) => default.to_string(),
                None => {
                    return Err(SetupError::Config(format!(
                        "Environment variable '{var_name}' not set and no default provided"
                    ))
                    .into());
                }
            },
        };

        result.push_str(&content[last_match..full_match.start()]);
        result.push_str(&value);
        last_match = full_match.end();
    }

    result.push_str(&content[last_match..]);

    Ok(result)
}

/// Load configuration from a string
pub fn load_from_str(content: &str, format: ConfigFormat) -> Result<AppConfig> {
    let expanded_content = expand_env_vars(content)?;

    let config = match format {
        ConfigFormat::Yaml => serde_yaml::from_str(&expanded_content)
            .map_err(|e| SetupError::Config(format!("Failed to parse YAML: {e}")))?,
        ConfigFormat::Toml => toml::from_str(&expanded_content)
            .map_err(|e| SetupError::Config(format!("Failed to parse TOML: {e}")))?,
        ConfigFormat::Json => serde_json::from_str(&expanded_content)
            .map_err(|e| SetupError::Config(format!("Failed to parse JSON: {e}")))?,
    };

    Ok(config)
}

/// Load and validate a configuration file
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<AppConfig> {
    let config = load_from_file(path)?;

    crate::validator::validate_config(&config)?;

    Ok(config)
}

/// Load and merge multiple configuration files
///
/// Files are merged in order, with later files overriding earlier ones:
/// - base.yaml (shared declarations)
/// - production.yaml (environment-specific overrides)
pub fn load_and_merge<P: AsRef<Path>>(paths: Vec<P>) -> Result<AppConfig> {
    if paths.is_empty() {
        return Err(SetupError::Config("No configuration files provided".to_string()).into());
    }

    let mut configs = Vec::with_capacity(paths.len());

    for path in paths {
        configs.push(load_from_file(path)?);
    }

    let merged = crate::merge_configs(configs)?;
    crate::validator::validate_config(&merged)?;

    Ok(merged)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;
    use tether_core::RegistrationOptions;

    const YAML_CONFIG: &str = r#"
core:
  debug: true
  prefix:
    class: "App"
  options:
    tags: ["web"]

plugins:
  - name: "dialog"
    priority: 250

classes:
  Sample:
    protected: ["log"]
    before:
      "*": ["log"]

directories:
  "/srv/ajax": "app::ajax"
"#;

    #[test]
    fn test_load_yaml() {
        let config = load_from_str(YAML_CONFIG, ConfigFormat::Yaml).unwrap();

        assert!(config.core.debug);
        assert_eq!(config.core.prefix.class, "App");
        assert_eq!(config.core.prefix.function, "tether_");
        assert_eq!(config.core.options.get("tags"), Some(&json!(["web"])));
        assert_eq!(config.plugin_priority("dialog"), Some(250));
        assert_eq!(config.classes.len(), 1);
        assert_eq!(
            config.directories.get("/srv/ajax"),
            Some(&RegistrationOptions::Shorthand("app::ajax".to_string()))
        );
    }

    #[test]
    fn test_load_toml() {
        let content = r#"
[core]
debug = false

[core.prefix]
function = "rpc_"

[functions.hello]
alias = "sayHello"
"#;
        let config = load_from_str(content, ConfigFormat::Toml).unwrap();
        assert_eq!(config.core.prefix.function, "rpc_");
        assert!(config.functions.contains_key("hello"));
    }

    #[test]
    fn test_invalid_yaml() {
        let result = load_from_str("core: [yaml", ConfigFormat::Yaml);
        assert!(result.is_err());
    }

    #[test]
    fn test_env_var_with_default() {
        env::remove_var("TETHER_UNDEFINED_PREFIX");

        let content = r#"
core:
  prefix:
    class: "${TETHER_UNDEFINED_PREFIX:-Fallback}"
"#;
        let config = load_from_str(content, ConfigFormat::Yaml).unwrap();
        assert_eq!(config.core.prefix.class, "Fallback");
    }

    #[test]
    fn test_env_var_substitution() {
        env::set_var("TETHER_TEST_NS", "app::admin");

        let expanded = expand_env_vars("namespace: ${TETHER_TEST_NS}").unwrap();
        assert_eq!(expanded, "namespace: app::admin");

        env::remove_var("TETHER_TEST_NS");
    }

    #[test]
    fn test_missing_env_var_no_default() {
        env::remove_var("TETHER_MISSING_VAR");

        let result = expand_env_vars("dir: ${TETHER_MISSING_VAR}");
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("TETHER_MISSING_VAR"));
    }

    #[test]
    fn test_load_and_merge_files() {
        let mut base = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(base, "core:\n  prefix:\n    class: Base\nclasses:\n  Sample: {{}}").unwrap();

        let mut overlay = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        writeln!(
            overlay,
            r#"{{"core": {{"prefix": {{"class": "Override"}}}}, "classes": {{"Other": {{}}}}}}"#
        )
        .unwrap();

        let config = load_and_merge(vec![base.path(), overlay.path()]).unwrap();
        assert_eq!(config.core.prefix.class, "Override");
        assert!(config.classes.contains_key("Sample"));
        assert!(config.classes.contains_key("Other"));
    }

    #[test]
    fn test_load_and_merge_requires_files() {
        let result = load_and_merge(Vec::<&Path>::new());
        assert!(result.is_err());
    }
}
