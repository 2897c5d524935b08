//! # Tether Configuration
//!
//! Option merging and application configuration with support for:
//! - Multiple formats (YAML, TOML, JSON)
//! - Environment variable expansion
//! - Layered files merged in order
//! - Validation

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    missing_debug_implementations,
    rust_2018_idioms,
    unreachable_pub
)]

pub mod builder;
pub mod loader;
pub mod merger;
pub mod types;
pub mod validator;

pub use builder::ConfigBuilder;
pub use loader::{load_and_merge, load_config, load_from_file, load_from_str};
pub use merger::{merge_configs, merge_options, MergePolicy, DEFAULT_ACCUMULATING_KEYS};
pub use types::{AppConfig, CoreConfig, PluginConfig, PrefixConfig};
pub use validator::validate_config;

use std::path::Path;
use tether_core::{Result, SetupError};

/// Configuration format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// YAML format
    Yaml,
    /// TOML format
    Toml,
    /// JSON format
    Json,
}

impl ConfigFormat {
    /// Detect format from file extension
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|s| s.to_str())
            .ok_or_else(|| SetupError::Config("Unable to detect config format".to_string()))?;

        match ext {
            "yaml" | "yml" => Ok(ConfigFormat::Yaml),
            "toml" => Ok(ConfigFormat::Toml),
            "json" => Ok(ConfigFormat::Json),
            _ => Err(SetupError::Config(format!("Unsupported config format: {ext}")).into()),
        }
    }
}
