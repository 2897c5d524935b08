//! Option merging
//!
//! Callable options are declared at several nested scopes. They are
//! merged in increasing precedence, so later scopes override earlier ones:
//! - global defaults
//! - directory/namespace wildcard options
//! - directory/namespace class-name-prefix options
//! - class wildcard (`*`) options
//! - class method-specific options
//!
//! List values under an accumulating key are unioned instead of replaced.
//!
//! Whole configuration files merge the same way: later files override
//! earlier ones.

use crate::types::{AppConfig, CoreConfig, PluginConfig};
use serde_json::Value;
use std::collections::BTreeSet;
use tether_core::{Options, Result, SetupError};

/// Keys accumulated by the default policy
pub const DEFAULT_ACCUMULATING_KEYS: &[&str] =
    &["before", "after", "protected", "tags", "bags", "callbacks"];

/// Which option keys accumulate across scopes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergePolicy {
    accumulating: BTreeSet<String>,
}

impl MergePolicy {
    /// Policy accumulating [`DEFAULT_ACCUMULATING_KEYS`]
    pub fn new() -> Self {
        Self {
            accumulating: DEFAULT_ACCUMULATING_KEYS
                .iter()
                .map(|k| k.to_string())
                .collect(),
        }
    }

    /// Policy where every key is last-wins
    pub fn overwrite_all() -> Self {
        Self {
            accumulating: BTreeSet::new(),
        }
    }

    /// Declare an additional accumulating key
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.accumulating.insert(key.into());
        self
    }

    /// Check if a key accumulates
    pub fn is_accumulating(&self, key: &str) -> bool {
        self.accumulating.contains(key)
    }

    /// Accumulating keys, sorted
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.accumulating.iter().map(String::as_str)
    }

    /// Merge scopes given in increasing precedence
    ///
    /// Inputs are never mutated. Absent keys are skipped.
    pub fn merge<'a, I>(&self, scopes: I) -> Options
    where
        I: IntoIterator<Item = &'a Options>,
    {
        let mut result = Options::new();

        for scope in scopes {
            for (key, incoming) in scope {
                if !self.is_accumulating(key) {
                    result.insert(key.clone(), incoming.clone());
                    continue;
                }

                match (result.get_mut(key), incoming) {
                    (Some(Value::Array(current)), Value::Array(items)) => union_into(current, items),
                    (_, Value::Array(items)) => {
                        let mut fresh = Vec::with_capacity(items.len());
                        union_into(&mut fresh, items);
                        result.insert(key.clone(), Value::Array(fresh));
                    }
                    _ => {
                        result.insert(key.clone(), incoming.clone());
                    }
                }
            }
        }

        result
    }
}

impl Default for MergePolicy {
    fn default() -> Self {
        Self::new()
    }
}

/// Merge scopes with the default policy
pub fn merge_options<'a, I>(scopes: I) -> Options
where
    I: IntoIterator<Item = &'a Options>,
{
    MergePolicy::new().merge(scopes)
}

/// Merge multiple configurations together
///
/// Later configs override earlier configs. Declarations are keyed, so a
/// later declaration of the same name replaces the earlier one.
pub fn merge_configs(configs: Vec<AppConfig>) -> Result<AppConfig> {
    let mut configs = configs.into_iter();

    let Some(mut result) = configs.next() else {
        return Err(SetupError::Config("No configurations to merge".to_string()).into());
    };

    for overlay in configs {
        result = merge_two_configs(result, overlay);
    }

    Ok(result)
}

fn merge_two_configs(mut base: AppConfig, overlay: AppConfig) -> AppConfig {
    base.core = merge_core(base.core, overlay.core);
    base.plugins = merge_plugins(base.plugins, overlay.plugins);
    base.functions.extend(overlay.functions);
    base.classes.extend(overlay.classes);
    base.directories.extend(overlay.directories);
    base.namespaces.extend(overlay.namespaces);
    base
}

fn merge_core(base: CoreConfig, overlay: CoreConfig) -> CoreConfig {
    let mut accumulating_keys = base.accumulating_keys;
    for key in overlay.accumulating_keys {
        if !accumulating_keys.contains(&key) {
            accumulating_keys.push(key);
        }
    }

    let policy = accumulating_keys
        .iter()
        .fold(MergePolicy::new(), |policy, key| policy.with_key(key.as_str()));

    CoreConfig {
        debug: overlay.debug || base.debug,
        prefix: overlay.prefix,
        options: policy.merge([&base.options, &overlay.options]),
        accumulating_keys,
    }
}

fn merge_plugins(mut base: Vec<PluginConfig>, overlay: Vec<PluginConfig>) -> Vec<PluginConfig> {
    for plugin in overlay {
        match base.iter_mut().find(|p| p.name == plugin.name) {
            Some(existing) => *existing = plugin,
            None => base.push(plugin),
        }
    }
    base
}

fn union_into(current: &mut Vec<Value>, items: &[Value]) {
    for item in items {
        if !current.contains(item) {
            current.push(item.clone());
        }
    }
}
