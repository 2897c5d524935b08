//! Resolved callable entities

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use tether_core::{CallableKind, Options, Result, SetupError};

/// Wildcard key applying to every method
pub const WILDCARD: &str = "*";

/// Hook method call declared in a `before`/`after` option
///
/// Declared either as a bare method name or as `{method, args}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HookCall {
    /// Hook method name
    pub method: String,

    /// Extra arguments passed to the hook
    #[serde(default)]
    pub args: Vec<Value>,
}

impl HookCall {
    /// Parse a hook declaration
    pub fn parse(owner: &str, value: &Value) -> Result<Self> {
        match value {
            Value::String(method) if !method.trim().is_empty() => Ok(Self {
                method: method.trim().to_string(),
                args: Vec::new(),
            }),
            Value::Object(_) => serde_json::from_value(value.clone())
                .map_err(|e| SetupError::malformed(owner, format!("invalid hook {value}: {e}")).into()),
            other => Err(SetupError::malformed(owner, format!("invalid hook {other}")).into()),
        }
    }
}

/// Class or function with its fully merged options
///
/// Built once per qualified name and cached by the repository.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CallableEntity {
    pub(crate) qualified_name: String,
    pub(crate) external_name: String,
    pub(crate) kind: CallableKind,
    pub(crate) separator: char,
    pub(crate) protected_methods: BTreeSet<String>,
    pub(crate) before_hooks: BTreeMap<String, Vec<HookCall>>,
    pub(crate) after_hooks: BTreeMap<String, Vec<HookCall>>,
    pub(crate) di_bindings: BTreeMap<String, BTreeMap<String, String>>,
    pub(crate) per_method_options: BTreeMap<String, Options>,
    pub(crate) source_timestamp: u64,
}

impl CallableEntity {
    /// Qualified name (`app::admin::Users`)
    pub fn qualified_name(&self) -> &str {
        &self.qualified_name
    }

    /// Client-facing name (`app.admin.Users`)
    pub fn external_name(&self) -> &str {
        &self.external_name
    }

    /// Entity kind
    pub fn kind(&self) -> CallableKind {
        self.kind
    }

    /// Separator used in the client-facing name
    pub fn separator(&self) -> char {
        self.separator
    }

    /// Source modification time, in seconds since the epoch
    pub fn source_timestamp(&self) -> u64 {
        self.source_timestamp
    }

    /// Methods that cannot be called from the client
    pub fn protected_methods(&self) -> &BTreeSet<String> {
        &self.protected_methods
    }

    /// Methods with explicit options
    pub fn configured_methods(&self) -> impl Iterator<Item = &str> {
        self.per_method_options
            .keys()
            .map(String::as_str)
            .filter(|m| *m != WILDCARD)
    }

    /// Merged options for a method, falling back to the wildcard entry
    pub fn options_for(&self, method: &str) -> &Options {
        static EMPTY: Lazy<Options> = Lazy::new(Options::new);
        self.per_method_options
            .get(method)
            .or_else(|| self.per_method_options.get(WILDCARD))
            .unwrap_or(&*EMPTY)
    }

    /// Single option value for a method
    pub fn option(&self, method: &str, key: &str) -> Option<&Value> {
        self.options_for(method).get(key)
    }

    /// Hooks run before a method, in declaration order
    pub fn before_hooks(&self, method: &str) -> &[HookCall] {
        lookup(&self.before_hooks, method)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Hooks run after a method, in declaration order
    pub fn after_hooks(&self, method: &str) -> &[HookCall] {
        lookup(&self.after_hooks, method)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Dependency bindings for a method: property name to type name
    pub fn di_bindings(&self, method: &str) -> Option<&BTreeMap<String, String>> {
        lookup(&self.di_bindings, method)
    }

    /// Check if a method is listed as protected
    pub fn is_protected(&self, method: &str) -> bool {
        self.protected_methods.contains(method)
    }

    /// Check if a method is excluded through its options
    pub fn is_excluded(&self, method: &str) -> bool {
        self.option(method, "excluded")
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }

    /// Check if a method can be called from the client
    pub fn is_callable(&self, method: &str) -> bool {
        !self.is_protected(method) && !self.is_excluded(method)
    }
}

fn lookup<'a, T>(map: &'a BTreeMap<String, T>, method: &str) -> Option<&'a T> {
    map.get(method).or_else(|| map.get(WILDCARD))
}
