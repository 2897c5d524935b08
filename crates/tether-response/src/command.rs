//! Client-side commands

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tether_core::Options;

/// Component tag attached to a command after the fact
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Component {
    /// Component name
    pub name: String,

    /// Item within the component, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item: Option<String>,
}

/// One client-side instruction
///
/// Serializes to `{name, args, component?, options?}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Command {
    /// Command name, e.g. `dom.assign`
    pub name: String,

    /// Ordered arguments
    #[serde(default)]
    pub args: Options,

    /// Component tag
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub component: Option<Component>,

    /// Extra options
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Options>,
}

impl Command {
    /// Create a command
    pub fn new(name: impl Into<String>, args: Options) -> Self {
        Self {
            name: name.into(),
            args,
            component: None,
            options: None,
        }
    }

    /// Argument lookup
    pub fn arg(&self, key: &str) -> Option<&Value> {
        self.args.get(key)
    }

    /// Tag the command with a component
    pub fn set_component(&mut self, name: impl Into<String>, item: Option<String>) {
        self.component = Some(Component {
            name: name.into(),
            item,
        });
    }

    /// Set one option, creating the option map if needed
    pub fn set_option(&mut self, key: impl Into<String>, value: Value) {
        self.options
            .get_or_insert_with(Options::new)
            .insert(key.into(), value);
    }

    /// Drop arguments that carry no value
    pub(crate) fn remove_empty_args(&mut self) {
        self.args.retain(|_, value| !is_empty(value));
    }
}

fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        Value::Bool(_) | Value::Number(_) => false,
    }
}
