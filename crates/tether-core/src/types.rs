//! Common types used throughout Tether

use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of callable entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallableKind {
    /// A class exposing methods
    Class,
    /// A free function
    Function,
}

impl fmt::Display for CallableKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Class => write!(f, "class"),
            Self::Function => write!(f, "function"),
        }
    }
}

/// Resolved identity of an inbound call
///
/// Exactly one of `class_name` + `method_name` or `function_name` is
/// populated; the constructors are the only way to build one.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Target {
    kind: CallableKind,
    class_name: String,
    method_name: String,
    function_name: String,
}

impl Target {
    /// Target a method on a class
    pub fn class(class_name: impl Into<String>, method_name: impl Into<String>) -> Self {
        Self {
            kind: CallableKind::Class,
            class_name: class_name.into(),
            method_name: method_name.into(),
            function_name: String::new(),
        }
    }

    /// Target a function
    pub fn function(function_name: impl Into<String>) -> Self {
        Self {
            kind: CallableKind::Function,
            class_name: String::new(),
            method_name: String::new(),
            function_name: function_name.into(),
        }
    }

    /// Target kind
    pub fn kind(&self) -> CallableKind {
        self.kind
    }

    /// Class name (empty for function targets)
    pub fn class_name(&self) -> &str {
        &self.class_name
    }

    /// Method name (empty for function targets)
    pub fn method_name(&self) -> &str {
        &self.method_name
    }

    /// Function name (empty for class targets)
    pub fn function_name(&self) -> &str {
        &self.function_name
    }

    /// Check if this targets a class method
    pub fn is_class(&self) -> bool {
        self.kind == CallableKind::Class
    }

    /// Check if this targets a function
    pub fn is_function(&self) -> bool {
        self.kind == CallableKind::Function
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            CallableKind::Class => write!(f, "{}.{}", self.class_name, self.method_name),
            CallableKind::Function => write!(f, "{}", self.function_name),
        }
    }
}
