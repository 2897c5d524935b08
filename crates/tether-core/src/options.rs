//! Option maps and registration kinds

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Ordered option dictionary attached to every declaration scope
pub type Options = serde_json::Map<String, Value>;

/// What a registration call declares
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegistrationKind {
    /// A single function
    Function,
    /// A single class
    Class,
    /// A directory of class sources without a namespace
    Directory,
    /// A namespace, optionally backed by a directory
    Namespace,
}

impl RegistrationKind {
    /// Option key a bare-string option is sugar for
    pub fn shorthand_key(&self) -> &'static str {
        match self {
            Self::Function | Self::Class => "include",
            Self::Directory => "namespace",
            Self::Namespace => "directory",
        }
    }
}

impl fmt::Display for RegistrationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Function => write!(f, "function"),
            Self::Class => write!(f, "class"),
            Self::Directory => write!(f, "directory"),
            Self::Namespace => write!(f, "namespace"),
        }
    }
}

/// Options as handed to the registration API: a map, or a bare string
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RegistrationOptions {
    /// Bare string, sugar for the kind's shorthand key
    Shorthand(String),
    /// Full option map
    Map(Options),
}

impl RegistrationOptions {
    /// Normalize into an option map for the given registration kind
    pub fn normalize(self, kind: RegistrationKind) -> Options {
        match self {
            Self::Map(options) => options,
            Self::Shorthand(value) => {
                let mut options = Options::new();
                options.insert(kind.shorthand_key().to_string(), Value::String(value));
                options
            }
        }
    }
}

impl Default for RegistrationOptions {
    fn default() -> Self {
        Self::Map(Options::new())
    }
}

impl From<Options> for RegistrationOptions {
    fn from(options: Options) -> Self {
        Self::Map(options)
    }
}

impl From<&str> for RegistrationOptions {
    fn from(value: &str) -> Self {
        Self::Shorthand(value.to_string())
    }
}

impl From<String> for RegistrationOptions {
    fn from(value: String) -> Self {
        Self::Shorthand(value)
    }
}

impl TryFrom<Value> for RegistrationOptions {
    type Error = crate::SetupError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Object(options) => Ok(Self::Map(options)),
            Value::String(value) => Ok(Self::Shorthand(value)),
            Value::Null => Ok(Self::default()),
            other => Err(crate::SetupError::malformed(
                "registration",
                format!("expected a map or a string, got {other}"),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_shorthand_normalization() {
        let options = RegistrationOptions::from("app::ajax").normalize(RegistrationKind::Directory);
        assert_eq!(options.get("namespace"), Some(&json!("app::ajax")));

        let options = RegistrationOptions::from("/srv/ajax").normalize(RegistrationKind::Namespace);
        assert_eq!(options.get("directory"), Some(&json!("/srv/ajax")));

        let options = RegistrationOptions::from("src/sample.rs").normalize(RegistrationKind::Class);
        assert_eq!(options.get("include"), Some(&json!("src/sample.rs")));
    }

    #[test]
    fn test_untagged_deserialize() {
        let parsed: RegistrationOptions = serde_json::from_value(json!("app")).unwrap();
        assert_eq!(parsed, RegistrationOptions::Shorthand("app".to_string()));

        let parsed: RegistrationOptions =
            serde_json::from_value(json!({"separator": "_"})).unwrap();
        assert!(matches!(parsed, RegistrationOptions::Map(_)));
    }

    #[test]
    fn test_try_from_rejects_numbers() {
        assert!(RegistrationOptions::try_from(json!(12)).is_err());
        assert_eq!(
            RegistrationOptions::try_from(Value::Null).unwrap(),
            RegistrationOptions::default()
        );
    }

    #[test]
    fn test_kind_display() {
        assert_eq!(RegistrationKind::Namespace.to_string(), "namespace");
        let json = serde_json::to_string(&RegistrationKind::Directory).unwrap();
        assert_eq!(json, "\"directory\"");
    }
}
