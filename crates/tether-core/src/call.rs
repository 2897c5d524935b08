//! Inbound call descriptor

use crate::error::RequestError;
use crate::options::Options;
use serde_json::Value;
use uuid::Uuid;

/// Field holding the class name of a method call
pub const CLASS_FIELD: &str = "class";
/// Field holding the method name of a method call
pub const METHOD_FIELD: &str = "method";
/// Field holding the function name of a function call
pub const FUNCTION_FIELD: &str = "function";
/// Field holding the call arguments
pub const ARGS_FIELD: &str = "args";

/// Flat key/value description of an inbound call
///
/// Produced by the transport adaptation layer from query parameters or a
/// parsed request body. Holds either `{class, method, args}` or
/// `{function, args}`; anything else is not an API call.
#[derive(Debug, Clone)]
pub struct CallDescriptor {
    /// Unique call ID for tracing
    pub call_id: String,

    fields: Options,
}

impl CallDescriptor {
    /// Create a descriptor from raw fields
    pub fn new(fields: Options) -> Self {
        Self {
            call_id: Uuid::new_v4().to_string(),
            fields,
        }
    }

    /// Describe a call to a class method
    pub fn class_call(class: &str, method: &str, args: Vec<Value>) -> Self {
        let mut fields = Options::new();
        fields.insert(CLASS_FIELD.to_string(), Value::String(class.to_string()));
        fields.insert(METHOD_FIELD.to_string(), Value::String(method.to_string()));
        fields.insert(ARGS_FIELD.to_string(), Value::Array(args));
        Self::new(fields)
    }

    /// Describe a call to a function
    pub fn function_call(function: &str, args: Vec<Value>) -> Self {
        let mut fields = Options::new();
        fields.insert(FUNCTION_FIELD.to_string(), Value::String(function.to_string()));
        fields.insert(ARGS_FIELD.to_string(), Value::Array(args));
        Self::new(fields)
    }

    /// Parse a descriptor from a JSON object body
    pub fn from_json(body: &str) -> Result<Self, RequestError> {
        match serde_json::from_str::<Value>(body) {
            Ok(Value::Object(fields)) => Ok(Self::new(fields)),
            Ok(other) => Err(RequestError::malformed(format!(
                "expected a JSON object, got {other}"
            ))),
            Err(e) => Err(RequestError::malformed(format!("invalid JSON body: {e}"))),
        }
    }

    /// Build a descriptor from decoded query parameters
    ///
    /// Every value is kept as a string; `args` is decoded lazily by
    /// [`CallDescriptor::args`].
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let fields = pairs
            .into_iter()
            .map(|(k, v)| (k.into(), Value::String(v.into())))
            .collect();
        Self::new(fields)
    }

    /// Raw field lookup
    pub fn field(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// All raw fields
    pub fn fields(&self) -> &Options {
        &self.fields
    }

    /// Class name, if present and non-empty
    pub fn class(&self) -> Option<&str> {
        self.non_empty_str(CLASS_FIELD)
    }

    /// Method name, if present and non-empty
    pub fn method(&self) -> Option<&str> {
        self.non_empty_str(METHOD_FIELD)
    }

    /// Function name, if present and non-empty
    pub fn function(&self) -> Option<&str> {
        self.non_empty_str(FUNCTION_FIELD)
    }

    /// Check for a class + method pair
    pub fn is_class_call(&self) -> bool {
        self.class().is_some() && self.method().is_some()
    }

    /// Check for a bare function name
    pub fn is_function_call(&self) -> bool {
        self.function().is_some()
    }

    /// Decode the call arguments
    ///
    /// Accepts a JSON array or a string holding a JSON-encoded array. A
    /// missing field means no arguments.
    pub fn args(&self) -> Result<Vec<Value>, RequestError> {
        match self.fields.get(ARGS_FIELD) {
            None | Some(Value::Null) => Ok(Vec::new()),
            Some(Value::Array(args)) => Ok(args.clone()),
            Some(Value::String(encoded)) if encoded.is_empty() => Ok(Vec::new()),
            Some(Value::String(encoded)) => match serde_json::from_str::<Value>(encoded) {
                Ok(Value::Array(args)) => Ok(args),
                Ok(_) => Err(RequestError::malformed("args must encode a JSON array")),
                Err(e) => Err(RequestError::malformed(format!("invalid args encoding: {e}"))),
            },
            Some(other) => Err(RequestError::malformed(format!(
                "args must be an array, got {other}"
            ))),
        }
    }

    fn non_empty_str(&self, key: &str) -> Option<&str> {
        self.fields
            .get(key)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_class_call() {
        let call = CallDescriptor::class_call("Sample", "myMethod", vec![json!(1)]);
        assert!(!call.call_id.is_empty());
        assert!(call.is_class_call());
        assert!(!call.is_function_call());
        assert_eq!(call.class(), Some("Sample"));
        assert_eq!(call.method(), Some("myMethod"));
        assert_eq!(call.args().unwrap(), vec![json!(1)]);
    }

    #[test]
    fn test_function_call_from_json() {
        let call = CallDescriptor::from_json(r#"{"function": "hello", "args": ["a"]}"#).unwrap();
        assert!(call.is_function_call());
        assert_eq!(call.function(), Some("hello"));
        assert_eq!(call.args().unwrap(), vec![json!("a")]);
    }

    #[test]
    fn test_from_pairs_decodes_args() {
        let call = CallDescriptor::from_pairs([
            ("class", "Sample"),
            ("method", "save"),
            ("args", r#"[1, "two"]"#),
        ]);
        assert_eq!(call.args().unwrap(), vec![json!(1), json!("two")]);
    }

    #[test]
    fn test_blank_names_are_absent() {
        let call = CallDescriptor::from_pairs([("class", " "), ("method", "save")]);
        assert!(!call.is_class_call());
        assert_eq!(call.args().unwrap(), Vec::<Value>::new());
    }

    #[test]
    fn test_malformed_args() {
        let call = CallDescriptor::from_pairs([("function", "f"), ("args", "{\"a\":1}")]);
        assert!(matches!(call.args(), Err(RequestError::MalformedCall(_))));

        assert!(CallDescriptor::from_json("[1, 2]").is_err());
        assert!(CallDescriptor::from_json("{not json").is_err());
    }
}
