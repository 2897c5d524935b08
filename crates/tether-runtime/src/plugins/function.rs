//! Function plugin

use super::{invalid, js_string, CLIENT_REQUEST, FUNCTION_PLUGIN};
use crate::callable::{CallContext, CallableFunction};
use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::fmt;
use std::sync::Arc;
use tether_callable::scanner::is_identifier;
use tether_callable::{CallableEntity, CallableRepository};
use tether_core::{
    CallDescriptor, Error, Options, RegistrationKind, Result, SetupError, Target,
};
use tether_plugin_api::{CodeGenerator, Plugin, RegistryProvider, RequestHandler};
use tether_response::Response;
use tracing::debug;

/// Exports declared functions and owns `{function}` calls
pub struct FunctionPlugin {
    repository: Arc<CallableRepository>,
    bindings: DashMap<String, Arc<dyn CallableFunction>>,
    prefix: String,
}

impl fmt::Debug for FunctionPlugin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionPlugin")
            .field("prefix", &self.prefix)
            .field("bindings_count", &self.bindings.len())
            .finish()
    }
}

impl FunctionPlugin {
    /// Create the plugin, exporting functions as `{prefix}{name}`
    pub fn new(repository: Arc<CallableRepository>, prefix: impl Into<String>) -> Self {
        Self {
            repository,
            bindings: DashMap::new(),
            prefix: prefix.into(),
        }
    }

    /// Bind an implementation to a function name
    pub fn bind(&self, name: &str, function: Arc<dyn CallableFunction>) -> Result<()> {
        let name = name.trim();
        if !is_identifier(name) {
            return Err(SetupError::malformed(name, "not a valid function name").into());
        }

        debug!(function = %name, "Function bound");
        self.bindings.insert(name.to_string(), function);
        Ok(())
    }

    /// Implementation bound to a function name
    pub fn binding(&self, name: &str) -> Option<Arc<dyn CallableFunction>> {
        self.bindings.get(name).map(|entry| Arc::clone(entry.value()))
    }

    /// Names of bound functions, sorted
    pub fn bound_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.bindings.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }

    fn entity(&self, name: &str) -> Result<Arc<CallableEntity>> {
        match self.repository.resolve_function(name) {
            Err(Error::Setup(SetupError::UnknownCallable(_))) => Err(invalid(name, "unknown function")),
            other => other,
        }
    }
}

impl Plugin for FunctionPlugin {
    fn name(&self) -> &str {
        FUNCTION_PLUGIN
    }

    fn description(&self) -> &str {
        "Exports functions to the client"
    }

    fn as_request_handler(self: Arc<Self>) -> Option<Arc<dyn RequestHandler>> {
        Some(self)
    }

    fn as_code_generator(self: Arc<Self>) -> Option<Arc<dyn CodeGenerator>> {
        Some(self)
    }

    fn as_registry_provider(self: Arc<Self>) -> Option<Arc<dyn RegistryProvider>> {
        Some(self)
    }
}

#[async_trait]
impl RequestHandler for FunctionPlugin {
    fn can_own(&self, call: &CallDescriptor) -> bool {
        call.is_function_call() && !call.is_class_call()
    }

    fn target(&self, call: &CallDescriptor) -> Result<Target> {
        let Some(external) = call.function() else {
            return Err(invalid("function call", "missing function name"));
        };
        if !is_identifier(external) {
            return Err(invalid(external, "malformed function name"));
        }

        let name = self
            .repository
            .resolve_function_external(external)
            .ok_or_else(|| invalid(external, "unknown function"))?;
        if self.binding(&name).is_none() {
            return Err(invalid(external, "function is not bound"));
        }
        if !self.entity(&name)?.is_callable(&name) {
            return Err(invalid(external, "function is not exported"));
        }

        Ok(Target::function(name))
    }

    async fn process(&self, target: &Target, args: &[Value], response: &mut Response) -> Result<()> {
        let name = target.function_name();
        let binding = self
            .binding(name)
            .ok_or_else(|| invalid(name, "function is not bound"))?;
        let entity = self.entity(name)?;

        debug!(function = %name, "Calling function");
        let mut ctx = CallContext::new(target, args, &entity, response);
        binding.call(args, &mut ctx).await.map_err(Error::handler)
    }
}

impl CodeGenerator for FunctionPlugin {
    fn hash(&self) -> Result<String> {
        let mut hasher = Sha256::new();
        hasher.update(format!("prefix:{}\n", self.prefix).as_bytes());
        for name in self.bound_names() {
            let external = self.entity(&name).map(|e| e.external_name().to_string());
            hasher.update(format!("bound:{name}:{}\n", external.unwrap_or_default()).as_bytes());
        }
        Ok(format!("{:x}", hasher.finalize()))
    }

    fn script(&self) -> Result<String> {
        let mut out = String::new();

        for name in self.repository.function_names() {
            let entity = self.repository.resolve_function(&name)?;
            if !entity.is_callable(&name) {
                continue;
            }

            let external = entity.external_name();
            out.push_str(&format!(
                "window.{}{external} = function() {{\n    \
                 return {CLIENT_REQUEST}({{ function: {} }}, {{ parameters: arguments }});\n\
                 }};\n",
                self.prefix,
                js_string(external)
            ));
        }

        Ok(out)
    }
}

impl RegistryProvider for FunctionPlugin {
    fn accepts(&self, kind: RegistrationKind) -> bool {
        kind == RegistrationKind::Function
    }

    fn register(&self, kind: RegistrationKind, identifier: &str, options: Options) -> Result<()> {
        match kind {
            RegistrationKind::Function => self.repository.declare_function(identifier, options),
            other => Err(SetupError::NoProvider(other.to_string()).into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::callable::FnFunction;
    use serde_json::json;

    fn plugin() -> FunctionPlugin {
        let repository = Arc::new(CallableRepository::default());
        let mut options = Options::new();
        options.insert("alias".to_string(), json!("sayHello"));
        repository.declare_function("hello", options).unwrap();

        let mut options = Options::new();
        options.insert("excluded".to_string(), json!(true));
        repository.declare_function("hidden", options).unwrap();

        let plugin = FunctionPlugin::new(repository, "tether_");
        let hello = FnFunction::new(|args, ctx| {
            let name = args.first().and_then(Value::as_str).unwrap_or("world");
            ctx.response().assign("out", "innerHTML", format!("hello {name}"));
            Ok(())
        });
        plugin.bind("hello", Arc::new(hello)).unwrap();
        plugin
            .bind("hidden", Arc::new(FnFunction::new(|_, _| Ok(()))))
            .unwrap();
        plugin
    }

    #[test]
    fn test_alias_resolves_to_name() {
        let plugin = plugin();
        let call = CallDescriptor::function_call("sayHello", vec![]);
        assert!(plugin.can_own(&call));
        assert_eq!(plugin.target(&call).unwrap().function_name(), "hello");

        let by_name = CallDescriptor::function_call("hello", vec![]);
        assert!(plugin.target(&by_name).unwrap_err().is_request());
    }

    #[test]
    fn test_excluded_function_is_invalid() {
        let plugin = plugin();
        let call = CallDescriptor::function_call("hidden", vec![]);
        assert!(plugin.target(&call).unwrap_err().is_request());
        assert!(!plugin.script().unwrap().contains("hidden"));
    }

    #[tokio::test]
    async fn test_process() {
        let plugin = plugin();
        let mut response = Response::new();
        plugin
            .process(&Target::function("hello"), &[json!("bob")], &mut response)
            .await
            .unwrap();
        assert_eq!(response.serialize()[0]["args"]["value"], json!("hello bob"));
    }

    #[test]
    fn test_script_uses_alias() {
        let plugin = plugin();
        plugin
            .repository
            .declare_function("unbound", Options::new())
            .unwrap();

        let script = plugin.script().unwrap();
        assert!(script.contains("window.tether_unbound = function()"));
        assert!(script.starts_with("window.tether_sayHello = function() {"));
        assert!(script.contains(r#"function: "sayHello""#));
    }
}
