//! Class plugin

use super::{ensure_objects, invalid, js_string, CLASS_PLUGIN, CLIENT_REQUEST};
use crate::callable::{CallContext, CallableClass};
use async_trait::async_trait;
use dashmap::DashMap;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;
use tether_callable::naming;
use tether_callable::scanner::is_identifier;
use tether_callable::{CallableEntity, CallableRepository};
use tether_core::{
    CallDescriptor, Error, Options, RegistrationKind, Result, SetupError, Target,
};
use tether_plugin_api::{CodeGenerator, Plugin, RegistryProvider, RequestHandler};
use tether_response::Response;
use tracing::debug;

/// Client-facing or qualified class name
static CLASS_NAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*(?:(?:\.|::)[A-Za-z_][A-Za-z0-9_]*)*$")
        .expect("static regex is valid")
});

/// Exports classes and owns `{class, method}` calls
///
/// Also accepts class, directory and namespace registrations into the
/// callable repository.
pub struct ClassPlugin {
    repository: Arc<CallableRepository>,
    bindings: DashMap<String, Arc<dyn CallableClass>>,
    prefix: String,
    debug: bool,
}

impl fmt::Debug for ClassPlugin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClassPlugin")
            .field("prefix", &self.prefix)
            .field("bindings_count", &self.bindings.len())
            .field("debug", &self.debug)
            .finish()
    }
}

impl ClassPlugin {
    /// Create the plugin over a repository, exporting under `prefix`
    pub fn new(repository: Arc<CallableRepository>, prefix: impl Into<String>, debug: bool) -> Self {
        Self {
            repository,
            bindings: DashMap::new(),
            prefix: prefix.into(),
            debug,
        }
    }

    /// Bind an implementation to a class name; returns the qualified name
    pub fn bind(&self, name: &str, class: Arc<dyn CallableClass>) -> Result<String> {
        let qualified = naming::normalize(name)
            .ok_or_else(|| SetupError::malformed(name, "not a valid class name"))?;

        debug!(class = %qualified, methods = class.methods().len(), "Class bound");
        self.bindings.insert(qualified.clone(), class);
        Ok(qualified)
    }

    /// Implementation bound to a qualified name
    pub fn binding(&self, qualified: &str) -> Option<Arc<dyn CallableClass>> {
        self.bindings.get(qualified).map(|entry| Arc::clone(entry.value()))
    }

    /// Qualified names of bound classes, sorted
    pub fn bound_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.bindings.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }

    /// Object prefix classes are exported under
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    fn entity(&self, qualified: &str) -> Result<Arc<CallableEntity>> {
        match self.repository.resolve(qualified) {
            Err(Error::Setup(SetupError::UnknownCallable(_))) => {
                Err(invalid(qualified, "unknown class"))
            }
            other => other,
        }
    }

    fn class_script(
        &self,
        entity: &CallableEntity,
        methods: &[&str],
        seen: &mut BTreeSet<String>,
        out: &mut String,
    ) {
        let external = entity.external_name();
        let object = format!("{}.{external}", self.prefix);
        ensure_objects(&object, seen, out);

        if self.debug {
            out.push_str(&format!("// {} ({})\n", external, entity.qualified_name()));
        }

        let class_literal = js_string(external);
        for method in methods.iter().filter(|m| entity.is_callable(m)) {
            out.push_str(&format!(
                "window.{object}.{method} = function() {{\n    \
                 return {CLIENT_REQUEST}({{ class: {class_literal}, method: {} }}, {{ parameters: arguments }});\n\
                 }};\n",
                js_string(method)
            ));
        }
    }
}

impl Plugin for ClassPlugin {
    fn name(&self) -> &str {
        CLASS_PLUGIN
    }

    fn description(&self) -> &str {
        "Exports classes to the client"
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
impl RequestHandler for ClassPlugin {
    fn can_own(&self, call: &CallDescriptor) -> bool {
        call.is_class_call()
    }

    fn target(&self, call: &CallDescriptor) -> Result<Target> {
        let (Some(class), Some(method)) = (call.class(), call.method()) else {
            return Err(invalid("class call", "missing class or method"));
        };
        if !CLASS_NAME.is_match(class) {
            return Err(invalid(class, "malformed class name"));
        }
        if !is_identifier(method) {
            return Err(invalid(format!("{class}.{method}"), "malformed method name"));
        }

        let qualified = self
            .repository
            .resolve_external(class)?
            .ok_or_else(|| invalid(class, "unknown class"))?;
        let binding = self
            .binding(&qualified)
            .ok_or_else(|| invalid(&qualified, "class is not bound"))?;
        let entity = self.entity(&qualified)?;

        if !binding.has_method(method) {
            return Err(invalid(format!("{class}.{method}"), "unknown method"));
        }
        if !entity.is_callable(method) {
            return Err(invalid(format!("{class}.{method}"), "method is not exported"));
        }

        Ok(Target::class(qualified, method))
    }

    async fn process(&self, target: &Target, args: &[Value], response: &mut Response) -> Result<()> {
        let qualified = target.class_name();
        let binding = self
            .binding(qualified)
            .ok_or_else(|| invalid(qualified, "class is not bound"))?;
        let entity = self.entity(qualified)?;
        let method = target.method_name();

        let before = entity.before_hooks(method);
        let after = entity.after_hooks(method);
        for hook in before.iter().chain(after) {
            if !binding.has_method(&hook.method) {
                return Err(SetupError::malformed(
                    qualified,
                    format!("hook '{}' is not a method of the class", hook.method),
                )
                .into());
            }
        }

        let mut ctx = CallContext::new(target, args, &entity, response);

        for hook in before {
            debug!(class = %qualified, hook = %hook.method, "Running before hook");
            binding
                .call(&hook.method, &hook.args, &mut ctx)
                .await
                .map_err(Error::handler)?;
        }

        debug!(class = %qualified, method = %method, "Calling method");
        binding
            .call(method, args, &mut ctx)
            .await
            .map_err(Error::handler)?;

        for hook in after {
            debug!(class = %qualified, hook = %hook.method, "Running after hook");
            binding
                .call(&hook.method, &hook.args, &mut ctx)
                .await
                .map_err(Error::handler)?;
        }

        Ok(())
    }
}

impl CodeGenerator for ClassPlugin {
    fn hash(&self) -> Result<String> {
        let mut hasher = Sha256::new();
        hasher.update(format!("prefix:{}:{}\n", self.prefix, self.debug).as_bytes());
        hasher.update(self.repository.invalidation_hash()?.as_bytes());
        for name in self.bound_names() {
            hasher.update(format!("bound:{name}\n").as_bytes());
        }
        Ok(format!("{:x}", hasher.finalize()))
    }

    fn script(&self) -> Result<String> {
        let mut out = String::new();
        let mut seen = BTreeSet::new();

        for qualified in self.repository.class_names()? {
            let entity = self.repository.resolve(&qualified)?;

            // Unbound classes export the methods their options name
            let methods: Vec<&str> = match self.binding(&qualified) {
                Some(binding) => binding.methods().to_vec(),
                None => entity.configured_methods().collect(),
            };
            if methods.is_empty() {
                debug!(class = %qualified, "No exported methods, no stub emitted");
                continue;
            }

            self.class_script(&entity, &methods, &mut seen, &mut out);
        }

        Ok(out)
    }
}

impl RegistryProvider for ClassPlugin {
    fn accepts(&self, kind: RegistrationKind) -> bool {
        matches!(
            kind,
            RegistrationKind::Class | RegistrationKind::Directory | RegistrationKind::Namespace
        )
    }

    fn register(&self, kind: RegistrationKind, identifier: &str, options: Options) -> Result<()> {
        match kind {
            RegistrationKind::Class => self.repository.declare_class(identifier, options),
            RegistrationKind::Directory => self.repository.declare_directory(identifier, options),
            RegistrationKind::Namespace => self.repository.declare_namespace(identifier, options),
            RegistrationKind::Function => Err(SetupError::NoProvider(kind.to_string()).into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug)]
    struct Sample;

    #[async_trait]
    impl CallableClass for Sample {
        fn methods(&self) -> &[&'static str] {
            &["myMethod", "log", "secret"]
        }

        async fn call(
            &self,
            method: &str,
            args: &[Value],
            ctx: &mut CallContext<'_>,
        ) -> anyhow::Result<()> {
            match method {
                "myMethod" => {
                    ctx.response().assign("out", "innerHTML", args[0].clone());
                    Ok(())
                }
                "log" => {
                    ctx.response().debug("log");
                    Ok(())
                }
                other => anyhow::bail!("no method {other}"),
            }
        }
    }

    fn opts(value: Value) -> Options {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected an object"),
        }
    }

    fn plugin() -> ClassPlugin {
        let repository = Arc::new(CallableRepository::default());
        repository
            .declare_class(
                "app::Sample",
                opts(json!({
                    "protected": ["secret"],
                    "before": {"myMethod": ["log"]}
                })),
            )
            .unwrap();
        let plugin = ClassPlugin::new(repository, "Tether", false);
        plugin.bind("app::Sample", Arc::new(Sample)).unwrap();
        plugin
    }

    #[test]
    fn test_owns_class_calls_only() {
        let plugin = plugin();
        assert!(plugin.can_own(&CallDescriptor::class_call("App.Sample", "myMethod", vec![])));
        assert!(!plugin.can_own(&CallDescriptor::function_call("hello", vec![])));
    }

    #[test]
    fn test_target_from_external_name() {
        let plugin = plugin();
        let call = CallDescriptor::class_call("App.Sample", "myMethod", vec![]);
        let target = plugin.target(&call).unwrap();
        assert_eq!(target.class_name(), "app::Sample");
        assert_eq!(target.method_name(), "myMethod");
    }

    #[test]
    fn test_invalid_targets() {
        let plugin = plugin();
        for (class, method) in [
            ("App.Missing", "myMethod"),
            ("App.Sample", "nope"),
            ("App.Sample", "secret"),
            ("App..Sample", "myMethod"),
            ("App.Sample", "my-method"),
        ] {
            let call = CallDescriptor::class_call(class, method, vec![]);
            let err = plugin.target(&call).unwrap_err();
            assert!(err.is_request(), "{class}.{method}: {err}");
        }
    }

    #[tokio::test]
    async fn test_process_runs_hooks() {
        let plugin = plugin();
        let target = Target::class("app::Sample", "myMethod");
        let mut response = Response::new();

        plugin
            .process(&target, &[json!("hi")], &mut response)
            .await
            .unwrap();

        let wire = response.serialize();
        assert_eq!(wire[0]["name"], json!("script.debug"));
        assert_eq!(wire[1]["args"]["value"], json!("hi"));
    }

    #[test]
    fn test_script_skips_protected() {
        let plugin = plugin();
        let script = plugin.script().unwrap();

        assert!(script.contains("window.Tether.App = window.Tether.App || {};"));
        assert!(script.contains("window.Tether.App.Sample.myMethod = function()"));
        assert!(script.contains(r#"class: "App.Sample", method: "myMethod""#));
        assert!(!script.contains("secret"));
    }

    #[test]
    fn test_script_for_unbound_class() {
        let plugin = plugin();
        plugin
            .repository
            .declare_class(
                "Remote",
                opts(json!({"methods": {"fetch": {}, "drop": {"excluded": true}}})),
            )
            .unwrap();

        let script = plugin.script().unwrap();
        assert!(script.contains("window.Tether.Remote.fetch = function()"));
        assert!(!script.contains("Remote.drop"));
    }

    #[test]
    fn test_hash_tracks_bindings() {
        let plugin = plugin();
        let before = plugin.hash().unwrap();
        assert_eq!(before, plugin.hash().unwrap());

        plugin.bind("Other", Arc::new(Sample)).unwrap();
        assert_ne!(before, plugin.hash().unwrap());
    }

    #[test]
    fn test_registration_kinds() {
        let plugin = plugin();
        assert!(plugin.accepts(RegistrationKind::Directory));
        assert!(!plugin.accepts(RegistrationKind::Function));

        RegistryProvider::register(&plugin, RegistrationKind::Class, "Extra", Options::new())
            .unwrap();
        assert!(plugin.repository.contains_class("Extra"));
    }
}
