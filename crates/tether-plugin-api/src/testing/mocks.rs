//! Mock implementations for testing

use crate::generator::CodeGenerator;
use crate::handler::RequestHandler;
use crate::plugin::Plugin;
use crate::provider::RegistryProvider;
use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use std::sync::Arc;
use tether_core::{CallDescriptor, Options, RegistrationKind, RequestError, Result, Target};
use tether_response::{Response, ResponseCommandSource};

/// Plugin without any capability
#[derive(Debug, Clone)]
pub struct BarePlugin {
    name: String,
}

impl BarePlugin {
    /// Create a new bare plugin
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl Plugin for BarePlugin {
    fn name(&self) -> &str {
        &self.name
    }
}

/// Mock request handler owning calls to one class or function name
#[derive(Debug, Clone)]
pub struct MockHandler {
    name: String,
    owns: String,
    processed: Arc<Mutex<Vec<String>>>,
}

impl MockHandler {
    /// Create a handler owning calls to `owns`
    pub fn new(name: impl Into<String>, owns: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            owns: owns.into(),
            processed: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Targets processed so far
    pub fn processed(&self) -> Vec<String> {
        self.processed.lock().clone()
    }
}

impl Plugin for MockHandler {
    fn name(&self) -> &str {
        &self.name
    }

    fn as_request_handler(self: Arc<Self>) -> Option<Arc<dyn RequestHandler>> {
        Some(self)
    }
}

#[async_trait]
impl RequestHandler for MockHandler {
    fn can_own(&self, call: &CallDescriptor) -> bool {
        call.class().or_else(|| call.function()) == Some(self.owns.as_str())
    }

    fn target(&self, call: &CallDescriptor) -> Result<Target> {
        match (call.class(), call.method(), call.function()) {
            (Some(class), Some(method), _) => Ok(Target::class(class, method)),
            (_, _, Some(function)) => Ok(Target::function(function)),
            _ => Err(RequestError::invalid_target("missing name").into()),
        }
    }

    async fn process(&self, target: &Target, _args: &[Value], response: &mut Response) -> Result<()> {
        self.processed.lock().push(target.to_string());
        response.debug(format!("{} processed {target}", self.name));
        Ok(())
    }
}

/// Mock code generator emitting a fixed script
#[derive(Debug, Clone)]
pub struct MockGenerator {
    name: String,
    script: String,
}

impl MockGenerator {
    /// Create a generator emitting `script`
    pub fn new(name: impl Into<String>, script: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            script: script.into(),
        }
    }
}

impl Plugin for MockGenerator {
    fn name(&self) -> &str {
        &self.name
    }

    fn as_code_generator(self: Arc<Self>) -> Option<Arc<dyn CodeGenerator>> {
        Some(self)
    }
}

impl CodeGenerator for MockGenerator {
    fn hash(&self) -> Result<String> {
        Ok(format!("{}:{}", self.name, self.script.len()))
    }

    fn script(&self) -> Result<String> {
        Ok(self.script.clone())
    }
}

/// Mock command source with a fixed namespace
#[derive(Debug, Clone)]
pub struct MockSource {
    name: String,
    namespace: String,
}

impl MockSource {
    /// Create a source emitting commands under `namespace`
    pub fn new(name: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.into(),
        }
    }
}

impl Plugin for MockSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn as_command_source(self: Arc<Self>) -> Option<Arc<dyn ResponseCommandSource>> {
        Some(self)
    }
}

impl ResponseCommandSource for MockSource {
    fn namespace(&self) -> &str {
        &self.namespace
    }
}

/// Mock registry provider recording registrations
#[derive(Debug, Clone)]
pub struct MockProvider {
    name: String,
    kinds: Vec<RegistrationKind>,
    registered: Arc<Mutex<Vec<(RegistrationKind, String, Options)>>>,
}

impl MockProvider {
    /// Create a provider accepting `kinds`
    pub fn new(name: impl Into<String>, kinds: &[RegistrationKind]) -> Self {
        Self {
            name: name.into(),
            kinds: kinds.to_vec(),
            registered: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Registrations received so far
    pub fn registered(&self) -> Vec<(RegistrationKind, String, Options)> {
        self.registered.lock().clone()
    }
}

impl Plugin for MockProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn as_registry_provider(self: Arc<Self>) -> Option<Arc<dyn RegistryProvider>> {
        Some(self)
    }
}

impl RegistryProvider for MockProvider {
    fn accepts(&self, kind: RegistrationKind) -> bool {
        self.kinds.contains(&kind)
    }

    fn register(&self, kind: RegistrationKind, identifier: &str, options: Options) -> Result<()> {
        self.registered
            .lock()
            .push((kind, identifier.to_string(), options));
        Ok(())
    }
}
