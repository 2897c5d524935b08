//! Application context
//!
//! [`App`] owns the plugin registry, the callable repository, the
//! dispatcher and the installed callbacks. It is built once at startup by
//! [`AppBuilder`] and shared behind an `Arc` afterwards.

use crate::callable::{CallableClass, CallableFunction};
use crate::callbacks::{CallbackAction, Callbacks};
use crate::dispatcher::{Dispatch, Dispatcher};
use crate::plugins::{
    ClassPlugin, DialogPlugin, FunctionPlugin, CLASS_PRIORITY, DIALOG_PRIORITY,
    FUNCTION_PRIORITY,
};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use tether_callable::{CallableEntity, CallableRepository};
use tether_config::{validate_config, AppConfig};
use tether_core::{
    CallDescriptor, Error, Options, RegistrationKind, RegistrationOptions, RequestError, Result,
    SetupError, Target,
};
use tether_plugin_api::Plugin;
use tether_plugin_runtime::PluginRegistry;
use tether_response::Response;
use tracing::{debug, error, info, warn};

/// How a call ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestOutcome {
    /// No handler owns the call; it is not an API call
    NotOwned,

    /// The target was processed
    Processed(Target),

    /// A `before` callback ended the request before the target ran
    Ended(Target),

    /// An error was handed to an installed callback
    Recovered,
}

impl RequestOutcome {
    /// Check if a handler owned the call
    pub fn is_owned(&self) -> bool {
        !matches!(self, RequestOutcome::NotOwned)
    }
}

/// Application context
#[derive(Debug)]
pub struct App {
    config: AppConfig,
    plugins: PluginRegistry,
    repository: Arc<CallableRepository>,
    dispatcher: Dispatcher,
    callbacks: Callbacks,
    classes: Arc<ClassPlugin>,
    functions: Arc<FunctionPlugin>,
}

impl App {
    /// Start building an application
    pub fn builder() -> AppBuilder {
        AppBuilder::new()
    }

    /// Effective configuration
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Plugin registry
    pub fn plugins(&self) -> &PluginRegistry {
        &self.plugins
    }

    /// Callable repository
    pub fn repository(&self) -> &Arc<CallableRepository> {
        &self.repository
    }

    /// Dispatcher
    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Built-in class plugin
    pub fn class_plugin(&self) -> &Arc<ClassPlugin> {
        &self.classes
    }

    /// Built-in function plugin
    pub fn function_plugin(&self) -> &Arc<FunctionPlugin> {
        &self.functions
    }

    /// Register a function, class, directory or namespace
    ///
    /// Routed to the first registry provider, by priority, accepting the
    /// kind. A bare string option is shorthand for the kind's main option.
    pub fn register(
        &self,
        kind: RegistrationKind,
        identifier: &str,
        options: impl Into<RegistrationOptions>,
    ) -> Result<()> {
        let options = options.into().normalize(kind);

        let provider = self
            .plugins
            .registry_providers()
            .into_iter()
            .find(|provider| provider.accepts(kind))
            .ok_or_else(|| SetupError::NoProvider(kind.to_string()))?;

        debug!(
            kind = %kind,
            identifier = %identifier,
            provider = %provider.name(),
            "Routing registration"
        );

        provider.register(kind, identifier, options)
    }

    /// Resolve a class by client-facing or qualified name
    pub fn entity(&self, class: &str) -> Result<Arc<CallableEntity>> {
        let qualified = self
            .repository
            .resolve_external(class)?
            .unwrap_or_else(|| class.to_string());
        self.repository.resolve(&qualified)
    }

    /// Empty response with access to the registered command sources
    pub fn new_response(&self) -> Response {
        Response::with_sources(Arc::new(self.plugins.clone()))
    }

    /// Process one inbound call, appending commands to `response`
    ///
    /// Request errors go to the invalid-target callback and handler errors
    /// to the error callback. Without a callback the error is returned,
    /// after a `script.debug` command carrying its message is appended.
    /// Setup errors are always returned.
    pub async fn process_request(
        &self,
        call: &CallDescriptor,
        response: &mut Response,
    ) -> Result<RequestOutcome> {
        let Dispatch { handler, target } = match self.dispatcher.dispatch(call) {
            Ok(Some(dispatch)) => dispatch,
            Ok(None) => return Ok(RequestOutcome::NotOwned),
            Err(e) => return self.recover(call, e, response),
        };

        let args = match call.args() {
            Ok(args) => args,
            Err(e) => return self.recover(call, e.into(), response),
        };

        if self.callbacks.run_before(&target, response) == CallbackAction::End {
            debug!(call_id = %call.call_id, target = %target, "Request ended by callback");
            return Ok(RequestOutcome::Ended(target));
        }

        if let Err(e) = handler.process(&target, &args, response).await {
            return self.recover(call, e, response);
        }

        self.callbacks.run_after(&target, response);

        debug!(
            call_id = %call.call_id,
            target = %target,
            commands = response.len(),
            "Request processed"
        );

        Ok(RequestOutcome::Processed(target))
    }

    /// Process a call in a fresh response
    ///
    /// Returns `None` when no handler owns the call.
    pub async fn handle(&self, call: &CallDescriptor) -> Result<Option<Response>> {
        let mut response = self.new_response();
        match self.process_request(call, &mut response).await? {
            RequestOutcome::NotOwned => Ok(None),
            _ => Ok(Some(response)),
        }
    }

    /// Client script of every code generator, in priority order
    pub fn script(&self) -> Result<String> {
        let mut out = String::new();

        for generator in self.plugins.code_generators() {
            let script = generator.script()?;
            if script.is_empty() {
                continue;
            }
            out.push_str(&script);
            if !script.ends_with('\n') {
                out.push('\n');
            }
        }

        Ok(out)
    }

    /// Digest of every code generator hash; names the generated script
    pub fn script_hash(&self) -> Result<String> {
        let mut hasher = Sha256::new();

        for generator in self.plugins.code_generators() {
            hasher.update(format!("{}:{}\n", generator.name(), generator.hash()?).as_bytes());
        }

        Ok(format!("{:x}", hasher.finalize()))
    }

    fn recover(
        &self,
        call: &CallDescriptor,
        error: Error,
        response: &mut Response,
    ) -> Result<RequestOutcome> {
        if matches!(error, Error::Setup(_)) {
            error!(call_id = %call.call_id, error = %error, "Setup error during request");
            return Err(error);
        }

        match &error {
            Error::Request(request_error) => {
                if let Some(callback) = &self.callbacks.invalid_target {
                    debug!(call_id = %call.call_id, error = %error, "Invalid target recovered");
                    callback(request_error, response);
                    return Ok(RequestOutcome::Recovered);
                }
            }
            _ => {
                if let Some(callback) = &self.callbacks.error {
                    debug!(call_id = %call.call_id, error = %error, "Handler error recovered");
                    callback(&error, response);
                    return Ok(RequestOutcome::Recovered);
                }
            }
        }

        warn!(call_id = %call.call_id, error = %error, "Request failed");
        response.debug(error.to_string());
        Err(error)
    }
}

/// Builder for [`App`]
#[derive(Debug, Default)]
pub struct AppBuilder {
    config: AppConfig,
    plugins: Vec<(Arc<dyn Plugin>, i32)>,
    classes: Vec<(String, Arc<dyn CallableClass>)>,
    functions: Vec<(String, Arc<dyn CallableFunction>)>,
    callbacks: Callbacks,
}

impl AppBuilder {
    /// Create a new builder with the default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Set configuration
    pub fn config(mut self, config: AppConfig) -> Self {
        self.config = config;
        self
    }

    /// Add a plugin at a default priority
    ///
    /// A priority configured for the plugin's name takes precedence.
    pub fn plugin(mut self, plugin: Arc<dyn Plugin>, priority: i32) -> Self {
        self.plugins.push((plugin, priority));
        self
    }

    /// Export a class implementation under a class name
    ///
    /// Classes not declared by configuration or found by a scan are
    /// declared with no options.
    pub fn class(mut self, name: impl Into<String>, class: impl CallableClass + 'static) -> Self {
        self.classes.push((name.into(), Arc::new(class)));
        self
    }

    /// Export a function implementation under a function name
    pub fn function(
        mut self,
        name: impl Into<String>,
        function: impl CallableFunction + 'static,
    ) -> Self {
        self.functions.push((name.into(), Arc::new(function)));
        self
    }

    /// Run a callback before every owned call
    pub fn before<F>(mut self, callback: F) -> Self
    where
        F: Fn(&Target, &mut Response) -> CallbackAction + Send + Sync + 'static,
    {
        self.callbacks.before.push(Arc::new(callback));
        self
    }

    /// Run a callback after every processed call
    pub fn after<F>(mut self, callback: F) -> Self
    where
        F: Fn(&Target, &mut Response) + Send + Sync + 'static,
    {
        self.callbacks.after.push(Arc::new(callback));
        self
    }

    /// Handle invalid targets and malformed calls
    pub fn on_invalid_target<F>(mut self, callback: F) -> Self
    where
        F: Fn(&RequestError, &mut Response) + Send + Sync + 'static,
    {
        self.callbacks.invalid_target = Some(Arc::new(callback));
        self
    }

    /// Handle errors raised by methods and hooks
    pub fn on_error<F>(mut self, callback: F) -> Self
    where
        F: Fn(&Error, &mut Response) + Send + Sync + 'static,
    {
        self.callbacks.error = Some(Arc::new(callback));
        self
    }

    /// Register plugins, apply configured declarations and bind callables
    pub fn build(self) -> Result<App> {
        let config = self.config;
        validate_config(&config)?;

        let repository = Arc::new(CallableRepository::new(
            config.core.options.clone(),
            config.core.merge_policy(),
        ));

        let classes = Arc::new(ClassPlugin::new(
            Arc::clone(&repository),
            config.core.prefix.class.clone(),
            config.core.debug,
        ));
        let functions = Arc::new(FunctionPlugin::new(
            Arc::clone(&repository),
            config.core.prefix.function.clone(),
        ));

        let mut plugins: Vec<(Arc<dyn Plugin>, i32)> = vec![
            (Arc::clone(&classes) as Arc<dyn Plugin>, CLASS_PRIORITY),
            (Arc::clone(&functions) as Arc<dyn Plugin>, FUNCTION_PRIORITY),
            (Arc::new(DialogPlugin::new()) as Arc<dyn Plugin>, DIALOG_PRIORITY),
        ];
        plugins.extend(self.plugins);

        let registry = PluginRegistry::new();
        for (plugin, priority) in plugins {
            let name = plugin.name().to_string();
            if !config.plugin_enabled(&name) {
                info!(plugin = %name, "Plugin disabled by configuration");
                continue;
            }
            let priority = config.plugin_priority(&name).unwrap_or(priority);
            registry.register(plugin, priority)?;
        }

        let app = App {
            plugins: registry.clone(),
            repository,
            dispatcher: Dispatcher::new(registry),
            callbacks: self.callbacks,
            classes,
            functions,
            config,
        };

        app.apply_declarations()?;

        for (name, class) in self.classes {
            let qualified = app.classes.bind(&name, class)?;
            if !app.repository.contains_class(&qualified) {
                app.repository.scan_if_needed()?;
            }
            if !app.repository.contains_class(&qualified) {
                app.repository.declare_class(&qualified, Options::new())?;
            }
        }

        for (name, function) in self.functions {
            app.functions.bind(&name, function)?;
            if !app.repository.contains_function(&name) {
                app.repository.declare_function(&name, Options::new())?;
            }
        }

        let stats = app.repository.stats();
        info!(
            plugins = app.plugins.len(),
            classes = stats.classes,
            functions = stats.functions,
            directories = stats.directories,
            namespaces = stats.namespaces,
            "Application built"
        );

        Ok(app)
    }
}

impl App {
    fn apply_declarations(&self) -> Result<()> {
        let sections = [
            (RegistrationKind::Directory, &self.config.directories),
            (RegistrationKind::Namespace, &self.config.namespaces),
            (RegistrationKind::Class, &self.config.classes),
            (RegistrationKind::Function, &self.config.functions),
        ];

        for (kind, declarations) in sections {
            for (identifier, options) in declarations {
                self.register(kind, identifier, options.clone())?;
            }
        }

        Ok(())
    }
}
