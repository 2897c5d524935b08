//! Call dispatch
//!
//! Request handlers are asked, in ascending priority order, whether they
//! own a call. The first owner extracts the target; later handlers are
//! never consulted.

use std::fmt;
use std::sync::Arc;
use tether_core::{CallDescriptor, Result, Target};
use tether_plugin_api::RequestHandler;
use tether_plugin_runtime::PluginRegistry;
use tracing::debug;

/// Owned call: the owning handler and the extracted target
#[derive(Clone)]
pub struct Dispatch {
    /// Owning handler
    pub handler: Arc<dyn RequestHandler>,

    /// Normalized target
    pub target: Target,
}

impl fmt::Debug for Dispatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatch")
            .field("handler", &self.handler.name())
            .field("target", &self.target)
            .finish()
    }
}

/// Finds the owner of inbound calls
#[derive(Debug, Clone)]
pub struct Dispatcher {
    plugins: PluginRegistry,
}

impl Dispatcher {
    /// Create a dispatcher over the registry's request handlers
    pub fn new(plugins: PluginRegistry) -> Self {
        Self { plugins }
    }

    /// Find the owning handler and extract the target
    ///
    /// `Ok(None)` means no handler owns the call: it is not an API call.
    /// Target extraction errors of the owner are returned as is.
    pub fn dispatch(&self, call: &CallDescriptor) -> Result<Option<Dispatch>> {
        let Some(handler) = self.owner(call) else {
            debug!(call_id = %call.call_id, "No handler owns the call");
            return Ok(None);
        };

        let target = handler.target(call)?;

        debug!(
            call_id = %call.call_id,
            handler = %handler.name(),
            target = %target,
            "Call dispatched"
        );

        Ok(Some(Dispatch { handler, target }))
    }

    /// First handler, by priority, that owns the call
    pub fn owner(&self, call: &CallDescriptor) -> Option<Arc<dyn RequestHandler>> {
        self.plugins
            .request_handlers()
            .into_iter()
            .find(|handler| handler.can_own(call))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tether_plugin_api::testing::MockHandler;

    #[test]
    fn test_first_owner_wins() {
        let plugins = PluginRegistry::new();
        plugins
            .register(Arc::new(MockHandler::new("late", "Sample")), 20)
            .unwrap();
        plugins
            .register(Arc::new(MockHandler::new("early", "Sample")), 10)
            .unwrap();

        let dispatcher = Dispatcher::new(plugins);
        let call = CallDescriptor::class_call("Sample", "run", vec![json!(1)]);

        let dispatch = dispatcher.dispatch(&call).unwrap().unwrap();
        assert_eq!(dispatch.handler.name(), "early");
        assert_eq!(dispatch.target.class_name(), "Sample");
        assert_eq!(dispatch.target.method_name(), "run");
    }

    #[test]
    fn test_no_owner_is_not_an_error() {
        let plugins = PluginRegistry::new();
        plugins
            .register(Arc::new(MockHandler::new("only", "Sample")), 10)
            .unwrap();

        let dispatcher = Dispatcher::new(plugins);
        let call = CallDescriptor::class_call("Other", "run", Vec::new());
        assert!(dispatcher.dispatch(&call).unwrap().is_none());

        let page_load = CallDescriptor::from_pairs([("page", "home")]);
        assert!(dispatcher.dispatch(&page_load).unwrap().is_none());
    }
}
