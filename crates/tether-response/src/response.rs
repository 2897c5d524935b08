//! Response built by a call

use crate::command::Command;
use crate::queue::{CommandId, CommandQueue};
use crate::source::{CommandSourceRegistry, ResponseCommandSource};
use serde_json::{json, Value};
use std::sync::Arc;
use tether_core::Options;
use tracing::debug;

/// Command name for attribute assignment
pub const DOM_ASSIGN: &str = "dom.assign";
/// Command name for attribute append
pub const DOM_APPEND: &str = "dom.append";
/// Command name for script execution
pub const SCRIPT_EXEC: &str = "script.exec";
/// Command name for a client function call
pub const SCRIPT_CALL: &str = "script.call";
/// Command name for a redirect
pub const SCRIPT_REDIRECT: &str = "script.redirect";
/// Command name for a debug message
pub const SCRIPT_DEBUG: &str = "script.debug";

/// Commands produced by one call
///
/// Owned exclusively by the call being processed. Plugins reachable
/// through the attached [`CommandSourceRegistry`] may add their own
/// namespaced commands with [`Response::plugin`].
#[derive(Debug, Default)]
pub struct Response {
    queue: CommandQueue,
    sources: Option<Arc<dyn CommandSourceRegistry>>,
}

impl Response {
    /// Create an empty response without command sources
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty response reaching plugins through `sources`
    pub fn with_sources(sources: Arc<dyn CommandSourceRegistry>) -> Self {
        Self {
            queue: CommandQueue::new(),
            sources: Some(sources),
        }
    }

    /// Underlying queue
    pub fn queue(&self) -> &CommandQueue {
        &self.queue
    }

    /// Underlying queue, mutably
    pub fn queue_mut(&mut self) -> &mut CommandQueue {
        &mut self.queue
    }

    /// Take the queue out of the response
    pub fn into_queue(self) -> CommandQueue {
        self.queue
    }

    /// Append a raw command
    pub fn add_command(&mut self, name: impl Into<String>, args: Options) -> CommandId {
        self.queue.append(name, args, false)
    }

    /// Assign a value to an element attribute
    pub fn assign(&mut self, id: &str, attribute: &str, value: impl Into<Value>) -> CommandId {
        self.queue.append(
            DOM_ASSIGN,
            to_args(json!({"id": id, "attr": attribute, "value": value.into()})),
            false,
        )
    }

    /// Append text to an element attribute
    ///
    /// Consecutive appends to the same element and attribute are merged
    /// into one command.
    pub fn append(&mut self, id: &str, attribute: &str, value: &str) -> CommandId {
        let merged = match self.queue.tail_mut() {
            Some(tail)
                if tail.name == DOM_APPEND
                    && tail.component.is_none()
                    && tail.options.is_none()
                    && tail.arg("id").and_then(Value::as_str) == Some(id)
                    && tail.arg("attr").and_then(Value::as_str) == Some(attribute) =>
            {
                match tail.args.get_mut("value") {
                    Some(Value::String(current)) => {
                        current.push_str(value);
                        true
                    }
                    _ => false,
                }
            }
            _ => false,
        };

        if merged {
            if let Some(id) = self.queue.touch_tail() {
                return id;
            }
        }

        self.queue.append(
            DOM_APPEND,
            to_args(json!({"id": id, "attr": attribute, "value": value})),
            false,
        )
    }

    /// Execute client script
    ///
    /// Consecutive scripts are merged into one command.
    pub fn script(&mut self, code: &str) -> CommandId {
        let merged = match self.queue.tail_mut() {
            Some(tail)
                if tail.name == SCRIPT_EXEC && tail.component.is_none() && tail.options.is_none() =>
            {
                match tail.args.get_mut("code") {
                    Some(Value::String(current)) => {
                        current.push('\n');
                        current.push_str(code);
                        true
                    }
                    _ => false,
                }
            }
            _ => false,
        };

        if merged {
            if let Some(id) = self.queue.touch_tail() {
                return id;
            }
        }

        self.queue
            .append(SCRIPT_EXEC, to_args(json!({"code": code})), false)
    }

    /// Call a client function with arguments
    pub fn call(&mut self, function: &str, args: Vec<Value>) -> CommandId {
        self.queue
            .append(SCRIPT_CALL, to_args(json!({"func": function, "args": args})), false)
    }

    /// Redirect the browser, after an optional delay in seconds
    pub fn redirect(&mut self, url: &str, delay: u32) -> CommandId {
        self.queue.append(
            SCRIPT_REDIRECT,
            to_args(json!({"url": url, "delay": delay})),
            true,
        )
    }

    /// Show a debug message on the client
    pub fn debug(&mut self, message: impl Into<String>) -> CommandId {
        self.queue.append(
            SCRIPT_DEBUG,
            to_args(json!({"message": message.into()})),
            false,
        )
    }

    /// Tag the last command with a component
    pub fn bind_component(&mut self, name: &str, item: Option<&str>) -> &mut Self {
        self.queue.bind_last(name, item.map(str::to_string));
        self
    }

    /// Set an option on the last command
    pub fn set_option(&mut self, key: &str, value: impl Into<Value>) -> &mut Self {
        self.queue.set_last_option(key, value.into());
        self
    }

    /// Merge the commands of another response
    pub fn merge_response(&mut self, other: Response, before: bool) {
        self.queue.merge(other.queue, before);
    }

    /// Access a command source plugin by name
    ///
    /// Returns `None` when no source with that name is registered.
    pub fn plugin(&mut self, name: &str) -> Option<PluginCommands<'_>> {
        let source = self.sources.as_ref()?.command_source(name)?;
        Some(PluginCommands {
            plugin: name.to_string(),
            source,
            response: self,
        })
    }

    /// Number of queued commands
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// Check if no command was queued
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Wire representation
    pub fn serialize(&self) -> Value {
        self.queue.serialize()
    }

    /// Wire representation as a JSON string
    pub fn to_json(&self) -> tether_core::Result<String> {
        self.queue.to_json()
    }
}

/// Handle for adding commands on behalf of a command source plugin
#[derive(Debug)]
pub struct PluginCommands<'a> {
    plugin: String,
    source: Arc<dyn ResponseCommandSource>,
    response: &'a mut Response,
}

impl PluginCommands<'_> {
    /// Plugin name
    pub fn name(&self) -> &str {
        &self.plugin
    }

    /// Add `{namespace}.{command}` to the response
    pub fn add_command(&mut self, command: &str, args: Options) -> CommandId {
        let mut cmd = Command::new(format!("{}.{}", self.source.namespace(), command), args);
        self.source.prepare(&mut cmd);

        debug!(plugin = %self.plugin, command = %cmd.name, "Plugin command queued");

        let id = self.response.queue.push(cmd);
        self.response
            .queue
            .set_last_option("plugin", Value::String(self.plugin.clone()));
        id
    }

    /// Underlying response
    pub fn response(&mut self) -> &mut Response {
        self.response
    }
}

fn to_args(value: Value) -> Options {
    match value {
        Value::Object(map) => map,
        _ => Options::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[derive(Debug)]
    struct Toast;

    impl ResponseCommandSource for Toast {
        fn namespace(&self) -> &str {
            "toast"
        }

        fn prepare(&self, command: &mut Command) {
            command.args.insert("lib".to_string(), json!("native"));
        }
    }

    #[derive(Debug, Default)]
    struct Sources(HashMap<String, Arc<dyn ResponseCommandSource>>);

    impl CommandSourceRegistry for Sources {
        fn command_source(&self, name: &str) -> Option<Arc<dyn ResponseCommandSource>> {
            self.0.get(name).cloned()
        }
    }

    fn response_with_toast() -> Response {
        let mut sources = Sources::default();
        sources.0.insert("toast".to_string(), Arc::new(Toast));
        Response::with_sources(Arc::new(sources))
    }

    #[test]
    fn test_assign() {
        let mut response = Response::new();
        response.assign("out", "innerHTML", "hello");
        assert_eq!(
            response.serialize(),
            json!([{"name": "dom.assign", "args": {"id": "out", "attr": "innerHTML", "value": "hello"}}])
        );
    }

    #[test]
    fn test_append_merges_same_target() {
        let mut response = Response::new();
        response.append("log", "innerHTML", "a");
        response.append("log", "innerHTML", "b");
        response.append("other", "innerHTML", "c");
        response.append("log", "innerHTML", "d");

        let wire = response.serialize();
        assert_eq!(response.len(), 3);
        assert_eq!(wire[0]["args"]["value"], json!("ab"));
        assert_eq!(wire[2]["args"]["value"], json!("d"));
    }

    #[test]
    fn test_script_merges_consecutive() {
        let mut response = Response::new();
        response.script("a()");
        response.script("b()");
        response.debug("x");
        response.script("c()");

        let wire = response.serialize();
        assert_eq!(response.len(), 3);
        assert_eq!(wire[0]["args"]["code"], json!("a()\nb()"));
        assert_eq!(wire[2]["args"]["code"], json!("c()"));
    }

    #[test]
    fn test_merged_script_stays_last_appended() {
        let mut response = Response::new();
        let first = response.script("a()");
        response.queue_mut().insert_before("x", Options::new(), 1);
        let merged = response.script("b()");
        response.bind_component("widget", None);

        assert_eq!(first.index(), 0);
        assert_eq!(merged.index(), 1);
        assert_eq!(
            response.serialize(),
            json!([
                {"name": "x", "args": {}},
                {"name": "script.exec", "args": {"code": "a()\nb()"}, "component": {"name": "widget"}}
            ])
        );
    }

    #[test]
    fn test_merged_append_stays_last_appended() {
        let mut response = Response::new();
        response.append("log", "innerHTML", "a");
        response.queue_mut().insert_before("x", Options::new(), 1);
        response.append("log", "innerHTML", "b");
        response.set_option("scroll", true);

        let wire = response.serialize();
        assert_eq!(response.len(), 2);
        assert_eq!(wire[1]["args"]["value"], json!("ab"));
        assert_eq!(wire[1]["options"], json!({"scroll": true}));
        assert!(wire[0].get("options").is_none());
    }

    #[test]
    fn test_append_does_not_merge_into_bound_command() {
        let mut response = Response::new();
        response.append("log", "innerHTML", "a");
        response.bind_component("feed", Some("1"));
        response.append("log", "innerHTML", "b");

        let wire = response.serialize();
        assert_eq!(response.len(), 2);
        assert_eq!(wire[0]["args"]["value"], json!("a"));
        assert_eq!(wire[0]["component"], json!({"name": "feed", "item": "1"}));
        assert_eq!(wire[1]["args"]["value"], json!("b"));
        assert!(wire[1].get("component").is_none());
    }

    #[test]
    fn test_redirect_drops_empty() {
        let mut response = Response::new();
        response.redirect("/home", 0);
        assert_eq!(
            response.serialize()[0]["args"],
            json!({"url": "/home", "delay": 0})
        );

        response.redirect("", 2);
        assert_eq!(response.serialize()[1]["args"], json!({"delay": 2}));
    }

    #[test]
    fn test_bind_component_and_option() {
        let mut response = Response::new();
        response.assign("cart", "innerHTML", "3");
        response
            .bind_component("cart", Some("total"))
            .set_option("animate", true);

        let wire = response.serialize();
        assert_eq!(wire[0]["component"], json!({"name": "cart", "item": "total"}));
        assert_eq!(wire[0]["options"], json!({"animate": true}));
    }

    #[test]
    fn test_plugin_commands() {
        let mut response = response_with_toast();

        {
            let mut toast = response.plugin("toast").unwrap();
            assert_eq!(toast.name(), "toast");
            toast.add_command("show", to_args(json!({"text": "saved"})));
        }

        assert!(response.plugin("missing").is_none());

        let wire = response.serialize();
        assert_eq!(wire[0]["name"], json!("toast.show"));
        assert_eq!(wire[0]["args"], json!({"text": "saved", "lib": "native"}));
        assert_eq!(wire[0]["options"], json!({"plugin": "toast"}));
    }

    #[test]
    fn test_plugin_without_sources() {
        let mut response = Response::new();
        assert!(response.plugin("toast").is_none());
    }

    #[test]
    fn test_merge_response() {
        let mut response = Response::new();
        response.debug("main");

        let mut prelude = Response::new();
        prelude.debug("first");

        response.merge_response(prelude, true);
        let wire = response.serialize();
        assert_eq!(wire[0]["args"]["message"], json!("first"));
        assert_eq!(wire[1]["args"]["message"], json!("main"));
    }
}
