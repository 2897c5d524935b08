//! Dialog plugin
//!
//! Emits `dialog.*` commands: modal messages and confirmations shown by
//! the client-side dialog library.

use super::DIALOG_PLUGIN;
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use tether_core::{Options, Result};
use tether_plugin_api::{CodeGenerator, Plugin};
use tether_response::{Command, CommandId, PluginCommands, Response, ResponseCommandSource};

const DIALOG_SCRIPT: &str = r#"tether.dialog = tether.dialog || {
    show: function(args) {
        var text = args.title ? args.title + "\n\n" + args.message : args.message;
        window.alert(text);
    },
    confirm: function(args) {
        return window.confirm(args.question);
    }
};
tether.register("dialog.alert", tether.dialog.show);
tether.register("dialog.success", tether.dialog.show);
tether.register("dialog.info", tether.dialog.show);
tether.register("dialog.warning", tether.dialog.show);
tether.register("dialog.error", tether.dialog.show);
tether.register("dialog.confirm", tether.dialog.confirm);
"#;

/// Message and confirmation dialogs
#[derive(Debug, Clone, Default)]
pub struct DialogPlugin {
    library: Option<String>,
}

impl DialogPlugin {
    /// Dialogs rendered by the default client library
    pub fn new() -> Self {
        Self::default()
    }

    /// Dialogs rendered by a named client library
    pub fn with_library(library: impl Into<String>) -> Self {
        Self {
            library: Some(library.into()),
        }
    }
}

impl Plugin for DialogPlugin {
    fn name(&self) -> &str {
        DIALOG_PLUGIN
    }

    fn description(&self) -> &str {
        "Message and confirmation dialogs"
    }

    fn as_command_source(self: Arc<Self>) -> Option<Arc<dyn ResponseCommandSource>> {
        Some(self)
    }

    fn as_code_generator(self: Arc<Self>) -> Option<Arc<dyn CodeGenerator>> {
        Some(self)
    }
}

impl ResponseCommandSource for DialogPlugin {
    fn namespace(&self) -> &str {
        DIALOG_PLUGIN
    }

    fn prepare(&self, command: &mut Command) {
        if let Some(library) = &self.library {
            command
                .args
                .insert("lib".to_string(), Value::String(library.clone()));
        }
    }
}

impl CodeGenerator for DialogPlugin {
    fn hash(&self) -> Result<String> {
        let mut hasher = Sha256::new();
        hasher.update(DIALOG_SCRIPT.as_bytes());
        Ok(format!("{:x}", hasher.finalize()))
    }

    fn script(&self) -> Result<String> {
        Ok(DIALOG_SCRIPT.to_string())
    }
}

/// Typed access to the dialog plugin from a response
pub trait DialogExt {
    /// Dialog commands, if the dialog plugin is registered
    fn dialog(&mut self) -> Option<DialogCommands<'_>>;
}

impl DialogExt for Response {
    fn dialog(&mut self) -> Option<DialogCommands<'_>> {
        self.plugin(DIALOG_PLUGIN)
            .map(|commands| DialogCommands { commands })
    }
}

/// Dialog commands bound to a response
#[derive(Debug)]
pub struct DialogCommands<'a> {
    commands: PluginCommands<'a>,
}

impl DialogCommands<'_> {
    /// Plain message
    pub fn alert(&mut self, message: &str) -> CommandId {
        self.message("alert", message, None)
    }

    /// Success message
    pub fn success(&mut self, message: &str, title: Option<&str>) -> CommandId {
        self.message("success", message, title)
    }

    /// Informational message
    pub fn info(&mut self, message: &str, title: Option<&str>) -> CommandId {
        self.message("info", message, title)
    }

    /// Warning message
    pub fn warning(&mut self, message: &str, title: Option<&str>) -> CommandId {
        self.message("warning", message, title)
    }

    /// Error message
    pub fn error(&mut self, message: &str, title: Option<&str>) -> CommandId {
        self.message("error", message, title)
    }

    /// Yes/no question
    pub fn confirm(&mut self, question: &str) -> CommandId {
        let mut args = Options::new();
        args.insert("question".to_string(), Value::String(question.to_string()));
        self.commands.add_command("confirm", args)
    }

    /// Underlying response
    pub fn response(&mut self) -> &mut Response {
        self.commands.response()
    }

    fn message(&mut self, kind: &str, message: &str, title: Option<&str>) -> CommandId {
        let mut args = Options::new();
        args.insert("message".to_string(), Value::String(message.to_string()));
        if let Some(title) = title {
            args.insert("title".to_string(), Value::String(title.to_string()));
        }
        self.commands.add_command(kind, args)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tether_plugin_runtime::PluginRegistry;

    fn response_with(plugin: DialogPlugin) -> Response {
        let plugins = PluginRegistry::new();
        plugins.register(Arc::new(plugin), 200).unwrap();
        Response::with_sources(Arc::new(plugins))
    }

    #[test]
    fn test_dialog_commands() {
        let mut response = response_with(DialogPlugin::new());
        {
            let mut dialog = response.dialog().unwrap();
            dialog.success("Saved", Some("Users"));
            dialog.confirm("Delete?");
        }

        assert_eq!(
            response.serialize(),
            json!([
                {
                    "name": "dialog.success",
                    "args": {"message": "Saved", "title": "Users"},
                    "options": {"plugin": "dialog"}
                },
                {
                    "name": "dialog.confirm",
                    "args": {"question": "Delete?"},
                    "options": {"plugin": "dialog"}
                }
            ])
        );
    }

    #[test]
    fn test_library_argument() {
        let mut response = response_with(DialogPlugin::with_library("bootbox"));
        response.dialog().unwrap().alert("Hi");
        assert_eq!(response.serialize()[0]["args"]["lib"], json!("bootbox"));
    }

    #[test]
    fn test_missing_plugin() {
        let mut response = Response::new();
        assert!(response.dialog().is_none());
    }
}
