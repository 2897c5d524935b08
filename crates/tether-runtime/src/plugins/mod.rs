//! Built-in plugins
//!
//! - [`ClassPlugin`]: exports bound classes and owns `{class, method}` calls
//! - [`FunctionPlugin`]: exports bound functions and owns `{function}` calls
//! - [`DialogPlugin`]: `dialog.*` response commands

pub mod class;
pub mod dialog;
pub mod function;

pub use class::ClassPlugin;
pub use dialog::{DialogCommands, DialogExt, DialogPlugin};
pub use function::FunctionPlugin;

use std::collections::BTreeSet;
use tether_core::RequestError;

/// Name of the class plugin
pub const CLASS_PLUGIN: &str = "class";
/// Default priority of the class plugin
pub const CLASS_PRIORITY: i32 = 100;

/// Name of the function plugin
pub const FUNCTION_PLUGIN: &str = "function";
/// Default priority of the function plugin
pub const FUNCTION_PRIORITY: i32 = 101;

/// Name of the dialog plugin
pub const DIALOG_PLUGIN: &str = "dialog";
/// Default priority of the dialog plugin
pub const DIALOG_PRIORITY: i32 = 200;

/// Client-side entry point every stub calls
pub(crate) const CLIENT_REQUEST: &str = "tether.request";

/// Quote a string as a JavaScript literal
pub(crate) fn js_string(value: &str) -> String {
    serde_json::Value::String(value.to_string()).to_string()
}

/// Emit `a = a || {};` for every object on a dotted path, once
pub(crate) fn ensure_objects(path: &str, seen: &mut BTreeSet<String>, out: &mut String) {
    let mut current = String::new();
    for segment in path.split('.') {
        if current.is_empty() {
            current = format!("window.{segment}");
        } else {
            current = format!("{current}.{segment}");
        }
        if seen.insert(current.clone()) {
            out.push_str(&format!("{current} = {current} || {{}};\n"));
        }
    }
}

pub(crate) fn invalid(target: impl std::fmt::Display, reason: &str) -> tether_core::Error {
    RequestError::invalid_target(format!("{target}: {reason}")).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ensure_objects_once() {
        let mut seen = BTreeSet::new();
        let mut out = String::new();
        ensure_objects("Tether.App", &mut seen, &mut out);
        ensure_objects("Tether.App.Admin", &mut seen, &mut out);

        assert_eq!(
            out,
            "window.Tether = window.Tether || {};\n\
             window.Tether.App = window.Tether.App || {};\n\
             window.Tether.App.Admin = window.Tether.App.Admin || {};\n"
        );
    }

    #[test]
    fn test_js_string_escapes() {
        assert_eq!(js_string("a'b\"c"), r#""a'b\"c""#);
    }
}
