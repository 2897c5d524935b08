//! Client code generation capability

use crate::plugin::Plugin;
use tether_core::Result;

/// Code generator plugin
///
/// Generated scripts are concatenated in plugin priority order.
pub trait CodeGenerator: Plugin {
    /// Digest identifying the current generated code
    fn hash(&self) -> Result<String>;

    /// Client-side code
    fn script(&self) -> Result<String>;
}
