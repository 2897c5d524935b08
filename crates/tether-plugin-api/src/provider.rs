//! Registration capability

use crate::plugin::Plugin;
use tether_core::{Options, RegistrationKind, Result};

/// Registry provider plugin
///
/// Registrations are routed to the first provider, in priority order,
/// that accepts their kind.
pub trait RegistryProvider: Plugin {
    /// Check if this provider handles a registration kind
    fn accepts(&self, kind: RegistrationKind) -> bool;

    /// Register a callable, directory or namespace
    fn register(&self, kind: RegistrationKind, identifier: &str, options: Options) -> Result<()>;
}
