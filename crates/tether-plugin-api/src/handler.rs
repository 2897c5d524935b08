//! Request handler capability

use crate::plugin::Plugin;
use async_trait::async_trait;
use serde_json::Value;
use tether_core::{CallDescriptor, Result, Target};
use tether_response::Response;

/// Request handler plugin
///
/// Owns a kind of inbound call (class methods, functions, ...), turns it
/// into a [`Target`] and executes it.
#[async_trait]
pub trait RequestHandler: Plugin {
    /// Check if this handler owns the call
    ///
    /// Called for every call, in priority order, until one handler claims
    /// it. Must not have side effects.
    fn can_own(&self, call: &CallDescriptor) -> bool;

    /// Extract the normalized target of an owned call
    ///
    /// Fails with an invalid target error when the named callable is not
    /// exported.
    fn target(&self, call: &CallDescriptor) -> Result<Target>;

    /// Execute the target, appending commands to the response
    async fn process(&self, target: &Target, args: &[Value], response: &mut Response)
        -> Result<()>;
}
