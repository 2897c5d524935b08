//! Application callbacks around owned calls

use std::fmt;
use std::sync::Arc;
use tether_core::{Error, RequestError, Target};
use tether_response::Response;

/// What to do after a `before` callback
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackAction {
    /// Continue to the target
    Continue,

    /// Stop here; the response is returned as is
    End,
}

impl CallbackAction {
    /// Check if action is continue
    pub fn is_continue(&self) -> bool {
        matches!(self, CallbackAction::Continue)
    }
}

/// Runs before every owned call
pub type BeforeCallback = Arc<dyn Fn(&Target, &mut Response) -> CallbackAction + Send + Sync>;

/// Runs after every successfully processed call
pub type AfterCallback = Arc<dyn Fn(&Target, &mut Response) + Send + Sync>;

/// Receives invalid target and malformed call errors
pub type InvalidTargetCallback = Arc<dyn Fn(&RequestError, &mut Response) + Send + Sync>;

/// Receives errors raised by methods and hooks
pub type ErrorCallback = Arc<dyn Fn(&Error, &mut Response) + Send + Sync>;

/// Installed callbacks
#[derive(Clone, Default)]
pub struct Callbacks {
    pub(crate) before: Vec<BeforeCallback>,
    pub(crate) after: Vec<AfterCallback>,
    pub(crate) invalid_target: Option<InvalidTargetCallback>,
    pub(crate) error: Option<ErrorCallback>,
}

impl fmt::Debug for Callbacks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Callbacks")
            .field("before_count", &self.before.len())
            .field("after_count", &self.after.len())
            .field("invalid_target", &self.invalid_target.is_some())
            .field("error", &self.error.is_some())
            .finish()
    }
}

impl Callbacks {
    /// Run `before` callbacks in installation order, stopping at the first `End`
    pub(crate) fn run_before(&self, target: &Target, response: &mut Response) -> CallbackAction {
        for callback in &self.before {
            if !callback(target, response).is_continue() {
                return CallbackAction::End;
            }
        }
        CallbackAction::Continue
    }

    pub(crate) fn run_after(&self, target: &Target, response: &mut Response) {
        for callback in &self.after {
            callback(target, response);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_before_stops_at_first_end() {
        let mut callbacks = Callbacks::default();
        callbacks.before.push(Arc::new(|_, response: &mut Response| {
            response.debug("first");
            CallbackAction::End
        }));
        callbacks.before.push(Arc::new(|_, response: &mut Response| {
            response.debug("second");
            CallbackAction::Continue
        }));

        let mut response = Response::new();
        let action = callbacks.run_before(&Target::function("f"), &mut response);
        assert_eq!(action, CallbackAction::End);
        assert_eq!(response.len(), 1);
    }

    #[test]
    fn test_debug_output() {
        let callbacks = Callbacks::default();
        let debug = format!("{callbacks:?}");
        assert!(debug.contains("before_count: 0"));
    }
}
