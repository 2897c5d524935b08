//! # Tether Runtime
//!
//! The application context: built-in plugins, dispatch of inbound calls
//! to their owning handler, callbacks, and client script generation.
//!
//! ## Example
//!
//! ```rust,no_run
//! use async_trait::async_trait;
//! use serde_json::{json, Value};
//! use tether_runtime::prelude::*;
//!
//! #[derive(Debug)]
//! struct Sample;
//!
//! #[async_trait]
//! impl CallableClass for Sample {
//!     fn methods(&self) -> &[&'static str] {
//!         &["myMethod"]
//!     }
//!
//!     async fn call(
//!         &self,
//!         _method: &str,
//!         _args: &[Value],
//!         ctx: &mut CallContext<'_>,
//!     ) -> anyhow::Result<()> {
//!         ctx.response().assign("out", "innerHTML", "hello");
//!         Ok(())
//!     }
//! }
//!
//! # async fn run() -> tether_core::Result<()> {
//! let app = App::builder().class("Sample", Sample).build()?;
//!
//! let call = CallDescriptor::class_call("Sample", "myMethod", vec![json!(1)]);
//! let response = app.handle(&call).await?;
//! assert!(response.is_some());
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    missing_debug_implementations,
    rust_2018_idioms,
    unreachable_pub
)]

pub mod app;
pub mod callable;
pub mod callbacks;
pub mod dispatcher;
pub mod plugins;

pub use app::{App, AppBuilder, RequestOutcome};
pub use callable::{CallContext, CallableClass, CallableFunction, FnFunction};
pub use callbacks::CallbackAction;
pub use dispatcher::{Dispatch, Dispatcher};
pub use plugins::{ClassPlugin, DialogExt, DialogPlugin, FunctionPlugin};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::app::{App, AppBuilder, RequestOutcome};
    pub use crate::callable::{CallContext, CallableClass, CallableFunction, FnFunction};
    pub use crate::callbacks::CallbackAction;
    pub use crate::plugins::DialogExt;
    pub use tether_core::{CallDescriptor, RegistrationKind, Target};
    pub use tether_response::Response;
}
