//! # Tether Core
//!
//! Core types, traits, and error handling shared by every Tether crate.
//!
//! This crate provides the foundational abstractions:
//! - Call descriptors (the inbound, transport-independent call)
//! - Targets (the resolved identity of a call)
//! - Option maps and registration kinds
//! - The setup/request/handler error taxonomy

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    missing_debug_implementations,
    rust_2018_idioms,
    unreachable_pub
)]

pub mod call;
pub mod error;
pub mod options;
pub mod types;

pub use call::CallDescriptor;
pub use error::{Error, RequestError, Result, SetupError};
pub use options::{Options, RegistrationKind, RegistrationOptions};
pub use types::{CallableKind, Target};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::call::CallDescriptor;
    pub use crate::error::{Error, RequestError, Result, SetupError};
    pub use crate::options::{Options, RegistrationKind, RegistrationOptions};
    pub use crate::types::{CallableKind, Target};
    pub use serde_json::{json, Value};
}
