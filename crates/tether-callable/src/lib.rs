//! # Tether Callable
//!
//! The callable repository: declared and discovered classes and
//! functions, their option scopes, lazy directory and namespace scanning,
//! and the invalidation hash naming generated client code.

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    missing_debug_implementations,
    rust_2018_idioms,
    unreachable_pub
)]

pub mod entity;
pub mod naming;
pub mod repository;
mod resolver;
pub mod scanner;

pub use entity::{CallableEntity, HookCall, WILDCARD};
pub use repository::{CallableRepository, RepositoryStats};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::entity::{CallableEntity, HookCall, WILDCARD};
    pub use crate::repository::{CallableRepository, RepositoryStats};
}
