//! Testing utilities for plugin developers
//!
//! Mock plugins exposing one capability each, plus one exposing none.

pub mod mocks;

pub use mocks::{BarePlugin, MockGenerator, MockHandler, MockProvider, MockSource};
