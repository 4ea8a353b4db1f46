//! The shared store and its provider scope.
//!
//! This module provides the in-memory mapping, per-key subscriptions, and
//! the thread-local provider stack that consumer bindings resolve against.

mod scope;
mod store;

pub use store::{SharedStore, Subscription};
