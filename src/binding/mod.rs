//! Per-consumer bindings.
//!
//! A binding associates one consumer with one key of the current
//! provider's store, yielding a live value and a setter bound to that key.

mod binding;

pub use binding::{use_shared_state, SharedValue};
