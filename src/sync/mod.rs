//! Cross-context change notification.
//!
//! When one execution context writes to a storage area, every other context
//! sharing that area hears about it through a storage event. The bus models
//! that delivery rule in-process: the writing context never receives its
//! own event.

mod bus;

pub use bus::{StorageEvent, StorageEventBus};
