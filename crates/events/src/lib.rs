//! `capstock-events`: in-process publish/subscribe for client state changes.
//!
//! The session core publishes derived state (the current role set) through
//! this crate so that dependent views can react to login/logout without
//! polling the session store.

pub mod bus;
pub mod in_memory_bus;

pub use bus::{EventBus, Subscription};
pub use in_memory_bus::{InMemoryBusError, InMemoryEventBus};
