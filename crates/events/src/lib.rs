//! Domain events and their distribution.
//!
//! Events here are *notices*: facts about credential lifecycle transitions
//! handed to non-essential collaborators (notifications, audit feeds). The
//! transactional store remains the source of truth.

pub mod bus;
pub mod envelope;
pub mod event;
pub mod in_memory_bus;

pub use bus::{EventBus, Subscription, publish_fail_soft};
pub use envelope::EventEnvelope;
pub use event::Event;
pub use in_memory_bus::{InMemoryBusError, InMemoryEventBus};
