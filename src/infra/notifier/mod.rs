//! Notification sinks.

pub mod log;
pub mod memory;

pub use log::TracingNotifier;
pub use memory::InMemoryNotifier;
