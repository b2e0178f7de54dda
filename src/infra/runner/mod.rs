//! Job-runner backends.

pub mod memory;

pub use memory::{InMemoryJobRunner, RunnerJob};
