//! Adapters layer for stream admission.

pub mod memory_store;

pub use memory_store::InMemoryStreamStore;
