//! Adapters layer for the document store.

pub mod memory_store;

pub use memory_store::InMemoryDocumentStore;
