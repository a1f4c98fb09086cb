//! Ports layer for the document store.

pub mod store;

pub use store::*;
