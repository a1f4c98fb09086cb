//! Domain layer for the document store.

pub mod errors;
pub mod transaction;

pub use errors::StoreError;
pub use transaction::Transaction;
