//! Domain layer for the task lifecycle.

pub mod errors;
pub mod outcomes;
pub mod payload;
pub mod transitions;

pub use errors::TaskError;
pub use outcomes::{ModerationOutcome, ModerationVerdict, PublishOutcome, SettleOutcome, TaskTransition};
pub use payload::TaskPayload;
pub use transitions::assign_in;
