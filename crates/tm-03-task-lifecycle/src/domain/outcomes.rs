//! Results of task lifecycle operations.

use shared_types::{TaskDoc, TaskStatus};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishOutcome {
    pub task: TaskDoc,
    /// Fee charged by this call; 0 on an idempotent republish.
    pub fee_charged: u64,
    /// Poster balance after the charge, when one happened.
    pub balance: Option<u64>,
    pub already_published: bool,
}

/// Result of the post-fee safety net.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettleOutcome {
    /// The fee entry already exists.
    AlreadyCharged,
    Charged { fee: u64, balance: u64 },
    /// The poster could not pay; the task was deleted.
    Removed { poster_id: String, balance: u64 },
    /// The poster could not pay but the task had already moved past listing,
    /// so it was kept. A later settlement may still collect.
    Outstanding {
        poster_id: String,
        status: TaskStatus,
        balance: u64,
    },
    /// Nothing to settle (task gone, still a draft, or no fee configured).
    Skipped,
}

/// Binary classifier verdict on task text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModerationVerdict {
    Safe,
    Unsafe { reason: Option<String> },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModerationOutcome {
    /// Moved to `under_review` with a report.
    Flagged(TaskDoc),
    Unchanged,
}

/// A committed status change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskTransition {
    pub task: TaskDoc,
    pub from: TaskStatus,
}
