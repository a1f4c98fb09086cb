//! Caller-supplied task content.

use crate::domain::TaskError;
use serde::{Deserialize, Serialize};
use shared_types::{TaskDoc, TaskStatus, Timestamp};
use tm_05_category_eligibility::normalize_category_id;

/// Editable task fields. Owner and status never come from the caller.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskPayload {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub category_id: String,
    #[serde(default)]
    pub budget: Option<u64>,
}

impl TaskPayload {
    /// Trims text and canonicalizes the category.
    ///
    /// A title is required unless the task is saved as a draft.
    pub fn normalized(&self, draft: bool) -> Result<Self, TaskError> {
        let title = self.title.trim().to_string();
        if title.is_empty() && !draft {
            return Err(TaskError::InvalidPayload("title is required".into()));
        }
        let category_id = normalize_category_id(&self.category_id);
        if category_id.is_empty() {
            return Err(TaskError::InvalidPayload(format!(
                "unusable category {:?}",
                self.category_id
            )));
        }
        if self.budget == Some(0) {
            return Err(TaskError::InvalidPayload("budget must be positive".into()));
        }
        Ok(Self {
            title,
            description: self.description.trim().to_string(),
            category_id,
            budget: self.budget,
        })
    }

    /// New task document in `status`.
    #[must_use]
    pub fn into_task(self, task_id: &str, poster_id: &str, status: TaskStatus, now: Timestamp) -> TaskDoc {
        TaskDoc {
            task_id: task_id.to_string(),
            poster_id: poster_id.to_string(),
            title: self.title,
            description: self.description,
            category_id: self.category_id,
            budget: self.budget,
            status,
            assigned_helper_id: None,
            accepted_offer_id: None,
            final_amount: None,
            post_fee_txn_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Overwrites the editable fields of an existing task.
    pub fn merge_into(self, task: &mut TaskDoc, now: Timestamp) {
        task.title = self.title;
        task.description = self.description;
        task.category_id = self.category_id;
        task.budget = self.budget;
        task.updated_at = now;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(title: &str, category: &str) -> TaskPayload {
        TaskPayload {
            title: title.into(),
            description: "  details ".into(),
            category_id: category.into(),
            budget: Some(1500),
        }
    }

    #[test]
    fn test_normalization() {
        let p = payload("  Fix sink ", "Math Tutor").normalized(false).unwrap();
        assert_eq!(p.title, "Fix sink");
        assert_eq!(p.description, "details");
        assert_eq!(p.category_id, "tutoring_math");
    }

    #[test]
    fn test_title_required_unless_draft() {
        assert!(payload(" ", "cooking").normalized(false).is_err());
        assert!(payload(" ", "cooking").normalized(true).is_ok());
    }

    #[test]
    fn test_category_required() {
        assert!(matches!(
            payload("t", "%%").normalized(true),
            Err(TaskError::InvalidPayload(_))
        ));
    }
}
