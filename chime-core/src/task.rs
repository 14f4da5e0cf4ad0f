//! Task snapshot model for the reminder engine.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Task category, driving which reminder leads apply.
///
/// Unknown categories from upstream data fold into `Default` so a new
/// category never breaks snapshot loading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Homework,
    Exam,
    Lecture,
    Meeting,
    #[serde(other)]
    Default,
}

/// One-shot scheduled item with an absolute deadline.
///
/// Note: we keep this small + serializable. The engine only ever reads
/// these; storage and editing are a caller concern.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub title: String,
    pub category: Category,

    /// Local wall-clock deadline. A task without one never triggers.
    pub deadline: Option<NaiveDateTime>,

    #[serde(default)]
    pub completed: bool,
}

impl Task {
    pub fn new(id: impl Into<String>, title: impl Into<String>, category: Category) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            category,
            deadline: None,
            completed: false,
        }
    }

    pub fn with_deadline(mut self, deadline: NaiveDateTime) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn completed(mut self, done: bool) -> Self {
        self.completed = done;
        self
    }
}
