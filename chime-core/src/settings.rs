//! Per-category reminder lead configuration.

use serde::{Deserialize, Serialize};

use crate::task::Category;

/// Lead minutes per category. Exams carry an ordered list: every entry is
/// an independent reminder stage (e.g. a two-week review nudge and a
/// final one-hour heads-up).
///
/// `None` / empty means the category is unconfigured. For `homework`,
/// `course`, and `exam` that is a config gap and nothing fires; the other
/// categories fall back to built-in leads at evaluation time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReminderSettings {
    pub course: Option<u32>,
    pub homework: Option<u32>,
    #[serde(default)]
    pub exam: Vec<u32>,
    pub lecture: Option<u32>,
    pub meeting: Option<u32>,
    pub default: Option<u32>,
}

impl Default for ReminderSettings {
    fn default() -> Self {
        Self {
            course: Some(30),
            homework: Some(60),
            // 14 days out for review, 60 minutes out to leave.
            exam: vec![20_160, 60],
            lecture: Some(60),
            meeting: Some(30),
            default: Some(60),
        }
    }
}

/// Settings key a task category reads its lead from, for log messages
/// about config gaps.
pub fn settings_key(category: Category) -> &'static str {
    match category {
        Category::Homework => "homework",
        Category::Exam => "exam",
        Category::Lecture => "lecture",
        Category::Meeting => "meeting",
        Category::Default => "default",
    }
}
