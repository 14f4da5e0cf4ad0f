//! Window evaluation: which reminder stages are due right now.

use anyhow::Result;
use chrono::NaiveDateTime;

use crate::course::{self, Course};
use crate::dedup::{EntityKind, TriggerKey};
use crate::dispatch::{Alert, AlertKind, AlertMeta};
use crate::settings::ReminderSettings;
use crate::task::{Category, Task};

/// Half-width of the firing window in milliseconds. A stage fires while
/// `now` sits strictly inside `(target - lead) ± TOLERANCE_MS`; a distance
/// of exactly one minute does not fire.
pub const TOLERANCE_MS: i64 = 60_000;

/// One stage that is due: its dedup identity, the instant it points at,
/// and the composed alert.
#[derive(Debug, Clone)]
pub struct Trigger {
    pub key: TriggerKey,
    pub target: NaiveDateTime,
    pub alert: Alert,
}

/// Symmetric strict window test around `target - lead`.
pub fn in_window(now: NaiveDateTime, target: NaiveDateTime, lead_minutes: u32) -> bool {
    let diff_ms = (target - now).num_milliseconds();
    (diff_ms - i64::from(lead_minutes) * 60_000).abs() < TOLERANCE_MS
}

fn elapsed_beyond_tolerance(now: NaiveDateTime, target: NaiveDateTime) -> bool {
    (target - now).num_milliseconds() < -TOLERANCE_MS
}

/// Ordered stage leads for a task category.
///
/// `homework` and `exam` have no fallback: unconfigured means nothing
/// fires. The remaining categories degrade to built-in leads.
pub fn task_stage_leads(category: Category, settings: &ReminderSettings) -> Option<Vec<u32>> {
    match category {
        Category::Homework => settings.homework.map(|m| vec![m]),
        Category::Exam => {
            if settings.exam.is_empty() {
                None
            } else {
                Some(settings.exam.clone())
            }
        }
        Category::Lecture => Some(vec![settings.lecture.unwrap_or(60)]),
        Category::Meeting => Some(vec![settings.meeting.unwrap_or(30)]),
        Category::Default => Some(vec![settings.default.unwrap_or(60)]),
    }
}

fn task_alert(task: &Task, deadline: NaiveDateTime) -> Alert {
    let when = deadline.format("%Y-%m-%d %H:%M");
    match task.category {
        Category::Exam => Alert {
            title: format!("Exam reminder: {}", task.title),
            body: format!("Exam time: {when}"),
            tag: format!("exam-{}", task.id),
            meta: AlertMeta {
                kind: AlertKind::Exam,
                id: task.id.clone(),
            },
        },
        _ => Alert {
            title: format!("Task reminder: {}", task.title),
            body: format!("Due: {when}"),
            tag: format!("task-{}", task.id),
            meta: AlertMeta {
                kind: AlertKind::Task,
                id: task.id.clone(),
            },
        },
    }
}

fn course_alert(course: &Course, starts: NaiveDateTime) -> Alert {
    let when = starts.format("%Y-%m-%d %H:%M");
    let body = if course.location.is_empty() {
        format!("Starts at {when}")
    } else {
        format!("Starts at {when} @ {}", course.location)
    };
    Alert {
        title: format!("Course reminder: {}", course.name),
        body,
        tag: format!("course-{}", course.id),
        meta: AlertMeta {
            kind: AlertKind::Course,
            id: course.id.clone(),
        },
    }
}

/// Evaluate every configured stage of one task against `now`.
///
/// Completed tasks, tasks without a deadline, and deadlines elapsed beyond
/// tolerance are rejected before any window math. Each stage keys and
/// fires independently; stage index is the position in `leads`.
pub fn task_triggers(task: &Task, now: NaiveDateTime, leads: &[u32]) -> Vec<Trigger> {
    if task.completed {
        return vec![];
    }
    let Some(deadline) = task.deadline else {
        return vec![];
    };
    if elapsed_beyond_tolerance(now, deadline) {
        return vec![];
    }

    let mut out = Vec::new();
    for (stage, lead) in leads.iter().enumerate() {
        if !in_window(now, deadline, *lead) {
            continue;
        }
        out.push(Trigger {
            key: TriggerKey::new(EntityKind::Task, task.id.clone(), stage, deadline),
            target: deadline,
            alert: task_alert(task, deadline),
        });
    }
    out
}

/// Evaluate a course's single stage against `now`.
///
/// `Ok(None)` means out of window. `Err` means the course itself is
/// malformed (bad start time or weekday); the caller logs, skips it this
/// tick, and will see it again next tick.
pub fn course_trigger(course: &Course, now: NaiveDateTime, lead: u32) -> Result<Option<Trigger>> {
    let starts = course::next_occurrence(course, now)?;
    if !in_window(now, starts, lead) {
        return Ok(None);
    }
    Ok(Some(Trigger {
        key: TriggerKey::new(EntityKind::Course, course.id.clone(), 0, starts),
        target: starts,
        alert: course_alert(course, starts),
    }))
}
