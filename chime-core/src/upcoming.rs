//! Lookahead query: everything whose reminder horizon covers now.

use chrono::{Duration, NaiveDateTime};
use log::debug;

use crate::course::{self, Course};
use crate::dispatch::AlertKind;
use crate::settings::ReminderSettings;
use crate::task::{Category, Task};
use crate::trigger;

/// One entity whose target lies within its lead horizon.
#[derive(Debug, Clone, PartialEq)]
pub struct UpcomingEvent {
    pub kind: AlertKind,
    pub id: String,
    pub title: String,
    pub target: NaiveDateTime,
    pub minutes_left: i64,
}

fn within(now: NaiveDateTime, target: NaiveDateTime, lead_minutes: u32) -> bool {
    target >= now && target <= now + Duration::minutes(i64::from(lead_minutes))
}

/// Tasks and courses whose target falls inside `[now, now + horizon]`,
/// where the horizon is the entity's largest configured stage lead.
/// Sorted ascending by target. Completed tasks, unconfigured categories,
/// and malformed courses contribute nothing.
pub fn upcoming_events(
    now: NaiveDateTime,
    tasks: &[Task],
    courses: &[Course],
    settings: &ReminderSettings,
) -> Vec<UpcomingEvent> {
    let mut out = Vec::new();

    for task in tasks {
        if task.completed {
            continue;
        }
        let Some(deadline) = task.deadline else {
            continue;
        };
        let Some(leads) = trigger::task_stage_leads(task.category, settings) else {
            continue;
        };
        let horizon = leads.iter().copied().max().unwrap_or(0);
        if within(now, deadline, horizon) {
            out.push(UpcomingEvent {
                kind: if task.category == Category::Exam {
                    AlertKind::Exam
                } else {
                    AlertKind::Task
                },
                id: task.id.clone(),
                title: task.title.clone(),
                target: deadline,
                minutes_left: (deadline - now).num_minutes(),
            });
        }
    }

    for course in courses {
        let Some(lead) = settings.course else {
            continue;
        };
        let starts = match course::next_occurrence(course, now) {
            Ok(s) => s,
            Err(e) => {
                debug!("upcoming: skipping course '{}': {e:#}", course.id);
                continue;
            }
        };
        if within(now, starts, lead) {
            out.push(UpcomingEvent {
                kind: AlertKind::Course,
                id: course.id.clone(),
                title: course.name.clone(),
                target: starts,
                minutes_left: (starts - now).num_minutes(),
            });
        }
    }

    out.sort_by_key(|e| e.target);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(d: u32, h: u32, mi: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 2, d)
            .unwrap()
            .and_hms_opt(h, mi, 0)
            .unwrap()
    }

    #[test]
    fn lists_only_targets_inside_the_horizon() {
        let now = at(18, 9, 0);
        let tasks = vec![
            Task::new("near", "essay", Category::Homework).with_deadline(at(18, 9, 30)),
            Task::new("far", "thesis", Category::Homework).with_deadline(at(18, 13, 0)),
        ];
        let got = upcoming_events(now, &tasks, &[], &ReminderSettings::default());
        assert_eq!(got.len(), 1);
        assert_eq!(got[0].id, "near");
        assert_eq!(got[0].minutes_left, 30);
    }

    #[test]
    fn exam_horizon_is_its_largest_stage() {
        let now = at(11, 9, 0);
        let tasks =
            vec![Task::new("e1", "final", Category::Exam).with_deadline(at(18, 9, 0))];
        let got = upcoming_events(now, &tasks, &[], &ReminderSettings::default());
        assert_eq!(got.len(), 1);
        assert_eq!(got[0].kind, AlertKind::Exam);
    }

    #[test]
    fn sorted_by_target_with_courses_interleaved() {
        // 2026-02-18 is a Wednesday.
        let now = at(18, 9, 0);
        let tasks =
            vec![Task::new("t1", "essay", Category::Homework).with_deadline(at(18, 9, 50))];
        let courses = vec![Course::new("c1", "Databases", 3, "09:10")];
        let got = upcoming_events(now, &tasks, &courses, &ReminderSettings::default());
        let ids: Vec<&str> = got.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["c1", "t1"]);
    }

    #[test]
    fn completed_and_malformed_are_left_out() {
        let now = at(18, 9, 0);
        let tasks = vec![
            Task::new("done", "essay", Category::Homework)
                .with_deadline(at(18, 9, 30))
                .completed(true),
        ];
        let courses = vec![Course::new("bad", "Ghost", 3, "abc")];
        let got = upcoming_events(now, &tasks, &courses, &ReminderSettings::default());
        assert!(got.is_empty());
    }
}
