//! Engine orchestration: one atomic evaluation pass per tick.

use std::collections::HashSet;

use chrono::NaiveDateTime;
use log::{debug, info, warn};

use crate::course::Course;
use crate::dedup::DedupTracker;
use crate::dispatch::{self, Alert, Delivery, NotifyHost};
use crate::permission::{Capability, PermissionGate};
use crate::settings::{ReminderSettings, settings_key};
use crate::task::Task;
use crate::trigger::{self, Trigger};

/// Counters and delivered alerts from one tick.
#[derive(Debug, Clone, Default)]
pub struct TickSummary {
    /// Entities looked at (tasks + courses).
    pub evaluated: usize,
    /// Alerts actually delivered, in firing order.
    pub fired: Vec<Alert>,
    /// Stages due but suppressed for lack of a grant.
    pub suppressed: usize,
    /// Stages due but the host refused delivery.
    pub failed: usize,
    /// Stages due but already recorded as fired.
    pub deduped: usize,
    /// Malformed courses put off until the next tick.
    pub skipped: usize,
}

/// Explicitly constructed reminder engine.
///
/// Owns the host, the permission gate, and the fired-set; snapshots are
/// borrowed immutably for the duration of a tick and never cached.
pub struct ReminderEngine<H: NotifyHost> {
    host: H,
    gate: PermissionGate,
    dedup: DedupTracker,
    warned_missing: HashSet<&'static str>,
}

impl<H: NotifyHost> ReminderEngine<H> {
    pub fn new(host: H) -> Self {
        let gate = PermissionGate::from_host(&host);
        Self {
            host,
            gate,
            dedup: DedupTracker::new(),
            warned_missing: HashSet::new(),
        }
    }

    pub fn capability(&self) -> Capability {
        self.gate.capability()
    }

    /// See [`PermissionGate::request_authorization`].
    pub fn request_authorization(&mut self) -> bool {
        self.gate.request_authorization(&mut self.host)
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    /// Stages recorded as fired so far this process.
    pub fn fired_len(&self) -> usize {
        self.dedup.len()
    }

    fn warn_once_missing(&mut self, key: &'static str) {
        if self.warned_missing.insert(key) {
            warn!("no '{key}' lead configured; those reminders never fire");
        }
    }

    fn fire(&mut self, trig: Trigger, summary: &mut TickSummary) {
        // Record before delivering: suppression or a host failure never
        // un-fires a key, so a later grant cannot replay a backlog.
        if !self.dedup.should_fire(trig.key, trig.target) {
            summary.deduped += 1;
            return;
        }
        match dispatch::deliver(&mut self.host, &self.gate, &trig.alert) {
            Delivery::Delivered => summary.fired.push(trig.alert),
            Delivery::Suppressed => summary.suppressed += 1,
            Delivery::Failed => summary.failed += 1,
        }
    }

    /// One atomic pass over fresh snapshots: tasks in order, then courses.
    /// Per-entity faults are contained and never abort the remainder.
    pub fn run_tick(
        &mut self,
        now: NaiveDateTime,
        tasks: &[Task],
        courses: &[Course],
        settings: &ReminderSettings,
    ) -> TickSummary {
        let mut summary = TickSummary::default();

        let pruned = self.dedup.prune_expired(now);
        if pruned > 0 {
            debug!("pruned {pruned} expired fired keys");
        }

        for task in tasks {
            summary.evaluated += 1;
            let Some(leads) = trigger::task_stage_leads(task.category, settings) else {
                self.warn_once_missing(settings_key(task.category));
                continue;
            };
            for trig in trigger::task_triggers(task, now, &leads) {
                self.fire(trig, &mut summary);
            }
        }

        for course in courses {
            summary.evaluated += 1;
            let Some(lead) = settings.course else {
                self.warn_once_missing("course");
                continue;
            };
            match trigger::course_trigger(course, now, lead) {
                Ok(Some(trig)) => self.fire(trig, &mut summary),
                Ok(None) => {}
                Err(e) => {
                    summary.skipped += 1;
                    warn!("skipping course '{}' this tick: {e:#}", course.id);
                }
            }
        }

        if summary.fired.is_empty() {
            debug!(
                "tick: evaluated {} entities, nothing delivered",
                summary.evaluated
            );
        } else {
            info!(
                "tick: delivered {} of {} evaluated entities",
                summary.fired.len(),
                summary.evaluated
            );
        }
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::{Result, bail};
    use chrono::{Duration, NaiveDate};

    use crate::task::Category;

    struct MockHost {
        permission: Capability,
        grant_answer: Capability,
        remaining_failures: usize,
        shown: Vec<Alert>,
    }

    impl MockHost {
        fn granted() -> Self {
            Self {
                permission: Capability::Granted,
                grant_answer: Capability::Granted,
                remaining_failures: 0,
                shown: Vec::new(),
            }
        }

        fn undetermined(answer: Capability) -> Self {
            Self {
                permission: Capability::NotDetermined,
                grant_answer: answer,
                remaining_failures: 0,
                shown: Vec::new(),
            }
        }
    }

    impl NotifyHost for MockHost {
        fn query_permission(&self) -> Capability {
            self.permission
        }
        fn request_permission(&mut self) -> Capability {
            self.permission = self.grant_answer;
            self.permission
        }
        fn show(&mut self, alert: &Alert) -> Result<()> {
            if self.remaining_failures > 0 {
                self.remaining_failures -= 1;
                bail!("transient host failure");
            }
            self.shown.push(alert.clone());
            Ok(())
        }
    }

    fn at(d: u32, h: u32, mi: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 2, d)
            .unwrap()
            .and_hms_opt(h, mi, 0)
            .unwrap()
    }

    fn due_homework(now: NaiveDateTime) -> Task {
        Task::new("t1", "essay", Category::Homework).with_deadline(now + Duration::minutes(60))
    }

    #[test]
    fn stage_fires_once_across_ticks() {
        let now = at(18, 9, 0);
        let tasks = vec![due_homework(now)];
        let settings = ReminderSettings::default();
        let mut engine = ReminderEngine::new(MockHost::granted());

        let first = engine.run_tick(now, &tasks, &[], &settings);
        assert_eq!(first.fired.len(), 1);
        assert_eq!(first.fired[0].tag, "task-t1");

        // Still in window half a minute later, but already recorded.
        let second = engine.run_tick(now + Duration::seconds(30), &tasks, &[], &settings);
        assert!(second.fired.is_empty());
        assert_eq!(second.deduped, 1);
        assert_eq!(engine.host().shown.len(), 1);
    }

    #[test]
    fn suppression_advances_dedup_and_grant_fires_no_backlog() {
        let now = at(18, 9, 0);
        let tasks = vec![due_homework(now)];
        let settings = ReminderSettings::default();
        let mut engine = ReminderEngine::new(MockHost::undetermined(Capability::Granted));

        let first = engine.run_tick(now, &tasks, &[], &settings);
        assert!(first.fired.is_empty());
        assert_eq!(first.suppressed, 1);
        assert_eq!(engine.fired_len(), 1);
        assert!(engine.host().shown.is_empty());

        assert!(engine.request_authorization());

        let second = engine.run_tick(now + Duration::seconds(30), &tasks, &[], &settings);
        assert!(second.fired.is_empty());
        assert_eq!(second.deduped, 1);
        assert!(engine.host().shown.is_empty());
    }

    #[test]
    fn malformed_course_does_not_block_the_rest() {
        // 2026-02-18 is a Wednesday; both courses would be due at 09:30.
        let now = at(18, 9, 0);
        let courses = vec![
            Course::new("bad", "Ghost", 3, "abc"),
            Course::new("good", "Databases", 3, "09:30"),
        ];
        let settings = ReminderSettings::default();
        let mut engine = ReminderEngine::new(MockHost::granted());

        let summary = engine.run_tick(now, &[], &courses, &settings);
        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.fired.len(), 1);
        assert_eq!(summary.fired[0].tag, "course-good");
    }

    #[test]
    fn unconfigured_category_never_fires_or_records() {
        let now = at(18, 9, 0);
        let tasks = vec![due_homework(now)];
        let mut settings = ReminderSettings::default();
        settings.homework = None;
        let mut engine = ReminderEngine::new(MockHost::granted());

        let summary = engine.run_tick(now, &tasks, &[], &settings);
        assert!(summary.fired.is_empty());
        assert_eq!(summary.evaluated, 1);
        assert_eq!(engine.fired_len(), 0);
    }

    #[test]
    fn delivery_failure_stays_recorded() {
        let now = at(18, 9, 0);
        let tasks = vec![due_homework(now)];
        let settings = ReminderSettings::default();
        let mut host = MockHost::granted();
        host.remaining_failures = 1;
        let mut engine = ReminderEngine::new(host);

        let first = engine.run_tick(now, &tasks, &[], &settings);
        assert_eq!(first.failed, 1);
        assert!(first.fired.is_empty());

        // The host would succeed now, but the key is already spent.
        let second = engine.run_tick(now + Duration::seconds(30), &tasks, &[], &settings);
        assert_eq!(second.deduped, 1);
        assert!(engine.host().shown.is_empty());
    }

    #[test]
    fn tasks_evaluate_before_courses() {
        let now = at(18, 9, 0);
        let tasks = vec![due_homework(now)];
        let courses = vec![Course::new("c1", "Databases", 3, "09:30")];
        let settings = ReminderSettings::default();
        let mut engine = ReminderEngine::new(MockHost::granted());

        let summary = engine.run_tick(now, &tasks, &courses, &settings);
        let tags: Vec<&str> = summary.fired.iter().map(|a| a.tag.as_str()).collect();
        assert_eq!(tags, vec!["task-t1", "course-c1"]);
    }
}
