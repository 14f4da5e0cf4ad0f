//! Poll loop: recurring engine ticks driven by tokio timers.

use std::time::Duration;

use anyhow::{Result, bail};
use chrono::Local;
use log::{debug, info};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};

use crate::course::Course;
use crate::dispatch::NotifyHost;
use crate::engine::ReminderEngine;
use crate::settings::ReminderSettings;
use crate::task::Task;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(60);

/// Handle to a running poll loop. Stopping hands the engine back so the
/// owner can restart later with the fired-set intact; dropping the handle
/// also winds the loop down after any in-flight tick.
pub struct PollHandle<H: NotifyHost> {
    stop: Option<watch::Sender<bool>>,
    join: Option<JoinHandle<ReminderEngine<H>>>,
}

impl<H: NotifyHost> PollHandle<H> {
    /// Cooperative stop: an in-flight tick runs to completion before the
    /// loop exits. Idempotent; a second call returns `None`.
    pub async fn stop(&mut self) -> Option<ReminderEngine<H>> {
        if let Some(tx) = self.stop.take() {
            let _ = tx.send(true);
        }
        match self.join.take() {
            Some(join) => join.await.ok(),
            None => None,
        }
    }

    pub fn is_stopped(&self) -> bool {
        self.join.is_none()
    }
}

/// Start the recurring evaluation loop: one immediate pass, then one per
/// `every`. Snapshots are pulled fresh from the providers on every tick,
/// never cached across ticks. A tick that overruns the interval delays
/// the next one; ticks never overlap.
///
/// Refuses to start on a zero `every` or without a granted capability.
pub fn start<H, TF, CF, SF>(
    mut engine: ReminderEngine<H>,
    tasks: TF,
    courses: CF,
    settings: SF,
    every: Duration,
) -> Result<PollHandle<H>>
where
    H: NotifyHost + Send + 'static,
    TF: Fn() -> Vec<Task> + Send + 'static,
    CF: Fn() -> Vec<Course> + Send + 'static,
    SF: Fn() -> ReminderSettings + Send + 'static,
{
    if every.is_zero() {
        bail!("poll interval must be non-zero");
    }
    if !engine.capability().is_granted() {
        bail!(
            "notification permission is {:?}; not starting the poll loop",
            engine.capability()
        );
    }

    let (tx, mut rx) = watch::channel(false);
    let join = tokio::spawn(async move {
        let mut ticker = time::interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!("poll loop started, interval {every:?}");

        loop {
            tokio::select! {
                biased;
                _ = rx.changed() => break,
                _ = ticker.tick() => {
                    let now = Local::now().naive_local();
                    let tasks = tasks();
                    let courses = courses();
                    let settings = settings();
                    let summary = engine.run_tick(now, &tasks, &courses, &settings);
                    debug!(
                        "tick done: {} fired, {} deduped, {} suppressed",
                        summary.fired.len(),
                        summary.deduped,
                        summary.suppressed
                    );
                }
            }
        }

        info!("poll loop stopped");
        engine
    });

    Ok(PollHandle {
        stop: Some(tx),
        join: Some(join),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use anyhow::Result;
    use chrono::Duration as ChronoDuration;

    use crate::dispatch::Alert;
    use crate::permission::Capability;
    use crate::task::{Category, Task};

    #[derive(Default)]
    struct GrantedHost {
        shown: Vec<Alert>,
    }

    impl NotifyHost for GrantedHost {
        fn query_permission(&self) -> Capability {
            Capability::Granted
        }
        fn request_permission(&mut self) -> Capability {
            Capability::Granted
        }
        fn show(&mut self, alert: &Alert) -> Result<()> {
            self.shown.push(alert.clone());
            Ok(())
        }
    }

    struct UndeterminedHost;

    impl NotifyHost for UndeterminedHost {
        fn query_permission(&self) -> Capability {
            Capability::NotDetermined
        }
        fn request_permission(&mut self) -> Capability {
            Capability::NotDetermined
        }
        fn show(&mut self, _alert: &Alert) -> Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn refuses_to_start_without_grant() {
        let engine = ReminderEngine::new(UndeterminedHost);
        let res = start(
            engine,
            Vec::new,
            Vec::new,
            ReminderSettings::default,
            Duration::from_millis(25),
        );
        assert!(res.is_err());
    }

    #[tokio::test]
    async fn refuses_a_zero_interval() {
        // Granted host, so the only reason to refuse is the interval.
        let engine = ReminderEngine::new(GrantedHost::default());
        let res = start(
            engine,
            Vec::new,
            Vec::new,
            ReminderSettings::default,
            Duration::ZERO,
        );
        assert!(res.is_err());
    }

    #[tokio::test]
    async fn pulls_fresh_snapshots_immediately_and_on_interval() {
        let pulls = Arc::new(AtomicUsize::new(0));
        let counter = pulls.clone();
        let engine = ReminderEngine::new(GrantedHost::default());

        let mut handle = start(
            engine,
            move || {
                counter.fetch_add(1, Ordering::SeqCst);
                vec![]
            },
            Vec::new,
            ReminderSettings::default,
            Duration::from_millis(25),
        )
        .unwrap();

        // The first pass happens without waiting a full interval.
        time::sleep(Duration::from_millis(10)).await;
        assert!(pulls.load(Ordering::SeqCst) >= 1);

        time::sleep(Duration::from_millis(90)).await;
        handle.stop().await;
        assert!(pulls.load(Ordering::SeqCst) >= 3);
    }

    #[tokio::test]
    async fn delivers_once_across_real_ticks_and_hands_engine_back() {
        let now = Local::now().naive_local();
        let task = Task::new("t1", "essay", Category::Homework)
            .with_deadline(now + ChronoDuration::minutes(60));
        let engine = ReminderEngine::new(GrantedHost::default());

        let mut handle = start(
            engine,
            move || vec![task.clone()],
            Vec::new,
            ReminderSettings::default,
            Duration::from_millis(20),
        )
        .unwrap();

        time::sleep(Duration::from_millis(70)).await;
        let engine = handle.stop().await.unwrap();

        // Several ticks ran; the stage fired exactly once.
        assert_eq!(engine.host().shown.len(), 1);
        assert_eq!(engine.fired_len(), 1);
    }

    #[tokio::test]
    async fn stop_is_idempotent() {
        let engine = ReminderEngine::new(GrantedHost::default());
        let mut handle = start(
            engine,
            Vec::new,
            Vec::new,
            ReminderSettings::default,
            Duration::from_millis(25),
        )
        .unwrap();

        time::sleep(Duration::from_millis(5)).await;
        assert!(handle.stop().await.is_some());
        assert!(handle.is_stopped());
        assert!(handle.stop().await.is_none());
    }

    #[tokio::test]
    async fn dropping_the_handle_winds_the_loop_down() {
        let pulls = Arc::new(AtomicUsize::new(0));
        let counter = pulls.clone();
        let engine = ReminderEngine::new(GrantedHost::default());

        let handle = start(
            engine,
            move || {
                counter.fetch_add(1, Ordering::SeqCst);
                vec![]
            },
            Vec::new,
            ReminderSettings::default,
            Duration::from_millis(10),
        )
        .unwrap();

        time::sleep(Duration::from_millis(25)).await;
        assert!(pulls.load(Ordering::SeqCst) >= 1);
        drop(handle);

        // Any in-flight tick may still finish; after that the pulls stop.
        time::sleep(Duration::from_millis(30)).await;
        let settled = pulls.load(Ordering::SeqCst);
        time::sleep(Duration::from_millis(50)).await;
        assert_eq!(pulls.load(Ordering::SeqCst), settled);
    }
}
