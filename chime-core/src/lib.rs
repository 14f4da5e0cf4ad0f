//! chime-core: reminder scheduling engine for tasks and weekly courses

pub mod course;
pub mod dedup;
pub mod dispatch;
pub mod engine;
pub mod permission;
pub mod poll;
pub mod settings;
pub mod task;
pub mod trigger;
pub mod upcoming;

pub use course::{Course, next_occurrence};
pub use dedup::{DedupTracker, EntityKind, TriggerKey};
pub use dispatch::{Alert, AlertKind, AlertMeta, Delivery, NotifyHost, deliver};
pub use engine::{ReminderEngine, TickSummary};
pub use permission::{Capability, PermissionGate};
pub use poll::{DEFAULT_POLL_INTERVAL, PollHandle, start};
pub use settings::{ReminderSettings, settings_key};
pub use task::{Category, Task};
pub use trigger::{
    TOLERANCE_MS, Trigger, course_trigger, in_window, task_stage_leads, task_triggers,
};
pub use upcoming::{UpcomingEvent, upcoming_events};
