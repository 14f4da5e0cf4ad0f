//! At-most-once bookkeeping for fired reminder stages.

use std::collections::HashMap;
use std::collections::hash_map::Entry;

use chrono::{Duration, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Task,
    Course,
}

/// Identity of one reminder stage of one entity occurrence.
///
/// `occurs_on` is the calendar date of the target instant, so a weekly
/// course gets a fresh key every week and old keys can be pruned by date.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TriggerKey {
    pub kind: EntityKind,
    pub id: String,
    pub stage: usize,
    pub occurs_on: NaiveDate,
}

impl TriggerKey {
    pub fn new(kind: EntityKind, id: impl Into<String>, stage: usize, target: NaiveDateTime) -> Self {
        Self {
            kind,
            id: id.into(),
            stage,
            occurs_on: target.date(),
        }
    }
}

/// Process-lifetime fired set. Single-owner: only the engine touches it,
/// and only from the poll timeline.
#[derive(Debug, Default)]
pub struct DedupTracker {
    fired: HashMap<TriggerKey, NaiveDateTime>,
}

impl DedupTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check-and-set in one step: returns true exactly once per key.
    /// Recording is not undone by anything downstream; a failed or
    /// suppressed delivery stays recorded.
    pub fn should_fire(&mut self, key: TriggerKey, target: NaiveDateTime) -> bool {
        match self.fired.entry(key) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(target);
                true
            }
        }
    }

    /// Drop keys whose target passed more than a day ago. Their windows
    /// closed at target + tolerance, so nothing can re-fire.
    pub fn prune_expired(&mut self, now: NaiveDateTime) -> usize {
        let cutoff = now - Duration::days(1);
        let before = self.fired.len();
        self.fired.retain(|_, target| *target >= cutoff);
        before - self.fired.len()
    }

    pub fn len(&self) -> usize {
        self.fired.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fired.is_empty()
    }

    pub fn clear(&mut self) {
        self.fired.clear();
    }
}
