//! # Notification Schedule
//!
//! The pending-reminder book behind the warranty actor.
//!
//! ## Dedup Invariant
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     NotificationSchedule                                │
//! │                                                                         │
//! │  key = registrationId:kind                                             │
//! │                                                                         │
//! │  insert_if_absent(entry)                                               │
//! │    key unknown  → inserted, returns true                               │
//! │    key present  → untouched, returns false                             │
//! │                                                                         │
//! │  This is where "at most one schedule entry per (registration, kind)"   │
//! │  lives: registering the same warranty twice, or re-scanning the same   │
//! │  registration on every tick, cannot produce a second entry.            │
//! │                                                                         │
//! │  due(now) → entries with scheduled_at <= now, ascending                │
//! │  remove(key) in the same step that marks an entry dispatched           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::ScheduleEntry;

/// Pending future notifications, keyed by `registrationId:kind`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NotificationSchedule {
    entries: BTreeMap<String, ScheduleEntry>,
}

impl NotificationSchedule {
    /// Creates an empty schedule.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts an entry unless its key is already scheduled.
    ///
    /// Returns true if the entry was inserted.
    pub fn insert_if_absent(&mut self, entry: ScheduleEntry) -> bool {
        let key = entry.key();
        if self.entries.contains_key(&key) {
            return false;
        }
        self.entries.insert(key, entry);
        true
    }

    /// Entries whose `scheduled_at` has passed, oldest first.
    pub fn due(&self, now: DateTime<Utc>) -> Vec<ScheduleEntry> {
        let mut due: Vec<ScheduleEntry> = self
            .entries
            .values()
            .filter(|entry| entry.scheduled_at <= now)
            .cloned()
            .collect();
        due.sort_by_key(|entry| entry.scheduled_at);
        due
    }

    /// Removes an entry by key, returning it if it was present.
    pub fn remove(&mut self, key: &str) -> Option<ScheduleEntry> {
        self.entries.remove(key)
    }

    /// True if the key is scheduled.
    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// All entries, in key order.
    pub fn entries(&self) -> Vec<ScheduleEntry> {
        self.entries.values().cloned().collect()
    }

    /// Number of pending entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if nothing is scheduled.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
