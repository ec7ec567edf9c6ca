use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const ACTIVITY_LOG_CAPACITY: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityEntry {
    pub timestamp: DateTime<Utc>,
    pub action: String,
    pub details: String,
}

/// Bounded record of recent operations, newest first.
#[derive(Debug, Default)]
pub struct ActivityLog {
    entries: VecDeque<ActivityEntry>,
}

impl ActivityLog {
    pub fn new() -> Self {
        Self {
            entries: VecDeque::with_capacity(ACTIVITY_LOG_CAPACITY),
        }
    }

    pub fn record(&mut self, timestamp: DateTime<Utc>, action: &str, details: String) {
        tracing::info!("[GhostPay] {action}: {details}");

        self.entries.push_front(ActivityEntry {
            timestamp,
            action: action.to_string(),
            details,
        });
        self.entries.truncate(ACTIVITY_LOG_CAPACITY);
    }

    pub fn snapshot(&self) -> Vec<ActivityEntry> {
        self.entries.iter().cloned().collect()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
