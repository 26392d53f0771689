//! Bounded, newest-first input history

use std::collections::VecDeque;

use chrono::{DateTime, Local};
use serde::Serialize;

use crate::normalizer::ActiveHalf;

/// One accepted key-down
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HistoryItem {
    /// Lower-case logical key
    pub key: String,
    pub half: ActiveHalf,
    /// Wall-clock time the event was captured
    pub timestamp: DateTime<Local>,
}

impl HistoryItem {
    pub fn new(key: impl Into<String>, half: ActiveHalf, timestamp: DateTime<Local>) -> Self {
        Self {
            key: key.into(),
            half,
            timestamp,
        }
    }

    /// Capture time as `HH:MM:SS`.
    pub fn time_label(&self) -> String {
        self.timestamp.format("%H:%M:%S").to_string()
    }
}

/// Upper bound on what `HistoryLog::new` reserves up front; the limit
/// itself may be far larger
const MAX_INITIAL_CAPACITY: usize = 64;

/// History log holding at most `limit` items, newest first.
#[derive(Debug, Clone)]
pub struct HistoryLog {
    limit: usize,
    items: VecDeque<HistoryItem>,
}

impl HistoryLog {
    pub fn new(limit: usize) -> Self {
        Self {
            limit,
            items: VecDeque::with_capacity(limit.min(MAX_INITIAL_CAPACITY)),
        }
    }

    /// Add `item` at the front, dropping the oldest entries past the limit.
    ///
    /// With a limit of zero the item is dropped straight away.
    pub fn append(&mut self, item: HistoryItem) {
        self.items.push_front(item);
        self.items.truncate(self.limit);
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Items in order, newest first.
    pub fn snapshot(&self) -> Vec<HistoryItem> {
        self.items.iter().cloned().collect()
    }
}

impl Default for HistoryLog {
    fn default() -> Self {
        Self::new(pedal_feedback_config::DEFAULT_HISTORY_LIMIT)
    }
}
