//! Round History
//!
//! Bounded, newest-first record of settled outcomes for the history chips.

use std::collections::VecDeque;
use serde::{Serialize, Deserialize};

/// Default number of entries kept.
pub const DEFAULT_HISTORY_CAPACITY: usize = 20;

/// Fewest entries a configured history may keep.
pub const MIN_HISTORY_CAPACITY: usize = 8;

/// Most entries a configured history may keep.
pub const MAX_HISTORY_CAPACITY: usize = 20;

/// What produced a history entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HistoryKind {
    /// A round crashed at this multiplier.
    Crash,
    /// A cashout paid out at this multiplier.
    CashOut,
}

/// Styling bucket for a history chip.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChipTier {
    /// Below 2.00x
    Low,
    /// 2.00x to 10.00x inclusive
    Medium,
    /// Above 10.00x
    High,
}

impl ChipTier {
    /// Classify a multiplier.
    pub fn for_value(value: f64) -> Self {
        if value < 2.0 {
            ChipTier::Low
        } else if value <= 10.0 {
            ChipTier::Medium
        } else {
            ChipTier::High
        }
    }
}

/// One recorded outcome.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// Multiplier shown on the chip
    pub value: f64,
    /// Crash or cashout
    pub kind: HistoryKind,
    /// Round the outcome belongs to
    pub round: u64,
}

impl HistoryEntry {
    /// Chip styling for this entry.
    pub fn tier(&self) -> ChipTier {
        ChipTier::for_value(self.value)
    }
}

/// Fixed-capacity history, newest first. The oldest entry is evicted on overflow.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HistoryLog {
    entries: VecDeque<HistoryEntry>,
    capacity: usize,
}

impl Default for HistoryLog {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAPACITY)
    }
}

impl HistoryLog {
    /// Create an empty log holding at most `capacity` entries (minimum 1).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Record an outcome at the front.
    pub fn push(&mut self, entry: HistoryEntry) {
        self.entries.push_front(entry);
        self.entries.truncate(self.capacity);
    }

    /// Entries, newest first.
    pub fn iter(&self) -> impl Iterator<Item = &HistoryEntry> {
        self.entries.iter()
    }

    /// Chip values, newest first.
    pub fn values(&self) -> Vec<f64> {
        self.entries.iter().map(|e| e.value).collect()
    }

    /// Most recent entry.
    pub fn latest(&self) -> Option<&HistoryEntry> {
        self.entries.front()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Is the log empty?
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Maximum number of entries.
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
