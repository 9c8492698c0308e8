//! A short, ordered log of recently observed inventory records.

use std::collections::VecDeque;

use chrono::{DateTime, Local};

use crate::domain::InventoryRecord;

/// The maximum number of entries retained.
pub const HISTORY_CAPACITY: usize = 8;

/// One observation in the scan history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanHistoryEntry {
    identifier: String,
    location: String,
    timestamp: DateTime<Local>,
}

impl ScanHistoryEntry {
    /// Creates an entry for `record` observed at `timestamp`.
    #[must_use]
    pub fn new(record: &InventoryRecord, timestamp: DateTime<Local>) -> Self {
        Self {
            identifier: record.identifier().to_string(),
            location: record.location().to_string(),
            timestamp,
        }
    }

    /// The registry number of the observed record.
    #[must_use]
    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    /// The brand or location of the observed record.
    #[must_use]
    pub fn location(&self) -> &str {
        &self.location
    }

    /// When the record was observed.
    #[must_use]
    pub const fn timestamp(&self) -> DateTime<Local> {
        self.timestamp
    }
}

/// A bounded FIFO of scan history entries.
///
/// Holding the same bottle in view produces a single entry: an entry is only
/// appended if its identifier differs from the most recent one. Once full,
/// the oldest entry is evicted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanHistory {
    entries: VecDeque<ScanHistoryEntry>,
}

impl ScanHistory {
    /// Appends `entry` unless it repeats the most recent identifier.
    ///
    /// Returns `true` if the entry was appended.
    pub fn record(&mut self, entry: ScanHistoryEntry) -> bool {
        if self
            .entries
            .back()
            .is_some_and(|last| last.identifier == entry.identifier)
        {
            return false;
        }

        self.entries.push_back(entry);
        if self.entries.len() > HISTORY_CAPACITY {
            self.entries.pop_front();
        }
        true
    }

    /// Iterates over entries from oldest to newest.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &ScanHistoryEntry> {
        self.entries.iter()
    }

    /// Iterates over entries from newest to oldest.
    pub fn newest_first(&self) -> impl Iterator<Item = &ScanHistoryEntry> {
        self.entries.iter().rev()
    }

    /// The most recent entry, if any.
    #[must_use]
    pub fn last(&self) -> Option<&ScanHistoryEntry> {
        self.entries.back()
    }

    /// The number of entries held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the history is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(identifier: &str) -> ScanHistoryEntry {
        let record = InventoryRecord::new(identifier, "", Some("ACME".to_string()), None);
        ScanHistoryEntry::new(&record, Local::now())
    }

    #[test]
    fn consecutive_duplicates_are_suppressed() {
        let mut history = ScanHistory::default();
        assert!(history.record(entry("50-00-0")));
        assert!(!history.record(entry("50-00-0")));
        assert!(history.record(entry("64-17-5")));
        assert!(history.record(entry("50-00-0")));

        let ids: Vec<_> = history.iter().map(ScanHistoryEntry::identifier).collect();
        assert_eq!(ids, ["50-00-0", "64-17-5", "50-00-0"]);
    }

    #[test]
    fn ninth_entry_evicts_oldest() {
        let mut history = ScanHistory::default();
        for i in 0..=HISTORY_CAPACITY {
            history.record(entry(&format!("id-{i}")));
            assert!(history.len() <= HISTORY_CAPACITY);
        }

        assert_eq!(history.len(), HISTORY_CAPACITY);
        assert_eq!(history.iter().next().unwrap().identifier(), "id-1");
        assert_eq!(history.last().unwrap().identifier(), "id-8");
        assert_eq!(history.newest_first().next().unwrap().identifier(), "id-8");
    }

    #[test]
    fn entries_carry_location() {
        let mut history = ScanHistory::default();
        history.record(entry("50-00-0"));
        assert_eq!(history.last().unwrap().location(), "ACME");
    }
}
