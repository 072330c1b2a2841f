//! Command history for the console prompt.
//!
//! Submitted lines are kept newest first in a bounded ring. A browse index
//! walks the ring for the Up/Down keys and is reset on every submission.
//! History lives in memory only.

use std::collections::VecDeque;

/// Default number of remembered command lines
pub const DEFAULT_HISTORY_LENGTH: usize = 30;

/// Upper bound accepted by `cmd-history`
pub const MAX_HISTORY_LENGTH: usize = 300;

/// Bounded, newest-first command history
#[derive(Debug, Clone)]
pub struct HistoryRing {
    /// Entries, index 0 is the most recent
    entries: VecDeque<String>,
    /// Maximum entries
    max_entries: usize,
    /// Browse position, `None` when not browsing
    index: Option<usize>,
}

impl Default for HistoryRing {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_LENGTH)
    }
}

impl HistoryRing {
    /// Create an empty ring holding at most `max_entries` lines
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            max_entries: max_entries.max(1),
            index: None,
        }
    }

    /// Record a submitted line and stop browsing.
    ///
    /// A line equal to the current head is not stored twice.
    pub fn push(&mut self, line: &str) {
        self.index = None;

        if self.entries.front().map(String::as_str) == Some(line) {
            return;
        }

        self.entries.push_front(line.to_string());
        self.entries.truncate(self.max_entries);
    }

    /// Step toward older entries.
    ///
    /// `current` is the live buffer content. If the user edited a recalled
    /// entry, the index first falls back one step so the edit is replaced
    /// by the entry it came from rather than skipping past it.
    pub fn older(&mut self, current: &str) -> Option<&str> {
        let mut index = self.index.map_or(-1, |i| i as isize);

        if index != -1 {
            let edited = self
                .entries
                .get(index as usize)
                .map_or(true, |entry| entry != current);
            if self.entries.is_empty() || edited {
                index = (index - 1).max(-1);
            }
        }

        if ((index + 1) as usize) < self.entries.len() {
            index += 1;
        }

        if index >= 0 && (index as usize) < self.entries.len() {
            self.index = Some(index as usize);
            self.entries.get(index as usize).map(String::as_str)
        } else {
            self.index = None;
            None
        }
    }

    /// Step toward newer entries.
    ///
    /// Returns `Some(Some(entry))` to show an entry, `Some(None)` when
    /// browsing ended and the buffer should be cleared, `None` when not
    /// browsing.
    pub fn newer(&mut self) -> Option<Option<&str>> {
        match self.index {
            None => None,
            Some(0) => {
                self.index = None;
                Some(None)
            }
            Some(i) => {
                self.index = Some(i - 1);
                Some(self.entries.get(i - 1).map(String::as_str))
            }
        }
    }

    /// Stop browsing without recording anything
    pub fn reset_browse(&mut self) {
        self.index = None;
    }

    /// Current browse position
    pub fn browse_index(&self) -> Option<usize> {
        self.index
    }

    /// Change the capacity, dropping the oldest entries if needed
    pub fn set_max_len(&mut self, max_entries: usize) {
        self.max_entries = max_entries.max(1);
        self.entries.truncate(self.max_entries);
        if let Some(i) = self.index {
            if i >= self.entries.len() {
                self.index = None;
            }
        }
    }

    pub fn max_len(&self) -> usize {
        self.max_entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries, newest first
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn ring(lines: &[&str]) -> HistoryRing {
        let mut ring = HistoryRing::default();
        for line in lines.iter().rev() {
            ring.push(line);
        }
        ring
    }

    #[test]
    fn test_push_dedups_head() {
        let mut ring = HistoryRing::default();
        ring.push("a");
        ring.push("a");
        assert_eq!(ring.len(), 1);

        ring.push("b");
        ring.push("a");
        assert_eq!(ring.iter().collect::<Vec<_>>(), vec!["a", "b", "a"]);
    }

    #[test]
    fn test_push_evicts_oldest() {
        let mut ring = HistoryRing::new(2);
        ring.push("one");
        ring.push("two");
        ring.push("three");
        assert_eq!(ring.iter().collect::<Vec<_>>(), vec!["three", "two"]);
    }

    #[test]
    fn test_older_clamps_at_oldest() {
        let mut ring = ring(&["b", "a"]);

        assert_eq!(ring.older(""), Some("b"));
        assert_eq!(ring.older("b"), Some("a"));
        assert_eq!(ring.older("a"), Some("a"));
        assert_eq!(ring.browse_index(), Some(1));
    }

    #[test]
    fn test_older_on_empty_ring() {
        let mut ring = HistoryRing::default();
        assert_eq!(ring.older(""), None);
        assert_eq!(ring.browse_index(), None);
    }

    #[test]
    fn test_newer_walks_back_and_clears() {
        let mut ring = ring(&["c", "b", "a"]);
        ring.older("");
        ring.older("c");
        ring.older("b");
        assert_eq!(ring.browse_index(), Some(2));

        assert_eq!(ring.newer(), Some(Some("b")));
        assert_eq!(ring.newer(), Some(Some("c")));
        assert_eq!(ring.newer(), Some(None));
        assert_eq!(ring.newer(), None);
    }

    #[test]
    fn test_push_resets_browse() {
        let mut ring = ring(&["b", "a"]);
        ring.older("");
        ring.push("c");
        assert_eq!(ring.browse_index(), None);
        assert_eq!(ring.older(""), Some("c"));
    }

    #[test]
    fn test_shrink_drops_oldest() {
        let mut ring = ring(&["c", "b", "a"]);
        ring.set_max_len(1);
        assert_eq!(ring.iter().collect::<Vec<_>>(), vec!["c"]);
    }

    proptest! {
        #[test]
        fn prop_never_exceeds_capacity(
            cap in 1usize..10,
            lines in proptest::collection::vec("[a-c]{0,2}", 0..60),
        ) {
            let mut ring = HistoryRing::new(cap);
            for line in &lines {
                let before = ring.len();
                let head = ring.iter().next().map(str::to_string);
                ring.push(line);
                prop_assert!(ring.len() <= cap);
                if head.as_deref() == Some(line.as_str()) {
                    prop_assert_eq!(ring.len(), before);
                }
            }
        }
    }
}
