//! Bounded log of everything written to the main view.
//!
//! The log is what gets replayed when an overlay screen is closed, so each
//! entry keeps the colours it was written with.

use std::collections::VecDeque;

use super::terminal::ConsoleColor;

/// One recorded write
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogLine {
    /// Raw text, newlines included
    pub text: String,
    pub fg: ConsoleColor,
    pub bg: ConsoleColor,
}

impl LogLine {
    pub fn new(text: impl Into<String>, fg: ConsoleColor, bg: ConsoleColor) -> Self {
        Self {
            text: text.into(),
            fg,
            bg,
        }
    }
}

/// FIFO log capped at a fixed number of entries
#[derive(Debug, Clone)]
pub struct Scrollback {
    lines: VecDeque<LogLine>,
    capacity: usize,
}

impl Scrollback {
    pub fn new(capacity: usize) -> Self {
        Self {
            lines: VecDeque::new(),
            capacity: capacity.max(1),
        }
    }

    /// Capacity for a terminal `height` rows tall
    pub fn capacity_for_height(height: u16) -> usize {
        usize::from(height.saturating_sub(10)).max(1)
    }

    /// Append, evicting the oldest entry once full
    pub fn push(&mut self, line: LogLine) {
        self.lines.push_back(line);
        while self.lines.len() > self.capacity {
            self.lines.pop_front();
        }
    }

    /// Remove the entry at `index` if there is one
    pub fn remove(&mut self, index: usize) -> Option<LogLine> {
        self.lines.remove(index)
    }

    /// Change the cap; shrinking evicts from the front
    pub fn set_capacity(&mut self, capacity: usize) {
        self.capacity = capacity.max(1);
        while self.lines.len() > self.capacity {
            self.lines.pop_front();
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&LogLine> {
        self.lines.get(index)
    }

    /// Oldest first
    pub fn iter(&self) -> impl Iterator<Item = &LogLine> {
        self.lines.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn line(text: &str) -> LogLine {
        LogLine::new(text, ConsoleColor::White, ConsoleColor::Black)
    }

    #[test]
    fn test_capacity_for_height() {
        assert_eq!(Scrollback::capacity_for_height(24), 14);
        assert_eq!(Scrollback::capacity_for_height(10), 1);
        assert_eq!(Scrollback::capacity_for_height(3), 1);
    }

    #[test]
    fn test_evicts_oldest() {
        let mut log = Scrollback::new(2);
        log.push(line("a"));
        log.push(line("b"));
        log.push(line("c"));
        let texts: Vec<_> = log.iter().map(|l| l.text.as_str()).collect();
        assert_eq!(texts, vec!["b", "c"]);
    }

    #[test]
    fn test_shrink() {
        let mut log = Scrollback::new(4);
        for t in ["a", "b", "c", "d"] {
            log.push(line(t));
        }
        log.set_capacity(1);
        assert_eq!(log.get(0).map(|l| l.text.as_str()), Some("d"));
        assert!(log.remove(3).is_none());
    }

    proptest! {
        #[test]
        fn prop_fifo_cap(cap in 1usize..20, count in 0usize..100) {
            let mut log = Scrollback::new(cap);
            for i in 0..count {
                log.push(line(&i.to_string()));
                prop_assert!(log.len() <= cap);
            }
            // Survivors are exactly the newest entries, oldest first
            let expected: Vec<String> = (count.saturating_sub(cap)..count).map(|i| i.to_string()).collect();
            let actual: Vec<String> = log.iter().map(|l| l.text.clone()).collect();
            prop_assert_eq!(actual, expected);
        }
    }
}
