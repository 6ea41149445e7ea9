//! Bounded line buffer behind the output view.

use std::collections::VecDeque;

use paneltty_core::OutputSurface;

use crate::ui::ansi;

/// Display lines kept for the output view, oldest first.
///
/// Lines are addressed by their absolute number (0 for the first line ever
/// written), which stays stable as old lines are evicted.
#[derive(Debug, Clone)]
pub struct Scrollback {
    lines: VecDeque<String>,
    capacity: usize,
    /// Lines ever written, including evicted ones.
    written: u64,
}

impl Scrollback {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            lines: VecDeque::with_capacity(capacity.min(4096)),
            capacity,
            written: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Absolute number of the oldest retained line.
    pub fn first_line(&self) -> u64 {
        self.written - self.lines.len() as u64
    }

    /// Whether absolute line `line` is still retained.
    pub fn contains_line(&self, line: u64) -> bool {
        (self.first_line()..self.written).contains(&line)
    }

    /// Retained lines with their absolute numbers, oldest first.
    pub fn lines(&self) -> impl Iterator<Item = (u64, &str)> {
        (self.first_line()..).zip(self.lines.iter().map(String::as_str))
    }

    /// Newest line strictly before absolute line `before` whose visible text
    /// contains `query`, case-insensitively. `before = None` searches from
    /// the end.
    pub fn find_before(&self, query: &str, before: Option<u64>) -> Option<u64> {
        if query.is_empty() {
            return None;
        }
        let needle = query.to_lowercase();
        let first = self.first_line();
        let end = before
            .map_or(self.lines.len(), |b| {
                usize::try_from(b.saturating_sub(first)).unwrap_or(usize::MAX)
            })
            .min(self.lines.len());
        (0..end)
            .rev()
            .find(|&i| ansi::strip(&self.lines[i]).to_lowercase().contains(&needle))
            .map(|i| first + i as u64)
    }
}

impl OutputSurface for Scrollback {
    fn write_line(&mut self, text: &str) {
        self.lines.push_back(text.to_string());
        self.written += 1;
        while self.lines.len() > self.capacity {
            self.lines.pop_front();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filled(capacity: usize, lines: &[&str]) -> Scrollback {
        let mut buf = Scrollback::new(capacity);
        for line in lines {
            buf.write_line(line);
        }
        buf
    }

    #[test]
    fn evicts_oldest_beyond_capacity() {
        let buf = filled(2, &["a", "b", "c"]);
        assert_eq!(buf.lines().collect::<Vec<_>>(), [(1, "b"), (2, "c")]);
        assert_eq!(buf.first_line(), 1);
        assert!(!buf.contains_line(0));
        assert!(buf.contains_line(2));
        assert!(!buf.contains_line(3));
    }

    #[test]
    fn zero_capacity_keeps_one_line() {
        let buf = filled(0, &["a", "b"]);
        assert_eq!(buf.len(), 1);
        assert_eq!(buf.lines().collect::<Vec<_>>(), [(1, "b")]);
    }

    #[test]
    fn find_walks_backwards_ignoring_styles() {
        let buf = filled(
            10,
            &["Done (3.2s)!", "\u{1b}[33mPlayer joined\u{1b}[0m", "tick", "player left"],
        );
        assert_eq!(buf.find_before("PLAYER", None), Some(3));
        assert_eq!(buf.find_before("player", Some(3)), Some(1));
        assert_eq!(buf.find_before("player", Some(1)), None);
        assert_eq!(buf.find_before("", None), None);
    }

    #[test]
    fn find_uses_absolute_numbers_after_eviction() {
        let mut buf = filled(3, &["join alice", "tick", "join bob", "tick"]);
        assert_eq!(buf.find_before("join", None), Some(2));

        buf.write_line("tock");
        assert_eq!(buf.find_before("join", None), Some(2));
        assert_eq!(buf.find_before("join", Some(2)), None);
        // Search from an evicted line finds nothing older.
        assert_eq!(buf.find_before("join", Some(1)), None);
    }
}
