//! Per-server command history and the navigation cursor over it.
//!
//! History is stored oldest-first (submission order). The cursor counts
//! from the other end: index 0 is the most recent command.

mod store;

pub use store::{HistoryStore, JsonFileStore, MemoryStore};

use crate::error::Result;

/// Arrow-key navigation direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Towards older commands.
    Up,
    /// Towards newer commands, then back to no selection.
    Down,
}

/// Ordered, append-only list of commands submitted for one server.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandHistory {
    server_id: String,
    entries: Vec<String>,
}

impl CommandHistory {
    /// Empty history for `server_id`.
    pub fn new(server_id: impl Into<String>) -> Self {
        Self {
            server_id: server_id.into(),
            entries: Vec::new(),
        }
    }

    /// Key under which a server's history is persisted.
    pub fn storage_key(server_id: &str) -> String {
        format!("{server_id}:command_history")
    }

    /// Load the persisted history for `server_id`, or start empty.
    pub fn load(server_id: &str, store: &impl HistoryStore) -> Result<Self> {
        let entries = store
            .load(&Self::storage_key(server_id))?
            .unwrap_or_default();
        tracing::debug!(server_id, entries = entries.len(), "Loaded command history");
        Ok(Self {
            server_id: server_id.to_string(),
            entries,
        })
    }

    /// Write the full list back to `store`.
    pub fn persist(&self, store: &mut impl HistoryStore) -> Result<()> {
        store.save(&Self::storage_key(&self.server_id), &self.entries)
    }

    pub fn push(&mut self, command: impl Into<String>) {
        self.entries.push(command.into());
    }

    pub fn server_id(&self) -> &str {
        &self.server_id
    }

    /// Entries in submission order (oldest first).
    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entry `index` positions back from the newest (0 = newest).
    pub fn recent(&self, index: usize) -> Option<&str> {
        let pos = self.entries.len().checked_sub(index + 1)?;
        self.entries.get(pos).map(String::as_str)
    }
}

/// Selected history index, or no selection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HistoryCursor(Option<usize>);

impl HistoryCursor {
    /// The "not navigating" state.
    pub const NONE: Self = Self(None);

    pub const fn index(self) -> Option<usize> {
        self.0
    }

    pub const fn is_selected(self) -> bool {
        self.0.is_some()
    }

    pub const fn reset(&mut self) {
        self.0 = None;
    }

    /// Move one step over a history of `len` entries. Returns whether the
    /// cursor changed.
    pub fn step(&mut self, direction: Direction, len: usize) -> bool {
        let next = match (direction, self.0) {
            (Direction::Up, None) if len > 0 => Some(0),
            (Direction::Up, Some(i)) if i + 1 < len => Some(i + 1),
            (Direction::Down, Some(0)) => None,
            (Direction::Down, Some(i)) => Some(i - 1),
            _ => return false,
        };
        self.0 = next;
        true
    }

    /// The entry the cursor points at, if any.
    pub fn selected(self, history: &CommandHistory) -> Option<&str> {
        self.0.and_then(|i| history.recent(i))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn history(entries: &[&str]) -> CommandHistory {
        let mut h = CommandHistory::new("srv");
        for e in entries {
            h.push(*e);
        }
        h
    }

    #[test]
    fn storage_key_is_scoped_by_server() {
        assert_eq!(CommandHistory::storage_key("1a7ce997"), "1a7ce997:command_history");
    }

    #[test]
    fn recent_counts_from_newest() {
        let h = history(&["start", "restart", "stop"]);
        assert_eq!(h.recent(0), Some("stop"));
        assert_eq!(h.recent(2), Some("start"));
        assert_eq!(h.recent(3), None);
    }

    #[test]
    fn up_from_none_selects_newest() {
        let h = history(&["a", "b"]);
        let mut cursor = HistoryCursor::NONE;
        assert!(cursor.step(Direction::Up, h.len()));
        assert_eq!(cursor.selected(&h), Some("b"));
    }

    #[test]
    fn up_stops_at_oldest() {
        let h = history(&["a", "b", "c"]);
        let mut cursor = HistoryCursor::NONE;
        for _ in 0..3 {
            cursor.step(Direction::Up, h.len());
        }
        assert_eq!(cursor.index(), Some(2));
        assert!(!cursor.step(Direction::Up, h.len()));
        assert_eq!(cursor.index(), Some(2));
    }

    #[test]
    fn up_on_empty_history_is_noop() {
        let mut cursor = HistoryCursor::NONE;
        assert!(!cursor.step(Direction::Up, 0));
        assert_eq!(cursor, HistoryCursor::NONE);
    }

    #[test]
    fn down_from_newest_clears_selection() {
        let mut cursor = HistoryCursor(Some(0));
        assert!(cursor.step(Direction::Down, 3));
        assert!(!cursor.is_selected());
    }

    #[test]
    fn down_without_selection_is_noop() {
        let mut cursor = HistoryCursor::NONE;
        assert!(!cursor.step(Direction::Down, 3));
        assert_eq!(cursor, HistoryCursor::NONE);
    }

    #[test]
    fn navigation_scenario() {
        let h = history(&["start", "restart", "stop"]);
        let mut cursor = HistoryCursor::NONE;

        cursor.step(Direction::Up, h.len());
        assert_eq!(cursor.selected(&h), Some("stop"));
        cursor.step(Direction::Up, h.len());
        assert_eq!(cursor.selected(&h), Some("restart"));
        cursor.step(Direction::Down, h.len());
        assert_eq!(cursor.selected(&h), Some("stop"));
        cursor.step(Direction::Down, h.len());
        assert_eq!(cursor.selected(&h), None);
    }
}
