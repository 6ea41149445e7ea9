//! Application state and types.

use std::sync::{MutexGuard, PoisonError};

use paneltty_core::events::TransferStatus;
use paneltty_core::{
    ConsoleRelay, Direction, HistoryStore, ServerEvent, SessionContext, SocketInstance,
    SubmitOutcome,
};
use tracing::warn;

use super::scrollback::Scrollback;
use crate::connection::SocketMessage;

/// History backend chosen at startup (file-backed or in-memory).
pub type ConsoleStore = Box<dyn HistoryStore + Send>;

/// The relay as driven by the terminal UI.
pub type Relay = ConsoleRelay<Scrollback, ConsoleStore>;

/// Application mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppMode {
    Normal,
    /// Typing a scrollback search query (Ctrl+F).
    Search,
}

/// Scrollback search prompt.
#[derive(Debug, Clone, Default)]
pub struct SearchState {
    pub query: String,
    /// Absolute scrollback line currently highlighted as the match.
    pub matched: Option<u64>,
    /// The last search found nothing.
    pub failed: bool,
}

/// TUI application state.
pub struct App {
    pub mode: AppMode,
    pub relay: Relay,
    /// Byte offset of the cursor in the input value.
    pub cursor_pos: usize,
    pub search: SearchState,
    /// Manual scroll offset from the bottom (0 = pinned to bottom).
    pub scroll_offset: u16,
    /// Whether the view follows new output.
    pub scroll_pinned: bool,
    /// Height of the output viewport (set each frame by the renderer).
    pub viewport_height: u16,
    /// Total wrapped row count of the output (set each frame by the renderer).
    pub total_lines: u16,
    /// Absolute scrollback line to bring into view on the next draw.
    pub reveal_line: Option<u64>,
    /// Draw ticks since startup; drives the transfer spinner.
    pub ticks: u64,
    pub should_quit: bool,
    pub status: String,
}

impl App {
    pub fn new(relay: Relay) -> Self {
        Self {
            mode: AppMode::Normal,
            relay,
            cursor_pos: 0,
            search: SearchState::default(),
            scroll_offset: 0,
            scroll_pinned: true,
            viewport_height: 0,
            total_lines: 0,
            reveal_line: None,
            ticks: 0,
            should_quit: false,
            status: "Connecting...".to_string(),
        }
    }

    pub fn server_id(&self) -> &str {
        &self.relay.context().server_id
    }

    pub fn is_connected(&self) -> bool {
        self.relay.context().connected
    }

    pub fn is_transferring(&self) -> bool {
        self.relay.context().transferring
    }

    /// Text shown in the input field.
    pub fn input(&self) -> &str {
        self.relay.input_value()
    }

    /// Lock the output buffer for reading.
    pub fn scrollback(&self) -> MutexGuard<'_, Scrollback> {
        self.relay
            .surface()
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn update_context(&mut self, apply: impl FnOnce(&mut SessionContext)) {
        let mut context = self.relay.context().clone();
        apply(&mut context);
        if let Err(e) = self.relay.update_context(context) {
            warn!(?e, "Failed to update session context");
        }
    }

    pub const fn on_tick(&mut self) {
        self.ticks = self.ticks.wrapping_add(1);
    }

    // -- Connection --

    /// Bind the output view to a freshly connected socket.
    pub fn attach_socket(&mut self, instance: &SocketInstance) {
        self.relay.attach(Some(instance));
        self.update_context(|ctx| ctx.connected = true);
        self.status = format!("Connected | Server: {}", self.server_id());
    }

    /// Apply one message from the socket reader.
    pub fn handle_socket_message(&mut self, message: SocketMessage) {
        match message {
            SocketMessage::Event(event) => {
                if let ServerEvent::TransferStatus(status) = &event {
                    match status {
                        TransferStatus::Archive => self.update_context(|ctx| ctx.transferring = true),
                        TransferStatus::Failure => self.update_context(|ctx| ctx.transferring = false),
                        TransferStatus::Unknown(_) => {}
                    }
                }
                if let Some(instance) = self.relay.instance() {
                    instance.dispatch(&event);
                }
            }
            SocketMessage::Closed(reason) => {
                self.relay.detach();
                self.update_context(|ctx| {
                    ctx.connected = false;
                    ctx.transferring = false;
                });
                self.status = reason.map_or_else(
                    || "Disconnected".to_string(),
                    |r| format!("Disconnected: {r}"),
                );
            }
        }
    }

    // -- Input editing --

    fn edit(&mut self, apply: impl FnOnce(&mut String, &mut usize)) {
        let mut value = self.input().to_string();
        let mut pos = self.cursor_pos.min(value.len());
        apply(&mut value, &mut pos);
        self.cursor_pos = pos;
        self.relay.edit_input(value);
    }

    pub fn insert_char(&mut self, c: char) {
        self.edit(|value, pos| {
            value.insert(*pos, c);
            *pos += c.len_utf8();
        });
    }

    pub fn backspace(&mut self) {
        if self.cursor_pos == 0 {
            return;
        }
        self.edit(|value, pos| {
            if let Some((idx, _)) = value[..*pos].char_indices().next_back() {
                value.remove(idx);
                *pos = idx;
            }
        });
    }

    pub fn delete_char(&mut self) {
        if self.cursor_pos >= self.input().len() {
            return;
        }
        self.edit(|value, pos| {
            value.remove(*pos);
        });
    }

    pub fn move_left(&mut self) {
        let input = self.input();
        let pos = self.cursor_pos.min(input.len());
        self.cursor_pos = input[..pos].char_indices().next_back().map_or(0, |(i, _)| i);
    }

    pub fn move_right(&mut self) {
        let input = self.input();
        let pos = self.cursor_pos.min(input.len());
        self.cursor_pos = input[pos..]
            .chars()
            .next()
            .map_or(pos, |c| pos + c.len_utf8());
    }

    pub const fn move_home(&mut self) {
        self.cursor_pos = 0;
    }

    pub fn move_end(&mut self) {
        self.cursor_pos = self.input().len();
    }

    /// Submit the current input and clear it.
    pub fn submit_input(&mut self) -> SubmitOutcome {
        let outcome = self.relay.accept_line();
        self.cursor_pos = 0;
        if outcome == SubmitOutcome::Denied {
            self.status = "You do not have permission to send commands".to_string();
        }
        self.scroll_to_bottom();
        outcome
    }

    /// Navigate input history (up).
    pub fn history_up(&mut self) {
        self.relay.navigate(Direction::Up);
        self.move_end();
    }

    /// Navigate input history (down).
    pub fn history_down(&mut self) {
        self.relay.navigate(Direction::Down);
        self.move_end();
    }

    // -- Scrolling --

    /// Scroll up by `n` lines.
    pub fn scroll_up(&mut self, n: u16) {
        let max_scroll = self.total_lines.saturating_sub(self.viewport_height);
        self.scroll_offset = self.scroll_offset.saturating_add(n).min(max_scroll);
        if self.scroll_offset > 0 {
            self.scroll_pinned = false;
        }
    }

    /// Scroll down by `n` lines.
    pub fn scroll_down(&mut self, n: u16) {
        self.scroll_offset = self.scroll_offset.saturating_sub(n);
        if self.scroll_offset == 0 {
            self.scroll_pinned = true;
        }
    }

    /// Snap scroll to the bottom (most recent output).
    pub const fn scroll_to_bottom(&mut self) {
        self.scroll_offset = 0;
        self.scroll_pinned = true;
    }

    // -- Search --

    pub fn start_search(&mut self) {
        self.mode = AppMode::Search;
        self.search = SearchState::default();
    }

    pub fn close_search(&mut self) {
        self.mode = AppMode::Normal;
        self.search.matched = None;
        self.search.failed = false;
    }

    pub fn search_push(&mut self, c: char) {
        self.search.query.push(c);
        self.search.matched = None;
        self.search.failed = false;
    }

    pub fn search_pop(&mut self) {
        self.search.query.pop();
        self.search.matched = None;
        self.search.failed = false;
    }

    /// Jump to the next older line matching the query, wrapping to the
    /// newest line once the oldest is passed.
    pub fn search_next(&mut self) {
        let found = {
            let buf = self.scrollback();
            // An evicted match restarts the search from the newest line.
            let from = self.search.matched.filter(|&line| buf.contains_line(line));
            buf.find_before(&self.search.query, from)
                .or_else(|| buf.find_before(&self.search.query, None))
        };
        match found {
            Some(line) => {
                self.search.matched = Some(line);
                self.search.failed = false;
                self.reveal_line = Some(line);
            }
            None => self.search.failed = true,
        }
    }
}
