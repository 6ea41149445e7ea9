//! Input handling for TUI key events.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::app::{App, AppMode};

use super::TermEvent;

/// Process a terminal event, updating app state.
///
/// Commands leave through the relay's socket instance, so nothing here
/// touches the connection directly.
pub fn handle_term_event(app: &mut App, event: TermEvent) {
    match event {
        TermEvent::Key(key) => {
            if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
                app.should_quit = true;
                return;
            }
            match app.mode {
                AppMode::Search => handle_search_key(app, key),
                AppMode::Normal => handle_input_key(app, key),
            }
        }
        TermEvent::Resize(_, _) => { /* terminal auto-handles resize on next draw */ }
    }
}

fn handle_search_key(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => app.close_search(),
        KeyCode::Enter => app.search_next(),
        KeyCode::Backspace => app.search_pop(),
        KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => app.search_push(c),
        _ => {}
    }
}

/// Handle a key press in normal input mode.
fn handle_input_key(app: &mut App, key: KeyEvent) {
    let shift = key.modifiers.contains(KeyModifiers::SHIFT);
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);

    match key.code {
        KeyCode::Char('f') if ctrl => app.start_search(),
        KeyCode::Char('a') if ctrl => app.move_home(),
        KeyCode::Char('e') if ctrl => app.move_end(),
        KeyCode::Enter => {
            app.submit_input();
        }
        KeyCode::Char(c) if !ctrl => app.insert_char(c),
        KeyCode::Backspace => app.backspace(),
        KeyCode::Delete => app.delete_char(),
        KeyCode::Left => app.move_left(),
        KeyCode::Right => app.move_right(),
        KeyCode::Home => app.move_home(),
        KeyCode::Up if shift => app.scroll_up(1),
        KeyCode::Down if shift => app.scroll_down(1),
        KeyCode::Up => app.history_up(),
        KeyCode::Down => app.history_down(),
        KeyCode::PageUp => app.scroll_up(app.viewport_height.max(1)),
        KeyCode::PageDown => app.scroll_down(app.viewport_height.max(1)),
        KeyCode::End if app.scroll_pinned => app.move_end(),
        KeyCode::End => app.scroll_to_bottom(),
        _ => {}
    }
}
