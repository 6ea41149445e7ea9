//! TUI rendering functions.

use ratatui::Frame;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Wrap};
use unicode_width::UnicodeWidthStr;

use super::ansi;
use crate::app::{App, AppMode};

pub const PLACEHOLDER: &str = "Enter command...";
pub const SCROLL_HELPER: &str = "↓ new output below (End)";

const SPINNER: [&str; 4] = ["|", "/", "-", "\\"];

/// Draw the full UI.
pub fn draw(frame: &mut Frame, app: &mut App) {
    // Compute input height: wrap the input text to the available inner width.
    let frame_width = frame.area().width;
    let inner_input_width = frame_width.saturating_sub(2) as usize; // minus borders
    let input_text_width = match app.mode {
        AppMode::Normal => UnicodeWidthStr::width(app.input()),
        AppMode::Search => UnicodeWidthStr::width(app.search.query.as_str()),
    };
    let input_lines = if inner_input_width == 0 || input_text_width == 0 {
        1
    } else {
        1u16.max(
            input_text_width
                .saturating_add(inner_input_width - 1)
                .checked_div(inner_input_width)
                .unwrap_or(1) as u16,
        )
    };
    // +2 for borders, cap at a third of the screen so output stays visible
    let max_input_height = frame.area().height / 3;
    let input_height = (input_lines + 2).min(max_input_height).max(3);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),            // Header
            Constraint::Min(5),               // Output
            Constraint::Length(input_height), // Input (dynamic)
            Constraint::Length(1),            // Status bar
        ])
        .split(frame.area());

    draw_header(frame, app, chunks[0]);
    draw_output(frame, app, chunks[1]);
    draw_input(frame, app, chunks[2]);
    draw_status_bar(frame, app, chunks[3]);

    if app.is_transferring() {
        draw_transfer_overlay(frame, app, chunks[1]);
    }
}

fn draw_header(frame: &mut Frame, app: &App, area: Rect) {
    if !app.is_connected() {
        return;
    }

    let header = Paragraph::new(Line::from(vec![
        Span::styled("» ", Style::default().fg(Color::DarkGray)),
        Span::styled(
            "Console",
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled(
            format!(" | {}", app.server_id()),
            Style::default().fg(Color::DarkGray),
        ),
    ]));

    frame.render_widget(header, area);
}

/// Wrapped row count of a line at `width` columns.
fn wrapped_rows(line: &Line<'_>, width: usize) -> u16 {
    if width == 0 {
        return 1;
    }
    let display_width: usize = line
        .spans
        .iter()
        .map(|s| UnicodeWidthStr::width(s.content.as_ref()))
        .sum();
    // Each line takes at least 1 row; long lines wrap to ceil(width/inner_width)
    1u16.max(
        display_width
            .saturating_add(width - 1)
            .checked_div(width)
            .unwrap_or(1) as u16,
    )
}

fn draw_output(frame: &mut Frame, app: &mut App, area: Rect) {
    let inner_height = area.height.saturating_sub(2); // minus borders
    let inner_width = area.width.saturating_sub(2) as usize; // minus borders

    let matched = app.search.matched;
    let mut lines: Vec<Line<'static>> = Vec::new();
    let mut reveal_row = None;
    let mut total: u16 = 0;
    let evicted = {
        let buf = app.scrollback();
        for (number, text) in buf.lines() {
            let mut line = ansi::to_line(text);
            if matched == Some(number) {
                line.style = Style::default().bg(ansi::SELECTION).fg(Color::Black);
            }
            if app.reveal_line == Some(number) {
                reveal_row = Some(total);
            }
            total = total.saturating_add(wrapped_rows(&line, inner_width));
            lines.push(line);
        }
        matched.is_some_and(|line| !buf.contains_line(line))
    };
    if evicted {
        app.search.matched = None;
    }

    // Update app state so scroll methods know the bounds
    app.viewport_height = inner_height;
    app.total_lines = total;

    let max_scroll = total.saturating_sub(inner_height);
    if let Some(row) = reveal_row {
        // Put the revealed line at the top of the viewport
        app.scroll_offset = max_scroll.saturating_sub(row.min(max_scroll));
        app.scroll_pinned = app.scroll_offset == 0;
    }
    app.reveal_line = None;
    app.scroll_offset = app.scroll_offset.min(max_scroll);

    // Compute absolute scroll position from bottom-relative offset
    let scroll = if app.scroll_pinned {
        max_scroll
    } else {
        max_scroll.saturating_sub(app.scroll_offset)
    };

    let title = if app.scroll_pinned {
        "Output".to_string()
    } else {
        format!("Output [scroll: {}/{}]", app.scroll_offset, max_scroll)
    };

    let output = Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL).title(title))
        .wrap(Wrap { trim: false })
        .scroll((scroll, 0));

    frame.render_widget(output, area);

    if !app.scroll_pinned && inner_height > 0 {
        let helper_area = Rect::new(
            area.x.saturating_add(1),
            area.y.saturating_add(inner_height),
            area.width.saturating_sub(2),
            1,
        );
        let helper = Paragraph::new(Span::styled(
            SCROLL_HELPER,
            Style::default()
                .fg(Color::Black)
                .bg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        ))
        .alignment(Alignment::Right);
        frame.render_widget(helper, helper_area);
    }
}

fn draw_input(frame: &mut Frame, app: &App, area: Rect) {
    let (title, text, cursor_byte) = match app.mode {
        AppMode::Search => {
            let title = if app.search.failed {
                "Search: no match".to_string()
            } else {
                "Search (Enter: older match, Esc: close)".to_string()
            };
            (title, app.search.query.as_str(), app.search.query.len())
        }
        AppMode::Normal => {
            let title = if app.relay.can_send_commands() {
                "Command".to_string()
            } else {
                "Command (read-only)".to_string()
            };
            (title, app.input(), app.cursor_pos.min(app.input().len()))
        }
    };

    let content = if text.is_empty() && app.mode == AppMode::Normal {
        Line::from(Span::styled(PLACEHOLDER, Style::default().fg(Color::DarkGray)))
    } else {
        Line::from(text)
    };

    let input = Paragraph::new(content)
        .block(Block::default().borders(Borders::ALL).title(title))
        .wrap(Wrap { trim: false });

    frame.render_widget(input, area);

    // Position cursor accounting for text wrapping.
    let inner_width = area.width.saturating_sub(2) as usize; // minus borders
    let cursor_display_width = text
        .get(..cursor_byte)
        .map_or(0, UnicodeWidthStr::width);

    let (cursor_row, cursor_col) = if inner_width == 0 {
        (0u16, 0u16)
    } else {
        (
            (cursor_display_width / inner_width) as u16,
            (cursor_display_width % inner_width) as u16,
        )
    };

    let cursor_x = area.x.saturating_add(1).saturating_add(cursor_col);
    let cursor_y = area.y.saturating_add(1).saturating_add(cursor_row);
    // Clamp to stay within the input area
    let cursor_x = cursor_x.min(area.x.saturating_add(area.width.saturating_sub(2)));
    let cursor_y = cursor_y.min(area.y.saturating_add(area.height.saturating_sub(2)));
    frame.set_cursor_position((cursor_x, cursor_y));
}

fn draw_status_bar(frame: &mut Frame, app: &App, area: Rect) {
    let status = Paragraph::new(Line::from(vec![
        Span::styled(&app.status, Style::default().fg(Color::DarkGray)),
        Span::styled(
            " | Ctrl+C: quit | Enter: send | Ctrl+F: search",
            Style::default().fg(Color::DarkGray),
        ),
    ]));

    frame.render_widget(status, area);
}

fn draw_transfer_overlay(frame: &mut Frame, app: &App, area: Rect) {
    let dialog_width = 36.min(area.width.saturating_sub(4));
    let dialog_height = 3.min(area.height);
    let dialog_area = Rect::new(
        area.x + (area.width.saturating_sub(dialog_width)) / 2,
        area.y + (area.height.saturating_sub(dialog_height)) / 2,
        dialog_width,
        dialog_height,
    );

    frame.render_widget(Clear, dialog_area);

    let frame_idx = usize::try_from(app.ticks % SPINNER.len() as u64).unwrap_or(0);
    let text = Line::from(vec![
        Span::styled(
            SPINNER[frame_idx],
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw(" Transferring server..."),
    ]);

    let dialog = Paragraph::new(text)
        .alignment(Alignment::Center)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .style(Style::default().fg(Color::White)),
        );

    frame.render_widget(dialog, dialog_area);
}
