//! Two-thread TUI orchestration.
//!
//! Terminal I/O runs on a dedicated OS thread; socket work stays on the
//! tokio runtime. Communication via `tokio::sync::mpsc` channels.

mod input;

use std::io;
use std::time::Duration;

use crossterm::event::{self, Event, KeyEventKind};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::app::App;
use crate::connection::{ConsoleConnection, SocketMessage};
use crate::ui;

pub use input::handle_term_event;

/// Terminal events forwarded from the UI reader thread.
pub enum TermEvent {
    Key(crossterm::event::KeyEvent),
    Resize(u16, u16),
}

/// Run the interactive TUI mode.
///
/// Connects the socket, enters raw mode, spawns a dedicated terminal reader
/// thread, and runs the main `select!` loop until the user quits.
pub async fn run(conn: &mut ConsoleConnection, mut app: App) -> anyhow::Result<()> {
    // 1. Connect BEFORE entering raw mode so Ctrl+C works during the handshake.
    let mut live = conn.connect().await?;
    app.attach_socket(&live.instance);

    // 2. Enter raw mode, create terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // 3. Channels + cancellation token
    let cancel = CancellationToken::new();
    let (term_tx, mut term_rx) = tokio::sync::mpsc::channel::<TermEvent>(64);

    // 4. Spawn dedicated OS thread for crossterm::event::read()
    let cancel_clone = cancel.clone();
    let ui_thread = std::thread::spawn(move || {
        loop {
            if cancel_clone.is_cancelled() {
                break;
            }
            // Poll with 50ms timeout so we can check cancellation
            if event::poll(Duration::from_millis(50)).unwrap_or(false) {
                match event::read() {
                    Ok(Event::Key(key)) => {
                        // Filter out Release events (Windows emits Press + Release per keystroke)
                        if !matches!(key.kind, KeyEventKind::Press | KeyEventKind::Repeat) {
                            continue;
                        }
                        if term_tx.blocking_send(TermEvent::Key(key)).is_err() {
                            break;
                        }
                    }
                    Ok(Event::Resize(w, h)) => {
                        if term_tx.blocking_send(TermEvent::Resize(w, h)).is_err() {
                            break;
                        }
                    }
                    _ => {}
                }
            }
        }
    });

    let mut tick = tokio::time::interval(Duration::from_millis(50));

    let result: anyhow::Result<()> = loop {
        tokio::select! {
            _ = tick.tick() => {
                app.on_tick();
                if let Err(e) = terminal.draw(|f| ui::draw(f, &mut app)) {
                    break Err(e.into());
                }
            }
            Some(term_event) = term_rx.recv() => {
                handle_term_event(&mut app, term_event);
            }
            Some(message) = live.events.recv(), if conn.is_connected() => {
                if let SocketMessage::Closed(reason) = &message {
                    warn!(?reason, "Console socket closed");
                    conn.mark_disconnected();
                }
                app.handle_socket_message(message);
            }
        }
        if app.should_quit {
            break Ok(());
        }
    };

    // 5. Shutdown: signal UI thread to stop, release the socket
    cancel.cancel();
    let _ = ui_thread.join(); // fast: <50ms due to poll timeout
    app.relay.detach();
    live.shutdown();
    info!("Console closed");

    // 6. Restore terminal
    let _ = disable_raw_mode();
    let _ = execute!(terminal.backend_mut(), LeaveAlternateScreen);
    let _ = terminal.show_cursor();

    result
}
