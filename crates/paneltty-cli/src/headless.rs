//! Headless (non-interactive) mode.
//!
//! Formatted console lines go to stdout verbatim, so styling is rendered by
//! the real terminal. Each stdin line is submitted as a command.

use std::io::Write;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use paneltty_core::{ConsoleRelay, HistoryStore, OutputSurface, SubmitOutcome};

use crate::connection::{ConnectionError, ConsoleConnection, SocketMessage};

/// Writes each display line followed by a newline, flushing immediately.
pub struct LineWriter<W> {
    out: W,
}

impl<W: Write> LineWriter<W> {
    pub const fn new(out: W) -> Self {
        Self { out }
    }

    pub const fn get_ref(&self) -> &W {
        &self.out
    }
}

impl<W: Write> OutputSurface for LineWriter<W> {
    fn write_line(&mut self, text: &str) {
        if let Err(e) = writeln!(self.out, "{text}").and_then(|()| self.out.flush()) {
            warn!(?e, "Failed to write console line");
        }
    }
}

/// Why the headless loop stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExitReason {
    /// Stdin reached end of file.
    InputClosed,
    /// The socket closed, with the peer's reason if given.
    SocketClosed(Option<String>),
}

/// Run headless mode until stdin ends or the socket closes.
pub async fn run<S, H>(
    conn: &mut ConsoleConnection,
    relay: &mut ConsoleRelay<S, H>,
) -> Result<ExitReason, HeadlessError>
where
    S: OutputSurface + Send + 'static,
    H: HistoryStore,
{
    let mut live = conn.connect().await?;
    relay.attach(Some(&live.instance));
    let mut context = relay.context().clone();
    context.connected = true;
    relay.update_context(context)?;
    info!(server_id = %relay.context().server_id, "Headless mode started");

    let stdin = BufReader::new(tokio::io::stdin());
    let result = pump(relay, &mut live.events, stdin).await;

    relay.detach();
    live.finish().await;
    if let Ok(ExitReason::SocketClosed(reason)) = &result {
        eprintln!(
            "[Disconnected{}]",
            reason.as_deref().map(|r| format!(": {r}")).unwrap_or_default()
        );
    }
    result
}

/// Feed `input` lines to the relay and socket events to its subscription.
pub async fn pump<S, H, R>(
    relay: &mut ConsoleRelay<S, H>,
    events: &mut mpsc::Receiver<SocketMessage>,
    input: R,
) -> Result<ExitReason, HeadlessError>
where
    S: OutputSurface + Send + 'static,
    H: HistoryStore,
    R: AsyncBufRead + Unpin,
{
    let mut lines = input.lines();
    loop {
        tokio::select! {
            line = lines.next_line() => match line? {
                Some(line) => {
                    relay.edit_input(line);
                    if relay.accept_line() == SubmitOutcome::Denied {
                        eprintln!("[Permission denied: cannot send console commands]");
                    }
                }
                None => {
                    debug!("Input closed");
                    return Ok(ExitReason::InputClosed);
                }
            },
            message = events.recv() => match message {
                Some(SocketMessage::Event(event)) => {
                    if let Some(instance) = relay.instance() {
                        instance.dispatch(&event);
                    }
                }
                Some(SocketMessage::Closed(reason)) => {
                    return Ok(ExitReason::SocketClosed(reason));
                }
                None => return Ok(ExitReason::SocketClosed(None)),
            },
        }
    }
}

/// Headless mode errors.
#[derive(Debug, thiserror::Error)]
pub enum HeadlessError {
    #[error("Connection error: {0}")]
    Connection(#[from] ConnectionError),

    #[error("Input error: {0}")]
    Input(#[from] std::io::Error),

    #[error(transparent)]
    Core(#[from] paneltty_core::Error),
}
