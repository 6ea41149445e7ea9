//! Console relay: binds one server's socket instance to an output surface
//! and to the command input.
//!
//! Inbound events are formatted and written to the surface by a single
//! subscription on the instance's event channel. Submitted commands are
//! emitted on the instance and appended to the server's persisted history.

use std::sync::{Arc, Mutex, PoisonError};

use crate::bus::{EVENT_CHANNEL, SocketInstance, Subscription};
use crate::error::Result;
use crate::events::CHANNEL_COMMAND;
use crate::format::Formatter;
use crate::history::{CommandHistory, Direction, HistoryCursor, HistoryStore};
use crate::permissions::{CONSOLE_CAPABILITY, CapabilityCheck, Permissions};

/// Append-only, order-preserving sink for formatted display lines.
pub trait OutputSurface {
    fn write_line(&mut self, text: &str);
}

/// Surface shared between the relay's event handler and the renderer.
pub type SharedSurface<S> = Arc<Mutex<S>>;

/// Ambient session state the relay reacts to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionContext {
    pub server_id: String,
    pub connected: bool,
    pub transferring: bool,
    pub permissions: Permissions,
}

impl SessionContext {
    pub fn new(server_id: impl Into<String>, permissions: Permissions) -> Self {
        Self {
            server_id: server_id.into(),
            connected: false,
            transferring: false,
            permissions,
        }
    }
}

/// Result of a submission attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Emitted (when an instance is attached) and recorded in history.
    Sent,
    /// The user lacks the console capability; nothing happened.
    Denied,
}

pub struct ConsoleRelay<S, H> {
    context: SessionContext,
    formatter: Formatter,
    surface: SharedSurface<S>,
    store: H,
    history: CommandHistory,
    cursor: HistoryCursor,
    /// Text typed by the user while no history entry is selected.
    draft: String,
    subscription: Option<Subscription>,
}

impl<S, H> ConsoleRelay<S, H>
where
    S: OutputSurface + Send + 'static,
    H: HistoryStore,
{
    /// Create a relay for `context.server_id`, loading its history.
    pub fn new(context: SessionContext, surface: SharedSurface<S>, store: H) -> Result<Self> {
        let history = CommandHistory::load(&context.server_id, &store)?;
        Ok(Self {
            context,
            formatter: Formatter::default(),
            surface,
            store,
            history,
            cursor: HistoryCursor::NONE,
            draft: String::new(),
            subscription: None,
        })
    }

    /// Use `formatter` for every event from now on, re-registering the
    /// handler if an instance is already attached.
    #[must_use]
    pub fn with_formatter(mut self, formatter: Formatter) -> Self {
        self.formatter = formatter;
        if let Some(current) = self.subscription.take() {
            let instance = current.instance().clone();
            current.release();
            self.subscribe(&instance);
        }
        self
    }

    pub const fn context(&self) -> &SessionContext {
        &self.context
    }

    /// Replace the session context.
    ///
    /// A different server id switches to that server's history and drops
    /// any selection.
    pub fn update_context(&mut self, context: SessionContext) -> Result<()> {
        if context.server_id != self.context.server_id {
            self.history = CommandHistory::load(&context.server_id, &self.store)?;
            self.cursor.reset();
            tracing::info!(
                from = %self.context.server_id,
                to = %context.server_id,
                "Switched console server"
            );
        }
        self.context = context;
        Ok(())
    }

    /// Follow a change of connected instance.
    ///
    /// The previous handler is always unregistered before a new one is
    /// registered. Attaching the instance that is already attached keeps the
    /// existing subscription.
    pub fn attach(&mut self, instance: Option<&SocketInstance>) {
        if let (Some(current), Some(next)) = (&self.subscription, instance) {
            if current.instance() == next {
                return;
            }
        }

        if let Some(previous) = self.subscription.take() {
            tracing::debug!(instance = ?previous.instance().id(), "Releasing console subscription");
            previous.release();
        }

        if let Some(instance) = instance {
            self.subscribe(instance);
        }
    }

    fn subscribe(&mut self, instance: &SocketInstance) {
        let surface = Arc::clone(&self.surface);
        let formatter = self.formatter;
        let handler = Box::new(move |event: &crate::events::ServerEvent| {
            if let Some(line) = formatter.format(event) {
                surface
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .write_line(&line);
            }
        });
        self.subscription = Some(Subscription::acquire(instance, EVENT_CHANNEL, handler));
        tracing::debug!(instance = ?instance.id(), "Console subscription acquired");
    }

    /// Drop the current subscription, if any.
    pub fn detach(&mut self) {
        self.attach(None);
    }

    /// The currently attached instance.
    pub fn instance(&self) -> Option<&SocketInstance> {
        self.subscription.as_ref().map(Subscription::instance)
    }

    /// Whether the current user may submit commands.
    pub fn can_send_commands(&self) -> bool {
        self.context.permissions.has_capability(CONSOLE_CAPABILITY)
    }

    /// Forward `command` verbatim and record it.
    ///
    /// Without the console capability this is a no-op.
    pub fn submit(&mut self, command: &str) -> SubmitOutcome {
        if !self.can_send_commands() {
            tracing::debug!(server_id = %self.context.server_id, "Command dropped: no console capability");
            return SubmitOutcome::Denied;
        }

        if let Some(instance) = self.instance() {
            instance.emit(CHANNEL_COMMAND, command);
        } else {
            tracing::debug!("No connected instance, command recorded only");
        }

        self.history.push(command);
        if let Err(e) = self.history.persist(&mut self.store) {
            tracing::warn!(?e, server_id = %self.context.server_id, "Failed to persist command history");
        }
        self.cursor.reset();
        SubmitOutcome::Sent
    }

    /// Enter gesture: submit what the input shows, then clear the input.
    pub fn accept_line(&mut self) -> SubmitOutcome {
        let command = self.input_value().to_string();
        let outcome = self.submit(&command);
        self.draft.clear();
        self.cursor.reset();
        outcome
    }

    /// Arrow-key navigation. Returns whether the selection changed.
    ///
    /// Starting to navigate discards the draft, so stepping back down past
    /// the newest entry leaves the input blank.
    pub fn navigate(&mut self, direction: Direction) -> bool {
        let was_selected = self.cursor.is_selected();
        let moved = self.cursor.step(direction, self.history.len());
        if moved && !was_selected {
            self.draft.clear();
        }
        moved
    }

    /// Direct edit of the input field: `value` becomes the draft and any
    /// history selection is dropped.
    pub fn edit_input(&mut self, value: impl Into<String>) {
        self.cursor.reset();
        self.draft = value.into();
    }

    /// What the input field shows: the selected history entry, else the draft.
    pub fn input_value(&self) -> &str {
        self.cursor.selected(&self.history).unwrap_or(self.draft.as_str())
    }

    pub const fn history(&self) -> &CommandHistory {
        &self.history
    }

    pub const fn cursor(&self) -> HistoryCursor {
        self.cursor
    }

    pub const fn surface(&self) -> &SharedSurface<S> {
        &self.surface
    }
}
