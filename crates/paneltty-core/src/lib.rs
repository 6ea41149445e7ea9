//! `paneltty` Core Library
//!
//! Framework-independent console relay for a single managed server:
//! - Typed server events and the JSON wire frames that carry them
//! - Output formatting into terminal display lines
//! - Event subscription with scoped release
//! - Command submission gated by console capability
//! - Per-server persisted command history and its navigation cursor
//! - Configuration resolution and common error types

pub mod bus;
pub mod config;
pub mod error;
pub mod events;
pub mod format;
pub mod history;
pub mod permissions;
pub mod relay;
pub mod tracing_init;

pub use bus::{SocketInstance, Subscription};
pub use config::Config;
pub use error::{Error, Result};
pub use events::ServerEvent;
pub use history::{CommandHistory, Direction, HistoryCursor, HistoryStore};
pub use permissions::{CapabilityCheck, Permissions};
pub use relay::{ConsoleRelay, OutputSurface, SessionContext, SharedSurface, SubmitOutcome};
