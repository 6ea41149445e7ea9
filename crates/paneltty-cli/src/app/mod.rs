//! Terminal application state.

mod scrollback;
mod state;

pub use scrollback::Scrollback;
pub use state::{App, AppMode, ConsoleStore, Relay, SearchState};
