//! paneltty CLI Library
//!
//! Terminal console for one managed game server, talking to the node over
//! its console WebSocket. Provides both TUI (ratatui) and headless modes.

pub mod app;
pub mod connection;
pub mod headless;
pub mod tui;
pub mod ui;
