//! TUI rendering components.

pub mod ansi;
mod render;

pub use render::{PLACEHOLDER, SCROLL_HELPER, draw};
