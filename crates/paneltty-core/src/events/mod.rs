//! Server events delivered over the console socket.
//!
//! Event types and the JSON frame codec that carries them.

mod frame;
mod types;

pub use frame::*;
pub use types::*;
