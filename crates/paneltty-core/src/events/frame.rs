//! JSON frame codec for the console socket.
//!
//! Implements tolerant reader pattern: unknown fields ignored, unknown event
//! types decode to `None`. Two inbound envelopes are accepted:
//! `{"type": .., "data": ..}` and the daemon's `{"event": .., "args": [..]}`.
//! Outbound frames use whichever [`FrameStyle`] the connection is configured
//! with.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use super::types::*;
use crate::error::{Error, Result};

/// Outbound channel carrying a console command.
pub const CHANNEL_COMMAND: &str = "command";
/// Outbound channel carrying the authentication token.
pub const CHANNEL_AUTH: &str = "auth";

/// Daemon event name for a console command.
const DAEMON_SEND_COMMAND: &str = "send command";

/// Envelope used for outbound frames.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FrameStyle {
    /// `{"type": <channel>, "data": <payload>}`
    #[default]
    Typed,
    /// `{"event": <name>, "args": [<payload>]}`
    Event,
}

impl FrameStyle {
    /// Parse a config or env value (`typed` / `event`).
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "typed" => Some(Self::Typed),
            "event" => Some(Self::Event),
            _ => None,
        }
    }
}

/// Decode a single text frame.
///
/// Returns `Ok(None)` for well-formed frames whose type is not a console
/// event (auth acknowledgements, stats, token expiry notices...).
pub fn decode_frame(text: &str) -> Result<Option<ServerEvent>> {
    let raw: Value = serde_json::from_str(text)?;
    decode_value(&raw)
}

/// Decode a JSON value into a server event.
pub fn decode_value(raw: &Value) -> Result<Option<ServerEvent>> {
    if let Some(tag) = raw.get("type").and_then(Value::as_str) {
        let data = raw.get("data").map(payload_string).unwrap_or_default();
        return Ok(event_from_tag(tag, &data));
    }

    if let Some(name) = raw.get("event").and_then(Value::as_str) {
        let data = raw
            .get("args")
            .and_then(Value::as_array)
            .and_then(|args| args.first())
            .map(payload_string)
            .unwrap_or_default();
        return Ok(event_from_daemon_name(name, &data));
    }

    Err(Error::Frame("Missing 'type' or 'event' field".into()))
}

fn event_from_tag(tag: &str, data: &str) -> Option<ServerEvent> {
    match tag {
        TAG_CONSOLE_OUTPUT => Some(ServerEvent::ConsoleOutput(data.to_string())),
        TAG_TRANSFER_STATUS => Some(ServerEvent::TransferStatus(data.into())),
        TAG_DAEMON_ERROR_OUTPUT => Some(ServerEvent::DaemonError(data.to_string())),
        TAG_POWER_CHANGE => Some(ServerEvent::PowerChange(data.into())),
        TAG_SERVER_STATUS_UPDATE => Some(ServerEvent::StatusUpdate(data.to_string())),
        other => {
            tracing::debug!(frame_type = other, "Ignoring frame with unknown type");
            None
        }
    }
}

fn event_from_daemon_name(name: &str, data: &str) -> Option<ServerEvent> {
    match name {
        "console output" | "install output" => Some(ServerEvent::ConsoleOutput(data.to_string())),
        "transfer status" => Some(ServerEvent::TransferStatus(data.into())),
        "daemon error" => Some(ServerEvent::DaemonError(data.to_string())),
        "status" => Some(ServerEvent::PowerChange(data.into())),
        "daemon message" => Some(ServerEvent::StatusUpdate(data.to_string())),
        other => {
            tracing::debug!(event = other, "Ignoring daemon event");
            None
        }
    }
}

/// Payloads are strings on the wire; anything else is kept as its JSON text.
fn payload_string(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// A message sent from the client to the daemon.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundFrame {
    pub channel: String,
    pub payload: String,
}

impl OutboundFrame {
    pub fn new(channel: impl Into<String>, payload: impl Into<String>) -> Self {
        Self {
            channel: channel.into(),
            payload: payload.into(),
        }
    }

    /// Serialize as a text frame in the given envelope.
    pub fn encode(&self, style: FrameStyle) -> String {
        match style {
            FrameStyle::Typed => json!({ "type": self.channel, "data": self.payload }).to_string(),
            FrameStyle::Event => {
                let name = match self.channel.as_str() {
                    CHANNEL_COMMAND => DAEMON_SEND_COMMAND,
                    other => other,
                };
                json!({ "event": name, "args": [self.payload] }).to_string()
            }
        }
    }
}
