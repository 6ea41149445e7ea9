//! Event types for the console socket protocol.

use std::fmt;

/// Typed event pushed by the daemon for the managed server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerEvent {
    /// A line (or chunk) of the server process's console output.
    ConsoleOutput(String),
    /// Progress of a server transfer between nodes.
    TransferStatus(TransferStatus),
    /// Error output produced by the daemon itself, not the server process.
    DaemonError(String),
    /// The server's power state changed.
    PowerChange(PowerState),
    /// Free-form status update about the server.
    StatusUpdate(String),
}

impl ServerEvent {
    /// Wire tag used in the `type` field of a frame.
    pub const fn tag(&self) -> &'static str {
        match self {
            Self::ConsoleOutput(_) => TAG_CONSOLE_OUTPUT,
            Self::TransferStatus(_) => TAG_TRANSFER_STATUS,
            Self::DaemonError(_) => TAG_DAEMON_ERROR_OUTPUT,
            Self::PowerChange(_) => TAG_POWER_CHANGE,
            Self::StatusUpdate(_) => TAG_SERVER_STATUS_UPDATE,
        }
    }

    /// Raw string payload as it appears on the wire.
    pub fn payload(&self) -> &str {
        match self {
            Self::ConsoleOutput(s) | Self::DaemonError(s) | Self::StatusUpdate(s) => s,
            Self::TransferStatus(status) => status.as_str(),
            Self::PowerChange(state) => state.as_str(),
        }
    }
}

pub const TAG_CONSOLE_OUTPUT: &str = "console_output";
pub const TAG_TRANSFER_STATUS: &str = "transfer_status";
pub const TAG_DAEMON_ERROR_OUTPUT: &str = "daemon_error_output";
pub const TAG_POWER_CHANGE: &str = "power_change";
pub const TAG_SERVER_STATUS_UPDATE: &str = "server_status_update";

/// Transfer status codes.
///
/// Only `failure` and `archive` are rendered; anything else is kept verbatim
/// so it can be logged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferStatus {
    Failure,
    Archive,
    Unknown(String),
}

impl TransferStatus {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Failure => "failure",
            Self::Archive => "archive",
            Self::Unknown(code) => code,
        }
    }
}

impl From<&str> for TransferStatus {
    fn from(code: &str) -> Self {
        match code {
            "failure" => Self::Failure,
            "archive" => Self::Archive,
            other => Self::Unknown(other.to_string()),
        }
    }
}

/// Power state of the managed server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PowerState {
    Offline,
    Starting,
    Running,
    Stopping,
    Other(String),
}

impl PowerState {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Offline => "offline",
            Self::Starting => "starting",
            Self::Running => "running",
            Self::Stopping => "stopping",
            Self::Other(state) => state,
        }
    }
}

impl From<&str> for PowerState {
    fn from(state: &str) -> Self {
        match state {
            "offline" => Self::Offline,
            "starting" => Self::Starting,
            "running" => Self::Running,
            "stopping" => Self::Stopping,
            other => Self::Other(other.to_string()),
        }
    }
}

impl fmt::Display for PowerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transfer_status_codes() {
        assert_eq!(TransferStatus::from("failure"), TransferStatus::Failure);
        assert_eq!(TransferStatus::from("archive"), TransferStatus::Archive);
        assert_eq!(
            TransferStatus::from("completed"),
            TransferStatus::Unknown("completed".into())
        );
    }

    #[test]
    fn power_state_keeps_unknown_token() {
        let state = PowerState::from("hibernating");
        assert_eq!(state.to_string(), "hibernating");
        assert_eq!(PowerState::from("running"), PowerState::Running);
    }

    #[test]
    fn payload_matches_wire_string() {
        let event = ServerEvent::PowerChange(PowerState::Stopping);
        assert_eq!(event.tag(), "power_change");
        assert_eq!(event.payload(), "stopping");
    }
}
