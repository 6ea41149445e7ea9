//! Formatting of server events into terminal display lines.
//!
//! Every produced line ends with an SGR reset so styling never bleeds into
//! the next line.

use crate::events::{ServerEvent, TransferStatus};

/// SGR reset.
pub const RESET: &str = "\u{1b}[0m";

/// Bold yellow shell-style label shown before relay-generated lines.
pub const PRELUDE: &str = "\u{1b}[1m\u{1b}[33mcontainer@pterodactyl~ \u{1b}[0m";

/// Bold text on a red background.
const ERROR_HIGHLIGHT: &str = "\u{1b}[1m\u{1b}[41m";

/// Turns server events into display lines.
#[derive(Debug, Clone, Copy)]
pub struct Formatter {
    /// Whether plain console output also carries the prelude label.
    pub prefix_console_output: bool,
}

impl Default for Formatter {
    fn default() -> Self {
        Self {
            prefix_console_output: true,
        }
    }
}

impl Formatter {
    /// Format one event. `None` means nothing is written for it.
    pub fn format(&self, event: &ServerEvent) -> Option<String> {
        match event {
            ServerEvent::ConsoleOutput(line) => {
                let prelude = if self.prefix_console_output {
                    PRELUDE
                } else {
                    ""
                };
                Some(format!("{prelude}{}{RESET}", strip_line_terminator(line)))
            }
            ServerEvent::TransferStatus(status) => match status {
                TransferStatus::Failure => Some(format!("{PRELUDE}Transfer has failed.{RESET}")),
                TransferStatus::Archive => Some(format!(
                    "{PRELUDE}Server has been archived successfully, attempting connection to target node..{RESET}"
                )),
                TransferStatus::Unknown(code) => {
                    tracing::trace!(code = %code, "No display line for transfer status");
                    None
                }
            },
            ServerEvent::DaemonError(line) => Some(format!(
                "{PRELUDE}{ERROR_HIGHLIGHT}{}{RESET}",
                strip_line_terminator(line)
            )),
            ServerEvent::PowerChange(state) => {
                Some(format!("{PRELUDE}Server marked as {state}.{RESET}"))
            }
            ServerEvent::StatusUpdate(status) => {
                Some(format!("{PRELUDE}Server status updated to {status}.{RESET}"))
            }
        }
    }
}

/// Format with the default formatter.
pub fn format_event(event: &ServerEvent) -> Option<String> {
    Formatter::default().format(event)
}

/// Remove exactly one trailing `\r\n`, `\r` or `\n`.
pub fn strip_line_terminator(line: &str) -> &str {
    line.strip_suffix("\r\n")
        .or_else(|| line.strip_suffix('\n'))
        .or_else(|| line.strip_suffix('\r'))
        .unwrap_or(line)
}
