//! Capability checks for the current user.
//!
//! Granted permissions are plain strings such as `control.console`.
//! A grant may be a group wildcard (`control.*`) or the superuser `*`.

use serde::{Deserialize, Serialize};

/// Capability gating command submission.
pub const CONSOLE_CAPABILITY: &str = "control.console";

/// Synchronous capability lookup. May change over a session.
pub trait CapabilityCheck {
    fn has_capability(&self, capability: &str) -> bool;
}

/// Set of permissions granted to the user for one server.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Permissions {
    granted: Vec<String>,
}

impl Permissions {
    pub fn new<I, S>(granted: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            granted: granted.into_iter().map(Into::into).collect(),
        }
    }

    /// Parse a comma-separated list (`"control.console, control.start"`).
    pub fn parse_list(list: &str) -> Self {
        Self::new(
            list.split(',')
                .map(str::trim)
                .filter(|p| !p.is_empty()),
        )
    }

    pub fn granted(&self) -> &[String] {
        &self.granted
    }

    pub fn grant(&mut self, permission: impl Into<String>) {
        self.granted.push(permission.into());
    }

    pub fn revoke(&mut self, permission: &str) {
        self.granted.retain(|p| p != permission);
    }

    /// Whether the user may send console commands.
    pub fn can_send_commands(&self) -> bool {
        self.has_capability(CONSOLE_CAPABILITY)
    }
}

impl CapabilityCheck for Permissions {
    fn has_capability(&self, capability: &str) -> bool {
        self.granted.iter().any(|p| matches_permission(p, capability))
    }
}

/// Check if a granted permission covers `capability`.
fn matches_permission(pattern: &str, capability: &str) -> bool {
    if pattern == "*" {
        return true;
    }
    if let Some(group) = pattern.strip_suffix(".*") {
        return capability
            .strip_prefix(group)
            .is_some_and(|rest| rest.starts_with('.'));
    }
    pattern == capability
}
