//! Configuration resolution for paneltty.
//!
//! Implements hierarchical config resolution:
//! 1. Built-in defaults
//! 2. Global config (~/.config/paneltty/settings.json)
//! 3. Environment variables
//! 4. CLI arguments (highest priority, applied by the binary)

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::events::FrameStyle;
use crate::format::Formatter;
use crate::permissions::{CONSOLE_CAPABILITY, Permissions};

/// Complete paneltty configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub connection: ConnectionConfig,
    #[serde(default)]
    pub console: ConsoleConfig,
    /// Permissions granted to the user on the target server.
    #[serde(default = "default_permissions")]
    pub permissions: Vec<String>,
    #[serde(default)]
    pub history: HistoryConfig,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            connection: ConnectionConfig::default(),
            console: ConsoleConfig::default(),
            permissions: default_permissions(),
            history: HistoryConfig::default(),
            log_level: default_log_level(),
        }
    }
}

fn default_permissions() -> Vec<String> {
    vec![CONSOLE_CAPABILITY.to_string()]
}

fn default_log_level() -> String {
    "warn".to_string()
}

impl Config {
    pub fn permissions(&self) -> Permissions {
        Permissions::new(self.permissions.iter().cloned())
    }

    pub const fn formatter(&self) -> Formatter {
        Formatter {
            prefix_console_output: self.console.prefix_console_output,
        }
    }

    /// History file: configured path, else `<config dir>/history.json`.
    pub fn history_path(&self) -> Option<PathBuf> {
        self.history
            .path
            .clone()
            .or_else(|| config_dir().map(|d| d.join("history.json")))
    }
}

/// WebSocket connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    /// Console socket URL (`wss://node.example.com:8080/api/servers/<uuid>/ws`).
    pub url: Option<String>,
    /// Token sent in the `auth` frame right after connecting.
    pub token: Option<String>,
    pub connect_timeout_secs: u64,
    /// Envelope for outbound frames.
    pub frame_style: FrameStyle,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            url: None,
            token: None,
            connect_timeout_secs: 10,
            frame_style: FrameStyle::default(),
        }
    }
}

/// Console view settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsoleConfig {
    /// Identifier of the managed server; scopes the command history.
    pub server_id: Option<String>,
    /// Lines kept in the output view before the oldest are dropped.
    pub scrollback_lines: usize,
    pub prefix_console_output: bool,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            server_id: None,
            scrollback_lines: 1000,
            prefix_console_output: true,
        }
    }
}

/// Command history persistence.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    pub path: Option<PathBuf>,
}

/// Load configuration with hierarchical resolution.
pub fn load_config() -> Result<Config> {
    load_config_from(global_config_path().as_deref(), |key| std::env::var(key).ok())
}

/// Resolve configuration from an explicit global file and env lookup.
pub fn load_config_from<F>(global_path: Option<&Path>, env: F) -> Result<Config>
where
    F: Fn(&str) -> Option<String>,
{
    let mut config = Config::default();

    if let Some(path) = global_path {
        if path.exists() {
            let global = load_config_file(path)?;
            merge_config(&mut config, global);
        }
    }

    apply_env_overrides(&mut config, env);

    Ok(config)
}

/// Resolve configuration from a file the user named explicitly.
///
/// Unlike [`load_config_from`], a missing file is an error.
pub fn load_config_explicit<F>(path: &Path, env: F) -> Result<Config>
where
    F: Fn(&str) -> Option<String>,
{
    if !path.exists() {
        return Err(Error::Config(format!(
            "Config file not found: {}",
            path.display()
        )));
    }
    load_config_from(Some(path), env)
}

/// The paneltty config directory.
pub fn config_dir() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .ok()
            .map(|h| PathBuf::from(h).join(".paneltty"))
    }
    #[cfg(target_os = "macos")]
    {
        std::env::var("HOME")
            .ok()
            .map(|h| PathBuf::from(h).join("Library/Application Support/paneltty"))
    }
    #[cfg(target_os = "linux")]
    {
        std::env::var("XDG_CONFIG_HOME")
            .ok()
            .map(PathBuf::from)
            .or_else(|| std::env::var("HOME").ok().map(|h| PathBuf::from(h).join(".config")))
            .map(|p| p.join("paneltty"))
    }
    #[cfg(not(any(target_os = "windows", target_os = "macos", target_os = "linux")))]
    {
        None
    }
}

/// Get the global config file path.
pub fn global_config_path() -> Option<PathBuf> {
    config_dir().map(|d| d.join("settings.json"))
}

/// Log file used by the TUI.
pub fn log_file_path() -> Option<PathBuf> {
    config_dir().map(|d| d.join("paneltty.log"))
}

fn load_config_file(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        Error::Config(format!("Failed to read config file {}: {}", path.display(), e))
    })?;
    serde_json::from_str(&content).map_err(|e| {
        Error::Config(format!("Failed to parse config file {}: {}", path.display(), e))
    })
}

fn merge_config(base: &mut Config, overlay: Config) {
    if overlay.connection.url.is_some() {
        base.connection.url = overlay.connection.url;
    }
    if overlay.connection.token.is_some() {
        base.connection.token = overlay.connection.token;
    }
    base.connection.connect_timeout_secs = overlay.connection.connect_timeout_secs;
    base.connection.frame_style = overlay.connection.frame_style;

    if overlay.console.server_id.is_some() {
        base.console.server_id = overlay.console.server_id;
    }
    base.console.scrollback_lines = overlay.console.scrollback_lines;
    base.console.prefix_console_output = overlay.console.prefix_console_output;

    if overlay.history.path.is_some() {
        base.history.path = overlay.history.path;
    }

    base.permissions = overlay.permissions;
    base.log_level = overlay.log_level;
}

fn apply_env_overrides<F>(config: &mut Config, env: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(val) = env("PANELTTY_URL") {
        config.connection.url = Some(val);
    }
    if let Some(val) = env("PANELTTY_TOKEN") {
        config.connection.token = Some(val);
    }
    if let Some(val) = env("PANELTTY_SERVER_ID") {
        config.console.server_id = Some(val);
    }
    if let Some(val) = env("PANELTTY_PERMISSIONS") {
        config.permissions = Permissions::parse_list(&val).granted().to_vec();
    }
    if let Some(style) = env("PANELTTY_FRAME_STYLE").as_deref().and_then(FrameStyle::parse) {
        config.connection.frame_style = style;
    }
    if let Some(val) = env("PANELTTY_LOG_LEVEL") {
        config.log_level = val;
    }
    if let Some(val) = env("PANELTTY_SCROLLBACK") {
        if let Ok(n) = val.parse() {
            config.console.scrollback_lines = n;
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn defaults_grant_console_capability() {
        let config = Config::default();
        assert!(config.permissions().can_send_commands());
        assert_eq!(config.console.scrollback_lines, 1000);
        assert!(config.console.prefix_console_output);
    }

    #[test]
    fn missing_global_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config_from(Some(&dir.path().join("settings.json")), no_env).unwrap();
        assert!(config.connection.url.is_none());
        assert_eq!(config.connection.connect_timeout_secs, 10);
    }

    #[test]
    fn global_file_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(
            &path,
            r#"{
                "connection": { "url": "wss://node.test/ws" },
                "console": { "server_id": "abc", "scrollback_lines": 50 },
                "permissions": ["file.read"]
            }"#,
        )
        .unwrap();

        let config = load_config_from(Some(&path), no_env).unwrap();
        assert_eq!(config.connection.url.as_deref(), Some("wss://node.test/ws"));
        assert_eq!(config.console.server_id.as_deref(), Some("abc"));
        assert_eq!(config.console.scrollback_lines, 50);
        assert!(config.console.prefix_console_output);
        assert!(!config.permissions().can_send_commands());
    }

    #[test]
    fn env_overrides_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{ "connection": { "url": "wss://file/ws" } }"#).unwrap();

        let env: HashMap<&str, &str> = [
            ("PANELTTY_URL", "wss://env/ws"),
            ("PANELTTY_PERMISSIONS", "control.*, file.read"),
            ("PANELTTY_SCROLLBACK", "not-a-number"),
            ("PANELTTY_FRAME_STYLE", "event"),
        ]
        .into_iter()
        .collect();
        let config =
            load_config_from(Some(&path), |k| env.get(k).map(|v| (*v).to_string())).unwrap();

        assert_eq!(config.connection.url.as_deref(), Some("wss://env/ws"));
        assert_eq!(config.permissions, vec!["control.*", "file.read"]);
        assert_eq!(config.console.scrollback_lines, 1000);
        assert_eq!(config.connection.frame_style, FrameStyle::Event);
    }

    #[test]
    fn frame_style_read_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{ "connection": { "frame_style": "event" } }"#).unwrap();
        let config = load_config_from(Some(&path), no_env).unwrap();
        assert_eq!(config.connection.frame_style, FrameStyle::Event);
        assert_eq!(Config::default().connection.frame_style, FrameStyle::Typed);
    }

    #[test]
    fn explicit_missing_file_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.json");
        assert!(matches!(
            load_config_explicit(&path, no_env),
            Err(Error::Config(msg)) if msg.contains("absent.json")
        ));

        std::fs::write(&path, r#"{ "console": { "server_id": "abc" } }"#).unwrap();
        let config = load_config_explicit(&path, no_env).unwrap();
        assert_eq!(config.console.server_id.as_deref(), Some("abc"));
    }

    #[test]
    fn malformed_file_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "{").unwrap();
        assert!(matches!(
            load_config_from(Some(&path), no_env),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn explicit_history_path_wins() {
        let mut config = Config::default();
        config.history.path = Some(PathBuf::from("/tmp/h.json"));
        assert_eq!(config.history_path(), Some(PathBuf::from("/tmp/h.json")));
    }
}
