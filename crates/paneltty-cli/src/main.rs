//! paneltty CLI
//!
//! Terminal console for one managed game server.
//! Provides both TUI (ratatui) and headless modes.

use std::io;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use anyhow::Context;
use clap::Parser;
use tracing::{info, warn};

use paneltty_cli::app::{App, ConsoleStore, Scrollback};
use paneltty_cli::connection::{ConnectionConfig, ConsoleConnection};
use paneltty_cli::headless::{self, LineWriter};
use paneltty_cli::tui;
use paneltty_core::config::{self, Config};
use paneltty_core::history::{JsonFileStore, MemoryStore};
use paneltty_core::tracing_init::{LogTarget, init_tracing};
use paneltty_core::{ConsoleRelay, SessionContext};

#[derive(Parser, Debug)]
#[command(name = "paneltty")]
#[command(version, about = "Game server console in the terminal", long_about = None)]
struct Cli {
    /// Console socket URL (ws:// or wss://)
    #[arg(short, long, env = "PANELTTY_URL")]
    url: Option<String>,

    /// Token sent in the auth frame after connecting
    #[arg(long, env = "PANELTTY_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Server identifier (scopes command history; defaults to the id in the URL)
    #[arg(short, long, env = "PANELTTY_SERVER_ID")]
    server_id: Option<String>,

    /// Granted permission, repeatable (replaces configured permissions)
    #[arg(short, long = "permission")]
    permissions: Vec<String>,

    /// Command history file
    #[arg(long)]
    history_file: Option<PathBuf>,

    /// Keep command history in memory only
    #[arg(long)]
    no_history: bool,

    /// Output lines kept in the TUI scrollback
    #[arg(long)]
    scrollback: Option<usize>,

    /// Config file (defaults to the global settings.json)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Print output to stdout and read commands from stdin
    #[arg(long)]
    headless: bool,

    /// Emit logs as JSON lines
    #[arg(long)]
    log_json: bool,
}

impl Cli {
    /// Apply CLI arguments on top of resolved configuration.
    fn apply(&self, config: &mut Config) {
        if let Some(url) = &self.url {
            config.connection.url = Some(url.clone());
        }
        if let Some(token) = &self.token {
            config.connection.token = Some(token.clone());
        }
        if let Some(id) = &self.server_id {
            config.console.server_id = Some(id.clone());
        }
        if !self.permissions.is_empty() {
            config.permissions.clone_from(&self.permissions);
        }
        if let Some(path) = &self.history_file {
            config.history.path = Some(path.clone());
        }
        if let Some(lines) = self.scrollback {
            config.console.scrollback_lines = lines;
        }
    }
}

/// Server id from a `.../servers/<id>/ws` URL.
fn server_id_from_url(url: &str) -> Option<String> {
    let mut segments = url.split('/');
    segments.find(|s| *s == "servers")?;
    segments
        .next()
        .filter(|id| !id.is_empty())
        .map(String::from)
}

/// Open the history store: the configured file, else in-memory.
fn open_store(config: &Config, no_history: bool) -> ConsoleStore {
    if no_history {
        return Box::new(MemoryStore::default());
    }
    let path = config.history_path().or_else(|| {
        dirs::home_dir().map(|h| h.join(".paneltty").join("history.json"))
    });
    match path.map(JsonFileStore::open) {
        Some(Ok(store)) => {
            info!(path = %store.path().display(), "Using command history file");
            Box::new(store)
        }
        Some(Err(e)) => {
            warn!(?e, "Cannot open history file, history will not be saved");
            Box::new(MemoryStore::default())
        }
        None => Box::new(MemoryStore::default()),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => config::load_config_explicit(path, |key| std::env::var(key).ok())?,
        None => config::load_config()?,
    };
    cli.apply(&mut config);

    // Use file-based tracing for TUI mode to avoid polluting terminal
    let filter = format!("paneltty={}", config.log_level);
    let log_path = config::log_file_path();
    let target = match log_path.as_deref() {
        Some(path) if !cli.headless => LogTarget::File(path),
        _ => LogTarget::Stderr,
    };
    init_tracing(&filter, cli.log_json, target);

    info!(version = env!("CARGO_PKG_VERSION"), "Starting paneltty");

    let conn_config = ConnectionConfig::from_config(&config)?;
    let server_id = config
        .console
        .server_id
        .clone()
        .or_else(|| server_id_from_url(&conn_config.url))
        .context("No server id configured (use --server-id or PANELTTY_SERVER_ID)")?;
    let context = SessionContext::new(server_id, config.permissions());
    let store = open_store(&config, cli.no_history);
    let mut conn = ConsoleConnection::new(conn_config);

    if cli.headless {
        let surface = Arc::new(Mutex::new(LineWriter::new(io::stdout())));
        let mut relay =
            ConsoleRelay::new(context, surface, store)?.with_formatter(config.formatter());
        headless::run(&mut conn, &mut relay).await?;
    } else {
        let surface = Arc::new(Mutex::new(Scrollback::new(
            config.console.scrollback_lines,
        )));
        let relay =
            ConsoleRelay::new(context, surface, store)?.with_formatter(config.formatter());
        tui::run(&mut conn, App::new(relay)).await?;
    }

    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use paneltty_core::HistoryStore;

    #[test]
    fn cli_overrides_config() {
        let cli = Cli::parse_from([
            "paneltty",
            "--url",
            "wss://node/api/servers/abc/ws",
            "-p",
            "control.console",
            "-p",
            "control.start",
            "--scrollback",
            "200",
        ]);
        let mut config = Config::default();
        cli.apply(&mut config);

        assert_eq!(config.connection.url.as_deref(), Some("wss://node/api/servers/abc/ws"));
        assert_eq!(config.permissions, vec!["control.console", "control.start"]);
        assert_eq!(config.console.scrollback_lines, 200);
    }

    #[test]
    fn empty_permission_flags_keep_config() {
        let cli = Cli::parse_from(["paneltty"]);
        let mut config = Config::default();
        cli.apply(&mut config);
        assert!(config.permissions().can_send_commands());
    }

    #[test]
    fn server_id_parsed_from_socket_url() {
        assert_eq!(
            server_id_from_url("wss://node.example:8080/api/servers/8e1a-42/ws").as_deref(),
            Some("8e1a-42")
        );
        assert_eq!(server_id_from_url("wss://node.example/ws"), None);
        assert_eq!(server_id_from_url("wss://node/api/servers/"), None);
    }

    #[test]
    fn no_history_uses_memory_store() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.history.path = Some(dir.path().join("history.json"));

        let mut store = open_store(&config, true);
        store.save("k", &["x".to_string()]).unwrap();
        assert!(!dir.path().join("history.json").exists());

        let mut store = open_store(&config, false);
        store.save("k", &["x".to_string()]).unwrap();
        assert!(dir.path().join("history.json").exists());
    }
}
