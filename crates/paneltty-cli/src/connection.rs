//! Console socket client.
//!
//! Opens the WebSocket to the node, then splits it into a reader task that
//! decodes inbound frames and a writer task that drains the socket
//! instance's outbound queue.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, error, info, trace, warn};

use paneltty_core::events::{CHANNEL_AUTH, FrameStyle, decode_frame};
use paneltty_core::{Config, ServerEvent, SocketInstance};

/// Connection configuration.
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// Console socket URL (`ws://` or `wss://`).
    pub url: String,
    /// Token sent in the `auth` frame before anything else.
    pub token: Option<String>,
    pub connect_timeout: Duration,
    /// Envelope for outbound frames.
    pub frame_style: FrameStyle,
}

impl ConnectionConfig {
    /// Build from resolved configuration. A URL is required.
    pub fn from_config(config: &Config) -> Result<Self, ConnectionError> {
        let url = config
            .connection
            .url
            .clone()
            .ok_or(ConnectionError::MissingUrl)?;
        if !(url.starts_with("ws://") || url.starts_with("wss://")) {
            return Err(ConnectionError::InvalidAddress(url));
        }
        Ok(Self {
            url,
            token: config.connection.token.clone(),
            connect_timeout: Duration::from_secs(config.connection.connect_timeout_secs),
            frame_style: config.connection.frame_style,
        })
    }
}

/// Connection state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

/// What the reader task reports to the main loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SocketMessage {
    Event(ServerEvent),
    /// The socket is gone. Carries the close reason when the peer sent one.
    Closed(Option<String>),
}

/// A connected socket: its instance plus the tasks pumping it.
pub struct LiveSocket {
    pub instance: SocketInstance,
    pub events: mpsc::Receiver<SocketMessage>,
    reader: JoinHandle<()>,
    writer: JoinHandle<()>,
}

impl LiveSocket {
    /// Stop both pump tasks.
    pub fn shutdown(self) {
        self.reader.abort();
        self.writer.abort();
    }

    /// Let queued frames go out, then close.
    ///
    /// The writer drains until every clone of the instance is dropped, so
    /// callers must release their subscriptions first.
    pub async fn finish(self) {
        drop(self.instance);
        if tokio::time::timeout(FLUSH_TIMEOUT, self.writer).await.is_err() {
            warn!("Timed out flushing outbound frames");
        }
        self.reader.abort();
    }
}

const FLUSH_TIMEOUT: Duration = Duration::from_secs(2);

/// Client for one server's console socket.
pub struct ConsoleConnection {
    config: ConnectionConfig,
    state: ConnectionState,
}

impl ConsoleConnection {
    /// Create a new connection (not yet connected).
    pub const fn new(config: ConnectionConfig) -> Self {
        Self {
            config,
            state: ConnectionState::Disconnected,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.state == ConnectionState::Connected
    }

    /// Mark the connection lost after the reader reports `Closed`.
    pub fn mark_disconnected(&mut self) {
        self.state = ConnectionState::Disconnected;
    }

    /// Open the socket and start the pump tasks.
    pub async fn connect(&mut self) -> Result<LiveSocket, ConnectionError> {
        self.state = ConnectionState::Connecting;

        let connected = tokio::time::timeout(
            self.config.connect_timeout,
            connect_async(self.config.url.as_str()),
        )
        .await;
        let (ws_stream, _response) = match connected {
            Ok(Ok(pair)) => pair,
            Ok(Err(e)) => {
                self.state = ConnectionState::Disconnected;
                return Err(ConnectionError::ConnectFailed(e.to_string()));
            }
            Err(_) => {
                self.state = ConnectionState::Disconnected;
                return Err(ConnectionError::Timeout(self.config.connect_timeout));
            }
        };

        let (mut write, mut read) = ws_stream.split();
        let (instance, mut outbound_rx) = SocketInstance::new();
        let style = self.config.frame_style;

        if let Some(token) = &self.config.token {
            instance.emit(CHANNEL_AUTH, token);
        }

        let writer = tokio::spawn(async move {
            while let Some(frame) = outbound_rx.recv().await {
                debug!(channel = %frame.channel, "Sending frame");
                if let Err(e) = write.send(Message::Text(frame.encode(style).into())).await {
                    warn!(?e, "Socket write failed");
                    break;
                }
            }
            let _ = write.close().await;
        });

        let (event_tx, event_rx) = mpsc::channel::<SocketMessage>(256);
        let reader = tokio::spawn(async move {
            let reason = loop {
                match read.next().await {
                    Some(Ok(Message::Text(text))) => match decode_frame(text.as_str()) {
                        Ok(Some(event)) => {
                            trace!(tag = event.tag(), payload = event.payload(), "Frame received");
                            if event_tx.send(SocketMessage::Event(event)).await.is_err() {
                                warn!("Event receiver dropped");
                                return;
                            }
                        }
                        Ok(None) => {}
                        Err(e) => warn!(?e, "Dropping malformed frame"),
                    },
                    Some(Ok(Message::Close(frame))) => {
                        info!("Socket closed by peer");
                        break frame
                            .map(|f| f.reason.to_string())
                            .filter(|r| !r.is_empty());
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        error!(?e, "Socket read error");
                        break Some(e.to_string());
                    }
                    None => {
                        info!("Socket stream ended");
                        break None;
                    }
                }
            };
            let _ = event_tx.send(SocketMessage::Closed(reason)).await;
        });

        self.state = ConnectionState::Connected;
        info!(url = %self.config.url, instance = ?instance.id(), "Connected");

        Ok(LiveSocket {
            instance,
            events: event_rx,
            reader,
            writer,
        })
    }
}

/// Connection errors.
#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    #[error("No console URL configured (use --url or PANELTTY_URL)")]
    MissingUrl,

    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Connection failed: {0}")]
    ConnectFailed(String),

    #[error("Connection timed out after {0:?}")]
    Timeout(Duration),
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    fn config_with_url(url: Option<&str>) -> Config {
        let mut config = Config::default();
        config.connection.url = url.map(String::from);
        config
    }

    #[test]
    fn url_is_required() {
        assert!(matches!(
            ConnectionConfig::from_config(&config_with_url(None)),
            Err(ConnectionError::MissingUrl)
        ));
    }

    #[test]
    fn non_websocket_url_is_rejected() {
        assert!(matches!(
            ConnectionConfig::from_config(&config_with_url(Some("http://node/ws"))),
            Err(ConnectionError::InvalidAddress(_))
        ));
    }

    #[test]
    fn timeout_comes_from_config() {
        let config = ConnectionConfig::from_config(&config_with_url(Some("wss://node/ws"))).unwrap();
        assert_eq!(config.connect_timeout, Duration::from_secs(10));
        assert!(config.token.is_none());
    }

    #[test]
    fn new_connection_is_disconnected() {
        let conn = ConsoleConnection::new(ConnectionConfig {
            url: "ws://127.0.0.1:1".into(),
            token: None,
            connect_timeout: Duration::from_secs(1),
            frame_style: FrameStyle::Typed,
        });
        assert!(!conn.is_connected());
    }

    #[tokio::test]
    async fn refused_connection_returns_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let mut conn = ConsoleConnection::new(ConnectionConfig {
            url: format!("ws://{addr}"),
            token: None,
            connect_timeout: Duration::from_secs(5),
            frame_style: FrameStyle::Typed,
        });
        assert!(conn.connect().await.is_err());
        assert!(!conn.is_connected());
    }

    #[tokio::test]
    async fn round_trip_against_local_server() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
            let auth = ws.next().await.unwrap().unwrap();
            ws.send(Message::Text(
                r#"{"type":"console_output","data":"hello\n"}"#.into(),
            ))
            .await
            .unwrap();
            let command = ws.next().await.unwrap().unwrap();
            ws.close(None).await.unwrap();
            (
                auth.into_text().unwrap().to_string(),
                command.into_text().unwrap().to_string(),
            )
        });

        let mut conn = ConsoleConnection::new(ConnectionConfig {
            url: format!("ws://{addr}"),
            token: Some("secret".into()),
            connect_timeout: Duration::from_secs(5),
            frame_style: FrameStyle::Typed,
        });
        let mut live = conn.connect().await.unwrap();
        assert!(conn.is_connected());

        match live.events.recv().await.unwrap() {
            SocketMessage::Event(event) => {
                assert_eq!(event, ServerEvent::ConsoleOutput("hello\n".into()));
            }
            other => panic!("Expected event, got {other:?}"),
        }

        live.instance.emit("command", "list");
        assert!(matches!(
            live.events.recv().await.unwrap(),
            SocketMessage::Closed(_)
        ));

        let (auth, command) = server.await.unwrap();
        let auth: serde_json::Value = serde_json::from_str(&auth).unwrap();
        assert_eq!(auth["type"], "auth");
        assert_eq!(auth["data"], "secret");
        let command: serde_json::Value = serde_json::from_str(&command).unwrap();
        assert_eq!(command["type"], "command");
        assert_eq!(command["data"], "list");

        live.shutdown();
    }

    #[tokio::test]
    async fn event_style_frames_sent_to_daemon() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
            let mut received = Vec::new();
            for _ in 0..2 {
                let msg = ws.next().await.unwrap().unwrap();
                received.push(msg.into_text().unwrap().to_string());
            }
            received
        });

        let mut conn = ConsoleConnection::new(ConnectionConfig {
            url: format!("ws://{addr}"),
            token: Some("secret".into()),
            connect_timeout: Duration::from_secs(5),
            frame_style: FrameStyle::Event,
        });
        let live = conn.connect().await.unwrap();
        live.instance.emit("command", "list");

        let received = server.await.unwrap();
        let auth: serde_json::Value = serde_json::from_str(&received[0]).unwrap();
        assert_eq!(auth["event"], "auth");
        assert_eq!(auth["args"][0], "secret");
        let command: serde_json::Value = serde_json::from_str(&received[1]).unwrap();
        assert_eq!(command["event"], "send command");
        assert_eq!(command["args"][0], "list");

        live.shutdown();
    }
}
