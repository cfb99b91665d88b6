//! Error types for the game server

use thiserror::Error;
use tokio_tungstenite::tungstenite;

/// Failures that can surface from server startup or a single connection.
///
/// After startup none of these are fatal to the process: connection-level
/// errors end only the affected session.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("websocket error: {0}")]
    WebSocket(#[from] tungstenite::Error),

    #[error("failed to parse config file: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("failed to encode packet: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("server event channel closed")]
    ChannelClosed,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("player {0} is already registered")]
    AlreadyRegistered(u32),
}
