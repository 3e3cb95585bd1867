//! Error types for the transport adapter.

use thiserror::Error;

/// Errors that can occur in the transport adapter.
///
/// None of these are fatal to the embedding application: history
/// failures degrade to an empty conversation, send failures mark one
/// message as failed, connection failures surface as a banner.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Initial history load failed (network or malformed payload).
    #[error("history load failed: {0}")]
    HistoryLoad(String),

    /// Failed to establish the realtime channel.
    #[error("connection failed: {0}")]
    Connect(String),

    /// The realtime channel is no longer writable.
    #[error("channel closed")]
    ChannelClosed,

    /// The server acknowledged the send with an error status.
    #[error("send rejected: {0}")]
    SendRejected(String),

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// WebSocket protocol error.
    #[error("websocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),
}
