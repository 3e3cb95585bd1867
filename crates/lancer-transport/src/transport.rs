//! The transport seam between the chat engine and the realtime channel.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::TransportError;
use crate::subscription::EventSubscription;
use crate::wire::{HistoryFilter, HistoryPage, LiveMessage, OutboundMessage};

/// Connection state of the realtime channel.
///
/// Reconnection policy belongs to the channel owner, not to the
/// consumers of this enum.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
}

/// Outcome of a send-with-acknowledgment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    /// The server acknowledged receipt within the window.
    Acked,
    /// No acknowledgment arrived within the window.
    TimedOut,
}

/// Events delivered to transport subscribers, at most once per
/// underlying network event.
#[derive(Debug, Clone)]
pub enum TransportEvent {
    /// A confirmed inbound message.
    Message(LiveMessage),
    /// The channel's connection state changed.
    ConnectionChanged(ConnectionState),
    /// An out-of-band channel error.
    Error(String),
}

/// Capability set the chat engine needs from a realtime channel:
/// connection state, send-with-ack, receive stream, plus a one-shot
/// history load.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Load conversation history over HTTP.
    ///
    /// Callers treat a failure as "start with an empty conversation",
    /// never as fatal.
    async fn load_history(&self, filter: HistoryFilter) -> Result<HistoryPage, TransportError>;

    /// Emit a send request and wait up to `ack_timeout` for the
    /// transport-level acknowledgment.
    async fn send(
        &self,
        outbound: OutboundMessage,
        ack_timeout: Duration,
    ) -> Result<SendOutcome, TransportError>;

    /// Register for inbound events. Dropping the returned subscription
    /// releases the registration deterministically.
    fn subscribe(&self) -> EventSubscription<TransportEvent>;

    /// Current connection state.
    fn connection_state(&self) -> ConnectionState;
}
