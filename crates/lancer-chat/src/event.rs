//! Events and commands crossing the engine boundary.

use lancer_core::{Message, MessageId};
use lancer_transport::ConnectionState;
use tokio::sync::oneshot;

/// Events published to the embedding host.
#[derive(Debug)]
pub enum ChatEvent {
    /// Initial history finished loading.
    HistoryLoaded { messages: Vec<Message> },
    /// A new entry was appended (optimistic send or inbound message).
    MessageAppended(Message),
    /// An optimistic entry was replaced by its confirmed counterpart.
    MessageReplaced {
        temp_id: MessageId,
        message: Message,
    },
    /// A send ran out its acknowledgment window.
    MessageFailed { id: MessageId },
    /// The realtime channel's connection state changed.
    ConnectionChanged(ConnectionState),
    /// A non-fatal error the host may surface as a banner.
    Error(String),
}

/// Commands sent from the host to the engine.
#[derive(Debug)]
pub enum ChatCommand {
    /// Send a message to the conversation peer.
    Send { content: String },
    /// Reply with an ordered snapshot of the store.
    Snapshot {
        reply: oneshot::Sender<Vec<Message>>,
    },
    /// Stop the engine.
    Shutdown,
}
