//! Wire shapes for the realtime channel and the history endpoint.
//!
//! Server payloads come in two dynamic shapes - history records and live
//! events - with optional fields and mixed sender tagging. Both are
//! resolved exactly once, here, into the canonical [`Message`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use lancer_core::{ConversationId, Message, MessageId, MessageOrigin, SessionContext, UserId};

/// Client -> server frame on the realtime channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientFrame {
    /// Request to send a message.
    SendMessage(OutboundMessage),
}

/// Payload of a send request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutboundMessage {
    /// Client-minted correlation id; the acknowledgment echoes it back.
    pub client_msg_id: String,
    pub content: String,
    pub sender_id: String,
    pub recipient_id: String,
    pub conversation_id: String,
}

impl OutboundMessage {
    /// Build a send payload for the given session.
    pub fn new(session: &SessionContext, client_msg_id: &MessageId, content: &str) -> Self {
        Self {
            client_msg_id: client_msg_id.to_string(),
            content: content.to_owned(),
            sender_id: session.user_id.to_string(),
            recipient_id: session.peer_id.to_string(),
            conversation_id: session.conversation_id.to_string(),
        }
    }
}

/// Server -> client frame on the realtime channel.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerFrame {
    /// Acknowledgment of a send request, correlated by `client_msg_id`.
    Ack(ServerAck),
    /// A confirmed message, carrying the server-assigned id and timestamp.
    NewMessage(LiveMessage),
    /// Out-of-band channel error.
    Error { message: String },
    /// Unknown frame type (fallback).
    #[serde(untagged)]
    Unknown(Value),
}

/// Acknowledgment status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AckStatus {
    Ok,
    Error,
}

/// Transport-level acknowledgment that a send request reached the
/// server; distinct from the application-level echo.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerAck {
    pub client_msg_id: String,
    pub status: AckStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// A confirmed message as carried by the `new_message` event.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveMessage {
    /// Server-assigned identifier.
    pub id: String,
    pub sender_id: String,
    #[serde(default)]
    pub recipient_id: Option<String>,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl LiveMessage {
    /// Resolve into the canonical message, tagging the origin by
    /// comparing the sender against the session's local user.
    pub fn into_message(self, local_user: &UserId) -> Message {
        let origin = if self.sender_id == local_user.as_str() {
            MessageOrigin::LocalUser
        } else {
            MessageOrigin::RemotePeer
        };
        Message::confirmed(MessageId::new(self.id), origin, self.content, self.created_at)
    }
}

/// Query parameters for the history load.
#[derive(Debug, Clone)]
pub struct HistoryFilter {
    pub conversation_id: ConversationId,
    pub requester_id: UserId,
    pub limit: Option<u32>,
}

impl HistoryFilter {
    /// Filter for the session's conversation, no limit.
    pub fn for_session(session: &SessionContext) -> Self {
        Self {
            conversation_id: session.conversation_id.clone(),
            requester_id: session.user_id.clone(),
            limit: None,
        }
    }

    /// Builder method to cap the number of records.
    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// Raw history endpoint response.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryResponse {
    /// Authoritative requester identity as the server sees it.
    #[serde(default)]
    pub requester_id: Option<String>,
    #[serde(default)]
    pub messages: Vec<HistoryRecord>,
}

/// One raw history record; the id may be absent in older payloads.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryRecord {
    #[serde(default)]
    pub id: Option<String>,
    pub sender_id: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// History records resolved into canonical messages, in server order.
#[derive(Debug, Clone)]
pub struct HistoryPage {
    /// Authoritative requester identity.
    pub requester_id: UserId,
    pub messages: Vec<Message>,
}

impl HistoryResponse {
    /// Resolve the raw payload against the session's user, preferring
    /// the server's authoritative requester id for origin tagging.
    pub fn resolve(self, fallback_requester: &UserId) -> HistoryPage {
        let requester_id = match self.requester_id {
            Some(id) if !id.is_empty() => UserId::new(id),
            _ => fallback_requester.clone(),
        };

        let messages = self
            .messages
            .into_iter()
            .map(|record| {
                let id = match record.id {
                    Some(id) => MessageId::new(id),
                    None => MessageId::generate(),
                };
                let origin = if record.sender_id == requester_id.as_str() {
                    MessageOrigin::LocalUser
                } else {
                    MessageOrigin::RemotePeer
                };
                Message::confirmed(id, origin, record.content, record.created_at)
            })
            .collect();

        HistoryPage {
            requester_id,
            messages,
        }
    }
}
