//! Session context passed into the transport at construction.

use crate::ids::{ConversationId, UserId};

/// Identity and endpoints for one chat session.
///
/// Built once by the embedding host and handed to the transport; the
/// engine never reads identity or tokens from ambient state.
#[derive(Debug, Clone)]
pub struct SessionContext {
    /// Local user of this widget instance.
    pub user_id: UserId,
    /// Conversation peer.
    pub peer_id: UserId,
    /// Conversation the widget is bound to.
    pub conversation_id: ConversationId,
    /// Base URL of the HTTP API (history load).
    pub api_base_url: String,
    /// URL of the realtime channel.
    pub channel_url: String,
    /// Bearer token for both endpoints.
    pub auth_token: String,
}

impl SessionContext {
    /// Create a session context for the given identities and endpoints.
    pub fn new(
        user_id: UserId,
        peer_id: UserId,
        conversation_id: ConversationId,
        api_base_url: impl Into<String>,
        channel_url: impl Into<String>,
    ) -> Self {
        Self {
            user_id,
            peer_id,
            conversation_id,
            api_base_url: api_base_url.into(),
            channel_url: channel_url.into(),
            auth_token: String::new(),
        }
    }

    /// Builder method to set the bearer token.
    pub fn with_auth_token(mut self, token: impl Into<String>) -> Self {
        self.auth_token = token.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder() {
        let session = SessionContext::new(
            UserId::new("u1"),
            UserId::new("u2"),
            ConversationId::new("c1"),
            "https://api.lancer.test",
            "wss://chat.lancer.test/ws",
        )
        .with_auth_token("tok");

        assert_eq!(session.user_id.as_str(), "u1");
        assert_eq!(session.auth_token, "tok");
    }
}
