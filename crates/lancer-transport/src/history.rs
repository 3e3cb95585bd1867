//! HTTP client for the conversation history endpoint.

use tracing::debug;

use lancer_core::SessionContext;

use crate::error::TransportError;
use crate::wire::{HistoryFilter, HistoryPage, HistoryResponse};

/// One-shot history loader over the HTTP API.
pub struct HistoryClient {
    inner: reqwest::Client,
    base_url: String,
    auth_token: String,
}

impl HistoryClient {
    /// Create a history client for the given session.
    pub fn new(session: &SessionContext) -> Self {
        Self {
            inner: reqwest::Client::new(),
            base_url: session.api_base_url.trim_end_matches('/').to_string(),
            auth_token: session.auth_token.clone(),
        }
    }

    /// Fetch the ordered message history for a conversation.
    ///
    /// Any non-success status or malformed payload is a
    /// [`TransportError::HistoryLoad`]; callers degrade to an empty
    /// conversation.
    pub async fn load_history(
        &self,
        filter: &HistoryFilter,
    ) -> Result<HistoryPage, TransportError> {
        let url = format!("{}/conversations/messages", self.base_url);
        debug!(url = %url, conversation_id = %filter.conversation_id, "Loading history");

        let mut query: Vec<(&str, String)> = vec![
            ("conversationId", filter.conversation_id.to_string()),
            ("requesterId", filter.requester_id.to_string()),
        ];
        if let Some(limit) = filter.limit {
            query.push(("limit", limit.to_string()));
        }

        let response = self
            .inner
            .get(&url)
            .bearer_auth(&self.auth_token)
            .query(&query)
            .send()
            .await
            .map_err(|e| TransportError::HistoryLoad(e.to_string()))?;

        if !response.status().is_success() {
            return Err(TransportError::HistoryLoad(format!(
                "HTTP {}",
                response.status()
            )));
        }

        let payload: HistoryResponse = response
            .json()
            .await
            .map_err(|e| TransportError::HistoryLoad(e.to_string()))?;

        let page = payload.resolve(&filter.requester_id);
        debug!(count = page.messages.len(), "History loaded");
        Ok(page)
    }
}
