//! The chat message record and its delivery state machine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::ids::MessageId;

/// Where a message originated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MessageOrigin {
    /// Created by the local user of this widget instance.
    LocalUser,
    /// Created by the conversation peer.
    RemotePeer,
}

/// Delivery state of a message.
///
/// Only meaningful for locally originated messages; remote messages are
/// always `Sent`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeliveryState {
    /// Optimistically displayed, awaiting server confirmation.
    #[default]
    Sending,
    /// Confirmed by the server (or loaded from history).
    Sent,
    /// No acknowledgment arrived within the send window.
    Failed,
}

impl DeliveryState {
    /// Returns true if the state is terminal (no further transitions).
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Sent | Self::Failed)
    }

    /// Returns true if `to` is a legal next state.
    ///
    /// The only legal transitions are `Sending -> Sent` and
    /// `Sending -> Failed`; never backward.
    pub fn can_transition_to(&self, to: DeliveryState) -> bool {
        matches!(
            (self, to),
            (Self::Sending, Self::Sent) | (Self::Sending, Self::Failed)
        )
    }

    /// Perform a transition, or fail if it is not legal.
    pub fn transition(self, to: DeliveryState) -> Result<DeliveryState, CoreError> {
        if self.can_transition_to(to) {
            Ok(to)
        } else {
            Err(CoreError::InvalidStateTransition {
                from: format!("{self:?}"),
                to: format!("{to:?}"),
            })
        }
    }
}

/// One chat line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Unique identifier; temporary until the server confirms.
    pub id: MessageId,
    /// Where the message originated.
    pub origin: MessageOrigin,
    /// Message text.
    pub content: String,
    /// Client-assigned at creation; superseded by the server timestamp
    /// on confirmation.
    pub created_at: DateTime<Utc>,
    /// Delivery state.
    pub delivery_state: DeliveryState,
}

impl Message {
    /// Create an optimistic outgoing message in the `Sending` state.
    pub fn outgoing(id: MessageId, content: impl Into<String>) -> Self {
        Self {
            id,
            origin: MessageOrigin::LocalUser,
            content: content.into(),
            created_at: Utc::now(),
            delivery_state: DeliveryState::Sending,
        }
    }

    /// Create a server-confirmed message.
    pub fn confirmed(
        id: MessageId,
        origin: MessageOrigin,
        content: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            origin,
            content: content.into(),
            created_at,
            delivery_state: DeliveryState::Sent,
        }
    }

    /// Validate content for an outgoing message.
    pub fn validate_content(content: &str) -> Result<(), CoreError> {
        if content.trim().is_empty() {
            return Err(CoreError::EmptyContent);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outgoing_starts_sending() {
        let msg = Message::outgoing(MessageId::temporary(1), "hello");
        assert_eq!(msg.origin, MessageOrigin::LocalUser);
        assert_eq!(msg.delivery_state, DeliveryState::Sending);
        assert!(msg.id.is_temporary());
    }

    #[test]
    fn test_legal_transitions() {
        assert!(DeliveryState::Sending.can_transition_to(DeliveryState::Sent));
        assert!(DeliveryState::Sending.can_transition_to(DeliveryState::Failed));
    }

    #[test]
    fn test_terminal_states_never_move() {
        for terminal in [DeliveryState::Sent, DeliveryState::Failed] {
            assert!(terminal.is_terminal());
            for to in [
                DeliveryState::Sending,
                DeliveryState::Sent,
                DeliveryState::Failed,
            ] {
                assert!(terminal.transition(to).is_err());
            }
        }
    }

    #[test]
    fn test_validate_content() {
        assert!(Message::validate_content("hi").is_ok());
        assert!(Message::validate_content("").is_err());
        assert!(Message::validate_content("   ").is_err());
    }
}
