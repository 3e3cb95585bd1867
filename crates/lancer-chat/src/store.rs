//! The ordered message store.
//!
//! Owned exclusively by one engine task; all mutation happens there, so
//! no locking is needed. Operations that would break an invariant -
//! duplicate ids, backward state transitions, replacing an already
//! resolved entry - are silent no-ops reported through the return value.

use lancer_core::{DeliveryState, Message, MessageId, MessageOrigin};

/// Ordered sequence of message records for one conversation.
#[derive(Debug, Default)]
pub struct MessageStore {
    messages: Vec<Message>,
}

impl MessageStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert at the end. Returns false (and inserts nothing) when an
    /// entry with the same id is already present.
    pub fn append(&mut self, message: Message) -> bool {
        if self.contains(&message.id) {
            return false;
        }
        self.messages.push(message);
        true
    }

    /// Overwrite the `Sending` entry with id `temp_id` in place,
    /// preserving its position. No-op when no such entry exists or when
    /// the confirmed id is already present - a late duplicate echo must
    /// not create a second entry.
    pub fn replace(&mut self, temp_id: &MessageId, confirmed: Message) -> bool {
        if self.contains(&confirmed.id) {
            return false;
        }
        let Some(entry) = self.messages.iter_mut().find(|m| {
            &m.id == temp_id && m.delivery_state == DeliveryState::Sending
        }) else {
            return false;
        };
        *entry = confirmed;
        true
    }

    /// Mark the matching entry `Failed`. No-op when the entry is gone
    /// or already resolved.
    pub fn mark_failed(&mut self, temp_id: &MessageId) -> bool {
        let Some(entry) = self.messages.iter_mut().find(|m| &m.id == temp_id) else {
            return false;
        };
        if !entry.delivery_state.can_transition_to(DeliveryState::Failed) {
            return false;
        }
        entry.delivery_state = DeliveryState::Failed;
        true
    }

    /// Bulk-load history records. History entries precede anything
    /// created during the live session; records whose id is already
    /// present are skipped.
    pub fn load_history(&mut self, mut history: Vec<Message>) {
        history.retain(|m| !self.contains(&m.id));
        history.extend(self.messages.drain(..));
        self.messages = history;
    }

    /// First outstanding optimistic entry with this content, in
    /// creation order.
    pub fn first_sending_match(&self, content: &str) -> Option<MessageId> {
        self.messages
            .iter()
            .find(|m| {
                m.origin == MessageOrigin::LocalUser
                    && m.delivery_state == DeliveryState::Sending
                    && m.content == content
            })
            .map(|m| m.id.clone())
    }

    /// Look up an entry by id.
    pub fn get(&self, id: &MessageId) -> Option<&Message> {
        self.messages.iter().find(|m| &m.id == id)
    }

    /// Returns true if an entry with this id exists.
    pub fn contains(&self, id: &MessageId) -> bool {
        self.messages.iter().any(|m| &m.id == id)
    }

    /// Ordered view of all entries.
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Returns true if the store holds no entries.
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use lancer_core::MessageOrigin;

    fn confirmed(id: &str, content: &str) -> Message {
        Message::confirmed(
            MessageId::new(id),
            MessageOrigin::RemotePeer,
            content,
            Utc::now(),
        )
    }

    #[test]
    fn test_append_rejects_duplicate_id() {
        let mut store = MessageStore::new();
        assert!(store.append(confirmed("m1", "a")));
        assert!(!store.append(confirmed("m1", "b")));
        assert_eq!(store.len(), 1);
        assert_eq!(store.messages()[0].content, "a");
    }

    #[test]
    fn test_replace_preserves_position() {
        let mut store = MessageStore::new();
        store.append(confirmed("m1", "first"));
        store.append(Message::outgoing(MessageId::temporary(1), "mine"));
        store.append(confirmed("m2", "last"));

        let echo = Message::confirmed(
            MessageId::new("srv-9"),
            MessageOrigin::LocalUser,
            "mine",
            Utc::now(),
        );
        assert!(store.replace(&MessageId::temporary(1), echo));

        let ids: Vec<&str> = store.messages().iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["m1", "srv-9", "m2"]);
        assert_eq!(store.messages()[1].delivery_state, DeliveryState::Sent);
    }

    #[test]
    fn test_replace_is_idempotent() {
        let mut store = MessageStore::new();
        store.append(Message::outgoing(MessageId::temporary(1), "hi"));

        let echo = Message::confirmed(
            MessageId::new("srv-1"),
            MessageOrigin::LocalUser,
            "hi",
            Utc::now(),
        );
        assert!(store.replace(&MessageId::temporary(1), echo.clone()));
        // Second replace after resolution: state unchanged, no new entry.
        assert!(!store.replace(&MessageId::temporary(1), echo));
        assert_eq!(store.len(), 1);
        assert_eq!(store.messages()[0].id.as_str(), "srv-1");
    }

    #[test]
    fn test_replace_never_duplicates_server_id() {
        let mut store = MessageStore::new();
        store.append(Message::outgoing(MessageId::temporary(1), "dup"));
        store.append(Message::outgoing(MessageId::temporary(2), "dup"));

        let echo = Message::confirmed(
            MessageId::new("srv-1"),
            MessageOrigin::LocalUser,
            "dup",
            Utc::now(),
        );
        assert!(store.replace(&MessageId::temporary(1), echo.clone()));
        // The same server id must not land on the second optimistic entry.
        assert!(!store.replace(&MessageId::temporary(2), echo));
        let with_id = store
            .messages()
            .iter()
            .filter(|m| m.id.as_str() == "srv-1")
            .count();
        assert_eq!(with_id, 1);
    }

    #[test]
    fn test_mark_failed_only_from_sending() {
        let mut store = MessageStore::new();
        store.append(Message::outgoing(MessageId::temporary(1), "hi"));

        assert!(store.mark_failed(&MessageId::temporary(1)));
        assert_eq!(
            store.get(&MessageId::temporary(1)).unwrap().delivery_state,
            DeliveryState::Failed
        );
        // Stays failed; a second mark is a no-op.
        assert!(!store.mark_failed(&MessageId::temporary(1)));
    }

    #[test]
    fn test_mark_failed_noop_after_sent() {
        let mut store = MessageStore::new();
        store.append(Message::outgoing(MessageId::temporary(1), "hi"));
        let echo = Message::confirmed(
            MessageId::new("srv-1"),
            MessageOrigin::LocalUser,
            "hi",
            Utc::now(),
        );
        store.replace(&MessageId::temporary(1), echo);

        assert!(!store.mark_failed(&MessageId::temporary(1)));
        assert!(!store.mark_failed(&MessageId::new("srv-1")));
        assert_eq!(
            store.get(&MessageId::new("srv-1")).unwrap().delivery_state,
            DeliveryState::Sent
        );
    }

    #[test]
    fn test_history_precedes_live_entries() {
        let mut store = MessageStore::new();
        store.append(Message::outgoing(MessageId::temporary(1), "live"));

        store.load_history(vec![confirmed("h1", "old-1"), confirmed("h2", "old-2")]);

        let ids: Vec<&str> = store.messages().iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["h1", "h2", "temp-1"]);
        assert!(store.messages()[..2]
            .iter()
            .all(|m| m.delivery_state == DeliveryState::Sent));
    }

    #[test]
    fn test_first_sending_match_is_fifo() {
        let mut store = MessageStore::new();
        store.append(Message::outgoing(MessageId::temporary(1), "dup"));
        store.append(Message::outgoing(MessageId::temporary(2), "dup"));

        assert_eq!(
            store.first_sending_match("dup"),
            Some(MessageId::temporary(1))
        );

        let echo = Message::confirmed(
            MessageId::new("srv-1"),
            MessageOrigin::LocalUser,
            "dup",
            Utc::now(),
        );
        store.replace(&MessageId::temporary(1), echo);

        assert_eq!(
            store.first_sending_match("dup"),
            Some(MessageId::temporary(2))
        );
    }
}
