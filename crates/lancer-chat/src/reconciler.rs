//! Joining optimistic sends with server confirmations.
//!
//! This is the only place where a locally created provisional entry and
//! its authoritative counterpart meet. The server echo, not the
//! transport acknowledgment, is the source of truth for confirmation.

use tracing::debug;

use lancer_core::{Message, MessageId, MessageOrigin};

use crate::store::MessageStore;

/// What happened to an inbound confirmed message.
#[derive(Debug, Clone)]
pub enum ReconcileOutcome {
    /// An outstanding optimistic entry was replaced in place.
    Replaced {
        temp_id: MessageId,
        message: Message,
    },
    /// A new remote-or-confirmed entry was appended.
    Appended(Message),
    /// Duplicate of an entry already present; nothing changed.
    Ignored,
}

/// Mints temporary ids and matches inbound echoes against outstanding
/// optimistic entries.
#[derive(Debug, Default)]
pub struct Reconciler {
    next_temp_seq: u64,
}

impl Reconciler {
    /// Create a reconciler with a fresh id sequence.
    pub fn new() -> Self {
        Self::default()
    }

    /// Mint the next session-unique temporary id.
    pub fn next_temp_id(&mut self) -> MessageId {
        self.next_temp_seq += 1;
        MessageId::temporary(self.next_temp_seq)
    }

    /// Fold one inbound confirmed message into the store.
    ///
    /// A locally originated echo is matched against the first
    /// outstanding `Sending` entry with equal content, in creation
    /// order. Everything else appends, subject to the store's duplicate
    /// id rejection.
    pub fn reconcile(&mut self, store: &mut MessageStore, incoming: Message) -> ReconcileOutcome {
        if incoming.origin == MessageOrigin::LocalUser {
            if let Some(temp_id) = store.first_sending_match(&incoming.content) {
                if store.replace(&temp_id, incoming.clone()) {
                    debug!(temp_id = %temp_id, message_id = %incoming.id, "Optimistic entry confirmed");
                    return ReconcileOutcome::Replaced {
                        temp_id,
                        message: incoming,
                    };
                }
            }
        }

        if store.append(incoming.clone()) {
            ReconcileOutcome::Appended(incoming)
        } else {
            debug!(message_id = %incoming.id, "Duplicate confirmed message ignored");
            ReconcileOutcome::Ignored
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use lancer_core::DeliveryState;

    fn echo(id: &str, content: &str) -> Message {
        Message::confirmed(
            MessageId::new(id),
            MessageOrigin::LocalUser,
            content,
            Utc::now(),
        )
    }

    fn remote(id: &str, content: &str) -> Message {
        Message::confirmed(
            MessageId::new(id),
            MessageOrigin::RemotePeer,
            content,
            Utc::now(),
        )
    }

    #[test]
    fn test_temp_ids_are_monotonic() {
        let mut reconciler = Reconciler::new();
        let a = reconciler.next_temp_id();
        let b = reconciler.next_temp_id();
        assert_ne!(a, b);
        assert!(a.is_temporary() && b.is_temporary());
    }

    #[test]
    fn test_echo_replaces_outstanding_entry() {
        let mut reconciler = Reconciler::new();
        let mut store = MessageStore::new();

        let temp_id = reconciler.next_temp_id();
        store.append(Message::outgoing(temp_id.clone(), "hello"));

        match reconciler.reconcile(&mut store, echo("srv-1", "hello")) {
            ReconcileOutcome::Replaced { temp_id: replaced, message } => {
                assert_eq!(replaced, temp_id);
                assert_eq!(message.id.as_str(), "srv-1");
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert_eq!(store.len(), 1);
        assert_eq!(store.messages()[0].delivery_state, DeliveryState::Sent);
    }

    #[test]
    fn test_remote_message_appends() {
        let mut reconciler = Reconciler::new();
        let mut store = MessageStore::new();

        match reconciler.reconcile(&mut store, remote("srv-2", "hey")) {
            ReconcileOutcome::Appended(msg) => assert_eq!(msg.id.as_str(), "srv-2"),
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[test]
    fn test_duplicate_echo_is_ignored() {
        let mut reconciler = Reconciler::new();
        let mut store = MessageStore::new();

        store.append(Message::outgoing(reconciler.next_temp_id(), "hello"));
        reconciler.reconcile(&mut store, echo("srv-1", "hello"));

        // The late duplicate finds no Sending entry and its id exists.
        assert!(matches!(
            reconciler.reconcile(&mut store, echo("srv-1", "hello")),
            ReconcileOutcome::Ignored
        ));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_identical_content_matches_fifo() {
        let mut reconciler = Reconciler::new();
        let mut store = MessageStore::new();

        let first = reconciler.next_temp_id();
        let second = reconciler.next_temp_id();
        store.append(Message::outgoing(first.clone(), "dup"));
        store.append(Message::outgoing(second.clone(), "dup"));

        match reconciler.reconcile(&mut store, echo("srv-1", "dup")) {
            ReconcileOutcome::Replaced { temp_id, .. } => assert_eq!(temp_id, first),
            other => panic!("unexpected outcome: {other:?}"),
        }
        match reconciler.reconcile(&mut store, echo("srv-2", "dup")) {
            ReconcileOutcome::Replaced { temp_id, .. } => assert_eq!(temp_id, second),
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[test]
    fn test_local_echo_without_match_appends() {
        let mut reconciler = Reconciler::new();
        let mut store = MessageStore::new();

        // Own message confirmed from another device: no outstanding entry.
        assert!(matches!(
            reconciler.reconcile(&mut store, echo("srv-3", "elsewhere")),
            ReconcileOutcome::Appended(_)
        ));
    }
}
