//! Scoped event subscriptions.
//!
//! A subscription is the receiving half of a channel wrapped in a guard
//! that closes the channel on drop, so producers observe the release
//! immediately instead of discovering a dead listener later.

use tokio::sync::mpsc;

/// Create a subscription and the sender feeding it.
pub fn channel<T>(buffer: usize) -> (mpsc::Sender<T>, EventSubscription<T>) {
    let (tx, rx) = mpsc::channel(buffer);
    (tx, EventSubscription { rx })
}

/// RAII handle for a stream of events.
///
/// Dropping the subscription unsubscribes: the channel is closed and
/// the producer prunes the registration on its next send.
#[derive(Debug)]
pub struct EventSubscription<T> {
    rx: mpsc::Receiver<T>,
}

impl<T> EventSubscription<T> {
    /// Receive the next event; `None` once the producer is gone and the
    /// buffer is drained.
    pub async fn recv(&mut self) -> Option<T> {
        self.rx.recv().await
    }

    /// Receive without waiting; `None` when no event is buffered.
    pub fn try_recv(&mut self) -> Option<T> {
        self.rx.try_recv().ok()
    }

    /// Close the subscription without dropping it.
    pub fn close(&mut self) {
        self.rx.close();
    }
}

impl<T> Drop for EventSubscription<T> {
    fn drop(&mut self) {
        self.rx.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_recv_in_order() {
        let (tx, mut sub) = channel(8);
        tx.send(1u32).await.unwrap();
        tx.send(2u32).await.unwrap();
        assert_eq!(sub.recv().await, Some(1));
        assert_eq!(sub.recv().await, Some(2));
    }

    #[tokio::test]
    async fn test_drop_releases_registration() {
        let (tx, sub) = channel(8);
        drop(sub);
        assert!(tx.send(1u32).await.is_err());
    }

    #[tokio::test]
    async fn test_try_recv() {
        let (tx, mut sub) = channel(8);
        assert_eq!(sub.try_recv(), None);
        tx.send(7u32).await.unwrap();
        assert_eq!(sub.try_recv(), Some(7));
    }
}
