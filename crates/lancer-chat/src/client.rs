//! The chat engine task and its host-facing handle.
//!
//! One spawned task owns the message store and the reconciler and
//! processes everything - host commands, inbound channel events,
//! resolved acknowledgments - in arrival order. Pending acknowledgment
//! waits run on their own tasks and report back through a channel, so a
//! slow send never blocks event processing.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use lancer_core::{Message, MessageId, SessionContext};
use lancer_transport::subscription::{self, EventSubscription};
use lancer_transport::wire::{HistoryFilter, OutboundMessage};
use lancer_transport::{ChatTransport, SendOutcome, TransportError, TransportEvent};

use crate::error::ChatError;
use crate::event::{ChatCommand, ChatEvent};
use crate::reconciler::{ReconcileOutcome, Reconciler};
use crate::store::MessageStore;

/// Tunables for the chat engine.
#[derive(Debug, Clone)]
pub struct ChatClientOptions {
    /// How long a send waits for its transport acknowledgment.
    pub ack_timeout: Duration,
    /// Cap on the number of history records requested at startup.
    pub history_limit: Option<u32>,
    /// Buffer size of the host event stream.
    pub event_buffer: usize,
}

impl Default for ChatClientOptions {
    fn default() -> Self {
        Self {
            ack_timeout: Duration::from_secs(10),
            history_limit: None,
            event_buffer: 64,
        }
    }
}

impl ChatClientOptions {
    /// Builder method to set the acknowledgment window.
    pub fn with_ack_timeout(mut self, timeout: Duration) -> Self {
        self.ack_timeout = timeout;
        self
    }

    /// Builder method to cap the history load.
    pub fn with_history_limit(mut self, limit: u32) -> Self {
        self.history_limit = Some(limit);
        self
    }
}

/// Host-facing handle to a running engine.
#[derive(Debug, Clone)]
pub struct ChatHandle {
    cmd_tx: mpsc::Sender<ChatCommand>,
}

impl ChatHandle {
    /// Queue a message for sending.
    ///
    /// The optimistic entry appears on the event stream as
    /// [`ChatEvent::MessageAppended`] in the `Sending` state.
    pub async fn send(&self, content: impl Into<String>) -> Result<(), ChatError> {
        let content = content.into();
        Message::validate_content(&content)?;
        self.cmd_tx
            .send(ChatCommand::Send { content })
            .await
            .map_err(|_| ChatError::EngineStopped)
    }

    /// Ordered snapshot of the conversation.
    pub async fn messages(&self) -> Result<Vec<Message>, ChatError> {
        let (reply, rx) = oneshot::channel();
        self.cmd_tx
            .send(ChatCommand::Snapshot { reply })
            .await
            .map_err(|_| ChatError::EngineStopped)?;
        rx.await.map_err(|_| ChatError::EngineStopped)
    }

    /// Stop the engine. Idempotent; late calls are ignored.
    pub async fn shutdown(&self) {
        let _ = self.cmd_tx.send(ChatCommand::Shutdown).await;
    }
}

/// Builder for a chat engine bound to one conversation.
pub struct ChatClient {
    session: SessionContext,
    transport: Arc<dyn ChatTransport>,
    options: ChatClientOptions,
}

impl ChatClient {
    /// Create a client for the given session over the given transport.
    pub fn new(session: SessionContext, transport: Arc<dyn ChatTransport>) -> Self {
        Self {
            session,
            transport,
            options: ChatClientOptions::default(),
        }
    }

    /// Builder method to override the default options.
    pub fn with_options(mut self, options: ChatClientOptions) -> Self {
        self.options = options;
        self
    }

    /// Spawn the engine task.
    ///
    /// Returns the command handle and the event stream. The engine
    /// loads history first (an unavailable history degrades to an empty
    /// conversation), then attaches to the realtime channel.
    pub fn spawn(self) -> (ChatHandle, EventSubscription<ChatEvent>) {
        let (events_tx, events) = subscription::channel(self.options.event_buffer);
        let (cmd_tx, cmd_rx) = mpsc::channel(32);
        let (ack_tx, ack_rx) = mpsc::channel(32);

        let engine = Engine {
            session: self.session,
            transport: self.transport,
            options: self.options,
            store: MessageStore::new(),
            reconciler: Reconciler::new(),
            events_tx,
            ack_tx,
        };
        tokio::spawn(engine.run(cmd_rx, ack_rx));

        (ChatHandle { cmd_tx }, events)
    }
}

/// Resolution of one send's acknowledgment wait.
struct AckResolved {
    temp_id: MessageId,
    result: Result<SendOutcome, TransportError>,
}

struct Engine {
    session: SessionContext,
    transport: Arc<dyn ChatTransport>,
    options: ChatClientOptions,
    store: MessageStore,
    reconciler: Reconciler,
    events_tx: mpsc::Sender<ChatEvent>,
    ack_tx: mpsc::Sender<AckResolved>,
}

impl Engine {
    async fn run(
        mut self,
        mut cmd_rx: mpsc::Receiver<ChatCommand>,
        mut ack_rx: mpsc::Receiver<AckResolved>,
    ) {
        // History first; the channel listener attaches once the load settles.
        let mut filter = HistoryFilter::for_session(&self.session);
        if let Some(limit) = self.options.history_limit {
            filter = filter.with_limit(limit);
        }
        match self.transport.load_history(filter).await {
            Ok(page) => {
                self.store.load_history(page.messages);
                let messages = self.store.messages().to_vec();
                info!(count = messages.len(), "History loaded");
                self.emit(ChatEvent::HistoryLoaded { messages }).await;
            }
            Err(e) => {
                warn!(error = %e, "History unavailable, starting empty");
                self.emit(ChatEvent::Error(format!("history unavailable: {e}")))
                    .await;
            }
        }

        let mut channel_events = self.transport.subscribe();
        let mut channel_open = true;

        loop {
            tokio::select! {
                cmd = cmd_rx.recv() => {
                    match cmd {
                        Some(ChatCommand::Send { content }) => self.handle_send(content).await,
                        Some(ChatCommand::Snapshot { reply }) => {
                            let _ = reply.send(self.store.messages().to_vec());
                        }
                        Some(ChatCommand::Shutdown) | None => break,
                    }
                }
                event = channel_events.recv(), if channel_open => {
                    match event {
                        Some(event) => self.handle_channel_event(event).await,
                        None => {
                            debug!("Channel event stream ended");
                            channel_open = false;
                        }
                    }
                }
                Some(resolved) = ack_rx.recv() => {
                    self.handle_ack(resolved).await;
                }
            }
        }

        debug!("Chat engine stopped");
    }

    async fn handle_send(&mut self, content: String) {
        let temp_id = self.reconciler.next_temp_id();
        let message = Message::outgoing(temp_id.clone(), content.clone());
        if self.store.append(message.clone()) {
            self.emit(ChatEvent::MessageAppended(message)).await;
        }

        let outbound = OutboundMessage::new(&self.session, &temp_id, &content);
        let transport = Arc::clone(&self.transport);
        let ack_tx = self.ack_tx.clone();
        let ack_timeout = self.options.ack_timeout;
        debug!(temp_id = %temp_id, "Dispatching send");
        tokio::spawn(async move {
            let result = transport.send(outbound, ack_timeout).await;
            let _ = ack_tx.send(AckResolved { temp_id, result }).await;
        });
    }

    async fn handle_ack(&mut self, resolved: AckResolved) {
        match resolved.result {
            Ok(SendOutcome::Acked) => {
                // The server echo, not the ack, resolves the entry.
                debug!(temp_id = %resolved.temp_id, "Send acked, awaiting echo");
            }
            Ok(SendOutcome::TimedOut) => {
                self.fail_send(resolved.temp_id, "no acknowledgment within window")
                    .await;
            }
            Err(e) => {
                let reason = e.to_string();
                self.fail_send(resolved.temp_id, &reason).await;
            }
        }
    }

    async fn fail_send(&mut self, temp_id: MessageId, reason: &str) {
        if self.store.mark_failed(&temp_id) {
            info!(temp_id = %temp_id, reason = %reason, "Message marked failed");
            self.emit(ChatEvent::MessageFailed { id: temp_id }).await;
        } else {
            debug!(temp_id = %temp_id, "Entry already resolved, ignoring late failure");
        }
    }

    async fn handle_channel_event(&mut self, event: TransportEvent) {
        match event {
            TransportEvent::Message(live) => {
                let incoming = live.into_message(&self.session.user_id);
                match self.reconciler.reconcile(&mut self.store, incoming) {
                    ReconcileOutcome::Replaced { temp_id, message } => {
                        self.emit(ChatEvent::MessageReplaced { temp_id, message })
                            .await;
                    }
                    ReconcileOutcome::Appended(message) => {
                        self.emit(ChatEvent::MessageAppended(message)).await;
                    }
                    ReconcileOutcome::Ignored => {}
                }
            }
            TransportEvent::ConnectionChanged(state) => {
                self.emit(ChatEvent::ConnectionChanged(state)).await;
            }
            TransportEvent::Error(message) => {
                warn!(message = %message, "Channel error");
                self.emit(ChatEvent::Error(message)).await;
            }
        }
    }

    async fn emit(&self, event: ChatEvent) {
        // A released host subscription only mutes events.
        let _ = self.events_tx.send(event).await;
    }
}
