//! WebSocket implementation of the realtime channel.
//!
//! One writer task drains outbound frames into the sink; one reader
//! task routes inbound frames - acknowledgments to their pending
//! waiters, confirmed messages to subscribers. Both tasks are aborted
//! when the transport is dropped.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::header::AUTHORIZATION;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

use lancer_core::SessionContext;

use crate::error::TransportError;
use crate::history::HistoryClient;
use crate::subscription::{self, EventSubscription};
use crate::transport::{ChatTransport, ConnectionState, SendOutcome, TransportEvent};
use crate::wire::{AckStatus, ClientFrame, HistoryFilter, HistoryPage, OutboundMessage, ServerAck, ServerFrame};

/// Per-subscriber event buffer.
const EVENT_BUFFER: usize = 64;

type WsSink = SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, WsMessage>;
type WsSource = SplitStream<WebSocketStream<MaybeTlsStream<TcpStream>>>;
type PendingAcks = Arc<Mutex<HashMap<String, oneshot::Sender<ServerAck>>>>;
type SubscriberList = Arc<Mutex<Vec<mpsc::Sender<TransportEvent>>>>;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// Realtime channel client over WebSocket, with a one-shot history
/// loader for initialization.
pub struct WebSocketTransport {
    history: HistoryClient,
    outbound_tx: mpsc::Sender<ClientFrame>,
    pending: PendingAcks,
    subscribers: SubscriberList,
    state_rx: watch::Receiver<ConnectionState>,
    reader: JoinHandle<()>,
    writer: JoinHandle<()>,
}

impl WebSocketTransport {
    /// Connect to the session's realtime channel.
    pub async fn connect(session: &SessionContext) -> Result<Self, TransportError> {
        let (state_tx, state_rx) = watch::channel(ConnectionState::Connecting);

        let mut request = session
            .channel_url
            .as_str()
            .into_client_request()
            .map_err(|e| TransportError::Connect(e.to_string()))?;
        if !session.auth_token.is_empty() {
            let value = HeaderValue::from_str(&format!("Bearer {}", session.auth_token))
                .map_err(|e| TransportError::Connect(e.to_string()))?;
            request.headers_mut().insert(AUTHORIZATION, value);
        }

        let (stream, _response) = connect_async(request)
            .await
            .map_err(|e| TransportError::Connect(e.to_string()))?;
        state_tx.send_replace(ConnectionState::Connected);
        info!(url = %session.channel_url, "Connected to realtime channel");

        let (sink, source) = stream.split();
        let (outbound_tx, outbound_rx) = mpsc::channel::<ClientFrame>(32);

        let pending: PendingAcks = Arc::new(Mutex::new(HashMap::new()));
        let subscribers: SubscriberList = Arc::new(Mutex::new(Vec::new()));

        let writer = tokio::spawn(run_write_loop(outbound_rx, sink));
        let reader = tokio::spawn(run_read_loop(
            source,
            Arc::clone(&pending),
            Arc::clone(&subscribers),
            state_tx,
        ));

        Ok(Self {
            history: HistoryClient::new(session),
            outbound_tx,
            pending,
            subscribers,
            state_rx,
            reader,
            writer,
        })
    }
}

#[async_trait]
impl ChatTransport for WebSocketTransport {
    async fn load_history(&self, filter: HistoryFilter) -> Result<HistoryPage, TransportError> {
        self.history.load_history(&filter).await
    }

    async fn send(
        &self,
        outbound: OutboundMessage,
        ack_timeout: Duration,
    ) -> Result<SendOutcome, TransportError> {
        let client_msg_id = outbound.client_msg_id.clone();
        let (ack_tx, ack_rx) = oneshot::channel();
        lock(&self.pending).insert(client_msg_id.clone(), ack_tx);

        if self
            .outbound_tx
            .send(ClientFrame::SendMessage(outbound))
            .await
            .is_err()
        {
            lock(&self.pending).remove(&client_msg_id);
            return Err(TransportError::ChannelClosed);
        }

        match tokio::time::timeout(ack_timeout, ack_rx).await {
            Ok(Ok(ack)) => match ack.status {
                AckStatus::Ok => Ok(SendOutcome::Acked),
                AckStatus::Error => Err(TransportError::SendRejected(
                    ack.error.unwrap_or_else(|| "unspecified".to_string()),
                )),
            },
            // Ack waiter dropped without resolution: the channel is gone.
            Ok(Err(_)) => Err(TransportError::ChannelClosed),
            Err(_) => {
                lock(&self.pending).remove(&client_msg_id);
                debug!(client_msg_id = %client_msg_id, "No ack within window");
                Ok(SendOutcome::TimedOut)
            }
        }
    }

    fn subscribe(&self) -> EventSubscription<TransportEvent> {
        let (tx, sub) = subscription::channel(EVENT_BUFFER);
        lock(&self.subscribers).push(tx);
        sub
    }

    fn connection_state(&self) -> ConnectionState {
        *self.state_rx.borrow()
    }
}

impl Drop for WebSocketTransport {
    fn drop(&mut self) {
        self.reader.abort();
        self.writer.abort();
    }
}

async fn run_write_loop(mut outbound_rx: mpsc::Receiver<ClientFrame>, mut sink: WsSink) {
    while let Some(frame) = outbound_rx.recv().await {
        let json = match serde_json::to_string(&frame) {
            Ok(json) => json,
            Err(e) => {
                warn!(error = %e, "Failed to serialize outbound frame");
                continue;
            }
        };
        if let Err(e) = sink.send(WsMessage::text(json)).await {
            warn!(error = %e, "Channel write failed");
            break;
        }
    }
    let _ = sink.close().await;
}

async fn run_read_loop(
    mut source: WsSource,
    pending: PendingAcks,
    subscribers: SubscriberList,
    state_tx: watch::Sender<ConnectionState>,
) {
    while let Some(result) = source.next().await {
        let raw = match result {
            Ok(WsMessage::Text(text)) => text,
            Ok(WsMessage::Close(_)) => break,
            // Ping/pong and binary frames carry nothing for us.
            Ok(_) => continue,
            Err(e) => {
                warn!(error = %e, "Channel read failed");
                break;
            }
        };

        match serde_json::from_str::<ServerFrame>(&raw) {
            Ok(frame) => route_frame(frame, &pending, &subscribers),
            Err(e) => warn!(error = %e, "Failed to parse server frame"),
        }
    }

    state_tx.send_replace(ConnectionState::Disconnected);
    broadcast(
        &subscribers,
        TransportEvent::ConnectionChanged(ConnectionState::Disconnected),
    );
    info!("Realtime channel closed");
}

/// Route one inbound frame: acks to their waiter, messages and errors
/// to subscribers.
fn route_frame(frame: ServerFrame, pending: &PendingAcks, subscribers: &SubscriberList) {
    match frame {
        ServerFrame::Ack(ack) => {
            let waiter = lock(pending).remove(&ack.client_msg_id);
            match waiter {
                Some(tx) => {
                    let _ = tx.send(ack);
                }
                None => debug!(client_msg_id = %ack.client_msg_id, "Ack with no pending waiter"),
            }
        }
        ServerFrame::NewMessage(live) => {
            broadcast(subscribers, TransportEvent::Message(live));
        }
        ServerFrame::Error { message } => {
            warn!(message = %message, "Channel error frame");
            broadcast(subscribers, TransportEvent::Error(message));
        }
        ServerFrame::Unknown(value) => {
            debug!(frame = %value, "Ignoring unknown frame");
        }
    }
}

/// Fan an event out to live subscribers, pruning released ones.
fn broadcast(subscribers: &SubscriberList, event: TransportEvent) {
    let mut subs = lock(subscribers);
    subs.retain(|tx| match tx.try_send(event.clone()) {
        Ok(()) => true,
        Err(mpsc::error::TrySendError::Full(_)) => {
            warn!("Subscriber lagging, dropping channel event");
            true
        }
        Err(mpsc::error::TrySendError::Closed(_)) => false,
    });
}
