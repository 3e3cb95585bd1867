//! Transport adapter for the Lancer chat engine.
//!
//! Exposes a minimal capability set over the realtime channel -
//! connection state, send-with-acknowledgment, receive stream - plus a
//! one-shot history load over HTTP. Raw server payloads are resolved
//! into the canonical [`lancer_core::Message`] here at the boundary;
//! nothing optional or ambiguous crosses into the reconciler.

pub mod error;
pub mod history;
pub mod socket;
pub mod subscription;
pub mod transport;
pub mod wire;

pub use error::TransportError;
pub use history::HistoryClient;
pub use socket::WebSocketTransport;
pub use subscription::EventSubscription;
pub use transport::{ChatTransport, ConnectionState, SendOutcome, TransportEvent};
pub use wire::{HistoryFilter, HistoryPage, LiveMessage, OutboundMessage};
