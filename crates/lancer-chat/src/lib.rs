//! Optimistic chat engine for Lancer conversations.
//!
//! This crate joins the three pieces of the optimistic message
//! protocol: the ordered [`MessageStore`], the [`Reconciler`] that
//! matches locally created provisional entries against server echoes,
//! and the engine task that drives both off a single event loop.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use lancer_chat::{ChatClient, ChatEvent};
//! use lancer_core::{ConversationId, SessionContext, UserId};
//! use lancer_transport::WebSocketTransport;
//!
//! async fn run_widget() -> Result<(), Box<dyn std::error::Error>> {
//!     let session = SessionContext::new(
//!         UserId::new("user-1"),
//!         UserId::new("peer-1"),
//!         ConversationId::new("conv-1"),
//!         "https://api.lancer.example",
//!         "wss://chat.lancer.example/ws",
//!     )
//!     .with_auth_token("bearer-token");
//!
//!     let transport = Arc::new(WebSocketTransport::connect(&session).await?);
//!     let (handle, mut events) = ChatClient::new(session, transport).spawn();
//!
//!     handle.send("Hello!").await?;
//!     while let Some(event) = events.recv().await {
//!         if let ChatEvent::MessageReplaced { message, .. } = event {
//!             println!("confirmed as {}", message.id);
//!             break;
//!         }
//!     }
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod error;
pub mod event;
pub mod reconciler;
pub mod store;

// Re-export main types
pub use client::{ChatClient, ChatClientOptions, ChatHandle};
pub use error::ChatError;
pub use event::{ChatCommand, ChatEvent};
pub use reconciler::{ReconcileOutcome, Reconciler};
pub use store::MessageStore;
