//! Error types for the chat engine.

use thiserror::Error;

use lancer_core::CoreError;

/// Errors surfaced to the embedding host.
#[derive(Debug, Error)]
pub enum ChatError {
    /// The message was rejected before it was queued.
    #[error("invalid message: {0}")]
    Invalid(#[from] CoreError),

    /// The engine task has stopped.
    #[error("chat engine stopped")]
    EngineStopped,
}
