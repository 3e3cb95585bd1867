//! Core domain errors.

use thiserror::Error;

/// Core domain errors for the chat engine.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Invalid delivery state transition.
    #[error("Invalid delivery state transition: {from} -> {to}")]
    InvalidStateTransition { from: String, to: String },

    /// Message content is empty.
    #[error("Message content must not be empty")]
    EmptyContent,
}
