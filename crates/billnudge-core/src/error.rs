//! Error types for BillNudge.

use thiserror::Error;

/// Errors surfaced by store mutations, compose requests and configuration.
///
/// Delivery failures are deliberately absent from normal control flow: the
/// gateway boundary converts them into [`crate::SendOutcome`] values.
#[derive(Debug, Error)]
pub enum BillNudgeError {
    #[error("Configuration error: {0}")]
    Config(String),

    /// Missing or malformed input, rejected before anything is dispatched.
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    #[error("Invalid message transition for {id}: {from} -> {to}")]
    InvalidTransition {
        id: String,
        from: crate::types::MessageStatus,
        to: crate::types::MessageStatus,
    },

    #[error("Gateway error: {0}")]
    Gateway(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl BillNudgeError {
    pub fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            id: id.into(),
        }
    }
}

impl From<serde_json::Error> for BillNudgeError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, BillNudgeError>;
