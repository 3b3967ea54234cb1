//! Error types for the modegate domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Persistence has its own error type so store backends stay decoupled
//! from the engine's caller-facing errors.

use thiserror::Error;

/// The top-level error type for modegate operations.
#[derive(Debug, Error)]
pub enum Error {
    /// A mode name that is not one of the three known modes.
    #[error("Invalid mode '{0}': expected one of permissive, balanced, restrictive")]
    InvalidMode(String),

    /// A request arrived without a required identifier.
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    // --- Persistence errors ---
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // --- Generic ---
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

/// Failures reading or writing durable session records.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error on {path}: {reason}")]
    Io { path: String, reason: String },

    #[error("Corrupt session record for {conversation_id}: {reason}")]
    Corrupt {
        conversation_id: String,
        reason: String,
    },

    #[error("Failed to serialize session record: {0}")]
    Serialization(String),
}
