//! Error types for EmberKV
//!
//! Provides a unified error type for all operations.

use thiserror::Error;

/// Result type alias using EmberError
pub type Result<T> = std::result::Result<T, EmberError>;

/// Unified error type for EmberKV operations
#[derive(Debug, Error)]
pub enum EmberError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // WAL Errors
    // -------------------------------------------------------------------------
    #[error("WAL write failed: {0}")]
    WalWrite(String),

    // -------------------------------------------------------------------------
    // Storage Errors
    // -------------------------------------------------------------------------
    #[error("Key not found")]
    KeyNotFound,

    #[error("Corruption detected: {0}")]
    Corruption(String),

    // -------------------------------------------------------------------------
    // Serialization Errors
    // -------------------------------------------------------------------------
    #[error("Encoding error: {0}")]
    Encoding(String),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<bincode::Error> for EmberError {
    fn from(err: bincode::Error) -> Self {
        EmberError::Encoding(err.to_string())
    }
}
