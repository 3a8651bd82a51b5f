//! Error types for RespKV
//!
//! Provides a unified error type for all operations.

use std::io::ErrorKind;

use thiserror::Error;

/// Result type alias using KvError
pub type Result<T> = std::result::Result<T, KvError>;

/// Unified error type for RespKV operations
#[derive(Debug, Error)]
pub enum KvError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Protocol Errors
    // -------------------------------------------------------------------------
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// The stream ended cleanly, before the first byte of a value
    #[error("End of stream")]
    EndOfStream,

    /// The stream ended part way through a value
    #[error("Stream ended in the middle of a value")]
    Truncated,

    // -------------------------------------------------------------------------
    // Append-Only Log Errors
    // -------------------------------------------------------------------------
    #[error("Log sync failed: {0}")]
    WalSync(String),

    #[error("Log corruption at byte {offset}: {reason}")]
    WalCorruption { offset: u64, reason: String },

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}

impl KvError {
    /// True for the end-of-stream conditions (clean or truncated)
    pub fn is_end_of_stream(&self) -> bool {
        matches!(self, KvError::EndOfStream | KvError::Truncated)
    }

    /// True when the peer went away rather than sending something bad
    pub fn is_disconnect(&self) -> bool {
        match self {
            KvError::EndOfStream => true,
            KvError::Io(e) => matches!(
                e.kind(),
                ErrorKind::ConnectionReset
                    | ErrorKind::ConnectionAborted
                    | ErrorKind::BrokenPipe
                    | ErrorKind::UnexpectedEof
            ),
            _ => false,
        }
    }
}
