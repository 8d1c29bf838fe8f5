//! Bridge error taxonomy

use std::path::PathBuf;

use thiserror::Error;

use crate::transport::TransportError;

/// Errors surfaced by [`MessageBridge`](crate::MessageBridge) operations
#[derive(Debug, Error)]
pub enum BridgeError {
    /// Transport open, send, or receive failure
    #[error("Connection error: {0}")]
    Connection(#[from] TransportError),

    /// Message not representable in the wire encoding
    #[error("Encoding error: {0}")]
    Encoding(String),

    /// Telemetry record missing a required numeric field
    #[error("Telemetry field '{field}' {reason}")]
    Schema {
        /// Name of the offending field
        field: &'static str,
        /// What was wrong with it
        reason: String,
    },

    /// Telemetry file could not be written
    #[error("Failed to write telemetry to {path}: {source}")]
    Io {
        /// Destination that was attempted
        path: PathBuf,
        /// The underlying IO error
        source: std::io::Error,
    },
}
