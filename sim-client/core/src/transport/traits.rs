//! Transport Traits
//!
//! Core trait definition for the byte-stream side of the bridge.
//!
//! A transport owns the connection to the simulator. It delivers decoded
//! inbound messages through the channel it was opened with, and exposes
//! two outbound paths:
//! - `send_now`: written immediately, in call order
//! - `enqueue_lossy`: single-slot queue where the latest payload wins

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::mpsc;

use crate::messages::StructuredMessage;

/// Sender half used by transports to hand decoded messages to the bridge
pub type InboundSender = mpsc::Sender<StructuredMessage>;

/// Receiver half consumed by the bridge's dispatch task
pub type InboundReceiver = mpsc::Receiver<StructuredMessage>;

/// Host and port of a simulator endpoint
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SimAddress {
    /// Hostname or IP address
    pub host: String,
    /// TCP port
    pub port: u16,
}

impl SimAddress {
    /// Create a new address
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }
}

impl Default for SimAddress {
    fn default() -> Self {
        Self::new("127.0.0.1", 9091)
    }
}

impl fmt::Display for SimAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Errors that can occur during transport operations
#[derive(Debug, Error)]
pub enum TransportError {
    /// Connection to the simulator failed
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Connection was closed by the peer
    #[error("Connection closed")]
    ConnectionClosed,

    /// Failed to send a payload
    #[error("Send failed: {0}")]
    SendFailed(String),

    /// Inbound payload could not be parsed
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Inbound line exceeded the configured maximum
    #[error("Frame of {size} bytes exceeds maximum {max}")]
    FrameTooLarge {
        /// Bytes buffered without a line terminator
        size: usize,
        /// Configured limit
        max: usize,
    },

    /// Transport not in expected state
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// IO error from the underlying socket
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Byte-stream transport consumed by the bridge
///
/// Implementations are shared between the caller's task (outbound sends)
/// and the bridge's dispatch task, so they must be `Send + Sync`.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Write a payload immediately, waiting until it has been handed to
    /// the connection
    async fn send_now(&self, payload: Vec<u8>) -> Result<(), TransportError>;

    /// Replace the pending lossy payload
    ///
    /// Never blocks and never fails; a payload that is overwritten before
    /// the writer picks it up is silently dropped.
    fn enqueue_lossy(&self, payload: Vec<u8>);

    /// Stop the transport and close the connection
    ///
    /// Calling `stop` more than once is harmless.
    async fn stop(&self) -> Result<(), TransportError>;

    /// Whether the connection has been aborted (peer closed, IO error, or
    /// stopped locally)
    fn is_aborted(&self) -> bool;
}
