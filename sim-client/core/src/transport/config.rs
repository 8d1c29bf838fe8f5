//! Transport Configuration
//!
//! Connection parameters for the TCP transport.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::frame::MAX_LINE_SIZE;
use super::traits::SimAddress;

/// Default connect timeout in milliseconds
pub const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 5000;

/// Transport configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TransportConfig {
    /// Simulator endpoint
    pub address: SimAddress,

    /// Connection timeout in milliseconds
    ///
    /// How long to wait for the simulator to accept the connection.
    pub connect_timeout_ms: u64,

    /// Largest inbound line accepted before the connection is aborted
    pub max_line_size: usize,

    /// Size of the socket read buffer
    pub read_buffer_size: usize,

    /// Capacity of the channel carrying decoded messages to the bridge
    pub inbound_capacity: usize,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            address: SimAddress::default(),
            connect_timeout_ms: DEFAULT_CONNECT_TIMEOUT_MS,
            max_line_size: MAX_LINE_SIZE,
            read_buffer_size: 256 * 1024,
            inbound_capacity: 100,
        }
    }
}

impl TransportConfig {
    /// Create configuration for a specific endpoint with default limits
    pub fn for_address(address: SimAddress) -> Self {
        Self {
            address,
            ..Default::default()
        }
    }

    /// Connection timeout as a `Duration`
    #[must_use]
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }
}
