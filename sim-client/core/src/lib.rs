//! Sim Client Core - Message bridge for driving-simulator clients
//!
//! This crate connects an application-supplied [`MessageHandler`] to a
//! running simulator, moves JSON messages in both directions, and records
//! a trail of vehicle telemetry that is written to disk when the bridge
//! closes.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                        Application                           │
//! │   ┌──────────────────────┐        ┌───────────────────────┐  │
//! │   │   MessageHandler     │◄───────│     BridgeHandle      │  │
//! │   │  on_connect          │  sends │  send_now             │  │
//! │   │  on_recv_message     │        │  queue_message (lossy)│  │
//! │   │  get_telemetry       │        └───────────┬───────────┘  │
//! │   │  on_close            │                    │              │
//! │   └──────────▲───────────┘                    │              │
//! └──────────────┼────────────────────────────────┼──────────────┘
//!                │ inbound                        │ outbound
//! ┌──────────────┼────────────────────────────────┼──────────────┐
//! │              │        MessageBridge           │              │
//! │   ┌──────────┴──────────┐       ┌─────────────▼───────────┐  │
//! │   │   dispatch task     │       │       Transport         │  │
//! │   │   TelemetryLog      │◄──────│  TcpTransport           │  │
//! │   └─────────────────────┘       │  InProcessTransport     │  │
//! │                                 └─────────────────────────┘  │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Key Types
//!
//! - [`MessageBridge`]: Owns the transport and the handler, records telemetry
//! - [`MessageHandler`]: Application callbacks
//! - [`BridgeHandle`]: Cloneable sender handed to the handler on connect
//! - [`TelemetryLog`]: Ordered `(x, z, speed)` samples
//! - [`BridgeConfig`]: Connection and output settings
//!
//! # Quick Start
//!
//! ```ignore
//! use sim_client_core::{into_message, MessageBridge, SimAddress};
//!
//! let bridge = MessageBridge::connect(SimAddress::new("127.0.0.1", 9091), handler).await?;
//! let control = into_message(serde_json::json!({"msg_type": "control", "throttle": "0.3"}))?;
//! bridge.queue_message(&control)?;
//! // ...
//! bridge.close().await?;
//! ```

#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod bridge;
pub mod config;
pub mod error;
pub mod handler;
pub mod messages;
pub mod telemetry;
pub mod transport;

// Re-exports for convenience
pub use bridge::{BridgeHandle, MessageBridge};
pub use config::{
    default_config_path, load_config, load_config_from_path, BridgeConfig, ConfigError,
    ConfigSource,
};
pub use error::BridgeError;
pub use handler::MessageHandler;
pub use messages::{
    decode_message, encode_message, into_message, MessageKind, StructuredMessage, MSG_TYPE_KEY,
    TELEMETRY_KIND,
};
pub use telemetry::{TelemetryLog, TelemetrySample, DEFAULT_TELEMETRY_FILE};
pub use transport::{
    InProcessPeer, InProcessTransport, SimAddress, TcpTransport, Transport, TransportConfig,
    TransportError,
};
