//! Transport Layer for the Simulator Bridge
//!
//! Separates the byte stream from message handling:
//! - `TcpTransport`: TCP connection to a running simulator
//! - `InProcessTransport`: channel pair for embedded use and tests
//!
//! Every transport exposes the same two outbound paths. `send_now` writes
//! in call order and reports failures; `enqueue_lossy` keeps only the latest
//! payload and never blocks the caller.

pub mod config;
pub mod frame;
pub mod in_process;
pub mod lossy;
pub mod tcp;
pub mod traits;

// Re-exports for convenience
pub use config::TransportConfig;
pub use frame::{encode_line, LineDecoder};
pub use in_process::{InProcessPeer, InProcessTransport};
pub use lossy::LossyQueue;
pub use tcp::TcpTransport;
pub use traits::{InboundReceiver, InboundSender, SimAddress, Transport, TransportError};
