//! Message handler contract
//!
//! The handler holds the application logic: it interprets inbound
//! messages, keeps whatever state it needs, and decides what to send back
//! through the [`BridgeHandle`] it receives on connect.

use crate::bridge::BridgeHandle;
use crate::messages::{MessageKind, StructuredMessage};

/// Application-level receiver of simulator messages
///
/// Methods are called with the bridge's handler lock held, so they must
/// not block. Sends belong in tasks spawned with the handle from
/// [`on_connect`](Self::on_connect); `queue_message` is synchronous and
/// safe to call directly.
pub trait MessageHandler: Send {
    /// Called once, right after the transport is open and before any
    /// inbound message is dispatched
    fn on_connect(&mut self, bridge: BridgeHandle);

    /// Interpret an inbound message and report its kind
    ///
    /// Returning [`MessageKind::Telemetry`] makes the bridge call
    /// [`get_telemetry`](Self::get_telemetry) and record a sample.
    fn on_recv_message(&mut self, message: StructuredMessage) -> MessageKind;

    /// Current telemetry record; must carry numeric `x`, `z` and `speed`
    fn get_telemetry(&self) -> StructuredMessage;

    /// Called once when the bridge closes, after telemetry has been flushed
    fn on_close(&mut self);
}
