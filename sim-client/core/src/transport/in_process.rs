//! In-Process Transport
//!
//! Channel-backed transport for embedding a simulator (or a scripted stand-in)
//! in the same process. Nothing touches a socket: immediate sends arrive on
//! the peer's receiver, the lossy queue is shared with the peer, and inbound
//! messages are injected through the peer's sender.
//!
//! # Usage
//!
//! ```ignore
//! let (transport, mut peer, inbound_rx) = InProcessTransport::new_pair();
//! let bridge = MessageBridge::with_transport(Arc::new(transport), inbound_rx, handler, path);
//!
//! peer.deliver(telemetry_message).await?;
//! let sent = peer.sent_rx.recv().await;
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;

use super::lossy::LossyQueue;
use super::traits::{InboundReceiver, InboundSender, Transport, TransportError};
use crate::messages::StructuredMessage;

/// Default channel capacity for both directions
const DEFAULT_CAPACITY: usize = 100;

/// In-process transport using tokio channels
pub struct InProcessTransport {
    sent_tx: mpsc::Sender<Vec<u8>>,
    lossy: Arc<LossyQueue>,
    aborted: Arc<AtomicBool>,
}

/// The simulator side of an in-process transport
pub struct InProcessPeer {
    /// Payloads written through `send_now`, in call order
    pub sent_rx: mpsc::Receiver<Vec<u8>>,
    inbound_tx: InboundSender,
    lossy: Arc<LossyQueue>,
    aborted: Arc<AtomicBool>,
}

impl InProcessTransport {
    /// Create a new in-process transport pair
    ///
    /// Returns:
    /// - `InProcessTransport`: hand this to the bridge
    /// - `InProcessPeer`: the simulator side
    /// - `InboundReceiver`: hand this to the bridge alongside the transport
    #[must_use]
    pub fn new_pair() -> (Self, InProcessPeer, InboundReceiver) {
        Self::new_pair_with_capacity(DEFAULT_CAPACITY)
    }

    /// Create with custom channel capacity
    #[must_use]
    pub fn new_pair_with_capacity(capacity: usize) -> (Self, InProcessPeer, InboundReceiver) {
        let (sent_tx, sent_rx) = mpsc::channel(capacity);
        let (inbound_tx, inbound_rx) = mpsc::channel(capacity);
        let lossy = Arc::new(LossyQueue::new());
        let aborted = Arc::new(AtomicBool::new(false));

        let transport = Self {
            sent_tx,
            lossy: Arc::clone(&lossy),
            aborted: Arc::clone(&aborted),
        };

        let peer = InProcessPeer {
            sent_rx,
            inbound_tx,
            lossy,
            aborted,
        };

        (transport, peer, inbound_rx)
    }
}

impl InProcessPeer {
    /// Deliver a message to the bridge as if it arrived on the wire
    ///
    /// # Errors
    ///
    /// Returns `TransportError::ConnectionClosed` if the bridge stopped
    /// listening.
    pub async fn deliver(&self, message: StructuredMessage) -> Result<(), TransportError> {
        self.inbound_tx
            .send(message)
            .await
            .map_err(|_| TransportError::ConnectionClosed)
    }

    /// Drain the lossy queue, as the writer would
    pub fn take_queued(&self) -> Option<Vec<u8>> {
        self.lossy.take()
    }

    /// Peek at the lossy queue without draining it
    #[must_use]
    pub fn pending_queued(&self) -> Option<Vec<u8>> {
        self.lossy.pending()
    }

    /// Simulate the connection dropping
    pub fn abort(&self) {
        self.aborted.store(true, Ordering::SeqCst);
    }

    /// Clear the aborted flag set by [`abort`](Self::abort)
    #[cfg(test)]
    pub fn restore(&self) {
        self.aborted.store(false, Ordering::SeqCst);
    }

    /// Whether the transport side has stopped or been aborted
    #[must_use]
    pub fn is_aborted(&self) -> bool {
        self.aborted.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transport for InProcessTransport {
    async fn send_now(&self, payload: Vec<u8>) -> Result<(), TransportError> {
        if self.aborted.load(Ordering::SeqCst) {
            return Err(TransportError::InvalidState(
                "Transport not connected".to_string(),
            ));
        }

        self.sent_tx
            .send(payload)
            .await
            .map_err(|_| TransportError::SendFailed("Channel closed".to_string()))
    }

    fn enqueue_lossy(&self, payload: Vec<u8>) {
        if !self.aborted.load(Ordering::SeqCst) {
            self.lossy.enqueue(payload);
        }
    }

    async fn stop(&self) -> Result<(), TransportError> {
        self.aborted.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn is_aborted(&self) -> bool {
        self.aborted.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[tokio::test]
    async fn test_in_process_roundtrip() {
        let (transport, mut peer, mut inbound_rx) = InProcessTransport::new_pair();

        transport.send_now(b"hello".to_vec()).await.unwrap();
        assert_eq!(peer.sent_rx.recv().await.unwrap(), b"hello".to_vec());

        let message = json!({"msg_type": "telemetry"}).as_object().unwrap().clone();
        peer.deliver(message.clone()).await.unwrap();
        assert_eq!(inbound_rx.recv().await.unwrap(), message);
    }

    #[tokio::test]
    async fn test_in_process_lossy_shared_with_peer() {
        let (transport, peer, _inbound_rx) = InProcessTransport::new_pair();

        transport.enqueue_lossy(b"a".to_vec());
        transport.enqueue_lossy(b"b".to_vec());

        assert_eq!(peer.pending_queued(), Some(b"b".to_vec()));
        assert_eq!(peer.take_queued(), Some(b"b".to_vec()));
        assert_eq!(peer.take_queued(), None);
    }

    #[tokio::test]
    async fn test_in_process_abort() {
        let (transport, peer, _inbound_rx) = InProcessTransport::new_pair();
        assert!(!transport.is_aborted());

        peer.abort();
        assert!(transport.is_aborted());

        let result = transport.send_now(b"late".to_vec()).await;
        assert!(matches!(result, Err(TransportError::InvalidState(_))));

        peer.restore();
        assert!(!transport.is_aborted());
    }

    #[tokio::test]
    async fn test_in_process_channel_closed() {
        let (transport, peer, _inbound_rx) = InProcessTransport::new_pair();
        drop(peer);

        let result = transport.send_now(b"orphan".to_vec()).await;
        assert!(matches!(result, Err(TransportError::SendFailed(_))));
    }

    #[tokio::test]
    async fn test_in_process_stop() {
        let (transport, peer, _inbound_rx) = InProcessTransport::new_pair();

        transport.stop().await.unwrap();
        assert!(transport.is_aborted());
        assert!(peer.is_aborted());
    }
}
