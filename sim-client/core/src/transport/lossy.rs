//! Lossy single-slot outbound queue
//!
//! Holds at most one pending payload. Enqueueing replaces whatever has not
//! been sent yet, so high-frequency control signals (steering, throttle)
//! never build up latency behind stale values.
//!
//! ```text
//!  enqueue(a) ─┐
//!  enqueue(b) ─┼──► [ slot: c ] ──► writer task ──► socket
//!  enqueue(c) ─┘
//! ```

use parking_lot::Mutex;
use tokio::sync::Notify;

/// Last-write-wins outbound buffer
#[derive(Debug, Default)]
pub struct LossyQueue {
    slot: Mutex<Option<Vec<u8>>>,
    notify: Notify,
}

impl LossyQueue {
    /// Create an empty queue
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a payload, replacing any pending one
    ///
    /// Returns `true` if an unsent payload was overwritten.
    pub fn enqueue(&self, payload: Vec<u8>) -> bool {
        let replaced = self.slot.lock().replace(payload).is_some();
        self.notify.notify_one();
        replaced
    }

    /// Take the pending payload, if any
    pub fn take(&self) -> Option<Vec<u8>> {
        self.slot.lock().take()
    }

    /// Copy of the pending payload without removing it
    #[must_use]
    pub fn pending(&self) -> Option<Vec<u8>> {
        self.slot.lock().clone()
    }

    /// Whether a payload is waiting to be sent
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slot.lock().is_none()
    }

    /// Wait until a payload is available and take it
    ///
    /// `Notify` stores a permit when nobody is waiting, so an enqueue that
    /// races with this call is never missed.
    pub async fn next(&self) -> Vec<u8> {
        loop {
            if let Some(payload) = self.take() {
                return payload;
            }
            self.notify.notified().await;
        }
    }
}
