//! TCP Transport
//!
//! Client-side TCP connection to the simulator. Owns two background tasks:
//!
//! ```text
//! ┌──────────────┐   read task (LineDecoder)   ┌──────────────────┐
//! │              ├────────────────────────────►│ inbound channel  │──► bridge
//! │  TcpStream   │                             └──────────────────┘
//! │              │◄──── send_now (caller) ─────┐
//! │              │◄──── lossy writer task ◄──── LossyQueue
//! └──────────────┘
//! ```
//!
//! Immediate sends and the lossy writer share the write half behind an
//! async mutex, so lines are never interleaved.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::Mutex as AsyncMutex;
use tokio::task::JoinHandle;

use super::config::TransportConfig;
use super::frame::{encode_line, LineDecoder};
use super::lossy::LossyQueue;
use super::traits::{InboundSender, SimAddress, Transport, TransportError};

type SharedWriter = Arc<AsyncMutex<Option<OwnedWriteHalf>>>;

/// TCP transport to a simulator
pub struct TcpTransport {
    address: SimAddress,
    writer: SharedWriter,
    lossy: Arc<LossyQueue>,
    aborted: Arc<AtomicBool>,
    tasks: parking_lot::Mutex<Vec<JoinHandle<()>>>,
}

impl TcpTransport {
    /// Connect to the simulator and start the background tasks
    ///
    /// Decoded inbound messages are delivered to `inbound` in arrival order.
    ///
    /// # Errors
    ///
    /// Returns `TransportError::ConnectionFailed` if the connection is
    /// refused or does not complete within the configured timeout.
    pub async fn open(
        config: &TransportConfig,
        inbound: InboundSender,
    ) -> Result<Self, TransportError> {
        let address = config.address.clone();

        let stream = tokio::time::timeout(
            config.connect_timeout(),
            TcpStream::connect((address.host.as_str(), address.port)),
        )
        .await
        .map_err(|_| {
            TransportError::ConnectionFailed(format!(
                "Timed out connecting to {address} after {}ms",
                config.connect_timeout_ms
            ))
        })?
        .map_err(|e| {
            TransportError::ConnectionFailed(format!("Failed to connect to {address}: {e}"))
        })?;

        // Control messages are small and latency sensitive
        stream.set_nodelay(true)?;

        let (read_half, write_half) = stream.into_split();

        let aborted = Arc::new(AtomicBool::new(false));
        let writer: SharedWriter = Arc::new(AsyncMutex::new(Some(write_half)));
        let lossy = Arc::new(LossyQueue::new());

        let reader_task = tokio::spawn(read_loop(
            read_half,
            inbound,
            LineDecoder::with_max_line_size(config.max_line_size),
            config.read_buffer_size,
            Arc::clone(&aborted),
        ));

        let writer_task = tokio::spawn(lossy_write_loop(
            Arc::clone(&lossy),
            Arc::clone(&writer),
            Arc::clone(&aborted),
        ));

        tracing::info!(address = %address, "Connected to simulator");

        Ok(Self {
            address,
            writer,
            lossy,
            aborted,
            tasks: parking_lot::Mutex::new(vec![reader_task, writer_task]),
        })
    }

    /// Endpoint this transport is connected to
    #[must_use]
    pub fn address(&self) -> &SimAddress {
        &self.address
    }
}

#[async_trait]
impl Transport for TcpTransport {
    async fn send_now(&self, payload: Vec<u8>) -> Result<(), TransportError> {
        if self.aborted.load(Ordering::SeqCst) {
            return Err(TransportError::InvalidState("Not connected".to_string()));
        }

        let result = write_line(&self.writer, &payload).await;
        if result.is_err() {
            self.aborted.store(true, Ordering::SeqCst);
        }
        result
    }

    fn enqueue_lossy(&self, payload: Vec<u8>) {
        if self.aborted.load(Ordering::SeqCst) {
            tracing::debug!("Dropping queued message, transport aborted");
            return;
        }

        if self.lossy.enqueue(payload) {
            tracing::trace!("Replaced unsent queued message");
        }
    }

    async fn stop(&self) -> Result<(), TransportError> {
        let was_aborted = self.aborted.swap(true, Ordering::SeqCst);

        let tasks = std::mem::take(&mut *self.tasks.lock());
        for task in tasks {
            task.abort();
        }

        let write_half = self.writer.lock().await.take();
        if let Some(mut write_half) = write_half {
            if let Err(e) = write_half.shutdown().await {
                // A peer that already hung up cannot be shut down cleanly
                if !was_aborted && e.kind() != std::io::ErrorKind::NotConnected {
                    return Err(TransportError::Io(e));
                }
                tracing::debug!(error = %e, "Ignoring shutdown error on dead connection");
            }
            tracing::info!(address = %self.address, "Transport stopped");
        }

        Ok(())
    }

    fn is_aborted(&self) -> bool {
        self.aborted.load(Ordering::SeqCst)
    }
}

impl Drop for TcpTransport {
    fn drop(&mut self) {
        for task in self.tasks.get_mut().drain(..) {
            task.abort();
        }
    }
}

/// Write one framed payload through the shared write half
async fn write_line(
    writer: &AsyncMutex<Option<OwnedWriteHalf>>,
    payload: &[u8],
) -> Result<(), TransportError> {
    let mut guard = writer.lock().await;
    let write_half = guard
        .as_mut()
        .ok_or_else(|| TransportError::InvalidState("Not connected".to_string()))?;

    write_half
        .write_all(&encode_line(payload))
        .await
        .map_err(|e| TransportError::SendFailed(e.to_string()))
}

/// Socket → decoder → inbound channel
async fn read_loop(
    mut read_half: OwnedReadHalf,
    inbound: InboundSender,
    mut decoder: LineDecoder,
    read_buffer_size: usize,
    aborted: Arc<AtomicBool>,
) {
    let mut buf = vec![0u8; read_buffer_size.max(1)];

    'read: loop {
        match read_half.read(&mut buf).await {
            Ok(0) => {
                tracing::debug!("Connection closed by simulator");
                break;
            }
            Ok(n) => {
                decoder.push(&buf[..n]);

                loop {
                    match decoder.decode() {
                        Ok(Some(msg)) => {
                            if inbound.send(msg).await.is_err() {
                                tracing::debug!("Inbound receiver dropped");
                                break 'read;
                            }
                        }
                        Ok(None) => break,
                        Err(e @ TransportError::FrameTooLarge { .. }) => {
                            tracing::warn!(error = %e, "Inbound line too large, aborting");
                            break 'read;
                        }
                        Err(e) => {
                            tracing::warn!(error = %e, "Discarding undecodable message");
                        }
                    }
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "Read error");
                break;
            }
        }
    }

    aborted.store(true, Ordering::SeqCst);
    tracing::info!("Disconnected from simulator");
}

/// Lossy queue → socket
async fn lossy_write_loop(lossy: Arc<LossyQueue>, writer: SharedWriter, aborted: Arc<AtomicBool>) {
    loop {
        let payload = lossy.next().await;

        if let Err(e) = write_line(&writer, &payload).await {
            tracing::warn!(error = %e, "Queued write failed");
            aborted.store(true, Ordering::SeqCst);
            break;
        }
    }
}
