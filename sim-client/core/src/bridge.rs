//! Message Bridge
//!
//! Connects a [`Transport`] to a [`MessageHandler`] and records the
//! telemetry trail.
//!
//! # Lifecycle
//!
//! ```text
//! connect ──► on_connect(handle) ──► dispatch loop ──► close()
//!                                     │                  │
//!                inbound message ─────┤                  ├─ 1. stop dispatch
//!                on_recv_message      │                  ├─ 2. write telemetry file
//!                kind == telemetry ───┴─► log sample     ├─ 3. stop transport
//!                                                        └─ 4. on_close()
//! ```
//!
//! `close` runs its steps once, in that order, and every step runs even if
//! an earlier one failed. Dropping a bridge never writes the telemetry
//! file; call `close` explicitly.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::config::BridgeConfig;
use crate::error::BridgeError;
use crate::handler::MessageHandler;
use crate::messages::{encode_message, MessageKind, StructuredMessage};
use crate::telemetry::{write_table, TelemetryLog, TelemetrySample};
use crate::transport::{InboundReceiver, SimAddress, TcpTransport, Transport};

/// Cloneable sending side of a bridge
///
/// Handed to the handler in `on_connect` so it can talk back to the
/// simulator without holding the bridge itself.
#[derive(Clone)]
pub struct BridgeHandle {
    transport: Arc<dyn Transport>,
}

impl BridgeHandle {
    /// Encode a message and send it immediately
    ///
    /// # Errors
    ///
    /// - `BridgeError::Encoding` if the message cannot be encoded
    /// - `BridgeError::Connection` if the transport send fails
    pub async fn send_now(&self, message: &StructuredMessage) -> Result<(), BridgeError> {
        let payload = encode_message(message)?;
        self.transport.send_now(payload).await?;
        Ok(())
    }

    /// Encode a message and replace the pending lossy payload with it
    ///
    /// # Errors
    ///
    /// Returns `BridgeError::Encoding` if the message cannot be encoded.
    pub fn queue_message(&self, message: &StructuredMessage) -> Result<(), BridgeError> {
        let payload = encode_message(message)?;
        self.transport.enqueue_lossy(payload);
        Ok(())
    }

    /// Whether the transport is still connected
    #[must_use]
    pub fn is_connected(&self) -> bool {
        !self.transport.is_aborted()
    }
}

impl std::fmt::Debug for BridgeHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BridgeHandle")
            .field("connected", &self.is_connected())
            .finish()
    }
}

/// State shared between the bridge and its dispatch task
struct BridgeShared {
    handle: BridgeHandle,
    handler: Mutex<Option<Box<dyn MessageHandler>>>,
    telemetry: Mutex<TelemetryLog>,
}

impl BridgeShared {
    fn dispatch(&self, message: StructuredMessage) -> Result<Option<MessageKind>, BridgeError> {
        let (kind, record) = {
            let mut guard = self.handler.lock();
            let Some(handler) = guard.as_mut() else {
                tracing::debug!("No handler attached, dropping message");
                return Ok(None);
            };

            let kind = handler.on_recv_message(message);
            let record = kind.is_telemetry().then(|| handler.get_telemetry());
            (kind, record)
        };

        if let Some(record) = record {
            let sample = TelemetrySample::from_record(&record)?;
            self.telemetry.lock().push(sample);
        }

        Ok(Some(kind))
    }
}

/// Bridge between a simulator transport and a message handler
pub struct MessageBridge {
    shared: Arc<BridgeShared>,
    telemetry_path: PathBuf,
    dispatcher: Mutex<Option<JoinHandle<()>>>,
    closed: AtomicBool,
}

impl MessageBridge {
    /// Connect to a simulator with default settings
    ///
    /// # Errors
    ///
    /// Returns `BridgeError::Connection` if the simulator is unreachable.
    pub async fn connect<H>(address: SimAddress, handler: H) -> Result<Self, BridgeError>
    where
        H: MessageHandler + 'static,
    {
        Self::connect_with_config(&BridgeConfig::for_address(address), handler).await
    }

    /// Connect to a simulator using a full configuration
    ///
    /// # Errors
    ///
    /// Returns `BridgeError::Connection` if the simulator is unreachable.
    pub async fn connect_with_config<H>(
        config: &BridgeConfig,
        handler: H,
    ) -> Result<Self, BridgeError>
    where
        H: MessageHandler + 'static,
    {
        let (inbound_tx, inbound_rx) = mpsc::channel(config.transport.inbound_capacity.max(1));
        let transport = TcpTransport::open(&config.transport, inbound_tx).await?;

        Ok(Self::with_transport(
            Arc::new(transport),
            inbound_rx,
            handler,
            config.telemetry_path.clone(),
        ))
    }

    /// Build a bridge over an already open transport
    ///
    /// `inbound` must be the receiver the transport delivers to. Calls
    /// `handler.on_connect` before spawning the dispatch task, so the
    /// handler sees its handle before any message. Must be called from
    /// within a tokio runtime.
    pub fn with_transport<H>(
        transport: Arc<dyn Transport>,
        inbound: InboundReceiver,
        handler: H,
        telemetry_path: impl Into<PathBuf>,
    ) -> Self
    where
        H: MessageHandler + 'static,
    {
        let handle = BridgeHandle { transport };

        let mut handler: Box<dyn MessageHandler> = Box::new(handler);
        handler.on_connect(handle.clone());

        let shared = Arc::new(BridgeShared {
            handle,
            handler: Mutex::new(Some(handler)),
            telemetry: Mutex::new(TelemetryLog::new()),
        });

        let dispatcher = tokio::spawn(dispatch_loop(Arc::clone(&shared), inbound));

        Self {
            shared,
            telemetry_path: telemetry_path.into(),
            dispatcher: Mutex::new(Some(dispatcher)),
            closed: AtomicBool::new(false),
        }
    }

    /// A cloneable handle for sending from other tasks
    #[must_use]
    pub fn handle(&self) -> BridgeHandle {
        self.shared.handle.clone()
    }

    /// Encode a message and send it immediately
    ///
    /// # Errors
    ///
    /// See [`BridgeHandle::send_now`].
    pub async fn send_now(&self, message: &StructuredMessage) -> Result<(), BridgeError> {
        self.shared.handle.send_now(message).await
    }

    /// Encode a message and put it on the lossy queue
    ///
    /// # Errors
    ///
    /// See [`BridgeHandle::queue_message`].
    pub fn queue_message(&self, message: &StructuredMessage) -> Result<(), BridgeError> {
        self.shared.handle.queue_message(message)
    }

    /// Dispatch one inbound message to the handler
    ///
    /// The dispatch task calls this for every message the transport
    /// delivers. Returns the handler's kind, or `None` if no handler is
    /// attached.
    ///
    /// # Errors
    ///
    /// Returns `BridgeError::Schema` if the handler reported telemetry but
    /// its record lacks a numeric `x`, `z` or `speed`.
    pub fn on_msg_recv(
        &self,
        message: StructuredMessage,
    ) -> Result<Option<MessageKind>, BridgeError> {
        self.shared.dispatch(message)
    }

    /// Snapshot of the recorded samples
    #[must_use]
    pub fn telemetry_samples(&self) -> Vec<TelemetrySample> {
        self.shared.telemetry.lock().samples().to_vec()
    }

    /// Where `close` writes the telemetry table
    #[must_use]
    pub fn telemetry_path(&self) -> &Path {
        &self.telemetry_path
    }

    /// Write the telemetry table to `destination`, replacing its contents
    ///
    /// An empty log writes the two header lines only.
    ///
    /// # Errors
    ///
    /// Returns `BridgeError::Io` if the file cannot be written.
    pub async fn write_telemetry_data(
        &self,
        destination: impl AsRef<Path>,
    ) -> Result<(), BridgeError> {
        let table = {
            let log = self.shared.telemetry.lock();
            if log.is_empty() {
                tracing::debug!("No telemetry recorded, writing header only");
            }
            log.render_now()
        };
        write_table(destination.as_ref(), &table).await
    }

    /// Whether the transport is still connected
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.shared.handle.is_connected()
    }

    /// Whether `close` has been called
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Detach the handler; later messages are dropped and `close` skips
    /// the `on_close` notification
    pub fn detach_handler(&self) -> Option<Box<dyn MessageHandler>> {
        self.shared.handler.lock().take()
    }

    /// Stop dispatching, flush telemetry, stop the transport and notify
    /// the handler
    ///
    /// Only the first call has any effect. Every step runs even if an
    /// earlier one fails.
    ///
    /// # Errors
    ///
    /// Returns the first error encountered, after all steps have run.
    pub async fn close(&self) -> Result<(), BridgeError> {
        if self.closed.swap(true, Ordering::SeqCst) {
            tracing::debug!("Bridge already closed");
            return Ok(());
        }

        // Nothing may be appended once the table is rendered
        let dispatcher = self.dispatcher.lock().take();
        if let Some(dispatcher) = dispatcher {
            dispatcher.abort();
            let _ = dispatcher.await;
        }

        let mut first_error = None;

        if let Err(e) = self.write_telemetry_data(&self.telemetry_path).await {
            tracing::warn!(error = %e, "Failed to write telemetry during close");
            first_error = Some(e);
        }

        if let Err(e) = self.shared.handle.transport.stop().await {
            tracing::warn!(error = %e, "Failed to stop transport during close");
            first_error.get_or_insert(BridgeError::from(e));
        }

        let handler = self.shared.handler.lock().take();
        if let Some(mut handler) = handler {
            handler.on_close();
        }

        tracing::info!(
            samples = self.shared.telemetry.lock().len(),
            "Bridge closed"
        );

        first_error.map_or(Ok(()), Err)
    }
}

impl Drop for MessageBridge {
    fn drop(&mut self) {
        if let Some(dispatcher) = self.dispatcher.get_mut().take() {
            dispatcher.abort();
        }

        if !*self.closed.get_mut() {
            tracing::warn!(
                path = %self.telemetry_path.display(),
                "Bridge dropped without close, telemetry not written"
            );
        }
    }
}

/// Inbound channel → handler
async fn dispatch_loop(shared: Arc<BridgeShared>, mut inbound: InboundReceiver) {
    while let Some(message) = inbound.recv().await {
        if let Err(e) = shared.dispatch(message) {
            tracing::warn!(error = %e, "Failed to handle inbound message");
        }
    }

    tracing::debug!("Inbound channel closed, dispatch stopped");
}
