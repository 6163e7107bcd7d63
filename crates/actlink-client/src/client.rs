//! Connection state machine for one tracker client.
//!
//! Each `start()` spawns one *generation*: a task owning a fresh transport and
//! a fresh cancellation token. The generation connects, subscribes, receives,
//! and tears the transport down before it returns. `shutdown()` cancels the
//! generation and joins it, so a following `start()` can never overlap it.
//!
//! ```text
//! start()                     generation task
//!   NotConnected → Connecting   connect → Connected → Subscribing
//!                               subscribe → Subscribed → receive …
//! shutdown()
//!   → Unsubscribing/ShuttingDown, cancel, join   (task: unsubscribe, close)
//!   → NotConnected
//! ```
//!
//! If the connection drops on its own, the generation performs the same
//! shutdown itself, exactly once.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use actlink_core::{CombatEvent, ConnectionState, IpcError, TransportError, TransportKind};
use actlink_settings::TrackerSettings;
use metrics::counter;
use parking_lot::Mutex;
use serde_json::Value;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use crate::host::HostServices;
use crate::ipc::{IpcHandler, IpcRegistry};
use crate::metrics::{AUTO_SHUTDOWNS_TOTAL, CONNECTION_FAILURES_TOTAL};
use crate::pipeline::EventPipeline;
use crate::status::{ConnectionStatus, StatusCell};
use crate::transport::{
    CallbackTransport, ReceiveContext, ReceiveExit, StreamTransport, Transport, TransportFactory,
};

/// State shared between the client handle and its generation tasks.
struct ClientShared {
    kind: TransportKind,
    pipeline: EventPipeline,
    status: StatusCell,
    auto_shutdowns: AtomicU64,
}

impl ClientShared {
    fn begin_shutdown(&self) -> bool {
        let first = match self.kind {
            TransportKind::Callback => ConnectionState::Unsubscribing,
            TransportKind::Stream => ConnectionState::ShuttingDown,
        };
        self.status.begin_shutdown(first)
    }
}

struct Generation {
    id: u64,
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

struct CallbackRegistration {
    registry: Arc<dyn IpcRegistry>,
    endpoint: String,
}

/// One tracker client: a transport binding, its connection state, and its
/// encounter history.
pub struct TrackerClient {
    shared: Arc<ClientShared>,
    settings: TrackerSettings,
    host: HostServices,
    factory: TransportFactory,
    generation: Mutex<Option<Generation>>,
    next_generation: AtomicU64,
    callback: Option<CallbackRegistration>,
    disposed: AtomicBool,
}

impl TrackerClient {
    /// Client using the transport selected in `settings`.
    ///
    /// The callback transport's push endpoint is registered here and stays
    /// registered until [`dispose`](Self::dispose).
    pub fn new(settings: &TrackerSettings, host: HostServices) -> Self {
        let factory: TransportFactory = match settings.transport {
            TransportKind::Stream => {
                let address = settings.socket_address.clone();
                Arc::new(move || Box::new(StreamTransport::new(address.clone())) as Box<dyn Transport>)
            }
            TransportKind::Callback => {
                let ipc = Arc::clone(&host.ipc);
                let name = settings.subscriber_name.clone();
                Arc::new(move || {
                    Box::new(CallbackTransport::new(Arc::clone(&ipc), name.clone())) as Box<dyn Transport>
                })
            }
        };
        Self::with_transport(settings.transport, settings, host, factory)
    }

    /// Client with a caller-supplied transport factory.
    pub fn with_transport(
        kind: TransportKind,
        settings: &TrackerSettings,
        host: HostServices,
        factory: TransportFactory,
    ) -> Self {
        let shared = Arc::new(ClientShared {
            kind,
            pipeline: EventPipeline::new(settings.encounter_history_size, Arc::clone(&host.game)),
            status: StatusCell::new(),
            auto_shutdowns: AtomicU64::new(0),
        });

        let callback = (kind == TransportKind::Callback).then(|| {
            let endpoint = settings.subscriber_name.clone();
            host.ipc.register(&endpoint, push_handler(Arc::clone(&shared)));
            debug!(%endpoint, "registered push endpoint");
            CallbackRegistration {
                registry: Arc::clone(&host.ipc),
                endpoint,
            }
        });

        Self {
            shared,
            settings: settings.clone(),
            host,
            factory,
            generation: Mutex::new(None),
            next_generation: AtomicU64::new(1),
            callback,
            disposed: AtomicBool::new(false),
        }
    }

    // ── Commands ────────────────────────────────────────────────────────

    /// Begin connecting in the background.
    ///
    /// Logs an error and does nothing unless the client is `NotConnected`.
    /// Requires a Tokio runtime; never blocks on I/O.
    #[instrument(skip(self), fields(transport = %self.shared.kind))]
    pub fn start(&self) {
        if self.disposed.load(Ordering::Acquire) {
            error!("cannot start, client has been disposed");
            return;
        }
        if self.settings.wait_for_character_login && !self.host.game.is_logged_in() {
            error!("cannot start, player is not logged in");
            return;
        }
        let Ok(runtime) = Handle::try_current() else {
            error!("cannot start, no async runtime");
            return;
        };

        let mut slot = self.generation.lock();
        if let Err(state) = self.shared.status.try_begin_start() {
            error!(%state, "cannot start, client needs to be reset");
            return;
        }

        // A previous generation that shut itself down has already finished
        // its work; dropping the handle detaches nothing live.
        drop(slot.take());

        let id = self.next_generation.fetch_add(1, Ordering::Relaxed);
        let cancel = CancellationToken::new();
        let transport = (self.factory)();
        let task = runtime.spawn(run_generation(
            Arc::clone(&self.shared),
            transport,
            cancel.clone(),
            id,
        ));
        debug!(generation = id, "connection generation spawned");
        *slot = Some(Generation { id, cancel, task });
    }

    /// Tear the connection down and wait for the background activity to end.
    ///
    /// Never fails. A second call while already idle has no effect.
    #[instrument(skip(self), fields(transport = %self.shared.kind))]
    pub async fn shutdown(&self) {
        let (generation, owner) = {
            let mut slot = self.generation.lock();
            (slot.take(), self.shared.begin_shutdown())
        };
        if owner {
            self.shared.pipeline.clear_last();
        }

        if let Some(generation) = generation {
            generation.cancel.cancel();
            if let Err(e) = generation.task.await {
                warn!(generation = generation.id, error = %e, "generation task did not finish cleanly");
            }
        }

        if owner {
            self.shared.status.set(ConnectionState::NotConnected);
            info!("tracker client shut down");
        }
    }

    /// [`shutdown`](Self::shutdown), then force `NotConnected`.
    pub async fn reset(&self) {
        self.shutdown().await;
        self.shared.status.set(ConnectionState::NotConnected);
    }

    /// [`reset`](Self::reset), then [`start`](Self::start).
    pub async fn retry_connection(&self) {
        self.reset().await;
        self.start();
    }

    /// Forget all history. Also echoes `clear` when `clearAct` is set.
    pub fn clear(&self) {
        self.shared.pipeline.clear();
        if self.settings.clear_act {
            self.host.chat.echo("clear");
        }
    }

    /// Ask the tracker to end the current encounter.
    pub fn end_encounter(&self) {
        self.host.chat.echo("end");
    }

    /// Unregister the push endpoint, then shut down. Idempotent.
    pub async fn dispose(&self) {
        if self.disposed.swap(true, Ordering::AcqRel) {
            return;
        }
        if let Some(reg) = &self.callback {
            let _ = reg.registry.unregister(&reg.endpoint);
        }
        self.shutdown().await;
    }

    // ── Read surface ────────────────────────────────────────────────────

    /// Which transport this client uses.
    pub fn kind(&self) -> TransportKind {
        self.shared.kind
    }

    /// Current state and last error.
    pub fn status(&self) -> ConnectionStatus {
        self.shared.status.get()
    }

    /// Current state.
    pub fn state(&self) -> ConnectionState {
        self.shared.status.state()
    }

    /// Receiver notified on every status change.
    pub fn subscribe_status(&self) -> watch::Receiver<ConnectionStatus> {
        self.shared.status.subscribe()
    }

    /// Events are flowing.
    pub fn is_ready(&self) -> bool {
        self.state() == ConnectionState::Subscribed
    }

    /// `NotConnected` or `ConnectionFailed`.
    pub fn connection_incomplete_or_failed(&self) -> bool {
        self.state().is_incomplete_or_failed()
    }

    /// Host's combat flag.
    pub fn in_combat(&self) -> bool {
        self.host.game.is_in_combat()
    }

    /// Most recently accepted snapshot.
    pub fn last_event(&self) -> Option<Arc<CombatEvent>> {
        self.shared.pipeline.last_event()
    }

    /// Completed encounters, oldest first.
    pub fn past_events(&self) -> Vec<Arc<CombatEvent>> {
        self.shared.pipeline.past_events()
    }

    /// Past encounter at `index`, or the last snapshot when `index` is `None`
    /// or out of range.
    pub fn event(&self, index: Option<usize>) -> Option<Arc<CombatEvent>> {
        self.shared.pipeline.event(index)
    }

    /// Times the connection dropped and the client shut itself down.
    pub fn auto_shutdowns(&self) -> u64 {
        self.shared.auto_shutdowns.load(Ordering::Relaxed)
    }
}

impl Drop for TrackerClient {
    fn drop(&mut self) {
        if !self.disposed.load(Ordering::Acquire)
            && let Some(reg) = &self.callback
        {
            let _ = reg.registry.unregister(&reg.endpoint);
        }
        if let Some(generation) = self.generation.get_mut().take() {
            generation.cancel.cancel();
        }
    }
}

impl std::fmt::Debug for TrackerClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrackerClient")
            .field("kind", &self.shared.kind)
            .field("status", &self.shared.status.get())
            .field("pipeline", &self.shared.pipeline)
            .finish_non_exhaustive()
    }
}

/// Endpoint the tracker pushes events to. Replies whether the payload was
/// decoded; a `false` reply does not unregister anything.
fn push_handler(shared: Arc<ClientShared>) -> IpcHandler {
    Arc::new(move |payload: Value| -> Result<Value, IpcError> {
        if !shared.status.state().is_receiving() {
            debug!(state = %shared.status.state(), "push outside a live subscription, dropping");
            return Ok(Value::Bool(false));
        }
        Ok(Value::Bool(shared.pipeline.ingest_value(payload).is_ok()))
    })
}

async fn establish(shared: &ClientShared, transport: &mut dyn Transport) -> Result<(), TransportError> {
    transport.connect().await?;
    let _ = shared.status.advance(ConnectionState::Connected);
    info!("connected to tracker");

    let _ = shared.status.advance(ConnectionState::Subscribing);
    transport.subscribe().await?;
    let _ = shared.status.advance(ConnectionState::Subscribed);
    info!("subscribed to combat data");
    Ok(())
}

async fn teardown(shared: &ClientShared, transport: &mut dyn Transport) {
    transport.unsubscribe().await;
    shared.status.set(ConnectionState::ShuttingDown);
    transport.close().await;
}

#[instrument(skip_all, fields(generation = id, transport = %shared.kind))]
async fn run_generation(
    shared: Arc<ClientShared>,
    mut transport: Box<dyn Transport>,
    cancel: CancellationToken,
    id: u64,
) {
    let established = tokio::select! {
        biased;
        () = cancel.cancelled() => None,
        result = establish(&shared, transport.as_mut()) => Some(result),
    };

    match established {
        None => {
            teardown(&shared, transport.as_mut()).await;
            return;
        }
        Some(Err(e)) => {
            counter!(CONNECTION_FAILURES_TOTAL, "transport" => shared.kind.as_str()).increment(1);
            debug!(error = %e, "failed to connect to tracker");
            let _ = shared.status.fail(e.to_string());
            // ConnectionFailed is terminal until reset; hold the transport
            // until then so teardown can release whatever was opened.
            cancel.cancelled().await;
            teardown(&shared, transport.as_mut()).await;
            return;
        }
        Some(Ok(())) => {}
    }

    let ctx = ReceiveContext {
        pipeline: &shared.pipeline,
        status: &shared.status,
        cancel: &cancel,
    };
    let exit = transport.receive(ctx).await;
    debug!(?exit, "receive activity ended");

    if exit == ReceiveExit::Cancelled || !shared.begin_shutdown() {
        teardown(&shared, transport.as_mut()).await;
        return;
    }

    let _ = shared.auto_shutdowns.fetch_add(1, Ordering::Relaxed);
    counter!(AUTO_SHUTDOWNS_TOTAL, "transport" => shared.kind.as_str()).increment(1);
    info!(?exit, "tracker connection lost, shutting down");
    shared.pipeline.clear_last();
    teardown(&shared, transport.as_mut()).await;
    shared.status.set(ConnectionState::NotConnected);
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
