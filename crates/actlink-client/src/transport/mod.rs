//! Transport bindings to the tracker.
//!
//! A [`Transport`] is built fresh for every connection generation and owned by
//! that generation's task. The state machine drives it in a fixed order:
//! `connect → subscribe → receive → unsubscribe → close`, stopping early on the
//! first error. Transports never touch connection state except to read it in
//! their receive loop.

mod callback;
mod stream;

pub use callback::CallbackTransport;
pub use stream::StreamTransport;

use actlink_core::{TransportError, TransportKind};
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::pipeline::EventPipeline;
use crate::status::StatusCell;

/// What a receive activity needs from its client.
#[derive(Clone, Copy)]
pub struct ReceiveContext<'a> {
    /// Where decoded events go.
    pub pipeline: &'a EventPipeline,
    /// Connection status, read to stop once the client leaves the receiving states.
    pub status: &'a StatusCell,
    /// This generation's cancellation signal.
    pub cancel: &'a CancellationToken,
}

/// Why a receive activity returned.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ReceiveExit {
    /// The generation was cancelled by shutdown.
    Cancelled,
    /// The peer closed the connection, or the client left the receiving states.
    Closed,
    /// The connection failed mid-stream.
    Failed(String),
}

/// One binding to the tracker.
#[async_trait]
pub trait Transport: Send {
    /// Which binding this is.
    fn kind(&self) -> TransportKind;

    /// Open the connection (stream) or check the registry (callback).
    async fn connect(&mut self) -> Result<(), TransportError>;

    /// Request `CombatData` events.
    async fn subscribe(&mut self) -> Result<(), TransportError>;

    /// Deliver events to `ctx.pipeline` until cancelled or disconnected.
    async fn receive(&mut self, ctx: ReceiveContext<'_>) -> ReceiveExit;

    /// Remove the remote subscription. Errors are swallowed.
    async fn unsubscribe(&mut self) {}

    /// Release the connection. Errors are swallowed.
    async fn close(&mut self);
}

/// Builds a fresh transport for each generation.
pub type TransportFactory = std::sync::Arc<dyn Fn() -> Box<dyn Transport> + Send + Sync>;
