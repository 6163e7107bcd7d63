//! IPC transport: three-step handshake, then events arrive by push callback.
//!
//! 1. Liveness check (`IINACT.Server.Listening`).
//! 2. Create a subscription pushing to our own endpoint (`IINACT.CreateSubscriber`).
//! 3. Send the subscribe filter to `IINACT.IpcProvider.<name>`. This call has
//!    no acknowledgement; success means only that it did not fail.
//!
//! The push endpoint itself is registered by the owning client for its whole
//! lifetime, not per generation, so this transport only drives the handshake.
//!
//! Teardown always asks the tracker to unsubscribe, even when the handshake
//! failed part-way: a `CreateSubscriber` call that errored may still have
//! created the subscription on the tracker's side.

use std::sync::Arc;

use actlink_core::constants::{
    IPC_CREATE_SUBSCRIBER, IPC_LISTENING, IPC_UNSUBSCRIBE, provider_endpoint, subscribe_payload,
};
use actlink_core::{TransportError, TransportKind};
use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, info};

use super::{ReceiveContext, ReceiveExit, Transport};
use crate::ipc::{IpcRegistry, invoke_bool};

/// Handshake driver against an [`IpcRegistry`].
pub struct CallbackTransport {
    registry: Arc<dyn IpcRegistry>,
    subscriber: String,
}

impl CallbackTransport {
    /// Transport that subscribes `subscriber` through `registry`.
    pub fn new(registry: Arc<dyn IpcRegistry>, subscriber: impl Into<String>) -> Self {
        Self {
            registry,
            subscriber: subscriber.into(),
        }
    }

    /// Endpoint name the tracker pushes to.
    pub fn subscriber(&self) -> &str {
        &self.subscriber
    }
}

#[async_trait]
impl Transport for CallbackTransport {
    fn kind(&self) -> TransportKind {
        TransportKind::Callback
    }

    async fn connect(&mut self) -> Result<(), TransportError> {
        if invoke_bool(self.registry.as_ref(), IPC_LISTENING, Value::Null)? {
            Ok(())
        } else {
            Err(TransportError::Rejected {
                step: "liveness check",
            })
        }
    }

    async fn subscribe(&mut self) -> Result<(), TransportError> {
        let created = invoke_bool(
            self.registry.as_ref(),
            IPC_CREATE_SUBSCRIBER,
            Value::String(self.subscriber.clone()),
        )?;
        if !created {
            return Err(TransportError::Rejected {
                step: "subscription",
            });
        }
        self.registry
            .invoke_action(&provider_endpoint(&self.subscriber), subscribe_payload())?;
        Ok(())
    }

    async fn receive(&mut self, ctx: ReceiveContext<'_>) -> ReceiveExit {
        ctx.cancel.cancelled().await;
        ReceiveExit::Cancelled
    }

    async fn unsubscribe(&mut self) {
        let arg = Value::String(self.subscriber.clone());
        match invoke_bool(self.registry.as_ref(), IPC_UNSUBSCRIBE, arg) {
            Ok(true) => info!(subscriber = %self.subscriber, "unsubscribed from tracker"),
            Ok(false) => info!(subscriber = %self.subscriber, "tracker refused to unsubscribe"),
            Err(e) => debug!(error = %e, subscriber = %self.subscriber, "unsubscribe failed, ignoring"),
        }
    }

    async fn close(&mut self) {}
}

impl std::fmt::Debug for CallbackTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallbackTransport")
            .field("subscriber", &self.subscriber)
            .finish_non_exhaustive()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ipc::LocalIpcRegistry;
    use actlink_core::IpcError;
    use assert_matches::assert_matches;
    use parking_lot::Mutex;

    type Calls = Arc<Mutex<Vec<(String, Value)>>>;

    fn recording(reg: &LocalIpcRegistry, calls: &Calls, endpoint: &str, reply: Value) {
        let calls = Arc::clone(calls);
        let name = endpoint.to_string();
        reg.register(
            endpoint,
            Arc::new(move |arg: Value| {
                calls.lock().push((name.clone(), arg));
                Ok(reply.clone())
            }),
        );
    }

    fn tracker(listening: bool, created: bool) -> (Arc<LocalIpcRegistry>, Calls) {
        let reg = Arc::new(LocalIpcRegistry::new());
        let calls: Calls = Arc::default();
        recording(&reg, &calls, IPC_LISTENING, Value::Bool(listening));
        recording(&reg, &calls, IPC_CREATE_SUBSCRIBER, Value::Bool(created));
        recording(&reg, &calls, IPC_UNSUBSCRIBE, Value::Bool(true));
        recording(&reg, &calls, &provider_endpoint("me"), Value::Null);
        (reg, calls)
    }

    fn endpoints(calls: &Calls) -> Vec<String> {
        calls.lock().iter().map(|(e, _)| e.clone()).collect()
    }

    #[tokio::test]
    async fn handshake_order_and_arguments() {
        let (reg, calls) = tracker(true, true);
        let mut t = CallbackTransport::new(reg, "me");
        t.connect().await.unwrap();
        t.subscribe().await.unwrap();

        assert_eq!(
            endpoints(&calls),
            vec![
                IPC_LISTENING.to_string(),
                IPC_CREATE_SUBSCRIBER.to_string(),
                "IINACT.IpcProvider.me".to_string(),
            ]
        );
        let recorded = calls.lock().clone();
        assert_eq!(recorded[1].1, Value::String("me".into()));
        assert_eq!(recorded[2].1, subscribe_payload());
    }

    #[tokio::test]
    async fn not_listening_is_rejected() {
        let (reg, _) = tracker(false, true);
        let mut t = CallbackTransport::new(reg, "me");
        assert_matches!(
            t.connect().await,
            Err(TransportError::Rejected { step: "liveness check" })
        );
    }

    #[tokio::test]
    async fn missing_tracker_is_ipc_error() {
        let mut t = CallbackTransport::new(Arc::new(LocalIpcRegistry::new()), "me");
        assert_matches!(
            t.connect().await,
            Err(TransportError::Ipc(IpcError::EndpointNotFound { .. }))
        );
    }

    #[tokio::test]
    async fn refused_subscription_is_rejected() {
        let (reg, calls) = tracker(true, false);
        let mut t = CallbackTransport::new(reg, "me");
        t.connect().await.unwrap();
        assert_matches!(
            t.subscribe().await,
            Err(TransportError::Rejected { step: "subscription" })
        );
        t.unsubscribe().await;
        let recorded = calls.lock().clone();
        assert_eq!(
            recorded.last(),
            Some(&(IPC_UNSUBSCRIBE.to_string(), Value::String("me".into())))
        );
    }

    #[tokio::test]
    async fn errored_subscription_still_unsubscribes() {
        let (reg, calls) = tracker(true, true);
        reg.register(
            IPC_CREATE_SUBSCRIBER,
            Arc::new(|_: Value| {
                Err(IpcError::HandlerFailed {
                    endpoint: IPC_CREATE_SUBSCRIBER.to_string(),
                    reason: "timed out".into(),
                })
            }),
        );
        let mut t = CallbackTransport::new(reg, "me");
        t.connect().await.unwrap();
        assert_matches!(
            t.subscribe().await,
            Err(TransportError::Ipc(IpcError::HandlerFailed { .. }))
        );
        t.unsubscribe().await;
        assert!(endpoints(&calls).contains(&IPC_UNSUBSCRIBE.to_string()));
    }

    #[tokio::test]
    async fn unsubscribe_swallows_errors_and_odd_replies() {
        let (reg, calls) = tracker(true, true);
        let mut t = CallbackTransport::new(Arc::clone(&reg) as Arc<dyn IpcRegistry>, "me");
        t.connect().await.unwrap();
        t.subscribe().await.unwrap();

        t.unsubscribe().await;
        t.unsubscribe().await;
        let count = endpoints(&calls)
            .iter()
            .filter(|e| *e == IPC_UNSUBSCRIBE)
            .count();
        assert_eq!(count, 2);

        // Refusal and non-boolean replies are logged, not raised.
        recording(&reg, &calls, IPC_UNSUBSCRIBE, Value::Bool(false));
        t.unsubscribe().await;
        recording(&reg, &calls, IPC_UNSUBSCRIBE, Value::Null);
        t.unsubscribe().await;

        let _ = reg.unregister(IPC_UNSUBSCRIBE);
        t.unsubscribe().await;
        t.close().await;
    }
}
