//! Inter-process call registry used by the callback transport.
//!
//! Endpoints are named functions taking and returning JSON. The tracker
//! exposes its handshake endpoints here and the client registers one endpoint
//! of its own to receive pushed events.

use std::collections::HashMap;
use std::sync::Arc;

use actlink_core::IpcError;
use parking_lot::RwLock;
use serde_json::Value;

/// Endpoint implementation.
pub type IpcHandler = Arc<dyn Fn(Value) -> Result<Value, IpcError> + Send + Sync>;

/// Named-endpoint registry.
///
/// Calls are synchronous: the callback transport never suspends.
pub trait IpcRegistry: Send + Sync {
    /// Call an endpoint and return its reply.
    fn invoke(&self, endpoint: &str, arg: Value) -> Result<Value, IpcError>;

    /// Call an endpoint and discard its reply.
    fn invoke_action(&self, endpoint: &str, arg: Value) -> Result<(), IpcError> {
        self.invoke(endpoint, arg).map(|_| ())
    }

    /// Register (or replace) an endpoint.
    fn register(&self, endpoint: &str, handler: IpcHandler);

    /// Remove an endpoint. Returns whether it existed.
    fn unregister(&self, endpoint: &str) -> bool;
}

/// Call an endpoint that must answer with a boolean.
pub fn invoke_bool(
    registry: &dyn IpcRegistry,
    endpoint: &str,
    arg: Value,
) -> Result<bool, IpcError> {
    match registry.invoke(endpoint, arg)? {
        Value::Bool(b) => Ok(b),
        other => Err(IpcError::UnexpectedReply {
            endpoint: endpoint.to_string(),
            expected: "boolean",
            found: other.to_string(),
        }),
    }
}

/// In-process registry.
#[derive(Default)]
pub struct LocalIpcRegistry {
    endpoints: RwLock<HashMap<String, IpcHandler>>,
}

impl LocalIpcRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `endpoint` is registered.
    pub fn contains(&self, endpoint: &str) -> bool {
        self.endpoints.read().contains_key(endpoint)
    }

    /// Number of registered endpoints.
    pub fn len(&self) -> usize {
        self.endpoints.read().len()
    }

    /// No endpoints registered.
    pub fn is_empty(&self) -> bool {
        self.endpoints.read().is_empty()
    }
}

impl IpcRegistry for LocalIpcRegistry {
    fn invoke(&self, endpoint: &str, arg: Value) -> Result<Value, IpcError> {
        // Clone out so handlers may call back into the registry.
        let handler = self
            .endpoints
            .read()
            .get(endpoint)
            .cloned()
            .ok_or_else(|| IpcError::EndpointNotFound {
                endpoint: endpoint.to_string(),
            })?;
        handler(arg)
    }

    fn register(&self, endpoint: &str, handler: IpcHandler) {
        let _ = self.endpoints.write().insert(endpoint.to_string(), handler);
    }

    fn unregister(&self, endpoint: &str) -> bool {
        self.endpoints.write().remove(endpoint).is_some()
    }
}

impl std::fmt::Debug for LocalIpcRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<String> = self.endpoints.read().keys().cloned().collect();
        names.sort();
        f.debug_struct("LocalIpcRegistry")
            .field("endpoints", &names)
            .finish()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
