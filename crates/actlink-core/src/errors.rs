//! Error types for decoding, transports, and the IPC registry.
//!
//! None of these cross the client boundary. The connection state machine turns
//! every [`TransportError`] into `ConnectionFailed` plus its display text, and
//! the event pipeline logs and drops every [`DecodeError`].

use thiserror::Error;

/// A wire payload could not be turned into a `CombatEvent`.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// Payload was not valid JSON or did not fit the event schema.
    #[error("invalid combat event JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// Payload was valid JSON but not an object.
    #[error("combat event must be a JSON object, got {kind}")]
    NotAnObject {
        /// JSON kind that was received (e.g. "array").
        kind: &'static str,
    },

    /// Binary frame was not UTF-8.
    #[error("combat event payload is not UTF-8: {0}")]
    Utf8(#[from] std::str::Utf8Error),
}

/// Errors raised while establishing or tearing down a transport.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Opening the connection failed.
    #[error("failed to connect to {address}: {reason}")]
    Connect {
        /// Endpoint that was dialed.
        address: String,
        /// Why it failed.
        reason: String,
    },

    /// Sending the subscribe request failed.
    #[error("failed to subscribe: {0}")]
    Subscribe(String),

    /// The remote side answered a handshake step with `false`.
    #[error("tracker rejected {step}")]
    Rejected {
        /// Handshake step that was refused.
        step: &'static str,
    },

    /// An IPC call failed.
    #[error(transparent)]
    Ipc(#[from] IpcError),

    /// Socket-level failure.
    #[error("transport I/O failed: {0}")]
    Io(String),

    /// The operation requires an established connection.
    #[error("transport is not connected")]
    NotConnected,
}

/// Errors from the inter-process call registry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IpcError {
    /// Nobody has registered the endpoint.
    #[error("IPC endpoint '{endpoint}' is not registered")]
    EndpointNotFound {
        /// Endpoint name that was invoked.
        endpoint: String,
    },

    /// The endpoint's handler returned an error.
    #[error("IPC endpoint '{endpoint}' failed: {reason}")]
    HandlerFailed {
        /// Endpoint name that was invoked.
        endpoint: String,
        /// Handler-provided reason.
        reason: String,
    },

    /// The endpoint replied with a value of the wrong shape.
    #[error("IPC endpoint '{endpoint}' returned {found}, expected {expected}")]
    UnexpectedReply {
        /// Endpoint name that was invoked.
        endpoint: String,
        /// Expected reply shape.
        expected: &'static str,
        /// Reply that was received.
        found: String,
    },
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn decode_json_error_display() {
        let json_err = serde_json::from_str::<serde_json::Value>("{oops").unwrap_err();
        let err = DecodeError::from(json_err);
        assert!(err.to_string().starts_with("invalid combat event JSON"));
    }

    #[test]
    fn decode_not_an_object_display() {
        let err = DecodeError::NotAnObject { kind: "array" };
        assert_eq!(err.to_string(), "combat event must be a JSON object, got array");
    }

    #[test]
    fn connect_error_display() {
        let err = TransportError::Connect {
            address: "ws://127.0.0.1:1/ws".into(),
            reason: "connection refused".into(),
        };
        assert_eq!(
            err.to_string(),
            "failed to connect to ws://127.0.0.1:1/ws: connection refused"
        );
    }

    #[test]
    fn rejected_display() {
        let err = TransportError::Rejected {
            step: "liveness check",
        };
        assert_eq!(err.to_string(), "tracker rejected liveness check");
    }

    #[test]
    fn ipc_error_is_transparent() {
        let err: TransportError = IpcError::EndpointNotFound {
            endpoint: "IINACT.Server.Listening".into(),
        }
        .into();
        assert_matches!(err, TransportError::Ipc(IpcError::EndpointNotFound { .. }));
        assert_eq!(
            err.to_string(),
            "IPC endpoint 'IINACT.Server.Listening' is not registered"
        );
    }

    #[test]
    fn unexpected_reply_display() {
        let err = IpcError::UnexpectedReply {
            endpoint: "IINACT.CreateSubscriber".into(),
            expected: "boolean",
            found: "\"yes\"".into(),
        };
        assert!(err.to_string().contains("expected boolean"));
    }
}
