//! Protocol constants shared by both transports.

/// Subscribe payload sent once after the stream connects, and passed as the
/// filter argument in the callback handshake.
pub const SUBSCRIBE_MESSAGE: &str = r#"{"call":"subscribe","events":["CombatData"]}"#;

/// [`SUBSCRIBE_MESSAGE`] as a JSON value, for IPC calls that take objects.
pub fn subscribe_payload() -> serde_json::Value {
    serde_json::json!({"call": "subscribe", "events": ["CombatData"]})
}

/// Default tracker WebSocket endpoint.
pub const DEFAULT_SOCKET_ADDRESS: &str = "ws://127.0.0.1:10501/ws";

/// Default name this client registers its push callback under.
pub const DEFAULT_SUBSCRIBER_NAME: &str = "ActLink.SubscriptionReceiver";

/// Default number of completed encounters kept in history.
pub const DEFAULT_HISTORY_SIZE: usize = 15;

/// Liveness check. Zero arguments, returns a boolean.
pub const IPC_LISTENING: &str = "IINACT.Server.Listening";

/// Creates a subscription that pushes to the named endpoint. Returns a boolean.
pub const IPC_CREATE_SUBSCRIBER: &str = "IINACT.CreateSubscriber";

/// Removes a subscription by name.
pub const IPC_UNSUBSCRIBE: &str = "IINACT.Unsubscribe";

/// Prefix of the per-subscriber filter-update endpoint.
pub const IPC_PROVIDER_PREFIX: &str = "IINACT.IpcProvider.";

/// Filter-update endpoint for a given subscriber name.
pub fn provider_endpoint(subscriber: &str) -> String {
    format!("{IPC_PROVIDER_PREFIX}{subscriber}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subscribe_message_is_valid_json() {
        let v: serde_json::Value = serde_json::from_str(SUBSCRIBE_MESSAGE).unwrap();
        assert_eq!(v["call"], "subscribe");
        assert_eq!(v["events"], serde_json::json!(["CombatData"]));
    }

    #[test]
    fn subscribe_payload_matches_text() {
        let v: serde_json::Value = serde_json::from_str(SUBSCRIBE_MESSAGE).unwrap();
        assert_eq!(subscribe_payload(), v);
    }

    #[test]
    fn provider_endpoint_is_namespaced() {
        assert_eq!(
            provider_endpoint("ActLink.SubscriptionReceiver"),
            "IINACT.IpcProvider.ActLink.SubscriptionReceiver"
        );
    }

    #[test]
    fn default_address_is_websocket() {
        assert!(DEFAULT_SOCKET_ADDRESS.starts_with("ws://"));
    }
}
