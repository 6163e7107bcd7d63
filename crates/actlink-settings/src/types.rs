//! Settings type definitions.
//!
//! All types use `#[serde(rename_all = "camelCase", default)]` so a partial
//! JSON file fills the rest from [`Default`].

use actlink_core::TransportKind;
use actlink_core::constants::{DEFAULT_HISTORY_SIZE, DEFAULT_SOCKET_ADDRESS, DEFAULT_SUBSCRIBER_NAME};
use serde::{Deserialize, Serialize};

/// Root settings type.
///
/// ```json
/// {
///   "version": "0.1.0",
///   "tracker": { "transport": "callback", "autoReconnect": true },
///   "logging": { "level": "debug" }
/// }
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ActLinkSettings {
    /// Settings schema version.
    pub version: String,
    /// Tracker connection and history behaviour.
    pub tracker: TrackerSettings,
    /// Log output.
    pub logging: LoggingSettings,
}

impl Default for ActLinkSettings {
    fn default() -> Self {
        Self {
            version: "0.1.0".to_string(),
            tracker: TrackerSettings::default(),
            logging: LoggingSettings::default(),
        }
    }
}

impl ActLinkSettings {
    /// Correct unusable values in place, warning about each one.
    ///
    /// Called automatically during loading.
    pub fn validate(&mut self) {
        let t = &mut self.tracker;

        if t.socket_address.trim().is_empty() {
            tracing::warn!("socketAddress is empty, using {DEFAULT_SOCKET_ADDRESS}");
            t.socket_address = DEFAULT_SOCKET_ADDRESS.to_string();
        } else if !(t.socket_address.starts_with("ws://") || t.socket_address.starts_with("wss://")) {
            tracing::warn!(address = %t.socket_address, "socketAddress is not a ws:// or wss:// URL");
        }

        if t.subscriber_name.trim().is_empty() {
            tracing::warn!("subscriberName is empty, using {DEFAULT_SUBSCRIBER_NAME}");
            t.subscriber_name = DEFAULT_SUBSCRIBER_NAME.to_string();
        }

        if t.reconnect_delay_secs == 0 {
            tracing::warn!("reconnectDelaySecs is 0, clamped to 1");
            t.reconnect_delay_secs = 1;
        }
        if t.auto_end_delay_secs == 0 {
            tracing::warn!("autoEndDelaySecs is 0, clamped to 1");
            t.auto_end_delay_secs = 1;
        }
    }
}

/// Tracker connection, history, and per-tick policy settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TrackerSettings {
    /// Which transport binding to use.
    pub transport: TransportKind,
    /// WebSocket endpoint for the stream transport.
    pub socket_address: String,
    /// Endpoint name the callback transport registers for pushed events.
    pub subscriber_name: String,
    /// Number of completed encounters kept in history.
    pub encounter_history_size: usize,
    /// Retry the connection when it is down or failed.
    pub auto_reconnect: bool,
    /// Seconds between reconnect attempts.
    pub reconnect_delay_secs: u64,
    /// Refuse to start while the host reports no logged-in character.
    pub wait_for_character_login: bool,
    /// Also ask the tracker to clear when history is cleared.
    pub clear_act: bool,
    /// End the encounter automatically once combat has stopped.
    pub auto_end: bool,
    /// Seconds out of combat before the encounter is ended.
    pub auto_end_delay_secs: u64,
}

impl Default for TrackerSettings {
    fn default() -> Self {
        Self {
            transport: TransportKind::Stream,
            socket_address: DEFAULT_SOCKET_ADDRESS.to_string(),
            subscriber_name: DEFAULT_SUBSCRIBER_NAME.to_string(),
            encounter_history_size: DEFAULT_HISTORY_SIZE,
            auto_reconnect: false,
            reconnect_delay_secs: 30,
            wait_for_character_login: false,
            clear_act: false,
            auto_end: false,
            auto_end_delay_secs: 3,
        }
    }
}

/// Logging configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingSettings {
    /// Default filter directive when `RUST_LOG` is unset.
    pub level: String,
    /// Emit JSON lines instead of compact text.
    pub json: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
