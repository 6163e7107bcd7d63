//! Connection lifecycle states and transport selection.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Where a tracker client is in its connection lifecycle.
///
/// Happy path: `NotConnected → Connecting → Connected → Subscribing → Subscribed`.
/// Any failed setup step lands in `ConnectionFailed`, which only a reset leaves.
/// Shutdown runs `Unsubscribing → ShuttingDown → NotConnected`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConnectionState {
    /// Idle. The only state `start()` accepts.
    #[default]
    NotConnected,
    /// Opening the connection or probing the IPC registry.
    Connecting,
    /// A setup step failed. Terminal until reset.
    ConnectionFailed,
    /// Connection open, subscription not yet requested.
    Connected,
    /// Subscription request in flight.
    Subscribing,
    /// Events are flowing.
    Subscribed,
    /// Removing the remote subscription (callback transport only).
    Unsubscribing,
    /// Closing the connection and joining the receive activity.
    ShuttingDown,
}

impl ConnectionState {
    /// Human-readable label for status displays.
    pub fn label(self) -> &'static str {
        match self {
            Self::NotConnected => "Not Connected",
            Self::Connecting => "Connecting",
            Self::ConnectionFailed => "Connection Failed",
            Self::Connected => "Connected",
            Self::Subscribing => "Subscribing",
            Self::Subscribed => "Subscribed",
            Self::Unsubscribing => "Unsubscribing",
            Self::ShuttingDown => "Shutting Down",
        }
    }

    /// Setup progress as an `n/4` step label, if this state is a setup step.
    pub fn progress(self) -> Option<&'static str> {
        match self {
            Self::ConnectionFailed => Some("0/4"),
            Self::Connecting => Some("1/4"),
            Self::Connected => Some("2/4"),
            Self::Subscribing => Some("3/4"),
            Self::Subscribed => Some("4/4"),
            Self::NotConnected | Self::Unsubscribing | Self::ShuttingDown => None,
        }
    }

    /// `NotConnected` or `ConnectionFailed`: the states reconnect acts on.
    pub fn is_incomplete_or_failed(self) -> bool {
        matches!(self, Self::NotConnected | Self::ConnectionFailed)
    }

    /// States in which the receive activity keeps processing events.
    pub fn is_receiving(self) -> bool {
        matches!(self, Self::Connected | Self::Subscribing | Self::Subscribed)
    }

    /// States reached while tearing down.
    pub fn is_shutting_down(self) -> bool {
        matches!(self, Self::Unsubscribing | Self::ShuttingDown)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Which transport binding a client uses.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    /// Persistent WebSocket with a subscribe-then-receive loop.
    #[default]
    Stream,
    /// In-process IPC handshake with push-callback delivery.
    Callback,
}

impl TransportKind {
    /// Lowercase name, matching the settings file and CLI spelling.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Stream => "stream",
            Self::Callback => "callback",
        }
    }
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransportKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "stream" | "websocket" | "ws" => Ok(Self::Stream),
            "callback" | "ipc" | "iinact" => Ok(Self::Callback),
            other => Err(format!("unknown transport '{other}' (expected stream or callback)")),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_not_connected() {
        assert_eq!(ConnectionState::default(), ConnectionState::NotConnected);
    }

    #[test]
    fn progress_steps() {
        assert_eq!(ConnectionState::ConnectionFailed.progress(), Some("0/4"));
        assert_eq!(ConnectionState::Connecting.progress(), Some("1/4"));
        assert_eq!(ConnectionState::Connected.progress(), Some("2/4"));
        assert_eq!(ConnectionState::Subscribing.progress(), Some("3/4"));
        assert_eq!(ConnectionState::Subscribed.progress(), Some("4/4"));
        assert_eq!(ConnectionState::NotConnected.progress(), None);
        assert_eq!(ConnectionState::ShuttingDown.progress(), None);
    }

    #[test]
    fn incomplete_or_failed() {
        assert!(ConnectionState::NotConnected.is_incomplete_or_failed());
        assert!(ConnectionState::ConnectionFailed.is_incomplete_or_failed());
        assert!(!ConnectionState::Subscribed.is_incomplete_or_failed());
        assert!(!ConnectionState::Connecting.is_incomplete_or_failed());
        assert!(!ConnectionState::ShuttingDown.is_incomplete_or_failed());
    }

    #[test]
    fn receiving_states() {
        assert!(ConnectionState::Connected.is_receiving());
        assert!(ConnectionState::Subscribed.is_receiving());
        assert!(!ConnectionState::ShuttingDown.is_receiving());
        assert!(!ConnectionState::NotConnected.is_receiving());
    }

    #[test]
    fn display_uses_label() {
        assert_eq!(ConnectionState::ConnectionFailed.to_string(), "Connection Failed");
    }

    #[test]
    fn transport_kind_parse() {
        assert_eq!("stream".parse::<TransportKind>(), Ok(TransportKind::Stream));
        assert_eq!("Callback".parse::<TransportKind>(), Ok(TransportKind::Callback));
        assert!("carrier-pigeon".parse::<TransportKind>().is_err());
    }

    #[test]
    fn transport_kind_serde_lowercase() {
        let json = serde_json::to_string(&TransportKind::Callback).unwrap();
        assert_eq!(json, "\"callback\"");
        let back: TransportKind = serde_json::from_str("\"stream\"").unwrap();
        assert_eq!(back, TransportKind::Stream);
    }
}
