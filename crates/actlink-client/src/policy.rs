//! Per-tick policies driven by the host loop.
//!
//! Neither policy owns a timer. The host calls `tick` once per frame and the
//! policy compares the tick time with what it recorded last.

use std::time::Duration;

use actlink_core::ConnectionState;
use actlink_settings::TrackerSettings;
use metrics::counter;
use tokio::time::Instant;
use tracing::info;

use crate::client::TrackerClient;
use crate::metrics::RECONNECT_ATTEMPTS_TOTAL;

/// Retries the connection after it has been down for longer than the delay.
///
/// While the connection is healthy the timer is re-armed every tick, so the
/// delay measures time since the last healthy tick, not time since failure.
#[derive(Clone, Debug)]
pub struct ReconnectPolicy {
    enabled: bool,
    delay: Duration,
    last_attempt: Option<Instant>,
}

impl ReconnectPolicy {
    /// Policy using `autoReconnect` and `reconnectDelaySecs`.
    pub fn new(settings: &TrackerSettings) -> Self {
        Self {
            enabled: settings.auto_reconnect,
            delay: Duration::from_secs(settings.reconnect_delay_secs),
            last_attempt: None,
        }
    }

    /// Whether a retry is due at `now`. Updates the recorded time.
    pub fn decide(&mut self, state: ConnectionState, now: Instant) -> bool {
        let Some(last) = self.last_attempt else {
            self.last_attempt = Some(now);
            return false;
        };
        if !state.is_incomplete_or_failed() {
            self.last_attempt = Some(now);
            return false;
        }
        if self.enabled && now.saturating_duration_since(last) > self.delay {
            self.last_attempt = Some(now);
            return true;
        }
        false
    }

    /// Run one tick against `client`. Returns whether a retry was issued.
    pub async fn tick(&mut self, client: &TrackerClient) -> bool {
        if !self.decide(client.state(), Instant::now()) {
            return false;
        }
        counter!(RECONNECT_ATTEMPTS_TOTAL).increment(1);
        info!(state = %client.state(), "retrying tracker connection");
        client.retry_connection().await;
        true
    }
}

/// Ends the encounter once the player has been out of combat for the delay.
#[derive(Clone, Debug)]
pub struct AutoEndPolicy {
    enabled: bool,
    delay: Duration,
    last_combat: Option<Instant>,
}

impl AutoEndPolicy {
    /// Policy using `autoEnd` and `autoEndDelaySecs`.
    pub fn new(settings: &TrackerSettings) -> Self {
        Self {
            enabled: settings.auto_end,
            delay: Duration::from_secs(settings.auto_end_delay_secs),
            last_combat: None,
        }
    }

    /// Whether the encounter should be ended at `now`.
    pub fn decide(&mut self, ready: bool, in_combat: bool, now: Instant) -> bool {
        if !ready {
            return false;
        }
        if self.enabled && in_combat {
            self.last_combat = Some(now);
            return false;
        }
        match self.last_combat {
            Some(last) if now.saturating_duration_since(last) > self.delay => {
                self.last_combat = None;
                true
            }
            _ => false,
        }
    }

    /// Run one tick against `client`. Returns whether the encounter was ended.
    pub fn tick(&mut self, client: &TrackerClient) -> bool {
        if !self.decide(client.is_ready(), client.in_combat(), Instant::now()) {
            return false;
        }
        info!("combat over, ending encounter");
        client.end_encounter();
        true
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
