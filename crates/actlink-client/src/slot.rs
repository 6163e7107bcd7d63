//! Owner of the single current tracker client.
//!
//! Whoever drives the per-tick policies holds a `ClientSlot` and passes it
//! around explicitly. Swapping transports goes through [`ClientSlot::replace`],
//! which disposes the old client before the new one exists, so at most one
//! client ever holds a connection or a push endpoint.

use actlink_settings::TrackerSettings;
use tracing::info;

use crate::client::TrackerClient;
use crate::host::HostServices;

/// Holds at most one [`TrackerClient`].
#[derive(Debug)]
pub struct ClientSlot {
    host: HostServices,
    current: Option<TrackerClient>,
}

impl ClientSlot {
    /// Empty slot. Clients built by it share `host`.
    pub fn new(host: HostServices) -> Self {
        Self {
            host,
            current: None,
        }
    }

    /// Dispose the current client, if any, then install a new one built from
    /// `settings`. The new client is not started.
    pub async fn replace(&mut self, settings: &TrackerSettings) -> &TrackerClient {
        if let Some(old) = self.current.take() {
            info!(transport = %old.kind(), "disposing previous tracker client");
            old.dispose().await;
        }
        let client = TrackerClient::new(settings, self.host.clone());
        info!(transport = %client.kind(), "installed tracker client");
        self.current.insert(client)
    }

    /// The current client.
    pub fn current(&self) -> Option<&TrackerClient> {
        self.current.as_ref()
    }

    /// Dispose and remove the current client.
    pub async fn dispose(&mut self) {
        if let Some(old) = self.current.take() {
            old.dispose().await;
        }
    }
}
