//! Per-tick log output: status transitions and newly recorded encounters.

use std::sync::Arc;

use actlink_client::{ConnectionStatus, TrackerClient};
use actlink_core::CombatEvent;
use tracing::{info, warn};

/// Remembers what was last logged so each tick only reports changes.
#[derive(Debug, Default)]
pub struct Reporter {
    status: Option<ConnectionStatus>,
    newest: Option<Arc<CombatEvent>>,
}

impl Reporter {
    /// Log whatever changed on `client` since the previous call.
    pub fn observe(&mut self, client: &TrackerClient) {
        let status = client.status();
        if self.status.as_ref() != Some(&status) {
            log_status(&status);
            self.status = Some(status);
        }

        let past = client.past_events();
        for event in self.unseen(&past) {
            log_encounter(event);
        }
    }

    /// Encounters in `past` recorded after the newest one already reported.
    fn unseen<'a>(&mut self, past: &'a [Arc<CombatEvent>]) -> &'a [Arc<CombatEvent>] {
        let start = self
            .newest
            .as_ref()
            .and_then(|seen| past.iter().rposition(|e| Arc::ptr_eq(e, seen)))
            .map_or(0, |i| i + 1);
        if let Some(last) = past.last() {
            self.newest = Some(Arc::clone(last));
        }
        &past[start..]
    }
}

fn log_status(status: &ConnectionStatus) {
    let progress = status.state.progress().unwrap_or("-");
    match &status.last_error {
        Some(error) if status.state.is_incomplete_or_failed() => {
            warn!(state = %status.state, progress, %error, "tracker status");
        }
        _ => info!(state = %status.state, progress, "tracker status"),
    }
}

fn log_encounter(event: &CombatEvent) {
    let duration_secs = event
        .encounter
        .as_ref()
        .and_then(actlink_core::Encounter::duration_secs)
        .map(|d| d.as_secs());
    info!(
        title = event.title().unwrap_or("(untitled)"),
        duration = event.duration().unwrap_or(""),
        duration_secs,
        combatants = event.combatants.len(),
        "encounter recorded"
    );
}
