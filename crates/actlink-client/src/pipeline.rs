//! Decode → merge → history, behind one lock.
//!
//! The receive activity writes and the consumer reads through the same
//! [`EventPipeline`]. A `parking_lot::Mutex` guards `last` and `past`
//! together, and reads hand out `Arc` snapshots so the lock is never held
//! by the consumer.

use std::sync::Arc;

use actlink_core::{CombatEvent, DecodeError};
use chrono::Utc;
use metrics::counter;
use parking_lot::Mutex;
use serde_json::Value;
use tracing::{debug, trace};

use crate::decode::{decode_bytes, decode_text, decode_value};
use crate::history::EncounterHistory;
use crate::host::GameState;
use crate::merge::{MergeOutcome, RejectReason, merge_event};
use crate::metrics::{
    DECODE_FAILURES_TOTAL, EVENTS_ACCEPTED_TOTAL, EVENTS_RECEIVED_TOTAL, EVENTS_REJECTED_TOTAL,
};

/// Shared event sink for one client.
pub struct EventPipeline {
    history: Mutex<EncounterHistory>,
    game: Arc<dyn GameState>,
}

impl EventPipeline {
    /// Pipeline keeping `capacity` completed encounters, consulting `game`
    /// for the combat flag.
    pub fn new(capacity: usize, game: Arc<dyn GameState>) -> Self {
        Self {
            history: Mutex::new(EncounterHistory::new(capacity)),
            game,
        }
    }

    /// Ingest a text frame.
    pub fn ingest_text(&self, text: &str) -> Result<MergeOutcome, DecodeError> {
        counter!(EVENTS_RECEIVED_TOTAL, "source" => "text").increment(1);
        trace!(len = text.len(), "inbound text frame");
        if text.trim().is_empty() {
            return Ok(self.record(MergeOutcome::Rejected(RejectReason::Empty)));
        }
        self.decoded(decode_text(text))
    }

    /// Ingest a binary frame.
    pub fn ingest_bytes(&self, bytes: &[u8]) -> Result<MergeOutcome, DecodeError> {
        counter!(EVENTS_RECEIVED_TOTAL, "source" => "binary").increment(1);
        trace!(len = bytes.len(), "inbound binary frame");
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(self.record(MergeOutcome::Rejected(RejectReason::Empty)));
        }
        self.decoded(decode_bytes(bytes))
    }

    /// Ingest a JSON value pushed over IPC.
    pub fn ingest_value(&self, value: Value) -> Result<MergeOutcome, DecodeError> {
        counter!(EVENTS_RECEIVED_TOTAL, "source" => "ipc").increment(1);
        if value.is_null() {
            return Ok(self.record(MergeOutcome::Rejected(RejectReason::Empty)));
        }
        self.decoded(decode_value(value))
    }

    /// Merge an already-decoded event.
    pub fn ingest(&self, event: CombatEvent) -> MergeOutcome {
        let outcome = {
            let mut history = self.history.lock();
            merge_event(&mut history, event, || self.game.is_in_combat(), Utc::now())
        };
        self.record(outcome)
    }

    fn decoded(
        &self,
        result: Result<CombatEvent, DecodeError>,
    ) -> Result<MergeOutcome, DecodeError> {
        match result {
            Ok(event) => Ok(self.ingest(event)),
            Err(error) => {
                counter!(DECODE_FAILURES_TOTAL).increment(1);
                debug!(%error, "dropping undecodable payload");
                Err(error)
            }
        }
    }

    fn record(&self, outcome: MergeOutcome) -> MergeOutcome {
        match outcome {
            MergeOutcome::Rejected(reason) => {
                counter!(EVENTS_REJECTED_TOTAL, "reason" => reason.as_str()).increment(1);
            }
            MergeOutcome::Duplicate => {
                counter!(EVENTS_REJECTED_TOTAL, "reason" => "duplicate").increment(1);
            }
            MergeOutcome::Updated => {
                counter!(EVENTS_ACCEPTED_TOTAL, "outcome" => "updated").increment(1);
            }
            MergeOutcome::Recorded => {
                counter!(EVENTS_ACCEPTED_TOTAL, "outcome" => "recorded").increment(1);
                debug!(past = self.history.lock().past_len(), "encounter recorded");
            }
        }
        outcome
    }

    /// Most recently accepted snapshot.
    pub fn last_event(&self) -> Option<Arc<CombatEvent>> {
        self.history.lock().last().cloned()
    }

    /// Completed encounters, oldest first.
    pub fn past_events(&self) -> Vec<Arc<CombatEvent>> {
        self.history.lock().past().cloned().collect()
    }

    /// Past encounter at `index`, or `last` when `index` is `None` or out of range.
    pub fn event(&self, index: Option<usize>) -> Option<Arc<CombatEvent>> {
        self.history.lock().event(index).cloned()
    }

    /// Copy of the whole history.
    pub fn snapshot(&self) -> EncounterHistory {
        self.history.lock().clone()
    }

    /// Forget the current snapshot.
    pub fn clear_last(&self) {
        self.history.lock().clear_last();
    }

    /// Forget everything.
    pub fn clear(&self) {
        self.history.lock().clear();
    }
}

impl std::fmt::Debug for EventPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let h = self.history.lock();
        f.debug_struct("EventPipeline")
            .field("has_last", &h.last().is_some())
            .field("past", &h.past_len())
            .field("capacity", &h.capacity())
            .finish()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
