//! Streaming merge/dedup of decoded snapshots into an [`EncounterHistory`].
//!
//! Both transports funnel through [`merge_event`]. The rules, in order:
//!
//! 1. Drop the snapshot unless it has an encounter, at least one combatant,
//!    and is either ended or arrives while the host reports combat. An active
//!    snapshot outside combat is a stale echo from the tracker.
//! 2. Drop it if the retained snapshot has the same active flag and the same
//!    encounter duration. Nothing changed.
//! 3. Otherwise stamp it, append it to `past` if it is ended, and make it `last`.
//!
//! Two consecutive ended snapshots with equal durations are therefore
//! recorded once.

use std::sync::Arc;

use actlink_core::CombatEvent;
use chrono::{DateTime, Utc};

use crate::history::EncounterHistory;

/// Why a snapshot was dropped before the dedup check.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RejectReason {
    /// The payload was empty.
    Empty,
    /// No encounter section.
    NoEncounter,
    /// Encounter present but no combatants.
    NoCombatants,
    /// Active snapshot while the host reports no combat.
    OutOfCombat,
}

impl RejectReason {
    /// Metric label.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Empty => "empty",
            Self::NoEncounter => "no_encounter",
            Self::NoCombatants => "no_combatants",
            Self::OutOfCombat => "out_of_combat",
        }
    }
}

/// Result of merging one snapshot.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MergeOutcome {
    /// Dropped as noise.
    Rejected(RejectReason),
    /// Same active flag and duration as the retained snapshot.
    Duplicate,
    /// Accepted as the new `last`.
    Updated,
    /// Accepted as the new `last` and appended to `past`.
    Recorded,
}

impl MergeOutcome {
    /// `Updated` or `Recorded`.
    pub fn is_accepted(self) -> bool {
        matches!(self, Self::Updated | Self::Recorded)
    }
}

/// Merge `incoming` into `history`.
///
/// `in_combat` is only consulted for active snapshots.
pub fn merge_event(
    history: &mut EncounterHistory,
    mut incoming: CombatEvent,
    in_combat: impl FnOnce() -> bool,
    now: DateTime<Utc>,
) -> MergeOutcome {
    let Some(encounter) = incoming.encounter.as_ref() else {
        return MergeOutcome::Rejected(RejectReason::NoEncounter);
    };
    if incoming.combatants.is_empty() {
        return MergeOutcome::Rejected(RejectReason::NoCombatants);
    }
    if incoming.active && !in_combat() {
        return MergeOutcome::Rejected(RejectReason::OutOfCombat);
    }

    let duplicate = history.last().is_some_and(|previous| {
        previous.active == incoming.active
            && previous
                .encounter
                .as_ref()
                .is_some_and(|p| p.duration == encounter.duration)
    });
    if duplicate {
        return MergeOutcome::Duplicate;
    }

    incoming.timestamp = Some(now);
    let ended = !incoming.active;
    let event = Arc::new(incoming);
    if ended {
        history.push_past(Arc::clone(&event));
    }
    history.set_last(event);

    if ended {
        MergeOutcome::Recorded
    } else {
        MergeOutcome::Updated
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
