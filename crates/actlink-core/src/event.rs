//! Typed combat events decoded from tracker `CombatData` payloads.
//!
//! The tracker's schema is loose and version-dependent, so decoding is
//! tolerant: only the encounter duration, the active flag, and the
//! combatant map are load-bearing. Everything else is kept as opaque JSON
//! in the `extra` maps and round-trips unchanged.
//!
//! # Wire shape
//!
//! ```json
//! {
//!   "type": "CombatData",
//!   "isActive": "true",
//!   "Encounter": { "title": "Striking Dummy", "duration": "00:42" },
//!   "Combatant": { "YOU": { "name": "YOU", "encdps": "1234.5" } }
//! }
//! ```

use std::time::Duration;

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One snapshot of tracker state.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CombatEvent {
    /// Present once the tracker has identified an encounter.
    #[serde(
        rename = "Encounter",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub encounter: Option<Encounter>,

    /// Participants keyed by name, in wire order.
    #[serde(
        rename = "Combatant",
        default,
        deserialize_with = "deserialize_combatants"
    )]
    pub combatants: IndexMap<String, Combatant>,

    /// Whether the encounter is still running. Absent or unparseable means ended.
    #[serde(rename = "isActive", default, deserialize_with = "deserialize_flag")]
    pub active: bool,

    /// Acceptance time, stamped by the merger. Never read from the wire.
    #[serde(skip)]
    pub timestamp: Option<DateTime<Utc>>,

    /// Unrecognised top-level fields.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl CombatEvent {
    /// Build an event from its load-bearing parts.
    pub fn new(
        encounter: Option<Encounter>,
        combatants: impl IntoIterator<Item = Combatant>,
        active: bool,
    ) -> Self {
        let combatants = combatants
            .into_iter()
            .enumerate()
            .map(|(i, c)| (c.name().map_or_else(|| i.to_string(), str::to_owned), c))
            .collect();
        Self {
            encounter,
            combatants,
            active,
            timestamp: None,
            extra: Map::new(),
        }
    }

    /// An encounter is present and at least one combatant is listed.
    ///
    /// Events failing this are noise and never retained.
    pub fn has_encounter_data(&self) -> bool {
        self.encounter.is_some() && !self.combatants.is_empty()
    }

    /// Raw duration of the encounter, if any.
    pub fn duration(&self) -> Option<&str> {
        self.encounter.as_ref().map(|e| e.duration.as_str())
    }

    /// Encounter title, if the tracker sent one.
    pub fn title(&self) -> Option<&str> {
        self.encounter.as_ref().and_then(|e| e.title.as_deref())
    }
}

/// Encounter summary inside a snapshot.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Encounter {
    /// Elapsed time as the tracker formats it (`"00:42"`, `"1:02:03"`, ...).
    ///
    /// Compared verbatim when deduplicating. Numeric wire values are kept as
    /// their decimal text.
    #[serde(default, deserialize_with = "deserialize_text")]
    pub duration: String,

    /// Display title (usually the zone or boss name).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    /// Remaining encounter fields.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Encounter {
    /// Encounter with only a duration.
    pub fn new(duration: impl Into<String>) -> Self {
        Self {
            duration: duration.into(),
            title: None,
            extra: Map::new(),
        }
    }

    /// Attach a title.
    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Parse [`duration`](Self::duration) as `ss`, `mm:ss`, or `hh:mm:ss`.
    pub fn duration_secs(&self) -> Option<Duration> {
        parse_clock(&self.duration)
    }
}

/// One participant. Its stats are opaque to this crate.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Combatant {
    /// All fields as sent by the tracker.
    pub fields: Map<String, Value>,
}

impl Combatant {
    /// Combatant carrying only a name.
    pub fn named(name: impl Into<String>) -> Self {
        let mut fields = Map::new();
        let _ = fields.insert("name".into(), Value::String(name.into()));
        Self { fields }
    }

    /// The `name` field, if it is a string.
    pub fn name(&self) -> Option<&str> {
        self.fields.get("name").and_then(Value::as_str)
    }

    /// Read a numeric stat. The tracker sends most numbers as strings.
    pub fn number(&self, field: &str) -> Option<f64> {
        match self.fields.get(field)? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }
}

fn parse_clock(raw: &str) -> Option<Duration> {
    let parts: Vec<&str> = raw.trim().split(':').collect();
    if parts.is_empty() || parts.len() > 3 {
        return None;
    }
    let (last, whole) = parts.split_last()?;
    let seconds = Duration::try_from_secs_f64(last.parse().ok()?).ok()?;
    let mut total = 0u64;
    for part in whole {
        total = total.checked_mul(60)?.checked_add(part.parse::<u64>().ok()?)?;
    }
    Duration::from_secs(total.checked_mul(60)?).checked_add(seconds)
}

fn deserialize_flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Bool(b) => b,
        Value::String(s) => s.trim().eq_ignore_ascii_case("true"),
        _ => false,
    })
}

fn deserialize_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        Value::Null => Ok(String::new()),
        other => Err(de::Error::custom(format!(
            "expected string or number, got {other}"
        ))),
    }
}

fn deserialize_combatants<'de, D>(
    deserializer: D,
) -> Result<IndexMap<String, Combatant>, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Null => Ok(IndexMap::new()),
        Value::Object(map) => Ok(map
            .into_iter()
            .filter_map(|(key, v)| combatant_from(v).map(|c| (key, c)))
            .collect()),
        Value::Array(items) => Ok(items
            .into_iter()
            .enumerate()
            .filter_map(|(i, v)| {
                let c = combatant_from(v)?;
                let key = c.name().map_or_else(|| i.to_string(), str::to_owned);
                Some((key, c))
            })
            .collect()),
        other => Err(de::Error::custom(format!(
            "expected combatant map, got {other}"
        ))),
    }
}

/// Entries that are not objects carry no stats and are skipped.
fn combatant_from(v: Value) -> Option<Combatant> {
    match v {
        Value::Object(fields) => Some(Combatant { fields }),
        _ => None,
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
