//! Settings loading with deep merge and environment variable overrides.
//!
//! Loading flow:
//! 1. Start with compiled [`ActLinkSettings::default()`]
//! 2. If the settings file exists, deep-merge its values over the defaults
//! 3. Apply `ACTLINK_*` environment overrides
//! 4. [`ActLinkSettings::validate`]

use std::path::{Path, PathBuf};

use actlink_core::TransportKind;
use serde_json::Value;
use tracing::debug;

use crate::errors::{Result, SettingsError};
use crate::types::ActLinkSettings;

/// Resolve the path to the settings file (`~/.actlink/settings.json`).
pub fn settings_path() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
    PathBuf::from(home).join(".actlink").join("settings.json")
}

/// Load settings from the default path.
pub fn load_settings() -> Result<ActLinkSettings> {
    load_settings_from_path(&settings_path())
}

/// Load settings from a specific path.
///
/// A missing file yields defaults. Invalid JSON, or a file whose root is not
/// an object, is an error.
pub fn load_settings_from_path(path: &Path) -> Result<ActLinkSettings> {
    let defaults = serde_json::to_value(ActLinkSettings::default())?;

    let merged = if path.exists() {
        debug!(?path, "loading settings from file");
        let content = std::fs::read_to_string(path).map_err(|source| SettingsError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let user: Value = serde_json::from_str(&content)?;
        if !user.is_object() {
            return Err(SettingsError::InvalidValue(format!(
                "{} must contain a JSON object",
                path.display()
            )));
        }
        deep_merge(defaults, user)
    } else {
        debug!(?path, "settings file not found, using defaults");
        defaults
    };

    let mut settings: ActLinkSettings = serde_json::from_value(merged)?;
    apply_env_overrides(&mut settings);
    settings.validate();
    Ok(settings)
}

/// Recursive deep merge of two JSON values.
///
/// - Objects are merged recursively (source overrides target per-key)
/// - Arrays and primitives are replaced entirely by source
/// - Null values in source are skipped (preserving target)
pub fn deep_merge(target: Value, source: Value) -> Value {
    match (target, source) {
        (Value::Object(mut target_map), Value::Object(source_map)) => {
            for (key, source_val) in source_map {
                if source_val.is_null() {
                    continue;
                }
                let merged = match target_map.remove(&key) {
                    Some(target_val) => deep_merge(target_val, source_val),
                    None => source_val,
                };
                let _ = target_map.insert(key, merged);
            }
            Value::Object(target_map)
        }
        (_, source) => source,
    }
}

/// Apply `ACTLINK_*` environment overrides. Invalid values are warned about
/// and ignored.
pub fn apply_env_overrides(settings: &mut ActLinkSettings) {
    apply_overrides(settings, |name| std::env::var(name).ok());
}

/// Override logic with an injectable variable source, so tests need not touch
/// the process environment.
fn apply_overrides(settings: &mut ActLinkSettings, var: impl Fn(&str) -> Option<String>) {
    let read = |name: &str| var(name).filter(|v| !v.is_empty());
    let t = &mut settings.tracker;

    if let Some(v) = read("ACTLINK_TRANSPORT") {
        match v.parse::<TransportKind>() {
            Ok(kind) => t.transport = kind,
            Err(e) => tracing::warn!(key = "ACTLINK_TRANSPORT", value = %v, error = %e, "ignoring"),
        }
    }
    if let Some(v) = read("ACTLINK_SOCKET_ADDRESS") {
        t.socket_address = v;
    }
    if let Some(v) = read("ACTLINK_SUBSCRIBER_NAME") {
        t.subscriber_name = v;
    }
    if let Some(v) = read("ACTLINK_HISTORY_SIZE") {
        match parse_usize_range(&v, 0, 10_000) {
            Some(n) => t.encounter_history_size = n,
            None => warn_invalid("ACTLINK_HISTORY_SIZE", &v),
        }
    }
    if let Some(v) = read("ACTLINK_AUTO_RECONNECT") {
        match parse_bool(&v) {
            Some(b) => t.auto_reconnect = b,
            None => warn_invalid("ACTLINK_AUTO_RECONNECT", &v),
        }
    }
    if let Some(v) = read("ACTLINK_RECONNECT_DELAY") {
        match parse_u64_range(&v, 1, 86_400) {
            Some(n) => t.reconnect_delay_secs = n,
            None => warn_invalid("ACTLINK_RECONNECT_DELAY", &v),
        }
    }
    if let Some(v) = read("ACTLINK_LOG_LEVEL") {
        settings.logging.level = v;
    }
}

fn warn_invalid(key: &str, value: &str) {
    tracing::warn!(key, value, "invalid env var, ignoring");
}

// ── Pure parsing functions ──────────────────────────────────────────────────

/// Parse a string as a boolean.
///
/// Accepts (case-insensitive): `true`/`1`/`yes`/`on` or `false`/`0`/`no`/`off`.
pub fn parse_bool(val: &str) -> Option<bool> {
    match val.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Parse a string as a `u64` within a range.
pub fn parse_u64_range(val: &str, min: u64, max: u64) -> Option<u64> {
    let n: u64 = val.parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

/// Parse a string as a `usize` within a range.
pub fn parse_usize_range(val: &str, min: usize, max: usize) -> Option<usize> {
    let n: usize = val.parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
