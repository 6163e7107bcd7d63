//! # actlink-settings
//!
//! Configuration for the ActLink tracker client.
//!
//! Settings are loaded from three layers (in priority order):
//! 1. **Compiled defaults**: [`ActLinkSettings::default()`]
//! 2. **User file**: `~/.actlink/settings.json` (deep-merged over defaults)
//! 3. **Environment variables**: `ACTLINK_*` overrides (highest priority)
//!
//! There is no global instance. The binary loads settings once and passes
//! them to whatever owns the tracker client.

#![deny(unsafe_code)]

pub mod errors;
pub mod loader;
pub mod types;

pub use errors::{Result, SettingsError};
pub use loader::{deep_merge, load_settings, load_settings_from_path, settings_path};
pub use types::{ActLinkSettings, LoggingSettings, TrackerSettings};
