//! # actlink-core
//!
//! Shared vocabulary for the ActLink combat tracker client.
//!
//! - **Events**: [`CombatEvent`], [`Encounter`], [`Combatant`] decoded from the
//!   tracker's `CombatData` payloads, tolerant of unknown fields
//! - **Connection state**: [`ConnectionState`] and [`TransportKind`]
//! - **Errors**: [`DecodeError`], [`TransportError`], [`IpcError`] via `thiserror`
//! - **Protocol constants**: subscribe payload, default socket address, IPC endpoint names
//! - **Logging**: [`logging::init_subscriber`] for binaries and test harnesses

#![deny(unsafe_code)]

pub mod constants;
pub mod errors;
pub mod event;
pub mod logging;
pub mod state;

pub use errors::{DecodeError, IpcError, TransportError};
pub use event::{CombatEvent, Combatant, Encounter};
pub use state::{ConnectionState, TransportKind};
