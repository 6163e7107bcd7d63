//! # actlink-client
//!
//! Connects to an ACT/IINACT combat tracker and keeps a bounded history of
//! encounters.
//!
//! - **Client**: [`TrackerClient`] runs the connection state machine; one
//!   background generation per `start()`, joined on `shutdown()`
//! - **Transports**: [`StreamTransport`] (WebSocket) and [`CallbackTransport`]
//!   (in-process IPC push), both behind the [`Transport`] trait
//! - **History**: [`EventPipeline`] decodes payloads and applies
//!   [`merge_event`] to an [`EncounterHistory`]
//! - **Host seams**: [`GameState`], [`ChatSink`], [`IpcRegistry`]
//! - **Policies**: [`ReconnectPolicy`] and [`AutoEndPolicy`], ticked by the host
//! - **Ownership**: [`ClientSlot`] holds the one current client

#![deny(unsafe_code)]

pub mod client;
pub mod decode;
pub mod history;
pub mod host;
pub mod ipc;
pub mod merge;
pub mod metrics;
pub mod pipeline;
pub mod policy;
pub mod slot;
pub mod status;
pub mod transport;

pub use client::TrackerClient;
pub use history::EncounterHistory;
pub use host::{ChatSink, GameState, HostFlags, HostServices, RecordingChat, TracingChat};
pub use ipc::{IpcHandler, IpcRegistry, LocalIpcRegistry};
pub use merge::{MergeOutcome, RejectReason, merge_event};
pub use pipeline::EventPipeline;
pub use policy::{AutoEndPolicy, ReconnectPolicy};
pub use slot::ClientSlot;
pub use status::{ConnectionStatus, StatusCell};
pub use transport::{
    CallbackTransport, ReceiveContext, ReceiveExit, StreamTransport, Transport, TransportFactory,
};
