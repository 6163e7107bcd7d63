//! Host-side collaborators the client consumes but does not own.
//!
//! The embedding application answers game-state queries, prints chat echoes,
//! and provides the IPC registry used by the callback transport.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use tracing::info;

use crate::ipc::{IpcRegistry, LocalIpcRegistry};

/// Game-state queries.
pub trait GameState: Send + Sync {
    /// Whether the local player is in combat. Gates active snapshots.
    fn is_in_combat(&self) -> bool;

    /// Whether a character is logged in. Gates `start()` when configured.
    fn is_logged_in(&self) -> bool {
        true
    }
}

/// Fire-and-forget chat output.
pub trait ChatSink: Send + Sync {
    /// Echo a command to the tracker through chat.
    fn echo(&self, message: &str);
}

/// [`GameState`] backed by atomic flags the host flips.
#[derive(Debug)]
pub struct HostFlags {
    in_combat: AtomicBool,
    logged_in: AtomicBool,
}

impl HostFlags {
    /// Flags with the given initial values.
    pub fn new(in_combat: bool, logged_in: bool) -> Self {
        Self {
            in_combat: AtomicBool::new(in_combat),
            logged_in: AtomicBool::new(logged_in),
        }
    }

    /// Update the combat flag.
    pub fn set_in_combat(&self, value: bool) {
        self.in_combat.store(value, Ordering::Relaxed);
    }

    /// Update the login flag.
    pub fn set_logged_in(&self, value: bool) {
        self.logged_in.store(value, Ordering::Relaxed);
    }
}

impl Default for HostFlags {
    fn default() -> Self {
        Self::new(false, true)
    }
}

impl GameState for HostFlags {
    fn is_in_combat(&self) -> bool {
        self.in_combat.load(Ordering::Relaxed)
    }

    fn is_logged_in(&self) -> bool {
        self.logged_in.load(Ordering::Relaxed)
    }
}

/// [`ChatSink`] that logs each echo.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingChat;

impl ChatSink for TracingChat {
    fn echo(&self, message: &str) {
        info!(target: "actlink::chat", text = message, "chat echo");
    }
}

/// [`ChatSink`] that keeps every echo in memory.
#[derive(Debug, Default)]
pub struct RecordingChat {
    messages: Mutex<Vec<String>>,
}

impl RecordingChat {
    /// Echoes received so far.
    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().clone()
    }
}

impl ChatSink for RecordingChat {
    fn echo(&self, message: &str) {
        self.messages.lock().push(message.to_string());
    }
}

/// Everything the host provides, bundled so one value can be handed to each
/// new client.
#[derive(Clone)]
pub struct HostServices {
    /// Game-state queries.
    pub game: Arc<dyn GameState>,
    /// Chat output.
    pub chat: Arc<dyn ChatSink>,
    /// IPC registry for the callback transport.
    pub ipc: Arc<dyn IpcRegistry>,
}

impl HostServices {
    /// Bundle the given collaborators.
    pub fn new(
        game: Arc<dyn GameState>,
        chat: Arc<dyn ChatSink>,
        ipc: Arc<dyn IpcRegistry>,
    ) -> Self {
        Self { game, chat, ipc }
    }

    /// Standalone host: fixed flags, logged chat, empty in-process registry.
    pub fn standalone(in_combat: bool) -> Self {
        Self {
            game: Arc::new(HostFlags::new(in_combat, true)),
            chat: Arc::new(TracingChat),
            ipc: Arc::new(LocalIpcRegistry::new()),
        }
    }
}

impl std::fmt::Debug for HostServices {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostServices").finish_non_exhaustive()
    }
}
