//! Connection status published through a `watch` channel.
//!
//! The client's lifecycle methods and its background generation task are the
//! only writers. Every transition goes through a compare-and-set style
//! method so a stale generation can never overwrite a shutdown in progress.

use actlink_core::ConnectionState;
use tokio::sync::watch;

/// State plus the text of the most recent setup failure.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ConnectionStatus {
    /// Current lifecycle state.
    pub state: ConnectionState,
    /// Display text of the last failure. Cleared when a new start begins.
    pub last_error: Option<String>,
}

/// Single-writer status cell with any number of watchers.
#[derive(Debug)]
pub struct StatusCell {
    tx: watch::Sender<ConnectionStatus>,
}

impl StatusCell {
    /// Cell starting at `NotConnected`.
    pub fn new() -> Self {
        Self {
            tx: watch::Sender::new(ConnectionStatus::default()),
        }
    }

    /// Snapshot of the status.
    pub fn get(&self) -> ConnectionStatus {
        self.tx.borrow().clone()
    }

    /// Current state.
    pub fn state(&self) -> ConnectionState {
        self.tx.borrow().state
    }

    /// Receiver notified on every change.
    pub fn subscribe(&self) -> watch::Receiver<ConnectionStatus> {
        self.tx.subscribe()
    }

    /// `NotConnected → Connecting`, clearing the last error.
    ///
    /// Returns the current state if it was anything but `NotConnected`.
    pub fn try_begin_start(&self) -> Result<(), ConnectionState> {
        let mut current = ConnectionState::NotConnected;
        let started = self.tx.send_if_modified(|s| {
            current = s.state;
            if s.state != ConnectionState::NotConnected {
                return false;
            }
            s.state = ConnectionState::Connecting;
            s.last_error = None;
            true
        });
        if started { Ok(()) } else { Err(current) }
    }

    /// Move forward along the setup path. Ignored once the connection has
    /// failed or a shutdown has begun.
    pub fn advance(&self, next: ConnectionState) -> bool {
        self.tx.send_if_modified(|s| {
            if !Self::in_setup(s.state) {
                return false;
            }
            s.state = next;
            true
        })
    }

    /// Record a setup failure. Ignored once a shutdown has begun.
    pub fn fail(&self, error: String) -> bool {
        self.tx.send_if_modified(|s| {
            if !Self::in_setup(s.state) {
                return false;
            }
            s.state = ConnectionState::ConnectionFailed;
            s.last_error = Some(error);
            true
        })
    }

    /// Enter the shutdown path at `first` (`Unsubscribing` or `ShuttingDown`).
    ///
    /// Returns `false` when already idle or already shutting down, so exactly
    /// one caller owns each shutdown.
    pub fn begin_shutdown(&self, first: ConnectionState) -> bool {
        self.tx.send_if_modified(|s| {
            if s.state == ConnectionState::NotConnected || s.state.is_shutting_down() {
                return false;
            }
            s.state = first;
            true
        })
    }

    /// Unconditionally set the state. The last error is kept.
    pub fn set(&self, state: ConnectionState) {
        let _ = self.tx.send_if_modified(|s| {
            if s.state == state {
                return false;
            }
            s.state = state;
            true
        });
    }

    fn in_setup(state: ConnectionState) -> bool {
        matches!(
            state,
            ConnectionState::Connecting
                | ConnectionState::Connected
                | ConnectionState::Subscribing
                | ConnectionState::Subscribed
        )
    }
}

impl Default for StatusCell {
    fn default() -> Self {
        Self::new()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use ConnectionState::{
        Connected, Connecting, ConnectionFailed, NotConnected, ShuttingDown, Subscribed, Subscribing,
        Unsubscribing,
    };

    #[test]
    fn starts_not_connected() {
        let cell = StatusCell::new();
        assert_eq!(cell.get(), ConnectionStatus::default());
        assert_eq!(cell.state(), NotConnected);
    }

    #[test]
    fn begin_start_only_from_not_connected() {
        let cell = StatusCell::new();
        assert_eq!(cell.try_begin_start(), Ok(()));
        assert_eq!(cell.state(), Connecting);
        assert_eq!(cell.try_begin_start(), Err(Connecting));
        assert_eq!(cell.state(), Connecting);
    }

    #[test]
    fn begin_start_clears_last_error() {
        let cell = StatusCell::new();
        let _ = cell.try_begin_start();
        assert!(cell.fail("refused".into()));
        cell.set(NotConnected);
        assert_eq!(cell.get().last_error.as_deref(), Some("refused"));
        assert_eq!(cell.try_begin_start(), Ok(()));
        assert_eq!(cell.get().last_error, None);
    }

    #[test]
    fn happy_path() {
        let cell = StatusCell::new();
        let _ = cell.try_begin_start();
        assert!(cell.advance(Connected));
        assert!(cell.advance(Subscribing));
        assert!(cell.advance(Subscribed));
        assert_eq!(cell.state(), Subscribed);
    }

    #[test]
    fn failure_is_terminal_for_setup() {
        let cell = StatusCell::new();
        let _ = cell.try_begin_start();
        assert!(cell.fail("boom".into()));
        assert!(!cell.advance(Connected));
        assert!(!cell.fail("again".into()));
        let status = cell.get();
        assert_eq!(status.state, ConnectionFailed);
        assert_eq!(status.last_error.as_deref(), Some("boom"));
        assert_eq!(cell.try_begin_start(), Err(ConnectionFailed));
    }

    #[test]
    fn shutdown_blocks_stale_advances() {
        let cell = StatusCell::new();
        let _ = cell.try_begin_start();
        assert!(cell.begin_shutdown(ShuttingDown));
        assert!(!cell.advance(Subscribed));
        assert!(!cell.fail("late".into()));
        assert_eq!(cell.state(), ShuttingDown);
    }

    #[test]
    fn begin_shutdown_has_one_owner() {
        let cell = StatusCell::new();
        assert!(!cell.begin_shutdown(ShuttingDown));
        let _ = cell.try_begin_start();
        let _ = cell.advance(Subscribed);
        assert!(cell.begin_shutdown(Unsubscribing));
        assert!(!cell.begin_shutdown(ShuttingDown));
        assert_eq!(cell.state(), Unsubscribing);
    }

    #[test]
    fn shutdown_allowed_from_failed() {
        let cell = StatusCell::new();
        let _ = cell.try_begin_start();
        let _ = cell.fail("x".into());
        assert!(cell.begin_shutdown(ShuttingDown));
    }

    #[tokio::test]
    async fn watchers_see_changes() {
        let cell = StatusCell::new();
        let mut rx = cell.subscribe();
        let _ = cell.try_begin_start();
        rx.changed().await.unwrap();
        assert_eq!(rx.borrow_and_update().state, Connecting);
        cell.set(Connecting);
        assert!(!rx.has_changed().unwrap());
    }
}
