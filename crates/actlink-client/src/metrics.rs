//! Metric names recorded by the client.
//!
//! No recorder is installed here. Embedders (or the `actlink` binary with
//! `--metrics`) decide where they go.

/// Payloads handed to the pipeline (counter, labels: source).
pub const EVENTS_RECEIVED_TOTAL: &str = "actlink_events_received_total";
/// Snapshots accepted into history (counter, labels: outcome).
pub const EVENTS_ACCEPTED_TOTAL: &str = "actlink_events_accepted_total";
/// Snapshots dropped as noise or duplicates (counter, labels: reason).
pub const EVENTS_REJECTED_TOTAL: &str = "actlink_events_rejected_total";
/// Payloads that failed to decode (counter).
pub const DECODE_FAILURES_TOTAL: &str = "actlink_decode_failures_total";
/// Failed connection setups (counter, labels: transport).
pub const CONNECTION_FAILURES_TOTAL: &str = "actlink_connection_failures_total";
/// Reconnects triggered by the reconnect policy (counter).
pub const RECONNECT_ATTEMPTS_TOTAL: &str = "actlink_reconnect_attempts_total";
/// Shutdowns triggered by the connection dropping (counter, labels: transport).
pub const AUTO_SHUTDOWNS_TOTAL: &str = "actlink_auto_shutdowns_total";
