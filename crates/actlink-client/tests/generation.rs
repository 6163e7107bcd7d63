//! Connection generations never overlap, and the reconnect policy drives retries.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use actlink_client::{
    HostServices, ReceiveContext, ReceiveExit, ReconnectPolicy, Transport, TrackerClient,
};
use actlink_core::{ConnectionState, TransportError, TransportKind};
use actlink_settings::TrackerSettings;
use async_trait::async_trait;

#[derive(Default)]
struct Counters {
    live: AtomicUsize,
    max_live: AtomicUsize,
    connects: AtomicUsize,
    /// Connect attempts that fail before the first success.
    failures_left: AtomicUsize,
}

struct Counting {
    counters: Arc<Counters>,
    open: bool,
}

#[async_trait]
impl Transport for Counting {
    fn kind(&self) -> TransportKind {
        TransportKind::Stream
    }

    async fn connect(&mut self) -> Result<(), TransportError> {
        let _ = self.counters.connects.fetch_add(1, Ordering::SeqCst);
        let failing = self
            .counters
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(TransportError::Io("scripted failure".into()));
        }
        self.open = true;
        let live = self.counters.live.fetch_add(1, Ordering::SeqCst) + 1;
        let _ = self.counters.max_live.fetch_max(live, Ordering::SeqCst);
        Ok(())
    }

    async fn subscribe(&mut self) -> Result<(), TransportError> {
        tokio::task::yield_now().await;
        Ok(())
    }

    async fn receive(&mut self, ctx: ReceiveContext<'_>) -> ReceiveExit {
        ctx.cancel.cancelled().await;
        ReceiveExit::Cancelled
    }

    async fn close(&mut self) {
        if std::mem::take(&mut self.open) {
            let _ = self.counters.live.fetch_sub(1, Ordering::SeqCst);
        }
    }
}

fn counting_client(settings: &TrackerSettings, counters: &Arc<Counters>) -> TrackerClient {
    let counters = Arc::clone(counters);
    TrackerClient::with_transport(
        TransportKind::Stream,
        settings,
        HostServices::standalone(false),
        Arc::new(move || {
            Box::new(Counting {
                counters: Arc::clone(&counters),
                open: false,
            }) as Box<dyn Transport>
        }),
    )
}

async fn wait_for(client: &TrackerClient, state: ConnectionState) {
    let mut rx = client.subscribe_status();
    let _ = tokio::time::timeout(Duration::from_secs(5), rx.wait_for(|s| s.state == state))
        .await
        .expect("timed out waiting for state")
        .unwrap();
}

#[tokio::test]
async fn retries_never_overlap_generations() {
    let counters = Arc::new(Counters::default());
    let client = counting_client(&TrackerSettings::default(), &counters);

    client.start();
    for _ in 0..5 {
        client.retry_connection().await;
    }
    wait_for(&client, ConnectionState::Subscribed).await;
    assert_eq!(counters.live.load(Ordering::SeqCst), 1);

    for _ in 0..5 {
        client.retry_connection().await;
        wait_for(&client, ConnectionState::Subscribed).await;
    }
    assert_eq!(counters.max_live.load(Ordering::SeqCst), 1);

    client.shutdown().await;
    assert_eq!(counters.live.load(Ordering::SeqCst), 0);
    assert_eq!(client.state(), ConnectionState::NotConnected);
}

#[tokio::test(start_paused = true)]
async fn reconnect_policy_retries_after_delay() {
    let counters = Arc::new(Counters::default());
    counters.failures_left.store(1, Ordering::SeqCst);
    let settings = TrackerSettings {
        auto_reconnect: true,
        reconnect_delay_secs: 5,
        ..TrackerSettings::default()
    };
    let client = counting_client(&settings, &counters);
    let mut policy = ReconnectPolicy::new(&settings);

    client.start();
    wait_for(&client, ConnectionState::ConnectionFailed).await;

    assert!(!policy.tick(&client).await);
    tokio::time::advance(Duration::from_secs(3)).await;
    assert!(!policy.tick(&client).await);
    tokio::time::advance(Duration::from_secs(3)).await;
    assert!(policy.tick(&client).await);

    wait_for(&client, ConnectionState::Subscribed).await;
    assert_eq!(counters.connects.load(Ordering::SeqCst), 2);
    assert!(!policy.tick(&client).await);

    client.dispose().await;
    assert_eq!(counters.live.load(Ordering::SeqCst), 0);
}
