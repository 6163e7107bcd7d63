//! Stream transport against a local WebSocket server.

use std::sync::Arc;
use std::time::Duration;

use actlink_client::{HostServices, TrackerClient};
use actlink_core::ConnectionState;
use actlink_core::constants::SUBSCRIBE_MESSAGE;
use actlink_settings::TrackerSettings;
use futures::{SinkExt, StreamExt};
use serde_json::json;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::Message;

async fn wait_for(client: &TrackerClient, state: ConnectionState) {
    let mut rx = client.subscribe_status();
    let _ = tokio::time::timeout(Duration::from_secs(5), rx.wait_for(|s| s.state == state))
        .await
        .expect("timed out waiting for state")
        .unwrap();
}

async fn wait_until(mut check: impl FnMut() -> bool) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while !check() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("condition never became true");
}

fn ended_encounter(duration: &str) -> String {
    json!({
        "type": "CombatData",
        "Encounter": { "title": "Striking Dummy", "duration": duration, "DURATION": "42" },
        "Combatant": { "YOU": { "name": "YOU", "encdps": "1234.5" } },
        "isActive": "false"
    })
    .to_string()
}

fn client_for(address: String) -> TrackerClient {
    let settings = TrackerSettings {
        socket_address: address,
        ..TrackerSettings::default()
    };
    TrackerClient::new(&settings, HostServices::standalone(false))
}

#[tokio::test]
async fn receives_events_and_shuts_down_when_server_closes() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (close_tx, close_rx) = oneshot::channel::<()>();
    let (subscribe_tx, subscribe_rx) = oneshot::channel::<String>();

    let server = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = accept_async(stream).await.unwrap();

        let first = ws.next().await.unwrap().unwrap();
        let Message::Text(text) = first else {
            panic!("expected text subscribe frame, got {first:?}");
        };
        subscribe_tx.send(text.as_str().to_string()).unwrap();

        // Blank frames are skipped, not counted as encounters.
        ws.send(Message::Text(String::new().into())).await.unwrap();
        ws.send(Message::Text(ended_encounter("00:42").into())).await.unwrap();
        ws.send(Message::Text(ended_encounter("00:42").into())).await.unwrap();

        close_rx.await.unwrap();
        ws.close(None).await.unwrap();
        while let Some(Ok(_)) = ws.next().await {}
    });

    let client = client_for(format!("ws://{addr}/ws"));
    client.start();
    wait_for(&client, ConnectionState::Subscribed).await;
    assert_eq!(subscribe_rx.await.unwrap(), SUBSCRIBE_MESSAGE);

    wait_until(|| client.last_event().is_some()).await;
    assert_eq!(client.past_events().len(), 1);
    let last = client.last_event().unwrap();
    assert_eq!(last.title(), Some("Striking Dummy"));
    assert!(last.timestamp.is_some());
    assert!(Arc::ptr_eq(&last, &client.past_events()[0]));

    close_tx.send(()).unwrap();
    wait_for(&client, ConnectionState::NotConnected).await;
    assert_eq!(client.auto_shutdowns(), 1);
    assert!(client.last_event().is_none());
    assert_eq!(client.past_events().len(), 1);

    server.await.unwrap();
    client.dispose().await;
}

#[tokio::test]
async fn refused_connection_is_reported_and_resettable() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let client = client_for(format!("ws://127.0.0.1:{port}/ws"));
    client.start();
    wait_for(&client, ConnectionState::ConnectionFailed).await;
    assert!(client.connection_incomplete_or_failed());
    assert!(client.status().last_error.is_some());

    client.reset().await;
    assert_eq!(client.state(), ConnectionState::NotConnected);
}

#[tokio::test]
async fn shutdown_while_subscribed_closes_socket() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let server = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = accept_async(stream).await.unwrap();
        let mut frames = 0usize;
        while let Some(Ok(msg)) = ws.next().await {
            if msg.is_close() {
                break;
            }
            frames += 1;
        }
        frames
    });

    let client = client_for(format!("ws://{addr}/ws"));
    client.start();
    wait_for(&client, ConnectionState::Subscribed).await;

    client.shutdown().await;
    assert_eq!(client.state(), ConnectionState::NotConnected);
    assert_eq!(client.auto_shutdowns(), 0);

    let frames = tokio::time::timeout(Duration::from_secs(5), server)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(frames, 1);
}
