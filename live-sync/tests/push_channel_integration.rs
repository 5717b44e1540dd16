//! Push channel integration tests
//!
//! Runs the STOMP connector and push channel against a fake broker over a
//! real WebSocket connection.

mod common;

use common::FakeBroker;
use live_sync::infrastructure::Command;
use live_sync::{Credential, PushChannel, StompConnector, Topic};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::time::timeout;

// ============================================================================
// Test Fixtures
// ============================================================================

fn channel(broker: &FakeBroker, reconnect_delay: Duration) -> PushChannel {
    let connector = Arc::new(StompConnector::new(broker.url(), "localhost", Duration::ZERO));
    PushChannel::new(connector, reconnect_delay)
}

async fn wait_connected(state: &mut watch::Receiver<bool>, expected: bool) {
    timeout(Duration::from_secs(3), state.wait_for(|c| *c == expected))
        .await
        .expect("timed out waiting for connection state")
        .expect("channel dropped");
}

#[derive(Debug, Deserialize, PartialEq)]
struct Reading {
    id: u32,
    temperature: f64,
}

// ============================================================================
// Connection
// ============================================================================

#[tokio::test]
async fn test_connect_presents_bearer_credential() {
    let mut broker = FakeBroker::start().await;
    let channel = channel(&broker, Duration::from_millis(50));
    let mut state = channel.watch_connection();

    assert!(channel.connect(Credential::bearer("secret-token")));

    let connect = broker.expect(Command::Connect).await;
    assert_eq!(connect.get("Authorization"), Some("Bearer secret-token"));
    assert_eq!(connect.get("accept-version"), Some("1.2"));
    assert_eq!(connect.get("host"), Some("localhost"));

    wait_connected(&mut state, true).await;
    assert!(channel.is_connected());
}

#[tokio::test]
async fn test_buffered_subscription_bound_once_on_connect() {
    let mut broker = FakeBroker::start().await;
    let channel = channel(&broker, Duration::from_millis(50));
    let topic = Topic::new("/topic/alarms/order/7");

    channel.subscribe(topic.clone(), Arc::new(|_| {}));
    assert_eq!(channel.registry().active_count(), 0);

    channel.connect(Credential::bearer("t"));

    let subscribe = broker.expect(Command::Subscribe).await;
    assert_eq!(subscribe.get("destination"), Some("/topic/alarms/order/7"));
    assert_eq!(subscribe.get("id"), Some("sub-1"));
    assert_eq!(subscribe.get("ack"), Some("auto"));

    let extra = broker.drain(Duration::from_millis(100)).await;
    assert!(extra.iter().all(|f| f.command != Command::Subscribe));
    assert_eq!(channel.registry().active_count(), 1);
    assert!(channel.registry().is_bound(&topic));
}

// ============================================================================
// Message delivery
// ============================================================================

#[tokio::test]
async fn test_malformed_payload_dropped_then_valid_delivered() {
    let mut broker = FakeBroker::start().await;
    let channel = channel(&broker, Duration::from_millis(50));
    let (tx, mut rx) = mpsc::unbounded_channel();

    channel.subscribe_typed(Topic::new("/topic/details/order/3"), move |r: Reading| {
        let _ = tx.send(r);
    });
    channel.connect(Credential::bearer("t"));
    broker.expect(Command::Subscribe).await;

    broker.publish("/topic/details/order/3", "{not json");
    broker.publish("/topic/details/order/3", r#"{"unexpected": true}"#);
    broker.publish("/topic/details/order/3", r#"{"id": 1, "temperature": 21.5}"#);

    let reading = timeout(Duration::from_secs(3), rx.recv()).await.unwrap().unwrap();
    assert_eq!(
        reading,
        Reading {
            id: 1,
            temperature: 21.5
        }
    );
    assert!(rx.try_recv().is_err());
    assert!(channel.is_connected());
}

#[tokio::test]
async fn test_topics_are_isolated() {
    let mut broker = FakeBroker::start().await;
    let channel = channel(&broker, Duration::from_millis(50));
    let (alarms_tx, mut alarms_rx) = mpsc::unbounded_channel();
    let (details_tx, mut details_rx) = mpsc::unbounded_channel();

    channel.subscribe(
        Topic::new("/topic/alarms/order/9"),
        Arc::new(move |v| {
            let _ = alarms_tx.send(v);
        }),
    );
    channel.subscribe(
        Topic::new("/topic/details/order/9"),
        Arc::new(move |v| {
            let _ = details_tx.send(v);
        }),
    );
    channel.connect(Credential::bearer("t"));
    broker.expect(Command::Subscribe).await;
    broker.expect(Command::Subscribe).await;

    broker.publish("/topic/details/order/9", r#"{"id": 5}"#);

    let value = timeout(Duration::from_secs(3), details_rx.recv()).await.unwrap().unwrap();
    assert_eq!(value["id"], 5);
    assert!(alarms_rx.try_recv().is_err());
}

// ============================================================================
// Reconnect
// ============================================================================

#[tokio::test]
async fn test_reconnect_replays_without_double_counting() {
    let mut broker = FakeBroker::start().await;
    let channel = channel(&broker, Duration::from_millis(50));
    let mut state = channel.watch_connection();
    let topic = Topic::new("/topic/alarms/order/11");
    let (tx, mut rx) = mpsc::unbounded_channel();

    channel.subscribe(
        topic.clone(),
        Arc::new(move |v| {
            let _ = tx.send(v);
        }),
    );
    channel.connect(Credential::bearer("t"));
    broker.expect(Command::Subscribe).await;
    wait_connected(&mut state, true).await;

    broker.drop_connection();
    wait_connected(&mut state, false).await;
    assert!(channel.registry().contains(&topic));

    broker.expect(Command::Connect).await;
    let replay = broker.expect(Command::Subscribe).await;
    assert_eq!(replay.get("destination"), Some(topic.as_str()));
    wait_connected(&mut state, true).await;

    assert_eq!(channel.registry().active_count(), 1);

    broker.publish(topic.as_str(), r#"{"id": 2, "status": "PENDING"}"#);
    let value = timeout(Duration::from_secs(3), rx.recv()).await.unwrap().unwrap();
    assert_eq!(value["status"], "PENDING");
}

// ============================================================================
// Teardown
// ============================================================================

#[tokio::test]
async fn test_disconnect_waits_for_unsubscribe() {
    let mut broker = FakeBroker::start().await;
    let channel = channel(&broker, Duration::from_millis(50));
    let mut state = channel.watch_connection();
    let topic = Topic::new("/topic/details/graphs/order/4");

    channel.subscribe(topic.clone(), Arc::new(|_| {}));
    channel.connect(Credential::bearer("t"));
    let subscribe = broker.expect(Command::Subscribe).await;
    wait_connected(&mut state, true).await;

    assert!(!channel.disconnect());
    assert!(channel.is_connected());

    assert!(channel.unsubscribe(&topic));
    assert!(!channel.unsubscribe(&topic));
    let unsubscribe = broker.expect(Command::Unsubscribe).await;
    assert_eq!(unsubscribe.get("id"), subscribe.get("id"));
    assert_eq!(channel.registry().active_count(), 0);

    assert!(channel.disconnect());
    broker.expect(Command::Disconnect).await;
    wait_connected(&mut state, false).await;
}
