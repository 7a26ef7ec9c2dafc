use datafeed_status::{ChannelSink, Frame, StatusConfig, StatusRegistry, Timestamps};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedReceiver;

const CLIENT: &str = "whatever";

fn times(pairs: &[(&str, i64)]) -> Timestamps {
    pairs.iter().map(|(n, t)| (n.to_string(), *t)).collect()
}

/// Lets scheduled flush tasks run
async fn settle() {
    tokio::time::sleep(Duration::from_millis(20)).await;
}

/// Connects a client and consumes the preamble
async fn connect(registry: &StatusRegistry, client_id: &str) -> UnboundedReceiver<Frame> {
    let (sink, mut rx) = ChannelSink::new();
    registry.status_connect(client_id, Arc::new(sink)).unwrap();

    assert!(matches!(rx.recv().await, Some(Frame::Head { status: 200, .. })));
    assert_eq!(rx.recv().await, Some(Frame::Chunk("\n".to_string())));
    rx
}

/// Collects every status event delivered so far as (event, id, data)
fn drain_events(rx: &mut UnboundedReceiver<Frame>) -> Vec<(String, u64, Value)> {
    let mut events = Vec::new();
    while let Ok(frame) = rx.try_recv() {
        let Frame::Chunk(block) = frame else {
            panic!("Unexpected frame: {:?}", frame);
        };
        let lines: Vec<&str> = block.split('\n').collect();
        assert_eq!(lines.len(), 5, "block was {:?}", block);
        assert_eq!(lines[3], "");
        assert_eq!(lines[4], "");

        let event = lines[0].strip_prefix("event: ").unwrap().to_string();
        let id = lines[1].strip_prefix("id: ").unwrap().parse().unwrap();
        let data = serde_json::from_str(lines[2].strip_prefix("data: ").unwrap()).unwrap();
        events.push((event, id, data));
    }
    events
}

async fn setup() -> (StatusRegistry, UnboundedReceiver<Frame>) {
    let registry = StatusRegistry::new(StatusConfig::new("service-path")).unwrap();
    let rx = connect(&registry, CLIENT).await;
    registry.register_entity_type(CLIENT, "test", &times(&[("a", 0), ("b", 0)]));
    (registry, rx)
}

#[tokio::test]
async fn test_bulk_change_sends_one_event() {
    let (registry, mut rx) = setup().await;

    registry.record_timestamp_changes(&times(&[("a", 100), ("b", 50)]));
    settle().await;

    let events = drain_events(&mut rx);
    assert_eq!(events.len(), 1);
    let (event, _, data) = &events[0];
    assert_eq!(event, "service-path/test");
    assert_eq!(data, &json!({"entityType": "test", "superseded": {"a": 100, "b": 50}}));

    assert_eq!(registry.entity_times(CLIENT, "test"), Some(times(&[("a", 100), ("b", 50)])));
    assert_eq!(registry.pending_changes(CLIENT, "test"), None);
}

#[tokio::test]
async fn test_individual_changes_in_one_turn_are_coalesced() {
    let (registry, mut rx) = setup().await;

    registry.record_timestamp_changes(&times(&[("a", 10)]));
    registry.record_timestamp_changes(&times(&[("a", 20)]));
    registry.record_timestamp_changes(&times(&[("b", 30)]));
    settle().await;

    let events = drain_events(&mut rx);
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].2["superseded"], json!({"a": 20, "b": 30}));
}

#[tokio::test]
async fn test_stale_change_sends_nothing() {
    let (registry, mut rx) = setup().await;

    registry.record_timestamp_changes(&times(&[("a", 100), ("b", 50)]));
    settle().await;
    assert_eq!(drain_events(&mut rx).len(), 1);

    registry.record_timestamp_changes(&times(&[("a", 40)]));
    registry.record_timestamp_changes(&times(&[("a", 100)]));
    settle().await;

    assert!(drain_events(&mut rx).is_empty());
    assert_eq!(registry.pending_changes(CLIENT, "test"), None);
}

#[tokio::test]
async fn test_unregistered_timestamp_is_ignored() {
    let (registry, mut rx) = setup().await;
    registry.register_entity_type(CLIENT, "other", &times(&[("x", 0)]));

    registry.record_timestamp_changes(&times(&[("x", 5)]));
    settle().await;

    let events = drain_events(&mut rx);
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].0, "service-path/other");
    assert_eq!(registry.entity_times(CLIENT, "test"), Some(times(&[("a", 0), ("b", 0)])));
}

#[tokio::test]
async fn test_shared_timestamp_notifies_each_entity_type() {
    let (registry, mut rx) = setup().await;
    registry.register_entity_type(CLIENT, "test-dep", &times(&[("a", 0)]));

    registry.record_timestamp_changes(&times(&[("a", 7)]));
    settle().await;

    let mut names: Vec<String> = drain_events(&mut rx).into_iter().map(|e| e.0).collect();
    names.sort();
    assert_eq!(names, vec!["service-path/test", "service-path/test-dep"]);
}

#[tokio::test]
async fn test_registration_is_idempotent() {
    let (registry, mut rx) = setup().await;

    registry.record_timestamp_changes(&times(&[("a", 10)]));
    // re-registering with other times must not reset acknowledged or pending state
    registry.register_entity_type(CLIENT, "test", &times(&[("a", 0), ("c", 0)]));
    settle().await;

    let events = drain_events(&mut rx);
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].2["superseded"], json!({"a": 10}));
    assert_eq!(registry.entity_times(CLIENT, "test"), Some(times(&[("a", 10), ("b", 0)])));

    registry.record_timestamp_changes(&times(&[("c", 1)]));
    settle().await;
    assert!(drain_events(&mut rx).is_empty());
}

#[tokio::test]
async fn test_event_ids_are_global_and_increasing() {
    let registry = StatusRegistry::new(StatusConfig::new("p")).unwrap();
    let mut rx1 = connect(&registry, "c1").await;
    let mut rx2 = connect(&registry, "c2").await;
    registry.register_entity_type("c1", "t", &times(&[("a", 0)]));
    registry.register_entity_type("c2", "t", &times(&[("a", 0)]));

    registry.record_timestamp_changes(&times(&[("a", 1)]));
    settle().await;
    registry.record_timestamp_changes(&times(&[("a", 2)]));
    settle().await;

    let mut ids: Vec<u64> = drain_events(&mut rx1)
        .into_iter()
        .chain(drain_events(&mut rx2))
        .map(|e| e.1)
        .collect();
    ids.sort_unstable();
    assert_eq!(ids, vec![1, 2, 3, 4]);
}

#[tokio::test]
async fn test_disconnected_client_keeps_changes_pending() {
    let registry = StatusRegistry::new(StatusConfig::new("p")).unwrap();
    registry.register_entity_type(CLIENT, "test", &times(&[("a", 0)]));

    registry.record_timestamp_changes(&times(&[("a", 10)]));
    settle().await;
    assert_eq!(registry.pending_changes(CLIENT, "test"), Some(times(&[("a", 10)])));

    // reconnecting alone delivers nothing
    let mut rx = connect(&registry, CLIENT).await;
    settle().await;
    assert!(drain_events(&mut rx).is_empty());

    // the next change flushes everything accumulated
    registry.record_timestamp_changes(&times(&[("a", 11)]));
    settle().await;
    let events = drain_events(&mut rx);
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].2["superseded"], json!({"a": 11}));
}

#[tokio::test]
async fn test_close_clears_connection_but_keeps_entity_state() {
    let (registry, rx) = setup().await;
    drop(rx);
    settle().await;

    assert!(!registry.is_connected(CLIENT));
    assert_eq!(registry.entity_times(CLIENT, "test"), Some(times(&[("a", 0), ("b", 0)])));

    registry.record_timestamp_changes(&times(&[("a", 3)]));
    settle().await;
    assert_eq!(registry.pending_changes(CLIENT, "test"), Some(times(&[("a", 3)])));
}

#[tokio::test]
async fn test_reconnect_replaces_connection_and_ignores_stale_close() {
    let (registry, old_rx) = setup().await;
    let mut new_rx = connect(&registry, CLIENT).await;

    // closing the replaced connection must not unbind the new one
    drop(old_rx);
    settle().await;
    assert!(registry.is_connected(CLIENT));

    registry.record_timestamp_changes(&times(&[("b", 9)]));
    settle().await;
    let events = drain_events(&mut new_rx);
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].2["superseded"], json!({"b": 9}));

    drop(new_rx);
    settle().await;
    assert!(!registry.is_connected(CLIENT));
}

#[tokio::test]
async fn test_changes_after_flush_start_new_window() {
    let (registry, mut rx) = setup().await;

    registry.record_timestamp_changes(&times(&[("a", 1)]));
    settle().await;
    registry.record_timestamp_changes(&times(&[("a", 2)]));
    settle().await;

    let events = drain_events(&mut rx);
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].2["superseded"], json!({"a": 1}));
    assert_eq!(events[1].2["superseded"], json!({"a": 2}));
    assert!(events[1].1 > events[0].1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_one_turn_is_one_event_on_multi_thread_runtime() {
    let mut split_rounds = 0;

    for _ in 0..200 {
        let (registry, mut rx) = setup().await;

        registry.record_timestamp_changes(&times(&[("a", 1)]));
        registry.record_timestamp_changes(&times(&[("a", 2)]));
        registry.record_timestamp_changes(&times(&[("a", 3)]));

        let first = tokio::time::timeout(Duration::from_secs(1), rx.recv())
            .await
            .unwrap()
            .unwrap();
        let Frame::Chunk(block) = first else {
            panic!("Unexpected frame: {:?}", first);
        };
        assert!(block.contains(r#""superseded":{"a":3}"#), "block was {:?}", block);

        tokio::time::sleep(Duration::from_millis(5)).await;
        if !drain_events(&mut rx).is_empty() {
            split_rounds += 1;
        }
    }

    assert_eq!(split_rounds, 0);
}
