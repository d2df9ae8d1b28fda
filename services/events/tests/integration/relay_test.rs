use std::time::Duration;

use tokio::sync::watch;

use herald_events::config::RelaySettings;
use herald_events::error::EventsServiceError;
use herald_events::relay::{OutboxRelay, TickOutcome, TickReport};

use crate::helpers::{InMemoryStore, InMemoryStreamLog, T1, T2, relay_settings};

fn completed(outcome: TickOutcome) -> TickReport {
    match outcome {
        TickOutcome::Completed(report) => report,
        TickOutcome::Skipped => panic!("tick was skipped"),
    }
}

// ── Draining ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn should_drain_in_batches_across_ticks() {
    let store = InMemoryStore::new();
    let log = InMemoryStreamLog::new();
    store.seed(T1, 5).await;
    let relay = OutboxRelay::new(store.clone(), log.clone(), relay_settings(&[T1], 2));

    let mut drained = Vec::new();
    for _ in 0..4 {
        drained.push(completed(relay.tick().await.unwrap()).appended);
    }

    assert_eq!(drained, vec![2, 2, 1, 0]);
    assert_eq!(store.unpublished(T1), 0);
    assert_eq!(log.entries(T1).len(), 5);
}

#[tokio::test]
async fn should_append_rows_in_id_order_with_outbox_fields() {
    let store = InMemoryStore::new();
    let log = InMemoryStreamLog::new();
    let ids = store.seed(T1, 3).await;
    let relay = OutboxRelay::new(store.clone(), log.clone(), relay_settings(&[T1], 10));

    relay.tick().await.unwrap();

    let entries = log.entries(T1);
    let event_ids: Vec<String> = entries.iter().map(|e| e.fields.event_id.clone()).collect();
    let expected: Vec<String> = ids.iter().map(ToString::to_string).collect();
    assert_eq!(event_ids, expected);

    let rows = store.outbox_rows();
    for (entry, row) in entries.iter().zip(&rows) {
        assert_eq!(entry.fields.aggregate_id, row.aggregate_id);
        assert_eq!(entry.fields.event_type, "EventCreated");
        let payload: serde_json::Value = serde_json::from_str(&entry.fields.payload).unwrap();
        assert_eq!(payload, row.payload);
    }
}

#[tokio::test]
async fn should_mark_each_row_exactly_once() {
    let store = InMemoryStore::new();
    let log = InMemoryStreamLog::new();
    store.seed(T1, 4).await;
    let relay = OutboxRelay::new(store.clone(), log.clone(), relay_settings(&[T1], 10));

    let first = completed(relay.tick().await.unwrap());
    let second = completed(relay.tick().await.unwrap());

    assert_eq!(first.marked, 4);
    assert_eq!(second, TickReport::default());
    assert!(store.outbox_rows().iter().all(|r| r.mark_count == 1));
}

// ── Concurrency ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn should_skip_tick_while_another_is_in_flight() {
    let store = InMemoryStore::new();
    let log = InMemoryStreamLog::new();
    store.seed(T1, 2).await;
    let relay = OutboxRelay::new(store.clone(), log.clone(), relay_settings(&[T1], 10));

    let (first, second) = tokio::join!(relay.tick(), relay.tick());

    assert_eq!(completed(first.unwrap()).appended, 2);
    assert_eq!(second.unwrap(), TickOutcome::Skipped);
    // The guard is released once the first tick finishes.
    assert!(matches!(relay.tick().await.unwrap(), TickOutcome::Completed(_)));
}

#[tokio::test]
async fn should_not_reselect_rows_claimed_by_concurrent_relay() {
    let store = InMemoryStore::new();
    let log = InMemoryStreamLog::new();
    store.seed(T1, 4).await;
    let a = OutboxRelay::new(store.clone(), log.clone(), relay_settings(&[T1], 2));
    let b = OutboxRelay::new(store.clone(), log.clone(), relay_settings(&[T1], 2));

    let (ra, rb) = tokio::join!(a.tick(), b.tick());

    assert_eq!(completed(ra.unwrap()).appended, 2);
    assert_eq!(completed(rb.unwrap()).appended, 2);
    let mut appended: Vec<i64> = log
        .entries(T1)
        .iter()
        .map(|e| e.fields.aggregate_id.0)
        .collect();
    appended.sort_unstable();
    appended.dedup();
    assert_eq!(appended.len(), 4, "each row appended once");
    assert!(store.outbox_rows().iter().all(|r| r.mark_count == 1));
}

// ── Failures ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn should_isolate_tenant_failures() {
    let store = InMemoryStore::new();
    let log = InMemoryStreamLog::new();
    store.seed(T1, 2).await;
    store.seed(T2, 2).await;
    log.fail_tenant(T2);
    let relay = OutboxRelay::new(store.clone(), log.clone(), relay_settings(&[T1, T2], 10));

    let report = completed(relay.tick().await.unwrap());

    assert_eq!(report.failed_tenants, 1);
    assert_eq!(report.appended, 2);
    assert_eq!(store.unpublished(T1), 0);
    assert_eq!(store.unpublished(T2), 2, "failed tenant retries on a later tick");
}

#[tokio::test]
async fn should_fail_tick_without_tenants() {
    let settings: RelaySettings = relay_settings(&[], 10);
    let relay = OutboxRelay::new(InMemoryStore::new(), InMemoryStreamLog::new(), settings);

    let result = relay.tick().await;

    assert!(matches!(result, Err(EventsServiceError::NoTenantsConfigured)));
    // The in-flight guard is released on the error path too.
    assert!(matches!(
        relay.tick().await,
        Err(EventsServiceError::NoTenantsConfigured)
    ));
}

// ── Run loop ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn should_publish_on_interval_and_stop_on_shutdown() {
    let store = InMemoryStore::new();
    let log = InMemoryStreamLog::new();
    store.seed(T1, 3).await;
    let relay = OutboxRelay::new(store.clone(), log.clone(), relay_settings(&[T1], 10));
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let handle = tokio::spawn(async move { relay.run(shutdown_rx).await });

    tokio::time::timeout(Duration::from_secs(2), async {
        while store.unpublished(T1) > 0 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("relay did not drain the outbox");

    shutdown_tx.send(true).unwrap();
    tokio::time::timeout(Duration::from_secs(1), handle)
        .await
        .expect("relay did not stop")
        .unwrap();
    assert_eq!(log.entries(T1).len(), 3);
}
