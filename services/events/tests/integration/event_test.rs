use futures::future::join_all;
use serde_json::json;

use herald_domain::pagination::LimitRequest;
use herald_events::error::EventsServiceError;
use herald_events::usecase::event::{CreateEventInput, CreateEventUseCase, ListLatestUseCase};

use crate::helpers::{InMemoryStore, T1, T2, tenant};

fn input(payload: serde_json::Value, event_type: Option<&str>) -> CreateEventInput {
    CreateEventInput {
        payload,
        event_type: event_type.map(str::to_owned),
    }
}

// ── CreateEventUseCase ───────────────────────────────────────────────────────

#[tokio::test]
async fn should_pair_outbox_row_with_event() {
    let store = InMemoryStore::new();
    let uc = CreateEventUseCase {
        repo: store.clone(),
    };

    let created = uc
        .execute(&tenant(T1), input(json!({"message": "hi"}), Some("UserJoined")))
        .await
        .unwrap();

    let rows = store.outbox_rows();
    assert_eq!(rows.len(), 1);
    let row = &rows[0];
    assert_eq!(row.event_id, created.event_id);
    assert_eq!(row.aggregate_id, created.aggregate_id);
    assert_eq!(store.event_ids(T1), vec![created.aggregate_id.0]);
    assert_eq!(row.event_type, "UserJoined");
    assert_eq!(row.payload, json!({"message": "hi"}));
    assert!(row.published_at.is_none());
}

#[tokio::test]
async fn should_default_event_type() {
    let store = InMemoryStore::new();
    let uc = CreateEventUseCase {
        repo: store.clone(),
    };

    uc.execute(&tenant(T1), input(json!({}), None)).await.unwrap();
    uc.execute(&tenant(T1), input(json!({}), Some("  "))).await.unwrap();

    assert!(
        store
            .outbox_rows()
            .iter()
            .all(|r| r.event_type == "EventCreated")
    );
}

#[tokio::test]
async fn should_reject_non_object_payload() {
    let store = InMemoryStore::new();
    let uc = CreateEventUseCase {
        repo: store.clone(),
    };

    for payload in [json!(null), json!([1, 2]), json!("text"), json!(3)] {
        let result = uc.execute(&tenant(T1), input(payload, None)).await;
        assert!(
            matches!(result, Err(EventsServiceError::InvalidPayload)),
            "expected InvalidPayload, got {result:?}"
        );
    }
    assert!(store.outbox_rows().is_empty());
}

#[tokio::test]
async fn should_reject_event_type_with_line_break() {
    let store = InMemoryStore::new();
    let uc = CreateEventUseCase {
        repo: store.clone(),
    };

    let result = uc
        .execute(&tenant(T1), input(json!({}), Some("Evil\nevent: x")))
        .await;

    assert!(matches!(result, Err(EventsServiceError::InvalidEventType)));
    assert!(store.outbox_rows().is_empty());
}

#[tokio::test]
async fn should_assign_increasing_aggregate_ids_under_concurrency() {
    let store = InMemoryStore::new();
    let uc = CreateEventUseCase {
        repo: store.clone(),
    };
    let t1 = tenant(T1);

    let results = join_all((0..20).map(|n| uc.execute(&t1, input(json!({ "n": n }), None)))).await;
    let mut created: Vec<_> = results.into_iter().map(Result::unwrap).collect();
    created.sort_by_key(|c| c.aggregate_id);

    let rows = store.outbox_rows();
    assert_eq!(rows.len(), 20);
    assert_eq!(store.event_ids(T1).len(), 20);
    assert!(created.windows(2).all(|w| w[0].aggregate_id < w[1].aggregate_id));
    for row in &rows {
        assert!(store.event_ids(T1).contains(&row.aggregate_id.0));
    }
}

// ── ListLatestUseCase ────────────────────────────────────────────────────────

#[tokio::test]
async fn should_list_newest_first_with_cursor() {
    let store = InMemoryStore::new();
    let ids = store.seed(T1, 3).await;
    let uc = ListLatestUseCase {
        repo: store.clone(),
    };

    let page = uc
        .execute(&tenant(T1), LimitRequest::default())
        .await
        .unwrap();

    assert_eq!(page.items.len(), 3);
    assert_eq!(page.cursor, Some(ids[2]));
    assert_eq!(page.items[0].event_id, ids[2]);
    assert_eq!(page.items[2].event_id, ids[0]);
}

#[tokio::test]
async fn should_return_null_cursor_when_empty() {
    let uc = ListLatestUseCase {
        repo: InMemoryStore::new(),
    };

    let page = uc
        .execute(&tenant(T1), LimitRequest::default())
        .await
        .unwrap();

    assert!(page.items.is_empty());
    assert_eq!(page.cursor, None);
}

#[tokio::test]
async fn should_honour_limit() {
    let store = InMemoryStore::new();
    let ids = store.seed(T1, 5).await;
    let uc = ListLatestUseCase { repo: store };

    let page = uc
        .execute(&tenant(T1), LimitRequest { limit: 2 })
        .await
        .unwrap();

    let listed: Vec<_> = page.items.iter().map(|i| i.event_id).collect();
    assert_eq!(listed, vec![ids[4], ids[3]]);
}

#[tokio::test]
async fn should_reject_out_of_range_limit() {
    let uc = ListLatestUseCase {
        repo: InMemoryStore::new(),
    };

    for limit in [0, 201] {
        let result = uc.execute(&tenant(T1), LimitRequest { limit }).await;
        assert!(matches!(result, Err(EventsServiceError::InvalidLimit)));
    }
}

#[tokio::test]
async fn should_not_list_other_tenants_events() {
    let store = InMemoryStore::new();
    store.seed(T1, 2).await;
    store.seed(T2, 1).await;
    let uc = ListLatestUseCase { repo: store };

    let page = uc
        .execute(&tenant(T2), LimitRequest::default())
        .await
        .unwrap();

    assert_eq!(page.items.len(), 1);
}
