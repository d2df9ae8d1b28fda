use anyhow::Context as _;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, DatabaseConnection, EntityTrait,
    QueryFilter, QueryOrder, QuerySelect,
    sea_query::{Expr, LockBehavior, LockType},
};

use herald_core::sea_ext::TenantTransaction;
use herald_domain::id::{AggregateId, EventId, TenantId};
use herald_events_schema::{events, outbox};

use crate::domain::repository::{EventRepository, OutboxRepository};
use crate::domain::types::{EventRecord, NewEvent, OutboxMessage};
use crate::error::EventsServiceError;

// ── Event repository ─────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct DbEventRepository {
    pub db: DatabaseConnection,
}

impl EventRepository for DbEventRepository {
    async fn create_with_outbox(&self, event: &NewEvent) -> Result<AggregateId, EventsServiceError> {
        let new = event.clone();
        let id = self
            .db
            .tenant_transaction(event.tenant_id.as_str(), move |txn| {
                Box::pin(async move {
                    let tenant_id = String::from(new.tenant_id);
                    let stored = events::ActiveModel {
                        tenant_id: Set(tenant_id.clone()),
                        payload: Set(new.payload.clone()),
                        created_at: Set(Utc::now()),
                        ..Default::default()
                    }
                    .insert(txn)
                    .await?;
                    outbox::ActiveModel {
                        tenant_id: Set(tenant_id),
                        event_id: Set(new.event_id.0),
                        event_type: Set(new.event_type),
                        aggregate_id: Set(stored.id),
                        payload: Set(new.payload),
                        published_at: Set(None),
                        ..Default::default()
                    }
                    .insert(txn)
                    .await?;
                    Ok(stored.id)
                })
            })
            .await
            .context("create event with outbox")?;
        Ok(AggregateId(id))
    }

    async fn list_latest(
        &self,
        tenant_id: &TenantId,
        limit: u64,
    ) -> Result<Vec<EventRecord>, EventsServiceError> {
        let tenant = tenant_id.to_string();
        let rows = self
            .db
            .tenant_transaction(tenant_id.as_str(), move |txn| {
                Box::pin(async move {
                    outbox::Entity::find()
                        .find_also_related(events::Entity)
                        .filter(outbox::Column::TenantId.eq(tenant))
                        .order_by_desc(outbox::Column::AggregateId)
                        .limit(limit)
                        .all(txn)
                        .await
                })
            })
            .await
            .context("list latest events")?;
        Ok(rows
            .into_iter()
            .filter_map(|(row, event)| {
                let created_at = event?.created_at;
                Some(EventRecord {
                    id: row.id,
                    event_id: EventId(row.event_id),
                    event_type: row.event_type,
                    aggregate_id: AggregateId(row.aggregate_id),
                    payload: row.payload,
                    created_at,
                })
            })
            .collect())
    }

    async fn find_aggregate_id(
        &self,
        tenant_id: &TenantId,
        event_id: EventId,
    ) -> Result<Option<AggregateId>, EventsServiceError> {
        let tenant = tenant_id.to_string();
        let row = self
            .db
            .tenant_transaction(tenant_id.as_str(), move |txn| {
                Box::pin(async move {
                    outbox::Entity::find()
                        .filter(outbox::Column::TenantId.eq(tenant))
                        .filter(outbox::Column::EventId.eq(event_id.0))
                        .one(txn)
                        .await
                })
            })
            .await
            .context("find aggregate id by event id")?;
        Ok(row.map(|r| AggregateId(r.aggregate_id)))
    }
}

// ── Outbox repository ────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct DbOutboxRepository {
    pub db: DatabaseConnection,
}

impl OutboxRepository for DbOutboxRepository {
    async fn claim_unpublished(
        &self,
        tenant_id: &TenantId,
        batch_size: u64,
    ) -> Result<Vec<OutboxMessage>, EventsServiceError> {
        let tenant = tenant_id.to_string();
        let rows = self
            .db
            .tenant_transaction(tenant_id.as_str(), move |txn| {
                Box::pin(async move {
                    outbox::Entity::find()
                        .filter(outbox::Column::TenantId.eq(tenant))
                        .filter(outbox::Column::PublishedAt.is_null())
                        .order_by_asc(outbox::Column::Id)
                        .limit(batch_size)
                        .lock_with_behavior(LockType::Update, LockBehavior::SkipLocked)
                        .all(txn)
                        .await
                })
            })
            .await
            .context("claim unpublished outbox rows")?;
        Ok(rows.into_iter().map(outbox_from_model).collect())
    }

    async fn mark_published(
        &self,
        tenant_id: &TenantId,
        id: i64,
    ) -> Result<bool, EventsServiceError> {
        let result = self
            .db
            .tenant_transaction(tenant_id.as_str(), move |txn| {
                Box::pin(async move {
                    outbox::Entity::update_many()
                        .col_expr(outbox::Column::PublishedAt, Expr::value(Utc::now()))
                        .filter(outbox::Column::Id.eq(id))
                        .filter(outbox::Column::PublishedAt.is_null())
                        .exec(txn)
                        .await
                })
            })
            .await
            .context("mark outbox row published")?;
        Ok(result.rows_affected == 1)
    }
}

fn outbox_from_model(model: outbox::Model) -> OutboxMessage {
    OutboxMessage {
        id: model.id,
        event_id: EventId(model.event_id),
        event_type: model.event_type,
        aggregate_id: AggregateId(model.aggregate_id),
        payload: model.payload,
    }
}
