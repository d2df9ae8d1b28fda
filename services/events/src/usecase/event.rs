use serde_json::Value;

use herald_domain::id::{AggregateId, EventId, TenantId};
use herald_domain::pagination::LimitRequest;

use crate::domain::repository::EventRepository;
use crate::domain::types::{DEFAULT_EVENT_TYPE, EventRecord, NewEvent, is_sse_safe};
use crate::error::EventsServiceError;

// ── CreateEvent ──────────────────────────────────────────────────────────────

pub struct CreateEventInput {
    pub payload: Value,
    pub event_type: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CreatedEvent {
    pub event_id: EventId,
    pub aggregate_id: AggregateId,
}

pub struct CreateEventUseCase<R: EventRepository> {
    pub repo: R,
}

impl<R: EventRepository> CreateEventUseCase<R> {
    pub async fn execute(
        &self,
        tenant_id: &TenantId,
        input: CreateEventInput,
    ) -> Result<CreatedEvent, EventsServiceError> {
        if !input.payload.is_object() {
            return Err(EventsServiceError::InvalidPayload);
        }
        let event_type = match input.event_type {
            Some(t) if !t.trim().is_empty() => t,
            _ => DEFAULT_EVENT_TYPE.to_owned(),
        };
        if !is_sse_safe(&event_type) {
            return Err(EventsServiceError::InvalidEventType);
        }

        let event = NewEvent {
            tenant_id: tenant_id.clone(),
            event_id: EventId::generate(),
            event_type,
            payload: input.payload,
        };
        let aggregate_id = self.repo.create_with_outbox(&event).await?;
        tracing::debug!(
            tenant = %tenant_id,
            event_id = %event.event_id,
            aggregate_id = aggregate_id.0,
            "event queued"
        );
        Ok(CreatedEvent {
            event_id: event.event_id,
            aggregate_id,
        })
    }
}

// ── ListLatest ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct EventPage {
    pub items: Vec<EventRecord>,
    /// Event id of the newest item, if any.
    pub cursor: Option<EventId>,
}

pub struct ListLatestUseCase<R: EventRepository> {
    pub repo: R,
}

impl<R: EventRepository> ListLatestUseCase<R> {
    pub async fn execute(
        &self,
        tenant_id: &TenantId,
        limit: LimitRequest,
    ) -> Result<EventPage, EventsServiceError> {
        let limit = limit.validated().ok_or(EventsServiceError::InvalidLimit)?;
        let items = self.repo.list_latest(tenant_id, limit).await?;
        let cursor = items.first().map(|item| item.event_id);
        Ok(EventPage { items, cursor })
    }
}
