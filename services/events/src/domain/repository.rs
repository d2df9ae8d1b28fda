#![allow(async_fn_in_trait)]

use std::time::Duration;

use herald_domain::id::{AggregateId, EventId, TenantId};

use crate::domain::types::{
    EventRecord, LogEntryId, NewEvent, OutboxMessage, StreamEntry, StreamFields, StreamKey,
};
use crate::error::EventsServiceError;

/// Ingestion and read side of the tenant-scoped event store.
pub trait EventRepository: Send + Sync {
    /// Insert the event and its outbox row in one tenant-scoped transaction.
    ///
    /// Returns the event's surrogate key, which the outbox row carries as `aggregate_id`.
    async fn create_with_outbox(&self, event: &NewEvent) -> Result<AggregateId, EventsServiceError>;

    /// Newest-first by `aggregate_id`.
    async fn list_latest(
        &self,
        tenant_id: &TenantId,
        limit: u64,
    ) -> Result<Vec<EventRecord>, EventsServiceError>;

    /// Resolve a client-facing event id to its ordering key within the tenant.
    async fn find_aggregate_id(
        &self,
        tenant_id: &TenantId,
        event_id: EventId,
    ) -> Result<Option<AggregateId>, EventsServiceError>;
}

/// Relay side of the outbox table.
pub trait OutboxRepository: Send + Sync {
    /// Lock-skip select of up to `batch_size` unpublished rows, oldest first.
    ///
    /// Rows locked by a concurrent claimer are excluded rather than waited on.
    async fn claim_unpublished(
        &self,
        tenant_id: &TenantId,
        batch_size: u64,
    ) -> Result<Vec<OutboxMessage>, EventsServiceError>;

    /// Set `published_at` if still null. Returns `true` if this call made the transition.
    async fn mark_published(&self, tenant_id: &TenantId, id: i64)
    -> Result<bool, EventsServiceError>;
}

/// Per-key ordered, durable log with blocking tail reads.
pub trait StreamLog: Send + Sync {
    async fn append(
        &self,
        key: &StreamKey,
        fields: &StreamFields,
    ) -> Result<LogEntryId, EventsServiceError>;

    /// Entries between `from` and `to` inclusive, oldest first, at most `count`.
    async fn range(
        &self,
        key: &StreamKey,
        from: &str,
        to: &str,
        count: usize,
    ) -> Result<Vec<StreamEntry>, EventsServiceError>;

    /// Entries appended after `after`. Empty when `timeout` elapses first.
    async fn blocking_read(
        &self,
        key: &StreamKey,
        after: &LogEntryId,
        timeout: Duration,
    ) -> Result<Vec<StreamEntry>, EventsServiceError>;
}
