use std::time::Duration;

use tokio::sync::mpsc;

use herald_domain::id::{AggregateId, EventId, TenantId};

use crate::domain::repository::{EventRepository, StreamLog};
use crate::domain::types::{
    BACKLOG_LIMIT, DeliveredEvent, Frame, LogEntryId, RANGE_END, RANGE_START, StreamEntry,
    StreamKey,
};
use crate::error::EventsServiceError;

// ── CursorFilter ─────────────────────────────────────────────────────────────

/// Admits entries whose aggregate id is strictly above the last one admitted.
///
/// Ordering is by aggregate id only; log entry ids play no part, so a duplicate
/// append of an already delivered row is rejected regardless of where it lands.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CursorFilter {
    last: Option<AggregateId>,
}

impl CursorFilter {
    pub fn new(cursor: Option<AggregateId>) -> Self {
        Self { last: cursor }
    }

    /// Returns `true` and advances when `aggregate_id` is past the cursor.
    pub fn admit(&mut self, aggregate_id: AggregateId) -> bool {
        if self.last.is_some_and(|last| aggregate_id <= last) {
            return false;
        }
        self.last = Some(aggregate_id);
        true
    }

    pub fn position(&self) -> Option<AggregateId> {
        self.last
    }
}

// ── Subscribe ────────────────────────────────────────────────────────────────

/// Serves one subscriber: backlog replay, then the live tail.
pub struct SubscribeUseCase<E: EventRepository, L: StreamLog> {
    pub events: E,
    pub log: L,
    /// Wait per live-tail read before a keepalive frame is sent.
    pub block_timeout: Duration,
}

impl<E: EventRepository, L: StreamLog> SubscribeUseCase<E, L> {
    /// Resolve a resume token to the aggregate id it names within the tenant.
    ///
    /// Tokens that are not event ids, or name no row of this tenant, yield `None`
    /// and the subscriber receives the full backlog.
    pub async fn resolve_cursor(
        &self,
        tenant_id: &TenantId,
        token: Option<&str>,
    ) -> Result<Option<AggregateId>, EventsServiceError> {
        let Some(token) = token else {
            return Ok(None);
        };
        let Ok(event_id) = token.parse::<EventId>() else {
            tracing::debug!(tenant = %tenant_id, token, "resume token is not an event id");
            return Ok(None);
        };
        let cursor = self.events.find_aggregate_id(tenant_id, event_id).await?;
        if cursor.is_none() {
            tracing::debug!(tenant = %tenant_id, token, "resume token matched no event");
        }
        Ok(cursor)
    }

    /// Push frames into `frames` until the receiver is dropped or the log fails.
    ///
    /// A closed receiver ends the session with `Ok(())`; it is observed after the
    /// outstanding log call returns.
    pub async fn run(
        &self,
        tenant_id: &TenantId,
        cursor: Option<AggregateId>,
        frames: mpsc::Sender<Frame>,
    ) -> Result<(), EventsServiceError> {
        let key = StreamKey::for_tenant(tenant_id);
        let mut filter = CursorFilter::new(cursor);

        let backlog = self
            .log
            .range(&key, RANGE_START, RANGE_END, BACKLOG_LIMIT)
            .await?;
        let mut tail = backlog
            .last()
            .map(|entry| entry.id.clone())
            .unwrap_or_else(LogEntryId::tail);
        tracing::debug!(
            tenant = %tenant_id,
            backlog = backlog.len(),
            cursor = ?cursor.map(|c| c.0),
            "replaying backlog"
        );
        for entry in backlog {
            if !forward(&frames, &mut filter, entry).await {
                return Ok(());
            }
        }
        if frames.send(Frame::CONNECTED).await.is_err() {
            return Ok(());
        }

        loop {
            if frames.is_closed() {
                return Ok(());
            }
            let entries = self
                .log
                .blocking_read(&key, &tail, self.block_timeout)
                .await?;
            if entries.is_empty() {
                if frames.send(Frame::PING).await.is_err() {
                    return Ok(());
                }
                continue;
            }
            for entry in entries {
                tail = entry.id.clone();
                if !forward(&frames, &mut filter, entry).await {
                    return Ok(());
                }
            }
        }
    }
}

/// Send `entry` if the filter admits it. Returns `false` once the subscriber is gone.
async fn forward(
    frames: &mpsc::Sender<Frame>,
    filter: &mut CursorFilter,
    entry: StreamEntry,
) -> bool {
    if !filter.admit(entry.fields.aggregate_id) {
        return true;
    }
    frames
        .send(Frame::Event(DeliveredEvent::from_fields(entry.fields)))
        .await
        .is_ok()
}
