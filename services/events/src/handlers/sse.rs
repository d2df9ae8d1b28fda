use std::convert::Infallible;

use axum::{
    extract::{Query, State},
    http::HeaderMap,
    response::sse::{Event, Sse},
};
use futures::{Stream, StreamExt, future, stream};
use serde::Deserialize;
use tokio::sync::{mpsc, watch};

use herald_tenant::tenant::TenantContext;

use crate::domain::types::{FALLBACK_SSE_EVENT, Frame, is_sse_safe};
use crate::error::EventsServiceError;
use crate::state::AppState;
use crate::usecase::subscription::SubscribeUseCase;

/// Frames buffered per subscriber before the session task waits on the client.
const SUBSCRIBER_BUFFER: usize = 64;

const LAST_EVENT_ID: &str = "last-event-id";

#[derive(Deserialize, Default)]
pub struct SubscribeQuery {
    pub after: Option<String>,
}

// ── GET /sse ─────────────────────────────────────────────────────────────────

pub async fn subscribe(
    tenant: TenantContext,
    State(state): State<AppState>,
    Query(query): Query<SubscribeQuery>,
    headers: HeaderMap,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, EventsServiceError> {
    let tenant_id = tenant.into_inner();
    let token = resume_token(query.after.as_deref(), &headers);

    let uc = SubscribeUseCase {
        events: state.event_repo(),
        log: state.stream_log(),
        block_timeout: state.tail_block_timeout,
    };
    let cursor = uc.resolve_cursor(&tenant_id, token.as_deref()).await?;

    let (tx, rx) = mpsc::channel(SUBSCRIBER_BUFFER);
    tokio::spawn(async move {
        tracing::info!(tenant = %tenant_id, cursor = ?cursor.map(|c| c.0), "subscriber connected");
        if let Err(e) = uc.run(&tenant_id, cursor, tx).await {
            tracing::warn!(tenant = %tenant_id, error = %e.report(), "subscription aborted");
        }
        tracing::info!(tenant = %tenant_id, "subscriber disconnected");
    });

    let events = stream::unfold(rx, |mut rx| async move {
        let frame = rx.recv().await?;
        Some((frame, rx))
    })
    .filter_map(|frame| future::ready(sse_event(frame).map(Ok::<_, Infallible>)))
    .take_until(shutting_down(state.shutdown.clone()));

    Ok(Sse::new(events))
}

/// The `after` query parameter wins over the `Last-Event-ID` header; blanks count as absent.
fn resume_token(after: Option<&str>, headers: &HeaderMap) -> Option<String> {
    let non_blank = |t: &str| {
        let t = t.trim();
        (!t.is_empty()).then(|| t.to_owned())
    };
    after.and_then(non_blank).or_else(|| {
        headers
            .get(LAST_EVENT_ID)
            .and_then(|v| v.to_str().ok())
            .and_then(non_blank)
    })
}

/// Resolves once shutdown is signalled or the signal's sender is gone.
async fn shutting_down(mut shutdown: watch::Receiver<bool>) {
    let _ = shutdown.wait_for(|stop| *stop).await;
}

fn sse_event(frame: Frame) -> Option<Event> {
    match frame {
        Frame::Comment(text) => Some(Event::default().comment(text)),
        Frame::Event(delivered) => {
            let name = if !delivered.event_type.is_empty() && is_sse_safe(&delivered.event_type) {
                delivered.event_type.as_str()
            } else {
                FALLBACK_SSE_EVENT
            };
            let mut event = Event::default().event(name);
            if !delivered.event_id.is_empty() && is_sse_safe(&delivered.event_id) {
                event = event.id(&delivered.event_id);
            }
            match event.json_data(&delivered) {
                Ok(event) => Some(event),
                Err(e) => {
                    tracing::warn!(event_id = %delivered.event_id, error = %e, "dropping unserializable event");
                    None
                }
            }
        }
    }
}
