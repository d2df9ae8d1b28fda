use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;

use herald_domain::id::{AggregateId, EventId};
use herald_domain::pagination::LimitRequest;
use herald_tenant::tenant::TenantContext;

use crate::domain::types::EventRecord;
use crate::error::EventsServiceError;
use crate::state::AppState;
use crate::usecase::event::{CreateEventInput, CreateEventUseCase, ListLatestUseCase};

// ── Request / response types ─────────────────────────────────────────────────

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateEventRequest {
    #[serde(default)]
    pub payload: Value,
    pub event_type: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateEventResponse {
    pub status: &'static str,
    pub event_id: EventId,
    pub aggregate_id: AggregateId,
}

#[derive(Deserialize, Default)]
pub struct ListEventsQuery {
    pub limit: Option<String>,
}

#[derive(Serialize)]
pub struct EventItemResponse {
    pub id: i64,
    pub event_id: EventId,
    pub event_type: String,
    pub aggregate_id: AggregateId,
    pub payload: Value,
    #[serde(serialize_with = "rfc3339_millis")]
    pub created_at: DateTime<Utc>,
}

/// `2026-01-14T13:35:28.000Z`: UTC, always three fractional digits.
fn rfc3339_millis<S: Serializer>(at: &DateTime<Utc>, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(&at.to_rfc3339_opts(SecondsFormat::Millis, true))
}

impl From<EventRecord> for EventItemResponse {
    fn from(record: EventRecord) -> Self {
        Self {
            id: record.id,
            event_id: record.event_id,
            event_type: record.event_type,
            aggregate_id: record.aggregate_id,
            payload: record.payload,
            created_at: record.created_at,
        }
    }
}

#[derive(Serialize)]
pub struct ListEventsResponse {
    pub items: Vec<EventItemResponse>,
    pub cursor: Option<EventId>,
}

// ── POST /events ─────────────────────────────────────────────────────────────

pub async fn create_event(
    tenant: TenantContext,
    State(state): State<AppState>,
    Json(body): Json<CreateEventRequest>,
) -> Result<(StatusCode, Json<CreateEventResponse>), EventsServiceError> {
    let uc = CreateEventUseCase {
        repo: state.event_repo(),
    };
    let created = uc
        .execute(
            tenant.id(),
            CreateEventInput {
                payload: body.payload,
                event_type: body.event_type,
            },
        )
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(CreateEventResponse {
            status: "queued",
            event_id: created.event_id,
            aggregate_id: created.aggregate_id,
        }),
    ))
}

// ── GET /events ──────────────────────────────────────────────────────────────

pub async fn list_events(
    tenant: TenantContext,
    State(state): State<AppState>,
    Query(query): Query<ListEventsQuery>,
) -> Result<Json<ListEventsResponse>, EventsServiceError> {
    let limit = parse_limit(query.limit.as_deref())?;
    let uc = ListLatestUseCase {
        repo: state.event_repo(),
    };
    let page = uc.execute(tenant.id(), limit).await?;
    Ok(Json(ListEventsResponse {
        items: page.items.into_iter().map(EventItemResponse::from).collect(),
        cursor: page.cursor,
    }))
}

/// Absent means the default; anything that is not a non-negative integer is invalid.
fn parse_limit(raw: Option<&str>) -> Result<LimitRequest, EventsServiceError> {
    match raw {
        None => Ok(LimitRequest::default()),
        Some(s) => s
            .trim()
            .parse()
            .map(|limit| LimitRequest { limit })
            .map_err(|_| EventsServiceError::InvalidLimit),
    }
}
