use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

use herald_domain::id::{AggregateId, EventId, TenantId};

/// Event type recorded when the producer does not name one.
pub const DEFAULT_EVENT_TYPE: &str = "EventCreated";

/// SSE event name used when the stored type cannot be sent as an SSE field.
pub const FALLBACK_SSE_EVENT: &str = "message";

/// Maximum number of entries replayed from the log before tailing.
pub const BACKLOG_LIMIT: usize = 200;

/// How long one live-tail read waits before a keepalive is sent.
pub const TAIL_BLOCK_TIMEOUT: Duration = Duration::from_secs(15);

/// Range bounds spanning a whole stream key.
pub const RANGE_START: &str = "-";
pub const RANGE_END: &str = "+";

// ── Stored records ───────────────────────────────────────────────────────────

/// Input of the ingestion path: one event and its outbox copy.
#[derive(Debug, Clone)]
pub struct NewEvent {
    pub tenant_id: TenantId,
    pub event_id: EventId,
    pub event_type: String,
    pub payload: Value,
}

/// Outbox row joined with its event, as listed by `GET /events`.
#[derive(Debug, Clone, PartialEq)]
pub struct EventRecord {
    pub id: i64,
    pub event_id: EventId,
    pub event_type: String,
    pub aggregate_id: AggregateId,
    pub payload: Value,
    pub created_at: DateTime<Utc>,
}

/// An unpublished outbox row claimed by the relay.
#[derive(Debug, Clone, PartialEq)]
pub struct OutboxMessage {
    pub id: i64,
    pub event_id: EventId,
    pub event_type: String,
    pub aggregate_id: AggregateId,
    pub payload: Value,
}

// ── Append log ───────────────────────────────────────────────────────────────

/// Per-tenant log key: `stream:events:<tenant>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StreamKey(String);

impl StreamKey {
    pub fn for_tenant(tenant_id: &TenantId) -> Self {
        Self(format!("stream:events:{tenant_id}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StreamKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Log-assigned entry id, or the `$` sentinel meaning "entries appended from now on".
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LogEntryId(String);

impl LogEntryId {
    const TAIL: &'static str = "$";

    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn tail() -> Self {
        Self(Self::TAIL.to_owned())
    }

    pub fn is_tail(&self) -> bool {
        self.0 == Self::TAIL
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LogEntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// String fields carried by every stream entry.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamFields {
    pub event_id: String,
    pub event_type: String,
    pub aggregate_id: AggregateId,
    /// JSON-serialized outbox payload.
    pub payload: String,
}

impl StreamFields {
    pub const EVENT_ID: &'static str = "event_id";
    pub const EVENT_TYPE: &'static str = "event_type";
    pub const AGGREGATE_ID: &'static str = "aggregate_id";
    pub const PAYLOAD: &'static str = "payload";

    pub fn from_outbox(message: &OutboxMessage) -> Self {
        Self {
            event_id: message.event_id.to_string(),
            event_type: message.event_type.clone(),
            aggregate_id: message.aggregate_id,
            payload: message.payload.to_string(),
        }
    }

    pub fn to_pairs(&self) -> [(&'static str, String); 4] {
        [
            (Self::EVENT_ID, self.event_id.clone()),
            (Self::EVENT_TYPE, self.event_type.clone()),
            (Self::AGGREGATE_ID, self.aggregate_id.to_string()),
            (Self::PAYLOAD, self.payload.clone()),
        ]
    }

    /// Rebuild fields read back from the log.
    ///
    /// Unknown fields are ignored. Missing fields read as empty, an unparseable
    /// `aggregate_id` reads as 0 and a missing `payload` as `{}`.
    pub fn from_pairs<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut fields = Self {
            event_id: String::new(),
            event_type: String::new(),
            aggregate_id: AggregateId(0),
            payload: "{}".to_owned(),
        };
        for (name, value) in pairs {
            match name.as_str() {
                Self::EVENT_ID => fields.event_id = value,
                Self::EVENT_TYPE => fields.event_type = value,
                Self::AGGREGATE_ID => fields.aggregate_id = value.parse().unwrap_or(AggregateId(0)),
                Self::PAYLOAD => fields.payload = value,
                _ => {}
            }
        }
        fields
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StreamEntry {
    pub id: LogEntryId,
    pub fields: StreamFields,
}

// ── Delivery ─────────────────────────────────────────────────────────────────

/// JSON body of one delivered SSE event.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeliveredEvent {
    pub event_id: String,
    pub event_type: String,
    pub aggregate_id: AggregateId,
    pub payload: Value,
}

impl DeliveredEvent {
    /// Payloads that are not well-formed JSON are delivered as a JSON string.
    pub fn from_fields(fields: StreamFields) -> Self {
        let payload = serde_json::from_str(&fields.payload)
            .unwrap_or_else(|_| Value::String(fields.payload.clone()));
        Self {
            event_id: fields.event_id,
            event_type: fields.event_type,
            aggregate_id: fields.aggregate_id,
            payload,
        }
    }
}

/// One unit written to a subscriber.
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    Event(DeliveredEvent),
    /// SSE comment line (`: connected`, `: ping`).
    Comment(&'static str),
}

impl Frame {
    pub const CONNECTED: Frame = Frame::Comment("connected");
    pub const PING: Frame = Frame::Comment("ping");
}

/// True when `value` can be written into a single SSE field line.
pub fn is_sse_safe(value: &str) -> bool {
    !value.contains(['\r', '\n', '\0'])
}
