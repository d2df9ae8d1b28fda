use std::time::Duration;

use anyhow::Context as _;
use deadpool_redis::redis::{self, AsyncConnectionConfig};
use deadpool_redis::{Manager, Pool, Runtime};

use crate::domain::repository::StreamLog;
use crate::domain::types::{LogEntryId, StreamEntry, StreamFields, StreamKey};
use crate::error::EventsServiceError;

/// `[id, [field, value, field, value, ..]]` as returned by XRANGE and inside XREAD.
type RawEntry = (String, Vec<String>);

/// `[[key, [entry, ..]], ..]`, or nil when a blocking read times out.
type RawReadReply = Option<Vec<(String, Vec<RawEntry>)>>;

/// Time a reply may take beyond the `BLOCK` argument of a read.
const RESPONSE_GRACE: Duration = Duration::from_secs(5);

/// Pool whose connections wait out a blocking read of up to `block_timeout`.
///
/// The client's default response timeout is shorter than a live-tail read and would
/// turn every idle wait into an error.
pub fn connect_pool(url: &str, block_timeout: Duration) -> anyhow::Result<Pool> {
    let connection = AsyncConnectionConfig::new()
        .set_response_timeout(Some(block_timeout + RESPONSE_GRACE));
    let manager = Manager::new_with_config(url, connection).context("invalid Redis URL")?;
    Pool::builder(manager)
        .runtime(Runtime::Tokio1)
        .build()
        .context("build Redis pool")
}

/// Redis Streams backed append log.
#[derive(Clone)]
pub struct RedisStreamLog {
    pub pool: Pool,
}

impl StreamLog for RedisStreamLog {
    async fn append(
        &self,
        key: &StreamKey,
        fields: &StreamFields,
    ) -> Result<LogEntryId, EventsServiceError> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|e| EventsServiceError::Internal(e.into()))?;
        let mut cmd = redis::cmd("XADD");
        cmd.arg(key.as_str()).arg("*");
        for (name, value) in fields.to_pairs() {
            cmd.arg(name).arg(value);
        }
        let id: String = cmd
            .query_async(&mut conn)
            .await
            .with_context(|| format!("XADD {key}"))?;
        Ok(LogEntryId::new(id))
    }

    async fn range(
        &self,
        key: &StreamKey,
        from: &str,
        to: &str,
        count: usize,
    ) -> Result<Vec<StreamEntry>, EventsServiceError> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|e| EventsServiceError::Internal(e.into()))?;
        let raw: Vec<RawEntry> = redis::cmd("XRANGE")
            .arg(key.as_str())
            .arg(from)
            .arg(to)
            .arg("COUNT")
            .arg(count)
            .query_async(&mut conn)
            .await
            .with_context(|| format!("XRANGE {key}"))?;
        Ok(raw.into_iter().map(entry_from_raw).collect())
    }

    async fn blocking_read(
        &self,
        key: &StreamKey,
        after: &LogEntryId,
        timeout: Duration,
    ) -> Result<Vec<StreamEntry>, EventsServiceError> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|e| EventsServiceError::Internal(e.into()))?;
        let reply: RawReadReply = redis::cmd("XREAD")
            .arg("BLOCK")
            .arg(timeout.as_millis() as u64)
            .arg("STREAMS")
            .arg(key.as_str())
            .arg(after.as_str())
            .query_async(&mut conn)
            .await
            .with_context(|| format!("XREAD {key}"))?;
        Ok(entries_for_key(reply, key))
    }
}

fn entry_from_raw((id, flat): RawEntry) -> StreamEntry {
    let mut values = flat.into_iter();
    let pairs = std::iter::from_fn(move || Some((values.next()?, values.next()?)));
    StreamEntry {
        id: LogEntryId::new(id),
        fields: StreamFields::from_pairs(pairs),
    }
}

fn entries_for_key(reply: RawReadReply, key: &StreamKey) -> Vec<StreamEntry> {
    reply
        .unwrap_or_default()
        .into_iter()
        .filter(|(name, _)| name == key.as_str())
        .flat_map(|(_, entries)| entries)
        .map(entry_from_raw)
        .collect()
}
