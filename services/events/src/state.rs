use std::time::Duration;

use deadpool_redis::Pool as RedisPool;
use sea_orm::DatabaseConnection;
use tokio::sync::watch;

use crate::domain::types::TAIL_BLOCK_TIMEOUT;
use crate::infra::db::{DbEventRepository, DbOutboxRepository};
use crate::infra::stream::RedisStreamLog;

/// Shared application state passed to every handler via axum `State`.
#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub redis: RedisPool,
    /// Flips to `true` when the process is shutting down; open SSE streams end.
    pub shutdown: watch::Receiver<bool>,
    pub tail_block_timeout: Duration,
}

impl AppState {
    pub fn new(db: DatabaseConnection, redis: RedisPool, shutdown: watch::Receiver<bool>) -> Self {
        Self {
            db,
            redis,
            shutdown,
            tail_block_timeout: TAIL_BLOCK_TIMEOUT,
        }
    }

    pub fn event_repo(&self) -> DbEventRepository {
        DbEventRepository {
            db: self.db.clone(),
        }
    }

    pub fn outbox_repo(&self) -> DbOutboxRepository {
        DbOutboxRepository {
            db: self.db.clone(),
        }
    }

    pub fn stream_log(&self) -> RedisStreamLog {
        RedisStreamLog {
            pool: self.redis.clone(),
        }
    }
}
