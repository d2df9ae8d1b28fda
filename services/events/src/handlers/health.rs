use axum::{extract::State, http::StatusCode};
use deadpool_redis::{Pool, redis};

use herald_core::health::readiness;

use crate::state::AppState;

// ── GET /readyz ──────────────────────────────────────────────────────────────

pub async fn readyz(State(state): State<AppState>) -> StatusCode {
    let postgres = state.db.ping().await.map_err(|e| e.to_string());
    let redis = ping_redis(&state.redis).await;
    readiness([("postgres", postgres), ("redis", redis)])
}

async fn ping_redis(pool: &Pool) -> Result<(), String> {
    let mut conn = pool.get().await.map_err(|e| e.to_string())?;
    let _: String = redis::cmd("PING")
        .query_async(&mut conn)
        .await
        .map_err(|e| e.to_string())?;
    Ok(())
}
